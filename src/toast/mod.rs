//! Transient notifications with timed auto-dismissal.
//!
//! | Module | Role |
//! |--------|------|
//! | [`lifecycle`] | Pure countdown / pause / dismiss state machine |
//! | [`controller`] | Binds a lifecycle to an element, frames and hover |

pub mod controller;
pub mod lifecycle;

pub use controller::{ENTRANCE_MS, EXIT_DELAY_MS, ToastController};
pub use lifecycle::{Tick, ToastId, ToastLifecycle, ToastPhase};
