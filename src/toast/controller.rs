//! Toast controller: drives a [`ToastLifecycle`] from animation frames and
//! hover events, and applies the entrance/exit transitions.
//!
//! DESIGN
//! ======
//! The controller owns three cancellable tasks: the entrance frame, the
//! per-frame progress tick and the post-exit removal timeout. Each is stored
//! as a `TaskId` and cancelled on the transition that makes it obsolete and
//! on `detach`. Scheduled closures hold a `Weak` back-reference, so a
//! dropped controller is never revived by a late task.
//!
//! Elapsed time comes from `Scheduler::now()` on every tick rather than from
//! frame counts; a throttled tab with one frame per second still dismisses
//! on time.

#[cfg(test)]
#[path = "controller_test.rs"]
mod controller_test;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::lifecycle::{Tick, ToastId, ToastLifecycle, ToastPhase};
use crate::binding::{ActionCall, Controller};
use crate::config::ToastConfig;
use crate::events::UiEvent;
use crate::host::{DomEvent, ElementRef, ListenerId, TaskId};
use crate::registry::Registry;

/// Length of the entrance transition.
pub const ENTRANCE_MS: u32 = 300;

/// Delay between starting the exit transition and removing the element.
pub const EXIT_DELAY_MS: u32 = 200;

const HIDDEN_TRANSFORM: &str = "translateX(100%)";

pub struct ToastController {
    this: Weak<ToastController>,
    registry: Registry,
    element: ElementRef,
    progress: Option<ElementRef>,
    lifecycle: RefCell<ToastLifecycle>,
    entrance: Cell<Option<TaskId>>,
    frame: Cell<Option<TaskId>>,
    removal: Cell<Option<TaskId>>,
    listeners: RefCell<Vec<ListenerId>>,
}

impl ToastController {
    /// Show `element` as a toast and start its countdown when enabled.
    ///
    /// `progress`, when present, has its width set to the remaining fraction
    /// on every frame.
    #[must_use]
    pub fn attach(
        registry: &Registry,
        element: ElementRef,
        progress: Option<ElementRef>,
        config: &ToastConfig,
    ) -> Rc<Self> {
        let controller = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            registry: registry.clone(),
            element,
            progress,
            lifecycle: RefCell::new(ToastLifecycle::new(config)),
            entrance: Cell::new(None),
            frame: Cell::new(None),
            removal: Cell::new(None),
            listeners: RefCell::new(Vec::new()),
        });
        tracing::debug!(toast = %controller.id(), duration_ms = config.duration_ms, "toast attached");
        controller.show();
        if controller.lifecycle.borrow().countdown_enabled() {
            controller.start_countdown();
        }
        if controller.lifecycle.borrow().hover_pauses() {
            controller.install_hover_listeners();
        }
        controller
    }

    #[must_use]
    pub fn id(&self) -> ToastId {
        self.lifecycle.borrow().id()
    }

    #[must_use]
    pub fn phase(&self) -> ToastPhase {
        self.lifecycle.borrow().phase()
    }

    #[must_use]
    pub fn remaining_ms(&self) -> f64 {
        self.lifecycle.borrow().remaining_at(self.registry.scheduler.now())
    }

    // =========================================================================
    // TRANSITIONS
    // =========================================================================

    /// Begin (or restart the clock of) the countdown and the per-frame
    /// progress updates.
    pub fn start_countdown(&self) {
        let now = self.registry.scheduler.now();
        if !self.lifecycle.borrow_mut().start_countdown(now) {
            return;
        }
        self.cancel_frame();
        self.update_progress();
    }

    /// Freeze the countdown. No-op unless hover pausing is enabled and the
    /// toast is counting down.
    pub fn pause(&self) {
        let now = self.registry.scheduler.now();
        if !self.lifecycle.borrow_mut().pause(now) {
            return;
        }
        self.cancel_frame();
        tracing::trace!(toast = %self.id(), remaining_ms = self.remaining_ms(), "toast paused");
    }

    /// Continue counting down from the stored remainder.
    pub fn resume(&self) {
        let now = self.registry.scheduler.now();
        if !self.lifecycle.borrow_mut().resume(now) {
            return;
        }
        self.update_progress();
    }

    /// Start the exit transition and schedule removal. Repeated calls while
    /// leaving are ignored.
    pub fn dismiss(&self) {
        let now = self.registry.scheduler.now();
        if !self.lifecycle.borrow_mut().begin_dismiss(now) {
            return;
        }
        self.cancel_frame();
        self.cancel_entrance();

        self.element.set_style(
            "transition",
            &format!("opacity {EXIT_DELAY_MS}ms ease-in, transform {EXIT_DELAY_MS}ms ease-in"),
        );
        self.element.set_style("opacity", "0");
        self.element.set_style("transform", HIDDEN_TRANSFORM);

        let this = self.this.clone();
        let task = self.registry.scheduler.set_timeout(
            EXIT_DELAY_MS,
            Box::new(move || {
                if let Some(this) = this.upgrade() {
                    this.removal.set(None);
                    this.finish_removal();
                }
            }),
        );
        self.removal.set(Some(task));
        tracing::debug!(toast = %self.id(), "toast dismissing");
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn show(&self) {
        self.element.set_style("opacity", "0");
        self.element.set_style("transform", HIDDEN_TRANSFORM);

        let this = self.this.clone();
        let task = self.registry.scheduler.request_frame(Box::new(move || {
            let Some(this) = this.upgrade() else {
                return;
            };
            this.entrance.set(None);
            this.element.set_style(
                "transition",
                &format!("opacity {ENTRANCE_MS}ms ease-out, transform {ENTRANCE_MS}ms ease-out"),
            );
            this.element.set_style("opacity", "1");
            this.element.set_style("transform", "translateX(0)");
        }));
        self.entrance.set(Some(task));
    }

    fn update_progress(&self) {
        let now = self.registry.scheduler.now();
        let tick = self.lifecycle.borrow().tick(now);
        match tick {
            Tick::Idle => {}
            Tick::Expired => self.dismiss(),
            Tick::Progress(fraction) => {
                if let Some(progress) = &self.progress {
                    progress.set_style("width", &format!("{}%", fraction * 100.0));
                }
                let this = self.this.clone();
                let task = self.registry.scheduler.request_frame(Box::new(move || {
                    if let Some(this) = this.upgrade() {
                        this.frame.set(None);
                        this.update_progress();
                    }
                }));
                self.frame.set(Some(task));
            }
        }
    }

    fn finish_removal(&self) {
        if !self.lifecycle.borrow_mut().finish_removal() {
            return;
        }
        self.remove_listeners();
        let event = UiEvent::ToastDismissed { toast: self.id() };
        // Notify first so the custom event still bubbles through the page.
        self.registry.notify(&*self.element, &event);
        self.element.remove();
        tracing::debug!(toast = %self.id(), "toast removed");
    }

    fn install_hover_listeners(&self) {
        let enter = self.this.clone();
        let leave = self.this.clone();
        let mut listeners = self.listeners.borrow_mut();
        listeners.push(self.element.listen(
            "mouseenter",
            Rc::new(move |_: &DomEvent| {
                if let Some(this) = enter.upgrade() {
                    this.pause();
                }
            }),
        ));
        listeners.push(self.element.listen(
            "mouseleave",
            Rc::new(move |_: &DomEvent| {
                if let Some(this) = leave.upgrade() {
                    this.resume();
                }
            }),
        ));
    }

    fn remove_listeners(&self) {
        let listeners = self.listeners.take();
        for id in listeners {
            self.element.unlisten(id);
        }
    }

    fn cancel_frame(&self) {
        if let Some(task) = self.frame.take() {
            self.registry.scheduler.cancel(task);
        }
    }

    fn cancel_entrance(&self) {
        if let Some(task) = self.entrance.take() {
            self.registry.scheduler.cancel(task);
        }
    }

    fn cancel_removal(&self) {
        if let Some(task) = self.removal.take() {
            self.registry.scheduler.cancel(task);
        }
    }
}

impl Controller for ToastController {
    fn invoke(&self, method: &str, _call: &ActionCall<'_>) -> bool {
        match method {
            "dismiss" => self.dismiss(),
            "pause" => self.pause(),
            "resume" => self.resume(),
            _ => return false,
        }
        true
    }

    fn detach(&self) {
        self.cancel_entrance();
        self.cancel_frame();
        self.cancel_removal();
        self.remove_listeners();
    }

    fn is_finished(&self) -> bool {
        self.phase() == ToastPhase::Removed
    }
}
