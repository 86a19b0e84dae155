//! Chat-style message panel with a locked input while a reply is pending.
//!
//! DESIGN
//! ======
//! Reply generation sits behind the [`Responder`] trait. The default
//! [`CannedResponder`] picks one of a few fixed placeholder replies; nothing
//! here talks to a network.
//!
//! `sending` is the input lock. While it is set, `send` is a no-op, so a
//! second Enter press cannot queue a second reply. The pending reply is a
//! cancellable timeout owned by the panel and cancelled on `detach`.

#[cfg(test)]
#[path = "playground_test.rs"]
mod playground_test;

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::binding::{ActionCall, Controller};
use crate::config::PlaygroundConfig;
use crate::host::{DomEvent, ElementRef, TaskId};
use crate::registry::Registry;

/// Label on the user's own messages.
pub const USER_LABEL: &str = "You";

const CANNED_REPLIES: [&str; 4] = [
    r#"<p>*nods slowly, eyes bright with interest*</p><p class="mt-2">That's a good question. Let me think about how to answer...</p>"#,
    r#"<p>*listens with a smile*</p><p class="mt-2">I see what you mean. Every traveler in this tavern carries a story of their own.</p>"#,
    r#"<p>An interesting thought!</p><p class="mt-2">*takes an old spellbook from the shelf*</p><p class="mt-2">Perhaps the answer you seek is in here...</p>"#,
    r#"<p>*gazes thoughtfully out of the window*</p><p class="mt-2">You know, that reminds me of an old legend from the far northern mountains...</p>"#,
];

// =============================================================================
// RESPONDER
// =============================================================================

/// Produces the assistant's reply HTML for a user message.
pub trait Responder {
    fn respond(&self, message: &str, rng: &mut SmallRng) -> String;
}

/// Placeholder replies chosen at random.
#[derive(Debug, Clone, Copy, Default)]
pub struct CannedResponder;

impl Responder for CannedResponder {
    fn respond(&self, _message: &str, rng: &mut SmallRng) -> String {
        CANNED_REPLIES[rng.random_range(0..CANNED_REPLIES.len())].to_owned()
    }
}

// =============================================================================
// PANEL
// =============================================================================

/// Elements the panel works with; each is optional.
#[derive(Default, Clone)]
pub struct PlaygroundTargets {
    pub messages: Option<ElementRef>,
    pub input: Option<ElementRef>,
    pub typing_indicator: Option<ElementRef>,
    pub send_button: Option<ElementRef>,
}

pub struct Playground {
    this: Weak<Playground>,
    registry: Registry,
    targets: PlaygroundTargets,
    config: PlaygroundConfig,
    responder: Box<dyn Responder>,
    rng: RefCell<SmallRng>,
    sending: Cell<bool>,
    pending: Cell<Option<TaskId>>,
}

impl Playground {
    /// Attach with the canned responder, seeded from the host clock.
    #[must_use]
    pub fn attach(registry: &Registry, targets: PlaygroundTargets, config: PlaygroundConfig) -> Rc<Self> {
        let seed = registry.scheduler.now().to_bits();
        Self::attach_with(registry, targets, config, Box::new(CannedResponder), seed)
    }

    #[must_use]
    pub fn attach_with(
        registry: &Registry,
        targets: PlaygroundTargets,
        config: PlaygroundConfig,
        responder: Box<dyn Responder>,
        seed: u64,
    ) -> Rc<Self> {
        let panel = Rc::new_cyclic(|this| Self {
            this: this.clone(),
            registry: registry.clone(),
            targets,
            config,
            responder,
            rng: RefCell::new(SmallRng::seed_from_u64(seed)),
            sending: Cell::new(false),
            pending: Cell::new(None),
        });
        panel.scroll_to_bottom();
        panel
    }

    #[must_use]
    pub fn is_sending(&self) -> bool {
        self.sending.get()
    }

    /// Enter without Shift sends; everything else types normally.
    pub fn handle_keydown(&self, event: &DomEvent) {
        if event.key.as_deref() == Some("Enter") && !event.shift_key {
            event.prevent_default();
            self.send();
        }
    }

    pub fn send(&self) {
        if self.sending.get() {
            tracing::debug!("send ignored while a reply is pending");
            return;
        }
        let Some(input) = &self.targets.input else {
            return;
        };
        let message = input.value().trim().to_owned();
        if message.is_empty() {
            return;
        }

        self.lock_input();
        self.append_user_message(&message);
        input.set_value("");
        self.show_typing_indicator();

        if let Some(task) = self.pending.take() {
            self.registry.scheduler.cancel(task);
        }
        let delay = self.reply_delay();
        let this = self.this.clone();
        let task = self.registry.scheduler.set_timeout(
            delay,
            Box::new(move || {
                if let Some(this) = this.upgrade() {
                    this.pending.set(None);
                    this.deliver_reply(&message);
                }
            }),
        );
        self.pending.set(Some(task));
        tracing::debug!(delay_ms = delay, "reply scheduled");
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn reply_delay(&self) -> u32 {
        let jitter = match self.config.reply_jitter_ms {
            0 => 0,
            max => self.rng.borrow_mut().random_range(0..max),
        };
        self.config.reply_delay_ms.saturating_add(jitter)
    }

    fn deliver_reply(&self, message: &str) {
        self.hide_typing_indicator();
        let reply = self.responder.respond(message, &mut self.rng.borrow_mut());
        self.append_assistant_message(&reply);
        self.unlock_input();
    }

    fn lock_input(&self) {
        self.sending.set(true);
        for target in [&self.targets.input, &self.targets.send_button].into_iter().flatten() {
            target.set_disabled(true);
        }
    }

    fn unlock_input(&self) {
        self.sending.set(false);
        if let Some(input) = &self.targets.input {
            input.set_disabled(false);
            input.focus();
        }
        if let Some(button) = &self.targets.send_button {
            button.set_disabled(false);
        }
    }

    fn append_user_message(&self, text: &str) {
        let time = self.registry.scheduler.local_time();
        self.append_html(&format!(
            concat!(
                r#"<div class="chat chat-end">"#,
                r#"<div class="chat-header mb-1"><time class="text-xs opacity-50 mr-2">{time}</time>"#,
                r#"<span class="font-medium">{label}</span></div>"#,
                r#"<div class="chat-bubble chat-bubble-primary">{body}</div>"#,
                "</div>"
            ),
            time = time,
            label = USER_LABEL,
            body = escape_html(text),
        ));
    }

    /// `html` is trusted responder output and is inserted as-is.
    fn append_assistant_message(&self, html: &str) {
        let time = self.registry.scheduler.local_time();
        let name = &self.config.assistant_name;
        let initial = name.chars().next().map(String::from).unwrap_or_default();
        self.append_html(&format!(
            concat!(
                r#"<div class="chat chat-start">"#,
                r#"<div class="chat-image avatar placeholder"><div class="w-10 rounded-full bg-secondary text-secondary-content">"#,
                "<span>{initial}</span></div></div>",
                r#"<div class="chat-header mb-1"><span class="font-medium">{name}</span>"#,
                r#"<time class="text-xs opacity-50 ml-2">{time}</time></div>"#,
                r#"<div class="chat-bubble chat-bubble-secondary">{body}</div>"#,
                "</div>"
            ),
            initial = escape_html(&initial),
            name = escape_html(name),
            time = time,
            body = html,
        ));
    }

    fn append_html(&self, html: &str) {
        if let Some(messages) = &self.targets.messages {
            messages.append_html(html);
            self.scroll_to_bottom();
        }
    }

    fn show_typing_indicator(&self) {
        let (Some(messages), Some(indicator)) = (&self.targets.messages, &self.targets.typing_indicator) else {
            return;
        };
        messages.append_child(&**indicator);
        indicator.set_style("display", "");
        self.scroll_to_bottom();
    }

    fn hide_typing_indicator(&self) {
        if let Some(indicator) = &self.targets.typing_indicator {
            indicator.set_style("display", "none");
        }
    }

    fn scroll_to_bottom(&self) {
        if let Some(messages) = &self.targets.messages {
            messages.scroll_to_bottom();
        }
    }
}

impl Controller for Playground {
    fn invoke(&self, method: &str, call: &ActionCall<'_>) -> bool {
        match method {
            "send" => {
                call.event.prevent_default();
                self.send();
            }
            "handleKeydown" => self.handle_keydown(call.event),
            _ => return false,
        }
        true
    }

    fn detach(&self) {
        if let Some(task) = self.pending.take() {
            self.registry.scheduler.cancel(task);
        }
    }
}

/// Escape text for insertion as HTML; newlines become `<br>`.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '\n' => out.push_str("<br>"),
            _ => out.push(ch),
        }
    }
    out
}
