//! Typed controller configuration with declared defaults.
//!
//! Configuration arrives either as JSON (serde, camelCase keys) or as the
//! string values a markup binding collects from `data-<ctrl>-<name>-value`
//! attributes. Both paths produce the same structs.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_TOAST_DURATION_MS: f64 = 5000.0;
pub const DEFAULT_ACTIVE_CLASS: &str = "tab-active";
pub const DEFAULT_HIDDEN_CLASS: &str = "hidden";
pub const DEFAULT_REPLY_DELAY_MS: u32 = 1500;
pub const DEFAULT_REPLY_JITTER_MS: u32 = 1000;
pub const DEFAULT_ASSISTANT_NAME: &str = "Assistant";
pub const DEFAULT_COLLAPSED_HEIGHT: &str = "7.5rem";
pub const DEFAULT_EXPAND_LABEL: &str = "Show more";
pub const DEFAULT_COLLAPSE_LABEL: &str = "Show less";

// =============================================================================
// RAW VALUES
// =============================================================================

/// String values keyed by camelCase name, as declared in markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Values {
    entries: HashMap<String, String>,
}

impl Values {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_owned(), value.to_owned());
    }

    /// Collect `data-<controller>-<name>-value` attributes.
    #[must_use]
    pub fn from_attributes(controller: &str, attributes: &[(String, String)]) -> Self {
        Self::collect(controller, attributes, "-value")
    }

    /// Collect `data-<controller>-<name>-param` attributes of an action
    /// source.
    #[must_use]
    pub fn from_params(controller: &str, attributes: &[(String, String)]) -> Self {
        Self::collect(controller, attributes, "-param")
    }

    fn collect(controller: &str, attributes: &[(String, String)], suffix: &str) -> Self {
        let prefix = format!("data-{controller}-");
        let mut values = Self::new();
        for (name, value) in attributes {
            let Some(key) = name.strip_prefix(&prefix).and_then(|rest| rest.strip_suffix(suffix)) else {
                continue;
            };
            if !key.is_empty() {
                values.insert(&camel_case(key), value);
            }
        }
        values
    }

    #[must_use]
    pub fn string(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Non-empty string value.
    #[must_use]
    pub fn non_empty(&self, key: &str) -> Option<&str> {
        self.string(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// Boolean value: only `"0"` and `"false"` read as false.
    #[must_use]
    pub fn bool(&self, key: &str) -> Option<bool> {
        self.string(key).map(|v| !matches!(v.trim(), "0" | "false"))
    }

    /// Numeric value. Underscore separators are ignored and an empty value
    /// reads as zero.
    pub fn number(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        let Some(raw) = self.string(key) else {
            return Ok(None);
        };
        let cleaned = raw.trim().replace('_', "");
        if cleaned.is_empty() {
            return Ok(Some(0.0));
        }
        match cleaned.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(ConfigError::InvalidNumber { key: key.to_owned(), value: raw.to_owned() }),
        }
    }

    fn millis(&self, key: &str) -> Result<Option<u32>, ConfigError> {
        Ok(self.number(key)?.map(clamp_millis))
    }

    fn class_list(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match self.string(key) {
            None => Ok(None),
            Some(v) if v.trim().is_empty() => Err(ConfigError::EmptyValue { key: key.to_owned() }),
            Some(v) => Ok(Some(v.trim().to_owned())),
        }
    }
}

// =============================================================================
// PARSED
// =============================================================================

/// A config read from markup values.
///
/// A malformed key keeps its own default and is reported in `errors`; the
/// other keys are unaffected.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub config: T,
    pub errors: Vec<ConfigError>,
}

#[derive(Default)]
struct Fallbacks {
    errors: Vec<ConfigError>,
}

impl Fallbacks {
    fn field<T>(&mut self, parsed: Result<Option<T>, ConfigError>, default: T) -> T {
        match parsed {
            Ok(value) => value.unwrap_or(default),
            Err(err) => {
                self.errors.push(err);
                default
            }
        }
    }

    fn finish<T>(self, config: T) -> Parsed<T> {
        Parsed { config, errors: self.errors }
    }
}

/// `auto-dismiss` → `autoDismiss`.
#[must_use]
pub fn camel_case(kebab: &str) -> String {
    let mut out = String::with_capacity(kebab.len());
    let mut upper = false;
    for ch in kebab.chars() {
        if ch == '-' || ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_millis(value: f64) -> u32 {
    value.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

// =============================================================================
// TOAST
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToastConfig {
    /// Total lifetime in milliseconds. Zero or negative disables the countdown.
    #[serde(rename = "duration")]
    pub duration_ms: f64,
    pub auto_dismiss: bool,
    pub pause_on_hover: bool,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self { duration_ms: DEFAULT_TOAST_DURATION_MS, auto_dismiss: true, pause_on_hover: true }
    }
}

impl ToastConfig {
    pub fn from_values(values: &Values) -> Parsed<Self> {
        let defaults = Self::default();
        let mut fallbacks = Fallbacks::default();
        let duration_ms = fallbacks.field(values.number("duration"), defaults.duration_ms);
        fallbacks.finish(Self {
            duration_ms,
            auto_dismiss: values.bool("autoDismiss").unwrap_or(defaults.auto_dismiss),
            pause_on_hover: values.bool("pauseOnHover").unwrap_or(defaults.pause_on_hover),
        })
    }
}

// =============================================================================
// PANEL SWITCHER
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PanelSwitcherConfig {
    /// Panel shown when markup carries no pre-selected tab.
    #[serde(rename = "default")]
    pub default_panel: Option<String>,
    /// Space-separated classes marking the active tab.
    pub active_class: String,
    /// Space-separated classes hiding inactive panels.
    pub hidden_class: String,
}

impl Default for PanelSwitcherConfig {
    fn default() -> Self {
        Self {
            default_panel: None,
            active_class: DEFAULT_ACTIVE_CLASS.to_owned(),
            hidden_class: DEFAULT_HIDDEN_CLASS.to_owned(),
        }
    }
}

impl PanelSwitcherConfig {
    pub fn from_values(values: &Values) -> Parsed<Self> {
        let defaults = Self::default();
        let mut fallbacks = Fallbacks::default();
        let active_class = fallbacks.field(values.class_list("activeClass"), defaults.active_class);
        let hidden_class = fallbacks.field(values.class_list("hiddenClass"), defaults.hidden_class);
        fallbacks.finish(Self {
            default_panel: values.non_empty("default").map(str::to_owned),
            active_class,
            hidden_class,
        })
    }
}

// =============================================================================
// DRAWER
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DrawerConfig {
    /// Id of the toggle checkbox; also the drawer's identity on the bus.
    pub id: Option<String>,
    pub persist: bool,
    /// Overrides the storage key suffix.
    pub persist_key: Option<String>,
}

impl DrawerConfig {
    #[must_use]
    pub fn from_values(values: &Values) -> Self {
        Self {
            id: values.non_empty("id").map(str::to_owned),
            persist: values.bool("persist").unwrap_or(false),
            persist_key: values.non_empty("persistKey").map(str::to_owned),
        }
    }
}

// =============================================================================
// PLAYGROUND
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaygroundConfig {
    #[serde(rename = "replyDelay")]
    pub reply_delay_ms: u32,
    /// Upper bound of the random extra delay added to each reply.
    #[serde(rename = "replyJitter")]
    pub reply_jitter_ms: u32,
    pub assistant_name: String,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            reply_delay_ms: DEFAULT_REPLY_DELAY_MS,
            reply_jitter_ms: DEFAULT_REPLY_JITTER_MS,
            assistant_name: DEFAULT_ASSISTANT_NAME.to_owned(),
        }
    }
}

impl PlaygroundConfig {
    pub fn from_values(values: &Values) -> Parsed<Self> {
        let defaults = Self::default();
        let mut fallbacks = Fallbacks::default();
        let reply_delay_ms = fallbacks.field(values.millis("replyDelay"), defaults.reply_delay_ms);
        let reply_jitter_ms = fallbacks.field(values.millis("replyJitter"), defaults.reply_jitter_ms);
        fallbacks.finish(Self {
            reply_delay_ms,
            reply_jitter_ms,
            assistant_name: values
                .non_empty("assistantName")
                .map_or(defaults.assistant_name, str::to_owned),
        })
    }
}

// =============================================================================
// QUICK REPLIES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuickRepliesConfig {
    /// CSS `max-height` of the collapsed container.
    pub collapsed_height: String,
    /// Toggle button title while collapsed.
    pub expand_label: String,
    /// Toggle button title while expanded.
    pub collapse_label: String,
}

impl Default for QuickRepliesConfig {
    fn default() -> Self {
        Self {
            collapsed_height: DEFAULT_COLLAPSED_HEIGHT.to_owned(),
            expand_label: DEFAULT_EXPAND_LABEL.to_owned(),
            collapse_label: DEFAULT_COLLAPSE_LABEL.to_owned(),
        }
    }
}

impl QuickRepliesConfig {
    #[must_use]
    pub fn from_values(values: &Values) -> Self {
        let defaults = Self::default();
        Self {
            collapsed_height: values
                .non_empty("collapsedHeight")
                .map_or(defaults.collapsed_height, str::to_owned),
            expand_label: values.non_empty("expandLabel").map_or(defaults.expand_label, str::to_owned),
            collapse_label: values
                .non_empty("collapseLabel")
                .map_or(defaults.collapse_label, str::to_owned),
        }
    }
}
