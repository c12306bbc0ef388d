//! Default values shared by configuration models and the rendering engine.
//!
//! # Design
//! - Centralize sentinels so renderer and sanitizer agree on them.

/// Value stored for a checked checkbox.
pub const CHECKBOX_ON: &str = "1";
/// Prefix applied to every CSS class and element id emitted by the renderer.
pub const DEFAULT_CLASS_PREFIX: &str = "tabform";

pub(crate) fn class_prefix() -> String {
    DEFAULT_CLASS_PREFIX.to_string()
}

pub(crate) const fn unslash() -> bool {
    true
}
