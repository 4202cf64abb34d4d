//! Tool configuration and the host registration contract.
//!
//! Everything the host editor needs to know about the tool is plain data:
//! the markup vocabulary the tool emits, the sanitizer allow-list that keeps
//! that markup alive through the host's save pipeline, and the toolbar
//! surface. The config is supplied at construction and never mutated.

use serde::Serialize;
use smol_str::SmolStr;

/// Immutable configuration for one tool instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Tag name of the formula span element.
    pub tag: SmolStr,
    /// Class marking a formula span.
    pub span_class: SmolStr,
    /// Attribute carrying the raw formula source. Kept out of layout and
    /// never focusable; the user only ever sees the rendered child.
    pub source_attr: SmolStr,
    /// Class of the toolbar button.
    pub button_class: SmolStr,
    /// Class the host should put on the edit panel.
    pub panel_class: SmolStr,
    /// Keyboard shortcut the host binds to the tool.
    pub shortcut: SmolStr,
    /// Display title for the toolbar.
    pub title: SmolStr,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            tag: SmolStr::new_static("span"),
            span_class: SmolStr::new_static("latex-inline"),
            source_attr: SmolStr::new_static("data-formula"),
            button_class: SmolStr::new_static("latex-tool-button"),
            panel_class: SmolStr::new_static("latex-modal"),
            shortcut: SmolStr::new_static("CMD+M"),
            title: SmolStr::new_static("LaTeX"),
        }
    }
}

impl ToolConfig {
    /// The registration contract handed to the host editor.
    pub fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            is_inline: true,
            title: self.title.clone(),
            shortcut: self.shortcut.clone(),
            sanitize: vec![SanitizeRule {
                tag: self.tag.clone(),
                attrs: vec![
                    SmolStr::new_static("class"),
                    self.source_attr.clone(),
                    SmolStr::new_static("contenteditable"),
                    SmolStr::new_static("style"),
                ],
            }],
        }
    }

    pub(crate) fn toolbar_button(&self) -> ToolbarButton {
        ToolbarButton {
            label: self.title.clone(),
            class: self.button_class.clone(),
            active: false,
        }
    }
}

/// What the host registers: capability flag, toolbar strings, and the
/// tag/attribute allow-list its sanitizer must keep.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    /// Always true: this is an inline tool, never a block.
    pub is_inline: bool,
    pub title: SmolStr,
    pub shortcut: SmolStr,
    pub sanitize: Vec<SanitizeRule>,
}

/// One allow-listed tag with the attributes the sanitizer may keep on it.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizeRule {
    pub tag: SmolStr,
    pub attrs: Vec<SmolStr>,
}

/// The toolbar button the tool renders for the host.
///
/// `active` is presentation state only, flipped by `check_state`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolbarButton {
    pub label: SmolStr,
    pub class: SmolStr,
    pub active: bool,
}
