//! mathspan-editor-core: inline LaTeX formula tool for a rich-text block
//! editor.
//!
//! This crate provides:
//! - `Fragment` / `InlineNode` - the inline document model with an atomic
//!   `FormulaSpan` node and a single splice primitive
//! - `Selection` - char-offset selection with live-cursor repositioning
//! - `InlineFormulaTool` - the wrap/unwrap/edit state machine
//! - `MathRenderer` - the typesetting seam, with a KaTeX backend behind the
//!   `katex` feature
//! - `ToolConfig` / `ToolDescriptor` - host editor registration as data
//! - an HTML writer for the host's persistence format

pub mod config;
pub mod controller;
pub mod fragment;
pub mod html;
#[cfg(feature = "katex")]
pub mod katex;
pub mod modal;
pub mod render;
pub mod types;

pub use config::{SanitizeRule, ToolConfig, ToolDescriptor, ToolbarButton};
pub use controller::{Activation, Classification, IgnoreReason, InlineFormulaTool};
pub use fragment::{Fragment, FormulaSpan, InlineNode, Rendered, Splice};
pub use html::write_fragment;
#[cfg(feature = "katex")]
pub use katex::KatexRenderer;
pub use modal::EditSession;
pub use render::{MathRenderer, RenderError};
pub use types::Selection;
