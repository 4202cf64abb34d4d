//! KaTeX-backed math renderer.

use crate::render::{MathRenderer, RenderError};

/// Renders formulas with the KaTeX typesetting library.
///
/// Configured with `throw_on_error(false)` so malformed input comes back as
/// KaTeX's own inline error markup where possible; anything the engine still
/// rejects surfaces as a [`RenderError`].
pub struct KatexRenderer {
    opts: katex::Opts,
}

impl KatexRenderer {
    /// Inline-mode renderer.
    pub fn new() -> Self {
        Self::with_display_mode(false)
    }

    /// Display-mode renderer (block-style output).
    pub fn display() -> Self {
        Self::with_display_mode(true)
    }

    fn with_display_mode(display_mode: bool) -> Self {
        let opts = katex::Opts::builder()
            .throw_on_error(false)
            .display_mode(display_mode)
            .build()
            .unwrap_or_default();
        Self { opts }
    }
}

impl Default for KatexRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MathRenderer for KatexRenderer {
    fn render(&self, source: &str) -> Result<String, RenderError> {
        katex::render_with_opts(source, &self.opts)
            .map_err(|err| RenderError::new(err.to_string()))
    }
}
