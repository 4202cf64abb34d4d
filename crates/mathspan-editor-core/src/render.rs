//! Math renderer seam.
//!
//! The typesetting library is an external collaborator; the core only depends
//! on this trait. The KaTeX-backed implementation lives in the `katex` module
//! (cargo feature `katex`).

use thiserror::Error;

/// Turns raw formula source into typeset markup.
///
/// Rendering is synchronous and runs inline on the event path. A rejection
/// never escapes the tool: the error message becomes the span's visible text
/// while the raw source is kept for a later edit.
pub trait MathRenderer {
    /// Render `source` to an opaque markup string.
    fn render(&self, source: &str) -> Result<String, RenderError>;
}

/// Rejection from the math renderer.
///
/// The message is what ends up shown inline in place of the typeset output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RenderError {
    message: String,
}

impl RenderError {
    /// Create an error carrying the renderer's message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The renderer's message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_is_display() {
        let err = RenderError::new("Undefined control sequence: \\frak");
        assert_eq!(err.to_string(), err.message());
    }
}
