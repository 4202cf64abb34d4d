//! Fragment serialization to host markup.
//!
//! The serialized custom tag is the persistence format the host's save/load
//! pipeline carries; the sanitizer allow-list in [`crate::config`] is exactly
//! what keeps this output alive through it.

use crate::config::ToolConfig;
use crate::fragment::{Fragment, FormulaSpan, InlineNode, Rendered};

/// Serialize a fragment to HTML.
pub fn write_fragment(fragment: &Fragment, config: &ToolConfig) -> String {
    let mut out = String::new();
    for node in fragment.nodes() {
        match node {
            InlineNode::Text(text) => out.push_str(&html_escape::encode_text(text)),
            InlineNode::Formula(span) => write_span(span, config, &mut out),
        }
    }
    out
}

/// Serialize one formula span.
///
/// The raw source lives in the source attribute; the element body is the
/// rendered markup verbatim, or the escaped error message when the render was
/// rejected. The container is marked non-editable.
pub fn write_span(span: &FormulaSpan, config: &ToolConfig, out: &mut String) {
    out.push('<');
    out.push_str(&config.tag);
    out.push_str(" class=\"");
    out.push_str(&config.span_class);
    out.push_str("\" contenteditable=\"false\" ");
    out.push_str(&config.source_attr);
    out.push_str("=\"");
    out.push_str(&html_escape::encode_double_quoted_attribute(
        span.raw_source(),
    ));
    out.push_str("\">");
    match span.rendered() {
        Rendered::Markup(markup) => out.push_str(markup),
        Rendered::Error(message) => out.push_str(&html_escape::encode_text(message)),
    }
    out.push_str("</");
    out.push_str(&config.tag);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{MathRenderer, RenderError};

    struct GlyphRenderer;

    impl MathRenderer for GlyphRenderer {
        fn render(&self, source: &str) -> Result<String, RenderError> {
            Ok(match source {
                "x^2" => "x²".to_string(),
                other => format!("[{other}]"),
            })
        }
    }

    struct FailingRenderer;

    impl MathRenderer for FailingRenderer {
        fn render(&self, _source: &str) -> Result<String, RenderError> {
            Err(RenderError::new("bad <formula>"))
        }
    }

    fn config() -> ToolConfig {
        ToolConfig::default()
    }

    #[test]
    fn test_text_is_escaped() {
        let doc = Fragment::from_text("a < b & c");
        assert_eq!(write_fragment(&doc, &config()), "a &lt; b &amp; c");
    }

    #[test]
    fn test_span_markup() {
        let doc = Fragment::from_nodes(vec![
            InlineNode::text("see "),
            InlineNode::Formula(FormulaSpan::new("x^2", &GlyphRenderer)),
        ]);
        insta::assert_snapshot!(
            write_fragment(&doc, &config()),
            @r#"see <span class="latex-inline" contenteditable="false" data-formula="x^2">x²</span>"#
        );
    }

    #[test]
    fn test_source_attribute_is_escaped() {
        let doc = Fragment::from_nodes(vec![InlineNode::Formula(FormulaSpan::new(
            "a\"b",
            &GlyphRenderer,
        ))]);
        let html = write_fragment(&doc, &config());
        assert!(html.contains("data-formula=\"a&quot;b\""));
        assert!(!html.contains("data-formula=\"a\"b\""));
    }

    #[test]
    fn test_error_body_is_escaped_text() {
        let doc = Fragment::from_nodes(vec![InlineNode::Formula(FormulaSpan::new(
            "\\oops",
            &FailingRenderer,
        ))]);
        insta::assert_snapshot!(
            write_fragment(&doc, &config()),
            @r#"<span class="latex-inline" contenteditable="false" data-formula="\oops">bad &lt;formula&gt;</span>"#
        );
    }
}
