//! Document fragment model: an ordered list of inline nodes with char-offset
//! addressing and a single splice primitive.
//!
//! The host editor owns the real document; the tool operates on the inline
//! fragment the host hands it. Formula spans are atomic - they can be removed
//! or replaced whole, never split - so nesting cannot arise from any splice.
//! All offsets are chars over the concatenated *visible* text: text node
//! content, and for a formula its rendered markup (or the render error
//! message standing in for it).

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::render::MathRenderer;
use crate::types::Selection;

/// Derived presentation of a formula span.
///
/// Regenerated from the raw source on every write; never edited directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rendered {
    /// Typeset markup produced by the math renderer.
    Markup(String),
    /// The renderer's rejection message, shown as plain text.
    Error(String),
}

/// One inline formula: user-authored source plus its cached presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaSpan {
    raw_source: String,
    rendered: Rendered,
    /// Click-to-edit handler marker. Not persisted; spans loaded from saved
    /// content are re-armed by `InlineFormulaTool::attach_existing`.
    #[serde(skip)]
    listener_armed: bool,
}

impl FormulaSpan {
    /// Build a span from raw source and render it immediately.
    pub fn new<R: MathRenderer>(source: impl Into<String>, renderer: &R) -> Self {
        let mut span = Self {
            raw_source: source.into(),
            rendered: Rendered::Markup(String::new()),
            listener_armed: false,
        };
        span.render(renderer);
        span
    }

    /// The literal formula text as typed by the user.
    pub fn raw_source(&self) -> &str {
        &self.raw_source
    }

    /// The cached render result.
    pub fn rendered(&self) -> &Rendered {
        &self.rendered
    }

    /// Whether the last render was rejected.
    pub fn render_failed(&self) -> bool {
        matches!(self.rendered, Rendered::Error(_))
    }

    /// The span's visible content: markup on success, the error message
    /// otherwise.
    pub fn visible_text(&self) -> &str {
        match &self.rendered {
            Rendered::Markup(markup) => markup,
            Rendered::Error(message) => message,
        }
    }

    /// Recompute the rendered payload from the current raw source.
    pub fn render<R: MathRenderer>(&mut self, renderer: &R) {
        self.rendered = match renderer.render(&self.raw_source) {
            Ok(markup) => Rendered::Markup(markup),
            Err(err) => {
                tracing::debug!(
                    target: "mathspan::render",
                    source = %self.raw_source,
                    error = %err,
                    "formula render rejected"
                );
                Rendered::Error(err.to_string())
            }
        };
    }

    /// Replace the raw source and recompute the rendered payload.
    pub fn set_source<R: MathRenderer>(&mut self, source: impl Into<String>, renderer: &R) {
        self.raw_source = source.into();
        self.render(renderer);
    }

    /// Arm the click-to-edit marker. Returns true only the first time.
    pub(crate) fn arm_listener(&mut self) -> bool {
        if self.listener_armed {
            false
        } else {
            self.listener_armed = true;
            true
        }
    }

    /// Whether the click-to-edit marker is armed.
    pub fn listener_armed(&self) -> bool {
        self.listener_armed
    }
}

/// A node in the inline fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InlineNode {
    /// Plain text run.
    Text(String),
    /// Atomic formula span.
    Formula(FormulaSpan),
}

impl InlineNode {
    /// Create a text node.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Check whether this node is a formula span.
    pub fn is_formula(&self) -> bool {
        matches!(self, Self::Formula(_))
    }

    /// Get the formula span, if this node is one.
    pub fn as_formula(&self) -> Option<&FormulaSpan> {
        match self {
            Self::Formula(span) => Some(span),
            Self::Text(_) => None,
        }
    }

    /// The node's visible text content.
    pub fn visible_text(&self) -> &str {
        match self {
            Self::Text(content) => content,
            Self::Formula(span) => span.visible_text(),
        }
    }

    /// Visible length in chars.
    pub fn visible_len(&self) -> usize {
        self.visible_text().chars().count()
    }
}

/// Result of a splice: what came out, and where the live cursor now sits.
#[derive(Debug)]
pub struct Splice {
    /// Nodes removed from the replaced range. Text runs are cut at the range
    /// boundaries; formulas come out whole.
    pub removed: Vec<InlineNode>,
    /// Selection covering the inserted content.
    pub selection: Selection,
}

/// An inline document fragment.
///
/// Invariant after every mutation: no two adjacent text nodes, no empty text
/// nodes. Merging never moves char offsets, so selections stay valid across
/// normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    nodes: Vec<InlineNode>,
}

impl Fragment {
    /// Create an empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fragment holding one text run.
    pub fn from_text(content: impl Into<String>) -> Self {
        let content = content.into();
        let nodes = if content.is_empty() {
            Vec::new()
        } else {
            vec![InlineNode::Text(content)]
        };
        Self { nodes }
    }

    /// Create a fragment from nodes, normalizing adjacent text runs.
    pub fn from_nodes(nodes: Vec<InlineNode>) -> Self {
        let mut fragment = Self { nodes };
        fragment.normalize();
        fragment
    }

    /// The fragment's nodes.
    pub fn nodes(&self) -> &[InlineNode] {
        &self.nodes
    }

    /// Check if the fragment has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total visible length in chars.
    pub fn len_chars(&self) -> usize {
        self.nodes.iter().map(InlineNode::visible_len).sum()
    }

    /// The full visible text.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            out.push_str(node.visible_text());
        }
        out
    }

    /// Visible text within a char range (clamped to the fragment).
    pub fn slice_text(&self, range: Range<usize>) -> String {
        let len = self.len_chars();
        let start = range.start.min(len);
        let end = range.end.min(len).max(start);

        let mut out = String::new();
        let mut cursor = 0;
        for node in &self.nodes {
            let n_len = node.visible_len();
            let n_start = cursor;
            let n_end = cursor + n_len;
            cursor = n_end;

            if n_end <= start {
                continue;
            }
            if n_start >= end {
                break;
            }
            let from = start.saturating_sub(n_start);
            let to = (end - n_start).min(n_len);
            let (_, rest) = split_at_chars(node.visible_text(), from);
            let (mid, _) = split_at_chars(rest, to - from);
            out.push_str(mid);
        }
        out
    }

    /// Char range occupied by the node at `index`.
    pub fn node_range(&self, index: usize) -> Option<Range<usize>> {
        let mut cursor = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            let n_end = cursor + node.visible_len();
            if idx == index {
                return Some(cursor..n_end);
            }
            cursor = n_end;
        }
        None
    }

    /// Index of the formula whose visible range strictly contains `offset`.
    ///
    /// Boundary offsets belong to the surrounding text: a caret sitting right
    /// before or after a span is not inside it.
    pub fn formula_strictly_at(&self, offset: usize) -> Option<usize> {
        let mut cursor = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            let n_end = cursor + node.visible_len();
            if node.is_formula() && offset > cursor && offset < n_end {
                return Some(idx);
            }
            cursor = n_end;
        }
        None
    }

    /// Indices of formulas overlapping the char range.
    ///
    /// A formula merely touching a range boundary does not overlap; a
    /// collapsed range overlaps nothing.
    pub fn formulas_intersecting(&self, range: &Range<usize>) -> Vec<usize> {
        let mut found = Vec::new();
        let mut cursor = 0;
        for (idx, node) in self.nodes.iter().enumerate() {
            let n_end = cursor + node.visible_len();
            if node.is_formula() && cursor < range.end && n_end > range.start {
                found.push(idx);
            }
            cursor = n_end;
        }
        found
    }

    /// Number of formula spans in the fragment.
    pub fn formula_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_formula()).count()
    }

    /// Get the formula span at node `index`, if that node is one.
    pub fn formula(&self, index: usize) -> Option<&FormulaSpan> {
        self.nodes.get(index).and_then(InlineNode::as_formula)
    }

    /// Mutable access to the formula span at node `index`.
    pub fn formula_mut(&mut self, index: usize) -> Option<&mut FormulaSpan> {
        match self.nodes.get_mut(index) {
            Some(InlineNode::Formula(span)) => Some(span),
            _ => None,
        }
    }

    /// Iterate over all formula spans mutably.
    pub fn formulas_mut(&mut self) -> impl Iterator<Item = &mut FormulaSpan> {
        self.nodes.iter_mut().filter_map(|node| match node {
            InlineNode::Formula(span) => Some(span),
            InlineNode::Text(_) => None,
        })
    }

    /// Replace a char range with new nodes.
    ///
    /// The range is clamped to the fragment and widened so that any partially
    /// covered formula is taken whole (an atomic span cannot be split). The
    /// returned selection covers exactly the inserted content.
    pub fn splice(&mut self, range: Range<usize>, replacement: Vec<InlineNode>) -> Splice {
        let len = self.len_chars();
        let mut start = range.start.min(len);
        let mut end = range.end.min(len).max(start);

        // Widen over partially covered formulas.
        let mut cursor = 0;
        for node in &self.nodes {
            let n_end = cursor + node.visible_len();
            if node.is_formula() && cursor < end && n_end > start {
                start = start.min(cursor);
                end = end.max(n_end);
            }
            cursor = n_end;
        }

        let inserted_len: usize = replacement.iter().map(InlineNode::visible_len).sum();
        tracing::trace!(
            target: "mathspan::fragment",
            start,
            end,
            inserted_len,
            "splice"
        );

        let mut out: Vec<InlineNode> = Vec::with_capacity(self.nodes.len() + replacement.len());
        let mut removed = Vec::new();
        let mut replacement = Some(replacement);
        let mut cursor = 0;

        for node in std::mem::take(&mut self.nodes) {
            let n_len = node.visible_len();
            let n_start = cursor;
            let n_end = cursor + n_len;
            cursor = n_end;

            if n_end <= start {
                out.push(node);
                continue;
            }
            if n_start >= end {
                if let Some(rep) = replacement.take() {
                    out.extend(rep);
                }
                out.push(node);
                continue;
            }

            match node {
                InlineNode::Formula(_) => {
                    if let Some(rep) = replacement.take() {
                        out.extend(rep);
                    }
                    removed.push(node);
                }
                InlineNode::Text(content) => {
                    let pre = start.saturating_sub(n_start);
                    let post = n_end.saturating_sub(end);
                    let (front, rest) = split_at_chars(&content, pre);
                    let (mid, back) = split_at_chars(rest, n_len - pre - post);
                    let (front, mid, back) = (front.to_owned(), mid.to_owned(), back.to_owned());

                    if !front.is_empty() {
                        out.push(InlineNode::Text(front));
                    }
                    if let Some(rep) = replacement.take() {
                        out.extend(rep);
                    }
                    if !mid.is_empty() {
                        removed.push(InlineNode::Text(mid));
                    }
                    if !back.is_empty() {
                        out.push(InlineNode::Text(back));
                    }
                }
            }
        }

        // Range sat at (or past) the end of the fragment.
        if let Some(rep) = replacement.take() {
            out.extend(rep);
        }

        self.nodes = out;
        self.normalize();

        Splice {
            removed,
            selection: Selection::new(start, start + inserted_len),
        }
    }

    /// Merge adjacent text runs and drop empty ones. Char offsets are
    /// unaffected.
    fn normalize(&mut self) {
        let mut out: Vec<InlineNode> = Vec::with_capacity(self.nodes.len());
        for node in self.nodes.drain(..) {
            match node {
                InlineNode::Text(content) if content.is_empty() => {}
                InlineNode::Text(content) => match out.last_mut() {
                    Some(InlineNode::Text(prev)) => prev.push_str(&content),
                    _ => out.push(InlineNode::Text(content)),
                },
                formula => out.push(formula),
            }
        }
        self.nodes = out;
    }
}

/// Split at a char index, clamping past-the-end to the whole string.
fn split_at_chars(s: &str, chars: usize) -> (&str, &str) {
    match s.char_indices().nth(chars) {
        Some((byte, _)) => s.split_at(byte),
        None => (s, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderError;

    /// Maps a couple of known sources to glyph-like output.
    struct GlyphRenderer;

    impl MathRenderer for GlyphRenderer {
        fn render(&self, source: &str) -> Result<String, RenderError> {
            Ok(match source {
                "x^2" => "x²".to_string(),
                other => format!("[{other}]"),
            })
        }
    }

    fn formula(source: &str) -> InlineNode {
        InlineNode::Formula(FormulaSpan::new(source, &GlyphRenderer))
    }

    #[test]
    fn test_from_text_and_len() {
        let doc = Fragment::from_text("héllo");
        assert_eq!(doc.len_chars(), 5);
        assert_eq!(doc.text(), "héllo");
        assert!(Fragment::from_text("").is_empty());
    }

    #[test]
    fn test_visible_text_tracks_render_result() {
        let span = FormulaSpan::new("x^2", &GlyphRenderer);
        assert_eq!(span.raw_source(), "x^2");
        assert_eq!(span.visible_text(), "x²");
        assert!(!span.render_failed());
    }

    #[test]
    fn test_slice_text_across_nodes() {
        let doc = Fragment::from_nodes(vec![
            InlineNode::text("ab"),
            formula("x^2"),
            InlineNode::text("cd"),
        ]);
        // Visible: "ab" + "x²" + "cd" (x² is 2 chars).
        assert_eq!(doc.len_chars(), 6);
        assert_eq!(doc.slice_text(1..5), "bx²c");
        assert_eq!(doc.slice_text(0..100), "abx²cd");
        assert_eq!(doc.slice_text(3..3), "");
    }

    #[test]
    fn test_splice_replaces_middle_of_text_run() {
        let mut doc = Fragment::from_text("hello world");
        let splice = doc.splice(6..11, vec![formula("w")]);

        assert_eq!(doc.nodes().len(), 2);
        assert_eq!(doc.text(), "hello [w]");
        assert_eq!(splice.removed, vec![InlineNode::text("world")]);
        // Selection covers the inserted span's visible content.
        assert_eq!(splice.selection, Selection::new(6, 9));
    }

    #[test]
    fn test_splice_collapsed_insert_between_nodes() {
        let mut doc = Fragment::from_nodes(vec![InlineNode::text("ab"), InlineNode::text("cd")]);
        // from_nodes merges the runs; insert in the middle.
        let splice = doc.splice(2..2, vec![formula("q")]);
        assert_eq!(doc.text(), "ab[q]cd");
        assert!(splice.removed.is_empty());
        assert_eq!(splice.selection, Selection::new(2, 5));
    }

    #[test]
    fn test_splice_at_end_and_out_of_range() {
        let mut doc = Fragment::from_text("ab");
        let splice = doc.splice(50..60, vec![InlineNode::text("!")]);
        assert_eq!(doc.text(), "ab!");
        assert!(splice.removed.is_empty());
        assert_eq!(splice.selection, Selection::new(2, 3));
    }

    #[test]
    fn test_splice_takes_partially_covered_formula_whole() {
        let mut doc = Fragment::from_nodes(vec![
            InlineNode::text("aa"),
            formula("x^2"), // visible "x²", range 2..4
            InlineNode::text("bb"),
        ]);
        // Range ends one char into the span: the whole span must come out.
        let splice = doc.splice(1..3, vec![]);

        assert_eq!(doc.text(), "abb");
        assert_eq!(splice.removed.len(), 2);
        assert_eq!(splice.removed[0], InlineNode::text("a"));
        assert!(splice.removed[1].is_formula());
        assert_eq!(splice.selection, Selection::collapsed(1));
    }

    #[test]
    fn test_splice_removal_keeps_surrounding_text_merged() {
        let mut doc = Fragment::from_nodes(vec![
            InlineNode::text("aa"),
            formula("x^2"),
            InlineNode::text("bb"),
        ]);
        let range = doc.node_range(1).unwrap();
        doc.splice(range, vec![InlineNode::text("x²")]);

        // Reinserted text merges with both neighbours.
        assert_eq!(doc.nodes().len(), 1);
        assert_eq!(doc.text(), "aax²bb");
        assert_eq!(doc.formula_count(), 0);
    }

    #[test]
    fn test_formula_strictly_at_boundaries() {
        let doc = Fragment::from_nodes(vec![
            InlineNode::text("ab"),
            formula("x^2"), // range 2..4
            InlineNode::text("cd"),
        ]);
        assert_eq!(doc.formula_strictly_at(1), None);
        assert_eq!(doc.formula_strictly_at(2), None); // at span start
        assert_eq!(doc.formula_strictly_at(3), Some(1)); // strictly inside
        assert_eq!(doc.formula_strictly_at(4), None); // at span end
    }

    #[test]
    fn test_formulas_intersecting() {
        let doc = Fragment::from_nodes(vec![
            InlineNode::text("ab"),
            formula("x^2"), // 2..4
            InlineNode::text("cd"),
            formula("y"), // 6..9 visible "[y]"
        ]);
        assert!(doc.formulas_intersecting(&(0..2)).is_empty()); // touches only
        assert_eq!(doc.formulas_intersecting(&(0..3)), vec![1]);
        assert_eq!(doc.formulas_intersecting(&(0..7)), vec![1, 3]);
        assert!(doc.formulas_intersecting(&(3..3)).is_empty()); // collapsed
    }

    #[test]
    fn test_listener_marker_is_idempotent() {
        let mut span = FormulaSpan::new("a", &GlyphRenderer);
        assert!(!span.listener_armed());
        assert!(span.arm_listener());
        assert!(!span.arm_listener());
        assert!(span.listener_armed());
    }

    #[test]
    fn test_json_round_trip_drops_listener_marker() {
        let mut span = FormulaSpan::new("x^2", &GlyphRenderer);
        span.arm_listener();
        let doc = Fragment::from_nodes(vec![InlineNode::text("a"), InlineNode::Formula(span)]);

        let json = serde_json::to_string(&doc).unwrap();
        let reloaded: Fragment = serde_json::from_str(&json).unwrap();

        assert_eq!(reloaded.text(), doc.text());
        let span = reloaded.formula(1).unwrap();
        assert_eq!(span.raw_source(), "x^2");
        assert!(!span.listener_armed());
    }
}
