//! The inline formula tool: wrap, unwrap, and edit decisions over a live
//! selection.
//!
//! This is the central dispatch point. Every trigger either mutates the
//! fragment through one splice, opens the edit session, or degrades to an
//! explicit no-op - nothing here panics or escapes to the host.

use crate::config::{ToolConfig, ToolDescriptor, ToolbarButton};
use crate::fragment::{Fragment, FormulaSpan, InlineNode};
use crate::modal::EditSession;
use crate::render::MathRenderer;
use crate::types::Selection;

/// Where a selection sits relative to existing formula markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The selection anchor is in plain content.
    NoFormula,
    /// The selection anchor is strictly inside the formula at this node index.
    InsideFormula(usize),
}

/// Outcome of a tool trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// A new span was created; the selection now covers it.
    Wrapped { selection: Selection },
    /// A span was removed, its rendered content kept as plain text; the
    /// selection covers the reinserted content.
    Unwrapped { selection: Selection },
    /// The edit session was opened on the span at this node index.
    EditorOpened { span: usize },
    /// Nothing happened.
    Ignored(IgnoreReason),
}

/// Why a trigger was ignored. Informational only - the host surfaces none of
/// these to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Collapsed selection with no formula under it: nothing to capture.
    NothingSelected,
    /// The captured text was empty after trimming.
    EmptyCapture,
    /// The selection spans more than one formula.
    AmbiguousSelection,
    /// An edit session is already open.
    EditorAlreadyOpen,
}

/// The inline formula tool.
///
/// Owns the toolbar button state and the single edit-session slot; the host
/// owns the document and the live selection and passes both in on every
/// trigger.
pub struct InlineFormulaTool<R> {
    config: ToolConfig,
    renderer: R,
    session: Option<EditSession>,
    button: ToolbarButton,
}

impl<R: MathRenderer> InlineFormulaTool<R> {
    /// Create a tool with the given configuration and renderer.
    pub fn new(config: ToolConfig, renderer: R) -> Self {
        let button = config.toolbar_button();
        Self {
            config,
            renderer,
            session: None,
            button,
        }
    }

    /// Create a tool with the default configuration.
    pub fn with_renderer(renderer: R) -> Self {
        Self::new(ToolConfig::default(), renderer)
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// The registration contract for the host editor.
    pub fn descriptor(&self) -> ToolDescriptor {
        self.config.descriptor()
    }

    /// The toolbar button in its current presentation state.
    pub fn button(&self) -> &ToolbarButton {
        &self.button
    }

    /// Classify the selection against existing formula markup.
    ///
    /// Pure; walks up from the selection anchor. Used by `activate` and by
    /// the toolbar highlight.
    pub fn classify(&self, doc: &Fragment, selection: Selection) -> Classification {
        match doc.formula_strictly_at(selection.anchor) {
            Some(index) => Classification::InsideFormula(index),
            None => Classification::NoFormula,
        }
    }

    /// Update the toolbar button highlight from the current cursor position.
    ///
    /// Never mutates the document; returns the new active state.
    pub fn check_state(&mut self, doc: &Fragment, selection: Selection) -> bool {
        self.button.active = matches!(
            self.classify(doc, selection),
            Classification::InsideFormula(_)
        );
        self.button.active
    }

    /// The primary trigger (toolbar button or shortcut).
    ///
    /// Inside an existing span this opens the editor. Otherwise the decision
    /// depends on how many spans the selection covers: none wraps the
    /// selected text in a new span, exactly one opens that span's editor,
    /// and more than one is ambiguous and ignored.
    pub fn activate(&mut self, doc: &mut Fragment, selection: Selection) -> Activation {
        if let Classification::InsideFormula(index) = self.classify(doc, selection) {
            return self.open_editor(doc, index);
        }

        let found = doc.formulas_intersecting(&selection.to_range());
        tracing::debug!(
            target: "mathspan::tool",
            anchor = selection.anchor,
            head = selection.head,
            covered = found.len(),
            "activate"
        );
        match found.as_slice() {
            [] if selection.is_collapsed() => Activation::Ignored(IgnoreReason::NothingSelected),
            [] => self.wrap(doc, selection),
            [single] => self.open_editor(doc, *single),
            _ => Activation::Ignored(IgnoreReason::AmbiguousSelection),
        }
    }

    /// Wrap the selected text in a new formula span.
    ///
    /// The captured text is trimmed and becomes the raw source; an empty
    /// capture never creates a span. The returned selection covers the new
    /// span so a follow-up trigger lands on it.
    fn wrap(&mut self, doc: &mut Fragment, selection: Selection) -> Activation {
        let captured = doc.slice_text(selection.to_range());
        let trimmed = captured.trim();
        if trimmed.is_empty() {
            return Activation::Ignored(IgnoreReason::EmptyCapture);
        }

        let mut span = FormulaSpan::new(trimmed, &self.renderer);
        self.ensure_listener(&mut span);
        let splice = doc.splice(selection.to_range(), vec![InlineNode::Formula(span)]);
        Activation::Wrapped {
            selection: splice.selection,
        }
    }

    /// Remove the targeted span, keeping only its rendered content as plain
    /// text.
    ///
    /// Lossy on purpose: the raw source is gone afterwards. The target is
    /// the span under the anchor, or the single span the selection covers.
    pub fn unwrap(&mut self, doc: &mut Fragment, selection: Selection) -> Activation {
        let target = match self.classify(doc, selection) {
            Classification::InsideFormula(index) => index,
            Classification::NoFormula => {
                let found = doc.formulas_intersecting(&selection.to_range());
                match found.as_slice() {
                    [single] => *single,
                    [] => return Activation::Ignored(IgnoreReason::NothingSelected),
                    _ => return Activation::Ignored(IgnoreReason::AmbiguousSelection),
                }
            }
        };

        let (range, visible) = match (doc.node_range(target), doc.formula(target)) {
            (Some(range), Some(span)) => (range, span.visible_text().to_owned()),
            _ => return Activation::Ignored(IgnoreReason::NothingSelected),
        };
        let splice = doc.splice(range, vec![InlineNode::text(visible)]);
        Activation::Unwrapped {
            selection: splice.selection,
        }
    }

    /// Open the edit session on the span at `index`.
    ///
    /// A second open while a session exists is ignored; the slot is the
    /// whole exclusion mechanism.
    pub fn open_editor(&mut self, doc: &Fragment, index: usize) -> Activation {
        if self.session.is_some() {
            tracing::debug!(target: "mathspan::tool", index, "edit session already open");
            return Activation::Ignored(IgnoreReason::EditorAlreadyOpen);
        }
        let Some(span) = doc.formula(index) else {
            return Activation::Ignored(IgnoreReason::NothingSelected);
        };
        self.session = Some(EditSession::new(index, span.raw_source()));
        Activation::EditorOpened { span: index }
    }

    /// The open edit session, if any.
    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    /// Mutable access to the open edit session (for draft edits).
    pub fn session_mut(&mut self) -> Option<&mut EditSession> {
        self.session.as_mut()
    }

    /// Apply the session draft to its span, re-render, and close.
    ///
    /// Returns false if no session is open or the target node is no longer a
    /// formula (the session is dropped without touching the document).
    pub fn confirm_edit(&mut self, doc: &mut Fragment) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        let index = session.span();
        let Some(span) = doc.formula_mut(index) else {
            tracing::debug!(target: "mathspan::tool", index, "edit target vanished, dropping session");
            return false;
        };
        span.set_source(session.into_draft(), &self.renderer);
        true
    }

    /// Discard the session draft and close.
    pub fn cancel_edit(&mut self) {
        self.session = None;
    }

    /// Arm the click-to-edit marker on a span, once.
    pub fn ensure_listener(&self, span: &mut FormulaSpan) {
        if span.arm_listener() {
            tracing::trace!(target: "mathspan::tool", "listener armed");
        }
    }

    /// Arm the marker on every span already in the document.
    ///
    /// Called once after construction to pick up spans that predate the tool
    /// (content loaded from the host's save pipeline).
    pub fn attach_existing(&self, doc: &mut Fragment) {
        for span in doc.formulas_mut() {
            self.ensure_listener(span);
        }
    }

    /// A click on the span at `index` opens its editor, provided its handler
    /// was armed. Clicks on unarmed spans never reach the tool.
    pub fn span_clicked(&mut self, doc: &Fragment, index: usize) -> Activation {
        match doc.formula(index) {
            Some(span) if span.listener_armed() => self.open_editor(doc, index),
            _ => Activation::Ignored(IgnoreReason::NothingSelected),
        }
    }
}
