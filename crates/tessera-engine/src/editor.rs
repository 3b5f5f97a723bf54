use std::fmt;
use std::time::Duration;

use log::{debug, warn};
use tessera_model::{Document, Operation, Path, Point, Props, Range, RangeAffinity, RangeRefId};

use crate::error::EditorError;
use crate::identity::IdentityRegistry;
use crate::pending::{PendingAction, PendingState, StringDiff};
use crate::reconcile;
use crate::surface::EditorId;

/// Compatibility shims for hosts whose native selection misbehaves. All off
/// by default.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QuirkOptions {
    /// The host reports a selection as several native ranges (table rows)
    pub multi_range_selection: bool,
    /// The host reports a spurious line break after a trailing newline
    pub trailing_line_break: bool,
    /// The host keeps composed text inside zero-width placeholders
    pub composition_in_placeholder: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FocusPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl Default for FocusPolicy {
    fn default() -> Self {
        FocusPolicy {
            retries: 5,
            delay: Duration::from_millis(10),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorOptions {
    pub quirks: QuirkOptions,
    pub focus: FocusPolicy,
    /// Flushes an identity entry may go unused before it is swept
    pub sweep_age: u64,
}

impl Default for EditorOptions {
    fn default() -> Self {
        EditorOptions {
            quirks: QuirkOptions::default(),
            focus: FocusPolicy::default(),
            sweep_age: 8,
        }
    }
}

type OperationHook = Box<dyn FnMut(&Operation)>;

/// One editor instance: the model document plus everything needed to keep a
/// rendered surface in sync with it.
///
/// Every change goes through [`Editor::apply`], which keeps node keys and
/// pending composition state valid across the operation.
pub struct Editor {
    id: EditorId,
    pub(crate) document: Document,
    pub(crate) registry: IdentityRegistry,
    pending: PendingState,
    options: EditorOptions,
    operations: Vec<Operation>,
    pub(crate) focused: bool,
    user_selection: Option<RangeRefId>,
    marks: Option<Props>,
    on_operation: Option<OperationHook>,
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Editor")
            .field("id", &self.id)
            .field("document", &self.document)
            .field("pending", &self.pending)
            .field("operations", &self.operations.len())
            .field("focused", &self.focused)
            .finish_non_exhaustive()
    }
}

impl Editor {
    pub fn new(document: Document) -> Self {
        Self::with_options(document, EditorOptions::default())
    }

    pub fn with_options(document: Document, options: EditorOptions) -> Self {
        let mut registry = IdentityRegistry::new();
        registry.record_tree(document.root());
        Editor {
            id: EditorId::new(),
            document,
            registry,
            pending: PendingState::default(),
            options,
            operations: Vec::new(),
            focused: false,
            user_selection: None,
            marks: None,
            on_operation: None,
        }
    }

    pub fn id(&self) -> EditorId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn pending(&self) -> &PendingState {
        &self.pending
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Operations applied since the last [`Editor::flush_changes`]
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn has_unflushed_operations(&self) -> bool {
        !self.operations.is_empty()
    }

    pub fn marks(&self) -> Option<&Props> {
        self.marks.as_ref()
    }

    /// Formatting for the next inserted text, rendered as a placeholder at a
    /// collapsed selection
    pub fn set_marks(&mut self, marks: Option<Props>) {
        self.marks = marks;
    }

    pub fn set_on_operation(&mut self, hook: impl FnMut(&Operation) + 'static) {
        self.on_operation = Some(Box::new(hook));
    }

    /// Applies `op` to the document, carrying keys and pending state across.
    ///
    /// When the document rejects the operation nothing else changes either.
    pub fn apply(&mut self, op: Operation) -> Result<(), EditorError> {
        let pending = self.pending.transformed(&op);
        let targets = reconcile::rekey_targets(&op);
        let matches = reconcile::collect_matches(&self.document, &self.registry, &targets);
        let tracked = reconcile::track(&mut self.document, &self.registry, &targets);
        debug!(
            "{}: {} key(s) to hand over{}",
            op.kind(),
            matches.len(),
            if tracked.is_some() { " plus a tracked parent" } else { "" }
        );

        if let Err(err) = self.document.apply(&op) {
            if let Some((id, _)) = tracked {
                self.document.unref_path(id);
            }
            return Err(err.into());
        }

        if targets.release_user_selection {
            if let Some(id) = self.user_selection.take() {
                self.document.unref_range(id);
            }
            self.marks = None;
        }
        self.pending = pending;
        reconcile::restore(&self.document, &mut self.registry, matches);
        if let Some(tracked) = tracked {
            reconcile::restore_tracked(&mut self.document, &mut self.registry, tracked);
        }
        self.registry.record_changes(self.document.root());

        if let Some(hook) = self.on_operation.as_mut() {
            hook(&op);
        }
        self.operations.push(op);
        Ok(())
    }

    /// Hands out the operations applied since the last call and sweeps
    /// identity entries that went unused for too long.
    pub fn flush_changes(&mut self) -> Vec<Operation> {
        let operations = std::mem::take(&mut self.operations);
        self.registry.record_tree(self.document.root());
        self.registry.sweep(self.options.sweep_age);
        operations
    }

    /// Records surface text the model has not caught up with yet
    pub fn push_pending_diff(&mut self, path: Path, diff: StringDiff) -> u64 {
        self.pending.push_diff(path, diff)
    }

    pub fn set_pending_selection(&mut self, selection: Option<Range>) {
        self.pending.set_selection(selection);
    }

    pub fn set_pending_action(&mut self, action: Option<PendingAction>) {
        self.pending.set_action(action);
    }

    pub fn request_flush(&mut self) {
        self.pending.request_flush();
    }

    /// Applies everything pending: the diffs, then the selection, then the
    /// action.
    pub fn flush_pending(&mut self) -> Result<(), EditorError> {
        let pending = self.pending.take();

        for text_diff in pending.diffs() {
            let path = &text_diff.path;
            let diff = &text_diff.diff;
            if diff.end > diff.start {
                let leaf = self.document.leaf(path)?;
                let removed = leaf
                    .text()
                    .chars()
                    .skip(diff.start)
                    .take(diff.end - diff.start)
                    .collect();
                self.apply(Operation::RemoveText {
                    path: path.clone(),
                    offset: diff.start,
                    text: removed,
                })?;
            }
            if !diff.text.is_empty() {
                self.apply(Operation::InsertText {
                    path: path.clone(),
                    offset: diff.start,
                    text: diff.text.clone(),
                })?;
            }
        }

        if let Some(selection) = pending.selection() {
            self.select(selection.clone())?;
        }

        match pending.action() {
            Some(PendingAction::InsertText { at, text }) => {
                self.apply(Operation::InsertText {
                    path: at.path.clone(),
                    offset: at.offset,
                    text: text.clone(),
                })?;
            }
            Some(PendingAction::ReplaceText { at, text }) => {
                let (start, end) = at.edges();
                if start.path != end.path {
                    warn!("dropping pending replace across leaves {start} to {end}");
                } else {
                    self.replace_in_leaf(&start, end.offset, text)?;
                }
            }
            None => {}
        }
        Ok(())
    }

    fn replace_in_leaf(
        &mut self,
        start: &Point,
        end: usize,
        text: &str,
    ) -> Result<(), EditorError> {
        let removed: String = self
            .document
            .leaf(&start.path)?
            .text()
            .chars()
            .skip(start.offset)
            .take(end - start.offset)
            .collect();
        if !removed.is_empty() {
            self.apply(Operation::RemoveText {
                path: start.path.clone(),
                offset: start.offset,
                text: removed,
            })?;
        }
        if !text.is_empty() {
            self.apply(Operation::InsertText {
                path: start.path.clone(),
                offset: start.offset,
                text: text.to_string(),
            })?;
        }
        Ok(())
    }

    /// Moves the model selection to `range`
    pub fn select(&mut self, range: Range) -> Result<(), EditorError> {
        let properties = self.document.selection().cloned();
        self.apply(Operation::SetSelection {
            properties,
            new_properties: Some(range),
        })
    }

    /// Remembers the current selection so it survives edits, until the next
    /// selection change.
    pub fn capture_user_selection(&mut self) {
        if let Some(id) = self.user_selection.take() {
            self.document.unref_range(id);
        }
        self.user_selection = self
            .document
            .selection()
            .cloned()
            .map(|range| self.document.range_ref(range, RangeAffinity::Inward));
    }

    pub fn user_selection(&self) -> Option<&Range> {
        self.document.range_ref_current(self.user_selection?)
    }
}
