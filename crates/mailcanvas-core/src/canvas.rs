//! The interactive canvas: routes host events to the drag classifier, the
//! tree mutations and the hover machine, and walks the document for the
//! host's renderer.

use crate::blocks::Block;
use crate::config::CanvasConfig;
use crate::controls::{locate_controls, ControlsPlacement, LayoutProbe};
use crate::document::Document;
use crate::drag::{classify, drop_index, parse_drop_payload, DragKind, DragSource, DropPayload};
use crate::geometry::Rect;
use crate::hover::{HoverChange, HoverMachine, HoverPhase};
use crate::snippets::SnippetPersistence;
use crate::tree::{self, BlockPatch, DropTarget, EditError};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Where the pointer is during a drag or at the drop, in host terms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "zone", rename_all = "camelCase")]
pub enum DropPoint {
    #[serde(rename_all = "camelCase")]
    Canvas { cursor_y: f64 },
    #[serde(rename_all = "camelCase")]
    Column {
        layout_id: String,
        column_index: usize,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ControlAction {
    Duplicate,
    Delete,
    MoveUp,
    MoveDown,
    ToggleSnippet,
}

/// Host events, one variant per handler on [`Canvas`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum CanvasEvent {
    DragStart {
        source: DragSource,
    },
    DragOver {
        point: DropPoint,
    },
    DragLeave,
    DragEnd,
    Drop {
        payload: String,
        point: DropPoint,
    },
    #[serde(rename_all = "camelCase")]
    MouseEnterBlock {
        block_id: String,
    },
    #[serde(rename_all = "camelCase")]
    MouseLeaveBlock {
        block_id: String,
    },
    MouseEnterControls,
    MouseLeaveControls,
    MouseLeaveCanvas,
    #[serde(rename_all = "camelCase")]
    Click {
        block_id: String,
    },
    #[serde(rename_all = "camelCase")]
    DoubleClick {
        block_id: String,
    },
    Scroll,
    Resize,
    Control {
        action: ControlAction,
    },
    Tick,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderFlags {
    pub is_selected: bool,
    pub is_editing: bool,
    /// Set on the top-level block a pending drop would land before.
    pub drop_before: Option<DragKind>,
}

/// Host-supplied renderer. The canvas calls it once per block in document
/// order, descending into the columns of `columns` blocks.
pub trait BlockRenderer {
    fn render_block(&mut self, block: &Block, flags: RenderFlags);

    fn end_block(&mut self, _block: &Block) {}

    fn enter_column(&mut self, _layout: &Block, _column_index: usize, _highlight: Option<DragKind>) {}

    fn exit_column(&mut self, _layout: &Block, _column_index: usize) {}

    /// Drop indicator after the last top-level block.
    fn render_drop_at_end(&mut self, _kind: DragKind) {}
}

/// Collaborators the canvas reaches for while handling an event.
pub struct CanvasHost<'a> {
    pub probe: &'a dyn LayoutProbe,
    pub snippets: &'a mut dyn SnippetPersistence,
}

#[derive(Clone, Debug, PartialEq)]
struct DragSession {
    kind: DragKind,
    over: Option<DropTarget>,
}

pub struct Canvas {
    document: Document,
    config: CanvasConfig,
    hover: HoverMachine,
    drag: Option<DragSession>,
    editing: Option<String>,
    controls: Option<ControlsPlacement>,
}

impl Canvas {
    pub fn new(document: Document, config: CanvasConfig) -> Self {
        let hover = HoverMachine::new(config.hover());
        Self {
            document,
            config,
            hover,
            drag: None,
            editing: None,
            controls: None,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn selected(&self) -> Option<&str> {
        self.hover.selected()
    }

    pub fn editing(&self) -> Option<&str> {
        self.editing.as_deref()
    }

    pub fn controls(&self) -> Option<ControlsPlacement> {
        self.controls
    }

    pub fn hover_phase(&self) -> HoverPhase {
        self.hover.phase()
    }

    pub fn drag_kind(&self) -> Option<DragKind> {
        self.drag.as_ref().map(|session| session.kind)
    }

    pub fn drop_highlight(&self) -> Option<(DragKind, &DropTarget)> {
        let session = self.drag.as_ref()?;
        session.over.as_ref().map(|target| (session.kind, target))
    }

    /// When the host should call [`Canvas::tick`] next.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.hover.next_deadline()
    }

    /// Dispatches one host event. Hover deadlines that passed before `now`
    /// fire first, so a late event never sees controls that should be hidden.
    pub fn handle(&mut self, event: CanvasEvent, now: Instant, host: &mut CanvasHost<'_>) -> bool {
        tracing::trace!(?event, "canvas event");
        if self.next_deadline().is_some_and(|deadline| deadline <= now) {
            self.tick(now, host.probe);
        }
        match event {
            CanvasEvent::DragStart { source } => {
                self.on_drag_start(&source);
                false
            }
            CanvasEvent::DragOver { point } => {
                self.on_drag_over(&point, host.probe);
                false
            }
            CanvasEvent::DragLeave => {
                self.on_drag_leave();
                false
            }
            CanvasEvent::DragEnd => {
                self.on_drag_end();
                false
            }
            CanvasEvent::Drop { payload, point } => self.on_drop(&payload, &point, now, host.probe),
            CanvasEvent::MouseEnterBlock { block_id } => {
                self.on_mouse_enter_block(&block_id, now, host.probe);
                false
            }
            CanvasEvent::MouseLeaveBlock { block_id } => {
                self.on_mouse_leave_block(&block_id, now);
                false
            }
            CanvasEvent::MouseEnterControls => {
                self.on_mouse_enter_controls();
                false
            }
            CanvasEvent::MouseLeaveControls => {
                self.on_mouse_leave_controls(now);
                false
            }
            CanvasEvent::MouseLeaveCanvas => {
                self.on_mouse_leave_canvas(now);
                false
            }
            CanvasEvent::Click { block_id } => {
                self.on_click(&block_id, host.probe);
                false
            }
            CanvasEvent::DoubleClick { block_id } => {
                self.on_double_click(&block_id, host.probe);
                false
            }
            CanvasEvent::Scroll | CanvasEvent::Resize => {
                self.refresh_controls(host.probe);
                false
            }
            CanvasEvent::Control { action } => self.on_control(action, host),
            CanvasEvent::Tick => {
                self.tick(now, host.probe);
                false
            }
        }
    }

    pub fn on_drag_start(&mut self, source: &DragSource) {
        let kind = classify(source);
        tracing::debug!(?kind, "drag started");
        self.drag = Some(DragSession { kind, over: None });
    }

    pub fn on_drag_over(&mut self, point: &DropPoint, probe: &dyn LayoutProbe) {
        let target = self.resolve_target(point, probe);
        if let Some(session) = self.drag.as_mut() {
            session.over = Some(target);
        }
    }

    pub fn on_drag_leave(&mut self) {
        if let Some(session) = self.drag.as_mut() {
            session.over = None;
        }
    }

    pub fn on_drag_end(&mut self) {
        self.drag = None;
    }

    /// Index among the rendered top-level blocks, mapped back to document
    /// order. Blocks the host does not report are skipped.
    fn canvas_index(&self, cursor_y: f64, probe: &dyn LayoutProbe) -> Option<usize> {
        let measured: Vec<(usize, Rect)> = self
            .document
            .blocks
            .iter()
            .enumerate()
            .filter_map(|(index, block)| probe.block_rect(&block.id).map(|rect| (index, rect)))
            .collect();
        let rects: Vec<Rect> = measured.iter().map(|(_, rect)| *rect).collect();
        drop_index(cursor_y, &rects).map(|position| measured[position].0)
    }

    fn resolve_target(&self, point: &DropPoint, probe: &dyn LayoutProbe) -> DropTarget {
        match point {
            DropPoint::Canvas { cursor_y } => DropTarget::Canvas {
                index: self.canvas_index(*cursor_y, probe),
            },
            DropPoint::Column {
                layout_id,
                column_index,
            } => DropTarget::Column {
                layout_id: layout_id.clone(),
                column_index: *column_index,
            },
        }
    }

    /// Applies a drop. The payload is parsed here rather than trusting the
    /// classification made at drag start.
    pub fn on_drop(
        &mut self,
        raw_payload: &str,
        point: &DropPoint,
        now: Instant,
        probe: &dyn LayoutProbe,
    ) -> bool {
        self.drag = None;
        let Some(payload) = parse_drop_payload(raw_payload) else {
            tracing::debug!(error = ?EditError::MalformedPayload, "drop ignored");
            return false;
        };
        let target = self.resolve_target(point, probe);
        match tree::apply_drop(&self.document, &payload, &target, self.config.max_columns) {
            Ok((next, block_id)) => {
                tracing::debug!(block_id = %block_id, ?target, "drop applied");
                self.document = next;
                if matches!(payload, DropPayload::NewBlock(_)) {
                    self.hover.mark_dropped(&block_id, now);
                }
                self.sync_with_document(probe);
                true
            }
            Err(err) => {
                tracing::debug!(error = ?err, ?target, "drop ignored");
                false
            }
        }
    }

    pub fn on_mouse_enter_block(&mut self, block_id: &str, now: Instant, probe: &dyn LayoutProbe) {
        if !self.document.contains(block_id) {
            return;
        }
        if self.hover.enter_block(block_id, now) {
            self.refresh_controls(probe);
        }
    }

    pub fn on_mouse_leave_block(&mut self, block_id: &str, now: Instant) {
        self.hover.leave_block(block_id, now);
    }

    pub fn on_mouse_enter_controls(&mut self) {
        self.hover.enter_controls();
    }

    pub fn on_mouse_leave_controls(&mut self, now: Instant) {
        self.hover.leave_controls(now);
    }

    pub fn on_mouse_leave_canvas(&mut self, now: Instant) {
        self.hover.leave_canvas(now);
    }

    pub fn on_click(&mut self, block_id: &str, probe: &dyn LayoutProbe) {
        if !self.document.contains(block_id) {
            return;
        }
        if self.editing.as_deref().is_some_and(|editing| editing != block_id) {
            self.editing = None;
        }
        self.hover.select(block_id);
        self.refresh_controls(probe);
    }

    pub fn on_double_click(&mut self, block_id: &str, probe: &dyn LayoutProbe) {
        if !self.document.contains(block_id) {
            return;
        }
        self.hover.select(block_id);
        self.editing = Some(block_id.to_string());
        self.refresh_controls(probe);
    }

    /// Fires due hover deadlines.
    pub fn tick(&mut self, now: Instant, probe: &dyn LayoutProbe) {
        let changes = self.hover.poll(now);
        if changes.is_empty() {
            return;
        }
        for change in &changes {
            match change {
                HoverChange::Hidden(block_id) => {
                    tracing::trace!(block_id = %block_id, "controls hidden")
                }
                HoverChange::Selected(block_id) => {
                    tracing::trace!(block_id = %block_id, "settled block selected")
                }
            }
        }
        self.refresh_controls(probe);
    }

    pub fn refresh_controls(&mut self, probe: &dyn LayoutProbe) {
        let placement = self.config.placement();
        self.controls = self
            .hover
            .selected()
            .and_then(|block_id| locate_controls(probe, block_id, &placement));
    }

    /// Clears hover, editing and controls state that points at blocks no
    /// longer in the document.
    fn sync_with_document(&mut self, probe: &dyn LayoutProbe) {
        if let Some(selected) = self.hover.selected().map(str::to_string) {
            if !self.document.contains(&selected) {
                self.hover.forget(&selected);
            }
        }
        if let Some(hovered) = self.hover.hovered().map(str::to_string) {
            if !self.document.contains(&hovered) {
                self.hover.forget(&hovered);
            }
        }
        if let Some(editing) = self.editing.clone() {
            if !self.document.contains(&editing) {
                self.editing = None;
            }
        }
        self.refresh_controls(probe);
    }

    fn commit(&mut self, result: Result<Document, EditError>, probe: &dyn LayoutProbe) -> bool {
        match result {
            Ok(next) => {
                self.document = next;
                self.sync_with_document(probe);
                true
            }
            Err(err) => {
                tracing::debug!(error = ?err, "edit ignored");
                false
            }
        }
    }

    pub fn on_control(&mut self, action: ControlAction, host: &mut CanvasHost<'_>) -> bool {
        let Some(block_id) = self.hover.selected().map(str::to_string) else {
            tracing::debug!(?action, "control action without selection");
            return false;
        };
        match action {
            ControlAction::Duplicate => self.duplicate(&block_id, host.probe).is_some(),
            ControlAction::Delete => self.delete(&block_id, host.probe),
            ControlAction::MoveUp => {
                let result = tree::move_block_by(&self.document, &block_id, -1);
                self.commit(result, host.probe)
            }
            ControlAction::MoveDown => {
                let result = tree::move_block_by(&self.document, &block_id, 1);
                self.commit(result, host.probe)
            }
            ControlAction::ToggleSnippet => self.toggle_snippet(&block_id, host),
        }
    }

    /// Returns the id of the copy.
    pub fn duplicate(&mut self, block_id: &str, probe: &dyn LayoutProbe) -> Option<String> {
        match tree::duplicate_block(&self.document, block_id) {
            Ok((next, copy_id)) => {
                tracing::debug!(block_id, copy_id = %copy_id, "block duplicated");
                self.document = next;
                self.sync_with_document(probe);
                Some(copy_id)
            }
            Err(EditError::IdCollision(ids)) => {
                tracing::warn!(block_id, ?ids, "duplicate aborted on id collision");
                None
            }
            Err(err) => {
                tracing::debug!(error = ?err, "duplicate ignored");
                None
            }
        }
    }

    pub fn delete(&mut self, block_id: &str, probe: &dyn LayoutProbe) -> bool {
        let result = tree::delete_block(&self.document, block_id);
        if result.is_ok() {
            self.hover.forget(block_id);
        }
        self.commit(result, probe)
    }

    pub fn insert_block(&mut self, block: Block, target: &DropTarget, probe: &dyn LayoutProbe) -> bool {
        let result = tree::insert_block(&self.document, block, target);
        self.commit(result, probe)
    }

    pub fn patch(&mut self, block_id: &str, patch: &BlockPatch, probe: &dyn LayoutProbe) -> bool {
        let result = tree::patch_block(&self.document, block_id, patch);
        self.commit(result, probe)
    }

    /// Saves or removes the block's snippet, then mirrors the outcome in
    /// `isStarred`. A failed persistence call leaves the flag unchanged.
    pub fn toggle_snippet(&mut self, block_id: &str, host: &mut CanvasHost<'_>) -> bool {
        let Some(block) = self.document.find(block_id) else {
            return false;
        };
        let starring = !block.is_starred;
        let saved = if starring {
            host.snippets.save_snippet(block)
        } else {
            host.snippets.remove_snippet(block_id)
        };
        if let Err(err) = saved {
            tracing::warn!(block_id, error = ?err, "snippet persistence failed");
            return false;
        }
        let result = tree::patch_block(&self.document, block_id, &BlockPatch::starred(starring));
        self.commit(result, host.probe)
    }

    /// Teardown. Pending hide and settle deadlines are dropped so nothing
    /// fires afterwards.
    pub fn close(&mut self) {
        self.hover.reset();
        self.drag = None;
        self.editing = None;
        self.controls = None;
    }

    pub fn render(&self, renderer: &mut dyn BlockRenderer) {
        let highlight = self.drop_highlight();
        let canvas_drop = match highlight {
            Some((kind, DropTarget::Canvas { index })) => Some((kind, *index)),
            _ => None,
        };
        let mut drop_rendered = false;

        for (index, block) in self.document.blocks.iter().enumerate() {
            let drop_before = match canvas_drop {
                Some((kind, Some(at))) if at == index => {
                    drop_rendered = true;
                    Some(kind)
                }
                _ => None,
            };
            self.render_tree(block, drop_before, highlight, renderer);
        }

        if let Some((kind, _)) = canvas_drop {
            if !drop_rendered {
                renderer.render_drop_at_end(kind);
            }
        }
    }

    fn render_tree(
        &self,
        block: &Block,
        drop_before: Option<DragKind>,
        highlight: Option<(DragKind, &DropTarget)>,
        renderer: &mut dyn BlockRenderer,
    ) {
        let flags = RenderFlags {
            is_selected: self.hover.selected() == Some(block.id.as_str()),
            is_editing: self.editing.as_deref() == Some(block.id.as_str()),
            drop_before,
        };
        renderer.render_block(block, flags);
        if let Some(columns) = block.columns() {
            for (column_index, column) in columns.iter().enumerate() {
                let column_highlight = match highlight {
                    Some((
                        kind,
                        DropTarget::Column {
                            layout_id,
                            column_index: target_column,
                        },
                    )) if *layout_id == block.id && *target_column == column_index => Some(kind),
                    _ => None,
                };
                renderer.enter_column(block, column_index, column_highlight);
                for nested in &column.blocks {
                    self.render_tree(nested, None, None, renderer);
                }
                renderer.exit_column(block, column_index);
            }
        }
        renderer.end_block(block);
    }
}
