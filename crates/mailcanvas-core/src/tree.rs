//! Tree mutations for the block document.
//!
//! Every operation takes the current [`Document`] by reference and returns the
//! next one. An `Err` means the operation did not apply; callers keep the
//! document they already have, so a failed drop or a stale id is a no-op.
//!
//! Ownership rule: a block lives in exactly one list (the top level or one
//! column). Moves splice the block out of its old list before inserting it
//! into the new one, on the same working copy.
//!
//! Nesting rule: `columns` blocks live only at the top level. Anything that
//! would put a `columns` block inside a column fails with
//! [`EditError::NestedLayout`].

use crate::blocks::{Block, BlockContent, Breakpoint, Column, DisplayOptions, StyleMap};
use crate::document::{BlockLocation, Document};
use crate::drag::DropPayload;
use crate::factory::{create_from_drag_data, fill_defaults};
use crate::ids::{collect_ids, has_id_collisions, regenerate_ids_with, IdGenerator, RandomIds};
use serde_json::{Map, Value};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    BlockNotFound(String),
    UnknownBlockType(Option<String>),
    MalformedPayload,
    ColumnNotFound { layout_id: String, column_index: usize },
    NestedLayout(String),
    IdCollision(Vec<String>),
    AtBoundary(String),
}

/// Where a drop lands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropTarget {
    /// Top level. `None` or an index past the end appends.
    Canvas { index: Option<usize> },
    Column { layout_id: String, column_index: usize },
}

/// In-place edits. `id` and `type` are deliberately absent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlockPatch {
    pub content: Option<Map<String, Value>>,
    pub styling: Option<(Breakpoint, StyleMap)>,
    pub display_options: Option<DisplayOptions>,
    pub is_starred: Option<bool>,
}

impl BlockPatch {
    pub fn starred(is_starred: bool) -> Self {
        Self {
            is_starred: Some(is_starred),
            ..Self::default()
        }
    }
}

fn insert_at(list: &mut Vec<Block>, block: Block, index: Option<usize>) -> usize {
    match index {
        Some(index) if index < list.len() => {
            list.insert(index, block);
            index
        }
        _ => {
            list.push(block);
            list.len() - 1
        }
    }
}

fn column_mut<'a>(
    blocks: &'a mut [Block],
    layout_id: &str,
    column_index: usize,
) -> Result<&'a mut Column, EditError> {
    let not_found = || EditError::ColumnNotFound {
        layout_id: layout_id.to_string(),
        column_index,
    };
    let layout = blocks
        .iter_mut()
        .find(|block| block.id == layout_id)
        .ok_or_else(|| EditError::BlockNotFound(layout_id.to_string()))?;
    let columns = layout.columns_mut().ok_or_else(not_found)?;
    columns.get_mut(column_index).ok_or_else(not_found)
}

fn ensure_column_exists(
    document: &Document,
    layout_id: &str,
    column_index: usize,
) -> Result<(), EditError> {
    let layout = document
        .blocks
        .iter()
        .find(|block| block.id == layout_id)
        .ok_or_else(|| EditError::BlockNotFound(layout_id.to_string()))?;
    match layout.columns() {
        Some(columns) if column_index < columns.len() => Ok(()),
        _ => Err(EditError::ColumnNotFound {
            layout_id: layout_id.to_string(),
            column_index,
        }),
    }
}

fn ensure_fresh_ids(document: &Document, block: &Block) -> Result<(), EditError> {
    let existing: HashSet<&str> = document.all_ids().into_iter().collect();
    let incoming = collect_ids(std::slice::from_ref(block));
    let clashes: Vec<String> = incoming
        .iter()
        .filter(|id| existing.contains(*id))
        .map(|id| id.to_string())
        .collect();
    if !clashes.is_empty() {
        return Err(EditError::IdCollision(clashes));
    }
    if has_id_collisions(std::slice::from_ref(block)) {
        return Err(EditError::IdCollision(vec![block.id.clone()]));
    }
    Ok(())
}

/// A `columns` block may only hold plain blocks in its columns.
fn ensure_flat_columns(block: &Block) -> Result<(), EditError> {
    let Some(columns) = block.columns() else {
        return Ok(());
    };
    let nested = columns
        .iter()
        .flat_map(|column| column.blocks.iter())
        .find(|nested| nested.is_layout());
    match nested {
        Some(nested) => Err(EditError::NestedLayout(nested.id.clone())),
        None => Ok(()),
    }
}

/// Splices `block_id` out of whichever list owns it.
fn take_block(blocks: &mut Vec<Block>, location: &BlockLocation) -> Option<Block> {
    match *location {
        BlockLocation::TopLevel { index } => {
            (index < blocks.len()).then(|| blocks.remove(index))
        }
        BlockLocation::Column {
            layout_index,
            column_index,
            index,
        } => {
            let column = blocks
                .get_mut(layout_index)?
                .columns_mut()?
                .get_mut(column_index)?;
            (index < column.blocks.len()).then(|| column.blocks.remove(index))
        }
    }
}

pub fn insert_top_level(
    document: &Document,
    block: Block,
    target_index: Option<usize>,
) -> Result<Document, EditError> {
    ensure_flat_columns(&block)?;
    let block = fill_defaults(block);
    ensure_fresh_ids(document, &block)?;
    let mut next = document.clone();
    insert_at(&mut next.blocks, block, target_index);
    Ok(next)
}

/// Removes a top-level block and re-inserts it at `target_index`, which is
/// read against the list after removal. Nested blocks are not reached.
pub fn move_top_level(
    document: &Document,
    block_id: &str,
    target_index: Option<usize>,
) -> Result<Document, EditError> {
    let index = document
        .blocks
        .iter()
        .position(|block| block.id == block_id)
        .ok_or_else(|| EditError::BlockNotFound(block_id.to_string()))?;
    let mut next = document.clone();
    let block = next.blocks.remove(index);
    insert_at(&mut next.blocks, block, target_index);
    Ok(next)
}

pub fn insert_into_column(
    document: &Document,
    layout_id: &str,
    column_index: usize,
    block: Block,
) -> Result<Document, EditError> {
    if block.is_layout() {
        return Err(EditError::NestedLayout(block.id));
    }
    ensure_column_exists(document, layout_id, column_index)?;
    let block = fill_defaults(block);
    ensure_fresh_ids(document, &block)?;
    let mut next = document.clone();
    column_mut(&mut next.blocks, layout_id, column_index)?
        .blocks
        .push(block);
    Ok(next)
}

/// Moves an existing block to the end of a column. Columns are searched
/// before the top level.
pub fn move_into_column(
    document: &Document,
    layout_id: &str,
    column_index: usize,
    block_id: &str,
) -> Result<Document, EditError> {
    ensure_column_exists(document, layout_id, column_index)?;
    let location = document
        .locate_in_columns(block_id)
        .or_else(|| {
            document
                .blocks
                .iter()
                .position(|block| block.id == block_id)
                .map(|index| BlockLocation::TopLevel { index })
        })
        .ok_or_else(|| EditError::BlockNotFound(block_id.to_string()))?;
    if document.find(block_id).is_some_and(Block::is_layout) {
        return Err(EditError::NestedLayout(block_id.to_string()));
    }

    let mut next = document.clone();
    let block = take_block(&mut next.blocks, &location)
        .ok_or_else(|| EditError::BlockNotFound(block_id.to_string()))?;
    column_mut(&mut next.blocks, layout_id, column_index)?
        .blocks
        .push(block);
    Ok(next)
}

pub fn insert_block(
    document: &Document,
    block: Block,
    target: &DropTarget,
) -> Result<Document, EditError> {
    match target {
        DropTarget::Canvas { index } => insert_top_level(document, block, *index),
        DropTarget::Column {
            layout_id,
            column_index,
        } => insert_into_column(document, layout_id, *column_index, block),
    }
}

/// Resolves a drop payload against a target. Returns the next document and
/// the id of the block that was created or moved.
pub fn apply_drop(
    document: &Document,
    payload: &DropPayload,
    target: &DropTarget,
    max_columns: usize,
) -> Result<(Document, String), EditError> {
    match payload {
        DropPayload::NewBlock(request) => {
            let block = create_from_drag_data(request, max_columns)
                .ok_or_else(|| EditError::UnknownBlockType(request.block_type.clone()))?;
            let block_id = block.id.clone();
            let next = insert_block(document, block, target)?;
            Ok((next, block_id))
        }
        DropPayload::Existing(block_id) => {
            let next = match target {
                DropTarget::Canvas { index } => move_top_level(document, block_id, *index)?,
                DropTarget::Column {
                    layout_id,
                    column_index,
                } => move_into_column(document, layout_id, *column_index, block_id)?,
            };
            Ok((next, block_id.clone()))
        }
    }
}

/// Removes `block_id` from the top level and from every column. The column
/// pass runs whether or not the top level held the block.
pub fn delete_block(document: &Document, block_id: &str) -> Result<Document, EditError> {
    if !document.contains(block_id) {
        return Err(EditError::BlockNotFound(block_id.to_string()));
    }
    let mut next = document.clone();
    next.blocks.retain(|block| block.id != block_id);
    for layout in next.blocks.iter_mut() {
        if let Some(columns) = layout.columns_mut() {
            for column in columns.iter_mut() {
                column.blocks.retain(|block| block.id != block_id);
            }
        }
    }
    Ok(next)
}

pub fn duplicate_block(document: &Document, block_id: &str) -> Result<(Document, String), EditError> {
    duplicate_block_with(document, block_id, &mut RandomIds)
}

/// Inserts a copy with fresh ids right after the original, in the same list.
/// A colliding copy is regenerated once; a second collision aborts.
pub fn duplicate_block_with(
    document: &Document,
    block_id: &str,
    ids: &mut dyn IdGenerator,
) -> Result<(Document, String), EditError> {
    let location = document
        .locate(block_id)
        .ok_or_else(|| EditError::BlockNotFound(block_id.to_string()))?;
    let original = document
        .find(block_id)
        .ok_or_else(|| EditError::BlockNotFound(block_id.to_string()))?;

    for attempt in 0..2 {
        let clone = fill_defaults(regenerate_ids_with(original, ids));
        let clone_id = clone.id.clone();
        let mut next = document.clone();
        match location {
            BlockLocation::TopLevel { index } => {
                next.blocks.insert(index + 1, clone);
            }
            BlockLocation::Column {
                layout_index,
                column_index,
                index,
            } => {
                let column = next.blocks[layout_index]
                    .columns_mut()
                    .and_then(|columns| columns.get_mut(column_index))
                    .ok_or_else(|| EditError::BlockNotFound(block_id.to_string()))?;
                column.blocks.insert(index + 1, clone);
            }
        }
        if !has_id_collisions(&next.blocks) {
            return Ok((next, clone_id));
        }
        tracing::debug!(block_id, attempt, "duplicate produced colliding ids, regenerating");
    }

    tracing::warn!(block_id, "duplicate still collides after retry, aborting");
    Err(EditError::IdCollision(vec![block_id.to_string()]))
}

fn merge_content(content: &mut BlockContent, patch: &Map<String, Value>) {
    match content {
        BlockContent::Fields(fields) => {
            for (key, value) in patch {
                fields.insert(key.clone(), value.clone());
            }
        }
        BlockContent::Layout(layout) => {
            for (key, value) in patch {
                match key.as_str() {
                    "columns" => {}
                    "columnRatio" => {
                        if let Some(ratio) = value.as_str() {
                            layout.column_ratio = ratio.to_string();
                        }
                    }
                    "gap" => {
                        if let Some(gap) = value.as_u64().and_then(|gap| u32::try_from(gap).ok()) {
                            layout.gap = gap;
                        }
                    }
                    _ => {
                        layout.extra.insert(key.clone(), value.clone());
                    }
                }
            }
        }
    }
}

pub fn patch_block(
    document: &Document,
    block_id: &str,
    patch: &BlockPatch,
) -> Result<Document, EditError> {
    let mut next = document.clone();
    let block = next
        .find_mut(block_id)
        .ok_or_else(|| EditError::BlockNotFound(block_id.to_string()))?;
    if let Some(content) = &patch.content {
        merge_content(&mut block.content, content);
    }
    if let Some((breakpoint, styles)) = &patch.styling {
        let target = block.styling.get_mut(*breakpoint);
        for (key, value) in styles {
            target.insert(key.clone(), value.clone());
        }
    }
    if let Some(display_options) = patch.display_options {
        block.display_options = display_options;
    }
    if let Some(is_starred) = patch.is_starred {
        block.is_starred = is_starred;
    }
    Ok(next)
}

/// Moves a block one slot up (`direction < 0`) or down inside the list that
/// owns it. Moving past either end is not applied.
pub fn move_block_by(
    document: &Document,
    block_id: &str,
    direction: i32,
) -> Result<Document, EditError> {
    let location = document
        .locate(block_id)
        .ok_or_else(|| EditError::BlockNotFound(block_id.to_string()))?;
    let mut next = document.clone();
    let (list, index) = match location {
        BlockLocation::TopLevel { index } => (&mut next.blocks, index),
        BlockLocation::Column {
            layout_index,
            column_index,
            index,
        } => {
            let column = next.blocks[layout_index]
                .columns_mut()
                .and_then(|columns| columns.get_mut(column_index))
                .ok_or_else(|| EditError::BlockNotFound(block_id.to_string()))?;
            (&mut column.blocks, index)
        }
    };
    let target = match direction.signum() {
        -1 if index > 0 => index - 1,
        1 if index + 1 < list.len() => index + 1,
        _ => return Err(EditError::AtBoundary(block_id.to_string())),
    };
    list.swap(index, target);
    Ok(next)
}
