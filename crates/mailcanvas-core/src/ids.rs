use crate::blocks::{Block, Column};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Source of fresh identifiers. Production code uses [`RandomIds`]; tests can
/// substitute a scripted source to exercise collision handling.
pub trait IdGenerator {
    fn next_id(&mut self, prefix: &str) -> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&mut self, prefix: &str) -> String {
        generate_id(prefix)
    }
}

/// Returns `<prefix>-<millis>-<sequence>-<random>`. The process-wide sequence
/// makes two calls in the same process distinct even within one millisecond.
pub fn generate_id(prefix: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let random = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{millis}-{sequence}-{}", &random[..8])
}

pub fn regenerate_ids(block: &Block) -> Block {
    regenerate_ids_with(block, &mut RandomIds)
}

/// Deep copy of `block` with a fresh id on the block, every column and every
/// nested block. Everything else is copied by value.
pub fn regenerate_ids_with(block: &Block, ids: &mut dyn IdGenerator) -> Block {
    let mut clone = block.clone();
    reassign(&mut clone, ids);
    clone
}

fn reassign(block: &mut Block, ids: &mut dyn IdGenerator) {
    block.id = ids.next_id(block.block_type.as_str());
    if let Some(columns) = block.columns_mut() {
        for column in columns.iter_mut() {
            reassign_column(column, ids);
        }
    }
}

fn reassign_column(column: &mut Column, ids: &mut dyn IdGenerator) {
    column.id = ids.next_id("col");
    for block in column.blocks.iter_mut() {
        reassign(block, ids);
    }
}

/// Every block and column id in `blocks`, in document order, duplicates kept.
pub fn collect_ids(blocks: &[Block]) -> Vec<&str> {
    let mut ids = Vec::new();
    for block in blocks {
        collect_block_ids(block, &mut ids);
    }
    ids
}

fn collect_block_ids<'a>(block: &'a Block, ids: &mut Vec<&'a str>) {
    ids.push(block.id.as_str());
    if let Some(columns) = block.columns() {
        for column in columns {
            ids.push(column.id.as_str());
            for nested in &column.blocks {
                collect_block_ids(nested, ids);
            }
        }
    }
}

pub fn duplicate_ids(blocks: &[Block]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for id in collect_ids(blocks) {
        if !seen.insert(id) && !duplicates.iter().any(|dup: &String| dup == id) {
            duplicates.push(id.to_string());
        }
    }
    duplicates
}

pub fn has_id_collisions(blocks: &[Block]) -> bool {
    let mut seen = HashSet::new();
    collect_ids(blocks).into_iter().any(|id| !seen.insert(id))
}

#[cfg(test)]
mod tests {
    use super::{collect_ids, duplicate_ids, generate_id, has_id_collisions, regenerate_ids};
    use crate::blocks::{Block, BlockType};
    use crate::factory::{create_block, create_columns};
    use std::collections::HashSet;

    fn layout_with_text() -> Block {
        let mut layout = create_columns(2, None);
        let text = create_block(BlockType::Text);
        layout.columns_mut().expect("columns")[0].blocks.push(text);
        layout
    }

    #[test]
    fn generate_id_never_repeats() {
        let ids: HashSet<String> = (0..2_000).map(|_| generate_id("text")).collect();
        assert_eq!(ids.len(), 2_000);
    }

    #[test]
    fn generate_id_keeps_prefix() {
        let id = generate_id("button");
        assert!(id.starts_with("button-"));
    }

    #[test]
    fn regenerate_ids_replaces_every_level() {
        let original = layout_with_text();
        let clone = regenerate_ids(&original);

        let before: HashSet<&str> = collect_ids(std::slice::from_ref(&original))
            .into_iter()
            .collect();
        let after = collect_ids(std::slice::from_ref(&clone));
        assert_eq!(after.len(), 4);
        assert!(after.iter().all(|id| !before.contains(id)));

        let original_columns = original.columns().expect("columns");
        let clone_columns = clone.columns().expect("columns");
        assert_eq!(
            original_columns[0].blocks[0].content,
            clone_columns[0].blocks[0].content
        );
        assert_eq!(original.styling, clone.styling);
        assert_eq!(original.display_options, clone.display_options);
    }

    #[test]
    fn collisions_detected_across_nesting() {
        let layout = layout_with_text();
        let mut stray = create_block(BlockType::Image);
        assert!(!has_id_collisions(&[layout.clone(), stray.clone()]));

        stray.id = layout.columns().expect("columns")[0].blocks[0].id.clone();
        let blocks = vec![layout, stray.clone()];
        assert!(has_id_collisions(&blocks));
        assert_eq!(duplicate_ids(&blocks), vec![stray.id]);
    }
}
