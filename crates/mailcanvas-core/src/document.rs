use crate::blocks::Block;
use crate::ids::{collect_ids, duplicate_ids};
use serde::{Deserialize, Serialize};

/// Where a block lives: directly on the canvas, or inside one column of a
/// top-level `columns` block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockLocation {
    TopLevel {
        index: usize,
    },
    Column {
        layout_index: usize,
        column_index: usize,
        index: usize,
    },
}

#[derive(Debug, PartialEq)]
pub enum DocumentError {
    DuplicateIds(Vec<String>),
    NestedLayout { block_id: String },
    Serde(String),
}

impl From<serde_json::Error> for DocumentError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

/// The ordered list of top-level blocks. This is the whole canvas state.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn from_json(raw: &str) -> Result<Self, DocumentError> {
        let document: Document = serde_json::from_str(raw)?;
        document.validate()?;
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn top_level_ids(&self) -> Vec<&str> {
        self.blocks.iter().map(|block| block.id.as_str()).collect()
    }

    /// Block and column ids across the whole tree, in document order.
    pub fn all_ids(&self) -> Vec<&str> {
        collect_ids(&self.blocks)
    }

    /// Number of blocks, nested blocks included. Columns are not counted.
    pub fn block_count(&self) -> usize {
        let mut count = 0;
        for block in &self.blocks {
            block.visit(&mut |_| count += 1);
        }
        count
    }

    pub fn locate(&self, block_id: &str) -> Option<BlockLocation> {
        if let Some(index) = self.blocks.iter().position(|block| block.id == block_id) {
            return Some(BlockLocation::TopLevel { index });
        }
        self.locate_in_columns(block_id)
    }

    pub fn locate_in_columns(&self, block_id: &str) -> Option<BlockLocation> {
        for (layout_index, layout) in self.blocks.iter().enumerate() {
            let Some(columns) = layout.columns() else {
                continue;
            };
            for (column_index, column) in columns.iter().enumerate() {
                if let Some(index) = column.blocks.iter().position(|block| block.id == block_id) {
                    return Some(BlockLocation::Column {
                        layout_index,
                        column_index,
                        index,
                    });
                }
            }
        }
        None
    }

    pub fn find(&self, block_id: &str) -> Option<&Block> {
        match self.locate(block_id)? {
            BlockLocation::TopLevel { index } => self.blocks.get(index),
            BlockLocation::Column {
                layout_index,
                column_index,
                index,
            } => self.blocks[layout_index].columns()?[column_index].blocks.get(index),
        }
    }

    pub fn find_mut(&mut self, block_id: &str) -> Option<&mut Block> {
        match self.locate(block_id)? {
            BlockLocation::TopLevel { index } => self.blocks.get_mut(index),
            BlockLocation::Column {
                layout_index,
                column_index,
                index,
            } => self.blocks[layout_index].columns_mut()?[column_index]
                .blocks
                .get_mut(index),
        }
    }

    pub fn contains(&self, block_id: &str) -> bool {
        self.locate(block_id).is_some()
    }

    pub fn position_of_layout(&self, layout_id: &str) -> Option<usize> {
        self.blocks
            .iter()
            .position(|block| block.id == layout_id && block.is_layout())
    }

    /// Checks that ids are pairwise distinct and that no `columns` block sits
    /// inside a column.
    pub fn validate(&self) -> Result<(), DocumentError> {
        let duplicates = duplicate_ids(&self.blocks);
        if !duplicates.is_empty() {
            return Err(DocumentError::DuplicateIds(duplicates));
        }
        for layout in &self.blocks {
            let Some(columns) = layout.columns() else {
                continue;
            };
            for column in columns {
                if let Some(nested) = column.blocks.iter().find(|block| block.is_layout()) {
                    return Err(DocumentError::NestedLayout {
                        block_id: nested.id.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockLocation, Document, DocumentError};
    use crate::blocks::BlockType;
    use crate::factory::{create_block, create_columns};

    fn sample() -> (Document, String, String) {
        let text = create_block(BlockType::Text);
        let mut layout = create_columns(2, None);
        let nested = create_block(BlockType::Button);
        let nested_id = nested.id.clone();
        layout.columns_mut().expect("columns")[1].blocks.push(nested);
        let text_id = text.id.clone();
        (Document::new(vec![text, layout]), text_id, nested_id)
    }

    #[test]
    fn locate_finds_top_level_and_nested() {
        let (document, text_id, nested_id) = sample();
        assert_eq!(
            document.locate(&text_id),
            Some(BlockLocation::TopLevel { index: 0 })
        );
        assert_eq!(
            document.locate(&nested_id),
            Some(BlockLocation::Column {
                layout_index: 1,
                column_index: 1,
                index: 0
            })
        );
        assert!(document.locate("missing").is_none());
        assert_eq!(
            document.find(&nested_id).map(|block| block.block_type),
            Some(BlockType::Button)
        );
    }

    #[test]
    fn block_count_includes_nested_blocks() {
        let (document, _, _) = sample();
        assert_eq!(document.len(), 2);
        assert_eq!(document.block_count(), 3);
        assert_eq!(document.all_ids().len(), 5);
    }

    #[test]
    fn validate_rejects_duplicates_and_nested_layouts() {
        let (mut document, text_id, _) = sample();
        assert!(document.validate().is_ok());

        let mut copy = document.blocks[0].clone();
        copy.id = text_id.clone();
        document.blocks.push(copy);
        assert_eq!(
            document.validate(),
            Err(DocumentError::DuplicateIds(vec![text_id]))
        );

        let (mut document, _, _) = sample();
        let inner = create_columns(2, None);
        let inner_id = inner.id.clone();
        document.blocks[1].columns_mut().expect("columns")[0]
            .blocks
            .push(inner);
        assert_eq!(
            document.validate(),
            Err(DocumentError::NestedLayout { block_id: inner_id })
        );
    }

    #[test]
    fn json_roundtrip_validates() {
        let (document, _, _) = sample();
        let raw = document.to_json().expect("to json");
        let loaded = Document::from_json(&raw).expect("from json");
        assert_eq!(loaded, document);
        assert!(Document::from_json("{\"not\":\"a list\"}").is_err());
    }
}
