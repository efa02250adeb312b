use crate::blocks::{
    Block, BlockContent, BlockType, Column, ColumnsContent, DisplayOptions, Position, StyleMap,
    Styling,
};
use crate::ids::{generate_id, IdGenerator, RandomIds};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const DEFAULT_COLUMN_COUNT: usize = 2;
pub const DEFAULT_COLUMN_GAP: u32 = 20;
pub const DEFAULT_MAX_COLUMNS: usize = 6;

/// Structured half of the drag payload: a palette item asking for a new block.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBlockRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_data: Option<LayoutData>,
}

impl NewBlockRequest {
    pub fn new(block_type: BlockType) -> Self {
        Self {
            block_type: Some(block_type.as_str().to_string()),
            layout_data: None,
        }
    }

    pub fn columns(column_count: usize) -> Self {
        Self {
            block_type: Some(BlockType::Columns.as_str().to_string()),
            layout_data: Some(LayoutData {
                column_count: Some(column_count),
                column_ratio: None,
            }),
        }
    }

    pub fn resolved_type(&self) -> Option<BlockType> {
        self.block_type.as_deref().and_then(BlockType::parse)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_ratio: Option<String>,
}

fn object(entries: Value) -> Map<String, Value> {
    match entries {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub fn default_content(block_type: BlockType) -> BlockContent {
    let fields = match block_type {
        BlockType::Columns => {
            return BlockContent::Layout(ColumnsContent {
                column_ratio: equal_ratio(DEFAULT_COLUMN_COUNT),
                gap: DEFAULT_COLUMN_GAP,
                columns: Vec::new(),
                extra: Map::new(),
            });
        }
        BlockType::Text => json!({ "text": "<p>Add your text here</p>" }),
        BlockType::Image => json!({
            "src": "",
            "alt": "Image",
            "link": "",
            "width": "100%"
        }),
        BlockType::Button => json!({ "text": "Click Here", "url": "#" }),
        BlockType::Divider => json!({ "lineStyle": "solid", "thickness": 1, "color": "#dddddd" }),
        BlockType::Spacer => json!({ "height": 20 }),
        BlockType::Social => json!({
            "iconSize": 32,
            "links": [
                { "platform": "facebook", "url": "" },
                { "platform": "twitter", "url": "" },
                { "platform": "instagram", "url": "" }
            ]
        }),
        BlockType::Video => json!({ "url": "", "thumbnail": "" }),
        BlockType::Html => json!({ "html": "<div></div>" }),
        BlockType::Table => json!({
            "rows": 2,
            "cols": 2,
            "cells": [["", ""], ["", ""]],
            "hasHeader": true
        }),
        BlockType::Content => json!({
            "heading": "Heading",
            "body": "<p>Body text</p>",
            "imageSrc": ""
        }),
        BlockType::Productfeed => json!({ "products": [], "layout": "grid", "perRow": 2 }),
    };
    BlockContent::Fields(object(fields))
}

pub fn default_styles(block_type: BlockType) -> Styling {
    let desktop = match block_type {
        BlockType::Text => json!({
            "fontSize": "16px",
            "color": "#333333",
            "textAlign": "left",
            "padding": "10px"
        }),
        BlockType::Image => json!({ "textAlign": "center", "padding": "10px" }),
        BlockType::Button => json!({
            "backgroundColor": "#333333",
            "color": "#ffffff",
            "textAlign": "center",
            "padding": "12px 24px",
            "borderRadius": "4px"
        }),
        BlockType::Divider => json!({ "padding": "10px 0" }),
        BlockType::Spacer => json!({}),
        BlockType::Social => json!({ "textAlign": "center", "padding": "10px" }),
        BlockType::Video => json!({ "textAlign": "center", "padding": "10px" }),
        BlockType::Html => json!({ "padding": "0" }),
        BlockType::Table => json!({ "borderColor": "#dddddd", "padding": "10px" }),
        BlockType::Content => json!({ "padding": "10px", "textAlign": "left" }),
        BlockType::Productfeed => json!({ "padding": "10px" }),
        BlockType::Columns => json!({ "padding": "0" }),
    };
    Styling {
        desktop: object(desktop),
        tablet: StyleMap::new(),
        mobile: StyleMap::new(),
    }
}

/// `"50-50"` for two columns, `"33-33-33"` for three, and so on.
pub fn equal_ratio(column_count: usize) -> String {
    let count = column_count.max(1);
    let share = 100 / count;
    vec![share.to_string(); count].join("-")
}

fn ratio_matches(ratio: &str, column_count: usize) -> bool {
    let parts: Vec<&str> = ratio.split(['-', ':']).collect();
    parts.len() == column_count
        && parts
            .iter()
            .all(|part| !part.trim().is_empty() && part.trim().parse::<u32>().is_ok())
}

pub fn create_block(block_type: BlockType) -> Block {
    if block_type.is_layout() {
        return create_columns(DEFAULT_COLUMN_COUNT, None);
    }
    Block {
        id: generate_id(block_type.as_str()),
        block_type,
        content: default_content(block_type),
        styling: default_styles(block_type),
        position: Position::default(),
        display_options: DisplayOptions::default(),
        is_starred: false,
    }
}

/// A `columns` block with `column_count` empty columns. A ratio that does not
/// describe exactly that many numeric shares falls back to an equal split.
pub fn create_columns(column_count: usize, column_ratio: Option<&str>) -> Block {
    let column_count = column_count.max(1);
    let columns = (0..column_count)
        .map(|_| Column {
            id: generate_id("col"),
            blocks: Vec::new(),
        })
        .collect();
    let column_ratio = column_ratio
        .filter(|ratio| ratio_matches(ratio, column_count))
        .map(str::to_string)
        .unwrap_or_else(|| equal_ratio(column_count));
    Block {
        id: generate_id(BlockType::Columns.as_str()),
        block_type: BlockType::Columns,
        content: BlockContent::Layout(ColumnsContent {
            column_ratio,
            gap: DEFAULT_COLUMN_GAP,
            columns,
            extra: Map::new(),
        }),
        styling: default_styles(BlockType::Columns),
        position: Position::default(),
        display_options: DisplayOptions::default(),
        is_starred: false,
    }
}

/// Builds a block for a palette drop. Returns `None` for a missing or unknown
/// type tag and for a column count outside `1..=max_columns`.
pub fn create_from_drag_data(request: &NewBlockRequest, max_columns: usize) -> Option<Block> {
    let block_type = request.resolved_type()?;
    if !block_type.is_layout() {
        return Some(create_block(block_type));
    }
    let layout = request.layout_data.clone().unwrap_or_default();
    let column_count = layout.column_count.unwrap_or(DEFAULT_COLUMN_COUNT);
    if column_count == 0 || column_count > max_columns {
        return None;
    }
    Some(create_columns(column_count, layout.column_ratio.as_deref()))
}

fn merge_missing(target: &mut Map<String, Value>, defaults: Map<String, Value>) {
    for (key, value) in defaults {
        target.entry(key).or_insert(value);
    }
}

fn empty_columns(column_count: usize, ids: &mut dyn IdGenerator) -> Vec<Column> {
    (0..column_count)
        .map(|_| Column {
            id: ids.next_id("col"),
            blocks: Vec::new(),
        })
        .collect()
}

/// Completes a possibly partial block: missing content and style keys take
/// the type defaults, a blank id gets a fresh one, and nested blocks are
/// completed the same way.
pub fn fill_defaults(block: Block) -> Block {
    fill_defaults_with(block, &mut RandomIds)
}

pub fn fill_defaults_with(mut block: Block, ids: &mut dyn IdGenerator) -> Block {
    if block.id.trim().is_empty() {
        block.id = ids.next_id(block.block_type.as_str());
    }
    block.position = Position::default();

    let content = std::mem::replace(&mut block.content, BlockContent::Fields(Map::new()));
    block.content = match (content, default_content(block.block_type)) {
        (BlockContent::Fields(mut fields), BlockContent::Fields(defaults)) => {
            merge_missing(&mut fields, defaults);
            BlockContent::Fields(fields)
        }
        (BlockContent::Layout(mut layout), BlockContent::Layout(_)) => {
            if layout.columns.is_empty() {
                layout.columns = empty_columns(DEFAULT_COLUMN_COUNT, ids);
            }
            let column_count = layout.columns.len();
            if !ratio_matches(&layout.column_ratio, column_count) {
                layout.column_ratio = equal_ratio(column_count);
            }
            for column in layout.columns.iter_mut() {
                if column.id.trim().is_empty() {
                    column.id = ids.next_id("col");
                }
                let blocks = std::mem::take(&mut column.blocks);
                column.blocks = blocks
                    .into_iter()
                    .map(|nested| fill_defaults_with(nested, ids))
                    .collect();
            }
            BlockContent::Layout(layout)
        }
        (_, BlockContent::Layout(defaults)) => BlockContent::Layout(ColumnsContent {
            columns: empty_columns(DEFAULT_COLUMN_COUNT, ids),
            ..defaults
        }),
        (_, defaults) => defaults,
    };

    let defaults = default_styles(block.block_type);
    merge_missing(&mut block.styling.desktop, defaults.desktop);
    merge_missing(&mut block.styling.tablet, defaults.tablet);
    merge_missing(&mut block.styling.mobile, defaults.mobile);
    block
}
