//! Drag transfer encoding and drag-session classification.
//!
//! The transfer string is either a JSON [`NewBlockRequest`] (palette items)
//! or a bare block id (blocks already on the canvas). Classification during
//! the drag only drives highlighting; the drop re-parses the payload itself.

use crate::blocks::BlockType;
use crate::factory::NewBlockRequest;
use crate::geometry::Rect;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragKind {
    Block,
    Layout,
    Reorder,
}

impl DragKind {
    /// Class the host applies to the drop target while this kind of drag is
    /// over it.
    pub fn highlight_class(&self) -> &'static str {
        match self {
            DragKind::Block => "drop-target--block",
            DragKind::Layout => "drop-target--layout",
            DragKind::Reorder => "drop-target--reorder",
        }
    }
}

/// What the host knows about the element a drag started from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragSource {
    /// Value of the source element's `data-columns` attribute, if any.
    #[serde(default)]
    pub columns_attr: Option<String>,
    pub payload: String,
}

impl DragSource {
    pub fn new(payload: impl Into<String>) -> Self {
        Self {
            columns_attr: None,
            payload: payload.into(),
        }
    }

    pub fn layout(payload: impl Into<String>, columns: usize) -> Self {
        Self {
            columns_attr: Some(columns.to_string()),
            payload: payload.into(),
        }
    }
}

pub fn classify(source: &DragSource) -> DragKind {
    if source.columns_attr.is_some() {
        return DragKind::Layout;
    }
    match parse_drop_payload(&source.payload) {
        Some(DropPayload::NewBlock(request)) => {
            if request.resolved_type().is_some_and(|block_type| block_type.is_layout()) {
                DragKind::Layout
            } else {
                DragKind::Block
            }
        }
        _ => DragKind::Reorder,
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DropPayload {
    NewBlock(NewBlockRequest),
    Existing(String),
}

/// JSON with a `blockType` field is a palette request; anything that does not
/// parse as JSON is an existing block id. JSON without `blockType` and blank
/// input are rejected.
pub fn parse_drop_payload(raw: &str) -> Option<DropPayload> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(map)) => {
            if !map.contains_key("blockType") {
                return None;
            }
            serde_json::from_value::<NewBlockRequest>(Value::Object(map))
                .ok()
                .map(DropPayload::NewBlock)
        }
        Ok(Value::String(id)) if !id.trim().is_empty() => {
            Some(DropPayload::Existing(id.trim().to_string()))
        }
        Ok(_) => None,
        Err(_) => Some(DropPayload::Existing(trimmed.to_string())),
    }
}

pub fn encode_new_block(request: &NewBlockRequest) -> String {
    serde_json::to_string(request).unwrap_or_else(|_| String::from("{}"))
}

pub fn encode_palette_item(block_type: BlockType) -> String {
    encode_new_block(&NewBlockRequest::new(block_type))
}

pub fn encode_existing(block_id: &str) -> String {
    block_id.to_string()
}

/// Index to insert before, scanning `rects` top to bottom: the first rect that
/// starts at or below `cursor_y`, or that contains it. `None` means append.
pub fn drop_index(cursor_y: f64, rects: &[Rect]) -> Option<usize> {
    rects
        .iter()
        .position(|rect| rect.top >= cursor_y || rect.contains_y(cursor_y))
}

#[cfg(test)]
mod tests {
    use super::{
        classify, drop_index, encode_existing, encode_palette_item, parse_drop_payload,
        DragKind, DragSource, DropPayload,
    };
    use crate::blocks::BlockType;
    use crate::factory::NewBlockRequest;
    use crate::geometry::Rect;

    #[test]
    fn classify_distinguishes_three_kinds() {
        let palette = DragSource::new(encode_palette_item(BlockType::Button));
        assert_eq!(classify(&palette), DragKind::Block);

        let layout = DragSource::layout(encode_palette_item(BlockType::Columns), 3);
        assert_eq!(classify(&layout), DragKind::Layout);

        let columns_without_attr = DragSource::new(encode_palette_item(BlockType::Columns));
        assert_eq!(classify(&columns_without_attr), DragKind::Layout);

        let existing = DragSource::new(encode_existing("text-123"));
        assert_eq!(classify(&existing), DragKind::Reorder);
    }

    #[test]
    fn parse_palette_payload() {
        let raw = r#"{"blockType":"columns","layoutData":{"columnCount":3,"columnRatio":"33-33-33"}}"#;
        match parse_drop_payload(raw) {
            Some(DropPayload::NewBlock(request)) => {
                assert_eq!(request.resolved_type(), Some(BlockType::Columns));
                let layout = request.layout_data.expect("layout data");
                assert_eq!(layout.column_count, Some(3));
                assert_eq!(layout.column_ratio.as_deref(), Some("33-33-33"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn parse_bare_id_as_existing() {
        assert_eq!(
            parse_drop_payload("text-1700000000000-4-abcd1234"),
            Some(DropPayload::Existing("text-1700000000000-4-abcd1234".to_string()))
        );
        assert_eq!(
            parse_drop_payload("\"button-1\""),
            Some(DropPayload::Existing("button-1".to_string()))
        );
    }

    #[test]
    fn parse_rejects_blank_and_shapeless_json() {
        assert_eq!(parse_drop_payload("   "), None);
        assert_eq!(parse_drop_payload(r#"{"foo":1}"#), None);
        assert_eq!(parse_drop_payload("42"), None);
        assert_eq!(parse_drop_payload(r#"{"blockType":7}"#), None);
    }

    #[test]
    fn unknown_type_still_parses_as_request() {
        match parse_drop_payload(r#"{"blockType":"carousel"}"#) {
            Some(DropPayload::NewBlock(request)) => assert_eq!(request.resolved_type(), None),
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn encoded_palette_item_round_trips() {
        let raw = encode_palette_item(BlockType::Divider);
        assert_eq!(raw, r#"{"blockType":"divider"}"#);
        assert_eq!(
            parse_drop_payload(&raw),
            Some(DropPayload::NewBlock(NewBlockRequest::new(BlockType::Divider)))
        );
    }

    #[test]
    fn drop_index_scans_top_to_bottom() {
        let rects = [
            Rect::new(0.0, 0.0, 600.0, 100.0),
            Rect::new(0.0, 100.0, 600.0, 50.0),
            Rect::new(0.0, 150.0, 600.0, 80.0),
        ];
        assert_eq!(drop_index(-5.0, &rects), Some(0));
        assert_eq!(drop_index(40.0, &rects), Some(0));
        assert_eq!(drop_index(120.0, &rects), Some(1));
        assert_eq!(drop_index(500.0, &rects), None);
        assert_eq!(drop_index(10.0, &[]), None);
    }

    #[test]
    fn drop_index_boundary_inserts_before_lower() {
        let rects = [
            Rect::new(0.0, 0.0, 600.0, 100.0),
            Rect::new(0.0, 100.0, 600.0, 50.0),
        ];
        assert_eq!(drop_index(100.0, &rects), Some(1));
    }
}
