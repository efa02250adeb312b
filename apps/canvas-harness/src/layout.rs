use mailcanvas_core::controls::LayoutProbe;
use mailcanvas_core::document::Document;
use mailcanvas_core::geometry::{Rect, Size};
use std::collections::HashMap;

pub const CANVAS_LEFT: f64 = 240.0;
pub const CANVAS_TOP: f64 = 40.0;
pub const CANVAS_WIDTH: f64 = 600.0;
pub const BLOCK_HEIGHT: f64 = 120.0;
pub const NESTED_HEIGHT: f64 = 40.0;

/// Fixed-height layout: top-level blocks stack down the canvas, columns split
/// their layout's width evenly and stack nested blocks from its top edge.
pub struct StackedLayout {
    rects: HashMap<String, Rect>,
    viewport: Size,
    scroll_y: f64,
}

impl StackedLayout {
    pub fn new(viewport: Size) -> Self {
        Self {
            rects: HashMap::new(),
            viewport,
            scroll_y: 0.0,
        }
    }

    pub fn scroll_to(&mut self, scroll_y: f64) {
        self.scroll_y = scroll_y;
    }

    pub fn resize(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    pub fn measure(&mut self, document: &Document) {
        self.rects.clear();
        for (index, block) in document.blocks.iter().enumerate() {
            let top = CANVAS_TOP + index as f64 * BLOCK_HEIGHT;
            self.rects.insert(
                block.id.clone(),
                Rect::new(CANVAS_LEFT, top, CANVAS_WIDTH, BLOCK_HEIGHT),
            );
            let Some(columns) = block.columns() else {
                continue;
            };
            if columns.is_empty() {
                continue;
            }
            let column_width = CANVAS_WIDTH / columns.len() as f64;
            for (column_index, column) in columns.iter().enumerate() {
                let left = CANVAS_LEFT + column_index as f64 * column_width;
                for (row, nested) in column.blocks.iter().enumerate() {
                    self.rects.insert(
                        nested.id.clone(),
                        Rect::new(left, top + row as f64 * NESTED_HEIGHT, column_width, NESTED_HEIGHT),
                    );
                }
            }
        }
    }
}

impl LayoutProbe for StackedLayout {
    fn block_rect(&self, block_id: &str) -> Option<Rect> {
        self.rects.get(block_id).map(|rect| Rect {
            top: rect.top - self.scroll_y,
            ..*rect
        })
    }

    fn viewport(&self) -> Size {
        self.viewport
    }
}

#[cfg(test)]
mod tests {
    use super::{StackedLayout, BLOCK_HEIGHT, CANVAS_TOP};
    use mailcanvas_core::blocks::BlockType;
    use mailcanvas_core::controls::LayoutProbe;
    use mailcanvas_core::document::Document;
    use mailcanvas_core::factory::{create_block, create_columns};
    use mailcanvas_core::geometry::Size;

    #[test]
    fn stacks_top_level_and_splits_columns() {
        let text = create_block(BlockType::Text);
        let nested = create_block(BlockType::Button);
        let mut layout = create_columns(2, None);
        layout.columns_mut().expect("columns")[1]
            .blocks
            .push(nested.clone());
        let document = Document::new(vec![text.clone(), layout.clone()]);

        let mut probe = StackedLayout::new(Size::new(1280.0, 900.0));
        probe.measure(&document);
        assert_eq!(probe.block_rect(&text.id).expect("text").top, CANVAS_TOP);
        let layout_rect = probe.block_rect(&layout.id).expect("layout");
        assert_eq!(layout_rect.top, CANVAS_TOP + BLOCK_HEIGHT);
        let nested_rect = probe.block_rect(&nested.id).expect("nested");
        assert_eq!(nested_rect.top, layout_rect.top);
        assert_eq!(nested_rect.left, 540.0);

        probe.scroll_to(100.0);
        assert_eq!(probe.block_rect(&text.id).expect("text").top, CANVAS_TOP - 100.0);
        assert!(probe.block_rect("missing").is_none());
    }
}
