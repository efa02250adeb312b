use mailcanvas_core::blocks::{Block, BlockType};
use mailcanvas_core::canvas::{Canvas, CanvasEvent, CanvasHost, ControlAction, DropPoint};
use mailcanvas_core::config::CanvasConfig;
use mailcanvas_core::controls::LayoutProbe;
use mailcanvas_core::document::Document;
use mailcanvas_core::drag::{encode_existing, encode_new_block, encode_palette_item};
use mailcanvas_core::factory::{create_block, create_columns, NewBlockRequest};
use mailcanvas_core::geometry::{Rect, Size};
use mailcanvas_core::ids::{collect_ids, duplicate_ids, regenerate_ids};
use mailcanvas_core::snippets::{SnippetError, SnippetPersistence};
use mailcanvas_core::tree::{self, DropTarget};
use std::time::{Duration, Instant};

struct StackedProbe {
    ids: Vec<String>,
}

impl StackedProbe {
    fn of(document: &Document) -> Self {
        Self {
            ids: document
                .top_level_ids()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

impl LayoutProbe for StackedProbe {
    fn block_rect(&self, block_id: &str) -> Option<Rect> {
        let index = self.ids.iter().position(|id| id == block_id)?;
        Some(Rect::new(240.0, 40.0 + index as f64 * 120.0, 600.0, 120.0))
    }

    fn viewport(&self) -> Size {
        Size::new(1280.0, 900.0)
    }
}

struct NoSnippets;

impl SnippetPersistence for NoSnippets {
    fn save_snippet(&mut self, _block: &Block) -> Result<(), SnippetError> {
        Ok(())
    }

    fn remove_snippet(&mut self, _block_id: &str) -> Result<(), SnippetError> {
        Ok(())
    }
}

fn named(block_type: BlockType, id: &str) -> Block {
    let mut block = create_block(block_type);
    block.id = id.to_string();
    block
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[test]
fn drop_text_on_empty_canvas() {
    let document = tree::insert_top_level(&Document::default(), create_block(BlockType::Text), None)
        .expect("insert");
    assert_eq!(document.len(), 1);
    assert_eq!(document.blocks[0].block_type, BlockType::Text);
    assert!(!document.blocks[0].id.is_empty());

    // Same drop through the canvas, with the payload the palette would encode.
    let mut canvas = Canvas::new(Document::default(), CanvasConfig::default());
    let probe = StackedProbe::of(canvas.document());
    assert!(canvas.on_drop(
        &encode_palette_item(BlockType::Text),
        &DropPoint::Canvas { cursor_y: 500.0 },
        Instant::now(),
        &probe,
    ));
    assert_eq!(canvas.document().len(), 1);
    assert_eq!(canvas.document().blocks[0].block_type, BlockType::Text);
}

#[test]
fn reorder_second_block_to_front() {
    let document = Document::new(vec![named(BlockType::Text, "A"), named(BlockType::Image, "B")]);
    let reordered = tree::move_top_level(&document, "B", Some(0)).expect("move");
    assert_eq!(reordered.top_level_ids(), vec!["B", "A"]);

    let mut canvas = Canvas::new(document.clone(), CanvasConfig::default());
    let probe = StackedProbe::of(&document);
    assert!(canvas.on_drop(
        &encode_existing("B"),
        &DropPoint::Canvas { cursor_y: 10.0 },
        Instant::now(),
        &probe,
    ));
    assert_eq!(canvas.document().top_level_ids(), vec!["B", "A"]);
}

#[test]
fn drop_button_into_second_column() {
    let mut layout = create_columns(2, None);
    layout.id = "C".to_string();
    let mut canvas = Canvas::new(Document::new(vec![layout]), CanvasConfig::default());
    let probe = StackedProbe::of(canvas.document());

    assert!(canvas.on_drop(
        &encode_palette_item(BlockType::Button),
        &DropPoint::Column {
            layout_id: "C".to_string(),
            column_index: 1,
        },
        Instant::now(),
        &probe,
    ));

    let columns = canvas.document().blocks[0].columns().expect("columns");
    assert!(columns[0].blocks.is_empty());
    assert_eq!(columns[1].blocks.len(), 1);
    assert_eq!(columns[1].blocks[0].block_type, BlockType::Button);
}

#[test]
fn duplicate_layout_then_delete_original() {
    let mut layout = create_columns(2, None);
    layout.id = "C".to_string();
    layout.columns_mut().expect("columns")[0]
        .blocks
        .push(named(BlockType::Text, "T"));
    let document = Document::new(vec![layout]);

    let (duplicated, copy_id) = tree::duplicate_block(&document, "C").expect("duplicate");
    assert_eq!(duplicated.len(), 2);
    assert_ne!(copy_id, "C");

    let original = duplicated.find("C").expect("original");
    let copy = duplicated.find(&copy_id).expect("copy");
    let original_columns = original.columns().expect("columns");
    let copy_columns = copy.columns().expect("columns");
    assert_ne!(copy_columns[0].id, original_columns[0].id);
    assert_ne!(copy_columns[0].blocks[0].id, "T");
    assert_eq!(copy_columns[0].blocks[0].content, original_columns[0].blocks[0].content);

    let after_delete = tree::delete_block(&duplicated, "C").expect("delete");
    assert_eq!(after_delete.top_level_ids(), vec![copy_id.as_str()]);
    let survivor = after_delete.find(&copy_id).expect("copy survives");
    assert_eq!(survivor.columns().expect("columns")[0].blocks.len(), 1);
    assert!(!after_delete.contains("T"));
}

#[test]
fn delete_from_controls_before_hide_fires() {
    let document = Document::new(vec![named(BlockType::Text, "X"), named(BlockType::Text, "Y")]);
    let probe = StackedProbe::of(&document);
    let mut snippets = NoSnippets;
    let mut host = CanvasHost {
        probe: &probe,
        snippets: &mut snippets,
    };
    let mut canvas = Canvas::new(document, CanvasConfig::default());
    let t0 = Instant::now();

    let events = [
        (0, CanvasEvent::MouseEnterBlock { block_id: "X".to_string() }),
        (150, CanvasEvent::MouseLeaveBlock { block_id: "X".to_string() }),
        (300, CanvasEvent::Tick),
        (400, CanvasEvent::MouseEnterControls),
        (450, CanvasEvent::Tick),
        (
            700,
            CanvasEvent::Control {
                action: ControlAction::Delete,
            },
        ),
    ];
    for (at, event) in events {
        canvas.handle(event, t0 + ms(at), &mut host);
    }

    assert_eq!(canvas.document().top_level_ids(), vec!["Y"]);
    assert!(canvas.controls().is_none());
}

#[test]
fn ids_stay_unique_across_edit_sequences() {
    let mut document = Document::default();
    let mut layout = create_columns(3, None);
    layout.id = "L".to_string();
    document = tree::insert_top_level(&document, layout, None).expect("layout");

    for round in 0..12usize {
        let block_type = BlockType::ALL[round % BlockType::ALL.len()];
        if block_type.is_layout() {
            continue;
        }
        document = tree::insert_top_level(&document, create_block(block_type), Some(round % 3))
            .expect("insert");
        document = tree::insert_into_column(&document, "L", round % 3, create_block(block_type))
            .expect("insert into column");

        let first = document.top_level_ids()[0].to_string();
        let (next, _) = tree::duplicate_block(&document, &first).expect("duplicate");
        document = next;

        let last = document.top_level_ids().last().map(|id| id.to_string()).expect("last");
        document = tree::move_top_level(&document, &last, Some(0)).expect("move");

        let (next, _) = tree::duplicate_block(&document, "L").expect("duplicate layout");
        document = next;

        assert!(duplicate_ids(&document.blocks).is_empty(), "round {round}");
    }
    assert!(document.validate().is_ok());
}

#[test]
fn delete_removes_exactly_one_leaf() {
    let mut layout = create_columns(2, None);
    layout.id = "L".to_string();
    layout.columns_mut().expect("columns")[1]
        .blocks
        .push(named(BlockType::Social, "nested"));
    let document = Document::new(vec![named(BlockType::Text, "top"), layout]);
    let before = document.block_count();

    for id in ["top", "nested"] {
        let next = tree::delete_block(&document, id).expect("delete");
        assert_eq!(next.block_count(), before - 1);
        assert!(!next.contains(id));
        assert!(!collect_ids(&next.blocks).contains(&id));
    }
}

#[test]
fn move_there_and_back_restores_order() {
    let document = Document::new(
        ["a", "b", "c", "d"]
            .into_iter()
            .map(|id| named(BlockType::Text, id))
            .collect(),
    );
    for (from, id) in ["a", "b", "c", "d"].into_iter().enumerate() {
        for to in 0..4 {
            let moved = tree::move_top_level(&document, id, Some(to)).expect("move");
            let back = tree::move_top_level(&moved, id, Some(from)).expect("move back");
            assert_eq!(back.top_level_ids(), document.top_level_ids(), "{id} -> {to}");
        }
    }
}

#[test]
fn regenerated_layout_keeps_content() {
    let mut layout = create_columns(2, Some("30-70"));
    layout.columns_mut().expect("columns")[0]
        .blocks
        .push(create_block(BlockType::Button));
    let copy = regenerate_ids(&layout);

    assert_ne!(copy.id, layout.id);
    assert_eq!(copy.styling, layout.styling);
    assert_eq!(copy.display_options, layout.display_options);
    let original_ids = collect_ids(std::slice::from_ref(&layout));
    for id in collect_ids(std::slice::from_ref(&copy)) {
        assert!(!original_ids.contains(&id));
    }
    let original_column = &layout.columns().expect("columns")[0];
    let copied_column = &copy.columns().expect("columns")[0];
    assert_eq!(copied_column.blocks[0].content, original_column.blocks[0].content);
    assert_eq!(
        copy.content.layout().map(|content| content.column_ratio.as_str()),
        Some("30-70")
    );
}

#[test]
fn column_moves_leave_no_orphans() {
    let mut layout = create_columns(2, None);
    layout.id = "L".to_string();
    let document = Document::new(vec![named(BlockType::Text, "t"), layout]);

    let step1 = tree::move_into_column(&document, "L", 0, "t").expect("into column 0");
    let step2 = tree::move_into_column(&step1, "L", 1, "t").expect("into column 1");

    for next in [&step1, &step2] {
        let occurrences = collect_ids(&next.blocks)
            .into_iter()
            .filter(|id| *id == "t")
            .count();
        assert_eq!(occurrences, 1);
        assert!(!next.top_level_ids().contains(&"t"));
    }
    let columns = step2.blocks[0].columns().expect("columns");
    assert!(columns[0].blocks.is_empty());
    assert_eq!(columns[1].blocks[0].id, "t");
}

#[test]
fn layout_palette_drop_respects_column_count() {
    let mut canvas = Canvas::new(Document::default(), CanvasConfig::default());
    let probe = StackedProbe::of(canvas.document());
    let mut request = NewBlockRequest::columns(3);
    if let Some(layout) = request.layout_data.as_mut() {
        layout.column_ratio = Some("20-60-20".to_string());
    }
    assert!(canvas.on_drop(
        &encode_new_block(&request),
        &DropPoint::Canvas { cursor_y: 0.0 },
        Instant::now(),
        &probe,
    ));
    let layout = &canvas.document().blocks[0];
    assert_eq!(layout.columns().map(<[_]>::len), Some(3));

    let too_many = NewBlockRequest::columns(12);
    assert!(!canvas.on_drop(
        &encode_new_block(&too_many),
        &DropPoint::Canvas { cursor_y: 0.0 },
        Instant::now(),
        &probe,
    ));
    assert_eq!(canvas.document().len(), 1);
}

#[test]
fn layouts_cannot_nest() {
    let mut outer = create_columns(2, None);
    outer.id = "outer".to_string();
    let document = Document::new(vec![outer]);
    let target = DropTarget::Column {
        layout_id: "outer".to_string(),
        column_index: 0,
    };
    assert!(tree::insert_block(&document, create_columns(2, None), &target).is_err());
}

#[test]
fn prepared_layout_with_nested_layout_is_refused() {
    let mut outer = create_columns(2, None);
    outer.columns_mut().expect("columns")[0]
        .blocks
        .push(create_columns(2, None));

    let result = tree::insert_top_level(&Document::default(), outer.clone(), None);
    assert!(matches!(result, Err(tree::EditError::NestedLayout(_))));

    let mut canvas = Canvas::new(Document::default(), CanvasConfig::default());
    let probe = StackedProbe::of(canvas.document());
    assert!(!canvas.insert_block(outer, &DropTarget::Canvas { index: None }, &probe));
    assert!(canvas.document().is_empty());
    assert!(canvas.document().validate().is_ok());
}
