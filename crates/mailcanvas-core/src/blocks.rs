use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type StyleMap = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockType {
    Text,
    Image,
    Button,
    Divider,
    Spacer,
    Social,
    Video,
    Html,
    Table,
    Content,
    Productfeed,
    Columns,
}

impl BlockType {
    pub const ALL: [BlockType; 12] = [
        BlockType::Text,
        BlockType::Image,
        BlockType::Button,
        BlockType::Divider,
        BlockType::Spacer,
        BlockType::Social,
        BlockType::Video,
        BlockType::Html,
        BlockType::Table,
        BlockType::Content,
        BlockType::Productfeed,
        BlockType::Columns,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockType::Text => "text",
            BlockType::Image => "image",
            BlockType::Button => "button",
            BlockType::Divider => "divider",
            BlockType::Spacer => "spacer",
            BlockType::Social => "social",
            BlockType::Video => "video",
            BlockType::Html => "html",
            BlockType::Table => "table",
            BlockType::Content => "content",
            BlockType::Productfeed => "productfeed",
            BlockType::Columns => "columns",
        }
    }

    /// Looks up a catalog tag. Unknown tags yield `None`.
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|block_type| block_type.as_str() == tag)
    }

    pub fn is_layout(&self) -> bool {
        matches!(self, BlockType::Columns)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Desktop,
    Tablet,
    Mobile,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Styling {
    pub desktop: StyleMap,
    pub tablet: StyleMap,
    pub mobile: StyleMap,
}

impl Styling {
    pub fn get(&self, breakpoint: Breakpoint) -> &StyleMap {
        match breakpoint {
            Breakpoint::Desktop => &self.desktop,
            Breakpoint::Tablet => &self.tablet,
            Breakpoint::Mobile => &self.mobile,
        }
    }

    pub fn get_mut(&mut self, breakpoint: Breakpoint) -> &mut StyleMap {
        match breakpoint {
            Breakpoint::Desktop => &mut self.desktop,
            Breakpoint::Tablet => &mut self.tablet,
            Breakpoint::Mobile => &mut self.mobile,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayOptions {
    pub show_on_desktop: bool,
    pub show_on_tablet: bool,
    pub show_on_mobile: bool,
}

impl Default for DisplayOptions {
    fn default() -> Self {
        Self {
            show_on_desktop: true,
            show_on_tablet: true,
            show_on_mobile: true,
        }
    }
}

impl DisplayOptions {
    pub fn visible_on(&self, breakpoint: Breakpoint) -> bool {
        match breakpoint {
            Breakpoint::Desktop => self.show_on_desktop,
            Breakpoint::Tablet => self.show_on_tablet,
            Breakpoint::Mobile => self.show_on_mobile,
        }
    }
}

/// Reserved offset. Layout never reads it; it stays at the origin.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnsContent {
    pub column_ratio: String,
    pub gap: u32,
    pub columns: Vec<Column>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockContent {
    Layout(ColumnsContent),
    Fields(Map<String, Value>),
}

impl BlockContent {
    pub fn fields(&self) -> Option<&Map<String, Value>> {
        match self {
            BlockContent::Fields(fields) => Some(fields),
            BlockContent::Layout(_) => None,
        }
    }

    pub fn layout(&self) -> Option<&ColumnsContent> {
        match self {
            BlockContent::Layout(layout) => Some(layout),
            BlockContent::Fields(_) => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawBlock")]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: BlockType,
    pub content: BlockContent,
    pub styling: Styling,
    pub position: Position,
    pub display_options: DisplayOptions,
    pub is_starred: bool,
}

impl Block {
    pub fn is_layout(&self) -> bool {
        self.block_type.is_layout()
    }

    pub fn columns(&self) -> Option<&[Column]> {
        match &self.content {
            BlockContent::Layout(layout) => Some(&layout.columns),
            BlockContent::Fields(_) => None,
        }
    }

    pub fn columns_mut(&mut self) -> Option<&mut Vec<Column>> {
        match &mut self.content {
            BlockContent::Layout(layout) => Some(&mut layout.columns),
            BlockContent::Fields(_) => None,
        }
    }

    /// Depth-first walk over this block and every block nested in its columns.
    pub fn visit<'a>(&'a self, visitor: &mut impl FnMut(&'a Block)) {
        visitor(self);
        if let Some(columns) = self.columns() {
            for column in columns {
                for block in &column.blocks {
                    block.visit(visitor);
                }
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlock {
    id: String,
    #[serde(rename = "type")]
    block_type: BlockType,
    #[serde(default)]
    content: Value,
    #[serde(default)]
    styling: Styling,
    #[serde(default)]
    position: Position,
    #[serde(default)]
    display_options: DisplayOptions,
    #[serde(default)]
    is_starred: bool,
}

impl TryFrom<RawBlock> for Block {
    type Error = String;

    fn try_from(raw: RawBlock) -> Result<Self, Self::Error> {
        let content = if raw.block_type.is_layout() {
            let layout: ColumnsContent = serde_json::from_value(raw.content)
                .map_err(|err| format!("block {}: invalid columns content: {err}", raw.id))?;
            BlockContent::Layout(layout)
        } else {
            match raw.content {
                Value::Null => BlockContent::Fields(Map::new()),
                Value::Object(fields) => BlockContent::Fields(fields),
                _ => return Err(format!("block {}: content must be an object", raw.id)),
            }
        };
        Ok(Block {
            id: raw.id,
            block_type: raw.block_type,
            content,
            styling: raw.styling,
            position: raw.position,
            display_options: raw.display_options,
            is_starred: raw.is_starred,
        })
    }
}
