//! Placement of the floating block controls.
//!
//! The controls float outside the selected block, so their position comes
//! from the block's measured rectangle. Measurement stays behind
//! [`LayoutProbe`]; nothing else in the crate asks the host about geometry.

use crate::geometry::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Host-side measurement of rendered blocks.
pub trait LayoutProbe {
    /// Current viewport-space rectangle of a rendered block.
    fn block_rect(&self, block_id: &str) -> Option<Rect>;

    fn viewport(&self) -> Size;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlsSide {
    Left,
    Right,
    Inside,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlsPlacement {
    pub position: Point,
    pub side: ControlsSide,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacementConfig {
    /// Gap between block edge and controls.
    pub offset: f64,
    /// Minimum distance from every viewport edge.
    pub margin: f64,
    pub controls: Size,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            offset: 8.0,
            margin: 8.0,
            controls: Size::new(40.0, 160.0),
        }
    }
}

fn clamp_axis(value: f64, margin: f64, extent: f64, viewport: f64) -> f64 {
    let max = (viewport - margin - extent).max(margin);
    value.clamp(margin, max)
}

/// Prefers the left side of the block, then the right side, then an inset
/// along the block's left edge. The top edge follows the block and is clamped
/// into the viewport.
pub fn place_controls(block: Rect, viewport: Size, config: &PlacementConfig) -> ControlsPlacement {
    let width = config.controls.width;
    let y = clamp_axis(block.top, config.margin, config.controls.height, viewport.height);

    let left_x = block.left - config.offset - width;
    if left_x >= config.margin {
        return ControlsPlacement {
            position: Point { x: left_x, y },
            side: ControlsSide::Left,
        };
    }

    let right_x = block.right() + config.offset;
    if right_x + width <= viewport.width - config.margin {
        return ControlsPlacement {
            position: Point { x: right_x, y },
            side: ControlsSide::Right,
        };
    }

    let inside_x = clamp_axis(block.left + config.offset, config.margin, width, viewport.width);
    ControlsPlacement {
        position: Point { x: inside_x, y },
        side: ControlsSide::Inside,
    }
}

/// Measures the block and places the controls. `None` when the block is not
/// rendered.
pub fn locate_controls(
    probe: &dyn LayoutProbe,
    block_id: &str,
    config: &PlacementConfig,
) -> Option<ControlsPlacement> {
    let rect = probe.block_rect(block_id)?;
    Some(place_controls(rect, probe.viewport(), config))
}
