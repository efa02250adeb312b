use anyhow::{Context, Result};
use mailcanvas_core::canvas::{Canvas, CanvasEvent, CanvasHost};
use mailcanvas_core::controls::ControlsPlacement;
use mailcanvas_core::document::Document;
use mailcanvas_core::geometry::Size;
use mailcanvas_core::snippets::SnippetPersistence;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::layout::StackedLayout;

pub const DEFAULT_VIEWPORT: Size = Size::new(1280.0, 900.0);

/// A replayable interaction. Step times are offsets from the start of the run.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Script {
    #[serde(default)]
    pub document: Option<Document>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub at_ms: u64,
    #[serde(default)]
    pub scroll_y: Option<f64>,
    #[serde(default)]
    pub viewport: Option<Size>,
    pub event: CanvasEvent,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub document: Document,
    pub selected: Option<String>,
    pub editing: Option<String>,
    pub controls: Option<ControlsPlacement>,
    pub applied: usize,
}

pub fn parse_script(raw: &str) -> Result<Script> {
    let script: Script = serde_json::from_str(raw).context("invalid script")?;
    if let Some(document) = &script.document {
        document
            .validate()
            .map_err(|err| anyhow::anyhow!("invalid script document: {err:?}"))?;
    }
    Ok(script)
}

/// Replays every step against a fresh canvas. `applied` counts the steps that
/// changed the document.
pub fn replay(
    script: Script,
    canvas: &mut Canvas,
    snippets: &mut dyn SnippetPersistence,
) -> Report {
    let started = Instant::now();
    let mut layout = StackedLayout::new(DEFAULT_VIEWPORT);
    let mut applied = 0;

    for step in script.steps {
        let now = started + Duration::from_millis(step.at_ms);
        if let Some(scroll_y) = step.scroll_y {
            layout.scroll_to(scroll_y);
        }
        if let Some(viewport) = step.viewport {
            layout.resize(viewport);
        }
        layout.measure(canvas.document());
        let mut host = CanvasHost {
            probe: &layout,
            snippets: &mut *snippets,
        };
        if canvas.handle(step.event, now, &mut host) {
            applied += 1;
        }
    }

    layout.measure(canvas.document());
    canvas.refresh_controls(&layout);
    let report = Report {
        document: canvas.document().clone(),
        selected: canvas.selected().map(str::to_string),
        editing: canvas.editing().map(str::to_string),
        controls: canvas.controls(),
        applied,
    };
    canvas.close();
    report
}
