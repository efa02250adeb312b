mod layout;
mod script;

use anyhow::{anyhow, Context, Result};
use mailcanvas_core::canvas::Canvas;
use mailcanvas_core::config::{CanvasConfig, ConfigStore};
use mailcanvas_core::document::Document;
use mailcanvas_core::snippets::SnippetStore;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug)]
struct HarnessArgs {
    script_path: PathBuf,
    document_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    snippets_path: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Result<HarnessArgs, String> {
    let mut script_path: Option<PathBuf> = None;
    let mut document_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut snippets_path: Option<PathBuf> = None;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--script" => {
                let value = iter.next().ok_or_else(|| "Missing --script value".to_string())?;
                script_path = Some(PathBuf::from(value));
            }
            "--document" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "Missing --document value".to_string())?;
                document_path = Some(PathBuf::from(value));
            }
            "--config" => {
                let value = iter.next().ok_or_else(|| "Missing --config value".to_string())?;
                config_path = Some(PathBuf::from(value));
            }
            "--snippets" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "Missing --snippets value".to_string())?;
                snippets_path = Some(PathBuf::from(value));
            }
            "--help" | "-h" => {
                return Err(String::new());
            }
            _ => return Err(format!("Unknown argument: {arg}")),
        }
    }

    let script_path = script_path.ok_or_else(|| "Missing --script".to_string())?;
    Ok(HarnessArgs {
        script_path,
        document_path,
        config_path,
        snippets_path,
    })
}

fn load_config(path: Option<PathBuf>) -> Result<CanvasConfig> {
    let store = match path {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::default_store().map_err(|err| anyhow!("config dir: {err:?}"))?,
    };
    store.load().map_err(|err| anyhow!("load config: {err:?}"))
}

fn run(args: HarnessArgs) -> Result<()> {
    let raw = std::fs::read_to_string(&args.script_path)
        .with_context(|| format!("read script {}", args.script_path.display()))?;
    let mut script = script::parse_script(&raw)?;

    let document = match &args.document_path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("read document {}", path.display()))?;
            Document::from_json(&raw).map_err(|err| anyhow!("invalid document: {err:?}"))?
        }
        None => script.document.take().unwrap_or_default(),
    };

    let config = load_config(args.config_path)?;
    let mut snippets = match args.snippets_path {
        Some(path) => SnippetStore::new(path),
        None => SnippetStore::default_store().map_err(|err| anyhow!("data dir: {err:?}"))?,
    };

    tracing::info!(
        blocks = document.len(),
        steps = script.steps.len(),
        "replaying canvas script"
    );
    let mut canvas = Canvas::new(document, config);
    let report = script::replay(script, &mut canvas, &mut snippets);
    tracing::info!(applied = report.applied, "replay finished");

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = std::env::args().collect::<Vec<_>>();
    let parsed = match parse_args(&args) {
        Ok(value) => value,
        Err(message) => {
            if !message.is_empty() {
                eprintln!("{message}");
            }
            eprintln!("Usage: canvas-harness --script <path> [--document <path>] [--config <path>] [--snippets <path>]");
            std::process::exit(1);
        }
    };

    if let Err(err) = run(parsed) {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}
