//! Solar overlay renderer.
//!
//! Renders a location's solar data layers the way the report map shows
//! them, without a browser:
//! - Reads a data-layers bundle (layer URLs plus bounding box)
//! - Toggles the requested layers through the layer state manager
//! - Writes each rendered overlay as `<kind>.png`
//! - Writes `composite.png`, the overlays positioned on a Web Mercator view
//! - Writes `summary.json` with per-layer status

mod context;
mod output;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use context::{load_bundle, load_styles, AppContext};
use geotiff_parser::GridDecoder;
use map_overlay::{CompletionOutcome, LayerStateManager, RasterSurface};
use projection::WebMercatorProjector;
use renderer::RasterRenderer;
use solar_common::LayerKind;

#[derive(Parser, Debug)]
#[command(name = "overlay-renderer")]
#[command(about = "Render solar data layers into georeferenced PNG overlays")]
struct Args {
    /// Data-layers bundle (JSON) for the location
    #[arg(long, env = "DATA_LAYERS_BUNDLE")]
    bundle: PathBuf,

    /// Layers to render, comma-separated (default: annual_flux)
    #[arg(long, value_delimiter = ',')]
    layers: Vec<LayerKind>,

    /// Layer style overrides (JSON or YAML)
    #[arg(long, env = "LAYER_STYLES")]
    styles: Option<PathBuf>,

    /// Map zoom level of the composite view
    #[arg(long, default_value = "20")]
    zoom: f64,

    /// Composite view width in pixels
    #[arg(long, default_value = "800")]
    width: u32,

    /// Composite view height in pixels
    #[arg(long, default_value = "800")]
    height: u32,

    /// Directory for PNGs and the summary
    #[arg(long, default_value = "overlays")]
    output_dir: PathBuf,

    /// Access token appended to raster URLs
    #[arg(long, env = "SOLAR_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!(bundle = %args.bundle.display(), "Starting overlay renderer");

    if let Err(e) = run(args).await {
        error!(error = %format!("{:#}", e), "Overlay rendering failed");
        return Err(e);
    }
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let styles = load_styles(args.styles.as_deref())?;
    let ctx = AppContext::new(args.api_key.clone(), styles);

    let bundle = load_bundle(&args.bundle)?;
    let bounds = bundle
        .bounding_box
        .context("Bundle has no boundingBox; nothing to position overlays on")?;

    let fetcher = ctx.fetcher().await.context("Failed to initialize raster client")?;
    let mut renderer = RasterRenderer::new(GridDecoder::new(fetcher), ctx.render_config.clone());
    if let Some(key) = ctx.api_key() {
        renderer = renderer.with_access_token(key);
    }

    let view = WebMercatorProjector::new(bounds.center(), args.zoom, args.width, args.height);
    info!(
        zoom = args.zoom,
        width = args.width,
        height = args.height,
        meters_per_pixel = view.meters_per_pixel(bounds.center().latitude),
        "Map view"
    );

    let mut manager = LayerStateManager::from_bundle(
        &bundle,
        &ctx.styles,
        renderer,
        RasterSurface::new(args.width, args.height),
        Box::new(view),
    )?;

    let requested = if args.layers.is_empty() {
        manager.activate_defaults()
    } else {
        dedup(&args.layers)
            .into_iter()
            .map(|kind| (kind, manager.toggle(kind)))
            .collect()
    };

    for (kind, result) in &requested {
        match result {
            Ok(outcome) => info!(kind = %kind, outcome = ?outcome, "Layer toggled"),
            Err(e) => warn!(kind = %kind, error = %e, "Layer not available"),
        }
    }

    for (kind, outcome) in manager.settle().await {
        match outcome {
            CompletionOutcome::Failed(e) => {
                warn!(kind = %kind, error = %e, retryable = e.is_retryable(), "Layer failed")
            }
            other => info!(kind = %kind, outcome = ?other, "Layer settled"),
        }
    }

    let reports = output::write_layers(&manager, &args.output_dir)?;
    output::write_composite(manager.surface(), &args.output_dir.join("composite.png"))?;
    output::write_summary(&reports, &args.output_dir.join("summary.json"))?;

    if let Some(message) = manager.error_message() {
        warn!(error = message, "Some layers could not be displayed");
    }

    let rendered = reports
        .iter()
        .filter(|r| r.status == output::LayerStatus::Rendered)
        .count();
    info!(
        rendered,
        output_dir = %args.output_dir.display(),
        "Overlay rendering complete"
    );

    manager.teardown();
    Ok(())
}

/// Keep the first occurrence of each kind. Toggling a kind twice would
/// switch it back off.
fn dedup(kinds: &[LayerKind]) -> Vec<LayerKind> {
    let mut seen = [false; LayerKind::COUNT];
    kinds
        .iter()
        .copied()
        .filter(|kind| !std::mem::replace(&mut seen[kind.index()], true))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_args_parse_layer_list() {
        let args = Args::try_parse_from([
            "overlay-renderer",
            "--bundle",
            "bundle.json",
            "--layers",
            "annual_flux,building-mask,monthly_flux",
        ])
        .unwrap();

        assert_eq!(
            args.layers,
            vec![LayerKind::AnnualFlux, LayerKind::BuildingMask, LayerKind::MonthlyFlux]
        );
        assert_eq!(args.zoom, 20.0);
        assert_eq!(args.output_dir, PathBuf::from("overlays"));
    }

    #[test]
    fn test_args_reject_unknown_layer() {
        let result = Args::try_parse_from([
            "overlay-renderer",
            "--bundle",
            "bundle.json",
            "--layers",
            "rgb",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_dedup_keeps_first() {
        let kinds = [LayerKind::MonthlyFlux, LayerKind::AnnualFlux, LayerKind::MonthlyFlux];
        assert_eq!(dedup(&kinds), vec![LayerKind::MonthlyFlux, LayerKind::AnnualFlux]);
    }

    #[test]
    fn test_fetcher_built_once_and_shared() {
        let ctx = AppContext::new(Some("k".into()), load_styles(None).unwrap());
        let first = tokio_test::block_on(ctx.fetcher()).unwrap();
        let second = tokio_test::block_on(ctx.fetcher()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        drop(second);
        let count = Arc::strong_count(&first);
        let _decoder = GridDecoder::new(Arc::clone(&first) as Arc<_>);
        assert_eq!(Arc::strong_count(&first), count + 1);
    }
}
