use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scenereel", version)]
struct Cli {
    /// Editor configuration JSON. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print layer offsets and frame ranges of a session document.
    Inspect(SessionArgs),
    /// Seek to a frame and print the active layer with interpolated item state.
    Seek(SeekArgs),
    /// Flatten one layer to a PNG.
    Flatten(FlattenArgs),
    /// Extract a binary inpaint mask for one layer as a PNG.
    Mask(MaskArgs),
}

#[derive(Parser, Debug)]
struct SessionArgs {
    /// Input session document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct SeekArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Global frame index (0-based).
    #[arg(long)]
    frame: u64,
}

#[derive(Parser, Debug)]
struct FlattenArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Layer `_id`. Defaults to the first layer.
    #[arg(long)]
    layer: Option<String>,

    /// Sample animations at this global frame instead of flattening static geometry.
    #[arg(long)]
    frame: Option<u64>,

    /// Root for relative image paths. Defaults to the document's directory.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct MaskArgs {
    #[command(flatten)]
    session: SessionArgs,

    /// Layer `_id`. Defaults to the first layer.
    #[arg(long)]
    layer: Option<String>,

    /// Mask pixel convention.
    #[arg(long, value_enum, default_value_t = ConventionChoice::Colored)]
    convention: ConventionChoice,

    /// JSON array of strokes (`[{"points": [{"x":..,"y":..}], "width": ..}]`).
    #[arg(long)]
    strokes: Option<PathBuf>,

    /// Root for relative image paths. Defaults to the document's directory.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ConventionChoice {
    Colored,
    Transparent,
}

impl From<ConventionChoice> for scenereel::MaskConvention {
    fn from(c: ConventionChoice) -> Self {
        match c {
            ConventionChoice::Colored => Self::Colored,
            ConventionChoice::Transparent => Self::Transparent,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();
    match cli.cmd {
        Command::Inspect(args) => cmd_inspect(config, args),
        Command::Seek(args) => cmd_seek(config, args),
        Command::Flatten(args) => cmd_flatten(config, args),
        Command::Mask(args) => cmd_mask(config, args),
    }
}

fn load_session(
    config: Option<&Path>,
    path: &Path,
) -> anyhow::Result<scenereel::EditorSession> {
    let mut cfg = match config {
        Some(p) => scenereel::EditorConfig::load(p)?,
        None => scenereel::EditorConfig::default(),
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read session document '{}'", path.display()))?;
    let doc = scenereel::SessionDocument::from_json_str(&text)
        .with_context(|| format!("parse session document '{}'", path.display()))?;
    if !doc.session_id.is_empty() {
        cfg.session_id = doc.session_id.clone();
    }
    cfg.aspect_ratio = doc.aspect_ratio;
    Ok(scenereel::EditorSession::from_document(cfg, doc)?)
}

fn pick_layer<'a>(
    session: &'a scenereel::EditorSession,
    id: Option<&str>,
) -> anyhow::Result<&'a scenereel::Layer> {
    let layer = match id {
        Some(id) => session.timeline().layer(&scenereel::LayerId::from(id)),
        None => session.timeline().layers.first(),
    };
    layer.with_context(|| match id {
        Some(id) => format!("layer '{id}' not found"),
        None => "session has no layers".to_string(),
    })
}

fn rasterizer(
    assets: Option<PathBuf>,
    in_path: &Path,
) -> scenereel::SvgSceneRasterizer<scenereel::FsAssetResolver> {
    let root = assets.unwrap_or_else(|| {
        in_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf()
    });
    scenereel::SvgSceneRasterizer::new(scenereel::FsAssetResolver::new(root))
}

fn write_png(raster: &scenereel::Raster, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let png = raster.encode_png()?;
    std::fs::write(out, png).with_context(|| format!("write '{}'", out.display()))?;
    Ok(())
}

fn cmd_inspect(config: Option<&Path>, args: SessionArgs) -> anyhow::Result<()> {
    let session = load_session(config, &args.in_path)?;
    let fps = session.config().fps();
    let tl = session.timeline();
    let layers: Vec<serde_json::Value> = tl
        .layers
        .iter()
        .map(|l| {
            let range = l.frame_range(fps);
            serde_json::json!({
                "id": l.id,
                "duration": l.duration,
                "durationOffset": l.duration_offset,
                "startFrame": range.start.0,
                "endFrame": range.end.0,
                "items": l.items().len(),
            })
        })
        .collect();
    let summary = serde_json::json!({
        "sessionId": session.config().session_id,
        "totalDuration": tl.total_duration(),
        "totalFrames": tl.total_frames(fps),
        "layers": layers,
        "audioLayers": tl.audio_layers.len(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn cmd_seek(config: Option<&Path>, args: SeekArgs) -> anyhow::Result<()> {
    let mut session = load_session(config, &args.session.in_path)?;
    let outcome = session.seek(scenereel::FrameIndex(args.frame));
    let layer_id = outcome
        .layer_index
        .map(|i| session.timeline().layers[i].id.clone());
    let out = serde_json::json!({
        "layerId": layer_id,
        "outcome": outcome,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_flatten(config: Option<&Path>, args: FlattenArgs) -> anyhow::Result<()> {
    let session = load_session(config, &args.session.in_path)?;
    let layer = pick_layer(&session, args.layer.as_deref())?;
    let canvas = session.config().working_canvas();
    let rasterizer = rasterizer(args.assets, &args.session.in_path);
    let raster = match args.frame {
        Some(f) => scenereel::flatten_layer_at(
            layer,
            scenereel::FrameIndex(f),
            session.config().fps(),
            canvas,
            &rasterizer,
        )?,
        None => scenereel::flatten_layer(layer, canvas, &rasterizer)?,
    };
    write_png(&raster, &args.out)?;
    tracing::info!(layer = %layer.id, out = %args.out.display(), "layer flattened");
    Ok(())
}

fn cmd_mask(config: Option<&Path>, args: MaskArgs) -> anyhow::Result<()> {
    let session = load_session(config, &args.session.in_path)?;
    let layer = pick_layer(&session, args.layer.as_deref())?;
    let strokes: Vec<scenereel::Stroke> = match &args.strokes {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("read strokes '{}'", p.display()))?;
            serde_json::from_str(&text).with_context(|| "parse strokes JSON")?
        }
        None => Vec::new(),
    };
    let rasterizer = rasterizer(args.assets, &args.session.in_path);
    let base = scenereel::flatten_layer(layer, session.config().working_canvas(), &rasterizer)?;
    let mask = scenereel::extract_mask(&base, &strokes, args.convention.into(), &rasterizer)?;
    write_png(&mask, &args.out)?;
    tracing::info!(layer = %layer.id, out = %args.out.display(), "mask written");
    Ok(())
}
