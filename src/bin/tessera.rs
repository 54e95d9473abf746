use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "tessera", version)]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decompose a template into a project JSON.
    Decompose(DecomposeArgs),
    /// Render a single frame of a project as a PNG.
    Frame(FrameArgs),
    /// Export a project as MP4 (requires `ffmpeg` on PATH) or GIF.
    Export(ExportArgs),
}

#[derive(Parser, Debug)]
struct DecomposeArgs {
    /// Template markup (SVG).
    #[arg(long)]
    markup: PathBuf,

    /// Annotation JSON.
    #[arg(long)]
    annotation: PathBuf,

    /// Canvas preset: landscape, portrait or square.
    #[arg(long, default_value = "landscape")]
    category: tessera::TargetCategory,

    /// Duration of every produced clip, in seconds.
    #[arg(long, default_value_t = 5.0)]
    duration: f64,

    /// Decimals kept in rewritten path data.
    #[arg(long, default_value_t = 2)]
    precision: u8,

    /// Measure from parsed geometry only, without font shaping.
    #[arg(long, default_value_t = false)]
    computed: bool,

    /// Extra font directory (repeatable).
    #[arg(long = "font-dir")]
    font_dirs: Vec<PathBuf>,

    /// Output project JSON.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Input project JSON.
    #[arg(long)]
    project: PathBuf,

    /// Project time in seconds.
    #[arg(long, default_value_t = 0.0)]
    time: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatChoice {
    Mp4,
    Gif,
}

#[derive(Parser, Debug)]
struct ExportArgs {
    /// Input project JSON.
    #[arg(long)]
    project: PathBuf,

    /// Output path.
    #[arg(long)]
    out: PathBuf,

    /// Output format; defaults to the output extension, else mp4.
    #[arg(long, value_enum)]
    format: Option<FormatChoice>,

    /// Output frames per second.
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Enable frame-level parallelism.
    #[arg(long, default_value_t = false)]
    parallel: bool,

    /// Override rayon worker threads (parallel mode only).
    #[arg(long)]
    threads: Option<usize>,

    /// Timestamps per frame-extraction request.
    #[arg(long)]
    batch_size: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    match cli.cmd {
        Command::Decompose(args) => cmd_decompose(args),
        Command::Frame(args) => cmd_frame(args),
        Command::Export(args) => cmd_export(args),
    }
}

fn parent_or_cwd(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn load_project(path: &Path) -> anyhow::Result<tessera::Project> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("read project '{}'", path.display()))?;
    Ok(tessera::Project::from_json(&json)?)
}

fn cmd_decompose(args: DecomposeArgs) -> anyhow::Result<()> {
    let markup = std::fs::read_to_string(&args.markup)
        .with_context(|| format!("read markup '{}'", args.markup.display()))?;
    let annotation = std::fs::read_to_string(&args.annotation)
        .with_context(|| format!("read annotation '{}'", args.annotation.display()))?;

    let measurer = if args.computed {
        tessera::MeasurerKind::Computed
    } else {
        tessera::MeasurerKind::Host
    };
    let opts = tessera::DecomposeOpts::default()
        .with_category(args.category)
        .with_project_duration(args.duration)
        .with_path_precision(tessera::PathPrecision::new(args.precision)?)
        .with_base_dir(parent_or_cwd(&args.markup))
        .with_font_dirs(args.font_dirs)
        .with_measurer(measurer);
    let decomposition = tessera::Decomposer::new(opts).decompose(&markup, &annotation)?;
    let clips = decomposition.clips.len();
    let json = decomposition.into_project().to_json_pretty()?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, json)
        .with_context(|| format!("write project '{}'", args.out.display()))?;

    eprintln!("wrote {} ({clips} clips)", args.out.display());
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let project = load_project(&args.project)?;
    let compositor = tessera::CompositorOpts::default().with_base_dir(parent_or_cwd(&args.project));
    let exporter = tessera::Exporter::new(tessera::ExportOpts::default(), compositor);
    exporter.export_png(&project.snapshot(), project.canvas, args.time, &args.out)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_export(args: ExportArgs) -> anyhow::Result<()> {
    let project = load_project(&args.project)?;
    let format = match args.format {
        Some(FormatChoice::Mp4) => tessera::ExportFormat::Mp4,
        Some(FormatChoice::Gif) => tessera::ExportFormat::Gif,
        None => tessera::ExportFormat::from_path(&args.out)
            .filter(|f| *f != tessera::ExportFormat::Png)
            .unwrap_or(tessera::ExportFormat::Mp4),
    };
    if format == tessera::ExportFormat::Mp4 && !tessera::is_ffmpeg_on_path() {
        anyhow::bail!("ffmpeg is required for MP4 export, but was not found on PATH");
    }

    let mut opts = tessera::ExportOpts::default()
        .with_fps(args.fps)
        .with_format(format);
    if let Some(n) = args.batch_size {
        opts = opts.with_extract_batch_size(n);
    }
    if args.parallel {
        opts = opts.with_parallel(args.threads);
    }
    let compositor = tessera::CompositorOpts::default().with_base_dir(parent_or_cwd(&args.project));
    let exporter = tessera::Exporter::new(opts, compositor);

    let snapshot = project.snapshot();
    let stats = exporter.export_to_file(
        &snapshot,
        project.canvas,
        &args.out,
        &tessera::CancelToken::new(),
    )?;

    eprintln!(
        "wrote {} ({} frames, {} clip draws skipped)",
        args.out.display(),
        stats.frames_total,
        stats.clips_skipped
    );
    Ok(())
}
