use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "brandmark", version)]
struct Cli {
    /// Log compositing stages to stderr (overridden by RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Overlay a logo onto a base image and write the result as PNG.
    Composite(CompositeArgs),
    /// Print where a logo would be placed, as JSON, without decoding anything.
    Plan(PlanArgs),
}

#[derive(Parser, Debug)]
struct CompositeArgs {
    /// Base image: data URI, http(s) URL, file:// URL or path.
    #[arg(long)]
    base: String,

    /// Logo image: data URI, http(s) URL, file:// URL or path.
    #[arg(long)]
    logo: String,

    /// Output path.
    #[arg(long)]
    out: PathBuf,

    /// Watermark policy JSON (`scale_factor`, `padding`, `opacity`).
    #[arg(long)]
    policy: Option<PathBuf>,

    /// Write a `data:image/png;base64,...` text file instead of raw PNG bytes.
    #[arg(long)]
    data_uri: bool,

    /// Backend to use.
    #[arg(long, value_enum, default_value_t = BackendChoice::Cpu)]
    backend: BackendChoice,
}

#[derive(Parser, Debug)]
struct PlanArgs {
    /// Base image size, `WIDTHxHEIGHT`.
    #[arg(long)]
    base: brandmark::ImageSize,

    /// Logo natural size, `WIDTHxHEIGHT`.
    #[arg(long)]
    logo: brandmark::ImageSize,

    /// Watermark policy JSON.
    #[arg(long)]
    policy: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendChoice {
    Cpu,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Composite(args) => cmd_composite(args).await,
        Command::Plan(args) => cmd_plan(args),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "brandmark=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_policy(path: Option<&Path>) -> anyhow::Result<brandmark::WatermarkPolicy> {
    match path {
        Some(p) => Ok(brandmark::WatermarkPolicy::from_path(p)?),
        None => Ok(brandmark::WatermarkPolicy::default()),
    }
}

async fn cmd_composite(args: CompositeArgs) -> anyhow::Result<()> {
    let policy = read_policy(args.policy.as_deref())?;
    let kind = match args.backend {
        BackendChoice::Cpu => brandmark::BackendKind::Cpu,
    };
    let backend = brandmark::create_backend(kind, brandmark::CpuBackendOpts::default());
    let compositor = brandmark::Compositor::with_policy(backend, policy)?;

    let out = compositor.composite_refs(&args.base, &args.logo).await?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    let written = if args.data_uri {
        std::fs::write(&args.out, out.to_data_uri_string())
    } else {
        std::fs::write(&args.out, &out.png)
    };
    written.with_context(|| format!("write '{}'", args.out.display()))?;

    eprintln!("wrote {} ({})", args.out.display(), out.size());
    Ok(())
}

fn cmd_plan(args: PlanArgs) -> anyhow::Result<()> {
    let policy = read_policy(args.policy.as_deref())?;
    policy.validate()?;
    let placement = brandmark::place_logo(args.base, args.logo, &policy)?;
    let json = serde_json::to_string_pretty(&placement).context("serialize placement")?;
    println!("{json}");
    Ok(())
}
