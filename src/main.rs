use clap::Parser;
use gall::config::{self, BackendKind, GallConfig};
use gall::imaging::{ConvertBackend, ResizeBackend, RustBackend};
use gall::output;
use gall::pipeline::{self, BuildOptions};
use gall::prune::{self, PruneError};
use gall::render::MaudRenderer;
use gall::tree::GalleryTree;
use gall::urls::{UrlResolver, join_base_url};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gall")]
#[command(version, about = "Static HTML photo gallery builder")]
#[command(long_about = "\
Static HTML photo gallery builder

Every directory becomes a gallery page, every image gets a thumbnail and a
medium-sized copy with its own page. Run it again after adding photos: only
the missing images are resized, all pages are rewritten.

Layout produced for each directory:

  Trip/
  ├── index.html          # Gallery page
  ├── c.jpg               # Your original
  ├── tn/c_tn.jpg         # 133x133 thumbnail
  └── med/
      ├── c_med.jpg       # 800x800 medium
      └── c_med.html      # Medium page with prev/next links

Recognised files: .jpg .gif (images), .avi .mov (movies, listed only).

Run 'gall --gen-config' to print a documented gall.toml.")]
struct Cli {
    /// Directories to build
    #[arg(default_value = ".")]
    dirs: Vec<PathBuf>,

    /// Base URL the galleries are published under (overrides gall.toml)
    #[arg(short, long)]
    url: Option<String>,

    /// Log debug output
    #[arg(short, long)]
    debug: bool,

    /// Print a per-phase timing table after each build
    #[arg(short, long, conflicts_with = "profile_json")]
    profile: bool,

    /// Print the build report with per-phase timings as JSON
    #[arg(long)]
    profile_json: bool,

    /// Remove thumbnails and mediums whose source is gone
    #[arg(long)]
    prune: bool,

    /// With --prune, only list what would be removed
    #[arg(long, requires = "prune")]
    dry_run: bool,

    /// Print a stock gall.toml with all options documented
    #[arg(long)]
    gen_config: bool,
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if cli.gen_config {
        print!("{}", config::stock_config_toml());
        return Ok(ExitCode::SUCCESS);
    }

    let mut all_ok = true;
    for dir in &cli.dirs {
        match build_dir(&cli, dir) {
            Ok(ok) => all_ok &= ok,
            Err(err) => {
                error!("{}: {err}", dir.display());
                all_ok = false;
            }
        }
    }
    info!("Done");

    Ok(if all_ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Scan, build and optionally prune one directory. `Ok(false)` means the
/// build finished but something in it failed.
fn build_dir(cli: &Cli, dir: &Path) -> Result<bool, Box<dyn std::error::Error>> {
    let config = resolve_config(cli, dir)?;
    let base_url = join_base_url(&config.base_url, dir);
    info!("Base URL: {base_url}");

    println!("==> Scanning {}", dir.display());
    let tree = GalleryTree::scan(dir)?;
    output::print_scan_output(&tree);

    let backend = select_backend(&config);
    info!("Resizing with {}", backend.name());
    let renderer = MaudRenderer::new(
        UrlResolver::new(tree.root_path(), &base_url),
        config.row_size,
        &config.stylesheet,
    );
    let options = BuildOptions {
        fail_fast: config.processing.fail_fast,
        stylesheet: Some(config.stylesheet.clone()),
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config::effective_threads(&config.processing))
        .build()?;
    let (tx, rx) = std::sync::mpsc::channel();
    let root = dir.to_path_buf();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_build_event(&event, &root) {
                println!("{}", line);
            }
        }
    });
    let result = pool.install(|| {
        pipeline::build(&tree, backend.as_ref(), &renderer, &options, Some(tx))
    });
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;
    let report = result?;

    println!();
    output::print_build_summary(&report, dir);
    if cli.profile {
        output::print_phase_timings(&report);
    }
    if cli.profile_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if cli.prune {
        match prune::prune(&tree, cli.dry_run) {
            Ok(pruned) => output::print_prune_report(&pruned, dir),
            Err(err @ PruneError::IncompleteScan(_)) => warn!("{err}"),
            Err(err) => return Err(err.into()),
        }
    }

    Ok(report.is_success() && tree.errors().is_empty())
}

/// `gall.toml` in `dir`, with command-line overrides applied.
fn resolve_config(cli: &Cli, dir: &Path) -> Result<GallConfig, config::ConfigError> {
    let mut config = config::load_config(dir)?;
    if let Some(url) = &cli.url {
        config.base_url = url.clone();
        config.validate()?;
    }
    Ok(config)
}

fn select_backend(config: &GallConfig) -> Box<dyn ResizeBackend> {
    match config.processing.backend {
        BackendKind::Imagemagick => {
            Box::new(ConvertBackend::new(config.processing.convert_program.clone()))
        }
        BackendKind::Rust => Box::new(RustBackend::new()),
    }
}
