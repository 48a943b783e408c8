mod app;
mod config;
mod data;
mod layout;
mod selection;
mod util;

use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::app::LaunchOptions;
use crate::config::ExplorerConfig;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON dataset with items, links and distances
    #[arg(long)]
    dataset: PathBuf,

    /// JSON config file with layout tuning
    #[arg(long)]
    config: Option<PathBuf>,

    /// File the selection is kept in between sessions
    #[arg(long)]
    selection_file: Option<PathBuf>,

    /// Selection as a query string (`q=<id>&n=<id>`); wins over the selection file
    #[arg(long)]
    query: Option<String>,

    /// Number of results a search returns
    #[arg(long)]
    max_results: Option<usize>,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    debug: bool,
}

fn init_tracing(args: &Args) {
    let filter_layer = if args.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else if args.verbose {
        tracing_subscriber::EnvFilter::new("info")
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args);
    info!("replica-explorer v{}", env!("CARGO_PKG_VERSION"));

    let mut config = ExplorerConfig::load(args.config.as_deref())?;
    if let Some(max_results) = args.max_results {
        config.max_results = max_results.max(1);
    }

    let launch = LaunchOptions {
        dataset_path: args.dataset,
        selection_file: args.selection_file,
        query: args.query,
        config,
    };
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "replica-explorer",
        options,
        Box::new(move |cc| Ok(Box::new(app::ExplorerApp::new(cc, launch)))),
    )
    .map_err(|error| anyhow!("failed to run the explorer window: {error}"))
}
