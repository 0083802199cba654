//! PartSearch CLI - operator front end for the file index.
//!
//! Registers roots, runs index passes and searches through the
//! partsearch-core facade. Logs go to stderr; results go to stdout.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use partsearch_core::PartSearch;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "partsearch")]
#[command(about = "Index local directories and search them by file name")]
struct Args {
    /// Data directory (defaults to the platform local data directory)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage registered roots
    Roots {
        #[command(subcommand)]
        action: RootsAction,
    },
    /// Scan roots into the index (default: every enabled root)
    Index {
        paths: Vec<String>,
        /// Walk and upsert only; do not prune or stamp the scan time
        #[arg(long)]
        incremental: bool,
    },
    /// Search indexed roots, host search and optionally a live crawl
    Search {
        query: String,
        /// Restrict the search to this root (repeatable)
        #[arg(long = "root")]
        roots: Vec<PathBuf>,
        #[arg(long)]
        limit: Option<usize>,
        /// Match the words as one phrase, in order
        #[arg(long)]
        ordered: bool,
        #[arg(long)]
        no_index: bool,
        #[arg(long)]
        no_host: bool,
        /// Also walk the roots on disk
        #[arg(long)]
        crawl: bool,
    },
    /// Per-root file counts and last full scan
    Status,
}

#[derive(Subcommand, Debug)]
enum RootsAction {
    List,
    Add {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    Remove {
        path: String,
        /// Also delete the root's index store
        #[arg(long)]
        delete_store: bool,
    },
    Enable {
        path: String,
    },
    Disable {
        path: String,
    },
    /// Show likely directories that are not registered yet
    Suggest,
}

fn init_logging(debug: bool, json: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.debug, args.json_logs);

    let app = match &args.data_dir {
        Some(dir) => PartSearch::new(dir)?,
        None => PartSearch::platform_default()?,
    };
    debug!(data_dir = %app.paths().data_dir().display(), "Using data directory");

    match args.command {
        Command::Roots { action } => match action {
            RootsAction::List => commands::list_roots(&app),
            RootsAction::Add { paths } => commands::add_roots(&app, &paths),
            RootsAction::Remove { path, delete_store } => {
                commands::remove_root(&app, &path, delete_store)
            }
            RootsAction::Enable { path } => commands::set_enabled(&app, &path, true),
            RootsAction::Disable { path } => commands::set_enabled(&app, &path, false),
            RootsAction::Suggest => commands::suggest_roots(&app),
        },
        Command::Index { paths, incremental } => commands::index(&app, paths, incremental).await,
        Command::Search {
            query,
            roots,
            limit,
            ordered,
            no_index,
            no_host,
            crawl,
        } => {
            let mut request = partsearch_core::SearchRequest::new(query).with_roots(roots);
            if let Some(limit) = limit {
                request = request.with_limit(limit);
            }
            request.ordered = ordered;
            request.use_index = !no_index;
            request.use_host = !no_host;
            request.use_crawl = crawl;
            commands::search(&app, request).await
        }
        Command::Status => commands::status(&app),
    }
}
