//! Subcommand implementations.

use anyhow::{Context, Result};
use partsearch_core::search::format_size;
use partsearch_core::{
    IndexEvent, IndexOptions, PartSearch, ScanOutcome, SearchEvent, SearchHit, SearchRequest,
};
use tracing::{error, info, warn};

pub fn list_roots(app: &PartSearch) -> Result<()> {
    let roots = app.list_roots()?;
    if roots.is_empty() {
        println!("No roots registered");
    }
    for root in roots {
        println!(
            "[{}] {}  ({} files)",
            if root.enabled { "x" } else { " " },
            root.path,
            root.file_count
        );
    }
    Ok(())
}

pub fn add_roots(app: &PartSearch, paths: &[String]) -> Result<()> {
    for path in paths {
        let root = app
            .register_root(path)
            .with_context(|| format!("Could not register {}", path))?;
        println!("Registered {}", root.path);
    }
    Ok(())
}

pub fn remove_root(app: &PartSearch, path: &str, delete_store: bool) -> Result<()> {
    match app.remove_root(path, delete_store)? {
        Some(root) => println!("Removed {}", root.path),
        None => println!("{} is not registered", path),
    }
    Ok(())
}

pub fn set_enabled(app: &PartSearch, path: &str, enabled: bool) -> Result<()> {
    let root = app.set_root_enabled(path, enabled)?;
    println!(
        "{} {}",
        if root.enabled { "Enabled" } else { "Disabled" },
        root.path
    );
    Ok(())
}

pub fn suggest_roots(app: &PartSearch) -> Result<()> {
    for dir in app.suggest_roots()? {
        println!("{}", dir.display());
    }
    Ok(())
}

pub fn status(app: &PartSearch) -> Result<()> {
    for status in app.all_root_status()? {
        println!(
            "{}\n  enabled: {}  files: {}  last full scan: {}{}",
            status.path,
            status.enabled,
            status.indexed_files,
            status.last_scan_text(),
            if status.scanning { "  (scanning)" } else { "" }
        );
    }
    Ok(())
}

pub async fn index(app: &PartSearch, paths: Vec<String>, incremental: bool) -> Result<()> {
    let roots = if paths.is_empty() { None } else { Some(paths) };
    let options = if incremental {
        IndexOptions::incremental()
    } else {
        IndexOptions::default()
    };
    let mut handle = app.start_index(roots, options)?;

    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping after the current entry");
            cancel.cancel();
        }
    });

    while let Some(event) = handle.next_event().await {
        match event {
            IndexEvent::RootStarted { root, .. } => info!(root = %root, "Scanning"),
            IndexEvent::Progress(p) => info!(
                root = %p.root,
                scanned = p.scanned,
                updated = p.updated,
                elapsed_secs = p.elapsed_secs,
                "Progress"
            ),
            IndexEvent::Finalizing { root } => info!(root = %root, "Finalizing"),
            IndexEvent::Error { root, message } => error!(root = %root, "{}", message),
            IndexEvent::CurrentPath { .. } | IndexEvent::RootDone(_) | IndexEvent::AllDone => {}
        }
    }

    for report in handle.wait().await? {
        let state = match report.outcome {
            ScanOutcome::Completed { pruned } => format!("done, {} pruned", pruned),
            ScanOutcome::Cancelled => "cancelled".to_string(),
        };
        println!(
            "{}: {} scanned, {} updated, {} skipped in {:.1}s ({})",
            report.root,
            report.scanned,
            report.updated,
            report.skipped.total(),
            report.elapsed_secs,
            state
        );
    }
    Ok(())
}

pub async fn search(app: &PartSearch, request: SearchRequest) -> Result<()> {
    let mut handle = app.start_search(request);

    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    while let Some(event) = handle.next_event().await {
        match event {
            SearchEvent::Batch { hits } => hits.iter().for_each(print_hit),
            SearchEvent::Advisory { message } => warn!("{}", message),
            SearchEvent::Done(outcome) => {
                let sources: Vec<String> = outcome.sources.iter().map(|s| s.to_string()).collect();
                println!(
                    "{} hits{} from [{}]",
                    outcome.hits.len(),
                    if outcome.cancelled { " (cancelled)" } else { "" },
                    sources.join(", ")
                );
            }
        }
    }
    Ok(())
}

fn print_hit(hit: &SearchHit) {
    let size = match hit.size {
        Some(bytes) if !hit.is_dir => format_size(bytes),
        _ => String::new(),
    };
    println!("{:<14} {:>9}  {}", hit.kind.label(), size, hit.path);
}
