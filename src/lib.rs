// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::ConfigFile;
use crate::config::loader::load_and_validate;
use crate::logging::forward_watcher_log;
use crate::types::{ChangeType, CorrelationId, FileChange, WatchRequest};
use crate::watch::{
    FileWatcher, NonRecursiveWatcher, NotifyPrimitiveFactory, WatcherEvent, merge_requests,
};

/// Correlation id reserved for the watch on the config file itself.
pub const CONFIG_CORRELATION_ID: CorrelationId = CorrelationId::MAX;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the non-recursive watch coordinator with notify-backed watchers
/// - config reload on change
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = absolute_config_path(Path::new(&args.config))?;
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let factory = NotifyPrimitiveFactory::new(cfg.batch_delay());
    let (watcher, mut events) = NonRecursiveWatcher::new(factory, cfg.path_casing());
    let watcher: &dyn FileWatcher = &watcher;

    watcher
        .set_verbose_logging(args.verbose || cfg.watcher().verbose)
        .await;

    let config_request = config_watch_request(&config_path)?;
    watcher
        .watch(with_config_request(cfg.requests(), &config_request))
        .await?;
    info!(requests = cfg.requests().len(), "watching");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    warn!("failed to listen for Ctrl+C: {e}");
                }
                info!("shutdown requested");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    info!("watcher event channel closed; exiting");
                    break;
                };
                if handle_event(event) {
                    reload_config(watcher, &config_path, &config_request, args.verbose).await?;
                }
            }
        }
    }

    watcher.stop().await?;
    info!("all watchers stopped");
    Ok(())
}

/// Print or log one watcher event. Returns true if the config file changed.
fn handle_event(event: WatcherEvent) -> bool {
    match event {
        WatcherEvent::Changed(changes) => {
            let mut config_changed = false;
            for change in changes {
                if change.correlation_id == Some(CONFIG_CORRELATION_ID) {
                    config_changed = true;
                } else {
                    println!("{}", format_change(&change));
                }
            }
            config_changed
        }
        WatcherEvent::WatchFailed(request) => {
            warn!(%request, "watch failed");
            false
        }
        WatcherEvent::Log(message) => {
            forward_watcher_log(&message);
            false
        }
    }
}

async fn reload_config(
    watcher: &dyn FileWatcher,
    config_path: &Path,
    config_request: &WatchRequest,
    verbose_flag: bool,
) -> Result<()> {
    let cfg = match load_and_validate(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("ignoring invalid config change: {e}");
            return Ok(());
        }
    };

    info!(requests = cfg.requests().len(), "config changed; reconciling watchers");
    watcher
        .set_verbose_logging(verbose_flag || cfg.watcher().verbose)
        .await;
    watcher
        .watch(with_config_request(cfg.requests(), config_request))
        .await?;
    Ok(())
}

fn with_config_request(requests: &[WatchRequest], config_request: &WatchRequest) -> Vec<WatchRequest> {
    let mut all = requests.to_vec();
    all.push(config_request.clone());
    all
}

/// Watch the config file's directory, filtered down to the file itself.
fn config_watch_request(config_path: &Path) -> Result<WatchRequest> {
    let dir = config_path
        .parent()
        .with_context(|| format!("config path {:?} has no parent directory", config_path))?;
    let file_name = config_path
        .file_name()
        .with_context(|| format!("config path {:?} has no file name", config_path))?;

    Ok(WatchRequest {
        path: dir.to_path_buf(),
        excludes: Vec::new(),
        includes: vec![file_name.to_string_lossy().into_owned()],
        correlation_id: Some(CONFIG_CORRELATION_ID),
    })
}

fn absolute_config_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().context("resolving current directory")?;
    Ok(cwd.join(path))
}

fn format_change(change: &FileChange) -> String {
    let kind = match change.kind {
        ChangeType::Added => "added",
        ChangeType::Updated => "updated",
        ChangeType::Deleted => "deleted",
    };
    match change.correlation_id {
        Some(id) => format!("{kind}\t{}\t#{id}", change.path.display()),
        None => format!("{kind}\t{}", change.path.display()),
    }
}

/// Simple dry-run output: print the merged requests that would be watched.
fn print_dry_run(cfg: &ConfigFile) {
    println!("flatwatch dry-run");
    println!("  watcher.verbose = {}", cfg.watcher().verbose);
    println!("  watcher.path_casing = {:?}", cfg.path_casing());
    println!("  watcher.batch_delay_ms = {}", cfg.watcher().batch_delay_ms);
    println!();

    let merged = merge_requests(cfg.requests().to_vec(), cfg.path_casing());
    println!(
        "watchers ({} for {} requests):",
        merged.len(),
        cfg.requests().len()
    );
    for request in &merged {
        println!("  - {}", request.request);
        for additional in &request.additional_requests {
            println!("      + {additional}");
        }
    }

    debug!("dry-run complete (nothing watched)");
}
