use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::Context;
use env_logger::{Env, Target};

use crate::config::CONFIG_DIR;

const LOG_FILE: &str = "looproom.log";

/// <project_dir>/.looproom/looproom.log
pub fn log_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_DIR).join(LOG_FILE)
}

/// The terminal is in raw mode for the whole run, so logs go to a file
/// instead of stderr. `RUST_LOG` overrides the default `info` filter.
pub fn init_logging(project_dir: &Path) -> anyhow::Result<PathBuf> {
    let path = log_path(project_dir);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("could not create {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("could not open {}", path.display()))?;

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .format_timestamp_millis()
        .try_init()
        .context("logger already initialised")?;

    log::info!("looproom {} started", env!("CARGO_PKG_VERSION"));
    Ok(path)
}
