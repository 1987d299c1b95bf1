use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info, warn};

use crate::audio::{LoadError, SampleBuffer};

const AUDIO_EXTENSIONS: [&str; 3] = ["wav", "mp3", "flac"];

#[derive(Debug)]
pub struct LoadResult {
    pub index: usize,
    pub outcome: Result<Arc<SampleBuffer>, LoadError>,
}

struct LoadRequest {
    index: usize,
    path: PathBuf,
}

/// Decodes samples on a worker thread, one request at a time, in order.
pub struct SampleLoader {
    requests: Sender<LoadRequest>,
    results: Receiver<LoadResult>,
    // lets a refused request still come back as a failed result
    refused: Sender<LoadResult>,
}

impl SampleLoader {
    pub fn spawn(target_rate: u32) -> anyhow::Result<Self> {
        let (requests, request_rx) = crossbeam_channel::unbounded::<LoadRequest>();
        let (result_tx, results) = crossbeam_channel::unbounded::<LoadResult>();
        let refused = result_tx.clone();

        thread::Builder::new()
            .name("sample-loader".into())
            .spawn(move || {
                // ends when the loader handle (and with it `requests`) is dropped
                for req in request_rx.iter() {
                    debug!("decoding {}", req.path.display());
                    let outcome = SampleBuffer::load(&req.path, target_rate).map(Arc::new);
                    match &outcome {
                        Ok(buf) => info!(
                            "loaded sample {} ({:.1}s) from {}",
                            req.index,
                            buf.duration_secs(),
                            req.path.display()
                        ),
                        Err(e) => warn!("sample {} ({}): {e}", req.index, req.path.display()),
                    }
                    if result_tx.send(LoadResult { index: req.index, outcome }).is_err() {
                        break;
                    }
                }
            })
            .context("could not spawn sample loader thread")?;

        Ok(Self { requests, results, refused })
    }

    /// Queues a decode. If the worker is gone the request fails straight away,
    /// so the sample shows a retry instead of buffering forever.
    pub fn request(&self, index: usize, path: &Path) {
        if self.requests.send(LoadRequest { index, path: path.to_path_buf() }).is_err() {
            error!("sample loader is gone, can't load {}", path.display());
            let _ = self.refused.send(LoadResult { index, outcome: Err(LoadError::LoaderStopped) });
        }
    }

    pub fn poll(&self) -> Option<LoadResult> {
        self.results.try_recv().ok()
    }

    #[cfg(test)]
    pub fn wait(&self) -> Option<LoadResult> {
        self.results.recv_timeout(std::time::Duration::from_secs(10)).ok()
    }
}

/// Audio files directly inside `dir`, sorted by file name.
pub fn index_audio_in_dir(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("could not read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_audio(p))
        .collect();
    paths.sort();
    Ok(paths)
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| AUDIO_EXTENSIONS.iter().any(|a| e.eq_ignore_ascii_case(a)))
}
