//! Watches the incoming prefix of a local bucket and turns new files into upload events.

use crate::error::{IngestError, IngestResult};
use glob::Pattern;
use mediaflow_config::WatchConfig;
use mediaflow_core::{keys, UploadEvent, PUT_EVENT_NAME};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent, Debouncer};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;
use tracing::{debug, error, info};

/// Configuration for the upload watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub bucket: String,
    /// Directory of the bucket; keys are paths relative to it.
    pub bucket_dir: PathBuf,
    pub incoming_prefix: String,
    pub ignore_patterns: Vec<Pattern>,
    pub debounce: Duration,
}

impl WatcherConfig {
    pub fn new(bucket: &str, bucket_dir: PathBuf, incoming_prefix: &str, watch: &WatchConfig) -> Self {
        let ignore_patterns = watch
            .ignore_patterns
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();

        Self {
            bucket: bucket.to_string(),
            bucket_dir,
            incoming_prefix: incoming_prefix.to_string(),
            ignore_patterns,
            debounce: Duration::from_secs(watch.poll_interval_seconds.max(1)),
        }
    }

    /// Directory that receives uploads.
    pub fn incoming_dir(&self) -> PathBuf {
        let prefix = self.incoming_prefix.trim_matches('/');
        if prefix.is_empty() {
            self.bucket_dir.clone()
        } else {
            self.bucket_dir.join(prefix)
        }
    }

    /// Upload event for a file under the bucket directory, if it qualifies.
    pub fn event_for(&self, path: &Path) -> Option<UploadEvent> {
        if should_ignore_path(path, &self.ignore_patterns) {
            debug!("Ignoring file: {:?}", path);
            return None;
        }

        let relative = path.strip_prefix(&self.bucket_dir).ok()?;
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !key.starts_with(&self.incoming_prefix) {
            return None;
        }

        Some(UploadEvent::new(
            self.bucket.clone(),
            keys::encode_key(&key),
            PUT_EVENT_NAME,
        ))
    }
}

/// Filesystem watcher producing upload events for the incoming prefix.
pub struct UploadWatcher {
    config: WatcherConfig,
    debouncer: Debouncer<RecommendedWatcher>,
    receiver: Receiver<Result<Vec<DebouncedEvent>, notify::Error>>,
}

impl UploadWatcher {
    pub fn new(config: WatcherConfig) -> IngestResult<Self> {
        let (tx, rx) = channel();

        let debouncer = new_debouncer(config.debounce, tx)
            .map_err(|e| IngestError::WatchError(e.to_string()))?;

        Ok(Self {
            config,
            debouncer,
            receiver: rx,
        })
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Start watching the incoming directory, creating it if needed.
    pub fn start(&mut self) -> IngestResult<()> {
        let dir = self.config.incoming_dir();
        std::fs::create_dir_all(&dir)?;

        info!("Watching directory: {:?}", dir);
        self.debouncer
            .watcher()
            .watch(&dir, RecursiveMode::Recursive)
            .map_err(|e| IngestError::WatchError(e.to_string()))?;

        Ok(())
    }

    /// Drain pending events without blocking.
    pub fn poll(&self) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Ok(result) = self.receiver.try_recv() {
            self.collect(result, &mut events);
        }
        events
    }

    /// Wait up to `timeout` for the next batch of events.
    pub fn next_batch(&self, timeout: Duration) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        if let Ok(result) = self.receiver.recv_timeout(timeout) {
            self.collect(result, &mut events);
        }
        events
    }

    fn collect(
        &self,
        result: Result<Vec<DebouncedEvent>, notify::Error>,
        events: &mut Vec<UploadEvent>,
    ) {
        match result {
            Ok(debounced) => {
                for event in debounced {
                    // Deletions and directories surface here too.
                    if !event.path.is_file() {
                        continue;
                    }
                    if let Some(upload) = self.config.event_for(&event.path) {
                        info!("New upload: {}", upload.key);
                        events.push(upload);
                    }
                }
            }
            Err(e) => error!("Watch error: {:?}", e),
        }
    }
}

/// Upload events for files already present in the incoming directory.
pub fn scan_incoming(config: &WatcherConfig) -> IngestResult<Vec<UploadEvent>> {
    let dir = config.incoming_dir();
    if !dir.exists() {
        return Err(IngestError::DirectoryNotFound(dir));
    }

    let mut events = Vec::new();
    for entry in walkdir::WalkDir::new(&dir)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(event) = config.event_for(entry.path()) {
            events.push(event);
        }
    }

    Ok(events)
}

fn should_ignore_path(path: &Path, patterns: &[Pattern]) -> bool {
    if let Some(filename) = path.file_name().and_then(|n| n.to_str()) {
        // Hidden files
        if filename.starts_with('.') {
            return true;
        }

        for pattern in patterns {
            if pattern.matches(filename) {
                return true;
            }
        }
    }

    false
}
