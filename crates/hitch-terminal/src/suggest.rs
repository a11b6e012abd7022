//! Ranked suggestion index over apps and built-in commands.
//!
//! The index is rebuilt wholesale on a background thread and swapped in
//! under a lock. Each rebuild request bumps a generation counter; a build
//! publishes only if its generation is still current when it finishes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use hitch_platform::{AppInfo, AppService, now_millis};
use hitch_types::error::{HitchError, Result};

/// Bonus for apps installed or updated inside [`RECENT_WINDOW_MS`].
pub const RECENCY_BONUS: i64 = 50;

/// Two days.
pub const RECENT_WINDOW_MS: u64 = 2 * 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestionKind {
    App,
    Command,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionEntry {
    /// What is shown and completed.
    pub text: String,
    pub kind: SuggestionKind,
    /// App identifier or command name.
    pub payload: String,
    pub score: i64,
}

/// Score and sort apps and commands, highest score first.
///
/// The sort is stable, so equal scores keep enumeration order (apps
/// before commands).
pub fn build_index(
    apps: &[AppInfo],
    commands: &[(String, i32)],
    now_ms: u64,
) -> Vec<SuggestionEntry> {
    let mut entries: Vec<SuggestionEntry> = apps
        .iter()
        .map(|app| {
            let recent = app.last_update_ms > 0
                && now_ms.saturating_sub(app.last_update_ms) <= RECENT_WINDOW_MS;
            SuggestionEntry {
                text: app.label.clone(),
                kind: SuggestionKind::App,
                payload: app.identifier.clone(),
                score: i64::from(app.launch_count) + if recent { RECENCY_BONUS } else { 0 },
            }
        })
        .chain(commands.iter().map(|(name, priority)| SuggestionEntry {
            text: name.clone(),
            kind: SuggestionKind::Command,
            payload: name.clone(),
            score: i64::from(*priority),
        }))
        .collect();
    entries.sort_by(|a, b| b.score.cmp(&a.score));
    entries
}

struct Inner {
    index: Mutex<Arc<Vec<SuggestionEntry>>>,
    generation: AtomicU64,
    apps: Arc<dyn AppService>,
    commands: Vec<(String, i32)>,
}

/// Published suggestion index plus the machinery to rebuild it.
pub struct SuggestionRepository {
    inner: Arc<Inner>,
    builds: Mutex<Vec<JoinHandle<()>>>,
}

impl SuggestionRepository {
    /// `commands` is the `(name, priority)` snapshot of the registry.
    pub fn new(apps: Arc<dyn AppService>, commands: Vec<(String, i32)>) -> Self {
        Self {
            inner: Arc::new(Inner {
                index: Mutex::new(Arc::new(Vec::new())),
                generation: AtomicU64::new(0),
                apps,
                commands,
            }),
            builds: Mutex::new(Vec::new()),
        }
    }

    /// Start a rebuild, superseding any build still running.
    pub fn request_rebuild(&self) -> Result<()> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        let handle = thread::Builder::new()
            .name("hitch-suggest".to_string())
            .spawn(move || inner.rebuild(generation))
            .map_err(|e| HitchError::Platform(format!("spawn suggestion worker: {e}")))?;

        let mut builds = self.builds.lock().unwrap_or_else(PoisonError::into_inner);
        builds.retain(|h| !h.is_finished());
        builds.push(handle);
        Ok(())
    }

    /// Block until every requested build has finished.
    pub fn wait_idle(&self) {
        let pending: Vec<JoinHandle<()>> = self
            .builds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for handle in pending {
            if handle.join().is_err() {
                log::warn!("suggestion worker panicked");
            }
        }
    }

    /// The currently published index.
    pub fn index(&self) -> Arc<Vec<SuggestionEntry>> {
        let index = self.inner.index.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*index)
    }

    /// Generation of the most recent request.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Entries whose text starts with `prefix` (case-insensitive), in rank order.
    pub fn suggest(&self, prefix: &str) -> Vec<SuggestionEntry> {
        let prefix = prefix.to_lowercase();
        self.index()
            .iter()
            .filter(|e| e.text.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect()
    }
}

impl Inner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn rebuild(&self, generation: u64) {
        let apps = self.apps.list_launchable();
        if !self.is_current(generation) {
            log::debug!("suggestion build {generation} superseded before scoring");
            return;
        }
        let entries = build_index(&apps, &self.commands, now_millis());

        let mut index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.is_current(generation) {
            log::debug!("suggestion build {generation} superseded, discarded");
            return;
        }
        log::info!("Published {} suggestions (build {generation})", entries.len());
        *index = Arc::new(entries);
    }
}
