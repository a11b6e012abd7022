//! Shared test doubles for hitch-terminal tests.
//!
//! Every double records what it was asked to do so tests can assert on
//! the calls afterwards. [`Fixture`] bundles one of each together with an
//! in-memory alias store and builds an [`Environment`] on demand.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};

use hitch_platform::{
    AppGroup, AppInfo, AppService, InputSink, OutputCategory, OutputSink, SessionEvents,
    ShellCallback, ShellChannel, ShellResult,
};
use hitch_types::color::Rgb;
use hitch_types::config::TerminalConfig;

use crate::alias::{AliasManager, AliasSettings};
use crate::interpreter::{CommandRegistry, Environment};
use crate::redirect::Redirector;
use crate::suggest::SuggestionRepository;
use crate::system_commands::SystemContext;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingOutput {
    lines: Mutex<Vec<(String, Option<Rgb>, OutputCategory)>>,
    clears: Mutex<usize>,
}

impl RecordingOutput {
    pub fn lines(&self) -> Vec<(String, Option<Rgb>, OutputCategory)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.lines().into_iter().map(|(text, _, _)| text).collect()
    }

    /// Texts emitted under `category`.
    pub fn texts_in(&self, category: OutputCategory) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(_, _, c)| *c == category)
            .map(|(text, _, _)| text)
            .collect()
    }

    pub fn clears(&self) -> usize {
        *self.clears.lock().unwrap()
    }
}

impl OutputSink for RecordingOutput {
    fn emit(&self, text: &str, color: Option<Rgb>, category: OutputCategory) {
        self.lines
            .lock()
            .unwrap()
            .push((text.to_string(), color, category));
    }

    fn clear(&self) {
        *self.clears.lock().unwrap() += 1;
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingInput {
    texts: Mutex<Vec<String>>,
    hints: Mutex<Vec<String>>,
    resets: Mutex<usize>,
}

impl RecordingInput {
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn hints(&self) -> Vec<String> {
        self.hints.lock().unwrap().clone()
    }

    pub fn resets(&self) -> usize {
        *self.resets.lock().unwrap()
    }
}

impl InputSink for RecordingInput {
    fn set_input_text(&self, text: &str) {
        self.texts.lock().unwrap().push(text.to_string());
    }

    fn set_hint(&self, hint: &str) {
        self.hints.lock().unwrap().push(hint.to_string());
    }

    fn reset_hint(&self) {
        *self.resets.lock().unwrap() += 1;
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Records event names, plus the paths given to `on_directory_changed`.
#[derive(Default)]
pub struct RecordingEvents {
    names: Mutex<Vec<&'static str>>,
    directories: Mutex<Vec<PathBuf>>,
}

impl RecordingEvents {
    pub fn count(&self, name: &str) -> usize {
        self.names.lock().unwrap().iter().filter(|n| **n == name).count()
    }

    pub fn directories(&self) -> Vec<PathBuf> {
        self.directories.lock().unwrap().clone()
    }

    fn record(&self, name: &'static str) {
        self.names.lock().unwrap().push(name);
    }
}

impl SessionEvents for RecordingEvents {
    fn on_redirection_entered(&self, _hint: &str) {
        self.record("redirection_entered");
    }
    fn on_redirection_exited(&self) {
        self.record("redirection_exited");
    }
    fn on_privilege_elevated(&self) {
        self.record("privilege_elevated");
    }
    fn on_privilege_dropped(&self) {
        self.record("privilege_dropped");
    }
    fn on_directory_changed(&self, path: &Path) {
        self.record("directory_changed");
        self.directories.lock().unwrap().push(path.to_path_buf());
    }
    fn on_exit_requested(&self) {
        self.record("exit_requested");
    }
}

// ---------------------------------------------------------------------------
// Shell
// ---------------------------------------------------------------------------

/// Records submissions and answers callbacks synchronously.
///
/// `pwd` answers with the configured directory, commands given a reply
/// answer with it, and everything else answers with exit code 0 and no
/// output. A held command blocks its submitter until released.
#[derive(Default)]
pub struct MockShell {
    submitted: Mutex<Vec<String>>,
    resets: Mutex<usize>,
    pwd: Mutex<Option<PathBuf>>,
    elevation: Mutex<bool>,
    replies: Mutex<HashMap<String, Vec<String>>>,
    held: Mutex<Option<String>>,
    released: Condvar,
}

impl MockShell {
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn resets(&self) -> usize {
        *self.resets.lock().unwrap()
    }

    pub fn set_pwd(&self, dir: &Path) {
        *self.pwd.lock().unwrap() = Some(dir.to_path_buf());
    }

    pub fn set_elevation_available(&self, available: bool) {
        *self.elevation.lock().unwrap() = available;
    }

    pub fn reply(&self, command: &str, lines: &[&str]) {
        self.replies.lock().unwrap().insert(
            command.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
    }

    /// Block submissions of `command` until [`MockShell::release`].
    pub fn hold(&self, command: &str) {
        *self.held.lock().unwrap() = Some(command.to_string());
    }

    pub fn release(&self) {
        *self.held.lock().unwrap() = None;
        self.released.notify_all();
    }
}

impl ShellChannel for MockShell {
    fn submit(&self, command: &str, on_result: Option<ShellCallback>) {
        self.submitted.lock().unwrap().push(command.to_string());
        let mut held = self.held.lock().unwrap();
        while held.as_deref() == Some(command) {
            held = self.released.wait(held).unwrap();
        }
        drop(held);
        let Some(callback) = on_result else {
            return;
        };
        let output = match (command, self.pwd.lock().unwrap().as_ref()) {
            ("pwd", Some(dir)) => vec![dir.display().to_string()],
            _ => self
                .replies
                .lock()
                .unwrap()
                .get(command)
                .cloned()
                .unwrap_or_default(),
        };
        callback(ShellResult {
            exit_code: 0,
            output,
        });
    }

    fn reset(&self) {
        *self.resets.lock().unwrap() += 1;
    }

    fn elevation_available(&self) -> bool {
        *self.elevation.lock().unwrap()
    }
}

// ---------------------------------------------------------------------------
// Apps
// ---------------------------------------------------------------------------

/// Mutable in-memory app list. `launch` succeeds for known identifiers.
#[derive(Default)]
pub struct StaticApps {
    apps: Mutex<Vec<AppInfo>>,
    groups: Mutex<Vec<AppGroup>>,
    launched: Mutex<Vec<String>>,
}

impl StaticApps {
    pub fn add(&self, label: &str, identifier: &str, launch_count: u32, last_update_ms: u64) {
        self.apps.lock().unwrap().push(AppInfo {
            label: label.to_string(),
            identifier: identifier.to_string(),
            launch_count,
            last_update_ms,
        });
    }

    pub fn add_group(&self, name: &str, members: &[&str]) {
        self.groups.lock().unwrap().push(AppGroup {
            name: name.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        });
    }

    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }
}

impl AppService for StaticApps {
    fn list_launchable(&self) -> Vec<AppInfo> {
        self.apps.lock().unwrap().clone()
    }

    fn groups(&self) -> Vec<AppGroup> {
        self.groups.lock().unwrap().clone()
    }

    fn launch(&self, identifier: &str) -> bool {
        let known = self
            .apps
            .lock()
            .unwrap()
            .iter()
            .any(|a| a.identifier == identifier);
        if known {
            self.launched.lock().unwrap().push(identifier.to_string());
        }
        known
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

/// One of every collaborator plus default config and an in-memory alias store.
pub struct Fixture {
    pub config: TerminalConfig,
    pub aliases: Mutex<AliasManager>,
    pub apps: Arc<StaticApps>,
    pub shell: Arc<MockShell>,
    pub input: Arc<RecordingInput>,
    pub events: Arc<RecordingEvents>,
    pub redirector: Redirector,
    pub suggestions: SuggestionRepository,
    pub system: SystemContext,
    pub cwd: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        Self::build(AliasManager::new(AliasSettings::default(), None))
    }

    /// Aliases loaded from (and persisted to) `path`.
    pub fn with_alias_file(path: PathBuf) -> Self {
        Self::build(AliasManager::open(AliasSettings::default(), path).unwrap())
    }

    fn build(aliases: AliasManager) -> Self {
        let config = TerminalConfig::default();
        let apps = Arc::new(StaticApps::default());
        let input = Arc::new(RecordingInput::default());
        let events = Arc::new(RecordingEvents::default());
        let redirector = Redirector::new(
            Arc::clone(&input) as Arc<dyn InputSink>,
            Arc::clone(&events) as Arc<dyn SessionEvents>,
        );
        let suggestions =
            SuggestionRepository::new(Arc::clone(&apps) as Arc<dyn AppService>, Vec::new());
        Self {
            system: SystemContext::from_config(&config),
            cwd: config.home_dir(),
            config,
            aliases: Mutex::new(aliases),
            apps,
            shell: Arc::new(MockShell::default()),
            input,
            events,
            redirector,
            suggestions,
        }
    }

    /// An environment borrowing this fixture and `registry`.
    pub fn env<'a>(&'a self, registry: &'a CommandRegistry) -> Environment<'a> {
        Environment {
            cwd: self.cwd.clone(),
            config: &self.config,
            registry,
            aliases: &self.aliases,
            apps: self.apps.as_ref(),
            shell: self.shell.as_ref(),
            input: self.input.as_ref(),
            events: self.events.as_ref(),
            redirector: &self.redirector,
            suggestions: &self.suggestions,
            system: &self.system,
        }
    }
}
