//! Per-line entry point: segmenting, the trigger chain, and workers.
//!
//! Resolution runs synchronously on the caller's thread, segment by
//! segment. Built-in command execution and shell submissions run on
//! worker threads and report through the output sink. Command workers
//! run independently of each other and of the shell. Shell workers take
//! a ticket when spawned and reach the shell one at a time in ticket
//! order, so `cd x; ls` lists `x`.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, LazyLock, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use hitch_platform::{
    AppInfo, AppService, InputSink, OutputCategory, OutputSink, SessionEvents, ShellChannel,
    ShellResult, unspaced_lowercase,
};
use hitch_types::color::Rgb;
use hitch_types::config::TerminalConfig;
use hitch_types::error::{HitchError, Result};
use regex::Regex;

use crate::alias::AliasManager;
use crate::format::launch_line;
use crate::interpreter::{CommandOutput, CommandRegistry, Environment};
use crate::redirect::{RedirectStep, RedirectionState, Redirector};
use crate::segment::{Segment, split_segments};
use crate::suggest::SuggestionRepository;
use crate::system_commands::SystemContext;

/// A `cd` in command position: line start or after `;`, `&`, `|` or `(`.
static CD_COMMAND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[;&|(])\s*cd(?:\s|$)").expect("valid regex"));

/// External services the dispatcher talks to.
pub struct Collaborators {
    pub output: Arc<dyn OutputSink>,
    pub input: Arc<dyn InputSink>,
    pub events: Arc<dyn SessionEvents>,
    pub apps: Arc<dyn AppService>,
    pub shell: Arc<dyn ShellChannel>,
}

/// Resolver kinds, tried in this order for every segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Group,
    Alias,
    Command,
    App,
    Shell,
}

/// The shell fallback claims everything, so the chain always terminates.
pub const TRIGGER_CHAIN: [Trigger; 5] = [
    Trigger::Group,
    Trigger::Alias,
    Trigger::Command,
    Trigger::App,
    Trigger::Shell,
];

struct Shared {
    config: TerminalConfig,
    registry: CommandRegistry,
    aliases: Mutex<AliasManager>,
    collab: Collaborators,
    redirector: Redirector,
    suggestions: SuggestionRepository,
    system: SystemContext,
    cwd: Mutex<PathBuf>,
    last_command: Mutex<Option<String>>,
    shell_lane: Lane,
}

/// Runs shell workers one at a time in ticket order.
#[derive(Default)]
struct Lane {
    serving: Mutex<u64>,
    turn: Condvar,
}

impl Lane {
    fn run<F: FnOnce()>(&self, ticket: u64, job: F) {
        let mut serving = self.serving.lock().unwrap_or_else(PoisonError::into_inner);
        while *serving != ticket {
            serving = self
                .turn
                .wait(serving)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(serving);
        job();
        *self.serving.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        self.turn.notify_all();
    }
}

#[derive(Clone, Copy)]
enum WorkerKind {
    Command,
    Shell,
}

impl WorkerKind {
    fn thread_name(self) -> &'static str {
        match self {
            Self::Command => "hitch-cmd",
            Self::Shell => "hitch-shell",
        }
    }
}

#[derive(Default)]
struct Workers {
    commands: Vec<JoinHandle<()>>,
    shells: Vec<JoinHandle<()>>,
    next_shell_ticket: u64,
}

impl Workers {
    fn take(&mut self, include_shell: bool) -> Vec<JoinHandle<()>> {
        let mut pending: Vec<JoinHandle<()>> = self.commands.drain(..).collect();
        if include_shell {
            pending.append(&mut self.shells);
        }
        pending
    }
}

impl Shared {
    fn environment(&self, cwd: PathBuf) -> Environment<'_> {
        Environment {
            cwd,
            config: &self.config,
            registry: &self.registry,
            aliases: &self.aliases,
            apps: self.collab.apps.as_ref(),
            shell: self.collab.shell.as_ref(),
            input: self.collab.input.as_ref(),
            events: self.collab.events.as_ref(),
            redirector: &self.redirector,
            suggestions: &self.suggestions,
            system: &self.system,
        }
    }

    fn cwd(&self) -> PathBuf {
        self.cwd.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_cwd(&self, path: PathBuf) {
        *self.cwd.lock().unwrap_or_else(PoisonError::into_inner) = path;
    }

    fn emit(&self, text: &str, color: Option<Rgb>, category: OutputCategory) {
        self.collab.output.emit(text, color, category);
    }

    fn emit_error(&self, text: &str) {
        self.emit(text, self.config.error_rgb(), OutputCategory::Error);
    }
}

/// The command-interpretation core.
pub struct Dispatcher {
    shared: Arc<Shared>,
    sequence: AtomicU64,
    chain_attempts: AtomicU64,
    workers: Mutex<Workers>,
}

impl Dispatcher {
    pub fn new(
        config: TerminalConfig,
        registry: CommandRegistry,
        aliases: AliasManager,
        collab: Collaborators,
    ) -> Self {
        let redirector = Redirector::new(Arc::clone(&collab.input), Arc::clone(&collab.events));
        let suggestions = SuggestionRepository::new(Arc::clone(&collab.apps), registry.priorities());
        let system = SystemContext::from_config(&config);
        let cwd = config.home_dir();
        Self {
            shared: Arc::new(Shared {
                config,
                registry,
                aliases: Mutex::new(aliases),
                collab,
                redirector,
                suggestions,
                system,
                cwd: Mutex::new(cwd),
                last_command: Mutex::new(None),
                shell_lane: Lane::default(),
            }),
            sequence: AtomicU64::new(0),
            chain_attempts: AtomicU64::new(0),
            workers: Mutex::new(Workers::default()),
        }
    }

    /// Handle one line of input.
    ///
    /// `sequence` is the counter value the caller captured when the line
    /// was submitted. Lines captured before the current value are stale
    /// and dropped; returns whether the line was accepted.
    pub fn dispatch(&self, line: &str, alias: Option<&str>, sequence: u64) -> bool {
        let advanced = self
            .sequence
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (sequence >= current).then_some(current + 1)
            });
        if let Err(current) = advanced {
            log::debug!("dropping stale input (seq {sequence} < {current})");
            return false;
        }
        let depth = usize::from(alias.is_some());
        self.process_line(line, alias, depth, None);
        true
    }

    /// Counter value to capture when submitting a line.
    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    pub fn request_suggestion_rebuild(&self) -> Result<()> {
        self.shared.suggestions.request_rebuild()
    }

    pub fn suggestions(&self) -> &SuggestionRepository {
        &self.shared.suggestions
    }

    /// Block until every worker finishes, suggestion rebuilds included.
    pub fn wait_idle(&self) {
        self.join_workers(true);
        self.shared.suggestions.wait_idle();
    }

    /// Block until built-in command workers finish. Shell work keeps running.
    pub fn wait_commands(&self) {
        self.join_workers(false);
    }

    fn join_workers(&self, include_shell: bool) {
        loop {
            let pending = self
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(include_shell);
            if pending.is_empty() {
                break;
            }
            for handle in pending {
                if handle.join().is_err() {
                    log::warn!("worker thread panicked outside its guard");
                }
            }
        }
    }

    pub fn redirection_state(&self) -> RedirectionState {
        self.shared.redirector.state()
    }

    /// Number of resolver attempts made so far.
    pub fn chain_attempts(&self) -> u64 {
        self.chain_attempts.load(Ordering::SeqCst)
    }

    /// Text of the last segment claimed by the command resolver.
    pub fn last_command(&self) -> Option<String> {
        self.shared
            .last_command
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn working_directory(&self) -> PathBuf {
        self.shared.cwd()
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.shared.registry
    }

    pub fn aliases(&self) -> &Mutex<AliasManager> {
        &self.shared.aliases
    }

    /// Clear the input field (long press on back).
    pub fn long_back(&self) {
        self.shared.collab.input.set_input_text("");
    }

    /// A pending permission request was denied; release redirection.
    pub fn permission_denied(&self) {
        self.shared.redirector.cleanup();
    }

    // -- Resolution --

    fn process_line(&self, line: &str, origin: Option<&str>, depth: usize, color: Option<Rgb>) {
        for segment in split_segments(line, &self.shared.config.multiple_cmd_separator) {
            let segment = Segment {
                color: segment.color.or(color),
                ..segment
            };
            self.process_segment(&segment, origin, depth);
        }
    }

    fn process_segment(&self, segment: &Segment, origin: Option<&str>, depth: usize) {
        if self.shared.redirector.is_active() {
            self.redirect(segment);
            return;
        }
        for trigger in TRIGGER_CHAIN {
            self.chain_attempts.fetch_add(1, Ordering::SeqCst);
            match self.attempt(trigger, segment, depth) {
                Ok(true) => {
                    log::debug!(
                        "{trigger:?} claimed '{}'{}",
                        segment.text,
                        origin.map(|a| format!(" (via alias {a})")).unwrap_or_default()
                    );
                    return;
                },
                Ok(false) => {},
                Err(e) => {
                    self.shared.emit_error(&e.to_string());
                    return;
                },
            }
        }
    }

    fn redirect(&self, segment: &Segment) {
        let shared = &self.shared;
        let mut env = shared.environment(shared.cwd());
        let step = shared.redirector.route(&segment.text, &mut env);
        shared.set_cwd(env.cwd);
        if let Some(RedirectStep::Continue(Some(text)) | RedirectStep::Finish(Some(text))) = step {
            shared.emit(
                &text,
                segment.color.or(shared.config.output_rgb()),
                OutputCategory::Output,
            );
        }
    }

    fn attempt(&self, trigger: Trigger, segment: &Segment, depth: usize) -> Result<bool> {
        match trigger {
            Trigger::Group => Ok(self.try_group(&segment.text)),
            Trigger::Alias => Ok(self.try_alias(segment, depth)),
            Trigger::Command => self.try_command(segment),
            Trigger::App => Ok(self.try_app(&segment.text)),
            Trigger::Shell => self.run_shell(segment),
        }
    }

    fn try_group(&self, text: &str) -> bool {
        let (name, rest) = text.split_once(' ').unwrap_or((text, ""));
        let key = unspaced_lowercase(name);
        let apps = &self.shared.collab.apps;
        let Some(group) = apps
            .groups()
            .into_iter()
            .find(|g| unspaced_lowercase(&g.name) == key)
        else {
            return false;
        };
        if rest.is_empty() {
            let listing = if group.members.is_empty() {
                format!("{}: empty", group.name)
            } else {
                group.members.join("\n")
            };
            self.shared
                .emit(&listing, self.shared.config.output_rgb(), OutputCategory::Output);
            return true;
        }
        let wanted = unspaced_lowercase(rest);
        let member = group
            .members
            .iter()
            .find(|m| unspaced_lowercase(m) == wanted)
            .and_then(|m| apps.find_by_label(m));
        match member {
            Some(app) => {
                self.launch(&app);
                true
            },
            None => false,
        }
    }

    fn try_alias(&self, segment: &Segment, depth: usize) -> bool {
        let (name, expanded) = {
            let aliases = self
                .shared
                .aliases
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let Some(resolved) = aliases.resolve(&segment.text, true) else {
                return false;
            };
            let expanded = aliases.expand(&resolved);
            if self.shared.config.show_alias_content {
                self.shared.emit(
                    &aliases.format_label(&resolved.name, &expanded),
                    self.shared.config.alias_color(),
                    OutputCategory::Alias,
                );
            }
            (resolved.name, expanded)
        };

        let limit = self.shared.config.max_alias_depth;
        if depth >= limit {
            log::warn!("alias '{name}' hit the expansion depth limit ({limit})");
            self.shared.emit_error(&format!(
                "alias '{name}': expansion depth limit ({limit}) reached"
            ));
            return true;
        }
        self.process_line(&expanded, Some(&name), depth + 1, segment.color);
        true
    }

    fn try_command(&self, segment: &Segment) -> Result<bool> {
        let name = segment.text.split(' ').next().unwrap_or_default();
        if !self.shared.registry.contains(name) {
            return Ok(false);
        }
        *self
            .shared
            .last_command
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(segment.text.clone());

        let shared = Arc::clone(&self.shared);
        let text = segment.text.clone();
        let color = segment.color;
        self.spawn(WorkerKind::Command, move || run_command(&shared, &text, color))?;
        Ok(true)
    }

    fn try_app(&self, text: &str) -> bool {
        match self.shared.collab.apps.find_by_label(text) {
            Some(app) => {
                self.launch(&app);
                true
            },
            None => false,
        }
    }

    fn launch(&self, app: &AppInfo) {
        let shared = &self.shared;
        if !shared.collab.apps.launch(&app.identifier) {
            shared.emit_error(&format!("could not launch {}", app.label));
            return;
        }
        if shared.config.show_launch_history {
            shared.emit(
                &launch_line(&shared.config.app_launch_format, app),
                shared.config.output_rgb(),
                OutputCategory::Launch,
            );
        }
    }

    fn run_shell(&self, segment: &Segment) -> Result<bool> {
        let shared = Arc::clone(&self.shared);
        let text = segment.text.clone();
        let color = segment.color;
        self.spawn(WorkerKind::Shell, move || submit_to_shell(&shared, &text, color))?;
        Ok(true)
    }

    fn spawn<F>(&self, kind: WorkerKind, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        let ticket = workers.next_shell_ticket;
        let shared = Arc::clone(&self.shared);
        let name = kind.thread_name();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let guarded = || {
                    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                        shared.emit_error(&format!("internal error: {}", panic_message(&*payload)));
                    }
                };
                match kind {
                    WorkerKind::Command => guarded(),
                    WorkerKind::Shell => shared.shell_lane.run(ticket, guarded),
                }
            })
            .map_err(|e| HitchError::Platform(format!("spawn {name}: {e}")))?;

        let handles = match kind {
            WorkerKind::Command => &mut workers.commands,
            WorkerKind::Shell => {
                workers.next_shell_ticket += 1;
                &mut workers.shells
            },
        };
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        Ok(())
    }
}

fn run_command(shared: &Shared, text: &str, color: Option<Rgb>) {
    let mut env = shared.environment(shared.cwd());
    let start_cwd = env.cwd.clone();
    let Some(parsed) = shared.registry.parse(text, &env) else {
        return;
    };
    let result = parsed.run(&mut env);
    if env.cwd != start_cwd {
        shared.set_cwd(env.cwd);
    }
    match result {
        Ok(CommandOutput::Text(out)) => {
            shared.emit(&out, color.or(shared.config.output_rgb()), OutputCategory::Output);
        },
        Ok(CommandOutput::None) => {},
        Ok(CommandOutput::Clear) => shared.collab.output.clear(),
        Ok(CommandOutput::Exit) => shared.collab.events.on_exit_requested(),
        Err(e) => shared.emit_error(&e.to_string()),
    }
}

fn changes_directory(command: &str) -> bool {
    CD_COMMAND.is_match(command)
}

/// A colored segment, or one containing `cd`, takes the callback path so
/// its output is reported here instead of by the channel.
fn submit_to_shell(shared: &Arc<Shared>, text: &str, color: Option<Rgb>) {
    let shell = &shared.collab.shell;
    if text.trim().eq_ignore_ascii_case("su") {
        if shell.elevation_available() {
            shared.collab.events.on_privilege_elevated();
        }
        shell.submit("su", None);
    } else if changes_directory(text) {
        let after_cd = Arc::clone(shared);
        shell.submit(
            text,
            Some(Box::new(move |result| {
                report_shell_result(&after_cd, &result, color);
                let after_pwd = Arc::clone(&after_cd);
                after_cd.collab.shell.submit(
                    "pwd",
                    Some(Box::new(move |pwd| track_directory(&after_pwd, &pwd))),
                );
            })),
        );
    } else if color.is_some() {
        let reporter = Arc::clone(shared);
        shell.submit(
            text,
            Some(Box::new(move |result| {
                report_shell_result(&reporter, &result, color);
            })),
        );
    } else {
        shell.submit(text, None);
    }
}

fn report_shell_result(shared: &Shared, result: &ShellResult, color: Option<Rgb>) {
    if result.output.is_empty() {
        return;
    }
    let text = result.output.join("\n");
    if result.exit_code == 0 {
        shared.emit(&text, color.or(shared.config.output_rgb()), OutputCategory::Output);
    } else {
        shared.emit_error(&text);
    }
}

fn track_directory(shared: &Shared, pwd: &ShellResult) {
    let [line] = pwd.output.as_slice() else {
        return;
    };
    let path = PathBuf::from(line.trim());
    if !path.is_dir() {
        return;
    }
    log::debug!("working directory now {}", path.display());
    shared.set_cwd(path.clone());
    shared.collab.input.reset_hint();
    shared.collab.events.on_directory_changed(&path);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
