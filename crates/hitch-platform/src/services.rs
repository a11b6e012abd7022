//! Collaborator traits and shared data types.

use std::path::Path;

use hitch_types::color::Rgb;

// ---------------------------------------------------------------------------
// Output sink
// ---------------------------------------------------------------------------

/// What kind of line is being emitted. Presentation layers style by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputCategory {
    /// Ordinary command output.
    Output,
    /// Failures (validation, execution, shell).
    Error,
    /// Alias expansion echo.
    Alias,
    /// App launch history line.
    Launch,
}

/// Where textual results go. Fire-and-forget.
pub trait OutputSink: Send + Sync {
    /// Emit one block of text with an optional color override.
    fn emit(&self, text: &str, color: Option<Rgb>, category: OutputCategory);

    /// Clear everything emitted so far.
    fn clear(&self) {}
}

// ---------------------------------------------------------------------------
// Input sink
// ---------------------------------------------------------------------------

/// Control over the input field owned by the presentation layer.
pub trait InputSink: Send + Sync {
    /// Replace the text in the input field.
    fn set_input_text(&self, text: &str);

    /// Show a hint in the empty input field.
    fn set_hint(&self, hint: &str);

    /// Restore the default hint.
    fn reset_hint(&self);
}

// ---------------------------------------------------------------------------
// Session events
// ---------------------------------------------------------------------------

/// State-change notifications for the presentation layer.
///
/// Every method has a no-op default so listeners only override what they
/// render.
pub trait SessionEvents: Send + Sync {
    /// A command took ownership of all subsequent input.
    fn on_redirection_entered(&self, _hint: &str) {}

    /// The redirecting command released input.
    fn on_redirection_exited(&self) {}

    /// The shell channel was asked to elevate privileges.
    fn on_privilege_elevated(&self) {}

    /// The shell channel was reset to an unprivileged session.
    fn on_privilege_dropped(&self) {}

    /// The shell working directory changed.
    fn on_directory_changed(&self, _path: &Path) {}

    /// A command asked the host to quit.
    fn on_exit_requested(&self) {}
}

// ---------------------------------------------------------------------------
// App service
// ---------------------------------------------------------------------------

/// A launchable application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    /// Name the user types.
    pub label: String,
    /// Stable identifier passed back to [`AppService::launch`].
    pub identifier: String,
    /// How many times the app was launched.
    pub launch_count: u32,
    /// Install/update time in milliseconds since the epoch (0 if unknown).
    pub last_update_ms: u64,
}

impl AppInfo {
    /// Whether `input` names this app, ignoring case and spaces.
    pub fn matches_label(&self, input: &str) -> bool {
        unspaced_lowercase(&self.label) == unspaced_lowercase(input)
    }
}

/// A named collection of apps (a folder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppGroup {
    pub name: String,
    /// Member labels.
    pub members: Vec<String>,
}

/// Enumerates and launches applications.
pub trait AppService: Send + Sync {
    /// Apps the user may launch, in enumeration order.
    fn list_launchable(&self) -> Vec<AppInfo>;

    /// Named app groups.
    fn groups(&self) -> Vec<AppGroup> {
        Vec::new()
    }

    /// Launch by identifier. Returns `false` if nothing was started.
    fn launch(&self, identifier: &str) -> bool;

    /// Find a launchable app whose label matches `input`.
    fn find_by_label(&self, input: &str) -> Option<AppInfo> {
        self.list_launchable()
            .into_iter()
            .find(|app| app.matches_label(input))
    }
}

// ---------------------------------------------------------------------------
// Shell channel
// ---------------------------------------------------------------------------

/// Outcome of one submitted shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellResult {
    pub exit_code: i32,
    /// Captured output lines.
    pub output: Vec<String>,
}

/// Invoked once with the result of a submitted command.
pub type ShellCallback = Box<dyn FnOnce(ShellResult) + Send>;

/// The underlying system shell.
pub trait ShellChannel: Send + Sync {
    /// Run `command`. Without a callback the channel reports output itself.
    fn submit(&self, command: &str, on_result: Option<ShellCallback>);

    /// Tear down and rebuild the session (working directory back to home).
    fn reset(&self) {}

    /// Whether privilege elevation is possible on this host.
    fn elevation_available(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Lowercase `s` and drop all whitespace.
pub fn unspaced_lowercase(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Wall-clock milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
