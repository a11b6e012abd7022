//! Line-mode presentation: stdout output, prompt state, and session flags.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use hitch_platform::{InputSink, OutputCategory, OutputSink, SessionEvents};
use hitch_types::color::Rgb;

/// Writes output to stdout, colored with 24-bit ANSI escapes when enabled.
pub struct StdoutSink {
    color: bool,
}

impl StdoutSink {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn render(&self, text: &str, color: Option<Rgb>, category: OutputCategory) -> String {
        let text = match category {
            OutputCategory::Launch | OutputCategory::Alias => format!("  {text}"),
            _ => text.to_string(),
        };
        match color {
            Some(rgb) if self.color => {
                format!("\x1b[38;2;{};{};{}m{text}\x1b[0m", rgb.r, rgb.g, rgb.b)
            },
            _ => text,
        }
    }
}

impl OutputSink for StdoutSink {
    fn emit(&self, text: &str, color: Option<Rgb>, category: OutputCategory) {
        let mut out = std::io::stdout().lock();
        if let Err(e) = writeln!(out, "{}", self.render(text, color, category)) {
            log::warn!("stdout write failed: {e}");
        }
    }

    fn clear(&self) {
        if self.color {
            print!("\x1b[2J\x1b[H");
        }
    }
}

/// Prompt shown before each line and the exit flag the REPL polls.
#[derive(Default)]
pub struct Session {
    hint: Mutex<Option<String>>,
    prefill: Mutex<String>,
    cwd: Mutex<Option<PathBuf>>,
    privileged: AtomicBool,
    exit: AtomicBool,
}

impl Session {
    pub fn exit_requested(&self) -> bool {
        self.exit.load(Ordering::SeqCst)
    }

    /// `hint> ` while a command owns input, otherwise `dir $ ` (or `#`).
    pub fn prompt(&self) -> String {
        if let Some(hint) = self.hint.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            return format!("{hint}> ");
        }
        let sigil = if self.privileged.load(Ordering::SeqCst) {
            '#'
        } else {
            '$'
        };
        match self.cwd.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            Some(dir) => format!("{} {sigil} ", dir.display()),
            None => format!("{sigil} "),
        }
    }

    /// Text a command asked to place in the input field, consumed once.
    pub fn take_prefill(&self) -> String {
        std::mem::take(&mut *self.prefill.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl InputSink for Session {
    fn set_input_text(&self, text: &str) {
        *self.prefill.lock().unwrap_or_else(PoisonError::into_inner) = text.to_string();
    }

    fn set_hint(&self, hint: &str) {
        *self.hint.lock().unwrap_or_else(PoisonError::into_inner) = Some(hint.to_string());
    }

    fn reset_hint(&self) {
        *self.hint.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SessionEvents for Session {
    fn on_privilege_elevated(&self) {
        self.privileged.store(true, Ordering::SeqCst);
    }

    fn on_privilege_dropped(&self) {
        self.privileged.store(false, Ordering::SeqCst);
    }

    fn on_directory_changed(&self, path: &Path) {
        *self.cwd.lock().unwrap_or_else(PoisonError::into_inner) = Some(path.to_path_buf());
    }

    fn on_exit_requested(&self) {
        log::info!("Exit requested");
        self.exit.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_colors_only_when_enabled() {
        let red = Some(Rgb::new(255, 0, 0));
        assert_eq!(
            StdoutSink::new(true).render("hi", red, OutputCategory::Output),
            "\x1b[38;2;255;0;0mhi\x1b[0m"
        );
        assert_eq!(
            StdoutSink::new(false).render("hi", red, OutputCategory::Output),
            "hi"
        );
        assert_eq!(
            StdoutSink::new(false).render("--> Clock", None, OutputCategory::Launch),
            "  --> Clock"
        );
    }

    #[test]
    fn prompt_follows_session_state() {
        let session = Session::default();
        assert_eq!(session.prompt(), "$ ");

        session.on_directory_changed(Path::new("/tmp"));
        session.on_privilege_elevated();
        assert_eq!(session.prompt(), "/tmp # ");

        session.set_hint("alias name");
        assert_eq!(session.prompt(), "alias name> ");
        session.reset_hint();
        session.on_privilege_dropped();
        assert_eq!(session.prompt(), "/tmp $ ");
    }

    #[test]
    fn exit_and_prefill() {
        let session = Session::default();
        assert!(!session.exit_requested());
        session.on_exit_requested();
        assert!(session.exit_requested());

        session.set_input_text("");
        assert_eq!(session.take_prefill(), "");
        session.set_input_text("calc ");
        assert_eq!(session.take_prefill(), "calc ");
        assert_eq!(session.take_prefill(), "");
    }
}
