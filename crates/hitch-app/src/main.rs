//! hitch line-mode entry point.
//!
//! Reads commands from stdin and runs them through the hitch command core.
//! The config path comes from the first argument, then `HITCH_CONFIG`,
//! then `hitch.toml` in the current directory.

mod sinks;

use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use hitch_platform::{
    AppService, BufferedOutput, ConfiguredApps, InputSink, OutputSink, SessionEvents,
    ShellChannel, SystemShell, now_millis,
};
use hitch_terminal::{
    AliasManager, AliasSettings, Collaborators, CommandRegistry, Dispatcher, register_builtins,
};
use hitch_types::config::TerminalConfig;

use sinks::{Session, StdoutSink};

const DEFAULT_ALIAS_FILE: &str = "alias.txt";

/// Alias file from the config, relative to the config's directory.
fn alias_path(config: &TerminalConfig, config_path: &Path) -> PathBuf {
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    match &config.alias_file {
        Some(p) if p.is_absolute() => p.clone(),
        Some(p) => base.join(p),
        None => base.join(DEFAULT_ALIAS_FILE),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HITCH_CONFIG").ok())
        .map_or_else(|| PathBuf::from("hitch.toml"), PathBuf::from);
    let config = TerminalConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    let aliases_file = alias_path(&config, &config_path);
    let aliases = AliasManager::open(AliasSettings::from_config(&config), aliases_file.clone())
        .with_context(|| format!("loading aliases from {}", aliases_file.display()))?;
    log::info!(
        "Starting hitch ({} aliases, {} apps)",
        aliases.aliases().len(),
        config.apps.len()
    );

    // Output produced before the dispatcher exists is replayed on attach.
    let output = Arc::new(BufferedOutput::new());
    let session = Arc::new(Session::default());
    let shell = Arc::new(SystemShell::new(
        config.home_dir(),
        Arc::clone(&output) as Arc<dyn OutputSink>,
    ));
    let apps = Arc::new(ConfiguredApps::new(&config.apps, &config.groups, now_millis()));

    let mut registry = CommandRegistry::new();
    register_builtins(&mut registry);

    let dispatcher = Dispatcher::new(
        config,
        registry,
        aliases,
        Collaborators {
            output: Arc::clone(&output) as Arc<dyn OutputSink>,
            input: Arc::clone(&session) as Arc<dyn InputSink>,
            events: Arc::clone(&session) as Arc<dyn SessionEvents>,
            apps: apps as Arc<dyn AppService>,
            shell: shell as Arc<dyn ShellChannel>,
        },
    );
    dispatcher.request_suggestion_rebuild()?;

    let color = std::io::stdout().is_terminal();
    output.attach(Arc::new(StdoutSink::new(color)));

    repl(&dispatcher, &session)
}

fn repl(dispatcher: &Dispatcher, session: &Session) -> Result<()> {
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();
    while !session.exit_requested() {
        let prefill = session.take_prefill();
        print!("{}{prefill}", session.prompt());
        std::io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = format!("{prefill}{}", line?);
        if line.trim().is_empty() {
            continue;
        }
        let seq = dispatcher.current_sequence();
        dispatcher.dispatch(&line, None, seq);
        // Shell output arrives when it is ready; a hung command never
        // holds the prompt.
        dispatcher.wait_commands();
    }
    log::info!("Goodbye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_file_resolves_next_to_config() {
        let mut config = TerminalConfig::default();
        let cfg = Path::new("/etc/hitch/hitch.toml");
        assert_eq!(alias_path(&config, cfg), PathBuf::from("/etc/hitch/alias.txt"));

        config.alias_file = Some("mine.txt".into());
        assert_eq!(alias_path(&config, cfg), PathBuf::from("/etc/hitch/mine.txt"));

        config.alias_file = Some("/var/aliases".into());
        assert_eq!(alias_path(&config, cfg), PathBuf::from("/var/aliases"));
    }

    #[test]
    fn dispatcher_runs_against_real_shell() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TerminalConfig::default();
        config.home_path = Some(dir.path().to_path_buf());
        let output = Arc::new(BufferedOutput::new());
        let session = Arc::new(Session::default());
        let shell = Arc::new(SystemShell::new(
            config.home_dir(),
            Arc::clone(&output) as Arc<dyn OutputSink>,
        ));
        let mut registry = CommandRegistry::new();
        register_builtins(&mut registry);
        let dispatcher = Dispatcher::new(
            config,
            registry,
            AliasManager::new(AliasSettings::default(), None),
            Collaborators {
                output: Arc::clone(&output) as Arc<dyn OutputSink>,
                input: Arc::clone(&session) as Arc<dyn InputSink>,
                events: Arc::clone(&session) as Arc<dyn SessionEvents>,
                apps: Arc::new(ConfiguredApps::new(&[], &[], 0)) as Arc<dyn AppService>,
                shell: shell as Arc<dyn ShellChannel>,
            },
        );

        std::fs::create_dir(dir.path().join("sub")).unwrap();
        dispatcher.dispatch("cd sub; calc 2+2", None, 0);
        dispatcher.wait_idle();

        let sub = dir.path().join("sub").canonicalize().unwrap();
        assert_eq!(dispatcher.working_directory(), sub);
        assert!(session.prompt().starts_with(&sub.display().to_string()));
        assert_eq!(output.pending_len(), 1);

        dispatcher.dispatch("exit", None, dispatcher.current_sequence());
        dispatcher.wait_idle();
        assert!(session.exit_requested());
    }
}
