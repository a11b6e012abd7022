//! Command trait, registry, and the validate-then-execute wrapper.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use hitch_platform::{AppService, InputSink, SessionEvents, ShellChannel};
use hitch_types::config::TerminalConfig;
use hitch_types::error::Result;

use crate::alias::AliasManager;
use crate::args::{self, ArgType, ArgValue, Param, ParamTable};
use crate::redirect::Redirector;
use crate::suggest::SuggestionRepository;
use crate::system_commands::SystemContext;

/// Output produced by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    /// Plain text lines.
    Text(String),
    /// Command produced no visible output.
    None,
    /// Signal to clear the output buffer.
    Clear,
    /// Signal to the host to quit.
    Exit,
}

/// Everything a command may read or act on while executing.
pub struct Environment<'a> {
    /// Working directory. Written back to the session after execution.
    pub cwd: PathBuf,
    pub config: &'a TerminalConfig,
    pub registry: &'a CommandRegistry,
    pub aliases: &'a Mutex<AliasManager>,
    pub apps: &'a dyn AppService,
    pub shell: &'a dyn ShellChannel,
    pub input: &'a dyn InputSink,
    pub events: &'a dyn SessionEvents,
    pub redirector: &'a Redirector,
    pub suggestions: &'a SuggestionRepository,
    pub system: &'a SystemContext,
}

/// A single executable command.
///
/// The `on_*` hooks turn validation failures into user-facing text. Their
/// defaults point at [`Command::usage`] or the parameter's usage.
pub trait Command: Send + Sync {
    /// The command name (what the user types).
    fn name(&self) -> &str;

    /// One-line description for `help`.
    fn description(&self) -> &str;

    /// Usage string (e.g. "calc <expression>").
    fn usage(&self) -> &str;

    /// Command category for grouping in `help` output.
    fn category(&self) -> &str {
        "general"
    }

    /// Argument schema. Ignored when [`Command::params`] is `Some`.
    fn arg_types(&self) -> &[ArgType] {
        &[]
    }

    /// Suggestion ranking weight.
    fn priority(&self) -> i32 {
        1
    }

    /// Sub-schemas selected by the first argument.
    fn params(&self) -> Option<&'static ParamTable> {
        None
    }

    /// Execute with validated arguments.
    fn execute(&self, args: &[ArgValue], env: &mut Environment<'_>) -> Result<CommandOutput>;

    fn on_invalid_param(&self, param: &str, _env: &Environment<'_>) -> String {
        format!("Invalid parameter: {param}\nUsage: {}", self.usage())
    }

    fn on_arg_not_found(&self, _index: usize, raw: &str, _env: &Environment<'_>) -> String {
        format!("Invalid argument: {raw}\nUsage: {}", self.usage())
    }

    fn on_not_enough_args(&self, _provided: usize, _env: &Environment<'_>) -> String {
        format!("Usage: {}", self.usage())
    }

    fn on_param_arg_not_found(
        &self,
        param: &Param,
        _index: usize,
        raw: &str,
        _env: &Environment<'_>,
    ) -> String {
        format!("Invalid argument: {raw}\nUsage: {}", param.usage)
    }

    fn on_param_not_enough_args(
        &self,
        param: &Param,
        _provided: usize,
        _env: &Environment<'_>,
    ) -> String {
        format!("Usage: {}", param.usage)
    }
}

// ---------------------------------------------------------------------------
// Parsed command
// ---------------------------------------------------------------------------

/// A command matched against input, with its arguments classified.
pub struct ParsedCommand<'r> {
    pub command: &'r dyn Command,
    pub args: Vec<ArgValue>,
    /// Index of the first argument that failed classification.
    pub invalid_index: Option<usize>,
}

impl ParsedCommand<'_> {
    /// Validate, then execute.
    ///
    /// Order matters: an invalid parameter is reported before anything
    /// else, then an invalid argument, then a short argument count.
    pub fn run(&self, env: &mut Environment<'_>) -> Result<CommandOutput> {
        let cmd = self.command;
        if let Some(table) = cmd.params() {
            if self.invalid_index == Some(0) {
                return Ok(CommandOutput::Text(
                    cmd.on_invalid_param(self.raw_at(0), env),
                ));
            }
            let Some(param) = self.param(table) else {
                return Ok(CommandOutput::Text(
                    cmd.on_not_enough_args(self.args.len(), env),
                ));
            };
            if let Some(index) = self.invalid_index {
                return Ok(CommandOutput::Text(cmd.on_param_arg_not_found(
                    param,
                    index,
                    self.raw_at(index),
                    env,
                )));
            }
            // The parameter slot counts toward what was provided. With a
            // default parameter it is not required.
            let (provided, required) = match table.default {
                Some(_) => (self.args.len(), param.args.len()),
                None => (self.args.len(), param.args.len() + 1),
            };
            if provided < required {
                return Ok(CommandOutput::Text(
                    cmd.on_param_not_enough_args(param, provided, env),
                ));
            }
        } else if let Some(index) = self.invalid_index {
            return Ok(CommandOutput::Text(cmd.on_arg_not_found(
                index,
                self.raw_at(index),
                env,
            )));
        } else if self.args.len() < cmd.arg_types().len() {
            return Ok(CommandOutput::Text(
                cmd.on_not_enough_args(self.args.len(), env),
            ));
        }
        cmd.execute(&self.args, env)
    }

    /// The argument type expected next, for autocomplete.
    pub fn next_arg_type(&self) -> Option<ArgType> {
        match self.command.params() {
            Some(table) => match self.param(table) {
                Some(param) => param.args.get(self.args.len() - 1).copied(),
                None if self.args.is_empty() => Some(ArgType::Param),
                None => None,
            },
            None => self.command.arg_types().get(self.args.len()).copied(),
        }
    }

    fn param(&self, table: &'static ParamTable) -> Option<&'static Param> {
        match self.args.first() {
            Some(ArgValue::Param(name)) => table.find(name),
            _ => None,
        }
    }

    fn raw_at(&self, index: usize) -> &str {
        match self.args.get(index) {
            Some(ArgValue::Text(raw)) => raw,
            _ => "",
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Registry of built-in commands, keyed by lowercase name.
pub struct CommandRegistry {
    commands: HashMap<String, Box<dyn Command>>,
}

impl CommandRegistry {
    /// Create an empty command registry.
    pub fn new() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// Register a command. Replaces any existing command with the same name.
    pub fn register(&mut self, cmd: Box<dyn Command>) {
        self.commands.insert(cmd.name().to_ascii_lowercase(), cmd);
    }

    /// Look up a command by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&dyn Command> {
        self.commands
            .get(&name.to_ascii_lowercase())
            .map(|c| c.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_ascii_lowercase())
    }

    /// Match the first word of `line` and classify the rest against the
    /// command's schema. `None` if no such command is registered.
    pub fn parse<'r>(&'r self, line: &str, env: &Environment<'_>) -> Option<ParsedCommand<'r>> {
        let line = line.trim();
        let (name, rest) = line.split_once(' ').unwrap_or((line, ""));
        let command = self.get(name)?;
        let (args, invalid_index) = match command.params() {
            Some(table) => args::parse_param_args(table, rest, env),
            None => args::parse_args(command.arg_types(), rest, env),
        };
        Some(ParsedCommand {
            command,
            args,
            invalid_index,
        })
    }

    /// Commands grouped by category, both levels sorted.
    pub fn by_category(&self) -> Vec<(&str, Vec<&dyn Command>)> {
        let mut categories: HashMap<&str, Vec<&dyn Command>> = HashMap::new();
        for cmd in self.commands.values() {
            categories
                .entry(cmd.category())
                .or_default()
                .push(cmd.as_ref());
        }
        let mut grouped: Vec<(&str, Vec<&dyn Command>)> = categories.into_iter().collect();
        grouped.sort_by_key(|(cat, _)| *cat);
        for (_, cmds) in &mut grouped {
            cmds.sort_by_key(|c| c.name());
        }
        grouped
    }

    /// `(name, priority)` for every command, sorted by name.
    pub fn priorities(&self) -> Vec<(String, i32)> {
        let mut out: Vec<(String, i32)> = self
            .commands
            .values()
            .map(|c| (c.name().to_string(), c.priority()))
            .collect();
        out.sort();
        out
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
