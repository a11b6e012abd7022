//! Command-interpretation core for hitch.
//!
//! A line of input is split into segments, each segment is offered to a
//! fixed chain of resolvers (app groups, aliases, built-in commands, apps,
//! and finally the system shell), and the first resolver that claims it
//! runs it. Built-in commands declare typed arguments that are validated
//! before they execute. A command can also take over all input for a
//! multi-step interaction through the [`Redirector`].

mod alias;
mod alias_commands;
mod args;
mod calc;
mod commands;
mod dispatch;
mod format;
mod interpreter;
mod redirect;
mod segment;
mod suggest;
mod system_commands;

#[cfg(test)]
mod test_utils;

/// One stored alias (name and value).
pub use alias::Alias;
/// Why an alias operation was rejected.
pub use alias::AliasError;
/// The alias table, optionally backed by a file.
pub use alias::AliasManager;
/// Marker, separator and label settings for alias expansion.
pub use alias::AliasSettings;
/// An alias matched against input, with its trailing arguments.
pub use alias::ResolvedAlias;
/// Register the `alias` command into a registry.
pub use alias_commands::register_alias_commands;
/// Argument kinds a command can declare.
pub use args::ArgType;
/// A classified argument handed to `execute()`.
pub use args::ArgValue;
/// One named parameter with its own argument list.
pub use args::Param;
/// The parameter set of a parameterized command.
pub use args::ParamTable;
/// Arithmetic evaluation failure.
pub use calc::EvalError;
/// Evaluate an arithmetic expression.
pub use calc::evaluate;
/// Render a calculator result (`4.0`).
pub use calc::format_result;
/// Register all built-in commands (session, system, alias) into a registry.
pub use commands::register_builtins;
/// External services the dispatcher talks to.
pub use dispatch::Collaborators;
/// Per-line entry point running the trigger chain.
pub use dispatch::Dispatcher;
/// Resolver order tried for every segment.
pub use dispatch::TRIGGER_CHAIN;
/// One resolver kind in the chain.
pub use dispatch::Trigger;
/// Replace `%x` placeholders in a format string.
pub use format::expand_placeholders;
/// Launch-history line for an app.
pub use format::launch_line;
/// A single executable command trait.
pub use interpreter::Command;
/// Output produced by a command (text, signals).
pub use interpreter::CommandOutput;
/// Registry of available commands with dispatch.
pub use interpreter::CommandRegistry;
/// Shared environment passed to every command.
pub use interpreter::Environment;
/// A command with its classified arguments, ready to validate and run.
pub use interpreter::ParsedCommand;
/// A command that consumes redirected input.
pub use redirect::RedirectHandler;
/// What a handler did with one redirected line.
pub use redirect::RedirectStep;
/// The live redirection slot.
pub use redirect::RedirectionHandle;
/// Whether a command currently owns input.
pub use redirect::RedirectionState;
/// Snapshot of the redirected input recorded so far.
pub use redirect::RedirectionView;
/// Owner of the single redirection slot.
pub use redirect::Redirector;
/// One sub-command of an input line.
pub use segment::Segment;
/// Split a line into segments, extracting color markup.
pub use segment::split_segments;
/// Score bonus for recently updated apps.
pub use suggest::RECENCY_BONUS;
/// How recent an update must be to earn the bonus.
pub use suggest::RECENT_WINDOW_MS;
/// One ranked suggestion.
pub use suggest::SuggestionEntry;
/// What a suggestion refers to.
pub use suggest::SuggestionKind;
/// Background-built suggestion index.
pub use suggest::SuggestionRepository;
/// Build a ranked suggestion index.
pub use suggest::build_index;
/// Host identity and OS targets used by the system commands.
pub use system_commands::SystemContext;
/// Register system commands (calc, switch-os, uname, apps) into a registry.
pub use system_commands::register_system_commands;
