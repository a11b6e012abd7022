//! Built-in commands for the hitch terminal.

use std::sync::PoisonError;

use hitch_types::error::Result;

use crate::args::{ArgType, ArgValue};
use crate::interpreter::{Command, CommandOutput, CommandRegistry, Environment};

/// Register all built-in commands into a registry.
pub fn register_builtins(reg: &mut CommandRegistry) {
    reg.register(Box::new(HelpCmd));
    reg.register(Box::new(ClearCmd));
    reg.register(Box::new(ExitCmd));
    reg.register(Box::new(CtrlcCmd));
    reg.register(Box::new(RefreshCmd));
    crate::register_system_commands(reg);
    crate::register_alias_commands(reg);
}

// ---------------------------------------------------------------------------
// help
// ---------------------------------------------------------------------------

struct HelpCmd;
impl Command for HelpCmd {
    fn name(&self) -> &str {
        "help"
    }
    fn description(&self) -> &str {
        "List commands or describe one"
    }
    fn usage(&self) -> &str {
        "help [command]"
    }
    fn arg_types(&self) -> &[ArgType] {
        &[ArgType::Command]
    }
    fn priority(&self) -> i32 {
        5
    }
    fn on_arg_not_found(&self, _index: usize, raw: &str, _env: &Environment<'_>) -> String {
        format!("Command not found: {raw}")
    }
    // Without an argument, list everything.
    fn on_not_enough_args(&self, _provided: usize, env: &Environment<'_>) -> String {
        let grouped = env.registry.by_category();
        let mut out = format!("Commands ({}):\n", env.registry.len());
        for (category, cmds) in &grouped {
            out.push_str(&format!("\n  [{category}]\n"));
            for cmd in cmds {
                out.push_str(&format!("    {:12} {}\n", cmd.name(), cmd.description()));
            }
        }
        out.push_str("\nType 'help <command>' for details.");
        out
    }
    fn execute(&self, args: &[ArgValue], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let Some(ArgValue::Command(name)) = args.first() else {
            return Ok(CommandOutput::Text(self.on_not_enough_args(0, env)));
        };
        let Some(cmd) = env.registry.get(name) else {
            return Ok(CommandOutput::Text(self.on_arg_not_found(0, name, env)));
        };
        let mut out = format!("{} ({})\n", cmd.name(), cmd.category());
        out.push_str(&format!("  {}\n", cmd.description()));
        out.push_str(&format!("  Usage: {}", cmd.usage()));
        if let Some(table) = cmd.params() {
            for param in table.params {
                out.push_str(&format!("\n    {}", param.usage));
            }
        }
        Ok(CommandOutput::Text(out))
    }
}

// ---------------------------------------------------------------------------
// clear / exit
// ---------------------------------------------------------------------------

struct ClearCmd;
impl Command for ClearCmd {
    fn name(&self) -> &str {
        "clear"
    }
    fn description(&self) -> &str {
        "Clear the terminal"
    }
    fn usage(&self) -> &str {
        "clear"
    }
    fn priority(&self) -> i32 {
        2
    }
    fn execute(&self, _args: &[ArgValue], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Clear)
    }
}

struct ExitCmd;
impl Command for ExitCmd {
    fn name(&self) -> &str {
        "exit"
    }
    fn description(&self) -> &str {
        "Quit hitch"
    }
    fn usage(&self) -> &str {
        "exit"
    }
    fn execute(&self, _args: &[ArgValue], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Exit)
    }
}

// ---------------------------------------------------------------------------
// ctrlc
// ---------------------------------------------------------------------------

struct CtrlcCmd;
impl Command for CtrlcCmd {
    fn name(&self) -> &str {
        "ctrlc"
    }
    fn description(&self) -> &str {
        "Reset the shell session and return home"
    }
    fn usage(&self) -> &str {
        "ctrlc"
    }
    fn category(&self) -> &str {
        "system"
    }
    fn priority(&self) -> i32 {
        3
    }
    fn execute(&self, _args: &[ArgValue], env: &mut Environment<'_>) -> Result<CommandOutput> {
        env.shell.reset();
        env.cwd = env.config.home_dir();
        env.input.reset_hint();
        env.events.on_privilege_dropped();
        log::info!("Shell session reset, cwd {}", env.cwd.display());
        Ok(CommandOutput::None)
    }
}

// ---------------------------------------------------------------------------
// refresh
// ---------------------------------------------------------------------------

struct RefreshCmd;
impl Command for RefreshCmd {
    fn name(&self) -> &str {
        "refresh"
    }
    fn description(&self) -> &str {
        "Reload aliases and rebuild suggestions"
    }
    fn usage(&self) -> &str {
        "refresh"
    }
    fn category(&self) -> &str {
        "system"
    }
    fn priority(&self) -> i32 {
        3
    }
    fn execute(&self, _args: &[ArgValue], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let (warnings, count) = {
            let mut aliases = env.aliases.lock().unwrap_or_else(PoisonError::into_inner);
            let warnings = aliases.reload()?;
            (warnings, aliases.aliases().len())
        };
        env.suggestions.request_rebuild()?;
        let mut lines = warnings;
        lines.push(format!("Refreshed: {count} aliases, suggestions rebuilding"));
        Ok(CommandOutput::Text(lines.join("\n")))
    }
}
