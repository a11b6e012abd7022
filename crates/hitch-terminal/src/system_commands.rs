//! System commands: calc, switch-os, uname, apps.

use std::sync::{Mutex, PoisonError};

use hitch_types::config::TerminalConfig;
use hitch_types::error::{HitchError, Result};

use crate::args::{ArgType, ArgValue, Param, ParamTable};
use crate::calc::{evaluate, format_result};
use crate::format::launch_line;
use crate::interpreter::{Command, CommandOutput, CommandRegistry, Environment};

/// Register system commands into a registry.
pub fn register_system_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(CalcCmd));
    reg.register(Box::new(SwitchOsCmd));
    reg.register(Box::new(UnameCmd));
    reg.register(Box::new(AppsCmd));
}

/// The emulated system identity shown by `uname` and changed by `switch-os`.
pub struct SystemContext {
    os: Mutex<String>,
    user: String,
    hostname: String,
    targets: Vec<String>,
}

impl SystemContext {
    pub fn new(user: &str, hostname: &str, targets: Vec<String>) -> Self {
        let os = targets.first().cloned().unwrap_or_else(|| "unknown".to_string());
        Self {
            os: Mutex::new(os),
            user: user.to_string(),
            hostname: hostname.to_string(),
            targets,
        }
    }

    pub fn from_config(config: &TerminalConfig) -> Self {
        Self::new(&config.user, &config.hostname, config.os_targets.clone())
    }

    pub fn os(&self) -> String {
        self.os.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Switch to `target` if it is a configured OS. Returns the new OS.
    pub fn switch(&self, target: &str) -> Option<String> {
        let found = self
            .targets
            .iter()
            .find(|t| t.eq_ignore_ascii_case(target))?
            .clone();
        *self.os.lock().unwrap_or_else(PoisonError::into_inner) = found.clone();
        Some(found)
    }

    /// `user@hostname (os)`.
    pub fn describe(&self) -> String {
        format!("{}@{} ({})", self.user, self.hostname, self.os())
    }
}

// ---------------------------------------------------------------------------
// calc
// ---------------------------------------------------------------------------

struct CalcCmd;
impl Command for CalcCmd {
    fn name(&self) -> &str {
        "calc"
    }
    fn description(&self) -> &str {
        "Evaluate an arithmetic expression"
    }
    fn usage(&self) -> &str {
        "calc <expression>  (+ - * / ^, sqrt sin cos tan)"
    }
    fn category(&self) -> &str {
        "math"
    }
    fn arg_types(&self) -> &[ArgType] {
        &[ArgType::PlainText]
    }
    fn priority(&self) -> i32 {
        3
    }
    fn execute(&self, args: &[ArgValue], _env: &mut Environment<'_>) -> Result<CommandOutput> {
        let Some(ArgValue::Text(expr)) = args.first() else {
            return Err(HitchError::Command("calc: missing expression".to_string()));
        };
        let text = match evaluate(expr) {
            Ok(value) => format_result(value),
            Err(e) => e.to_string(),
        };
        Ok(CommandOutput::Text(text))
    }
}

// ---------------------------------------------------------------------------
// switch-os
// ---------------------------------------------------------------------------

struct SwitchOsCmd;
impl Command for SwitchOsCmd {
    fn name(&self) -> &str {
        "switch-os"
    }
    fn description(&self) -> &str {
        "Switch the emulated operating system"
    }
    fn usage(&self) -> &str {
        "switch-os <os>"
    }
    fn category(&self) -> &str {
        "system"
    }
    fn arg_types(&self) -> &[ArgType] {
        &[ArgType::PlainText]
    }
    fn priority(&self) -> i32 {
        5
    }
    fn on_not_enough_args(&self, _provided: usize, env: &Environment<'_>) -> String {
        format!("Usage: switch-os <{}>", env.system.targets().join("|"))
    }
    fn execute(&self, args: &[ArgValue], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let Some(ArgValue::Text(target)) = args.first() else {
            return Err(HitchError::Command("switch-os: missing target".to_string()));
        };
        let target = target.to_lowercase();
        let text = match env.system.switch(&target) {
            Some(os) => {
                log::info!("Switched OS to {os}");
                format!(
                    ">> SYSTEM REBOOT INITIALIZED...\n>> KERNEL SWITCHED TO: {}",
                    os.to_uppercase()
                )
            },
            None => format!("OS '{target}' NOT FOUND."),
        };
        Ok(CommandOutput::Text(text))
    }
}

// ---------------------------------------------------------------------------
// uname
// ---------------------------------------------------------------------------

struct UnameCmd;
impl Command for UnameCmd {
    fn name(&self) -> &str {
        "uname"
    }
    fn description(&self) -> &str {
        "Show user, host, and OS"
    }
    fn usage(&self) -> &str {
        "uname"
    }
    fn category(&self) -> &str {
        "system"
    }
    fn priority(&self) -> i32 {
        2
    }
    fn execute(&self, _args: &[ArgValue], env: &mut Environment<'_>) -> Result<CommandOutput> {
        Ok(CommandOutput::Text(env.system.describe()))
    }
}

// ---------------------------------------------------------------------------
// apps
// ---------------------------------------------------------------------------

static APPS_PARAMS: ParamTable = ParamTable {
    params: &[
        Param {
            name: "-ls",
            args: &[],
            usage: "apps [-ls]",
        },
        Param {
            name: "-launch",
            args: &[ArgType::VisiblePackage],
            usage: "apps -launch <app>",
        },
        Param {
            name: "-groups",
            args: &[],
            usage: "apps -groups",
        },
    ],
    default: Some("-ls"),
};

struct AppsCmd;
impl Command for AppsCmd {
    fn name(&self) -> &str {
        "apps"
    }
    fn description(&self) -> &str {
        "List or launch applications"
    }
    fn usage(&self) -> &str {
        "apps [-ls | -launch <app> | -groups]"
    }
    fn category(&self) -> &str {
        "apps"
    }
    fn priority(&self) -> i32 {
        4
    }
    fn params(&self) -> Option<&'static ParamTable> {
        Some(&APPS_PARAMS)
    }
    fn on_param_arg_not_found(
        &self,
        _param: &Param,
        _index: usize,
        raw: &str,
        _env: &Environment<'_>,
    ) -> String {
        format!("App not found: {raw}")
    }
    fn execute(&self, args: &[ArgValue], env: &mut Environment<'_>) -> Result<CommandOutput> {
        match args {
            [ArgValue::Param("-launch"), ArgValue::App(app)] => {
                if !env.apps.launch(&app.identifier) {
                    return Err(HitchError::Command(format!(
                        "could not launch {}",
                        app.label
                    )));
                }
                if env.config.show_launch_history {
                    Ok(CommandOutput::Text(launch_line(
                        &env.config.app_launch_format,
                        app,
                    )))
                } else {
                    Ok(CommandOutput::None)
                }
            },
            [ArgValue::Param("-launch")] => Ok(CommandOutput::Text(format!(
                "Usage: {}",
                APPS_PARAMS.params[1].usage
            ))),
            [ArgValue::Param("-groups"), ..] => {
                let groups = env.apps.groups();
                if groups.is_empty() {
                    return Ok(CommandOutput::Text("No app groups".to_string()));
                }
                let lines: Vec<String> = groups
                    .iter()
                    .map(|g| format!("{} ({})", g.name, g.members.join(", ")))
                    .collect();
                Ok(CommandOutput::Text(lines.join("\n")))
            },
            _ => {
                let apps = env.apps.list_launchable();
                if apps.is_empty() {
                    return Ok(CommandOutput::Text("No launchable apps".to_string()));
                }
                let mut labels: Vec<&str> = apps.iter().map(|a| a.label.as_str()).collect();
                labels.sort_by_key(|l| l.to_lowercase());
                Ok(CommandOutput::Text(labels.join("\n")))
            },
        }
    }
}
