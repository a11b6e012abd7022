//! The `alias` command and its interactive `-new` flow.

use std::sync::{Arc, PoisonError};

use hitch_types::error::{HitchError, Result};

use crate::args::{ArgType, ArgValue, Param, ParamTable};
use crate::interpreter::{Command, CommandOutput, CommandRegistry, Environment};
use crate::redirect::{RedirectHandler, RedirectStep, RedirectionView};

/// Register alias management commands into a registry.
pub fn register_alias_commands(reg: &mut CommandRegistry) {
    reg.register(Box::new(AliasCmd));
}

static ALIAS_PARAMS: ParamTable = ParamTable {
    params: &[
        Param {
            name: "-add",
            args: &[ArgType::NoSpaceString, ArgType::PlainText],
            usage: "alias -add <name> <value>",
        },
        Param {
            name: "-rm",
            args: &[ArgType::NoSpaceString],
            usage: "alias -rm <name>",
        },
        Param {
            name: "-ls",
            args: &[],
            usage: "alias -ls",
        },
        Param {
            name: "-reload",
            args: &[],
            usage: "alias -reload",
        },
        Param {
            name: "-new",
            args: &[],
            usage: "alias -new",
        },
    ],
    default: None,
};

struct AliasCmd;
impl Command for AliasCmd {
    fn name(&self) -> &str {
        "alias"
    }
    fn description(&self) -> &str {
        "Manage aliases"
    }
    fn usage(&self) -> &str {
        "alias -add|-rm|-ls|-reload|-new"
    }
    fn category(&self) -> &str {
        "config"
    }
    fn priority(&self) -> i32 {
        4
    }
    fn params(&self) -> Option<&'static ParamTable> {
        Some(&ALIAS_PARAMS)
    }
    fn execute(&self, args: &[ArgValue], env: &mut Environment<'_>) -> Result<CommandOutput> {
        let mut aliases = env.aliases.lock().unwrap_or_else(PoisonError::into_inner);
        let text = match args {
            [ArgValue::Param("-add"), ArgValue::Text(name), ArgValue::Text(value)] => {
                aliases.add(name, value)?;
                format!("Alias added: {name} --> {value}")
            },
            [ArgValue::Param("-rm"), ArgValue::Text(name)] => {
                aliases.remove(name)?;
                format!("Alias removed: {name}")
            },
            [ArgValue::Param("-ls"), ..] => {
                let listing = aliases.print_aliases();
                if listing.is_empty() {
                    "No aliases".to_string()
                } else {
                    listing
                }
            },
            [ArgValue::Param("-reload"), ..] => {
                let mut lines = aliases.reload()?;
                lines.push(format!("Aliases reloaded ({})", aliases.aliases().len()));
                lines.join("\n")
            },
            [ArgValue::Param("-new"), ..] => {
                drop(aliases);
                env.redirector
                    .prepare(Arc::new(NewAliasFlow), vec!["-new".to_string()]);
                "Alias name?".to_string()
            },
            _ => return Err(HitchError::Command(format!("usage: {}", self.usage()))),
        };
        Ok(CommandOutput::Text(text))
    }
}

/// Asks for a name, then a value, then adds the alias.
struct NewAliasFlow;

impl RedirectHandler for NewAliasFlow {
    fn hint(&self) -> &str {
        "alias name"
    }

    fn on_redirect(
        &self,
        handle: &RedirectionView,
        input: &str,
        env: &mut Environment<'_>,
    ) -> RedirectStep {
        match handle.after.as_slice() {
            [name] => {
                if name.contains(char::is_whitespace) {
                    return RedirectStep::Finish(Some(format!(
                        "Invalid alias name: {name}"
                    )));
                }
                env.input.set_hint("alias value");
                RedirectStep::Continue(Some(format!("Value for '{input}'?")))
            },
            [name, value, ..] => {
                let mut aliases = env.aliases.lock().unwrap_or_else(PoisonError::into_inner);
                let text = match aliases.add(name, value) {
                    Ok(()) => format!("Alias added: {name} --> {value}"),
                    Err(e) => e.to_string(),
                };
                RedirectStep::Finish(Some(text))
            },
            [] => RedirectStep::Continue(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::redirect::RedirectionState;
    use crate::test_utils::Fixture;

    fn registry() -> CommandRegistry {
        let mut reg = CommandRegistry::new();
        register_alias_commands(&mut reg);
        reg
    }

    fn run(fx: &Fixture, line: &str) -> String {
        let reg = registry();
        let mut env = fx.env(&reg);
        match reg.parse(line, &env).unwrap().run(&mut env) {
            Ok(CommandOutput::Text(t)) => t,
            Ok(other) => format!("{other:?}"),
            Err(e) => format!("error: {e}"),
        }
    }

    #[test]
    fn add_list_remove() {
        let fx = Fixture::new();
        assert_eq!(run(&fx, "alias -ls"), "No aliases");
        assert_eq!(
            run(&fx, "alias -add ll ls -la"),
            "Alias added: ll --> ls -la"
        );
        assert_eq!(run(&fx, "alias -ls"), "ll --> ls -la");
        assert_eq!(run(&fx, "alias -rm ll"), "Alias removed: ll");
        assert_eq!(run(&fx, "alias -rm ll"), "error: alias error: alias 'll' not found");
    }

    #[test]
    fn add_rejects_self_reference() {
        let fx = Fixture::new();
        assert_eq!(
            run(&fx, "alias -add x x"),
            "error: alias error: alias 'x' expands to itself"
        );
        assert!(fx.aliases.lock().unwrap().aliases().is_empty());
    }

    #[test]
    fn validation_messages() {
        let fx = Fixture::new();
        assert!(run(&fx, "alias -bogus").starts_with("Invalid parameter: -bogus"));
        assert_eq!(run(&fx, "alias -add ll"), "Usage: alias -add <name> <value>");
        assert_eq!(run(&fx, "alias"), "Usage: alias -add|-rm|-ls|-reload|-new");
    }

    #[test]
    fn new_flow_uses_redirection() {
        let fx = Fixture::new();
        let reg = registry();
        assert_eq!(run(&fx, "alias -new"), "Alias name?");
        assert_eq!(fx.redirector.state(), RedirectionState::Active);
        assert_eq!(fx.input.hints(), vec!["alias name".to_string()]);

        let mut env = fx.env(&reg);
        assert_eq!(
            fx.redirector.route("gs", &mut env),
            Some(RedirectStep::Continue(Some("Value for 'gs'?".to_string())))
        );
        assert_eq!(
            fx.redirector.route("git status", &mut env),
            Some(RedirectStep::Finish(Some(
                "Alias added: gs --> git status".to_string()
            )))
        );
        assert_eq!(fx.redirector.state(), RedirectionState::Idle);
        assert_eq!(
            fx.aliases.lock().unwrap().get("gs").unwrap().value,
            "git status"
        );
    }
}
