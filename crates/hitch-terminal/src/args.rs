//! Argument-type vocabulary and classification of raw input against a schema.

use std::path::PathBuf;

use hitch_platform::{AppInfo, unspaced_lowercase};
use hitch_types::color::{Rgb, parse_hex_color};

use crate::interpreter::Environment;

/// How an argument is classified, for validation and autocomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgType {
    /// The remainder of the line, verbatim.
    PlainText,
    /// The remaining whitespace-separated words.
    TextList,
    /// A single word.
    NoSpaceString,
    /// A path relative to the working directory that must exist.
    File,
    /// An app label or identifier known to the app service.
    VisiblePackage,
    /// A named app group.
    AppGroup,
    /// Digits with an optional leading `+`; `-`, `(`, `)` allowed.
    ContactNumber,
    /// A registered command name.
    Command,
    /// `true/false/on/off/yes/no/1/0`.
    Boolean,
    /// `#RRGGBB`.
    Color,
    Int,
    Long,
    /// The selector of a parameterized command.
    Param,
}

/// A classified argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Text(String),
    List(Vec<String>),
    Path(PathBuf),
    App(AppInfo),
    Group(String),
    Bool(bool),
    Color(Rgb),
    Int(i32),
    Long(i64),
    Command(String),
    Param(&'static str),
}

/// One sub-schema of a parameterized command.
#[derive(Debug)]
pub struct Param {
    /// What the user types, e.g. `-add`.
    pub name: &'static str,
    pub args: &'static [ArgType],
    pub usage: &'static str,
}

/// The parameters of a parameterized command.
#[derive(Debug)]
pub struct ParamTable {
    pub params: &'static [Param],
    /// Parameter assumed when the first word names none.
    pub default: Option<&'static str>,
}

impl ParamTable {
    /// Find a parameter by name (case-insensitive).
    pub fn find(&self, name: &str) -> Option<&'static Param> {
        self.params
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.params.iter().map(|p| p.name).collect()
    }
}

/// Classify `input` against `types`.
///
/// Stops at the first argument that fails, recording it as raw text at
/// the returned invalid index. Missing trailing arguments are not an error
/// here; the caller compares counts.
pub fn parse_args(
    types: &[ArgType],
    input: &str,
    env: &Environment<'_>,
) -> (Vec<ArgValue>, Option<usize>) {
    let mut out = Vec::with_capacity(types.len());
    let invalid = parse_into(types, input, env, &mut out);
    (out, invalid)
}

/// Classify `input` for a parameterized command.
///
/// Slot 0 always holds the parameter: the one named by the first word,
/// else the table default (without consuming the word). With neither, the
/// word is kept as raw text and flagged invalid at index 0.
pub fn parse_param_args(
    table: &'static ParamTable,
    input: &str,
    env: &Environment<'_>,
) -> (Vec<ArgValue>, Option<usize>) {
    let input = input.trim_start();
    let (word, rest) = split_word(input);
    let (param, rest) = match table.find(word) {
        Some(param) if !word.is_empty() => (param, rest),
        _ => match table.default.and_then(|d| table.find(d)) {
            Some(param) => (param, input),
            None if word.is_empty() => return (Vec::new(), None),
            None => return (vec![ArgValue::Text(word.to_string())], Some(0)),
        },
    };
    let mut out = vec![ArgValue::Param(param.name)];
    let invalid = parse_into(param.args, rest, env, &mut out);
    (out, invalid)
}

fn parse_into(
    types: &[ArgType],
    input: &str,
    env: &Environment<'_>,
    out: &mut Vec<ArgValue>,
) -> Option<usize> {
    let mut rest = input.trim();
    for ty in types {
        if rest.is_empty() {
            return None;
        }
        let (raw, remaining) = match ty {
            ArgType::PlainText
            | ArgType::TextList
            | ArgType::VisiblePackage
            | ArgType::AppGroup => (rest, ""),
            _ => split_word(rest),
        };
        match classify(*ty, raw, env) {
            Some(value) => out.push(value),
            None => {
                out.push(ArgValue::Text(raw.to_string()));
                return Some(out.len() - 1);
            },
        }
        rest = remaining.trim_start();
    }
    None
}

fn split_word(s: &str) -> (&str, &str) {
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

fn classify(ty: ArgType, raw: &str, env: &Environment<'_>) -> Option<ArgValue> {
    match ty {
        ArgType::PlainText | ArgType::NoSpaceString | ArgType::Param => {
            Some(ArgValue::Text(raw.to_string()))
        },
        ArgType::TextList => Some(ArgValue::List(
            raw.split_whitespace().map(str::to_string).collect(),
        )),
        ArgType::File => {
            let path = env.cwd.join(raw);
            path.exists().then_some(ArgValue::Path(path))
        },
        ArgType::VisiblePackage => env
            .apps
            .find_by_label(raw)
            .or_else(|| {
                env.apps
                    .list_launchable()
                    .into_iter()
                    .find(|app| app.identifier == raw)
            })
            .map(ArgValue::App),
        ArgType::AppGroup => {
            let key = unspaced_lowercase(raw);
            env.apps
                .groups()
                .into_iter()
                .find(|g| unspaced_lowercase(&g.name) == key)
                .map(|g| ArgValue::Group(g.name))
        },
        ArgType::ContactNumber => {
            is_contact_number(raw).then(|| ArgValue::Text(raw.to_string()))
        },
        ArgType::Command => env
            .registry
            .get(raw)
            .map(|c| ArgValue::Command(c.name().to_string())),
        ArgType::Boolean => parse_bool(raw).map(ArgValue::Bool),
        ArgType::Color => parse_hex_color(raw).map(ArgValue::Color),
        ArgType::Int => raw.parse().ok().map(ArgValue::Int),
        ArgType::Long => raw.parse().ok().map(ArgValue::Long),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn is_contact_number(raw: &str) -> bool {
    let body = raw.strip_prefix('+').unwrap_or(raw);
    body.chars().any(|c| c.is_ascii_digit())
        && body
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | '(' | ')'))
}
