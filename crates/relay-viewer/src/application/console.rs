//! Console command parsing.
//!
//! | Input                          | Sends                                  |
//! |--------------------------------|----------------------------------------|
//! | `move <x> <y>`                 | `command` move                         |
//! | `click <x> <y> [button]`       | `command` click (`left` by default)    |
//! | `scroll <dx> <dy>`             | `command` scroll                       |
//! | `key <code> [modifier...]`     | `command` keydown then keyup           |
//! | `type <text>`                  | `set_injection_text` (`\n`, `\t` escapes) |
//! | `help`                         | nothing; prints usage                  |
//! | `quit`                         | nothing; ends the session              |

use relay_core::{ClientMsg, ControlCommand, Modifiers, MouseButton};
use thiserror::Error;

/// Usage text printed for `help` and after a parse error.
pub const USAGE: &str = "commands: move X Y | click X Y [left|right|middle] | scroll DX DY | \
key CODE [ctrl|shift|alt|meta...] | type TEXT | help | quit";

/// What a console line asks the viewer to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewerInput {
    /// Send these messages to the relay, in order.
    Send(Vec<ClientMsg>),
    Help,
    Quit,
    /// Blank line.
    Nothing,
}

/// Why a console line was not understood.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("missing argument <{0}>")]
    MissingArgument(&'static str),

    #[error("<{name}> must be an integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("unknown mouse button {0:?}")]
    UnknownButton(String),

    #[error("unknown modifier {0:?}")]
    UnknownModifier(String),

    #[error("unexpected argument {0:?}")]
    Unexpected(String),
}

/// Parses one console line.
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first problem in the line.
pub fn parse_line(line: &str) -> Result<ViewerInput, ParseError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim_start()),
        None => (line, ""),
    };
    let mut args = rest.split_whitespace();

    let input = match verb.to_ascii_lowercase().as_str() {
        "" => return Ok(ViewerInput::Nothing),
        "help" | "?" => return Ok(ViewerInput::Help),
        "quit" | "q" | "exit" => return Ok(ViewerInput::Quit),
        "type" => {
            return Ok(ViewerInput::Send(vec![ClientMsg::SetInjectionText {
                text: unescape(rest),
            }]))
        }
        "move" => vec![ControlCommand::Move {
            x: int(args.next(), "x")?,
            y: int(args.next(), "y")?,
        }],
        "click" => {
            let x = int(args.next(), "x")?;
            let y = int(args.next(), "y")?;
            let button = match args.next() {
                Some(name) => button(name)?,
                None => MouseButton::Left,
            };
            vec![ControlCommand::Click { button, x, y }]
        }
        "scroll" => vec![ControlCommand::Scroll {
            dx: int(args.next(), "dx")?,
            dy: int(args.next(), "dy")?,
        }],
        "key" => {
            let code = args.next().ok_or(ParseError::MissingArgument("code"))?;
            let mut modifiers = Modifiers::default();
            for name in args.by_ref() {
                match name.to_ascii_lowercase().as_str() {
                    "ctrl" | "control" => modifiers.ctrl = true,
                    "shift" => modifiers.shift = true,
                    "alt" => modifiers.alt = true,
                    "meta" | "win" | "cmd" => modifiers.meta = true,
                    _ => return Err(ParseError::UnknownModifier(name.to_string())),
                }
            }
            vec![
                ControlCommand::KeyDown {
                    key: code.to_string(),
                    code: code.to_string(),
                    modifiers,
                },
                ControlCommand::KeyUp {
                    key: code.to_string(),
                    code: code.to_string(),
                },
            ]
        }
        _ => return Err(ParseError::UnknownCommand(verb.to_string())),
    };

    if let Some(extra) = args.next() {
        return Err(ParseError::Unexpected(extra.to_string()));
    }
    Ok(ViewerInput::Send(
        input
            .into_iter()
            .map(|command| ClientMsg::Command { command })
            .collect(),
    ))
}

fn int(arg: Option<&str>, name: &'static str) -> Result<i32, ParseError> {
    let value = arg.ok_or(ParseError::MissingArgument(name))?;
    value.parse().map_err(|_| ParseError::InvalidNumber {
        name,
        value: value.to_string(),
    })
}

fn button(name: &str) -> Result<MouseButton, ParseError> {
    match name.to_ascii_lowercase().as_str() {
        "left" | "l" => Ok(MouseButton::Left),
        "right" | "r" => Ok(MouseButton::Right),
        "middle" | "m" => Ok(MouseButton::Middle),
        _ => Err(ParseError::UnknownButton(name.to_string())),
    }
}

/// Expands `\n`, `\t` and `\\`; any other backslash is kept as is.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
