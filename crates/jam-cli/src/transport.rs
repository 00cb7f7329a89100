//! Pd-style command lines for the repl.
//!
//! Mirrors what a patch sends to the object's inlet: `bang`, `load drums`,
//! `reset`, `tpb 96`, `bpm 120`, `list 60 go` or a bare list such as
//! `60 100`. A trailing `;` is accepted and dropped.

use anyhow::{bail, Context, Result};
use jam_core::{Atom, HostMessage};

/// A parsed repl line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Host(HostMessage),
    Quit,
    Empty,
}

pub fn parse_line(line: &str) -> Result<Command> {
    let line = line.trim().trim_end_matches(';').trim();
    let mut parts = line.splitn(2, char::is_whitespace);
    let Some(head) = parts.next().filter(|s| !s.is_empty()) else {
        return Ok(Command::Empty);
    };
    let rest = parts.next().unwrap_or("").trim();

    let message = match head {
        "bang" => HostMessage::Tick,
        "reset" => HostMessage::Reset,
        "quit" | "exit" => return Ok(Command::Quit),
        "load" => {
            if rest.is_empty() {
                bail!("load needs a script name");
            }
            HostMessage::Load(rest.to_string())
        }
        "tpb" => HostMessage::SetTicksPerBeat(parse_number("tpb", rest)?),
        "bpm" => HostMessage::SetBeatsPerMinute(parse_number("bpm", rest)?),
        "list" => HostMessage::Message(Atom::parse_list(rest)),
        _ => match Atom::parse(head) {
            Atom::Float(_) => HostMessage::Message(Atom::parse_list(line)),
            Atom::Symbol(_) => bail!("no method for '{}'", head),
        },
    };

    Ok(Command::Host(message))
}

fn parse_number(selector: &str, text: &str) -> Result<f64> {
    text.parse::<f64>()
        .with_context(|| format!("{} expects a number, got '{}'", selector, text))
}
