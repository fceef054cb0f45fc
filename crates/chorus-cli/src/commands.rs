//! REPL input parsing.

use chorus_conversation::Direction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Models,
    Branch(Direction),
    History,
    Help,
    Quit,
    Prompt(String),
    Unknown(String),
}

/// Parse one input line. `None` for blank lines.
pub fn parse(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Some(Command::Prompt(line.to_string()));
    };

    let mut words = rest.split_whitespace();
    let command = match (words.next(), words.next()) {
        (Some("models"), None) => Command::Models,
        (Some("history"), None) => Command::History,
        (Some("help"), None) => Command::Help,
        (Some("quit" | "exit"), None) => Command::Quit,
        (Some("branch"), Some("next")) => Command::Branch(Direction::Next),
        (Some("branch"), Some("prev" | "previous")) => Command::Branch(Direction::Previous),
        _ => Command::Unknown(line.to_string()),
    };
    Some(command)
}

pub const HELP: &str = "\
/models          list registered models
/branch next     show the next reply to the latest prompt
/branch prev     show the previous reply to the latest prompt
/history         print the active branch
/quit            exit";
