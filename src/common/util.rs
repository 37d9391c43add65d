use tracing::{error, trace};

use crate::sys::process::Launcher;

/// Splits a command line on unquoted whitespace. Quotes group words and are
/// dropped; inside quotes the usual backslash escapes apply.
pub fn parse_command(command: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current_part = String::new();
    let mut quote: Option<char> = None;
    let mut chars = command.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\'' | '"' if quote.is_none() => {
                quote = Some(ch);
            }
            c if quote == Some(c) => {
                quote = None;
            }
            ' ' | '\t' if quote.is_none() => {
                if !current_part.is_empty() {
                    parts.push(std::mem::take(&mut current_part));
                }
            }
            '\\' if quote.is_some() => match chars.next() {
                Some('n') => current_part.push('\n'),
                Some('t') => current_part.push('\t'),
                Some(c @ ('\\' | '\'' | '"')) => current_part.push(c),
                Some(other) => {
                    current_part.push('\\');
                    current_part.push(other);
                }
                None => current_part.push('\\'),
            },
            _ => {
                current_part.push(ch);
            }
        }
    }

    if !current_part.is_empty() {
        parts.push(current_part);
    }

    parts
}

/// Launches each `autostart` command once. Failures are logged and the rest
/// still run.
pub fn execute_startup_commands(commands: &[String], launcher: &dyn Launcher) {
    if commands.is_empty() {
        return;
    }

    trace!("Executing {} startup commands", commands.len());

    for (i, command) in commands.iter().enumerate() {
        trace!("Executing startup command {}: {}", i + 1, command);

        let parts = parse_command(command);
        if parts.is_empty() {
            error!("Empty startup command at index {}", i);
            continue;
        }
        if let Err(e) = launcher.spawn(&parts) {
            error!("Failed to execute startup command '{}': {}", command, e);
        }
    }
}
