//! Command lines and the templates they are rendered from.

use crate::error::ToolError;
use std::fmt;

/// A program plus its arguments, ready to spawn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Program name without any directory part, for log and error labels.
    pub fn label(&self) -> &str {
        self.program
            .rsplit('/')
            .next()
            .unwrap_or(self.program.as_str())
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// A command with `{name}` placeholders.
///
/// The template is tokenised before substitution, so a value containing
/// spaces (a tool path, say) still ends up as a single argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate<'a> {
    template: &'a str,
}

impl<'a> CommandTemplate<'a> {
    pub fn new(template: &'a str) -> Self {
        CommandTemplate { template }
    }

    pub fn render(&self, vars: &[(&str, String)]) -> Result<CommandLine, ToolError> {
        let mut tokens = self
            .template
            .split_whitespace()
            .map(|token| substitute(token, vars));

        let program = tokens.next().ok_or(ToolError::EmptyCommand)?;
        Ok(CommandLine {
            program,
            args: tokens.collect(),
        })
    }
}

/// Replace every `{name}` in `token` in one left-to-right pass.
///
/// Substituted text is never rescanned. Unknown names are kept verbatim.
fn substitute(token: &str, vars: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(token.len());
    let mut rest = token;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find(|c: char| c == '{' || c == '}') {
            Some(close) if after[close..].starts_with('}') => {
                let name = &after[..close];
                match vars.iter().find(|(key, _)| *key == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
