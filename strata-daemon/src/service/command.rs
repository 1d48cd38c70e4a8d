//! Command line rendering
//!
//! A job runs as `<internal cli> <tool fragment> [params...] --token <token>`.
//! Parameters are rendered in key order so the same job always yields the
//! same command line. Two renderings are produced: the one executed, which
//! carries the user's token, and the one stored on the job, which does not.

use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::tools::ToolRegistry;

/// Placeholder replacing the token in stored command lines
pub const REDACTED_TOKEN: &str = "xxxxxxxxxxxxxxxxxxxxx";

/// Errors raised while rendering a command line
#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Tool id '{0}' not found.")]
    UnknownTool(String),

    /// Names are written unquoted; only `[A-Za-z0-9_.-]+` is accepted
    #[error("Invalid parameter name '{0}'")]
    InvalidParamName(String),
}

/// Both renderings of a job's command line
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLine {
    /// Executed; carries the real token
    pub authenticated: String,

    /// Stored on the job for display
    pub redacted: String,
}

/// Renders job parameters into command lines
#[derive(Clone)]
pub struct CommandBuilder {
    internal_cli: PathBuf,
    tools: Arc<ToolRegistry>,
}

impl CommandBuilder {
    pub fn new(internal_cli: PathBuf, tools: Arc<ToolRegistry>) -> Self {
        Self {
            internal_cli,
            tools,
        }
    }

    /// Renders the command line of a tool
    pub fn build(
        &self,
        tool_id: &str,
        params: &HashMap<String, Value>,
        token: &str,
    ) -> Result<CommandLine, CommandError> {
        let fragment = self
            .tools
            .command(tool_id)
            .ok_or_else(|| CommandError::UnknownTool(tool_id.to_string()))?;

        let mut base = shell_words::quote(&self.internal_cli.to_string_lossy()).into_owned();
        base.push(' ');
        base.push_str(fragment);

        let mut keys: Vec<&String> = params.keys().collect();
        keys.sort();
        for key in keys {
            render_param(&mut base, key, &params[key])?;
        }

        Ok(CommandLine {
            authenticated: format!("{} --token {}", base, shell_words::quote(token)),
            redacted: format!("{} --token {}", base, REDACTED_TOKEN),
        })
    }
}

fn render_param(out: &mut String, key: &str, value: &Value) -> Result<(), CommandError> {
    check_name(key)?;

    match value {
        Value::Null => {}
        // Dynamic flags
        Value::Object(map) => {
            let mut flags: Vec<(&String, &Value)> = map.iter().collect();
            flags.sort_by(|a, b| a.0.cmp(b.0));
            for (flag, value) in flags {
                check_name(flag)?;
                if let Some(value) = scalar(value) {
                    out.push_str(&format!(" -D{}={}", flag, shell_words::quote(&value)));
                }
            }
        }
        other => {
            if let Some(value) = scalar(other) {
                out.push_str(&format!(
                    " --{} {}",
                    to_kebab_case(key),
                    shell_words::quote(&value)
                ));
            }
        }
    }
    Ok(())
}

/// Accepts `[A-Za-z0-9_.-]+`
fn check_name(name: &str) -> Result<(), CommandError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(CommandError::InvalidParamName(name.to_string()))
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Object(_) => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(scalar)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}

/// Converts a camelCase parameter name to its kebab-case flag
pub fn to_kebab_case(key: &str) -> String {
    let mut flag = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                flag.push('-');
            }
            flag.push(c.to_ascii_lowercase());
        } else if c == '_' {
            flag.push('-');
        } else {
            flag.push(c);
        }
    }
    flag
}
