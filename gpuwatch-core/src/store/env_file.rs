//! `KEY=VALUE` file-backed state store
//!
//! Reads are done fresh from disk on every call; writes rewrite the whole
//! file, replacing every line that defines the key in place so comments,
//! ordering and unrelated keys survive.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{StateStore, StoreError};

/// State store backed by a dotenv-style file
#[derive(Debug, Clone)]
pub struct EnvFileStore {
    path: PathBuf,
}

impl EnvFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// File contents, or an empty string if the file does not exist yet
    fn read_contents(&self) -> Result<String, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

/// Parse one line into a key/value pair, skipping blanks and comments
fn parse_line(line: &str) -> Option<(&str, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let line = line.strip_prefix("export ").unwrap_or(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, parse_value(value.trim())))
}

fn parse_value(raw: &str) -> String {
    let quoted = if let Some(body) = raw.strip_prefix('"') {
        parse_double_quoted(body)
    } else if let Some(body) = raw.strip_prefix('\'') {
        body.find('\'')
            .map(|end| (body[..end].to_string(), &body[end + 1..]))
    } else {
        None
    };

    // A closed quote may only be followed by blanks or a `# comment`
    if let Some((value, rest)) = quoted {
        let rest = rest.trim_start();
        if rest.is_empty() || rest.starts_with('#') {
            return value;
        }
    }

    // Unquoted values may carry a trailing ` # comment`
    match raw.find(" #") {
        Some(idx) => raw[..idx].trim_end().to_string(),
        None => raw.to_string(),
    }
}

/// Unescape a double-quoted value, returning it and the text after the closing quote
fn parse_double_quoted(body: &str) -> Option<(String, &str)> {
    let mut value = String::with_capacity(body.len());
    let mut chars = body.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Some((value, &body[idx + 1..])),
            '\\' => match chars.next()? {
                (_, 'n') => value.push('\n'),
                (_, 'r') => value.push('\r'),
                (_, 't') => value.push('\t'),
                (_, escaped @ ('"' | '\\')) => value.push(escaped),
                (_, other) => {
                    value.push('\\');
                    value.push(other);
                }
            },
            _ => value.push(c),
        }
    }
    None
}

fn format_line(key: &str, value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '\\'));
    if !needs_quotes {
        return format!("{}={}", key, value);
    }

    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    format!("{}=\"{}\"", key, escaped)
}

impl StateStore for EnvFileStore {
    fn get(&self, name: &str) -> Result<String, StoreError> {
        let content = self.read_contents()?;
        let value = content
            .lines()
            .filter_map(parse_line)
            .filter(|(key, _)| *key == name)
            .map(|(_, value)| value)
            .last();

        match value {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(StoreError::Missing(name.to_string())),
        }
    }

    fn set(&self, name: &str, value: &str) -> Result<(), StoreError> {
        let content = self.read_contents()?;
        let new_line = format_line(name, value);

        let mut replaced = false;
        let mut lines: Vec<String> = content
            .lines()
            .map(|line| {
                if parse_line(line).map_or(false, |(key, _)| key == name) {
                    replaced = true;
                    new_line.clone()
                } else {
                    line.to_string()
                }
            })
            .collect();
        if !replaced {
            lines.push(new_line);
        }

        let mut output = lines.join("\n");
        output.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        std::fs::write(&self.path, output).map_err(|e| self.io_error(e))?;

        debug!(path = ?self.path, key = name, "State value written");
        Ok(())
    }
}
