//! Reader for Java-style `.properties` files such as `gradle.properties`.
//!
//! Supports the full line format: `=`, `:` or whitespace separators, `#` and
//! `!` comments, backslash line continuations, and `\t`, `\n`, `\r`, `\f`
//! and `\uXXXX` escapes. File bytes are decoded as ISO-8859-1.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A parsed property file: keys in first-seen order, each with its last assigned value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyFile {
    path: PathBuf,
    entries: Vec<(String, String)>,
    index: HashMap<String, usize>,
}

impl PropertyFile {
    /// Read and parse a property file from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or contains a malformed
    /// `\uXXXX` escape.
    pub fn from_path(path: &Path) -> Result<Self, PropertiesError> {
        let bytes = std::fs::read(path).map_err(|source| PropertiesError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let content: String = bytes.iter().copied().map(char::from).collect();
        Self::parse(path, &content)
    }

    /// Parse property file `content`; `path` is recorded for error messages.
    ///
    /// # Errors
    /// Returns an error if a `\uXXXX` escape is malformed.
    pub fn parse(path: &Path, content: &str) -> Result<Self, PropertiesError> {
        let mut file = Self {
            path: path.to_path_buf(),
            entries: Vec::new(),
            index: HashMap::new(),
        };

        let lines = natural_lines(content);
        let mut iter = lines.iter().enumerate();

        while let Some((idx, raw)) = iter.next() {
            let line = raw.trim_start_matches(is_blank);
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }

            let line_no = idx.saturating_add(1);
            let mut logical = String::new();
            let mut current = line;
            loop {
                if !ends_with_continuation(current) {
                    logical.push_str(current);
                    break;
                }
                logical.push_str(current.strip_suffix('\\').unwrap_or(current));
                match iter.next() {
                    Some((_, next)) => current = next.trim_start_matches(is_blank),
                    None => break,
                }
            }

            let (key, value) = split_logical_line(&logical);
            let key = unescape(key).ok_or_else(|| PropertiesError::MalformedEscape {
                path: path.display().to_string(),
                line: line_no,
            })?;
            let value = unescape(value).ok_or_else(|| PropertiesError::MalformedEscape {
                path: path.display().to_string(),
                line: line_no,
            })?;
            file.insert(key, value);
        }

        Ok(file)
    }

    fn insert(&mut self, key: String, value: String) {
        if let Some(slot) = self
            .index
            .get(&key)
            .and_then(|&i| self.entries.get_mut(i))
        {
            slot.1 = value;
            return;
        }
        self.index.insert(key.clone(), self.entries.len());
        self.entries.push((key, value));
    }

    /// The path this file was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up the value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .and_then(|&i| self.entries.get(i))
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over `(key, value)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\u{0c}'
}

/// Split on `\n`, `\r` and `\r\n`.
fn natural_lines(content: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = content;
    while !rest.is_empty() {
        match rest.find(['\r', '\n']) {
            Some(pos) => {
                lines.push(rest.get(..pos).unwrap_or_default());
                let skip = if rest.get(pos..pos.saturating_add(2)) == Some("\r\n") {
                    2
                } else {
                    1
                };
                rest = rest.get(pos.saturating_add(skip)..).unwrap_or_default();
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

/// A line continues when it ends in an odd number of backslashes.
fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

/// Split a logical line into its raw (still escaped) key and value.
fn split_logical_line(line: &str) -> (&str, &str) {
    let mut key_end = line.len();
    let mut value_start = line.len();
    let mut has_separator = false;
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' {
            key_end = i;
            value_start = i.saturating_add(1);
            has_separator = true;
            break;
        } else if is_blank(c) {
            key_end = i;
            value_start = i.saturating_add(c.len_utf8());
            break;
        }
    }

    let rest = line.get(value_start..).unwrap_or_default();
    let mut offset = rest.len();
    for (i, c) in rest.char_indices() {
        if is_blank(c) {
            continue;
        }
        if !has_separator && (c == '=' || c == ':') {
            has_separator = true;
            continue;
        }
        offset = i;
        break;
    }

    let key = line.get(..key_end).unwrap_or_default();
    let value = rest.get(offset..).unwrap_or_default();
    (key, value)
}

/// Resolve escapes. Returns `None` on a malformed `\uXXXX` sequence.
fn unescape(raw: &str) -> Option<String> {
    if !raw.contains('\\') {
        return Some(raw.to_owned());
    }

    let mut units: Vec<u16> = Vec::with_capacity(raw.len());
    let mut chars = raw.chars();
    let mut buf = [0u16; 2];

    while let Some(c) = chars.next() {
        let resolved = if c == '\\' {
            match chars.next() {
                Some('u') => {
                    let mut code: u16 = 0;
                    for _ in 0..4 {
                        let digit = chars.next()?.to_digit(16)?;
                        code = code.checked_mul(16)?.checked_add(u16::try_from(digit).ok()?)?;
                    }
                    units.push(code);
                    continue;
                }
                Some('t') => '\t',
                Some('n') => '\n',
                Some('r') => '\r',
                Some('f') => '\u{0c}',
                Some(other) => other,
                None => break,
            }
        } else {
            c
        };
        units.extend_from_slice(resolved.encode_utf16(&mut buf));
    }

    Some(String::from_utf16_lossy(&units))
}

#[derive(Debug, thiserror::Error)]
pub enum PropertiesError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed \\uXXXX escape in {path} at line {line}")]
    MalformedEscape { path: String, line: usize },
}
