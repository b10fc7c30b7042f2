//! Defensive parsing of generator output.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Brackets, quotes and trailing periods models tend to echo from the template.
static WRAPPING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^[\s\[\]"'`“”‘’]+|[\s\[\]"'`“”‘’.。]+$"#).expect("valid wrapping regex")
});

/// Emoji and label proposed by the generator, trimmed but not yet normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedElement {
    pub emoji: String,
    pub text: String,
}

/// Reasons generator output is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    EmptyResponse,
    MissingSeparator(String),
    EmptyEmoji,
    EmptyText,
    TextTooLong { chars: usize, max_chars: usize },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyResponse => write!(f, "generator response is empty"),
            Self::MissingSeparator(raw) => {
                write!(f, "generator response has no `,` separator: `{raw}`")
            }
            Self::EmptyEmoji => write!(f, "generator response has an empty emoji"),
            Self::EmptyText => write!(f, "generator response has an empty label"),
            Self::TextTooLong { chars, max_chars } => write!(
                f,
                "generator label has {chars} characters, limit is {max_chars}"
            ),
        }
    }
}

impl Error for ParseError {}

/// Splits `raw` on its first comma into emoji and label.
///
/// Only the first non-blank line is considered.
pub fn parse_generation(raw: &str, max_text_chars: usize) -> Result<GeneratedElement, ParseError> {
    let line = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or(ParseError::EmptyResponse)?;

    let (emoji, text) = line
        .split_once(',')
        .ok_or_else(|| ParseError::MissingSeparator(line.to_string()))?;

    let emoji = strip_wrapping(emoji);
    if emoji.is_empty() {
        return Err(ParseError::EmptyEmoji);
    }

    let text = strip_wrapping(text);
    if text.is_empty() {
        return Err(ParseError::EmptyText);
    }

    let chars = text.chars().count();
    if chars > max_text_chars {
        return Err(ParseError::TextTooLong {
            chars,
            max_chars: max_text_chars,
        });
    }

    Ok(GeneratedElement { emoji, text })
}

fn strip_wrapping(value: &str) -> String {
    WRAPPING_RE.replace_all(value, "").into_owned()
}
