use std::collections::HashMap;
use std::sync::Arc;

use strum::IntoEnumIterator;

/// Field of a Server-Sent-Events line.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum SseField {
    Id,
    Event,
    Data,
    Retry,
    Error,
    /// A line that carried no recognized field.
    #[default]
    Unset,
}

/// A single recognized `(field, value)` pair from an SSE fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseLine {
    pub field: SseField,
    pub value: String,
}

/// Predicate deciding whether a value signals stream completion.
pub type DonePredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Sentinel values the default done predicate looks for.
const DONE_SENTINELS: [&str; 2] = ["[DONE]", "END_OF_STREAM"];

/// Splits raw Server-Sent-Events text into recognized `(field, value)` pairs.
///
/// The field-name map and the separator are configurable; lines that match no
/// known field are dropped silently. Whether a value terminates the stream is
/// decided by the done predicate, exposed through [`SseParser::is_done`].
/// The parser itself never interprets Data values; callers (the stream
/// handler) apply the predicate to each Data value they receive.
#[derive(Clone)]
pub struct SseParser {
    separator: char,
    fields: HashMap<String, SseField>,
    done: DonePredicate,
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SseParser {
    pub fn new() -> Self {
        let mut fields = HashMap::new();
        for field in SseField::iter() {
            if field != SseField::Unset {
                fields.insert(field.to_string(), field);
            }
        }
        Self {
            separator: ':',
            fields,
            done: Arc::new(|value| DONE_SENTINELS.iter().any(|s| value.contains(s))),
        }
    }

    /// Override the field-name separator (default `:`).
    #[must_use]
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Register an extra field name, or remap an existing one.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, field: SseField) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Replace the done predicate (default: substring match on `[DONE]` or
    /// `END_OF_STREAM`).
    #[must_use]
    pub fn with_done_predicate(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.done = Arc::new(predicate);
        self
    }

    /// Whether the given text matches the done predicate.
    #[must_use]
    pub fn is_done(&self, text: &str) -> bool {
        (self.done)(text)
    }

    /// Split a raw text fragment into recognized field/value pairs.
    ///
    /// Handles both `\n` and `\r\n` line endings. Lines without a known field
    /// name (including `:` comment lines) are dropped without affecting the
    /// lines around them.
    #[must_use]
    pub fn parse(&self, fragment: &str) -> Vec<SseLine> {
        fragment
            .lines()
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    fn parse_line(&self, line: &str) -> Option<SseLine> {
        let (name, value) = line.split_once(self.separator)?;
        let field = *self.fields.get(name.trim())?;
        Some(SseLine {
            field,
            value: value.trim_start().trim_end_matches('\r').to_string(),
        })
    }
}

impl std::fmt::Debug for SseParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SseParser")
            .field("separator", &self.separator)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
