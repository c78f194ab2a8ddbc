//! Partition and row key sanitization.
//!
//! The table service rejects keys containing `\`, `#`, `%`, `+`, `/`, `?`
//! or control characters. [`DefaultSanitizer`] deletes those characters.
//! Deletion is lossy: `"a#b"` and `"ab"` sanitize to the same key, so two
//! distinct inputs can collide on the same stored entity. Callers that
//! need distinct keys must guarantee it before sanitizing.

use tablekit_types::{Error, Result};

/// Characters the service never accepts in a key, besides control characters.
pub const FORBIDDEN_KEY_CHARS: [char; 6] = ['\\', '#', '%', '+', '/', '?'];

/// Returns true if `c` may not appear in a partition or row key.
#[must_use]
pub fn is_forbidden_key_char(c: char) -> bool {
    FORBIDDEN_KEY_CHARS.contains(&c) || matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}')
}

/// Returns true if `key` contains at least one forbidden character.
#[must_use]
pub fn contains_forbidden_key_chars(key: &str) -> bool {
    key.chars().any(is_forbidden_key_char)
}

/// Policy used to turn an arbitrary string into a storable key.
///
/// Implementations must be idempotent: sanitizing an already sanitized key
/// returns it unchanged.
pub trait SanitizationStrategy: Send + Sync {
    fn sanitize(&self, input: &str) -> String;
}

impl<F> SanitizationStrategy for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn sanitize(&self, input: &str) -> String {
        self(input)
    }
}

/// Deletes every forbidden character.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSanitizer;

impl SanitizationStrategy for DefaultSanitizer {
    fn sanitize(&self, input: &str) -> String {
        input.chars().filter(|c| !is_forbidden_key_char(*c)).collect()
    }
}

/// Replaces every input with the same constant key.
#[derive(Debug, Clone)]
pub struct FixedValueSanitizer {
    value: String,
}

impl FixedValueSanitizer {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }
}

impl SanitizationStrategy for FixedValueSanitizer {
    fn sanitize(&self, _input: &str) -> String {
        self.value.clone()
    }
}

/// Sanitizes a key that may be absent.
///
/// Returns [`Error::InvalidArgument`] when `input` is `None`.
pub fn sanitize_key(input: Option<&str>, strategy: &dyn SanitizationStrategy) -> Result<String> {
    let input =
        input.ok_or_else(|| Error::InvalidArgument("key to sanitize must be present".into()))?;
    Ok(strategy.sanitize(input))
}
