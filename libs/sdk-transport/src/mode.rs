use regex::{Regex, RegexBuilder};

/// Matches a UTF-8 charset attribute
pub const MATCH_CHARSET_UTF8: &str = r";.*charset=.*\butf-8\b";

/// Media types decoded as text
pub const MATCH_MODE_STRING: &str = concat!(
    r"(^application/.*(\bjson\b|\bxml\b|\bsql\b|\bgraphql\b|\bjavascript\b|\bx-www-form-urlencoded\b)",
    r"|^text/|.*\+xml\b|;.*charset=)"
);

/// Media types returned as raw bytes
pub const MATCH_MODE_BINARY: &str = r"^image/|^audio/|^video/|^font/|^application/|^multipart/";

/// How a response body should be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    Binary,
    String,
    Unknown,
}

/// Case-insensitive content-type patterns used for classification.
///
/// Built once and passed to transports so the patterns can be replaced
/// without touching the classification logic.
#[derive(Debug, Clone)]
pub struct ContentTypePatterns {
    string: Regex,
    binary: Regex,
    utf8: Regex,
}

impl ContentTypePatterns {
    /// Compile custom patterns
    ///
    /// # Errors
    /// Returns `regex::Error` if any pattern fails to compile.
    pub fn new(string: &str, binary: &str, utf8: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            string: compile(string)?,
            binary: compile(binary)?,
            utf8: compile(utf8)?,
        })
    }

    /// Classify a content type. The string pattern takes precedence over the binary one.
    pub fn response_mode(&self, content_type: &str) -> ResponseMode {
        if self.string.is_match(content_type) {
            ResponseMode::String
        } else if self.binary.is_match(content_type) {
            ResponseMode::Binary
        } else {
            ResponseMode::Unknown
        }
    }

    /// True when the content type declares a UTF-8 charset
    pub fn is_utf8(&self, content_type: &str) -> bool {
        self.utf8.is_match(content_type)
    }
}

impl Default for ContentTypePatterns {
    #[allow(clippy::expect_used)]
    fn default() -> Self {
        // Compile-time constants, covered by tests.
        Self::new(MATCH_MODE_STRING, MATCH_MODE_BINARY, MATCH_CHARSET_UTF8)
            .expect("default content-type patterns are valid")
    }
}

fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}
