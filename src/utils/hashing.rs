use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

static COMMENTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)/\*[\s\S]*?\*/|//.*$").expect("comment pattern is valid")
});
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Hex-encoded SHA256 of arbitrary bytes
pub fn sha256_hex(data: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    format!("{:x}", hasher.finalize())
}

/// Strip comments and collapse whitespace so formatting-only edits hash the same
pub fn normalize_code(code: &str) -> String {
    let without_comments = COMMENTS.replace_all(code, "");
    WHITESPACE
        .replace_all(&without_comments, " ")
        .trim()
        .to_string()
}

/// Fingerprint of a code snippet, insensitive to comments and whitespace
pub fn code_fingerprint(code: &str) -> String {
    sha256_hex(normalize_code(code))
}
