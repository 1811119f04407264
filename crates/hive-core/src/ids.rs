//! ID generation for articles, replies, and reports.
//!
//! Uses short, human-readable slugs: ar-xxxxxx, re-xxxxxx, rp-xxxxxx.
//! Review documents are keyed by the authoring user's id instead, so
//! they need no generated slug.

/// Prefix for article IDs
const ARTICLE_PREFIX: &str = "ar";
/// Prefix for reply IDs
const REPLY_PREFIX: &str = "re";
/// Prefix for report IDs
const REPORT_PREFIX: &str = "rp";

/// Length of the random suffix (in base36 chars)
const SUFFIX_LEN: usize = 6;

/// Generate a base36 suffix from OS randomness.
fn base36_suffix(len: usize) -> String {
    let mut bytes = [0u8; 8];
    getrandom::fill(&mut bytes).expect("OS random source unavailable");

    let mut n = u64::from_le_bytes(bytes);
    let mut result = String::new();
    const CHARS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    while result.len() < len {
        result.push(CHARS[(n % 36) as usize] as char);
        n /= 36;
    }

    result
}

/// Generate a new article ID (e.g., "ar-1d3f0a")
pub fn new_article_id() -> String {
    format!("{}-{}", ARTICLE_PREFIX, base36_suffix(SUFFIX_LEN))
}

/// Generate a new reply ID (e.g., "re-99az4k")
pub fn new_reply_id() -> String {
    format!("{}-{}", REPLY_PREFIX, base36_suffix(SUFFIX_LEN))
}

/// Generate a new report ID (e.g., "rp-ab12cd")
pub fn new_report_id() -> String {
    format!("{}-{}", REPORT_PREFIX, base36_suffix(SUFFIX_LEN))
}

/// Check if a string looks like a valid article ID
pub fn is_article_id(s: &str) -> bool {
    s.starts_with("ar-") && s.len() == 3 + SUFFIX_LEN
}

/// Check if a string looks like a valid reply ID
pub fn is_reply_id(s: &str) -> bool {
    s.starts_with("re-") && s.len() == 3 + SUFFIX_LEN
}

/// Check if a string looks like a valid report ID
pub fn is_report_id(s: &str) -> bool {
    s.starts_with("rp-") && s.len() == 3 + SUFFIX_LEN
}
