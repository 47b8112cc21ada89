//! Utility functions for confstore
//!
//! Common helper functions used across the codebase.

use std::sync::LazyLock;

use md5::{Digest, Md5};

/// Regex pattern for validating identifiers (dataId, group, etc.)
static VALID_PATTERN: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new("^[a-zA-Z0-9_.:-]*$").expect("Invalid regex pattern"));

/// Wildcard marker accepted in fuzzy search arguments
pub const FUZZY_SEARCH_SIGN: char = '*';

/// Validate a string contains only allowed characters
///
/// Allowed characters: alphanumeric, underscore, dot, colon, hyphen
///
/// # Examples
///
/// ```
/// use confstore_common::is_valid;
///
/// assert!(is_valid("my-config.yaml"));
/// assert!(is_valid("app_name:v1"));
/// assert!(!is_valid("invalid/path"));
/// assert!(!is_valid("with spaces"));
/// ```
pub fn is_valid(str: &str) -> bool {
    VALID_PATTERN.is_match(str)
}

/// True when the string is empty or only whitespace
#[inline]
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Normalize an optional identifier; blank values collapse to "".
#[inline]
pub fn blank_to_empty(s: Option<&str>) -> String {
    match s {
        Some(v) if !is_blank(v) => v.to_string(),
        _ => String::new(),
    }
}

/// Compute the hex MD5 fingerprint of `content`.
///
/// # Examples
///
/// ```
/// use confstore_common::md5_hex;
///
/// assert_eq!(md5_hex("hello world"), "5eb63bbbe01eeed093cb22bb8f5acdc3");
/// ```
pub fn md5_hex(content: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(content.as_bytes());
    const_hex::encode(hasher.finalize())
}

/// Translate a user wildcard pattern into a SQL `LIKE` argument.
///
/// Every `*` becomes `%`. A pattern without `*` is returned unchanged and is
/// meant to be compared for equality by the caller's chosen operator.
///
/// # Examples
///
/// ```
/// use confstore_common::generate_like_argument;
///
/// assert_eq!(generate_like_argument("foo*bar"), "foo%bar");
/// assert_eq!(generate_like_argument("foobar"), "foobar");
/// ```
pub fn generate_like_argument(s: &str) -> String {
    if s.contains(FUZZY_SEARCH_SIGN) {
        s.replace(FUZZY_SEARCH_SIGN, "%")
    } else {
        s.to_string()
    }
}

/// Split a comma separated tag list, trimming entries and dropping blanks.
///
/// Repeated tags are kept once, at their first position.
pub fn split_tags(config_tags: &str) -> Vec<&str> {
    let mut tags: Vec<&str> = Vec::new();
    for tag in config_tags.split(',').map(|e| e.trim()) {
        if !tag.is_empty() && !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_is_valid_alphanumeric() {
        assert!(is_valid("abc123"));
        assert!(is_valid("test_value"));
        assert!(is_valid("test-value"));
        assert!(is_valid("test.value"));
        assert!(is_valid("test:value"));
    }

    #[test]
    fn test_is_valid_invalid_chars() {
        assert!(!is_valid("test value"));
        assert!(!is_valid("test@value"));
        assert!(!is_valid("test/value"));
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(""));
        assert!(is_blank("   "));
        assert!(!is_blank(" a "));
    }

    #[test]
    fn test_blank_to_empty() {
        assert_eq!(blank_to_empty(None), "");
        assert_eq!(blank_to_empty(Some("  ")), "");
        assert_eq!(blank_to_empty(Some("public")), "public");
    }

    #[test]
    fn test_md5_hex() {
        assert_eq!(md5_hex(""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex("hello world"), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn test_generate_like_argument() {
        assert_eq!(generate_like_argument("foo*bar"), "foo%bar");
        assert_eq!(generate_like_argument("*"), "%");
        assert_eq!(generate_like_argument("a**b"), "a%%b");
        assert_eq!(generate_like_argument("foobar"), "foobar");
        assert_eq!(generate_like_argument(""), "");
    }

    #[test]
    fn test_split_tags() {
        assert_eq!(split_tags("a, b,,c "), vec!["a", "b", "c"]);
        assert!(split_tags("").is_empty());
        assert!(split_tags(" , ").is_empty());
    }

    #[test]
    fn test_split_tags_drops_repeats() {
        assert_eq!(split_tags("a,a"), vec!["a"]);
        assert_eq!(split_tags("b, a ,b,c,a"), vec!["b", "a", "c"]);
    }

    proptest! {
        #[test]
        fn prop_like_argument_has_no_wildcard(s in "[a-z*]{0,16}") {
            let out = generate_like_argument(&s);
            prop_assert!(!out.contains('*'));
            prop_assert_eq!(out.len(), s.len());
        }

        #[test]
        fn prop_like_argument_identity_without_wildcard(s in "[a-z0-9._-]{0,16}") {
            prop_assert_eq!(generate_like_argument(&s), s);
        }
    }
}
