//! 短码规则
//!
//! 用户提供的 slug 先 trim + 小写，再校验长度、字符集与保留字。

use crate::errors::{Result, TrelayError};

pub const MIN_SLUG_LENGTH: usize = 4;
pub const MAX_SLUG_LENGTH: usize = 32;

/// 与路由或系统路径冲突的保留字
pub const RESERVED_SLUGS: &[&str] = &[
    "api", "admin", "login", "logout", "register", "health", "healthz", "readyz", "metrics",
    "static", "assets", "favicon",
];

pub fn normalize_slug(slug: &str) -> String {
    slug.trim().to_lowercase()
}

/// 校验已规范化的 slug：首尾为字母数字，中间允许 `-` 和 `_`
pub fn validate_slug(slug: &str) -> Result<()> {
    let len = slug.chars().count();
    if !(MIN_SLUG_LENGTH..=MAX_SLUG_LENGTH).contains(&len) {
        return Err(TrelayError::validation(
            "slug",
            format!(
                "slug must be between {} and {} characters",
                MIN_SLUG_LENGTH, MAX_SLUG_LENGTH
            ),
        ));
    }

    let is_edge = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    let is_inner = |c: char| is_edge(c) || c == '-' || c == '_';

    let first_last_ok = slug.chars().next().is_some_and(is_edge)
        && slug.chars().next_back().is_some_and(is_edge);
    if !first_last_ok || !slug.chars().all(is_inner) {
        return Err(TrelayError::validation(
            "slug",
            "slug may only contain letters, digits, '-' and '_', and must start and end with a letter or digit",
        ));
    }

    if RESERVED_SLUGS.contains(&slug) {
        return Err(TrelayError::validation("slug", format!("'{}' is reserved", slug)));
    }

    Ok(())
}

/// 规范化后校验，返回可直接入库的 slug
pub fn prepare_slug(raw: &str) -> Result<String> {
    let slug = normalize_slug(raw);
    validate_slug(&slug)?;
    Ok(slug)
}

/// 解析路径中的 slug；语法不合法时视为不存在
pub fn parse_lookup_slug(raw: &str) -> Option<String> {
    let slug = normalize_slug(raw);
    validate_slug(&slug).ok().map(|_| slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_slug_normalizes() {
        assert_eq!(prepare_slug("  MyLink ").unwrap(), "mylink");
        assert_eq!(prepare_slug("a_b-c1").unwrap(), "a_b-c1");
    }

    #[test]
    fn test_length_bounds() {
        assert!(prepare_slug("abc").is_err());
        assert!(prepare_slug("abcd").is_ok());
        assert!(prepare_slug(&"a".repeat(32)).is_ok());
        assert!(prepare_slug(&"a".repeat(33)).is_err());
    }

    #[test]
    fn test_charset_and_edges() {
        assert!(prepare_slug("-abcd").is_err());
        assert!(prepare_slug("abcd_").is_err());
        assert!(prepare_slug("ab cd").is_err());
        assert!(prepare_slug("ab/cd").is_err());
        assert!(prepare_slug("ab.cd").is_err());
    }

    #[test]
    fn test_reserved_words() {
        let err = prepare_slug("Admin").unwrap_err();
        assert_eq!(err.field(), Some("slug"));
        assert!(prepare_slug("healthz").is_err());
    }

    #[test]
    fn test_parse_lookup_slug() {
        assert_eq!(parse_lookup_slug("AbCd"), Some("abcd".to_string()));
        assert_eq!(parse_lookup_slug("a"), None);
    }
}
