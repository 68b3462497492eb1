//! 标签规范化

use crate::errors::{Result, TrelayError};

pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_LENGTH: usize = 50;

/// trim + 小写，丢弃空标签，去重并排序
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>> {
    let mut normalized: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    normalized.sort();
    normalized.dedup();

    if normalized.len() > MAX_TAGS {
        return Err(TrelayError::validation(
            "tags",
            format!("at most {} tags are allowed", MAX_TAGS),
        ));
    }
    if let Some(tag) = normalized.iter().find(|t| t.chars().count() > MAX_TAG_LENGTH) {
        return Err(TrelayError::validation(
            "tags",
            format!("tag '{}' exceeds {} characters", tag, MAX_TAG_LENGTH),
        ));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags_dedup_and_sort() {
        let tags = vec![
            " Work ".to_string(),
            "docs".to_string(),
            "work".to_string(),
            "".to_string(),
        ];
        assert_eq!(normalize_tags(&tags).unwrap(), vec!["docs", "work"]);
    }

    #[test]
    fn test_normalize_tags_limits() {
        let too_many: Vec<String> = (0..21).map(|i| format!("t{}", i)).collect();
        assert!(normalize_tags(&too_many).is_err());

        let too_long = vec!["x".repeat(51)];
        assert_eq!(normalize_tags(&too_long).unwrap_err().field(), Some("tags"));
    }
}
