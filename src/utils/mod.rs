pub mod ip;
pub mod password;
pub mod slug;
pub mod tags;
pub mod url_validator;

use serde::{Deserialize, Deserializer};

/// 小写 base36 字符集（查询路径会被小写化，生成的 slug 不能含大写）
const CODE_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// serde 辅助：区分 "字段缺失"（None）与 "显式 null"（Some(None)）
///
/// 需配合 `#[serde(default)]` 使用。
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn generate_random_code(length: usize) -> String {
    use std::iter;

    iter::repeat_with(|| CODE_CHARSET[rand::random_range(0..CODE_CHARSET.len())] as char)
        .take(length)
        .collect()
}
