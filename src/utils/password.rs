//! 密码哈希工具模块
//!
//! 使用 Argon2id 算法进行密码哈希和验证

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::errors::{Result, TrelayError};

pub const MAX_PASSWORD_LENGTH: usize = 128;

/// 对密码进行 Argon2id 哈希
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| TrelayError::internal(format!("password hash error: {}", e)))
}

/// 验证密码是否匹配哈希；哈希损坏时视为不匹配
pub fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

fn check_policy(password: &str) -> Result<()> {
    if password.chars().count() > MAX_PASSWORD_LENGTH {
        return Err(TrelayError::validation(
            "password",
            format!("password must be at most {} characters", MAX_PASSWORD_LENGTH),
        ));
    }
    Ok(())
}

/// 处理新建链接的密码
///
/// - None 或空字符串：无密码
/// - 否则校验长度后哈希
pub fn process_new_password(password: Option<&str>) -> Result<Option<String>> {
    match password {
        Some(pwd) if !pwd.is_empty() => {
            check_policy(pwd)?;
            hash_password(pwd).map(Some)
        }
        _ => Ok(None),
    }
}

/// 处理更新时的密码
///
/// - `new_password` 为 None：保留原密码
/// - 空字符串：移除密码
/// - 否则校验后哈希
pub fn process_update_password(
    new_password: Option<&str>,
    existing_hash: Option<String>,
) -> Result<Option<String>> {
    match new_password {
        Some(pwd) if !pwd.is_empty() => {
            check_policy(pwd)?;
            hash_password(pwd).map(Some)
        }
        Some(_) => Ok(None),
        None => Ok(existing_hash),
    }
}
