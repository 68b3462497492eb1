//! URL 规范化与验证
//!
//! 补全缺失的协议、阻止危险协议与指向本站/本机的目标

use url::Url;

use crate::errors::TrelayError;

pub const MAX_URL_LENGTH: usize = 2048;

/// URL 验证错误
#[derive(Debug, PartialEq, Eq)]
pub enum UrlValidationError {
    EmptyUrl,
    TooLong,
    InvalidProtocol(String),
    DangerousProtocol(String),
    InvalidFormat(String),
    BlockedHost(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::TooLong => write!(f, "URL must be at most {} characters", MAX_URL_LENGTH),
            Self::InvalidProtocol(proto) => write!(
                f,
                "Invalid protocol: {}. Only http:// and https:// are allowed",
                proto
            ),
            Self::DangerousProtocol(proto) => write!(f, "Dangerous protocol blocked: {}", proto),
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
            Self::BlockedHost(host) => write!(f, "Redirects to {} are not allowed", host),
        }
    }
}

impl std::error::Error for UrlValidationError {}

impl From<UrlValidationError> for TrelayError {
    fn from(err: UrlValidationError) -> Self {
        TrelayError::validation("url", err.to_string())
    }
}

/// 危险协议列表
const DANGEROUS_PROTOCOLS: &[&str] = &[
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "about:",
    "blob:",
];

const BLOCKED_HOSTS: &[&str] = &["localhost", "127.0.0.1", "[::1]", "0.0.0.0"];

/// 规范化并验证跳转目标
///
/// 1. trim，拒绝空串与超长
/// 2. 拒绝危险协议；无协议时补 `https://`
/// 3. 仅允许 http/https，且必须有主机名
/// 4. 拒绝本机地址与 `self_domains`
/// 5. 输出 `Url` 序列化结果（空路径补 `/`）
pub fn normalize_url(raw: &str, self_domains: &[String]) -> Result<String, UrlValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }
    if trimmed.len() > MAX_URL_LENGTH {
        return Err(UrlValidationError::TooLong);
    }

    let lower = trimmed.to_lowercase();
    if let Some(proto) = DANGEROUS_PROTOCOLS.iter().find(|p| lower.starts_with(*p)) {
        return Err(UrlValidationError::DangerousProtocol(proto.to_string()));
    }

    let candidate = if lower.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let parsed =
        Url::parse(&candidate).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(UrlValidationError::InvalidProtocol(format!("{}:", other))),
    }

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| UrlValidationError::InvalidFormat("missing host".to_string()))?
        .to_lowercase();

    if BLOCKED_HOSTS.contains(&host.as_str())
        || self_domains.iter().any(|d| d.eq_ignore_ascii_case(&host))
    {
        return Err(UrlValidationError::BlockedHost(host));
    }

    let normalized = parsed.to_string();
    if normalized.len() > MAX_URL_LENGTH {
        return Err(UrlValidationError::TooLong);
    }
    Ok(normalized)
}

/// 规范化可选的域名作用域；空串等同默认域名
pub fn normalize_domain(domain: Option<&str>) -> String {
    domain
        .map(|d| d.trim().trim_end_matches('.').to_lowercase())
        .unwrap_or_default()
}
