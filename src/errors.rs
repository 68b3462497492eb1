use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum TrelayError {
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    /// 字段级校验失败（URL、slug、密码策略等）
    Validation {
        field: String,
        message: String,
    },
    BadRequest(String),
    NotFound(String),
    /// (slug, domain) 已被占用
    SlugConflict(String),
    /// 随机 slug 在重试上限内全部冲突
    AllocationExhausted(String),
    Expired(String),
    PasswordRequired(String),
    PasswordInvalid(String),
    Unauthorized(String),
    Serialization(String),
    FileOperation(String),
    Internal(String),
}

impl TrelayError {
    /// 对外错误码（写入响应 envelope 的 `error.code`）
    pub fn code(&self) -> &'static str {
        match self {
            TrelayError::Validation { .. } => "validation_error",
            TrelayError::BadRequest(_) => "bad_request",
            TrelayError::NotFound(_) => "not_found",
            TrelayError::SlugConflict(_) => "slug_taken",
            TrelayError::AllocationExhausted(_) => "allocation_exhausted",
            TrelayError::Expired(_) => "link_expired",
            TrelayError::PasswordRequired(_) => "password_required",
            TrelayError::PasswordInvalid(_) => "password_incorrect",
            TrelayError::Unauthorized(_) => "unauthorized",
            TrelayError::DatabaseConfig(_)
            | TrelayError::DatabaseConnection(_)
            | TrelayError::DatabaseOperation(_)
            | TrelayError::Serialization(_)
            | TrelayError::FileOperation(_)
            | TrelayError::Internal(_) => "internal_error",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            TrelayError::DatabaseConfig(_) => "Database Configuration Error",
            TrelayError::DatabaseConnection(_) => "Database Connection Error",
            TrelayError::DatabaseOperation(_) => "Database Operation Error",
            TrelayError::Validation { .. } => "Validation Error",
            TrelayError::BadRequest(_) => "Bad Request",
            TrelayError::NotFound(_) => "Resource Not Found",
            TrelayError::SlugConflict(_) => "Slug Conflict",
            TrelayError::AllocationExhausted(_) => "Slug Allocation Exhausted",
            TrelayError::Expired(_) => "Link Expired",
            TrelayError::PasswordRequired(_) => "Password Required",
            TrelayError::PasswordInvalid(_) => "Password Invalid",
            TrelayError::Unauthorized(_) => "Unauthorized",
            TrelayError::Serialization(_) => "Serialization Error",
            TrelayError::FileOperation(_) => "File Operation Error",
            TrelayError::Internal(_) => "Internal Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            TrelayError::Validation { message, .. } => message,
            TrelayError::DatabaseConfig(msg)
            | TrelayError::DatabaseConnection(msg)
            | TrelayError::DatabaseOperation(msg)
            | TrelayError::BadRequest(msg)
            | TrelayError::NotFound(msg)
            | TrelayError::SlugConflict(msg)
            | TrelayError::AllocationExhausted(msg)
            | TrelayError::Expired(msg)
            | TrelayError::PasswordRequired(msg)
            | TrelayError::PasswordInvalid(msg)
            | TrelayError::Unauthorized(msg)
            | TrelayError::Serialization(msg)
            | TrelayError::FileOperation(msg)
            | TrelayError::Internal(msg) => msg,
        }
    }

    /// 校验失败时对应的字段名
    pub fn field(&self) -> Option<&str> {
        match self {
            TrelayError::Validation { field, .. } => Some(field),
            _ => None,
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            TrelayError::Validation { .. } | TrelayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            TrelayError::NotFound(_) => StatusCode::NOT_FOUND,
            TrelayError::SlugConflict(_) => StatusCode::CONFLICT,
            TrelayError::AllocationExhausted(_) => StatusCode::SERVICE_UNAVAILABLE,
            TrelayError::Expired(_) => StatusCode::GONE,
            TrelayError::PasswordRequired(_)
            | TrelayError::PasswordInvalid(_)
            | TrelayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 内部错误不向客户端暴露细节
    pub fn is_internal(&self) -> bool {
        self.http_status() == StatusCode::INTERNAL_SERVER_ERROR
    }

    /// 格式化为彩色输出（启动失败时打印）
    pub fn format_colored(&self) -> String {
        use colored::Colorize;
        format!(
            "{} {} {}\n  {}",
            "[ERROR]".red().bold(),
            self.code().yellow(),
            self.error_type().red(),
            self.message().white()
        )
    }

    pub fn format_simple(&self) -> String {
        match self.field() {
            Some(field) => format!("{} ({}): {}", self.error_type(), field, self.message()),
            None => format!("{}: {}", self.error_type(), self.message()),
        }
    }
}

impl fmt::Display for TrelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for TrelayError {}

// 便捷的构造函数
impl TrelayError {
    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        TrelayError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        TrelayError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        TrelayError::DatabaseOperation(msg.into())
    }

    pub fn validation<F: Into<String>, T: Into<String>>(field: F, msg: T) -> Self {
        TrelayError::Validation {
            field: field.into(),
            message: msg.into(),
        }
    }

    pub fn bad_request<T: Into<String>>(msg: T) -> Self {
        TrelayError::BadRequest(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        TrelayError::NotFound(msg.into())
    }

    pub fn slug_conflict<T: Into<String>>(msg: T) -> Self {
        TrelayError::SlugConflict(msg.into())
    }

    pub fn allocation_exhausted<T: Into<String>>(msg: T) -> Self {
        TrelayError::AllocationExhausted(msg.into())
    }

    pub fn expired<T: Into<String>>(msg: T) -> Self {
        TrelayError::Expired(msg.into())
    }

    pub fn password_required<T: Into<String>>(msg: T) -> Self {
        TrelayError::PasswordRequired(msg.into())
    }

    pub fn password_invalid<T: Into<String>>(msg: T) -> Self {
        TrelayError::PasswordInvalid(msg.into())
    }

    pub fn unauthorized<T: Into<String>>(msg: T) -> Self {
        TrelayError::Unauthorized(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        TrelayError::Serialization(msg.into())
    }

    pub fn internal<T: Into<String>>(msg: T) -> Self {
        TrelayError::Internal(msg.into())
    }
}

// 为常见的错误类型实现 From trait
impl From<sea_orm::DbErr> for TrelayError {
    fn from(err: sea_orm::DbErr) -> Self {
        TrelayError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for TrelayError {
    fn from(err: std::io::Error) -> Self {
        TrelayError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for TrelayError {
    fn from(err: serde_json::Error) -> Self {
        TrelayError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TrelayError>;
