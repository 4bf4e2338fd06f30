// ==========================================
// 成衣排产系统 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    #[error("唯一约束违反: {0}")]
    UniqueConstraintViolation(String),

    #[error("外键约束违反: {0}")]
    ForeignKeyViolation(String),

    // ===== 数据质量错误 =====
    #[error("字段值错误 (field={field}): {message}")]
    FieldValueError { field: String, message: String },

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;

        match err {
            rusqlite::Error::SqliteFailure(ref e, ref msg) => {
                let msg = msg.clone().unwrap_or_else(|| e.to_string());
                match e.code {
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => {
                        RepositoryError::LockError(msg)
                    }
                    ErrorCode::CannotOpen | ErrorCode::NotADatabase => {
                        RepositoryError::DatabaseConnectionError(msg)
                    }
                    ErrorCode::ConstraintViolation if msg.contains("UNIQUE") => {
                        RepositoryError::UniqueConstraintViolation(msg)
                    }
                    ErrorCode::ConstraintViolation if msg.contains("FOREIGN KEY") => {
                        RepositoryError::ForeignKeyViolation(msg)
                    }
                    // production_line.capacity > 0 等 CHECK 约束
                    ErrorCode::ConstraintViolation if msg.contains("CHECK") => {
                        RepositoryError::FieldValueError {
                            field: check_constraint_field(&msg),
                            message: msg,
                        }
                    }
                    _ => RepositoryError::DatabaseQueryError(msg),
                }
            }
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            rusqlite::Error::FromSqlConversionFailure(idx, _, ref cause) => {
                RepositoryError::FieldValueError {
                    field: format!("column#{}", idx),
                    message: cause.to_string(),
                }
            }
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

/// 从 "CHECK constraint failed: capacity > 0" 中取出字段名
fn check_constraint_field(msg: &str) -> String {
    msg.rsplit(':')
        .next()
        .and_then(|expr| expr.split_whitespace().next())
        .unwrap_or("unknown")
        .to_string()
}

impl RepositoryError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        RepositoryError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        RepositoryError::FieldValueError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;

// ==========================================
// 行映射辅助
// ==========================================

/// 解析日期列; 格式错误转换为 rusqlite 转换错误, 不回退默认值
pub(crate) fn parse_date(idx: usize, raw: &str) -> rusqlite::Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(raw, crate::db::DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_opt_date(
    idx: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<chrono::NaiveDate>> {
    raw.map(|s| parse_date(idx, &s)).transpose()
}

pub(crate) fn format_date(date: chrono::NaiveDate) -> String {
    date.format(crate::db::DATE_FORMAT).to_string()
}
