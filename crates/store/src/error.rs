//! Store 错误定义

use thiserror::Error;

/// Store 错误类型
///
/// 仅 `Store::open` 会把错误交给调用方；仓库操作的普通形式会记录日志后吞掉错误，
/// `try_*` 形式则原样返回，便于调用方区分"无效输入 / 不存在 / 引擎故障"。
#[derive(Error, Debug)]
pub enum StoreError {
    /// 标识符不是小写十六进制
    #[error("Invalid input: {field} is not lowercase hex")]
    InvalidInput { field: &'static str },

    /// 主键冲突
    #[error("Duplicate key in {table}: {key}")]
    Duplicate { table: &'static str, key: String },

    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// 存储的数值列无法还原为条目字段
    #[error("Corrupt row in {table} for {key}: {reason}")]
    CorruptRow {
        table: &'static str,
        key: String,
        reason: String,
    },

    /// 文件系统错误
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 结构初始化失败
    #[error("Schema error: {reason}")]
    Schema { reason: String },
}

impl StoreError {
    /// sqlx 的唯一约束错误转换为 `Duplicate`，其它错误保持原样
    pub(crate) fn from_insert(err: sqlx::Error, table: &'static str, key: &str) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate {
                table,
                key: key.to_string(),
            },
            _ => StoreError::Database(err),
        }
    }
}

/// Store 结果类型别名
pub type StoreResult<T> = Result<T, StoreError>;
