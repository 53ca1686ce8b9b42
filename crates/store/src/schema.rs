//! 数据目录与表结构管理
//!
//! 数据目录下有两个文件：
//! - `schema`：纯文本的结构版本号
//! - `data.db`：SQLite 数据库
//!
//! 版本号不一致或缺失时整库重建，旧数据全部丢弃。challenge 与 token
//! 都是短期数据，重建的代价只是让在途客户端重新做一次 PoW。

use crate::error::{StoreError, StoreResult};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// 当前结构版本
pub const SCHEMA_VERSION: u32 = 2;
/// 数据库文件名
pub const DB_FILE: &str = "data.db";
/// 版本标记文件名
pub const SCHEMA_FILE: &str = "schema";

const CHALLENGES_TABLE: &str = r#"
CREATE TABLE challenges (
    nonce TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    difficulty INTEGER NOT NULL,
    epoch INTEGER NOT NULL,
    CONSTRAINT PK PRIMARY KEY (nonce)
)"#;

const TOKENS_TABLE: &str = r#"
CREATE TABLE tokens (
    token TEXT NOT NULL,
    fingerprint TEXT NOT NULL,
    epoch INTEGER NOT NULL,
    CONSTRAINT PK PRIMARY KEY (token)
)"#;

/// 磁盘上已有数据的状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaState {
    /// 没有数据库文件
    Absent,
    /// 版本匹配，可直接打开
    Current,
    /// 有数据库但没有版本标记
    MarkerMissing,
    /// 版本标记无法解析
    MarkerInvalid(String),
    /// 版本不一致
    Outdated(u32),
}

impl SchemaState {
    pub fn is_current(&self) -> bool {
        matches!(self, SchemaState::Current)
    }

    fn describe(&self) -> String {
        match self {
            SchemaState::Absent => "Database not present, creating one".to_string(),
            SchemaState::Current => "Database schema is current".to_string(),
            SchemaState::MarkerMissing => {
                "Database schema marker not present, recreating db".to_string()
            }
            SchemaState::MarkerInvalid(raw) => {
                format!("Database schema marker unreadable ({raw:?}), recreating db")
            }
            SchemaState::Outdated(found) => format!(
                "Database outdated (schema {found}, expected {SCHEMA_VERSION}), recreating db"
            ),
        }
    }
}

pub fn db_path(dir: &Path) -> PathBuf {
    dir.join(DB_FILE)
}

pub fn marker_path(dir: &Path) -> PathBuf {
    dir.join(SCHEMA_FILE)
}

/// 检查数据目录中已有数据的状态
pub async fn inspect(dir: &Path) -> StoreResult<SchemaState> {
    if !tokio::fs::try_exists(db_path(dir)).await? {
        return Ok(SchemaState::Absent);
    }

    let raw = match tokio::fs::read_to_string(marker_path(dir)).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(SchemaState::MarkerMissing),
        Err(e) => return Ok(SchemaState::MarkerInvalid(e.to_string())),
    };

    Ok(match raw.trim().parse::<u32>() {
        Ok(SCHEMA_VERSION) => SchemaState::Current,
        Ok(found) => SchemaState::Outdated(found),
        Err(_) => SchemaState::MarkerInvalid(raw.trim().to_string()),
    })
}

/// 打开数据目录，必要时重建。返回连接池以及是否沿用了旧库。
pub(crate) async fn bootstrap(dir: &Path) -> StoreResult<(SqlitePool, bool)> {
    let state = inspect(dir).await?;
    if state.is_current() {
        debug!("Opening existing database at {}", db_path(dir).display());
        let pool = connect(&db_path(dir)).await?;
        if has_tables(&pool).await {
            return Ok((pool, true));
        }
        pool.close().await;
        info!("Database schema marker is current but tables are missing, recreating db");
    } else {
        info!("{}", state.describe());
    }

    let pool = recreate(dir).await?;
    Ok((pool, false))
}

/// 两张表是否都存在；查询失败按不存在处理
async fn has_tables(pool: &SqlitePool) -> bool {
    let found = sqlx::query_as::<_, (i64,)>(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('challenges', 'tokens')",
    )
    .fetch_one(pool)
    .await;

    match found {
        Ok((count,)) => count == 2,
        Err(e) => {
            warn!("Failed to inspect existing tables: {e}");
            false
        }
    }
}

/// 删除旧库，新建表并写入版本标记
async fn recreate(dir: &Path) -> StoreResult<SqlitePool> {
    let db_file = db_path(dir);
    for suffix in ["", "-wal", "-shm"] {
        let path = PathBuf::from(format!("{}{suffix}", db_file.display()));
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Removed stale {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }

    let pool = connect(&db_file).await?;

    for ddl in [CHALLENGES_TABLE, TOKENS_TABLE] {
        sqlx::query(ddl)
            .execute(&pool)
            .await
            .map_err(|e| StoreError::Schema {
                reason: format!("Failed to create table: {e}"),
            })?;
    }

    // 表建好后再写标记，避免半初始化的库被当作当前版本
    tokio::fs::write(marker_path(dir), SCHEMA_VERSION.to_string()).await?;

    info!(
        "Database created: path={}, schema={}",
        db_file.display(),
        SCHEMA_VERSION
    );
    Ok(pool)
}

async fn connect(db_file: &Path) -> StoreResult<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(db_file)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await
        .map_err(|e| StoreError::Schema {
            reason: format!("Failed to open SQLite database {}: {e}", db_file.display()),
        })
}
