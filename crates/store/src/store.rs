//! Store：challenge / token 存储的唯一入口
//!
//! 数据库连接池和清理节流状态都归 `Store` 所有。clone 出来的实例共享同一份状态。

use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::schema;
use crate::sweeper::Sweeper;
use crate::types::{StoreStats, SweepReport};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// challenge / token 存储
#[derive(Clone)]
pub struct Store {
    pub(crate) pool: SqlitePool,
    pub(crate) sweeper: Arc<Sweeper>,
    data_dir: PathBuf,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("data_dir", &self.data_dir)
            .field("sweeps_run", &self.sweeper.sweeps_run())
            .finish()
    }
}

impl Store {
    /// 打开数据目录下的存储
    ///
    /// # Arguments
    /// * `data_dir` - 数据目录，不存在时自动创建
    ///
    /// # Errors
    /// 目录无法创建、数据库无法打开或建表失败时返回错误，调用方不应继续运行
    pub async fn open<P: AsRef<Path>>(data_dir: P) -> StoreResult<Self> {
        Self::open_with_clock(data_dir, Arc::new(SystemClock::new())).await
    }

    /// 按配置打开，`cwd` 用于解析相对路径
    pub async fn from_config(config: &StoreConfig, cwd: &Path) -> StoreResult<Self> {
        Self::open(config.resolve_data_dir(cwd)).await
    }

    /// 使用指定时钟打开
    pub async fn open_with_clock<P: AsRef<Path>>(
        data_dir: P,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self> {
        let dir = data_dir.as_ref();
        if !tokio::fs::try_exists(dir).await? {
            info!("Data dir doesn't exist, creating: {}", dir.display());
            tokio::fs::create_dir_all(dir).await?;
        }
        let data_dir = tokio::fs::canonicalize(dir).await?;

        let (pool, reused) = schema::bootstrap(&data_dir).await?;
        let store = Self {
            pool,
            sweeper: Arc::new(Sweeper::new(clock)),
            data_dir,
        };

        if reused {
            match store.sweeper.sweep(&store.pool).await {
                Ok(report) => debug!("Initial sweep removed {} rows", report.total()),
                Err(e) => error!("Initial expiry sweep failed: {e}"),
            }
        }

        info!("Store ready at {}", store.data_dir.display());
        Ok(store)
    }

    /// 规范化后的数据目录
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// 是否到了自动清理时间
    pub fn should_sweep(&self) -> bool {
        self.sweeper.should_sweep()
    }

    /// 立即清理过期数据，不受节流限制
    pub async fn sweep(&self) -> StoreResult<SweepReport> {
        self.sweeper.sweep(&self.pool).await
    }

    /// 已执行的清理次数（包括打开时的那一次）
    pub fn sweeps_run(&self) -> u64 {
        self.sweeper.sweeps_run()
    }

    /// 读路径上的节流清理，失败只记日志
    pub(crate) async fn sweep_if_due(&self) {
        if let Some(Err(e)) = self.sweeper.sweep_if_due(&self.pool).await {
            error!("Expiry sweep failed: {e}");
        }
    }

    /// 两张表的行数
    pub async fn stats(&self) -> StoreResult<StoreStats> {
        let (challenges,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM challenges")
            .fetch_one(&self.pool)
            .await?;
        let (tokens,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tokens")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            challenges: challenges.max(0) as u64,
            tokens: tokens.max(0) as u64,
        })
    }

    /// 关闭连接池。之后对任何 clone 的操作都会失败。
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// 写操作的兜底：错误只记录，不向调用方暴露
pub(crate) fn absorb_write(op: &str, result: StoreResult<()>) {
    match result {
        Ok(()) => {}
        Err(StoreError::InvalidInput { field }) => {
            debug!("{op} skipped: invalid {field}");
        }
        Err(e @ StoreError::Duplicate { .. }) => {
            warn!("{op} ignored: {e}");
        }
        Err(e) => {
            error!("{op} failed: {e}");
        }
    }
}

/// 读操作的兜底：任何错误都视为不存在
pub(crate) fn absorb_read<T>(op: &str, result: StoreResult<Option<T>>) -> Option<T> {
    match result {
        Ok(found) => found,
        Err(StoreError::InvalidInput { field }) => {
            debug!("{op} skipped: invalid {field}");
            None
        }
        Err(e) => {
            error!("{op} failed: {e}");
            None
        }
    }
}

/// 解码错误归为坏行，其它保持为数据库错误
pub(crate) fn classify_read(err: sqlx::Error, table: &'static str, key: &str) -> StoreError {
    match err {
        sqlx::Error::ColumnDecode { index, source } => StoreError::CorruptRow {
            table,
            key: key.to_string(),
            reason: format!("column {index}: {source}"),
        },
        other => StoreError::Database(other),
    }
}

pub(crate) fn epoch_to_sql(epoch: u64) -> StoreResult<i64> {
    i64::try_from(epoch).map_err(|_| StoreError::InvalidInput { field: "epoch" })
}

pub(crate) fn epoch_from_sql(table: &'static str, key: &str, epoch: i64) -> StoreResult<u64> {
    u64::try_from(epoch).map_err(|_| StoreError::CorruptRow {
        table,
        key: key.to_string(),
        reason: format!("negative epoch {epoch}"),
    })
}
