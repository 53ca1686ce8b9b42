//! challenge 表的读写
//!
//! challenge 读路径不触发过期清理。

use crate::error::{StoreError, StoreResult};
use crate::store::{
    Store, absorb_read, absorb_write, classify_read, epoch_from_sql, epoch_to_sql,
};
use crate::types::ChallengeEntry;
use crate::validation::require_hex;
use tracing::trace;

const TABLE: &str = "challenges";

impl Store {
    /// 保存新下发的 challenge；无效输入、重复 nonce 和数据库错误都只记日志
    pub async fn add_challenge(&self, entry: &ChallengeEntry) {
        absorb_write("add_challenge", self.try_add_challenge(entry).await);
    }

    /// 按 nonce 查询；无效输入、不存在或出错时返回 `None`
    pub async fn get_challenge(&self, nonce: &str) -> Option<ChallengeEntry> {
        absorb_read("get_challenge", self.try_get_challenge(nonce).await)
    }

    /// 删除 challenge；不存在或无效输入时什么也不做
    pub async fn drop_challenge(&self, nonce: &str) {
        let result = self.try_drop_challenge(nonce).await.map(|_| ());
        absorb_write("drop_challenge", result);
    }

    /// 插入 challenge，只有真正写入时返回 `Ok`
    pub async fn try_add_challenge(&self, entry: &ChallengeEntry) -> StoreResult<()> {
        require_hex("nonce", &entry.nonce)?;
        require_hex("fingerprint", &entry.fingerprint)?;
        let epoch = epoch_to_sql(entry.epoch)?;

        sqlx::query(
            "INSERT INTO challenges (nonce, fingerprint, difficulty, epoch) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&entry.nonce)
        .bind(&entry.fingerprint)
        .bind(i64::from(entry.difficulty))
        .bind(epoch)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::from_insert(e, TABLE, &entry.nonce))?;

        trace!("Stored challenge {}", entry.nonce);
        Ok(())
    }

    /// 按 nonce 查询；库中数值越界时返回 `CorruptRow`
    pub async fn try_get_challenge(&self, nonce: &str) -> StoreResult<Option<ChallengeEntry>> {
        require_hex("nonce", nonce)?;

        let row = sqlx::query_as::<_, (String, i64, i64)>(
            "SELECT fingerprint, difficulty, epoch FROM challenges WHERE nonce = ?",
        )
        .bind(nonce)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify_read(e, TABLE, nonce))?;

        let Some((fingerprint, difficulty, epoch)) = row else {
            return Ok(None);
        };

        let difficulty = u32::try_from(difficulty).map_err(|_| StoreError::CorruptRow {
            table: TABLE,
            key: nonce.to_string(),
            reason: format!("difficulty {difficulty} out of range"),
        })?;

        Ok(Some(ChallengeEntry {
            nonce: nonce.to_string(),
            fingerprint,
            difficulty,
            epoch: epoch_from_sql(TABLE, nonce, epoch)?,
        }))
    }

    /// 删除 challenge，返回是否删除了行
    pub async fn try_drop_challenge(&self, nonce: &str) -> StoreResult<bool> {
        require_hex("nonce", nonce)?;

        let result = sqlx::query("DELETE FROM challenges WHERE nonce = ?")
            .bind(nonce)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
