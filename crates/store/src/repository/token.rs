//! token 表的读写

use crate::error::{StoreError, StoreResult};
use crate::store::{
    Store, absorb_read, absorb_write, classify_read, epoch_from_sql, epoch_to_sql,
};
use crate::types::TokenEntry;
use crate::validation::require_hex;
use tracing::trace;

const TABLE: &str = "tokens";

impl Store {
    /// 保存新授予的 token；错误只记日志
    pub async fn add_token(&self, entry: &TokenEntry) {
        absorb_write("add_token", self.try_add_token(entry).await);
    }

    /// 查询 token，查询前按需执行过期清理
    pub async fn get_token(&self, token: &str) -> Option<TokenEntry> {
        absorb_read("get_token", self.try_get_token(token).await)
    }

    /// 删除 token（登出 / 吊销）
    pub async fn drop_token(&self, token: &str) {
        absorb_write("drop_token", self.try_drop_token(token).await.map(|_| ()));
    }

    /// 插入 token，只有真正写入时返回 `Ok`
    pub async fn try_add_token(&self, entry: &TokenEntry) -> StoreResult<()> {
        require_hex("token", &entry.token)?;
        require_hex("fingerprint", &entry.fingerprint)?;
        let epoch = epoch_to_sql(entry.epoch)?;

        sqlx::query("INSERT INTO tokens (token, fingerprint, epoch) VALUES (?1, ?2, ?3)")
            .bind(&entry.token)
            .bind(&entry.fingerprint)
            .bind(epoch)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_insert(e, TABLE, &entry.token))?;

        trace!("Stored token {}", entry.token);
        Ok(())
    }

    /// 按 token 查询，查询前先执行到期的节流清理
    pub async fn try_get_token(&self, token: &str) -> StoreResult<Option<TokenEntry>> {
        require_hex("token", token)?;

        self.sweep_if_due().await;

        let row = sqlx::query_as::<_, (String, i64)>(
            "SELECT fingerprint, epoch FROM tokens WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| classify_read(e, TABLE, token))?;

        let Some((fingerprint, epoch)) = row else {
            return Ok(None);
        };

        Ok(Some(TokenEntry {
            token: token.to_string(),
            fingerprint,
            epoch: epoch_from_sql(TABLE, token, epoch)?,
        }))
    }

    /// 删除 token，返回是否删除了行
    pub async fn try_drop_token(&self, token: &str) -> StoreResult<bool> {
        require_hex("token", token)?;

        let result = sqlx::query("DELETE FROM tokens WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
