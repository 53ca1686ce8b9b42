//! 过期清理
//!
//! 读 token 时顺带检查，距上次清理超过 [`CLEANUP_INTERVAL`] 才真正执行。
//! 节流门使用单调时钟，过期判断使用墙上时钟。

use crate::clock::Clock;
use crate::error::StoreResult;
use crate::types::SweepReport;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// 两次自动清理之间的最小间隔
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);
/// token 有效期
pub const TOKEN_LIFETIME: Duration = Duration::from_secs(60 * 60);
/// challenge 有效期
pub const CHALLENGE_LIFETIME: Duration = Duration::from_secs(10 * 60);

const NEVER: u64 = u64::MAX;

/// 清理节流状态
#[derive(Debug)]
pub struct Sweeper {
    clock: Arc<dyn Clock>,
    /// 上次清理的单调时间（毫秒），`NEVER` 表示尚未清理过
    last_sweep_ms: AtomicU64,
    runs: AtomicU64,
}

impl Sweeper {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last_sweep_ms: AtomicU64::new(NEVER),
            runs: AtomicU64::new(0),
        }
    }

    /// 已执行的清理次数
    pub fn sweeps_run(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }

    /// 是否到了清理时间
    pub fn should_sweep(&self) -> bool {
        let last = self.last_sweep_ms.load(Ordering::SeqCst);
        Self::is_due(last, self.now_ms())
    }

    /// 抢占本轮清理。并发调用时只有一个调用方拿到 `true`。
    fn try_claim(&self) -> bool {
        let now = self.now_ms();
        let last = self.last_sweep_ms.load(Ordering::SeqCst);
        if !Self::is_due(last, now) {
            return false;
        }
        self.last_sweep_ms
            .compare_exchange(last, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// 到期才清理；未到期返回 `None`
    pub async fn sweep_if_due(&self, pool: &SqlitePool) -> Option<StoreResult<SweepReport>> {
        if !self.try_claim() {
            return None;
        }
        Some(self.delete_expired(pool).await)
    }

    /// 无条件清理，并重置节流门
    pub async fn sweep(&self, pool: &SqlitePool) -> StoreResult<SweepReport> {
        self.last_sweep_ms.store(self.now_ms(), Ordering::SeqCst);
        self.delete_expired(pool).await
    }

    async fn delete_expired(&self, pool: &SqlitePool) -> StoreResult<SweepReport> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        let now = self.clock.unix_now();

        let tokens = sqlx::query("DELETE FROM tokens WHERE epoch < ?")
            .bind(cutoff(now, TOKEN_LIFETIME))
            .execute(pool)
            .await?;

        let challenges = sqlx::query("DELETE FROM challenges WHERE epoch < ?")
            .bind(cutoff(now, CHALLENGE_LIFETIME))
            .execute(pool)
            .await?;

        let report = SweepReport {
            tokens_removed: tokens.rows_affected(),
            challenges_removed: challenges.rows_affected(),
        };
        debug!(
            "Expiry sweep done: tokens_removed={}, challenges_removed={}",
            report.tokens_removed, report.challenges_removed
        );
        Ok(report)
    }

    fn now_ms(&self) -> u64 {
        // NEVER 保留给"从未清理"
        (self.clock.monotonic().as_millis() as u64).min(NEVER - 1)
    }

    fn is_due(last: u64, now: u64) -> bool {
        last == NEVER || now.saturating_sub(last) > CLEANUP_INTERVAL.as_millis() as u64
    }
}

/// 早于该时间戳的行视为过期
fn cutoff(now: u64, lifetime: Duration) -> i64 {
    i64::try_from(now.saturating_sub(lifetime.as_secs())).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn test_first_check_is_due() {
        let sweeper = Sweeper::new(Arc::new(ManualClock::new(1_000)));
        assert!(sweeper.should_sweep());
    }

    #[test]
    fn test_claim_closes_gate_until_interval_elapses() {
        let clock = Arc::new(ManualClock::new(1_000));
        let sweeper = Sweeper::new(clock.clone());

        assert!(sweeper.try_claim());
        assert!(!sweeper.should_sweep());
        assert!(!sweeper.try_claim());

        // 恰好等于间隔不算超过
        clock.advance(CLEANUP_INTERVAL);
        assert!(!sweeper.should_sweep());

        clock.advance(Duration::from_millis(1));
        assert!(sweeper.should_sweep());
        assert!(sweeper.try_claim());
        assert!(!sweeper.try_claim());
    }

    #[test]
    fn test_wall_clock_jump_does_not_open_gate() {
        let clock = Arc::new(ManualClock::new(1_000));
        let sweeper = Sweeper::new(clock.clone());
        assert!(sweeper.try_claim());

        clock.set_unix(1_000 + 86_400);
        assert!(!sweeper.should_sweep());
    }

    #[test]
    fn test_cutoff() {
        assert_eq!(cutoff(10_000, TOKEN_LIFETIME), 10_000 - 3_600);
        assert_eq!(cutoff(10_000, CHALLENGE_LIFETIME), 10_000 - 600);
        assert_eq!(cutoff(5, TOKEN_LIFETIME), 0);
        assert_eq!(cutoff(u64::MAX, CHALLENGE_LIFETIME), i64::MAX);
    }
}
