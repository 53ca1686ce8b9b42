//! 时钟抽象
//!
//! 清理节流使用单调时钟，过期判断使用墙上时钟。两者都通过 [`Clock`] 读取，
//! 测试中可替换为 `ManualClock`（需开启 `test-util` feature）。

use std::fmt::Debug;
#[cfg(any(test, feature = "test-util"))]
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// 时间来源
pub trait Clock: Send + Sync + Debug {
    /// 自某个固定起点以来的单调时间
    fn monotonic(&self) -> Duration;

    /// 当前 Unix 时间（秒）
    fn unix_now(&self) -> u64;
}

/// 系统时钟
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn monotonic(&self) -> Duration {
        self.origin.elapsed()
    }

    fn unix_now(&self) -> u64 {
        // 系统时间早于 1970 时按 0 处理
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

/// 手动推进的时钟
///
/// 单调时间与墙上时间分别存储，可以单独调整墙上时间来模拟时钟回拨。
#[cfg(any(test, feature = "test-util"))]
#[derive(Debug)]
pub struct ManualClock {
    monotonic_ms: AtomicU64,
    unix_secs: AtomicU64,
}

#[cfg(any(test, feature = "test-util"))]
impl ManualClock {
    pub fn new(unix_secs: u64) -> Self {
        Self {
            monotonic_ms: AtomicU64::new(0),
            unix_secs: AtomicU64::new(unix_secs),
        }
    }

    /// 同时推进单调时间和墙上时间
    pub fn advance(&self, by: Duration) {
        self.monotonic_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
        self.unix_secs.fetch_add(by.as_secs(), Ordering::SeqCst);
    }

    /// 只修改墙上时间
    pub fn set_unix(&self, unix_secs: u64) {
        self.unix_secs.store(unix_secs, Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-util"))]
impl Clock for ManualClock {
    fn monotonic(&self) -> Duration {
        Duration::from_millis(self.monotonic_ms.load(Ordering::SeqCst))
    }

    fn unix_now(&self) -> u64 {
        self.unix_secs.load(Ordering::SeqCst)
    }
}
