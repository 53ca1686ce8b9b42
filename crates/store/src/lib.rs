//! powgate 持久化层
//!
//! 为 PoW 访问网关保存已下发的 challenge 和已授予的 token：
//! 1. 数据目录与结构版本管理，版本不符时整库重建
//! 2. 标识符校验，非小写十六进制的输入不会进入任何查询
//! 3. challenge / token 的增删查
//! 4. 读 token 时按间隔节流的过期清理

pub mod clock;
pub mod config;
pub mod error;
mod repository;
pub mod schema;
mod store;
pub mod sweeper;
pub mod types;
pub mod validation;

#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use clock::{Clock, SystemClock};
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use schema::SCHEMA_VERSION;
pub use store::Store;
pub use sweeper::{CHALLENGE_LIFETIME, CLEANUP_INTERVAL, TOKEN_LIFETIME};
pub use types::{ChallengeEntry, StoreStats, SweepReport, TokenEntry};
pub use validation::is_valid_hex;
