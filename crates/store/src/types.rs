//! Store 数据类型定义

use serde::{Deserialize, Serialize};

/// 已下发、尚未完成的 PoW challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeEntry {
    /// challenge 标识（小写十六进制，主键）
    pub nonce: String,
    /// 请求方指纹（小写十六进制）
    pub fingerprint: String,
    /// 下发时的难度
    pub difficulty: u32,
    /// 下发时间（Unix 秒）
    pub epoch: u64,
}

/// challenge 通过后授予的访问 token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenEntry {
    /// token 值（小写十六进制，主键）
    pub token: String,
    /// 持有方指纹（小写十六进制）
    pub fingerprint: String,
    /// 授予时间（Unix 秒）
    pub epoch: u64,
}

/// 行数统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub challenges: u64,
    pub tokens: u64,
}

/// 单次清理结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub tokens_removed: u64,
    pub challenges_removed: u64,
}

impl SweepReport {
    pub fn total(&self) -> u64 {
        self.tokens_removed + self.challenges_removed
    }
}
