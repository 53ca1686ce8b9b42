//! 仓库操作
//!
//! 每个接受外部标识符的操作都有两种形式：
//! - 普通形式（`add_challenge` 等）：出错时记录日志，返回"无效果 / 不存在"
//! - `try_*` 形式：返回 [`StoreError`](crate::StoreError)，调用方可以区分失败原因

mod challenge;
mod token;
