//! 错误处理模块

mod config_error;

pub use config_error::ConfigError;

/// 配置操作的结果类型
pub type Result<T> = std::result::Result<T, ConfigError>;
