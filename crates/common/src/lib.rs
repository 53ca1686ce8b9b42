//! powgate 基础设施库
//!
//! 提供配置加载、校验以及配置相关的错误类型

pub mod config;
pub mod error;

pub use config::{GateConfig, LogConfig, ObservabilityConfig};
pub use error::{ConfigError, Result};
