//! powgate 运维工具
//!
//! 对 challenge / token 存储做初始化、统计和手动清理

mod cli;
mod error;
mod observability;

use clap::Parser;
use observability::init_observability;
use powgate_common::GateConfig;
use powgate_store::Store;
use std::path::{Path, PathBuf};
use tracing::{error, info};

macro_rules! bootstrap_info {
    ($($arg:tt)*) => {
        eprintln!($($arg)*)
    };
}

macro_rules! bootstrap_error {
    ($($arg:tt)*) => {
        eprintln!($($arg)*)
    };
}

use cli::{Cli, Commands};
use error::{Error, Result};

/// Application launcher utilities
struct ApplicationLauncher;

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Test { config_file } = &cli.command {
        let config_path =
            ApplicationLauncher::find_config_file(config_file.as_ref().unwrap_or(&cli.config))?;
        return ApplicationLauncher::test_config_file(&config_path);
    }

    let config_path = ApplicationLauncher::find_config_file(&cli.config)?;
    let config = ApplicationLauncher::load_config(&config_path)?;
    let _observability_guard = init_observability(&config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(ApplicationLauncher::run_command(&cli.command, &config))
}

impl ApplicationLauncher {
    /// Find config file with fallback locations
    fn find_config_file(provided_path: &PathBuf) -> Result<PathBuf> {
        if provided_path != Path::new("config.toml") {
            if provided_path.exists() {
                bootstrap_info!("Using provided config file: {:?}", provided_path);
                return Ok(provided_path.clone());
            } else {
                bootstrap_error!("Provided config file not found: {:?}", provided_path);
                return Err(Error::custom(format!(
                    "Config file not found: {provided_path:?}"
                )));
            }
        }

        let fallback_paths = vec![
            // 1. Current working directory
            PathBuf::from("config.toml"),
            // 2. System config directory
            PathBuf::from("/etc/powgate/config.toml"),
        ];

        for path in &fallback_paths {
            if path.exists() {
                bootstrap_info!("Found config file: {:?}", path);
                return Ok(path.clone());
            }
        }

        bootstrap_error!("No configuration file found!");
        bootstrap_error!("Please create a config file in one of these locations:");
        for (i, path) in fallback_paths.iter().enumerate() {
            bootstrap_error!("  {}. {:?}", i + 1, path);
        }
        bootstrap_error!("Or specify a custom path with: powgate --config <path>");

        Err(Error::custom(
            "No configuration file found. Please create one or specify path with --config",
        ))
    }

    /// 测试配置文件是否有效
    fn test_config_file(config_path: &Path) -> Result<()> {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();

        let config = GateConfig::from_file(config_path).map_err(|e| {
            error!("❌ 配置文件解析失败: {}", e);
            Error::validation(format!("配置解析失败: {e}"))
        })?;
        info!("✅ 配置文件解析成功: {:?}", config_path);

        if let Err(errors) = config.validate() {
            Self::report_validation(&errors, |line| info!("{line}"), |line| error!("{line}"));
            if errors.iter().any(|e| !e.starts_with("Warning:")) {
                return Err(Error::validation("配置验证失败"));
            }
        }

        info!("✅ 配置验证通过");
        Ok(())
    }

    /// 加载并验证配置，只有警告时继续
    fn load_config(config_path: &Path) -> Result<GateConfig> {
        bootstrap_info!("📄 加载配置文件: {:?}", config_path);
        let config = GateConfig::from_file(config_path).map_err(|e| {
            bootstrap_error!("❌ 配置加载失败: {}", e);
            e
        })?;

        if let Err(errors) = config.validate() {
            Self::report_validation(
                &errors,
                |line| bootstrap_info!("{line}"),
                |line| bootstrap_error!("{line}"),
            );
            if errors.iter().any(|e| !e.starts_with("Warning:")) {
                return Err(Error::validation("配置验证失败，请修复上述错误"));
            }
        }

        Ok(config)
    }

    fn report_validation(errors: &[String], warn: impl Fn(&str), fail: impl Fn(&str)) {
        fail("❌ 配置验证发现问题:");
        for (i, err) in errors.iter().enumerate() {
            if err.starts_with("Warning:") {
                warn(&format!("  {}. ⚠️  {}", i + 1, err));
            } else {
                fail(&format!("  {}. ❌ {}", i + 1, err));
            }
        }
    }

    /// 打开存储并执行子命令
    async fn run_command(command: &Commands, config: &GateConfig) -> Result<()> {
        let cwd = std::env::current_dir()?;
        let store = Store::from_config(&config.store, &cwd).await?;
        info!(
            "Instance {} ({}) using {}",
            config.name,
            config.env,
            store.data_dir().display()
        );

        let result = match command {
            Commands::Init => {
                println!("{}", store.data_dir().display());
                Ok(())
            }
            Commands::Stats { json } => Self::print_stats(&store, *json).await,
            Commands::Sweep => {
                let report = store.sweep().await?;
                info!("Manual sweep finished");
                println!(
                    "removed {} tokens, {} challenges",
                    report.tokens_removed, report.challenges_removed
                );
                Ok(())
            }
            Commands::Test { .. } => Ok(()),
        };

        store.close().await;
        result
    }

    async fn print_stats(store: &Store, json: bool) -> Result<()> {
        let stats = store.stats().await?;
        if json {
            println!("{}", serde_json::to_string(&stats)?);
        } else {
            println!("challenges: {}", stats.challenges);
            println!("tokens: {}", stats.tokens);
        }
        Ok(())
    }
}
