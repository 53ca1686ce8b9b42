//! 命令行界面定义
//!
//! 定义了 powgate 运维工具的命令行参数和选项
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "powgate")]
#[command(version)]
#[command(about = "Maintenance tool for the powgate challenge/token store")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    /// Configuration file path (defaults to searching standard locations)
    #[arg(short, long, default_value = "config.toml", global = true)]
    pub(crate) config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Test configuration file
    Test {
        /// Configuration file path (optional, defaults to config.toml)
        #[arg(index = 1)]
        config_file: Option<PathBuf>,
    },

    /// Create or migrate the data directory
    Init,

    /// Print challenge/token row counts
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Purge expired challenges and tokens now
    Sweep,
}
