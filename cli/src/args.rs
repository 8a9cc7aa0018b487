//! Command-line arguments.

use clap::{Args, Parser, Subcommand, ValueEnum};
use rankscope_core::Device;
use std::path::PathBuf;

/// Rankscope: SEO analysis of a page against its top search competitors
#[derive(Debug, Parser)]
#[command(name = "rankscope", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file (default: platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Analyze a page against the top results for a keyword
    Analyze(AnalyzeArgs),

    /// Print the effective configuration, or write a default config file
    Config {
        /// Write the default configuration to the config path
        #[arg(long)]
        init: bool,

        /// Overwrite an existing file with --init
        #[arg(long, requires = "init")]
        force: bool,
    },
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    /// Page to analyze
    pub url: String,

    /// Keyword the page should rank for
    #[arg(long, short)]
    pub keyword: String,

    /// Number of competitors to compare against
    #[arg(long, short)]
    pub competitors: Option<usize>,

    /// Device to audit (repeatable; default: all configured devices)
    #[arg(long, short, value_enum)]
    pub device: Vec<DeviceArg>,

    /// Output format
    #[arg(long, short, value_enum, default_value = "summary")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Abandon the run after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Attempts per source call, including the first
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Do not reuse cached source data
    #[arg(long)]
    pub no_cache: bool,

    /// Skip the model-written SEO report and competitor comparisons
    #[arg(long)]
    pub no_narratives: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeviceArg {
    Mobile,
    Desktop,
}

impl From<DeviceArg> for Device {
    fn from(arg: DeviceArg) -> Self {
        match arg {
            DeviceArg::Mobile => Device::Mobile,
            DeviceArg::Desktop => Device::Desktop,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Full report as JSON
    Json,
    /// One row per page and metric
    Csv,
    /// Human-readable overview
    Summary,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::try_parse_from([
            "rankscope",
            "analyze",
            "https://example.com",
            "--keyword",
            "running shoes",
            "--competitors",
            "2",
            "--device",
            "mobile",
            "--format",
            "csv",
            "--timeout",
            "120",
        ])
        .expect("cli should parse");

        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.url, "https://example.com");
        assert_eq!(args.keyword, "running shoes");
        assert_eq!(args.competitors, Some(2));
        assert_eq!(args.device, vec![DeviceArg::Mobile]);
        assert_eq!(args.format, OutputFormat::Csv);
        assert_eq!(args.timeout, Some(120));
        assert!(!args.no_cache);
    }

    #[test]
    fn test_keyword_required() {
        assert!(Cli::try_parse_from(["rankscope", "analyze", "https://example.com"]).is_err());
    }

    #[test]
    fn test_force_requires_init() {
        assert!(Cli::try_parse_from(["rankscope", "config", "--force"]).is_err());
        assert!(Cli::try_parse_from(["rankscope", "config", "--init", "--force"]).is_ok());
    }
}
