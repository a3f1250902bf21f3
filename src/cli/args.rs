use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "devassist")]
#[command(version)]
#[command(about = "AI-assisted code review across OpenAI, Anthropic and Google models", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "DEVASSIST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a file or a directory of source files
    Analyze(AnalyzeArgs),
    /// Check configuration, providers and system requirements
    Health,
    /// Validate configuration and send a test prompt
    ConfigTest,
    /// List available analyzers
    Analyzers,
    /// Inspect or clear the analysis cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Write a default configuration file
    Init,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// File or directory path to analyze
    pub path: PathBuf,

    /// Comma-separated analyzers to run (security,performance,quality,documentation)
    #[arg(short, long, value_delimiter = ',')]
    pub analyzers: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Path substrings to exclude (replaces the configured list)
    #[arg(short = 'x', long = "exclude")]
    pub exclude: Vec<String>,

    /// Maximum number of files to analyze
    #[arg(short, long)]
    pub max_files: Option<usize>,

    /// Only analyze the top level of a directory
    #[arg(long)]
    pub no_recursive: bool,

    /// Bypass the response and result caches
    #[arg(long)]
    pub no_cache: bool,

    /// Ask for improvement suggestions (single files only)
    #[arg(long)]
    pub suggest: bool,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum CacheAction {
    /// Show store location, size and hit statistics
    Stats,
    /// Remove cached analysis results
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored human-readable report
    Text,
    /// JSON structured output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_flags() {
        let cli = Cli::parse_from([
            "devassist", "analyze", "src", "-a", "security,quality", "-f", "json", "-x", "vendor/", "-x",
            "tests/", "-m", "3", "--no-cache",
        ]);
        let Commands::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        assert_eq!(args.path, PathBuf::from("src"));
        assert_eq!(args.analyzers, vec!["security", "quality"]);
        assert_eq!(args.format, OutputFormat::Json);
        assert_eq!(args.exclude, vec!["vendor/", "tests/"]);
        assert_eq!(args.max_files, Some(3));
        assert!(args.no_cache);
        assert!(!args.no_recursive);
    }

    #[test]
    fn test_global_flags_and_subcommands() {
        let cli = Cli::parse_from(["devassist", "cache", "clear", "--verbose", "--config", "x.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Cache { action: CacheAction::Clear }));

        let cli = Cli::parse_from(["devassist", "config-test"]);
        assert!(matches!(cli.command, Commands::ConfigTest));
    }
}
