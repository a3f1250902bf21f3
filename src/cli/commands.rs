use anyhow::{bail, Context, Result};
use colored::{ColoredString, Colorize};
use serde_json::json;
use std::fmt::Write as _;
use std::sync::Arc;

use crate::{
    analysis::{
        AnalysisResult, CodeAnalyzer, CommandSyntaxChecker, DirectoryOptions, DirectoryReport, FileOutcome,
        RiskLevel,
    },
    analyzers::{default_analyzers, Severity},
    app::{init_config, load_config, validate_configuration, Config, PROVIDER_INSTRUCTIONS},
    observers::{AnalysisObserver, LoggingObserver, PerformanceMonitor, ProviderFailureTracker},
    providers::ProviderFactory,
    store::{open_store, KeyValueStore},
};

use super::{AnalyzeArgs, CacheAction, Cli, Commands, OutputFormat};

const TEST_PROMPT: &str = "Please respond with exactly \"AI_TEST_SUCCESS\" to confirm connectivity.";

/// Handle CLI subcommands. `Ok(false)` means the command ran but should exit non-zero.
pub async fn handle_command(cli: &Cli) -> Result<bool> {
    let load = || load_config(cli.config.as_deref()).context("Failed to load configuration");

    match &cli.command {
        Commands::Analyze(args) => analyze(args, load()?).await,
        Commands::Health => health(&load()?),
        Commands::ConfigTest => config_test(&load()?).await,
        Commands::Analyzers => list_analyzers(&load()?),
        Commands::Cache { action } => cache(*action, &load()?),
        Commands::Init => init(),
    }
}

fn build_analyzer(config: &Config) -> Result<CodeAnalyzer> {
    let store = open_store(&config.cache).context("Failed to open cache store")?;
    let observers: Vec<Arc<dyn AnalysisObserver>> = vec![
        Arc::new(LoggingObserver),
        Arc::new(PerformanceMonitor::new()),
        Arc::new(ProviderFailureTracker::new()),
    ];
    CodeAnalyzer::from_config(config, store, observers).context("Failed to set up analysis")
}

async fn analyze(args: &AnalyzeArgs, mut config: Config) -> Result<bool> {
    if !config.enabled {
        bail!("Analysis is disabled in configuration (enabled = false)");
    }
    if args.no_cache {
        config.cache.enabled = false;
    }

    let analyzer = build_analyzer(&config)?;
    let available = analyzer.analyzer_names();
    let invalid: Vec<&str> = args
        .analyzers
        .iter()
        .filter(|name| !available.contains(*name))
        .map(String::as_str)
        .collect();
    if !invalid.is_empty() {
        eprintln!("{} Invalid analyzers: {}", "[ERROR]".red(), invalid.join(", "));
        eprintln!("  Available analyzers: {}", available.join(", "));
        return Ok(false);
    }
    let selection = (!args.analyzers.is_empty()).then_some(args.analyzers.as_slice());

    if args.path.is_file() {
        return analyze_single_file(args, &analyzer, selection).await;
    }
    if !args.path.is_dir() {
        bail!("Path not found: {}", args.path.display());
    }

    let options = DirectoryOptions {
        recursive: !args.no_recursive,
        max_files: args.max_files.unwrap_or(config.analysis.max_files),
        exclude_patterns: if args.exclude.is_empty() {
            config.analysis.excluded_paths.clone()
        } else {
            args.exclude.clone()
        },
        analyzers: args.analyzers.clone(),
        use_cache: !args.no_cache,
    };

    if args.format == OutputFormat::Text {
        println!("Analyzing {} ...", args.path.display().to_string().cyan());
    }
    let report = analyzer
        .analyze_directory(&args.path, &options)
        .await
        .context("Directory analysis failed")?;

    print!("{}", render_directory(&report, args.format)?);

    let failed = report.failed_files().count();
    Ok(!report.has_critical_issues() && failed == 0)
}

async fn analyze_single_file(args: &AnalyzeArgs, analyzer: &CodeAnalyzer, selection: Option<&[String]>) -> Result<bool> {
    let result = match analyzer.analyze_file(&args.path, selection).await {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{} Failed to analyze {}: {}", "[ERROR]".red(), args.path.display(), e);
            return Ok(false);
        }
    };

    let suggestions = if args.suggest {
        let code = std::fs::read_to_string(&args.path)
            .with_context(|| format!("Failed to read {}", args.path.display()))?;
        analyzer.suggestions(&code, &result.issues).await
    } else {
        None
    };

    match args.format {
        OutputFormat::Json => {
            let mut value = serde_json::to_value(&result)?;
            if let Some(text) = &suggestions {
                value["suggestions"] = json!(text);
            }
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            print!("{}", format_result(&result));
            if let Some(text) = suggestions {
                println!("{}", "Suggestions".bold());
                println!("{}\n", text.trim());
            }
            println!(
                "{} Found {} total issues ({} critical) in 1 file.",
                completion_marker(result.has_critical_issues()),
                result.summary.total,
                result.summary.critical
            );
        }
    }

    Ok(!result.has_critical_issues())
}

fn completion_marker(critical: bool) -> ColoredString {
    if critical {
        "[FAILED]".red().bold()
    } else {
        "[OK]".green().bold()
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    let label = format!("[{}]", severity.as_str().to_uppercase());
    match severity {
        Severity::Critical => label.red().bold(),
        Severity::High => label.red(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.blue(),
        Severity::Info => label.dimmed(),
    }
}

fn risk_label(level: RiskLevel) -> ColoredString {
    let label = level.as_str().to_uppercase();
    match level {
        RiskLevel::Critical | RiskLevel::High => label.red().bold(),
        RiskLevel::Medium => label.yellow(),
        RiskLevel::Low | RiskLevel::VeryLow => label.green(),
    }
}

fn format_result(result: &AnalysisResult) -> String {
    let mut out = String::new();
    let s = &result.summary;

    let _ = writeln!(out, "{} {}", "File:".bold(), result.filename);
    let _ = writeln!(out, "  Risk: {} ({})", risk_label(result.risk_level), result.risk_score);
    let _ = writeln!(
        out,
        "  Issues: {} total ({} critical, {} high, {} medium, {} low, {} info)",
        s.total, s.critical, s.high, s.medium, s.low, s.info
    );
    if s.quality_score.is_some() || s.security_score.is_some() {
        let fmt_score = |score: Option<u8>| score.map_or("-".to_string(), |v| format!("{}/10", v));
        let _ = writeln!(
            out,
            "  Scores: quality {}, security {}",
            fmt_score(s.quality_score),
            fmt_score(s.security_score)
        );
    }
    if result.cached {
        let _ = writeln!(out, "  {}", "(cached)".dimmed());
    }

    for (name, analyzer_result) in &result.analyzers {
        if let Some(error) = &analyzer_result.error {
            let _ = writeln!(out, "  {} {}: {}", "[WARNING]".yellow(), name, error);
            continue;
        }
        if analyzer_result.issues.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n  {} issues:", name.cyan());
        for issue in &analyzer_result.issues {
            let line = issue.line.map_or("?".to_string(), |l| l.to_string());
            let _ = writeln!(out, "    {} Line {}: {}", severity_label(issue.severity), line, issue.message);
            if !issue.suggestion.is_empty() {
                let _ = writeln!(out, "      -> {}", issue.suggestion.dimmed());
            }
        }
    }
    out.push('\n');
    out
}

/// Stdout for a directory run; JSON output stays parseable even when empty
fn render_directory(report: &DirectoryReport, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => format!("{}\n", serde_json::to_string_pretty(report)?),
        OutputFormat::Text if report.files.is_empty() => {
            format!("{} No supported files found to analyze.\n", "[WARNING]".yellow())
        }
        OutputFormat::Text => format_directory(report),
    })
}

fn format_directory(report: &DirectoryReport) -> String {
    let mut out = String::new();
    let mut critical = 0;

    for (path, outcome) in &report.files {
        match outcome {
            FileOutcome::Analyzed { result } => {
                critical += result.summary.critical;
                out.push_str(&format_result(result));
            }
            FileOutcome::Failed { error } => {
                let _ = writeln!(out, "{} Failed to analyze {}: {}\n", "[ERROR]".red(), path, error);
            }
        }
    }

    let _ = writeln!(
        out,
        "{} Found {} total issues ({} critical) across {} files ({} with issues, {} failed).",
        completion_marker(critical > 0),
        report.total_issues,
        critical,
        report.files_analyzed,
        report.files_with_issues,
        report.failed_files().count()
    );
    out
}

fn check_row(ok: Option<bool>, label: &str, detail: &str) {
    let status = match ok {
        Some(true) => "[OK]".green(),
        Some(false) => "[ERROR]".red(),
        None => "[WARNING]".yellow(),
    };
    println!("  {} {}: {}", status, label, detail);
}

/// Configuration, providers and system requirements
fn health(config: &Config) -> Result<bool> {
    println!("{}", "DevAssist Health Check".bold());

    println!("\n{}", "Configuration".bold());
    let validation = validate_configuration(config);
    if validation.errors.is_empty() && validation.warnings.is_empty() {
        check_row(Some(true), "Configuration", "All configuration valid");
    }
    for error in &validation.errors {
        check_row(Some(false), "Configuration", error);
    }
    for warning in &validation.warnings {
        check_row(None, "Configuration", warning);
    }

    println!("\n{}", "AI Providers".bold());
    let chain = ProviderFactory::chain_from_config(config).context("Failed to create providers")?;
    for (name, settings) in config.providers.iter() {
        if !settings.enabled {
            check_row(None, name, "Disabled in configuration");
        }
    }
    for (name, priority, available) in chain.provider_status() {
        if available {
            check_row(Some(true), &name, &format!("Ready for requests (priority {})", priority));
        } else {
            check_row(None, &name, "No API key configured");
        }
    }
    let providers_ok = chain.has_available_provider();
    if !providers_ok {
        println!("\n  No AI providers are available. Configure at least one API key:");
        for info in PROVIDER_INSTRUCTIONS {
            println!(
                "    {} ({}): {}  key format {}  {}",
                info.name.bold(),
                info.id,
                info.url,
                info.key_format,
                info.notes.dimmed()
            );
        }
    }

    println!("\n{}", "System".bold());
    if config.analysis.syntax_check {
        match CommandSyntaxChecker::from_command(&config.analysis.linter_command) {
            Some(checker) if checker.is_installed() => {
                check_row(Some(true), "Syntax checker", &config.analysis.linter_command.join(" "))
            }
            _ => check_row(None, "Syntax checker", "Not found, syntax checks will be skipped"),
        }
    } else {
        check_row(None, "Syntax checker", "Disabled in configuration");
    }
    let store_ok = match open_store(&config.cache).and_then(|store| store.stats()) {
        Ok(stats) => {
            let location = stats
                .location
                .map_or("in memory".to_string(), |p| p.display().to_string());
            check_row(Some(true), "Cache store", &format!("{} ({} entries)", location, stats.entries));
            true
        }
        Err(e) => {
            check_row(Some(false), "Cache store", &e.to_string());
            false
        }
    };

    let healthy = validation.is_valid() && providers_ok && store_ok;
    println!();
    if healthy {
        println!("{} All health checks passed.", "[OK]".green().bold());
    } else {
        println!("{} Some health checks failed. Review the issues above.", "[ERROR]".red().bold());
    }
    Ok(healthy)
}

/// Validate configuration, then send one prompt through the provider chain
async fn config_test(config: &Config) -> Result<bool> {
    println!("{}", "DevAssist Configuration Test".bold());

    let validation = validate_configuration(config);
    for error in &validation.errors {
        check_row(Some(false), "Configuration", error);
    }
    for warning in &validation.warnings {
        check_row(None, "Configuration", warning);
    }

    let chain = ProviderFactory::chain_from_config(config).context("Failed to create providers")?;
    let available = chain.available_providers();
    if available.is_empty() {
        println!("{} No AI providers are configured or available!", "[ERROR]".red());
        println!("  Set at least one of:");
        for (name, settings) in config.providers.iter() {
            println!("    - {} for {}", settings.api_key_env, name);
        }
        return Ok(false);
    }

    println!("{} Found {} available AI provider(s):", "[OK]".green(), available.len());
    for name in &available {
        println!("    - {}", name);
    }

    println!("\n{}", "Testing AI connectivity...".bold());
    match chain.request_detailed(TEST_PROMPT, &Default::default()).await {
        Ok(response) => {
            if response.text.to_uppercase().contains("AI_TEST_SUCCESS") {
                println!("{} Connectivity test passed via {}", "[OK]".green(), response.provider);
            } else {
                println!(
                    "{} {} responded with unexpected content",
                    "[WARNING]".yellow(),
                    response.provider
                );
            }
            println!("  Response: {}", response.text.trim());
            for failure in &response.failures {
                check_row(None, &failure.provider, &failure.message);
            }
            Ok(true)
        }
        Err(e) => {
            println!("{} AI connectivity test failed: {}", "[ERROR]".red(), e);
            Ok(false)
        }
    }
}

fn list_analyzers(config: &Config) -> Result<bool> {
    let chain = Arc::new(ProviderFactory::chain_from_config(config).context("Failed to create providers")?);
    println!("Available analyzers:");
    for analyzer in default_analyzers(chain) {
        let enabled = config
            .analysis
            .enabled_analyzers
            .iter()
            .any(|name| name == analyzer.name());
        let name = if enabled {
            analyzer.name().green()
        } else {
            format!("{} (disabled)", analyzer.name()).dimmed()
        };
        println!("  • {}  {}", name, analyzer.description());
    }
    Ok(true)
}

fn cache(action: CacheAction, config: &Config) -> Result<bool> {
    match action {
        CacheAction::Stats => {
            let store = open_store(&config.cache).context("Failed to open cache store")?;
            print_cache_stats(store.as_ref(), config)?;
        }
        CacheAction::Clear => {
            let removed = build_analyzer(config)?.clear_cache().context("Failed to clear cache")?;
            println!("{} Removed {} cached entries.", "[OK]".green(), removed);
        }
    }
    Ok(true)
}

fn print_cache_stats(store: &dyn KeyValueStore, config: &Config) -> Result<()> {
    let stats = store.stats()?;
    println!("{}", "Cache".bold());
    println!("  Enabled:            {}", config.cache.enabled);
    println!(
        "  Location:           {}",
        stats.location.map_or("in memory".to_string(), |p| p.display().to_string())
    );
    println!("  Entries:            {}", stats.entries);
    println!("  Size:               {:.1} KB", stats.size_bytes as f64 / 1024.0);
    if store.supports_scan() {
        println!("  Analyzer responses: {}", store.scan_prefix("analysis:")?.len());
        println!("  Merged results:     {}", store.scan_prefix("result:")?.len());
    }
    println!("  TTL:                {}s", config.cache.ttl);
    println!("  Similarity cutoff:  {}", config.cache.semantic_threshold);
    Ok(())
}

fn init() -> Result<bool> {
    println!("Initializing DevAssist configuration...");
    for path in init_config()? {
        println!("  {} {}", "created".green(), path.display());
    }
    println!("Configuration initialized successfully!");
    Ok(true)
}
