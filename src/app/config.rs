use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::constants::{
    ANALYZER_NAMES, ANTHROPIC_PRIORITY, API_KEY_PLACEHOLDERS, DEFAULT_ANTHROPIC_MODEL,
    DEFAULT_CACHE_TTL_SECS, DEFAULT_EXCLUDE_PATTERNS, DEFAULT_GOOGLE_MODEL, DEFAULT_LINTER_COMMAND,
    DEFAULT_MAX_FILES, DEFAULT_MAX_TOKENS, DEFAULT_OPENAI_MODEL, DEFAULT_SEMANTIC_THRESHOLD,
    DEFAULT_SUPPORTED_EXTENSIONS, DEFAULT_TEMPERATURE, FILE_REQUESTS_PER_MINUTE, GOOGLE_PRIORITY,
    HTTP_REQUEST_TIMEOUT_SECS, MAX_CODE_SIZE, MAX_FILE_SIZE, OPENAI_PRIORITY, REQUESTS_PER_HOUR,
    REQUESTS_PER_MINUTE, SIMILARITY_SCAN_LIMIT,
};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Master switch for analysis
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Remote LLM providers
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Code analysis configuration
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Response and result caching
    #[serde(default)]
    pub cache: CacheConfig,

    /// Request gateway rate limits
    #[serde(default)]
    pub rate_limiting: RateLimitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            providers: ProvidersConfig::default(),
            analysis: AnalysisConfig::default(),
            cache: CacheConfig::default(),
            rate_limiting: RateLimitConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Per-provider settings, one block per vendor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "ProviderSettings::openai")]
    pub openai: ProviderSettings,
    #[serde(default = "ProviderSettings::anthropic")]
    pub anthropic: ProviderSettings,
    #[serde(default = "ProviderSettings::google")]
    pub google: ProviderSettings,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: ProviderSettings::openai(),
            anthropic: ProviderSettings::anthropic(),
            google: ProviderSettings::google(),
        }
    }
}

impl ProvidersConfig {
    /// (name, settings) pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ProviderSettings)> {
        [
            ("openai", &self.openai),
            ("anthropic", &self.anthropic),
            ("google", &self.google),
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub enabled: bool,
    /// Inline API key. Leave empty to read `api_key_env` instead
    #[serde(default)]
    pub api_key: String,
    /// Environment variable containing API key
    pub api_key_env: String,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    /// Higher priority providers are tried first
    pub priority: i32,
    /// Override for the vendor endpoint (proxies, test servers)
    #[serde(default)]
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl ProviderSettings {
    fn with(api_key_env: &str, model: &str, priority: i32) -> Self {
        Self {
            enabled: true,
            api_key: String::new(),
            api_key_env: api_key_env.to_string(),
            model: model.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            priority,
            endpoint: None,
            timeout_secs: HTTP_REQUEST_TIMEOUT_SECS,
        }
    }

    pub fn openai() -> Self {
        Self::with("OPENAI_API_KEY", DEFAULT_OPENAI_MODEL, OPENAI_PRIORITY)
    }

    pub fn anthropic() -> Self {
        Self::with("ANTHROPIC_API_KEY", DEFAULT_ANTHROPIC_MODEL, ANTHROPIC_PRIORITY)
    }

    pub fn google() -> Self {
        Self::with("GOOGLE_AI_API_KEY", DEFAULT_GOOGLE_MODEL, GOOGLE_PRIORITY)
    }

    /// The inline key, or the value of `api_key_env` when no inline key is set
    pub fn resolve_api_key(&self) -> Option<String> {
        let inline = self.api_key.trim();
        if !inline.is_empty() {
            return Some(inline.to_string());
        }
        if self.api_key_env.is_empty() {
            return None;
        }
        std::env::var(&self.api_key_env)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Enabled and holding a non-placeholder key
    pub fn is_configured(&self) -> bool {
        self.enabled
            && self
                .resolve_api_key()
                .map(|key| is_api_key_configured(&key))
                .unwrap_or(false)
    }
}

/// Code analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Analyzers run when a request does not name any
    pub enabled_analyzers: Vec<String>,
    /// Maximum file size to analyze (in bytes)
    pub max_file_size: u64,
    /// Maximum inline code size accepted by the gateway (in bytes)
    pub max_code_size: usize,
    /// Substrings of paths skipped during directory analysis
    pub excluded_paths: Vec<String>,
    pub supported_extensions: Vec<String>,
    /// Cap on files analyzed per directory run
    pub max_files: usize,
    /// Run the external linter before any provider call
    pub syntax_check: bool,
    /// Linter program and arguments; the temp file path is appended
    pub linter_command: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled_analyzers: ANALYZER_NAMES.iter().map(|s| s.to_string()).collect(),
            max_file_size: MAX_FILE_SIZE,
            max_code_size: MAX_CODE_SIZE,
            excluded_paths: DEFAULT_EXCLUDE_PATTERNS.iter().map(|s| s.to_string()).collect(),
            supported_extensions: DEFAULT_SUPPORTED_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_files: DEFAULT_MAX_FILES,
            syntax_check: true,
            linter_command: DEFAULT_LINTER_COMMAND.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Persistent store under the platform cache directory
    File,
    /// In-process store, lost on exit
    Memory,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entry lifetime in seconds
    pub ttl: u64,
    /// Minimum similarity for a near-duplicate hit (0.0 - 1.0)
    pub semantic_threshold: f64,
    /// Cached entries compared on an exact miss
    #[serde(default = "default_scan_limit")]
    pub similarity_scan_limit: usize,
    pub backend: CacheBackend,
    /// Overrides the platform cache directory for the file backend
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

fn default_scan_limit() -> usize {
    SIMILARITY_SCAN_LIMIT
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: DEFAULT_CACHE_TTL_SECS,
            semantic_threshold: DEFAULT_SEMANTIC_THRESHOLD,
            similarity_scan_limit: SIMILARITY_SCAN_LIMIT,
            backend: CacheBackend::File,
            directory: None,
        }
    }
}

/// Rate limits applied by the request gateway, per client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub file_requests_per_minute: u32,
    pub requests_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: REQUESTS_PER_MINUTE,
            file_requests_per_minute: FILE_REQUESTS_PER_MINUTE,
            requests_per_hour: REQUESTS_PER_HOUR,
        }
    }
}

/// Load configuration from multiple sources
///
/// Later layers win: defaults, global file, `.devassist/config.toml`,
/// `explicit`, then `DEVASSIST_*` environment variables.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join("config.toml");
        if global_config.exists() {
            figment = figment.merge(Toml::file(&global_config));
        }
    }

    let local_config = PathBuf::from(".devassist/config.toml");
    if local_config.exists() {
        figment = figment.merge(Toml::file(&local_config));
    }

    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }
        figment = figment.merge(Toml::file(path));
    }

    // DEVASSIST_PROVIDERS__OPENAI__MODEL=gpt-4o -> providers.openai.model
    figment = figment.merge(Env::prefixed("DEVASSIST_").split("__"));

    figment
        .extract()
        .context("Failed to load configuration")
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "devassist")
}

fn home_fallback(kind: &str) -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("Could not determine home directory")?;
    Ok(PathBuf::from(home).join(kind).join("devassist"))
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = match project_dirs() {
        Some(dirs) => dirs.config_dir().to_path_buf(),
        None => home_fallback(".config")?,
    };
    std::fs::create_dir_all(&config_dir)?;
    Ok(config_dir)
}

/// Get the directory used by the persistent cache store
pub fn get_cache_dir(config: &CacheConfig) -> Result<PathBuf> {
    let cache_dir = match (&config.directory, project_dirs()) {
        (Some(dir), _) => dir.clone(),
        (None, Some(dirs)) => dirs.cache_dir().to_path_buf(),
        (None, None) => home_fallback(".cache")?,
    };
    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
    Ok(cache_dir)
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<PathBuf> {
    let path = if let Some(p) = path {
        p
    } else {
        get_config_dir()?.join("config.toml")
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(path)
}

/// Create the default global configuration and a project example, returning
/// the files that were written
pub fn init_config() -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();

    let config_file = get_config_dir()?.join("config.toml");
    if !config_file.exists() {
        created.push(save_config(&Config::default(), Some(config_file))?);
    }

    let local_example = PathBuf::from(".devassist/config.toml.example");
    if !local_example.exists() {
        if let Some(parent) = local_example.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let example_config = r#"# devassist project configuration
# Values here override the global configuration for this project.
# You only need ONE provider key to get started.

[providers.openai]
api_key_env = "OPENAI_API_KEY"
model = "gpt-4"

[providers.anthropic]
api_key_env = "ANTHROPIC_API_KEY"

[providers.google]
api_key_env = "GOOGLE_AI_API_KEY"

[analysis]
enabled_analyzers = ["security", "quality"]
excluded_paths = ["vendor/", "var/cache/", "node_modules/"]
max_files = 50

[cache]
ttl = 7200
backend = "file"
"#;
        std::fs::write(&local_example, example_config)?;
        created.push(local_example);
    }

    Ok(created)
}

/// Whether a key is present and not one of the well-known placeholders
pub fn is_api_key_configured(api_key: &str) -> bool {
    let normalized = api_key.trim().to_lowercase();
    !normalized.is_empty() && !API_KEY_PLACEHOLDERS.contains(&normalized.as_str())
}

/// Outcome of [`validate_configuration`]
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ConfigValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Check a loaded configuration for problems that would stop analysis from working
pub fn validate_configuration(config: &Config) -> ConfigValidation {
    let mut report = ConfigValidation::default();

    if !config.providers.iter().any(|(_, p)| p.is_configured()) {
        report
            .errors
            .push("No AI providers are configured. Add at least one API key.".to_string());
        report
            .errors
            .push("Run `devassist health` for setup instructions.".to_string());
    }

    if !config.enabled {
        report.warnings.push("Analysis is disabled (enabled = false).".to_string());
    }

    if config.analysis.enabled_analyzers.is_empty() {
        report
            .warnings
            .push("No analyzers are enabled. Code analysis will not work.".to_string());
    }

    for name in &config.analysis.enabled_analyzers {
        if !ANALYZER_NAMES.contains(&name.as_str()) {
            report
                .warnings
                .push(format!("Unknown analyzer '{}' will be ignored.", name));
        }
    }

    if config.analysis.syntax_check {
        match config.analysis.linter_command.first() {
            Some(program) if which::which(program).is_err() => report.warnings.push(format!(
                "Syntax checker '{}' was not found in PATH; syntax checks will be skipped.",
                program
            )),
            None => report
                .warnings
                .push("Syntax checking is enabled but no linter command is set.".to_string()),
            _ => {}
        }
    }

    if !(0.0..=1.0).contains(&config.cache.semantic_threshold) {
        report.errors.push(format!(
            "cache.semantic_threshold must be between 0.0 and 1.0 (got {}).",
            config.cache.semantic_threshold
        ));
    }

    report
}

/// Where to obtain a key for each provider
#[derive(Debug, Clone, Copy)]
pub struct ProviderInstructions {
    pub id: &'static str,
    pub name: &'static str,
    pub url: &'static str,
    pub key_format: &'static str,
    pub notes: &'static str,
}

pub const PROVIDER_INSTRUCTIONS: &[ProviderInstructions] = &[
    ProviderInstructions {
        id: "openai",
        name: "OpenAI",
        url: "https://platform.openai.com/api-keys",
        key_format: "sk-...",
        notes: "Most reliable, requires billing account",
    },
    ProviderInstructions {
        id: "anthropic",
        name: "Anthropic Claude",
        url: "https://console.anthropic.com/",
        key_format: "sk-ant-...",
        notes: "Excellent for code analysis",
    },
    ProviderInstructions {
        id: "google",
        name: "Google AI",
        url: "https://makersuite.google.com/app/apikey",
        key_format: "AI...",
        notes: "Free tier available",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn keyless() -> Config {
        let mut config = Config::default();
        for settings in [
            &mut config.providers.openai,
            &mut config.providers.anthropic,
            &mut config.providers.google,
        ] {
            settings.api_key_env = String::new();
        }
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.enabled);
        assert_eq!(config.providers.openai.model, "gpt-4");
        assert_eq!(config.providers.anthropic.model, "claude-3-sonnet-20240229");
        assert_eq!(config.providers.google.model, "gemini-pro");
        assert_eq!(config.analysis.enabled_analyzers.len(), 4);
        assert_eq!(config.analysis.max_file_size, 1_048_576);
        assert_eq!(config.cache.ttl, 3600);
        assert_eq!(config.cache.backend, CacheBackend::File);
        assert_eq!(config.rate_limiting.requests_per_minute, 60);
        assert_eq!(config.rate_limiting.requests_per_hour, 1000);
    }

    #[test]
    fn test_placeholder_keys_are_rejected() {
        assert!(!is_api_key_configured(""));
        assert!(!is_api_key_configured("  "));
        assert!(!is_api_key_configured("your_openai_api_key_here"));
        assert!(!is_api_key_configured("CHANGE_ME"));
        assert!(is_api_key_configured("sk-abc123"));
    }

    #[test]
    fn test_resolve_api_key_prefers_inline() {
        let mut settings = ProviderSettings::openai();
        settings.api_key_env = "DEVASSIST_TEST_UNUSED_KEY_VAR".to_string();
        assert_eq!(settings.resolve_api_key(), None);

        settings.api_key = " sk-inline ".to_string();
        assert_eq!(settings.resolve_api_key().as_deref(), Some("sk-inline"));
    }

    #[test]
    fn test_resolve_api_key_from_env() {
        let mut settings = ProviderSettings::google();
        settings.api_key_env = "DEVASSIST_TEST_GOOGLE_KEY".to_string();
        std::env::set_var("DEVASSIST_TEST_GOOGLE_KEY", "AIzaTestKey");
        assert_eq!(settings.resolve_api_key().as_deref(), Some("AIzaTestKey"));
        assert!(settings.is_configured());
        std::env::remove_var("DEVASSIST_TEST_GOOGLE_KEY");
    }

    #[test]
    fn test_validation_requires_a_provider() {
        let report = validate_configuration(&keyless());
        assert!(!report.is_valid());
        assert!(report.errors[0].contains("No AI providers"));

        let mut config = keyless();
        config.providers.anthropic.api_key = "sk-ant-real".to_string();
        config.analysis.syntax_check = false;
        let report = validate_configuration(&config);
        assert!(report.is_valid());
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_validation_warnings() {
        let mut config = keyless();
        config.providers.openai.api_key = "sk-real".to_string();
        config.analysis.enabled_analyzers = vec![];
        config.analysis.linter_command = vec!["devassist-no-such-linter".to_string()];
        let report = validate_configuration(&config);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_load_explicit_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[providers.openai]
model = "gpt-4o"
priority = 5

[analysis]
enabled_analyzers = ["security"]

[cache]
backend = "memory"
"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.providers.openai.model, "gpt-4o");
        assert_eq!(config.providers.openai.priority, 5);
        // untouched fields keep their defaults
        assert_eq!(config.providers.openai.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.analysis.enabled_analyzers, vec!["security"]);
        assert_eq!(config.cache.backend, CacheBackend::Memory);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_config(Some(&temp_dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_save_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.cache.ttl = 42;
        let path = save_config(&config, Some(temp_dir.path().join("nested/config.toml"))).unwrap();

        let loaded: Config = toml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(loaded.cache.ttl, 42);
        assert_eq!(loaded.providers.google.api_key_env, "GOOGLE_AI_API_KEY");
    }
}
