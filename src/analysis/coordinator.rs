use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use super::request::AnalysisRequest;
use super::result::{AnalysisResult, DirectoryOptions, DirectoryReport};
use super::validator::InputValidator;
use crate::analyzers::{default_analyzers, Analyzer, Issue};
use crate::app::Config;
use crate::cache::{CacheMetrics, ResponseCache, ResultCache};
use crate::observers::AnalysisObserver;
use crate::providers::{ProviderChain, ProviderFactory, RequestOptions};
use crate::store::KeyValueStore;
use crate::utils::{code_fingerprint, sha256_hex, AssistantError};

const RESULT_NAMESPACE: &str = "result";

/// Validates input, consults the result cache, runs the selected analyzers
/// one after another and merges what they report.
pub struct CodeAnalyzer {
    chain: Arc<ProviderChain>,
    analyzers: Vec<Arc<dyn Analyzer>>,
    /// Used when a request names no analyzers
    default_selection: Vec<String>,
    response_cache: ResponseCache,
    result_cache: ResultCache,
    validator: InputValidator,
    observers: Vec<Arc<dyn AnalysisObserver>>,
}

impl CodeAnalyzer {
    pub fn new(
        chain: Arc<ProviderChain>,
        analyzers: Vec<Arc<dyn Analyzer>>,
        response_cache: ResponseCache,
        result_cache: ResultCache,
        validator: InputValidator,
    ) -> Self {
        let default_selection = analyzers.iter().map(|a| a.name().to_string()).collect();
        Self {
            chain,
            analyzers,
            default_selection,
            response_cache,
            result_cache,
            validator,
            observers: Vec::new(),
        }
    }

    /// Wire everything from configuration over a shared store. Observers see
    /// both analysis events and provider failures.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        observers: Vec<Arc<dyn AnalysisObserver>>,
    ) -> Result<Self, AssistantError> {
        let chain = Arc::new(ProviderFactory::chain_from_config(config)?.with_observers(observers.clone()));
        let analyzers = default_analyzers(chain.clone());
        let response_cache = ResponseCache::from_config(store.clone(), &config.cache);
        let result_cache = ResultCache::from_config(store, RESULT_NAMESPACE, &config.cache);

        let analyzer = Self::new(
            chain,
            analyzers,
            response_cache,
            result_cache,
            InputValidator::from_config(&config.analysis),
        )
        .with_default_selection(config.analysis.enabled_analyzers.clone())
        .with_observers(observers);
        Ok(analyzer)
    }

    /// Names that match no registered analyzer are dropped
    pub fn with_default_selection(mut self, names: Vec<String>) -> Self {
        let (known, unknown): (Vec<String>, Vec<String>) = names
            .into_iter()
            .partition(|name| self.analyzers.iter().any(|a| a.name() == name.as_str()));
        if !unknown.is_empty() {
            warn!(ignored = ?unknown, "Ignoring unknown analyzers in configuration");
        }
        self.default_selection = known;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn AnalysisObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn with_observers(mut self, observers: impl IntoIterator<Item = Arc<dyn AnalysisObserver>>) -> Self {
        self.observers.extend(observers);
        self
    }

    pub fn chain(&self) -> &ProviderChain {
        &self.chain
    }

    pub fn validator(&self) -> &InputValidator {
        &self.validator
    }

    /// Registered analyzers, in execution order
    pub fn analyzer_names(&self) -> Vec<String> {
        self.analyzers.iter().map(|a| a.name().to_string()).collect()
    }

    pub fn analyzer_descriptions(&self) -> Vec<(String, String)> {
        self.analyzers
            .iter()
            .map(|a| (a.name().to_string(), a.description().to_string()))
            .collect()
    }

    pub fn cache_metrics(&self) -> CacheMetrics {
        self.response_cache.metrics()
    }

    /// Drop cached analyzer responses and merged results
    pub fn clear_cache(&self) -> Result<usize, AssistantError> {
        let removed = self.response_cache.clear()? + self.result_cache.clear()?;
        info!(removed, "Cleared analysis cache");
        Ok(removed)
    }

    pub async fn analyze_code(
        &self,
        code: &str,
        filename: &str,
        analyzers: Option<&[String]>,
    ) -> Result<AnalysisResult, AssistantError> {
        let mut request = AnalysisRequest::new(code, filename)?;
        if let Some(names) = analyzers {
            request = request.with_analyzers(names.iter().cloned())?;
        }
        self.analyze(&request).await
    }

    pub async fn analyze_file(
        &self,
        path: &Path,
        analyzers: Option<&[String]>,
    ) -> Result<AnalysisResult, AssistantError> {
        self.analyze_path(path, analyzers, true).await
    }

    async fn analyze_path(
        &self,
        path: &Path,
        analyzers: Option<&[String]>,
        use_cache: bool,
    ) -> Result<AnalysisResult, AssistantError> {
        if let Err(e) = self.validator.validate_file(path) {
            warn!(file = %path.display(), "File rejected: {}", e);
            return Err(e);
        }

        let code = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| AssistantError::FileNotReadable {
                path: path.to_path_buf(),
                source,
            })?;

        let mut request = AnalysisRequest::new(code, path.display().to_string())?.with_caching(use_cache)?;
        if let Some(names) = analyzers {
            request = request.with_analyzers(names.iter().cloned())?;
        }
        self.analyze(&request).await
    }

    /// Run one request end to end
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AssistantError> {
        for observer in &self.observers {
            observer.before_analysis(request);
        }
        let started = Instant::now();

        match self.run(request).await {
            Ok(result) => {
                for observer in &self.observers {
                    observer.after_analysis(request, &result, started.elapsed());
                }
                Ok(result)
            }
            Err(e) => {
                if e.is_client_error() {
                    warn!(filename = request.filename(), "Invalid code provided for analysis: {}", e);
                } else {
                    error!(filename = request.filename(), "Analysis failed: {}", e);
                }
                for observer in &self.observers {
                    observer.analysis_failed(request, &e);
                }
                Err(e)
            }
        }
    }

    async fn run(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AssistantError> {
        self.validator.validate_code(request.code()).await?;
        let selected = self.select(request)?;

        let cache_key = Self::result_key(request, &selected);
        if request.use_cache() {
            if let Some(mut cached) = self.result_cache.get::<AnalysisResult>(&cache_key) {
                debug!(filename = request.filename(), "Using cached analysis result");
                cached.cached = true;
                return Ok(cached);
            }
        }

        info!(
            filename = request.filename(),
            analyzers = ?selected.iter().map(|a| a.name()).collect::<Vec<_>>(),
            code_length = request.code().len(),
            "Starting code analysis"
        );

        let started = Instant::now();
        let options = request.request_options();
        let mut result = AnalysisResult::new(request.filename(), request.code());

        for analyzer in selected {
            let name = analyzer.name();

            if request.use_cache() {
                if let Some(cached) = self.response_cache.lookup(request.code(), name) {
                    result.merge(cached);
                    continue;
                }
            }

            match analyzer.analyze(request.code(), request.filename(), &options).await {
                Ok(analyzer_result) => {
                    if request.use_cache() && !analyzer_result.is_error() {
                        self.response_cache.store(request.code(), name, &analyzer_result);
                    }
                    result.merge(analyzer_result);
                }
                Err(e) if e.is_infrastructure() => {
                    return Err(AssistantError::analysis(request.filename(), Some(name), e));
                }
                Err(e) => {
                    warn!(analyzer = name, filename = request.filename(), "Analyzer failed: {}", e);
                    result.record_error(name, e.to_string());
                }
            }
        }

        result.execution_time_ms = started.elapsed().as_millis() as u64;

        // partial results are not cached so a retry can fill the gaps
        if request.use_cache() && result.is_successful() {
            self.result_cache.set(&cache_key, &result);
        }

        info!(
            filename = request.filename(),
            total_issues = result.summary.total,
            risk = %result.risk_level,
            execution_time_ms = result.execution_time_ms,
            "Analysis completed"
        );
        Ok(result)
    }

    /// Requested analyzers in registration order; unknown names are rejected
    fn select(&self, request: &AnalysisRequest) -> Result<Vec<&Arc<dyn Analyzer>>, AssistantError> {
        let wanted: &[String] = if request.enabled_analyzers().is_empty() {
            &self.default_selection
        } else {
            request.enabled_analyzers()
        };

        if let Some(unknown) = wanted
            .iter()
            .find(|name| !self.analyzers.iter().any(|a| a.name() == name.as_str()))
        {
            return Err(AssistantError::InvalidRequest(format!(
                "Unknown analyzer '{}'. Available: {}",
                unknown,
                self.analyzer_names().join(", ")
            )));
        }

        Ok(self
            .analyzers
            .iter()
            .filter(|a| wanted.iter().any(|name| name == a.name()))
            .collect())
    }

    fn result_key(request: &AnalysisRequest, selected: &[&Arc<dyn Analyzer>]) -> String {
        let mut names: Vec<&str> = selected.iter().map(|a| a.name()).collect();
        names.sort_unstable();
        let material = json!({
            "code_hash": code_fingerprint(request.code()),
            "filename": request.filename(),
            "analyzers": names,
            "options": request.options(),
        });
        sha256_hex(material.to_string())
    }

    /// Walk a directory and analyze each supported file. Per-file failures
    /// are recorded in the report instead of aborting the walk.
    pub async fn analyze_directory(
        &self,
        dir: &Path,
        options: &DirectoryOptions,
    ) -> Result<DirectoryReport, AssistantError> {
        if !dir.is_dir() {
            return Err(AssistantError::DirectoryNotFound(dir.to_path_buf()));
        }

        let files = self.collect_files(dir, options);
        if files.len() > options.max_files {
            warn!(
                directory = %dir.display(),
                total_files = files.len(),
                max_files = options.max_files,
                "Directory contains too many files, limiting analysis"
            );
        }

        let analyzers = (!options.analyzers.is_empty()).then_some(options.analyzers.as_slice());
        let mut report = DirectoryReport::new(dir.to_path_buf());

        for path in files.into_iter().take(options.max_files) {
            let relative = relative_name(dir, &path);
            let outcome = self
                .analyze_path(&path, analyzers, options.use_cache)
                .await
                .map_err(|e| {
                    warn!(file = %path.display(), "Failed to analyze file in directory: {}", e);
                    e.to_string()
                });
            report.record(relative, outcome);
        }

        info!(
            directory = %dir.display(),
            files_analyzed = report.files_analyzed,
            total_issues = report.total_issues,
            "Directory analysis completed"
        );
        Ok(report)
    }

    /// Supported, non-excluded files under `dir`, sorted
    fn collect_files(&self, dir: &Path, options: &DirectoryOptions) -> Vec<PathBuf> {
        let mut walker = ignore::WalkBuilder::new(dir);
        walker.hidden(false).git_ignore(true).git_global(false).parents(false);
        if !options.recursive {
            walker.max_depth(Some(1));
        }

        let mut files: Vec<PathBuf> = walker
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.into_path()),
                Err(e) => {
                    warn!(directory = %dir.display(), "Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|path| path.is_file() && self.validator.is_supported(path))
            .filter(|path| {
                let relative = relative_name(dir, path);
                !options
                    .exclude_patterns
                    .iter()
                    .any(|pattern| !pattern.is_empty() && relative.contains(pattern.as_str()))
            })
            .collect();
        files.sort();
        files
    }

    /// Ask for free-form improvement suggestions; `None` on any failure
    pub async fn suggestions(&self, code: &str, issues: &[Issue]) -> Option<String> {
        let issues_json = serde_json::to_string_pretty(issues).ok()?;
        let prompt = format!(
            "Analyze this code and provide improvement suggestions:\n\n{}\n\nIssues found:\n{}",
            code, issues_json
        );
        match self.chain.request(&prompt, &RequestOptions::default()).await {
            Ok(text) => Some(text),
            Err(e) => {
                debug!("AI suggestions unavailable: {}", e);
                None
            }
        }
    }
}

/// Path relative to `root` with `/` separators
fn relative_name(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
