use async_trait::async_trait;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::app::AnalysisConfig;
use crate::constants::SYNTAX_CHECK_TIMEOUT_SECS;
use crate::utils::AssistantError;

/// External syntax check run before any provider call
#[async_trait]
pub trait SyntaxChecker: Send + Sync {
    fn name(&self) -> &str;

    /// `Err(InvalidSyntax)` when the checker rejects the code
    async fn check(&self, code: &str) -> Result<(), AssistantError>;
}

/// Accepts everything
pub struct NoopSyntaxChecker;

#[async_trait]
impl SyntaxChecker for NoopSyntaxChecker {
    fn name(&self) -> &str {
        "none"
    }

    async fn check(&self, _code: &str) -> Result<(), AssistantError> {
        Ok(())
    }
}

/// Runs a linter on a temp file holding the code: exit 0 is valid, anything
/// else is invalid with the captured output as the reason. A linter that is
/// missing, fails to start or times out is skipped with a warning.
pub struct CommandSyntaxChecker {
    program: String,
    args: Vec<String>,
    /// Prepended (with a newline) to fragments that do not start with it
    open_tag: Option<String>,
    timeout: Duration,
}

impl CommandSyntaxChecker {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            open_tag: None,
            timeout: Duration::from_secs(SYNTAX_CHECK_TIMEOUT_SECS),
        }
    }

    /// `[program, args...]`; `None` for an empty command. `php` gets the
    /// `<?php` open tag added to bare fragments.
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        let checker = Self::new(program.clone(), args.to_vec());
        let is_php = Path::new(program)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .is_some_and(|stem| stem == "php");
        Some(if is_php { checker.with_open_tag("<?php") } else { checker })
    }

    pub fn with_open_tag(mut self, tag: &str) -> Self {
        self.open_tag = Some(tag.to_string());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_installed(&self) -> bool {
        which::which(&self.program).is_ok()
    }

    fn source_for(&self, code: &str) -> String {
        match &self.open_tag {
            Some(tag) if !code.contains(tag.as_str()) && !code.contains("<?=") => {
                format!("{}\n{}", tag, code)
            }
            _ => code.to_string(),
        }
    }
}

#[async_trait]
impl SyntaxChecker for CommandSyntaxChecker {
    fn name(&self) -> &str {
        &self.program
    }

    async fn check(&self, code: &str) -> Result<(), AssistantError> {
        if !self.is_installed() {
            warn!(linter = %self.program, "Syntax checker not found, skipping syntax check");
            return Ok(());
        }

        let mut file = tempfile::Builder::new()
            .prefix("devassist_syntax_")
            .suffix(".php")
            .tempfile()?;
        file.write_all(self.source_for(code).as_bytes())?;
        file.flush()?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(linter = %self.program, "Failed to run syntax checker, skipping: {}", e);
                return Ok(());
            }
            Err(_) => {
                warn!(
                    linter = %self.program,
                    timeout_secs = self.timeout.as_secs(),
                    "Syntax check timed out, skipping"
                );
                return Ok(());
            }
        };

        if output.status.success() {
            debug!(linter = %self.program, "Syntax check passed");
            return Ok(());
        }

        let mut message = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            if !message.is_empty() {
                message.push('\n');
            }
            message.push_str(stderr.trim());
        }
        if message.is_empty() {
            message = format!("{} exited with {}", self.program, output.status);
        }
        Err(AssistantError::InvalidSyntax(message))
    }
}

/// Input checks shared by every coordinator entry point
pub struct InputValidator {
    checker: Arc<dyn SyntaxChecker>,
    max_code_size: usize,
    max_file_size: u64,
    supported_extensions: Vec<String>,
}

impl InputValidator {
    pub fn new(checker: Arc<dyn SyntaxChecker>, config: &AnalysisConfig) -> Self {
        Self {
            checker,
            max_code_size: config.max_code_size,
            max_file_size: config.max_file_size,
            supported_extensions: config
                .supported_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    /// Linter from `linter_command`, or none when `syntax_check` is off
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let checker: Arc<dyn SyntaxChecker> = match CommandSyntaxChecker::from_command(&config.linter_command) {
            Some(checker) if config.syntax_check => Arc::new(checker),
            _ => Arc::new(NoopSyntaxChecker),
        };
        Self::new(checker, config)
    }

    pub fn supported_extensions(&self) -> &[String] {
        &self.supported_extensions
    }

    pub fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.supported_extensions.contains(&ext.to_lowercase()))
    }

    pub async fn validate_code(&self, code: &str) -> Result<(), AssistantError> {
        if code.trim().is_empty() {
            return Err(AssistantError::EmptyCode);
        }
        if code.len() > self.max_code_size {
            return Err(AssistantError::CodeTooLarge {
                size: code.len(),
                max: self.max_code_size,
            });
        }
        self.checker.check(code).await
    }

    /// Exists, is a readable regular file, within the size ceiling, supported extension
    pub fn validate_file(&self, path: &Path) -> Result<(), AssistantError> {
        let metadata = match std::fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AssistantError::FileNotFound(path.to_path_buf()))
            }
            Err(source) => {
                return Err(AssistantError::FileNotReadable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        if !metadata.is_file() {
            return Err(AssistantError::FileNotReadable {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        if metadata.len() > self.max_file_size {
            return Err(AssistantError::FileTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                max: self.max_file_size,
            });
        }

        if !self.is_supported(path) {
            return Err(AssistantError::UnsupportedFileType {
                path: PathBuf::from(path),
                supported: self.supported_extensions.clone(),
            });
        }

        Ok(())
    }
}
