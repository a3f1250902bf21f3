// Gateway module for analysis - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod coordinator;
mod request;
mod result;
mod validator;

// Public re-exports - the ONLY way to access analysis functionality
pub use coordinator::CodeAnalyzer;
pub use request::AnalysisRequest;
pub use result::{
    AnalysisMetrics, AnalysisResult, AnalyzerError, DirectoryOptions, DirectoryReport, FileOutcome,
    IssueSummary, RiskLevel,
};
pub use validator::{CommandSyntaxChecker, InputValidator, NoopSyntaxChecker, SyntaxChecker};
