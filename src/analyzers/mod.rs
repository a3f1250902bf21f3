// Gateway module for analyzers - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod documentation;
mod parser;
mod performance;
mod quality;
mod security;
mod traits;
mod types;

// Public re-exports - the ONLY way to access analyzer functionality
pub use documentation::DocumentationAnalyzer;
pub use parser::parse_response;
pub use performance::PerformanceAnalyzer;
pub use quality::QualityAnalyzer;
pub use security::SecurityAnalyzer;
pub use traits::Analyzer;
pub use types::{AnalyzerResult, Issue, Severity};

use std::sync::Arc;

use crate::providers::ProviderChain;

/// The four built-in analyzers, in default execution order
pub fn default_analyzers(chain: Arc<ProviderChain>) -> Vec<Arc<dyn Analyzer>> {
    vec![
        Arc::new(SecurityAnalyzer::new(chain.clone())),
        Arc::new(PerformanceAnalyzer::new(chain.clone())),
        Arc::new(QualityAnalyzer::new(chain.clone())),
        Arc::new(DocumentationAnalyzer::new(chain)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ANALYZER_NAMES;

    #[test]
    fn test_default_order_matches_names() {
        let analyzers = default_analyzers(Arc::new(ProviderChain::new(vec![])));
        let names: Vec<&str> = analyzers.iter().map(|a| a.name()).collect();
        assert_eq!(names, ANALYZER_NAMES);
    }
}
