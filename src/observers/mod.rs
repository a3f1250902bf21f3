// Gateway module for observers - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod failures;
mod logging;
mod performance;
mod traits;

// Public re-exports - the ONLY way to access observer functionality
pub use failures::{ProviderFailureTracker, ProviderHealth};
pub use logging::LoggingObserver;
pub use performance::{PerformanceMonitor, PerformanceStats};
pub use traits::AnalysisObserver;
