use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use super::traits::AnalysisObserver;
use crate::analysis::{AnalysisRequest, AnalysisResult};
use crate::constants::{LARGE_INPUT_THRESHOLD, SLOW_ANALYSIS_THRESHOLD_SECS};
use crate::utils::AssistantError;

/// Running totals since the monitor was created
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub analyses: u64,
    pub cached: u64,
    pub failed: u64,
    pub large_inputs: u64,
    pub slow_analyses: u64,
    pub total_time_ms: u64,
    pub slowest_ms: u64,
}

impl PerformanceStats {
    pub fn average_time_ms(&self) -> f64 {
        if self.analyses == 0 {
            0.0
        } else {
            self.total_time_ms as f64 / self.analyses as f64
        }
    }
}

/// Flags large inputs and slow analyses
pub struct PerformanceMonitor {
    large_input_bytes: usize,
    slow_threshold: Duration,
    stats: Mutex<PerformanceStats>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::with_thresholds(
            LARGE_INPUT_THRESHOLD,
            Duration::from_secs_f64(SLOW_ANALYSIS_THRESHOLD_SECS),
        )
    }

    pub fn with_thresholds(large_input_bytes: usize, slow_threshold: Duration) -> Self {
        Self {
            large_input_bytes,
            slow_threshold,
            stats: Mutex::new(PerformanceStats::default()),
        }
    }

    pub fn stats(&self) -> PerformanceStats {
        self.stats.lock().clone()
    }
}

impl AnalysisObserver for PerformanceMonitor {
    fn before_analysis(&self, request: &AnalysisRequest) {
        let code_length = request.code().len();
        if code_length > self.large_input_bytes {
            self.stats.lock().large_inputs += 1;
            warn!(
                filename = request.filename(),
                code_length,
                size_mb = (code_length as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0,
                "Analyzing large file, performance may be impacted"
            );
        }
    }

    fn after_analysis(&self, request: &AnalysisRequest, result: &AnalysisResult, elapsed: Duration) {
        let elapsed_ms = elapsed.as_millis() as u64;

        {
            let mut stats = self.stats.lock();
            stats.analyses += 1;
            stats.total_time_ms += elapsed_ms;
            stats.slowest_ms = stats.slowest_ms.max(elapsed_ms);
            if result.cached {
                stats.cached += 1;
            }
            if elapsed > self.slow_threshold {
                stats.slow_analyses += 1;
            }
        }

        let analyzer_count = result.analyzers.len().max(1) as u64;
        info!(
            filename = request.filename(),
            total_time_ms = elapsed_ms,
            execution_time_ms = result.execution_time_ms,
            overhead_ms = elapsed_ms.saturating_sub(result.execution_time_ms),
            time_per_analyzer_ms = result.execution_time_ms / analyzer_count,
            "Analysis performance metrics"
        );

        if elapsed > self.slow_threshold {
            warn!(
                filename = request.filename(),
                total_time_ms = elapsed_ms,
                threshold_ms = self.slow_threshold.as_millis() as u64,
                "Slow analysis detected"
            );
        }
    }

    fn analysis_failed(&self, _request: &AnalysisRequest, _error: &AssistantError) {
        self.stats.lock().failed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_large_and_slow() {
        let monitor = PerformanceMonitor::with_thresholds(10, Duration::ZERO);
        let request = AnalysisRequest::new("<?php echo 'longer than ten';", "a.php").unwrap();

        monitor.before_analysis(&request);
        monitor.after_analysis(
            &request,
            &AnalysisResult::new("a.php", request.code()),
            Duration::from_millis(2),
        );

        let stats = monitor.stats();
        assert_eq!(stats.analyses, 1);
        assert_eq!(stats.large_inputs, 1);
        assert_eq!(stats.slow_analyses, 1);
        assert!(stats.slowest_ms >= 2);
    }

    #[test]
    fn test_overlapping_runs_of_same_file_are_each_counted() {
        let monitor = PerformanceMonitor::with_thresholds(1024, Duration::from_millis(50));
        let first = AnalysisRequest::new("<?php echo 1;", "").unwrap();
        let second = AnalysisRequest::new("<?php echo 2;", "").unwrap();

        monitor.before_analysis(&first);
        monitor.before_analysis(&second);
        monitor.after_analysis(&first, &AnalysisResult::new("", first.code()), Duration::from_millis(10));
        monitor.after_analysis(&second, &AnalysisResult::new("", second.code()), Duration::from_millis(80));

        let stats = monitor.stats();
        assert_eq!(stats.analyses, 2);
        assert_eq!(stats.total_time_ms, 90);
        assert_eq!(stats.slowest_ms, 80);
        assert_eq!(stats.slow_analyses, 1);
        assert_eq!(stats.average_time_ms(), 45.0);
    }

    #[test]
    fn test_failures_are_counted() {
        let monitor = PerformanceMonitor::new();
        let request = AnalysisRequest::new("x", "a.php").unwrap();
        monitor.before_analysis(&request);
        monitor.analysis_failed(&request, &AssistantError::EmptyCode);

        let stats = monitor.stats();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.analyses, 0);
        assert_eq!(stats.average_time_ms(), 0.0);
    }
}
