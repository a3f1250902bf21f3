pub mod analysis;
pub mod analyzers;
pub mod app;
pub mod cache;
pub mod cli;
pub mod constants;
pub mod gateway;
pub mod observers;
pub mod providers;
pub mod ratelimit;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;

pub use analysis::{AnalysisRequest, AnalysisResult, CodeAnalyzer, DirectoryOptions, DirectoryReport};
pub use app::{load_config, Config};
pub use gateway::{GatewayResponse, RequestGateway};
pub use providers::{Provider, ProviderChain, ProviderFactory};
pub use utils::AssistantError;
