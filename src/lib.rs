pub mod config;
pub mod constants;
pub mod controller;
pub mod error;
pub mod export;
pub mod extractor;
pub mod identity;
pub mod logging;
pub mod metrics;
pub mod normalize;
pub mod orchestrator;
pub mod page;
pub mod transport;
pub mod types;
