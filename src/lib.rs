pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::CliArgs;

pub use crate::app::{build_pipeline, HarvestPipeline, RunFlags};
pub use crate::config::{AuthStrategy, Settings, ValueInputOption};
pub use crate::core::orchestrator::{PipelineOrchestrator, RunReport, RunState, ScheduleSummary};
pub use crate::utils::error::{HarvestError, Result, RunFailure, Stage};
