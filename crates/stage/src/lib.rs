//! Stage layer for flowstage
//!
//! This crate hosts stage logic on top of the session layer:
//! - Processor: the interface stage logic implements
//! - trigger: one invocation inside a fresh session, committed or rolled back
//! - CaseConvert: the text case conversion stage
//! - StageConfig: `flowstage.toml` loading
//! - StageRunner: sequential and concurrent invocation driver

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod case_convert;
pub mod config;
pub mod context;
pub mod error;
pub mod log;
pub mod processor;
pub mod runner;

pub use case_convert::{CaseConvert, CaseMode};
pub use config::{StageConfig, CONFIG_FILE_NAME};
pub use context::{InitializationContext, ProcessContext};
pub use error::{ConfigError, ConfigResult, ProcessorError, ProcessorResult};
pub use log::{ComponentLog, LogEntry, LogLevel, MemoryLog, TracingLog};
pub use processor::{invalid_results, trigger, Processor};
pub use runner::{RunReport, StageRunner, StageRunnerBuilder};
