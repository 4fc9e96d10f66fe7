pub mod aggregate;
pub mod analysis;
pub mod config;
pub mod engine;
pub mod error;
pub mod progress;
pub mod scanner;
pub mod scheduler;
pub mod size;
pub mod storage;
pub mod tools;

pub use aggregate::{Candidate, Inventory, OverviewReport, Statistics};
pub use config::AppSettings;
pub use engine::Orchestrator;
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
pub use scheduler::{CandidateFailure, ScanRun, ScanSummary};
pub use tools::{ScriptRunner, Tool, ToolOutput, ToolRunner};
