pub mod config;
pub mod error;
pub mod graph;
pub mod layout;
pub mod server;
pub mod signaling;
pub mod worker;

pub use config::{AppConfig, Feed, TransportSettings, WorkerSettings};
pub use error::{GridcastError, GridcastResult};
pub use graph::PipelineGraph;
pub use layout::{LayoutSlot, PlannedFeed};
pub use server::AppState;
pub use worker::{StopOutcome, WorkerManager};
