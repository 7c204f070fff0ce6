pub mod config;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod ingestion;
pub mod render;
pub mod scene;
pub mod types;

pub use config::{CliArgs, ViewerConfig};
pub use error::{Result, ViewerError};
pub use gpu::{GraphicsContext, RecordingContext};
pub use scene::{FrameStats, RunSummary, Viewer, run_headless};
pub use types::{BoundingBox, ColoringMode, TriangleMesh};
