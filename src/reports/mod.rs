//! Report generation: job engine, mock dataset, analysis synthesis, format
//! writers and the in-memory artifact store.
//!
//! ```text
//! ReportConfig ─► submit ─► [20] dataset ─► [40] stats ─► [60] analysis?
//!                                 ─► [80] writer dispatch ─► [100] artifact
//! ```

pub mod analysis;
pub mod artifacts;
pub mod dataset;
mod engine;
mod error;
pub mod writers;

pub use analysis::synthesize;
pub use artifacts::{Artifact, ArtifactStore, ReportDownload};
pub use dataset::{ColumnStats, DatasetRow, ReportDataset};
pub use engine::{ReportEngine, ReportEngineBuilder, CANCELLED_MESSAGE};
pub use error::ReportError;
pub use writers::{ReportWriter, WriteContext, WriterRegistry};
