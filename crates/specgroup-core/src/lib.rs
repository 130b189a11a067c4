//! Spectrum and detector grouping.
//!
//! A dataset's rows are combined group by group into a new dataset. Groups
//! come from a template dataset, a flat or XML group file, a compact pattern
//! or one explicit list of spectrum numbers, detector IDs or row indices.

pub mod assembler;
pub mod combine;
pub mod config;
pub mod domain;
pub mod engine;
pub mod grouping;
pub mod progress;
pub mod resolver;
pub mod serialization;

pub use assembler::{GroupingOutput, GroupingSummary};
pub use config::{GroupingRequest, RequestLoadError};
pub use domain::{
    Behaviour, GroupingError, GroupingErrorCategory, GroupingResult, GroupingState, Workspace,
};
pub use engine::{GroupDetectors, GroupingOptions, group_workspace};
pub use grouping::{ExplicitList, GroupingSource};
pub use progress::{CallbackProgress, CancellationToken, NoProgress, ProgressReporter};
pub use serialization::{WorkspaceIoError, read_workspace, write_grouping_output, write_workspace};
