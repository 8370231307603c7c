//! Treetest Flux - Results analytics engine for tree-testing usability studies
//!
//! Flux turns a study snapshot (navigation tree, tasks, participants and their
//! recorded click streams) into usability metrics through a deterministic
//! pipeline: snapshot parsing → tree indexing → data-quality inspection →
//! click-stream scoring → per-task aggregation → tabular export → report
//! encoding.
//!
//! ## Modules
//!
//! - **Tree lookups**: depth map, optimal path length and label resolution
//! - **Scoring**: directness, lostness, backtracking and hesitation per response
//! - **Aggregation**: per-task summaries with per-response detail
//! - **Export**: one flat row per response, rendered as CSV
//! - **Counterbalancing**: seeded or ambient task-order shuffling

pub mod adapter;
pub mod aggregate;
pub mod counterbalance;
pub mod encoder;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod scorer;
pub mod tree;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use adapter::{inspect_snapshot, parse_snapshot, DataQualityIssue};
pub use aggregate::TaskAggregator;
pub use counterbalance::presentation_order;
pub use encoder::{ResultsEncoder, ResultsReport};
pub use error::ComputeError;
pub use export::ResultsExporter;
pub use pipeline::{study_to_csv, study_to_results, ResultsProcessor};
pub use scorer::ClickStreamScorer;
pub use tree::{
    build_depth_map, find_node_label, find_optimal_path_length, task_optimal_path_length,
    PathFinder, PathLookup, TreeIndex,
};
pub use types::{
    ClickAction, ClickEntry, CsvRow, NavigationMetrics, Participant, Response, ResponseDetail,
    StudySnapshot, Task, TaskSummary, TreeNode,
};

/// Flux version embedded in all results reports
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for results reports
pub const PRODUCER_NAME: &str = "treetest-flux";
