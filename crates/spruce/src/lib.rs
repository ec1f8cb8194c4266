pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod fetch;
pub mod graph;
pub mod model;
pub mod removal;
pub mod report;
pub mod util;

pub use api::{ApiClient, ApiError, JamfClient, ObjectRef, CLIENT_LIBRARY_VERSION};
pub use classify::{ClassifyOptions, CruftReason, CruftRecord};
pub use config::Preferences;
pub use error::{Result, SpruceError};
pub use fetch::{fetch_snapshot, fetch_summaries, required_types};
pub use graph::{build_usage_index, UsageIndex};
pub use model::{ManagedObject, ObjectDetail, ObjectIdentity, ObjectType, Snapshot};
pub use removal::{
    build_plan, execute_plan, RemovalItem, RemovalOutcome, RemovalPlan, RemovalRequest,
    RemovalSummary,
};
pub use report::{build_report, Report, ReportMeta};
