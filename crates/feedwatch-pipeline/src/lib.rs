//! End-to-end execution of one scrape task: scrape every subject, keep only
//! unseen posts, summarize, deliver, and record what was processed.

pub mod bundle;
pub mod error;
pub mod executor;
pub mod filter;
pub mod url;
pub mod wiring;

pub use error::ExecutionError;
pub use executor::{ExecutionOutcome, ExecutorSettings, SkipReason, TaskExecutor, TaskRunner};
pub use filter::NewPostFilter;
pub use url::subject_url;
pub use wiring::build_executor;
