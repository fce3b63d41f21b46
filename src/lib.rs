//! Grand Search: desktop search that fans one query out to many searchers.
//!
//! A query becomes a [`search_task::TaskCommander`] with one worker per
//! enabled searcher:
//! - **File names**: walks the configured roots with `ignore`, honouring the
//!   blacklist
//! - **Applications**: matches configured launcher entries
//! - **External command**: streams paths printed by a tool such as `locate`
//!
//! Results reach the caller in batches through the task's event stream while
//! the searchers are still running.

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod searchers;

pub use config::GrandSearchConfig;
pub use controller::MainController;
pub use error::{GrandSearchError, Result};
pub use search_task::{MatchedItem, MatchedItemMap, TaskCommander, TaskEvent, TaskEvents};
