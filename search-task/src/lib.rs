//! # search-task
//!
//! Orchestrates one search query across a set of pluggable workers.
//!
//! A [`TaskCommander`] owns the workers joined to it and runs them on two
//! execution lines:
//!
//! - async-discipline workers run one after another, in join order, on a
//!   dedicated thread (for sources with shared external state or rate
//!   limits); each may keep producing on its own thread after its call
//!   returns
//! - sync-discipline workers run concurrently on the blocking pool, bounded
//!   by [`TaskConfig::max_parallel_workers`]
//!
//! Workers publish partial results from whatever thread they run on. The
//! task merges them into a cumulative result map plus an unread buffer and
//! tells the consumer, through [`TaskEvents`], when the buffer becomes
//! non-empty and when the whole task is finished.
//!
//! ## Example
//!
//! ```no_run
//! # async fn example(workers: Vec<Box<dyn search_task::SearchWorker>>) {
//! use search_task::{TaskCommander, TaskEvent};
//!
//! let task = TaskCommander::new("report");
//! for worker in workers {
//!     task.join(worker);
//! }
//! let mut events = task.take_events().expect("fresh task");
//! task.start();
//! while let Some(event) = events.recv().await {
//!     match event {
//!         TaskEvent::Matched => println!("{:?}", task.read_buffer()),
//!         TaskEvent::Finished => break,
//!     }
//! }
//! # }
//! ```

pub mod config;
pub mod error;
pub mod event;
mod line;
mod registry;
pub mod store;
pub mod task;
pub mod types;
pub mod worker;

pub use config::TaskConfig;
pub use error::{Result, TaskError};
pub use event::{TaskEvent, TaskEvents};
pub use store::{merge, ResultStore};
pub use task::{Destruction, TaskCommander, TaskState};
pub use types::{is_empty_map, item_count, MatchedItem, MatchedItemMap};
pub use worker::{SearchWorker, WorkerId, WorkerNotifier};
