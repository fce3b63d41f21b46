//! Built-in search workers.
//!
//! | Searcher | Line | Groups |
//! |---|---|---|
//! | [`FileNameSearcher`] | parallel | `file`, `folder` |
//! | [`ApplicationSearcher`] | parallel | `application` |
//! | [`CommandSearcher`] | sequential | configurable, `file` by default |

pub mod application;
pub mod buffer;
pub mod command;
pub mod file;

pub use application::{APPLICATION_GROUP, ApplicationSearcher};
pub use buffer::WorkerBuffer;
pub use command::CommandSearcher;
pub use file::{FILE_GROUP, FOLDER_GROUP, FileNameSearcher};
