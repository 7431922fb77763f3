//! Sweep orchestration: lifecycle, cancellation and progress messages.
//!
//! A [`Task`] borrows the geometry, so the usual way to run it off the
//! caller's thread is a scoped thread:
//!
//! ```rust,ignore
//! let mut task = Task::new(&mesh, reference, config, None, points)?;
//! let controller = task.controller();
//! std::thread::scope(|scope| {
//!     let worker = scope.spawn(move || task.run());
//!     while let Some(message) = controller.messages().wait_pop(timeout) {
//!         // ...
//!     }
//!     worker.join()
//! });
//! ```

pub mod messages;
pub mod plane_task;
pub mod result;
pub mod status;

// Re-exports
pub use messages::{MessageQueue, TaskMessage};
pub use plane_task::{Task, TaskController};
pub use result::{OperatingPoint, OperatingPointResult};
pub use status::{CancellationToken, SharedStatus, TaskStatus};
