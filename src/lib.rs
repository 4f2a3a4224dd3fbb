//! SlowFast Video Library
//!
//! Supervises an external ffmpeg run: launches it, turns its `-progress`
//! output into percentages, supports cooperative cancellation, and reports
//! exactly one terminal outcome per run.
//!
//! ```no_run
//! use slowfast_video::engine::{ProcessSupervisor, RunEvent};
//!
//! # async fn demo() {
//! let command = vec!["ffmpeg".to_string(), "-i".to_string(), "in.mp4".to_string()];
//! let mut run = ProcessSupervisor::new(command, 42.0).start();
//! while let Some(event) = run.next_event().await {
//!     match event {
//!         RunEvent::Progress(percent) => println!("{}%", percent),
//!         RunEvent::Finished(outcome) => println!("{}", outcome),
//!     }
//! }
//! # }
//! ```

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use engine::{
    parse_progress_line, CancellationFlag, ProcessSupervisor, RunEvent, RunHandle, RunOutcome,
    RunState,
};
pub use error::{SlowFastError, SlowFastResult};
