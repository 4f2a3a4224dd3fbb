//! Core supervision engine
//!
//! [`progress`] turns ffmpeg `-progress` lines into percentages and defines
//! the observer interface; [`supervisor`] runs the external process and
//! reports exactly one [`RunOutcome`] per run.

pub mod progress;
pub mod supervisor;

pub use progress::{parse_progress_line, ConsoleObserver, JsonObserver, RunObserver, PROGRESS_KEY};
pub use supervisor::{
    CancellationFlag, ProcessSupervisor, RunEvent, RunHandle, RunOutcome, RunState, PROCESS_FAILED,
};
