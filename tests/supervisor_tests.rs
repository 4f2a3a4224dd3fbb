//! Integration tests for the process supervisor, using `sh` scripts as the
//! external process.
#![cfg(unix)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use slowfast_video::engine::{
    ProcessSupervisor, RunEvent, RunHandle, RunObserver, RunOutcome, RunState, PROCESS_FAILED,
};

// Test utilities

const TEST_TIMEOUT: Duration = Duration::from_secs(20);

fn sh(script: &str) -> Vec<String> {
    vec!["sh".to_string(), "-c".to_string(), script.to_string()]
}

/// Drain every event of a run, bounded by a timeout
async fn collect(mut handle: RunHandle) -> Vec<RunEvent> {
    tokio::time::timeout(TEST_TIMEOUT, async move {
        let mut events = Vec::new();
        while let Some(event) = handle.next_event().await {
            events.push(event);
        }
        events
    })
    .await
    .expect("run did not finish in time")
}

fn progress_of(events: &[RunEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            RunEvent::Progress(percent) => Some(*percent),
            RunEvent::Finished(_) => None,
        })
        .collect()
}

fn assert_single_terminal_last(events: &[RunEvent]) {
    let terminals = events
        .iter()
        .filter(|event| matches!(event, RunEvent::Finished(_)))
        .count();
    assert_eq!(terminals, 1, "events: {:?}", events);
    assert!(matches!(events.last(), Some(RunEvent::Finished(_))));
}

// Scenarios

#[tokio::test]
async fn test_successful_run_reports_progress_then_completed() {
    let handle = ProcessSupervisor::new(
        sh("echo frame=120; echo out_time=00:00:05.000000; echo progress=end"),
        10.0,
    )
    .start();

    let events = collect(handle).await;
    assert_eq!(
        events,
        vec![RunEvent::Progress(50), RunEvent::Finished(RunOutcome::Completed)]
    );
}

#[tokio::test]
async fn test_missing_executable_fails_immediately() {
    let handle = ProcessSupervisor::new(
        vec!["/nonexistent/path/to/ffmpeg".to_string(), "-version".to_string()],
        10.0,
    )
    .start();

    let events = collect(handle).await;
    assert_eq!(events.len(), 1);
    match &events[0] {
        RunEvent::Finished(RunOutcome::Failed { message }) => {
            assert!(message.contains("failed to launch"), "message: {}", message);
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_cancel_mid_run() {
    let mut handle = ProcessSupervisor::new(
        sh("echo out_time=00:00:09.000000; exec sleep 30"),
        10.0,
    )
    .start();

    let first = tokio::time::timeout(TEST_TIMEOUT, handle.next_event())
        .await
        .unwrap();
    assert_eq!(first, Some(RunEvent::Progress(90)));

    handle.cancel();
    let rest = collect(handle).await;
    assert_eq!(rest, vec![RunEvent::Finished(RunOutcome::Canceled)]);
}

#[tokio::test]
async fn test_nonzero_exit_fails() {
    let handle = ProcessSupervisor::new(sh("echo out_time=00:00:01.000000; exit 2"), 10.0).start();

    let events = collect(handle).await;
    assert_single_terminal_last(&events);
    assert_eq!(progress_of(&events), vec![10]);
    match events.last() {
        Some(RunEvent::Finished(RunOutcome::Failed { message })) => {
            assert!(message.starts_with(PROCESS_FAILED), "message: {}", message);
            assert!(message.contains('2'), "message: {}", message);
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }
}

// Properties

#[tokio::test]
async fn test_failure_message_carries_last_diagnostic_line() {
    let handle = ProcessSupervisor::new(
        sh("echo 'first problem' >&2; echo 'Conversion failed!' >&2; exit 3"),
        10.0,
    )
    .with_diagnostics(true)
    .start();

    let events = collect(handle).await;
    match events.last() {
        Some(RunEvent::Finished(RunOutcome::Failed { message })) => {
            assert!(message.starts_with(PROCESS_FAILED), "message: {}", message);
            assert!(message.ends_with(": Conversion failed!"), "message: {}", message);
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }
}

#[tokio::test]
async fn test_diagnostics_are_discarded_by_default() {
    let handle = ProcessSupervisor::new(sh("echo 'noise' >&2; exit 1"), 10.0).start();

    let events = collect(handle).await;
    match events.last() {
        Some(RunEvent::Finished(RunOutcome::Failed { message })) => {
            assert!(!message.contains("noise"), "message: {}", message);
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }
}

#[tokio::test]
async fn test_progress_follows_output_order_and_is_clamped() {
    let script = "echo out_time=00:00:01.000000; \
                  echo out_time_ms=1000000; \
                  echo out_time=N/A; \
                  echo out_time=00:00:02.500000; \
                  echo bitrate=1000kbits/s; \
                  echo out_time=00:00:04.000000; \
                  echo out_time=00:00:04.100000; \
                  echo progress=end";
    let handle = ProcessSupervisor::new(sh(script), 4.0).start();

    let events = collect(handle).await;
    assert_single_terminal_last(&events);
    let progress = progress_of(&events);
    assert_eq!(progress, vec![25, 62, 100, 100]);
    assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(events.last(), Some(&RunEvent::Finished(RunOutcome::Completed)));
}

#[tokio::test]
async fn test_non_utf8_output_is_ignored() {
    let handle = ProcessSupervisor::new(
        sh("printf 'junk \\377\\n'; echo out_time=00:00:05.000000; exit 0"),
        10.0,
    )
    .start();

    let events = collect(handle).await;
    assert_eq!(
        events,
        vec![RunEvent::Progress(50), RunEvent::Finished(RunOutcome::Completed)]
    );
}

#[tokio::test]
async fn test_unknown_duration_reports_no_progress() {
    let handle = ProcessSupervisor::new(sh("echo out_time=00:00:05.000000"), 0.0).start();

    let events = collect(handle).await;
    assert_eq!(events, vec![RunEvent::Finished(RunOutcome::Completed)]);
}

#[tokio::test]
async fn test_cancel_before_exit_wins_over_success() {
    let handle = ProcessSupervisor::new(sh("sleep 1; exit 0"), 10.0).start();
    handle.cancel();

    let events = collect(handle).await;
    assert_eq!(events, vec![RunEvent::Finished(RunOutcome::Canceled)]);
}

#[tokio::test]
async fn test_cancel_before_first_read_discards_buffered_output() {
    // The run task cannot start before the test yields, so the flag is
    // already set when the first line is examined.
    let handle = ProcessSupervisor::new(
        sh("echo out_time=00:00:05.000000; echo out_time=00:00:06.000000; exit 0"),
        10.0,
    )
    .start();
    handle.cancel();

    let events = collect(handle).await;
    assert_eq!(events, vec![RunEvent::Finished(RunOutcome::Canceled)]);
}

#[tokio::test]
async fn test_cancel_while_process_holds_no_output() {
    let mut handle = ProcessSupervisor::new(sh("exec >&-; exec sleep 30"), 10.0).start();

    // Give the script time to close stdout so the run is waiting for exit.
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.cancel();

    let event = tokio::time::timeout(TEST_TIMEOUT, handle.next_event())
        .await
        .unwrap();
    assert_eq!(event, Some(RunEvent::Finished(RunOutcome::Canceled)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cancel_from_another_thread() {
    let handle = ProcessSupervisor::new(sh("exec sleep 30"), 10.0).start();
    let canceller = handle.canceller();

    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(100));
        canceller.cancel();
        canceller.cancel();
    });

    let events = collect(handle).await;
    assert_eq!(events, vec![RunEvent::Finished(RunOutcome::Canceled)]);
}

#[tokio::test]
async fn test_cancel_after_terminal_outcome_is_noop() {
    let mut handle = ProcessSupervisor::new(sh("exit 0"), 10.0).start();

    let event = tokio::time::timeout(TEST_TIMEOUT, handle.next_event())
        .await
        .unwrap();
    assert_eq!(event, Some(RunEvent::Finished(RunOutcome::Completed)));
    assert_eq!(handle.state(), RunState::Completed);

    handle.cancel();
    handle.cancel();
    assert_eq!(handle.next_event().await, None);
    assert_eq!(handle.state(), RunState::Completed);
    assert_eq!(handle.outcome(), Some(&RunOutcome::Completed));
}

#[tokio::test]
async fn test_wait_returns_outcome() {
    let outcome = ProcessSupervisor::new(sh("echo out_time=00:00:01.000000; exit 4"), 2.0)
        .start()
        .wait()
        .await;
    assert!(matches!(outcome, RunOutcome::Failed { .. }));
}

// Observer dispatch

#[derive(Default)]
struct RecordingObserver {
    calls: Mutex<Vec<String>>,
}

impl RecordingObserver {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl RunObserver for RecordingObserver {
    fn on_start(&self, command: &[String], total_duration: f64) {
        self.record(format!("start {} {}", command[0], total_duration));
    }

    fn on_progress(&self, percent: u8) {
        self.record(format!("progress {}", percent));
    }

    fn on_complete(&self) {
        self.record("complete".to_string());
    }

    fn on_error(&self, message: &str) {
        self.record(format!("error {}", message));
    }

    fn on_cancel(&self) {
        self.record("cancel".to_string());
    }
}

#[tokio::test]
async fn test_drive_dispatches_in_order() {
    let observer = Arc::new(RecordingObserver::default());
    let handle = ProcessSupervisor::new(
        sh("echo out_time=00:00:02.000000; echo out_time=00:00:08.000000"),
        8.0,
    )
    .start();

    let outcome = handle.drive(observer.as_ref()).await;
    assert_eq!(outcome, RunOutcome::Completed);
    assert_eq!(
        *observer.calls.lock().unwrap(),
        vec![
            "start sh 8".to_string(),
            "progress 25".to_string(),
            "progress 100".to_string(),
            "complete".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_drive_reports_launch_failure_once() {
    let observer = RecordingObserver::default();
    let handle = ProcessSupervisor::new(vec!["/nonexistent/ffmpeg".to_string()], 8.0).start();

    let outcome = handle.drive(&observer).await;
    assert!(matches!(outcome, RunOutcome::Failed { .. }));

    let calls = observer.calls.lock().unwrap();
    assert_eq!(calls.len(), 2);
    assert!(calls[1].starts_with("error failed to launch"));
}

#[tokio::test]
async fn test_drive_after_outcome_taken_does_not_notify() {
    let observer = RecordingObserver::default();
    let mut handle = ProcessSupervisor::new(sh("exit 0"), 8.0).start();

    let event = tokio::time::timeout(TEST_TIMEOUT, handle.next_event())
        .await
        .unwrap();
    assert_eq!(event, Some(RunEvent::Finished(RunOutcome::Completed)));

    let outcome = handle.drive(&observer).await;
    assert_eq!(outcome, RunOutcome::Completed);
    assert!(observer.calls.lock().unwrap().is_empty());
}
