//! Command implementations

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::task::JoinHandle;
#[cfg(unix)]
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::adapters::{AppConfig, JsonSettingsAdapter, TomlConfigAdapter};
use crate::app::{AppContainer, DefaultAppContainer};
use crate::cli::args::{ConvertArgs, ProbeArgs, RunArgs};
use crate::cli::{Cli, Commands};
use crate::domain::model::ConvertRequest;
use crate::engine::{
    CancellationFlag, ConsoleObserver, JsonObserver, ProcessSupervisor, RunHandle, RunObserver,
    RunOutcome,
};
use crate::utils::TimeParser;

/// Exit code for a run stopped by the user (128 + SIGINT)
const EXIT_CANCELED: u8 = 130;

/// Dispatch the parsed command line
pub async fn execute(cli: Cli, config: AppConfig) -> Result<ExitCode> {
    let Cli {
        config: config_path,
        settings: settings_path,
        command,
        ..
    } = cli;
    let container = DefaultAppContainer::new(config.clone(), settings_path.clone());

    match command {
        Commands::Convert(args) => {
            info!("Executing convert command");
            convert(&container, args).await
        }
        Commands::Probe(args) => {
            info!("Executing probe command");
            probe(&container, args).await
        }
        Commands::Run(args) => {
            info!("Executing run command");
            run(&config, args).await
        }
        Commands::Config => show_config(config_path, settings_path, &config),
    }
}

/// Execute the convert command
pub async fn convert(container: &dyn AppContainer, args: ConvertArgs) -> Result<ExitCode> {
    let interactor = container.convert_interactor();

    let speed = interactor
        .resolve_speed(args.speed)
        .await
        .context("Invalid speed")?;

    let mut request = ConvertRequest::new(args.input, speed);
    if let Some(output) = args.output {
        request = request.with_output(output);
    }

    let plan = interactor
        .plan(request)
        .await
        .context("Failed to prepare conversion")?;

    if !args.json {
        println!(
            "Converting {} at {} -> {}",
            plan.change.input.display(),
            plan.change.speed,
            plan.output_path().display()
        );
    }

    let outcome = supervise(|| interactor.start(&plan), args.json).await?;
    interactor.record_outcome(&plan, &outcome).await;

    Ok(exit_code(&outcome))
}

/// Execute the probe command
pub async fn probe(container: &dyn AppContainer, args: ProbeArgs) -> Result<ExitCode> {
    let duration = container
        .probe_port()
        .probe_duration(&args.input)
        .await
        .context("Failed to probe input file")?;

    if args.json {
        let json = serde_json::json!({
            "input": args.input.display().to_string(),
            "duration": duration,
        });
        println!("{}", json);
    } else {
        match duration {
            Some(seconds) => println!(
                "Duration: {} ({:.3}s)",
                TimeParser::format_time(seconds),
                seconds
            ),
            None => println!("Duration: unknown"),
        }
    }

    Ok(if duration.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Execute the run command
pub async fn run(config: &AppConfig, args: RunArgs) -> Result<ExitCode> {
    let supervisor =
        ProcessSupervisor::new(args.command, args.duration).with_diagnostics(config.capture_diagnostics);

    let outcome = supervise(|| supervisor.start(), args.json).await?;
    Ok(exit_code(&outcome))
}

/// Print the effective configuration and file locations
pub fn show_config(
    config_path: Option<PathBuf>,
    settings_path: Option<PathBuf>,
    config: &AppConfig,
) -> Result<ExitCode> {
    let config_path = config_path.unwrap_or_else(TomlConfigAdapter::default_path);
    let settings_path = settings_path.unwrap_or_else(JsonSettingsAdapter::default_path);

    println!("# config file: {}", config_path.display());
    println!("# settings file: {}", settings_path.display());
    print!(
        "{}",
        TomlConfigAdapter::serialize_config(config).context("Failed to render configuration")?
    );
    Ok(ExitCode::SUCCESS)
}

/// Start a run and drive it to its outcome, canceling it on a terminal signal.
///
/// Signal handlers are installed before the process starts, so a signal
/// that arrives at any point of the run cancels it.
async fn supervise(start: impl FnOnce() -> RunHandle, json: bool) -> Result<RunOutcome> {
    let signals = TerminationSignals::install().context("Failed to install signal handlers")?;
    let handle = start();
    let watcher = signals.cancel_on_receipt(handle.canceller());

    let observer: Box<dyn RunObserver> = if json {
        Box::new(JsonObserver)
    } else {
        Box::new(ConsoleObserver::new())
    };
    let outcome = handle.drive(observer.as_ref()).await;

    watcher.abort();
    Ok(outcome)
}

/// Signals that end the session: interrupt, terminate, hangup and quit.
///
/// The child runs in its own process group, so these reach only us.
#[cfg(unix)]
struct TerminationSignals {
    streams: Vec<(&'static str, Signal)>,
}

#[cfg(unix)]
impl TerminationSignals {
    fn install() -> std::io::Result<Self> {
        let streams = [
            ("SIGINT", SignalKind::interrupt()),
            ("SIGTERM", SignalKind::terminate()),
            ("SIGHUP", SignalKind::hangup()),
            ("SIGQUIT", SignalKind::quit()),
        ]
        .into_iter()
        .map(|(name, kind)| signal(kind).map(|stream| (name, stream)))
        .collect::<std::io::Result<Vec<_>>>()?;
        Ok(Self { streams })
    }

    fn cancel_on_receipt(self, cancel: CancellationFlag) -> JoinHandle<()> {
        let mut tasks = JoinSet::new();
        for (name, mut stream) in self.streams {
            tasks.spawn(async move {
                stream.recv().await;
                name
            });
        }
        tokio::spawn(async move {
            if let Some(Ok(name)) = tasks.join_next().await {
                warn!(signal = name, "Termination signal received, canceling");
                cancel.cancel();
            }
        })
    }
}

#[cfg(not(unix))]
struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    fn cancel_on_receipt(self, cancel: CancellationFlag) -> JoinHandle<()> {
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, canceling");
                cancel.cancel();
            }
        })
    }
}

fn exit_code(outcome: &RunOutcome) -> ExitCode {
    match outcome {
        RunOutcome::Completed => ExitCode::SUCCESS,
        RunOutcome::Failed { .. } => ExitCode::FAILURE,
        RunOutcome::Canceled => ExitCode::from(EXIT_CANCELED),
    }
}
