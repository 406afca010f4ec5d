use crate::runtime::config::RuntimeConfig;
use crate::runtime::logging::init_tracing;
use crate::runtime::telemetry::{self, Recorder};
use gauge_core::{
    Delay, GaugeError, GaugeLoop, LoopStats, SimulatedStepper, SpinDelay, TimeBase, VirtualClock,
};
use gauge_io::{LinkError, StreamLink};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error(transparent)]
    Gauge(#[from] GaugeError),
    #[error("failed to start control thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("control thread panicked")]
    ControlThread,
}

enum HostDelay {
    Spin(SpinDelay),
    Virtual(VirtualClock),
}

impl Delay for HostDelay {
    fn delay_us(&mut self, us: u32) {
        match self {
            Self::Spin(d) => d.delay_us(us),
            Self::Virtual(d) => d.delay_us(us),
        }
    }
}

#[derive(Debug, Clone)]
struct RunSummary {
    stats: LoopStats,
    reading: i32,
    position_half_steps: i64,
}

pub fn run_from_args() -> ExitCode {
    let config = RuntimeConfig::from_env();
    if config.show_help {
        RuntimeConfig::print_help();
        return ExitCode::SUCCESS;
    }
    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "load-gauge stopped");
            ExitCode::FAILURE
        }
    }
}

pub fn run(config: RuntimeConfig) -> Result<(), AppError> {
    init_tracing(config.json_logs);
    telemetry::init();
    let _metrics_handle = telemetry::start_metrics_server(&config.metrics_addr);

    let control_config = config.control_config();
    let timebase = TimeBase::new();
    let link = StreamLink::stdio(config.rx_buffer, config.overflow_policy)?;
    let delay = if config.fast {
        HostDelay::Virtual(VirtualClock::new())
    } else {
        HostDelay::Spin(SpinDelay)
    };

    info!(
        baud_rate = control_config.baud_rate,
        step_factor = control_config.step_factor,
        terminator = %char::from(control_config.terminator),
        reset_char = %char::from(control_config.reset_char),
        rx_buffer = config.rx_buffer,
        fast = config.fast,
        "Starting gauge control loop"
    );

    let stop = Arc::new(AtomicBool::new(false));
    let stop_loop = Arc::clone(&stop);
    let handle = thread::Builder::new()
        .name("gauge-loop".into())
        .spawn(move || -> Result<RunSummary, GaugeError> {
            let mut gauge = GaugeLoop::new(link, SimulatedStepper::new(), delay, control_config);
            let mut recorder = Recorder::new();
            gauge.run_observed(&stop_loop, |event, stats| recorder.observe(event, stats))?;
            Ok(RunSummary {
                stats: gauge.stats().clone(),
                reading: gauge.state().reading,
                position_half_steps: recorder.position_half_steps(),
            })
        })
        .map_err(AppError::Spawn)?;

    let deadline = config
        .run_seconds
        .map(|seconds| Instant::now() + Duration::from_secs(seconds));
    while !handle.is_finished() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("Run duration elapsed");
            stop.store(true, Ordering::Relaxed);
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }

    let summary = handle.join().map_err(|_| AppError::ControlThread)??;
    let stats = &summary.stats;
    info!(
        elapsed_ms = timebase.now_us() / 1_000,
        frames = stats.frames_completed,
        resets = stats.resets,
        pulses = stats.pulses_issued,
        rx_errors = stats.rx_frame_errors + stats.rx_overrun_errors + stats.rx_buffer_overflows,
        frames_too_long = stats.frames_too_long,
        reading = summary.reading,
        needle_half_steps = summary.position_half_steps,
        "Run complete"
    );

    if config.stats_json {
        match serde_json::to_string(stats) {
            Ok(line) => eprintln!("{line}"),
            Err(e) => error!(error = %e, "Failed to encode run summary"),
        }
    }
    Ok(())
}
