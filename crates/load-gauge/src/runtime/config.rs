use gauge_core::ControlConfig;
use gauge_io::{OverflowPolicy, DEFAULT_RX_BUFFER};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub run_seconds: Option<u64>,
    pub fast: bool,
    pub clear_buffer_on_reset: bool,
    pub rx_buffer: usize,
    pub overflow_policy: OverflowPolicy,
    pub json_logs: bool,
    pub metrics_addr: Option<String>,
    pub stats_json: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            run_seconds: None,
            fast: false,
            clear_buffer_on_reset: true,
            rx_buffer: DEFAULT_RX_BUFFER,
            overflow_policy: OverflowPolicy::Block,
            json_logs: false,
            metrics_addr: None,
            stats_json: false,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Self {
        let mut cfg = RuntimeConfig::default();
        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--run-seconds" => {
                    if i + 1 < args.len() {
                        cfg.run_seconds = args[i + 1].parse::<u64>().ok();
                        i += 1;
                    }
                }
                "--fast" => {
                    cfg.fast = true;
                }
                "--keep-buffer-on-reset" => {
                    cfg.clear_buffer_on_reset = false;
                }
                "--rx-buffer" => {
                    if i + 1 < args.len() {
                        cfg.rx_buffer = args[i + 1].parse().unwrap_or(DEFAULT_RX_BUFFER);
                        i += 1;
                    }
                }
                "--drop-on-overflow" => {
                    cfg.overflow_policy = OverflowPolicy::Drop;
                }
                "--json-logs" => {
                    cfg.json_logs = true;
                }
                "--metrics-addr" => {
                    if i + 1 < args.len() {
                        cfg.metrics_addr = Some(args[i + 1].clone());
                        i += 1;
                    }
                }
                "--stats-json" => {
                    cfg.stats_json = true;
                }
                "--help" | "-h" => {
                    cfg.show_help = true;
                    break;
                }
                _ => {}
            }
            i += 1;
        }
        cfg
    }

    pub fn control_config(&self) -> ControlConfig {
        ControlConfig {
            clear_buffer_on_reset: self.clear_buffer_on_reset,
            idle_backoff: Some(Duration::from_micros(200)),
            ..ControlConfig::default()
        }
    }

    pub fn print_help() {
        println!(
            r##"load-gauge - CPU load needle driven by a stepper motor

Reads load percentages from stdin as "<digits>!" frames, echoes the step
delta plus "!" on stdout, and drives a simulated stepper. "#" returns the
needle to zero.

USAGE:
    load-gauge [OPTIONS]

OPTIONS:
    --run-seconds <SECS>    Stop after a fixed duration (default: run until stdin closes)
    --fast                  Account for pulse delays without waiting
    --keep-buffer-on-reset  Keep a half-received frame when "#" arrives
    --rx-buffer <BYTES>     Receive ring buffer size [default: 32]
    --drop-on-overflow      Drop bytes when the ring is full instead of stalling input
    --json-logs             Output logs in JSON format
    --metrics-addr <ADDR>   Enable Prometheus metrics server on address (e.g., 0.0.0.0:9090)
    --stats-json            Print the run summary as JSON on stderr
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log filter (e.g., RUST_LOG=debug,gauge_core=trace)

EXAMPLES:
    # Feed a few readings
    printf '50!75!#' | load-gauge --fast

    # Long run with metrics
    load-gauge --metrics-addr 0.0.0.0:9090 --json-logs
"##
        );
    }
}
