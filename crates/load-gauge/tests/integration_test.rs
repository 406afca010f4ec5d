use std::io::Write;
use std::process::{Command, Output, Stdio};

fn gauge_bin() -> String {
    std::env::var("CARGO_BIN_EXE_load-gauge").unwrap_or_else(|_| {
        let candidates = [
            "../../target/release/load-gauge",
            "target/release/load-gauge",
            "../../target/debug/load-gauge",
            "target/debug/load-gauge",
        ];
        for candidate in candidates {
            if std::path::Path::new(candidate).exists() {
                return candidate.to_string();
            }
        }
        panic!("Failed to locate load-gauge binary. Expected CARGO_BIN_EXE_load-gauge.");
    })
}

/// Pipes `input` into the gauge and waits for it to exit on end of input.
fn run_gauge(args: &[&str], input: &[u8]) -> Output {
    let mut child = Command::new(gauge_bin())
        .args(args)
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start load-gauge");

    {
        let mut stdin = child.stdin.take().expect("stdin is piped");
        stdin.write_all(input).expect("Failed to feed stdin");
    }

    child.wait_with_output().expect("load-gauge did not exit")
}

#[test]
fn test_echoes_step_deltas() {
    let output = run_gauge(&["--fast"], b"50!75!75!50!");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "50!25!0!-25!");
}

#[test]
fn test_reset_is_silent_and_rezeroes() {
    let output = run_gauge(&["--fast"], b"40!#40!");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "40!40!");
}

#[test]
fn test_overlong_frame_reports_error() {
    let output = run_gauge(&["--fast"], b"20!1234!25!");
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "20!Frame Too Long Error: 5!"
    );
}

#[test]
fn test_reset_clears_partial_frame() {
    let output = run_gauge(&["--fast"], b"20!6#5!");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "20!5!");
}

#[test]
fn test_keep_buffer_on_reset_joins_partial_frame() {
    let output = run_gauge(&["--fast", "--keep-buffer-on-reset"], b"20!6#5!");
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "20!65!");
}

#[test]
fn test_drop_on_overflow_reports_buffer_overflow() {
    // One pipe write well under PIPE_BUF lands in a single read, which a
    // four-byte ring cannot hold.
    let input = b"5!".repeat(100);
    let output = run_gauge(
        &["--fast", "--drop-on-overflow", "--rx-buffer", "4", "--stats-json"],
        &input,
    );
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Buffer Overflow Error: "));

    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr
        .lines()
        .rev()
        .find(|l| l.starts_with('{'))
        .expect("summary line on stderr");
    let stats: serde_json::Value = serde_json::from_str(line).unwrap();
    assert!(stats["rx_buffer_overflows"].as_u64().unwrap() >= 1);
    assert!(stats["bytes_received"].as_u64().unwrap() < 200);
}

#[test]
fn test_stats_json_summary() {
    let output = run_gauge(&["--fast", "--stats-json"], b"10!30!#");
    assert!(output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    let line = stderr
        .lines()
        .rev()
        .find(|l| l.starts_with('{'))
        .expect("summary line on stderr");
    let stats: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(stats["frames_completed"], 2);
    assert_eq!(stats["resets"], 1);
    // 10 + 20 up, 30 back down, four half-steps each.
    assert_eq!(stats["pulses_issued"], 240);
}

#[test]
fn test_help_exits_cleanly() {
    let output = run_gauge(&["--help"], b"");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("USAGE"));
}
