//! Prometheus metrics for the load gauge.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::LazyLock;
use std::thread;
use tiny_http::{Response, Server};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

// ============================================================================
// Frame Metrics
// ============================================================================

/// Bytes taken off the serial link
pub static BYTES_RECEIVED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "loadgauge_bytes_received_total",
        "Bytes taken off the serial link",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Completed load frames
pub static FRAMES_COMPLETED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "loadgauge_frames_completed_total",
        "Load frames parsed and applied",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Reset commands handled
pub static RESETS: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new("loadgauge_resets_total", "Reset commands handled").unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Receive errors by kind (frame, overrun, buffer_overflow, too_long)
pub static RX_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    let counter = IntCounterVec::new(
        Opts::new("loadgauge_rx_errors_total", "Serial receive errors by kind"),
        &["kind"],
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

// ============================================================================
// Motor Metrics
// ============================================================================

/// Half-step pulses issued to the driver
pub static PULSES_ISSUED: LazyLock<IntCounter> = LazyLock::new(|| {
    let counter = IntCounter::new(
        "loadgauge_pulses_issued_total",
        "Half-step pulses issued to the stepper driver",
    )
    .unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
});

/// Last applied load reading in percent
pub static READING: LazyLock<IntGauge> = LazyLock::new(|| {
    let gauge = IntGauge::new("loadgauge_reading_percent", "Last applied load reading").unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Delta between the last two readings
pub static LAST_DELTA: LazyLock<IntGauge> = LazyLock::new(|| {
    let gauge = IntGauge::new(
        "loadgauge_last_delta_percent",
        "Difference between the last two readings",
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

/// Needle position in half-steps from zero (clockwise positive)
pub static NEEDLE_POSITION: LazyLock<IntGauge> = LazyLock::new(|| {
    let gauge = IntGauge::new(
        "loadgauge_needle_position_half_steps",
        "Needle position in half-steps from zero",
    )
    .unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
});

pub const RX_ERROR_KINDS: [&str; 4] = ["frame", "overrun", "buffer_overflow", "too_long"];

// ============================================================================
// Metrics HTTP Server
// ============================================================================

/// Text exposition of everything in the registry.
pub fn encode_metrics() -> Result<Vec<u8>, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(buffer)
}

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            match request.url() {
                "/metrics" => {
                    let buffer = match encode_metrics() {
                        Ok(buffer) => buffer,
                        Err(e) => {
                            tracing::warn!("Failed to encode metrics: {}", e);
                            let _ = request.respond(
                                Response::from_string("Internal Server Error")
                                    .with_status_code(500),
                            );
                            continue;
                        }
                    };

                    let response = Response::from_data(buffer).with_header(
                        tiny_http::Header::from_bytes(
                            &b"Content-Type"[..],
                            &b"text/plain; version=0.0.4"[..],
                        )
                        .unwrap(),
                    );
                    let _ = request.respond(response);
                }
                "/health" => {
                    let _ = request.respond(Response::from_string("OK"));
                }
                _ => {
                    let _ =
                        request.respond(Response::from_string("Not Found").with_status_code(404));
                }
            }
        }
    })
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    let _ = BYTES_RECEIVED.get();
    let _ = FRAMES_COMPLETED.get();
    let _ = RESETS.get();
    for kind in RX_ERROR_KINDS {
        let _ = RX_ERRORS.with_label_values(&[kind]).get();
    }
    let _ = PULSES_ISSUED.get();
    let _ = READING.get();
    let _ = LAST_DELTA.get();
    let _ = NEEDLE_POSITION.get();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_lists_gauge_metrics() {
        init_metrics();
        READING.set(42);
        let text = String::from_utf8(encode_metrics().unwrap()).unwrap();
        assert!(text.contains("loadgauge_reading_percent 42"));
        assert!(text.contains("loadgauge_rx_errors_total{kind=\"too_long\"}"));
    }
}
