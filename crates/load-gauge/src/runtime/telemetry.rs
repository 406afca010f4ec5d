use gauge_core::{Event, LoopStats};
use gauge_io::metrics::{
    init_metrics, serve_metrics, BYTES_RECEIVED, FRAMES_COMPLETED, LAST_DELTA, NEEDLE_POSITION,
    PULSES_ISSUED, READING, RESETS, RX_ERRORS,
};
use std::thread;
use tracing::info;

pub fn init() {
    init_metrics();
}

pub fn start_metrics_server(addr: &Option<String>) -> Option<thread::JoinHandle<()>> {
    addr.as_ref().map(|addr| {
        info!(addr = %addr, "Starting metrics server");
        serve_metrics(addr.clone())
    })
}

/// Mirrors loop events and counters into the Prometheus registry.
#[derive(Debug, Default)]
pub struct Recorder {
    last: LoopStats,
    position_half_steps: i64,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: &Event, stats: &LoopStats) {
        match *event {
            Event::Frame {
                reading,
                delta,
                pulses,
                ..
            } => {
                READING.set(reading as i64);
                LAST_DELTA.set(delta as i64);
                self.position_half_steps += delta.signum() as i64 * pulses as i64;
            }
            Event::Reset { pulses, .. } => {
                READING.set(0);
                self.position_half_steps -= pulses as i64;
            }
            Event::Idle | Event::Accumulated | Event::Discarded => {}
        }
        NEEDLE_POSITION.set(self.position_half_steps);

        BYTES_RECEIVED.inc_by(stats.bytes_received - self.last.bytes_received);
        FRAMES_COMPLETED.inc_by(stats.frames_completed - self.last.frames_completed);
        RESETS.inc_by(stats.resets - self.last.resets);
        PULSES_ISSUED.inc_by(stats.pulses_issued - self.last.pulses_issued);
        for (kind, now, before) in [
            ("frame", stats.rx_frame_errors, self.last.rx_frame_errors),
            ("overrun", stats.rx_overrun_errors, self.last.rx_overrun_errors),
            (
                "buffer_overflow",
                stats.rx_buffer_overflows,
                self.last.rx_buffer_overflows,
            ),
            ("too_long", stats.frames_too_long, self.last.frames_too_long),
        ] {
            if now > before {
                RX_ERRORS.with_label_values(&[kind]).inc_by(now - before);
            }
        }
        self.last = stats.clone();
    }

    pub fn position_half_steps(&self) -> i64 {
        self.position_half_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_needle_through_frames_and_reset() {
        let mut recorder = Recorder::new();
        let mut stats = LoopStats {
            frames_completed: 1,
            pulses_issued: 200,
            ..LoopStats::default()
        };
        recorder.observe(
            &Event::Frame {
                reading: 50,
                previous: 0,
                delta: 50,
                pulses: 200,
            },
            &stats,
        );
        assert_eq!(recorder.position_half_steps(), 200);

        stats.frames_completed = 2;
        stats.pulses_issued = 280;
        recorder.observe(
            &Event::Frame {
                reading: 30,
                previous: 50,
                delta: -20,
                pulses: 80,
            },
            &stats,
        );
        assert_eq!(recorder.position_half_steps(), 120);

        stats.resets = 1;
        stats.pulses_issued = 400;
        recorder.observe(
            &Event::Reset {
                unwound: 30,
                pulses: 120,
            },
            &stats,
        );
        assert_eq!(recorder.position_half_steps(), 0);
    }
}
