use crate::error::{FrameError, GaugeError};
use crate::frame::FrameAccumulator;
use crate::hal::{RxErrors, RxPoll, SerialPort, StepperIO};
use crate::motor::MotorDriver;
use crate::timebase::Delay;
use log::{debug, info, warn};
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::atomic::{self, AtomicBool};
use std::time::Duration;

pub const BAUD_RATE: u32 = 9600;
/// Half-steps per percent of load: 100 % is one full turn of the needle.
pub const STEP_FACTOR: u32 = 4;
/// `!` ends a frame.
pub const TERMINATOR: u8 = 33;
/// `#` unwinds the needle to zero.
pub const RESET_CHAR: u8 = 35;
pub const ACK_CHAR: u8 = b'!';
pub const SETTLE_TIME: Duration = Duration::from_millis(1);

pub const FRAME_ERROR_TEXT: &[u8] = b"UART Frame Error: ";
pub const OVERRUN_ERROR_TEXT: &[u8] = b"UART Overrun Error: ";
pub const BUFFER_OVERFLOW_TEXT: &[u8] = b"Buffer Overflow Error: ";
pub const FRAME_TOO_LONG_TEXT: &[u8] = b"Frame Too Long Error: ";

#[derive(Clone, Debug, Serialize)]
pub struct ControlConfig {
    pub baud_rate: u32,
    pub step_factor: u32,
    pub terminator: u8,
    pub reset_char: u8,
    pub ack_char: u8,
    pub settle: Duration,
    /// Drop a half-received frame when the reset character arrives.
    pub clear_buffer_on_reset: bool,
    /// Sleep between empty polls; `None` spins like the firmware.
    pub idle_backoff: Option<Duration>,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            baud_rate: BAUD_RATE,
            step_factor: STEP_FACTOR,
            terminator: TERMINATOR,
            reset_char: RESET_CHAR,
            ack_char: ACK_CHAR,
            settle: SETTLE_TIME,
            clear_buffer_on_reset: true,
            idle_backoff: None,
        }
    }
}

#[derive(Clone, Default, Debug, Serialize)]
pub struct LoopStats {
    pub bytes_received: u64,
    pub frames_completed: u64,
    pub resets: u64,
    pub rx_frame_errors: u64,
    pub rx_overrun_errors: u64,
    pub rx_buffer_overflows: u64,
    pub frames_too_long: u64,
    pub out_of_range_readings: u64,
    pub pulses_issued: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Idle,
    Accumulated,
    Frame {
        reading: i32,
        previous: i32,
        delta: i32,
        pulses: u32,
    },
    Reset {
        unwound: i32,
        pulses: u32,
    },
    Discarded,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GaugeState {
    pub reading: i32,
    pub previous_reading: i32,
}

/// The polling loop: serial bytes in, needle movement and echoes out.
pub struct GaugeLoop<S: SerialPort, IO: StepperIO, D: Delay> {
    serial: S,
    motor: MotorDriver<IO, D>,
    accumulator: FrameAccumulator,
    config: ControlConfig,
    state: GaugeState,
    stats: LoopStats,
}

impl<S: SerialPort, IO: StepperIO, D: Delay> GaugeLoop<S, IO, D> {
    pub fn new(serial: S, io: IO, delay: D, config: ControlConfig) -> Self {
        let mut motor = MotorDriver::new(io, delay, config.step_factor, config.settle);
        motor.init();
        Self {
            serial,
            motor,
            accumulator: FrameAccumulator::new(config.terminator),
            config,
            state: GaugeState::default(),
            stats: LoopStats::default(),
        }
    }

    pub fn run(&mut self, stop: &AtomicBool) -> Result<(), GaugeError> {
        self.run_observed(stop, |_, _| {})
    }

    /// Polls until `stop` is raised or the link closes, reporting every
    /// non-idle event.
    pub fn run_observed<F>(&mut self, stop: &AtomicBool, mut on_event: F) -> Result<(), GaugeError>
    where
        F: FnMut(&Event, &LoopStats),
    {
        while !stop.load(atomic::Ordering::Relaxed) && self.serial.is_open() {
            let event = self.poll_once()?;
            if event == Event::Idle {
                match self.config.idle_backoff {
                    Some(backoff) => std::thread::sleep(backoff),
                    None => std::hint::spin_loop(),
                }
                continue;
            }
            on_event(&event, &self.stats);
        }
        Ok(())
    }

    /// Consumes at most one received byte.
    pub fn poll_once(&mut self) -> Result<Event, GaugeError> {
        let (byte, errors) = match self.serial.poll() {
            RxPoll::NoData => return Ok(Event::Idle),
            RxPoll::Byte { byte, errors } => (byte, errors),
        };
        self.stats.bytes_received += 1;

        // Advisory only; the byte is processed regardless.
        if errors.any() {
            self.report_rx_errors(errors)?;
        }

        if byte == self.config.reset_char {
            return self.reset();
        }

        match self.accumulator.push(byte) {
            Ok(Some(reading)) => self.complete_frame(reading),
            Ok(None) if byte == self.config.terminator || self.accumulator.is_discarding() => {
                Ok(Event::Discarded)
            }
            Ok(None) => Ok(Event::Accumulated),
            Err(err @ FrameError::TooLong { .. }) => {
                self.stats.frames_too_long += 1;
                warn!("{err}; discarding until terminator");
                self.serial.write(FRAME_TOO_LONG_TEXT)?;
                Ok(Event::Discarded)
            }
        }
    }

    fn report_rx_errors(&mut self, errors: RxErrors) -> Result<(), GaugeError> {
        if errors.frame {
            self.stats.rx_frame_errors += 1;
            warn!("UART frame error");
            self.serial.write(FRAME_ERROR_TEXT)?;
        }
        if errors.overrun {
            self.stats.rx_overrun_errors += 1;
            warn!("UART overrun error");
            self.serial.write(OVERRUN_ERROR_TEXT)?;
        }
        if errors.buffer_overflow {
            self.stats.rx_buffer_overflows += 1;
            warn!("UART receive buffer overflow");
            self.serial.write(BUFFER_OVERFLOW_TEXT)?;
        }
        Ok(())
    }

    fn complete_frame(&mut self, reading: i32) -> Result<Event, GaugeError> {
        let previous = self.state.reading;
        self.state.previous_reading = previous;
        self.state.reading = reading;
        self.stats.frames_completed += 1;

        if !(0..=100).contains(&reading) {
            self.stats.out_of_range_readings += 1;
            warn!("reading {reading} outside 0..=100, driving anyway");
        }

        let delta = reading.saturating_sub(previous);
        let mut echo = delta.to_string().into_bytes();
        echo.push(self.config.ack_char);
        self.serial.write(&echo)?;

        let pulses = match delta.cmp(&0) {
            Ordering::Greater => {
                self.motor.set_clockwise();
                self.motor.do_steps(delta)
            }
            Ordering::Less => {
                self.motor.set_counter_clockwise();
                self.motor.do_steps(delta)
            }
            Ordering::Equal => 0,
        };
        self.stats.pulses_issued += pulses as u64;

        debug!("frame: reading={reading} previous={previous} delta={delta} pulses={pulses}");
        Ok(Event::Frame {
            reading,
            previous,
            delta,
            pulses,
        })
    }

    fn reset(&mut self) -> Result<Event, GaugeError> {
        if self.config.clear_buffer_on_reset {
            if self.accumulator.is_discarding() {
                debug!("reset ends discarded frame");
            } else if !self.accumulator.pending().is_empty() {
                debug!(
                    "reset drops {} pending byte(s)",
                    self.accumulator.pending().len()
                );
            }
            self.accumulator.clear();
        }

        let unwound = self.state.reading;
        self.motor.set_counter_clockwise();
        let pulses = self.motor.do_steps(unwound);
        self.state.reading = 0;
        self.stats.resets += 1;
        self.stats.pulses_issued += pulses as u64;

        info!("reset: unwound {unwound} ({pulses} pulses)");
        Ok(Event::Reset { unwound, pulses })
    }

    pub fn state(&self) -> GaugeState {
        self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn motor(&self) -> &MotorDriver<IO, D> {
        &self.motor
    }

    pub fn serial(&self) -> &S {
        &self.serial
    }

    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    pub fn pending_frame(&self) -> &[u8] {
        self.accumulator.pending()
    }
}
