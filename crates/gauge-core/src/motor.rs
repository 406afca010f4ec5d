use crate::hal::{Level, Line, StepperIO};
use crate::timebase::Delay;
use log::debug;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

/// Pulse-train driver for a step/direction stepper board.
pub struct MotorDriver<IO: StepperIO, D: Delay> {
    io: IO,
    delay: D,
    step_factor: u32,
    settle: Duration,
    direction: Direction,
}

impl<IO: StepperIO, D: Delay> MotorDriver<IO, D> {
    pub fn new(io: IO, delay: D, step_factor: u32, settle: Duration) -> Self {
        Self {
            io,
            delay,
            step_factor,
            settle,
            direction: Direction::CounterClockwise,
        }
    }

    /// Drives every line as an output, selects half-step mode and parks the
    /// clock high so the first pulse starts with a falling edge.
    pub fn init(&mut self) {
        for line in Line::ALL {
            debug!("{} line on pin {} as output", line.key(), line.pin());
            self.io.configure_output(line);
        }
        self.io.assert(Line::HalfFull);
        self.io.assert(Line::Clock);
    }

    pub fn set_clockwise(&mut self) {
        self.latch(Direction::Clockwise);
    }

    pub fn set_counter_clockwise(&mut self) {
        self.latch(Direction::CounterClockwise);
    }

    fn latch(&mut self, direction: Direction) {
        let level = match direction {
            Direction::Clockwise => Level::High,
            Direction::CounterClockwise => Level::Low,
        };
        self.io.set_level(Line::Direction, level);
        self.direction = direction;
        self.delay.delay(self.settle);
    }

    /// Issues `|steps| * step_factor` half-step pulses in the latched
    /// direction and returns how many were sent.
    pub fn do_steps(&mut self, steps: i32) -> u32 {
        let pulses = steps.unsigned_abs().saturating_mul(self.step_factor);
        for _ in 0..pulses {
            self.io.assert(Line::Enable);
            self.io.deassert(Line::Clock);
            self.delay.delay(self.settle);

            self.io.assert(Line::Clock);
            self.io.deassert(Line::Enable);
            self.delay.delay(self.settle);
        }
        pulses
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn step_factor(&self) -> u32 {
        self.step_factor
    }

    pub fn io(&self) -> &IO {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut IO {
        &mut self.io
    }

    pub fn delay(&self) -> &D {
        &self.delay
    }
}
