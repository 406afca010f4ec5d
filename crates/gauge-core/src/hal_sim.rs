use crate::error::GaugeError;
use crate::hal::{Level, Line, RxPoll, SerialPort, StepperIO};
use std::collections::VecDeque;

/// Simulated stepper driver board.
///
/// Counts a half-step on every rising clock edge and moves the needle in the
/// direction currently latched on the direction line.
#[derive(Debug, Clone)]
pub struct SimulatedStepper {
    levels: [Level; 4],
    outputs: [bool; 4],
    position_half_steps: i64,
    half_steps: u64,
    trace: Option<Vec<(Line, Level)>>,
}

impl SimulatedStepper {
    pub fn new() -> Self {
        Self {
            levels: [Level::Low; 4],
            outputs: [false; 4],
            position_half_steps: 0,
            half_steps: 0,
            trace: None,
        }
    }

    /// Also records every line write, in order.
    pub fn with_trace() -> Self {
        Self {
            trace: Some(Vec::new()),
            ..Self::new()
        }
    }

    pub fn level(&self, line: Line) -> Level {
        self.levels[line.index()]
    }

    pub fn is_output(&self, line: Line) -> bool {
        self.outputs[line.index()]
    }

    /// Signed needle position; clockwise is positive.
    pub fn position_half_steps(&self) -> i64 {
        self.position_half_steps
    }

    pub fn half_steps(&self) -> u64 {
        self.half_steps
    }

    pub fn trace(&self) -> &[(Line, Level)] {
        self.trace.as_deref().unwrap_or(&[])
    }

    pub fn clear_trace(&mut self) {
        if let Some(trace) = self.trace.as_mut() {
            trace.clear();
        }
    }

    /// All lines driven and half-step mode selected.
    pub fn is_ready(&self) -> bool {
        self.outputs.iter().all(|o| *o) && self.level(Line::HalfFull).is_high()
    }
}

impl Default for SimulatedStepper {
    fn default() -> Self {
        Self::new()
    }
}

impl StepperIO for SimulatedStepper {
    fn configure_output(&mut self, line: Line) {
        self.outputs[line.index()] = true;
    }

    fn set_level(&mut self, line: Line, level: Level) {
        let previous = self.levels[line.index()];
        self.levels[line.index()] = level;
        if let Some(trace) = self.trace.as_mut() {
            trace.push((line, level));
        }

        if line == Line::Clock && previous == Level::Low && level == Level::High {
            self.half_steps += 1;
            if self.level(Line::Direction).is_high() {
                self.position_half_steps += 1;
            } else {
                self.position_half_steps -= 1;
            }
        }
    }
}

/// Serial port fed from a prepared script of receive results.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSerial {
    inbound: VecDeque<RxPoll>,
    outbound: Vec<u8>,
    close_when_drained: bool,
}

impl ScriptedSerial {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues each byte of `input` without error flags.
    pub fn from_bytes(input: &[u8]) -> Self {
        let mut port = Self::new();
        port.feed(input);
        port
    }

    pub fn closing(mut self) -> Self {
        self.close_when_drained = true;
        self
    }

    pub fn feed(&mut self, input: &[u8]) {
        self.inbound.extend(input.iter().map(|b| RxPoll::byte(*b)));
    }

    pub fn push(&mut self, poll: RxPoll) {
        self.inbound.push_back(poll);
    }

    pub fn output(&self) -> &[u8] {
        &self.outbound
    }

    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.outbound).into_owned()
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }
}

impl SerialPort for ScriptedSerial {
    fn poll(&mut self) -> RxPoll {
        self.inbound.pop_front().unwrap_or(RxPoll::NoData)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), GaugeError> {
        self.outbound.extend_from_slice(bytes);
        Ok(())
    }

    fn is_open(&self) -> bool {
        !(self.close_when_drained && self.inbound.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rising_clock_edge_moves_needle() {
        let mut sim = SimulatedStepper::new();
        sim.assert(Line::Direction);
        sim.deassert(Line::Clock);
        sim.assert(Line::Clock);
        sim.assert(Line::Clock);
        assert_eq!(sim.half_steps(), 1);
        assert_eq!(sim.position_half_steps(), 1);

        sim.deassert(Line::Direction);
        sim.deassert(Line::Clock);
        sim.assert(Line::Clock);
        assert_eq!(sim.position_half_steps(), 0);
    }

    #[test]
    fn lines_start_as_inputs() {
        let mut sim = SimulatedStepper::new();
        assert!(Line::ALL.iter().all(|line| !sim.is_output(*line)));
        sim.configure_output(Line::Clock);
        assert!(sim.is_output(Line::Clock));
        assert!(!sim.is_ready());
    }

    #[test]
    fn scripted_serial_records_writes() {
        let mut port = ScriptedSerial::new();
        port.write(b"12").unwrap();
        port.write(b"!").unwrap();
        assert_eq!(port.output(), b"12!");
        assert_eq!(port.take_output(), b"12!".to_vec());
        assert!(port.output().is_empty());
    }

    #[test]
    fn scripted_serial_closes_after_drain() {
        let mut port = ScriptedSerial::from_bytes(b"7").closing();
        assert!(port.is_open());
        assert_eq!(port.poll(), RxPoll::byte(b'7'));
        assert!(!port.is_open());
        assert_eq!(port.poll(), RxPoll::NoData);
    }
}
