use crate::error::GaugeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

/// The four logical control lines of the stepper driver board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Line {
    /// Pulsed together with the clock on every half-step.
    Enable,
    /// High selects half-step mode.
    HalfFull,
    /// Steps are taken on the rising edge.
    Clock,
    /// High turns clockwise.
    Direction,
}

impl Line {
    pub const ALL: [Line; 4] = [Line::Enable, Line::HalfFull, Line::Clock, Line::Direction];

    /// Bit position on the driver port.
    pub const fn pin(self) -> u8 {
        match self {
            Line::Enable => 2,
            Line::HalfFull => 3,
            Line::Clock => 4,
            Line::Direction => 5,
        }
    }

    pub const fn key(self) -> &'static str {
        match self {
            Line::Enable => "enable",
            Line::HalfFull => "half_full",
            Line::Clock => "clock",
            Line::Direction => "direction",
        }
    }

    pub(crate) const fn index(self) -> usize {
        match self {
            Line::Enable => 0,
            Line::HalfFull => 1,
            Line::Clock => 2,
            Line::Direction => 3,
        }
    }
}

pub trait StepperIO {
    fn configure_output(&mut self, line: Line);
    fn set_level(&mut self, line: Line, level: Level);

    fn assert(&mut self, line: Line) {
        self.set_level(line, Level::High);
    }

    fn deassert(&mut self, line: Line) {
        self.set_level(line, Level::Low);
    }
}

/// Receive error flags reported by the UART alongside a byte.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxErrors {
    pub frame: bool,
    pub overrun: bool,
    pub buffer_overflow: bool,
}

impl RxErrors {
    pub const NONE: RxErrors = RxErrors {
        frame: false,
        overrun: false,
        buffer_overflow: false,
    };

    pub fn any(&self) -> bool {
        self.frame || self.overrun || self.buffer_overflow
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxPoll {
    NoData,
    Byte { byte: u8, errors: RxErrors },
}

impl RxPoll {
    pub fn byte(byte: u8) -> Self {
        RxPoll::Byte {
            byte,
            errors: RxErrors::NONE,
        }
    }
}

pub trait SerialPort {
    /// Non-blocking: at most one byte per call.
    fn poll(&mut self) -> RxPoll;
    /// May block until the transmitter has room.
    fn write(&mut self, bytes: &[u8]) -> Result<(), GaugeError>;
    /// A firmware UART never closes; hosted links close on end of input.
    fn is_open(&self) -> bool {
        true
    }
}
