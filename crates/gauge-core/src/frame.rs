use crate::error::FrameError;

/// Buffer size on the wire: three digits plus the terminator.
pub const FRAME_CAPACITY: usize = 4;
pub const DIGIT_CAPACITY: usize = FRAME_CAPACITY - 1;

/// Collects characters until the terminator arrives.
///
/// After an over-long frame the accumulator swallows everything up to and
/// including the next terminator, so the tail is never read as a value.
#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    terminator: u8,
    buffer: [u8; DIGIT_CAPACITY],
    len: usize,
    discarding: bool,
}

impl FrameAccumulator {
    pub fn new(terminator: u8) -> Self {
        Self {
            terminator,
            buffer: [0; DIGIT_CAPACITY],
            len: 0,
            discarding: false,
        }
    }

    /// Returns the parsed reading when `byte` completes a frame.
    pub fn push(&mut self, byte: u8) -> Result<Option<i32>, FrameError> {
        if byte == self.terminator {
            if self.discarding {
                self.clear();
                return Ok(None);
            }
            let reading = parse_reading(self.pending());
            self.clear();
            return Ok(Some(reading));
        }

        if self.discarding {
            return Ok(None);
        }
        if self.len == DIGIT_CAPACITY {
            self.len = 0;
            self.discarding = true;
            return Err(FrameError::TooLong {
                capacity: DIGIT_CAPACITY,
            });
        }

        self.buffer[self.len] = byte;
        self.len += 1;
        Ok(None)
    }

    pub fn pending(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0 && !self.discarding
    }

    pub fn is_discarding(&self) -> bool {
        self.discarding
    }

    pub fn clear(&mut self) {
        self.buffer = [0; DIGIT_CAPACITY];
        self.len = 0;
        self.discarding = false;
    }
}

/// Decimal parse with `atoi` rules: leading whitespace, an optional sign,
/// then digits up to the first non-digit. Anything unparseable reads as 0.
pub fn parse_reading(bytes: &[u8]) -> i32 {
    let mut rest = bytes;
    while let [first, tail @ ..] = rest {
        if matches!(first, b' ' | b'\t'..=b'\r') {
            rest = tail;
        } else {
            break;
        }
    }

    let negative = match rest.first() {
        Some(b'-') => {
            rest = &rest[1..];
            true
        }
        Some(b'+') => {
            rest = &rest[1..];
            false
        }
        _ => false,
    };

    let mut value: i32 = 0;
    for byte in rest.iter().take_while(|b| b.is_ascii_digit()) {
        value = value.saturating_mul(10).saturating_add((byte - b'0') as i32);
    }
    if negative {
        -value
    } else {
        value
    }
}
