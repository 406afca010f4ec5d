//! Serial link over ordinary byte streams.
//!
//! A reader thread stands in for the UART receive interrupt: it moves bytes
//! from the source into a small ring buffer that the control loop polls.

use gauge_core::{GaugeError, RxErrors, RxPoll, SerialPort};
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use thiserror::Error;
use tracing::{debug, warn};

/// Receive ring size of the AVR UART driver.
pub const DEFAULT_RX_BUFFER: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Stall the source until the loop catches up.
    #[default]
    Block,
    /// Drop the byte and flag a buffer overflow, like the UART.
    Drop,
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("receive buffer must hold at least one byte")]
    ZeroCapacity,
    #[error("failed to spawn serial reader: {0}")]
    Spawn(#[source] io::Error),
}

#[derive(Debug)]
struct RxRing {
    bytes: VecDeque<u8>,
    capacity: usize,
    overflowed: bool,
    eof: bool,
}

#[derive(Debug)]
struct Shared {
    ring: Mutex<RxRing>,
    space: Condvar,
}

impl Shared {
    fn ring(&self) -> MutexGuard<'_, RxRing> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub struct StreamLink<W: Write> {
    shared: Arc<Shared>,
    writer: W,
}

impl StreamLink<io::Stdout> {
    pub fn stdio(capacity: usize, policy: OverflowPolicy) -> Result<Self, LinkError> {
        Self::spawn(io::stdin(), io::stdout(), capacity, policy)
    }
}

impl<W: Write> StreamLink<W> {
    pub fn spawn<R>(
        source: R,
        writer: W,
        capacity: usize,
        policy: OverflowPolicy,
    ) -> Result<Self, LinkError>
    where
        R: Read + Send + 'static,
    {
        if capacity == 0 {
            return Err(LinkError::ZeroCapacity);
        }

        let shared = Arc::new(Shared {
            ring: Mutex::new(RxRing {
                bytes: VecDeque::with_capacity(capacity),
                capacity,
                overflowed: false,
                eof: false,
            }),
            space: Condvar::new(),
        });

        let rx_shared = Arc::clone(&shared);
        thread::Builder::new()
            .name("serial-rx".into())
            .spawn(move || receive(source, &rx_shared, policy))
            .map_err(LinkError::Spawn)?;

        Ok(Self { shared, writer })
    }

    /// True once the source has reached end of input.
    pub fn input_closed(&self) -> bool {
        self.shared.ring().eof
    }

    pub fn buffered(&self) -> usize {
        self.shared.ring().bytes.len()
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn receive<R: Read>(mut source: R, shared: &Shared, policy: OverflowPolicy) {
    let mut chunk = [0u8; 64];
    loop {
        let n = match source.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(error = %e, "Serial source failed, closing link");
                break;
            }
        };

        let mut ring = shared.ring();
        for &byte in &chunk[..n] {
            if policy == OverflowPolicy::Block {
                while ring.bytes.len() >= ring.capacity {
                    ring = shared
                        .space
                        .wait(ring)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
            if ring.bytes.len() < ring.capacity {
                ring.bytes.push_back(byte);
            } else {
                ring.overflowed = true;
            }
        }
    }

    shared.ring().eof = true;
    debug!("Serial source reached end of input");
}

impl<W: Write> SerialPort for StreamLink<W> {
    fn poll(&mut self) -> RxPoll {
        let mut ring = self.shared.ring();
        let Some(byte) = ring.bytes.pop_front() else {
            return RxPoll::NoData;
        };
        let buffer_overflow = std::mem::take(&mut ring.overflowed);
        drop(ring);
        self.shared.space.notify_one();

        RxPoll::Byte {
            byte,
            errors: RxErrors {
                buffer_overflow,
                ..RxErrors::NONE
            },
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), GaugeError> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        let ring = self.shared.ring();
        !(ring.eof && ring.bytes.is_empty())
    }
}
