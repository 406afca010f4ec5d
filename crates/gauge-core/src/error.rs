use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame too long: more than {capacity} digits before terminator")]
    TooLong { capacity: usize },
}

#[derive(Debug, Error)]
pub enum GaugeError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error("serial link write failed: {0}")]
    Link(#[from] std::io::Error),
}
