//! Error types for JsonTalkie
//!
//! no_std compatible error handling

/// Failure reported by a [`Transport`](crate::traits::Transport)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The link is busy with another transfer
    Busy,
    /// The frame was refused or lost after every retry
    SendFailed,
    /// The frame does not fit the link's buffers
    FrameTooLarge,
    /// Underlying I/O error
    Io,
}

impl core::fmt::Display for TransportError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TransportError::Busy => write!(f, "Transport busy"),
            TransportError::SendFailed => write!(f, "Send failed after retries"),
            TransportError::FrameTooLarge => write!(f, "Frame too large for transport"),
            TransportError::Io => write!(f, "Transport I/O error"),
        }
    }
}

impl core::error::Error for TransportError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TalkieError {
    /// Record failed structural validation
    MalformedMessage,
    /// Carried checksum does not match the recomputed one
    ChecksumMismatch,
    /// CALL rejected by the anti-replay guard
    ReplayRejected { remote_delay: u16, local_delay: u16 },
    /// A mutation or copy would exceed the buffer capacity
    BufferOverflow { capacity: usize, required: usize },
    /// Inbound frame larger than a record
    PacketTooLarge { max_size: usize, actual_size: usize },
    /// Maximum number of talkers reached
    TalkerLimitReached { max_talkers: usize },
    /// Maximum number of links reached
    LinkLimitReached { max_links: usize },
    /// Pending delivery queue is full
    QueueFull { queue_size: usize },
    /// Talker name or description exceeds its fixed capacity
    NameTooLong { max_length: usize, actual_length: usize },
    /// Transport failure
    Transport(TransportError),
}

impl core::fmt::Display for TalkieError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TalkieError::MalformedMessage => write!(f, "Malformed message"),
            TalkieError::ChecksumMismatch => write!(f, "Checksum mismatch"),
            TalkieError::ReplayRejected {
                remote_delay,
                local_delay,
            } => {
                write!(
                    f,
                    "Replayed or out of order call: remote delay {} ms, local delay {} ms",
                    remote_delay, local_delay
                )
            }
            TalkieError::BufferOverflow { capacity, required } => {
                write!(
                    f,
                    "Buffer overflow: capacity {} bytes, required {} bytes",
                    capacity, required
                )
            }
            TalkieError::PacketTooLarge {
                max_size,
                actual_size,
            } => {
                write!(
                    f,
                    "Packet too large: max {} bytes, actual {} bytes",
                    max_size, actual_size
                )
            }
            TalkieError::TalkerLimitReached { max_talkers } => {
                write!(f, "Maximum number of talkers reached: {}", max_talkers)
            }
            TalkieError::LinkLimitReached { max_links } => {
                write!(f, "Maximum number of links reached: {}", max_links)
            }
            TalkieError::QueueFull { queue_size } => {
                write!(f, "Pending queue full (size: {})", queue_size)
            }
            TalkieError::NameTooLong {
                max_length,
                actual_length,
            } => {
                write!(
                    f,
                    "Name too long: max {}, actual {}",
                    max_length, actual_length
                )
            }
            TalkieError::Transport(error) => write!(f, "Transport error: {}", error),
        }
    }
}

impl core::error::Error for TalkieError {}

impl From<TransportError> for TalkieError {
    fn from(error: TransportError) -> Self {
        TalkieError::Transport(error)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TransportError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            TransportError::Busy => defmt::write!(f, "Transport busy"),
            TransportError::SendFailed => defmt::write!(f, "Send failed after retries"),
            TransportError::FrameTooLarge => defmt::write!(f, "Frame too large for transport"),
            TransportError::Io => defmt::write!(f, "Transport I/O error"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TalkieError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            TalkieError::MalformedMessage => defmt::write!(f, "Malformed message"),
            TalkieError::ChecksumMismatch => defmt::write!(f, "Checksum mismatch"),
            TalkieError::ReplayRejected {
                remote_delay,
                local_delay,
            } => defmt::write!(
                f,
                "Replayed call: remote delay {} ms, local delay {} ms",
                remote_delay,
                local_delay
            ),
            TalkieError::BufferOverflow { capacity, required } => {
                defmt::write!(f, "Buffer overflow: {}/{}", required, capacity)
            }
            TalkieError::PacketTooLarge {
                max_size,
                actual_size,
            } => defmt::write!(f, "Packet too large: {}/{}", actual_size, max_size),
            TalkieError::TalkerLimitReached { max_talkers } => {
                defmt::write!(f, "Maximum talkers: {}", max_talkers)
            }
            TalkieError::LinkLimitReached { max_links } => {
                defmt::write!(f, "Maximum links: {}", max_links)
            }
            TalkieError::QueueFull { queue_size } => {
                defmt::write!(f, "Pending queue full: {}", queue_size)
            }
            TalkieError::NameTooLong {
                max_length,
                actual_length,
            } => defmt::write!(f, "Name too long: {}/{}", actual_length, max_length),
            TalkieError::Transport(error) => defmt::write!(f, "Transport error: {}", error),
        }
    }
}

pub type Result<T> = core::result::Result<T, TalkieError>;
