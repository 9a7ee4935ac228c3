pub mod buffer;
pub mod checksum;
pub mod kinds;
pub mod message;

pub use buffer::ByteBuffer;
pub use checksum::checksum;
pub use kinds::{Ack, ErrorCode, MessageKind, SysCode, ValueType};
pub use message::{key, trim_noise, CompactMessage, Value, MESSAGE_CAPACITY, MIN_MESSAGE_LENGTH};
