use crate::error::TransportError;

/// Byte-level boundary to the outside world (SPI, UDP broadcast, UART)
///
/// Implementations may block (point-to-point links) or poll (datagram
/// links). Retry and backoff policies stay inside the implementation.
pub trait Transport {
    /// Class name reported by SYS socket introspection
    fn class_name(&self) -> &'static str;

    /// Send one complete record
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Return the next received frame, if any
    ///
    /// The slice stays valid until the next call on this transport.
    fn receive(&mut self) -> Option<&[u8]>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn class_name(&self) -> &'static str {
        (**self).class_name()
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).send(bytes)
    }

    fn receive(&mut self) -> Option<&[u8]> {
        (**self).receive()
    }
}
