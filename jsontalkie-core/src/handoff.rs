//! Single-producer/single-consumer frame handoff
//!
//! Bridges an interrupt-driven transport state machine (the producer) and the
//! cooperative main loop (the consumer). The producer writes the bytes,
//! stores the length and only then raises `ready` with release ordering; the
//! consumer must see `ready` with acquire ordering before it reads the
//! length. No other synchronization is involved.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::TransportError;
use crate::traits::Transport;

/// Attempts made by [`HandoffTransport::send`] before reporting failure
pub const SEND_ATTEMPTS: usize = 3;

pub struct FrameHandoff<const N: usize> {
    buffer: UnsafeCell<[u8; N]>,
    length: AtomicUsize,
    ready: AtomicBool,
}

// SAFETY: the buffer is written only while `ready` is false (producer side)
// and read only while `ready` is true (consumer side). With a single
// producer and a single consumer the two never overlap.
unsafe impl<const N: usize> Sync for FrameHandoff<N> {}

impl<const N: usize> Default for FrameHandoff<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> FrameHandoff<N> {
    pub const fn new() -> Self {
        Self {
            buffer: UnsafeCell::new([0; N]),
            length: AtomicUsize::new(0),
            ready: AtomicBool::new(false),
        }
    }

    /// A frame is waiting for the consumer
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Producer: copy `bytes` in and publish them
    pub fn publish(&self, bytes: &[u8]) -> Result<(), TransportError> {
        self.publish_with(|buffer| {
            if bytes.len() > N {
                return None;
            }
            buffer[..bytes.len()].copy_from_slice(bytes);
            Some(bytes.len())
        })
    }

    /// Producer: fill the buffer in place and publish the returned length
    ///
    /// Returning `None` abandons the frame; the next attempt overwrites it.
    pub fn publish_with(
        &self,
        fill: impl FnOnce(&mut [u8; N]) -> Option<usize>,
    ) -> Result<(), TransportError> {
        if self.ready.load(Ordering::Acquire) {
            return Err(TransportError::Busy);
        }
        // SAFETY: `ready` is false, the consumer does not touch the buffer
        let buffer = unsafe { &mut *self.buffer.get() };
        let length = fill(buffer).ok_or(TransportError::FrameTooLarge)?;
        if length > N {
            return Err(TransportError::FrameTooLarge);
        }
        self.length.store(length, Ordering::Relaxed);
        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Consumer: hand the pending frame to `read`, then release the buffer
    pub fn consume<R>(&self, read: impl FnOnce(&[u8]) -> R) -> Option<R> {
        if !self.ready.load(Ordering::Acquire) {
            return None;
        }
        let length = self.length.load(Ordering::Relaxed);
        // SAFETY: `ready` is true, the producer does not touch the buffer
        let frame = unsafe { &(&*self.buffer.get())[..length] };
        let result = read(frame);
        self.ready.store(false, Ordering::Release);
        Some(result)
    }
}

/// [`Transport`] over a pair of handoffs shared with an interrupt handler
pub struct HandoffTransport<'a, const N: usize> {
    class_name: &'static str,
    inbound: &'a FrameHandoff<N>,
    outbound: &'a FrameHandoff<N>,
    frame: heapless::Vec<u8, N>,
}

impl<'a, const N: usize> HandoffTransport<'a, N> {
    pub fn new(
        class_name: &'static str,
        inbound: &'a FrameHandoff<N>,
        outbound: &'a FrameHandoff<N>,
    ) -> Self {
        Self {
            class_name,
            inbound,
            outbound,
            frame: heapless::Vec::new(),
        }
    }
}

impl<const N: usize> Transport for HandoffTransport<'_, N> {
    fn class_name(&self) -> &'static str {
        self.class_name
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut last_error = TransportError::SendFailed;
        for attempt in 0..SEND_ATTEMPTS {
            match self.outbound.publish(bytes) {
                Ok(()) => return Ok(()),
                Err(TransportError::Busy) => {
                    log::trace!("{} busy, attempt {}", self.class_name, attempt + 1);
                    last_error = TransportError::Busy;
                    core::hint::spin_loop();
                }
                Err(error) => return Err(error),
            }
        }
        Err(last_error)
    }

    fn receive(&mut self) -> Option<&[u8]> {
        let frame = &mut self.frame;
        let copied = self.inbound.consume(|bytes| {
            frame.clear();
            frame.extend_from_slice(bytes).is_ok()
        })?;
        if copied {
            Some(&self.frame)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_publish_then_consume() {
        let handoff = FrameHandoff::<8>::new();
        assert!(!handoff.is_ready());
        handoff.publish(b"abc").unwrap();
        assert!(handoff.is_ready());
        assert_eq!(handoff.consume(|frame| frame.len()), Some(3));
        assert!(!handoff.is_ready());
        assert_eq!(handoff.consume(|frame| frame.len()), None);
    }

    #[test]
    fn test_second_publish_refused_until_consumed() {
        let handoff = FrameHandoff::<8>::new();
        handoff.publish(b"one").unwrap();
        assert_eq!(handoff.publish(b"two"), Err(TransportError::Busy));
        assert_eq!(
            handoff.consume(|frame| frame == b"one"),
            Some(true)
        );
        handoff.publish(b"two").unwrap();
    }

    #[test]
    fn test_oversized_frame_refused() {
        let handoff = FrameHandoff::<4>::new();
        assert_eq!(handoff.publish(b"12345"), Err(TransportError::FrameTooLarge));
        assert!(!handoff.is_ready());
    }

    #[test]
    fn test_length_published_before_ready_across_threads() {
        let handoff = Arc::new(FrameHandoff::<32>::new());
        let producer = {
            let handoff = Arc::clone(&handoff);
            std::thread::spawn(move || {
                for round in 0..200u32 {
                    let length = (round % 32) as usize + 1;
                    let fill = round as u8;
                    while handoff
                        .publish_with(|buffer| {
                            buffer[..length].fill(fill);
                            Some(length)
                        })
                        .is_err()
                    {
                        std::thread::yield_now();
                    }
                }
            })
        };

        let mut received = 0u32;
        while received < 200 {
            let checked = handoff.consume(|frame| {
                let expected_length = (received % 32) as usize + 1;
                frame.len() == expected_length && frame.iter().all(|&b| b == received as u8)
            });
            match checked {
                Some(consistent) => {
                    assert!(consistent, "frame {} torn", received);
                    received += 1;
                }
                None => std::thread::yield_now(),
            }
        }
        producer.join().unwrap();
    }

    #[test]
    fn test_handoff_transport() {
        let inbound = FrameHandoff::<16>::new();
        let outbound = FrameHandoff::<16>::new();
        let mut transport = HandoffTransport::new("SpiSlave", &inbound, &outbound);

        assert_eq!(transport.receive(), None);
        inbound.publish(b"{\"a\":1}").unwrap();
        assert_eq!(transport.receive(), Some(&b"{\"a\":1}"[..]));
        assert_eq!(transport.receive(), None);

        transport.send(b"out").unwrap();
        assert_eq!(transport.send(b"again"), Err(TransportError::Busy));
        assert_eq!(outbound.consume(|frame| frame == b"out"), Some(true));
        assert_eq!(transport.class_name(), "SpiSlave");
    }
}
