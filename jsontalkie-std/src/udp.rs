//! Tokio UDP transport

use std::io::ErrorKind;
use std::net::SocketAddr;

use jsontalkie_core::{Transport, TransportError, MESSAGE_CAPACITY};
use log::{debug, trace, warn};
use tokio::net::UdpSocket;

/// Attempts made by [`UdpTransport::send`] while the socket would block
pub const SEND_ATTEMPTS: usize = 3;

/// Datagrams larger than this are truncated by the socket and then dropped
/// by the router; room is left for transport noise around a record.
const DATAGRAM_CAPACITY: usize = MESSAGE_CAPACITY * 2;

/// One record per datagram, sent to a fixed (usually broadcast) address
///
/// Sends and receives never wait: a socket that would block is retried a few
/// times on send and reported empty on receive. Sends go through a
/// non-blocking clone of the socket so they do not depend on the readiness
/// the Tokio reactor tracks for the receiving half.
pub struct UdpTransport {
    socket: UdpSocket,
    sender: std::net::UdpSocket,
    target: SocketAddr,
    datagram: [u8; DATAGRAM_CAPACITY],
}

impl UdpTransport {
    /// Bind `local` and send every record to `target`
    ///
    /// Broadcast is enabled on the socket so `target` may be a broadcast
    /// address. Must be called from within a Tokio runtime.
    pub async fn bind(local: SocketAddr, target: SocketAddr) -> std::io::Result<Self> {
        Self::from_socket(UdpSocket::bind(local).await?, target)
    }

    /// Wrap an already bound socket
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_socket(socket: UdpSocket, target: SocketAddr) -> std::io::Result<Self> {
        let socket = socket.into_std()?;
        socket.set_broadcast(true)?;
        let sender = socket.try_clone()?;
        sender.set_nonblocking(true)?;
        let socket = UdpSocket::from_std(socket)?;
        debug!("UDP transport on {} sending to {}", socket.local_addr()?, target);
        Ok(Self {
            socket,
            sender,
            target,
            datagram: [0; DATAGRAM_CAPACITY],
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Wait until a datagram can be read
    pub async fn readable(&self) -> std::io::Result<()> {
        self.socket.readable().await
    }
}

impl Transport for UdpTransport {
    fn class_name(&self) -> &'static str {
        "Udp"
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        for attempt in 1..=SEND_ATTEMPTS {
            match self.sender.send_to(bytes, self.target) {
                Ok(sent) if sent == bytes.len() => return Ok(()),
                Ok(sent) => {
                    warn!("UDP datagram cut to {} of {} bytes", sent, bytes.len());
                    return Err(TransportError::SendFailed);
                }
                Err(error) if error.kind() == ErrorKind::WouldBlock => {
                    trace!("UDP send would block, attempt {}", attempt);
                    std::thread::yield_now();
                }
                Err(error) => {
                    warn!("UDP send to {} failed: {}", self.target, error);
                    return Err(TransportError::Io);
                }
            }
        }
        Err(TransportError::Busy)
    }

    fn receive(&mut self) -> Option<&[u8]> {
        match self.socket.try_recv_from(&mut self.datagram) {
            Ok((len, from)) => {
                trace!("UDP {} bytes from {}", len, from);
                Some(&self.datagram[..len])
            }
            Err(error) if error.kind() == ErrorKind::WouldBlock => None,
            Err(error) => {
                debug!("UDP receive failed: {}", error);
                None
            }
        }
    }
}
