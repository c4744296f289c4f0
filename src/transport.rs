//! Byte transport between the record layer and a peer.

use std::collections::VecDeque;
use std::io;

/// Moves serialized records to and from a peer.
///
/// The record layer never opens sockets itself. Implementations decide
/// whether `fetch_data` blocks.
pub trait TransportHandler {
    fn initialize(&mut self, address: &str, port: u16) -> io::Result<()>;

    fn send_data(&mut self, data: &[u8]) -> io::Result<()>;

    /// Everything received since the last call. Empty when nothing arrived.
    fn fetch_data(&mut self) -> io::Result<Vec<u8>>;

    fn close_connection(&mut self) -> io::Result<()>;
}

/// In-memory transport for tests and replays.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    peer: Option<(String, u16)>,
    incoming: VecDeque<Vec<u8>>,
    sent: Vec<Vec<u8>>,
    closed: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue bytes for the next `fetch_data`.
    pub fn push_incoming(&mut self, data: impl Into<Vec<u8>>) {
        self.incoming.push_back(data.into());
    }

    /// Each `send_data` call, in order.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.sent)
    }

    pub fn peer(&self) -> Option<(&str, u16)> {
        self.peer.as_ref().map(|(a, p)| (a.as_str(), *p))
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check_open(&self) -> io::Result<()> {
        if self.closed {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "transport is closed",
            ));
        }
        Ok(())
    }
}

impl TransportHandler for MemoryTransport {
    fn initialize(&mut self, address: &str, port: u16) -> io::Result<()> {
        self.peer = Some((address.to_string(), port));
        self.closed = false;
        Ok(())
    }

    fn send_data(&mut self, data: &[u8]) -> io::Result<()> {
        self.check_open()?;
        self.sent.push(data.to_vec());
        Ok(())
    }

    fn fetch_data(&mut self) -> io::Result<Vec<u8>> {
        self.check_open()?;
        let mut out = Vec::new();
        while let Some(chunk) = self.incoming.pop_front() {
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    fn close_connection(&mut self) -> io::Result<()> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_drains_queue() {
        let mut transport = MemoryTransport::new();
        transport.initialize("localhost", 4433).unwrap();
        transport.push_incoming(vec![1, 2]);
        transport.push_incoming(vec![3]);

        assert_eq!(transport.fetch_data().unwrap(), [1, 2, 3]);
        assert!(transport.fetch_data().unwrap().is_empty());
        assert_eq!(transport.peer(), Some(("localhost", 4433)));
    }

    #[test]
    fn closed_transport_refuses_io() {
        let mut transport = MemoryTransport::new();
        transport.close_connection().unwrap();
        let err = transport.send_data(&[1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }
}
