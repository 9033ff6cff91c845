//! Register transport: request/acknowledge exchange with bounded retry
//!
//! Every write or command is answered by the UM7 with a packet addressed to
//! the same register. The sensor keeps broadcasting while we wait, so the
//! reply has to be picked out of the stream by address. A request is
//! retransmitted until a matching reply arrives or `MAX_ATTEMPTS`
//! transmissions have gone unanswered.

use super::packet::{encode, Packet};
use super::protocol::PacketReader;
use crate::error::{Error, Result};
use crate::transport::Transport;

/// Transmissions per request before giving up
pub const MAX_ATTEMPTS: u32 = 100;

/// Transport reads per receive cycle
pub const DEFAULT_RESPONSE_POLLS: u32 = 40;

/// Successful exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    /// Reply from the sensor
    pub packet: Packet,
    /// Transmissions it took (1 = first try)
    pub attempts: u32,
}

/// Request/acknowledge client over a UM7 transport
pub struct RegisterClient<T: Transport> {
    transport: T,
    reader: PacketReader,
    response_polls: u32,
}

impl<T: Transport> RegisterClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            reader: PacketReader::new(),
            response_polls: DEFAULT_RESPONSE_POLLS,
        }
    }

    /// Set how many transport reads make up one receive cycle
    pub fn with_response_polls(mut self, polls: u32) -> Self {
        self.response_polls = polls.max(1);
        self
    }

    /// Write `data` to register `address` and wait for the acknowledgement
    pub fn write(&mut self, address: u8, data: &[u8]) -> Result<Ack> {
        let request = Packet::write(address, data)?;
        let frame = encode(&request);

        for attempt in 1..=MAX_ATTEMPTS {
            self.transport.clear_input()?;
            self.reader.clear();
            self.transport.write(&frame)?;
            self.transport.flush()?;

            if let Some(packet) = self.receive_reply(address)? {
                if attempt > 1 {
                    log::debug!("UM7 R{:#04x} answered after {} attempts", address, attempt);
                }
                return Ok(Ack { packet, attempts: attempt });
            }

            if attempt % 25 == 0 {
                log::warn!("UM7 R{:#04x}: {} attempts without reply", address, attempt);
            }
        }

        log::error!(
            "No response from UM7 R{:#04x} after {} attempts",
            address,
            MAX_ATTEMPTS
        );
        Err(Error::NoResponse {
            address,
            attempts: MAX_ATTEMPTS,
        })
    }

    /// Issue command `code` (empty write) and check the COMMAND_FAILED bit
    pub fn command(&mut self, code: u8) -> Result<Ack> {
        let ack = self.write(code, &[])?;
        if ack.packet.packet_type().command_failed() {
            return Err(Error::CommandFailed { code });
        }
        Ok(ack)
    }

    /// Request register `address` and return the payload of the reply
    pub fn read(&mut self, address: u8) -> Result<Vec<u8>> {
        let ack = self.write(address, &[])?;
        Ok(ack.packet.data().to_vec())
    }

    /// One receive cycle: read until a packet for `address` shows up or the
    /// poll budget runs out
    fn receive_reply(&mut self, address: u8) -> Result<Option<Packet>> {
        for _ in 0..self.response_polls {
            let mut next = self.reader.read_packet(&mut self.transport)?;
            while let Some(packet) = next {
                if packet.address() == address {
                    return Ok(Some(packet));
                }
                log::trace!(
                    "UM7 reply for R{:#04x} while waiting for R{:#04x}",
                    packet.address(),
                    address
                );
                next = self.reader.next_packet();
            }
        }
        Ok(None)
    }

    /// Read from the transport and decode one broadcast packet, if any
    pub fn poll_packet(&mut self) -> Result<Option<Packet>> {
        self.reader.read_packet(&mut self.transport)
    }

    /// Next packet already buffered, without touching the transport
    pub fn next_buffered(&mut self) -> Option<Packet> {
        self.reader.next_packet()
    }

    pub fn reader(&self) -> &PacketReader {
        &self.reader
    }

    /// Split into transport and stream reader
    pub fn into_parts(self) -> (T, PacketReader) {
        (self.transport, self.reader)
    }
}
