//! CH Robotics UM7 attitude and heading sensor
//!
//! - `packet`: frame codec and checksum
//! - `protocol`: streaming reader with resynchronization
//! - `register`: request/acknowledge exchange with bounded retry
//! - `session`: bring-up sequence
//! - `reader`: background thread feeding the heartbeat and the sensor file

pub mod constants;
pub mod health;
pub mod packet;
pub mod protocol;
pub mod reader;
pub mod register;
mod ring_buffer;
pub mod session;

pub use health::{Heartbeat, SharedHeartbeat};
pub use packet::{decode, decode_at, encode, FramingError, Packet, PacketType};
pub use protocol::{PacketReader, StreamStats};
pub use reader::{background_task, ReaderStats};
pub use register::{Ack, RegisterClient, MAX_ATTEMPTS};
pub use session::SensorSession;
