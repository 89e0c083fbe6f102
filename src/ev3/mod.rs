// Direct-command link to the EV3 motor-controller bricks
//
// Provides:
// - Variable-width encoding of command parameters
// - Framing, message counters and reply demultiplexing over the three
//   physical channel kinds
// - Assembly of self-contained rotation programs for the brick VM

mod conn;
pub mod encode;
pub mod ops;
pub mod program;
pub mod transport;

pub use conn::{Brick, Outcome, SyncMode};
pub use program::Batch;
pub use transport::Channel;

/// Error types for brick communication
#[derive(Debug, thiserror::Error)]
pub enum Ev3Error {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("direct command {counter} replied error")]
    DirectCommand { counter: u16 },

    #[error("system command replied error status 0x{status:02X}")]
    SystemCommand { status: u8 },

    #[error("timed out waiting for a reply")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, Ev3Error>;
