// Choreography of face turns
//
// Provides:
// - The move model and the solver's text notation
// - Corner-cut classification of adjacent move pairs
// - Calibrated wait thresholds and timing tables
// - Half-turn direction optimization and cost evaluation
// - The rig itself: face-to-motor binding and batch execution

pub mod calib;
pub mod cut;
pub mod moves;
pub mod optim;
pub mod rig;

pub use cut::{cut, CutCategory};
pub use moves::{parse_sequence, AxialMove, Move, Step};
pub use rig::Rig;

/// Error types for move handling and choreography
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error("move code {0} out of range")]
    InvalidMove(u8),

    #[error("unrecognized move token '{0}'")]
    BadToken(String),

    #[error("moves {0} and {1} do not share a drive axis")]
    NotAxial(Move, Move),

    #[error("move pair cannot be classified")]
    UnclassifiableMovePair,

    #[error("timing table io: {0}")]
    TableIo(#[from] std::io::Error),

    #[error("timing table format: {0}")]
    TableFormat(#[from] serde_json::Error),

    #[error(transparent)]
    Brick(#[from] crate::ev3::Ev3Error),
}

pub type Result<T> = std::result::Result<T, MotionError>;
