// Wire constants of the direct-command protocol
//
// The values are fixed by the brick firmware; only the subset this crate
// emits is listed.

// Command type bytes
pub const DIRECT_COMMAND_REPLY: u8 = 0x00;
pub const DIRECT_COMMAND_NO_REPLY: u8 = 0x80;
pub const SYSTEM_COMMAND_REPLY: u8 = 0x01;
pub const SYSTEM_COMMAND_NO_REPLY: u8 = 0x81;

// Reply type bytes
pub const DIRECT_REPLY: u8 = 0x02;
pub const DIRECT_REPLY_ERROR: u8 = 0x04;
pub const SYSTEM_REPLY: u8 = 0x03;
pub const SYSTEM_REPLY_ERROR: u8 = 0x05;

/// Does nothing; useful for probing a link.
pub const OP_NOP: u8 = 0x01;

/// Add two 32-bit values into a destination variable.
pub const OP_ADD32: u8 = 0x12;

/// Relative branch if the first 32-bit operand is less than the second.
pub const OP_JR_LT32: u8 = 0x66;
/// Relative branch if the first 32-bit operand is greater than the second.
pub const OP_JR_GT32: u8 = 0x6A;

/// Device-level input access; subcode `GET_RAW` reads the raw value.
pub const OP_INPUT_DEVICE: u8 = 0x99;
pub const GET_RAW: u8 = 0x0B;

/// Sampled input read, used for the touch sensors.
pub const OP_INPUT_READ: u8 = 0x9A;

/// Block until motion on the given output ports has settled.
pub const OP_OUTPUT_READY: u8 = 0xAA;

/// Stepped rotation at fixed power.
pub const OP_OUTPUT_STEP_POWER: u8 = 0xAC;

// Output port bits
pub const PORT_A: u8 = 0x01;
pub const PORT_B: u8 = 0x02;
pub const PORT_C: u8 = 0x04;
pub const PORT_D: u8 = 0x08;

/// Input port numbers aliasing the output ports A..D.
pub const PORT_A_INPUT: i32 = 16;
pub const PORT_B_INPUT: i32 = 17;
pub const PORT_C_INPUT: i32 = 18;
pub const PORT_D_INPUT: i32 = 19;

/// Touch sensor device type.
pub const TYPE_TOUCH: i32 = 16;
