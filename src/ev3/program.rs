// Rotation programs for the brick VM
//
// Each batch is one self-contained program: settle any previous motion,
// compute the tachometer target that releases the next move, start the
// rotation, and spin on the live count until the target is crossed. The
// brick runs the whole batch without host interaction, which is what
// lets consecutive moves overlap.

use super::encode::{gvx, lcx};
use super::ops;
use super::{Ev3Error, Result};

/// Motor power for all rotations.
const POWER: i32 = 100;

// Global slots of the two-target batches (32-bit values).
const TARGET_SLOT: i32 = 0;
const LIVE_SLOT: i32 = 4;

// The mixed batch needs a second target: slot 0 releases the trailing
// rotation, slot 4 releases the next move, slot 8 holds the live count.
const LEAD_TARGET_SLOT: i32 = 0;
const RELEASE_TARGET_SLOT: i32 = 4;
const MIXED_LIVE_SLOT: i32 = 8;

/// One program plus the global memory it reserves on the brick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub ops: Vec<u8>,
    pub global_mem: u16,
}

/// Lowest set bit of a port mask: the port whose tachometer a batch watches.
pub fn some_port(ports: u8) -> u8 {
    ports & ports.wrapping_neg()
}

/// Input port alias of a single output port bit.
fn motor_input(port: u8) -> Result<Vec<u8>> {
    let input = match port {
        ops::PORT_A => ops::PORT_A_INPUT,
        ops::PORT_B => ops::PORT_B_INPUT,
        ops::PORT_C => ops::PORT_C_INPUT,
        ops::PORT_D => ops::PORT_D_INPUT,
        _ => {
            return Err(Ev3Error::InvalidArgument(format!(
                "port mask 0x{port:02X} is not a single motor port"
            )));
        }
    };
    Ok(lcx(input))
}

/// Read the raw tachometer count of `port` into global `slot`.
pub fn tacho_count(port: u8, slot: i32) -> Result<Vec<u8>> {
    let mut out = vec![ops::OP_INPUT_DEVICE, ops::GET_RAW];
    out.extend(lcx(0)); // layer
    out.extend(motor_input(port)?);
    out.extend(gvx(slot)?);
    Ok(out)
}

/// Start rotating `ports` by |degrees| at full power; the sign picks the
/// direction.
pub fn start_rotation(ports: u8, degrees: i32) -> Vec<u8> {
    let mut out = vec![ops::OP_OUTPUT_STEP_POWER];
    out.extend(lcx(0)); // layer
    out.extend(lcx(ports as i32));
    out.extend(lcx(if degrees > 0 { POWER } else { -POWER }));
    out.extend(lcx(0)); // ramp-up
    out.extend(lcx(degrees.abs()));
    out.extend(lcx(0)); // ramp-down
    out.extend(lcx(1)); // brake
    out
}

/// Block the program until motion on `ports` has settled.
pub fn wait_ready(ports: u8) -> Vec<u8> {
    let mut out = vec![ops::OP_OUTPUT_READY];
    out.extend(lcx(0));
    out.extend(lcx(ports as i32));
    out
}

/// Compute the tachometer count at which the waiting side releases:
/// current count of `wait_port` plus `wait_deg` in the direction of the
/// current move.
pub fn target_count(degrees: i32, wait_port: u8, wait_deg: i32, slot: i32) -> Result<Vec<u8>> {
    let mut out = tacho_count(wait_port, slot)?;
    out.push(ops::OP_ADD32);
    out.extend(gvx(slot)?);
    out.extend(lcx(if degrees > 0 { wait_deg } else { -wait_deg }));
    out.extend(gvx(slot)?);
    Ok(out)
}

/// Busy-wait until `wait_port` crosses the target: re-read the live
/// count and branch backward over the read while it is still short of
/// (positive direction) or above (negative) the target.
pub fn spin_until(degrees: i32, wait_port: u8, target_slot: i32, live_slot: i32) -> Result<Vec<u8>> {
    let read = tacho_count(wait_port, live_slot)?;
    let mut branch = vec![if degrees > 0 {
        ops::OP_JR_LT32
    } else {
        ops::OP_JR_GT32
    }];
    branch.extend(gvx(live_slot)?);
    branch.extend(gvx(target_slot)?);
    // Offset back over the whole loop body, counting the offset byte
    // itself; it must stay in the single-byte inline form.
    let offset = -((read.len() + branch.len() + 1) as i32);
    debug_assert!(offset >= -32);
    branch.extend(lcx(offset));

    let mut out = read;
    out.extend(branch);
    Ok(out)
}

/// Single-face move: settle, arm the release target, rotate, spin.
pub fn rotate(ports: u8, degrees: i32, wait_deg: i32) -> Result<Batch> {
    let wait_port = some_port(ports);
    let mut out = wait_ready(ports);
    out.extend(target_count(degrees, wait_port, wait_deg, TARGET_SLOT)?);
    out.extend(start_rotation(ports, degrees));
    out.extend(spin_until(degrees, wait_port, TARGET_SLOT, LIVE_SLOT)?);
    Ok(Batch {
        ops: out,
        global_mem: 8,
    })
}

/// Axial move with equal magnitudes on both sides; the release wait
/// tracks the second side.
pub fn rotate_axial(
    ports1: u8,
    ports2: u8,
    degrees1: i32,
    degrees2: i32,
    wait_deg: i32,
) -> Result<Batch> {
    let wait_port = some_port(ports2);
    let mut out = wait_ready(ports1 | ports2);
    out.extend(target_count(degrees2, wait_port, wait_deg, TARGET_SLOT)?);
    out.extend(start_rotation(ports1, degrees1));
    out.extend(start_rotation(ports2, degrees2));
    out.extend(spin_until(degrees2, wait_port, TARGET_SLOT, LIVE_SLOT)?);
    Ok(Batch {
        ops: out,
        global_mem: 8,
    })
}

/// Axial move with a half-turn on the first side and a quarter-turn on
/// the second. The second side starts once the first has travelled
/// `lead_deg`, so both finish together and the next move self-aligns.
pub fn rotate_mixed(
    ports1: u8,
    ports2: u8,
    degrees1: i32,
    degrees2: i32,
    lead_deg: i32,
    wait_deg: i32,
) -> Result<Batch> {
    let wait_port = some_port(ports1);
    let mut out = wait_ready(ports1 | ports2);
    out.extend(target_count(degrees1, wait_port, lead_deg, LEAD_TARGET_SLOT)?);
    out.extend(target_count(degrees1, wait_port, wait_deg, RELEASE_TARGET_SLOT)?);
    out.extend(start_rotation(ports1, degrees1));
    out.extend(spin_until(degrees1, wait_port, LEAD_TARGET_SLOT, MIXED_LIVE_SLOT)?);
    out.extend(start_rotation(ports2, degrees2));
    out.extend(spin_until(degrees1, wait_port, RELEASE_TARGET_SLOT, MIXED_LIVE_SLOT)?);
    Ok(Batch {
        ops: out,
        global_mem: 12,
    })
}

/// Sample the touch sensor on `port`; the single global byte is positive
/// while pressed.
pub fn read_pressed(port: i32) -> Result<Batch> {
    let mut out = vec![ops::OP_INPUT_READ];
    out.extend(lcx(0)); // layer
    out.extend(lcx(port));
    out.extend(lcx(ops::TYPE_TOUCH));
    out.extend(lcx(0)); // mode
    out.extend(gvx(0)?);
    Ok(Batch {
        ops: out,
        global_mem: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn some_port_picks_the_lowest_bit() {
        assert_eq!(some_port(0b0011), 0b0001);
        assert_eq!(some_port(0b1100), 0b0100);
        assert_eq!(some_port(0b1010), 0b0010);
        assert_eq!(some_port(0b1000), 0b1000);
    }

    #[test]
    fn tacho_read_rejects_multi_port_masks() {
        assert!(matches!(
            tacho_count(ops::PORT_A | ops::PORT_B, 0),
            Err(Ev3Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn spin_loop_branches_back_over_the_reread() {
        // read (5 bytes) + branch (3 bytes) + offset byte = 9
        let ops_bytes = spin_until(54, ops::PORT_A, 0, 4).unwrap();
        assert_eq!(
            ops_bytes,
            vec![0x99, 0x0B, 0x00, 0x10, 0x64, 0x66, 0x64, 0x60, 0x37]
        );
    }

    #[test]
    fn spin_direction_selects_the_comparison() {
        let forward = spin_until(54, ops::PORT_C, 0, 4).unwrap();
        let backward = spin_until(-54, ops::PORT_C, 0, 4).unwrap();
        assert_eq!(forward[5], ops::OP_JR_LT32);
        assert_eq!(backward[5], ops::OP_JR_GT32);
    }

    #[test]
    fn start_rotation_encodes_power_and_magnitude() {
        assert_eq!(
            start_rotation(ops::PORT_A | ops::PORT_B, 54),
            vec![0xAC, 0x00, 0x03, 0x81, 0x64, 0x00, 0x81, 0x36, 0x00, 0x01]
        );
        assert_eq!(
            start_rotation(ops::PORT_C | ops::PORT_D, -108),
            vec![0xAC, 0x00, 0x0C, 0x81, 0x9C, 0x00, 0x81, 0x6C, 0x00, 0x01]
        );
    }

    #[test]
    fn target_count_signs_the_threshold() {
        let forward = target_count(54, ops::PORT_A, 12, 0).unwrap();
        let backward = target_count(-54, ops::PORT_A, 12, 0).unwrap();
        // ...read..., ADD32, gv0, ±12, gv0
        assert_eq!(&forward[5..], &[0x12, 0x60, 12, 0x60]);
        assert_eq!(&backward[5..], &[0x12, 0x60, 0x3F & (-12i32 + 64) as u8, 0x60]);
    }

    #[test]
    fn rotate_composes_the_full_batch() {
        let ports = ops::PORT_A | ops::PORT_B;
        let batch = rotate(ports, 108, 52).unwrap();

        let mut expected = wait_ready(ports);
        expected.extend(target_count(108, ops::PORT_A, 52, 0).unwrap());
        expected.extend(start_rotation(ports, 108));
        expected.extend(spin_until(108, ops::PORT_A, 0, 4).unwrap());

        assert_eq!(batch.ops, expected);
        assert_eq!(batch.global_mem, 8);
    }

    #[test]
    fn axial_batch_waits_on_the_second_side() {
        let (p1, p2) = (ops::PORT_A | ops::PORT_B, ops::PORT_C | ops::PORT_D);
        let batch = rotate_axial(p1, p2, 54, -54, 20).unwrap();

        let mut expected = wait_ready(p1 | p2);
        expected.extend(target_count(-54, ops::PORT_C, 20, 0).unwrap());
        expected.extend(start_rotation(p1, 54));
        expected.extend(start_rotation(p2, -54));
        expected.extend(spin_until(-54, ops::PORT_C, 0, 4).unwrap());

        assert_eq!(batch.ops, expected);
        assert_eq!(batch.global_mem, 8);
    }

    #[test]
    fn mixed_batch_stages_two_targets() {
        let (p1, p2) = (ops::PORT_A | ops::PORT_B, ops::PORT_C | ops::PORT_D);
        let batch = rotate_mixed(p1, p2, 108, 54, 5, 50).unwrap();

        let mut expected = wait_ready(p1 | p2);
        expected.extend(target_count(108, ops::PORT_A, 5, 0).unwrap());
        expected.extend(target_count(108, ops::PORT_A, 50, 4).unwrap());
        expected.extend(start_rotation(p1, 108));
        expected.extend(spin_until(108, ops::PORT_A, 0, 8).unwrap());
        expected.extend(start_rotation(p2, 54));
        expected.extend(spin_until(108, ops::PORT_A, 4, 8).unwrap());

        assert_eq!(batch.ops, expected);
        assert_eq!(batch.global_mem, 12);
    }

    #[test]
    fn pressed_program_reads_one_byte() {
        let batch = read_pressed(0).unwrap();
        assert_eq!(batch.ops, vec![0x9A, 0x00, 0x00, 0x10, 0x00, 0x60]);
        assert_eq!(batch.global_mem, 1);
    }
}
