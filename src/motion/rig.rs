// The rig: face-to-motor binding and batch execution
//
// Three bricks drive six face motors in pairs. Every step becomes one
// direct-command batch on the brick owning its face; the batch embeds
// the wait threshold releasing the *next* step, so the host only paces
// the sequence while the bricks do the timing.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::ev3::ops::{PORT_A, PORT_B, PORT_C, PORT_D};
use crate::ev3::{program, Batch, Brick, Outcome};

use super::calib::{WaitDegTable, COMPLETION_TOLERANCE_DEG, MIXED_LEAD_DEG};
use super::cut::cut;
use super::moves::{AxialMove, Move, Step};
use super::Result;

pub const BRICK_COUNT: usize = 3;

/// Which brick and port pair drives a face.
#[derive(Debug, Clone, Copy)]
pub struct MotorBinding {
    pub brick: usize,
    pub ports: u8,
}

/// Face order U, D, R, L, F, B.
pub const FACE_MOTORS: [MotorBinding; 6] = [
    MotorBinding { brick: 0, ports: PORT_A | PORT_B }, // U
    MotorBinding { brick: 0, ports: PORT_C | PORT_D }, // D
    MotorBinding { brick: 2, ports: PORT_A | PORT_B }, // R
    MotorBinding { brick: 2, ports: PORT_C | PORT_D }, // L
    MotorBinding { brick: 1, ports: PORT_C | PORT_D }, // F
    MotorBinding { brick: 1, ports: PORT_A | PORT_B }, // B
];

/// Motor degrees per twist encoding; the sign folds in the double
/// inversion from the motor's perspective and the gearing.
pub const TURN_DEGREES: [i32; 4] = [54, 108, -54, -108];

fn binding(m: Move) -> MotorBinding {
    FACE_MOTORS[m.face().index()]
}

fn degrees(m: Move) -> i32 {
    TURN_DEGREES[m.twist() as usize]
}

/// Threshold for the last step of a sequence: the state is settled once
/// the final turn is within the completion tolerance of its target.
fn final_wait_deg(travel: i32) -> i32 {
    travel - COMPLETION_TOLERANCE_DEG
}

fn plan_single(m: Move, next: Option<Step>, waitdeg: &WaitDegTable) -> Result<(usize, Batch)> {
    let bind = binding(m);
    let deg = degrees(m);
    let wait = match next {
        None => final_wait_deg(deg.abs()),
        Some(next) => waitdeg.get(cut(Step::Single(m), next)?, m.is_half()),
    };
    Ok((bind.brick, program::rotate(bind.ports, deg, wait)?))
}

/// True when the first side's incoming cut from `prev` demands the
/// larger wait, i.e. the wait should track it instead of the second.
fn first_side_is_worse(
    prev: Step,
    first: Move,
    second: Move,
    waitdeg: &WaitDegTable,
) -> Result<bool> {
    Ok(waitdeg.pair(cut(prev, Step::Single(first))?)
        > waitdeg.pair(cut(prev, Step::Single(second))?))
}

fn plan_axial(
    a: AxialMove,
    prev: Option<Step>,
    next: Option<Step>,
    waitdeg: &WaitDegTable,
) -> Result<(usize, Batch)> {
    let wait = match next {
        None => final_wait_deg(
            degrees(a.first()).abs().max(degrees(a.second()).abs()),
        ),
        Some(next) => waitdeg.get(cut(Step::Axial(a), next)?, Step::Axial(a).is_half()),
    };

    if a.first().is_half() != a.second().is_half() {
        // Half plus quarter: the half leads and the quarter starts a
        // little later, so both end jointly and the next move is
        // automatically aligned.
        let a = if a.second().is_half() { a.swapped() } else { a };
        let (b1, b2) = (binding(a.first()), binding(a.second()));
        let batch = program::rotate_mixed(
            b1.ports,
            b2.ports,
            degrees(a.first()),
            degrees(a.second()),
            MIXED_LEAD_DEG,
            wait,
        )?;
        return Ok((b1.brick, batch));
    }

    // Wait on the side with the worse in-cutting.
    let a = match prev {
        Some(prev) if first_side_is_worse(prev, a.first(), a.second(), waitdeg)? => a.swapped(),
        _ => a,
    };
    let (b1, b2) = (binding(a.first()), binding(a.second()));
    let batch = program::rotate_axial(
        b1.ports,
        b2.ports,
        degrees(a.first()),
        degrees(a.second()),
        wait,
    )?;
    Ok((b1.brick, batch))
}

/// The assembled rig.
pub struct Rig {
    bricks: [Brick; BRICK_COUNT],
    waitdeg: WaitDegTable,
}

impl Rig {
    pub fn new(bricks: [Brick; BRICK_COUNT], waitdeg: WaitDegTable) -> Self {
        Self { bricks, waitdeg }
    }

    fn run_step(&self, step: Step, prev: Option<Step>, next: Option<Step>) -> Result<()> {
        let (brick, batch) = match step {
            Step::Single(m) => plan_single(m, next, &self.waitdeg)?,
            Step::Axial(a) => plan_axial(a, prev, next, &self.waitdeg)?,
        };
        debug!(%step, brick, "dispatching batch");
        self.bricks[brick].send_direct(&batch.ops, 0, batch.global_mem)?;
        Ok(())
    }

    /// Execute a sequence, one blocking batch per step.
    ///
    /// The per-move wall-clock durations are returned for offline
    /// calibration of the timing tables.
    pub fn execute(&self, steps: &[Step]) -> Result<Vec<Duration>> {
        info!(moves = steps.len(), "executing sequence");
        let mut durations = Vec::with_capacity(steps.len());
        for (i, &step) in steps.iter().enumerate() {
            let prev = (i > 0).then(|| steps[i - 1]);
            let next = steps.get(i + 1).copied();
            let started = Instant::now();
            self.run_step(step, prev, next)?;
            durations.push(started.elapsed());
        }
        Ok(durations)
    }

    /// Sample a touch sensor on one of the bricks.
    pub fn button_pressed(&self, brick: usize, port: i32) -> Result<bool> {
        let batch = program::read_pressed(port)?;
        match self.bricks[brick].send_direct(&batch.ops, 0, batch.global_mem)? {
            Outcome::Reply(data) => Ok(data.first().map(|&b| b as i8 > 0).unwrap_or(false)),
            // Only reachable in async mode, where nothing was sampled.
            Outcome::Pending(_) => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::calib::WAITDEG_SAFE;
    use crate::motion::cut::CutCategory;
    use crate::motion::moves::{parse_sequence, Face};

    fn step(text: &str) -> Step {
        parse_sequence(text).unwrap()[0]
    }

    #[test]
    fn three_move_batches_embed_the_safe_thresholds() {
        let steps = parse_sequence("U R F'").unwrap();

        // U into R: both clockwise quarters, an anticut
        let (brick, batch) = plan_single(
            Move::from_parts(Face::Up, 0),
            Some(steps[1]),
            &WAITDEG_SAFE,
        )
        .unwrap();
        assert_eq!(brick, 0);
        assert_eq!(
            batch,
            program::rotate(
                PORT_A | PORT_B,
                54,
                WAITDEG_SAFE.get(CutCategory::AntiCut, false)
            )
            .unwrap()
        );

        // R into F': opposite senses, a full cut
        let (brick, batch) = plan_single(
            Move::from_parts(Face::Right, 0),
            Some(steps[2]),
            &WAITDEG_SAFE,
        )
        .unwrap();
        assert_eq!(brick, 2);
        assert_eq!(
            batch,
            program::rotate(
                PORT_A | PORT_B,
                54,
                WAITDEG_SAFE.get(CutCategory::Cut, false)
            )
            .unwrap()
        );

        // F' is last: threshold comes from the completion tolerance
        let (brick, batch) =
            plan_single(Move::from_parts(Face::Front, 2), None, &WAITDEG_SAFE).unwrap();
        assert_eq!(brick, 1);
        assert_eq!(
            batch,
            program::rotate(PORT_C | PORT_D, -54, 54 - 26).unwrap()
        );
    }

    #[test]
    fn final_axial_waits_on_the_larger_travel() {
        let Step::Axial(a) = step("(R L2)") else {
            panic!()
        };
        let (brick, batch) = plan_axial(a, None, None, &WAITDEG_SAFE).unwrap();
        assert_eq!(brick, 2);
        // The half leads: ports and degrees of L2 come first, and the
        // threshold spans 108 - 26 degrees
        assert_eq!(
            batch,
            program::rotate_mixed(
                PORT_C | PORT_D,
                PORT_A | PORT_B,
                108,
                54,
                MIXED_LEAD_DEG,
                108 - 26
            )
            .unwrap()
        );
    }

    #[test]
    fn equal_axial_wait_tracks_the_worse_incoming_side() {
        // After U, the cut into L' is worse than the cut into R, so
        // (L' R) is reordered while (R L') stays.
        let prev = Some(step("U"));
        let Step::Axial(fwd) = step("(R L')") else {
            panic!()
        };
        let Step::Axial(rev) = step("(L' R)") else {
            panic!()
        };
        let planned_fwd = plan_axial(fwd, prev, None, &WAITDEG_SAFE).unwrap();
        let planned_rev = plan_axial(rev, prev, None, &WAITDEG_SAFE).unwrap();
        assert_eq!(planned_fwd, planned_rev);
        assert_eq!(
            planned_fwd.1,
            program::rotate_axial(PORT_A | PORT_B, PORT_C | PORT_D, 54, -54, 54 - 26)
                .unwrap()
        );
    }

    #[test]
    fn axial_threshold_uses_the_pair_category() {
        let Step::Axial(a) = step("(R L)") else {
            panic!()
        };
        let next = Some(step("U"));
        let (_, batch) = plan_axial(a, None, next, &WAITDEG_SAFE).unwrap();
        // (R L) into U classifies as an axial-to-simple anticut
        assert_eq!(
            batch,
            program::rotate_axial(
                PORT_A | PORT_B,
                PORT_C | PORT_D,
                54,
                54,
                WAITDEG_SAFE.get(CutCategory::AxAntiCut2, false)
            )
            .unwrap()
        );
    }
}
