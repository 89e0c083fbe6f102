// Corner-cut classification of adjacent move pairs
//
// Cutting a corner is only mechanically favorable when adjacent faces
// rotate in visually continuing directions; axial moves constrain it
// further. The category of a pair decides which calibrated wait
// threshold releases the second move.

use super::moves::{AxialMove, Move, Step};
use super::{MotionError, Result};

pub const CATEGORY_COUNT: usize = 11;

/// How the incoming cut of a move pair must be treated.
///
/// The ordering carries meaning: the `..1`/`..2` pairs are the incoming
/// and outgoing classification of the same physical transition, one
/// ordinal apart, and the axial-axial reduction maps onto the tail of
/// the enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CutCategory {
    Cut,
    AntiCut,
    /// simple → axial
    AxCut1,
    /// axial → simple
    AxCut2,
    AxPartCut1,
    AxPartCut2,
    AxAntiCut1,
    AxAntiCut2,
    AxAxCut,
    AxAxPartCut,
    AxAxAntiCut,
}

impl CutCategory {
    pub const ALL: [CutCategory; CATEGORY_COUNT] = [
        CutCategory::Cut,
        CutCategory::AntiCut,
        CutCategory::AxCut1,
        CutCategory::AxCut2,
        CutCategory::AxPartCut1,
        CutCategory::AxPartCut2,
        CutCategory::AxAntiCut1,
        CutCategory::AxAntiCut2,
        CutCategory::AxAxCut,
        CutCategory::AxAxPartCut,
        CutCategory::AxAxAntiCut,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(MotionError::UnclassifiableMovePair)
    }
}

/// Classify the cut between `m1` and the following `m2`.
pub fn cut(m1: Step, m2: Step) -> Result<CutCategory> {
    classify(m1, m2, false)
}

fn classify(m1: Step, m2: Step, inverted: bool) -> Result<CutCategory> {
    match (m1, m2) {
        // The outgoing side of an axial transition is the incoming
        // classification of the swapped pair, one ordinal over.
        (Step::Axial(_), Step::Single(_)) => {
            let incoming = classify(m2, m1, true)?;
            CutCategory::from_index(incoming.index() + 1)
        }
        // Two simultaneous transitions are at least as constraining as
        // the worse of the two pairwise ones.
        (Step::Axial(_), Step::Axial(b)) => {
            let worst = classify(m1, Step::Single(b.first()), false)?
                .max(classify(m1, Step::Single(b.second()), false)?);
            CutCategory::from_index(CutCategory::AxAxCut.index() + worst.index() / 2 - 1)
        }
        (Step::Single(a), Step::Single(b)) => Ok(if a.is_clockwise() != b.is_clockwise() {
            CutCategory::Cut
        } else {
            CutCategory::AntiCut
        }),
        (Step::Single(a), Step::Axial(b)) => Ok(simple_to_axial(a, b, inverted)),
    }
}

fn simple_to_axial(m1: Move, m2: AxialMove, inverted: bool) -> CutCategory {
    let (m21, m22) = (m2.first(), m2.second());

    // A mixed axial move only produces a simple incoming cut, never a
    // simple outgoing one: its half-turn side leads, so that is the
    // side being cut into.
    if !inverted && m21.is_half() != m22.is_half() {
        let lead = if m21.is_half() { m21 } else { m22 };
        return if lead.is_clockwise() != m1.is_clockwise() {
            CutCategory::Cut
        } else {
            CutCategory::AntiCut
        };
    }

    if m21.is_clockwise() == m22.is_clockwise() {
        if m21.is_clockwise() != m1.is_clockwise() {
            CutCategory::AxCut1
        } else {
            CutCategory::AxAntiCut1
        }
    } else {
        CutCategory::AxPartCut1
    }
}
