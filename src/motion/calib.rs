// Calibrated wait thresholds and transition timing tables
//
// The wait thresholds are hand-tuned on the physical rig. The timing
// tables are aggregated offline from logged solves and loaded read-only
// at startup; they drive direction optimization and solution ranking.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::cut::{cut, CutCategory, CATEGORY_COUNT};
use super::moves::Step;
use super::Result;

/// Degrees of remaining travel at which the next move's pre-wait is
/// released, per cut category, for quarter- and half-turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitDegTable([[i32; 2]; CATEGORY_COUNT]);

impl WaitDegTable {
    pub fn get(&self, category: CutCategory, half: bool) -> i32 {
        self.0[category.index()][half as usize]
    }

    /// The (quarter, half) threshold pair of a category. Comparing two
    /// pairs lexicographically ranks how constraining the incoming cuts
    /// are.
    pub fn pair(&self, category: CutCategory) -> (i32, i32) {
        let row = self.0[category.index()];
        (row[0], row[1])
    }
}

/// Tuned for speed.
pub const WAITDEG_FAST: WaitDegTable = WaitDegTable([
    [12, 52], // Cut
    [10, 50], // AntiCut
    [20, 54], // AxCut1
    [24, 68], // AxCut2
    [22, 50], // AxPartCut1
    [20, 56], // AxPartCut2
    [12, 48], // AxAntiCut1
    [16, 60], // AxAntiCut2
    [24, 68], // AxAxCut
    [26, 68], // AxAxPartCut
    [18, 64], // AxAxAntiCut
]);

/// Slightly slower but extremely robust.
pub const WAITDEG_SAFE: WaitDegTable = WaitDegTable([
    [14, 54], // Cut
    [11, 54], // AntiCut
    [27, 72], // AxCut1
    [27, 72], // AxCut2
    [27, 63], // AxPartCut1
    [27, 63], // AxPartCut2
    [18, 66], // AxAntiCut1
    [18, 66], // AxAntiCut2
    [27, 72], // AxAxCut
    [27, 72], // AxAxPartCut
    [21, 72], // AxAxAntiCut
]);

/// Travel of the half-turn side before the quarter-turn side of a mixed
/// axial move is released.
pub const MIXED_LEAD_DEG: i32 = 5;

/// A turn counts as complete once within this many degrees of its
/// target.
pub const COMPLETION_TOLERANCE_DEG: i32 = 26;

/// Median observed transition seconds per cut category plus end-of-
/// sequence medians. Entries never observed are absent and rank as
/// infinitely slow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingTable {
    /// `[category][is_half]`
    cut: [[Option<f64>; 2]; CATEGORY_COUNT],
    /// `[is_axial][is_half]`, for the final move of a sequence
    end: [[Option<f64>; 2]; 2],
}

impl TimingTable {
    pub fn new(cut: [[Option<f64>; 2]; CATEGORY_COUNT], end: [[Option<f64>; 2]; 2]) -> Self {
        Self { cut, end }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let table: Self = serde_json::from_str(&text)?;
        info!("loaded timing table from {}", path.display());
        Ok(table)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn cut_seconds(&self, category: CutCategory, half: bool) -> f64 {
        self.cut[category.index()][half as usize].unwrap_or(f64::INFINITY)
    }

    pub fn end_seconds(&self, axial: bool, half: bool) -> f64 {
        self.end[axial as usize][half as usize].unwrap_or(f64::INFINITY)
    }

    /// Aggregate logged solves into a fresh table. Medians keep the
    /// rare lockup in the recorded data from skewing the entries.
    ///
    /// Each record pairs an executed sequence with its per-move
    /// durations in seconds.
    pub fn from_records(records: &[(Vec<Step>, Vec<f64>)]) -> Result<Self> {
        let mut cut_samples: [[Vec<f64>; 2]; CATEGORY_COUNT] =
            std::array::from_fn(|_| [Vec::new(), Vec::new()]);
        let mut end_samples: [[Vec<f64>; 2]; 2] =
            std::array::from_fn(|_| [Vec::new(), Vec::new()]);

        for (steps, seconds) in records {
            let pairs = steps.len().saturating_sub(1).min(seconds.len());
            for i in 0..pairs {
                let category = cut(steps[i], steps[i + 1])?;
                cut_samples[category.index()][steps[i].is_half() as usize].push(seconds[i]);
            }
            if !steps.is_empty() && seconds.len() == steps.len() {
                let last = steps[steps.len() - 1];
                end_samples[last.is_axial() as usize][last.is_half() as usize]
                    .push(seconds[seconds.len() - 1]);
            }
        }

        Ok(Self {
            cut: std::array::from_fn(|i| {
                [
                    median(&mut cut_samples[i][0]),
                    median(&mut cut_samples[i][1]),
                ]
            }),
            end: std::array::from_fn(|i| {
                [
                    median(&mut end_samples[i][0]),
                    median(&mut end_samples[i][1]),
                ]
            }),
        })
    }
}

fn median(samples: &mut Vec<f64>) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    samples.sort_by(f64::total_cmp);
    let mid = samples.len() / 2;
    Some(if samples.len() % 2 == 1 {
        samples[mid]
    } else {
        (samples[mid - 1] + samples[mid]) / 2.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::moves::{Face, Move};

    fn single(face: Face, twist: u8) -> Step {
        Step::Single(Move::from_parts(face, twist))
    }

    #[test]
    fn threshold_lookup() {
        assert_eq!(WAITDEG_SAFE.get(CutCategory::AntiCut, false), 11);
        assert_eq!(WAITDEG_SAFE.get(CutCategory::AntiCut, true), 54);
        assert_eq!(WAITDEG_FAST.get(CutCategory::AxAxAntiCut, true), 64);
        assert_eq!(WAITDEG_FAST.pair(CutCategory::Cut), (12, 52));
    }

    #[test]
    fn median_suppresses_outliers() {
        assert_eq!(median(&mut vec![0.3, 9.0, 0.2]), Some(0.3));
        assert_eq!(median(&mut vec![0.2, 0.4]), Some(0.30000000000000004));
        assert_eq!(median(&mut Vec::new()), None);
    }

    #[test]
    fn aggregation_buckets_by_category_and_width() {
        // U -> R is an anticut; the quarter-turn bucket gets the first
        // duration, the end bucket the last.
        let records = vec![
            (
                vec![single(Face::Up, 0), single(Face::Right, 0)],
                vec![0.20, 0.31],
            ),
            (
                vec![single(Face::Up, 0), single(Face::Right, 0)],
                vec![0.24, 0.29],
            ),
            (
                // an outlier lockup on the same transition
                vec![single(Face::Up, 0), single(Face::Right, 0)],
                vec![4.00, 0.30],
            ),
        ];
        let table = TimingTable::from_records(&records).unwrap();
        assert_eq!(table.cut_seconds(CutCategory::AntiCut, false), 0.24);
        assert_eq!(table.end_seconds(false, false), 0.30);
        // Never observed: infinitely slow
        assert_eq!(table.cut_seconds(CutCategory::Cut, true), f64::INFINITY);
        assert_eq!(table.end_seconds(true, true), f64::INFINITY);
    }

    #[test]
    fn json_round_trip() {
        let records = vec![(
            vec![single(Face::Up, 0), single(Face::Right, 2)],
            vec![0.21, 0.33],
        )];
        let table = TimingTable::from_records(&records).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turn_times.json");
        table.save(&path).unwrap();
        let loaded = TimingTable::load(&path).unwrap();
        assert_eq!(loaded, table);
    }
}
