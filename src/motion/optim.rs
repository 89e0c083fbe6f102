// Half-turn direction selection and sequence cost evaluation
//
// The wait thresholds are not directly proportional to real execution
// speed, so direction choices and solution ranking run on the collected
// timing data instead.

use super::calib::TimingTable;
use super::cut::cut;
use super::moves::Step;
use super::Result;

/// Upper bound on direction-equivalent variants of one step: a mixed
/// axial move with two half-turns can flip either side.
const MAX_VARIANTS: usize = 4;

/// Expected wall-clock seconds of a sequence under the timing tables.
pub fn expected_time(steps: &[Step], times: &TimingTable) -> Result<f64> {
    let Some(&last) = steps.last() else {
        return Ok(0.0);
    };
    let mut total = 0.0;
    for pair in steps.windows(2) {
        total += times.cut_seconds(cut(pair[0], pair[1])?, pair[0].is_half());
    }
    total += times.end_seconds(last.is_axial(), last.is_half());
    Ok(total)
}

/// Direction-equivalent encodings of one step. Only half-turns have a
/// choice; flipping one never changes the physical end state.
fn variants(step: Step) -> Vec<Step> {
    let mut out = vec![step];
    match step {
        Step::Single(m) => {
            if m.is_half() {
                out.push(Step::Single(m.flip_half()));
            }
        }
        Step::Axial(a) => {
            if a.first().is_half() {
                out.push(Step::Axial(a.flip_first_half()));
            }
            if a.second().is_half() {
                out.push(Step::Axial(a.flip_second_half()));
            }
            if a.first().is_half() && a.second().is_half() {
                out.push(Step::Axial(a.flip_first_half().flip_second_half()));
            }
        }
    }
    out
}

/// Pick the half-turn directions minimizing the expected execution time.
///
/// Forward dynamic program over positions and variant indices; the
/// predecessor table reconstructs the chosen variants. Unreachable
/// states keep an infinite cost.
pub fn optimize_directions(steps: &[Step], times: &TimingTable) -> Result<Vec<Step>> {
    if steps.is_empty() {
        return Ok(Vec::new());
    }
    let options: Vec<Vec<Step>> = steps.iter().map(|&s| variants(s)).collect();
    let n = options.len();

    let mut cost = vec![[f64::INFINITY; MAX_VARIANTS]; n];
    let mut pred = vec![[0usize; MAX_VARIANTS]; n];
    cost[0] = [0.0; MAX_VARIANTS];

    for i in 1..n {
        for (j, &op2) in options[i].iter().enumerate() {
            for (k, &op1) in options[i - 1].iter().enumerate() {
                let c = cost[i - 1][k] + times.cut_seconds(cut(op1, op2)?, op1.is_half());
                if c < cost[i][j] {
                    cost[i][j] = c;
                    pred[i][j] = k;
                }
            }
        }
    }

    let mut j = 0;
    for idx in 1..options[n - 1].len() {
        if cost[n - 1][idx] < cost[n - 1][j] {
            j = idx;
        }
    }
    let mut picked = vec![options[n - 1][j]];
    for i in (1..n).rev() {
        j = pred[i][j];
        picked.push(options[i - 1][j]);
    }
    picked.reverse();
    Ok(picked)
}

/// Optimize every candidate and keep the one expected to finish first.
pub fn best_sequence(candidates: &[Vec<Step>], times: &TimingTable) -> Result<Option<Vec<Step>>> {
    let mut best: Option<(f64, Vec<Step>)> = None;
    for candidate in candidates {
        let tuned = optimize_directions(candidate, times)?;
        let seconds = expected_time(&tuned, times)?;
        if best.as_ref().map_or(true, |(b, _)| seconds < *b) {
            best = Some((seconds, tuned));
        }
    }
    Ok(best.map(|(_, steps)| steps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::calib::TimingTable;
    use crate::motion::cut::{CutCategory, CATEGORY_COUNT};
    use crate::motion::moves::parse_sequence;

    /// Full cuts fast, anticuts slow, everything else in between.
    fn test_table() -> TimingTable {
        let mut cut = [[Some(0.5); 2]; CATEGORY_COUNT];
        cut[CutCategory::Cut.index()] = [Some(0.1), Some(0.1)];
        cut[CutCategory::AntiCut.index()] = [Some(0.9), Some(0.9)];
        TimingTable::new(cut, [[Some(0.4); 2]; 2])
    }

    #[test]
    fn expected_time_sums_transitions_and_the_final_entry() {
        let times = test_table();
        // U -> R2 is an anticut off a quarter-turn; R2 ends as a half
        let steps = parse_sequence("U R2").unwrap();
        let total = expected_time(&steps, &times).unwrap();
        assert!((total - (0.9 + 0.4)).abs() < 1e-9);

        let single = parse_sequence("U").unwrap();
        assert!((expected_time(&single, &times).unwrap() - 0.4).abs() < 1e-9);
        assert_eq!(expected_time(&[], &times).unwrap(), 0.0);
    }

    #[test]
    fn flipping_a_half_turn_improves_the_cut() {
        let times = test_table();
        let steps = parse_sequence("U R2").unwrap();
        let tuned = optimize_directions(&steps, &times).unwrap();

        // U stays, R2 turns the other way so the pair cuts instead of
        // anticutting
        assert_eq!(tuned[0], steps[0]);
        assert_eq!(format!("{}", tuned[1]), "R2'");
        assert!(
            expected_time(&tuned, &times).unwrap()
                <= expected_time(&steps, &times).unwrap()
        );
    }

    #[test]
    fn optimization_preserves_the_physical_moves() {
        let times = test_table();
        let steps = parse_sequence("U2 (R2 L2) D' (F2 B) L2").unwrap();
        let tuned = optimize_directions(&steps, &times).unwrap();
        assert_eq!(tuned.len(), steps.len());

        for (before, after) in steps.iter().zip(&tuned) {
            match (before, after) {
                (Step::Single(b), Step::Single(a)) => {
                    assert_eq!(b.face(), a.face());
                    assert_eq!(b.is_half(), a.is_half());
                    if !b.is_half() {
                        assert_eq!(b, a);
                    }
                }
                (Step::Axial(b), Step::Axial(a)) => {
                    for (bm, am) in [(b.first(), a.first()), (b.second(), a.second())] {
                        assert_eq!(bm.face(), am.face());
                        assert_eq!(bm.is_half(), am.is_half());
                        if !bm.is_half() {
                            assert_eq!(bm, am);
                        }
                    }
                }
                _ => panic!("step shape changed"),
            }
        }
        assert!(
            expected_time(&tuned, &times).unwrap()
                <= expected_time(&steps, &times).unwrap()
        );
    }

    #[test]
    fn best_sequence_ranks_candidates() {
        let times = test_table();
        // Three quarter-turn anticuts against one cut
        let slow = parse_sequence("U R F L").unwrap();
        let fast = parse_sequence("U R'").unwrap();
        let best = best_sequence(&[slow, fast.clone()], &times).unwrap().unwrap();
        assert_eq!(best, fast);
        assert!(best_sequence(&[], &times).unwrap().is_none());
    }
}
