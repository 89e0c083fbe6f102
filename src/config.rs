// Rig-wide tuning: brick identities, calibration paths, solver flags

/// Serial numbers of the three bricks, in binding order. Used to pick
/// the right brick out of wifi beacons.
pub const BRICK_HOSTS: [&str; 3] = [
    "00:16:53:7F:36:D9",
    "00:16:53:4A:BA:BA",
    "00:16:53:40:CE:B6",
];

/// Timing table produced by offline aggregation of logged solves.
pub const TIMING_TABLE_PATH: &str = "turn_times.json";

/// External two-phase solver binary.
pub const SOLVER_PATH: &str = "./twophase";

/// Solver tuning: worker threads, search splits, time budget per
/// request and warm-up iterations at boot.
pub const SOLVER_THREADS: u32 = 12;
pub const SOLVER_SPLITS: u32 = 2;
pub const SOLVER_TIME_MILLIS: u32 = 25;
pub const SOLVER_WARMUPS: u32 = 100;
