// Client for the external two-phase solver process
//
// The solver is a long-running subprocess driven over a line protocol:
// one request line in, result lines out, then a `Ready!` sentinel once
// it accepts the next request. Only syntactically valid sequences are
// expected from it; everything else is surfaced as an error.

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::{debug, info, warn};

use crate::config;
use crate::motion::moves::{parse_sequence, Step};
use crate::motion::MotionError;

#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    #[error("failed to launch solver: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("solver io: {0}")]
    Io(#[from] std::io::Error),

    #[error("solver closed its output stream")]
    Closed,

    #[error("solver reported: {0}")]
    Rejected(String),

    #[error(transparent)]
    Move(#[from] MotionError),
}

pub struct Solver {
    child: Child,
    input: ChildStdin,
    output: BufReader<ChildStdout>,
}

impl Solver {
    /// Launch the solver and block until it has booted.
    pub fn launch(path: &str) -> Result<Self, SolverError> {
        info!("launching solver {}", path);
        let mut child = Command::new(path)
            .arg("-t")
            .arg(config::SOLVER_THREADS.to_string())
            .arg("-s")
            .arg(config::SOLVER_SPLITS.to_string())
            .arg("-m")
            .arg(config::SOLVER_TIME_MILLIS.to_string())
            .arg("-w")
            .arg(config::SOLVER_WARMUPS.to_string())
            .arg("-c")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .map_err(SolverError::Spawn)?;
        let input = child.stdin.take().ok_or(SolverError::Closed)?;
        let output = BufReader::new(child.stdout.take().ok_or(SolverError::Closed)?);

        let mut solver = Self {
            child,
            input,
            output,
        };
        while !solver.read_line()?.contains("Ready!") {}
        info!("solver ready");
        Ok(solver)
    }

    fn read_line(&mut self) -> Result<String, SolverError> {
        let mut line = String::new();
        if self.output.read_line(&mut line)? == 0 {
            return Err(SolverError::Closed);
        }
        debug!(line = line.trim_end(), "solver");
        Ok(line)
    }

    fn request(&mut self, line: &str) -> Result<(), SolverError> {
        self.input.write_all(line.as_bytes())?;
        self.input.write_all(b"\n")?;
        // The request has to reach the solver immediately.
        self.input.flush()?;
        Ok(())
    }

    /// Solve a facelet string into an executable sequence.
    pub fn solve(&mut self, facelets: &str) -> Result<Vec<Step>, SolverError> {
        self.request(&format!("solve {facelets}"))?;
        let status = self.read_line()?; // time taken, or an error report
        if status.contains("error") {
            return Err(SolverError::Rejected(status.trim().to_string()));
        }
        let steps = parse_solution_line(&self.read_line()?)?;
        self.read_line()?; // consume the Ready! sentinel
        Ok(steps)
    }

    /// Ask for a fresh scramble sequence. Scrambling never fails on the
    /// solver side.
    pub fn scramble(&mut self) -> Result<Vec<Step>, SolverError> {
        self.request("scramble")?;
        self.read_line()?; // facelets
        self.read_line()?; // time taken
        let line = self.read_line()?;
        let steps = parse_sequence(line.trim())?;
        self.read_line()?; // Ready!
        Ok(steps)
    }
}

impl Drop for Solver {
    fn drop(&mut self) {
        if let Err(e) = self.child.kill() {
            warn!("failed to stop solver: {}", e);
        }
        let _ = self.child.wait();
    }
}

/// Strip the trailing ` (N)` length annotation, if any, and parse the
/// move text. Axial pairs also use parentheses, so only a numeric tail
/// is stripped.
fn parse_solution_line(line: &str) -> Result<Vec<Step>, SolverError> {
    let trimmed = line.trim_end();
    let text = match trimmed.rfind('(') {
        Some(idx) => {
            let tail = trimmed[idx + 1..].trim_end_matches(')');
            if !tail.is_empty() && tail.chars().all(|c| c.is_ascii_digit()) {
                &trimmed[..idx]
            } else {
                trimmed
            }
        }
        None => trimmed,
    };
    Ok(parse_sequence(text.trim())?)
}
