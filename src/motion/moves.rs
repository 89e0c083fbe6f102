// Face-turn model and the solver's text notation

use std::fmt;

use super::{MotionError, Result};

/// Number of distinct move encodings: six faces, four twists.
pub const MOVE_COUNT: u8 = 24;

/// The six logical faces, in encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Up,
    Down,
    Right,
    Left,
    Front,
    Back,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Up,
        Face::Down,
        Face::Right,
        Face::Left,
        Face::Front,
        Face::Back,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn letter(self) -> char {
        match self {
            Face::Up => 'U',
            Face::Down => 'D',
            Face::Right => 'R',
            Face::Left => 'L',
            Face::Front => 'F',
            Face::Back => 'B',
        }
    }

    fn from_letter(letter: char) -> Option<Face> {
        Some(match letter {
            'U' => Face::Up,
            'D' => Face::Down,
            'R' => Face::Right,
            'L' => Face::Left,
            'F' => Face::Front,
            'B' => Face::Back,
            _ => return None,
        })
    }

    /// The face on the other end of the same drive axis.
    pub fn opposite(self) -> Face {
        match self {
            Face::Up => Face::Down,
            Face::Down => Face::Up,
            Face::Right => Face::Left,
            Face::Left => Face::Right,
            Face::Front => Face::Back,
            Face::Back => Face::Front,
        }
    }
}

/// One face turn, packed as `4 * face + twist`.
///
/// Twist 0..4 is clockwise quarter, clockwise half, counter-clockwise
/// quarter, counter-clockwise half. A half-turn ends in the same state
/// either way round, so it has two encodings; the choice only matters
/// for corner cutting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move(u8);

impl Move {
    pub fn new(code: u8) -> Result<Self> {
        if code < MOVE_COUNT {
            Ok(Self(code))
        } else {
            Err(MotionError::InvalidMove(code))
        }
    }

    pub fn from_parts(face: Face, twist: u8) -> Self {
        debug_assert!(twist < 4);
        Self(face.index() as u8 * 4 + twist)
    }

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn face(self) -> Face {
        Face::ALL[(self.0 / 4) as usize]
    }

    pub fn twist(self) -> u8 {
        self.0 % 4
    }

    pub fn is_half(self) -> bool {
        self.twist() % 2 == 1
    }

    pub fn is_clockwise(self) -> bool {
        self.twist() <= 1
    }

    /// The direction-flipped encoding of a half-turn.
    pub fn flip_half(self) -> Move {
        debug_assert!(self.is_half());
        Self((self.0 / 4) * 4 + (self.0 + 2) % 4)
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = ["", "2", "'", "2'"][self.twist() as usize];
        write!(f, "{}{}", self.face().letter(), suffix)
    }
}

/// Two simultaneous moves on opposite faces of one drive unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxialMove {
    first: Move,
    second: Move,
}

impl AxialMove {
    pub fn new(first: Move, second: Move) -> Result<Self> {
        if first.face().opposite() != second.face() {
            return Err(MotionError::NotAxial(first, second));
        }
        Ok(Self { first, second })
    }

    pub fn first(self) -> Move {
        self.first
    }

    pub fn second(self) -> Move {
        self.second
    }

    pub fn swapped(self) -> AxialMove {
        Self {
            first: self.second,
            second: self.first,
        }
    }

    pub fn is_half(self) -> bool {
        self.first.is_half() || self.second.is_half()
    }

    /// Variant with the first half-turn running the other way.
    pub fn flip_first_half(self) -> AxialMove {
        Self {
            first: self.first.flip_half(),
            second: self.second,
        }
    }

    /// Variant with the second half-turn running the other way.
    pub fn flip_second_half(self) -> AxialMove {
        Self {
            first: self.first,
            second: self.second.flip_half(),
        }
    }
}

impl fmt::Display for AxialMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {})", self.first, self.second)
    }
}

/// One element of an executable sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Single(Move),
    Axial(AxialMove),
}

impl Step {
    pub fn is_axial(self) -> bool {
        matches!(self, Step::Axial(_))
    }

    pub fn is_half(self) -> bool {
        match self {
            Step::Single(m) => m.is_half(),
            Step::Axial(a) => a.is_half(),
        }
    }
}

impl From<Move> for Step {
    fn from(m: Move) -> Self {
        Step::Single(m)
    }
}

impl From<AxialMove> for Step {
    fn from(a: AxialMove) -> Self {
        Step::Axial(a)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Single(m) => write!(f, "{m}"),
            Step::Axial(a) => write!(f, "{a}"),
        }
    }
}

fn parse_token(token: &str) -> Result<Move> {
    let mut chars = token.chars();
    let face = chars
        .next()
        .and_then(Face::from_letter)
        .ok_or_else(|| MotionError::BadToken(token.to_string()))?;
    let twist = match chars.as_str() {
        "" => 0,
        "2" => 1,
        "'" => 2,
        "2'" | "'2" => 3,
        _ => return Err(MotionError::BadToken(token.to_string())),
    };
    Ok(Move::from_parts(face, twist))
}

/// Parse solver notation: whitespace-separated tokens, with axial pairs
/// in parentheses, e.g. `U (R L') F2`.
pub fn parse_sequence(text: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();
    let mut tokens = text.split_whitespace();
    while let Some(token) = tokens.next() {
        if let Some(first) = token.strip_prefix('(') {
            let closing = tokens
                .next()
                .ok_or_else(|| MotionError::BadToken(token.to_string()))?;
            let second = closing
                .strip_suffix(')')
                .ok_or_else(|| MotionError::BadToken(closing.to_string()))?;
            steps.push(Step::Axial(AxialMove::new(
                parse_token(first)?,
                parse_token(second)?,
            )?));
        } else {
            steps.push(Step::Single(parse_token(token)?));
        }
    }
    Ok(steps)
}

pub fn format_sequence(steps: &[Step]) -> String {
    steps
        .iter()
        .map(Step::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}
