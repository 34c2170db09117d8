//! Integer voxel coordinates, dimensions, and the six axis-aligned directions.
//!
//! [`Coord`] is the canonical key for every map in the engine. Its string
//! form `"<x>,<y>,<z>"` is the stable format used for durable store keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Coord
// ---------------------------------------------------------------------------

/// A cell position in the voxel world.
///
/// Ordering is lexicographic on `(x, y, z)`, which is what network anchors
/// rely on when they pick the smallest coordinate seen during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The neighbouring cell in the given direction.
    pub fn offset(self, dir: Direction) -> Self {
        let (dx, dy, dz) = dir.offset();
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The six face-adjacent cells, in [`Direction::ALL`] order.
    pub fn neighbors(self) -> impl Iterator<Item = (Direction, Coord)> {
        Direction::ALL.into_iter().map(move |d| (d, self.offset(d)))
    }

    /// The 16x16 column containing this cell.
    pub fn chunk(&self) -> ChunkPos {
        ChunkPos::new(self.x >> 4, self.z >> 4)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.x, self.y, self.z)
    }
}

/// Error returned when a string is not in `"<x>,<y>,<z>"` form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed coordinate '{0}'")]
pub struct ParseCoordError(pub String);

impl FromStr for Coord {
    type Err = ParseCoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(',');
        let mut next = || -> Result<i32, ParseCoordError> {
            parts
                .next()
                .and_then(|p| p.trim().parse::<i32>().ok())
                .ok_or_else(|| ParseCoordError(s.to_string()))
        };
        let coord = Coord::new(next()?, next()?, next()?);
        if parts.next().is_some() {
            return Err(ParseCoordError(s.to_string()));
        }
        Ok(coord)
    }
}

// ---------------------------------------------------------------------------
// Dimensions and locations
// ---------------------------------------------------------------------------

/// Identifies a world dimension. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DimensionId(pub u16);

impl fmt::Display for DimensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A coordinate qualified by its dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub dim: DimensionId,
    pub at: Coord,
}

impl Location {
    pub const fn new(dim: DimensionId, at: Coord) -> Self {
        Self { dim, at }
    }

    /// The neighbouring location in the given direction (same dimension).
    pub fn offset(self, dir: Direction) -> Self {
        Self::new(self.dim, self.at.offset(dir))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.at, self.dim)
    }
}

/// A 16x16 column of cells, the unit of world loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// The six face directions. No diagonal connectivity exists anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    North,
    South,
    East,
    West,
}

impl Direction {
    /// All six directions in enumeration order.
    pub const ALL: [Direction; 6] = [
        Direction::Up,
        Direction::Down,
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Offset for this direction. North is -z, East is +x.
    pub fn offset(&self) -> (i32, i32, i32) {
        match self {
            Direction::Up => (0, 1, 0),
            Direction::Down => (0, -1, 0),
            Direction::North => (0, 0, -1),
            Direction::South => (0, 0, 1),
            Direction::East => (1, 0, 0),
            Direction::West => (-1, 0, 0),
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Position of this direction in [`Direction::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}
