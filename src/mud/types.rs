use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use super::errors::MudError;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

id_type!(
    /// Identifier of a live player session.
    PlayerId
);
id_type!(
    /// Identifier of a room; fixed for the room's lifetime.
    RoomId
);
id_type!(
    /// Identifier of a physical object, used to check conservation.
    ObjectId
);

/// Process-wide monotonically increasing id source.
///
/// One value per call, safe under concurrent callers. The allocator is built
/// by [`World`](super::world::World) and shared by reference, never global.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }

    pub fn player(&self) -> PlayerId {
        PlayerId(self.next())
    }

    pub fn room(&self) -> RoomId {
        RoomId(self.next())
    }

    pub fn object(&self) -> ObjectId {
        ObjectId(self.next())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
    Northeast,
    Northwest,
    Southeast,
    Southwest,
}

impl Direction {
    pub const ALL: [Direction; 10] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Up,
        Direction::Down,
        Direction::Northeast,
        Direction::Northwest,
        Direction::Southeast,
        Direction::Southwest,
    ];

    /// The direction a mirrored exit uses to lead back.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Northeast => Direction::Southwest,
            Direction::Southwest => Direction::Northeast,
            Direction::Northwest => Direction::Southeast,
            Direction::Southeast => Direction::Northwest,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Northeast => "northeast",
            Direction::Northwest => "northwest",
            Direction::Southeast => "southeast",
            Direction::Southwest => "southwest",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = MudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dir = match s.trim().to_ascii_lowercase().as_str() {
            "n" | "north" => Direction::North,
            "s" | "south" => Direction::South,
            "e" | "east" => Direction::East,
            "w" | "west" => Direction::West,
            "u" | "up" => Direction::Up,
            "d" | "down" => Direction::Down,
            "ne" | "northeast" => Direction::Northeast,
            "nw" | "northwest" => Direction::Northwest,
            "se" | "southeast" => Direction::Southeast,
            "sw" | "southwest" => Direction::Southwest,
            _ => return Err(MudError::UnknownDirection(s.to_string())),
        };
        Ok(dir)
    }
}

/// Directional edge of the room graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitRecord {
    pub other_room: RoomId,
    pub two_way: bool,
}

impl ExitRecord {
    pub fn new(other_room: RoomId, two_way: bool) -> Self {
        Self {
            other_room,
            two_way,
        }
    }
}
