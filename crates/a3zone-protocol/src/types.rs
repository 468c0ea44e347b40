//! Value types shared by every layer: world ids and positions.
//!
//! These travel on the wire inside payloads and are also stored in the
//! persisted character record, so their serde shape is part of the
//! protocol.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// WorldId
// ---------------------------------------------------------------------------

/// Identifier of one of the static worlds.
///
/// `#[serde(transparent)]` keeps it a bare number on the wire, so
/// `{"world_id": 2}` decodes straight into `WorldId(2)`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct WorldId(pub u32);

impl WorldId {
    /// "The Known World", where every new character starts.
    pub const KNOWN: WorldId = WorldId(1);
    /// "The Shattered World".
    pub const SHATTERED: WorldId = WorldId(2);
    /// "The Mythical World".
    pub const MYTHICAL: WorldId = WorldId(3);
}

impl Default for WorldId {
    fn default() -> Self {
        Self::KNOWN
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "W-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A point in world space.
///
/// Missing coordinates decode as `0.0`, matching how clients omit `y`
/// on flat terrain.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance in all three axes.
    pub fn distance(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// `true` when `other` lies within `radius` (inclusive).
    pub fn within(&self, other: &Position, radius: f64) -> bool {
        self.distance(other) <= radius
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&WorldId::SHATTERED).unwrap();
        assert_eq!(json, "2");
    }

    #[test]
    fn test_position_distance_uses_all_axes() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(2.0, 3.0, 6.0);
        assert_eq!(a.distance(&b), 7.0);
    }

    #[test]
    fn test_position_within_boundary_is_inclusive() {
        let a = Position::new(100.0, 0.0, 100.0);
        let edge = Position::new(150.0, 0.0, 100.0);
        let beyond = Position::new(150.001, 0.0, 100.0);
        assert!(a.within(&edge, 50.0));
        assert!(!a.within(&beyond, 50.0));
    }

    #[test]
    fn test_position_missing_fields_default_to_zero() {
        let pos: Position = serde_json::from_str(r#"{"x": 4.5, "z": 1}"#).unwrap();
        assert_eq!(pos, Position::new(4.5, 0.0, 1.0));
    }
}
