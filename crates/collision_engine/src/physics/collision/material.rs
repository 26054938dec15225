//! Physics material flags attached to polygons, ridges and meshes

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

bitflags::bitflags! {
    /// Collision attributes and object roles of a piece of geometry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct PhysicsMaterial: u32 {
        /// Rendered
        const ATTR_VISIBLE = 1 << 0;
        /// Takes part in collisions and visibility queries
        const ATTR_COLLIDE = 1 << 1;
        /// Faces collide from both sides
        const ATTR_TWO_SIDED = 1 << 2;
        /// Alignment must match exactly
        const ATTR_ALIGN_STRICT = 1 << 3;
        /// Mesh is convex
        const ATTR_CONVEX = 1 << 4;
        /// Mesh is concave
        const ATTR_CONCAVE = 1 << 5;
        /// Mesh approximates a round shape
        const ATTR_ROUND = 1 << 6;
        /// Low friction surface
        const ATTR_SLIPPERY = 1 << 7;
        /// Vehicle chassis
        const OBJ_CHASSIS = 1 << 8;
        /// Tire contact line, ignored by visibility queries
        const OBJ_TIRE_LINE = 1 << 9;
        /// Damage hitbox
        const OBJ_HITBOX = 1 << 10;
        /// Mesh hit by bullets
        const OBJ_BULLET_MESH = 1 << 11;
        /// Grass surface
        const OBJ_GRASS = 1 << 12;
        /// Grind contact
        const OBJ_GRIND_CONTACT = 1 << 13;
        /// Alignment contact
        const OBJ_ALIGNMENT_CONTACT = 1 << 14;
    }
}

impl PhysicsMaterial {
    /// Parse a `|`-separated list of lowercase flag names such as `"attr_collide|obj_chassis"`
    pub fn from_names(s: &str) -> Result<Self, ConfigError> {
        let mut result = Self::empty();
        for token in s.split('|').map(str::trim).filter(|t| !t.is_empty()) {
            if token == "none" {
                continue;
            }
            let flag = Self::all()
                .iter_names()
                .find(|(name, _)| name.eq_ignore_ascii_case(token))
                .map(|(_, flag)| flag)
                .ok_or_else(|| ConfigError::Parse(format!("Unknown physics material: \"{token}\"")))?;
            result |= flag;
        }
        Ok(result)
    }

    /// Whether faces with this material collide from both sides
    pub fn is_two_sided(self) -> bool {
        self.contains(Self::ATTR_TWO_SIDED)
    }
}

impl fmt::Display for PhysicsMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for (name, _) in self.iter_names() {
            if !first {
                f.write_str("|")?;
            }
            first = false;
            f.write_str(&name.to_ascii_lowercase())?;
        }
        Ok(())
    }
}
