//! Minimal stand-in for the physics engine: the arena box and trigger
//! contacts against feeding zones.

use crate::field::FlowerField;
use crate::flower::ZoneId;
use crate::geometry::{point, Point, Vector};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self {
            min: point(min),
            max: point(max),
        }
    }

    pub fn contains(&self, p: &Point) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Push `position` back inside and cancel outward velocity.
    /// Returns whether a wall was touched.
    pub fn confine(&self, position: &mut Point, velocity: &mut Vector) -> bool {
        let mut touched = false;
        for i in 0..3 {
            if position[i] < self.min[i] {
                position[i] = self.min[i];
                velocity[i] = velocity[i].max(0.0);
                touched = true;
            } else if position[i] > self.max[i] {
                position[i] = self.max[i];
                velocity[i] = velocity[i].min(0.0);
                touched = true;
            }
        }
        touched
    }
}

/// Enabled feeding zones overlapping a trigger sphere around `probe`.
pub fn feeding_contacts(field: &FlowerField, probe: &Point, radius: f64) -> Vec<ZoneId> {
    field
        .flowers()
        .iter()
        .filter(|f| f.colliders_enabled() && f.zone().distance(probe) <= radius)
        .map(|f| f.zone_id())
        .collect()
}
