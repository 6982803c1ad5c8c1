use crate::geometry::{normalize_or_zero, Point, Shape, Sphere, Vector, ZoneSpec};
use serde::{Deserialize, Serialize};

/// Index of a flower inside its field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FlowerId(pub usize);

/// Identity of a feeding zone as reported by contact events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub u32);

/// Presentation flag handed to whatever renders the flower.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisualState {
    Full,
    Empty,
}

/// A single nectar-bearing flower.
///
/// Nectar stays within `[0, 1]`. The feeding zone and the solid body are
/// only collidable while nectar remains.
#[derive(Clone, Debug)]
pub struct Flower {
    id: FlowerId,
    zone_id: ZoneId,
    anchor: Point,
    up: Vector,
    zone_spec: ZoneSpec,
    zone: Shape,
    body_radius: f64,
    nectar: f32,
    visual: VisualState,
    colliders_enabled: bool,
}

impl Flower {
    pub const FULL: f32 = 1.0;

    pub fn new(
        id: FlowerId,
        zone_id: ZoneId,
        anchor: Point,
        up: Vector,
        zone_spec: ZoneSpec,
        body_radius: f64,
    ) -> Self {
        let up = normalize_or_zero(&up);
        Self {
            id,
            zone_id,
            anchor,
            up,
            zone_spec,
            zone: zone_spec.place(&anchor, &up),
            body_radius,
            nectar: Self::FULL,
            visual: VisualState::Full,
            colliders_enabled: true,
        }
    }

    pub fn id(&self) -> FlowerId {
        self.id
    }

    pub fn zone_id(&self) -> ZoneId {
        self.zone_id
    }

    pub fn nectar(&self) -> f32 {
        self.nectar
    }

    pub fn has_nectar(&self) -> bool {
        self.nectar > 0.0
    }

    pub fn is_depleted(&self) -> bool {
        !self.has_nectar()
    }

    pub fn visual_state(&self) -> VisualState {
        self.visual
    }

    /// Whether the feeding zone and solid body currently take part in collisions.
    pub fn colliders_enabled(&self) -> bool {
        self.colliders_enabled
    }

    /// Base of the flower; spawn offsets are measured from here.
    pub fn anchor(&self) -> Point {
        self.anchor
    }

    /// Center of the feeding zone.
    pub fn center(&self) -> Point {
        self.zone.center()
    }

    /// Unit vector pointing straight out of the flower.
    pub fn up(&self) -> Vector {
        self.up
    }

    pub fn zone(&self) -> &Shape {
        &self.zone
    }

    pub fn body(&self) -> Sphere {
        Sphere::new(self.anchor, self.body_radius)
    }

    /// Remove up to `amount` nectar, returning what was actually available.
    ///
    /// The return value is clamped before the store is touched; the store
    /// itself floors at zero. Non-positive requests grant nothing.
    pub fn feed(&mut self, amount: f32) -> f32 {
        if amount.is_nan() || amount <= 0.0 {
            return 0.0;
        }
        let taken = amount.clamp(0.0, self.nectar);
        self.nectar -= amount;
        if !self.has_nectar() {
            self.nectar = 0.0;
            self.colliders_enabled = false;
            self.visual = VisualState::Empty;
        }
        taken
    }

    /// Refill and re-enable the flower.
    pub fn reset(&mut self) {
        self.nectar = Self::FULL;
        self.colliders_enabled = true;
        self.visual = VisualState::Full;
    }

    pub(crate) fn set_pose(&mut self, anchor: Point, up: Vector) {
        self.anchor = anchor;
        self.up = normalize_or_zero(&up);
        self.zone = self.zone_spec.place(&self.anchor, &self.up);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flower() -> Flower {
        Flower::new(
            FlowerId(0),
            ZoneId(10),
            Point::origin(),
            Vector::y(),
            ZoneSpec::Sphere {
                height: 0.02,
                radius: 0.015,
            },
            0.05,
        )
    }

    #[test]
    fn feed_within_store_returns_request() {
        let mut f = flower();
        let before = f.nectar();
        let granted = f.feed(0.25);
        assert_eq!(granted, 0.25);
        assert_eq!(f.nectar(), before - 0.25);
        assert!(f.colliders_enabled());
        assert_eq!(f.visual_state(), VisualState::Full);
    }

    #[test]
    fn over_request_returns_remaining_and_deactivates() {
        let mut f = flower();
        f.feed(0.75);
        let remaining = f.nectar();
        let granted = f.feed(0.6);
        assert_eq!(granted, remaining);
        assert_eq!(f.nectar(), 0.0);
        assert!(f.is_depleted());
        assert!(!f.colliders_enabled());
        assert_eq!(f.visual_state(), VisualState::Empty);
    }

    #[test]
    fn exact_request_depletes() {
        let mut f = flower();
        assert_eq!(f.feed(1.0), 1.0);
        assert_eq!(f.nectar(), 0.0);
        assert!(!f.colliders_enabled());
    }

    #[test]
    fn negative_and_nan_requests_grant_nothing() {
        let mut f = flower();
        assert_eq!(f.feed(-0.5), 0.0);
        assert_eq!(f.feed(f32::NAN), 0.0);
        assert_eq!(f.nectar(), Flower::FULL);
    }

    #[test]
    fn feeding_an_empty_flower_grants_zero() {
        let mut f = flower();
        f.feed(2.0);
        assert_eq!(f.feed(0.01), 0.0);
        assert_eq!(f.nectar(), 0.0);
    }

    #[test]
    fn reset_is_idempotent() {
        let mut f = flower();
        f.feed(5.0);
        f.reset();
        let once = (f.nectar(), f.colliders_enabled(), f.visual_state());
        f.reset();
        assert_eq!((f.nectar(), f.colliders_enabled(), f.visual_state()), once);
        assert_eq!(once, (1.0, true, VisualState::Full));
    }

    #[test]
    fn set_pose_moves_zone_with_anchor() {
        let mut f = flower();
        f.set_pose(Point::new(1.0, 0.0, 0.0), Vector::x() * 3.0);
        assert_eq!(f.up(), Vector::x());
        assert!((f.center() - Point::new(1.02, 0.0, 0.0)).norm() < 1e-12);
    }
}
