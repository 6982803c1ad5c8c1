//! 3D primitives shared by the field, the agents and the collider index.
//!
//! World frame is right-handed with +Y up; an unrotated agent faces +Z.

use nalgebra as na;
use serde::{Deserialize, Serialize};

pub type Point = na::Point3<f64>;
pub type Vector = na::Vector3<f64>;
pub type Rotation = na::UnitQuaternion<f64>;

pub fn point(p: [f64; 3]) -> Point {
    Point::new(p[0], p[1], p[2])
}

pub fn vector(v: [f64; 3]) -> Vector {
    Vector::new(v[0], v[1], v[2])
}

/// Unit direction of `v`, or zero when `v` is degenerate.
pub fn normalize_or_zero(v: &Vector) -> Vector {
    v.try_normalize(f64::EPSILON).unwrap_or_else(Vector::zeros)
}

/// Orientation for a yaw about +Y followed by a pitch about the local +X.
/// Positive pitch tilts the nose down.
pub fn yaw_pitch_rotation(yaw_deg: f64, pitch_deg: f64) -> Rotation {
    Rotation::from_axis_angle(&Vector::y_axis(), yaw_deg.to_radians())
        * Rotation::from_axis_angle(&Vector::x_axis(), pitch_deg.to_radians())
}

/// Yaw and pitch (degrees) that point the forward axis along `direction`.
pub fn look_angles(direction: &Vector) -> (f64, f64) {
    let horizontal = (direction.x * direction.x + direction.z * direction.z).sqrt();
    let yaw = direction.x.atan2(direction.z).to_degrees();
    let pitch = (-direction.y).atan2(horizontal).to_degrees();
    (yaw, pitch)
}

/// Map an angle in degrees into `(-180, 180]`.
pub fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Step `current` toward `target` by at most `max_delta`.
pub fn move_towards(current: f64, target: f64, max_delta: f64) -> f64 {
    let diff = target - current;
    if diff.abs() <= max_delta {
        target
    } else {
        current + diff.signum() * max_delta
    }
}

/// Closest point to `p` on the segment `a..b`.
fn closest_on_segment(a: &Point, b: &Point, p: &Point) -> Point {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq <= f64::EPSILON {
        return *a;
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub center: Point,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: Point, radius: f64) -> Self {
        Self { center, radius }
    }

    pub fn intersects(&self, other: &Sphere) -> bool {
        let reach = self.radius + other.radius;
        na::distance_squared(&self.center, &other.center) < reach * reach
    }
}

/// Feeding-zone geometry in world coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Sphere { center: Point, radius: f64 },
    Capsule { a: Point, b: Point, radius: f64 },
}

impl Shape {
    pub fn center(&self) -> Point {
        match self {
            Shape::Sphere { center, .. } => *center,
            Shape::Capsule { a, b, .. } => na::center(a, b),
        }
    }

    /// Closest point on or inside the shape; `p` itself when it is inside.
    pub fn closest_point(&self, p: &Point) -> Point {
        let (core, radius) = match self {
            Shape::Sphere { center, radius } => (*center, *radius),
            Shape::Capsule { a, b, radius } => (closest_on_segment(a, b, p), *radius),
        };
        let offset = p - core;
        let dist = offset.norm();
        if dist <= radius {
            *p
        } else {
            core + offset * (radius / dist)
        }
    }

    /// Distance from `p` to the shape; zero inside.
    pub fn distance(&self, p: &Point) -> f64 {
        na::distance(p, &self.closest_point(p))
    }

    pub fn intersects_sphere(&self, sphere: &Sphere) -> bool {
        self.distance(&sphere.center) < sphere.radius
    }

    pub fn aabb(&self) -> ([f64; 3], [f64; 3]) {
        match self {
            Shape::Sphere { center, radius } => sphere_aabb(center, *radius),
            Shape::Capsule { a, b, radius } => {
                let lo = a.coords.inf(&b.coords);
                let hi = a.coords.sup(&b.coords);
                (
                    [lo.x - radius, lo.y - radius, lo.z - radius],
                    [hi.x + radius, hi.y + radius, hi.z + radius],
                )
            }
        }
    }
}

pub fn sphere_aabb(center: &Point, radius: f64) -> ([f64; 3], [f64; 3]) {
    (
        [center.x - radius, center.y - radius, center.z - radius],
        [center.x + radius, center.y + radius, center.z + radius],
    )
}

/// Feeding-zone geometry relative to a flower: offsets run along the
/// flower's outward axis from its anchor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ZoneSpec {
    Sphere { height: f64, radius: f64 },
    Capsule { from: f64, to: f64, radius: f64 },
}

impl ZoneSpec {
    pub fn place(&self, anchor: &Point, up: &Vector) -> Shape {
        match *self {
            ZoneSpec::Sphere { height, radius } => Shape::Sphere {
                center: anchor + up * height,
                radius,
            },
            ZoneSpec::Capsule { from, to, radius } => Shape::Capsule {
                a: anchor + up * from,
                b: anchor + up * to,
                radius,
            },
        }
    }
}
