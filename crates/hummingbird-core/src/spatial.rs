use crate::field::FlowerField;
use crate::flower::{FlowerId, ZoneId};
use crate::geometry::{sphere_aabb, Point, Shape, Sphere};
use rstar::{RTree, RTreeObject, AABB};

/// What a collider belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColliderKind {
    FlowerBody(FlowerId),
    FeedingZone(ZoneId),
    Obstacle(usize),
    Agent(usize),
}

#[derive(Clone, Debug)]
pub struct Collider {
    pub kind: ColliderKind,
    pub shape: Shape,
}

impl RTreeObject for Collider {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        let (lo, hi) = self.shape.aabb();
        AABB::from_corners(lo, hi)
    }
}

fn sphere_shape(sphere: &Sphere) -> Shape {
    Shape::Sphere {
        center: sphere.center,
        radius: sphere.radius,
    }
}

/// R*-tree over every collider that is currently enabled.
pub struct ColliderIndex {
    tree: RTree<Collider>,
}

impl ColliderIndex {
    /// Bulk-load active flower bodies and zones, obstacles, and the given
    /// agent bodies (O(n log n)).
    pub fn build(field: &FlowerField, agents: impl IntoIterator<Item = (usize, Sphere)>) -> Self {
        let mut colliders = Vec::with_capacity(field.len() * 2 + field.obstacles().len());
        for flower in field.flowers().iter().filter(|f| f.colliders_enabled()) {
            colliders.push(Collider {
                kind: ColliderKind::FlowerBody(flower.id()),
                shape: sphere_shape(&flower.body()),
            });
            colliders.push(Collider {
                kind: ColliderKind::FeedingZone(flower.zone_id()),
                shape: *flower.zone(),
            });
        }
        for (i, obstacle) in field.obstacles().iter().enumerate() {
            colliders.push(Collider {
                kind: ColliderKind::Obstacle(i),
                shape: sphere_shape(obstacle),
            });
        }
        for (i, body) in agents {
            colliders.push(Collider {
                kind: ColliderKind::Agent(i),
                shape: sphere_shape(&body),
            });
        }
        Self {
            tree: RTree::bulk_load(colliders),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Colliders overlapping a sphere of `radius` around `center`.
    /// Uses an AABB envelope query, then an exact shape test.
    pub fn overlapping(&self, center: Point, radius: f64) -> Vec<ColliderKind> {
        let (lo, hi) = sphere_aabb(&center, radius);
        let probe = Sphere::new(center, radius);
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_corners(lo, hi))
            .filter(|c| c.shape.intersects_sphere(&probe))
            .map(|c| c.kind)
            .collect()
    }

    pub fn is_clear(&self, center: Point, radius: f64) -> bool {
        self.overlapping(center, radius).is_empty()
    }
}
