use crate::flower::{Flower, FlowerId, ZoneId};
use crate::geometry::{point, vector, yaw_pitch_rotation, Point, Rotation, Sphere, Vector, ZoneSpec};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::f64::consts::TAU;
use std::{error::Error, fmt};

/// Maximum roll/pitch perturbation applied to a plant on reset, in degrees.
pub const PLANT_TILT_DEG: f64 = 5.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowerSpec {
    /// Explicit feeding-zone identity; allocated automatically when absent.
    #[serde(default)]
    pub zone_id: Option<u32>,
    /// Anchor position: plant-local inside a plant, world space otherwise.
    pub offset: [f64; 3],
    pub up: [f64; 3],
    pub zone: ZoneSpec,
    pub body_radius: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlantSpec {
    pub pivot: [f64; 3],
    pub flowers: Vec<FlowerSpec>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleSpec {
    pub center: [f64; 3],
    pub radius: f64,
}

/// Flat, data-driven description of every collidable thing in a field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldLayout {
    pub center: [f64; 3],
    /// Normalizes observed distances.
    pub diameter: f64,
    pub plants: Vec<PlantSpec>,
    pub flowers: Vec<FlowerSpec>,
    pub obstacles: Vec<ObstacleSpec>,
}

impl Default for FieldLayout {
    fn default() -> Self {
        Self {
            center: [0.0; 3],
            diameter: 20.0,
            plants: Vec::new(),
            flowers: Vec::new(),
            obstacles: Vec::new(),
        }
    }
}

impl FieldLayout {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// A seeded meadow of plants ringed around the origin, three flowers each.
    pub fn meadow(seed: u64) -> Self {
        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        let plant_count = 8;
        let plants = (0..plant_count)
            .map(|i| {
                let theta = (i as f64 + rng.random_range(-0.2..0.2)) * TAU / plant_count as f64;
                let radius = rng.random_range(2.5..6.5);
                let flowers = (0..3)
                    .map(|k| {
                        let around = k as f64 * TAU / 3.0;
                        let height = rng.random_range(0.9..1.8);
                        let lean = rng.random_range(0.3..0.8);
                        FlowerSpec {
                            zone_id: None,
                            offset: [0.25 * around.cos(), height, 0.25 * around.sin()],
                            up: [lean * around.cos(), 1.0, lean * around.sin()],
                            zone: ZoneSpec::Sphere {
                                height: 0.02,
                                radius: 0.015,
                            },
                            body_radius: 0.05,
                        }
                    })
                    .collect();
                PlantSpec {
                    pivot: [radius * theta.cos(), 0.0, radius * theta.sin()],
                    flowers,
                }
            })
            .collect();
        Self {
            plants,
            obstacles: vec![ObstacleSpec {
                center: [0.0, 0.0, 0.0],
                radius: 0.6,
            }],
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldError {
    Empty,
    DuplicateZone(ZoneId),
    UnknownZone(ZoneId),
    InvalidFlower { index: usize },
    InvalidDiameter(f64),
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Empty => write!(f, "field layout contains no flowers"),
            FieldError::DuplicateZone(z) => write!(f, "feeding zone {} registered twice", z.0),
            FieldError::UnknownZone(z) => write!(f, "feeding zone {} is not registered", z.0),
            FieldError::InvalidFlower { index } => write!(
                f,
                "flower {index} needs a non-zero up vector and positive radii"
            ),
            FieldError::InvalidDiameter(d) => write!(f, "field diameter must be positive (got {d})"),
        }
    }
}

impl Error for FieldError {}

#[derive(Clone, Debug)]
struct PlantGroup {
    pivot: Point,
    rotation: Rotation,
    /// Member flowers with their plant-local anchor and up vector.
    members: Vec<(FlowerId, Vector, Vector)>,
}

impl PlantGroup {
    fn apply(&self, flowers: &mut [Flower]) {
        for (id, offset, up) in &self.members {
            flowers[id.0].set_pose(self.pivot + self.rotation * offset, self.rotation * up);
        }
    }
}

/// Every flower of one episode plus a zone-to-flower index.
///
/// Membership is fixed at construction; resets mutate flowers in place.
#[derive(Clone, Debug)]
pub struct FlowerField {
    center: Point,
    diameter: f64,
    flowers: Vec<Flower>,
    plants: Vec<PlantGroup>,
    obstacles: Vec<Sphere>,
    zone_index: HashMap<ZoneId, FlowerId>,
}

fn valid_spec(spec: &FlowerSpec) -> bool {
    let radius_ok = |r: f64| r.is_finite() && r > 0.0;
    let zone_ok = match spec.zone {
        ZoneSpec::Sphere { radius, .. } | ZoneSpec::Capsule { radius, .. } => radius_ok(radius),
    };
    vector(spec.up).norm() > f64::EPSILON && radius_ok(spec.body_radius) && zone_ok
}

impl FlowerField {
    pub fn new(layout: &FieldLayout) -> Self {
        Self::try_new(layout).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_new(layout: &FieldLayout) -> Result<Self, FieldError> {
        if !(layout.diameter.is_finite() && layout.diameter > 0.0) {
            return Err(FieldError::InvalidDiameter(layout.diameter));
        }
        let specs: Vec<&FlowerSpec> = layout
            .plants
            .iter()
            .flat_map(|p| p.flowers.iter())
            .chain(layout.flowers.iter())
            .collect();
        if specs.is_empty() {
            return Err(FieldError::Empty);
        }

        let mut explicit = HashSet::new();
        for spec in &specs {
            if let Some(z) = spec.zone_id {
                if !explicit.insert(z) {
                    return Err(FieldError::DuplicateZone(ZoneId(z)));
                }
            }
        }
        let mut next_auto = 0u32;
        let mut zone_ids = Vec::with_capacity(specs.len());
        for spec in &specs {
            let id = match spec.zone_id {
                Some(z) => z,
                None => {
                    while explicit.contains(&next_auto) {
                        next_auto += 1;
                    }
                    next_auto += 1;
                    next_auto - 1
                }
            };
            zone_ids.push(ZoneId(id));
        }

        let mut flowers = Vec::with_capacity(specs.len());
        let mut plants = Vec::with_capacity(layout.plants.len());
        let mut zone_index = HashMap::with_capacity(specs.len());
        let mut register = |spec: &FlowerSpec, anchor: Point, up: Vector| {
            let index = flowers.len();
            if !valid_spec(spec) {
                return Err(FieldError::InvalidFlower { index });
            }
            let id = FlowerId(index);
            let zone_id = zone_ids[index];
            flowers.push(Flower::new(id, zone_id, anchor, up, spec.zone, spec.body_radius));
            zone_index.insert(zone_id, id);
            Ok(id)
        };

        for plant in &layout.plants {
            let pivot = point(plant.pivot);
            let mut members = Vec::with_capacity(plant.flowers.len());
            for spec in &plant.flowers {
                let offset = vector(spec.offset);
                let up = vector(spec.up);
                let id = register(spec, pivot + offset, up)?;
                members.push((id, offset, up));
            }
            plants.push(PlantGroup {
                pivot,
                rotation: Rotation::identity(),
                members,
            });
        }
        for spec in &layout.flowers {
            register(spec, point(spec.offset), vector(spec.up))?;
        }

        Ok(Self {
            center: point(layout.center),
            diameter: layout.diameter,
            flowers,
            plants,
            obstacles: layout
                .obstacles
                .iter()
                .map(|o| Sphere::new(point(o.center), o.radius))
                .collect(),
            zone_index,
        })
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    pub fn len(&self) -> usize {
        self.flowers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flowers.is_empty()
    }

    pub fn flowers(&self) -> &[Flower] {
        &self.flowers
    }

    pub fn flower(&self, id: FlowerId) -> &Flower {
        &self.flowers[id.0]
    }

    pub fn flower_mut(&mut self, id: FlowerId) -> &mut Flower {
        &mut self.flowers[id.0]
    }

    pub fn obstacles(&self) -> &[Sphere] {
        &self.obstacles
    }

    pub fn depleted_count(&self) -> usize {
        self.flowers.iter().filter(|f| f.is_depleted()).count()
    }

    pub fn plant_count(&self) -> usize {
        self.plants.len()
    }

    /// Re-orient every plant (small roll/pitch, any yaw) and refill every flower.
    pub fn reset_flowers<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for plant in &mut self.plants {
            let tilt_x = rng.random_range(-PLANT_TILT_DEG..=PLANT_TILT_DEG);
            let yaw = rng.random_range(-180.0..=180.0);
            let tilt_z = rng.random_range(-PLANT_TILT_DEG..=PLANT_TILT_DEG);
            plant.rotation = yaw_pitch_rotation(yaw, tilt_x)
                * Rotation::from_axis_angle(&Vector::z_axis(), f64::to_radians(tilt_z));
            plant.apply(&mut self.flowers);
        }
        for flower in &mut self.flowers {
            flower.reset();
        }
    }

    pub fn try_lookup_by_zone(&self, zone: ZoneId) -> Result<FlowerId, FieldError> {
        self.zone_index
            .get(&zone)
            .copied()
            .ok_or(FieldError::UnknownZone(zone))
    }

    /// Resolve the flower owning `zone`.
    ///
    /// Panics on an unregistered zone: contact events only ever carry
    /// registered identities.
    pub fn lookup_by_zone(&self, zone: ZoneId) -> FlowerId {
        self.try_lookup_by_zone(zone)
            .unwrap_or_else(|e| panic!("{e}"))
    }
}
