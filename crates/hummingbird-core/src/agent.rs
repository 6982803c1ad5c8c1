use crate::config::AgentConfig;
use crate::field::FlowerField;
use crate::flower::{FlowerId, ZoneId};
use crate::geometry::{
    look_angles, move_towards, normalize_or_zero, vector, wrap_degrees, yaw_pitch_rotation,
    Point, Rotation, Sphere, Vector,
};
use crate::spatial::ColliderIndex;
use rand::Rng;
use std::{error::Error, fmt};
use tracing::debug;

pub const ACTION_SIZE: usize = 5;
pub const OBSERVATION_SIZE: usize = 10;

/// `[move_x, move_y, move_z, pitch, yaw]`, each nominally in `[-1, 1]`.
pub type Action = [f32; ACTION_SIZE];
pub type Observation = [f32; OBSERVATION_SIZE];

#[derive(Debug, Clone, PartialEq)]
pub enum AgentError {
    FreezeInTraining,
}

impl fmt::Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentError::FreezeInTraining => {
                write!(f, "freeze/unfreeze is not supported in training mode")
            }
        }
    }
}

impl Error for AgentError {}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacementError {
    pub agent: usize,
    pub attempts: usize,
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "agent {} found no collision-free spawn in {} attempts",
            self.agent, self.attempts
        )
    }
}

impl Error for PlacementError {}

/// A hummingbird: pose, motion, nectar tally and the flower it is heading for.
///
/// The target is an index into the field, never a second owner of the flower.
#[derive(Clone, Debug)]
pub struct Agent {
    id: usize,
    config: AgentConfig,
    training: bool,
    position: Point,
    velocity: Vector,
    /// Radians per second about (pitch, yaw, roll).
    angular_velocity: Vector,
    yaw_deg: f64,
    pitch_deg: f64,
    smooth_pitch: f64,
    smooth_yaw: f64,
    target: Option<FlowerId>,
    nectar_obtained: f32,
    pending_reward: f32,
    frozen: bool,
    touching_boundary: bool,
}

impl Agent {
    pub fn new(id: usize, config: AgentConfig, training: bool) -> Self {
        Self {
            id,
            config,
            training,
            position: Point::origin(),
            velocity: Vector::zeros(),
            angular_velocity: Vector::zeros(),
            yaw_deg: 0.0,
            pitch_deg: 0.0,
            smooth_pitch: 0.0,
            smooth_yaw: 0.0,
            target: None,
            nectar_obtained: 0.0,
            pending_reward: 0.0,
            frozen: false,
            touching_boundary: false,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn velocity(&self) -> Vector {
        self.velocity
    }

    pub fn angular_velocity(&self) -> Vector {
        self.angular_velocity
    }

    pub fn yaw_deg(&self) -> f64 {
        self.yaw_deg
    }

    pub fn pitch_deg(&self) -> f64 {
        self.pitch_deg
    }

    pub fn orientation(&self) -> Rotation {
        yaw_pitch_rotation(self.yaw_deg, self.pitch_deg)
    }

    pub fn forward(&self) -> Vector {
        self.orientation() * Vector::z()
    }

    /// The reference point for every proximity and targeting query.
    pub fn beak_tip(&self) -> Point {
        self.position + self.orientation() * vector(self.config.beak_offset)
    }

    pub fn body(&self) -> Sphere {
        Sphere::new(self.position, self.config.body_radius)
    }

    pub fn target(&self) -> Option<FlowerId> {
        self.target
    }

    pub fn nectar_obtained(&self) -> f32 {
        self.nectar_obtained
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Teleport without touching velocity or episode state.
    pub fn set_pose(&mut self, position: Point, yaw_deg: f64, pitch_deg: f64) {
        self.position = position;
        self.yaw_deg = wrap_degrees(yaw_deg);
        self.pitch_deg = wrap_degrees(pitch_deg);
    }

    /// Apply one step of control input.
    ///
    /// Movement is a force in world space. Pitch and yaw commands pass
    /// through a rate limiter before being integrated; pitch is clamped to
    /// `max_pitch_deg`, yaw wraps freely.
    pub fn act(&mut self, action: &Action, dt: f64) {
        if self.frozen {
            return;
        }
        let a = action.map(|v| if v.is_finite() { v.clamp(-1.0, 1.0) as f64 } else { 0.0 });
        let movement = Vector::new(a[0], a[1], a[2]);
        self.velocity += movement * (self.config.move_force / self.config.mass) * dt;

        let max_delta = self.config.smoothing_rate * dt;
        self.smooth_pitch = move_towards(self.smooth_pitch, a[3], max_delta);
        self.smooth_yaw = move_towards(self.smooth_yaw, a[4], max_delta);

        let pitch_rate = self.smooth_pitch * self.config.pitch_speed;
        let yaw_rate = self.smooth_yaw * self.config.yaw_speed;
        let max_pitch = self.config.max_pitch_deg;
        self.pitch_deg = wrap_degrees(self.pitch_deg + pitch_rate * dt).clamp(-max_pitch, max_pitch);
        self.yaw_deg = wrap_degrees(self.yaw_deg + yaw_rate * dt);
        self.angular_velocity = Vector::new(pitch_rate.to_radians(), yaw_rate.to_radians(), 0.0);
    }

    /// Advance position by one fixed step with linear drag.
    pub fn integrate(&mut self, dt: f64) {
        if self.frozen {
            return;
        }
        self.velocity *= 1.0 / (1.0 + self.config.drag * dt);
        self.position += self.velocity * dt;
    }

    /// Fixed-width observation; all zeros while no flower is targeted.
    pub fn observe(&self, field: &FlowerField) -> Observation {
        let mut obs = [0.0f32; OBSERVATION_SIZE];
        let Some(id) = self.target else {
            return obs;
        };
        let flower = field.flower(id);
        let q = self.orientation();
        let coords = q.quaternion().coords.normalize();
        let to_flower = flower.center() - self.beak_tip();
        let direction = normalize_or_zero(&to_flower);
        let inward = -flower.up();

        obs[0] = coords.x as f32;
        obs[1] = coords.y as f32;
        obs[2] = coords.z as f32;
        obs[3] = coords.w as f32;
        obs[4] = direction.x as f32;
        obs[5] = direction.y as f32;
        obs[6] = direction.z as f32;
        // +1 when the beak sits in front of the flower, -1 behind it.
        obs[7] = direction.dot(&inward) as f32;
        // +1 when the beak points straight into the flower.
        obs[8] = self.forward().dot(&inward) as f32;
        obs[9] = (to_flower.norm() / field.diameter()) as f32;
        obs
    }

    fn distance_to(&self, field: &FlowerField, id: FlowerId) -> f64 {
        (field.flower(id).center() - self.beak_tip()).norm()
    }

    /// Pick the closest flower that still has nectar.
    ///
    /// The current target survives unless it emptied or another eligible
    /// flower is strictly closer.
    pub fn select_nearest_target(&mut self, field: &FlowerField) {
        let mut best = self
            .target
            .filter(|id| field.flower(*id).has_nectar())
            .map(|id| (id, self.distance_to(field, id)));
        for flower in field.flowers().iter().filter(|f| f.has_nectar()) {
            let dist = self.distance_to(field, flower.id());
            match best {
                Some((_, best_dist)) if dist >= best_dist => {}
                _ => best = Some((flower.id(), dist)),
            }
        }
        let next = best.map(|(id, _)| id);
        if next != self.target {
            debug!(agent = self.id, from = ?self.target, to = ?next, "target switched");
        }
        self.target = next;
    }

    /// Re-run target selection only when the current target has emptied.
    pub fn refresh_target(&mut self, field: &FlowerField) {
        if let Some(id) = self.target {
            if field.flower(id).is_depleted() {
                self.select_nearest_target(field);
            }
        }
    }

    /// Handle a trigger contact with a feeding zone. Returns nectar gained.
    ///
    /// Contacts whose zone surface is not within the beak radius of the beak
    /// tip are ignored.
    pub fn on_feeding_contact(&mut self, zone: ZoneId, field: &mut FlowerField) -> f32 {
        let id = field.lookup_by_zone(zone);
        let beak = self.beak_tip();
        let closest = field.flower(id).zone().closest_point(&beak);
        if (closest - beak).norm() >= self.config.beak_radius {
            return 0.0;
        }

        let flower = field.flower_mut(id);
        let granted = flower.feed(self.config.feed_amount);
        self.nectar_obtained += granted;

        if self.training && granted > 0.0 {
            let reward = &self.config.reward;
            let alignment = self.forward().dot(&-flower.up()).clamp(0.0, 1.0) as f32;
            self.pending_reward += reward.feed_base + reward.feed_alignment_bonus * alignment;
        }
        if flower.is_depleted() {
            self.select_nearest_target(field);
        }
        granted
    }

    /// Handle hitting the arena boundary.
    pub fn on_boundary_contact(&mut self) {
        if self.training {
            self.pending_reward += self.config.reward.boundary_penalty;
        }
    }

    /// Tracks boundary contact so that only the entering step is reported.
    pub(crate) fn update_boundary_contact(&mut self, touching: bool) -> bool {
        let entered = touching && !self.touching_boundary;
        self.touching_boundary = touching;
        entered
    }

    pub(crate) fn confine(&mut self, bounds: &crate::physics::Bounds) -> bool {
        bounds.confine(&mut self.position, &mut self.velocity)
    }

    /// Reward accumulated since the last call.
    pub fn take_reward(&mut self) -> f32 {
        std::mem::take(&mut self.pending_reward)
    }

    pub fn add_reward(&mut self, reward: f32) {
        self.pending_reward += reward;
    }

    #[cfg(test)]
    pub(crate) fn credit_nectar(&mut self, amount: f32) {
        self.nectar_obtained += amount;
    }

    /// Start a new episode: clear motion and tallies, respawn, retarget.
    ///
    /// Panics if no collision-free spawn exists.
    pub fn reset_for_episode<R: Rng + ?Sized>(
        &mut self,
        field: &FlowerField,
        colliders: &ColliderIndex,
        rng: &mut R,
    ) {
        self.try_reset_for_episode(field, colliders, rng)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_reset_for_episode<R: Rng + ?Sized>(
        &mut self,
        field: &FlowerField,
        colliders: &ColliderIndex,
        rng: &mut R,
    ) -> Result<(), PlacementError> {
        self.velocity = Vector::zeros();
        self.angular_velocity = Vector::zeros();
        self.smooth_pitch = 0.0;
        self.smooth_yaw = 0.0;
        self.nectar_obtained = 0.0;
        self.pending_reward = 0.0;
        self.target = None;
        self.touching_boundary = false;

        let near_flower = if self.training {
            rng.random_bool(0.5)
        } else {
            true
        };
        self.try_place_safely(near_flower, field, colliders, rng)?;
        self.select_nearest_target(field);
        debug!(
            agent = self.id,
            near_flower,
            x = self.position.x,
            y = self.position.y,
            z = self.position.z,
            "episode reset"
        );
        Ok(())
    }

    pub fn place_safely<R: Rng + ?Sized>(
        &mut self,
        near_flower: bool,
        field: &FlowerField,
        colliders: &ColliderIndex,
        rng: &mut R,
    ) {
        self.try_place_safely(near_flower, field, colliders, rng)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Rejection-sample a spawn point clear of every collider.
    ///
    /// Near a flower the agent hovers a short way out along the flower's
    /// outward axis, facing the feeding zone. Otherwise it spawns in an
    /// annulus around the field center with a random heading.
    pub fn try_place_safely<R: Rng + ?Sized>(
        &mut self,
        near_flower: bool,
        field: &FlowerField,
        colliders: &ColliderIndex,
        rng: &mut R,
    ) -> Result<(), PlacementError> {
        let cfg = &self.config;
        for _ in 0..cfg.placement_attempts {
            let (position, yaw, pitch) = if near_flower && !field.is_empty() {
                let flower = &field.flowers()[rng.random_range(0..field.len())];
                let offset =
                    rng.random_range(cfg.near_flower_offset_min..=cfg.near_flower_offset_max);
                let position = flower.anchor() + flower.up() * offset;
                let (yaw, pitch) = look_angles(&(flower.center() - position));
                // straight-down views exceed the pitch limit `act` enforces
                (position, yaw, pitch.clamp(-cfg.max_pitch_deg, cfg.max_pitch_deg))
            } else {
                let height = rng.random_range(cfg.open_air_height_min..=cfg.open_air_height_max);
                let radius = rng.random_range(cfg.open_air_radius_min..=cfg.open_air_radius_max);
                let heading = rng.random_range(-180.0f64..180.0).to_radians();
                let position = field.center()
                    + Vector::y() * height
                    + Vector::new(heading.sin(), 0.0, heading.cos()) * radius;
                let pitch = rng.random_range(-cfg.open_air_pitch_deg..=cfg.open_air_pitch_deg);
                let yaw = rng.random_range(-180.0..180.0);
                (position, yaw, pitch)
            };
            if colliders.is_clear(position, cfg.placement_clearance) {
                self.set_pose(position, yaw, pitch);
                return Ok(());
            }
        }
        Err(PlacementError {
            agent: self.id,
            attempts: self.config.placement_attempts,
        })
    }

    pub fn freeze(&mut self) {
        self.try_freeze().unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn unfreeze(&mut self) {
        self.try_unfreeze().unwrap_or_else(|e| panic!("{e}"))
    }

    /// Stop all motion until unfrozen. Only valid outside training.
    pub fn try_freeze(&mut self) -> Result<(), AgentError> {
        if self.training {
            return Err(AgentError::FreezeInTraining);
        }
        self.frozen = true;
        self.velocity = Vector::zeros();
        self.angular_velocity = Vector::zeros();
        Ok(())
    }

    pub fn try_unfreeze(&mut self) -> Result<(), AgentError> {
        if self.training {
            return Err(AgentError::FreezeInTraining);
        }
        self.frozen = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldLayout, FlowerSpec};
    use crate::geometry::ZoneSpec;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    /// Flowers face -Z with feeding zones centered on `(0, 1, z)`.
    fn line_field(zs: &[f64]) -> FlowerField {
        let flowers = zs
            .iter()
            .map(|z| FlowerSpec {
                zone_id: None,
                offset: [0.0, 1.0, z + 0.02],
                up: [0.0, 0.0, -1.0],
                zone: ZoneSpec::Sphere {
                    height: 0.02,
                    radius: 0.015,
                },
                body_radius: 0.01,
            })
            .collect();
        FlowerField::new(&FieldLayout {
            flowers,
            ..FieldLayout::default()
        })
    }

    /// Agent facing +Z with its beak tip at `(0, 1, z)`.
    fn agent_at(z: f64, training: bool) -> Agent {
        let mut agent = Agent::new(0, AgentConfig::default(), training);
        let beak = AgentConfig::default().beak_offset[2];
        agent.set_pose(Point::new(0.0, 1.0, z - beak), 0.0, 0.0);
        agent
    }

    #[test]
    fn observation_is_zero_without_target() {
        let field = line_field(&[1.0]);
        let agent = agent_at(0.0, false);
        assert_eq!(agent.target(), None);
        assert_eq!(agent.observe(&field), [0.0; OBSERVATION_SIZE]);
    }

    #[test]
    fn observation_describes_target() {
        let field = line_field(&[2.0]);
        let mut agent = agent_at(0.0, false);
        agent.select_nearest_target(&field);
        let obs = agent.observe(&field);
        assert_eq!(obs.len(), OBSERVATION_SIZE);
        // identity rotation
        assert!((obs[3] - 1.0).abs() < 1e-6);
        assert!((obs[6] - 1.0).abs() < 1e-6);
        assert!((obs[7] - 1.0).abs() < 1e-6);
        assert!((obs[8] - 1.0).abs() < 1e-6);
        assert!((obs[9] - 2.0 / 20.0).abs() < 1e-5);
        assert!(obs.iter().any(|v| *v != 0.0));
    }

    #[test]
    fn selects_closest_of_three() {
        let field = line_field(&[3.0, 1.0, 2.0]);
        let mut agent = agent_at(0.0, false);
        agent.select_nearest_target(&field);
        assert_eq!(agent.target(), Some(FlowerId(1)));
    }

    #[test]
    fn never_targets_empty_flowers() {
        let mut field = line_field(&[1.0, 2.0]);
        field.flower_mut(FlowerId(0)).feed(1.0);
        let mut agent = agent_at(0.0, false);
        agent.select_nearest_target(&field);
        assert_eq!(agent.target(), Some(FlowerId(1)));

        field.flower_mut(FlowerId(1)).feed(1.0);
        agent.select_nearest_target(&field);
        assert_eq!(agent.target(), None);
    }

    #[test]
    fn target_is_sticky_until_depleted() {
        let mut field = line_field(&[1.0, 4.0]);
        let mut agent = agent_at(0.0, false);
        agent.select_nearest_target(&field);
        assert_eq!(agent.target(), Some(FlowerId(0)));

        // now the second flower is closer, but the first is still valid
        let beak = agent.config().beak_offset[2];
        agent.set_pose(Point::new(0.0, 1.0, 3.5 - beak), 0.0, 0.0);
        agent.refresh_target(&field);
        assert_eq!(agent.target(), Some(FlowerId(0)));

        field.flower_mut(FlowerId(0)).feed(1.0);
        agent.refresh_target(&field);
        assert_eq!(agent.target(), Some(FlowerId(1)));
    }

    #[test]
    fn explicit_selection_switches_to_strictly_closer() {
        let field = line_field(&[1.0, 4.0]);
        let mut agent = agent_at(0.0, false);
        agent.select_nearest_target(&field);
        let beak = agent.config().beak_offset[2];
        agent.set_pose(Point::new(0.0, 1.0, 3.5 - beak), 0.0, 0.0);
        agent.select_nearest_target(&field);
        assert_eq!(agent.target(), Some(FlowerId(1)));
    }

    #[test]
    fn feeding_to_empty_retargets_same_call() {
        let mut field = line_field(&[1.0, 1.5, 3.0]);
        let config = AgentConfig {
            feed_amount: 1.0,
            ..AgentConfig::default()
        };
        let mut agent = Agent::new(0, config, false);
        agent.set_pose(Point::new(0.0, 1.0, 1.0 - 0.03), 0.0, 0.0);
        agent.select_nearest_target(&field);
        assert_eq!(agent.target(), Some(FlowerId(0)));

        let zone = field.flower(FlowerId(0)).zone_id();
        let granted = agent.on_feeding_contact(zone, &mut field);
        assert_eq!(granted, 1.0);
        assert_eq!(agent.nectar_obtained(), 1.0);
        assert!(field.flower(FlowerId(0)).is_depleted());
        assert_eq!(agent.target(), Some(FlowerId(1)));
        let obs = agent.observe(&field);
        assert!(obs[9] > 0.0);
    }

    #[test]
    fn last_flower_emptied_leaves_no_target() {
        let mut field = line_field(&[1.0]);
        let config = AgentConfig {
            feed_amount: 1.0,
            ..AgentConfig::default()
        };
        let mut agent = Agent::new(0, config, false);
        agent.set_pose(Point::new(0.0, 1.0, 1.0 - 0.03), 0.0, 0.0);
        agent.select_nearest_target(&field);
        let zone = field.flower(FlowerId(0)).zone_id();
        agent.on_feeding_contact(zone, &mut field);
        assert_eq!(agent.target(), None);
        assert_eq!(agent.observe(&field), [0.0; OBSERVATION_SIZE]);
    }

    #[test]
    fn contact_out_of_beak_reach_is_ignored() {
        let mut field = line_field(&[1.0]);
        let mut agent = agent_at(0.9, false);
        let zone = field.flower(FlowerId(0)).zone_id();
        assert_eq!(agent.on_feeding_contact(zone, &mut field), 0.0);
        assert_eq!(field.flower(FlowerId(0)).nectar(), 1.0);
        assert_eq!(agent.nectar_obtained(), 0.0);
    }

    #[test]
    fn aligned_feeding_earns_more_reward() {
        let mut field = line_field(&[1.0, 5.0]);
        let mut aligned = agent_at(1.0, true);
        let zone = field.flower(FlowerId(0)).zone_id();
        aligned.on_feeding_contact(zone, &mut field);
        let aligned_reward = aligned.take_reward();

        // approach sideways: facing +X with the beak still inside the zone
        let mut sideways = Agent::new(1, AgentConfig::default(), true);
        sideways.set_pose(Point::new(-0.03, 1.0, 1.0), 90.0, 0.0);
        sideways.on_feeding_contact(zone, &mut field);
        let sideways_reward = sideways.take_reward();

        assert!((aligned_reward - 0.03).abs() < 1e-6);
        assert!((sideways_reward - 0.01).abs() < 1e-6);
        assert!(aligned_reward > sideways_reward);
        assert_eq!(aligned.take_reward(), 0.0);
    }

    #[test]
    fn no_reward_outside_training() {
        let mut field = line_field(&[1.0]);
        let mut agent = agent_at(1.0, false);
        let zone = field.flower(FlowerId(0)).zone_id();
        agent.on_feeding_contact(zone, &mut field);
        agent.on_boundary_contact();
        assert_eq!(agent.take_reward(), 0.0);
        assert!(agent.nectar_obtained() > 0.0);
    }

    #[test]
    fn boundary_penalty_in_training() {
        let mut agent = agent_at(0.0, true);
        agent.on_boundary_contact();
        assert_eq!(agent.take_reward(), -0.5);
    }

    #[test]
    fn pitch_command_is_rate_limited_and_clamped() {
        let mut agent = agent_at(0.0, false);
        agent.act(&[0.0, 0.0, 0.0, 1.0, 0.0], 0.02);
        assert!((agent.smooth_pitch - 0.04).abs() < 1e-12);
        assert!((agent.pitch_deg() - 0.04 * 100.0 * 0.02).abs() < 1e-9);
        for _ in 0..1000 {
            agent.act(&[0.0, 0.0, 0.0, 1.0, 0.0], 0.02);
        }
        assert_eq!(agent.pitch_deg(), 80.0);
        for _ in 0..1000 {
            agent.act(&[0.0, 0.0, 0.0, -1.0, 0.0], 0.02);
        }
        assert_eq!(agent.pitch_deg(), -80.0);
    }

    #[test]
    fn yaw_wraps_without_clamping() {
        let mut agent = agent_at(0.0, false);
        let mut seen_negative = false;
        for _ in 0..200 {
            agent.act(&[0.0, 0.0, 0.0, 0.0, 1.0], 0.02);
            seen_negative |= agent.yaw_deg() < 0.0;
            assert!(agent.yaw_deg() > -180.0 && agent.yaw_deg() <= 180.0);
        }
        assert!(seen_negative, "yaw should pass through the +/-180 seam");
    }

    #[test]
    fn movement_applies_force_and_integrates() {
        let mut agent = agent_at(0.0, false);
        let start = agent.position();
        agent.act(&[1.0, 0.0, 0.0, 0.0, 0.0], 0.02);
        assert!((agent.velocity().x - 2.0 * 0.02).abs() < 1e-12);
        agent.integrate(0.02);
        assert!(agent.position().x > start.x);
    }

    #[test]
    fn frozen_agent_ignores_actions() {
        let mut agent = agent_at(0.0, false);
        agent.freeze();
        let before = (agent.position(), agent.yaw_deg(), agent.pitch_deg());
        agent.act(&[1.0, 1.0, 1.0, 1.0, 1.0], 0.02);
        agent.integrate(0.02);
        assert_eq!(before, (agent.position(), agent.yaw_deg(), agent.pitch_deg()));
        agent.unfreeze();
        agent.act(&[1.0, 0.0, 0.0, 0.0, 0.0], 0.02);
        assert!(agent.velocity().x > 0.0);
    }

    #[test]
    fn freezing_in_training_is_rejected() {
        let mut agent = agent_at(0.0, true);
        assert_eq!(agent.try_freeze(), Err(AgentError::FreezeInTraining));
        assert_eq!(agent.try_unfreeze(), Err(AgentError::FreezeInTraining));
        assert!(!agent.is_frozen());
    }

    #[test]
    #[should_panic(expected = "not supported in training")]
    fn freeze_panics_in_training() {
        agent_at(0.0, true).freeze();
    }

    #[test]
    fn placement_is_collision_free() {
        let field = FlowerField::new(&FieldLayout::meadow(21));
        let colliders = ColliderIndex::build(&field, std::iter::empty());
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        for near_flower in [true, false] {
            for _ in 0..50 {
                let mut agent = Agent::new(0, AgentConfig::default(), true);
                agent.place_safely(near_flower, &field, &colliders, &mut rng);
                assert!(colliders.is_clear(agent.position(), agent.config().placement_clearance));
            }
        }
    }

    #[test]
    fn near_flower_spawn_faces_its_flower() {
        let field = line_field(&[1.0]);
        let colliders = ColliderIndex::build(&field, std::iter::empty());
        let mut rng = ChaCha12Rng::seed_from_u64(9);
        let mut agent = Agent::new(0, AgentConfig::default(), false);
        agent.place_safely(true, &field, &colliders, &mut rng);
        let to_flower = (field.flowers()[0].center() - agent.position()).normalize();
        assert!(agent.forward().dot(&to_flower) > 0.999);
    }

    #[test]
    fn spawn_above_upward_flower_respects_pitch_limit() {
        let layout = FieldLayout {
            flowers: vec![FlowerSpec {
                zone_id: None,
                offset: [0.0, 1.0, 0.0],
                up: [0.0, 1.0, 0.0],
                zone: ZoneSpec::Sphere {
                    height: 0.02,
                    radius: 0.015,
                },
                body_radius: 0.04,
            }],
            ..FieldLayout::default()
        };
        let field = FlowerField::new(&layout);
        let colliders = ColliderIndex::build(&field, std::iter::empty());
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let mut agent = Agent::new(0, AgentConfig::default(), false);
        agent.place_safely(true, &field, &colliders, &mut rng);

        let limit = agent.config().max_pitch_deg;
        assert!(agent.position().y > 1.0);
        assert_eq!(agent.pitch_deg(), limit);
        agent.act(&[0.0; ACTION_SIZE], 0.02);
        assert_eq!(agent.pitch_deg(), limit);
    }

    #[test]
    fn exhausted_placement_budget_is_an_error() {
        // one flower whose body swallows every near-flower candidate
        let layout = FieldLayout {
            flowers: vec![FlowerSpec {
                zone_id: None,
                offset: [0.0, 1.0, 0.0],
                up: [0.0, 1.0, 0.0],
                zone: ZoneSpec::Sphere {
                    height: 0.02,
                    radius: 0.015,
                },
                body_radius: 1.0,
            }],
            ..FieldLayout::default()
        };
        let field = FlowerField::new(&layout);
        let colliders = ColliderIndex::build(&field, std::iter::empty());
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let mut agent = Agent::new(3, AgentConfig::default(), false);
        assert_eq!(
            agent.try_place_safely(true, &field, &colliders, &mut rng),
            Err(PlacementError {
                agent: 3,
                attempts: 100
            })
        );
    }

    #[test]
    fn episode_reset_clears_tallies_and_retargets() {
        let mut field = FlowerField::new(&FieldLayout::meadow(2));
        let colliders = ColliderIndex::build(&field, std::iter::empty());
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let mut agent = Agent::new(0, AgentConfig::default(), true);
        agent.reset_for_episode(&field, &colliders, &mut rng);
        let target = agent.target().expect("meadow has nectar");
        let zone = field.flower(target).zone_id();
        let beak = agent.config().beak_offset;
        let center = field.flower(target).center();
        agent.set_pose(Point::new(center.x, center.y, center.z - beak[2]), 0.0, 0.0);
        agent.on_feeding_contact(zone, &mut field);
        agent.act(&[1.0, 0.0, 0.0, 0.0, 0.0], 0.02);
        assert!(agent.nectar_obtained() > 0.0);

        agent.reset_for_episode(&field, &colliders, &mut rng);
        assert_eq!(agent.nectar_obtained(), 0.0);
        assert_eq!(agent.velocity(), Vector::zeros());
        assert_eq!(agent.angular_velocity(), Vector::zeros());
        assert_eq!(agent.take_reward(), 0.0);
        assert!(agent.target().is_some());
    }
}
