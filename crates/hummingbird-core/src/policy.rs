use crate::agent::{Action, Observation, ACTION_SIZE, OBSERVATION_SIZE};
use rand::Rng;

/// Anything that turns an observation into an action.
pub trait Policy {
    fn act(&mut self, observation: &Observation) -> Action;
}

/// Always hovers in place.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdlePolicy;

impl Policy for IdlePolicy {
    fn act(&mut self, _observation: &Observation) -> Action {
        [0.0; ACTION_SIZE]
    }
}

/// Scripted controller that flies at the observed target and turns the
/// beak toward it. Reads nothing but the observation vector.
#[derive(Clone, Copy, Debug)]
pub struct SeekPolicy {
    /// Heading error (degrees) that saturates the turn command.
    pub turn_saturation_deg: f32,
}

impl Default for SeekPolicy {
    fn default() -> Self {
        Self {
            turn_saturation_deg: 30.0,
        }
    }
}

fn wrap(angle: f32) -> f32 {
    let a = angle.rem_euclid(360.0);
    if a > 180.0 {
        a - 360.0
    } else {
        a
    }
}

impl Policy for SeekPolicy {
    fn act(&mut self, obs: &Observation) -> Action {
        let [qx, qy, qz, qw, dx, dy, dz, ..] = *obs;
        if dx == 0.0 && dy == 0.0 && dz == 0.0 {
            return [0.0; ACTION_SIZE];
        }
        // forward axis (+Z) rotated by the observed quaternion
        let fx = 2.0 * (qx * qz + qw * qy);
        let fy = 2.0 * (qy * qz - qw * qx);
        let fz = 1.0 - 2.0 * (qx * qx + qy * qy);

        let yaw_of = |x: f32, z: f32| x.atan2(z).to_degrees();
        let pitch_of = |x: f32, y: f32, z: f32| (-y).atan2((x * x + z * z).sqrt()).to_degrees();
        let yaw_err = wrap(yaw_of(dx, dz) - yaw_of(fx, fz));
        let pitch_err = pitch_of(dx, dy, dz) - pitch_of(fx, fy, fz);
        let s = self.turn_saturation_deg;
        [
            dx,
            dy,
            dz,
            (pitch_err / s).clamp(-1.0, 1.0),
            (yaw_err / s).clamp(-1.0, 1.0),
        ]
    }
}

const INPUT_SIZE: usize = OBSERVATION_SIZE;
const HIDDEN_SIZE: usize = 16;
const OUTPUT_SIZE: usize = ACTION_SIZE;

/// Untrained stand-in for the learned opponent: weights come from a seed or
/// an explicit list, never from training.
///
/// 10 observation inputs, 16 tanh hidden units, 5 tanh action outputs.
#[derive(Clone, Debug)]
pub struct NeuralPolicy {
    pub w_ih: [[f32; HIDDEN_SIZE]; INPUT_SIZE],
    pub b_h: [f32; HIDDEN_SIZE],
    pub w_ho: [[f32; OUTPUT_SIZE]; HIDDEN_SIZE],
    pub b_o: [f32; OUTPUT_SIZE],
}

impl NeuralPolicy {
    pub const WEIGHT_COUNT: usize =
        INPUT_SIZE * HIDDEN_SIZE + HIDDEN_SIZE + HIDDEN_SIZE * OUTPUT_SIZE + OUTPUT_SIZE;

    /// Fill input weights, hidden biases, output weights and output biases
    /// in that order. Panics if fewer than `WEIGHT_COUNT` values arrive.
    pub fn from_weights(weights: impl Iterator<Item = f32>) -> Self {
        let mut policy = Self {
            w_ih: [[0.0; HIDDEN_SIZE]; INPUT_SIZE],
            b_h: [0.0; HIDDEN_SIZE],
            w_ho: [[0.0; OUTPUT_SIZE]; HIDDEN_SIZE],
            b_o: [0.0; OUTPUT_SIZE],
        };
        let slots = policy
            .w_ih
            .iter_mut()
            .flatten()
            .chain(policy.b_h.iter_mut())
            .chain(policy.w_ho.iter_mut().flatten())
            .chain(policy.b_o.iter_mut());
        let mut filled = 0;
        for (slot, w) in slots.zip(weights) {
            *slot = w;
            filled += 1;
        }
        assert!(
            filled == Self::WEIGHT_COUNT,
            "insufficient weights: got {filled}, need {}",
            Self::WEIGHT_COUNT
        );
        policy
    }

    /// Uniform weights in `[-1, 1)`.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let weights: Vec<f32> = (0..Self::WEIGHT_COUNT)
            .map(|_| rng.random::<f32>() * 2.0 - 1.0)
            .collect();
        Self::from_weights(weights.into_iter())
    }

    pub fn forward(&self, input: &Observation) -> Action {
        let mut hidden = self.b_h;
        for (i, &x) in input.iter().enumerate() {
            for (j, h) in hidden.iter_mut().enumerate() {
                *h += x * self.w_ih[i][j];
            }
        }
        for h in &mut hidden {
            *h = h.tanh();
        }

        let mut output = self.b_o;
        for (i, &h) in hidden.iter().enumerate() {
            for (j, o) in output.iter_mut().enumerate() {
                *o += h * self.w_ho[i][j];
            }
        }
        for o in &mut output {
            *o = o.tanh();
        }
        output
    }
}

impl Policy for NeuralPolicy {
    fn act(&mut self, observation: &Observation) -> Action {
        self.forward(observation)
    }
}
