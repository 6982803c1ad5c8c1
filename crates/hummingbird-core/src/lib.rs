//! Hummingbird nectar-foraging simulation: flowers with finite nectar,
//! agents that seek, feed and compete, and the match flow around them.

pub mod agent;
pub mod arena;
pub mod batch;
pub mod config;
pub mod field;
pub mod flower;
pub mod game;
pub mod geometry;
pub mod physics;
pub mod policy;
pub mod spatial;

pub use agent::{Action, Agent, Observation, ACTION_SIZE, OBSERVATION_SIZE};
pub use arena::{Arena, ArenaError, StepOutcome};
pub use config::{AgentConfig, ArenaConfig, MatchConfig};
pub use field::{FieldLayout, FlowerField};
pub use flower::{Flower, FlowerId, ZoneId};
pub use game::{DisplayState, MatchController, MatchDisplay, MatchError, MatchState};
