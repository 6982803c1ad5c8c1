use super::*;
use crate::agent::{ACTION_SIZE, OBSERVATION_SIZE};
use crate::geometry::{look_angles, vector, Point};

fn training_arena(seed: u64) -> Arena {
    let config = ArenaConfig {
        seed,
        training: true,
        ..ArenaConfig::default()
    };
    Arena::new(config, &FieldLayout::meadow(seed))
}

fn idle(arena: &Arena) -> Vec<[f32; ACTION_SIZE]> {
    vec![[0.0; ACTION_SIZE]; arena.num_agents()]
}

/// Put agent `id` with its beak in the middle of its target's feeding zone,
/// facing straight into the flower.
fn park_on_target(arena: &mut Arena, id: usize) {
    let target = arena.agent(id).target().expect("target");
    let flower = arena.field().flower(target);
    let (center, up) = (flower.center(), flower.up());
    let (yaw, pitch) = look_angles(&-up);
    let agent = arena.agent_mut(id);
    agent.set_pose(Point::origin(), yaw, pitch);
    let beak = agent.orientation() * vector(agent.config().beak_offset);
    agent.set_pose(center - beak, yaw, pitch);
}

#[test]
fn begin_episode_places_every_agent_with_a_target() {
    let mut arena = training_arena(3);
    let observations = arena.begin_episode();
    assert_eq!(observations.len(), 2);
    assert_eq!(arena.episode(), 1);
    for agent in arena.agents() {
        assert!(agent.target().is_some());
        assert_eq!(agent.nectar_obtained(), 0.0);
    }
    let a = arena.agent(0).body();
    let b = arena.agent(1).body();
    assert!(!a.intersects(&b));
    assert!(observations.iter().all(|o| o.iter().any(|v| *v != 0.0)));
}

#[test]
fn rejects_wrong_action_count() {
    let mut arena = training_arena(1);
    arena.begin_episode();
    assert_eq!(
        arena.try_step(&[[0.0; ACTION_SIZE]]),
        Err(ArenaError::ActionCountMismatch {
            expected: 2,
            actual: 1
        })
    );
}

#[test]
fn invalid_config_is_reported() {
    let config = ArenaConfig {
        num_agents: 0,
        ..ArenaConfig::default()
    };
    assert!(matches!(
        Arena::try_new(config, &FieldLayout::meadow(0)),
        Err(ArenaError::Config(ConfigError::NoAgents))
    ));
}

#[test]
fn hovering_in_a_zone_feeds_every_step() {
    let mut arena = training_arena(6);
    arena.begin_episode();
    park_on_target(&mut arena, 0);
    let target = arena.agent(0).target().unwrap();

    let first = arena.step(&idle(&arena));
    assert!((first.rewards[0] - 0.03).abs() < 1e-4);
    let second = arena.step(&idle(&arena));
    assert!(second.rewards[0] > 0.0);

    assert!((arena.agent(0).nectar_obtained() - 0.02).abs() < 1e-6);
    assert!((arena.field().flower(target).nectar() - 0.98).abs() < 1e-6);
    let summary = arena.episode_summary();
    assert_eq!(summary.steps, 2);
    assert!((summary.agents[0].reward - first.rewards[0] - second.rewards[0]).abs() < 1e-6);
}

#[test]
fn boundary_penalty_fires_on_entry_only() {
    let mut arena = training_arena(2);
    arena.begin_episode();
    let (yaw, pitch) = (arena.agent(0).yaw_deg(), arena.agent(0).pitch_deg());
    arena
        .agent_mut(0)
        .set_pose(Point::new(0.0, 20.0, 0.0), yaw, pitch);

    let first = arena.step(&idle(&arena));
    assert_eq!(first.rewards[0], -0.5);
    assert!(arena.bounds().contains(&arena.agent(0).position()));
    let second = arena.step(&idle(&arena));
    assert_eq!(second.rewards[0], 0.0);
}

#[test]
fn episode_ends_at_horizon_in_training() {
    let config = ArenaConfig {
        training: true,
        max_episode_steps: 3,
        ..ArenaConfig::default()
    };
    let mut arena = Arena::new(config, &FieldLayout::meadow(0));
    arena.begin_episode();
    let actions = idle(&arena);
    assert!(!arena.step(&actions).done);
    assert!(!arena.step(&actions).done);
    assert!(arena.step(&actions).done);
    arena.begin_episode();
    assert_eq!(arena.step_index(), 0);
    assert_eq!(arena.episode(), 2);
}

#[test]
fn play_mode_never_ends_episodes() {
    let config = ArenaConfig {
        max_episode_steps: 1,
        ..ArenaConfig::default()
    };
    let mut arena = Arena::new(config, &FieldLayout::meadow(0));
    arena.begin_episode();
    let actions = idle(&arena);
    assert!(!arena.step(&actions).done);
    assert!(!arena.step(&actions).done);
}

#[test]
fn stolen_target_is_replaced_before_observation() {
    let mut arena = training_arena(9);
    arena.begin_episode();
    let stolen = arena.agent(0).target().unwrap();
    arena.field_mut().flower_mut(stolen).feed(1.0);

    let outcome = arena.step(&idle(&arena));
    let next = arena.agent(0).target().expect("other flowers remain");
    assert_ne!(next, stolen);
    assert!(arena.field().flower(next).has_nectar());
    assert_eq!(outcome.observations[0].len(), OBSERVATION_SIZE);
}

#[test]
fn same_seed_same_trajectory() {
    let run = |seed| {
        let mut arena = training_arena(seed);
        arena.begin_episode();
        let actions = vec![[0.3, -0.1, 0.5, 0.2, -0.4]; 2];
        let mut last = Vec::new();
        for _ in 0..50 {
            last = arena.step(&actions).observations;
        }
        last
    };
    assert_eq!(run(17), run(17));
}

#[test]
fn frozen_agents_stay_put() {
    let mut arena = Arena::new(ArenaConfig::default(), &FieldLayout::meadow(4));
    arena.begin_episode();
    arena.agent_mut(0).freeze();
    let frozen_before = arena.agent(0).position();
    let free_before = arena.agent(1).position();
    arena.step(&[[1.0; ACTION_SIZE]; 2]);
    assert_eq!(arena.agent(0).position(), frozen_before);
    assert_ne!(arena.agent(1).position(), free_before);
}
