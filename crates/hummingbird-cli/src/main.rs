use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use hummingbird_core::arena::RunSummary;
use hummingbird_core::batch::ArenaBatch;
use hummingbird_core::game::{MatchState, Winner};
use hummingbird_core::policy::{IdlePolicy, NeuralPolicy, Policy, SeekPolicy};
use hummingbird_core::{
    Action, Arena, ArenaConfig, DisplayState, FieldLayout, MatchConfig, MatchController,
};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::Deserialize;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "hummingbird",
    version,
    about = "Run hummingbird foraging matches and training rollouts"
)]
struct Cli {
    /// JSON file with `arena` and `match` settings; missing keys use defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// JSON flower-field layout. Defaults to the generated meadow.
    #[arg(long, global = true)]
    layout: Option<PathBuf>,

    /// Overrides the configured seed.
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play one match: scripted seeker versus a random neural opponent.
    Play,
    /// Run training episodes across parallel arenas and report a summary.
    Rollout {
        #[arg(long, default_value_t = 8)]
        arenas: usize,
        /// Steps per arena.
        #[arg(long, default_value_t = 2_000)]
        steps: usize,
    },
    /// Time single-arena stepping.
    Bench {
        #[arg(long, default_value_t = 5_000)]
        steps: usize,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Settings {
    arena: ArenaConfig,
    #[serde(rename = "match")]
    match_config: MatchConfig,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => read_json::<Settings>(path)?,
        None => Settings::default(),
    };
    if let Some(seed) = cli.seed {
        settings.arena.seed = seed;
    }
    let layout = match &cli.layout {
        Some(path) => read_json::<FieldLayout>(path)?,
        None => FieldLayout::meadow(settings.arena.seed),
    };

    match cli.command {
        Command::Play => play(settings, &layout),
        Command::Rollout { arenas, steps } => rollout(settings.arena, &layout, arenas, steps),
        Command::Bench { steps } => bench(settings.arena, &layout, steps),
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn play(settings: Settings, layout: &FieldLayout) -> Result<()> {
    let config = ArenaConfig {
        training: false,
        ..settings.arena
    };
    if config.num_agents < 2 {
        bail!("a match needs at least two agents, got {}", config.num_agents);
    }
    let seed = config.seed;
    let mut arena = Arena::try_new(config, layout)?;
    let mut controller = MatchController::try_new(settings.match_config, 0, 1)?;
    let mut display = DisplayState::default();

    let mut policies: Vec<Box<dyn Policy>> = vec![
        Box::new(SeekPolicy::default()),
        Box::new(NeuralPolicy::random(&mut ChaCha12Rng::seed_from_u64(seed))),
    ];
    policies.extend((2..arena.num_agents()).map(|_| Box::new(IdlePolicy) as Box<dyn Policy>));

    let dt = arena.config().dt;
    let match_config = controller.config();
    let budget_secs = match_config.duration_secs
        + match_config.countdown_interval_secs * hummingbird_core::game::COUNTDOWN.len() as f64;
    let max_ticks = (budget_secs / dt).ceil() as usize + 10;

    controller.try_start(&mut arena, &mut display)?;
    controller.activate();
    for _ in 0..max_ticks {
        controller.tick(dt, &mut arena, &mut display);
        if controller.state() == MatchState::Gameover {
            break;
        }
        let observations = arena.observe_all();
        let actions: Vec<Action> = policies
            .iter_mut()
            .zip(&observations)
            .map(|(policy, obs)| policy.act(obs))
            .collect();
        arena.try_step(&actions)?;
    }

    let outcome = controller
        .outcome()
        .context("match did not reach game over within its time budget")?;
    info!(winner = ?outcome.winner, "match finished");
    let report = json!({
        "seed": seed,
        "winner": match outcome.winner {
            Winner::Primary => "primary",
            Winner::Opponent => "opponent",
        },
        "banner": display.banner,
        "primary_nectar": outcome.primary_nectar,
        "opponent_nectar": outcome.opponent_nectar,
        "elapsed_secs": outcome.elapsed_secs,
        "flowers_depleted": arena.field().depleted_count(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn rollout(config: ArenaConfig, layout: &FieldLayout, arenas: usize, steps: usize) -> Result<()> {
    let config = ArenaConfig {
        training: true,
        ..config
    };
    let agents = config.num_agents;
    let mut batch = ArenaBatch::new(&config, layout, arenas)?;
    let mut policy = SeekPolicy::default();
    let mut observations = batch.observe_all();
    let mut episodes = Vec::new();

    for _ in 0..steps {
        let actions: Vec<Vec<Action>> = observations
            .iter()
            .map(|arena_obs| arena_obs.iter().map(|obs| policy.act(obs)).collect())
            .collect();
        let outcomes = batch.step(&actions)?;
        observations = outcomes.into_iter().map(|o| o.observations).collect();
        episodes.extend(batch.drain_finished());
    }

    let summary = RunSummary::new(arenas, steps * arenas, episodes);
    info!(
        arenas,
        agents,
        episodes = summary.episodes.len(),
        mean_nectar = summary.mean_nectar(),
        mean_reward = summary.mean_reward(),
        "rollout finished"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn bench(config: ArenaConfig, layout: &FieldLayout, steps: usize) -> Result<()> {
    let config = ArenaConfig {
        training: true,
        max_episode_steps: 0,
        ..config
    };
    let mut arena = Arena::try_new(config, layout)?;
    let mut policy = SeekPolicy::default();
    let mut observations = arena.try_begin_episode()?;

    let start = Instant::now();
    for _ in 0..steps {
        let actions: Vec<Action> = observations.iter().map(|obs| policy.act(obs)).collect();
        observations = arena.try_step(&actions)?.observations;
    }
    let elapsed = start.elapsed();

    let per_step = elapsed / steps.max(1) as u32;
    println!("Time for {steps} steps: {elapsed:?}");
    println!("Avg time per step: {per_step:?}");
    println!(
        "Nectar collected: {:.2} ({} flowers depleted)",
        arena.agents().iter().map(|a| a.nectar_obtained()).sum::<f32>(),
        arena.field().depleted_count()
    );
    Ok(())
}
