//! Match flow for a human-facing game between a primary agent and an
//! opponent sharing one arena.

use crate::arena::Arena;
use crate::config::{ConfigError, MatchConfig};
use std::collections::VecDeque;
use std::{error::Error, fmt};
use tracing::{info, warn};

pub const COUNTDOWN: [&str; 4] = ["3", "2", "1", "Go!"];

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatchState {
    Default,
    MainMenu,
    /// Countdown running; the field holds seconds left until play starts.
    Preparing { countdown_remaining: f64 },
    Playing,
    Gameover,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchEvent {
    Activate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CameraView {
    Spectator,
    Agent(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Winner {
    Primary,
    Opponent,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchOutcome {
    pub winner: Winner,
    pub primary_nectar: f32,
    pub opponent_nectar: f32,
    pub elapsed_secs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchError {
    Config(ConfigError),
    SameAgent(usize),
    UnknownAgent { index: usize, available: usize },
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchError::Config(e) => write!(f, "{}", e),
            MatchError::SameAgent(i) => {
                write!(f, "primary and opponent must be different agents (both {i})")
            }
            MatchError::UnknownAgent { index, available } => {
                write!(f, "agent {index} does not exist (arena has {available})")
            }
        }
    }
}

impl From<ConfigError> for MatchError {
    fn from(err: ConfigError) -> Self {
        MatchError::Config(err)
    }
}

impl Error for MatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MatchError::Config(e) => Some(e),
            _ => None,
        }
    }
}

/// The UI collaborator.
pub trait MatchDisplay {
    /// Negative hides the timer.
    fn set_timer(&mut self, seconds: f64);
    fn set_nectar(&mut self, primary: f32, opponent: f32);
    fn show_banner(&mut self, text: &str);
    fn show_button(&mut self, label: &str);
    fn hide_button(&mut self);
    fn set_view(&mut self, view: CameraView);
}

/// In-memory display that simply records the last value of everything.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayState {
    pub timer: f64,
    pub primary_nectar: f32,
    pub opponent_nectar: f32,
    pub banner: String,
    pub button: Option<String>,
    pub view: CameraView,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            timer: -1.0,
            primary_nectar: 0.0,
            opponent_nectar: 0.0,
            banner: String::new(),
            button: None,
            view: CameraView::Spectator,
        }
    }
}

impl MatchDisplay for DisplayState {
    fn set_timer(&mut self, seconds: f64) {
        self.timer = seconds;
    }

    fn set_nectar(&mut self, primary: f32, opponent: f32) {
        self.primary_nectar = primary;
        self.opponent_nectar = opponent;
    }

    fn show_banner(&mut self, text: &str) {
        self.banner = text.to_string();
    }

    fn show_button(&mut self, label: &str) {
        self.button = Some(label.to_string());
    }

    fn hide_button(&mut self) {
        self.button = None;
    }

    fn set_view(&mut self, view: CameraView) {
        self.view = view;
    }
}

/// Finite state machine gating when the agents may act.
///
/// `Default → MainMenu → Preparing → Playing → Gameover → MainMenu`. The
/// whole loop is advanced by [`MatchController::tick`]; the countdown is a
/// timed sub-state, not a suspended task.
pub struct MatchController {
    config: MatchConfig,
    state: MatchState,
    primary: usize,
    opponent: usize,
    clock: f64,
    start_time: f64,
    events: VecDeque<MatchEvent>,
    countdown_step: usize,
    outcome: Option<MatchOutcome>,
}

impl MatchController {
    /// The arena driven by this controller must not be in training mode,
    /// since matches freeze and unfreeze both agents.
    pub fn new(config: MatchConfig, primary: usize, opponent: usize) -> Self {
        Self::try_new(config, primary, opponent).unwrap_or_else(|e| panic!("{e}"))
    }

    pub fn try_new(
        config: MatchConfig,
        primary: usize,
        opponent: usize,
    ) -> Result<Self, MatchError> {
        config.validate()?;
        if primary == opponent {
            return Err(MatchError::SameAgent(primary));
        }
        Ok(Self {
            config,
            state: MatchState::Default,
            primary,
            opponent,
            clock: 0.0,
            start_time: 0.0,
            events: VecDeque::new(),
            countdown_step: 0,
            outcome: None,
        })
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Result of the most recent finished match.
    pub fn outcome(&self) -> Option<MatchOutcome> {
        self.outcome
    }

    pub fn elapsed(&self) -> f64 {
        self.clock - self.start_time
    }

    /// Seconds left while playing; zero in every other state.
    pub fn time_remaining(&self) -> f64 {
        match self.state {
            MatchState::Playing => (self.config.duration_secs - self.elapsed()).max(0.0),
            _ => 0.0,
        }
    }

    /// Queue an activation signal for the next tick.
    pub fn activate(&mut self) {
        self.events.push_back(MatchEvent::Activate);
    }

    pub fn start(&mut self, arena: &mut Arena, display: &mut impl MatchDisplay) {
        self.try_start(arena, display)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Enter the main menu from the initial state. Both agents must exist
    /// in `arena`.
    pub fn try_start(
        &mut self,
        arena: &mut Arena,
        display: &mut impl MatchDisplay,
    ) -> Result<(), MatchError> {
        for index in [self.primary, self.opponent] {
            if index >= arena.num_agents() {
                return Err(MatchError::UnknownAgent {
                    index,
                    available: arena.num_agents(),
                });
            }
        }
        if self.state != MatchState::Default {
            warn!(state = ?self.state, "start requested after startup; ignored");
            return Ok(());
        }
        self.enter_main_menu(arena, display);
        Ok(())
    }

    /// Advance the match by `dt` seconds of simulated time.
    ///
    /// Timed transitions run before queued activations, so a countdown
    /// entered on this tick starts counting on the next one.
    pub fn tick(&mut self, dt: f64, arena: &mut Arena, display: &mut impl MatchDisplay) {
        self.clock += dt;
        match self.state {
            MatchState::Preparing {
                countdown_remaining,
            } => {
                let remaining = countdown_remaining - dt;
                self.state = MatchState::Preparing {
                    countdown_remaining: remaining,
                };
                self.advance_countdown(remaining, arena, display);
            }
            MatchState::Playing => {
                let primary = arena.agent(self.primary).nectar_obtained();
                let opponent = arena.agent(self.opponent).nectar_obtained();
                if self.time_remaining() <= 0.0
                    || primary >= self.config.max_nectar
                    || opponent >= self.config.max_nectar
                {
                    self.end_game(arena, display);
                }
            }
            _ => {}
        }
        while let Some(event) = self.events.pop_front() {
            self.handle(event, arena, display);
        }

        match self.state {
            MatchState::Playing => {
                display.set_timer(self.time_remaining());
                self.publish_nectar(arena, display);
            }
            MatchState::Preparing { .. } | MatchState::Gameover => {
                display.set_timer(self.time_remaining());
            }
            MatchState::Default | MatchState::MainMenu => {
                display.set_timer(-1.0);
                display.set_nectar(0.0, 0.0);
            }
        }
    }

    fn publish_nectar(&self, arena: &Arena, display: &mut impl MatchDisplay) {
        let max = self.config.max_nectar;
        display.set_nectar(
            arena.agent(self.primary).nectar_obtained() / max,
            arena.agent(self.opponent).nectar_obtained() / max,
        );
    }

    fn handle(&mut self, event: MatchEvent, arena: &mut Arena, display: &mut impl MatchDisplay) {
        match (event, self.state) {
            (MatchEvent::Activate, MatchState::MainMenu) => self.enter_preparing(display),
            (MatchEvent::Activate, MatchState::Gameover) => self.enter_main_menu(arena, display),
            (MatchEvent::Activate, state) => {
                warn!(?state, "activation received in unexpected state; ignored");
            }
        }
    }

    fn enter_main_menu(&mut self, arena: &mut Arena, display: &mut impl MatchDisplay) {
        self.state = MatchState::MainMenu;
        display.show_banner("");
        display.show_button(&self.config.start_label);
        display.set_view(CameraView::Spectator);

        arena.begin_episode();
        arena.agent_mut(self.primary).freeze();
        arena.agent_mut(self.opponent).freeze();
        info!("main menu");
    }

    fn enter_preparing(&mut self, display: &mut impl MatchDisplay) {
        let total = self.config.countdown_interval_secs * COUNTDOWN.len() as f64;
        self.state = MatchState::Preparing {
            countdown_remaining: total,
        };
        self.countdown_step = 0;
        display.hide_button();
        display.set_view(CameraView::Agent(self.primary));
        display.show_banner(COUNTDOWN[0]);
        info!(countdown_secs = total, "preparing");
    }

    /// Show the banner for the current countdown slot; start play once the
    /// last slot has been held for a full interval.
    fn advance_countdown(
        &mut self,
        remaining: f64,
        arena: &mut Arena,
        display: &mut impl MatchDisplay,
    ) {
        let interval = self.config.countdown_interval_secs;
        let total = interval * COUNTDOWN.len() as f64;
        if remaining <= 0.0 {
            display.show_banner("");
            self.enter_playing(arena);
            return;
        }
        let step = (((total - remaining) / interval).floor() as usize).min(COUNTDOWN.len() - 1);
        if step != self.countdown_step {
            self.countdown_step = step;
            display.show_banner(COUNTDOWN[step]);
        }
    }

    fn enter_playing(&mut self, arena: &mut Arena) {
        self.state = MatchState::Playing;
        self.start_time = self.clock;
        self.outcome = None;
        arena.agent_mut(self.primary).unfreeze();
        arena.agent_mut(self.opponent).unfreeze();
        info!(duration_secs = self.config.duration_secs, "match started");
    }

    fn end_game(&mut self, arena: &mut Arena, display: &mut impl MatchDisplay) {
        // Final bars reflect the totals the match ended on.
        self.publish_nectar(arena, display);
        let elapsed_secs = self.elapsed();
        self.state = MatchState::Gameover;
        arena.agent_mut(self.primary).freeze();
        arena.agent_mut(self.opponent).freeze();

        let primary_nectar = arena.agent(self.primary).nectar_obtained();
        let opponent_nectar = arena.agent(self.opponent).nectar_obtained();
        let winner = if primary_nectar >= opponent_nectar {
            Winner::Primary
        } else {
            Winner::Opponent
        };
        let banner = match winner {
            Winner::Primary => &self.config.win_banner,
            Winner::Opponent => &self.config.lose_banner,
        };
        display.show_banner(banner);
        display.show_button(&self.config.menu_label);
        self.outcome = Some(MatchOutcome {
            winner,
            primary_nectar,
            opponent_nectar,
            elapsed_secs,
        });
        info!(?winner, primary_nectar, opponent_nectar, "match over");
    }
}
