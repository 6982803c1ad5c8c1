use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentTally {
    pub agent: usize,
    pub nectar: f32,
    pub reward: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub steps: usize,
    pub agents: Vec<AgentTally>,
    pub flowers_depleted: usize,
    pub flowers_total: usize,
}

fn default_schema_version() -> u32 {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub arenas: usize,
    pub total_steps: usize,
    #[serde(default)]
    pub episodes: Vec<EpisodeSummary>,
}

impl RunSummary {
    pub fn new(arenas: usize, total_steps: usize, episodes: Vec<EpisodeSummary>) -> Self {
        Self {
            schema_version: default_schema_version(),
            arenas,
            total_steps,
            episodes,
        }
    }

    fn mean_over_agents(&self, value: impl Fn(&AgentTally) -> f32) -> f32 {
        let (sum, count) = self
            .episodes
            .iter()
            .flat_map(|e| e.agents.iter())
            .fold((0.0f32, 0usize), |(s, n), a| (s + value(a), n + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f32
        }
    }

    /// Mean nectar per agent-episode.
    pub fn mean_nectar(&self) -> f32 {
        self.mean_over_agents(|a| a.nectar)
    }

    pub fn mean_reward(&self) -> f32 {
        self.mean_over_agents(|a| a.reward)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(nectar: &[f32]) -> EpisodeSummary {
        EpisodeSummary {
            episode: 1,
            steps: 10,
            agents: nectar
                .iter()
                .enumerate()
                .map(|(agent, &n)| AgentTally {
                    agent,
                    nectar: n,
                    reward: n * 2.0,
                })
                .collect(),
            flowers_depleted: 0,
            flowers_total: 3,
        }
    }

    #[test]
    fn means_cover_every_agent_episode() {
        let run = RunSummary::new(2, 20, vec![episode(&[1.0, 3.0]), episode(&[2.0])]);
        assert_eq!(run.mean_nectar(), 2.0);
        assert_eq!(run.mean_reward(), 4.0);
        assert_eq!(RunSummary::new(0, 0, Vec::new()).mean_nectar(), 0.0);
    }

    #[test]
    fn missing_schema_version_defaults() {
        let run: RunSummary =
            serde_json::from_str(r#"{"arenas": 1, "total_steps": 5}"#).unwrap();
        assert_eq!(run.schema_version, 1);
        assert!(run.episodes.is_empty());
    }
}
