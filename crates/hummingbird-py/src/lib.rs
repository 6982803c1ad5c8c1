use hummingbird_core::{Action, Arena, ArenaConfig, FieldLayout, Observation, ACTION_SIZE};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

/// Minimal PyO3 module exposing hummingbird-core to Python.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

fn value_error(e: impl std::fmt::Display) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn to_lists(observations: Vec<Observation>) -> Vec<Vec<f32>> {
    observations.into_iter().map(|o| o.to_vec()).collect()
}

/// Training-facing arena: `reset()` then `step(actions)` in a loop.
#[pyclass(name = "Arena")]
struct PyArena {
    inner: Arena,
}

#[pymethods]
impl PyArena {
    /// `config_json` and `layout_json` are optional JSON documents; missing
    /// config keys take their defaults and a missing layout generates a meadow.
    #[new]
    #[pyo3(signature = (seed=0, training=true, config_json=None, layout_json=None))]
    fn new(
        seed: u64,
        training: bool,
        config_json: Option<&str>,
        layout_json: Option<&str>,
    ) -> PyResult<Self> {
        let base: ArenaConfig = match config_json {
            Some(text) => serde_json::from_str(text).map_err(value_error)?,
            None => ArenaConfig::default(),
        };
        let config = ArenaConfig {
            seed,
            training,
            ..base
        };
        let layout = match layout_json {
            Some(text) => FieldLayout::from_json(text).map_err(value_error)?,
            None => FieldLayout::meadow(seed),
        };
        let inner = Arena::try_new(config, &layout).map_err(value_error)?;
        Ok(Self { inner })
    }

    #[getter]
    fn num_agents(&self) -> usize {
        self.inner.num_agents()
    }

    #[getter]
    fn episode(&self) -> usize {
        self.inner.episode()
    }

    fn reset(&mut self) -> PyResult<Vec<Vec<f32>>> {
        let observations = self.inner.try_begin_episode().map_err(value_error)?;
        Ok(to_lists(observations))
    }

    /// Returns `(observations, rewards, done)`.
    fn step(&mut self, actions: Vec<Vec<f32>>) -> PyResult<(Vec<Vec<f32>>, Vec<f32>, bool)> {
        let actions = actions
            .into_iter()
            .map(|a| {
                Action::try_from(a.as_slice()).map_err(|_| {
                    value_error(format!(
                        "each action needs {ACTION_SIZE} values, got {}",
                        a.len()
                    ))
                })
            })
            .collect::<PyResult<Vec<_>>>()?;
        let outcome = self.inner.try_step(&actions).map_err(value_error)?;
        Ok((to_lists(outcome.observations), outcome.rewards, outcome.done))
    }

    /// Summary of the current episode as a JSON string.
    fn summary_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.episode_summary()).map_err(value_error)
    }
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_class::<PyArena>()?;
    Ok(())
}
