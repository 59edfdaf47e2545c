//! The generational loop.
//!
//! Generation 0 is seeded, then each later generation picks parents by
//! fitness, raises every child on the blocking pool, and waits for all of
//! them before selecting again.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{debug, info};

use semantics::Lexicon;
use speech_agent::{ProgramHypothesis, ProgramSpace};

use crate::config::{SeedStrategy, SimulationConfig};
use crate::persistence::{new_run_id, RunWriter};
use crate::selection::select_parents;
use crate::types::{AgentSummary, GenerationRecord, Result, RunSummary};
use crate::worker::{raise_child, run_blocking, seed_agent, AgentOutcome, ChildTask};

type Outcome = AgentOutcome<ProgramHypothesis>;

/// An iterated-learning run over composition programs.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: Arc<SimulationConfig>,
    lexicon: Arc<Lexicon>,
    space: Arc<ProgramSpace>,
}

impl Simulation {
    /// Create a run over the configured vocabulary.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let lexicon = Arc::new(Lexicon::with_options(&config.lexicon));
        let space = Arc::new(ProgramSpace::new(lexicon.clone(), config.learner.clone()));
        Ok(Self {
            config: Arc::new(config),
            lexicon,
            space,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn space(&self) -> &ProgramSpace {
        &self.space
    }

    /// Run every generation and return the records.
    pub async fn run(&self) -> Result<RunSummary> {
        let population = &self.config.population;
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let run_id = new_run_id();
        let writer = if self.config.output.enabled {
            let writer = RunWriter::create(&self.config.output, &run_id)?;
            writer.write_parameters(&self.config)?;
            Some(writer)
        } else {
            None
        };

        info!(
            run_id = %run_id,
            generations = population.generations,
            agents = population.agents,
            strategy = ?population.seed_strategy,
            "Starting iterated learning run"
        );

        let mut outcomes = self.seed_generation(&mut rng).await?;
        let mut generations = vec![self.record(0, &outcomes, writer.as_ref())?];

        for generation in 1..population.generations {
            let fitness: Vec<f64> = outcomes.iter().map(|o| o.fitness).collect();
            let parents = select_parents(
                &fitness,
                population.selection_temperature,
                population.agents,
                &mut rng,
            );
            debug!(generation, ?parents, "Selected parents");

            let parent_data: Vec<_> = outcomes.into_iter().map(|o| Arc::new(o.data)).collect();
            let jobs: Vec<_> = parents
                .into_iter()
                .enumerate()
                .map(|(index, parent)| {
                    let task = ChildTask {
                        generation,
                        index,
                        parent,
                        parent_data: parent_data[parent].clone(),
                        seed: rng.gen(),
                    };
                    let space = self.space.clone();
                    let config = self.config.clone();
                    move || raise_child(space.as_ref(), &config, &task)
                })
                .collect();

            outcomes = run_blocking(jobs).await?;
            generations.push(self.record(generation, &outcomes, writer.as_ref())?);
        }

        info!(run_id = %run_id, generations = generations.len(), "Run finished");
        Ok(RunSummary {
            run_id,
            generations,
        })
    }

    async fn seed_generation(&self, rng: &mut StdRng) -> Result<Vec<Outcome>> {
        let population = &self.config.population;
        let preset = match population.seed_strategy {
            SeedStrategy::Program => Some(self.space.hypothesis(&population.seed_program)?),
            SeedStrategy::Hypothesis | SeedStrategy::RandomString => None,
        };

        let jobs: Vec<_> = (0..population.agents)
            .map(|index| {
                let seed: u64 = rng.gen();
                let space = self.space.clone();
                let config = self.config.clone();
                let lexicon = self.lexicon.clone();
                let preset = preset.clone();
                move || seed_agent(space.as_ref(), &config, &lexicon, preset.as_ref(), index, seed)
            })
            .collect();
        run_blocking(jobs).await
    }

    fn record(
        &self,
        index: usize,
        outcomes: &[Outcome],
        writer: Option<&RunWriter>,
    ) -> Result<GenerationRecord> {
        let record = GenerationRecord {
            index,
            agents: outcomes
                .iter()
                .map(|o| AgentSummary::from_agent(&o.agent, o.parent, o.fitness, o.data.clone()))
                .collect(),
        };

        let fitness = record.fitness();
        let finite: Vec<f64> = fitness.iter().copied().filter(|f| f.is_finite()).collect();
        let mean = if finite.is_empty() {
            f64::NEG_INFINITY
        } else {
            finite.iter().sum::<f64>() / finite.len() as f64
        };
        let best = fitness.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mutated = record.agents.iter().filter(|a| a.mutated).count();
        info!(generation = index, mean_fitness = mean, best_fitness = best, mutated, "Generation finished");

        if let Some(writer) = writer {
            let path = writer.write_generation(&record)?;
            debug!(generation = index, path = %path.display(), "Saved generation");
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SimulationError;

    fn small_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.population.generations = 2;
        config.population.agents = 2;
        config.population.observations = 3;
        config.population.context_size = 3;
        config.population.seed_strategy = SeedStrategy::Program;
        config.speaker.samples = 200;
        config.learner.chains = 1;
        config.learner.steps = 2000;
        config.learner.top_n = 3;
        config.output.enabled = false;
        config.seed = Some(42);
        config
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = small_config();
        config.population.generations = 0;
        assert!(matches!(
            Simulation::new(config),
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_bad_seed_program_fails() {
        let mut config = small_config();
        config.population.seed_program = "( apply L".to_string();
        let simulation = Simulation::new(config).unwrap();
        assert!(matches!(simulation.run().await, Err(SimulationError::Agent(_))));
    }

    #[tokio::test]
    async fn test_two_generations() {
        let simulation = Simulation::new(small_config()).unwrap();
        let summary = simulation.run().await.unwrap();
        assert_eq!(summary.generations.len(), 2);

        let first = &summary.generations[0];
        assert!(first.agents.iter().all(|a| a.parent.is_none()));
        assert!(first
            .agents
            .iter()
            .all(|a| a.hypothesis.as_deref() == Some("( apply L R )")));

        let second = &summary.generations[1];
        assert_eq!(second.agents.len(), 2);
        for agent in &second.agents {
            assert!(agent.parent.unwrap() < 2);
            assert!(!agent.posterior.is_empty());
            assert_eq!(agent.data.len(), 3);
        }
    }
}
