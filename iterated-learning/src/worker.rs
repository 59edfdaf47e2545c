//! Per-agent work units and the blocking task pool that runs them.
//!
//! Every unit owns its inputs and its own RNG seed, so units of one
//! generation share nothing mutable and can run on any thread.

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, warn};

use semantics::Lexicon;
use speech_agent::{seed_from_random_strings, Agent, AgentError, Datum, HypothesisSpace};

use crate::config::{SeedStrategy, SimulationConfig};
use crate::types::{Result, SimulationError};

/// Fitness given to agents seeded without a hypothesis.
pub const UNSCORED_FITNESS: f64 = 1.0;

/// What one agent contributes to its generation.
#[derive(Debug)]
pub struct AgentOutcome<H: speech_agent::Hypothesis> {
    pub agent: Agent<H>,
    pub parent: Option<usize>,
    pub data: Vec<Datum>,
    pub fitness: f64,
}

/// A child's inputs: its parent's data and a seed.
#[derive(Debug, Clone)]
pub struct ChildTask {
    pub generation: usize,
    pub index: usize,
    pub parent: usize,
    pub parent_data: Arc<Vec<Datum>>,
    pub seed: u64,
}

/// Run blocking jobs on tokio's blocking pool and wait for all of them.
///
/// Results keep the order of `jobs`. The first failure, including a
/// panicked job, fails the whole batch.
pub async fn run_blocking<T, F>(jobs: Vec<F>) -> Result<Vec<T>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let handles: Vec<_> = jobs.into_iter().map(task::spawn_blocking).collect();
    join_all(handles)
        .await
        .into_iter()
        .map(|joined| match joined {
            Ok(result) => result,
            Err(e) => Err(SimulationError::Worker(e.to_string())),
        })
        .collect()
}

/// Learn from the parent, pick, maybe mutate, speak, and score.
///
/// If the chosen hypothesis cannot describe a context the child re-picks
/// from its posterior, skipping hypotheses that already failed, up to
/// `production_retries` more times. When nothing explains the parent's
/// data the child samples prior hypotheses until one can speak.
pub fn raise_child<S>(
    space: &S,
    config: &SimulationConfig,
    task: &ChildTask,
) -> Result<AgentOutcome<S::Hypothesis>>
where
    S: HypothesisSpace,
{
    let population = &config.population;
    let mut rng = StdRng::seed_from_u64(task.seed);
    let mut agent = Agent::new(config.speaker.clone());

    let learned = match agent.learn(space, &task.parent_data, &mut rng) {
        Ok(()) => true,
        Err(AgentError::EmptyPosterior) => false,
        Err(e) => return Err(e.into()),
    };

    let contexts = population.contexts.generate_many(
        population.context_size,
        population.observations,
        &mut rng,
    )?;

    if !learned {
        warn!(
            generation = task.generation,
            agent = task.index,
            parent = task.parent,
            "No hypothesis explains parent data, sampling from the prior"
        );
        let (agent, data) = Agent::seed_from_hypothesis(
            config.speaker.clone(),
            space,
            &contexts,
            population.reliability,
            population.seeding_attempts,
            &mut rng,
        )?;
        let fitness = agent.communicative_accuracy(&data)?;
        return Ok(AgentOutcome {
            agent,
            parent: Some(task.parent),
            data,
            fitness,
        });
    }

    let mut rejected: Vec<String> = Vec::new();
    let mut reason = "every posterior hypothesis failed".to_string();
    for attempt in 0..=population.production_retries {
        let picked = match agent.pick_hypothesis_except(&rejected, &mut rng) {
            Ok(hypothesis) => hypothesis.to_string(),
            Err(AgentError::EmptyPosterior) => break,
            Err(e) => return Err(e.into()),
        };
        agent.mutate(space, population.mutation_probability, &mut rng)?;
        match agent.produce_data(&contexts, population.reliability, &mut rng) {
            Ok(data) => {
                let fitness = agent.communicative_accuracy(&data)?;
                debug!(
                    generation = task.generation,
                    agent = task.index,
                    parent = task.parent,
                    attempt,
                    fitness,
                    "Child finished"
                );
                return Ok(AgentOutcome {
                    agent,
                    parent: Some(task.parent),
                    data,
                    fitness,
                });
            }
            Err(AgentError::NoTruthfulUtterance { context }) => {
                warn!(
                    generation = task.generation,
                    agent = task.index,
                    attempt,
                    hypothesis = %picked,
                    %context,
                    "Child could not describe a context"
                );
                reason = format!("no truthful utterance for {}", context);
                // A mutated failure says nothing about the picked hypothesis
                if !agent.is_mutated() {
                    rejected.push(picked);
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(SimulationError::NoData {
        generation: task.generation,
        agent: task.index,
        reason,
    })
}

/// Build one generation-0 agent and its data.
///
/// `preset` is the hypothesis used by the `program` strategy.
pub fn seed_agent<S>(
    space: &S,
    config: &SimulationConfig,
    lexicon: &Lexicon,
    preset: Option<&S::Hypothesis>,
    index: usize,
    seed: u64,
) -> Result<AgentOutcome<S::Hypothesis>>
where
    S: HypothesisSpace,
{
    let population = &config.population;
    let mut rng = StdRng::seed_from_u64(seed);
    let contexts = population.contexts.generate_many(
        population.context_size,
        population.observations,
        &mut rng,
    )?;

    let (agent, data, fitness) = match population.seed_strategy {
        SeedStrategy::Hypothesis => {
            let (agent, data) = Agent::seed_from_hypothesis(
                config.speaker.clone(),
                space,
                &contexts,
                population.reliability,
                population.seeding_attempts,
                &mut rng,
            )?;
            let fitness = agent.communicative_accuracy(&data)?;
            (agent, data, fitness)
        }
        SeedStrategy::Program => {
            let hypothesis = preset.ok_or_else(|| {
                SimulationError::InvalidConfig("program seeding needs a seed program".to_string())
            })?;
            let agent = Agent::new(config.speaker.clone()).with_hypothesis(hypothesis.clone());
            let data = agent
                .produce_data(&contexts, population.reliability, &mut rng)
                .map_err(|e| SimulationError::NoData {
                    generation: 0,
                    agent: index,
                    reason: e.to_string(),
                })?;
            let fitness = agent.communicative_accuracy(&data)?;
            (agent, data, fitness)
        }
        SeedStrategy::RandomString => {
            let data = seed_from_random_strings(
                lexicon,
                &contexts,
                population.reliability,
                population.random_string_depth,
                &mut rng,
            );
            (Agent::new(config.speaker.clone()), data, UNSCORED_FITNESS)
        }
    };

    debug!(agent = index, fitness, data = data.len(), "Seeded agent");
    Ok(AgentOutcome {
        agent,
        parent: None,
        data,
        fitness,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use speech_agent::{LearnerConfig, Posterior, ProgramHypothesis, ProgramSpace};

    /// Learns a fixed posterior whatever the data.
    struct FixedSpace {
        inner: ProgramSpace,
        posterior: Posterior<ProgramHypothesis>,
    }

    impl FixedSpace {
        fn new(entries: &[(&str, f64)]) -> Self {
            let inner = space();
            let mut posterior = Posterior::new(entries.len());
            for (program, score) in entries {
                posterior.insert(inner.hypothesis(program).unwrap(), *score);
            }
            Self { inner, posterior }
        }
    }

    impl HypothesisSpace for FixedSpace {
        type Hypothesis = ProgramHypothesis;

        fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ProgramHypothesis {
            self.inner.sample(rng)
        }

        fn propose<R: Rng + ?Sized>(
            &self,
            current: &ProgramHypothesis,
            rng: &mut R,
        ) -> Option<(ProgramHypothesis, f64)> {
            self.inner.propose(current, rng)
        }

        fn prior(&self, hypothesis: &ProgramHypothesis) -> f64 {
            self.inner.prior(hypothesis)
        }

        fn score(&self, hypothesis: &ProgramHypothesis, datum: &Datum) -> f64 {
            self.inner.score(hypothesis, datum)
        }

        fn learn<R: Rng + ?Sized>(&self, _data: &[Datum], _rng: &mut R) -> Posterior<ProgramHypothesis> {
            self.posterior.clone()
        }
    }

    fn task(parent_data: Vec<Datum>, seed: u64) -> ChildTask {
        ChildTask {
            generation: 1,
            index: 0,
            parent: 0,
            parent_data: Arc::new(parent_data),
            seed,
        }
    }

    fn space() -> ProgramSpace {
        ProgramSpace::new(
            Arc::new(Lexicon::standard()),
            LearnerConfig {
                chains: 1,
                steps: 2000,
                top_n: 3,
                ..Default::default()
            },
        )
    }

    fn config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.population.observations = 3;
        config.population.context_size = 3;
        config.speaker.samples = 200;
        config.output.enabled = false;
        config
    }

    #[tokio::test]
    async fn test_run_blocking_keeps_order() {
        let jobs: Vec<_> = (0..4usize).map(|i| move || Ok(i * 10)).collect();
        assert_eq!(run_blocking(jobs).await.unwrap(), vec![0, 10, 20, 30]);
    }

    #[tokio::test]
    async fn test_run_blocking_fails_fast() {
        let jobs: Vec<Box<dyn FnOnce() -> Result<usize> + Send>> = vec![
            Box::new(|| Ok(1)),
            Box::new(|| Err(SimulationError::InvalidConfig("bad".to_string()))),
        ];
        assert!(matches!(
            run_blocking(jobs).await,
            Err(SimulationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_seed_with_program() {
        let space = space();
        let mut config = config();
        config.population.seed_strategy = SeedStrategy::Program;
        let preset = space.hypothesis("( apply L R )").unwrap();
        let lexicon = Lexicon::standard();

        let outcome = seed_agent(&space, &config, &lexicon, Some(&preset), 0, 5).unwrap();
        assert_eq!(outcome.data.len(), 3);
        assert!(outcome.fitness <= 0.0);
        assert_eq!(outcome.parent, None);

        let missing = seed_agent(&space, &config, &lexicon, None, 0, 5);
        assert!(matches!(missing, Err(SimulationError::InvalidConfig(_))));
    }

    #[test]
    fn test_seed_with_random_strings() {
        let space = space();
        let mut config = config();
        config.population.seed_strategy = SeedStrategy::RandomString;
        let outcome = seed_agent(&space, &config, &Lexicon::standard(), None, 1, 9).unwrap();
        assert_eq!(outcome.data.len(), 3);
        assert_eq!(outcome.fitness, UNSCORED_FITNESS);
        assert!(outcome.agent.hypothesis().is_none());
    }

    #[test]
    fn test_raise_child_from_parent_data() {
        let space = space();
        let mut config = config();
        config.population.seed_strategy = SeedStrategy::Program;
        let preset = space.hypothesis("( apply L R )").unwrap();
        let parent = seed_agent(&space, &config, &Lexicon::standard(), Some(&preset), 0, 3).unwrap();

        let task = ChildTask {
            generation: 1,
            index: 0,
            parent: 0,
            parent_data: Arc::new(parent.data),
            seed: 11,
        };
        let child = raise_child(&space, &config, &task).unwrap();
        assert_eq!(child.parent, Some(0));
        assert_eq!(child.data.len(), 3);
        assert!(!child.agent.posterior().unwrap().is_empty());
    }

    #[test]
    fn test_child_repicks_after_mute_hypothesis() {
        // The mute rule dominates the posterior, so it is picked first
        let space = FixedSpace::new(&[("( complement L )", 0.0), ("( apply L R )", -30.0)]);
        let mut config = config();
        config.population.production_retries = 1;

        let child = raise_child(&space, &config, &task(Vec::new(), 6)).unwrap();
        assert_eq!(child.agent.hypothesis().unwrap().to_string(), "( apply L R )");
        assert_eq!(child.data.len(), 3);
        assert_eq!(child.agent.posterior().unwrap().len(), 2);
    }

    #[test]
    fn test_child_without_retries_fails() {
        let space = FixedSpace::new(&[("( complement L )", 0.0), ("( apply L R )", -30.0)]);
        let mut config = config();
        config.population.production_retries = 0;

        let result = raise_child(&space, &config, &task(Vec::new(), 6));
        assert!(matches!(
            result,
            Err(SimulationError::NoData { generation: 1, agent: 0, .. })
        ));
    }

    #[test]
    fn test_child_with_only_mute_hypotheses_stops_early() {
        let space = FixedSpace::new(&[("( complement L )", 0.0)]);
        let mut config = config();
        config.population.production_retries = 5;

        let result = raise_child(&space, &config, &task(Vec::new(), 2));
        assert!(matches!(result, Err(SimulationError::NoData { .. })));
    }

    #[test]
    fn test_child_of_random_strings_can_speak() {
        let space = space();
        let mut config = config();
        config.population.seed_strategy = SeedStrategy::RandomString;
        config.population.seeding_attempts = 2000;
        let parent = seed_agent(&space, &config, &Lexicon::standard(), None, 0, 4).unwrap();

        let child = raise_child(&space, &config, &task(parent.data, 13)).unwrap();
        assert_eq!(child.parent, Some(0));
        assert_eq!(child.data.len(), 3);
        assert!(child.agent.hypothesis().is_some());
        assert!(child.fitness.is_finite());
    }
}
