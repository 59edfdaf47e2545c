//! Tradeoff analysis over learned quantifier words.
//!
//! Searches quantifier definitions whose posterior combines a simplicity
//! prior with weighted communicative accuracy, and reports the best ones.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use speech_agent::{HypothesisSpace, TradeoffSpace};

use crate::config::SimulationConfig;
use crate::persistence::{new_run_id, RunWriter};
use crate::types::Result;
use crate::worker::run_blocking;

/// One hypothesis kept by the analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedQuantifiers {
    pub hypothesis: String,
    pub log_posterior: f64,
    pub log_prior: f64,
    /// Accuracy on the evaluation scenes, unweighted
    pub communicative_accuracy: f64,
}

/// Result of one analysis, best hypothesis first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeoffSummary {
    pub run_id: String,
    pub likelihood_weight: f64,
    pub hypotheses: Vec<RankedQuantifiers>,
}

/// A tradeoff analysis for one likelihood weight.
#[derive(Debug, Clone)]
pub struct TradeoffAnalysis {
    config: Arc<SimulationConfig>,
    space: Arc<TradeoffSpace>,
}

impl TradeoffAnalysis {
    /// Uses the `tradeoff`, `learner` and `speaker` sections of `config`.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let space = TradeoffSpace::new(
            config.tradeoff.clone(),
            config.learner.clone(),
            config.speaker.clone(),
        )?;
        Ok(Self {
            config: Arc::new(config),
            space: Arc::new(space),
        })
    }

    /// Search, rank and optionally save the best `learner.top_n` hypotheses.
    pub async fn run(&self) -> Result<TradeoffSummary> {
        let run_id = new_run_id();
        let seed = self.config.seed;
        let weight = self.config.tradeoff.likelihood_weight;
        info!(
            run_id = %run_id,
            likelihood_weight = weight,
            top_n = self.config.learner.top_n,
            "Starting tradeoff analysis"
        );

        let space = self.space.clone();
        let job = move || -> Result<Vec<RankedQuantifiers>> {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let posterior = space.learn(&[], &mut rng);
            posterior
                .iter()
                .map(|(hypothesis, log_posterior)| -> Result<RankedQuantifiers> {
                    Ok(RankedQuantifiers {
                        hypothesis: hypothesis.to_string(),
                        log_posterior,
                        log_prior: space.prior(hypothesis),
                        communicative_accuracy: space.communicative_accuracy(hypothesis)?,
                    })
                })
                .collect()
        };
        let hypotheses = run_blocking(vec![job]).await?.into_iter().flatten().collect();

        let summary = TradeoffSummary {
            run_id,
            likelihood_weight: weight,
            hypotheses,
        };
        if let Some(best) = summary.hypotheses.first() {
            info!(
                best = %best.hypothesis,
                accuracy = best.communicative_accuracy,
                kept = summary.hypotheses.len(),
                "Tradeoff analysis finished"
            );
        }

        if self.config.output.enabled {
            let writer = RunWriter::create(&self.config.output, &summary.run_id)?;
            writer.write_parameters(&self.config)?;
            writer.write_tradeoff(&summary)?;
        }
        Ok(summary)
    }
}
