//! Metropolis-Hastings chains shared by every hypothesis space.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::debug;

use crate::hypothesis::{HypothesisSpace, Posterior};
use crate::types::Datum;

/// Run one chain of `steps` proposals, keeping the `top_n` best states.
pub fn run_chain<S: HypothesisSpace>(
    space: &S,
    data: &[Datum],
    steps: usize,
    top_n: usize,
    seed: u64,
) -> Posterior<S::Hypothesis> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut posterior = Posterior::new(top_n);

    let mut current = space.sample(&mut rng);
    let mut current_score = space.log_posterior(&current, data);
    posterior.insert(current.clone(), current_score);

    let mut accepted = 0usize;
    for _ in 0..steps {
        // Restart from the prior until the chain finds a possible state
        if current_score == f64::NEG_INFINITY {
            current = space.sample(&mut rng);
            current_score = space.log_posterior(&current, data);
            posterior.insert(current.clone(), current_score);
            continue;
        }

        let Some((proposal, forward_backward)) = space.propose(&current, &mut rng) else {
            continue;
        };
        let proposal_score = space.log_posterior(&proposal, data);
        if proposal_score == f64::NEG_INFINITY {
            continue;
        }

        let log_acceptance = proposal_score - current_score - forward_backward;
        if log_acceptance >= 0.0 || rng.gen::<f64>().ln() < log_acceptance {
            current = proposal;
            current_score = proposal_score;
            accepted += 1;
            posterior.insert(current.clone(), current_score);
        }
    }

    debug!(seed, accepted, kept = posterior.len(), "Chain finished");
    posterior
}

/// Run `chains` independent chains in parallel and merge their posteriors.
///
/// Chain seeds are drawn from `rng` up front and results are merged in
/// chain order, so a seeded call is reproducible.
pub fn learn_in_parallel<S, R>(
    space: &S,
    data: &[Datum],
    chains: usize,
    steps: usize,
    top_n: usize,
    rng: &mut R,
) -> Posterior<S::Hypothesis>
where
    S: HypothesisSpace,
    R: Rng + ?Sized,
{
    let seeds: Vec<u64> = (0..chains).map(|_| rng.gen()).collect();
    let posteriors: Vec<Posterior<S::Hypothesis>> = seeds
        .into_par_iter()
        .map(|seed| run_chain(space, data, steps, top_n, seed))
        .collect();
    let posterior = posteriors
        .into_iter()
        .fold(Posterior::new(top_n), Posterior::merge);

    debug!(data = data.len(), chains, kept = posterior.len(), "Learning finished");
    posterior
}
