//! Fitness-proportional parent selection.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Softmax weights `exp((f - max) / temperature)`.
///
/// Non-finite or NaN fitness gets weight 0. If no weight is positive every
/// parent gets weight 1.
pub fn selection_weights(fitness: &[f64], temperature: f64) -> Vec<f64> {
    let best = fitness
        .iter()
        .copied()
        .filter(|f| f.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    let weights: Vec<f64> = fitness
        .iter()
        .map(|f| {
            if f.is_finite() && best.is_finite() {
                ((f - best) / temperature).exp()
            } else {
                0.0
            }
        })
        .collect();
    if weights.iter().any(|w| *w > 0.0) {
        weights
    } else {
        vec![1.0; fitness.len()]
    }
}

/// Draw `count` parent indices from the previous generation's fitness.
///
/// Returns an empty list when there are no parents.
pub fn select_parents<R: Rng + ?Sized>(
    fitness: &[f64],
    temperature: f64,
    count: usize,
    rng: &mut R,
) -> Vec<usize> {
    let weights = selection_weights(fitness, temperature);
    match WeightedIndex::new(&weights) {
        Ok(distribution) => (0..count).map(|_| distribution.sample(rng)).collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_weights_are_shifted_softmax() {
        let weights = selection_weights(&[-1.0, -2.0], 1.0);
        assert_eq!(weights[0], 1.0);
        assert!((weights[1] - (-1.0f64).exp()).abs() < 1e-12);

        let flat = selection_weights(&[-1.0, -2.0], 100.0);
        assert!(flat[1] > 0.99);
    }

    #[test]
    fn test_impossible_parents_are_never_chosen() {
        let weights = selection_weights(&[f64::NEG_INFINITY, -3.0, f64::NAN], 1.0);
        assert_eq!(weights, vec![0.0, 1.0, 0.0]);

        let mut rng = StdRng::seed_from_u64(1);
        let parents = select_parents(&[f64::NEG_INFINITY, -3.0], 1.0, 50, &mut rng);
        assert_eq!(parents.len(), 50);
        assert!(parents.iter().all(|&p| p == 1));
    }

    #[test]
    fn test_all_impossible_falls_back_to_uniform() {
        let weights = selection_weights(&[f64::NEG_INFINITY, f64::NEG_INFINITY], 1.0);
        assert_eq!(weights, vec![1.0, 1.0]);
    }

    #[test]
    fn test_selection_favors_fitter_parents() {
        let mut rng = StdRng::seed_from_u64(9);
        let parents = select_parents(&[0.0, -10.0], 1.0, 200, &mut rng);
        let fit = parents.iter().filter(|&&p| p == 0).count();
        assert!(fit > 190);
    }

    #[test]
    fn test_no_parents() {
        let mut rng = StdRng::seed_from_u64(2);
        assert!(select_parents(&[], 1.0, 3, &mut rng).is_empty());
    }
}
