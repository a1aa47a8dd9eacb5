//! CMA-ES in a logistic-reparameterized space.
//!
//! Each axis is searched on the real line and mapped into its box with
//! [`to_bounded`], so every sample is feasible by construction. Updates follow
//! the standard (mu/mu_w, lambda) scheme: weighted recombination, cumulative
//! step-size adaptation, rank-one plus rank-mu covariance update.

use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand_distr::{Distribution, StandardNormal};

use crate::domain::{CmaesConfig, OptimizerKind};
use crate::error::AppError;
use crate::math::{to_bounded, to_unbounded};
use crate::optim::rng::make_rng;
use crate::optim::{Evaluator, SearchOutcome, Strategy};

const EIGEN_EPS: f64 = 1e-14;
const EIGEN_MAX_ITER: usize = 1000;
const MIN_EIGENVALUE: f64 = 1e-30;

#[derive(Debug, Clone)]
pub struct Cmaes {
    config: CmaesConfig,
    seed: Option<u64>,
}

impl Cmaes {
    pub fn new(config: CmaesConfig, seed: Option<u64>) -> Self {
        Self { config, seed }
    }

    /// `(lambda, mu)` for a problem of dimension `n`.
    pub fn population(&self, n: usize) -> (usize, usize) {
        let lambda = self
            .config
            .population_size
            .unwrap_or(4 + (3.0 * (n as f64).ln()).floor() as usize)
            .max(2);
        let mu = self.config.elite_count.unwrap_or(lambda / 2).clamp(1, lambda);
        (lambda, mu)
    }
}

/// `C = B diag(d^2) B^T`; returns `(B, d, C^{-1/2})`.
fn decompose(c: &DMatrix<f64>) -> Result<(DMatrix<f64>, DVector<f64>, DMatrix<f64>), AppError> {
    if c.iter().any(|v| !v.is_finite()) {
        return Err(AppError::new(4, "CMA-ES covariance became non-finite."));
    }
    let sym = (c + c.transpose()) * 0.5;
    let eig = SymmetricEigen::try_new(sym, EIGEN_EPS, EIGEN_MAX_ITER)
        .ok_or_else(|| AppError::new(4, "CMA-ES covariance eigendecomposition did not converge."))?;
    if eig.eigenvalues.iter().any(|v| !v.is_finite()) {
        return Err(AppError::new(4, "CMA-ES covariance became non-finite."));
    }
    let d = eig.eigenvalues.map(|v| v.max(MIN_EIGENVALUE).sqrt());
    let b = eig.eigenvectors;
    let inv_d = DMatrix::from_diagonal(&d.map(|v| 1.0 / v));
    let inv_sqrt = &b * inv_d * b.transpose();
    Ok((b, d, inv_sqrt))
}

impl Strategy for Cmaes {
    const KIND: OptimizerKind = OptimizerKind::Cmaes;

    fn search(&self, eval: &mut Evaluator<'_>, start: &[f64]) -> Result<SearchOutcome, AppError> {
        let cfg = &self.config;
        let bounds = eval.bounds();
        let n = eval.dim();
        let nf = n as f64;
        let (lambda, mu) = self.population(n);
        let mut rng = make_rng(self.seed);

        let raw: Vec<f64> = (0..mu).map(|i| ((mu as f64) + 0.5).ln() - ((i + 1) as f64).ln()).collect();
        let total: f64 = raw.iter().sum();
        let weights: Vec<f64> = raw.iter().map(|w| w / total).collect();
        let mueff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        let cc = (4.0 + mueff / nf) / (nf + 4.0 + 2.0 * mueff / nf);
        let cs = (mueff + 2.0) / (nf + mueff + 5.0);
        let c1 = 2.0 / ((nf + 1.3).powi(2) + mueff);
        let cmu = (1.0 - c1).min(2.0 * (mueff - 2.0 + 1.0 / mueff) / ((nf + 2.0).powi(2) + mueff));
        let damps = 1.0 + 2.0 * (((mueff - 1.0) / (nf + 1.0)).sqrt() - 1.0).max(0.0) + cs;
        let chi_n = nf.sqrt() * (1.0 - 1.0 / (4.0 * nf) + 1.0 / (21.0 * nf * nf));

        let to_box = |y: &DVector<f64>| -> Vec<f64> {
            (0..n)
                .map(|i| to_bounded(y[i], bounds.lower[i], bounds.upper[i]))
                .collect()
        };

        let mut mean = DVector::from_iterator(
            n,
            (0..n).map(|i| to_unbounded(start[i], bounds.lower[i], bounds.upper[i])),
        );
        let mut sigma = cfg.initial_sigma;
        let mut cov = DMatrix::<f64>::identity(n, n);
        let mut pc = DVector::<f64>::zeros(n);
        let mut ps = DVector::<f64>::zeros(n);
        let mut b = DMatrix::<f64>::identity(n, n);
        let mut d = DVector::<f64>::from_element(n, 1.0);
        let mut inv_sqrt = DMatrix::<f64>::identity(n, n);

        let mut iterations = 0;
        let mut reason = "generation budget exhausted";

        for generation in 0..cfg.max_generations {
            iterations = generation + 1;

            let mut samples: Vec<(DVector<f64>, f64)> = Vec::with_capacity(lambda);
            for _ in 0..lambda {
                let z = DVector::from_iterator(
                    n,
                    (0..n).map(|_| -> f64 { StandardNormal.sample(&mut rng) }),
                );
                let y = &mean + (&b * d.component_mul(&z)) * sigma;
                let value = eval.eval(&to_box(&y));
                samples.push((y, value));
            }
            samples.sort_by(|a, b| a.1.total_cmp(&b.1));
            eval.record_generation();

            let old_mean = mean.clone();
            mean = DVector::zeros(n);
            for (w, (y, _)) in weights.iter().zip(&samples) {
                mean += y * *w;
            }
            let shift = (&mean - &old_mean) / sigma;

            ps = ps * (1.0 - cs) + &inv_sqrt * &shift * (cs * (2.0 - cs) * mueff).sqrt();
            let ps_norm = ps.norm();
            let decay = 1.0 - (1.0 - cs).powi(2 * (generation as i32 + 1));
            let hsig = ps_norm / decay.sqrt() / chi_n < 1.4 + 2.0 / (nf + 1.0);
            let hsig_f = if hsig { 1.0 } else { 0.0 };
            pc = pc * (1.0 - cc) + &shift * (hsig_f * (cc * (2.0 - cc) * mueff).sqrt());

            let mut rank_mu = DMatrix::<f64>::zeros(n, n);
            for (w, (y, _)) in weights.iter().zip(&samples) {
                let step = (y - &old_mean) / sigma;
                rank_mu += &step * step.transpose() * *w;
            }
            let rank_one = &pc * pc.transpose() + &cov * ((1.0 - hsig_f) * cc * (2.0 - cc));
            cov = &cov * (1.0 - c1 - cmu) + rank_one * c1 + rank_mu * cmu;

            sigma *= ((cs / damps) * (ps_norm / chi_n - 1.0)).exp();
            if !sigma.is_finite() {
                return Err(AppError::new(4, "CMA-ES step size became non-finite."));
            }

            (b, d, inv_sqrt) = decompose(&cov)?;

            let spread = sigma * d.max();
            if spread < cfg.tolerance {
                reason = "step size below tolerance";
                break;
            }
        }

        // The mean itself is often the best point once the distribution has contracted.
        eval.eval(&to_box(&mean));
        Ok(SearchOutcome::new(iterations, reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optim::testing::check_contract;

    #[test]
    fn recovers_quadratic_optimum() {
        check_contract(&Cmaes::new(CmaesConfig::default(), Some(13)), 1e-3);
    }

    #[test]
    fn population_follows_dimension() {
        let cmaes = Cmaes::new(CmaesConfig::default(), None);
        assert_eq!(cmaes.population(2), (6, 3));
        assert_eq!(cmaes.population(5), (8, 4));
        let fixed = Cmaes::new(
            CmaesConfig {
                population_size: Some(20),
                elite_count: Some(5),
                ..CmaesConfig::default()
            },
            None,
        );
        assert_eq!(fixed.population(3), (20, 5));
    }

    #[test]
    fn decomposition_of_identity() {
        let (b, d, inv) = decompose(&DMatrix::identity(3, 3)).unwrap();
        assert!((d.sum() - 3.0).abs() < 1e-12);
        assert!((&b * b.transpose() - DMatrix::<f64>::identity(3, 3)).norm() < 1e-12);
        assert!((inv - DMatrix::<f64>::identity(3, 3)).norm() < 1e-12);
    }
}
