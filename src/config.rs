//! Configuration for the constraint solver.

use crate::fph;

/// Configuration parameters for the [`ConstraintSolver`](crate::solver::ConstraintSolver).
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Whether constraints will be solved. When `false`, [`solve`] is a no-op
    /// that reports zero constrained bodies.
    ///
    /// [`solve`]: crate::solver::ConstraintSolver::solve
    pub enabled: bool,
    /// The number of Projected Gauss-Seidel iterations to perform per solve.
    pub n_iterations: u32,
    /// The penetration depth (in meters) below which no positional (Baumgarte)
    /// bias is applied, to avoid jitter at near-zero depth.
    pub slop: fph,
    /// The fraction of the remaining penetration error fed back into the
    /// velocity constraint each step (Baumgarte stabilization factor β).
    pub baumgarte_factor: fph,
    /// The minimum pre-solve closing speed (in m/s) along the contact normal
    /// required for restitution to be applied. Contacts closing slower than
    /// this are treated as inelastic regardless of their restitution
    /// coefficient, which avoids resting contacts jittering from spurious
    /// bounce.
    pub restitution_threshold: fph,
    /// The magnitude above which an accumulated impulse is considered to have
    /// numerically saturated. Saturating impulses are clamped back to this
    /// magnitude and counted in [`SolveReport::n_saturated_impulses`](crate::solver::SolveReport::n_saturated_impulses)
    /// rather than treated as a failure.
    pub max_impulse_magnitude: fph,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            n_iterations: 10,
            slop: 0.005,
            baumgarte_factor: 0.2,
            restitution_threshold: 1.0,
            max_impulse_magnitude: 1e18,
        }
    }
}
