//! The constraint solver entry point: assembles constraint records for a
//! batch of manifolds, runs Projected Gauss-Seidel iterations over them, and
//! exposes the resulting constrained velocities.

use std::fmt::Debug;
use std::hash::Hash;

use nalgebra::Vector3;

use crate::body::BodySet;
use crate::body_table::BodyTable;
use crate::config::SolverConfig;
use crate::constraint::{self, ManifoldConstraint};
use crate::contact::{ContactManifold, ContactPoint, ContactRow};
use crate::error::{QueryOnUnconstrainedBody, SolverError};
use crate::fph;
use crate::macros::trace_timed;

/// Iterative impulse-based solver for non-penetration and Coulomb friction
/// contact constraints.
///
/// `H` is the body handle type used by the [`BodySet`] the solver is called
/// with; one `ConstraintSolver` is meant to be reused across steps for the
/// same world, so its scratch body table can amortize its allocations.
///
/// After a [`solve`](Self::solve) call, the solver retains the resulting
/// body index and velocity state until the next call, so
/// [`is_constrained`](Self::is_constrained) and the `constrained_*_velocity`
/// queries can be answered against the most recent step without the caller
/// having to keep anything else around.
#[derive(Debug)]
pub struct ConstraintSolver<H> {
    body_table: BodyTable<H>,
    /// Working buffer built up over the course of a `solve` call and swapped
    /// into `body_table` only once the whole call has succeeded, so a failed
    /// call leaves `body_table` exactly as the previous successful call left
    /// it. Always cleared (never reallocated) at the start of `solve`, so it
    /// carries over `body_table`'s high-water-mark capacity from the swap.
    scratch_table: BodyTable<H>,
    /// Per-manifold constraint records, rebuilt every `solve` call. Purely
    /// internal scratch state with no query surface, so it is cleared and
    /// reused in place unconditionally rather than swapped.
    manifold_constraints: Vec<ManifoldConstraint>,
}

/// Outcome of a single [`ConstraintSolver::solve`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct SolveReport {
    /// Number of distinct bodies touched by at least one constraint this
    /// call.
    pub n_constrained_bodies: usize,
    /// Number of manifolds solved.
    pub n_manifolds: usize,
    /// Number of contact points solved across all manifolds.
    pub n_contact_points: usize,
    /// Number of row impulses that hit [`SolverConfig::max_impulse_magnitude`]
    /// and were clamped back to it rather than left to grow unbounded.
    pub n_saturated_impulses: usize,
}

impl<H: Copy + Eq + Hash + Debug> Default for ConstraintSolver<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Copy + Eq + Hash + Debug> ConstraintSolver<H> {
    /// Creates a solver with no retained state.
    pub fn new() -> Self {
        Self {
            body_table: BodyTable::new(),
            scratch_table: BodyTable::new(),
            manifold_constraints: Vec::new(),
        }
    }

    /// Prepares and solves contact constraints for `manifolds` against the
    /// bodies in `bodies`, then writes the solved impulses back into each
    /// manifold's contact points for use as next step's warm start.
    ///
    /// `dt` is the duration of the step being constrained, in seconds; it
    /// must be strictly positive.
    ///
    /// Returns an error without mutating `manifolds` or this solver's
    /// retained state if any manifold fails its preconditions (an empty
    /// manifold, a non-finite input, a degenerate row between two moving
    /// bodies, or a body handle the [`BodySet`] cannot resolve). If
    /// `config.enabled` is `false`, clears the retained state and returns a
    /// zeroed report without touching `manifolds`.
    pub fn solve<M, Bs>(
        &mut self,
        dt: fph,
        manifolds: &mut [M],
        bodies: &Bs,
        config: &SolverConfig,
    ) -> Result<SolveReport, SolverError>
    where
        M: ContactManifold,
        M::Point: ContactPoint<Body = H>,
        Bs: BodySet<Handle = H>,
    {
        if !config.enabled || manifolds.is_empty() {
            self.body_table.clear();
            return Ok(SolveReport::default());
        }

        self.scratch_table.clear();
        self.manifold_constraints.clear();
        let mut n_contact_points = 0usize;

        for (manifold_idx, manifold) in manifolds.iter().enumerate() {
            let built = trace_timed!("building manifold constraint";
                constraint::build_manifold_constraint(
                    manifold_idx as u32,
                    manifold,
                    bodies,
                    &mut self.scratch_table,
                    config,
                    dt,
                )?
            );
            n_contact_points += built.points.len();
            self.manifold_constraints.push(built);
        }

        log::trace!(
            "solving {} contact points across {} manifolds and {} bodies ({} iterations)",
            n_contact_points,
            self.manifold_constraints.len(),
            self.scratch_table.len(),
            config.n_iterations,
        );

        let n_saturated_impulses = trace_timed!("running PGS iterations";
            run_iterations(&mut self.manifold_constraints, &mut self.scratch_table, config, dt)
        );

        if n_saturated_impulses > 0 {
            log::warn!(
                "{n_saturated_impulses} row impulses saturated at max_impulse_magnitude={}",
                config.max_impulse_magnitude,
            );
        }

        trace_timed!("writing back warm-start impulses";
            write_back_impulses(&self.manifold_constraints, manifolds)
        );

        let report = SolveReport {
            n_constrained_bodies: self.scratch_table.len(),
            n_manifolds: self.manifold_constraints.len(),
            n_contact_points,
            n_saturated_impulses,
        };

        // Only now, with the whole call having succeeded, does the scratch
        // state become the retained state queries read from. `body_table`'s
        // previous contents become next call's scratch buffer, so its
        // allocations keep getting reused rather than dropped.
        std::mem::swap(&mut self.body_table, &mut self.scratch_table);

        Ok(report)
    }

    /// Whether `handle` was touched by at least one constraint row in the
    /// most recent `solve` call.
    pub fn is_constrained(&self, handle: H) -> bool {
        self.body_table.index_of(handle).is_some()
    }

    /// The body's world-space linear velocity after constraint correction,
    /// i.e. `V1 + Vconstraint`.
    ///
    /// Returns [`QueryOnUnconstrainedBody`] if `handle` was not touched by
    /// the most recent `solve` call; check [`Self::is_constrained`] first to
    /// distinguish that from a zero correction.
    pub fn constrained_linear_velocity(
        &self,
        handle: H,
    ) -> Result<Vector3<fph>, QueryOnUnconstrainedBody> {
        let idx = self
            .body_table
            .index_of(handle)
            .ok_or(QueryOnUnconstrainedBody)?;
        Ok(self.body_table.v1[idx as usize] + self.body_table.v_constraint[idx as usize])
    }

    /// The body's angular velocity after constraint correction, i.e.
    /// `W1 + Wconstraint`.
    ///
    /// Returns [`QueryOnUnconstrainedBody`] if `handle` was not touched by
    /// the most recent `solve` call; check [`Self::is_constrained`] first to
    /// distinguish that from a zero correction.
    pub fn constrained_angular_velocity(
        &self,
        handle: H,
    ) -> Result<Vector3<fph>, QueryOnUnconstrainedBody> {
        let idx = self
            .body_table
            .index_of(handle)
            .ok_or(QueryOnUnconstrainedBody)?;
        Ok(self.body_table.w1[idx as usize] + self.body_table.w_constraint[idx as usize])
    }
}

/// Runs `config.n_iterations` sweeps of Projected Gauss-Seidel over every
/// manifold's rows, in fixed penetration / friction-1 / friction-2 order.
/// Friction bounds are refreshed from the penetration row's impulse
/// immediately after that row is solved, within the same row visit, so
/// friction at this point never lags more than one row behind the normal
/// impulse it depends on.
///
/// Returns the number of row impulses clamped by
/// [`SolverConfig::max_impulse_magnitude`] across the whole run.
fn run_iterations<H: Copy + Eq + Hash + Debug>(
    manifold_constraints: &mut [ManifoldConstraint],
    table: &mut BodyTable<H>,
    config: &SolverConfig,
    dt: fph,
) -> usize {
    let mut n_saturated = 0usize;

    // Fold each body's external force/torque directly into its accumulated
    // constraint velocity before any row is solved. The rows themselves only
    // ever read the pre-step V1/W1 for their bias (`constraint::build_manifold_constraint`),
    // so without this the upcoming integration step's contribution would
    // never be resisted by the contacts resolved this step.
    for idx in 0..table.len() {
        let idx = idx as u32;
        let inverse_mass = table.inverse_mass(idx);
        let inverse_inertia = table.inverse_inertia(idx);
        table.v_constraint[idx as usize] += inverse_mass * table.external_force(idx) * dt;
        table.w_constraint[idx as usize] += inverse_inertia * table.external_torque(idx) * dt;
    }

    // Seed the accumulated constraint velocities with each row's warm-start
    // impulse before the first iteration, so the very first row visit below
    // already sees the velocity a fully-converged previous step left behind,
    // rather than ramping back up to it from zero.
    for manifold in manifold_constraints.iter() {
        let i1 = manifold.index_body1 as usize;
        let i2 = manifold.index_body2 as usize;
        for point in manifold.points.iter() {
            for row in &point.rows {
                let lambda = row.lambda;
                table.v_constraint[i1] += row.b_v1 * lambda;
                table.w_constraint[i1] += row.b_w1 * lambda;
                table.v_constraint[i2] += row.b_v2 * lambda;
                table.w_constraint[i2] += row.b_w2 * lambda;
            }
        }
    }

    for _ in 0..config.n_iterations {
        for manifold in manifold_constraints.iter_mut() {
            let i1 = manifold.index_body1 as usize;
            let i2 = manifold.index_body2 as usize;

            for point in manifold.points.iter_mut() {
                for row_idx in 0..3 {
                    let (v1, w1, v2, w2) = (
                        table.v_constraint[i1],
                        table.w_constraint[i1],
                        table.v_constraint[i2],
                        table.w_constraint[i2],
                    );

                    let row = &mut point.rows[row_idx];
                    let Some(inverse_effective_mass) = row.inverse_effective_mass else {
                        continue;
                    };

                    let jv = row.dot(v1, w1, v2, w2);
                    let mut new_lambda = row.lambda - (jv + row.bias) * inverse_effective_mass;
                    new_lambda = new_lambda.clamp(row.lower_bound, row.upper_bound);

                    if new_lambda.abs() > config.max_impulse_magnitude {
                        new_lambda = new_lambda.clamp(
                            -config.max_impulse_magnitude,
                            config.max_impulse_magnitude,
                        );
                        n_saturated += 1;
                    }

                    let delta_lambda = new_lambda - row.lambda;
                    row.lambda = new_lambda;

                    table.v_constraint[i1] += row.b_v1 * delta_lambda;
                    table.w_constraint[i1] += row.b_w1 * delta_lambda;
                    table.v_constraint[i2] += row.b_v2 * delta_lambda;
                    table.w_constraint[i2] += row.b_w2 * delta_lambda;

                    if row_idx == ContactRow::Penetration.index() {
                        let normal_lambda = row.lambda.max(0.0);
                        let bound = point.friction_coefficient * normal_lambda;
                        point.rows[ContactRow::Friction1.index()].upper_bound = bound;
                        point.rows[ContactRow::Friction1.index()].lower_bound = -bound;
                        point.rows[ContactRow::Friction2.index()].upper_bound = bound;
                        point.rows[ContactRow::Friction2.index()].lower_bound = -bound;
                    }
                }
            }
        }
    }

    n_saturated
}

/// Copies the final per-row impulses back onto each manifold's contact
/// points, for use as next step's warm start.
fn write_back_impulses<M: ContactManifold>(
    manifold_constraints: &[ManifoldConstraint],
    manifolds: &mut [M],
) {
    for manifold_constraint in manifold_constraints {
        let manifold = &mut manifolds[manifold_constraint.manifold_idx as usize];
        let points = manifold.points_mut();
        for point_constraint in &manifold_constraint.points {
            let point = &mut points[point_constraint.point_idx as usize];
            for row in ContactRow::ALL {
                point.set_cached_lambda(row, point_constraint.rows[row.index()].lambda);
            }
        }
    }
}
