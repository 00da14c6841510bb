//! Per-contact constraint records: the builder that turns a contact manifold
//! into solver-internal rows (component B) and the Jacobian/bias/effective-
//! mass precomputation that fills them in (component C).

use nalgebra::Vector3;
use tinyvec::TinyVec;

use crate::body::BodySet;
use crate::body_table::BodyTable;
use crate::config::SolverConfig;
use crate::contact::{ContactManifold, ContactPoint, ContactRow};
use crate::error::PreconditionViolation;
use crate::fph;

/// Numerical floor below which a row's effective mass denominator `d` is
/// treated as zero (both bodies static, or a degenerate lever arm).
const MIN_EFFECTIVE_MASS_DENOMINATOR: fph = 1e-10;

/// One row (penetration or one friction axis) of a [`PointConstraint`].
///
/// The Jacobian is stored pre-split into the `B = M⁻¹Jᵀ` form so the hot PGS
/// loop never revisits the mass matrices (§9: precomputing `B` costs 12
/// multiplies and pays for itself across two or more iterations).
pub(crate) struct Row {
    pub(crate) j_v1: Vector3<fph>,
    pub(crate) j_w1: Vector3<fph>,
    pub(crate) j_v2: Vector3<fph>,
    pub(crate) j_w2: Vector3<fph>,
    pub(crate) b_v1: Vector3<fph>,
    pub(crate) b_w1: Vector3<fph>,
    pub(crate) b_v2: Vector3<fph>,
    pub(crate) b_w2: Vector3<fph>,
    /// `1 / d` where `d = J · B`. `None` if the row is dead (`d` at or below
    /// the numerical floor, which only happens when both bodies are
    /// non-moving).
    pub(crate) inverse_effective_mass: Option<fph>,
    pub(crate) bias: fph,
    pub(crate) lambda: fph,
    pub(crate) lower_bound: fph,
    pub(crate) upper_bound: fph,
}

impl Row {
    /// The joined four-part dot product `J · (v1, w1, v2, w2)` used both for
    /// the PGS update against the accumulated constraint velocity and for the
    /// pre-step closing-speed check that gates restitution.
    pub(crate) fn dot(&self, v1: Vector3<fph>, w1: Vector3<fph>, v2: Vector3<fph>, w2: Vector3<fph>) -> fph {
        self.j_v1.dot(&v1) + self.j_w1.dot(&w1) + self.j_v2.dot(&v2) + self.j_w2.dot(&w2)
    }
}

/// The three rows (penetration, friction-1, friction-2) derived from one
/// contact point, plus the index used to write the solved impulses back into
/// the originating [`ContactPoint`] at the end of the solve.
pub(crate) struct PointConstraint {
    pub(crate) rows: [Row; 3],
    pub(crate) friction_coefficient: fph,
    /// Index of the point within its manifold's `points()` slice. A plain
    /// index rather than a raw back-pointer: the manifold slice itself is
    /// borrowed again at write-back time, so there is nothing to dangle.
    pub(crate) point_idx: u32,
}

/// The derived per-manifold record: hoisted body metadata plus one
/// [`PointConstraint`] per contact point (1..4).
pub(crate) struct ManifoldConstraint {
    pub(crate) index_body1: u32,
    pub(crate) index_body2: u32,
    pub(crate) points: TinyVec<[PointConstraint; 4]>,
    /// Index of the manifold within the `manifolds` slice passed to `solve`.
    pub(crate) manifold_idx: u32,
}

/// Builds and precomputes the constraint record for one manifold.
///
/// Reads (and, if new, inserts) the two participating bodies into
/// `body_table`, then for each contact point computes the three Jacobian
/// rows, their `B = M⁻¹Jᵀ` vectors, effective masses, and bias terms.
pub(crate) fn build_manifold_constraint<M, Bs>(
    manifold_idx: u32,
    manifold: &M,
    bodies: &Bs,
    body_table: &mut BodyTable<Bs::Handle>,
    config: &SolverConfig,
    dt: fph,
) -> Result<ManifoldConstraint, PreconditionViolation>
where
    M: ContactManifold,
    M::Point: ContactPoint<Body = Bs::Handle>,
    Bs: BodySet,
{
    let contact_points = manifold.points();
    if contact_points.is_empty() {
        return Err(PreconditionViolation::EmptyManifold);
    }

    let handle1 = contact_points[0].body1();
    let handle2 = contact_points[0].body2();
    let index_body1 = body_table.insert(handle1, bodies)?;
    let index_body2 = body_table.insert(handle2, bodies)?;

    let inv_mass1 = body_table.inverse_mass(index_body1);
    let inv_mass2 = body_table.inverse_mass(index_body2);
    let inv_inertia1 = body_table.inverse_inertia(index_body1);
    let inv_inertia2 = body_table.inverse_inertia(index_body2);
    let is_moving1 = body_table.is_moving(index_body1);
    let is_moving2 = body_table.is_moving(index_body2);

    let com1 = body_table.center_of_mass(index_body1);
    let com2 = body_table.center_of_mass(index_body2);

    let v1 = body_table.v1[index_body1 as usize];
    let w1 = body_table.w1[index_body1 as usize];
    let v2 = body_table.v1[index_body2 as usize];
    let w2 = body_table.w1[index_body2 as usize];

    let mut points = TinyVec::with_capacity(contact_points.len());

    for (point_idx, point) in contact_points.iter().enumerate() {
        let normal = point.normal().into_inner();
        let tangent1 = point.tangent1().into_inner();
        let tangent2 = point.tangent2().into_inner();

        let point_on_1 = point.point_on_body1();
        let point_on_2 = point.point_on_body2();
        let depth = point.penetration_depth();

        if !point_on_1.coords.iter().all(|c| c.is_finite())
            || !point_on_2.coords.iter().all(|c| c.is_finite())
            || !depth.is_finite()
        {
            return Err(PreconditionViolation::NonFiniteInput);
        }

        // Lever arms: r1 = contact point on body1 - center(body1), and
        // analogously for body2 (§4.B).
        let r1 = point_on_1 - com1;
        let r2 = point_on_2 - com2;

        let directions = [normal, tangent1, tangent2];
        let mut rows: [Option<Row>; 3] = [None, None, None];

        for (row_idx, direction) in directions.into_iter().enumerate() {
            let is_penetration = row_idx == 0;

            let j_v1 = -direction;
            let j_w1 = -r1.cross(&direction);
            let j_v2 = direction;
            let j_w2 = r2.cross(&direction);

            let b_v1 = inv_mass1 * j_v1;
            let b_w1 = inv_inertia1 * j_w1;
            let b_v2 = inv_mass2 * j_v2;
            let b_w2 = inv_inertia2 * j_w2;

            let d = j_v1.dot(&b_v1) + j_w1.dot(&b_w1) + j_v2.dot(&b_v2) + j_w2.dot(&b_w2);

            let inverse_effective_mass = if d > MIN_EFFECTIVE_MASS_DENOMINATOR {
                Some(1.0 / d)
            } else {
                if is_moving1 || is_moving2 {
                    return Err(PreconditionViolation::DegenerateJacobian);
                }
                log::debug!(
                    "skipping dead row {row_idx} in manifold {manifold_idx} (both bodies static)"
                );
                None
            };

            // The bias this row carries into the PGS update (see
            // `run_iterations`, which computes
            // `delta_lambda = -(J·v_constraint + bias) * inverseEffectiveMass`):
            // the pre-step relative velocity along this row (`bias_v`), minus
            // the positional (Baumgarte) correction that only the
            // penetration row carries. External force/torque is folded into
            // `v_constraint` directly before the PGS loop runs (see
            // `run_iterations`), not anticipated here.
            let bias_v = j_v1.dot(&v1) + j_w1.dot(&w1) + j_v2.dot(&v2) + j_w2.dot(&w2);

            let bias_pos = if is_penetration {
                config.baumgarte_factor / dt * (depth - config.slop).max(0.0)
            } else {
                0.0
            };

            let bias = bias_v - bias_pos;

            // Penetration impulses only push bodies apart; friction bounds
            // are refreshed every PGS iteration from the current penetration
            // impulse, so the bounds set here are just the pre-first-refresh
            // placeholder (both zero, matching a freshly-seeded impulse of
            // the warm-started or zero lambda below).
            let (lower_bound, upper_bound) = if is_penetration {
                (0.0, fph::INFINITY)
            } else {
                (0.0, 0.0)
            };

            let lambda = point.cached_lambda(ContactRow::ALL[row_idx]);

            rows[row_idx] = Some(Row {
                j_v1,
                j_w1,
                j_v2,
                j_w2,
                b_v1,
                b_w1,
                b_v2,
                b_w2,
                inverse_effective_mass,
                bias,
                lambda,
                lower_bound,
                upper_bound,
            });
        }

        let [row0, row1, row2] = rows;
        let mut rows = [row0.unwrap(), row1.unwrap(), row2.unwrap()];

        // Restitution (§4.D): mixed into the penetration row's bias once,
        // using the pre-step (not yet constraint-corrected) closing speed.
        // Since nothing else touches this row's bias across iterations, this
        // is equivalent to applying it "on the first iteration only".
        let closing_speed = rows[0].dot(v1, w1, v2, w2);
        if closing_speed < -config.restitution_threshold {
            rows[0].bias += point.restitution() * closing_speed;
        }

        // Seed the friction bounds from the warm-started normal impulse so
        // the very first PGS row visit already sees a sensible cone, rather
        // than the zero/zero placeholder above.
        let warm_normal_lambda = rows[0].lambda.max(0.0);
        let friction_coefficient = point.friction_coefficient();
        rows[1].upper_bound = friction_coefficient * warm_normal_lambda;
        rows[1].lower_bound = -rows[1].upper_bound;
        rows[2].upper_bound = friction_coefficient * warm_normal_lambda;
        rows[2].lower_bound = -rows[2].upper_bound;

        points.push(PointConstraint {
            rows,
            friction_coefficient,
            point_idx: point_idx as u32,
        });
    }

    Ok(ManifoldConstraint {
        index_body1,
        index_body2,
        points,
        manifold_idx,
    })
}
