//! Boundary traits describing the contact geometry the solver consumes from
//! the upstream collision module, and the warm-start cache it writes back to.

use nalgebra::{Point3, UnitVector3};

use crate::fph;

/// Index of one of the three constraint rows solved per contact point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContactRow {
    /// The non-penetration row along the contact normal.
    Penetration = 0,
    /// The friction row along the first tangent direction.
    Friction1 = 1,
    /// The friction row along the second tangent direction.
    Friction2 = 2,
}

impl ContactRow {
    /// All three rows, in the fixed solving order (penetration first, so
    /// friction bounds reflect the freshly updated normal impulse).
    pub const ALL: [Self; 3] = [Self::Penetration, Self::Friction1, Self::Friction2];

    /// The row's index into the `0|1|2` convention used by
    /// [`ContactPoint::cached_lambda`] and [`ContactPoint::set_cached_lambda`].
    pub const fn index(self) -> usize {
        self as u8 as usize
    }
}

/// A single point of contact between two bodies, as reported by the upstream
/// collision module.
///
/// `normal` points from `body1` toward `body2`; `tangent1` and `tangent2`
/// must form a right-handed orthonormal basis together with `normal`. The
/// solver treats the basis as given and does not re-orthonormalize it.
pub trait ContactPoint {
    /// The handle type used to identify the two bodies in contact. Must match
    /// the [`BodySet::Handle`](crate::body::BodySet::Handle) of whatever body
    /// set is passed to [`solve`](crate::solver::ConstraintSolver::solve).
    type Body: Copy + Eq + std::hash::Hash + std::fmt::Debug;

    /// The first body in the contact pair.
    fn body1(&self) -> Self::Body;
    /// The second body in the contact pair.
    fn body2(&self) -> Self::Body;

    /// The world-space contact normal, pointing from `body1` toward `body2`.
    fn normal(&self) -> UnitVector3<fph>;
    /// The first tangent direction spanning the friction plane.
    fn tangent1(&self) -> UnitVector3<fph>;
    /// The second tangent direction spanning the friction plane.
    fn tangent2(&self) -> UnitVector3<fph>;

    /// The world-space contact position on `body1`.
    fn point_on_body1(&self) -> Point3<fph>;
    /// The world-space contact position on `body2`.
    fn point_on_body2(&self) -> Point3<fph>;

    /// The penetration depth along `normal`. Non-negative when the bodies are
    /// in contact.
    fn penetration_depth(&self) -> fph;

    /// The combined Coulomb friction coefficient for this contact.
    fn friction_coefficient(&self) -> fph;
    /// The combined restitution coefficient for this contact.
    fn restitution(&self) -> fph;

    /// The impulse cached for `row` from the previous time this contact point
    /// was solved, or `0.0` if it was not previously seen.
    fn cached_lambda(&self, row: ContactRow) -> fph;

    /// Stores the impulse solved for `row` this step, to be read back via
    /// [`Self::cached_lambda`] next step.
    fn set_cached_lambda(&mut self, row: ContactRow, lambda: fph);
}

/// An ordered group of 1..4 contact points sharing the same pair of bodies.
pub trait ContactManifold {
    /// The concrete contact point type.
    type Point: ContactPoint;

    /// The contact points in this manifold, in collision-module-reported
    /// order. Must contain at least one point and at most four.
    fn points(&self) -> &[Self::Point];

    /// Mutable access to the same points, used at the end of a solve to write
    /// the new cached impulses back.
    fn points_mut(&mut self) -> &mut [Self::Point];
}
