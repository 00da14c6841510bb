//! Boundary traits describing the rigid bodies the solver reads from and
//! reports constrained velocities for.
//!
//! The solver never owns a body: it borrows whatever the caller's world
//! representation is through these two traits for the duration of a single
//! [`solve`](crate::solver::ConstraintSolver::solve) call.

use nalgebra::{Matrix3, Point3, Vector3};
use std::fmt::Debug;
use std::hash::Hash;

use crate::fph;

/// The capability set the solver needs from a rigid body.
///
/// All quantities are read once per `solve` call, before any constraint is
/// applied; the solver never mutates a body through this trait.
pub trait RigidBody {
    /// The world-space position of the body's center of mass, used to derive
    /// each contact point's lever arm (`r1`/`r2` in the design) from the
    /// world-space contact positions reported by [`ContactPoint`](crate::contact::ContactPoint).
    fn center_of_mass(&self) -> Point3<fph>;

    /// The inverse of the body's mass. Use `0.0` for a body with effectively
    /// infinite mass (e.g. static or kinematic geometry).
    fn inverse_mass(&self) -> fph;

    /// The inverse of the body's world-space inertia tensor. Use the zero
    /// matrix for a body with effectively infinite mass.
    fn inverse_inertia_tensor(&self) -> Matrix3<fph>;

    /// The linear velocity of the body's center of mass, in world space.
    fn linear_velocity(&self) -> Vector3<fph>;

    /// The angular velocity of the body about its center of mass, in world
    /// space.
    fn angular_velocity(&self) -> Vector3<fph>;

    /// The net external force acting on the body's center of mass this step,
    /// not yet integrated into its velocity.
    fn external_force(&self) -> Vector3<fph>;

    /// The net external torque acting on the body this step, not yet
    /// integrated into its angular velocity.
    fn external_torque(&self) -> Vector3<fph>;

    /// Whether the body participates in velocity updates. A body with motion
    /// disabled (static geometry, sleeping bodies) contributes to constraint
    /// rows with zero inverse mass and inertia and never receives a
    /// corrective velocity, even if its rows compute a non-zero impulse.
    fn is_motion_enabled(&self) -> bool;
}

/// A queryable collection of rigid bodies, addressed by an opaque, caller-
/// defined handle.
///
/// Implementations are typically a thin borrow over whatever body storage the
/// world already maintains (an ECS component store, a slotmap, a plain
/// `Vec`); the solver only ever reads through this trait.
pub trait BodySet {
    /// An opaque handle identifying a body. Two handles comparing equal must
    /// identify the same body for the duration of a `solve` call.
    type Handle: Copy + Eq + Hash + Debug;

    /// The concrete body type yielded for a handle.
    type Body: RigidBody;

    /// Looks up the body for `handle`, or `None` if the set has no body with
    /// that handle.
    fn get(&self, handle: Self::Handle) -> Option<&Self::Body>;
}
