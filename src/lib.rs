//! Iterative impulse-based contact constraint solver for rigid-body physics.
//!
//! This crate solves non-penetration and Coulomb friction constraints
//! between pairs of rigid bodies in contact, using a Projected Gauss-Seidel
//! (sequential impulse) iteration. It owns no body storage and no collision
//! detection: callers adapt their own world representation to the
//! [`RigidBody`](body::RigidBody)/[`BodySet`](body::BodySet) and
//! [`ContactPoint`](contact::ContactPoint)/[`ContactManifold`](contact::ContactManifold)
//! traits and drive the solver through [`ConstraintSolver::solve`](solver::ConstraintSolver::solve).

#[macro_use]
mod macros;

pub mod body;
pub mod config;
pub mod contact;
pub mod error;
pub mod solver;

mod body_table;
mod constraint;

#[cfg(test)]
mod test_support;

/// Floating point type used throughout the solver.
#[allow(non_camel_case_types)]
pub type fph = f64;
