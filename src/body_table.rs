//! The dense body index mapping and per-body velocity arrays the solver
//! builds once at the start of each `solve` call (component A).

use nalgebra::{Matrix3, Point3, Vector3};
use rustc_hash::FxHashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::body::{BodySet, RigidBody};
use crate::error::PreconditionViolation;
use crate::fph;

/// Maps body handles to dense indices in `[0, len())`, in first-appearance
/// order, and holds the read-only and accumulated velocity state the PGS
/// iterator operates on.
///
/// Rebuilt from scratch every `solve` call; membership changes freely as
/// contacts come and go between steps, so indices are never reused across
/// calls.
pub(crate) struct BodyTable<H> {
    index_of: FxHashMap<H, u32>,
    handle_at: Vec<H>,
    center_of_mass: Vec<Point3<fph>>,
    inverse_mass: Vec<fph>,
    inverse_inertia: Vec<Matrix3<fph>>,
    is_moving: Vec<bool>,
    /// Pre-step linear velocity, `V1`.
    pub(crate) v1: Vec<Vector3<fph>>,
    /// Pre-step angular velocity, `W1`.
    pub(crate) w1: Vec<Vector3<fph>>,
    external_force: Vec<Vector3<fph>>,
    external_torque: Vec<Vector3<fph>>,
    /// Accumulated constraint-corrective linear velocity, mutated by PGS.
    pub(crate) v_constraint: Vec<Vector3<fph>>,
    /// Accumulated constraint-corrective angular velocity, mutated by PGS.
    pub(crate) w_constraint: Vec<Vector3<fph>>,
}

impl<H: Copy + Eq + Hash + Debug> BodyTable<H> {
    pub(crate) fn new() -> Self {
        Self {
            index_of: FxHashMap::default(),
            handle_at: Vec::new(),
            center_of_mass: Vec::new(),
            inverse_mass: Vec::new(),
            inverse_inertia: Vec::new(),
            is_moving: Vec::new(),
            v1: Vec::new(),
            w1: Vec::new(),
            external_force: Vec::new(),
            external_torque: Vec::new(),
            v_constraint: Vec::new(),
            w_constraint: Vec::new(),
        }
    }

    /// Drops all entries while retaining the backing allocations, so a reused
    /// solver performs no heap allocation once capacity has stabilized.
    pub(crate) fn clear(&mut self) {
        self.index_of.clear();
        self.handle_at.clear();
        self.center_of_mass.clear();
        self.inverse_mass.clear();
        self.inverse_inertia.clear();
        self.is_moving.clear();
        self.v1.clear();
        self.w1.clear();
        self.external_force.clear();
        self.external_torque.clear();
        self.v_constraint.clear();
        self.w_constraint.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.handle_at.len()
    }

    pub(crate) fn index_of(&self, handle: H) -> Option<u32> {
        self.index_of.get(&handle).copied()
    }

    pub(crate) fn handle_at(&self, idx: u32) -> H {
        self.handle_at[idx as usize]
    }

    pub(crate) fn is_moving(&self, idx: u32) -> bool {
        self.is_moving[idx as usize]
    }

    pub(crate) fn center_of_mass(&self, idx: u32) -> Point3<fph> {
        self.center_of_mass[idx as usize]
    }

    pub(crate) fn inverse_mass(&self, idx: u32) -> fph {
        self.inverse_mass[idx as usize]
    }

    pub(crate) fn inverse_inertia(&self, idx: u32) -> Matrix3<fph> {
        self.inverse_inertia[idx as usize]
    }

    pub(crate) fn external_force(&self, idx: u32) -> Vector3<fph> {
        self.external_force[idx as usize]
    }

    pub(crate) fn external_torque(&self, idx: u32) -> Vector3<fph> {
        self.external_torque[idx as usize]
    }

    /// Inserts `handle` if not already present, reading its state from
    /// `bodies`. Returns the handle's dense index.
    ///
    /// Idempotent: inserting a handle already present is a no-op that simply
    /// returns its existing index.
    pub(crate) fn insert<B>(
        &mut self,
        handle: H,
        bodies: &B,
    ) -> Result<u32, PreconditionViolation>
    where
        B: BodySet<Handle = H>,
    {
        if let Some(idx) = self.index_of(handle) {
            return Ok(idx);
        }

        let body = bodies
            .get(handle)
            .ok_or(PreconditionViolation::UnresolvedBody)?;

        let center_of_mass = body.center_of_mass();
        let linear_velocity = body.linear_velocity();
        let angular_velocity = body.angular_velocity();
        let external_force = body.external_force();
        let external_torque = body.external_torque();

        if !center_of_mass.coords.iter().all(|c| c.is_finite())
            || !linear_velocity.iter().all(|c| c.is_finite())
            || !angular_velocity.iter().all(|c| c.is_finite())
            || !external_force.iter().all(|c| c.is_finite())
            || !external_torque.iter().all(|c| c.is_finite())
        {
            return Err(PreconditionViolation::NonFiniteInput);
        }

        let is_moving = body.is_motion_enabled();
        let (inverse_mass, inverse_inertia) = if is_moving {
            (body.inverse_mass(), body.inverse_inertia_tensor())
        } else {
            // A body with motion disabled is treated as having infinite
            // mass and inertia regardless of what it reports.
            (0.0, Matrix3::zeros())
        };

        let idx = self.handle_at.len() as u32;
        self.index_of.insert(handle, idx);
        self.handle_at.push(handle);
        self.center_of_mass.push(center_of_mass);
        self.inverse_mass.push(inverse_mass);
        self.inverse_inertia.push(inverse_inertia);
        self.is_moving.push(is_moving);
        self.v1.push(linear_velocity);
        self.w1.push(angular_velocity);
        self.external_force.push(external_force);
        self.external_torque.push(external_torque);
        self.v_constraint.push(Vector3::zeros());
        self.w_constraint.push(Vector3::zeros());

        Ok(idx)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_support::{BodyHandle, TestBody, TestBodySet};

    #[test]
    fn should_assign_sequential_indices_in_first_appearance_order() {
        let mut bodies = TestBodySet::default();
        bodies.insert(BodyHandle(1), TestBody::dynamic(Point3::origin(), 1.0));
        bodies.insert(BodyHandle(2), TestBody::dynamic(Point3::origin(), 1.0));

        let mut table = BodyTable::new();
        let idx2 = table.insert(BodyHandle(2), &bodies).unwrap();
        let idx1 = table.insert(BodyHandle(1), &bodies).unwrap();

        assert_eq!(idx2, 0);
        assert_eq!(idx1, 1);
        assert_eq!(table.len(), 2);
        assert_eq!(table.handle_at(0), BodyHandle(2));
        assert_eq!(table.handle_at(1), BodyHandle(1));
    }

    #[test]
    fn should_return_existing_index_on_duplicate_insert() {
        let mut bodies = TestBodySet::default();
        bodies.insert(BodyHandle(1), TestBody::dynamic(Point3::origin(), 1.0));

        let mut table = BodyTable::new();
        let first = table.insert(BodyHandle(1), &bodies).unwrap();
        let second = table.insert(BodyHandle(1), &bodies).unwrap();

        assert_eq!(first, second);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn should_zero_inverse_mass_and_inertia_for_non_moving_body() {
        let mut bodies = TestBodySet::default();
        let mut body = TestBody::dynamic(Point3::origin(), 2.0);
        body.is_moving = false;
        bodies.insert(BodyHandle(1), body);

        let mut table = BodyTable::new();
        let idx = table.insert(BodyHandle(1), &bodies).unwrap();

        assert_eq!(table.inverse_mass(idx), 0.0);
        assert_eq!(table.inverse_inertia(idx), Matrix3::zeros());
        assert!(!table.is_moving(idx));
    }

    #[test]
    fn should_reject_non_finite_velocity() {
        let mut bodies = TestBodySet::default();
        let body = TestBody::dynamic(Point3::origin(), 1.0)
            .with_linear_velocity(Vector3::new(fph::NAN, 0.0, 0.0));
        bodies.insert(BodyHandle(1), body);

        let mut table = BodyTable::new();
        let result = table.insert(BodyHandle(1), &bodies);

        assert_eq!(result, Err(PreconditionViolation::NonFiniteInput));
    }

    #[test]
    fn should_reject_unresolved_handle() {
        let bodies = TestBodySet::default();
        let mut table = BodyTable::new();

        let result = table.insert(BodyHandle(1), &bodies);

        assert_eq!(result, Err(PreconditionViolation::UnresolvedBody));
    }

    #[test]
    fn should_clear_all_state() {
        let mut bodies = TestBodySet::default();
        bodies.insert(BodyHandle(1), TestBody::dynamic(Point3::origin(), 1.0));

        let mut table = BodyTable::new();
        table.insert(BodyHandle(1), &bodies).unwrap();
        table.clear();

        assert_eq!(table.len(), 0);
        assert_eq!(table.index_of(BodyHandle(1)), None);
    }
}
