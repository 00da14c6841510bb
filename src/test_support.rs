//! Minimal in-memory implementations of the boundary traits, shared by unit
//! and property tests across this crate.

use std::collections::HashMap;

use nalgebra::{Matrix3, Point3, UnitVector3, Vector3};

use crate::body::{BodySet, RigidBody};
use crate::contact::{ContactManifold, ContactPoint, ContactRow};
use crate::fph;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct BodyHandle(pub u32);

#[derive(Clone, Debug)]
pub(crate) struct TestBody {
    pub center_of_mass: Point3<fph>,
    pub inverse_mass: fph,
    pub inverse_inertia: Matrix3<fph>,
    pub linear_velocity: Vector3<fph>,
    pub angular_velocity: Vector3<fph>,
    pub external_force: Vector3<fph>,
    pub external_torque: Vector3<fph>,
    pub is_moving: bool,
}

impl TestBody {
    pub fn dynamic(center_of_mass: Point3<fph>, mass: fph) -> Self {
        // A unit cube's inertia about its centroid, scaled by mass, so tests
        // exercise a non-trivial inertia tensor rather than a bare scalar.
        let inertia_scalar = mass / 6.0;
        Self {
            center_of_mass,
            inverse_mass: 1.0 / mass,
            inverse_inertia: Matrix3::from_diagonal_element(1.0 / inertia_scalar),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            external_force: Vector3::zeros(),
            external_torque: Vector3::zeros(),
            is_moving: true,
        }
    }

    pub fn static_at(center_of_mass: Point3<fph>) -> Self {
        Self {
            center_of_mass,
            inverse_mass: 0.0,
            inverse_inertia: Matrix3::zeros(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
            external_force: Vector3::zeros(),
            external_torque: Vector3::zeros(),
            is_moving: false,
        }
    }

    pub fn with_linear_velocity(mut self, v: Vector3<fph>) -> Self {
        self.linear_velocity = v;
        self
    }

    pub fn with_external_force(mut self, f: Vector3<fph>) -> Self {
        self.external_force = f;
        self
    }
}

impl RigidBody for TestBody {
    fn center_of_mass(&self) -> Point3<fph> {
        self.center_of_mass
    }

    fn inverse_mass(&self) -> fph {
        self.inverse_mass
    }

    fn inverse_inertia_tensor(&self) -> Matrix3<fph> {
        self.inverse_inertia
    }

    fn linear_velocity(&self) -> Vector3<fph> {
        self.linear_velocity
    }

    fn angular_velocity(&self) -> Vector3<fph> {
        self.angular_velocity
    }

    fn external_force(&self) -> Vector3<fph> {
        self.external_force
    }

    fn external_torque(&self) -> Vector3<fph> {
        self.external_torque
    }

    fn is_motion_enabled(&self) -> bool {
        self.is_moving
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct TestBodySet(pub HashMap<BodyHandle, TestBody>);

impl TestBodySet {
    pub fn insert(&mut self, handle: BodyHandle, body: TestBody) {
        self.0.insert(handle, body);
    }
}

impl BodySet for TestBodySet {
    type Handle = BodyHandle;
    type Body = TestBody;

    fn get(&self, handle: Self::Handle) -> Option<&Self::Body> {
        self.0.get(&handle)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct TestContactPoint {
    pub body1: BodyHandle,
    pub body2: BodyHandle,
    pub normal: UnitVector3<fph>,
    pub tangent1: UnitVector3<fph>,
    pub tangent2: UnitVector3<fph>,
    pub point_on_body1: Point3<fph>,
    pub point_on_body2: Point3<fph>,
    pub penetration_depth: fph,
    pub friction_coefficient: fph,
    pub restitution: fph,
    pub cached_lambda: [fph; 3],
}

impl TestContactPoint {
    pub fn new(
        body1: BodyHandle,
        body2: BodyHandle,
        normal: Vector3<fph>,
        point_on_body1: Point3<fph>,
        point_on_body2: Point3<fph>,
        penetration_depth: fph,
    ) -> Self {
        let normal = UnitVector3::new_normalize(normal);
        let (tangent1, tangent2) = orthonormal_tangents(&normal);
        Self {
            body1,
            body2,
            normal,
            tangent1,
            tangent2,
            point_on_body1,
            point_on_body2,
            penetration_depth,
            friction_coefficient: 0.5,
            restitution: 0.0,
            cached_lambda: [0.0; 3],
        }
    }

    pub fn with_friction_coefficient(mut self, mu: fph) -> Self {
        self.friction_coefficient = mu;
        self
    }

    pub fn with_restitution(mut self, e: fph) -> Self {
        self.restitution = e;
        self
    }
}

fn orthonormal_tangents(normal: &UnitVector3<fph>) -> (UnitVector3<fph>, UnitVector3<fph>) {
    let helper = if normal.x.abs() < 0.9 {
        Vector3::x_axis()
    } else {
        Vector3::y_axis()
    };
    let tangent1 = UnitVector3::new_normalize(normal.cross(&helper));
    let tangent2 = UnitVector3::new_normalize(normal.cross(&tangent1));
    (tangent1, tangent2)
}

impl ContactPoint for TestContactPoint {
    type Body = BodyHandle;

    fn body1(&self) -> Self::Body {
        self.body1
    }

    fn body2(&self) -> Self::Body {
        self.body2
    }

    fn normal(&self) -> UnitVector3<fph> {
        self.normal
    }

    fn tangent1(&self) -> UnitVector3<fph> {
        self.tangent1
    }

    fn tangent2(&self) -> UnitVector3<fph> {
        self.tangent2
    }

    fn point_on_body1(&self) -> Point3<fph> {
        self.point_on_body1
    }

    fn point_on_body2(&self) -> Point3<fph> {
        self.point_on_body2
    }

    fn penetration_depth(&self) -> fph {
        self.penetration_depth
    }

    fn friction_coefficient(&self) -> fph {
        self.friction_coefficient
    }

    fn restitution(&self) -> fph {
        self.restitution
    }

    fn cached_lambda(&self, row: ContactRow) -> fph {
        self.cached_lambda[row.index()]
    }

    fn set_cached_lambda(&mut self, row: ContactRow, lambda: fph) {
        self.cached_lambda[row.index()] = lambda;
    }
}

#[derive(Clone, Debug)]
pub(crate) struct TestManifold {
    pub points: Vec<TestContactPoint>,
}

impl TestManifold {
    pub fn new(points: Vec<TestContactPoint>) -> Self {
        Self { points }
    }
}

impl ContactManifold for TestManifold {
    type Point = TestContactPoint;

    fn points(&self) -> &[Self::Point] {
        &self.points
    }

    fn points_mut(&mut self) -> &mut [Self::Point] {
        &mut self.points
    }
}
