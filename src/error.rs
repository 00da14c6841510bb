//! Errors produced by the constraint solver.

use std::fmt;

/// An error produced while preparing or solving contact constraints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SolverError {
    /// A manifold was presented with zero contact points, a Jacobian input
    /// contained a non-finite value, a contact row was degenerate (`d < ε`)
    /// between two moving bodies, or a manifold referenced a body handle the
    /// [`BodySet`](crate::body::BodySet) could not resolve.
    PreconditionViolation(PreconditionViolation),
}

/// The specific condition that made a `solve` call fail its preconditions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreconditionViolation {
    /// A contact manifold contained no contact points.
    EmptyManifold,
    /// A Jacobian input (normal, tangent, lever arm or velocity) contained a
    /// NaN or infinite component.
    NonFiniteInput,
    /// A contact row's effective mass was at or below the numerical floor
    /// while at least one of the two bodies involved has motion enabled.
    DegenerateJacobian,
    /// A manifold referenced a body handle that the supplied body set does
    /// not contain.
    UnresolvedBody,
}

/// An error produced by a post-solve velocity query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryOnUnconstrainedBody;

impl fmt::Display for SolverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreconditionViolation(violation) => {
                write!(f, "constraint solver precondition violated: {violation}")
            }
        }
    }
}

impl fmt::Display for PreconditionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyManifold => write!(f, "a contact manifold had zero contact points"),
            Self::NonFiniteInput => write!(f, "a Jacobian input contained a NaN or infinite value"),
            Self::DegenerateJacobian => write!(
                f,
                "a contact row had non-positive effective mass between two moving bodies"
            ),
            Self::UnresolvedBody => write!(
                f,
                "a manifold referenced a body handle absent from the body set"
            ),
        }
    }
}

impl fmt::Display for QueryOnUnconstrainedBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body is not part of any solved constraint this step")
    }
}

impl std::error::Error for SolverError {}
impl std::error::Error for QueryOnUnconstrainedBody {}

impl From<PreconditionViolation> for SolverError {
    fn from(violation: PreconditionViolation) -> Self {
        Self::PreconditionViolation(violation)
    }
}
