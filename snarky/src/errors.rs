use std::borrow::Cow;

use thiserror::Error;

/// A result type for Snarky errors.
pub type SnarkyResult<T> = std::result::Result<T, SnarkyError>;

/// A result type for Snarky runtime errors.
pub type SnarkyRuntimeResult<T> = std::result::Result<T, SnarkyRuntimeError>;

/// Snarky errors can come from either a compilation or runtime error.
#[derive(Debug, Clone, Error)]
pub enum SnarkyError {
    #[error("a compilation error occurred: {0}")]
    CompilationError(SnarkyCompilationError),

    #[error("a runtime error occurred: {0}")]
    RuntimeError(SnarkyRuntimeError),
}

impl SnarkyError {
    /// Returns true if the error is a constraint violation found while generating a witness.
    pub fn is_runtime(&self) -> bool {
        matches!(self, SnarkyError::RuntimeError(_))
    }
}

impl From<SnarkyCompilationError> for SnarkyError {
    fn from(err: SnarkyCompilationError) -> Self {
        SnarkyError::CompilationError(err)
    }
}

impl From<SnarkyRuntimeError> for SnarkyError {
    fn from(err: SnarkyRuntimeError) -> Self {
        SnarkyError::RuntimeError(err)
    }
}

/// Errors that can occur during compilation of a circuit.
/// None of these depend on the values a prover supplies.
#[derive(Debug, Clone, Error)]
pub enum SnarkyCompilationError {
    #[error("the two values were not equal: {0} != {1}")]
    ConstantAssertEquals(String, String),

    #[error("the constant {0} is not a boolean")]
    ConstantAssertBoolean(String),

    #[error("gadget invariant does not hold for the configured curves: {0}")]
    InvariantViolation(Cow<'static, str>),

    #[error("invalid bit length {0} (expected at most {1})")]
    InvalidBitLength(usize, usize),

    #[error("expected {1} elements, got {0}")]
    LengthMismatch(usize, usize),
}

/// Errors that can occur during runtime (proving).
#[derive(Debug, Clone, Error)]
pub enum SnarkyRuntimeError {
    #[error("unsatisfied constraint: {0} is not a boolean (0 or 1)")]
    UnsatisfiedBooleanConstraint(String),

    #[error("unsatisfied constraint: {0} is not equal to {1}")]
    UnsatisfiedEqualConstraint(String, String),

    #[error("unsatisfied constraint: {0}^2 is not equal to {1}")]
    UnsatisfiedSquareConstraint(String, String),

    #[error("unsatisfied constraint: {0} * {1} is not equal to {2}")]
    UnsatisfiedR1CSConstraint(String, String, String),

    #[error("unsatisfied elliptic curve addition: {0}")]
    UnsatisfiedEcAdd(&'static str),

    #[error("unsatisfied variable-base scalar multiplication: {0}")]
    UnsatisfiedScaleFastUnpack(&'static str),

    #[error("unsatisfied range check: {0} does not fit in {1} bits")]
    UnsatisfiedRangeCheck(String, u32),

    #[error("the number of public inputs passed ({0}) does not match the number of public inputs expected ({1})")]
    PubInputMismatch(usize, usize),

    #[error("the witness callback returned {0} field elements, but {1} were declared")]
    ExistsSizeMismatch(usize, usize),

    #[error("witness generation produced a different constraint system than compilation (first difference at constraint {0})")]
    CircuitShapeMismatch(usize),
}
