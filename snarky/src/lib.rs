//! Snarky gadgets for circuits over the Pasta fields.
//!
//! The front end lets a program describe a computation as a circuit, running the same
//! code twice: once to compile the constraints, once to compute a witness.
//! On top of it live the elliptic curve gadgets for Pallas: complete addition and
//! variable-base scalar multiplication by native or foreign-field scalars.
//!
//! See the `tests` module for examples of how to use snarky.

#![deny(unsafe_code)]
#![deny(clippy::all)]

pub mod api;
pub mod boolean;
pub mod comparison;
pub mod constraint_system;
pub mod cvar;
pub mod errors;
pub mod foreign_field;
pub mod group;
pub mod native_curve;
pub mod range_checks;
pub mod runner;
pub mod snarky_type;

#[cfg(test)]
mod tests;

/// A macro returning the current location in the code, used to annotate constraints.
#[macro_export]
macro_rules! loc {
    () => {{
        ::std::borrow::Cow::Owned(format!("{}:{}", file!(), line!()))
    }};
}

/// A handy module that you can import the content of to easily use snarky.
pub mod prelude {
    use super::*;
    pub use crate::loc;
    pub use api::{run_and_check, SnarkyCircuit};
    pub use boolean::Boolean;
    pub use cvar::FieldVar;
    pub use errors::{SnarkyError, SnarkyResult};
    pub use runner::RunState;
    pub use snarky_type::SnarkyType;
}
