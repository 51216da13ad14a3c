//! The two Pasta prime fields.
//!
//! `Fp` is the base field of Pallas (and the native field of circuits built over it),
//! `Fq` is the scalar field of Pallas. Both moduli are of the form `2^254 + δ` with a
//! small `δ`, and `p < q`.

pub mod fp;
pub use self::fp::*;

pub mod fq;
pub use self::fq::*;

#[cfg(test)]
mod tests;
