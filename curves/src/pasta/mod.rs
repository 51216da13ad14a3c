pub mod curves;
pub mod fields;

pub use curves::pallas::{Pallas, PallasParameters, ProjectivePallas};
pub use fields::{Fp, Fq};
