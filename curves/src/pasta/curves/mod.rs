pub mod pallas;

pub use pallas::{Pallas, PallasParameters, ProjectivePallas};
