use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::UniformRand;
use mina_curves::pasta::{Fq, Pallas};
use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

use crate::errors::SnarkyResult;

mod comparison;
mod native_curve;
mod witness;

prop_compose! {
    /// A deterministic rng, so failures can be reproduced from the seed alone.
    fn rng()(seed in any::<u64>()) -> StdRng {
        StdRng::seed_from_u64(seed)
    }
}

fn random_point(rng: &mut StdRng) -> Pallas {
    (Pallas::generator() * Fq::rand(rng)).into_affine()
}

fn assert_runtime_error<T: std::fmt::Debug>(res: SnarkyResult<T>) {
    match res {
        Err(err) if err.is_runtime() => (),
        res => panic!("expected an unsatisfied constraint, got {res:?}"),
    }
}
