use ark_ff::{AdditiveGroup, One, PrimeField, UniformRand, Zero};
use mina_curves::pasta::Fp;
use num_bigint::BigUint;
use proptest::prelude::*;

use super::{assert_runtime_error, rng};
use crate::{
    comparison::{assert_less_than_or_equal_const, is_odd_and_high},
    errors::SnarkyCompilationError,
    prelude::*,
    range_checks::{range_check_bits, MAX_RANGE_CHECK_BITS},
};

fn odd_and_high_in_circuit(x: Fp) -> (bool, Fp) {
    run_and_check(|sys: &mut RunState<Fp>| {
        let x: FieldVar<Fp> = sys.compute(loc!(), |_| x)?;
        is_odd_and_high(sys, loc!(), &x)
    })
    .unwrap()
}

fn less_than_or_equal_in_circuit(x: Fp, bound: &BigUint) -> SnarkyResult<()> {
    run_and_check(|sys: &mut RunState<Fp>| {
        let x: FieldVar<Fp> = sys.compute(loc!(), |_| x)?;
        assert_less_than_or_equal_const(sys, loc!(), &x, bound)
    })
}

fn range_check_in_circuit(x: Fp, bits: usize) -> SnarkyResult<()> {
    run_and_check(|sys: &mut RunState<Fp>| {
        let x: FieldVar<Fp> = sys.compute(loc!(), |_| x)?;
        range_check_bits(sys, loc!(), &x, bits)
    })
}

#[test]
fn test_odd_and_high_extremes() {
    let modulus: BigUint = Fp::MODULUS.into();
    let half = Fp::from((modulus - 1u32) >> 1);

    assert_eq!(odd_and_high_in_circuit(Fp::zero()), (false, Fp::zero()));
    assert_eq!(odd_and_high_in_circuit(Fp::one()), (true, Fp::zero()));
    // p - 1 is even
    assert_eq!(odd_and_high_in_circuit(-Fp::one()), (false, half));
}

#[test]
fn test_less_than_or_equal_const() {
    let bound: BigUint = BigUint::from(1000u32) + (BigUint::one() << 200);
    let bound_fp = Fp::from(bound.clone());

    assert!(less_than_or_equal_in_circuit(bound_fp, &bound).is_ok());
    assert!(less_than_or_equal_in_circuit(Fp::from(1001u64), &bound).is_ok());
    // same high half, larger low half
    assert_runtime_error(less_than_or_equal_in_circuit(bound_fp + Fp::one(), &bound));
    // larger high half, smaller low half
    let larger = Fp::from(BigUint::one() << 201);
    assert_runtime_error(less_than_or_equal_in_circuit(larger, &bound));
    assert_runtime_error(less_than_or_equal_in_circuit(-Fp::one(), &bound));
}

#[test]
fn test_less_than_or_equal_bound_too_large() {
    let bound: BigUint = Fp::MODULUS.into();
    let res = less_than_or_equal_in_circuit(Fp::zero(), &bound);
    assert!(matches!(
        res,
        Err(SnarkyError::CompilationError(
            SnarkyCompilationError::InvalidBitLength(255, 254)
        ))
    ));
}

#[test]
fn test_range_check_bits() {
    for bits in [1, 10, 64, 70, 128] {
        let max = Fp::from((BigUint::one() << bits) - 1u32);
        assert!(range_check_in_circuit(max, bits).is_ok(), "{bits} bits");
        assert_runtime_error(range_check_in_circuit(max + Fp::one(), bits));
    }

    let res = range_check_in_circuit(Fp::zero(), MAX_RANGE_CHECK_BITS + 1);
    assert!(matches!(
        res,
        Err(SnarkyError::CompilationError(
            SnarkyCompilationError::InvalidBitLength(129, 128)
        ))
    ));
}

proptest! {
    #[test]
    fn test_odd_and_high_random(mut rng in rng()) {
        let x = Fp::rand(&mut rng);
        let (is_odd, high) = odd_and_high_in_circuit(x);
        prop_assert_eq!(Fp::from(is_odd) + high.double(), x);
    }
}
