use super::{Fp, Fq};
use ark_ff::{BigInteger, PrimeField};
use num_bigint::BigUint;

#[test]
fn test_moduli_are_just_above_two_to_254() {
    let p: BigUint = Fp::MODULUS.into();
    let q: BigUint = Fq::MODULUS.into();
    let two_to_254 = BigUint::from(1u8) << 254;

    assert!(p > two_to_254);
    assert!(q > p);
    assert!(&q - &two_to_254 < BigUint::from(1u8) << 126);
    assert_eq!(Fp::MODULUS.num_bits(), 255);
    assert_eq!(Fq::MODULUS.num_bits(), 255);
}

#[test]
fn test_biguint_round_trip_is_canonical() {
    let x = Fp::from(123456789u64);
    let big: BigUint = x.into();
    assert_eq!(big, BigUint::from(123456789u64));
    assert_eq!(Fp::from(big), x);
}

#[test]
fn test_multiplicative_generators() {
    use super::{FpParameters, FqParameters};
    use ark_ff::{FftField, Field, MontConfig};

    assert_eq!(Fp::GENERATOR, Fp::from(5u64));
    assert_eq!(Fq::GENERATOR, Fq::from(5u64));
    assert_eq!(FpParameters::MODULUS, Fp::MODULUS);
    assert_eq!(FqParameters::MODULUS, Fq::MODULUS);
    // a generator is not a square
    assert!(Fp::GENERATOR.legendre().is_qnr());
    assert!(Fq::GENERATOR.legendre().is_qnr());
}
