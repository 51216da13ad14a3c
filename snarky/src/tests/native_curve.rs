use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{Field, One, PrimeField, UniformRand, Zero};
use mina_curves::pasta::{Fp, Fq, Pallas};
use num_bigint::{BigInt, BigUint};
use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};

use super::{assert_runtime_error, random_point, rng};
use crate::{
    constraint_system::{ConstraintKind, KimchiConstraint, VARBASEMUL_BITS_PER_ROW},
    errors::{SnarkyCompilationError, SnarkyRuntimeError},
    foreign_field::{self, limbs_of, Field3, FIELD3_BITS},
    native_curve::{
        add, add_non_zero, field3_to_shifted_scalar, field_to_shifted_scalar, from_coordinates,
        scale_fast_unpack, scale_field, scale_shifted, to_coordinates, Point, ShiftedScalar,
        HIGH_BITS, SCALE_BITS,
    },
    prelude::*,
};

fn fq(x: Fp) -> Fq {
    let x: BigUint = x.into();
    Fq::from(x)
}

fn scalar_modulus() -> BigUint {
    Fq::MODULUS.into()
}

/// `q - 2^254`, the high part of the shifted scalar `0`.
fn minus_shift() -> BigUint {
    scalar_modulus() - (BigUint::one() << HIGH_BITS)
}

fn scale_field_in_circuit(p: Pallas, s: Fp) -> SnarkyResult<Pallas> {
    let res = run_and_check(|sys: &mut RunState<Fp>| {
        let p: Point = sys.compute(loc!(), |_| to_coordinates(&p))?;
        let s: FieldVar<Fp> = sys.compute(loc!(), |_| s)?;
        scale_field(sys, loc!(), &p, &s)
    })?;
    Ok(from_coordinates(res))
}

fn scale_shifted_in_circuit(p: Pallas, s: Fq, num_high_bits: usize) -> SnarkyResult<Pallas> {
    let res = run_and_check(|sys: &mut RunState<Fp>| {
        let p: Point = sys.compute(loc!(), |_| to_coordinates(&p))?;
        let s: ShiftedScalar = sys.compute(loc!(), |_| s)?;
        scale_shifted(sys, loc!(), &p, &s, num_high_bits)
    })?;
    Ok(from_coordinates(res))
}

fn scale_field3_in_circuit(p: Pallas, s: BigUint) -> SnarkyResult<Pallas> {
    let res = run_and_check(|sys: &mut RunState<Fp>| {
        let p: Point = sys.compute(loc!(), |_| to_coordinates(&p))?;
        let s: Field3<Fp> = sys.compute(loc!(), |_| s.clone())?;
        let s = field3_to_shifted_scalar(sys, loc!(), &s)?;
        scale_shifted(sys, loc!(), &p, &s, HIGH_BITS)
    })?;
    Ok(from_coordinates(res))
}

#[test]
fn test_scale_field_small_scalars() {
    let mut rng = StdRng::seed_from_u64(0);
    let p = random_point(&mut rng);

    for s in 0u64..4 {
        let expected = (p * Fq::from(s)).into_affine();
        assert_eq!(scale_field_in_circuit(p, Fp::from(s)).unwrap(), expected);
    }
}

#[test]
fn test_scale_field_gates() {
    let mut sys = RunState::<Fp>::new(0, true);
    let p: Point = sys.compute(loc!(), |_| (Fp::zero(), Fp::zero())).unwrap();
    let s: FieldVar<Fp> = sys.compute(loc!(), |_| Fp::zero()).unwrap();
    scale_field(&mut sys, loc!(), &p, &s).unwrap();

    let system = sys.system.as_ref().unwrap();
    let count = |kind| {
        system
            .summary()
            .into_iter()
            .find_map(|(k, n)| (k == kind).then_some(n))
            .unwrap_or(0)
    };
    assert_eq!(count(ConstraintKind::VarBaseMul), 1);
    assert_eq!(count(ConstraintKind::CompleteAdd), 1);
    assert!(system.num_rows() > 2 * SCALE_BITS / VARBASEMUL_BITS_PER_ROW);
}

#[test]
fn test_scale_field_largest_scalar() {
    let p = Pallas::generator();
    let s = -Fp::one();
    let expected = (p * fq(s)).into_affine();
    assert_eq!(scale_field_in_circuit(p, s).unwrap(), expected);
}

#[test]
fn test_scale_field_constant() {
    let mut rng = StdRng::seed_from_u64(1);
    let p = random_point(&mut rng);
    let s = Fp::rand(&mut rng);

    let mut sys = RunState::<Fp>::unchecked();
    let res = scale_field(
        &mut sys,
        loc!(),
        &Point::constant(&p),
        &FieldVar::constant(s),
    )
    .unwrap();
    assert_eq!(
        from_coordinates(res.read(&sys)),
        (p * fq(s)).into_affine()
    );
}

#[test]
fn test_scale_shifted_edge_cases() {
    let p = Pallas::generator();

    // the scalars whose shifted high part is q - 2^254 or q - 2^254 - 1
    for s in [Fq::zero(), Fq::one(), -Fq::one(), -Fq::from(2u64), Fq::from(2u64)] {
        let expected = (p * s).into_affine();
        assert_eq!(scale_shifted_in_circuit(p, s, HIGH_BITS).unwrap(), expected);
    }
}

#[test]
fn test_scale_shifted_short_scalars() {
    let mut rng = StdRng::seed_from_u64(2);
    let p = random_point(&mut rng);

    // s = 2^255 + t has the shifted form t
    let s = Fq::from(BigUint::one() << SCALE_BITS) + Fq::from(12345u64);
    assert_eq!(
        scale_shifted_in_circuit(p, s, 64).unwrap(),
        (p * s).into_affine()
    );

    // too many bits for the claimed width
    let s = Fq::from(BigUint::one() << SCALE_BITS) + Fq::from(BigUint::one() << 66);
    assert_runtime_error(scale_shifted_in_circuit(p, s, 64));

    // the edge cases do not fit in 64 bits either
    assert_runtime_error(scale_shifted_in_circuit(p, Fq::zero(), 64));
}

#[test]
fn test_scale_shifted_width_too_large() {
    let res = scale_shifted_in_circuit(Pallas::generator(), Fq::one(), HIGH_BITS + 1);
    assert!(matches!(
        res,
        Err(SnarkyError::CompilationError(
            SnarkyCompilationError::InvalidBitLength(255, 254)
        ))
    ));
}

#[test]
fn test_field_to_shifted_scalar() {
    let mut rng = StdRng::seed_from_u64(3);
    for s in [Fp::zero(), Fp::one(), -Fp::one(), Fp::rand(&mut rng)] {
        let res = run_and_check(|sys: &mut RunState<Fp>| {
            let s: FieldVar<Fp> = sys.compute(loc!(), |_| s)?;
            field_to_shifted_scalar(sys, loc!(), &s)
        })
        .unwrap();
        assert_eq!(res, fq(s));
    }
}

#[test]
fn test_field3_largest_scalar() {
    let p = Pallas::generator();
    let res = scale_field3_in_circuit(p, scalar_modulus() - 1u32).unwrap();
    assert_eq!(res, -p);
}

#[test]
fn test_field3_rejects_unreduced_scalars() {
    let p = Pallas::generator();
    assert_runtime_error(scale_field3_in_circuit(p, scalar_modulus()));
    assert_runtime_error(scale_field3_in_circuit(p, scalar_modulus() + 5u32));

    // constants are checked when compiling
    let mut sys = RunState::<Fp>::unchecked();
    let s = Field3::<Fp>::from_value(&scalar_modulus());
    assert!(field3_to_shifted_scalar(&mut sys, loc!(), &s).is_err());
}

#[test]
fn test_field3_rejects_unreduced_shift() {
    let q = scalar_modulus();
    let shift = (BigUint::one() << 255u32) % &q;
    let s = &q - 1u32;
    let t = &s - &shift;

    // with the overflow bit set, r = s - shift + q also satisfies the limb equations of `sub`
    let r = &t + &q;
    assert!(r.bits() <= u64::from(FIELD3_BITS));
    let limbs = |x: &BigUint| limbs_of(x).map(BigInt::from);
    let (s_limbs, shift_limbs, q_limbs, r_limbs) = (limbs(&s), limbs(&shift), limbs(&q), limbs(&r));
    let two_to_88: BigInt = BigInt::one() << 88;
    let mut carry = BigInt::zero();
    for i in 0..3 {
        let diff = &s_limbs[i] - &shift_limbs[i] + &q_limbs[i] + &carry - &r_limbs[i];
        if i == 2 {
            assert!(diff.is_zero());
        } else {
            assert!((&diff % &two_to_88).is_zero());
            carry = diff / &two_to_88;
            assert!(carry.magnitude() <= &BigUint::one());
        }
    }

    let shift_in_circuit = |t: &BigUint| {
        run_and_check(|sys: &mut RunState<Fp>| {
            let s: Field3<Fp> = sys.compute(loc!(), |_| s.clone())?;
            let t: Field3<Fp> = sys.compute(loc!(), |_| t.clone())?;
            foreign_field::assert_less_than(sys, loc!(), &s, &q)?;
            foreign_field::assert_less_than(sys, loc!(), &t, &q)
        })
    };
    assert!(shift_in_circuit(&t).is_ok());
    assert_runtime_error(shift_in_circuit(&r));
}

#[test]
fn test_scale_field_two_matches_doubling() {
    let mut rng = StdRng::seed_from_u64(7);
    let p = random_point(&mut rng);

    let (scaled, doubled) = run_and_check(|sys: &mut RunState<Fp>| {
        let p: Point = sys.compute(loc!(), |_| to_coordinates(&p))?;
        let two: FieldVar<Fp> = sys.compute(loc!(), |_| Fp::from(2u64))?;
        let scaled = scale_field(sys, loc!(), &p, &two)?;
        let (doubled, _) = add(sys, loc!(), &p, &p)?;
        Ok((scaled, doubled))
    })
    .unwrap();

    assert_eq!(scaled, doubled);
    assert_eq!(from_coordinates(scaled), (p + p).into_affine());
}

#[test]
fn test_add_cases() {
    let mut rng = StdRng::seed_from_u64(4);
    let g = random_point(&mut rng);
    let h = random_point(&mut rng);

    let add_in_circuit = |g: Pallas, h: Pallas| {
        run_and_check(|sys: &mut RunState<Fp>| {
            let g: Point = sys.compute(loc!(), |_| to_coordinates(&g))?;
            let h: Point = sys.compute(loc!(), |_| to_coordinates(&h))?;
            add(sys, loc!(), &g, &h)
        })
        .unwrap()
    };

    for (g, h) in [(g, h), (g, g)] {
        let (sum, is_infinity) = add_in_circuit(g, h);
        assert!(!is_infinity);
        assert_eq!(from_coordinates(sum), (g + h).into_affine());
    }

    let (_, is_infinity) = add_in_circuit(g, -g);
    assert!(is_infinity);

    // same results out of circuit
    let mut sys = RunState::<Fp>::unchecked();
    let (sum, is_infinity) = add(&mut sys, loc!(), &Point::constant(&g), &Point::constant(&h)).unwrap();
    assert_eq!(is_infinity.to_constant(), Some(false));
    assert_eq!(from_coordinates(sum.read(&sys)), (g + h).into_affine());
}

#[test]
fn test_add_non_zero_rejects_infinity() {
    let g = Pallas::generator();
    let res = run_and_check(|sys: &mut RunState<Fp>| {
        let p: Point = sys.compute(loc!(), |_| to_coordinates(&g))?;
        let q: Point = sys.compute(loc!(), |_| to_coordinates(&-g))?;
        add_non_zero(sys, loc!(), &p, &q)
    });
    assert_runtime_error(res);
}

#[test]
fn test_tampered_ec_add() {
    let g = Pallas::generator();
    let h = (g + g).into_affine();
    let (x1, y1) = (g.x, g.y);
    let (x2, y2) = (h.x, h.y);

    let x21_inv = (x2 - x1).inverse().unwrap();
    let s = (y2 - y1) * x21_inv;
    let x3 = s.square() - x1 - x2;
    let y3 = s * (x1 - x3) - y1;

    let constraint = |y3: Fp| KimchiConstraint::EcAdd {
        p1: (FieldVar::constant(x1), FieldVar::constant(y1)),
        p2: (FieldVar::constant(x2), FieldVar::constant(y2)),
        p3: (FieldVar::constant(x3), FieldVar::constant(y3)),
        inf: FieldVar::zero(),
        same_x: FieldVar::zero(),
        slope: FieldVar::constant(s),
        inf_z: FieldVar::zero(),
        x21_inv: FieldVar::constant(x21_inv),
    };

    let sys = RunState::<Fp>::unchecked();
    assert_eq!(to_coordinates(&(g + h).into_affine()), (x3, y3));
    assert!(constraint(y3).check_constraint(&sys).is_ok());
    assert!(matches!(
        constraint(y3 + Fp::one()).check_constraint(&sys),
        Err(SnarkyRuntimeError::UnsatisfiedEcAdd(_))
    ));
}

#[test]
fn test_scale_fast_unpack() {
    let mut rng = StdRng::seed_from_u64(5);
    let p = random_point(&mut rng);
    let k = 1000u64;

    let (res, bits) = run_and_check(|sys: &mut RunState<Fp>| {
        let base: Point = sys.compute(loc!(), |_| to_coordinates(&p))?;
        let scalar: FieldVar<Fp> = sys.compute(loc!(), |_| Fp::from(k))?;
        let (res, bits) = scale_fast_unpack(sys, loc!(), &base, &scalar, SCALE_BITS)?;
        let bits: [FieldVar<Fp>; 10] = std::array::from_fn(|i| bits[i].clone());
        Ok((res, bits))
    })
    .unwrap();

    // (2k + 1 + 2^255) P
    let scalar = Fq::from(2 * k + 1) + Fq::from(BigUint::one() << SCALE_BITS);
    assert_eq!(from_coordinates(res), (p * scalar).into_affine());

    let expected_bits: Vec<Fp> = (0..10u64).map(|i| Fp::from((k >> i) & 1)).collect();
    assert_eq!(bits.to_vec(), expected_bits);
}

#[test]
fn test_scale_fast_unpack_rejects_degenerate_scalar() {
    let p = Pallas::generator();
    let res = run_and_check(|sys: &mut RunState<Fp>| {
        let base: Point = sys.compute(loc!(), |_| to_coordinates(&p))?;
        let scalar: FieldVar<Fp> = sys.compute(loc!(), |_| Fp::from(minus_shift()))?;
        let (res, _) = scale_fast_unpack(sys, loc!(), &base, &scalar, SCALE_BITS)?;
        Ok(res)
    });
    assert!(matches!(
        res,
        Err(SnarkyError::RuntimeError(
            SnarkyRuntimeError::UnsatisfiedScaleFastUnpack(_)
        ))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn test_scale_field_random(mut rng in rng()) {
        let p = random_point(&mut rng);
        let s = Fp::rand(&mut rng);
        prop_assert_eq!(scale_field_in_circuit(p, s).unwrap(), (p * fq(s)).into_affine());
    }

    #[test]
    fn test_scale_shifted_random(mut rng in rng()) {
        let p = random_point(&mut rng);
        let s = Fq::rand(&mut rng);
        prop_assert_eq!(scale_shifted_in_circuit(p, s, HIGH_BITS).unwrap(), (p * s).into_affine());
    }

    #[test]
    fn test_field3_random(mut rng in rng()) {
        let p = random_point(&mut rng);
        let s = Fq::rand(&mut rng);
        prop_assert_eq!(scale_field3_in_circuit(p, s.into()).unwrap(), (p * s).into_affine());
    }
}
