//! Elements of a foreign field, as three 88-bit limbs of the native field.
//!
//! Only what the scalar multiplication gadgets need is provided: subtraction
//! (whose result is not necessarily reduced) and comparison with a constant.

use std::borrow::Cow;

use ark_ff::PrimeField;
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::{One, Zero};

use crate::{
    boolean::Boolean,
    constraint_system::LIMB_BITS,
    cvar::FieldVar,
    errors::{SnarkyCompilationError, SnarkyResult},
    range_checks::multi_range_check,
    runner::{RunState, WitnessGeneration},
    snarky_type::SnarkyType,
};

/// Number of limbs of a [Field3].
pub const LIMB_COUNT: usize = 3;

/// Bits covered by the limbs of a [Field3].
pub const FIELD3_BITS: u32 = LIMB_BITS * LIMB_COUNT as u32;

fn two_to_limb() -> BigUint {
    BigUint::one() << LIMB_BITS
}

/// Splits a value into three 88-bit limbs, least significant first.
/// The top limb keeps every bit above `2 * 88`.
pub fn limbs_of(value: &BigUint) -> [BigUint; LIMB_COUNT] {
    let mask = two_to_limb() - 1u32;
    [
        value & &mask,
        (value >> LIMB_BITS) & &mask,
        value >> (2 * LIMB_BITS),
    ]
}

/// The value `l0 + 2^88 l1 + 2^176 l2`.
pub fn value_of_limbs(limbs: &[BigUint; LIMB_COUNT]) -> BigUint {
    limbs
        .iter()
        .rev()
        .fold(BigUint::zero(), |acc, limb| (acc << LIMB_BITS) + limb)
}

/// A foreign field element, as three limbs in `[0, 2^88)`.
/// The limbs are not required to encode a reduced value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field3<F: PrimeField>(pub [FieldVar<F>; LIMB_COUNT]);

impl<F: PrimeField> Field3<F> {
    pub fn to_constant(&self) -> Option<BigUint> {
        self.to_constant_value()
    }
}

impl<F: PrimeField> SnarkyType<F> for Field3<F> {
    type Auxiliary = ();

    type OutOfCircuit = BigUint;

    const SIZE_IN_FIELD_ELEMENTS: usize = LIMB_COUNT;

    fn to_cvars(&self) -> (Vec<FieldVar<F>>, Self::Auxiliary) {
        (self.0.to_vec(), ())
    }

    fn from_cvars_unsafe(cvars: Vec<FieldVar<F>>, _aux: Self::Auxiliary) -> Self {
        assert_eq!(cvars.len(), LIMB_COUNT);
        Self(std::array::from_fn(|i| cvars[i].clone()))
    }

    fn check(&self, cs: &mut RunState<F>, loc: Cow<'static, str>) -> SnarkyResult<()> {
        multi_range_check(cs, loc, &self.0)
    }

    fn constraint_system_auxiliary() -> Self::Auxiliary {}

    fn value_to_field_elements(value: &Self::OutOfCircuit) -> (Vec<F>, Self::Auxiliary) {
        (limbs_of(value).into_iter().map(F::from).collect(), ())
    }

    fn value_of_field_elements(fields: Vec<F>, _aux: Self::Auxiliary) -> Self::OutOfCircuit {
        assert_eq!(fields.len(), LIMB_COUNT);
        let limbs: [BigUint; LIMB_COUNT] = std::array::from_fn(|i| fields[i].into());
        value_of_limbs(&limbs)
    }
}

fn read_limbs<F: PrimeField>(
    env: &dyn WitnessGeneration<F>,
    x: &Field3<F>,
) -> [BigUint; LIMB_COUNT] {
    x.0.clone().map(|limb| env.read_var(&limb).into())
}

/// Computes `a - b` modulo `modulus`, as `a - b = r - o * modulus` with an overflow bit `o`.
///
/// The limb equations use carries in `{-1, 0, 1}` and every limb of `r` is range-checked,
/// so `r = a - b + o * modulus` holds over the integers.
/// `r` is only guaranteed to be smaller than `2^264`, not to be reduced: callers that
/// need a canonical result must follow up with [assert_less_than].
pub fn sub<F: PrimeField>(
    state: &mut RunState<F>,
    loc: Cow<'static, str>,
    a: &Field3<F>,
    b: &Field3<F>,
    modulus: &BigUint,
) -> SnarkyResult<Field3<F>> {
    if modulus.bits() > u64::from(FIELD3_BITS) {
        return Err(
            SnarkyCompilationError::InvalidBitLength(modulus.bits() as usize, FIELD3_BITS as usize)
                .into(),
        );
    }

    if let (Some(a), Some(b)) = (a.to_constant(), b.to_constant()) {
        let r = ((a + modulus) - (b % modulus)) % modulus;
        return Ok(Field3::from_value(&r));
    }

    let (a_clone, b_clone, modulus_clone) = (a.clone(), b.clone(), modulus.clone());
    let (overflow, [r0, r1, r2, c0, c1]): (Boolean<F>, [FieldVar<F>; 5]) =
        state.compute(loc.clone(), move |env| {
            let a_limbs = read_limbs(env, &a_clone);
            let b_limbs = read_limbs(env, &b_clone);
            let (a, b) = (value_of_limbs(&a_limbs), value_of_limbs(&b_limbs));
            let overflow = a < b;
            // a dishonest `b > a + modulus` has no valid result, the constraints reject the zero
            let r = if !overflow {
                a - b
            } else if &a + &modulus_clone >= b {
                a + &modulus_clone - b
            } else {
                BigUint::zero()
            };

            let [a0, a1, _] = a_limbs.map(signed);
            let [b0, b1, _] = b_limbs.map(signed);
            let [f0, f1, _] = limbs_of(&modulus_clone).map(signed);
            let o = BigInt::from(u8::from(overflow));
            let [r0, r1, r2] = limbs_of(&r);

            // r0 = a0 - b0 + o f0 - c0 2^88
            let c0 = (a0 - b0 + &o * f0 - signed(r0.clone())) >> LIMB_BITS;
            // r1 = a1 - b1 + o f1 + c0 - c1 2^88
            let c1 = (a1 - b1 + &o * f1 + &c0 - signed(r1.clone())) >> LIMB_BITS;

            (
                overflow,
                [
                    F::from(r0),
                    F::from(r1),
                    F::from(r2),
                    field_of_signed(&c0),
                    field_of_signed(&c1),
                ],
            )
        })?;

    // carries are in {-1, 0, 1}
    for c in [&c0, &c1] {
        let c_cubed = c.square(loc.clone(), state)?.mul(c, None, loc.clone(), state)?;
        c.assert_equals(state, loc.clone(), &c_cubed)?;
    }

    let [a0, a1, a2] = a.0.clone();
    let [b0, b1, b2] = b.0.clone();
    let [f0, f1, f2] = limbs_of(modulus).map(F::from);
    let o = overflow.to_field_var();
    let two_to_limb = F::from(two_to_limb());

    let rhs0 = a0 - &b0 + &o.scale(f0) - &c0.scale(two_to_limb);
    r0.assert_equals(state, loc.clone(), &rhs0)?;
    let rhs1 = a1 - &b1 + &o.scale(f1) + &c0 - &c1.scale(two_to_limb);
    r1.assert_equals(state, loc.clone(), &rhs1)?;
    let rhs2 = a2 - &b2 + &o.scale(f2) + &c1;
    r2.assert_equals(state, loc.clone(), &rhs2)?;

    let r = Field3([r0, r1, r2]);
    r.check(state, loc)?;
    Ok(r)
}

/// Asserts `x < bound`, for a constant `bound <= 2^264`.
///
/// Computes `z = x + (2^264 - bound)` with boolean carries and range-checks the limbs of `z`:
/// as `z < 2^264`, the addition did not overflow and `x < bound`.
/// The limbs of `x` are assumed to be range-checked already.
pub fn assert_less_than<F: PrimeField>(
    state: &mut RunState<F>,
    loc: Cow<'static, str>,
    x: &Field3<F>,
    bound: &BigUint,
) -> SnarkyResult<()> {
    let two_to_264 = BigUint::one() << FIELD3_BITS;
    if bound.is_zero() || bound > &two_to_264 {
        return Err(
            SnarkyCompilationError::InvalidBitLength(bound.bits() as usize, FIELD3_BITS as usize)
                .into(),
        );
    }

    if let Some(x) = x.to_constant() {
        return if &x < bound {
            Ok(())
        } else {
            Err(SnarkyCompilationError::ConstantAssertEquals(
                format!("{x} < {bound}"),
                "false".into(),
            )
            .into())
        };
    }

    let complement = &two_to_264 - bound;
    let c = limbs_of(&complement);

    let (x_clone, c_clone) = (x.clone(), c.clone());
    let (k0, (k1, z)): (Boolean<F>, (Boolean<F>, [FieldVar<F>; 3])) =
        state.compute(loc.clone(), move |env| {
            let [x0, x1, x2] = read_limbs(env, &x_clone);
            let [c0, c1, c2] = c_clone;
            let limb = two_to_limb();
            let s0 = x0 + c0;
            let k0 = s0 >= limb;
            let s1 = x1 + c1 + u32::from(k0);
            let k1 = s1 >= limb;
            let s2 = x2 + c2 + u32::from(k1);
            let z = [s0 % &limb, s1 % &limb, s2].map(F::from);
            (k0, (k1, z))
        })?;

    let [x0, x1, x2] = x.0.clone();
    let [c0, c1, c2] = c.map(F::from);
    let [z0, z1, z2] = z;
    let two_to_limb = F::from(two_to_limb());
    let (k0, k1) = (k0.to_field_var(), k1.to_field_var());

    let rhs0 = x0 + &FieldVar::constant(c0) - &k0.scale(two_to_limb);
    z0.assert_equals(state, loc.clone(), &rhs0)?;
    let rhs1 = x1 + &FieldVar::constant(c1) + &k0 - &k1.scale(two_to_limb);
    z1.assert_equals(state, loc.clone(), &rhs1)?;
    let rhs2 = x2 + &FieldVar::constant(c2) + &k1;
    z2.assert_equals(state, loc.clone(), &rhs2)?;

    multi_range_check(state, loc, &[z0, z1, z2])
}

fn signed(x: BigUint) -> BigInt {
    BigInt::from(x)
}

fn field_of_signed<F: PrimeField>(x: &BigInt) -> F {
    let magnitude = F::from(x.magnitude().clone());
    if x.sign() == Sign::Minus {
        -magnitude
    } else {
        magnitude
    }
}
