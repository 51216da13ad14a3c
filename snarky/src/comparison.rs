//! Comparisons against constants, and the canonical `(odd, high)` split of a field element.

use std::borrow::Cow;

use ark_ff::PrimeField;
use num_bigint::BigUint;
use num_traits::One;

use crate::{
    boolean::Boolean,
    cvar::FieldVar,
    errors::{SnarkyCompilationError, SnarkyResult},
    range_checks::{range_check_bits, MAX_RANGE_CHECK_BITS},
    runner::RunState,
};

/// Width of the low half in [assert_less_than_or_equal_const].
const HALF_BITS: usize = 128;

/// Splits `x` into `(b, z)` such that `x = b + 2z`, with `b` boolean.
///
/// The split is proven canonical by asserting `z + b <= (p - 1) / 2`,
/// which rules out aliases such as `0 = 1 + 2 * (p - 1) / 2`.
/// This is done as `z <= (p - 1) / 2`, and `z != (p - 1) / 2` when `b` is set.
pub fn is_odd_and_high<F: PrimeField>(
    state: &mut RunState<F>,
    loc: Cow<'static, str>,
    x: &FieldVar<F>,
) -> SnarkyResult<(Boolean<F>, FieldVar<F>)> {
    if let Some(c) = x.to_constant() {
        let c: BigUint = c.into();
        return Ok((Boolean::constant(c.bit(0)), FieldVar::Constant(F::from(c >> 1))));
    }

    let x_clone = x.clone();
    let (is_odd, high): (Boolean<F>, FieldVar<F>) = state.compute(loc.clone(), move |env| {
        let x: BigUint = env.read_var(&x_clone).into();
        (x.bit(0), F::from(x >> 1))
    })?;

    let recombined = is_odd.to_field_var() + &high.scale(F::from(2u64));
    x.assert_equals(state, loc.clone(), &recombined)?;

    let modulus: BigUint = F::MODULUS.into();
    let half = (modulus - 1u32) >> 1;
    assert_less_than_or_equal_const(state, loc.clone(), &high, &half)?;
    let is_half = high.equal(state, loc.clone(), &FieldVar::constant(F::from(half)))?;
    state.assert_r1cs(
        Some("odd_and_high".into()),
        loc,
        is_odd.to_field_var(),
        is_half.to_field_var(),
        FieldVar::zero(),
    )?;

    Ok((is_odd, high))
}

/// Asserts `x <= bound` for a constant `bound` of less bits than the field modulus.
///
/// `x` is split in a 128-bit low half and a high half, each range-checked.
/// The high half is compared to the high half of `bound`, and the low halves
/// are only compared when the high halves are equal.
pub fn assert_less_than_or_equal_const<F: PrimeField>(
    state: &mut RunState<F>,
    loc: Cow<'static, str>,
    x: &FieldVar<F>,
    bound: &BigUint,
) -> SnarkyResult<()> {
    let max_bits = (F::MODULUS_BIT_SIZE - 1) as usize;
    let bound_bits = bound.bits() as usize;
    let hi_bits = bound_bits.saturating_sub(HALF_BITS);
    if bound_bits > max_bits || hi_bits > MAX_RANGE_CHECK_BITS {
        return Err(SnarkyCompilationError::InvalidBitLength(bound_bits, max_bits).into());
    }

    if let Some(c) = x.to_constant() {
        let c: BigUint = c.into();
        return if &c <= bound {
            Ok(())
        } else {
            Err(SnarkyCompilationError::ConstantAssertEquals(
                format!("{c} <= {bound}"),
                "false".into(),
            )
            .into())
        };
    }

    let half_mask = (BigUint::one() << HALF_BITS) - 1u32;
    let bound_lo = F::from(bound & &half_mask);
    let bound_hi = F::from(bound >> HALF_BITS);

    let x_clone = x.clone();
    let [lo, hi]: [FieldVar<F>; 2] = state.compute(loc.clone(), move |env| {
        let x: BigUint = env.read_var(&x_clone).into();
        [F::from(&x & &half_mask), F::from(x >> HALF_BITS)]
    })?;
    range_check_bits(state, loc.clone(), &lo, HALF_BITS)?;
    range_check_bits(state, loc.clone(), &hi, hi_bits)?;

    let two_to_half = F::from(BigUint::one() << HALF_BITS);
    x.assert_equals(state, loc.clone(), &(&lo + &hi.scale(two_to_half)))?;

    // hi <= bound_hi
    let d_hi = FieldVar::constant(bound_hi) - &hi;
    range_check_bits(state, loc.clone(), &d_hi, hi_bits)?;

    // if hi == bound_hi then lo <= bound_lo
    let hi_eq = d_hi.equal(state, loc.clone(), &FieldVar::zero())?;
    let d_lo = FieldVar::constant(bound_lo) - &lo;
    let masked = state.if_(loc.clone(), &hi_eq, &d_lo, &FieldVar::zero())?;
    range_check_bits(state, loc, &masked, HALF_BITS)
}
