//! Range checks, built on the native 64-bit and 3 x 88-bit range check gates.

use std::borrow::Cow;

use ark_ff::PrimeField;
use num_bigint::BigUint;

use crate::{
    constraint_system::{KimchiConstraint, LIMB_BITS, RANGE_CHECK_BITS},
    cvar::FieldVar,
    errors::{SnarkyCompilationError, SnarkyResult},
    runner::{Constraint, RunState},
};

/// The largest bit length [range_check_bits] supports.
pub const MAX_RANGE_CHECK_BITS: usize = 2 * RANGE_CHECK_BITS as usize;

fn fits<F: PrimeField>(x: &FieldVar<F>, bits: u32) -> bool {
    x.to_constant().is_some_and(|c| {
        let c: BigUint = c.into();
        c.bits() <= u64::from(bits)
    })
}

/// Asserts `0 <= x < 2^64`.
pub fn range_check64<F: PrimeField>(
    state: &mut RunState<F>,
    loc: Cow<'static, str>,
    x: &FieldVar<F>,
) -> SnarkyResult<()> {
    if fits(x, RANGE_CHECK_BITS) {
        return Ok(());
    }
    state.add_constraint(
        Constraint::KimchiConstraint(KimchiConstraint::RangeCheck0(x.clone())),
        Some("range_check64".into()),
        loc,
    )
}

/// Asserts `0 <= x_i < 2^88` for the three limbs.
pub fn multi_range_check<F: PrimeField>(
    state: &mut RunState<F>,
    loc: Cow<'static, str>,
    limbs: &[FieldVar<F>; 3],
) -> SnarkyResult<()> {
    if limbs.iter().all(|limb| fits(limb, LIMB_BITS)) {
        return Ok(());
    }
    state.add_constraint(
        Constraint::KimchiConstraint(KimchiConstraint::MultiRangeCheck(limbs.clone())),
        Some("multi_range_check".into()),
        loc,
    )
}

/// Asserts `0 <= x < 2^bits`, for `bits <= 128`.
///
/// Values are split in 64-bit chunks. A chunk of `m < 64` bits is checked
/// as both `x < 2^64` and `x * 2^(64 - m) < 2^64`.
pub fn range_check_bits<F: PrimeField>(
    state: &mut RunState<F>,
    loc: Cow<'static, str>,
    x: &FieldVar<F>,
    bits: usize,
) -> SnarkyResult<()> {
    if bits > MAX_RANGE_CHECK_BITS {
        return Err(SnarkyCompilationError::InvalidBitLength(bits, MAX_RANGE_CHECK_BITS).into());
    }

    let chunk = RANGE_CHECK_BITS as usize;
    if bits <= chunk {
        range_check64(state, loc.clone(), x)?;
        if bits < chunk {
            let shift = F::from(BigUint::from(1u32) << (chunk - bits));
            range_check64(state, loc, &x.scale(shift))?;
        }
        return Ok(());
    }

    let x_clone = x.clone();
    let [lo, hi]: [FieldVar<F>; 2] = state.compute(loc.clone(), move |env| {
        let x: BigUint = env.read_var(&x_clone).into();
        let lo = &x % (BigUint::from(1u32) << chunk);
        let hi = &x >> chunk;
        [F::from(lo), F::from(hi)]
    })?;

    let two_to_chunk = F::from(BigUint::from(1u32) << chunk);
    x.assert_equals(state, loc.clone(), &(&lo + &hi.scale(two_to_chunk)))?;
    range_check64(state, loc.clone(), &lo)?;
    range_check_bits(state, loc, &hi, bits - chunk)
}
