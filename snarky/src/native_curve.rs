//! Elliptic curve gadgets for Pallas, whose base field is the native field [Fp].
//!
//! Scalars live in [Fq], a different field than the one constraints are expressed in.
//! Scalar multiplication works on a shifted representation of the scalar,
//! `s = 2 * hi + lo + 2^255 (mod q)`, which keeps every intermediate point of the
//! native double-and-add away from the point at infinity.
//! The few scalars for which that still fails are handled separately.
//!
//! The point at infinity is encoded as `(0, 0)`, which is not on the curve.

use std::borrow::Cow;

use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{AdditiveGroup, Field, One, PrimeField, Zero};
use log::debug;
use mina_curves::pasta::{Fp, Fq, Pallas};
use num_bigint::BigUint;

use crate::{
    boolean::Boolean,
    comparison::is_odd_and_high,
    constraint_system::{varbase_mul, KimchiConstraint, LIMB_BITS},
    cvar::FieldVar,
    errors::{SnarkyCompilationError, SnarkyResult},
    foreign_field::{self, Field3},
    range_checks::{range_check64, range_check_bits},
    runner::{Constraint, RunState, WitnessGeneration},
    snarky_type::SnarkyType,
};

/// Number of bits decomposed by [scale_fast_unpack] in the scalar multiplication gadgets.
pub const SCALE_BITS: usize = 255;

/// Bits of the high part of a full-width shifted scalar.
pub const HIGH_BITS: usize = 254;

/// A pair of coordinates. Nothing is checked: the gadgets decide what the pair means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Point {
    pub x: FieldVar<Fp>,
    pub y: FieldVar<Fp>,
}

impl SnarkyType<Fp> for Point {
    type Auxiliary = ();

    type OutOfCircuit = (Fp, Fp);

    const SIZE_IN_FIELD_ELEMENTS: usize = 2;

    fn to_cvars(&self) -> (Vec<FieldVar<Fp>>, Self::Auxiliary) {
        (vec![self.x.clone(), self.y.clone()], ())
    }

    fn from_cvars_unsafe(cvars: Vec<FieldVar<Fp>>, _aux: Self::Auxiliary) -> Self {
        assert_eq!(cvars.len(), Self::SIZE_IN_FIELD_ELEMENTS);
        Self {
            x: cvars[0].clone(),
            y: cvars[1].clone(),
        }
    }

    fn check(&self, _cs: &mut RunState<Fp>, _loc: Cow<'static, str>) -> SnarkyResult<()> {
        Ok(())
    }

    fn constraint_system_auxiliary() -> Self::Auxiliary {}

    fn value_to_field_elements(value: &Self::OutOfCircuit) -> (Vec<Fp>, Self::Auxiliary) {
        (vec![value.0, value.1], ())
    }

    fn value_of_field_elements(fields: Vec<Fp>, _aux: Self::Auxiliary) -> Self::OutOfCircuit {
        assert_eq!(fields.len(), Self::SIZE_IN_FIELD_ELEMENTS);
        (fields[0], fields[1])
    }
}

impl Point {
    pub fn zero() -> Self {
        Self {
            x: FieldVar::zero(),
            y: FieldVar::zero(),
        }
    }

    pub fn constant(p: &Pallas) -> Self {
        Self::from_value(&to_coordinates(p))
    }

    fn seal(&self, state: &mut RunState<Fp>, loc: Cow<'static, str>) -> SnarkyResult<Self> {
        Ok(Self {
            x: self.x.seal(state, loc.clone())?,
            y: self.y.seal(state, loc)?,
        })
    }
}

/// The coordinates of a point, `(0, 0)` for the point at infinity.
pub fn to_coordinates(p: &Pallas) -> (Fp, Fp) {
    if p.infinity {
        (Fp::zero(), Fp::zero())
    } else {
        (p.x, p.y)
    }
}

/// The inverse of [to_coordinates]. The point is not checked to be on the curve.
pub fn from_coordinates((x, y): (Fp, Fp)) -> Pallas {
    if x.is_zero() && y.is_zero() {
        Pallas::zero()
    } else {
        Pallas::new_unchecked(x, y)
    }
}

fn fq_of_biguint(x: BigUint) -> Fq {
    Fq::from(x)
}

fn fq_of_fp(x: Fp) -> Fq {
    fq_of_biguint(x.into())
}

fn scale_constant(p: (Fp, Fp), s: Fq) -> (Fp, Fp) {
    to_coordinates(&(from_coordinates(p) * s).into_affine())
}

//
// scalars
//

/// A scalar `s` of Pallas in shifted form: `s = 2 * hi + lo + 2^255 (mod q)`.
///
/// Out of circuit, this is simply the scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShiftedScalar {
    pub lo: Boolean<Fp>,
    pub hi: FieldVar<Fp>,
}

fn two_to_255() -> BigUint {
    BigUint::one() << 255
}

fn scalar_modulus() -> BigUint {
    Fq::MODULUS.into()
}

/// `t = s - 2^255 mod q`, split as `(t & 1, t >> 1)`.
fn shift_constant(s: Fq) -> (bool, BigUint) {
    let t: BigUint = (s - fq_of_biguint(two_to_255())).into();
    (t.bit(0), t >> 1)
}

impl SnarkyType<Fp> for ShiftedScalar {
    type Auxiliary = ();

    type OutOfCircuit = Fq;

    const SIZE_IN_FIELD_ELEMENTS: usize = 2;

    fn to_cvars(&self) -> (Vec<FieldVar<Fp>>, Self::Auxiliary) {
        (vec![self.lo.to_field_var(), self.hi.clone()], ())
    }

    fn from_cvars_unsafe(cvars: Vec<FieldVar<Fp>>, _aux: Self::Auxiliary) -> Self {
        assert_eq!(cvars.len(), Self::SIZE_IN_FIELD_ELEMENTS);
        Self {
            lo: Boolean::create_unsafe(cvars[0].clone()),
            hi: cvars[1].clone(),
        }
    }

    /// Only the low bit is constrained here, [scale_shifted] proves the bit length of the high part.
    fn check(&self, cs: &mut RunState<Fp>, loc: Cow<'static, str>) -> SnarkyResult<()> {
        self.lo.check(cs, loc)
    }

    fn constraint_system_auxiliary() -> Self::Auxiliary {}

    fn value_to_field_elements(value: &Self::OutOfCircuit) -> (Vec<Fp>, Self::Auxiliary) {
        let (lo, hi) = shift_constant(*value);
        (vec![Fp::from(lo), Fp::from(hi)], ())
    }

    fn value_of_field_elements(fields: Vec<Fp>, _aux: Self::Auxiliary) -> Self::OutOfCircuit {
        assert_eq!(fields.len(), Self::SIZE_IN_FIELD_ELEMENTS);
        let lo: BigUint = fields[0].into();
        let hi: BigUint = fields[1].into();
        fq_of_biguint(lo + (hi << 1) + two_to_255())
    }
}

/// `-2^255 mod q`, split as `(lo, hi)`, after checking that adding `hi` to the
/// high half of a native field element cannot overflow.
fn native_shift() -> SnarkyResult<(Fp, Fp)> {
    let q = scalar_modulus();
    let p: BigUint = Fp::MODULUS.into();
    let shift = (&q - two_to_255() % &q) % &q;
    let (lo, hi) = (shift.bit(0), &shift >> 1);

    // t_hi = s_hi + shift_hi + carry < p/2 + (p/2 - 1) + 1 = p
    if hi >= (p >> 1) - 1u32 {
        return Err(SnarkyCompilationError::InvariantViolation(
            "the shift does not fit in half of the native field".into(),
        )
        .into());
    }

    Ok((Fp::from(lo), Fp::from(hi)))
}

/// Returns `(s & 1, s >> 1)` and the shifted form of `s`.
fn shift_native(
    state: &mut RunState<Fp>,
    loc: Cow<'static, str>,
    s: &FieldVar<Fp>,
) -> SnarkyResult<(Boolean<Fp>, FieldVar<Fp>, ShiftedScalar)> {
    let (shift_lo, shift_hi) = native_shift()?;

    let (s_lo_bool, s_hi) = is_odd_and_high(state, loc.clone(), s)?;
    let s_lo = s_lo_bool.to_field_var();

    // both are bits, so their product is the carry of their sum
    let carry = s_lo.scale(shift_lo).seal(state, loc.clone())?;
    let t_lo = (&s_lo + &FieldVar::constant(shift_lo)) - &carry.scale(Fp::from(2u64));
    let t_lo = t_lo.assert_bool(state, loc.clone())?;
    let t_hi = (&s_hi + &FieldVar::constant(shift_hi) + &carry).seal(state, loc)?;

    Ok((s_lo_bool, s_hi, ShiftedScalar { lo: t_lo, hi: t_hi }))
}

/// Converts a native field element `s < p` to the shifted form of the scalar `s`.
pub fn field_to_shifted_scalar(
    state: &mut RunState<Fp>,
    loc: Cow<'static, str>,
    s: &FieldVar<Fp>,
) -> SnarkyResult<ShiftedScalar> {
    if let Some(s) = s.to_constant() {
        return Ok(ShiftedScalar::from_value(&fq_of_fp(s)));
    }

    let (_, _, shifted) = shift_native(state, loc, s)?;
    Ok(shifted)
}

/// Converts a foreign field element to the shifted form of the scalar it represents.
///
/// The input is asserted to be reduced modulo `q`, and so is the intermediate
/// `t = s - 2^255 mod q`. Otherwise `t + q` would give the same scalar a second bit pattern.
pub fn field3_to_shifted_scalar(
    state: &mut RunState<Fp>,
    loc: Cow<'static, str>,
    s: &Field3<Fp>,
) -> SnarkyResult<ShiftedScalar> {
    let q = scalar_modulus();

    if let Some(s) = s.to_constant() {
        if s >= q {
            return Err(SnarkyCompilationError::ConstantAssertEquals(
                format!("{s} < {q}"),
                "false".into(),
            )
            .into());
        }
        return Ok(ShiftedScalar::from_value(&fq_of_biguint(s)));
    }

    foreign_field::assert_less_than(state, loc.clone(), s, &q)?;

    // t = s - (2^255 mod q)
    let two_to_255 = Field3::from_value(&(two_to_255() % &q));
    let t = foreign_field::sub(state, loc.clone(), s, &two_to_255, &q)?;
    foreign_field::assert_less_than(state, loc.clone(), &t, &q)?;
    let [t0, t1, t2] = t.0;

    // t0 = lo + 2 * (hi0 + 2^64 * hi1), with hi0 < 2^64 and hi1 < 2^23
    let t0_clone = t0.clone();
    let (lo, [hi0, hi1]): (Boolean<Fp>, [FieldVar<Fp>; 2]) =
        state.compute(loc.clone(), move |env| {
            let t0: BigUint = env.read_var(&t0_clone).into();
            let hi = &t0 >> 1;
            let mask = (BigUint::one() << 64) - 1u32;
            (t0.bit(0), [Fp::from(&hi & &mask), Fp::from(hi >> 64)])
        })?;
    range_check64(state, loc.clone(), &hi0)?;
    range_check_bits(state, loc.clone(), &hi1, LIMB_BITS as usize - 65)?;

    let two_to_64 = Fp::from(BigUint::one() << 64);
    let t_hi0 = &hi0 + &hi1.scale(two_to_64);
    let recombined = lo.to_field_var() + &t_hi0.scale(Fp::from(2u64));
    t0.assert_equals(state, loc.clone(), &recombined)?;

    // t >> 1 < q / 2 < p, so packing the limbs cannot overflow
    let limb_shift = |i: u32| Fp::from(BigUint::one() << (i * LIMB_BITS - 1));
    let t_hi = (&t_hi0 + &t1.scale(limb_shift(1)) + &t2.scale(limb_shift(2))).seal(state, loc)?;

    Ok(ShiftedScalar { lo, hi: t_hi })
}

//
// point addition
//

/// The witnesses of the complete addition gate: `[same_x, inf, inf_z, x21_inv, s, x3, y3]`.
fn ec_add_witness((x1, y1): (Fp, Fp), (x2, y2): (Fp, Fp)) -> [Fp; 7] {
    let same_x = x1 == x2;
    let inf = same_x && y1 != y2;
    let inf_z = if same_x {
        (y2 - y1).inverse().unwrap_or_default()
    } else {
        Fp::zero()
    };
    let x21_inv = (x2 - x1).inverse().unwrap_or_default();

    let s = if same_x {
        let x1_squared = x1.square();
        (x1_squared.double() + x1_squared) * y1.double().inverse().unwrap_or_default()
    } else {
        (y2 - y1) * x21_inv
    };

    let x3 = s.square() - x1 - x2;
    let y3 = s * (x1 - x3) - y1;

    [
        Fp::from(same_x),
        Fp::from(inf),
        inf_z,
        x21_inv,
        s,
        x3,
        y3,
    ]
}

/// Complete addition of two points, returning the sum and whether it is the point at infinity.
/// When it is, the returned coordinates are meaningless.
pub fn add(
    state: &mut RunState<Fp>,
    loc: Cow<'static, str>,
    g: &Point,
    h: &Point,
) -> SnarkyResult<(Point, Boolean<Fp>)> {
    if let (Some(g), Some(h)) = (g.to_constant_value(), h.to_constant_value()) {
        let [_, inf, _, _, _, x3, y3] = ec_add_witness(g, h);
        let result = Point {
            x: FieldVar::constant(x3),
            y: FieldVar::constant(y3),
        };
        return Ok((result, Boolean::constant(inf.is_one())));
    }

    let (g_clone, h_clone) = (g.clone(), h.clone());
    let witnesses = state.exists(7, move |env| {
        let g = g_clone.read(&*env);
        let h = h_clone.read(&*env);
        Ok(ec_add_witness(g, h).to_vec())
    })?;
    let [same_x, inf, inf_z, x21_inv, s, x3, y3]: [FieldVar<Fp>; 7] =
        std::array::from_fn(|i| witnesses[i].clone());

    let is_infinity = inf.assert_bool(state, loc.clone())?;
    let g = g.seal(state, loc.clone())?;
    let h = h.seal(state, loc.clone())?;

    let constraint = KimchiConstraint::EcAdd {
        p1: (g.x, g.y),
        p2: (h.x, h.y),
        p3: (x3.clone(), y3.clone()),
        inf,
        same_x,
        slope: s,
        inf_z,
        x21_inv,
    };
    state.add_constraint(
        Constraint::KimchiConstraint(constraint),
        Some("ec_add".into()),
        loc,
    )?;

    Ok((Point { x: x3, y: y3 }, is_infinity))
}

/// [add], asserting that the result is not the point at infinity.
pub fn add_non_zero(
    state: &mut RunState<Fp>,
    loc: Cow<'static, str>,
    g: &Point,
    h: &Point,
) -> SnarkyResult<Point> {
    let (result, is_infinity) = add(state, loc.clone(), g, h)?;
    is_infinity.assert_false(state, loc)?;
    Ok(result)
}

pub fn negate(g: &Point) -> Point {
    Point {
        x: g.x.clone(),
        y: -&g.y,
    }
}

//
// scalar multiplication
//

/// Computes `(2 * scalar + 1 + 2^num_bits) * base` with the native scalar multiplication gate,
/// along with the decomposition of `scalar` in `num_bits` bits, least significant first.
///
/// The gate is not satisfiable if `scalar` does not fit in `num_bits` bits,
/// or if one of the incomplete additions of the double-and-add degenerates.
pub fn scale_fast_unpack(
    state: &mut RunState<Fp>,
    loc: Cow<'static, str>,
    base: &Point,
    scalar: &FieldVar<Fp>,
    num_bits: usize,
) -> SnarkyResult<(Point, Vec<FieldVar<Fp>>)> {
    let base = base.seal(state, loc.clone())?;
    let scalar = scalar.seal(state, loc.clone())?;

    let (base_clone, scalar_clone) = (base.clone(), scalar.clone());
    let mut witnesses = state.exists(2 + num_bits, move |env| {
        let base = base_clone.read(&*env);
        let scalar: BigUint = env.read_var(&scalar_clone).into();
        let bits: Vec<bool> = (0..num_bits as u64).map(|i| scalar.bit(i)).collect();
        let (x, y) = varbase_mul(base, &bits).unwrap_or_else(|| {
            debug!("scale_fast_unpack: degenerate scalar, the gate will not be satisfied");
            (Fp::zero(), Fp::zero())
        });
        let mut res = vec![x, y];
        res.extend(bits.into_iter().map(Fp::from));
        Ok(res)
    })?;
    let bits = witnesses.split_off(2);
    let result = Point {
        x: witnesses[0].clone(),
        y: witnesses[1].clone(),
    };

    let constraint = KimchiConstraint::ScaleFastUnpack {
        base: (base.x, base.y),
        scalar,
        bits: bits.clone(),
        result: (result.x.clone(), result.y.clone()),
    };
    state.add_constraint(
        Constraint::KimchiConstraint(constraint),
        Some("scale_fast_unpack".into()),
        loc,
    )?;

    Ok((result, bits))
}

/// Computes `s * p` for a scalar given as a native field element `s < p`, and `p` not the point at infinity.
pub fn scale_field(
    state: &mut RunState<Fp>,
    loc: Cow<'static, str>,
    p: &Point,
    s: &FieldVar<Fp>,
) -> SnarkyResult<Point> {
    if let (Some(base), Some(s)) = (p.to_constant_value(), s.to_constant()) {
        return Ok(Point::from_value(&scale_constant(base, fq_of_fp(s))));
    }

    let (s_lo, s_hi, t) = shift_native(state, loc.clone(), s)?;

    // the double-and-add fails for s = 0 and s = 1 (q - 2 and q - 1 are out of reach),
    // that is exactly when s_hi = 0
    let is_edge_case = s_hi.equal(state, loc.clone(), &FieldVar::zero())?;
    let t_hi_safe = state.if_(loc.clone(), &is_edge_case, &FieldVar::zero(), &t.hi)?;

    // R = (2 t_hi + 1 + 2^255) P
    let (r, bits) = scale_fast_unpack(state, loc.clone(), p, &t_hi_safe, SCALE_BITS)?;

    // t_hi < 2^254
    bits[HIGH_BITS].assert_equals(state, loc.clone(), &FieldVar::zero())?;

    // R = t_lo ? R : R - P
    // R - P is only zero for s = 0, which is handled below
    let r_minus_p = add_non_zero(state, loc.clone(), &r, &negate(p))?;
    let r = state.select(loc.clone(), &t.lo, &r, &r_minus_p)?;

    let edge_case_result = state.select(loc.clone(), &s_lo, p, &Point::zero())?;
    state.select(loc, &is_edge_case, &edge_case_result, &r)
}

/// Computes `s * p` for a scalar in shifted form whose high part has at most `num_high_bits` bits.
///
/// The two high parts the native gate cannot handle, `q - 2^254` and `q - 2^254 - 1`,
/// give `(2 hi + 1 + 2^255) P = P` and `-P`. When `num_high_bits` is too small for
/// these values to be valid, they are rejected instead.
pub fn scale_shifted(
    state: &mut RunState<Fp>,
    loc: Cow<'static, str>,
    p: &Point,
    t: &ShiftedScalar,
    num_high_bits: usize,
) -> SnarkyResult<Point> {
    if num_high_bits > HIGH_BITS {
        return Err(SnarkyCompilationError::InvalidBitLength(num_high_bits, HIGH_BITS).into());
    }

    if let (Some(base), Some(s)) = (p.to_constant_value(), t.to_constant_value()) {
        return Ok(Point::from_value(&scale_constant(base, s)));
    }

    let minus_shift = scalar_modulus() - (BigUint::one() << HIGH_BITS);
    let edge_case_bits = minus_shift.bits() as usize;
    let minus_shift = Fp::from(minus_shift);

    let equals_minus_shift = t
        .hi
        .equal(state, loc.clone(), &FieldVar::constant(minus_shift))?;
    let equals_minus_shift_minus_1 = t.hi.equal(
        state,
        loc.clone(),
        &FieldVar::constant(minus_shift - Fp::one()),
    )?;
    let is_edge_case = equals_minus_shift.or(&equals_minus_shift_minus_1, state, loc.clone())?;
    if num_high_bits < edge_case_bits {
        is_edge_case.assert_false(state, loc.clone())?;
    }
    let t_hi_safe = state.if_(loc.clone(), &is_edge_case, &FieldVar::zero(), &t.hi)?;

    // R = (2 t_hi + 1 + 2^255) P
    let (r, bits) = scale_fast_unpack(state, loc.clone(), p, &t_hi_safe, SCALE_BITS)?;

    // t_hi < 2^num_high_bits
    for bit in &bits[num_high_bits..] {
        bit.assert_equals(state, loc.clone(), &FieldVar::zero())?;
    }

    // the edge cases give (x, y) and (x, -y)
    let sign = equals_minus_shift.to_field_var().scale(Fp::from(2u64)) - &FieldVar::one();
    let edge_case_y = p.y.mul(&sign, None, loc.clone(), state)?;
    let edge_case_result = Point {
        x: p.x.clone(),
        y: edge_case_y,
    };
    let r = state.select(loc.clone(), &is_edge_case, &edge_case_result, &r)?;

    // R = t_lo ? R : R - P, where R - P is zero for the scalar 0
    let (r_minus_p, is_infinity) = add(state, loc.clone(), &r, &negate(p))?;
    let r_minus_p = state.select(loc.clone(), &is_infinity, &Point::zero(), &r_minus_p)?;
    state.select(loc, &t.lo, &r, &r_minus_p)
}
