//! A provable Pallas point.
//!
//! Unlike the raw [Point] the gadgets of [crate::native_curve] work with,
//! a [Group] is always either on the curve or the point at infinity `(0, 0)`,
//! and its operations handle the point at infinity.

use std::borrow::Cow;

use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::Field;
use mina_curves::pasta::{Fp, Pallas};

use crate::{
    boolean::Boolean,
    cvar::FieldVar,
    errors::SnarkyResult,
    native_curve::{self, from_coordinates, to_coordinates, Point, ShiftedScalar, HIGH_BITS},
    runner::RunState,
    snarky_type::SnarkyType,
};

/// `b` in `y^2 = x^3 + b`.
const PALLAS_B: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub x: FieldVar<Fp>,
    pub y: FieldVar<Fp>,
}

impl SnarkyType<Fp> for Group {
    type Auxiliary = ();

    type OutOfCircuit = Pallas;

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

    /// `(1 - is_zero) * (y^2 - x^3 - b) = 0`
    fn check(&self, cs: &mut RunState<Fp>, loc: Cow<'static, str>) -> SnarkyResult<()> {
        let is_zero = self.is_zero(cs, loc.clone())?;

        let x_squared = self.x.square(loc.clone(), cs)?;
        let x_cubed = x_squared.mul(&self.x, Some("group.check".into()), loc.clone(), cs)?;
        let y_squared = self.y.square(loc.clone(), cs)?;
        let curve_eq = y_squared - &x_cubed - &FieldVar::constant(Fp::from(PALLAS_B));

        cs.assert_r1cs(
            Some("group.check".into()),
            loc,
            is_zero.not().to_field_var(),
            curve_eq,
            FieldVar::zero(),
        )
    }

    fn constraint_system_auxiliary() -> Self::Auxiliary {}

    fn value_to_field_elements(value: &Self::OutOfCircuit) -> (Vec<Fp>, Self::Auxiliary) {
        let (x, y) = to_coordinates(value);
        (vec![x, y], ())
    }

    fn value_of_field_elements(fields: Vec<Fp>, _aux: Self::Auxiliary) -> Self::OutOfCircuit {
        assert_eq!(fields.len(), Self::SIZE_IN_FIELD_ELEMENTS);
        from_coordinates((fields[0], fields[1]))
    }
}

impl Group {
    pub fn generator() -> Self {
        Self::from_value(&Pallas::generator())
    }

    pub fn zero() -> Self {
        Self::from_value(&Pallas::zero())
    }

    fn to_point(&self) -> Point {
        Point {
            x: self.x.clone(),
            y: self.y.clone(),
        }
    }

    fn from_point(p: Point) -> Self {
        Self { x: p.x, y: p.y }
    }

    pub fn is_zero(
        &self,
        state: &mut RunState<Fp>,
        loc: Cow<'static, str>,
    ) -> SnarkyResult<Boolean<Fp>> {
        // no point of the curve has x = 0, as 5 is not a square
        let x_zero = self.x.equal(state, loc.clone(), &FieldVar::zero())?;
        let y_zero = self.y.equal(state, loc.clone(), &FieldVar::zero())?;
        x_zero.and(&y_zero, state, loc)
    }

    pub fn neg(&self) -> Self {
        Self::from_point(native_curve::negate(&self.to_point()))
    }

    pub fn add(
        &self,
        state: &mut RunState<Fp>,
        loc: Cow<'static, str>,
        other: &Self,
    ) -> SnarkyResult<Self> {
        if let (Some(g), Some(h)) = (self.to_constant_value(), other.to_constant_value()) {
            return Ok(Self::from_value(&(g + h).into_affine()));
        }

        let (sum, is_infinity) =
            native_curve::add(state, loc.clone(), &self.to_point(), &other.to_point())?;

        let self_zero = self.is_zero(state, loc.clone())?;
        let other_zero = other.is_zero(state, loc.clone())?;

        // a zero operand never shares its x coordinate with the other one,
        // unless both are zero, so `is_infinity` implies both are non-zero
        let both_zero = self_zero.and(&other_zero, state, loc.clone())?;
        let only_self_zero = self_zero.and(&other_zero.not(), state, loc.clone())?;
        let only_other_zero = other_zero.and(&self_zero.not(), state, loc.clone())?;
        let special = Boolean::any(
            &[&both_zero, &only_self_zero, &only_other_zero, &is_infinity],
            state,
            loc.clone(),
        )?;

        state.switch(
            loc,
            &[
                both_zero,
                only_self_zero,
                only_other_zero,
                is_infinity,
                special.not(),
            ],
            &[
                Self::zero(),
                other.clone(),
                self.clone(),
                Self::zero(),
                Self::from_point(sum),
            ],
        )
    }

    pub fn sub(
        &self,
        state: &mut RunState<Fp>,
        loc: Cow<'static, str>,
        other: &Self,
    ) -> SnarkyResult<Self> {
        self.add(state, loc, &other.neg())
    }

    /// `s * self`, for a scalar given as a native field element.
    pub fn scale(
        &self,
        state: &mut RunState<Fp>,
        loc: Cow<'static, str>,
        s: &FieldVar<Fp>,
    ) -> SnarkyResult<Self> {
        self.scale_with(state, loc, |state, loc, base| {
            native_curve::scale_field(state, loc, base, s)
        })
    }

    /// `s * self`, for any scalar.
    pub fn scale_shifted(
        &self,
        state: &mut RunState<Fp>,
        loc: Cow<'static, str>,
        s: &ShiftedScalar,
    ) -> SnarkyResult<Self> {
        self.scale_with(state, loc, |state, loc, base| {
            native_curve::scale_shifted(state, loc, base, s, HIGH_BITS)
        })
    }

    /// The scalar multiplication gadgets require a non-zero base:
    /// the generator stands in for zero, and the result is discarded.
    fn scale_with<FUNC>(
        &self,
        state: &mut RunState<Fp>,
        loc: Cow<'static, str>,
        scale: FUNC,
    ) -> SnarkyResult<Self>
    where
        FUNC: FnOnce(&mut RunState<Fp>, Cow<'static, str>, &Point) -> SnarkyResult<Point>,
    {
        let is_zero = self.is_zero(state, loc.clone())?;
        let base = state.select(loc.clone(), &is_zero, &Self::generator(), self)?;
        let res = Self::from_point(scale(state, loc.clone(), &base.to_point())?);
        state.select(loc, &is_zero, &Self::zero(), &res)
    }

    pub fn assert_equals(
        &self,
        state: &mut RunState<Fp>,
        loc: Cow<'static, str>,
        other: &Self,
    ) -> SnarkyResult<()> {
        self.x.assert_equals(state, loc.clone(), &other.x)?;
        self.y.assert_equals(state, loc, &other.y)
    }

    pub fn equals(
        &self,
        state: &mut RunState<Fp>,
        loc: Cow<'static, str>,
        other: &Self,
    ) -> SnarkyResult<Boolean<Fp>> {
        let x_eq = self.x.equal(state, loc.clone(), &other.x)?;
        let y_eq = self.y.equal(state, loc.clone(), &other.y)?;
        x_eq.and(&y_eq, state, loc)
    }
}

/// Whether a pair of coordinates is a valid out-of-circuit [Group] value.
pub fn is_valid(p: &Pallas) -> bool {
    let (x, y) = to_coordinates(p);
    p.infinity || y.square() == x.square() * x + Fp::from(PALLAS_B)
}
