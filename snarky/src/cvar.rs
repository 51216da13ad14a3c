//! Circuit variables: field elements that are either known at compile time,
//! or linear combinations of variables whose values only the prover knows.

use std::{
    borrow::Cow,
    ops::{Add, Neg, Sub},
};

use ark_ff::PrimeField;

use crate::{
    boolean::Boolean,
    constraint_system::BasicSnarkyConstraint,
    errors::{SnarkyCompilationError, SnarkyResult},
    runner::{Constraint, RunState, WitnessGeneration},
    snarky_type::SnarkyType,
};

/// A circuit variable represents a field element in the circuit.
/// Linear combinations are free: only multiplications (and the gadgets built
/// on top of them) add constraints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldVar<F>
where
    F: PrimeField,
{
    Constant(F),
    Var(usize),
    Add(Box<FieldVar<F>>, Box<FieldVar<F>>),
    Scale(F, Box<FieldVar<F>>),
}

pub type Term<F> = (F, usize);

pub type ScaledCVar<F> = (F, FieldVar<F>);

impl<F> FieldVar<F>
where
    F: PrimeField,
{
    pub fn constant(c: F) -> Self {
        FieldVar::Constant(c)
    }

    pub fn zero() -> Self {
        FieldVar::Constant(F::zero())
    }

    pub fn one() -> Self {
        FieldVar::Constant(F::one())
    }

    fn eval_inner(&self, context: &impl Fn(usize) -> F, scale: F, res: &mut F) {
        match self {
            FieldVar::Constant(c) => {
                *res += scale * c;
            }
            FieldVar::Var(v) => {
                let v = context(*v);
                *res += scale * v;
            }
            FieldVar::Add(a, b) => {
                a.eval_inner(context, scale, res);
                b.eval_inner(context, scale, res);
            }
            FieldVar::Scale(s, v) => {
                v.eval_inner(context, scale * s, res);
            }
        }
    }

    /// Evaluate the field element associated to a variable (used during witness generation)
    pub fn eval(&self, context: &impl Fn(usize) -> F) -> F {
        let mut res = F::zero();
        self.eval_inner(context, F::one(), &mut res);
        res
    }

    fn to_constant_and_terms_inner(
        &self,
        scale: F,
        constant: F,
        terms: Vec<Term<F>>,
    ) -> (F, Vec<Term<F>>) {
        match self {
            FieldVar::Constant(c) => (constant + (scale * c), terms),
            FieldVar::Var(v) => {
                let mut new_terms = vec![(scale, *v)];
                new_terms.extend(terms);
                (constant, new_terms)
            }
            FieldVar::Scale(s, t) => t.to_constant_and_terms_inner(scale * s, constant, terms),
            FieldVar::Add(x1, x2) => {
                let (c1, terms1) = x1.to_constant_and_terms_inner(scale, constant, terms);
                x2.to_constant_and_terms_inner(scale, c1, terms1)
            }
        }
    }

    pub fn to_constant_and_terms(&self) -> (Option<F>, Vec<Term<F>>) {
        let (constant, terms) = self.to_constant_and_terms_inner(F::one(), F::zero(), vec![]);
        let constant = if constant.is_zero() {
            None
        } else {
            Some(constant)
        };
        (constant, terms)
    }

    /// Returns the value if this variable does not depend on any prover input.
    pub fn to_constant(&self) -> Option<F> {
        match self {
            FieldVar::Constant(c) => Some(*c),
            FieldVar::Var(_) => None,
            _ => {
                let (constant, terms) = self.to_constant_and_terms();
                terms.is_empty().then(|| constant.unwrap_or_else(F::zero))
            }
        }
    }

    pub fn is_constant(&self) -> bool {
        self.to_constant().is_some()
    }

    pub fn scale(&self, scalar: F) -> Self {
        if scalar.is_zero() {
            return FieldVar::Constant(scalar);
        } else if scalar.is_one() {
            return self.clone();
        }

        match self {
            FieldVar::Constant(x) => FieldVar::Constant(*x * scalar),
            FieldVar::Scale(s, v) => FieldVar::Scale(*s * scalar, v.clone()),
            FieldVar::Var(_) | FieldVar::Add(..) => FieldVar::Scale(scalar, Box::new(self.clone())),
        }
    }

    pub fn linear_combination(terms: &[ScaledCVar<F>]) -> Self {
        let mut res = FieldVar::zero();
        for (cst, term) in terms {
            res = res.add(&term.scale(*cst));
        }
        res
    }

    pub fn sum(vs: &[&Self]) -> Self {
        let terms: Vec<_> = vs.iter().map(|v| (F::one(), (*v).clone())).collect();
        Self::linear_combination(&terms)
    }

    pub fn mul(
        &self,
        other: &Self,
        label: Option<Cow<'static, str>>,
        loc: Cow<'static, str>,
        cs: &mut RunState<F>,
    ) -> SnarkyResult<Self> {
        let res = match (self.to_constant(), other.to_constant()) {
            (Some(x), Some(y)) => FieldVar::Constant(x * y),

            (Some(cst), _) | (_, Some(cst)) if cst.is_zero() => FieldVar::zero(),

            (Some(cst), None) => other.scale(cst),
            (None, Some(cst)) => self.scale(cst),

            (None, None) => {
                let self_clone = self.clone();
                let other_clone = other.clone();
                let res: FieldVar<F> = cs.compute(loc.clone(), move |env| {
                    let x: F = env.read_var(&self_clone);
                    let y: F = env.read_var(&other_clone);
                    x * y
                })?;

                let label = label.or(Some("checked_mul".into()));

                cs.assert_r1cs(label, loc, self.clone(), other.clone(), res.clone())?;
                res
            }
        };

        Ok(res)
    }

    pub fn square(&self, loc: Cow<'static, str>, cs: &mut RunState<F>) -> SnarkyResult<Self> {
        if let Some(x) = self.to_constant() {
            return Ok(FieldVar::Constant(x.square()));
        }

        let self_clone = self.clone();
        let res: FieldVar<F> = cs.compute(loc.clone(), move |env| {
            let x: F = env.read_var(&self_clone);
            x.square()
        })?;
        cs.assert_square(Some("square".into()), loc, self.clone(), res.clone())?;
        Ok(res)
    }

    /// Replaces a (possibly long) linear combination by a single fresh variable.
    /// Gates that wire their inputs directly need this.
    pub fn seal(&self, cs: &mut RunState<F>, loc: Cow<'static, str>) -> SnarkyResult<Self> {
        match self {
            FieldVar::Constant(_) | FieldVar::Var(_) => Ok(self.clone()),
            _ => {
                if let Some(c) = self.to_constant() {
                    return Ok(FieldVar::Constant(c));
                }
                let self_clone = self.clone();
                let res: FieldVar<F> =
                    cs.compute(loc.clone(), move |env| env.read_var(&self_clone))?;
                cs.assert_eq(Some("seal".into()), loc, self.clone(), res.clone())?;
                Ok(res)
            }
        }
    }

    /// [equal_constraints z z_inv r] asserts that
    /// if z = 0 then r = 1, or
    /// if z <> 0 then r = 0 and z * z_inv = 1
    fn equal_constraints(
        state: &mut RunState<F>,
        loc: Cow<'static, str>,
        z: Self,
        z_inv: Self,
        r: Self,
    ) -> SnarkyResult<()> {
        let one_minus_r = FieldVar::one() - &r;
        let zero = FieldVar::zero();
        state.assert_r1cs(Some("equals_1".into()), loc.clone(), z_inv, z.clone(), one_minus_r)?;
        state.assert_r1cs(Some("equals_2".into()), loc, r, z, zero)
    }

    /// [equal_vars z] computes [(r, z_inv)] that satisfy the constraints in
    /// [equal_constraints z z_inv r].
    ///
    /// In particular, [r] is [1] if [z = 0] and [0] otherwise.
    fn equal_vars(env: &dyn WitnessGeneration<F>, z: &FieldVar<F>) -> (F, F) {
        let z: F = env.read_var(z);
        if let Some(z_inv) = z.inverse() {
            (F::zero(), z_inv)
        } else {
            (F::one(), F::zero())
        }
    }

    pub fn equal(
        &self,
        state: &mut RunState<F>,
        loc: Cow<'static, str>,
        other: &FieldVar<F>,
    ) -> SnarkyResult<Boolean<F>> {
        let z = self - other;
        match z.to_constant() {
            Some(z) => Ok(if z.is_zero() {
                Boolean::true_()
            } else {
                Boolean::false_()
            }),
            None => {
                let z_clone = z.clone();
                let (res, z_inv): (FieldVar<F>, FieldVar<F>) =
                    state.compute(loc.clone(), move |env| Self::equal_vars(env, &z_clone))?;
                Self::equal_constraints(state, loc, z, z_inv, res.clone())?;

                Ok(Boolean::create_unsafe(res))
            }
        }
    }

    pub fn assert_equals(
        &self,
        state: &mut RunState<F>,
        loc: Cow<'static, str>,
        other: &FieldVar<F>,
    ) -> SnarkyResult<()> {
        match (self.to_constant(), other.to_constant()) {
            (Some(x), Some(y)) if x == y => Ok(()),
            (Some(x), Some(y)) => Err(SnarkyCompilationError::ConstantAssertEquals(
                x.to_string(),
                y.to_string(),
            )
            .into()),
            _ => state.assert_eq(Some("assert_equals".into()), loc, self.clone(), other.clone()),
        }
    }

    /// Constrains this variable to be 0 or 1 and returns it as a [Boolean].
    pub fn assert_bool(
        &self,
        state: &mut RunState<F>,
        loc: Cow<'static, str>,
    ) -> SnarkyResult<Boolean<F>> {
        match self.to_constant() {
            Some(x) if x.is_zero() || x.is_one() => Ok(Boolean::create_unsafe(self.clone())),
            Some(x) => Err(SnarkyCompilationError::ConstantAssertBoolean(x.to_string()).into()),
            None => {
                let constraint = BasicSnarkyConstraint::Boolean(self.clone());
                state.add_constraint(
                    Constraint::BasicSnarkyConstraint(constraint),
                    Some("assert_bool".into()),
                    loc,
                )?;
                Ok(Boolean::create_unsafe(self.clone()))
            }
        }
    }
}

//
// Our Traits
//

impl<F> SnarkyType<F> for FieldVar<F>
where
    F: PrimeField,
{
    type Auxiliary = ();

    type OutOfCircuit = F;

    const SIZE_IN_FIELD_ELEMENTS: usize = 1;

    fn to_cvars(&self) -> (Vec<FieldVar<F>>, Self::Auxiliary) {
        (vec![self.clone()], ())
    }

    fn from_cvars_unsafe(cvars: Vec<FieldVar<F>>, _aux: Self::Auxiliary) -> Self {
        assert_eq!(cvars.len(), Self::SIZE_IN_FIELD_ELEMENTS);
        cvars[0].clone()
    }

    fn check(&self, _cs: &mut RunState<F>, _loc: Cow<'static, str>) -> SnarkyResult<()> {
        // do nothing
        Ok(())
    }

    fn constraint_system_auxiliary() -> Self::Auxiliary {}

    fn value_to_field_elements(x: &Self::OutOfCircuit) -> (Vec<F>, Self::Auxiliary) {
        (vec![*x], ())
    }

    fn value_of_field_elements(fields: Vec<F>, _aux: Self::Auxiliary) -> Self::OutOfCircuit {
        assert_eq!(fields.len(), 1);

        fields[0]
    }
}

//
// Operations
//

impl<F> Add for &FieldVar<F>
where
    F: PrimeField,
{
    type Output = FieldVar<F>;

    fn add(self, other: Self) -> Self::Output {
        match (self, other) {
            (FieldVar::Constant(x), y) | (y, FieldVar::Constant(x)) if x.is_zero() => y.clone(),
            (FieldVar::Constant(x), FieldVar::Constant(y)) => FieldVar::Constant(*x + y),
            (_, _) => FieldVar::Add(Box::new(self.clone()), Box::new(other.clone())),
        }
    }
}

impl<'a, F> Add<&'a Self> for FieldVar<F>
where
    F: PrimeField,
{
    type Output = FieldVar<F>;

    fn add(self, other: &Self) -> Self::Output {
        (&self).add(other)
    }
}

impl<F> Add<FieldVar<F>> for &FieldVar<F>
where
    F: PrimeField,
{
    type Output = FieldVar<F>;

    fn add(self, other: FieldVar<F>) -> Self::Output {
        self.add(&other)
    }
}

impl<F> Add for FieldVar<F>
where
    F: PrimeField,
{
    type Output = FieldVar<F>;

    fn add(self, other: FieldVar<F>) -> Self::Output {
        (&self).add(&other)
    }
}

impl<F> Sub for &FieldVar<F>
where
    F: PrimeField,
{
    type Output = FieldVar<F>;

    fn sub(self, other: Self) -> Self::Output {
        match (self, other) {
            (FieldVar::Constant(x), FieldVar::Constant(y)) => FieldVar::Constant(*x - y),
            _ => self.add(&other.scale(-F::one())),
        }
    }
}

impl<'a, F> Sub<&'a FieldVar<F>> for FieldVar<F>
where
    F: PrimeField,
{
    type Output = FieldVar<F>;

    fn sub(self, other: &Self) -> Self::Output {
        (&self).sub(other)
    }
}

impl<F> Sub<FieldVar<F>> for &FieldVar<F>
where
    F: PrimeField,
{
    type Output = FieldVar<F>;

    fn sub(self, other: FieldVar<F>) -> Self::Output {
        self.sub(&other)
    }
}

impl<F> Sub for FieldVar<F>
where
    F: PrimeField,
{
    type Output = FieldVar<F>;

    fn sub(self, other: FieldVar<F>) -> Self::Output {
        (&self).sub(&other)
    }
}

impl<F> Neg for &FieldVar<F>
where
    F: PrimeField,
{
    type Output = FieldVar<F>;

    fn neg(self) -> Self::Output {
        self.scale(-F::one())
    }
}

impl<F> Neg for FieldVar<F>
where
    F: PrimeField,
{
    type Output = FieldVar<F>;

    fn neg(self) -> Self::Output {
        self.scale(-F::one())
    }
}
