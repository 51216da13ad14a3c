use std::borrow::Cow;

use ark_ff::PrimeField;

use crate::{
    constraint_system::BasicSnarkyConstraint,
    cvar::FieldVar,
    errors::SnarkyResult,
    runner::{Constraint, RunState},
    snarky_type::SnarkyType,
};

/// A boolean variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boolean<F: PrimeField>(FieldVar<F>);

impl<F> SnarkyType<F> for Boolean<F>
where
    F: PrimeField,
{
    type Auxiliary = ();

    type OutOfCircuit = bool;

    const SIZE_IN_FIELD_ELEMENTS: usize = 1;

    fn to_cvars(&self) -> (Vec<FieldVar<F>>, Self::Auxiliary) {
        (vec![self.0.clone()], ())
    }

    fn from_cvars_unsafe(cvars: Vec<FieldVar<F>>, _aux: Self::Auxiliary) -> Self {
        assert_eq!(cvars.len(), Self::SIZE_IN_FIELD_ELEMENTS);
        Self(cvars[0].clone())
    }

    fn check(&self, cs: &mut RunState<F>, loc: Cow<'static, str>) -> SnarkyResult<()> {
        let constraint = BasicSnarkyConstraint::Boolean(self.0.clone());
        cs.add_constraint(
            Constraint::BasicSnarkyConstraint(constraint),
            Some("boolean check".into()),
            loc,
        )
    }

    fn constraint_system_auxiliary() -> Self::Auxiliary {}

    fn value_to_field_elements(value: &Self::OutOfCircuit) -> (Vec<F>, Self::Auxiliary) {
        if *value {
            (vec![F::one()], ())
        } else {
            (vec![F::zero()], ())
        }
    }

    fn value_of_field_elements(fields: Vec<F>, _aux: Self::Auxiliary) -> Self::OutOfCircuit {
        assert_eq!(fields.len(), 1);

        fields[0] != F::zero()
    }
}

impl<F> Boolean<F>
where
    F: PrimeField,
{
    pub fn true_() -> Self {
        Self(FieldVar::one())
    }

    pub fn false_() -> Self {
        Self(FieldVar::zero())
    }

    pub fn constant(b: bool) -> Self {
        if b {
            Self::true_()
        } else {
            Self::false_()
        }
    }

    /// Wraps a variable without constraining it to be 0 or 1.
    pub fn create_unsafe(x: FieldVar<F>) -> Self {
        Self(x)
    }

    pub fn to_field_var(&self) -> FieldVar<F> {
        self.0.clone()
    }

    pub fn not(&self) -> Self {
        Self(FieldVar::one() - &self.0)
    }

    pub fn and(
        &self,
        other: &Self,
        cs: &mut RunState<F>,
        loc: Cow<'static, str>,
    ) -> SnarkyResult<Self> {
        let res = self.0.mul(&other.0, Some("bool.and".into()), loc, cs)?;
        Ok(Self(res))
    }

    pub fn or(
        &self,
        other: &Self,
        cs: &mut RunState<F>,
        loc: Cow<'static, str>,
    ) -> SnarkyResult<Self> {
        let both_false = self.not().and(&other.not(), cs, loc)?;
        Ok(both_false.not())
    }

    pub fn any(xs: &[&Self], cs: &mut RunState<F>, loc: Cow<'static, str>) -> SnarkyResult<Self> {
        match xs {
            [] => return Ok(Self::false_()),
            [x] => return Ok((*x).clone()),
            [x, y] => return x.or(y, cs, loc),
            _ => (),
        }

        let xs: Vec<_> = xs.iter().map(|x| &x.0).collect();
        let sum = FieldVar::sum(&xs);
        let all_zero = sum.equal(cs, loc, &FieldVar::zero())?;

        Ok(all_zero.not())
    }

    pub fn all(xs: &[Self], cs: &mut RunState<F>, loc: Cow<'static, str>) -> SnarkyResult<Self> {
        match xs {
            [] => return Ok(Self::true_()),
            [x] => return Ok(x.clone()),
            [x, y] => return x.and(y, cs, loc),
            _ => (),
        }

        let expected = FieldVar::Constant(F::from(xs.len() as u64));
        let xs: Vec<_> = xs.iter().map(|x| &x.0).collect();
        let sum = FieldVar::sum(&xs);

        sum.equal(cs, loc, &expected)
    }

    pub fn to_constant(&self) -> Option<bool> {
        self.0.to_constant().map(|x| x == F::one())
    }

    pub fn xor(
        &self,
        other: &Self,
        state: &mut RunState<F>,
        loc: Cow<'static, str>,
    ) -> SnarkyResult<Self> {
        let res = match (self.to_constant(), other.to_constant()) {
            (Some(true), _) => other.not(),
            (_, Some(true)) => self.not(),
            (Some(false), _) => other.clone(),
            (_, Some(false)) => self.clone(),
            (None, None) => {
                /*
                   (1 - 2 a) (1 - 2 b) = 1 - 2 c
                1 - 2 (a + b) + 4 a b = 1 - 2 c
                - 2 (a + b) + 4 a b = - 2 c
                (a + b) - 2 a b = c
                2 a b = a + b - c
                 */

                let self_clone = self.clone();
                let other_clone = other.clone();
                let res: Boolean<F> = state.compute_unsafe(loc.clone(), move |env| {
                    let b1: bool = self_clone.read(env);
                    let b2: bool = other_clone.read(env);
                    b1 != b2
                })?;

                let x = &self.0 + &self.0;
                let y = &other.0;
                let z = &self.0 + &other.0 - &res.0;

                state.assert_r1cs(Some("xor".into()), loc, x, y.clone(), z)?;

                res
            }
        };

        Ok(res)
    }

    pub fn assert_true(&self, state: &mut RunState<F>, loc: Cow<'static, str>) -> SnarkyResult<()> {
        self.0.assert_equals(state, loc, &FieldVar::one())
    }

    pub fn assert_false(&self, state: &mut RunState<F>, loc: Cow<'static, str>) -> SnarkyResult<()> {
        self.0.assert_equals(state, loc, &FieldVar::zero())
    }
}
