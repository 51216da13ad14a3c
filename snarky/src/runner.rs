//! The circuit-generation and witness-generation logic.

use std::{
    borrow::Cow,
    future::Future,
    ops::{Deref, DerefMut},
};

use ark_ff::PrimeField;
use log::{debug, trace};

use crate::{
    api::Witness,
    boolean::Boolean,
    constraint_system::{BasicSnarkyConstraint, KimchiConstraint, SnarkyConstraintSystem},
    cvar::FieldVar,
    errors::{SnarkyCompilationError, SnarkyError, SnarkyResult, SnarkyRuntimeError},
    snarky_type::SnarkyType,
};

/// A wrapper around [Constraint] that allows for an optional label (for debugging),
/// and remembers where in the code it was created.
#[derive(Debug, Clone)]
pub struct AnnotatedConstraint<F: PrimeField> {
    annotation: Option<Cow<'static, str>>,
    loc: Cow<'static, str>,
    constraint: Constraint<F>,
}

impl<F> AnnotatedConstraint<F>
where
    F: PrimeField,
{
    /// In witness generation, this checks if the constraint is satisfied by some witness values.
    pub fn check_constraint(&self, env: &impl WitnessGeneration<F>) -> SnarkyResult<()> {
        let res = match &self.constraint {
            Constraint::BasicSnarkyConstraint(c) => c.check_constraint(env),
            Constraint::KimchiConstraint(c) => c.check_constraint(env),
        };
        res.map_err(|err| {
            debug!(
                "unsatisfied constraint `{}` at {}: {err}",
                self.annotation.as_deref().unwrap_or("<unknown>"),
                self.loc
            );
            SnarkyError::RuntimeError(err)
        })
    }
}

/// An enum that wraps either a [BasicSnarkyConstraint] or a [KimchiConstraint].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint<F: PrimeField> {
    /// Old R1CS-like constraints.
    BasicSnarkyConstraint(BasicSnarkyConstraint<FieldVar<F>>),

    /// Native gates.
    KimchiConstraint(KimchiConstraint<FieldVar<F>>),
}

/// A snapshot of where we are in the construction of a circuit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnarkContext {
    /// Set while running the body of a circuit (compilation or witness generation).
    /// When unset, every value is a constant and no constraint is recorded.
    pub in_checked_computation: bool,

    /// Set while a witness is being computed.
    /// Witnessing does not nest: inside such a block values are computed eagerly.
    pub in_witness_block: bool,
}

/// Pops the context it was created with when dropped.
/// Dereferences to the underlying [RunState].
pub struct ContextGuard<'a, F>
where
    F: PrimeField,
{
    state: &'a mut RunState<F>,
    depth: usize,
}

impl<F: PrimeField> Deref for ContextGuard<'_, F> {
    type Target = RunState<F>;

    fn deref(&self) -> &Self::Target {
        self.state
    }
}

impl<F: PrimeField> DerefMut for ContextGuard<'_, F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.state
    }
}

impl<F: PrimeField> Drop for ContextGuard<'_, F> {
    fn drop(&mut self) {
        trace!("leaving context (depth {})", self.depth);
        self.state.context.truncate(self.depth);
    }
}

/// The state used when compiling a circuit in snarky, or used in witness generation as well.
#[derive(Debug)]
pub struct RunState<F>
where
    F: PrimeField,
{
    /// The constraint system used to build the circuit.
    /// If not set, the constraint system is not built.
    pub system: Option<SnarkyConstraintSystem<F>>,

    /// The public input of the circuit used in witness generation.
    public_input: Vec<F>,

    /// The values of the variables created after the public input, during witness generation.
    private_input: Vec<F>,

    /// If set, the witness generation will check if the constraints are satisfied.
    /// This is useful to simulate running the circuit and return an error if an assertion fails.
    pub eval_constraints: bool,

    /// The size of the public input part.
    num_public_inputs: usize,

    /// A counter used to track variables (this includes public inputs) as they're being created.
    pub next_var: usize,

    /// Indication that we're running the witness generation.
    /// This does not necessarily mean that constraints are not created,
    /// as we can do both at the same time.
    pub has_witness: bool,

    /// Stack of contexts. The bottom one is never popped.
    context: Vec<SnarkContext>,
}

//
// witness generation
//

/// A witness generation environment.
/// This is passed to any closure in [RunState::compute] so that they can access the witness generation environment.
pub trait WitnessGeneration<F>
where
    F: PrimeField,
{
    /// Allows the caller to obtain the value behind a circuit variable.
    fn read_var(&self, var: &FieldVar<F>) -> F;
}

impl<F: PrimeField, G: WitnessGeneration<F>> WitnessGeneration<F> for &G {
    fn read_var(&self, var: &FieldVar<F>) -> F {
        G::read_var(*self, var)
    }
}

impl<F: PrimeField> WitnessGeneration<F> for &dyn WitnessGeneration<F> {
    fn read_var(&self, var: &FieldVar<F>) -> F {
        (**self).read_var(var)
    }
}

impl<F> WitnessGeneration<F> for RunState<F>
where
    F: PrimeField,
{
    fn read_var(&self, var: &FieldVar<F>) -> F {
        var.eval(&|idx| self.read_var_idx(idx))
    }
}

impl<F> RunState<F>
where
    F: PrimeField,
{
    /// Creates a new [Self] for running the body of a circuit.
    pub fn new(public_input_size: usize, with_system: bool) -> Self {
        // create the CS
        let system = with_system.then(|| {
            let mut system = SnarkyConstraintSystem::create();
            system.set_primary_input_size(public_input_size);
            system
        });

        // create the runner
        let mut sys = Self {
            system,
            public_input: Vec::with_capacity(public_input_size),
            private_input: vec![],
            eval_constraints: false,
            num_public_inputs: public_input_size,
            next_var: 0,
            has_witness: false,
            context: vec![SnarkContext {
                in_checked_computation: true,
                in_witness_block: false,
            }],
        };

        // allocate the public inputs
        for _ in 0..public_input_size {
            sys.alloc_var();
        }

        sys
    }

    /// Creates a state outside of any circuit:
    /// witnesses are computed on the spot and returned as constants,
    /// and assertions are checked immediately.
    pub fn unchecked() -> Self {
        Self {
            system: None,
            public_input: vec![],
            private_input: vec![],
            eval_constraints: true,
            num_public_inputs: 0,
            next_var: 0,
            has_witness: true,
            context: vec![SnarkContext::default()],
        }
    }

    /// Used internaly to evaluate variables.
    /// Can panic if used with a wrong index.
    pub fn read_var_idx(&self, idx: usize) -> F {
        if idx < self.num_public_inputs {
            self.public_input[idx]
        } else {
            self.private_input[idx - self.num_public_inputs]
        }
    }

    pub fn public_input<T: SnarkyType<F>>(&self) -> T {
        assert_eq!(T::SIZE_IN_FIELD_ELEMENTS, self.num_public_inputs);

        let cvars = (0..T::SIZE_IN_FIELD_ELEMENTS).map(FieldVar::Var).collect();
        let aux = T::constraint_system_auxiliary();
        T::from_cvars_unsafe(cvars, aux)
    }

    /// Allocates a new var representing a private input.
    pub fn alloc_var(&mut self) -> FieldVar<F> {
        let v = self.next_var;
        self.next_var += 1;
        FieldVar::Var(v)
    }

    /// Stores a field element as an unconstrained private input.
    pub fn store_field_elt(&mut self, x: F) -> FieldVar<F> {
        let v = self.next_var;
        self.next_var += 1;
        self.private_input.push(x);
        FieldVar::Var(v)
    }

    //
    // contexts
    //

    /// The current context.
    pub fn context(&self) -> SnarkContext {
        self.context.last().copied().unwrap_or_default()
    }

    pub fn in_checked_computation(&self) -> bool {
        self.context().in_checked_computation
    }

    pub fn in_witness_block(&self) -> bool {
        self.context().in_witness_block
    }

    /// Pushes a context, which is popped again when the returned guard goes out of scope.
    /// This happens on every exit path, including errors, panics, and dropped futures.
    pub fn enter(&mut self, ctx: SnarkContext) -> ContextGuard<'_, F> {
        let depth = self.context.len();
        trace!("entering context {ctx:?} (depth {depth})");
        self.context.push(ctx);
        ContextGuard { state: self, depth }
    }

    /// Whether values have to be computed right away instead of being allocated as variables.
    fn computes_eagerly(&self) -> bool {
        let ctx = self.context();
        !ctx.in_checked_computation || ctx.in_witness_block
    }

    //
    // creating variables
    //

    /// Declares `size` fresh variables.
    /// `compute` produces their values and is only called when values are needed,
    /// that is not while compiling.
    /// Outside of a circuit (or inside a witness block), the values are computed
    /// right away and returned as constants.
    pub fn exists<FUNC>(&mut self, size: usize, compute: FUNC) -> SnarkyResult<Vec<FieldVar<F>>>
    where
        FUNC: FnOnce(&mut RunState<F>) -> SnarkyResult<Vec<F>>,
    {
        if !self.has_witness && !self.computes_eagerly() {
            return Ok((0..size).map(|_| self.alloc_var()).collect());
        }

        let values = compute(self)?;
        if values.len() != size {
            return Err(SnarkyRuntimeError::ExistsSizeMismatch(values.len(), size).into());
        }

        if self.computes_eagerly() {
            Ok(values.into_iter().map(FieldVar::Constant).collect())
        } else {
            Ok(values
                .into_iter()
                .map(|value| self.store_field_elt(value))
                .collect())
        }
    }

    /// Introduces a value of type `T` in the circuit.
    ///
    /// Inside a circuit, this creates [SnarkyType::SIZE_IN_FIELD_ELEMENTS] variables,
    /// fills them with the result of `compute` when generating a witness,
    /// and constrains the result with [SnarkyType::check].
    /// Outside of a circuit, or when called while computing another witness,
    /// `compute` is evaluated on the spot and its result is returned as a constant.
    pub fn witness<T, V, FUNC>(&mut self, loc: Cow<'static, str>, compute: FUNC) -> SnarkyResult<T>
    where
        T: SnarkyType<F>,
        V: Into<T::OutOfCircuit>,
        FUNC: FnOnce(&mut RunState<F>) -> V,
    {
        self.witness_inner(true, loc, |env| Ok(compute(env)))
    }

    /// Same as [Self::witness], with a computation that can fail.
    pub fn try_witness<T, V, FUNC>(
        &mut self,
        loc: Cow<'static, str>,
        compute: FUNC,
    ) -> SnarkyResult<T>
    where
        T: SnarkyType<F>,
        V: Into<T::OutOfCircuit>,
        FUNC: FnOnce(&mut RunState<F>) -> SnarkyResult<V>,
    {
        self.witness_inner(true, loc, compute)
    }

    /// Creates a new non-deterministic variable associated to a value type ([SnarkyType]),
    /// and a closure that can compute it when in witness generation mode.
    pub fn compute<T, FUNC>(
        &mut self,
        loc: Cow<'static, str>,
        to_compute_value: FUNC,
    ) -> SnarkyResult<T>
    where
        T: SnarkyType<F>,
        FUNC: FnOnce(&dyn WitnessGeneration<F>) -> T::OutOfCircuit,
    {
        self.witness_inner(true, loc, |env| Ok(to_compute_value(&*env)))
    }

    /// Same as [Self::compute] except that it does not attempt to constrain the value it computes.
    /// This is to be used internally only, when we know that the value cannot be malformed.
    pub(crate) fn compute_unsafe<T, FUNC>(
        &mut self,
        loc: Cow<'static, str>,
        to_compute_value: FUNC,
    ) -> SnarkyResult<T>
    where
        T: SnarkyType<F>,
        FUNC: FnOnce(&dyn WitnessGeneration<F>) -> T::OutOfCircuit,
    {
        self.witness_inner(false, loc, |env| Ok(to_compute_value(&*env)))
    }

    fn witness_inner<T, V, FUNC>(
        &mut self,
        checked: bool,
        loc: Cow<'static, str>,
        compute: FUNC,
    ) -> SnarkyResult<T>
    where
        T: SnarkyType<F>,
        V: Into<T::OutOfCircuit>,
        FUNC: FnOnce(&mut RunState<F>) -> SnarkyResult<V>,
    {
        // outside of a circuit, or nested: compute and round-trip through field elements
        if self.computes_eagerly() {
            let value: T::OutOfCircuit = compute(self)?.into();
            return Ok(T::from_value(&value));
        }

        let ctx = SnarkContext {
            in_witness_block: true,
            ..self.context()
        };

        let mut prover_aux = None;
        let cvars = self.exists(T::SIZE_IN_FIELD_ELEMENTS, |state| {
            let value: T::OutOfCircuit = {
                let mut scope = state.enter(ctx);
                compute(&mut *scope)?.into()
            };
            let (fields, aux) = T::value_to_field_elements(&value);
            prover_aux = Some(aux);
            Ok(fields)
        })?;

        // the auxiliary data is only known when a value was computed
        let aux = prover_aux.unwrap_or_else(T::constraint_system_auxiliary);
        let snarky_type = T::from_cvars_unsafe(cvars, aux);

        if checked {
            snarky_type.check(self, loc)?;
        }

        Ok(snarky_type)
    }

    /// Same as [Self::witness], with an asynchronous computation.
    ///
    /// The computation is awaited while the witness block is entered, and only then are
    /// variables created. During compilation, `compute` is never called.
    pub async fn witness_async<T, V, FUT, FUNC>(
        &mut self,
        loc: Cow<'static, str>,
        compute: FUNC,
    ) -> SnarkyResult<T>
    where
        T: SnarkyType<F>,
        V: Into<T::OutOfCircuit>,
        FUT: Future<Output = SnarkyResult<V>>,
        FUNC: FnOnce() -> FUT,
    {
        if self.computes_eagerly() {
            let value: T::OutOfCircuit = compute().await?.into();
            return Ok(T::from_value(&value));
        }

        let snarky_type = if self.has_witness {
            let ctx = SnarkContext {
                in_witness_block: true,
                ..self.context()
            };
            let value: T::OutOfCircuit = {
                let _scope = self.enter(ctx);
                compute().await?.into()
            };

            let (fields, aux) = T::value_to_field_elements(&value);
            if fields.len() != T::SIZE_IN_FIELD_ELEMENTS {
                return Err(SnarkyRuntimeError::ExistsSizeMismatch(
                    fields.len(),
                    T::SIZE_IN_FIELD_ELEMENTS,
                )
                .into());
            }
            let cvars = fields
                .into_iter()
                .map(|field| self.store_field_elt(field))
                .collect();
            T::from_cvars_unsafe(cvars, aux)
        } else {
            let cvars = (0..T::SIZE_IN_FIELD_ELEMENTS)
                .map(|_| self.alloc_var())
                .collect();
            T::from_cvars_unsafe(cvars, T::constraint_system_auxiliary())
        };

        snarky_type.check(self, loc)?;

        Ok(snarky_type)
    }

    //
    // constraints
    //

    /// Handles a list of [BasicSnarkyConstraint].
    pub fn assert_(
        &mut self,
        annotation: Option<Cow<'static, str>>,
        loc: Cow<'static, str>,
        basic_constraints: Vec<BasicSnarkyConstraint<FieldVar<F>>>,
    ) -> SnarkyResult<()> {
        let constraints: Vec<_> = basic_constraints
            .into_iter()
            .map(|c| AnnotatedConstraint {
                annotation: annotation.clone(),
                loc: loc.clone(),
                constraint: Constraint::BasicSnarkyConstraint(c),
            })
            .collect();

        self.add_constraints(constraints)
    }

    /// Creates a constraint for `assert_eq!(a * b, c)`.
    pub fn assert_r1cs(
        &mut self,
        annotation: Option<Cow<'static, str>>,
        loc: Cow<'static, str>,
        a: FieldVar<F>,
        b: FieldVar<F>,
        c: FieldVar<F>,
    ) -> SnarkyResult<()> {
        let constraint = BasicSnarkyConstraint::R1CS(a, b, c);
        self.assert_(annotation, loc, vec![constraint])
    }

    /// Creates a constraint for `assert_eq!(x, y)`;
    pub fn assert_eq(
        &mut self,
        annotation: Option<Cow<'static, str>>,
        loc: Cow<'static, str>,
        x: FieldVar<F>,
        y: FieldVar<F>,
    ) -> SnarkyResult<()> {
        let constraint = BasicSnarkyConstraint::Equal(x, y);
        self.assert_(annotation, loc, vec![constraint])
    }

    /// Creates a constraint for `assert_eq!(x * x, y)`;
    pub fn assert_square(
        &mut self,
        annotation: Option<Cow<'static, str>>,
        loc: Cow<'static, str>,
        x: FieldVar<F>,
        y: FieldVar<F>,
    ) -> SnarkyResult<()> {
        let constraint = BasicSnarkyConstraint::Square(x, y);
        self.assert_(annotation, loc, vec![constraint])
    }

    /// Adds a list of [AnnotatedConstraint]s to the circuit.
    ///
    /// Constraints are recorded while running the body of a circuit, in both modes,
    /// so that compilation and witness generation can be compared.
    /// They are checked against the witness whenever values are available and
    /// either [Self::eval_constraints] is set or nothing is being recorded.
    pub fn add_constraints(&mut self, constraints: Vec<AnnotatedConstraint<F>>) -> SnarkyResult<()> {
        let recording = !self.computes_eagerly();

        // We can't evaluate the constraints if we are not computing over a value.
        if self.has_witness && (self.eval_constraints || !recording) {
            for constraint in &constraints {
                constraint.check_constraint(self)?;
            }
        }

        if !recording {
            return Ok(());
        }

        if let Some(cs) = &mut self.system {
            for constraint in constraints {
                cs.add_constraint(constraint.constraint);
            }
        }

        Ok(())
    }

    pub fn add_constraint(
        &mut self,
        constraint: Constraint<F>,
        annotation: Option<Cow<'static, str>>,
        loc: Cow<'static, str>,
    ) -> SnarkyResult<()> {
        self.add_constraints(vec![AnnotatedConstraint {
            annotation,
            loc,
            constraint,
        }])
    }

    //
    // selection
    //

    /// Adds a constraint that returns `then_` if `b` is `true`, `else_` otherwise.
    /// Equivalent to `if b { then_ } else { else_ }`.
    pub fn if_(
        &mut self,
        loc: Cow<'static, str>,
        b: &Boolean<F>,
        then_: &FieldVar<F>,
        else_: &FieldVar<F>,
    ) -> SnarkyResult<FieldVar<F>> {
        // r = e + b (t - e)
        // r - e = b (t - e)
        let b = b.to_field_var();
        if let Some(b) = b.to_constant() {
            if b.is_one() {
                return Ok(then_.clone());
            } else {
                return Ok(else_.clone());
            }
        }

        match (then_.to_constant(), else_.to_constant()) {
            (Some(t), Some(e)) => {
                let t_times_b = b.scale(t);
                let one_minus_b = FieldVar::one() - &b;
                Ok(t_times_b + &one_minus_b.scale(e))
            }
            _ => {
                let b_clone = b.clone();
                let then_clone = then_.clone();
                let else_clone = else_.clone();
                let res: FieldVar<F> = self.compute(loc.clone(), move |env| {
                    let b = env.read_var(&b_clone);
                    let res_var = if b == F::one() {
                        &then_clone
                    } else {
                        &else_clone
                    };
                    env.read_var(res_var)
                })?;
                let then_ = then_ - else_;
                let else_ = &res - else_;
                self.assert_r1cs(Some("if_".into()), loc, b, then_, else_)?;

                Ok(res)
            }
        }
    }

    /// [Self::if_] applied to every field of two values of the same type.
    pub fn select<T: SnarkyType<F>>(
        &mut self,
        loc: Cow<'static, str>,
        b: &Boolean<F>,
        then_: &T,
        else_: &T,
    ) -> SnarkyResult<T> {
        let (then_cvars, aux) = then_.to_cvars();
        let (else_cvars, _) = else_.to_cvars();
        let cvars = then_cvars
            .iter()
            .zip(&else_cvars)
            .map(|(t, e)| self.if_(loc.clone(), b, t, e))
            .collect::<SnarkyResult<Vec<_>>>()?;
        Ok(T::from_cvars_unsafe(cvars, aux))
    }

    /// Picks `values[i]` where `mask[i]` is the only `true` entry of `mask`.
    /// The mask is constrained to contain exactly one `true`.
    pub fn switch<T: SnarkyType<F>>(
        &mut self,
        loc: Cow<'static, str>,
        mask: &[Boolean<F>],
        values: &[T],
    ) -> SnarkyResult<T> {
        if mask.len() != values.len() || values.is_empty() {
            return Err(SnarkyCompilationError::LengthMismatch(mask.len(), values.len()).into());
        }

        let mask: Vec<_> = mask.iter().map(Boolean::to_field_var).collect();
        let one_hot = FieldVar::sum(&mask.iter().collect::<Vec<_>>());
        one_hot.assert_equals(self, loc.clone(), &FieldVar::one())?;

        let mut aux = None;
        let mut res = vec![FieldVar::zero(); T::SIZE_IN_FIELD_ELEMENTS];
        for (b, value) in mask.iter().zip(values) {
            let (cvars, value_aux) = value.to_cvars();
            aux.get_or_insert(value_aux);
            for (acc, cvar) in res.iter_mut().zip(&cvars) {
                let term = b.mul(cvar, Some("switch".into()), loc.clone(), self)?;
                *acc = &*acc + term;
            }
        }

        let aux = aux.unwrap_or_else(T::constraint_system_auxiliary);
        Ok(T::from_cvars_unsafe(res, aux))
    }

    //
    // proving
    //

    pub fn generate_witness_init(&mut self, public_input: Vec<F>) -> SnarkyResult<()> {
        let obtained = public_input.len();
        let expected = self.num_public_inputs;
        if expected != obtained {
            return Err(SnarkyError::RuntimeError(
                SnarkyRuntimeError::PubInputMismatch(obtained, expected),
            ));
        }

        // re-initialize `next_var` (which will grow every time we compile or generate a witness)
        self.next_var = self.num_public_inputs;

        // set the mode to "witness generation"
        self.has_witness = true;

        // set the public inputs
        self.public_input = public_input;

        Ok(())
    }

    /// Returns the values of every variable created while running the circuit.
    pub fn generate_witness(&self) -> Witness<F> {
        let witness: Vec<F> = (0..self.next_var).map(|idx| self.read_var_idx(idx)).collect();
        debug!(
            "generated a witness of {} values ({} public)",
            witness.len(),
            self.num_public_inputs
        );
        Witness(witness)
    }
}
