//! The main interface to using Snarky.
//!
//! To use Snarky, simply implements the [SnarkyCircuit] trait.
//! A circuit is compiled once, then the same code is run again in witness generation
//! mode for every set of inputs. Both runs must produce the exact same constraints.

use ark_ff::PrimeField;
use log::debug;

use crate::{
    constraint_system::{ConstraintKind, SnarkyConstraintSystem},
    errors::{SnarkyCompilationError, SnarkyResult, SnarkyRuntimeError},
    runner::{Constraint, RunState},
    snarky_type::SnarkyType,
};

/// A witness represents the values of every variable of an execution of a circuit,
/// public inputs first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness<F>(pub Vec<F>);

/// A compiled circuit.
#[derive(Debug, Clone)]
pub struct CompiledCircuit<F>
where
    F: PrimeField,
{
    /// The number of public inputs.
    pub public_input_size: usize,

    /// The number of variables created when compiling (public inputs included).
    pub num_vars: usize,

    system: SnarkyConstraintSystem<F>,
}

impl<F> CompiledCircuit<F>
where
    F: PrimeField,
{
    fn from_state(state: RunState<F>) -> SnarkyResult<Self> {
        let num_vars = state.next_var;
        let system = state.system.ok_or_else(|| {
            SnarkyCompilationError::InvariantViolation("compiled without a constraint system".into())
        })?;
        let compiled = Self {
            public_input_size: system.get_primary_input_size(),
            num_vars,
            system,
        };
        debug!(
            "compiled circuit: {} constraints, {} rows, {} variables",
            compiled.constraints().len(),
            compiled.num_rows(),
            compiled.num_vars
        );
        Ok(compiled)
    }

    pub fn constraints(&self) -> &[Constraint<F>] {
        self.system.constraints()
    }

    pub fn num_rows(&self) -> usize {
        self.system.num_rows()
    }

    /// How many constraints of each kind the circuit contains.
    pub fn summary(&self) -> Vec<(ConstraintKind, usize)> {
        self.system.summary()
    }

    /// Fails if `state` recorded a different list of constraints than this circuit.
    fn assert_same_shape(&self, state: &RunState<F>) -> SnarkyResult<()> {
        let constraints = state.system.as_ref().map(|cs| cs.constraints()).unwrap_or(&[]);
        match self.system.first_difference(constraints) {
            Some(idx) => Err(SnarkyRuntimeError::CircuitShapeMismatch(idx).into()),
            None => Ok(()),
        }
    }
}

type Output<C> = <<C as SnarkyCircuit>::PublicOutput as SnarkyType<
    <C as SnarkyCircuit>::Field,
>>::OutOfCircuit;

type Input<C> =
    <<C as SnarkyCircuit>::PublicInput as SnarkyType<<C as SnarkyCircuit>::Field>>::OutOfCircuit;

/// The main trait. Implement this on your circuit to get access to more functions (specifically [Self::compile]).
pub trait SnarkyCircuit: Sized {
    /// The field the circuit is written over.
    type Field: PrimeField;

    type PublicInput: SnarkyType<Self::Field>;
    type PublicOutput: SnarkyType<Self::Field>;

    /// The circuit. It takes:
    ///
    /// - `self`: to access private inputs
    /// - `sys`: a [RunState] to keep track of the state of the circuit
    /// - `public_input`: the public input of the circuit
    fn circuit(
        &self,
        sys: &mut RunState<Self::Field>,
        public_input: Self::PublicInput,
    ) -> SnarkyResult<Self::PublicOutput>;

    /// Compiles the circuit: every witness computation is skipped.
    fn compile(&self) -> SnarkyResult<CompiledCircuit<Self::Field>> {
        let mut sys = RunState::new(Self::PublicInput::SIZE_IN_FIELD_ELEMENTS, true);
        let public_input = sys.public_input();
        self.circuit(&mut sys, public_input)?;
        CompiledCircuit::from_state(sys)
    }

    /// Runs the circuit on concrete inputs, checking every constraint along the way.
    /// Fails if a constraint is not satisfied, or if the run did not produce the constraints of `compiled`.
    fn generate_witness(
        &self,
        compiled: &CompiledCircuit<Self::Field>,
        public_input: Input<Self>,
    ) -> SnarkyResult<(Witness<Self::Field>, Output<Self>)> {
        let (public_input, _aux) = Self::PublicInput::value_to_field_elements(&public_input);

        let mut sys = RunState::new(compiled.public_input_size, true);
        sys.eval_constraints = true;
        sys.generate_witness_init(public_input)?;

        let public_input = sys.public_input();
        let public_output = self.circuit(&mut sys, public_input)?;
        compiled.assert_same_shape(&sys)?;

        let public_output = public_output.read(&sys);
        Ok((sys.generate_witness(), public_output))
    }
}

/// Compiles `circuit` and then runs it in witness generation mode,
/// returning the value it produced.
///
/// This is the closure version of [SnarkyCircuit], useful in tests.
pub fn run_and_check<F, T, FUNC>(circuit: FUNC) -> SnarkyResult<T::OutOfCircuit>
where
    F: PrimeField,
    T: SnarkyType<F>,
    FUNC: Fn(&mut RunState<F>) -> SnarkyResult<T>,
{
    let mut sys = RunState::new(0, true);
    circuit(&mut sys)?;
    let compiled = CompiledCircuit::from_state(sys)?;

    let mut sys = RunState::new(0, true);
    sys.eval_constraints = true;
    sys.generate_witness_init(vec![])?;
    let res = circuit(&mut sys)?;
    compiled.assert_same_shape(&sys)?;

    Ok(res.read(&sys))
}
