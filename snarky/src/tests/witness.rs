use std::{cell::Cell, panic::AssertUnwindSafe};

use ark_ff::{One, Zero};
use futures::executor::block_on;
use mina_curves::pasta::Fp;

use super::assert_runtime_error;
use crate::{
    constraint_system::ConstraintKind,
    errors::{SnarkyCompilationError, SnarkyRuntimeError},
    prelude::*,
};

struct MulCircuit {
    x: Fp,
    y: Fp,
}

impl SnarkyCircuit for MulCircuit {
    type Field = Fp;

    type PublicInput = FieldVar<Fp>;
    type PublicOutput = Boolean<Fp>;

    fn circuit(
        &self,
        sys: &mut RunState<Fp>,
        public_input: Self::PublicInput,
    ) -> SnarkyResult<Self::PublicOutput> {
        let x: FieldVar<Fp> = sys.compute(loc!(), |_| self.x)?;
        let y: FieldVar<Fp> = sys.compute(loc!(), |_| self.y)?;
        let z = x.mul(&y, None, loc!(), sys)?;
        z.equal(sys, loc!(), &public_input)
    }
}

#[test]
fn test_simple_circuit() {
    let circuit = MulCircuit {
        x: Fp::from(3u64),
        y: Fp::from(5u64),
    };
    let compiled = circuit.compile().unwrap();
    assert_eq!(compiled.public_input_size, 1);

    let (witness, is_product) = circuit
        .generate_witness(&compiled, Fp::from(15u64))
        .unwrap();
    assert!(is_product);
    assert_eq!(witness.0.len(), compiled.num_vars);
    assert_eq!(witness.0[0], Fp::from(15u64));

    let (_, is_product) = circuit
        .generate_witness(&compiled, Fp::from(16u64))
        .unwrap();
    assert!(!is_product);

    let summary = compiled.summary();
    for (kind, n) in summary {
        if kind == ConstraintKind::Generic {
            assert!(n > 0);
        } else {
            assert_eq!(n, 0, "unexpected {kind:?} constraint");
        }
    }
}

#[test]
fn test_unchecked_witness_is_constant() {
    let mut sys = RunState::<Fp>::unchecked();
    let x: FieldVar<Fp> = sys.witness(loc!(), |_| 7u64).unwrap();
    assert_eq!(x.to_constant(), Some(Fp::from(7u64)));

    // assertions are checked right away
    let res = x.assert_equals(&mut sys, loc!(), &FieldVar::constant(Fp::from(8u64)));
    assert!(res.is_err());
}

#[test]
fn test_nested_witness_returns_constants() {
    struct Nested;

    impl SnarkyCircuit for Nested {
        type Field = Fp;

        type PublicInput = ();
        type PublicOutput = FieldVar<Fp>;

        fn circuit(
            &self,
            sys: &mut RunState<Fp>,
            _public_input: Self::PublicInput,
        ) -> SnarkyResult<Self::PublicOutput> {
            sys.try_witness(loc!(), |sys| {
                assert!(sys.in_witness_block());
                // a boolean would add a constraint if it were not computed eagerly
                let inner: Boolean<Fp> = sys.witness(loc!(), |_| true)?;
                assert_eq!(inner.to_constant(), Some(true));
                Ok(Fp::from(21u64) * inner.to_field_var().to_constant().unwrap_or_default())
            })
        }
    }

    let compiled = Nested.compile().unwrap();
    assert!(compiled.constraints().is_empty());

    let (witness, res) = Nested.generate_witness(&compiled, ()).unwrap();
    assert_eq!(res, Fp::from(21u64));
    assert_eq!(witness.0, vec![Fp::from(21u64)]);
}

#[test]
fn test_context_restored_after_panic() {
    let mut sys = RunState::<Fp>::new(0, true);
    sys.generate_witness_init(vec![]).unwrap();

    let res = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let _: SnarkyResult<FieldVar<Fp>> =
            sys.witness(loc!(), |_: &mut RunState<Fp>| -> Fp { panic!("boom") });
    }));
    assert!(res.is_err());

    assert!(sys.in_checked_computation());
    assert!(!sys.in_witness_block());
}

#[test]
fn test_context_restored_after_error() {
    let mut sys = RunState::<Fp>::new(0, true);
    sys.generate_witness_init(vec![]).unwrap();

    let res: SnarkyResult<FieldVar<Fp>> = sys.try_witness(loc!(), |_| -> SnarkyResult<Fp> {
        Err(SnarkyCompilationError::InvariantViolation("no value".into()).into())
    });
    assert!(res.is_err());
    assert!(!sys.in_witness_block());

    // the state is still usable
    let x: FieldVar<Fp> = sys.witness(loc!(), |_| Fp::one()).unwrap();
    assert_eq!(x.read(&sys), Fp::one());
}

#[test]
fn test_witness_async_is_not_polled_when_compiling() {
    let polled = Cell::new(false);

    let mut sys = RunState::<Fp>::new(0, true);
    let x: FieldVar<Fp> = block_on(sys.witness_async(loc!(), || async {
        polled.set(true);
        Ok::<_, SnarkyError>(Fp::from(4u64))
    }))
    .unwrap();
    assert!(!polled.get());
    assert!(!x.is_constant());

    let mut sys = RunState::<Fp>::new(0, true);
    sys.generate_witness_init(vec![]).unwrap();
    let x: FieldVar<Fp> = block_on(sys.witness_async(loc!(), || async {
        polled.set(true);
        Ok::<_, SnarkyError>(Fp::from(4u64))
    }))
    .unwrap();
    assert!(polled.get());
    assert_eq!(x.read(&sys), Fp::from(4u64));
    assert!(!sys.in_witness_block());
}

#[test]
fn test_exists_size_mismatch() {
    let mut sys = RunState::<Fp>::new(0, true);
    sys.generate_witness_init(vec![]).unwrap();
    let res = sys.exists(2, |_| Ok(vec![Fp::zero()]));
    assert!(matches!(
        res,
        Err(SnarkyError::RuntimeError(
            SnarkyRuntimeError::ExistsSizeMismatch(1, 2)
        ))
    ));
}

#[test]
fn test_unsatisfied_assertion() {
    let res = run_and_check(|sys: &mut RunState<Fp>| {
        let x: FieldVar<Fp> = sys.compute(loc!(), |_| Fp::from(1u64))?;
        let y: FieldVar<Fp> = sys.compute(loc!(), |_| Fp::from(2u64))?;
        x.assert_equals(sys, loc!(), &y)?;
        Ok(x)
    });
    assert_runtime_error(res);
}

#[test]
fn test_constant_assertion_fails_when_compiling() {
    let res = run_and_check(|sys: &mut RunState<Fp>| {
        let x = FieldVar::constant(Fp::from(1u64));
        x.assert_equals(sys, loc!(), &FieldVar::constant(Fp::from(2u64)))?;
        Ok(x)
    });
    assert!(matches!(res, Err(SnarkyError::CompilationError(_))));
}

#[test]
fn test_shape_mismatch() {
    let res = run_and_check(|sys: &mut RunState<Fp>| {
        let x: FieldVar<Fp> = sys.compute(loc!(), |_| Fp::from(1u64))?;
        if sys.has_witness {
            x.assert_equals(sys, loc!(), &x)?;
        }
        Ok(x)
    });
    assert!(matches!(
        res,
        Err(SnarkyError::RuntimeError(
            SnarkyRuntimeError::CircuitShapeMismatch(0)
        ))
    ));
}

#[test]
fn test_select_and_switch() {
    let (selected, switched) = run_and_check(|sys: &mut RunState<Fp>| {
        let b: Boolean<Fp> = sys.compute(loc!(), |_| false)?;
        let x: FieldVar<Fp> = sys.compute(loc!(), |_| Fp::from(10u64))?;
        let y: FieldVar<Fp> = sys.compute(loc!(), |_| Fp::from(20u64))?;
        let selected = sys.select(loc!(), &b, &(x.clone(), y.clone()), &(y.clone(), x.clone()))?;

        let mask = [b.clone(), b.not()];
        let switched = sys.switch(loc!(), &mask, &[x, y])?;
        Ok((selected, switched))
    })
    .unwrap();

    assert_eq!(selected, (Fp::from(20u64), Fp::from(10u64)));
    assert_eq!(switched, Fp::from(20u64));
}

#[test]
fn test_switch_rejects_bad_masks() {
    let mut sys = RunState::<Fp>::unchecked();
    let res = sys.switch(loc!(), &[Boolean::true_()], &[FieldVar::zero(), FieldVar::one()]);
    assert!(matches!(
        res,
        Err(SnarkyError::CompilationError(
            SnarkyCompilationError::LengthMismatch(1, 2)
        ))
    ));

    let res = run_and_check(|sys: &mut RunState<Fp>| {
        let b: Boolean<Fp> = sys.compute(loc!(), |_| true)?;
        sys.switch(loc!(), &[b.clone(), b], &[FieldVar::zero(), FieldVar::one()])
    });
    assert_runtime_error(res);
}

#[test]
fn test_boolean_ops() {
    let res = run_and_check(|sys: &mut RunState<Fp>| {
        let t: Boolean<Fp> = sys.compute(loc!(), |_| true)?;
        let f: Boolean<Fp> = sys.compute(loc!(), |_| false)?;
        let and = t.and(&f, sys, loc!())?;
        let or = t.or(&f, sys, loc!())?;
        let xor = t.xor(&t, sys, loc!())?;
        let any = Boolean::any(&[&f, &t], sys, loc!())?;
        let all = Boolean::all(&[t.clone(), f.clone()], sys, loc!())?;
        any.assert_true(sys, loc!())?;
        all.assert_false(sys, loc!())?;
        Ok([and, or, xor, any, all].map(|b| b.to_field_var()))
    })
    .unwrap();

    let expected = [false, true, false, true, false].map(Fp::from);
    assert_eq!(res, expected);
}
