//! The constraints a circuit is made of, and the system that records them.
//!
//! Besides the R1CS-like [BasicSnarkyConstraint]s, a few native gates are
//! modelled by [KimchiConstraint]. During witness generation every constraint
//! is checked against the concrete witness with the same equations the proof
//! system enforces.

use ark_ff::PrimeField;
use itertools::Itertools;
use log::debug;
use num_bigint::BigUint;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

use crate::{
    cvar::FieldVar,
    errors::{SnarkyRuntimeError, SnarkyRuntimeResult},
    runner::{Constraint, WitnessGeneration},
};

/// Number of bits proven by a single [KimchiConstraint::RangeCheck0].
pub const RANGE_CHECK_BITS: u32 = 64;

/// Number of bits in each limb of a [KimchiConstraint::MultiRangeCheck].
pub const LIMB_BITS: u32 = 88;

/// Number of bits processed by one pair of variable-base scalar multiplication rows.
pub const VARBASEMUL_BITS_PER_ROW: usize = 5;

/// The R1CS-like constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasicSnarkyConstraint<Var> {
    Boolean(Var),
    Equal(Var, Var),
    Square(Var, Var),
    R1CS(Var, Var, Var),
}

impl<F> BasicSnarkyConstraint<FieldVar<F>>
where
    F: PrimeField,
{
    /// Checks that the constraint holds for the concrete values of the witness.
    pub fn check_constraint(&self, env: &impl WitnessGeneration<F>) -> SnarkyRuntimeResult<()> {
        match self {
            BasicSnarkyConstraint::Boolean(v) => {
                let v = env.read_var(v);
                if !(v.is_one() || v.is_zero()) {
                    return Err(SnarkyRuntimeError::UnsatisfiedBooleanConstraint(
                        v.to_string(),
                    ));
                }
            }
            BasicSnarkyConstraint::Equal(v1, v2) => {
                let v1 = env.read_var(v1);
                let v2 = env.read_var(v2);
                if v1 != v2 {
                    return Err(SnarkyRuntimeError::UnsatisfiedEqualConstraint(
                        v1.to_string(),
                        v2.to_string(),
                    ));
                }
            }
            BasicSnarkyConstraint::Square(v1, v2) => {
                let v1 = env.read_var(v1);
                let v2 = env.read_var(v2);
                if v1.square() != v2 {
                    return Err(SnarkyRuntimeError::UnsatisfiedSquareConstraint(
                        v1.to_string(),
                        v2.to_string(),
                    ));
                }
            }
            BasicSnarkyConstraint::R1CS(v1, v2, v3) => {
                let v1 = env.read_var(v1);
                let v2 = env.read_var(v2);
                let v3 = env.read_var(v3);
                if v1 * v2 != v3 {
                    return Err(SnarkyRuntimeError::UnsatisfiedR1CSConstraint(
                        v1.to_string(),
                        v2.to_string(),
                        v3.to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// The native gates. Curve gates assume a short Weierstrass curve with `a = 0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KimchiConstraint<Var> {
    /// Complete addition `p1 + p2 = p3`, see [check_ec_add].
    EcAdd {
        p1: (Var, Var),
        p2: (Var, Var),
        p3: (Var, Var),
        inf: Var,
        same_x: Var,
        slope: Var,
        inf_z: Var,
        x21_inv: Var,
    },

    /// `result = (2 * scalar + 1 + 2^n) * base` where `n = bits.len()`,
    /// and `bits` (least significant first) is the decomposition of `scalar`.
    ScaleFastUnpack {
        base: (Var, Var),
        scalar: Var,
        bits: Vec<Var>,
        result: (Var, Var),
    },

    /// `0 <= x < 2^64`
    RangeCheck0(Var),

    /// `0 <= x_i < 2^88` for each limb.
    MultiRangeCheck([Var; 3]),
}

impl<F> KimchiConstraint<FieldVar<F>>
where
    F: PrimeField,
{
    /// Checks that the gate is satisfied by the concrete values of the witness.
    pub fn check_constraint(&self, env: &impl WitnessGeneration<F>) -> SnarkyRuntimeResult<()> {
        let read_point = |(x, y): &(FieldVar<F>, FieldVar<F>)| (env.read_var(x), env.read_var(y));

        match self {
            KimchiConstraint::EcAdd {
                p1,
                p2,
                p3,
                inf,
                same_x,
                slope,
                inf_z,
                x21_inv,
            } => check_ec_add(
                read_point(p1),
                read_point(p2),
                read_point(p3),
                [inf, same_x, slope, inf_z, x21_inv].map(|v| env.read_var(v)),
            ),
            KimchiConstraint::ScaleFastUnpack {
                base,
                scalar,
                bits,
                result,
            } => {
                let bits: Vec<F> = bits.iter().map(|b| env.read_var(b)).collect();
                if bits.iter().any(|b| !(b.is_zero() || b.is_one())) {
                    return Err(SnarkyRuntimeError::UnsatisfiedScaleFastUnpack(
                        "bits are not boolean",
                    ));
                }
                let packed = bits
                    .iter()
                    .rev()
                    .fold(F::zero(), |acc, b| acc.double() + b);
                if packed != env.read_var(scalar) {
                    return Err(SnarkyRuntimeError::UnsatisfiedScaleFastUnpack(
                        "bits do not pack to the scalar",
                    ));
                }
                let bits: Vec<bool> = bits.iter().map(|b| b.is_one()).collect();
                match varbase_mul(read_point(base), &bits) {
                    Some(expected) if expected == read_point(result) => Ok(()),
                    Some(_) => Err(SnarkyRuntimeError::UnsatisfiedScaleFastUnpack(
                        "wrong result",
                    )),
                    None => Err(SnarkyRuntimeError::UnsatisfiedScaleFastUnpack(
                        "degenerate intermediate point",
                    )),
                }
            }
            KimchiConstraint::RangeCheck0(x) => check_bits(env.read_var(x), RANGE_CHECK_BITS),
            KimchiConstraint::MultiRangeCheck(limbs) => limbs
                .iter()
                .try_for_each(|limb| check_bits(env.read_var(limb), LIMB_BITS)),
        }
    }
}

fn check_bits<F: PrimeField>(x: F, bits: u32) -> SnarkyRuntimeResult<()> {
    let big: BigUint = x.into();
    if big.bits() > u64::from(bits) {
        return Err(SnarkyRuntimeError::UnsatisfiedRangeCheck(x.to_string(), bits));
    }
    Ok(())
}

/// This enforces that
///
/// r = (z == 0) ? 1 : 0
///
/// Additionally, if r == 0, then `z_inv` = 1 / z.
fn zero_check<F: PrimeField>(z: F, z_inv: F, r: F) -> bool {
    z_inv * z == F::one() - r && r * z == F::zero()
}

/// The seven identities of the complete addition gate, for
///
///   (x2 - x1) * s = y2 - y1
///   s^2 = x1 + x2 + x3
///   y3 = s (x1 - x3) - y1
///
/// (addition) and `2 * s * y1 = 3 * x1^2` in place of the first one (doubling).
/// `inf` is set iff the result is the point at infinity, in which case `(x3, y3)` is meaningless.
pub(crate) fn check_ec_add<F: PrimeField>(
    (x1, y1): (F, F),
    (x2, y2): (F, F),
    (x3, y3): (F, F),
    [inf, same_x, s, inf_z, x21_inv]: [F; 5],
) -> SnarkyRuntimeResult<()> {
    let x21 = x2 - x1;
    let y21 = y2 - y1;

    let ensure = |ok: bool, what: &'static str| {
        if ok {
            Ok(())
        } else {
            Err(SnarkyRuntimeError::UnsatisfiedEcAdd(what))
        }
    };

    ensure(zero_check(x21, x21_inv, same_x), "same_x wrong")?;

    let x1_squared = x1.square();
    let dbl_case = s.double() * y1 - x1_squared.double() - x1_squared;
    let add_case = x21 * s - y21;
    ensure(
        (same_x * dbl_case + (F::one() - same_x) * add_case).is_zero(),
        "slope wrong",
    )?;

    ensure(s.square() == x1 + x2 + x3, "x3 wrong")?;
    ensure(s * (x1 - x3) - y1 == y3, "y3 wrong")?;

    ensure((y21 * (same_x - inf)).is_zero(), "inf wrong")?;
    ensure(y21 * inf_z == inf, "inf_z wrong")
}

fn double<F: PrimeField>((x, y): (F, F)) -> Option<(F, F)> {
    let s = (x.square().double() + x.square()) * y.double().inverse()?;
    let x3 = s.square() - x.double();
    let y3 = s * (x - x3) - y;
    Some((x3, y3))
}

fn add_incomplete<F: PrimeField>((x1, y1): (F, F), (x2, y2): (F, F)) -> Option<(F, F)> {
    let s = (y2 - y1) * (x2 - x1).inverse()?;
    let x3 = s.square() - x1 - x2;
    let y3 = s * (x1 - x3) - y1;
    Some((x3, y3))
}

/// Variable-base scalar multiplication as computed by the native gate:
/// `Acc := 2T`, then for every bit from the most significant one,
/// `Acc := (Acc + (2b - 1)T) + Acc`.
/// Each addition is incomplete, so `None` is returned whenever two
/// consecutive operands share an x-coordinate.
pub(crate) fn varbase_mul<F: PrimeField>(base: (F, F), bits_lsb: &[bool]) -> Option<(F, F)> {
    let neg_base = (base.0, -base.1);
    let mut acc = double(base)?;
    for bit in bits_lsb.iter().rev() {
        let t = if *bit { base } else { neg_base };
        let q = add_incomplete(acc, t)?;
        acc = add_incomplete(q, acc)?;
    }
    Some(acc)
}

/// The kinds of rows a compiled circuit contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display)]
pub enum ConstraintKind {
    Generic,
    CompleteAdd,
    VarBaseMul,
    RangeCheck0,
    MultiRangeCheck,
}

impl<F: PrimeField> Constraint<F> {
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Constraint::BasicSnarkyConstraint(_) => ConstraintKind::Generic,
            Constraint::KimchiConstraint(c) => match c {
                KimchiConstraint::EcAdd { .. } => ConstraintKind::CompleteAdd,
                KimchiConstraint::ScaleFastUnpack { .. } => ConstraintKind::VarBaseMul,
                KimchiConstraint::RangeCheck0(_) => ConstraintKind::RangeCheck0,
                KimchiConstraint::MultiRangeCheck(_) => ConstraintKind::MultiRangeCheck,
            },
        }
    }

    /// The number of rows the constraint occupies once laid out.
    pub fn num_rows(&self) -> usize {
        match self {
            Constraint::KimchiConstraint(KimchiConstraint::ScaleFastUnpack { bits, .. }) => {
                2 * bits.len().div_ceil(VARBASEMUL_BITS_PER_ROW)
            }
            Constraint::KimchiConstraint(KimchiConstraint::MultiRangeCheck(_)) => 4,
            _ => 1,
        }
    }
}

/// Records the constraints of a circuit as they are created.
#[derive(Debug, Clone, Default)]
pub struct SnarkyConstraintSystem<F>
where
    F: PrimeField,
{
    public_input_size: usize,
    constraints: Vec<Constraint<F>>,
}

impl<F> SnarkyConstraintSystem<F>
where
    F: PrimeField,
{
    pub fn create() -> Self {
        Self {
            public_input_size: 0,
            constraints: vec![],
        }
    }

    pub fn set_primary_input_size(&mut self, size: usize) {
        self.public_input_size = size;
    }

    pub fn get_primary_input_size(&self) -> usize {
        self.public_input_size
    }

    pub fn add_constraint(&mut self, constraint: Constraint<F>) {
        self.constraints.push(constraint);
    }

    pub fn constraints(&self) -> &[Constraint<F>] {
        &self.constraints
    }

    /// Public input rows followed by the rows of every constraint.
    pub fn num_rows(&self) -> usize {
        self.public_input_size + self.constraints.iter().map(Constraint::num_rows).sum::<usize>()
    }

    /// How many constraints of each kind the circuit contains.
    pub fn summary(&self) -> Vec<(ConstraintKind, usize)> {
        let counts = self.constraints.iter().map(Constraint::kind).counts();
        ConstraintKind::iter()
            .map(|kind| (kind, counts.get(&kind).copied().unwrap_or(0)))
            .collect()
    }

    /// Returns the index of the first constraint that differs from `other`, if any.
    pub fn first_difference(&self, other: &[Constraint<F>]) -> Option<usize> {
        let res = self
            .constraints
            .iter()
            .zip_longest(other)
            .position(|pair| !pair.both().is_some_and(|(a, b)| a == b));
        if let Some(idx) = res {
            debug!("constraint systems diverge at constraint {idx}");
        }
        res
    }
}
