use super::{Interval, VarIdx, VarNode};
use hls_idx::{impl_index, maps::IndexedMap};
use hls_ir::{BinOp, Id, Predicate, Sign, UnOp};
use smallvec::{SmallVec, smallvec};
use std::{fmt, str::FromStr};

/// Index of an [OpNode] inside its container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpIdx(u32);
impl_index!(OpIdx);

/// Discriminant of the operation kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    Constant,
    Assign,
    Cast,
    Unary,
    Binary,
    Ternary,
    Phi,
    Sigma,
    Load,
    Store,
    Call,
}

impl OpKind {
    pub const ALL: [OpKind; 11] = [
        OpKind::Constant,
        OpKind::Assign,
        OpKind::Cast,
        OpKind::Unary,
        OpKind::Binary,
        OpKind::Ternary,
        OpKind::Phi,
        OpKind::Sigma,
        OpKind::Load,
        OpKind::Store,
        OpKind::Call,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OpKind::Constant => "constant",
            OpKind::Assign => "assign",
            OpKind::Cast => "cast",
            OpKind::Unary => "unary",
            OpKind::Binary => "binary",
            OpKind::Ternary => "ternary",
            OpKind::Phi => "phi",
            OpKind::Sigma => "sigma",
            OpKind::Load => "load",
            OpKind::Store => "store",
            OpKind::Call => "call",
        }
    }
}

impl FromStr for OpKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown operation kind `{s}`"))
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Right-hand side of a sigma condition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SigmaBound {
    /// Literal bound, already in the width of the constrained value.
    Const(Interval),
    /// Bound given by the current range of another value.
    Symbolic(VarIdx),
}

/// Payload of each operation kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Op {
    Constant {
        value: Interval,
    },
    Assign {
        src: VarIdx,
    },
    Cast {
        src: VarIdx,
    },
    Unary {
        op: UnOp,
        src: VarIdx,
    },
    Binary {
        op: BinOp,
        lhs: VarIdx,
        rhs: VarIdx,
        /// Interpretation of the operands.
        sign: Sign,
    },
    Ternary {
        cond: VarIdx,
        then_val: VarIdx,
        else_val: VarIdx,
    },
    Phi {
        incoming: SmallVec<[VarIdx; 2]>,
    },
    Sigma {
        src: VarIdx,
        pred: Predicate,
        bound: SigmaBound,
    },
    Load {
        /// Memory nodes the load may read. `None` when the candidates could
        /// not be enumerated.
        sources: Option<Vec<VarIdx>>,
        /// Values provided by static initializers, in the sink width.
        init: Interval,
        /// Declared-type bound used when nothing else is known.
        fallback: Interval,
    },
    Store {
        src: VarIdx,
        targets: Vec<VarIdx>,
    },
    Call {
        callee: Id,
        args: Vec<VarIdx>,
        summary: Option<Interval>,
    },
}

/// Graph vertex for one recognized operation.
#[derive(Clone, Debug)]
pub struct OpNode {
    /// The value produced. Stores have none and write their targets.
    sink: Option<VarIdx>,
    op: Op,
    /// A-priori bound of the sink, independent of the sources.
    intersect: Interval,
    /// Position of the originating statement in the body.
    stmt: usize,
}

impl OpNode {
    pub(super) fn new(
        sink: Option<VarIdx>,
        op: Op,
        intersect: Interval,
        stmt: usize,
    ) -> Self {
        Self {
            sink,
            op,
            intersect,
            stmt,
        }
    }

    pub fn kind(&self) -> OpKind {
        match &self.op {
            Op::Constant { .. } => OpKind::Constant,
            Op::Assign { .. } => OpKind::Assign,
            Op::Cast { .. } => OpKind::Cast,
            Op::Unary { .. } => OpKind::Unary,
            Op::Binary { .. } => OpKind::Binary,
            Op::Ternary { .. } => OpKind::Ternary,
            Op::Phi { .. } => OpKind::Phi,
            Op::Sigma { .. } => OpKind::Sigma,
            Op::Load { .. } => OpKind::Load,
            Op::Store { .. } => OpKind::Store,
            Op::Call { .. } => OpKind::Call,
        }
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn sink(&self) -> Option<VarIdx> {
        self.sink
    }

    pub fn get_intersect(&self) -> Interval {
        self.intersect
    }

    pub fn stmt(&self) -> usize {
        self.stmt
    }

    /// The values this operation reads.
    pub fn sources(&self) -> SmallVec<[VarIdx; 4]> {
        match &self.op {
            Op::Constant { .. } => smallvec![],
            Op::Assign { src } | Op::Cast { src } | Op::Unary { src, .. } => {
                smallvec![*src]
            }
            Op::Binary { lhs, rhs, .. } => smallvec![*lhs, *rhs],
            Op::Ternary {
                cond,
                then_val,
                else_val,
            } => smallvec![*cond, *then_val, *else_val],
            Op::Phi { incoming } => incoming.iter().copied().collect(),
            Op::Sigma { src, bound, .. } => match bound {
                SigmaBound::Const(_) => smallvec![*src],
                SigmaBound::Symbolic(b) => smallvec![*src, *b],
            },
            Op::Load { sources, .. } => {
                sources.iter().flatten().copied().collect()
            }
            Op::Store { src, .. } => smallvec![*src],
            Op::Call { args, .. } => args.iter().copied().collect(),
        }
    }

    /// The values this operation defines.
    pub fn targets(&self) -> SmallVec<[VarIdx; 4]> {
        match (&self.op, self.sink) {
            (Op::Store { targets, .. }, _) => targets.iter().copied().collect(),
            (_, Some(sink)) => smallvec![sink],
            (_, None) => smallvec![],
        }
    }

    /// Bound of `target` known without looking at any source.
    pub fn apriori(
        &self,
        vars: &IndexedMap<VarIdx, VarNode>,
        target: VarIdx,
    ) -> Interval {
        if self.sink == Some(target) {
            self.intersect
        } else {
            vars[target].type_bound()
        }
    }

    /// Compute the contribution of this operation to `target` from the
    /// current ranges of its sources, cut down by the a-priori bound of the
    /// sink. The bound is dropped when it excludes everything.
    pub fn eval(
        &self,
        vars: &IndexedMap<VarIdx, VarNode>,
        target: VarIdx,
    ) -> Interval {
        let res = self.transfer(vars, target);
        let bounded = if self.sink != Some(target)
            || self.intersect.is_full_set()
            || self.intersect.bitwidth() != res.bitwidth()
        {
            res
        } else {
            let cut = res.intersect_with(&self.intersect);
            if cut.is_empty() { res } else { cut }
        };
        match &self.op {
            // Nothing reaches the load: read as any value of its type.
            Op::Load { fallback, .. } if bounded.is_empty() => *fallback,
            _ => bounded,
        }
    }

    fn transfer(
        &self,
        vars: &IndexedMap<VarIdx, VarNode>,
        target: VarIdx,
    ) -> Interval {
        let sink = &vars[target];
        let width = sink.get_bit_width();
        // Convert a source range to the width and sign of the target.
        let conv = |v: VarIdx| {
            let n = &vars[v];
            n.get_range().cast(n.sign(), width, sink.sign())
        };
        match &self.op {
            Op::Constant { value } => *value,
            Op::Assign { src } | Op::Cast { src } => conv(*src),
            Op::Unary { op, src } => {
                let n = &vars[*src];
                let r = n.get_range();
                let s = n.sign();
                let res = match op {
                    UnOp::Neg => r.neg(s),
                    UnOp::Not => r.not(s),
                    UnOp::Abs => r.abs(s),
                    UnOp::LNot => r.logical_not(s),
                    UnOp::Bswap => return Interval::unknown(width),
                };
                res.cast(s, width, sink.sign())
            }
            Op::Binary { op, lhs, rhs, sign } => {
                let a = vars[*lhs].get_range();
                let b = vars[*rhs].get_range();
                let s = *sign;
                let res = match op {
                    BinOp::Add => a.add(&b, s),
                    BinOp::Sub => a.sub(&b, s),
                    BinOp::Mul => a.mul(&b, s),
                    BinOp::Div => a.div(&b, s),
                    BinOp::Rem => a.rem(&b, s),
                    BinOp::Shl => a.shl(&b, s),
                    BinOp::Shr => a.shr(&b, s),
                    BinOp::And => a.and(&b, s),
                    BinOp::Or => a.or(&b, s),
                    BinOp::Xor => a.xor(&b, s),
                    BinOp::Min => a.min(&b, s),
                    BinOp::Max => a.max(&b, s),
                    BinOp::Cmp(pred) => {
                        return a
                            .compare(&b, *pred, s)
                            .cast(Sign::Unsigned, width, sink.sign());
                    }
                    BinOp::Rotl | BinOp::Rotr => {
                        return Interval::unknown(width);
                    }
                };
                res.cast(s, width, sink.sign())
            }
            Op::Ternary {
                cond,
                then_val,
                else_val,
            } => {
                let c = &vars[*cond];
                c.get_range()
                    .select(&conv(*then_val), &conv(*else_val), c.sign())
            }
            Op::Phi { incoming } => incoming
                .iter()
                .fold(Interval::empty(width), |acc, v| acc.union_with(&conv(*v))),
            Op::Sigma { src, pred, bound } => {
                let r = conv(*src);
                let b = match bound {
                    SigmaBound::Const(c) => *c,
                    SigmaBound::Symbolic(v) => conv(*v),
                };
                let restricted = sigma_restrict(&r, *pred, &b, sink.sign());
                if restricted.is_empty() { r } else { restricted }
            }
            Op::Load { sources, init, .. } => match sources {
                Some(sources) => sources
                    .iter()
                    .fold(*init, |acc, v| acc.union_with(&conv(*v))),
                None => self.intersect,
            },
            Op::Store { src, .. } => conv(*src),
            Op::Call { summary, .. } => match summary {
                Some(s) => *s,
                None => self.intersect,
            },
        }
    }
}

/// The values of the window satisfying `x pred b` for some `b` in `bound`.
/// Returns Unknown when the condition gives no usable information.
pub(super) fn predicate_bound(
    pred: Predicate,
    bound: &Interval,
    sign: Sign,
) -> Interval {
    let width = bound.bitwidth();
    if bound.is_empty() {
        return Interval::empty(width);
    }
    let psign = pred.sign().unwrap_or(sign);
    let (Some((bl, bh)), Some(wmin), Some(wmax)) = (
        bound.bounds_in(psign),
        Interval::unknown(width).lower(psign),
        Interval::unknown(width).upper(psign),
    ) else {
        return Interval::unknown(width);
    };
    let (lo, hi) = match pred {
        Predicate::Eq => (bl, bh),
        Predicate::Ne => return Interval::unknown(width),
        Predicate::Slt | Predicate::Ult => (wmin, bh - 1),
        Predicate::Sle | Predicate::Ule => (wmin, bh),
        Predicate::Sgt | Predicate::Ugt => (bl + 1, wmax),
        Predicate::Sge | Predicate::Uge => (bl, wmax),
    };
    Interval::new(psign, width, lo, hi).cast(psign, width, sign)
}

/// Restrict `range` to the values satisfying `x pred b` for some `b` in
/// `bound`. All intervals share the width of `range`.
pub(super) fn sigma_restrict(
    range: &Interval,
    pred: Predicate,
    bound: &Interval,
    sign: Sign,
) -> Interval {
    if pred == Predicate::Ne {
        // Only a constant at the edge of the range can be cut off.
        return match (range.bounds(), bound.as_constant()) {
            (Some((lo, hi)), Some(c)) if lo == c && hi == c => {
                Interval::empty(range.bitwidth())
            }
            (Some((lo, hi)), Some(c)) if lo == c => {
                Interval::new(sign, range.bitwidth(), lo + 1, hi)
            }
            (Some((lo, hi)), Some(c)) if hi == c => {
                Interval::new(sign, range.bitwidth(), lo, hi - 1)
            }
            _ => *range,
        };
    }
    range.intersect_with(&predicate_bound(pred, bound, sign))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::range_analysis::ValueKey;

    const S: Sign = Sign::Signed;

    fn vars(ranges: &[Interval]) -> (IndexedMap<VarIdx, VarNode>, Vec<VarIdx>) {
        let mut map = IndexedMap::new();
        let idxs = ranges
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let mut n = VarNode::new(
                    ValueKey::Ssa(Id::new(format!("v{i}"))),
                    r.bitwidth(),
                    S,
                    Interval::unknown(r.bitwidth()),
                );
                n.set_range(*r).unwrap();
                map.push(n)
            })
            .collect();
        (map, idxs)
    }

    #[test]
    fn predicate_bounds() {
        let ten = Interval::constant(S, 32, 10);
        assert_eq!(
            predicate_bound(Predicate::Slt, &ten, S),
            Interval::new(S, 32, i128::from(i32::MIN), 9)
        );
        assert_eq!(
            predicate_bound(Predicate::Sge, &ten, S),
            Interval::new(S, 32, 10, i128::from(i32::MAX))
        );
        assert_eq!(predicate_bound(Predicate::Eq, &ten, S), ten);
        assert!(predicate_bound(Predicate::Ne, &ten, S).is_full_set());
        // unsigned comparison of a signed value: x <u 10 means 0 <= x <= 9
        assert_eq!(
            predicate_bound(Predicate::Ult, &ten, S),
            Interval::new(S, 32, 0, 9)
        );
    }

    #[test]
    fn sigma_not_equal_cuts_edges() {
        let r = Interval::new(S, 8, 0, 9);
        let zero = Interval::constant(S, 8, 0);
        let five = Interval::constant(S, 8, 5);
        assert_eq!(
            sigma_restrict(&r, Predicate::Ne, &zero, S),
            Interval::new(S, 8, 1, 9)
        );
        assert_eq!(sigma_restrict(&r, Predicate::Ne, &five, S), r);
    }

    #[test]
    fn eval_kinds() {
        let (map, v) = vars(&[
            Interval::new(S, 8, 0, 9),
            Interval::new(S, 8, 20, 30),
            Interval::empty(8),
        ]);
        let phi = OpNode::new(
            Some(v[2]),
            Op::Phi {
                incoming: smallvec![v[0], v[1]],
            },
            Interval::unknown(8),
            0,
        );
        assert_eq!(phi.eval(&map, v[2]), Interval::new(S, 8, 0, 30));
        assert_eq!(phi.sources().as_slice(), &[v[0], v[1]]);

        let sub = OpNode::new(
            Some(v[2]),
            Op::Binary {
                op: BinOp::Sub,
                lhs: v[1],
                rhs: v[0],
                sign: S,
            },
            Interval::unknown(8),
            1,
        );
        assert_eq!(sub.eval(&map, v[2]), Interval::new(S, 8, 11, 30));

        let sigma = OpNode::new(
            Some(v[2]),
            Op::Sigma {
                src: v[1],
                pred: Predicate::Slt,
                bound: SigmaBound::Symbolic(v[0]),
            },
            Interval::unknown(8),
            2,
        );
        // 20..30 is never below 9: the branch is dead and the source is kept
        assert_eq!(sigma.eval(&map, v[2]), Interval::new(S, 8, 20, 30));

        let load = OpNode::new(
            Some(v[2]),
            Op::Load {
                sources: Some(vec![v[0]]),
                init: Interval::constant(S, 8, 42),
                fallback: Interval::unknown(8),
            },
            Interval::new(S, 8, 0, 20),
            3,
        );
        // the prior bound cuts the initializer value off
        assert_eq!(load.eval(&map, v[2]), Interval::new(S, 8, 0, 20));
        assert_eq!(load.kind(), OpKind::Load);
    }

    #[test]
    fn prior_bound_cuts_every_kind() {
        let (map, v) = vars(&[
            Interval::new(S, 8, -50, 50),
            Interval::new(S, 8, 60, 70),
            Interval::empty(8),
        ]);
        let bound = Interval::new(S, 8, 0, 20);
        let add = OpNode::new(
            Some(v[2]),
            Op::Binary {
                op: BinOp::Add,
                lhs: v[0],
                rhs: v[0],
                sign: S,
            },
            bound,
            0,
        );
        assert_eq!(add.eval(&map, v[2]), bound);
        let copy = OpNode::new(Some(v[2]), Op::Assign { src: v[0] }, bound, 1);
        assert_eq!(copy.eval(&map, v[2]), bound);
        // a bound excluding every value is ignored
        let far = OpNode::new(Some(v[2]), Op::Assign { src: v[1] }, bound, 2);
        assert_eq!(far.eval(&map, v[2]), Interval::new(S, 8, 60, 70));
        // stores write their targets, not a sink
        let store = OpNode::new(
            None,
            Op::Store {
                src: v[0],
                targets: vec![v[2]],
            },
            bound,
            3,
        );
        assert_eq!(store.eval(&map, v[2]), Interval::new(S, 8, -50, 50));
    }

    #[test]
    fn load_of_unwritten_memory_reads_declared_type() {
        let (map, v) = vars(&[Interval::empty(8), Interval::empty(8)]);
        let fallback = Interval::new(S, 8, -100, 100);
        let load = OpNode::new(
            Some(v[1]),
            Op::Load {
                sources: Some(vec![v[0]]),
                init: Interval::empty(8),
                fallback,
            },
            fallback,
            0,
        );
        assert_eq!(load.eval(&map, v[1]), fallback);
        let nothing = OpNode::new(
            Some(v[1]),
            Op::Load {
                sources: Some(vec![]),
                init: Interval::empty(8),
                fallback,
            },
            Interval::unknown(8),
            1,
        );
        assert_eq!(nothing.eval(&map, v[1]), fallback);
    }

    #[test]
    fn kind_names_round_trip() {
        for k in OpKind::ALL {
            assert_eq!(k.as_str().parse::<OpKind>(), Ok(k));
        }
        assert!("frobnicate".parse::<OpKind>().is_err());
    }
}
