//! Worklist fixed point over the constraint graph.
//!
//! Solving runs in two phases. Widening only lets ranges grow; a value that
//! keeps growing has its moving bounds pushed to the next constant of the
//! program (or to the end of its type) so loops terminate. Narrowing then
//! shrinks ranges again by re-evaluating every operation and intersecting
//! with the widened result. Operations are processed by strongly connected
//! component in topological order, and by position within a component.
use super::{
    Interval, NodeContainer, Op, OpIdx, Phase, RangeError, RangeResult,
    SigmaBound, SolveStats, SolverState, ValueKey, VarIdx, interval::window,
    op_node::predicate_bound,
};
use hls_idx::maps::SecondaryMap;
use hls_ir::{BinOp, Sign};
use petgraph::{
    algo::tarjan_scc,
    graph::{DiGraph, NodeIndex},
};
use std::{cmp::Reverse, collections::BinaryHeap};

/// Operations waiting for evaluation, lowest rank first.
struct Worklist {
    heap: BinaryHeap<Reverse<(u32, OpIdx)>>,
    queued: SecondaryMap<OpIdx, bool>,
}

impl Worklist {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            queued: SecondaryMap::new(),
        }
    }

    fn push(&mut self, rank: u32, op: OpIdx) {
        if !self.queued[op] {
            self.queued.insert(op, true);
            self.heap.push(Reverse((rank, op)));
        }
    }

    fn pop(&mut self) -> Option<OpIdx> {
        let Reverse((_, op)) = self.heap.pop()?;
        self.queued.insert(op, false);
        Some(op)
    }
}

impl NodeContainer {
    /// Compute the ranges of every value. Solving again from scratch gives
    /// the same result, so this may be called repeatedly, for instance after
    /// changing the constraints of the entry values.
    pub fn solve(&mut self) -> RangeResult<()> {
        self.stats = SolveStats::default();
        self.seed()?;
        let ranks = self.ranks();
        let jumps = if self.config.jump_set {
            self.jump_set()
        } else {
            vec![]
        };

        self.state = SolverState::Solving(Phase::Widening);
        let finished = self.run(Phase::Widening, &ranks, &jumps)?;
        if !finished {
            self.exhaust()?;
        } else if self.config.narrowing {
            self.state = SolverState::Solving(Phase::Narrowing);
            if !self.run(Phase::Narrowing, &ranks, &jumps)? {
                log::warn!(
                    "range analysis of `{}` stopped narrowing after {} evaluations",
                    self.func_name,
                    self.stats.evaluations
                );
            }
        }
        self.state = SolverState::Solved;

        if let Some(out) = &self.config.dump_graph {
            if let Err(e) = self.write_dot(out) {
                log::warn!("could not write the range graph to {out}: {e}");
            }
        }
        log::info!(
            "solved ranges of `{}` with {} evaluations",
            self.func_name,
            self.stats.evaluations
        );
        Ok(())
    }

    /// Starting ranges: entry values get their known or declared range,
    /// literals their value and everything else starts empty.
    fn seed(&mut self) -> RangeResult<()> {
        let seeds = self
            .vars
            .iter()
            .map(|(idx, v)| {
                let width = v.get_bit_width();
                let seed = match v.get_value() {
                    ValueKey::Constant { value, .. } => {
                        Interval::constant(v.sign(), width, *value)
                    }
                    ValueKey::Memory(_) => Interval::empty(width),
                    ValueKey::Ssa(_) if !self.defs[idx].is_empty() => {
                        Interval::empty(width)
                    }
                    ValueKey::Ssa(id) => match self.constraints.get(id) {
                        Some(c) => c.resize(v.sign(), width),
                        None => v.type_bound(),
                    },
                };
                (idx, seed)
            })
            .collect::<Vec<_>>();
        for (idx, seed) in seeds {
            self.vars[idx].set_range(seed)?;
        }
        Ok(())
    }

    /// Rank of every operation: the topological position of the strongly
    /// connected component of its earliest target.
    fn ranks(&self) -> SecondaryMap<OpIdx, u32> {
        let mut graph = DiGraph::<VarIdx, ()>::new();
        let mut nodes = SecondaryMap::<VarIdx, NodeIndex>::new();
        for v in self.vars.keys() {
            nodes.insert(v, graph.add_node(v));
        }
        for (_, op) in self.ops.iter() {
            for s in op.sources() {
                for t in op.targets() {
                    graph.add_edge(nodes[s], nodes[t], ());
                }
            }
        }
        // Components come out in reverse topological order.
        let sccs = tarjan_scc(&graph);
        let n = sccs.len();
        let mut var_rank = SecondaryMap::<VarIdx, u32>::new();
        for (i, scc) in sccs.into_iter().enumerate() {
            let rank = u32::try_from(n - 1 - i).unwrap_or(u32::MAX);
            for node in scc {
                var_rank.insert(graph[node], rank);
            }
        }
        let mut ranks = SecondaryMap::new();
        for (idx, op) in self.ops.iter() {
            let rank = op.targets().iter().map(|t| var_rank[*t]).min();
            ranks.insert(idx, rank.unwrap_or(0));
        }
        ranks
    }

    /// Sorted constants of the program used as widening thresholds.
    fn jump_set(&self) -> Vec<i128> {
        fn around(c: i128, jumps: &mut Vec<i128>) {
            jumps.extend([c.saturating_sub(1), c, c.saturating_add(1)]);
        }
        let mut jumps = vec![];
        for v in self.vars.values() {
            if let (ValueKey::Constant { .. }, Some((lo, hi))) =
                (v.get_value(), v.get_range().bounds())
            {
                jumps.extend([lo, hi]);
            }
        }
        for op in self.ops.values() {
            match op.op() {
                Op::Constant { value } => {
                    if let Some((lo, hi)) = value.bounds() {
                        jumps.extend([lo, hi]);
                    }
                }
                Op::Binary {
                    op: BinOp::Cmp(_),
                    lhs,
                    rhs,
                    ..
                } => {
                    for v in [lhs, rhs] {
                        if let ValueKey::Constant { value, .. } =
                            self.vars[*v].get_value()
                        {
                            around(*value, &mut jumps);
                        }
                    }
                }
                Op::Sigma { src, pred, bound } => {
                    let bound = match bound {
                        SigmaBound::Const(c) => *c,
                        SigmaBound::Symbolic(v) => {
                            let node = &self.vars[*v];
                            match node.get_value() {
                                ValueKey::Constant { .. } => node.get_range(),
                                _ => continue,
                            }
                        }
                    };
                    if let Some((lo, hi)) = bound.bounds() {
                        around(lo, &mut jumps);
                        around(hi, &mut jumps);
                    }
                    let sign = self.vars[*src].sign();
                    if let Some((lo, hi)) =
                        predicate_bound(*pred, &bound, sign).bounds()
                    {
                        jumps.extend([lo, hi]);
                    }
                }
                _ => (),
            }
        }
        jumps.sort_unstable();
        jumps.dedup();
        jumps
    }

    /// Union of the contributions of every definition of `target`.
    fn join_defs(&self, target: VarIdx) -> RangeResult<Interval> {
        let node = &self.vars[target];
        let width = node.get_bit_width();
        let mut acc = Interval::empty(width);
        for op in self.defs[target].iter().map(|d| &self.ops[*d]) {
            let r = if self.config.is_disabled(op.kind()) {
                op.apriori(&self.vars, target)
            } else {
                op.eval(&self.vars, target)
            };
            if r.bitwidth() > width {
                return Err(RangeError::RangeBitwidthOverflow {
                    value: node.get_value().to_string(),
                    width: r.bitwidth(),
                    declared: width,
                });
            }
            acc = acc.union_with(&r.resize(node.sign(), width));
        }
        Ok(acc)
    }

    /// Run one phase to a fixed point. Returns `false` if the evaluation
    /// budget ran out first.
    fn run(
        &mut self,
        phase: Phase,
        ranks: &SecondaryMap<OpIdx, u32>,
        jumps: &[i128],
    ) -> RangeResult<bool> {
        let mut worklist = Worklist::new();
        for idx in self.ops.keys() {
            worklist.push(ranks[idx], idx);
        }
        let mut updates = SecondaryMap::<VarIdx, u32>::new();

        while let Some(idx) = worklist.pop() {
            if self
                .config
                .max_evaluations
                .is_some_and(|max| self.stats.evaluations >= max)
            {
                return Ok(false);
            }
            self.stats.evaluations += 1;

            for target in self.ops[idx].targets() {
                let new = self.join_defs(target)?;
                let node = &self.vars[target];
                let old = node.get_range();
                let next = match phase {
                    Phase::Widening => {
                        let grown = old.union_with(&new);
                        if grown == old {
                            continue;
                        }
                        let count = updates.entry(target);
                        *count += 1;
                        if *count > self.config.widening_threshold {
                            self.stats.widened += 1;
                            widen(&old, &grown, node.sign(), jumps)
                        } else {
                            grown
                        }
                    }
                    Phase::Narrowing => {
                        if updates[target] >= self.config.narrowing_limit {
                            continue;
                        }
                        let shrunk = new
                            .intersect_with(&old)
                            .intersect_with(&node.type_bound());
                        if shrunk.is_empty() || shrunk == old {
                            continue;
                        }
                        *updates.entry(target) += 1;
                        self.stats.narrowed += 1;
                        shrunk
                    }
                };
                log::trace!("{}: {old} -> {next}", self.vars[target].get_value());
                self.vars[target].set_range(next)?;
                for user in self.uses[target].iter() {
                    worklist.push(ranks[*user], *user);
                }
            }
        }
        Ok(true)
    }

    /// Give up on precision: every computed value may take any value of its
    /// declared type.
    fn exhaust(&mut self) -> RangeResult<()> {
        self.stats.exhausted = true;
        log::warn!(
            "range analysis of `{}` gave up after {} evaluations",
            self.func_name,
            self.stats.evaluations
        );
        let computed = self
            .vars
            .iter()
            .filter(|(idx, v)| {
                !self.defs[*idx].is_empty()
                    || matches!(v.get_value(), ValueKey::Memory(_))
            })
            .map(|(idx, v)| (idx, v.type_bound()))
            .collect::<Vec<_>>();
        for (idx, bound) in computed {
            self.vars[idx].set_range(bound)?;
        }
        Ok(())
    }
}

/// Widen `old` to cover `grown`. Bounds that moved are pushed to the next
/// jump-set constant in the direction they moved, or to the end of the
/// window of `sign`.
fn widen(old: &Interval, grown: &Interval, sign: Sign, jumps: &[i128]) -> Interval {
    let width = grown.bitwidth();
    let (Some((o0, o1)), Some((g0, g1)), Some((wmin, wmax))) =
        (old.bounds_in(sign), grown.bounds_in(sign), window(sign, width))
    else {
        return *grown;
    };
    let lo = if g0 < o0 {
        let at = jumps.partition_point(|c| *c <= g0);
        jumps[..at]
            .last()
            .copied()
            .filter(|c| *c >= wmin)
            .unwrap_or(wmin)
    } else {
        g0
    };
    let hi = if g1 > o1 {
        let at = jumps.partition_point(|c| *c < g1);
        jumps
            .get(at)
            .copied()
            .filter(|c| *c <= wmax)
            .unwrap_or(wmax)
    } else {
        g1
    };
    Interval::new(sign, width, lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    const S: Sign = Sign::Signed;

    #[test]
    fn widening_jumps_to_constants() {
        let jumps = [-5, 0, 9, 10, 11, 100];
        let old = Interval::new(S, 32, 0, 3);
        let grown = Interval::new(S, 32, 0, 4);
        assert_eq!(widen(&old, &grown, S, &jumps), Interval::new(S, 32, 0, 9));
        let grown = Interval::new(S, 32, -1, 3);
        assert_eq!(widen(&old, &grown, S, &jumps), Interval::new(S, 32, -5, 3));
        // nothing beyond: the window ends
        let grown = Interval::new(S, 32, 0, 101);
        assert_eq!(
            widen(&old, &grown, S, &jumps),
            Interval::new(S, 32, 0, i128::from(i32::MAX))
        );
        // a bound sitting on a constant stays there
        let grown = Interval::new(S, 32, 0, 10);
        assert_eq!(widen(&old, &grown, S, &jumps), Interval::new(S, 32, 0, 10));
    }

    #[test]
    fn widening_without_constants() {
        let old = Interval::new(Sign::Unsigned, 8, 3, 3);
        let grown = Interval::new(Sign::Unsigned, 8, 2, 4);
        assert!(widen(&old, &grown, Sign::Unsigned, &[]).is_full_set());
        // from nothing, the first value is taken as is
        let empty = Interval::empty(8);
        assert_eq!(widen(&empty, &grown, Sign::Unsigned, &[]), grown);
    }

    #[test]
    fn worklist_order() {
        let mut w = Worklist::new();
        w.push(2, OpIdx::from(0usize));
        w.push(1, OpIdx::from(3usize));
        w.push(1, OpIdx::from(1usize));
        w.push(1, OpIdx::from(3usize));
        let order = std::iter::from_fn(|| w.pop()).collect::<Vec<_>>();
        assert_eq!(
            order,
            vec![OpIdx::from(1usize), OpIdx::from(3usize), OpIdx::from(0usize)]
        );
    }
}
