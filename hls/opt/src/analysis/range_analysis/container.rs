use super::{
    AliasOracle, BuildEnv, DeclaredTypeOracle, GraphBuilder, Interval, OpIdx,
    OpNode, PointsToOracle, RangeAnalysisConfig, RangeError, RangeResult,
    Recognizers, TypeRangeOracle, ValueKey, VarIdx, VarNode,
};
use hls_idx::maps::{IndexedMap, SecondaryMap};
use hls_ir::{Function, Id, Statement, Type};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};

/// Phases of the fixed-point computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Widening,
    Narrowing,
}

/// Lifecycle of a [NodeContainer].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverState {
    Uninitialized,
    /// The graph is being or has been built and is not solved yet.
    Building,
    Solving(Phase),
    Solved,
}

/// Summary of one solver run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SolveStats {
    pub evaluations: u64,
    pub widened: u64,
    pub narrowed: u64,
    /// The evaluation budget ran out and computed values were reset to
    /// their declared type.
    pub exhausted: bool,
}

/// Owner of the constraint graph of one function: every [VarNode], every
/// [OpNode] and the maps between them.
pub struct NodeContainer {
    pub(super) func_name: Id,
    pub(super) version: u64,
    pub(super) state: SolverState,
    pub(super) config: RangeAnalysisConfig,
    pub(super) vars: IndexedMap<VarIdx, VarNode>,
    pub(super) ops: IndexedMap<OpIdx, OpNode>,
    pub(super) keys: HashMap<ValueKey, VarIdx>,
    /// Operations defining each value.
    pub(super) defs: SecondaryMap<VarIdx, SmallVec<[OpIdx; 2]>>,
    /// Operations reading each value.
    pub(super) uses: SecondaryMap<VarIdx, SmallVec<[OpIdx; 4]>>,
    declared: BTreeMap<Id, Type>,
    pub(super) constraints: HashMap<Id, Interval>,
    returns: HashMap<Id, Interval>,
    recognizers: Recognizers,
    pub(super) warnings: Vec<RangeError>,
    pub(super) stats: SolveStats,
}

impl NodeContainer {
    pub fn new(config: RangeAnalysisConfig) -> Self {
        Self {
            func_name: Id::new(""),
            version: 0,
            state: SolverState::Uninitialized,
            config,
            vars: IndexedMap::new(),
            ops: IndexedMap::new(),
            keys: HashMap::new(),
            defs: SecondaryMap::new(),
            uses: SecondaryMap::new(),
            declared: BTreeMap::new(),
            constraints: HashMap::new(),
            returns: HashMap::new(),
            recognizers: Recognizers::default(),
            warnings: vec![],
            stats: SolveStats::default(),
        }
    }

    /// Build and solve the graph of `func` with the default oracles.
    pub fn analyze(
        func: &Function,
        config: RangeAnalysisConfig,
    ) -> RangeResult<Self> {
        let mut nc = Self::new(config);
        nc.build(func, &DeclaredTypeOracle, &PointsToOracle)?;
        nc.solve()?;
        Ok(nc)
    }

    /// Known range of a parameter or other value without definitions. Takes
    /// effect on the next [solve](Self::solve).
    pub fn with_constraint(&mut self, value: Id, range: Interval) -> &mut Self {
        self.constraints.insert(value, range);
        self
    }

    /// Known range of the values returned by `callee`. Takes effect on the
    /// next [build](Self::build).
    pub fn with_return_range(
        &mut self,
        callee: Id,
        range: Interval,
    ) -> &mut Self {
        self.returns.insert(callee, range);
        self
    }

    /// Replace the recognizers used by the next [build](Self::build).
    pub fn with_recognizers(&mut self, recognizers: Recognizers) -> &mut Self {
        self.recognizers = recognizers;
        self
    }

    fn clear(&mut self) {
        self.vars = IndexedMap::new();
        self.ops = IndexedMap::new();
        self.keys.clear();
        self.defs.clear();
        self.uses.clear();
        self.warnings.clear();
        self.stats = SolveStats::default();
    }

    /// Create the nodes for every statement of `func`. Any previous graph
    /// is dropped. Fails on the first malformed recognized statement.
    pub fn build(
        &mut self,
        func: &Function,
        types: &dyn TypeRangeOracle,
        alias: &dyn AliasOracle,
    ) -> RangeResult<()> {
        self.clear();
        self.state = SolverState::Building;
        self.func_name = func.name;
        self.version = func.version;
        self.declared = func.values.clone();

        for (idx, stmt) in func.body.iter().enumerate() {
            let env = BuildEnv {
                func,
                types,
                alias,
                returns: &self.returns,
                fold_initializers: self.config.fold_initializers,
                stmt_idx: idx,
            };
            let Some(builder) = self.recognizers.recognize(stmt, &env) else {
                unrecognized(&mut self.warnings, func, stmt);
                continue;
            };
            let mut g = GraphBuilder {
                vars: &mut self.vars,
                keys: &mut self.keys,
                warnings: &mut self.warnings,
            };
            let node = builder(&mut g)?;
            self.insert_op(node);
        }

        log::debug!(
            "range graph of `{}`: {} values, {} operations",
            self.func_name,
            self.vars.len(),
            self.ops.len()
        );
        Ok(())
    }

    fn insert_op(&mut self, node: OpNode) {
        let sources = node.sources();
        let targets = node.targets();
        let idx = self.ops.push(node);
        for v in targets {
            self.defs.entry(v).push(idx);
        }
        for v in sources {
            let users = self.uses.entry(v);
            if !users.contains(&idx) {
                users.push(idx);
            }
        }
    }

    pub fn state(&self) -> SolverState {
        self.state
    }

    pub fn function_name(&self) -> Id {
        self.func_name
    }

    /// Version of the function the graph was built from.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn config(&self) -> &RangeAnalysisConfig {
        &self.config
    }

    /// Non-fatal problems found while building and solving.
    pub fn warnings(&self) -> &[RangeError] {
        &self.warnings
    }

    pub fn stats(&self) -> SolveStats {
        self.stats
    }

    pub fn var_nodes(&self) -> impl Iterator<Item = (VarIdx, &VarNode)> {
        self.vars.iter()
    }

    pub fn op_nodes(&self) -> impl Iterator<Item = (OpIdx, &OpNode)> {
        self.ops.iter()
    }

    pub fn var(&self, idx: VarIdx) -> &VarNode {
        &self.vars[idx]
    }

    pub fn op(&self, idx: OpIdx) -> &OpNode {
        &self.ops[idx]
    }

    /// Node of a program value, if it takes part in the graph.
    pub fn lookup(&self, key: &ValueKey) -> Option<VarIdx> {
        self.keys.get(key).copied()
    }

    /// Operations defining `var`.
    pub fn defs_of(&self, var: VarIdx) -> &[OpIdx] {
        self.defs.get(var).as_slice()
    }

    /// Operations reading `var`.
    pub fn uses_of(&self, var: VarIdx) -> &[OpIdx] {
        self.uses.get(var).as_slice()
    }

    /// Solved range of an SSA value. Integer values not in the graph may
    /// take any value of their type. `None` before the graph is solved and
    /// for names that are not integer values of the function.
    pub fn final_range_of(&self, value: Id) -> Option<Interval> {
        if self.state != SolverState::Solved {
            return None;
        }
        if let Some(idx) = self.keys.get(&ValueKey::Ssa(value)) {
            return Some(self.vars[*idx].get_range());
        }
        self.declared
            .get(&value)
            .filter(|ty| ty.is_integral())
            .map(|ty| Interval::unknown(ty.bitwidth()))
    }

    /// Solved range of the values stored into a memory object.
    pub fn memory_range_of(&self, object: Id) -> Option<Interval> {
        if self.state != SolverState::Solved {
            return None;
        }
        self.keys
            .get(&ValueKey::Memory(object))
            .map(|idx| self.vars[*idx].get_range())
    }

    /// Solved ranges of every SSA value in the graph, ordered by name.
    pub fn ranges(&self) -> Vec<(Id, Interval)> {
        if self.state != SolverState::Solved {
            return vec![];
        }
        let mut ranges = self
            .vars
            .values()
            .filter_map(|v| match v.get_value() {
                ValueKey::Ssa(id) => Some((*id, v.get_range())),
                _ => None,
            })
            .collect::<Vec<_>>();
        ranges.sort_by(|(a, _), (b, _)| a.cmp(b));
        ranges
    }
}

/// Statements without a rule leave their result unconstrained.
fn unrecognized(warnings: &mut Vec<RangeError>, func: &Function, stmt: &Statement) {
    let integral = stmt
        .dest()
        .and_then(|d| func.value_type(d))
        .is_some_and(Type::is_integral);
    if integral {
        let w = RangeError::UnsupportedOperation {
            stmt: stmt.to_string(),
        };
        log::warn!("{w}");
        warnings.push(w);
    } else {
        log::trace!("skipping `{}` statement", stmt.kind_name());
    }
}
