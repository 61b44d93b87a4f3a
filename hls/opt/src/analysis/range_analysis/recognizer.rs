//! Rules turning IR statements into operation nodes.
//!
//! A [Recognizer] looks at a statement and either declines it or returns an
//! [OpBuilder]. Matching and construction are separate: recognizers only
//! inspect the shape of the statement, while the builder creates the value
//! nodes it needs and checks the operands, failing with
//! [RangeError::IrShapeViolation] on malformed input.
use super::{
    AliasOracle, Interval, Op, OpKind, OpNode, RangeError, RangeResult,
    SigmaBound, TypeRangeOracle, ValueKey, VarIdx, VarNode,
};
use hls_idx::maps::IndexedMap;
use hls_ir::{
    Address, BinOp, Function, Id, Initializer, MemoryObject, Operand, Scope,
    Statement, Type,
};
use std::collections::HashMap;

/// Read-only context available while recognizing one statement.
pub struct BuildEnv<'a> {
    pub func: &'a Function,
    pub types: &'a dyn TypeRangeOracle,
    pub alias: &'a dyn AliasOracle,
    /// Known return ranges of callees.
    pub returns: &'a HashMap<Id, Interval>,
    pub fold_initializers: bool,
    /// Position of the statement in the body.
    pub stmt_idx: usize,
}

impl BuildEnv<'_> {
    /// Declared type of an SSA value if it is tracked by the analysis.
    pub fn integral(&self, value: Id) -> Option<&Type> {
        self.func.value_type(value).filter(|ty| ty.is_integral())
    }

    /// Type of an operand if it is tracked by the analysis. Undeclared
    /// names are let through so the builder can report them.
    fn integral_operand(&self, op: &Operand) -> Option<()> {
        match self.func.operand_type(op) {
            Some(ty) if !ty.is_integral() => None,
            _ => Some(()),
        }
    }

    fn node(&self, sink: Option<VarIdx>, op: Op, intersect: Interval) -> OpNode {
        OpNode::new(sink, op, intersect, self.stmt_idx)
    }
}

/// Mutable view of the value nodes while operations are constructed.
pub struct GraphBuilder<'g> {
    pub(super) vars: &'g mut IndexedMap<VarIdx, VarNode>,
    pub(super) keys: &'g mut HashMap<ValueKey, VarIdx>,
    pub(super) warnings: &'g mut Vec<RangeError>,
}

impl GraphBuilder<'_> {
    /// The node for `key`, created on first use.
    fn var_for(
        &mut self,
        key: ValueKey,
        ty: &Type,
        types: &dyn TypeRangeOracle,
    ) -> VarIdx {
        if let Some(idx) = self.keys.get(&key) {
            return *idx;
        }
        let idx = self.vars.push(VarNode::new(
            key,
            ty.bitwidth(),
            ty.sign(),
            types.range_of(ty),
        ));
        self.keys.insert(key, idx);
        idx
    }

    /// Node of the SSA value `value` used by `stmt`.
    pub fn ssa(
        &mut self,
        env: &BuildEnv,
        stmt: &Statement,
        value: Id,
    ) -> RangeResult<VarIdx> {
        let Some(ty) = env.func.value_type(value) else {
            return Err(RangeError::shape(
                stmt,
                format!("`{value}` is not declared"),
            ));
        };
        if !ty.is_integral() {
            return Err(RangeError::shape(
                stmt,
                format!("`{value}` has non-integer type {ty}"),
            ));
        }
        Ok(self.var_for(ValueKey::Ssa(value), ty, env.types))
    }

    /// Node of an operand. Literals get a node of their own.
    pub fn operand(
        &mut self,
        env: &BuildEnv,
        stmt: &Statement,
        op: &Operand,
    ) -> RangeResult<VarIdx> {
        match op {
            Operand::Var(v) => self.ssa(env, stmt, *v),
            Operand::Const(c) => {
                if !c.ty.is_integral() {
                    return Err(RangeError::shape(
                        stmt,
                        format!("literal of non-integer type {}", c.ty),
                    ));
                }
                let key = ValueKey::Constant {
                    value: c.value,
                    width: c.ty.bitwidth(),
                    signed: c.ty.sign().is_signed(),
                };
                Ok(self.var_for(key, &c.ty, env.types))
            }
        }
    }

    /// Node holding every value stored into the memory object `object`.
    pub fn memory(
        &mut self,
        env: &BuildEnv,
        stmt: &Statement,
        object: Id,
    ) -> RangeResult<VarIdx> {
        let mem = memory_object(env, stmt, object)?;
        Ok(self.var_for(ValueKey::Memory(object), &mem.elem, env.types))
    }

    pub fn warn(&mut self, warning: RangeError) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }
}

fn memory_object<'a>(
    env: &BuildEnv<'a>,
    stmt: &Statement,
    object: Id,
) -> RangeResult<&'a MemoryObject> {
    env.func.memory(object).ok_or_else(|| {
        RangeError::shape(stmt, format!("`{object}` is not a memory object"))
    })
}

/// Deferred construction of an operation node.
pub type OpBuilder<'a> =
    Box<dyn FnOnce(&mut GraphBuilder<'_>) -> RangeResult<OpNode> + 'a>;

fn build<'a, F>(f: F) -> Option<OpBuilder<'a>>
where
    F: FnOnce(&mut GraphBuilder<'_>) -> RangeResult<OpNode> + 'a,
{
    Some(Box::new(f))
}

/// Matches a statement shape and returns how to build its node.
pub type Recognizer =
    for<'a> fn(&'a Statement, &'a BuildEnv<'a>) -> Option<OpBuilder<'a>>;

/// Ordered list of recognizers. The first one accepting a statement wins.
#[derive(Clone)]
pub struct Recognizers {
    rules: Vec<(OpKind, Recognizer)>,
}

impl Default for Recognizers {
    fn default() -> Self {
        Self {
            rules: vec![
                (OpKind::Constant, constant as Recognizer),
                (OpKind::Assign, assign as Recognizer),
                (OpKind::Cast, cast as Recognizer),
                (OpKind::Unary, unary as Recognizer),
                (OpKind::Binary, binary as Recognizer),
                (OpKind::Ternary, ternary as Recognizer),
                (OpKind::Phi, phi as Recognizer),
                (OpKind::Sigma, sigma as Recognizer),
                (OpKind::Load, load as Recognizer),
                (OpKind::Store, store as Recognizer),
                (OpKind::Call, call as Recognizer),
            ],
        }
    }
}

impl Recognizers {
    /// Add a rule tried before the existing ones.
    pub fn register(&mut self, kind: OpKind, rule: Recognizer) {
        self.rules.insert(0, (kind, rule));
    }

    /// Remove every rule producing operations of `kind`.
    pub fn remove(&mut self, kind: OpKind) {
        self.rules.retain(|(k, _)| *k != kind);
    }

    pub fn kinds(&self) -> impl Iterator<Item = OpKind> + '_ {
        self.rules.iter().map(|(k, _)| *k)
    }

    /// Builder from the first rule matching `stmt`.
    pub fn recognize<'a>(
        &self,
        stmt: &'a Statement,
        env: &'a BuildEnv<'a>,
    ) -> Option<OpBuilder<'a>> {
        self.rules.iter().find_map(|(_, rule)| rule(stmt, env))
    }
}

fn constant<'a>(
    stmt: &'a Statement,
    env: &'a BuildEnv<'a>,
) -> Option<OpBuilder<'a>> {
    let Statement::Assign {
        dest,
        src: Operand::Const(c),
    } = stmt
    else {
        return None;
    };
    let ty = env.integral(*dest)?;
    build(move |g| {
        let sink = g.ssa(env, stmt, *dest)?;
        let value = Interval::constant(c.ty.sign(), c.ty.bitwidth(), c.value)
            .cast(c.ty.sign(), ty.bitwidth(), ty.sign());
        Ok(env.node(Some(sink), Op::Constant { value }, env.types.range_of(ty)))
    })
}

fn assign<'a>(
    stmt: &'a Statement,
    env: &'a BuildEnv<'a>,
) -> Option<OpBuilder<'a>> {
    let Statement::Assign {
        dest,
        src: Operand::Var(src),
    } = stmt
    else {
        return None;
    };
    let ty = env.integral(*dest)?;
    env.integral_operand(&Operand::Var(*src))?;
    build(move |g| {
        let sink = g.ssa(env, stmt, *dest)?;
        let src = g.ssa(env, stmt, *src)?;
        Ok(env.node(Some(sink), Op::Assign { src }, env.types.range_of(ty)))
    })
}

fn cast<'a>(stmt: &'a Statement, env: &'a BuildEnv<'a>) -> Option<OpBuilder<'a>> {
    let Statement::Cast { dest, src } = stmt else {
        return None;
    };
    let ty = env.integral(*dest)?;
    env.integral_operand(src)?;
    build(move |g| {
        let sink = g.ssa(env, stmt, *dest)?;
        let src = g.operand(env, stmt, src)?;
        Ok(env.node(Some(sink), Op::Cast { src }, env.types.range_of(ty)))
    })
}

fn unary<'a>(
    stmt: &'a Statement,
    env: &'a BuildEnv<'a>,
) -> Option<OpBuilder<'a>> {
    let Statement::Unary { dest, op, src } = stmt else {
        return None;
    };
    let ty = env.integral(*dest)?;
    env.integral_operand(src)?;
    build(move |g| {
        let sink = g.ssa(env, stmt, *dest)?;
        let src = g.operand(env, stmt, src)?;
        Ok(env.node(Some(sink), Op::Unary { op: *op, src }, env.types.range_of(ty)))
    })
}

fn binary<'a>(
    stmt: &'a Statement,
    env: &'a BuildEnv<'a>,
) -> Option<OpBuilder<'a>> {
    let Statement::Binary { dest, op, lhs, rhs } = stmt else {
        return None;
    };
    let ty = env.integral(*dest)?;
    env.integral_operand(lhs)?;
    env.integral_operand(rhs)?;
    build(move |g| {
        let sink = g.ssa(env, stmt, *dest)?;
        let l = g.operand(env, stmt, lhs)?;
        let r = g.operand(env, stmt, rhs)?;
        let (lw, rw) = (g.vars[l].get_bit_width(), g.vars[r].get_bit_width());
        if lw != rw && !op.is_shift() {
            return Err(RangeError::shape(
                stmt,
                format!("operands have {lw} and {rw} bits"),
            ));
        }
        let sign = match op {
            BinOp::Cmp(pred) => pred.sign().unwrap_or(g.vars[l].sign()),
            _ => g.vars[l].sign(),
        };
        let op = Op::Binary {
            op: *op,
            lhs: l,
            rhs: r,
            sign,
        };
        Ok(env.node(Some(sink), op, env.types.range_of(ty)))
    })
}

fn ternary<'a>(
    stmt: &'a Statement,
    env: &'a BuildEnv<'a>,
) -> Option<OpBuilder<'a>> {
    let Statement::Ternary {
        dest,
        cond,
        then_val,
        else_val,
    } = stmt
    else {
        return None;
    };
    let ty = env.integral(*dest)?;
    env.integral_operand(cond)?;
    env.integral_operand(then_val)?;
    env.integral_operand(else_val)?;
    build(move |g| {
        let sink = g.ssa(env, stmt, *dest)?;
        let op = Op::Ternary {
            cond: g.operand(env, stmt, cond)?,
            then_val: g.operand(env, stmt, then_val)?,
            else_val: g.operand(env, stmt, else_val)?,
        };
        Ok(env.node(Some(sink), op, env.types.range_of(ty)))
    })
}

fn phi<'a>(stmt: &'a Statement, env: &'a BuildEnv<'a>) -> Option<OpBuilder<'a>> {
    let Statement::Phi { dest, incoming } = stmt else {
        return None;
    };
    let ty = env.integral(*dest)?;
    build(move |g| {
        if incoming.is_empty() {
            return Err(RangeError::shape(stmt, "phi without incoming values"));
        }
        let sink = g.ssa(env, stmt, *dest)?;
        let incoming = incoming
            .iter()
            .map(|v| g.operand(env, stmt, v))
            .collect::<RangeResult<_>>()?;
        Ok(env.node(Some(sink), Op::Phi { incoming }, env.types.range_of(ty)))
    })
}

fn sigma<'a>(
    stmt: &'a Statement,
    env: &'a BuildEnv<'a>,
) -> Option<OpBuilder<'a>> {
    let Statement::Sigma {
        dest,
        src,
        pred,
        bound,
    } = stmt
    else {
        return None;
    };
    let ty = env.integral(*dest)?;
    build(move |g| {
        if env.func.value_type(*src) != Some(ty) {
            return Err(RangeError::shape(
                stmt,
                "sigma changes the type of its source",
            ));
        }
        let sink = g.ssa(env, stmt, *dest)?;
        let src = g.ssa(env, stmt, *src)?;
        let bound = match bound {
            Operand::Const(c) => SigmaBound::Const(
                Interval::constant(c.ty.sign(), c.ty.bitwidth(), c.value)
                    .cast(c.ty.sign(), ty.bitwidth(), ty.sign()),
            ),
            Operand::Var(_) => SigmaBound::Symbolic(g.operand(env, stmt, bound)?),
        };
        let op = Op::Sigma {
            src,
            pred: *pred,
            bound,
        };
        Ok(env.node(Some(sink), op, env.types.range_of(ty)))
    })
}

fn load<'a>(stmt: &'a Statement, env: &'a BuildEnv<'a>) -> Option<OpBuilder<'a>> {
    let Statement::Load { dest, addr } = stmt else {
        return None;
    };
    let ty = env.integral(*dest)?;
    build(move |g| {
        let sink = g.ssa(env, stmt, *dest)?;
        if let Some(index) = &addr.index {
            check_index(g, env, stmt, index)?;
        }
        check_base(env, stmt, addr)?;
        let fallback = env.types.range_of(ty);
        let objects = env.alias.points_to(env.func, addr);
        let objects = objects
            .iter()
            .flatten()
            .map(|o| memory_object(env, stmt, *o))
            .collect::<RangeResult<Vec<_>>>()?;

        let init = if env.fold_initializers {
            let index = match &addr.index {
                Some(Operand::Const(c)) if objects.len() == 1 => Some(c.value),
                _ => None,
            };
            objects.iter().fold(Interval::empty(ty.bitwidth()), |acc, mem| {
                let folded = fold_object(mem, index, g);
                acc.union_with(&folded.cast(
                    mem.elem.sign(),
                    ty.bitwidth(),
                    ty.sign(),
                ))
            })
        } else {
            fallback
        };

        let sources = match env.alias.load_sources(env.func, addr) {
            Some(objs) => Some(
                objs.into_iter()
                    .map(|o| g.memory(env, stmt, o))
                    .collect::<RangeResult<Vec<_>>>()?,
            ),
            None => None,
        };

        let readonly = !objects.is_empty() && objects.iter().all(|m| m.readonly);
        let intersect = if readonly && !init.is_empty() {
            init
        } else {
            fallback
        };
        let op = Op::Load {
            sources,
            init,
            fallback,
        };
        Ok(env.node(Some(sink), op, intersect))
    })
}

fn store<'a>(
    stmt: &'a Statement,
    env: &'a BuildEnv<'a>,
) -> Option<OpBuilder<'a>> {
    let Statement::Store { addr, value } = stmt else {
        return None;
    };
    env.integral_operand(value)?;
    build(move |g| {
        if let Some(index) = &addr.index {
            check_index(g, env, stmt, index)?;
        }
        check_base(env, stmt, addr)?;
        let src = g.operand(env, stmt, value)?;
        let targets = env
            .alias
            .store_targets(env.func, addr)
            .into_iter()
            .map(|o| g.memory(env, stmt, o))
            .collect::<RangeResult<Vec<_>>>()?;
        if targets.is_empty() {
            log::debug!("`{stmt}` writes no known object");
        }
        let width = g.vars[src].get_bit_width();
        Ok(env.node(None, Op::Store { src, targets }, Interval::unknown(width)))
    })
}

fn call<'a>(stmt: &'a Statement, env: &'a BuildEnv<'a>) -> Option<OpBuilder<'a>> {
    let Statement::Call {
        dest: Some(dest),
        callee,
        args,
    } = stmt
    else {
        return None;
    };
    let ty = env.integral(*dest)?;
    build(move |g| {
        let sink = g.ssa(env, stmt, *dest)?;
        let args = args
            .iter()
            .filter(|a| {
                env.func.operand_type(a).is_none_or(|ty| ty.is_integral())
            })
            .map(|a| g.operand(env, stmt, a))
            .collect::<RangeResult<Vec<_>>>()?;
        let summary = env.returns.get(callee).map(|r| r.resize(ty.sign(), ty.bitwidth()));
        let op = Op::Call {
            callee: *callee,
            args,
            summary,
        };
        Ok(env.node(Some(sink), op, env.types.range_of(ty)))
    })
}

/// Index operands must be declared integer values.
fn check_index(
    g: &mut GraphBuilder,
    env: &BuildEnv,
    stmt: &Statement,
    index: &Operand,
) -> RangeResult<()> {
    g.operand(env, stmt, index).map(|_| ())
}

/// The base of an address is either a memory object or a pointer value.
fn check_base(env: &BuildEnv, stmt: &Statement, addr: &Address) -> RangeResult<()> {
    if env.func.memory(addr.base).is_some()
        || matches!(env.func.value_type(addr.base), Some(Type::Pointer))
    {
        Ok(())
    } else {
        Err(RangeError::shape(
            stmt,
            format!("`{}` is neither a memory object nor a pointer", addr.base),
        ))
    }
}

/// Values the object holds before any store, in the element width.
/// `index` selects one element of the outermost dimension.
fn fold_object(
    mem: &MemoryObject,
    index: Option<i128>,
    g: &mut GraphBuilder,
) -> Interval {
    let width = mem.elem.bitwidth();
    let Some(init) = &mem.init else {
        // Statically allocated objects start zeroed; locals are undefined.
        return match mem.scope {
            Scope::Global => Interval::constant(mem.elem.sign(), width, 0),
            Scope::Local | Scope::Param => Interval::empty(width),
        };
    };
    let mut acc = Interval::empty(width);
    match (init, index, mem.dims.first()) {
        (Initializer::Aggregate(items), Some(k), Some(len)) => {
            if k < 0 || k >= i128::from(*len) {
                return acc;
            }
            match usize::try_from(k).ok().and_then(|k| items.get(k)) {
                Some(item) => fold(mem, item, &mem.dims[1..], &mut acc, g),
                None => acc = zero(mem, acc),
            }
        }
        _ => fold(mem, init, &mem.dims, &mut acc, g),
    }
    acc
}

fn zero(mem: &MemoryObject, acc: Interval) -> Interval {
    acc.union_with(&Interval::constant(
        mem.elem.sign(),
        mem.elem.bitwidth(),
        0,
    ))
}

fn fold(
    mem: &MemoryObject,
    init: &Initializer,
    dims: &[u64],
    acc: &mut Interval,
    g: &mut GraphBuilder,
) {
    match init {
        Initializer::Scalar(c) => {
            let (width, elem_width) = (c.ty.bitwidth(), mem.elem.bitwidth());
            if width > elem_width {
                g.warn(RangeError::MalformedInitializer {
                    object: mem.name.to_string(),
                    width,
                    elem_width,
                });
                return;
            }
            *acc = acc.union_with(&Interval::constant(
                mem.elem.sign(),
                elem_width,
                c.value,
            ));
        }
        Initializer::Aggregate(items) => {
            let inner = dims.get(1..).unwrap_or(&[]);
            for item in items {
                fold(mem, item, inner, acc, g);
            }
            if dims.first().is_some_and(|len| (items.len() as u64) < *len) {
                *acc = zero(mem, *acc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hls_ir::{Constant, Sign};

    fn scalar(v: i128, width: u32) -> Initializer {
        Initializer::Scalar(Constant::new(v, Type::unsigned(width)))
    }

    fn folded(mem: &MemoryObject, index: Option<i128>) -> (Interval, Vec<RangeError>) {
        let mut vars = IndexedMap::new();
        let mut keys = HashMap::new();
        let mut warnings = vec![];
        let mut g = GraphBuilder {
            vars: &mut vars,
            keys: &mut keys,
            warnings: &mut warnings,
        };
        let r = fold_object(mem, index, &mut g);
        (r, warnings)
    }

    fn table() -> MemoryObject {
        MemoryObject::new("tab", Type::unsigned(8), Scope::Global)
            .with_dims(vec![4])
            .readonly()
            .with_init(Initializer::Aggregate(vec![
                scalar(1, 8),
                scalar(2, 8),
                scalar(3, 8),
            ]))
    }

    #[test]
    fn holes_are_zero() {
        let (r, w) = folded(&table(), None);
        assert_eq!(r, Interval::new(Sign::Unsigned, 8, 0, 3));
        assert!(w.is_empty());
    }

    #[test]
    fn constant_index_selects_element() {
        let mem = table();
        assert_eq!(folded(&mem, Some(2)).0, Interval::constant(Sign::Unsigned, 8, 3));
        assert_eq!(folded(&mem, Some(3)).0, Interval::constant(Sign::Unsigned, 8, 0));
        assert!(folded(&mem, Some(9)).0.is_empty());
    }

    #[test]
    fn nested_and_malformed() {
        let mem = MemoryObject::new("m", Type::unsigned(8), Scope::Local)
            .with_dims(vec![2, 2])
            .with_init(Initializer::Aggregate(vec![
                Initializer::Aggregate(vec![scalar(5, 8), scalar(7, 8)]),
                Initializer::Aggregate(vec![scalar(300, 16)]),
            ]));
        let (r, w) = folded(&mem, None);
        // the 16-bit element is dropped, the hole it leaves is zero
        assert_eq!(r, Interval::new(Sign::Unsigned, 8, 0, 7));
        assert_eq!(w.len(), 1);
        assert!(!w[0].is_fatal());
    }

    #[test]
    fn uninitialized_objects() {
        let g = MemoryObject::new("g", Type::signed(16), Scope::Global);
        let l = MemoryObject::new("l", Type::signed(16), Scope::Local);
        assert_eq!(folded(&g, None).0, Interval::constant(Sign::Signed, 16, 0));
        assert!(folded(&l, None).0.is_empty());
    }

    #[test]
    fn registry_order() {
        let mut rules = Recognizers::default();
        assert_eq!(rules.kinds().count(), OpKind::ALL.len());
        rules.remove(OpKind::Load);
        assert!(rules.kinds().all(|k| k != OpKind::Load));
        rules.register(OpKind::Load, load);
        assert_eq!(rules.kinds().next(), Some(OpKind::Load));
    }
}
