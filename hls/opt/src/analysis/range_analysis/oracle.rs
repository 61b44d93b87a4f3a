//! Interfaces to the analyses the range analysis relies on, with default
//! implementations that read the information stored in the IR.
use super::Interval;
use hls_ir::{Address, Function, Id, Operand, Statement, Type};
use std::collections::HashSet;

/// Supplies the a-priori range of values of a declared type.
pub trait TypeRangeOracle {
    fn range_of(&self, ty: &Type) -> Interval;
}

/// Every value representable by the declared type.
#[derive(Default, Clone, Copy, Debug)]
pub struct DeclaredTypeOracle;

impl TypeRangeOracle for DeclaredTypeOracle {
    fn range_of(&self, ty: &Type) -> Interval {
        Interval::unknown(ty.bitwidth())
    }
}

/// Supplies the memory objects touched by loads and stores.
pub trait AliasOracle {
    /// Memory objects `addr` may refer to, or `None` if they cannot be
    /// enumerated.
    fn points_to(&self, func: &Function, addr: &Address) -> Option<Vec<Id>>;

    /// The object may change in ways not described by the stores of `func`.
    fn is_clobbered(&self, func: &Function, object: Id) -> bool;

    /// Candidate objects whose stores can reach a load from `addr`. `None`
    /// when some candidate is unknown or may be modified elsewhere.
    fn load_sources(&self, func: &Function, addr: &Address) -> Option<Vec<Id>> {
        let objs = self.points_to(func, addr)?;
        if objs.iter().any(|o| self.is_clobbered(func, *o)) {
            None
        } else {
            Some(objs)
        }
    }

    /// Objects a store to `addr` may write.
    fn store_targets(&self, func: &Function, addr: &Address) -> Vec<Id>;
}

/// Alias information read from the points-to table of the function.
///
/// A base naming a memory object refers to exactly that object. A pointer
/// base refers to the objects of its points-to entry; a pointer without an
/// entry may refer to any object. Objects whose address is passed to a
/// call are treated as clobbered, as are writable objects visible outside
/// the function.
#[derive(Default, Clone, Copy, Debug)]
pub struct PointsToOracle;

impl PointsToOracle {
    /// Objects whose address escapes into a call.
    fn escaping(func: &Function) -> HashSet<Id> {
        let mut escaping = HashSet::new();
        for stmt in &func.body {
            let Statement::Call { args, .. } = stmt else {
                continue;
            };
            for arg in args {
                let Operand::Var(v) = arg else { continue };
                if func.memory(*v).is_some() {
                    escaping.insert(*v);
                } else if matches!(func.value_type(*v), Some(Type::Pointer)) {
                    match func.points_to.get(v) {
                        Some(objs) => escaping.extend(objs.iter().copied()),
                        None => {
                            escaping.extend(func.memories.iter().map(|m| m.name))
                        }
                    }
                }
            }
        }
        escaping
    }
}

impl AliasOracle for PointsToOracle {
    fn points_to(&self, func: &Function, addr: &Address) -> Option<Vec<Id>> {
        if func.memory(addr.base).is_some() {
            return Some(vec![addr.base]);
        }
        func.points_to.get(&addr.base).cloned()
    }

    fn is_clobbered(&self, func: &Function, object: Id) -> bool {
        let Some(mem) = func.memory(object) else {
            return true;
        };
        if mem.readonly {
            return false;
        }
        mem.is_externally_modifiable() || Self::escaping(func).contains(&object)
    }

    fn store_targets(&self, func: &Function, addr: &Address) -> Vec<Id> {
        match self.points_to(func, addr) {
            Some(objs) => objs,
            None => func
                .memories
                .iter()
                .filter(|m| !m.readonly)
                .map(|m| m.name)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hls_ir::{FunctionBuilder, MemoryObject, Scope};

    fn func() -> Function {
        FunctionBuilder::new("f")
            .param("p", Type::Pointer)
            .value("q", Type::Pointer)
            .memory(MemoryObject::new("g", Type::signed(32), Scope::Global))
            .memory(
                MemoryObject::new("t", Type::unsigned(8), Scope::Global)
                    .with_dims(vec![4])
                    .readonly(),
            )
            .memory(
                MemoryObject::new("l", Type::signed(32), Scope::Local)
                    .with_dims(vec![8]),
            )
            .memory(
                MemoryObject::new("e", Type::signed(32), Scope::Local)
                    .with_dims(vec![8]),
            )
            .points_to("q", &["l"])
            .call(None, "consume", vec![Operand::var("e")])
            .build()
    }

    #[test]
    fn resolution() {
        let f = func();
        let o = PointsToOracle;
        let direct = Address::new("t", None);
        assert_eq!(o.points_to(&f, &direct), Some(vec![Id::new("t")]));
        assert_eq!(
            o.load_sources(&f, &Address::new("q", None)),
            Some(vec![Id::new("l")])
        );
        // unknown pointer
        assert_eq!(o.load_sources(&f, &Address::new("p", None)), None);
        // externally visible global
        assert_eq!(o.load_sources(&f, &Address::new("g", None)), None);
        // escapes into a call
        assert_eq!(o.load_sources(&f, &Address::new("e", None)), None);
        assert!(!o.is_clobbered(&f, Id::new("t")));
    }

    #[test]
    fn unknown_stores_hit_every_writable_object() {
        let f = func();
        let o = PointsToOracle;
        let mut targets = o.store_targets(&f, &Address::new("p", None));
        targets.sort();
        assert_eq!(
            targets,
            vec![Id::new("e"), Id::new("g"), Id::new("l")]
        );
        assert_eq!(
            o.store_targets(&f, &Address::new("q", None)),
            vec![Id::new("l")]
        );
    }
}
