use crate::{GetName, Id, MemoryObject, Operand, Statement, Type};
use std::collections::BTreeMap;

/// A function body in SSA form together with the declarations the analyses
/// need to interpret it.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Function {
    pub name: Id,
    /// Parameters in declaration order. Their types live in `values`.
    #[cfg_attr(feature = "serialize", serde(default))]
    pub params: Vec<Id>,
    /// Declared type of every SSA value, parameters included.
    #[cfg_attr(feature = "serialize", serde(default))]
    pub values: BTreeMap<Id, Type>,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub memories: Vec<MemoryObject>,
    /// Statements in program order.
    pub body: Vec<Statement>,
    /// Memory objects each pointer-valued SSA name may refer to. A pointer
    /// without an entry may refer to anything.
    #[cfg_attr(feature = "serialize", serde(default))]
    pub points_to: BTreeMap<Id, Vec<Id>>,
    /// Incremented whenever the body is changed by a transformation.
    #[cfg_attr(feature = "serialize", serde(default))]
    pub version: u64,
}

impl Function {
    pub fn new<S: AsRef<str>>(name: S) -> Self {
        Self {
            name: Id::new(name),
            params: vec![],
            values: BTreeMap::new(),
            memories: vec![],
            body: vec![],
            points_to: BTreeMap::new(),
            version: 0,
        }
    }

    pub fn value_type(&self, value: Id) -> Option<&Type> {
        self.values.get(&value)
    }

    pub fn operand_type<'a>(&'a self, op: &'a Operand) -> Option<&'a Type> {
        match op {
            Operand::Var(id) => self.value_type(*id),
            Operand::Const(c) => Some(&c.ty),
        }
    }

    pub fn memory(&self, name: Id) -> Option<&MemoryObject> {
        self.memories.iter().find(|m| m.name == name)
    }

    pub fn is_param(&self, value: Id) -> bool {
        self.params.contains(&value)
    }

    /// Signal that the body changed and every analysis result computed on
    /// an earlier snapshot is stale.
    pub fn bump_version(&mut self) {
        self.version += 1;
    }

    /// Mutable access to the statements. Counts as a change of the body.
    pub fn body_mut(&mut self) -> &mut Vec<Statement> {
        self.bump_version();
        &mut self.body
    }
}

impl GetName for Function {
    fn name(&self) -> Id {
        self.name
    }
}
