use crate::{Constant, GetName, Id, Type};
use itertools::Itertools;
use std::fmt;

/// Where a memory object lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Scope {
    /// File-scope object. Visible to other translation units unless
    /// read-only.
    Global,
    /// Function-local object.
    Local,
    /// Memory passed in by the caller through a pointer parameter.
    Param,
}

/// Static initializer of a memory object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Initializer {
    Scalar(Constant),
    /// One entry per position of the outermost dimension. Missing trailing
    /// positions are zero-filled.
    Aggregate(Vec<Initializer>),
}

impl fmt::Display for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Initializer::Scalar(c) => write!(f, "{}", c.value),
            Initializer::Aggregate(elems) => {
                write!(f, "{{{}}}", elems.iter().join(", "))
            }
        }
    }
}

/// An aggregate or scalar memory location treated monolithically.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct MemoryObject {
    pub name: Id,
    /// Type of the innermost element.
    pub elem: Type,
    /// Array dimensions, outermost first. Empty for scalars.
    #[cfg_attr(feature = "serialize", serde(default))]
    pub dims: Vec<u64>,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub readonly: bool,
    pub scope: Scope,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub init: Option<Initializer>,
}

impl MemoryObject {
    pub fn new<S: AsRef<str>>(name: S, elem: Type, scope: Scope) -> Self {
        Self {
            name: Id::new(name),
            elem,
            dims: vec![],
            readonly: false,
            scope,
            init: None,
        }
    }

    pub fn with_dims(mut self, dims: Vec<u64>) -> Self {
        self.dims = dims;
        self
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn with_init(mut self, init: Initializer) -> Self {
        self.init = Some(init);
        self
    }

    /// Total number of elements.
    pub fn len(&self) -> u64 {
        self.dims.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Code outside the current function may write the object.
    pub fn is_externally_modifiable(&self) -> bool {
        match self.scope {
            Scope::Global | Scope::Param => !self.readonly,
            Scope::Local => false,
        }
    }
}

impl GetName for MemoryObject {
    fn name(&self) -> Id {
        self.name
    }
}

impl fmt::Display for MemoryObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scope = match self.scope {
            Scope::Global => "global",
            Scope::Local => "local",
            Scope::Param => "param",
        };
        write!(f, "{scope} ")?;
        if self.readonly {
            write!(f, "const ")?;
        }
        write!(f, "{}: {}", self.name, self.elem)?;
        for d in &self.dims {
            write!(f, "[{d}]")?;
        }
        if let Some(init) = &self.init {
            write!(f, " = {init}")?;
        }
        Ok(())
    }
}
