use crate::{Id, Type, types::Sign};
use itertools::Itertools;
use std::fmt;

/// An integer literal together with its type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Constant {
    pub value: i128,
    pub ty: Type,
}

impl Constant {
    pub fn new(value: i128, ty: Type) -> Self {
        Self { value, ty }
    }
}

/// Something a statement reads.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Operand {
    /// An SSA value defined by another statement or a parameter.
    Var(Id),
    Const(Constant),
}

impl Operand {
    pub fn var<S: AsRef<str>>(name: S) -> Self {
        Operand::Var(Id::new(name))
    }

    pub fn int(value: i128, ty: Type) -> Self {
        Operand::Const(Constant::new(value, ty))
    }

    pub fn as_var(&self) -> Option<Id> {
        match self {
            Operand::Var(id) => Some(*id),
            Operand::Const(_) => None,
        }
    }
}

/// Comparison predicates. The signedness is part of the predicate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Predicate {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl Predicate {
    pub fn sign(&self) -> Option<Sign> {
        use Predicate as P;
        match self {
            P::Eq | P::Ne => None,
            P::Slt | P::Sle | P::Sgt | P::Sge => Some(Sign::Signed),
            P::Ult | P::Ule | P::Ugt | P::Uge => Some(Sign::Unsigned),
        }
    }

    /// The predicate that holds after exchanging the operands.
    pub fn swap(&self) -> Self {
        use Predicate as P;
        match self {
            P::Eq => P::Eq,
            P::Ne => P::Ne,
            P::Slt => P::Sgt,
            P::Sle => P::Sge,
            P::Sgt => P::Slt,
            P::Sge => P::Sle,
            P::Ult => P::Ugt,
            P::Ule => P::Uge,
            P::Ugt => P::Ult,
            P::Uge => P::Ule,
        }
    }

    /// The predicate that holds exactly when this one does not.
    pub fn negate(&self) -> Self {
        use Predicate as P;
        match self {
            P::Eq => P::Ne,
            P::Ne => P::Eq,
            P::Slt => P::Sge,
            P::Sle => P::Sgt,
            P::Sgt => P::Sle,
            P::Sge => P::Slt,
            P::Ult => P::Uge,
            P::Ule => P::Ugt,
            P::Ugt => P::Ule,
            P::Uge => P::Ult,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use Predicate as P;
        match self {
            P::Eq => "eq",
            P::Ne => "ne",
            P::Slt => "slt",
            P::Sle => "sle",
            P::Sgt => "sgt",
            P::Sge => "sge",
            P::Ult => "ult",
            P::Ule => "ule",
            P::Ugt => "ugt",
            P::Uge => "uge",
        }
    }
}

/// Binary operators. `Div`, `Rem` and `Shr` take their signedness from the
/// type of the left operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    And,
    Or,
    Xor,
    Min,
    Max,
    Cmp(Predicate),
    Rotl,
    Rotr,
}

impl BinOp {
    pub fn is_shift(&self) -> bool {
        matches!(self, BinOp::Shl | BinOp::Shr | BinOp::Rotl | BinOp::Rotr)
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "div",
            BinOp::Rem => "rem",
            BinOp::Shl => "shl",
            BinOp::Shr => "shr",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Min => "min",
            BinOp::Max => "max",
            BinOp::Cmp(p) => return write!(f, "cmp.{}", p.as_str()),
            BinOp::Rotl => "rotl",
            BinOp::Rotr => "rotr",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum UnOp {
    /// Arithmetic negation.
    Neg,
    /// Bitwise complement.
    Not,
    Abs,
    /// Logical not, produces a boolean.
    LNot,
    Bswap,
}

impl fmt::Display for UnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnOp::Neg => "neg",
            UnOp::Not => "not",
            UnOp::Abs => "abs",
            UnOp::LNot => "lnot",
            UnOp::Bswap => "bswap",
        })
    }
}

/// A memory access `base[index]`. The base either names a memory object
/// directly or is a pointer-valued SSA name resolved by the points-to table.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub struct Address {
    pub base: Id,
    #[cfg_attr(feature = "serialize", serde(default))]
    pub index: Option<Operand>,
}

impl Address {
    pub fn new<S: AsRef<str>>(base: S, index: Option<Operand>) -> Self {
        Self {
            base: Id::new(base),
            index,
        }
    }
}

/// One statement of a function body.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Statement {
    /// Copy with identical source and destination types.
    Assign { dest: Id, src: Operand },
    /// Integer conversion to the destination type.
    Cast { dest: Id, src: Operand },
    Unary { dest: Id, op: UnOp, src: Operand },
    Binary {
        dest: Id,
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    },
    /// `dest = cond ? then_val : else_val`
    Ternary {
        dest: Id,
        cond: Operand,
        then_val: Operand,
        else_val: Operand,
    },
    Phi { dest: Id, incoming: Vec<Operand> },
    /// Copy of `src` on a control flow edge where `src pred bound` holds.
    Sigma {
        dest: Id,
        src: Id,
        pred: Predicate,
        bound: Operand,
    },
    Load { dest: Id, addr: Address },
    Store { addr: Address, value: Operand },
    Call {
        dest: Option<Id>,
        callee: Id,
        args: Vec<Operand>,
    },
    Return { value: Option<Operand> },
    /// Anything the front end cannot describe (inline assembly, builtins).
    Opaque { dest: Option<Id>, text: String },
}

impl Statement {
    /// The SSA value defined by this statement, if any.
    pub fn dest(&self) -> Option<Id> {
        match self {
            Statement::Assign { dest, .. }
            | Statement::Cast { dest, .. }
            | Statement::Unary { dest, .. }
            | Statement::Binary { dest, .. }
            | Statement::Ternary { dest, .. }
            | Statement::Phi { dest, .. }
            | Statement::Sigma { dest, .. }
            | Statement::Load { dest, .. } => Some(*dest),
            Statement::Call { dest, .. } | Statement::Opaque { dest, .. } => {
                *dest
            }
            Statement::Store { .. } | Statement::Return { .. } => None,
        }
    }

    /// Every operand read by this statement, in order.
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Statement::Assign { src, .. }
            | Statement::Cast { src, .. }
            | Statement::Unary { src, .. } => vec![src],
            Statement::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            Statement::Ternary {
                cond,
                then_val,
                else_val,
                ..
            } => vec![cond, then_val, else_val],
            Statement::Phi { incoming, .. } => incoming.iter().collect(),
            Statement::Sigma { bound, .. } => vec![bound],
            Statement::Load { addr, .. } => addr.index.iter().collect(),
            Statement::Store { addr, value } => {
                addr.index.iter().chain(std::iter::once(value)).collect()
            }
            Statement::Call { args, .. } => args.iter().collect(),
            Statement::Return { value } => value.iter().collect(),
            Statement::Opaque { .. } => vec![],
        }
    }

    /// Short name of the statement kind used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Assign { .. } => "assign",
            Statement::Cast { .. } => "cast",
            Statement::Unary { .. } => "unary",
            Statement::Binary { .. } => "binary",
            Statement::Ternary { .. } => "ternary",
            Statement::Phi { .. } => "phi",
            Statement::Sigma { .. } => "sigma",
            Statement::Load { .. } => "load",
            Statement::Store { .. } => "store",
            Statement::Call { .. } => "call",
            Statement::Return { .. } => "return",
            Statement::Opaque { .. } => "opaque",
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Var(id) => write!(f, "{id}"),
            Operand::Const(c) => write!(f, "{}:{}", c.value, c.ty),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.index {
            Some(idx) => write!(f, "{}[{idx}]", self.base),
            None => write!(f, "*{}", self.base),
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Assign { dest, src } => write!(f, "{dest} = {src}"),
            Statement::Cast { dest, src } => write!(f, "{dest} = cast {src}"),
            Statement::Unary { dest, op, src } => {
                write!(f, "{dest} = {op} {src}")
            }
            Statement::Binary { dest, op, lhs, rhs } => {
                write!(f, "{dest} = {op} {lhs}, {rhs}")
            }
            Statement::Ternary {
                dest,
                cond,
                then_val,
                else_val,
            } => write!(f, "{dest} = {cond} ? {then_val} : {else_val}"),
            Statement::Phi { dest, incoming } => {
                write!(f, "{dest} = phi({})", incoming.iter().join(", "))
            }
            Statement::Sigma {
                dest,
                src,
                pred,
                bound,
            } => write!(f, "{dest} = sigma({src} {} {bound})", pred.as_str()),
            Statement::Load { dest, addr } => write!(f, "{dest} = load {addr}"),
            Statement::Store { addr, value } => {
                write!(f, "store {addr}, {value}")
            }
            Statement::Call { dest, callee, args } => {
                if let Some(dest) = dest {
                    write!(f, "{dest} = ")?;
                }
                write!(f, "call {callee}({})", args.iter().join(", "))
            }
            Statement::Return { value: Some(v) } => write!(f, "return {v}"),
            Statement::Return { value: None } => write!(f, "return"),
            Statement::Opaque { dest, text } => {
                if let Some(dest) = dest {
                    write!(f, "{dest} = ")?;
                }
                write!(f, "opaque \"{text}\"")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_algebra() {
        for p in [
            Predicate::Eq,
            Predicate::Ne,
            Predicate::Slt,
            Predicate::Sle,
            Predicate::Sgt,
            Predicate::Sge,
            Predicate::Ult,
            Predicate::Ule,
            Predicate::Ugt,
            Predicate::Uge,
        ] {
            assert_eq!(p.swap().swap(), p);
            assert_eq!(p.negate().negate(), p);
            assert_eq!(p.swap().sign(), p.sign());
        }
        assert_eq!(Predicate::Slt.negate(), Predicate::Sge);
        assert_eq!(Predicate::Ult.swap(), Predicate::Ugt);
    }

    #[test]
    fn statement_accessors() {
        let st = Statement::Store {
            addr: Address::new("a", Some(Operand::var("i"))),
            value: Operand::int(3, Type::signed(32)),
        };
        assert_eq!(st.dest(), None);
        assert_eq!(st.operands().len(), 2);
        assert_eq!(st.to_string(), "store a[i], 3:i32");

        let phi = Statement::Phi {
            dest: Id::new("x"),
            incoming: vec![Operand::int(0, Type::signed(32)), Operand::var("y")],
        };
        assert_eq!(phi.dest(), Some(Id::new("x")));
        assert_eq!(phi.to_string(), "x = phi(0:i32, y)");
    }
}
