//! IR builder. Provides convience methods to build function bodies.
use crate::{
    Address, BinOp, Function, Id, MemoryObject, Operand, Predicate,
    Statement, Type, UnOp,
};

/// Incrementally builds a [Function]. Values are declared the first time
/// they are defined, so statements can be added in program order without
/// separate declarations.
pub struct FunctionBuilder {
    func: Function,
}

impl FunctionBuilder {
    pub fn new<S: AsRef<str>>(name: S) -> Self {
        Self {
            func: Function::new(name),
        }
    }

    fn declare(&mut self, name: &str, ty: Type) -> Id {
        let id = Id::new(name);
        self.func.values.insert(id, ty);
        id
    }

    /// Add a parameter with the given type.
    pub fn param(mut self, name: &str, ty: Type) -> Self {
        let id = self.declare(name, ty);
        self.func.params.push(id);
        self
    }

    /// Declare a value without defining it.
    pub fn value(mut self, name: &str, ty: Type) -> Self {
        self.declare(name, ty);
        self
    }

    pub fn memory(mut self, mem: MemoryObject) -> Self {
        self.func.memories.push(mem);
        self
    }

    /// Record the memory objects a pointer-valued name may refer to.
    pub fn points_to(mut self, ptr: &str, objects: &[&str]) -> Self {
        self.func
            .points_to
            .insert(Id::new(ptr), objects.iter().map(Id::new).collect());
        self
    }

    /// Append an already constructed statement.
    pub fn stmt(mut self, stmt: Statement) -> Self {
        self.func.body.push(stmt);
        self
    }

    pub fn assign(mut self, dest: &str, ty: Type, src: Operand) -> Self {
        let dest = self.declare(dest, ty);
        self.stmt(Statement::Assign { dest, src })
    }

    pub fn cast(mut self, dest: &str, ty: Type, src: Operand) -> Self {
        let dest = self.declare(dest, ty);
        self.stmt(Statement::Cast { dest, src })
    }

    pub fn unary(mut self, dest: &str, ty: Type, op: UnOp, src: Operand) -> Self {
        let dest = self.declare(dest, ty);
        self.stmt(Statement::Unary { dest, op, src })
    }

    pub fn binary(
        mut self,
        dest: &str,
        ty: Type,
        op: BinOp,
        lhs: Operand,
        rhs: Operand,
    ) -> Self {
        let dest = self.declare(dest, ty);
        self.stmt(Statement::Binary { dest, op, lhs, rhs })
    }

    pub fn select(
        mut self,
        dest: &str,
        ty: Type,
        cond: Operand,
        then_val: Operand,
        else_val: Operand,
    ) -> Self {
        let dest = self.declare(dest, ty);
        self.stmt(Statement::Ternary {
            dest,
            cond,
            then_val,
            else_val,
        })
    }

    pub fn phi(mut self, dest: &str, ty: Type, incoming: Vec<Operand>) -> Self {
        let dest = self.declare(dest, ty);
        self.stmt(Statement::Phi { dest, incoming })
    }

    /// `dest` is a copy of `src` restricted by `src pred bound`. The
    /// destination takes the type of the source.
    pub fn sigma(
        mut self,
        dest: &str,
        src: &str,
        pred: Predicate,
        bound: Operand,
    ) -> Self {
        let src = Id::new(src);
        let ty = self.func.values.get(&src).cloned().unwrap_or(Type::Void);
        let dest = self.declare(dest, ty);
        self.stmt(Statement::Sigma {
            dest,
            src,
            pred,
            bound,
        })
    }

    pub fn load(mut self, dest: &str, ty: Type, addr: Address) -> Self {
        let dest = self.declare(dest, ty);
        self.stmt(Statement::Load { dest, addr })
    }

    pub fn store(self, addr: Address, value: Operand) -> Self {
        self.stmt(Statement::Store { addr, value })
    }

    pub fn call(
        mut self,
        dest: Option<(&str, Type)>,
        callee: &str,
        args: Vec<Operand>,
    ) -> Self {
        let dest = dest.map(|(name, ty)| self.declare(name, ty));
        self.stmt(Statement::Call {
            dest,
            callee: Id::new(callee),
            args,
        })
    }

    pub fn ret(self, value: Option<Operand>) -> Self {
        self.stmt(Statement::Return { value })
    }

    pub fn build(self) -> Function {
        self.func
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_on_definition() {
        let func = FunctionBuilder::new("f")
            .param("n", Type::signed(32))
            .binary(
                "m",
                Type::signed(32),
                BinOp::Add,
                Operand::var("n"),
                Operand::int(1, Type::signed(32)),
            )
            .sigma("m.t", "m", Predicate::Slt, Operand::int(10, Type::signed(32)))
            .ret(Some(Operand::var("m.t")))
            .build();
        assert!(func.is_param(Id::new("n")));
        assert_eq!(func.value_type(Id::new("m.t")), Some(&Type::signed(32)));
        assert_eq!(func.body.len(), 3);
        assert_eq!(func.version, 0);
    }
}
