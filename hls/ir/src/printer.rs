//! Implements a formatter for the in-memory representation of functions.
use crate::Function;
use itertools::Itertools;
use std::io;

/// Printer for the IR.
pub struct Printer;

impl Printer {
    /// Format the signature of a function: `f(a: i32, b: u8)`.
    pub fn signature_str(func: &Function) -> String {
        let params = func
            .params
            .iter()
            .map(|p| match func.value_type(*p) {
                Some(ty) => format!("{p}: {ty}"),
                None => format!("{p}: ?"),
            })
            .join(", ");
        format!("{}({params})", func.name)
    }

    /// Write a function to the given stream.
    pub fn write_function<F: io::Write>(
        func: &Function,
        f: &mut F,
    ) -> io::Result<()> {
        writeln!(f, "func {} {{", Self::signature_str(func))?;
        for mem in &func.memories {
            writeln!(f, "  {mem};")?;
        }
        for (ptr, objs) in &func.points_to {
            writeln!(f, "  // {ptr} -> {{{}}}", objs.iter().join(", "))?;
        }
        for stmt in &func.body {
            match stmt.dest().and_then(|d| func.value_type(d)) {
                Some(ty) => writeln!(f, "  {stmt}; // {ty}")?,
                None => writeln!(f, "  {stmt};")?,
            }
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::Printer;
    use crate::{BinOp, FunctionBuilder, Operand, Type};

    #[test]
    fn prints_body() {
        let func = FunctionBuilder::new("inc")
            .param("x", Type::unsigned(8))
            .binary(
                "y",
                Type::unsigned(8),
                BinOp::Add,
                Operand::var("x"),
                Operand::int(1, Type::unsigned(8)),
            )
            .ret(Some(Operand::var("y")))
            .build();
        let mut buf = Vec::new();
        Printer::write_function(&func, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "func inc(x: u8) {\n  y = add x, 1:u8; // u8\n  return y;\n}\n"
        );
    }
}
