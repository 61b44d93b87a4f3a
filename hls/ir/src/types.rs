use std::fmt;

/// How the bits of an integer value are interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Sign {
    Signed,
    Unsigned,
}

impl Sign {
    pub fn is_signed(&self) -> bool {
        matches!(self, Sign::Signed)
    }
}

/// Declared type of a program value or memory element.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serialize",
    derive(serde::Serialize, serde::Deserialize)
)]
pub enum Type {
    Int { width: u32, signed: bool },
    Bool,
    Float { width: u32 },
    Pointer,
    Array { elem: Box<Type>, len: u64 },
    Void,
}

/// Width of pointer values.
const POINTER_WIDTH: u32 = 64;

impl Type {
    pub fn int(width: u32, signed: bool) -> Self {
        Type::Int { width, signed }
    }

    pub fn signed(width: u32) -> Self {
        Type::Int {
            width,
            signed: true,
        }
    }

    pub fn unsigned(width: u32) -> Self {
        Type::Int {
            width,
            signed: false,
        }
    }

    pub fn array(elem: Type, len: u64) -> Self {
        Type::Array {
            elem: Box::new(elem),
            len,
        }
    }

    /// Number of bits used to store a value of this type.
    pub fn bitwidth(&self) -> u32 {
        match self {
            Type::Int { width, .. } | Type::Float { width } => *width,
            Type::Bool => 1,
            Type::Pointer => POINTER_WIDTH,
            Type::Array { elem, len } => {
                let total = u64::from(elem.bitwidth()).saturating_mul(*len);
                u32::try_from(total).unwrap_or(u32::MAX)
            }
            Type::Void => 0,
        }
    }

    /// Values of integral types are the ones tracked by the range analysis.
    pub fn is_integral(&self) -> bool {
        matches!(self, Type::Int { .. } | Type::Bool)
    }

    pub fn sign(&self) -> Sign {
        match self {
            Type::Int { signed: true, .. } => Sign::Signed,
            _ => Sign::Unsigned,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int {
                width,
                signed: true,
            } => write!(f, "i{width}"),
            Type::Int {
                width,
                signed: false,
            } => write!(f, "u{width}"),
            Type::Bool => write!(f, "bool"),
            Type::Float { width } => write!(f, "f{width}"),
            Type::Pointer => write!(f, "ptr"),
            Type::Array { elem, len } => write!(f, "{elem}[{len}]"),
            Type::Void => write!(f, "void"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_and_signs() {
        assert_eq!(Type::signed(32).bitwidth(), 32);
        assert_eq!(Type::Bool.bitwidth(), 1);
        assert_eq!(Type::array(Type::unsigned(8), 4).bitwidth(), 32);
        assert_eq!(Type::signed(8).sign(), Sign::Signed);
        assert_eq!(Type::Bool.sign(), Sign::Unsigned);
        assert!(!Type::Float { width: 32 }.is_integral());
        assert_eq!(Type::array(Type::signed(16), 3).to_string(), "i16[3]");
    }
}
