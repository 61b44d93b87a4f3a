use super::{Interval, RangeError, RangeResult};
use hls_idx::impl_index;
use hls_ir::{Id, Sign};
use std::fmt;

/// Index of a [VarNode] inside its container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarIdx(u32);
impl_index!(VarIdx);

/// Identity of the program value a [VarNode] stands for. Keys are unique
/// within one container.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKey {
    /// An SSA name.
    Ssa(Id),
    /// A memory object, all of whose elements are merged.
    Memory(Id),
    /// An integer literal of the given width and signedness.
    Constant { value: i128, width: u32, signed: bool },
}

impl fmt::Display for ValueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKey::Ssa(id) => write!(f, "{id}"),
            ValueKey::Memory(id) => write!(f, "mem:{id}"),
            ValueKey::Constant {
                value,
                width,
                signed,
            } => write!(f, "{value}:{}{width}", if *signed { "i" } else { "u" }),
        }
    }
}

/// Graph vertex holding the current best-known range of one program value.
#[derive(Clone, Debug)]
pub struct VarNode {
    key: ValueKey,
    /// Declared width. The range never gets wider than this.
    width: u32,
    sign: Sign,
    /// A-priori bound of the declared type.
    type_bound: Interval,
    range: Interval,
}

impl VarNode {
    pub(super) fn new(
        key: ValueKey,
        width: u32,
        sign: Sign,
        type_bound: Interval,
    ) -> Self {
        Self {
            key,
            width,
            sign,
            type_bound,
            range: Interval::empty(width),
        }
    }

    pub fn get_range(&self) -> Interval {
        self.range
    }

    /// Replace the current range. Fails if the range is wider than the
    /// declared width, which means some transfer function is broken.
    pub fn set_range(&mut self, range: Interval) -> RangeResult<()> {
        if range.bitwidth() > self.width {
            return Err(RangeError::RangeBitwidthOverflow {
                value: self.key.to_string(),
                width: range.bitwidth(),
                declared: self.width,
            });
        }
        self.range = range;
        Ok(())
    }

    pub fn get_bit_width(&self) -> u32 {
        self.width
    }

    pub fn get_value(&self) -> &ValueKey {
        &self.key
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub fn type_bound(&self) -> Interval {
        self.type_bound
    }

    /// Name of the represented SSA value or memory object.
    pub fn name(&self) -> Option<Id> {
        match self.key {
            ValueKey::Ssa(id) | ValueKey::Memory(id) => Some(id),
            ValueKey::Constant { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wider_ranges_are_rejected() {
        let mut v = VarNode::new(
            ValueKey::Ssa(Id::new("x")),
            8,
            Sign::Unsigned,
            Interval::unknown(8),
        );
        assert!(v.get_range().is_empty());
        v.set_range(Interval::new(Sign::Unsigned, 8, 1, 4)).unwrap();
        assert_eq!(v.get_range(), Interval::new(Sign::Unsigned, 8, 1, 4));
        let err = v.set_range(Interval::unknown(16)).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, RangeError::RangeBitwidthOverflow { declared: 8, .. }));
        // the failed update leaves the range untouched
        assert_eq!(v.get_range(), Interval::new(Sign::Unsigned, 8, 1, 4));
    }
}
