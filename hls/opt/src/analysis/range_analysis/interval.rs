use hls_ir::{Predicate, Sign};
use hls_utils::{signed_bits_for, unsigned_bits_for};
use std::{cmp, fmt};

/// Widest bit-width for which Regular intervals are tracked. Wider values are
/// always Unknown (or Empty).
pub const MAX_REGULAR_WIDTH: u32 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Bounds {
    Empty,
    Regular { lo: i128, hi: i128 },
    Unknown,
}

/// A set of integers of a fixed bit-width.
///
/// Signedness is not part of the value: a Regular interval stores its bounds
/// in the window of the signedness the caller interprets it with, i.e.
/// `[-2^(w-1), 2^(w-1) - 1]` for signed and `[0, 2^w - 1]` for unsigned
/// values. Every operation that depends on the interpretation takes a
/// [Sign]. A Regular interval never covers a whole window; such intervals
/// are normalized to Unknown.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    width: u32,
    bounds: Bounds,
}

/// The interpretation window of `width` bits, or `None` when Regular
/// intervals are not tracked for the width.
pub(crate) fn window(sign: Sign, width: u32) -> Option<(i128, i128)> {
    if width == 0 || width > MAX_REGULAR_WIDTH {
        return None;
    }
    Some(match sign {
        Sign::Signed => (-(1i128 << (width - 1)), (1i128 << (width - 1)) - 1),
        Sign::Unsigned => (0, (1i128 << width) - 1),
    })
}

impl Interval {
    pub fn empty(width: u32) -> Self {
        Self {
            width,
            bounds: Bounds::Empty,
        }
    }

    pub fn unknown(width: u32) -> Self {
        Self {
            width,
            bounds: Bounds::Unknown,
        }
    }

    /// Regular interval `[lo, hi]` restricted to the window of `sign`.
    /// Returns Empty when `lo > hi` or the interval lies outside the window.
    pub fn new(sign: Sign, width: u32, lo: i128, hi: i128) -> Self {
        let Some((wmin, wmax)) = window(sign, width) else {
            return if lo > hi {
                Self::empty(width)
            } else {
                Self::unknown(width)
            };
        };
        let (lo, hi) = (cmp::max(lo, wmin), cmp::min(hi, wmax));
        if lo > hi {
            Self::empty(width)
        } else {
            Self::normalized(width, lo, hi)
        }
    }

    /// The single value `value`, wrapped into the window of `sign`.
    pub fn constant(sign: Sign, width: u32, value: i128) -> Self {
        Self::fit(sign, width, value, value)
    }

    /// Assumes `lo <= hi` inside some window of `width` bits.
    fn normalized(width: u32, lo: i128, hi: i128) -> Self {
        let full = hi - lo == (1i128 << width) - 1;
        Self {
            width,
            bounds: if full {
                Bounds::Unknown
            } else {
                Bounds::Regular { lo, hi }
            },
        }
    }

    /// Reduce the mathematical interval `[lo, hi]` modulo `2^width` into the
    /// window of `sign`. The result is Unknown when the image is not a
    /// contiguous range of the window. Arithmetic results of both signs go
    /// through here since the hardware wraps either way.
    pub(crate) fn fit(sign: Sign, width: u32, lo: i128, hi: i128) -> Self {
        if lo > hi {
            return Self::empty(width);
        }
        let Some((wmin, wmax)) = window(sign, width) else {
            return Self::unknown(width);
        };
        if lo >= wmin && hi <= wmax {
            return Self::normalized(width, lo, hi);
        }
        let m = 1i128 << width;
        let shifted = hi.checked_sub(lo).and_then(|span| {
            if span >= m - 1 {
                return None;
            }
            let off = lo.checked_sub(wmin)?.rem_euclid(m);
            let new_lo = wmin + off;
            Some((new_lo, new_lo + span))
        });
        match shifted {
            Some((lo, hi)) if hi <= wmax => Self::normalized(width, lo, hi),
            _ => Self::unknown(width),
        }
    }

    /// Regular bounds lie inside the signed or the unsigned window.
    fn in_some_window(&self) -> bool {
        let Bounds::Regular { lo, hi } = self.bounds else {
            return true;
        };
        [Sign::Signed, Sign::Unsigned].into_iter().any(|sign| {
            window(sign, self.width)
                .is_some_and(|(wmin, wmax)| wmin <= lo && hi <= wmax)
        })
    }

    pub fn bitwidth(&self) -> u32 {
        self.width
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.bounds, Bounds::Empty)
    }

    /// Unknown is the full set of values of the width.
    pub fn is_full_set(&self) -> bool {
        matches!(self.bounds, Bounds::Unknown)
    }

    pub fn is_regular(&self) -> bool {
        matches!(self.bounds, Bounds::Regular { .. })
    }

    /// Bounds of a Regular interval.
    pub fn bounds(&self) -> Option<(i128, i128)> {
        match self.bounds {
            Bounds::Regular { lo, hi } => Some((lo, hi)),
            _ => None,
        }
    }

    /// Bounds interpreted with `sign`. Unknown yields the whole window.
    /// `None` for Empty and for values too wide to track.
    pub fn bounds_in(&self, sign: Sign) -> Option<(i128, i128)> {
        match self.bounds {
            Bounds::Empty => None,
            Bounds::Unknown => window(sign, self.width),
            Bounds::Regular { lo, hi } => {
                let (wmin, wmax) = window(sign, self.width)?;
                if lo >= wmin && hi <= wmax {
                    Some((lo, hi))
                } else {
                    // Stored with the other interpretation.
                    Self::fit(sign, self.width, lo, hi)
                        .bounds()
                        .or(Some((wmin, wmax)))
                }
            }
        }
    }

    pub fn lower(&self, sign: Sign) -> Option<i128> {
        self.bounds_in(sign).map(|(lo, _)| lo)
    }

    pub fn upper(&self, sign: Sign) -> Option<i128> {
        self.bounds_in(sign).map(|(_, hi)| hi)
    }

    pub fn contains(&self, value: i128) -> bool {
        match self.bounds {
            Bounds::Empty => false,
            Bounds::Unknown => true,
            Bounds::Regular { lo, hi } => lo <= value && value <= hi,
        }
    }

    /// The single value of a constant interval.
    pub fn as_constant(&self) -> Option<i128> {
        match self.bounds {
            Bounds::Regular { lo, hi } if lo == hi => Some(lo),
            _ => None,
        }
    }

    /// `self` describes no more values than `other`.
    pub fn is_subset_of(&self, other: &Interval) -> bool {
        match (self.bounds, other.bounds) {
            (Bounds::Empty, _) | (_, Bounds::Unknown) => true,
            (_, Bounds::Empty) | (Bounds::Unknown, _) => false,
            (
                Bounds::Regular { lo: a0, hi: a1 },
                Bounds::Regular { lo: b0, hi: b1 },
            ) => b0 <= a0 && a1 <= b1,
        }
    }

    /// Number of bits needed to hold every value of the interval.
    pub fn needed_bits(&self, sign: Sign) -> u32 {
        match self.bounds {
            Bounds::Empty => 0,
            Bounds::Unknown => self.width,
            Bounds::Regular { lo, hi } => {
                let bits = match sign {
                    Sign::Unsigned if lo >= 0 => unsigned_bits_for(hi as u128),
                    _ => cmp::max(signed_bits_for(lo), signed_bits_for(hi)),
                };
                cmp::min(bits, self.width)
            }
        }
    }

    /// Smallest interval containing both operands. Both must have the same
    /// bit-width.
    pub fn union_with(&self, other: &Interval) -> Interval {
        debug_assert_eq!(self.width, other.width, "union of mismatched widths");
        match (self.bounds, other.bounds) {
            (Bounds::Empty, _) => Interval {
                width: self.width,
                bounds: other.bounds,
            },
            (_, Bounds::Empty) => *self,
            (Bounds::Unknown, _) | (_, Bounds::Unknown) => {
                Self::unknown(self.width)
            }
            (
                Bounds::Regular { lo: a0, hi: a1 },
                Bounds::Regular { lo: b0, hi: b1 },
            ) => {
                let joined = Self::normalized(
                    self.width,
                    cmp::min(a0, b0),
                    cmp::max(a1, b1),
                );
                debug_assert!(
                    joined.in_some_window(),
                    "union of {self} and {other} straddles both windows"
                );
                joined
            }
        }
    }

    /// Values contained in both operands.
    pub fn intersect_with(&self, other: &Interval) -> Interval {
        debug_assert_eq!(
            self.width, other.width,
            "intersection of mismatched widths"
        );
        match (self.bounds, other.bounds) {
            (Bounds::Unknown, _) => Interval {
                width: self.width,
                bounds: other.bounds,
            },
            (_, Bounds::Unknown) => *self,
            (Bounds::Empty, _) | (_, Bounds::Empty) => Self::empty(self.width),
            (
                Bounds::Regular { lo: a0, hi: a1 },
                Bounds::Regular { lo: b0, hi: b1 },
            ) => {
                debug_assert!(
                    self.in_some_window() && other.in_some_window(),
                    "intersection of {self} and {other} outside every window"
                );
                let (lo, hi) = (cmp::max(a0, b0), cmp::min(a1, b1));
                if lo > hi {
                    Self::empty(self.width)
                } else {
                    Self::normalized(self.width, lo, hi)
                }
            }
        }
    }

    /// Convert a value interpreted with `from` to `width` bits interpreted
    /// with `to`. Extension preserves the value; truncation keeps a Regular
    /// result only if no value can be lost.
    pub fn cast(&self, from: Sign, width: u32, to: Sign) -> Interval {
        match self.bounds {
            Bounds::Empty => Self::empty(width),
            Bounds::Unknown if width <= self.width => Self::unknown(width),
            _ => match self.bounds_in(from) {
                Some((lo, hi)) => Self::fit(to, width, lo, hi),
                None => Self::unknown(width),
            },
        }
    }

    pub fn zext_or_trunc(&self, width: u32) -> Interval {
        self.cast(Sign::Unsigned, width, Sign::Unsigned)
    }

    pub fn sext_or_trunc(&self, width: u32) -> Interval {
        self.cast(Sign::Signed, width, Sign::Signed)
    }

    /// Extend or truncate with the extension chosen by `sign`.
    pub fn resize(&self, sign: Sign, width: u32) -> Interval {
        self.cast(sign, width, sign)
    }

    fn lift1<F>(&self, sign: Sign, f: F) -> Interval
    where
        F: FnOnce(i128, i128) -> Option<(i128, i128)>,
    {
        if self.is_empty() {
            return Self::empty(self.width);
        }
        match self.bounds_in(sign).and_then(|(lo, hi)| f(lo, hi)) {
            Some((lo, hi)) => Self::fit(sign, self.width, lo, hi),
            None => Self::unknown(self.width),
        }
    }

    fn lift2<F>(&self, other: &Interval, sign: Sign, f: F) -> Interval
    where
        F: FnOnce((i128, i128), (i128, i128)) -> Option<(i128, i128)>,
    {
        if self.is_empty() || other.is_empty() {
            return Self::empty(self.width);
        }
        let res = self
            .bounds_in(sign)
            .zip(other.bounds_in(sign))
            .and_then(|(a, b)| f(a, b));
        match res {
            Some((lo, hi)) => Self::fit(sign, self.width, lo, hi),
            None => Self::unknown(self.width),
        }
    }

    pub fn add(&self, other: &Interval, sign: Sign) -> Interval {
        self.lift2(other, sign, |(a0, a1), (b0, b1)| {
            Some((a0.checked_add(b0)?, a1.checked_add(b1)?))
        })
    }

    pub fn sub(&self, other: &Interval, sign: Sign) -> Interval {
        self.lift2(other, sign, |(a0, a1), (b0, b1)| {
            Some((a0.checked_sub(b1)?, a1.checked_sub(b0)?))
        })
    }

    pub fn mul(&self, other: &Interval, sign: Sign) -> Interval {
        self.lift2(other, sign, |(a0, a1), (b0, b1)| {
            hull([
                a0.checked_mul(b0)?,
                a0.checked_mul(b1)?,
                a1.checked_mul(b0)?,
                a1.checked_mul(b1)?,
            ])
        })
    }

    /// Truncating division. Division by a divisor that can only be zero is
    /// undefined and yields Unknown.
    pub fn div(&self, other: &Interval, sign: Sign) -> Interval {
        self.lift2(other, sign, |(a0, a1), b| {
            let mut corners = Vec::with_capacity(8);
            for (p0, p1) in nonzero_parts(b) {
                for x in [a0, a1] {
                    corners.push(x.checked_div(p0)?);
                    corners.push(x.checked_div(p1)?);
                }
            }
            hull(corners)
        })
    }

    /// Remainder of truncating division. The result has the sign of the
    /// dividend and a magnitude smaller than the divisor's.
    pub fn rem(&self, other: &Interval, sign: Sign) -> Interval {
        self.lift2(other, sign, |(a0, a1), b| {
            let parts = nonzero_parts(b);
            let m = parts
                .iter()
                .flat_map(|&(p0, p1)| [p0.abs(), p1.abs()])
                .max()?;
            let least = parts
                .iter()
                .flat_map(|&(p0, p1)| [p0.abs(), p1.abs()])
                .min()?;
            if a0 >= 0 && a1 < least {
                return Some((a0, a1));
            }
            if a0 >= 0 {
                Some((0, cmp::min(a1, m - 1)))
            } else if a1 <= 0 {
                Some((cmp::max(a0, 1 - m), 0))
            } else {
                Some((cmp::max(a0, 1 - m), cmp::min(a1, m - 1)))
            }
        })
    }

    /// Shift amounts are restricted to `[0, width - 1]`; anything else is
    /// undefined.
    fn shift_amount(&self, amount: (i128, i128)) -> Option<(u32, u32)> {
        let lo = cmp::max(amount.0, 0);
        let hi = cmp::min(amount.1, i128::from(self.width) - 1);
        if lo > hi {
            None
        } else {
            Some((lo as u32, hi as u32))
        }
    }

    pub fn shl(&self, amount: &Interval, sign: Sign) -> Interval {
        let Some(amt) = amount.bounds_in(amount_sign(amount)) else {
            return if amount.is_empty() {
                Self::empty(self.width)
            } else {
                Self::unknown(self.width)
            };
        };
        let Some((s0, s1)) = self.shift_amount(amt) else {
            return Self::unknown(self.width);
        };
        self.lift1(sign, |a0, a1| {
            let (p0, p1) = (2i128.checked_pow(s0)?, 2i128.checked_pow(s1)?);
            hull([
                a0.checked_mul(p0)?,
                a0.checked_mul(p1)?,
                a1.checked_mul(p0)?,
                a1.checked_mul(p1)?,
            ])
        })
    }

    /// Right shift, arithmetic for signed and logical for unsigned values.
    pub fn shr(&self, amount: &Interval, sign: Sign) -> Interval {
        let Some(amt) = amount.bounds_in(amount_sign(amount)) else {
            return if amount.is_empty() {
                Self::empty(self.width)
            } else {
                Self::unknown(self.width)
            };
        };
        let Some((s0, s1)) = self.shift_amount(amt) else {
            return Self::unknown(self.width);
        };
        self.lift1(sign, |a0, a1| {
            hull([a0 >> s0, a0 >> s1, a1 >> s0, a1 >> s1])
        })
    }

    pub fn and(&self, other: &Interval, sign: Sign) -> Interval {
        self.lift2(other, sign, |(a0, a1), (b0, b1)| match (a0 >= 0, b0 >= 0) {
            (true, true) => Some((0, cmp::min(a1, b1))),
            (true, false) => Some((0, a1)),
            (false, true) => Some((0, b1)),
            (false, false) => None,
        })
    }

    pub fn or(&self, other: &Interval, sign: Sign) -> Interval {
        self.lift2(other, sign, |(a0, a1), (b0, b1)| {
            if a0 < 0 || b0 < 0 {
                return None;
            }
            let bits = unsigned_bits_for(cmp::max(a1, b1) as u128);
            Some((cmp::max(a0, b0), (1i128 << bits) - 1))
        })
    }

    pub fn xor(&self, other: &Interval, sign: Sign) -> Interval {
        self.lift2(other, sign, |(a0, a1), (b0, b1)| {
            if a0 < 0 || b0 < 0 {
                return None;
            }
            let bits = unsigned_bits_for(cmp::max(a1, b1) as u128);
            Some((0, (1i128 << bits) - 1))
        })
    }

    pub fn min(&self, other: &Interval, sign: Sign) -> Interval {
        self.lift2(other, sign, |(a0, a1), (b0, b1)| {
            Some((cmp::min(a0, b0), cmp::min(a1, b1)))
        })
    }

    pub fn max(&self, other: &Interval, sign: Sign) -> Interval {
        self.lift2(other, sign, |(a0, a1), (b0, b1)| {
            Some((cmp::max(a0, b0), cmp::max(a1, b1)))
        })
    }

    /// One-bit result of comparing the operands with `pred`. `sign` is used
    /// for predicates that do not carry one.
    pub fn compare(
        &self,
        other: &Interval,
        pred: Predicate,
        sign: Sign,
    ) -> Interval {
        if self.is_empty() || other.is_empty() {
            return Self::empty(1);
        }
        let sign = pred.sign().unwrap_or(sign);
        let (Some((a0, a1)), Some((b0, b1))) =
            (self.bounds_in(sign), other.bounds_in(sign))
        else {
            return Self::unknown(1);
        };
        let lt = |a0: i128, a1: i128, b0: i128, b1: i128| {
            if a1 < b0 {
                Some(true)
            } else if a0 >= b1 {
                Some(false)
            } else {
                None
            }
        };
        let le = |a0: i128, a1: i128, b0: i128, b1: i128| {
            if a1 <= b0 {
                Some(true)
            } else if a0 > b1 {
                Some(false)
            } else {
                None
            }
        };
        let eq = if a0 == a1 && b0 == b1 && a0 == b0 {
            Some(true)
        } else if a1 < b0 || b1 < a0 {
            Some(false)
        } else {
            None
        };
        let decided = match pred {
            Predicate::Eq => eq,
            Predicate::Ne => eq.map(|b| !b),
            Predicate::Slt | Predicate::Ult => lt(a0, a1, b0, b1),
            Predicate::Sle | Predicate::Ule => le(a0, a1, b0, b1),
            Predicate::Sgt | Predicate::Ugt => lt(b0, b1, a0, a1),
            Predicate::Sge | Predicate::Uge => le(b0, b1, a0, a1),
        };
        match decided {
            Some(b) => Self::constant(Sign::Unsigned, 1, i128::from(b)),
            None => Self::unknown(1),
        }
    }

    pub fn neg(&self, sign: Sign) -> Interval {
        self.lift1(sign, |a0, a1| Some((a1.checked_neg()?, a0.checked_neg()?)))
    }

    /// Bitwise complement.
    pub fn not(&self, sign: Sign) -> Interval {
        self.lift1(sign, |a0, a1| Some((-a1 - 1, -a0 - 1)))
    }

    pub fn abs(&self, sign: Sign) -> Interval {
        if !sign.is_signed() {
            return *self;
        }
        self.lift1(sign, |a0, a1| {
            Some(if a0 >= 0 {
                (a0, a1)
            } else if a1 <= 0 {
                (-a1, -a0)
            } else {
                (0, cmp::max(-a0, a1))
            })
        })
    }

    /// One-bit logical negation.
    pub fn logical_not(&self, sign: Sign) -> Interval {
        if self.is_empty() {
            return Self::empty(1);
        }
        match self.bounds_in(sign) {
            Some((0, 0)) => Self::constant(Sign::Unsigned, 1, 1),
            Some((lo, hi)) if lo > 0 || hi < 0 => {
                Self::constant(Sign::Unsigned, 1, 0)
            }
            _ => Self::unknown(1),
        }
    }

    /// `self ? then_val : else_val` where `self` is the condition.
    pub fn select(
        &self,
        then_val: &Interval,
        else_val: &Interval,
        cond_sign: Sign,
    ) -> Interval {
        if self.is_empty() {
            return Self::empty(then_val.width);
        }
        match self.bounds_in(cond_sign) {
            Some((0, 0)) => *else_val,
            Some((lo, hi)) if lo > 0 || hi < 0 => *then_val,
            _ => then_val.union_with(else_val),
        }
    }
}

/// Shift amounts are read as unsigned unless they are stored as negative
/// numbers.
fn amount_sign(amount: &Interval) -> Sign {
    match amount.bounds() {
        Some((lo, _)) if lo < 0 => Sign::Signed,
        _ => Sign::Unsigned,
    }
}

fn hull<I: IntoIterator<Item = i128>>(values: I) -> Option<(i128, i128)> {
    values.into_iter().fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((cmp::min(lo, v), cmp::max(hi, v))),
    })
}

/// Split a divisor range into its strictly negative and strictly positive
/// parts.
fn nonzero_parts((b0, b1): (i128, i128)) -> Vec<(i128, i128)> {
    let mut parts = Vec::with_capacity(2);
    if b0 < 0 {
        parts.push((b0, cmp::min(b1, -1)));
    }
    if b1 > 0 {
        parts.push((cmp::max(b0, 1), b1));
    }
    parts
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bounds {
            Bounds::Empty => write!(f, "empty<{}>", self.width),
            Bounds::Unknown => write!(f, "unknown<{}>", self.width),
            Bounds::Regular { lo, hi } => {
                write!(f, "[{lo}, {hi}]<{}>", self.width)
            }
        }
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const S: Sign = Sign::Signed;
    const U: Sign = Sign::Unsigned;

    fn r(sign: Sign, width: u32, lo: i128, hi: i128) -> Interval {
        Interval::new(sign, width, lo, hi)
    }

    #[test]
    fn full_window_is_unknown() {
        assert!(r(U, 8, 0, 255).is_full_set());
        assert!(r(S, 8, -128, 127).is_full_set());
        assert_eq!(r(U, 8, 0, 254).bounds(), Some((0, 254)));
        assert!(r(U, 8, 5, 4).is_empty());
        assert!(Interval::new(U, 128, 0, 1).is_full_set());
    }

    #[test]
    fn union_and_intersection() {
        let a = r(U, 8, 1, 3);
        let b = r(U, 8, 7, 9);
        assert_eq!(a.union_with(&b), r(U, 8, 1, 9));
        assert!(a.intersect_with(&b).is_empty());
        assert_eq!(a.union_with(&Interval::empty(8)), a);
        assert!(a.union_with(&Interval::unknown(8)).is_full_set());
        assert_eq!(Interval::unknown(8).intersect_with(&a), a);
        assert_eq!(r(U, 8, 0, 5).intersect_with(&r(U, 8, 3, 9)), r(U, 8, 3, 5));
    }

    #[test]
    fn casts() {
        // zero extension keeps the value
        assert_eq!(r(U, 8, 3, 200).zext_or_trunc(32), r(U, 32, 3, 200));
        // unknown bytes extend to the byte range
        assert_eq!(Interval::unknown(8).zext_or_trunc(16), r(U, 16, 0, 255));
        assert_eq!(
            Interval::unknown(8).sext_or_trunc(16),
            r(S, 16, -128, 127)
        );
        // truncation that fits
        assert_eq!(r(U, 32, 256, 300).zext_or_trunc(8), r(U, 8, 0, 44));
        // truncation that would wrap around
        assert!(r(U, 32, 250, 300).zext_or_trunc(8).is_full_set());
        assert!(r(U, 32, 0, 256).zext_or_trunc(8).is_full_set());
        // reinterpretation of negative values
        assert_eq!(r(S, 8, -3, -1).cast(S, 8, U), r(U, 8, 253, 255));
        assert!(r(S, 8, -1, 1).cast(S, 8, U).is_full_set());
        assert!(r(S, 8, -1, 1).cast(S, 32, U).is_full_set());
        assert_eq!(r(S, 8, -1, 1).cast(S, 32, S), r(S, 32, -1, 1));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(r(S, 32, 0, 9).add(&r(S, 32, 1, 1), S), r(S, 32, 1, 10));
        assert_eq!(r(U, 8, 250, 255).add(&r(U, 8, 10, 10), U), r(U, 8, 4, 9));
        assert!(r(U, 8, 200, 255).add(&r(U, 8, 0, 100), U).is_full_set());
        // signed overflow wraps around
        assert!(r(S, 8, 100, 120).add(&r(S, 8, 10, 10), S).is_full_set());
        assert_eq!(r(S, 8, 120, 127).add(&r(S, 8, 10, 10), S), r(S, 8, -126, -119));
        assert!(Interval::unknown(8).add(&Interval::constant(S, 8, 1), S).contains(-128));
        assert_eq!(r(S, 8, -128, -125).sub(&r(S, 8, 4, 4), S), r(S, 8, 124, 127));
        // -129 wraps to 127, away from the rest
        assert!(r(S, 8, -128, -120).sub(&r(S, 8, 1, 1), S).is_full_set());
        assert_eq!(r(S, 8, 64, 64).mul(&r(S, 8, 2, 2), S), r(S, 8, -128, -128));
        assert_eq!(r(S, 8, -4, 3).mul(&r(S, 8, -2, 5), S), r(S, 8, -20, 15));
        assert_eq!(r(S, 8, 10, 20).sub(&r(S, 8, 1, 5), S), r(S, 8, 5, 19));
        assert_eq!(r(U, 8, 10, 100).div(&r(U, 8, 0, 5), U), r(U, 8, 2, 100));
        assert!(r(U, 8, 10, 100).div(&r(U, 8, 0, 0), U).is_full_set());
        assert_eq!(r(S, 8, -100, 100).div(&r(S, 8, -2, 2), S), r(S, 8, -100, 100));
        assert_eq!(r(U, 8, 0, 255).rem(&r(U, 8, 10, 10), U), r(U, 8, 0, 9));
        assert_eq!(r(U, 8, 0, 5).rem(&r(U, 8, 10, 10), U), r(U, 8, 0, 5));
        assert_eq!(r(S, 8, -50, 7).rem(&r(S, 8, 4, 4), S), r(S, 8, -3, 3));
        assert_eq!(r(U, 8, 1, 3).shl(&r(U, 8, 2, 2), U), r(U, 8, 4, 12));
        assert_eq!(r(S, 8, -64, 64).shr(&r(U, 8, 1, 2), S), r(S, 8, -32, 32));
        assert_eq!(r(U, 8, 0, 12).and(&r(U, 8, 0, 7), U), r(U, 8, 0, 7));
        assert_eq!(r(U, 8, 4, 5).or(&r(U, 8, 1, 2), U), r(U, 8, 4, 7));
        assert_eq!(r(U, 8, 4, 5).xor(&r(U, 8, 1, 2), U), r(U, 8, 0, 7));
        assert!(r(S, 8, -4, 5).xor(&r(S, 8, 1, 2), S).is_full_set());
        assert_eq!(r(S, 8, -4, 5).min(&r(S, 8, 1, 2), S), r(S, 8, -4, 2));
        assert_eq!(r(S, 8, -4, 5).max(&r(S, 8, 1, 2), S), r(S, 8, 1, 5));
    }

    #[test]
    fn unary() {
        assert_eq!(r(S, 8, -3, 5).neg(S), r(S, 8, -5, 3));
        assert_eq!(r(U, 8, 1, 5).neg(U), r(U, 8, 251, 255));
        assert!(r(U, 8, 0, 5).neg(U).is_full_set());
        assert_eq!(r(U, 8, 0, 5).not(U), r(U, 8, 250, 255));
        assert_eq!(r(S, 8, -3, 5).not(S), r(S, 8, -6, 2));
        assert_eq!(r(S, 8, -7, 5).abs(S), r(S, 8, 0, 7));
        // the negation of the smallest value is itself
        assert_eq!(r(S, 8, -128, -128).neg(S), r(S, 8, -128, -128));
        assert!(r(S, 8, -128, -127).neg(S).is_full_set());
        assert_eq!(r(S, 8, 0, 0).logical_not(S), r(U, 1, 1, 1));
        assert_eq!(r(S, 8, 1, 9).logical_not(S), r(U, 1, 0, 0));
        assert!(r(S, 8, 0, 9).logical_not(S).is_full_set());
    }

    #[test]
    fn comparisons() {
        let a = r(S, 32, 0, 9);
        let ten = Interval::constant(S, 32, 10);
        assert_eq!(a.compare(&ten, Predicate::Slt, S), r(U, 1, 1, 1));
        assert_eq!(a.compare(&ten, Predicate::Sge, S), r(U, 1, 0, 0));
        assert!(a.compare(&r(S, 32, 5, 5), Predicate::Slt, S).is_full_set());
        assert_eq!(a.compare(&ten, Predicate::Eq, S), r(U, 1, 0, 0));
        assert_eq!(a.compare(&ten, Predicate::Ne, S), r(U, 1, 1, 1));
        // -1 is the largest unsigned value
        let m1 = Interval::constant(S, 32, -1);
        assert_eq!(m1.compare(&ten, Predicate::Ugt, S), r(U, 1, 1, 1));
        assert!(Interval::empty(32).compare(&ten, Predicate::Eq, S).is_empty());
    }

    #[test]
    fn select_and_bits() {
        let t = r(U, 8, 1, 2);
        let e = r(U, 8, 7, 9);
        assert_eq!(r(U, 1, 1, 1).select(&t, &e, U), t);
        assert_eq!(r(U, 1, 0, 0).select(&t, &e, U), e);
        assert_eq!(Interval::unknown(1).select(&t, &e, U), r(U, 8, 1, 9));
        assert_eq!(r(U, 32, 0, 9).needed_bits(U), 4);
        assert_eq!(r(S, 32, -8, 7).needed_bits(S), 4);
        assert_eq!(Interval::unknown(12).needed_bits(U), 12);
    }

    fn interval(sign: Sign) -> impl Strategy<Value = Interval> {
        let (wmin, wmax) = window(sign, 8).unwrap();
        prop_oneof![
            1 => Just(Interval::empty(8)),
            1 => Just(Interval::unknown(8)),
            6 => (wmin..=wmax, wmin..=wmax).prop_map(move |(a, b)| {
                Interval::new(sign, 8, cmp::min(a, b), cmp::max(a, b))
            }),
        ]
    }

    /// A non-empty interval together with one of its members.
    fn member(sign: Sign) -> impl Strategy<Value = (Interval, i128)> {
        let (wmin, wmax) = window(sign, 8).unwrap();
        (wmin..=wmax, wmin..=wmax, 0i128..=100).prop_map(move |(a, b, t)| {
            let (lo, hi) = (cmp::min(a, b), cmp::max(a, b));
            (Interval::new(sign, 8, lo, hi), lo + (hi - lo) * t / 100)
        })
    }

    fn wrap_u8(v: i128) -> i128 {
        v.rem_euclid(256)
    }

    fn wrap_i8(v: i128) -> i128 {
        (v + 128).rem_euclid(256) - 128
    }

    proptest! {
        #[test]
        fn union_laws(a in interval(U), b in interval(U), c in interval(U)) {
            prop_assert_eq!(a.union_with(&b), b.union_with(&a));
            prop_assert_eq!(
                a.union_with(&b).union_with(&c),
                a.union_with(&b.union_with(&c))
            );
            prop_assert_eq!(a.union_with(&a), a);
            prop_assert_eq!(Interval::empty(8).union_with(&a), a);
            prop_assert_eq!(Interval::unknown(8).intersect_with(&a), a);
            prop_assert!(a.is_subset_of(&a.union_with(&b)));
            prop_assert!(a.intersect_with(&b).is_subset_of(&a));
        }

        #[test]
        fn extension_round_trip(a in interval(U), s in interval(S)) {
            prop_assert_eq!(a.zext_or_trunc(32).zext_or_trunc(8), a);
            prop_assert_eq!(s.sext_or_trunc(16).sext_or_trunc(8), s);
        }

        #[test]
        fn unsigned_ops_are_sound((a, x) in member(U), (b, y) in member(U)) {
            prop_assert!(a.add(&b, U).contains(wrap_u8(x + y)));
            prop_assert!(a.sub(&b, U).contains(wrap_u8(x - y)));
            prop_assert!(a.mul(&b, U).contains(wrap_u8(x * y)));
            prop_assert!(a.and(&b, U).contains(x & y));
            prop_assert!(a.or(&b, U).contains(x | y));
            prop_assert!(a.xor(&b, U).contains(x ^ y));
            prop_assert!(a.min(&b, U).contains(cmp::min(x, y)));
            prop_assert!(a.max(&b, U).contains(cmp::max(x, y)));
            if y != 0 {
                prop_assert!(a.div(&b, U).contains(x / y));
                prop_assert!(a.rem(&b, U).contains(x % y));
            }
            if y < 8 {
                prop_assert!(a.shl(&b, U).contains(wrap_u8(x << y)));
                prop_assert!(a.shr(&b, U).contains(x >> y));
            }
            prop_assert!(a.compare(&b, Predicate::Ult, U).contains(i128::from(x < y)));
        }

        #[test]
        fn signed_ops_are_sound((a, x) in member(S), (b, y) in member(S)) {
            for (res, exact) in [
                (a.add(&b, S), x + y),
                (a.sub(&b, S), x - y),
                (a.mul(&b, S), x * y),
                (a.min(&b, S), cmp::min(x, y)),
                (a.max(&b, S), cmp::max(x, y)),
            ] {
                let wrapped = wrap_i8(exact);
                prop_assert!(res.contains(wrapped), "{res} misses {wrapped}");
            }
            if y != 0 {
                prop_assert!(a.div(&b, S).contains(wrap_i8(x / y)));
                prop_assert!(a.rem(&b, S).contains(x % y));
            }
            if (0..8).contains(&y) {
                prop_assert!(a.shl(&b, S).contains(wrap_i8(x << y)));
                prop_assert!(a.shr(&b, S).contains(x >> y));
            }
            if x >= 0 || y >= 0 {
                prop_assert!(a.and(&b, S).contains(x & y));
            }
            prop_assert!(a.neg(S).contains(wrap_i8(-x)));
            prop_assert!(a.abs(S).contains(wrap_i8(x.abs())));
            prop_assert!(a.not(S).contains(!x));
            prop_assert!(a.compare(&b, Predicate::Sle, S).contains(i128::from(x <= y)));
        }

        #[test]
        fn lattice_results_stay_in_a_window(a in interval(S), b in interval(S)) {
            let joined = a.union_with(&b);
            prop_assert!(joined.in_some_window());
            prop_assert!(a.intersect_with(&b).in_some_window());
            prop_assert!(joined.cast(S, 8, U).in_some_window());
        }
    }
}
