use std::cmp;

/// Number of bits needed to represent `v` as an unsigned number.
pub fn unsigned_bits_for(v: u128) -> u32 {
    cmp::max(128 - v.leading_zeros(), 1)
}

/// Number of bits needed to represent `v` in two's complement.
pub fn signed_bits_for(v: i128) -> u32 {
    let magnitude = if v < 0 { !v } else { v };
    128 - magnitude.leading_zeros() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_counts() {
        assert_eq!(unsigned_bits_for(0), 1);
        assert_eq!(unsigned_bits_for(255), 8);
        assert_eq!(unsigned_bits_for(256), 9);
        assert_eq!(signed_bits_for(0), 1);
        assert_eq!(signed_bits_for(-1), 1);
        assert_eq!(signed_bits_for(127), 8);
        assert_eq!(signed_bits_for(-128), 8);
        assert_eq!(signed_bits_for(128), 9);
    }
}
