//! Conversions between pin vectors and unsigned integers.
//!
//! Bit 0 is always the first pin, so `[true, false, true]` packs to `5`.

use std::ops::{BitAnd, Shl};

use num_traits::Unsigned;

pub fn pack<T>(bits: &[bool]) -> T
where
    T: Unsigned + Shl<usize, Output = T>,
{
    let mut sum = T::zero();
    for (bit, active) in bits.iter().cloned().enumerate() {
        if active {
            sum = sum + (T::one() << bit);
        }
    }
    sum
}

pub fn unpack<T>(val: T, width: usize) -> Vec<bool>
where
    T: Unsigned + Copy + BitAnd<T, Output = T> + Shl<usize, Output = T>,
{
    (0..width)
        .map(|bit| !(val & (T::one() << bit)).is_zero())
        .collect()
}
