//! Encoding for the combined retry-after / redirect-count column.
//!
//! ```text
//!  31    28 27                                    0
//! +--------+---------------------------------------+
//! |redirect|              retry-after              |
//! +--------+---------------------------------------+
//! ```
//!
//! Both parts wrap when they exceed their width.

/// Mask for the retry-after part (bits 0-27).
pub const RETRY_AFTER_MASK: u32 = 0x0FFF_FFFF;

/// Shift of the redirect count (bits 28-31).
pub const REDIRECT_SHIFT: u32 = 28;

/// Largest redirect count the field can hold.
pub const MAX_REDIRECT_COUNT: u8 = 0xF;

/// Packs a retry-after value and redirect count into the stored integer.
#[must_use]
pub fn pack(retry_after: u32, redirect_count: u8) -> i32 {
    let redirect = u32::from(redirect_count & MAX_REDIRECT_COUNT) << REDIRECT_SHIFT;
    let bits = redirect | (retry_after & RETRY_AFTER_MASK);
    i32::from_ne_bytes(bits.to_ne_bytes())
}

/// Splits the stored integer into `(retry_after, redirect_count)`.
#[must_use]
pub fn unpack(value: i32) -> (u32, u8) {
    let bits = u32::from_ne_bytes(value.to_ne_bytes());
    let retry_after = bits & RETRY_AFTER_MASK;
    // arithmetic shift sign-extends the top nibble; mask it back to 4 bits
    let redirect = (value >> REDIRECT_SHIFT) & i32::from(MAX_REDIRECT_COUNT);
    (retry_after, u8::try_from(redirect).unwrap_or(MAX_REDIRECT_COUNT))
}

/// Unpacks a value read from a 64-bit SQLite column.
///
/// Only the low 32 bits are meaningful; higher bits are discarded.
#[must_use]
pub fn unpack_column(value: i64) -> (u32, u8) {
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or_default();
    unpack(i32::from_ne_bytes(low.to_ne_bytes()))
}
