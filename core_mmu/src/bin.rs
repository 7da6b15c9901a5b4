/// mask covering the lowest `width` bits.
#[inline]
pub const fn bit_mask(width: u32) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1 << width) - 1
    }
}

#[inline]
pub const fn mask_lower(bin: u32, width: u32) -> u32 {
    bin & bit_mask(width)
}

/// `bin >> amount`, yielding 0 once every bit is shifted out.
#[inline]
pub const fn shift_out(bin: u32, amount: u32) -> u32 {
    match bin.checked_shr(amount) {
        Some(v) => v,
        None => 0,
    }
}

/// extracts `width` bits of `bin` starting at bit `start`.
#[inline]
pub const fn extract(bin: u32, start: u32, width: u32) -> u32 {
    mask_lower(shift_out(bin, start), width)
}
