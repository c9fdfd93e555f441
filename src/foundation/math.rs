const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a over `bytes`, continuing from `state`.
pub(crate) fn fnv1a(state: u64, bytes: &[u8]) -> u64 {
    bytes.iter().fold(state, |h, &b| {
        (h ^ u64::from(b)).wrapping_mul(FNV_PRIME)
    })
}

/// Stable seed for a named pixel effect at a given phase.
pub(crate) fn effect_seed(name: &str, phase_millis: u64) -> u64 {
    fnv1a(fnv1a(FNV_OFFSET, name.as_bytes()), &phase_millis.to_le_bytes())
}

/// Seed of the `index`-th band/row derived from `seed`.
pub(crate) fn sub_seed(seed: u64, index: u64) -> u64 {
    fnv1a(seed, &index.to_le_bytes())
}

/// Rounded `x * y / 255` for 8-bit channel math.
pub(crate) fn mul_div255(x: u16, y: u16) -> u8 {
    ((u32::from(x) * u32::from(y) + 127) / 255) as u8
}

pub(crate) fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
