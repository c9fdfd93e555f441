use crate::{
    animation::interpolate::FilterSample,
    compositor::blur::blur_premul,
    compositor::raster::Raster,
    foundation::error::ReelResult,
    foundation::math::{effect_seed, sub_seed},
};

#[derive(Clone, Copy, Debug, PartialEq)]
/// Glitch filter parameters.
pub struct GlitchParams {
    /// Displacement strength in `[0, 1]`.
    pub intensity: f64,
    /// Number of horizontal bands.
    pub slices: u32,
}

impl Default for GlitchParams {
    fn default() -> Self {
        Self {
            intensity: 0.5,
            slices: 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// Bloom filter parameters.
pub struct BloomParams {
    /// Luma threshold in `[0, 1]` for the bright pass.
    pub threshold: f64,
    /// Additive strength.
    pub strength: f64,
    /// Blur radius in pixels.
    pub radius: u32,
}

impl Default for BloomParams {
    fn default() -> Self {
        Self {
            threshold: 0.7,
            strength: 0.6,
            radius: 8,
        }
    }
}

fn param_f64(params: &serde_json::Value, key: &str) -> Option<f64> {
    params.get(key).and_then(serde_json::Value::as_f64)
}

impl GlitchParams {
    fn from_value(v: &serde_json::Value) -> Self {
        let d = Self::default();
        Self {
            intensity: param_f64(v, "intensity")
                .unwrap_or(d.intensity)
                .clamp(0.0, 1.0),
            slices: param_f64(v, "slices")
                .map(|s| s.clamp(1.0, 256.0) as u32)
                .unwrap_or(d.slices),
        }
    }
}

impl BloomParams {
    fn from_value(v: &serde_json::Value) -> Self {
        let d = Self::default();
        Self {
            threshold: param_f64(v, "threshold")
                .unwrap_or(d.threshold)
                .clamp(0.0, 1.0),
            strength: param_f64(v, "strength").unwrap_or(d.strength).max(0.0),
            radius: param_f64(v, "radius")
                .map(|r| r.clamp(0.0, 64.0) as u32)
                .unwrap_or(d.radius),
        }
    }
}

/// Run one sampled pixel filter over an item raster.
///
/// Progress wraps into `[0, 1)` so continuous effects keep cycling outside their window.
#[tracing::instrument(level = "trace", skip(raster), fields(name = %sample.name))]
pub fn apply_filter(raster: &mut Raster, sample: &FilterSample) -> ReelResult<()> {
    let phase = sample.progress.rem_euclid(1.0);
    match sample.name.as_str() {
        "glitch" => {
            glitch_in_place(raster, GlitchParams::from_value(&sample.params), phase);
            Ok(())
        }
        "bloom" => bloom_in_place(raster, BloomParams::from_value(&sample.params), phase),
        other => {
            tracing::debug!(filter = other, "unknown pixel filter, skipping");
            Ok(())
        }
    }
}

/// Deterministic band displacement plus a red channel split.
pub fn glitch_in_place(raster: &mut Raster, params: GlitchParams, phase: f64) {
    if params.intensity <= 0.0 || raster.width == 0 || raster.height == 0 {
        return;
    }
    let w = raster.width as usize;
    let h = raster.height as usize;
    let max_shift = (params.intensity * w as f64 * 0.1).round() as i64;
    let split = (params.intensity * 4.0).round() as usize;
    let band_h = h.div_ceil(params.slices.max(1) as usize).max(1);

    let seed = effect_seed("glitch", (phase * 1000.0).round() as u64);

    let src = raster.data.clone();
    for (band, rows) in (0..h).collect::<Vec<_>>().chunks(band_h).enumerate() {
        let shift = if max_shift == 0 {
            0
        } else {
            (sub_seed(seed, band as u64) % (2 * max_shift as u64 + 1)) as i64 - max_shift
        };
        for &y in rows {
            let row = y * w * 4;
            for x in 0..w {
                let sx = (x as i64 - shift).rem_euclid(w as i64) as usize;
                let dst = row + x * 4;
                let from = row + sx * 4;
                raster.data[dst..dst + 4].copy_from_slice(&src[from..from + 4]);
                if split > 0 {
                    let rx = (sx + split) % w;
                    let red = src[row + rx * 4];
                    raster.data[dst] = red.min(raster.data[dst + 3]);
                }
            }
        }
    }
}

/// Bright pass, blur, then additive blend pulsed by phase.
pub fn bloom_in_place(raster: &mut Raster, params: BloomParams, phase: f64) -> ReelResult<()> {
    let mut bright = raster.clone();
    let cutoff = params.threshold * 255.0;
    for px in bright.pixels_mut() {
        let luma = 0.2126 * f64::from(px[0]) + 0.7152 * f64::from(px[1]) + 0.0722 * f64::from(px[2]);
        if luma < cutoff {
            px.copy_from_slice(&[0, 0, 0, 0]);
        }
    }
    let glow = blur_premul(&bright, params.radius, (params.radius as f32 / 2.0).max(0.5))?;

    let pulse = 0.5 + 0.5 * (std::f64::consts::TAU * phase).sin();
    let gain = params.strength * pulse;
    for (d, g) in raster.data.chunks_exact_mut(4).zip(glow.data.chunks_exact(4)) {
        for c in 0..3 {
            let add = (f64::from(g[c]) * gain).round() as u32;
            d[c] = (u32::from(d[c]) + add).min(255) as u8;
        }
        let max_c = d[0].max(d[1]).max(d[2]);
        d[3] = d[3].max(max_c);
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/animation/filters.rs"]
mod tests;
