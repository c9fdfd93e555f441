use rayon::prelude::*;

use crate::{
    compositor::raster::Raster,
    foundation::error::{ReelError, ReelResult},
};

/// Separable gaussian blur over a premultiplied raster, fixed-point Q16 weights.
pub fn blur_premul(src: &Raster, radius: u32, sigma: f32) -> ReelResult<Raster> {
    if radius == 0 || src.width == 0 || src.height == 0 {
        return Ok(src.clone());
    }

    let kernel = gaussian_kernel_q16(radius, sigma)?;
    let mut tmp = vec![0u8; src.data.len()];
    let mut out = vec![0u8; src.data.len()];

    convolve(&src.data, &mut tmp, src.width, src.height, &kernel, Axis::Rows);
    convolve(&tmp, &mut out, src.width, src.height, &kernel, Axis::Columns);
    Raster::from_premul(src.width, src.height, out)
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> ReelResult<Vec<u32>> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(ReelError::validation("blur sigma must be > 0"));
    }

    let r = radius as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();
    if sum <= 0.0 {
        return Err(ReelError::evaluation("gaussian kernel sum is zero"));
    }

    let mut weights: Vec<u32> = weights_f
        .iter()
        .map(|wf| ((wf / sum) * 65536.0).round().clamp(0.0, 65536.0) as u32)
        .collect();
    let acc: i64 = weights.iter().map(|&w| i64::from(w)).sum();
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        weights[mid] = (i64::from(weights[mid]) + delta).clamp(0, 65536) as u32;
    }
    Ok(weights)
}

#[derive(Clone, Copy)]
enum Axis {
    Rows,
    Columns,
}

/// One 1-D convolution pass with edge clamping. Output rows are filled in parallel.
fn convolve(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32], axis: Axis) {
    let radius = (k.len() / 2) as i64;
    let (w, h) = (i64::from(width), i64::from(height));
    dst.par_chunks_mut(width as usize * 4)
        .enumerate()
        .for_each(|(y, row)| {
            let y = y as i64;
            for x in 0..w {
                let mut acc = [0u64; 4];
                for (ki, &kw) in k.iter().enumerate() {
                    let d = ki as i64 - radius;
                    let (sx, sy) = match axis {
                        Axis::Rows => ((x + d).clamp(0, w - 1), y),
                        Axis::Columns => (x, (y + d).clamp(0, h - 1)),
                    };
                    let idx = ((sy * w + sx) as usize) * 4;
                    for (a, &v) in acc.iter_mut().zip(&src[idx..idx + 4]) {
                        *a += u64::from(kw) * u64::from(v);
                    }
                }
                let out = (x as usize) * 4;
                for (o, a) in row[out..out + 4].iter_mut().zip(acc) {
                    *o = q16_to_u8(a);
                }
            }
        });
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/blur.rs"]
mod tests;
