use crate::{
    compositor::raster::{Raster, destination_out},
    compositor::scene::{SceneRasterizer, Stroke},
    foundation::error::{ReelError, ReelResult},
};

const OPAQUE_WHITE: [u8; 4] = [255, 255, 255, 255];
const OPAQUE_BLACK: [u8; 4] = [0, 0, 0, 255];
const BINARY_THRESHOLD: u8 = 128;

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
/// Binary mask pixel convention expected by a downstream edit model.
///
/// Both conventions mark the same edit region (transparent base pixels plus strokes) with
/// opposite colors; they are not interchangeable.
pub enum MaskConvention {
    /// Black background; transparent base pixels and strokes painted white.
    #[default]
    Colored,
    /// White canvas; transparent base pixels and strokes cleared with destination-out, and
    /// every cleared pixel emitted as opaque black.
    Transparent,
}

/// Background-segmentation mask: `alpha == 0` becomes opaque white, everything else opaque black.
pub fn segmentation_mask(base: &Raster) -> Raster {
    let mut out = Raster::new(base.canvas());
    for (d, s) in out.pixels_mut().zip(base.data.chunks_exact(4)) {
        let px = if s[3] == 0 { OPAQUE_WHITE } else { OPAQUE_BLACK };
        d.copy_from_slice(&px);
    }
    out
}

/// Strict binary inpaint mask from a flattened layer and user mask strokes.
///
/// Every output pixel is exactly opaque black or opaque white.
#[tracing::instrument(
    level = "debug",
    skip(base, strokes, rasterizer),
    fields(strokes = strokes.len())
)]
pub fn extract_mask<R>(
    base: &Raster,
    strokes: &[Stroke],
    convention: MaskConvention,
    rasterizer: &R,
) -> ReelResult<Raster>
where
    R: SceneRasterizer + ?Sized,
{
    let canvas = base.canvas();
    let painted = if strokes.is_empty() {
        None
    } else {
        Some(rasterizer.rasterize_strokes(strokes, canvas, OPAQUE_WHITE)?)
    };

    match convention {
        MaskConvention::Colored => {
            let mut mask = segmentation_mask(base);
            if let Some(painted) = &painted {
                mask.over_in_place(painted, 1.0)?;
            }
            for px in mask.pixels_mut() {
                let luma = (u16::from(px[0]) + u16::from(px[1]) + u16::from(px[2])) / 3;
                let out = if luma >= u16::from(BINARY_THRESHOLD) {
                    OPAQUE_WHITE
                } else {
                    OPAQUE_BLACK
                };
                px.copy_from_slice(&out);
            }
            Ok(mask)
        }
        MaskConvention::Transparent => {
            let mut mask = Raster::filled(canvas, OPAQUE_WHITE);
            for (d, s) in mask.pixels_mut().zip(base.data.chunks_exact(4)) {
                let cleared = destination_out([d[0], d[1], d[2], d[3]], 255 - s[3]);
                d.copy_from_slice(&cleared);
            }
            if let Some(painted) = &painted {
                mask.destination_out_in_place(painted)?;
            }
            for px in mask.pixels_mut() {
                let out = if px[3] < BINARY_THRESHOLD {
                    OPAQUE_BLACK
                } else {
                    OPAQUE_WHITE
                };
                px.copy_from_slice(&out);
            }
            Ok(mask)
        }
    }
}

/// Whether every pixel is opaque black or opaque white.
pub fn is_binary_mask(mask: &Raster) -> bool {
    mask.data
        .chunks_exact(4)
        .all(|px| px == OPAQUE_WHITE || px == OPAQUE_BLACK)
}

/// Mask straight from a cached segmentation region image, binarized on alpha.
pub fn region_mask(region: &Raster, convention: MaskConvention) -> ReelResult<Raster> {
    if region.width == 0 || region.height == 0 {
        return Err(ReelError::validation("segmentation region is empty"));
    }
    let mut out = Raster::new(region.canvas());
    for (d, s) in out.pixels_mut().zip(region.data.chunks_exact(4)) {
        let inside = s[3] >= BINARY_THRESHOLD;
        let px = match (convention, inside) {
            (MaskConvention::Colored, true) | (MaskConvention::Transparent, false) => OPAQUE_WHITE,
            _ => OPAQUE_BLACK,
        };
        d.copy_from_slice(&px);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/compositor/mask.rs"]
mod tests;
