use scatter_config::ResampleAlgorithm;
use scatter_model::FloatImage;

use crate::grid::RemapGrid;

/// Flip an image along its columns (`flip_x`) and/or rows (`flip_y`),
/// matching `QInterpolation.flip`.
pub fn flip(img: &FloatImage, flip_x: bool, flip_y: bool) -> FloatImage {
    if !flip_x && !flip_y {
        return img.clone();
    }
    let (w, h) = (img.width(), img.height());
    let mut out = FloatImage::zeros(w, h);
    for row in 0..h {
        let src_row = if flip_y { h - 1 - row } else { row };
        for col in 0..w {
            let src_col = if flip_x { w - 1 - col } else { col };
            out.set(row, col, img.get(src_row, src_col));
        }
    }
    out
}

#[inline]
fn cubic_weight(t: f32) -> f32 {
    // Catmull-Rom convolution kernel, a = -0.5 (OpenCV's INTER_CUBIC default).
    let a = -0.5f32;
    let t = t.abs();
    if t <= 1.0 {
        (a + 2.0) * t.powi(3) - (a + 3.0) * t.powi(2) + 1.0
    } else if t < 2.0 {
        a * t.powi(3) - 5.0 * a * t.powi(2) + 8.0 * a * t - 4.0 * a
    } else {
        0.0
    }
}

#[inline]
fn lanczos_weight(t: f32, a: f32) -> f32 {
    if t == 0.0 {
        return 1.0;
    }
    if t.abs() >= a {
        return 0.0;
    }
    let pi_t = std::f32::consts::PI * t;
    a * (pi_t).sin() * (pi_t / a).sin() / (pi_t * pi_t)
}

fn bilinear(img: &FloatImage, row: f32, col: f32) -> Option<f32> {
    if !row.is_finite() || !col.is_finite() {
        return None;
    }
    let r0 = row.floor();
    let c0 = col.floor();
    let fr = row - r0;
    let fc = col - c0;
    let (r0, c0) = (r0 as isize, c0 as isize);

    let v00 = img.try_get(r0, c0)?;
    let v01 = img.try_get(r0, c0 + 1)?;
    let v10 = img.try_get(r0 + 1, c0)?;
    let v11 = img.try_get(r0 + 1, c0 + 1)?;

    let top = v00 * (1.0 - fc) + v01 * fc;
    let bottom = v10 * (1.0 - fc) + v11 * fc;
    Some(top * (1.0 - fr) + bottom * fr)
}

fn separable_kernel(
    img: &FloatImage,
    row: f32,
    col: f32,
    radius: isize,
    weight: impl Fn(f32) -> f32,
) -> Option<f32> {
    if !row.is_finite() || !col.is_finite() {
        return None;
    }
    let r0 = row.floor() as isize;
    let c0 = col.floor() as isize;
    let fr = row - r0 as f32;
    let fc = col - c0 as f32;

    let mut total = 0.0f32;
    let mut weight_sum = 0.0f32;
    for dr in (1 - radius)..=radius {
        let wr = weight(fr - dr as f32);
        for dc in (1 - radius)..=radius {
            let wc = weight(fc - dc as f32);
            let sample = img.try_get(r0 + dr, c0 + dc)?;
            let w = wr * wc;
            total += w * sample;
            weight_sum += w;
        }
    }
    if weight_sum.abs() < 1e-6 {
        None
    } else {
        Some(total / weight_sum)
    }
}

fn bicubic(img: &FloatImage, row: f32, col: f32) -> Option<f32> {
    separable_kernel(img, row, col, 2, cubic_weight)
}

fn lanczos4(img: &FloatImage, row: f32, col: f32) -> Option<f32> {
    separable_kernel(img, row, col, 4, |t| lanczos_weight(t, 4.0))
}

/// Resamples `img` at `(row, col)` using `algorithm`. Returns `None`
/// when the requested neighborhood falls outside the image or the
/// coordinate itself is not finite (the grid's "no physical source"
/// marker), matching the upstream's border-constant-zero behavior.
pub fn sample(img: &FloatImage, row: f32, col: f32, algorithm: ResampleAlgorithm) -> Option<f32> {
    match algorithm {
        ResampleAlgorithm::Bilinear => bilinear(img, row, col),
        ResampleAlgorithm::Bicubic => bicubic(img, row, col),
        ResampleAlgorithm::Lanczos4 => lanczos4(img, row, col),
    }
}

/// Remaps `img` through `grid`, producing an image of `grid`'s shape.
/// Destination pixels with no valid source sample a zero, mirroring
/// OpenCV's `remap` with `BORDER_CONSTANT` and a zero border value.
pub fn remap(img: &FloatImage, grid: &RemapGrid, algorithm: ResampleAlgorithm) -> FloatImage {
    let mut out = FloatImage::zeros(grid.width(), grid.height());
    for row in 0..grid.height() {
        for col in 0..grid.width() {
            let (src_row, src_col) = grid.source_at(row, col);
            let value = sample(img, src_row, src_col, algorithm).unwrap_or(0.0);
            out.set(row, col, value);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ramp(w: usize, h: usize) -> FloatImage {
        let mut img = FloatImage::zeros(w, h);
        for row in 0..h {
            for col in 0..w {
                img.set(row, col, (row * w + col) as f32);
            }
        }
        img
    }

    #[test]
    fn flip_x_reverses_columns() {
        let img = FloatImage::from_vec(3, 1, vec![1.0, 2.0, 3.0]);
        let flipped = flip(&img, true, false);
        assert_eq!(flipped.as_slice(), &[3.0, 2.0, 1.0]);
    }

    #[test]
    fn flip_neither_is_a_clone() {
        let img = ramp(4, 4);
        let flipped = flip(&img, false, false);
        assert_eq!(flipped, img);
    }

    #[test]
    fn bilinear_at_integer_coordinates_matches_source_pixel() {
        let img = ramp(5, 5);
        let v = sample(&img, 2.0, 3.0, ResampleAlgorithm::Bilinear).unwrap();
        assert_eq!(v, img.get(2, 3));
    }

    #[test]
    fn bilinear_interpolates_between_pixels() {
        let img = FloatImage::from_vec(2, 1, vec![0.0, 10.0]);
        let v = sample(&img, 0.0, 0.5, ResampleAlgorithm::Bilinear).unwrap();
        assert!((v - 5.0).abs() < 1e-5);
    }

    #[test]
    fn sample_out_of_bounds_is_none() {
        let img = ramp(4, 4);
        assert!(sample(&img, -5.0, -5.0, ResampleAlgorithm::Bilinear).is_none());
    }

    #[test]
    fn sample_nan_coordinate_is_none() {
        let img = ramp(4, 4);
        assert!(sample(&img, f32::NAN, 1.0, ResampleAlgorithm::Bicubic).is_none());
    }

    #[test]
    fn remap_fills_missing_source_with_zero() {
        let img = ramp(4, 4);
        let grid = crate::grid::test_support::single_cell(f32::NAN, f32::NAN);
        let out = remap(&img, &grid, ResampleAlgorithm::Bilinear);
        assert_eq!(out.get(0, 0), 0.0);
    }

    proptest::proptest! {
        #[test]
        fn bilinear_never_overshoots_its_four_neighbors(
            row in 0isize..7, col in 0isize..7,
            fr in 0.0f32..1.0, fc in 0.0f32..1.0,
        ) {
            let img = ramp(8, 8);
            let v = bilinear(&img, row as f32 + fr, col as f32 + fc).unwrap();
            let corners = [
                img.get(row as usize, col as usize),
                img.get(row as usize, col as usize + 1),
                img.get(row as usize + 1, col as usize),
                img.get(row as usize + 1, col as usize + 1),
            ];
            let lo = corners.iter().cloned().fold(f32::INFINITY, f32::min);
            let hi = corners.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
            prop_assert!(v >= lo - 1e-4 && v <= hi + 1e-4);
        }
    }
}
