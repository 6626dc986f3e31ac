use scatter_config::ContrastConfig;
use scatter_model::FloatImage;

const CLAHE_BINS: usize = 256;
const CLAHE_RANGE: f64 = 65536.0;

/// Min-max normalize into `[0, 1]`. A flat image (`max == min`) normalizes
/// to all zeros rather than dividing by zero.
pub fn normalize(img: &FloatImage) -> FloatImage {
    let (min, max) = img.min_max();
    let span = max - min;
    if span.abs() < f32::EPSILON {
        return FloatImage::zeros(img.width(), img.height());
    }
    let mut out = img.clone();
    for v in out.as_mut_slice() {
        *v = (*v - min) / span;
    }
    out
}

/// A single-tile contrast-limited histogram equalization over a 16-bit
/// intensity range, matching `cv.createCLAHE(clipLimit, tileGridSize=(1,1))`.
/// With one tile there is nothing to interpolate between, so this is a
/// global clipped-histogram equalization.
pub fn clahe(img: &FloatImage, clip_limit: f64) -> FloatImage {
    let n = img.as_slice().len();
    if n == 0 {
        return img.clone();
    }

    let bin_of = |v: f32| -> usize {
        let clamped = v.clamp(0.0, (CLAHE_RANGE - 1.0) as f32) as f64;
        ((clamped / CLAHE_RANGE) * CLAHE_BINS as f64) as usize
    };

    let mut histogram = [0u32; CLAHE_BINS];
    for &v in img.as_slice() {
        histogram[bin_of(v).min(CLAHE_BINS - 1)] += 1;
    }

    let average = n as f64 / CLAHE_BINS as f64;
    let clip_value = (clip_limit * average).max(1.0);

    let mut excess = 0.0f64;
    let mut clipped = [0.0f64; CLAHE_BINS];
    for (i, &count) in histogram.iter().enumerate() {
        let count = count as f64;
        if count > clip_value {
            excess += count - clip_value;
            clipped[i] = clip_value;
        } else {
            clipped[i] = count;
        }
    }
    let redistribute = excess / CLAHE_BINS as f64;
    for c in clipped.iter_mut() {
        *c += redistribute;
    }

    let mut cdf = [0.0f64; CLAHE_BINS];
    let mut running = 0.0f64;
    for (i, &c) in clipped.iter().enumerate() {
        running += c;
        cdf[i] = running;
    }
    let total = running.max(1.0);

    let mut out = img.clone();
    for v in out.as_mut_slice() {
        let bin = bin_of(*v).min(CLAHE_BINS - 1);
        *v = ((cdf[bin] / total) * (CLAHE_RANGE - 1.0)) as f32;
    }
    out
}

/// The full contrast correction pipeline: optional log scaling, then
/// CLAHE, then a final normalize. Mirrors `preprocess_exp` exactly,
/// including that `normalize` runs before `log10`, again before
/// `clahe`, and again after.
pub fn correct(img: &FloatImage, cfg: &ContrastConfig) -> FloatImage {
    if cfg.disable {
        return img.clone();
    }

    let mut working = img.clone();
    if cfg.log {
        let mut logged = normalize(&working);
        for v in logged.as_mut_slice() {
            *v = ((*v as f64) * cfg.coef + 1.0).log10() as f32;
        }
        working = logged;
    }

    let scaled = normalize(&working);
    let mut coefed = scaled;
    for v in coefed.as_mut_slice() {
        *v *= cfg.coef as f32;
    }

    let equalized = clahe(&coefed, cfg.limit);
    normalize(&equalized)
}
