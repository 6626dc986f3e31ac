//! Raw-frame decoding from TIFF files on disk.

use std::path::Path;

use anyhow::Context;

use scatter_model::image::FloatImage;

/// Reads a single-channel TIFF frame into a [`FloatImage`], widening
/// whatever sample type the file stores (8/16-bit integer, float) to
/// `f32`.
pub fn read_frame(path: &Path) -> anyhow::Result<FloatImage> {
    let decoded = image::open(path).with_context(|| format!("decoding {}", path.display()))?;
    let gray = decoded.to_luma32f();
    let (width, height) = (gray.width() as usize, gray.height() as usize);
    Ok(FloatImage::from_vec(width, height, gray.into_raw()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_a_tiff_frame_into_a_float_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.tif");
        let img: image::GrayImage = image::ImageBuffer::from_pixel(3, 2, image::Luma([200u8]));
        img.save(&path).unwrap();

        let frame = read_frame(&path).unwrap();
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.height(), 2);
        assert!((frame.get(0, 0) - 200.0 / 255.0).abs() < 1e-3);
    }
}
