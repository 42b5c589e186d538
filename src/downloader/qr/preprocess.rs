// Image transforms used by the QR cascade

use image::imageops::{self, FilterType};
use image::GrayImage;

use super::reader::Corners;

/// Upscale by an integer factor with cubic resampling
pub fn upscale(image: &GrayImage, factor: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if factor <= 1 || w == 0 || h == 0 {
        return image.clone();
    }
    imageops::resize(image, w * factor, h * factor, FilterType::CatmullRom)
}

/// Crop the bounding box of `corners`, grown by `padding` and clamped to the image
pub fn crop_around(image: &GrayImage, corners: &Corners, padding: u32) -> Option<GrayImage> {
    let (w, h) = image.dimensions();
    let pad = padding as i64;

    let xs = corners.iter().map(|(x, _)| *x as i64);
    let ys = corners.iter().map(|(_, y)| *y as i64);
    let x_min = (xs.clone().min()? - pad).clamp(0, w as i64) as u32;
    let x_max = (xs.max()? + pad).clamp(0, w as i64) as u32;
    let y_min = (ys.clone().min()? - pad).clamp(0, h as i64) as u32;
    let y_max = (ys.max()? + pad).clamp(0, h as i64) as u32;

    if x_max <= x_min || y_max <= y_min {
        return None;
    }

    Some(imageops::crop_imm(image, x_min, y_min, x_max - x_min, y_max - y_min).to_image())
}

/// Bottom `fraction` of the image (full width)
pub fn bottom_band(image: &GrayImage, fraction: f32) -> GrayImage {
    let (w, h) = image.dimensions();
    let top = (h as f32 * (1.0 - fraction.clamp(0.0, 1.0))) as u32;
    imageops::crop_imm(image, 0, top, w, h - top).to_image()
}

/// Global binarization at the Otsu level (`> level` becomes white)
pub fn otsu_binarize(image: &GrayImage) -> GrayImage {
    let level = imageproc::contrast::otsu_level(image);
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        pixel[0] = if pixel[0] > level { 255 } else { 0 };
    }
    out
}

/// Contrast-limited adaptive histogram equalization.
///
/// The image is split into at most `grid` x `grid` tiles. Each tile gets an
/// equalization table whose histogram is clipped at `clip_limit` times the
/// uniform bin height, with the excess spread over all bins. Pixels blend
/// the tables of the four nearest tile centers.
pub fn clahe(image: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 || grid == 0 {
        return image.clone();
    }

    let tile_w = w.div_ceil(grid.min(w));
    let tile_h = h.div_ceil(grid.min(h));
    let cols = w.div_ceil(tile_w);
    let rows = h.div_ceil(tile_h);

    let mut luts = Vec::with_capacity((cols * rows) as usize);
    for ty in 0..rows {
        for tx in 0..cols {
            let x0 = tx * tile_w;
            let y0 = ty * tile_h;
            let x1 = (x0 + tile_w).min(w);
            let y1 = (y0 + tile_h).min(h);
            luts.push(tile_lut(image, x0, y0, x1, y1, clip_limit));
        }
    }

    let lut_at = |tx: u32, ty: u32| &luts[(ty * cols + tx) as usize];
    let neighbours = |pos: u32, tile: u32, count: u32| -> (u32, u32, f32) {
        let f = (pos as f32 + 0.5) / tile as f32 - 0.5;
        let lo = (f.floor().max(0.0) as u32).min(count - 1);
        let hi = (lo + 1).min(count - 1);
        let weight = (f - lo as f32).clamp(0.0, 1.0);
        (lo, hi, weight)
    };

    let mut out = GrayImage::new(w, h);
    for y in 0..h {
        let (ty0, ty1, ay) = neighbours(y, tile_h, rows);
        for x in 0..w {
            let (tx0, tx1, ax) = neighbours(x, tile_w, cols);
            let v = image.get_pixel(x, y)[0] as usize;

            let top = lut_at(tx0, ty0)[v] as f32 * (1.0 - ax) + lut_at(tx1, ty0)[v] as f32 * ax;
            let bottom = lut_at(tx0, ty1)[v] as f32 * (1.0 - ax) + lut_at(tx1, ty1)[v] as f32 * ax;
            let value = top * (1.0 - ay) + bottom * ay;

            out.put_pixel(x, y, image::Luma([value.round().clamp(0.0, 255.0) as u8]));
        }
    }
    out
}

fn tile_lut(image: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32, clip_limit: f32) -> [u8; 256] {
    let mut hist = [0u32; 256];
    for y in y0..y1 {
        for x in x0..x1 {
            hist[image.get_pixel(x, y)[0] as usize] += 1;
        }
    }

    let area = ((x1 - x0) * (y1 - y0)) as f32;
    let limit = ((clip_limit * area / 256.0) as u32).max(1);

    let mut excess = 0u32;
    for bin in hist.iter_mut() {
        if *bin > limit {
            excess += *bin - limit;
            *bin = limit;
        }
    }
    let bonus = excess / 256;
    for bin in hist.iter_mut() {
        *bin += bonus;
    }
    // Leftover counts go to evenly spaced bins
    let remainder = (excess % 256) as usize;
    if remainder > 0 {
        let step = (256 / remainder).max(1);
        for bin in hist.iter_mut().step_by(step).take(remainder) {
            *bin += 1;
        }
    }

    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    for (i, count) in hist.iter().enumerate() {
        cdf += count;
        lut[i] = (cdf as f32 * 255.0 / area).round().min(255.0) as u8;
    }
    lut
}
