// QR reading backends used by the decode cascade

use image::GrayImage;

/// Four corner points of a located QR grid, in image coordinates
pub type Corners = [(i32, i32); 4];

/// What a dedicated detector found in an image
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// Grid found and decoded
    Decoded(String),
    /// Grid found but its payload could not be decoded
    Located(Corners),
    NotFound,
}

/// General-purpose reader: returns the first payload it can decode, if any
pub trait BarcodeReader: Send + Sync {
    fn read(&self, image: &GrayImage) -> Option<String>;
}

/// Detector that can report where a QR grid is even when decoding fails
pub trait QrDetector: Send + Sync {
    fn detect(&self, image: &GrayImage) -> Detection;
}

/// `rqrr`-backed implementation of both roles
#[derive(Debug, Default, Clone, Copy)]
pub struct RqrrBackend;

struct ScannedGrid {
    payload: Option<String>,
    corners: Corners,
}

impl RqrrBackend {
    pub fn new() -> Self {
        Self
    }

    fn scan(image: &GrayImage) -> Vec<ScannedGrid> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                image.get_pixel(x as u32, y as u32)[0]
            });

        prepared
            .detect_grids()
            .into_iter()
            .map(|grid| {
                let payload = grid
                    .decode()
                    .ok()
                    .map(|(_, content)| content)
                    .filter(|content| !content.is_empty());
                ScannedGrid {
                    payload,
                    corners: grid.bounds.map(|p| (p.x, p.y)),
                }
            })
            .collect()
    }
}

impl BarcodeReader for RqrrBackend {
    fn read(&self, image: &GrayImage) -> Option<String> {
        Self::scan(image).into_iter().find_map(|grid| grid.payload)
    }
}

impl QrDetector for RqrrBackend {
    fn detect(&self, image: &GrayImage) -> Detection {
        let grids = Self::scan(image);

        if let Some(payload) = grids.iter().find_map(|g| g.payload.clone()) {
            return Detection::Decoded(payload);
        }

        match grids.first() {
            Some(grid) => Detection::Located(grid.corners),
            None => Detection::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_blank_image_has_no_grid() {
        let blank = GrayImage::from_pixel(120, 120, Luma([255]));
        let backend = RqrrBackend::new();
        assert_eq!(backend.read(&blank), None);
        assert_eq!(backend.detect(&blank), Detection::NotFound);
    }

    #[test]
    fn test_empty_image_is_handled() {
        let empty = GrayImage::new(0, 0);
        assert_eq!(RqrrBackend::new().read(&empty), None);
    }
}
