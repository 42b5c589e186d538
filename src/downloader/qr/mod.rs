// QR decoder - reads a post URL out of a screenshot
//
// Screenshot QR codes are small, anti-aliased and placed anywhere, so no single
// preprocessing choice works for all of them. The decoder walks an ordered list
// of stages, cheapest first, and stops at the first payload:
//
// 1. As-is            - general reader on the original image
// 2. Detector         - dedicated detector; may decode or only locate the grid
// 3. Located region   - crop the located grid (+padding), upscale, re-read
// 4. Bottom band      - bottom 40% of the screenshot at several scales
// 5. Enhanced         - CLAHE contrast enhancement at several scales
// 6. Binarized        - Otsu threshold, upscaled
// 7. Upscaled         - whole image at several scales

mod preprocess;
mod reader;

pub use preprocess::{bottom_band, clahe, crop_around, otsu_binarize, upscale};
pub use reader::{BarcodeReader, Corners, Detection, QrDetector, RqrrBackend};

use image::GrayImage;
use std::fmt;

use super::errors::DownloadError;
use super::models::ImageSource;

/// Cascade stages in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QrStage {
    AsIs,
    Detector,
    LocatedRegion,
    BottomBand,
    Enhanced,
    Binarized,
    Upscaled,
}

impl QrStage {
    pub const ALL: [QrStage; 7] = [
        QrStage::AsIs,
        QrStage::Detector,
        QrStage::LocatedRegion,
        QrStage::BottomBand,
        QrStage::Enhanced,
        QrStage::Binarized,
        QrStage::Upscaled,
    ];

    /// 1-based position in the cascade
    pub fn number(&self) -> u8 {
        *self as u8 + 1
    }
}

impl fmt::Display for QrStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AsIs => "as-is",
            Self::Detector => "detector",
            Self::LocatedRegion => "located region",
            Self::BottomBand => "bottom band",
            Self::Enhanced => "contrast enhanced",
            Self::Binarized => "binarized",
            Self::Upscaled => "upscaled",
        };
        write!(f, "{} ({})", self.number(), name)
    }
}

/// Tuning for the cascade stages
#[derive(Debug, Clone)]
pub struct CascadeConfig {
    /// Margin added around a located grid, in pixels
    pub region_padding: u32,
    pub region_scale: u32,
    /// Fraction of the image height kept by the bottom-band stage
    pub bottom_fraction: f32,
    pub bottom_scales: Vec<u32>,
    pub clahe_clip_limit: f32,
    pub clahe_grid: u32,
    pub enhanced_scales: Vec<u32>,
    pub binarized_scale: u32,
    pub full_scales: Vec<u32>,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            region_padding: 50,
            region_scale: 3,
            bottom_fraction: 0.4,
            bottom_scales: vec![2, 3, 4],
            clahe_clip_limit: 2.0,
            clahe_grid: 8,
            enhanced_scales: vec![2, 3],
            binarized_scale: 2,
            full_scales: vec![2, 3],
        }
    }
}

/// Text decoded from a screenshot and the stage that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    pub payload: String,
    pub stage: QrStage,
}

pub struct QrDecoder {
    reader: Box<dyn BarcodeReader>,
    detector: Box<dyn QrDetector>,
    config: CascadeConfig,
}

impl QrDecoder {
    pub fn new() -> Self {
        Self::with_backends(Box::new(RqrrBackend::new()), Box::new(RqrrBackend::new()))
    }

    pub fn with_backends(reader: Box<dyn BarcodeReader>, detector: Box<dyn QrDetector>) -> Self {
        Self {
            reader,
            detector,
            config: CascadeConfig::default(),
        }
    }

    /// Decode the first QR payload found in the image
    pub fn decode(&self, source: &ImageSource) -> Result<String, DownloadError> {
        self.decode_with_stage(source).map(|decoded| decoded.payload)
    }

    pub fn decode_with_stage(&self, source: &ImageSource) -> Result<DecodedPayload, DownloadError> {
        let image = load_image(source)?;
        self.decode_image(&image)
    }

    /// Run the cascade over already-loaded pixels
    pub fn decode_image(&self, image: &GrayImage) -> Result<DecodedPayload, DownloadError> {
        let mut located: Option<Corners> = None;

        QrStage::ALL
            .iter()
            .find_map(|&stage| {
                let payload = self.run_stage(stage, image, &mut located);
                match &payload {
                    Some(_) => tracing::debug!(%stage, "QR stage decoded"),
                    None => tracing::debug!(%stage, "QR stage found nothing"),
                }
                payload.map(|payload| DecodedPayload { payload, stage })
            })
            .ok_or(DownloadError::NoQrFound)
    }

    fn run_stage(
        &self,
        stage: QrStage,
        image: &GrayImage,
        located: &mut Option<Corners>,
    ) -> Option<String> {
        let cfg = &self.config;

        match stage {
            QrStage::AsIs => self.reader.read(image),
            QrStage::Detector => match self.detector.detect(image) {
                Detection::Decoded(payload) => Some(payload),
                Detection::Located(corners) => {
                    *located = Some(corners);
                    None
                }
                Detection::NotFound => None,
            },
            QrStage::LocatedRegion => {
                let corners = located.as_ref()?;
                let region = crop_around(image, corners, cfg.region_padding)?;
                self.reader.read(&upscale(&region, cfg.region_scale))
            }
            QrStage::BottomBand => {
                let band = bottom_band(image, cfg.bottom_fraction);
                self.read_at_scales(&band, &cfg.bottom_scales)
            }
            QrStage::Enhanced => {
                let enhanced = clahe(image, cfg.clahe_clip_limit, cfg.clahe_grid);
                self.read_at_scales(&enhanced, &cfg.enhanced_scales)
            }
            QrStage::Binarized => {
                let binary = otsu_binarize(image);
                self.reader.read(&upscale(&binary, cfg.binarized_scale))
            }
            QrStage::Upscaled => self.read_at_scales(image, &cfg.full_scales),
        }
    }

    fn read_at_scales(&self, image: &GrayImage, scales: &[u32]) -> Option<String> {
        scales
            .iter()
            .find_map(|&factor| self.reader.read(&upscale(image, factor)))
    }
}

impl Default for QrDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Load pixel data as 8-bit grayscale
pub fn load_image(source: &ImageSource) -> Result<GrayImage, DownloadError> {
    let image = match source {
        ImageSource::Path(path) => {
            if !path.exists() {
                return Err(DownloadError::ImageNotFound(path.clone()));
            }
            image::open(path)
                .map_err(|e| DownloadError::ImageUnreadable(format!("{}: {}", path.display(), e)))?
        }
        ImageSource::Memory(bytes) => image::load_from_memory(bytes)
            .map_err(|e| DownloadError::ImageUnreadable(e.to_string()))?,
    };

    Ok(image.to_luma8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Reader that succeeds on the n-th call (1-based) and records image sizes
    struct ScriptedReader {
        succeed_on: Option<usize>,
        calls: AtomicUsize,
        sizes: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl ScriptedReader {
        fn new(succeed_on: Option<usize>) -> (Self, Arc<Mutex<Vec<(u32, u32)>>>) {
            let sizes = Arc::new(Mutex::new(Vec::new()));
            let reader = Self {
                succeed_on,
                calls: AtomicUsize::new(0),
                sizes: Arc::clone(&sizes),
            };
            (reader, sizes)
        }
    }

    impl BarcodeReader for ScriptedReader {
        fn read(&self, image: &GrayImage) -> Option<String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.sizes.lock().unwrap().push(image.dimensions());
            (Some(call) == self.succeed_on).then(|| format!("payload-{}", call))
        }
    }

    struct FixedDetector(Detection);

    impl QrDetector for FixedDetector {
        fn detect(&self, _image: &GrayImage) -> Detection {
            self.0.clone()
        }
    }

    fn canvas() -> GrayImage {
        GrayImage::from_pixel(100, 200, Luma([255]))
    }

    #[test]
    fn test_stage_one_short_circuits() {
        let (reader, sizes) = ScriptedReader::new(Some(1));
        let decoder = QrDecoder::with_backends(
            Box::new(reader),
            Box::new(FixedDetector(Detection::Decoded("never".into()))),
        );

        let decoded = decoder.decode_image(&canvas()).unwrap();
        assert_eq!(decoded.stage, QrStage::AsIs);
        assert_eq!(decoded.payload, "payload-1");
        assert_eq!(sizes.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_detector_payload_is_stage_two() {
        let (reader, sizes) = ScriptedReader::new(None);
        let decoder = QrDecoder::with_backends(
            Box::new(reader),
            Box::new(FixedDetector(Detection::Decoded("https://m.weibo.cn/status/1".into()))),
        );

        let decoded = decoder.decode_image(&canvas()).unwrap();
        assert_eq!(decoded.stage, QrStage::Detector);
        assert_eq!(decoded.payload, "https://m.weibo.cn/status/1");
        assert_eq!(sizes.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_located_region_is_cropped_and_upscaled() {
        let (reader, sizes) = ScriptedReader::new(Some(2));
        let corners = [(10, 10), (40, 10), (40, 40), (10, 40)];
        let decoder = QrDecoder::with_backends(
            Box::new(reader),
            Box::new(FixedDetector(Detection::Located(corners))),
        );

        let decoded = decoder.decode_image(&canvas()).unwrap();
        assert_eq!(decoded.stage, QrStage::LocatedRegion);
        // crop x 0..90, y 0..90, then 3x
        assert_eq!(sizes.lock().unwrap()[1], (270, 270));
    }

    #[test]
    fn test_exhausted_cascade_without_location() {
        let (reader, sizes) = ScriptedReader::new(None);
        let decoder =
            QrDecoder::with_backends(Box::new(reader), Box::new(FixedDetector(Detection::NotFound)));

        let result = decoder.decode_image(&canvas());
        assert!(matches!(result, Err(DownloadError::NoQrFound)));

        let sizes = sizes.lock().unwrap().clone();
        assert_eq!(
            sizes,
            vec![
                (100, 200), // as-is
                (200, 160), // bottom band x2
                (300, 240), // bottom band x3
                (400, 320), // bottom band x4
                (200, 400), // enhanced x2
                (300, 600), // enhanced x3
                (200, 400), // binarized x2
                (200, 400), // whole x2
                (300, 600), // whole x3
            ]
        );
    }

    #[test]
    fn test_exhausted_cascade_with_location_reads_ten_times() {
        let (reader, sizes) = ScriptedReader::new(None);
        let decoder = QrDecoder::with_backends(
            Box::new(reader),
            Box::new(FixedDetector(Detection::Located([(0, 0); 4]))),
        );

        assert!(decoder.decode_image(&canvas()).is_err());
        assert_eq!(sizes.lock().unwrap().len(), 10);
    }

    #[test]
    fn test_stages_are_ordered() {
        let numbers: Vec<u8> = QrStage::ALL.iter().map(|s| s.number()).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6, 7]);
        assert!(QrStage::Enhanced < QrStage::Binarized);
        assert_eq!(QrStage::BottomBand.to_string(), "4 (bottom band)");
    }

    #[test]
    fn test_missing_image_path() {
        let source = ImageSource::Path(PathBuf::from("/definitely/not/here.png"));
        assert!(matches!(
            QrDecoder::new().decode(&source),
            Err(DownloadError::ImageNotFound(_))
        ));
    }

    #[test]
    fn test_garbage_bytes_are_unreadable() {
        let source = ImageSource::Memory(b"not an image".to_vec());
        assert!(matches!(
            QrDecoder::new().decode(&source),
            Err(DownloadError::ImageUnreadable(_))
        ));
    }
}
