use image::{RgbaImage, imageops};

use super::{Extraction, FeatureSource, Frame, FramePayload, SourceError};

/// Reference image embedding: a downscaled grayscale thumbnail in `[0, 1]`.
///
/// Good enough to separate strongly different scenes; real deployments plug
/// in a pretrained embedding network behind the same trait.
#[derive(Debug, Clone)]
pub struct ThumbnailSource {
    side: u32,
}

impl ThumbnailSource {
    pub fn new(side: u32) -> Self {
        Self { side: side.max(1) }
    }

    pub fn feature_len(&self) -> usize {
        (self.side * self.side) as usize
    }
}

impl Default for ThumbnailSource {
    fn default() -> Self {
        Self::new(8)
    }
}

impl FeatureSource for ThumbnailSource {
    fn init(&mut self) -> Result<(), SourceError> {
        Ok(())
    }

    fn extract(&mut self, frame: &Frame) -> Result<Option<Extraction>, SourceError> {
        let FramePayload::Image {
            width,
            height,
            rgba,
        } = &frame.payload
        else {
            return Err(SourceError::UnsupportedFrame);
        };
        if *width == 0 || *height == 0 {
            return Ok(None);
        }
        let image = RgbaImage::from_raw(*width, *height, rgba.to_vec()).ok_or_else(|| {
            SourceError::Extract {
                detail: format!("pixel buffer does not match {width}x{height} RGBA"),
            }
        })?;
        let gray = imageops::grayscale(&image);
        let small = imageops::resize(&gray, self.side, self.side, imageops::FilterType::Triangle);
        let features = small
            .pixels()
            .map(|pixel| f32::from(pixel.0[0]) / 255.0)
            .collect();
        Ok(Some(Extraction::Features(features)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, value: u8) -> Frame {
        let pixels: Vec<u8> = (0..width * height)
            .flat_map(|_| [value, value, value, 255])
            .collect();
        Frame::image(0.0, width, height, pixels)
    }

    #[test]
    fn produces_fixed_length_normalized_vector() {
        let mut source = ThumbnailSource::new(4);
        let Some(Extraction::Features(features)) = source.extract(&solid(32, 24, 255)).unwrap()
        else {
            panic!("expected features");
        };
        assert_eq!(features.len(), source.feature_len());
        assert!(features.iter().all(|v| *v > 0.99 && *v <= 1.0));
    }

    #[test]
    fn mismatched_buffer_is_an_error() {
        let mut source = ThumbnailSource::default();
        let frame = Frame::image(0.0, 10, 10, vec![0u8; 12]);
        assert!(matches!(
            source.extract(&frame),
            Err(SourceError::Extract { .. })
        ));
    }

    #[test]
    fn audio_frames_are_rejected() {
        let mut source = ThumbnailSource::default();
        let frame = Frame::audio(0.0, 16_000, vec![0.0f32; 64]);
        assert!(matches!(
            source.extract(&frame),
            Err(SourceError::UnsupportedFrame)
        ));
    }
}
