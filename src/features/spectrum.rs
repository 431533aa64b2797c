use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

use super::{Extraction, FeatureSource, Frame, FramePayload, SourceError};

/// Reference audio embedding: log band energies of a Hann-windowed FFT.
///
/// Frames quieter than the silence threshold count as "nothing detected".
pub struct SpectrumSource {
    fft_len: usize,
    bands: usize,
    silence_rms: f32,
    fft: Option<Arc<dyn Fft<f32>>>,
    window: Vec<f32>,
}

impl SpectrumSource {
    pub fn new(fft_len: usize, bands: usize) -> Self {
        Self {
            fft_len: fft_len.max(2).next_power_of_two(),
            bands: bands.max(1),
            silence_rms: 1e-3,
            fft: None,
            window: Vec::new(),
        }
    }

    pub fn with_silence_rms(mut self, rms: f32) -> Self {
        self.silence_rms = rms.max(0.0);
        self
    }

    pub fn feature_len(&self) -> usize {
        self.bands
    }

    fn band_energies(&self, spectrum: &[Complex<f32>]) -> Vec<f32> {
        let bins = self.fft_len / 2;
        let mut out = Vec::with_capacity(self.bands);
        for band in 0..self.bands {
            let start = band_edge(band, self.bands, bins);
            let end = band_edge(band + 1, self.bands, bins).max(start + 1).min(bins);
            let energy: f32 = spectrum[start..end].iter().map(|c| c.norm_sqr()).sum();
            let mean = energy / (end - start) as f32;
            out.push((mean + 1e-10).log10());
        }
        out
    }
}

impl Default for SpectrumSource {
    fn default() -> Self {
        Self::new(512, 16)
    }
}

/// Log-spaced band edges over `1..=bins`.
fn band_edge(index: usize, bands: usize, bins: usize) -> usize {
    let fraction = index as f32 / bands as f32;
    let edge = (bins as f32).powf(fraction).round() as usize;
    edge.clamp(1, bins) - 1
}

fn hann(len: usize) -> Vec<f32> {
    if len <= 1 {
        return vec![1.0; len.max(1)];
    }
    let denom = (len - 1) as f32;
    (0..len)
        .map(|n| 0.5 * (1.0 - (2.0 * PI * n as f32 / denom).cos()))
        .collect()
}

impl FeatureSource for SpectrumSource {
    fn init(&mut self) -> Result<(), SourceError> {
        let mut planner = FftPlanner::<f32>::new();
        self.fft = Some(planner.plan_fft_forward(self.fft_len));
        self.window = hann(self.fft_len);
        Ok(())
    }

    fn extract(&mut self, frame: &Frame) -> Result<Option<Extraction>, SourceError> {
        let FramePayload::Audio { samples, .. } = &frame.payload else {
            return Err(SourceError::UnsupportedFrame);
        };
        let Some(fft) = self.fft.as_ref() else {
            return Err(SourceError::Extract {
                detail: "spectrum source used before init".into(),
            });
        };
        if samples.is_empty() {
            return Ok(None);
        }
        let tail = &samples[samples.len().saturating_sub(self.fft_len)..];
        let rms = (tail.iter().map(|s| s * s).sum::<f32>() / tail.len() as f32).sqrt();
        if rms < self.silence_rms {
            return Ok(None);
        }

        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.fft_len];
        for (slot, (sample, weight)) in buffer.iter_mut().zip(tail.iter().zip(&self.window)) {
            slot.re = sample * weight;
        }
        fft.process(&mut buffer);
        Ok(Some(Extraction::Features(self.band_energies(&buffer))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|n| (2.0 * PI * freq * n as f32 / sample_rate as f32).sin() * 0.5)
            .collect()
    }

    fn features(source: &mut SpectrumSource, samples: Vec<f32>) -> Vec<f32> {
        match source.extract(&Frame::audio(0.0, 16_000, samples)).unwrap() {
            Some(Extraction::Features(values)) => values,
            other => panic!("unexpected extraction {other:?}"),
        }
    }

    #[test]
    fn silence_is_nothing_detected() {
        let mut source = SpectrumSource::default();
        source.init().unwrap();
        let out = source
            .extract(&Frame::audio(0.0, 16_000, vec![0.0f32; 512]))
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn tones_land_in_different_bands() {
        let mut source = SpectrumSource::new(512, 8);
        source.init().unwrap();
        let low = features(&mut source, tone(200.0, 16_000, 512));
        let high = features(&mut source, tone(6_000.0, 16_000, 512));
        assert_eq!(low.len(), 8);
        let argmax = |v: &[f32]| {
            v.iter()
                .enumerate()
                .fold(0, |best, (i, x)| if *x > v[best] { i } else { best })
        };
        assert!(argmax(&low) < argmax(&high));
    }

    #[test]
    fn extract_before_init_fails() {
        let mut source = SpectrumSource::default();
        let frame = Frame::audio(0.0, 16_000, tone(440.0, 16_000, 512));
        assert!(source.extract(&frame).is_err());
    }

    #[test]
    fn band_edges_are_monotonic() {
        let edges: Vec<usize> = (0..=16).map(|i| band_edge(i, 16, 256)).collect();
        assert!(edges.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(edges[0], 0);
        assert_eq!(edges[16], 255);
    }
}
