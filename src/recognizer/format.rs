// NOTE: Capture and WAV encoding both assume 16-bit signed integer PCM.
// The remote transcription endpoint is happy with 16kHz mono, so that is
// the only format we produce.

#[derive(Debug, Clone, Copy)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub const BITS_PER_SAMPLE: u16 = 16;

    /// Number of samples covering the given duration in seconds
    pub fn samples_for_duration(&self, seconds: f32) -> usize {
        (self.sample_rate as f32 * seconds) as usize
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_for_duration_scales_with_rate() {
        let format = AudioFormat::default();
        assert_eq!(format.samples_for_duration(1.0), 16000);
        assert_eq!(format.samples_for_duration(0.5), 8000);
    }
}
