//! Grayscale image buffer shared by the codecs.
//!
//! Samples are stored row-major in one of two precision variants. All
//! predictor and context arithmetic runs in `i32`, which is wide enough to
//! hold `2 * max_value + 1` for every supported precision, so the variants
//! only dispatch at the buffer boundary.

use crate::constants::{MAXIMUM_BITS_PER_SAMPLE, MAXIMUM_DIMENSION, MINIMUM_BITS_PER_SAMPLE};
use crate::error::CodecError;

/// Sample storage for a single-component image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SampleBuffer {
    /// Precisions 2..=8.
    U8(Vec<u8>),
    /// Precisions 9..=16.
    U16(Vec<u16>),
}

impl SampleBuffer {
    pub fn len(&self) -> usize {
        match self {
            SampleBuffer::U8(v) => v.len(),
            SampleBuffer::U16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A rectangle of grayscale samples with an explicit precision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayImage {
    width: u32,
    height: u32,
    bits_per_sample: i32,
    samples: SampleBuffer,
}

impl GrayImage {
    /// Creates a zero-filled image. The buffer variant follows the precision:
    /// `U8` for up to 8 bits per sample, `U16` above.
    pub fn zeroed(width: u32, height: u32, bits_per_sample: i32) -> Result<Self, CodecError> {
        validate_dimensions(width, height)?;
        validate_bits_per_sample(bits_per_sample)?;
        let count = width as usize * height as usize;
        let samples = if bits_per_sample <= 8 {
            SampleBuffer::U8(vec![0u8; count])
        } else {
            SampleBuffer::U16(vec![0u16; count])
        };
        Ok(Self {
            width,
            height,
            bits_per_sample,
            samples,
        })
    }

    pub fn from_samples_u8(
        width: u32,
        height: u32,
        bits_per_sample: i32,
        samples: Vec<u8>,
    ) -> Result<Self, CodecError> {
        validate_dimensions(width, height)?;
        validate_bits_per_sample(bits_per_sample)?;
        if bits_per_sample > 8 || samples.len() != width as usize * height as usize {
            return Err(CodecError::ParameterValueNotSupported);
        }
        Ok(Self {
            width,
            height,
            bits_per_sample,
            samples: SampleBuffer::U8(samples),
        })
    }

    pub fn from_samples_u16(
        width: u32,
        height: u32,
        bits_per_sample: i32,
        samples: Vec<u16>,
    ) -> Result<Self, CodecError> {
        validate_dimensions(width, height)?;
        validate_bits_per_sample(bits_per_sample)?;
        if bits_per_sample <= 8 || samples.len() != width as usize * height as usize {
            return Err(CodecError::ParameterValueNotSupported);
        }
        Ok(Self {
            width,
            height,
            bits_per_sample,
            samples: SampleBuffer::U16(samples),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bits_per_sample(&self) -> i32 {
        self.bits_per_sample
    }

    /// `2^P - 1` for precision `P`.
    pub fn max_value(&self) -> i32 {
        (1 << self.bits_per_sample) - 1
    }

    pub fn sample_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn samples(&self) -> &SampleBuffer {
        &self.samples
    }

    pub fn get(&self, x: u32, y: u32) -> i32 {
        let index = y as usize * self.width as usize + x as usize;
        match &self.samples {
            SampleBuffer::U8(v) => v[index] as i32,
            SampleBuffer::U16(v) => v[index] as i32,
        }
    }

    pub fn set(&mut self, x: u32, y: u32, value: i32) {
        let index = y as usize * self.width as usize + x as usize;
        match &mut self.samples {
            SampleBuffer::U8(v) => v[index] = value as u8,
            SampleBuffer::U16(v) => v[index] = value as u16,
        }
    }
}

fn validate_dimensions(width: u32, height: u32) -> Result<(), CodecError> {
    if width == 0 || width > MAXIMUM_DIMENSION {
        return Err(CodecError::InvalidParameterWidth);
    }
    if height == 0 || height > MAXIMUM_DIMENSION {
        return Err(CodecError::InvalidParameterHeight);
    }
    Ok(())
}

fn validate_bits_per_sample(bits_per_sample: i32) -> Result<(), CodecError> {
    if !(MINIMUM_BITS_PER_SAMPLE..=MAXIMUM_BITS_PER_SAMPLE).contains(&bits_per_sample) {
        return Err(CodecError::InvalidParameterBitsPerSample);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeroed_picks_buffer_variant_by_precision() {
        let image = GrayImage::zeroed(4, 3, 8).unwrap();
        assert!(matches!(image.samples(), SampleBuffer::U8(_)));
        assert_eq!(image.sample_count(), 12);
        assert_eq!(image.max_value(), 255);

        let image = GrayImage::zeroed(4, 3, 12).unwrap();
        assert!(matches!(image.samples(), SampleBuffer::U16(_)));
        assert_eq!(image.max_value(), 4095);
    }

    #[test]
    fn get_set_round_trip() {
        let mut image = GrayImage::zeroed(5, 5, 16).unwrap();
        image.set(4, 2, 65535);
        image.set(0, 0, 12345);
        assert_eq!(image.get(4, 2), 65535);
        assert_eq!(image.get(0, 0), 12345);
        assert_eq!(image.get(1, 1), 0);
    }

    #[test]
    fn zero_sized_image_is_rejected() {
        assert_eq!(
            GrayImage::zeroed(0, 4, 8),
            Err(CodecError::InvalidParameterWidth)
        );
        assert_eq!(
            GrayImage::zeroed(4, 0, 8),
            Err(CodecError::InvalidParameterHeight)
        );
    }

    #[test]
    fn precision_out_of_range_is_rejected() {
        assert_eq!(
            GrayImage::zeroed(4, 4, 1),
            Err(CodecError::InvalidParameterBitsPerSample)
        );
        assert_eq!(
            GrayImage::zeroed(4, 4, 17),
            Err(CodecError::InvalidParameterBitsPerSample)
        );
    }

    #[test]
    fn sample_vector_length_must_match() {
        assert!(GrayImage::from_samples_u8(4, 4, 8, vec![0; 15]).is_err());
        assert!(GrayImage::from_samples_u16(4, 4, 12, vec![0; 16]).is_ok());
    }
}
