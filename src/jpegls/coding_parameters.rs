//! Preset coding parameters and derived scan constants.

use std::cmp::{max, min};

use crate::constants::{DEFAULT_RESET_THRESHOLD, MAXIMUM_NEAR_LOSSLESS};
use crate::error::CodecError;

/// The preset coding parameters carried by an LSE type-1 segment
/// (ISO/IEC 14495-1, C.2.4.1.1). Zero fields mean "use the default".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PresetCodingParameters {
    pub maximum_sample_value: i32,
    pub threshold1: i32,
    pub threshold2: i32,
    pub threshold3: i32,
    pub reset_value: i32,
}

// Clamping function as defined by ISO/IEC 14495-1, Figure C.3
const fn clamp(i: i32, j: i32, maximum_sample_value: i32) -> i32 {
    if i > maximum_sample_value || i < j {
        j
    } else {
        i
    }
}

pub fn compute_maximum_near_lossless(maximum_sample_value: i32) -> i32 {
    debug_assert!(maximum_sample_value >= 1);
    min(MAXIMUM_NEAR_LOSSLESS, maximum_sample_value / 2)
}

/// Default threshold values as defined by ISO/IEC 14495-1, C.2.4.1.1.1.
pub fn compute_default(maximum_sample_value: i32, near_lossless: i32) -> PresetCodingParameters {
    debug_assert!(maximum_sample_value <= u16::MAX as i32);

    // Basic threshold values from table C.3 (MAXVAL = 255, NEAR = 0).
    const DEFAULT_THRESHOLD1: i32 = 3;
    const DEFAULT_THRESHOLD2: i32 = 7;
    const DEFAULT_THRESHOLD3: i32 = 21;

    if maximum_sample_value >= 128 {
        let factor = (min(maximum_sample_value, 4095) + 128) / 256;
        let threshold1 = clamp(
            factor * (DEFAULT_THRESHOLD1 - 2) + 2 + 3 * near_lossless,
            near_lossless + 1,
            maximum_sample_value,
        );
        let threshold2 = clamp(
            factor * (DEFAULT_THRESHOLD2 - 3) + 3 + 5 * near_lossless,
            threshold1,
            maximum_sample_value,
        );

        PresetCodingParameters {
            maximum_sample_value,
            threshold1,
            threshold2,
            threshold3: clamp(
                factor * (DEFAULT_THRESHOLD3 - 4) + 4 + 7 * near_lossless,
                threshold2,
                maximum_sample_value,
            ),
            reset_value: DEFAULT_RESET_THRESHOLD,
        }
    } else {
        let factor = 256 / (maximum_sample_value + 1);
        let threshold1 = clamp(
            max(2, DEFAULT_THRESHOLD1 / factor + 3 * near_lossless),
            near_lossless + 1,
            maximum_sample_value,
        );
        let threshold2 = clamp(
            max(3, DEFAULT_THRESHOLD2 / factor + 5 * near_lossless),
            threshold1,
            maximum_sample_value,
        );

        PresetCodingParameters {
            maximum_sample_value,
            threshold1,
            threshold2,
            threshold3: clamp(
                max(4, DEFAULT_THRESHOLD3 / factor + 7 * near_lossless),
                threshold2,
                maximum_sample_value,
            ),
            reset_value: DEFAULT_RESET_THRESHOLD,
        }
    }
}

/// Validates LSE parameters against ISO/IEC 14495-1 table C.1 and fills the
/// zero fields with their defaults.
pub fn validate(
    pc_parameters: &PresetCodingParameters,
    maximum_component_value: i32,
    near_lossless: i32,
) -> Result<PresetCodingParameters, CodecError> {
    debug_assert!(maximum_component_value >= 3 && maximum_component_value <= u16::MAX as i32);

    if pc_parameters.maximum_sample_value != 0
        && (pc_parameters.maximum_sample_value < 1
            || pc_parameters.maximum_sample_value > maximum_component_value)
    {
        return Err(CodecError::InvalidPresetCodingParameters);
    }

    let maximum_sample_value = if pc_parameters.maximum_sample_value != 0 {
        pc_parameters.maximum_sample_value
    } else {
        maximum_component_value
    };

    if pc_parameters.threshold1 != 0
        && (pc_parameters.threshold1 < near_lossless + 1
            || pc_parameters.threshold1 > maximum_sample_value)
    {
        return Err(CodecError::InvalidPresetCodingParameters);
    }

    let defaults = compute_default(maximum_sample_value, near_lossless);

    let threshold1 = if pc_parameters.threshold1 != 0 {
        pc_parameters.threshold1
    } else {
        defaults.threshold1
    };

    if pc_parameters.threshold2 != 0
        && (pc_parameters.threshold2 < threshold1
            || pc_parameters.threshold2 > maximum_sample_value)
    {
        return Err(CodecError::InvalidPresetCodingParameters);
    }

    let threshold2 = if pc_parameters.threshold2 != 0 {
        pc_parameters.threshold2
    } else {
        defaults.threshold2
    };

    if pc_parameters.threshold3 != 0
        && (pc_parameters.threshold3 < threshold2
            || pc_parameters.threshold3 > maximum_sample_value)
    {
        return Err(CodecError::InvalidPresetCodingParameters);
    }

    if pc_parameters.reset_value != 0
        && (pc_parameters.reset_value < 3
            || pc_parameters.reset_value > max(255, maximum_sample_value))
    {
        return Err(CodecError::InvalidPresetCodingParameters);
    }

    Ok(PresetCodingParameters {
        maximum_sample_value,
        threshold1,
        threshold2,
        threshold3: if pc_parameters.threshold3 != 0 {
            pc_parameters.threshold3
        } else {
            defaults.threshold3
        },
        reset_value: if pc_parameters.reset_value != 0 {
            pc_parameters.reset_value
        } else {
            defaults.reset_value
        },
    })
}

/// All per-scan constants derived from precision, NEAR and the preset
/// parameters (ISO/IEC 14495-1, A.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanParameters {
    pub maximum_sample_value: i32,
    pub near_lossless: i32,
    /// Number of distinct quantized prediction-error values.
    pub range: i32,
    /// Bits needed for an unquantized sample.
    pub bits_per_sample: i32,
    /// Bits needed for a quantized prediction error.
    pub quantized_bits_per_sample: i32,
    /// Upper bound on the length of a Golomb code word.
    pub limit: i32,
    pub threshold1: i32,
    pub threshold2: i32,
    pub threshold3: i32,
    pub reset_threshold: i32,
}

impl ScanParameters {
    pub fn new(pc: &PresetCodingParameters, near_lossless: i32) -> Self {
        let maximum_sample_value = pc.maximum_sample_value;
        let range = (maximum_sample_value + 2 * near_lossless) / (2 * near_lossless + 1) + 1;
        let bits_per_sample = max(2, log2_ceiling(maximum_sample_value + 1));
        Self {
            maximum_sample_value,
            near_lossless,
            range,
            bits_per_sample,
            quantized_bits_per_sample: max(2, log2_ceiling(range)),
            limit: 2 * (bits_per_sample + max(8, bits_per_sample)),
            threshold1: pc.threshold1,
            threshold2: pc.threshold2,
            threshold3: pc.threshold3,
            reset_threshold: pc.reset_value,
        }
    }
}

impl ScanParameters {
    /// Gradient quantizer of ISO/IEC 14495-1, A.3.3, widened by the
    /// near-lossless band around zero.
    pub fn quantize_gradient(&self, di: i32) -> i32 {
        if di <= -self.threshold3 {
            return -4;
        }
        if di <= -self.threshold2 {
            return -3;
        }
        if di <= -self.threshold1 {
            return -2;
        }
        if di < -self.near_lossless {
            return -1;
        }
        if di <= self.near_lossless {
            return 0;
        }
        if di < self.threshold1 {
            return 1;
        }
        if di < self.threshold2 {
            return 2;
        }
        if di < self.threshold3 {
            return 3;
        }
        4
    }

    /// Median edge detector prediction, clamped to the sample range
    /// (ISO/IEC 14495-1, A.4.1).
    pub fn predicted_value(&self, ra: i32, rb: i32, rc: i32) -> i32 {
        let sign = crate::jpegls::traits::bit_wise_sign(rb - ra);
        let predicted = if (sign ^ (rc - ra)) < 0 {
            rb
        } else if (sign ^ (rb - rc)) < 0 {
            ra
        } else {
            ra + rb - rc
        };
        predicted.clamp(0, self.maximum_sample_value)
    }

    /// Error quantization for near-lossless coding (A.4.4).
    pub fn quantize_error(&self, error_value: i32) -> i32 {
        if error_value > 0 {
            (error_value + self.near_lossless) / (2 * self.near_lossless + 1)
        } else {
            -(self.near_lossless - error_value) / (2 * self.near_lossless + 1)
        }
    }

    /// Reduces a quantized error to `[-range/2, range/2)` (A.4.5).
    pub fn modulo_range(&self, mut error_value: i32) -> i32 {
        if error_value < 0 {
            error_value += self.range;
        }
        if error_value >= (self.range + 1) / 2 {
            error_value -= self.range;
        }
        error_value
    }

    /// Sample reconstruction from a signed quantized error (A.4.2 / A.8.2):
    /// dequantize, wrap back into the representable band, clamp.
    pub fn reconstruct(&self, predicted: i32, error_value: i32) -> i32 {
        let mut value = predicted + error_value * (2 * self.near_lossless + 1);
        if value < -self.near_lossless {
            value += self.range * (2 * self.near_lossless + 1);
        } else if value > self.maximum_sample_value + self.near_lossless {
            value -= self.range * (2 * self.near_lossless + 1);
        }
        value.clamp(0, self.maximum_sample_value)
    }

    /// Run-mode sample match (A.7.1.1).
    pub fn is_near(&self, lhs: i32, rhs: i32) -> bool {
        (lhs - rhs).abs() <= self.near_lossless
    }
}

fn log2_ceiling(value: i32) -> i32 {
    debug_assert!(value > 0);
    (32 - (value - 1).leading_zeros()) as i32
}
