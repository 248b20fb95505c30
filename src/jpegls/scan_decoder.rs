//! LOCO-I scan decoding (ISO/IEC 14495-1, Annex A).

use log::warn;

use crate::bit_io::BitReader;
use crate::constants::{J, TRUNCATION_TOLERANCE_PERCENT};
use crate::error::CodecError;
use crate::jpegls::coding_parameters::ScanParameters;
use crate::jpegls::golomb_lut::GOLOMB_LUT;
use crate::jpegls::regular_mode_context::RegularModeContext;
use crate::jpegls::run_mode_context::RunModeContext;
use crate::jpegls::traits::{apply_sign, apply_sign_for_index, bit_wise_sign, Sample};
use crate::FrameInfo;
use crate::TruncationInfo;

pub struct ScanDecoder<'a> {
    params: ScanParameters,
    frame_info: FrameInfo,
    reader: BitReader<'a>,
    regular_contexts: Vec<RegularModeContext>,
    run_contexts: [RunModeContext; 2],
    run_index: usize,
    truncation: Option<TruncationInfo>,
}

impl<'a> ScanDecoder<'a> {
    pub fn new(frame_info: FrameInfo, params: ScanParameters, source: &'a [u8]) -> Self {
        let range = params.range;
        Self {
            params,
            frame_info,
            reader: BitReader::new(source),
            regular_contexts: vec![RegularModeContext::new(range); 365],
            run_contexts: [RunModeContext::new(0, range), RunModeContext::new(1, range)],
            run_index: 0,
            truncation: None,
        }
    }

    /// Set when the scan ended early and was completed by replication.
    pub fn truncation(&self) -> Option<TruncationInfo> {
        self.truncation
    }

    /// Decodes the scan into `destination` (row-major, `width * height`
    /// samples) and returns the number of source bytes consumed.
    pub fn decode_scan<T: Sample>(&mut self, destination: &mut [T]) -> Result<usize, CodecError> {
        let width = self.frame_info.width as usize;
        let height = self.frame_info.height as usize;
        debug_assert_eq!(destination.len(), width * height);

        let stride = width + 2;
        let mut prev = vec![0i32; stride];
        let mut curr = vec![0i32; stride];

        for line in 0..height {
            prev[width + 1] = prev[width];
            curr[0] = prev[1];
            self.run_index = 0;

            let valid = self.decode_sample_line(&prev, &mut curr, width)?;
            if valid < width {
                self.complete_truncated(destination, &prev, &mut curr, width, height, line, valid)?;
                return Ok(self.reader.finish());
            }

            let row = &mut destination[line * width..(line + 1) * width];
            for (slot, &value) in row.iter_mut().zip(&curr[1..=width]) {
                *slot = T::from_i32(value);
            }
            std::mem::swap(&mut prev, &mut curr);
        }

        Ok(self.reader.finish())
    }

    /// Decodes one line. Returns the number of samples decoded from real
    /// data; a short count means the reader ran out mid-line.
    fn decode_sample_line(
        &mut self,
        prev: &[i32],
        curr: &mut [i32],
        width: usize,
    ) -> Result<usize, CodecError> {
        let mut index = 1;
        while index <= width {
            let group_start = index;
            let ra = curr[index - 1];
            let rb = prev[index];
            let rc = prev[index - 1];
            let rd = prev[index + 1];

            let q1 = self.params.quantize_gradient(rd - rb);
            let q2 = self.params.quantize_gradient(rb - rc);
            let q3 = self.params.quantize_gradient(rc - ra);
            let qs = (q1 * 9 + q2) * 9 + q3;

            if qs == 0 {
                index += self.decode_run_mode(index, prev, curr, width)?;
            } else {
                let predicted = self.params.predicted_value(ra, rb, rc);
                curr[index] = self.decode_regular(qs, predicted)?;
                index += 1;
            }

            if self.reader.fabricated_bits() > 0 {
                // Everything from this group on came from padding.
                return Ok(group_start - 1);
            }
        }
        Ok(width)
    }

    /// Regular-mode sample (A.4 - A.6). Returns the reconstructed value.
    fn decode_regular(&mut self, qs: i32, predicted: i32) -> Result<i32, CodecError> {
        let sign = bit_wise_sign(qs);
        let ctx_index = apply_sign_for_index(qs, sign);

        let (k, c, correction) = {
            let context = &self.regular_contexts[ctx_index];
            let k = context.golomb_parameter()?;
            (
                k,
                context.c(),
                context.inverted_map_correction(k, self.params.near_lossless),
            )
        };

        let mapped = self.decode_mapped_value(k, self.params.limit)?;
        if self.reader.fabricated_bits() > 0 {
            return Ok(0); // Discarded by the caller.
        }
        let error_value = correction ^ unmap_error_value(mapped);

        self.regular_contexts[ctx_index].update_variables_and_bias(
            error_value,
            self.params.near_lossless,
            self.params.reset_threshold,
        )?;

        let predicted = (predicted + apply_sign(c, sign)).clamp(0, self.params.maximum_sample_value);
        Ok(self.params.reconstruct(predicted, apply_sign(error_value, sign)))
    }

    /// Run mode (A.7). Returns the number of samples consumed.
    fn decode_run_mode(
        &mut self,
        index: usize,
        prev: &[i32],
        curr: &mut [i32],
        width: usize,
    ) -> Result<usize, CodecError> {
        let ra = curr[index - 1];
        let count_remaining = width + 1 - index;

        let run_length = self.decode_run_pixels(count_remaining)?;
        for slot in &mut curr[index..index + run_length] {
            *slot = ra;
        }
        if run_length == count_remaining {
            return Ok(run_length);
        }

        let interruption = index + run_length;
        let rb = prev[interruption];
        curr[interruption] = self.decode_run_interruption_pixel(ra, rb)?;
        self.decrement_run_index();
        Ok(run_length + 1)
    }

    fn decode_run_pixels(&mut self, pixel_count: usize) -> Result<usize, CodecError> {
        let mut index = 0;
        loop {
            if self.reader.fabricated_bits() > 0 {
                return Ok(index); // Discarded by the caller.
            }
            if self.reader.read_bit() != 1 {
                break;
            }
            let full_block = 1usize << J[self.run_index];
            let count = full_block.min(pixel_count - index);
            index += count;
            if count == full_block {
                self.increment_run_index();
            }
            if index == pixel_count {
                return Ok(index);
            }
        }

        // A 0 bit ends the run inside the line; the residual length follows.
        let j = J[self.run_index];
        if j > 0 {
            index += self.reader.read_bits(j as u32) as usize;
        }
        if index > pixel_count {
            return Err(CodecError::GolombCodeOutOfRange);
        }
        Ok(index)
    }

    /// Interruption sample (A.7.2). Returns the reconstructed value.
    fn decode_run_interruption_pixel(&mut self, ra: i32, rb: i32) -> Result<i32, CodecError> {
        if self.params.is_near(ra, rb) {
            let error_value = self.decode_run_interruption_error(1)?;
            Ok(self.params.reconstruct(ra, error_value))
        } else {
            let sign = bit_wise_sign(rb - ra);
            let error_value = self.decode_run_interruption_error(0)?;
            Ok(self.params.reconstruct(rb, apply_sign(error_value, sign)))
        }
    }

    fn decode_run_interruption_error(&mut self, context_index: usize) -> Result<i32, CodecError> {
        let (k, ri_type) = {
            let context = &self.run_contexts[context_index];
            (
                context.golomb_parameter()?,
                context.run_interruption_type(),
            )
        };

        let limit = self.params.limit - J[self.run_index] - 1;
        let mapped = self.decode_mapped_value(k, limit)?;
        if self.reader.fabricated_bits() > 0 {
            return Ok(0); // Discarded by the caller.
        }

        let error_value = self.run_contexts[context_index].error_value_from(mapped + ri_type, k);
        self.run_contexts[context_index].update_variables(
            error_value,
            mapped,
            self.params.reset_threshold,
        );
        Ok(error_value)
    }

    /// Limited-length Golomb-Rice code word (A.5.3), with an 8-bit prefix
    /// lookup for the common short codes.
    fn decode_mapped_value(&mut self, k: i32, limit: i32) -> Result<i32, CodecError> {
        let qbpp = self.params.quantized_bits_per_sample;
        let escape_threshold = limit - qbpp - 1;

        // The lookup decodes unary prefixes up to 7, so it must not be used
        // when the escape can hide within 8 bits.
        if escape_threshold > 7 {
            let peek = self.reader.peek_bits(8) as usize;
            let hit = GOLOMB_LUT[k as usize][peek];
            if hit.bit_count > 0 {
                self.reader.consume_bits(hit.bit_count as u32);
                return Ok(i32::from(hit.value));
            }
        }

        let mut unary = 0;
        loop {
            if self.reader.fabricated_bits() > 0 {
                return Ok(0); // Discarded by the caller.
            }
            if self.reader.read_bit() == 1 {
                break;
            }
            unary += 1;
            if unary > escape_threshold {
                return Err(CodecError::GolombCodeOutOfRange);
            }
        }

        if unary == escape_threshold {
            Ok(self.reader.read_bits(qbpp as u32) as i32 + 1)
        } else {
            Ok((unary << k) | self.reader.read_bits(k as u32) as i32)
        }
    }

    /// Applies the truncation policy after `valid` samples of `line`
    /// decoded cleanly.
    #[allow(clippy::too_many_arguments)]
    fn complete_truncated<T: Sample>(
        &mut self,
        destination: &mut [T],
        prev: &[i32],
        curr: &mut [i32],
        width: usize,
        height: usize,
        line: usize,
        valid: usize,
    ) -> Result<(), CodecError> {
        let expected = width * height;
        let decoded = line * width + valid;
        if decoded * 100 < expected * TRUNCATION_TOLERANCE_PERCENT {
            return Err(CodecError::TruncatedScan {
                decoded,
                expected,
                x: valid as u32,
                y: line as u32,
            });
        }

        warn!("scan truncated after {decoded} of {expected} samples, completing by replication");

        // Replicate the last reconstructed sample along the current row.
        let last_value = if valid > 0 { curr[valid] } else { prev[width] };
        for slot in &mut curr[valid + 1..=width] {
            *slot = last_value;
        }
        // Repeat the completed row across the remaining rows.
        for row in line..height {
            let row_slice = &mut destination[row * width..(row + 1) * width];
            for (slot, &value) in row_slice.iter_mut().zip(&curr[1..=width]) {
                *slot = T::from_i32(value);
            }
        }

        self.truncation = Some(TruncationInfo {
            decoded_samples: decoded,
            expected_samples: expected,
        });
        Ok(())
    }

    fn increment_run_index(&mut self) {
        if self.run_index < 31 {
            self.run_index += 1;
        }
    }

    fn decrement_run_index(&mut self) {
        self.run_index = self.run_index.saturating_sub(1);
    }
}

fn unmap_error_value(mapped_value: i32) -> i32 {
    if mapped_value & 1 == 0 {
        mapped_value >> 1
    } else {
        -((mapped_value + 1) >> 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmapping_inverts_the_sign_interleave() {
        assert_eq!(unmap_error_value(0), 0);
        assert_eq!(unmap_error_value(2), 1);
        assert_eq!(unmap_error_value(1), -1);
        assert_eq!(unmap_error_value(4), 2);
        assert_eq!(unmap_error_value(3), -2);
        assert_eq!(unmap_error_value(65534), 32767);
        assert_eq!(unmap_error_value(65535), -32768);
    }
}
