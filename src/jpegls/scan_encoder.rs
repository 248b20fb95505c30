//! LOCO-I scan encoding (ISO/IEC 14495-1, Annex A).

use crate::bit_io::BitWriter;
use crate::constants::J;
use crate::error::CodecError;
use crate::jpegls::coding_parameters::ScanParameters;
use crate::jpegls::regular_mode_context::RegularModeContext;
use crate::jpegls::run_mode_context::RunModeContext;
use crate::jpegls::traits::{apply_sign, apply_sign_for_index, bit_wise_sign, Sample};
use crate::FrameInfo;

pub struct ScanEncoder<'a, 'b> {
    params: ScanParameters,
    frame_info: FrameInfo,
    bits: &'a mut BitWriter<'b>,
    regular_contexts: Vec<RegularModeContext>,
    run_contexts: [RunModeContext; 2],
    run_index: usize,
}

impl<'a, 'b> ScanEncoder<'a, 'b> {
    pub fn new(
        frame_info: FrameInfo,
        params: ScanParameters,
        bits: &'a mut BitWriter<'b>,
    ) -> Self {
        let range = params.range;
        Self {
            params,
            frame_info,
            bits,
            regular_contexts: vec![RegularModeContext::new(range); 365],
            run_contexts: [RunModeContext::new(0, range), RunModeContext::new(1, range)],
            run_index: 0,
        }
    }

    /// Encodes all sample lines and pads the stream to a byte boundary.
    pub fn encode_scan<T: Sample>(&mut self, source: &[T]) -> Result<(), CodecError> {
        let width = self.frame_info.width as usize;
        let height = self.frame_info.height as usize;
        debug_assert_eq!(source.len(), width * height);

        // Line buffers carry one sample of padding on each side: index 0 is
        // Ra for the first sample, index width + 1 is Rd for the last.
        let stride = width + 2;
        let mut prev = vec![0i32; stride];
        let mut curr = vec![0i32; stride];

        for line in 0..height {
            let row = &source[line * width..(line + 1) * width];
            for (slot, sample) in curr[1..=width].iter_mut().zip(row) {
                *slot = sample.to_i32();
            }
            prev[width + 1] = prev[width];
            curr[0] = prev[1];
            self.run_index = 0;

            self.encode_sample_line(&prev, &mut curr, width)?;
            std::mem::swap(&mut prev, &mut curr);
        }

        self.bits.flush();
        Ok(())
    }

    /// One line. `curr` holds original samples ahead of the cursor and
    /// reconstructed samples behind it, so prediction always sees what the
    /// decoder will see.
    fn encode_sample_line(
        &mut self,
        prev: &[i32],
        curr: &mut [i32],
        width: usize,
    ) -> Result<(), CodecError> {
        let mut index = 1;
        while index <= width {
            let ra = curr[index - 1];
            let rb = prev[index];
            let rc = prev[index - 1];
            let rd = prev[index + 1];

            let q1 = self.params.quantize_gradient(rd - rb);
            let q2 = self.params.quantize_gradient(rb - rc);
            let q3 = self.params.quantize_gradient(rc - ra);
            let qs = (q1 * 9 + q2) * 9 + q3;

            if qs == 0 {
                index += self.encode_run_mode(index, prev, curr, width)?;
            } else {
                let predicted = self.params.predicted_value(ra, rb, rc);
                curr[index] = self.encode_regular(qs, curr[index], predicted)?;
                index += 1;
            }
        }
        Ok(())
    }

    /// Regular-mode sample (A.4 - A.6). Returns the reconstructed value.
    fn encode_regular(&mut self, qs: i32, x: i32, predicted: i32) -> Result<i32, CodecError> {
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

        let predicted = (predicted + apply_sign(c, sign)).clamp(0, self.params.maximum_sample_value);
        let error_value = self
            .params
            .modulo_range(self.params.quantize_error(apply_sign(x - predicted, sign)));
        let mapped = map_error_value(correction ^ error_value);

        self.encode_mapped_value(k, mapped, self.params.limit);

        self.regular_contexts[ctx_index].update_variables_and_bias(
            error_value,
            self.params.near_lossless,
            self.params.reset_threshold,
        )?;

        Ok(self.params.reconstruct(predicted, apply_sign(error_value, sign)))
    }

    /// Run mode (A.7). Returns the number of samples consumed.
    fn encode_run_mode(
        &mut self,
        index: usize,
        prev: &[i32],
        curr: &mut [i32],
        width: usize,
    ) -> Result<usize, CodecError> {
        let ra = curr[index - 1];
        let count_remaining = width + 1 - index;

        let mut run_length = 0;
        while run_length < count_remaining && self.params.is_near(curr[index + run_length], ra) {
            curr[index + run_length] = ra;
            run_length += 1;
        }

        self.encode_run_pixels(run_length, run_length == count_remaining);
        if run_length == count_remaining {
            return Ok(run_length);
        }

        let interruption = index + run_length;
        let x = curr[interruption];
        let rb = prev[interruption];
        curr[interruption] = self.encode_run_interruption_pixel(x, ra, rb)?;
        self.decrement_run_index();
        Ok(run_length + 1)
    }

    /// Run-length code (A.7.1.2): a 1 bit per full `2^J[RUNindex]` block,
    /// and for an in-line break a 0 bit plus the residual length.
    fn encode_run_pixels(&mut self, mut run_length: usize, end_of_line: bool) {
        while run_length >= 1 << J[self.run_index] {
            self.bits.write_bits(1, 1);
            run_length -= 1 << J[self.run_index];
            self.increment_run_index();
        }

        if end_of_line {
            if run_length != 0 {
                self.bits.write_bits(1, 1);
            }
        } else {
            self.bits
                .write_bits(run_length as u32, J[self.run_index] as u32 + 1);
        }
    }

    /// Interruption sample (A.7.2). Returns the reconstructed value.
    fn encode_run_interruption_pixel(&mut self, x: i32, ra: i32, rb: i32) -> Result<i32, CodecError> {
        if self.params.is_near(ra, rb) {
            let error_value = self
                .params
                .modulo_range(self.params.quantize_error(x - ra));
            self.encode_run_interruption_error(1, error_value)?;
            Ok(self.params.reconstruct(ra, error_value))
        } else {
            let sign = bit_wise_sign(rb - ra);
            let error_value = self
                .params
                .modulo_range(self.params.quantize_error(apply_sign(x - rb, sign)));
            self.encode_run_interruption_error(0, error_value)?;
            Ok(self.params.reconstruct(rb, apply_sign(error_value, sign)))
        }
    }

    fn encode_run_interruption_error(
        &mut self,
        context_index: usize,
        error_value: i32,
    ) -> Result<(), CodecError> {
        let (k, mapped) = {
            let context = &self.run_contexts[context_index];
            let k = context.golomb_parameter()?;
            (k, context.mapped_error_value(error_value, k))
        };
        debug_assert!(mapped >= 0);

        let limit = self.params.limit - J[self.run_index] - 1;
        self.encode_mapped_value(k, mapped, limit);

        self.run_contexts[context_index].update_variables(
            error_value,
            mapped,
            self.params.reset_threshold,
        );
        Ok(())
    }

    /// Limited-length Golomb-Rice code word (A.5.3).
    fn encode_mapped_value(&mut self, k: i32, mapped: i32, limit: i32) {
        let qbpp = self.params.quantized_bits_per_sample;
        let high_bits = mapped >> k;

        if high_bits < limit - qbpp - 1 {
            self.bits.write_zeros(high_bits as u32);
            self.bits.write_bits(1, 1);
            if k > 0 {
                self.bits
                    .write_bits((mapped & ((1 << k) - 1)) as u32, k as u32);
            }
        } else {
            // Escape: maximum-length unary prefix, then the value minus one.
            self.bits.write_zeros((limit - qbpp - 1) as u32);
            self.bits.write_bits(1, 1);
            self.bits
                .write_bits(((mapped - 1) & ((1 << qbpp) - 1)) as u32, qbpp as u32);
        }
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

/// Signed-to-unsigned error mapping (A.5.2): non-negative values to even,
/// negative to odd.
fn map_error_value(error_value: i32) -> i32 {
    (error_value >> 30) ^ (2 * error_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_mapping_interleaves_signs() {
        assert_eq!(map_error_value(0), 0);
        assert_eq!(map_error_value(1), 2);
        assert_eq!(map_error_value(-1), 1);
        assert_eq!(map_error_value(2), 4);
        assert_eq!(map_error_value(-2), 3);
        assert_eq!(map_error_value(32767), 65534);
        assert_eq!(map_error_value(-32768), 65535);
    }
}
