use crate::constants::MAX_K_VALUE;
use crate::error::CodecError;

/// Statistics of one run-interruption context (ISO/IEC 14495-1, A.7.2).
/// Context 365 (`RItype == 1`, `Ra == Rb`) and context 366 (`RItype == 0`)
/// track occurrence count `N`, accumulated magnitude `A` and the count of
/// negative errors `Nn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunModeContext {
    run_interruption_type: i32,
    a: i32,
    n: i32,
    nn: i32,
}

impl RunModeContext {
    pub fn new(run_interruption_type: i32, range: i32) -> Self {
        Self {
            run_interruption_type,
            a: initialization_value_for_a(range),
            n: 1,
            nn: 0,
        }
    }

    pub fn run_interruption_type(&self) -> i32 {
        self.run_interruption_type
    }

    /// Golomb parameter for the interruption error, code segment A.19.
    pub fn golomb_parameter(&self) -> Result<i32, CodecError> {
        let temp = self.a + (self.n >> 1) * self.run_interruption_type;
        let mut n_test = self.n;
        let mut k = 0;

        while n_test < temp {
            n_test <<= 1;
            k += 1;
            if k >= MAX_K_VALUE {
                return Err(CodecError::InvalidGolombParameter);
            }
        }
        Ok(k)
    }

    /// The `map` flag of code segment A.21.
    pub fn compute_map(&self, error_value: i32, k: i32) -> bool {
        if k == 0 && error_value > 0 && 2 * self.nn < self.n {
            return true;
        }
        if error_value < 0 && 2 * self.nn >= self.n {
            return true;
        }
        if error_value < 0 && k != 0 {
            return true;
        }
        false
    }

    /// Encoder-side mapping, code segment A.22:
    /// `EMErrval = 2 |Errval| - RItype - map`.
    pub fn mapped_error_value(&self, error_value: i32, k: i32) -> i32 {
        let map = self.compute_map(error_value, k) as i32;
        2 * error_value.abs() - self.run_interruption_type - map
    }

    /// Decoder-side inverse of the A.21/A.22 mapping. `temp` is the decoded
    /// `EMErrval` plus `RItype`.
    pub fn error_value_from(&self, temp: i32, k: i32) -> i32 {
        let map = (temp & 1) != 0;
        let error_value_abs = (temp + i32::from(map)) / 2;

        if (k != 0 || (2 * self.nn >= self.n)) == map {
            debug_assert!(map == self.compute_map(-error_value_abs, k));
            -error_value_abs
        } else {
            debug_assert!(map == self.compute_map(error_value_abs, k) || error_value_abs == 0);
            error_value_abs
        }
    }

    /// Variable update, code segment A.23.
    pub fn update_variables(
        &mut self,
        error_value: i32,
        e_mapped_error_value: i32,
        reset_threshold: i32,
    ) {
        if error_value < 0 {
            self.nn += 1;
        }

        self.a += (e_mapped_error_value + 1 - self.run_interruption_type) >> 1;

        if self.n == reset_threshold {
            self.a >>= 1;
            self.n >>= 1;
            self.nn >>= 1;
        }

        self.n += 1;
    }
}

fn initialization_value_for_a(range: i32) -> i32 {
    std::cmp::max(2, (range + 32) / 64)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encoding then decoding an interruption error must return the same
    /// value for both context types, for a spread of statistics.
    #[test]
    fn mapping_round_trips() {
        for ri_type in [0, 1] {
            let mut context = RunModeContext::new(ri_type, 256);
            let errors: &[i32] = if ri_type == 1 {
                &[1, -1, 2, -3, 5, 1, -1, -2, 4, 1]
            } else {
                &[0, 1, -1, 2, -3, 0, 5, -1, 1, 0]
            };
            for &error in errors {
                let k = context.golomb_parameter().unwrap();
                let mapped = context.mapped_error_value(error, k);
                assert!(mapped >= 0, "mapped value must be encodable");
                let decoded = context.error_value_from(mapped + ri_type, k);
                assert_eq!(decoded, error, "ri_type {ri_type}, error {error}, k {k}");
                context.update_variables(error, mapped, 64);
            }
        }
    }

    #[test]
    fn nn_tracks_negative_errors() {
        let mut context = RunModeContext::new(0, 256);
        let k = context.golomb_parameter().unwrap();
        let mapped = context.mapped_error_value(-2, k);
        context.update_variables(-2, mapped, 64);
        assert_eq!(context.nn, 1);
        let mapped = context.mapped_error_value(3, k);
        context.update_variables(3, mapped, 64);
        assert_eq!(context.nn, 1);
    }

    #[test]
    fn reset_halves_all_counters() {
        let mut context = RunModeContext::new(1, 256);
        for _ in 0..63 {
            let k = context.golomb_parameter().unwrap();
            let mapped = context.mapped_error_value(-1, k);
            context.update_variables(-1, mapped, 64);
        }
        assert_eq!(context.n, 64);
        let k = context.golomb_parameter().unwrap();
        let mapped = context.mapped_error_value(1, k);
        context.update_variables(1, mapped, 64);
        assert_eq!(context.n, 33);
        assert!(context.nn <= 32);
    }
}
