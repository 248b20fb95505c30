use crate::constants::MAX_K_VALUE;
use crate::error::CodecError;

/// Statistics of one regular-mode context: occurrence count `N`,
/// accumulated absolute error `A`, accumulated signed error `B` and the
/// bias-correction value `C` (ISO/IEC 14495-1, A.2.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegularModeContext {
    a: i32,
    b: i32,
    c: i32,
    n: i32,
}

impl RegularModeContext {
    pub fn new(range: i32) -> Self {
        Self {
            a: initialization_value_for_a(range),
            b: 0,
            c: 0,
            n: 1,
        }
    }

    pub fn c(&self) -> i32 {
        self.c
    }

    /// Golomb parameter: the smallest `k` with `N << k >= A`
    /// (code segment A.10).
    pub fn golomb_parameter(&self) -> Result<i32, CodecError> {
        let mut k = 0;
        while (self.n << k) < self.a {
            k += 1;
            if k >= MAX_K_VALUE {
                return Err(CodecError::InvalidGolombParameter);
            }
        }
        Ok(k)
    }

    /// -1 when the `k == 0`, `NEAR == 0` mapping is inverted
    /// (`2B <= -N`, code segments A.11 / A.18), otherwise 0. XOR-ing an
    /// error value with the result applies `e -> -e - 1`.
    pub fn inverted_map_correction(&self, k: i32, near_lossless: i32) -> i32 {
        if k == 0 && near_lossless == 0 && 2 * self.b + self.n - 1 < 0 {
            -1
        } else {
            0
        }
    }

    /// Variable update and bias cancellation, code segments A.12 and A.13.
    pub fn update_variables_and_bias(
        &mut self,
        error_value: i32,
        near_lossless: i32,
        reset_threshold: i32,
    ) -> Result<(), CodecError> {
        debug_assert!(self.n != 0);

        self.a += error_value.abs();
        self.b += error_value * (2 * near_lossless + 1);

        if self.a >= 65536 * 256 || self.b.abs() >= 65536 * 256 {
            return Err(CodecError::CorruptContextStatistics);
        }

        if self.n == reset_threshold {
            self.a >>= 1;
            self.b >>= 1;
            self.n >>= 1;
        }

        self.n += 1;

        const MAX_C: i32 = 127;
        const MIN_C: i32 = -128;

        if self.b + self.n <= 0 {
            self.b += self.n;
            if self.b <= -self.n {
                self.b = -self.n + 1;
            }
            if self.c > MIN_C {
                self.c -= 1;
            }
        } else if self.b > 0 {
            self.b -= self.n;
            if self.b > 0 {
                self.b = 0;
            }
            if self.c < MAX_C {
                self.c += 1;
            }
        }
        Ok(())
    }
}

fn initialization_value_for_a(range: i32) -> i32 {
    std::cmp::max(2, (range + 32) / 64)
}
