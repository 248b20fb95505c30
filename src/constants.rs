pub const DEFAULT_RESET_THRESHOLD: i32 = 64; // Default RESET value as defined in ISO/IEC 14495-1, table C.2

pub const MINIMUM_BITS_PER_SAMPLE: i32 = 2;
pub const MAXIMUM_BITS_PER_SAMPLE: i32 = 16;
pub const MAXIMUM_NEAR_LOSSLESS: i32 = 255;
pub const MAXIMUM_DIMENSION: u32 = u16::MAX as u32;

pub const MAX_K_VALUE: i32 = 16; // This is an implementation limit (theoretical limit is 32)

// Predictor selection values carried in the lossless SOS segment (T.81 H.1).
pub const MINIMUM_PREDICTOR: u8 = 1;
pub const MAXIMUM_PREDICTOR: u8 = 7;
pub const MAXIMUM_POINT_TRANSFORM: u8 = 15;

// The size in bytes of the segment length field.
pub const SEGMENT_LENGTH_SIZE: usize = 2;

// Fraction of expected samples that must have decoded before a truncated
// scan is completed by replication instead of failing.
pub const TRUNCATION_TOLERANCE_PERCENT: usize = 99;

// Run length code order, ISO/IEC 14495-1 table A.2.
pub const J: [i32; 32] = [
    0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 9, 10, 11, 12, 13,
    14, 15,
];
