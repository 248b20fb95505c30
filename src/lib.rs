/*!
# dicodec-rs

`dicodec-rs` is a pure Rust library for the two lossless still-image
codecs used by medical-imaging transfer syntaxes, together with the DICOM
encapsulated pixel-data extraction that feeds them.

## Supported Standards

### JPEG Lossless (ISO/IEC 10918-1 / ITU-T T.81, Annex H)
- **Features**: first-order prediction (selection values 1-7), point
  transform, 2-16 bit grayscale, per-image optimized Huffman tables,
  restart-marker handling on decode.
- **Modules**: `jpeg_lossless`

### JPEG-LS (ISO/IEC 14495-1 / ITU-T T.87)
- **Features**: LOCO-I context modeling, run mode, lossless and
  near-lossless compression, 2-16 bit grayscale, LSE preset parameters on
  decode.
- **Modules**: `jpegls`

### DICOM Encapsulated Pixel Data (PS3.5, Annex A.4)
- **Features**: Explicit/Implicit VR little-endian walking to
  `(7FE0,0010)`, Basic Offset Table exposure, lazy per-frame fragment
  iteration.
- **Modules**: `dicom`

## Scope

Single-component grayscale only. Color transforms, progressive and
hierarchical modes, arithmetic coding, and DICOM dataset semantics beyond
the pixel-data walk are out of scope. Decoders tolerate truncated scans:
when at least 99% of the expected samples decoded, the remainder is filled
by replication and the image is returned with a truncation note; below
that, decoding fails with the failure coordinates.

Both codecs are pure over their inputs. All working state lives in the
encoder/decoder instance of one call, so frames may be processed on as
many threads as the caller likes.
*/

pub mod bit_io;
pub mod constants;
pub mod dicom;
pub mod error;
pub mod image;
pub mod jpeg_lossless;
pub mod jpeg_marker_code;
pub mod jpeg_stream_reader;
pub mod jpeg_stream_writer;
pub mod jpegls;

pub use error::CodecError;
pub use image::{GrayImage, SampleBuffer};

/// Basic information about a JPEG image frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameInfo {
    /// Width of the frame in pixels.
    pub width: u32,
    /// Height of the frame in pixels.
    pub height: u32,
    /// Bits per sample (2-16).
    pub bits_per_sample: i32,
    /// Number of components (always 1 in this library).
    pub component_count: i32,
}

/// Details of a scan that ended early and was completed by replication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TruncationInfo {
    pub decoded_samples: usize,
    pub expected_samples: usize,
}
