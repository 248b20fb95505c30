use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::error::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum JpegMarkerCode {
    /// SOF0: Baseline DCT frame. Recognized so it can be rejected cleanly.
    StartOfFrameBaseline = 0xC0,
    /// SOF1: Extended sequential DCT frame.
    StartOfFrameExtended = 0xC1,
    /// SOF2: Progressive DCT frame.
    StartOfFrameProgressive = 0xC2,
    /// SOF3: Lossless (sequential) frame, first-order prediction.
    StartOfFrameLossless = 0xC3,

    /// DHT: Defines one or more Huffman tables.
    DefineHuffmanTable = 0xC4,

    /// SOI: Marks the start of an image.
    StartOfImage = 0xD8,

    /// EOI: Marks the end of an image.
    EndOfImage = 0xD9,

    /// SOS: Marks the start of scan.
    StartOfScan = 0xDA,

    /// DNL: Defines the number of lines in a scan.
    DefineNumberOfLines = 0xDC,

    /// DRI: Defines the restart interval used in succeeding scans.
    DefineRestartInterval = 0xDD,

    /// APP0: Application data 0: used for JFIF header.
    ApplicationData0 = 0xE0,
    /// APP1: Application data 1: used for EXIF or XMP header.
    ApplicationData1 = 0xE1,
    /// APP2: Application data 2: used for ICC profile.
    ApplicationData2 = 0xE2,
    /// APP3: Application data 3.
    ApplicationData3 = 0xE3,
    /// APP4: Application data 4.
    ApplicationData4 = 0xE4,
    /// APP5: Application data 5.
    ApplicationData5 = 0xE5,
    /// APP6: Application data 6.
    ApplicationData6 = 0xE6,
    /// APP7: Application data 7.
    ApplicationData7 = 0xE7,
    /// APP8: Application data 8: used for SPIFF header.
    ApplicationData8 = 0xE8,
    /// APP9: Application data 9.
    ApplicationData9 = 0xE9,
    /// APP10: Application data 10.
    ApplicationData10 = 0xEA,
    /// APP11: Application data 11.
    ApplicationData11 = 0xEB,
    /// APP12: Application data 12.
    ApplicationData12 = 0xEC,
    /// APP13: Application data 13.
    ApplicationData13 = 0xED,
    /// APP14: Application data 14.
    ApplicationData14 = 0xEE,
    /// APP15: Application data 15.
    ApplicationData15 = 0xEF,

    /// COM: Comment block.
    Comment = 0xFE,

    // The following markers are defined in ISO/IEC 14495-1 | ITU T.87. (JPEG-LS standard)
    /// SOF_55: Marks the start of a JPEG-LS encoded frame.
    StartOfFrameJpegls = 0xF7,

    /// LSE: Marks the start of a JPEG-LS preset parameters segment.
    JpeglsPresetParameters = 0xF8,
}

impl JpegMarkerCode {
    pub fn from_byte(value: u8) -> Result<Self, CodecError> {
        Self::try_from(value).map_err(|_| CodecError::UnknownJpegMarkerFound)
    }

    pub fn is_application_data(self) -> bool {
        matches!(u8::from(self), 0xE0..=0xEF)
    }
}

pub const JPEG_MARKER_START_BYTE: u8 = 0xFF;
pub const JPEG_RESTART_MARKER_BASE: u8 = 0xD0;
pub const JPEG_RESTART_MARKER_RANGE: u8 = 8;

/// True for the second byte of an RSTn marker.
pub fn is_restart_marker_byte(value: u8) -> bool {
    (JPEG_RESTART_MARKER_BASE..JPEG_RESTART_MARKER_BASE + JPEG_RESTART_MARKER_RANGE)
        .contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_markers_convert_from_bytes() {
        assert_eq!(
            JpegMarkerCode::from_byte(0xC3).unwrap(),
            JpegMarkerCode::StartOfFrameLossless
        );
        assert_eq!(
            JpegMarkerCode::from_byte(0xF7).unwrap(),
            JpegMarkerCode::StartOfFrameJpegls
        );
        assert_eq!(
            JpegMarkerCode::from_byte(0xD9).unwrap(),
            JpegMarkerCode::EndOfImage
        );
    }

    #[test]
    fn unknown_marker_is_rejected() {
        assert_eq!(
            JpegMarkerCode::from_byte(0x01),
            Err(CodecError::UnknownJpegMarkerFound)
        );
    }

    #[test]
    fn restart_marker_byte_range() {
        assert!(is_restart_marker_byte(0xD0));
        assert!(is_restart_marker_byte(0xD7));
        assert!(!is_restart_marker_byte(0xD8));
        assert!(!is_restart_marker_byte(0xCF));
    }
}
