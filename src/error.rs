use thiserror::Error;

/// Errors produced by the codecs and the encapsulated pixel-data walker.
///
/// Variants fall into four groups: structural stream damage, entropy-coder
/// failures, scan truncation, and unsupported or invalid parameters. The
/// first three are decode-side; parameter errors occur on both sides.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    // Structural errors
    #[error("JPEG marker start byte not found")]
    JpegMarkerStartByteNotFound,
    #[error("Start of image marker not found")]
    StartOfImageMarkerNotFound,
    #[error("Unknown JPEG marker found")]
    UnknownJpegMarkerFound,
    #[error("Invalid marker segment size")]
    InvalidMarkerSegmentSize,
    #[error("Duplicate start of frame marker")]
    DuplicateStartOfFrameMarker,
    #[error("Start of frame marker not found")]
    StartOfFrameMarkerNotFound,
    #[error("Unexpected end of data")]
    UnexpectedEndOfData,
    #[error("Missing Huffman table for scan")]
    MissingHuffmanTable,
    #[error("Restart marker not found")]
    RestartMarkerNotFound,

    // Entropy errors
    #[error("Invalid Huffman code in entropy-coded segment")]
    InvalidHuffmanCode,
    #[error("Golomb code exceeds the limit without escape")]
    GolombCodeOutOfRange,
    #[error("Invalid Golomb coding parameter")]
    InvalidGolombParameter,
    #[error("Corrupt context statistics")]
    CorruptContextStatistics,

    // Truncation
    #[error("scan truncated: {decoded} of {expected} samples decoded, failed at ({x}, {y})")]
    TruncatedScan {
        decoded: usize,
        expected: usize,
        x: u32,
        y: u32,
    },

    // Parameter errors
    #[error("Encoding not supported")]
    EncodingNotSupported,
    #[error("Parameter value not supported")]
    ParameterValueNotSupported,
    #[error("Invalid parameter width")]
    InvalidParameterWidth,
    #[error("Invalid parameter height")]
    InvalidParameterHeight,
    #[error("Invalid parameter bits per sample")]
    InvalidParameterBitsPerSample,
    #[error("Invalid parameter component count")]
    InvalidParameterComponentCount,
    #[error("Invalid parameter near lossless")]
    InvalidParameterNearLossless,
    #[error("Invalid parameter predictor")]
    InvalidParameterPredictor,
    #[error("Invalid parameter point transform")]
    InvalidParameterPointTransform,
    #[error("Invalid JPEG-LS preset coding parameters")]
    InvalidPresetCodingParameters,

    // Encapsulated pixel data
    #[error("DICM magic word not found after preamble")]
    DicomMagicNotFound,
    #[error("Pixel Data element not found")]
    PixelDataNotFound,
    #[error("Pixel Data element is not encapsulated")]
    PixelDataNotEncapsulated,
    #[error("Truncated data element")]
    TruncatedDataElement,
}
