mod checksum;
mod csv;
mod decoder;
mod encoder;
mod encoder_dynamic;
mod reader_extension;

pub use csv::create_log_file_by_csv_file;
pub use decoder::BinlogDecoder;
pub use encoder::BinlogEncoder;

/// Part-1 header text written at the start of every log file.
pub(crate) const FILE_HEADER: &[u8; 15] = b"BINARY_DATA_LOG";

/// Header text written by older revisions of the format; accepted when
/// decoding, never written.
pub(crate) const LEGACY_FILE_HEADER: &[u8; 13] = b"SLAM_DATA_LOG";
