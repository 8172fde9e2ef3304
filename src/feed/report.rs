use crate::feed::error::FeedError;
use crate::feed::types::{CompressionAlgorithm, ProcessingReport};
use flate2::read::MultiGzDecoder;
use std::io::Read;

pub fn parse_compression(tag: Option<&str>) -> Result<Option<CompressionAlgorithm>, FeedError> {
    match tag.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) if raw.eq_ignore_ascii_case("GZIP") => Ok(Some(CompressionAlgorithm::Gzip)),
        Some(other) => Err(FeedError::Decode(format!(
            "unsupported compression algorithm {other}"
        ))),
    }
}

/// Decompresses (when tagged) and decodes report bytes as UTF-8.
pub fn decode_report(
    document_id: &str,
    compression: Option<CompressionAlgorithm>,
    raw_bytes: Vec<u8>,
) -> Result<ProcessingReport, FeedError> {
    let text = match compression {
        Some(CompressionAlgorithm::Gzip) => {
            let mut decoder = MultiGzDecoder::new(raw_bytes.as_slice());
            let mut plain = Vec::new();
            decoder
                .read_to_end(&mut plain)
                .map_err(|err| FeedError::Decode(format!("gzip: {err}")))?;
            utf8(plain)?
        }
        None => utf8(raw_bytes.clone())?,
    };

    Ok(ProcessingReport {
        document_id: document_id.to_string(),
        compression,
        raw_bytes,
        text,
    })
}

fn utf8(bytes: Vec<u8>) -> Result<String, FeedError> {
    String::from_utf8(bytes).map_err(|err| FeedError::Decode(format!("utf-8: {err}")))
}
