//! zlib inflation of compressed frames

use flate2::{Decompress, FlushDecompress};
use std::io::Read;

use super::Frame;
use crate::error::GatewayError;

/// Every complete message in a zlib stream ends with this sync-flush marker
pub const ZLIB_SUFFIX: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

/// First byte of a zlib header
const ZLIB_MARKER: u8 = 0x78;

/// Largest message accepted, compressed or inflated
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Compression negotiated with the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    None,
    /// Individual binary frames may be zlib documents
    #[default]
    Payload,
    /// One zlib context for the whole connection
    Stream,
}

impl Compression {
    /// Value of the `compress` query parameter, if any
    pub const fn query_value(self) -> Option<&'static str> {
        match self {
            Self::Stream => Some("zlib-stream"),
            Self::None | Self::Payload => None,
        }
    }
}

/// Turns frames into JSON text
///
/// One instance lives for one connection; stream mode keeps its context
/// between frames.
pub struct Inflater {
    mode: Compression,
    context: Decompress,
    buffer: Vec<u8>,
    limit: usize,
}

impl Inflater {
    pub fn new(mode: Compression) -> Self {
        Self::with_limit(mode, MAX_MESSAGE_SIZE)
    }

    /// Like [`Inflater::new`] with a custom cap on message size
    pub fn with_limit(mode: Compression, limit: usize) -> Self {
        Self {
            mode,
            context: Decompress::new(true),
            buffer: Vec::new(),
            limit,
        }
    }

    pub fn mode(&self) -> Compression {
        self.mode
    }

    /// Decode a frame. `Ok(None)` means the frame was only part of a message,
    /// or was not a data frame.
    pub fn push(&mut self, frame: Frame) -> Result<Option<String>, GatewayError> {
        match frame {
            Frame::Text(text) => Ok(Some(text)),
            Frame::Binary(bytes) => self.push_binary(bytes),
            Frame::Close { .. } => Ok(None),
        }
    }

    fn push_binary(&mut self, bytes: Vec<u8>) -> Result<Option<String>, GatewayError> {
        match self.mode {
            Compression::Stream => {
                if self.buffer.len() + bytes.len() > self.limit {
                    self.buffer.clear();
                    return Err(too_large(self.limit));
                }
                self.buffer.extend_from_slice(&bytes);
                if !self.buffer.ends_with(&ZLIB_SUFFIX) {
                    return Ok(None);
                }
                let input = std::mem::take(&mut self.buffer);
                let output = inflate_sync(&mut self.context, &input, self.limit)?;
                into_text(output).map(Some)
            }
            Compression::Payload | Compression::None => {
                if bytes.first() == Some(&ZLIB_MARKER) {
                    let mut inflated = Vec::new();
                    flate2::read::ZlibDecoder::new(bytes.as_slice())
                        .take(self.limit as u64 + 1)
                        .read_to_end(&mut inflated)
                        .map_err(|e| GatewayError::Inflate(e.to_string()))?;
                    if inflated.len() > self.limit {
                        return Err(too_large(self.limit));
                    }
                    into_text(inflated).map(Some)
                } else {
                    into_text(bytes).map(Some)
                }
            }
        }
    }
}

impl std::fmt::Debug for Inflater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inflater")
            .field("mode", &self.mode)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}

fn too_large(limit: usize) -> GatewayError {
    GatewayError::Inflate(format!("message exceeds {limit} bytes"))
}

fn into_text(bytes: Vec<u8>) -> Result<String, GatewayError> {
    String::from_utf8(bytes).map_err(|e| GatewayError::Inflate(e.to_string()))
}

fn inflate_sync(
    context: &mut Decompress,
    input: &[u8],
    limit: usize,
) -> Result<Vec<u8>, GatewayError> {
    let start = context.total_in();
    let mut output = Vec::with_capacity(input.len().saturating_mul(4).max(1024));

    loop {
        if output.len() > limit {
            return Err(too_large(limit));
        }
        if output.len() == output.capacity() {
            output.reserve(output.capacity());
        }
        let consumed = (context.total_in() - start) as usize;
        let produced = context.total_out();

        context
            .decompress_vec(&input[consumed..], &mut output, FlushDecompress::Sync)
            .map_err(|e| GatewayError::Inflate(e.to_string()))?;

        let now_consumed = (context.total_in() - start) as usize;
        if now_consumed >= input.len() && output.len() < output.capacity() {
            break;
        }
        if now_consumed == consumed && context.total_out() == produced {
            return Err(GatewayError::Inflate("inflate made no progress".to_string()));
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    fn compress(text: &str) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_text_passes_through() {
        let mut inflater = Inflater::new(Compression::Stream);
        let out = inflater.push(Frame::Text("{\"op\":11}".into())).unwrap();
        assert_eq!(out.as_deref(), Some("{\"op\":11}"));
    }

    #[test]
    fn test_payload_mode_detects_marker() {
        let mut inflater = Inflater::new(Compression::Payload);
        let packed = compress("{\"op\":10}");
        assert_eq!(packed[0], 0x78);

        let out = inflater.push(Frame::Binary(packed)).unwrap();
        assert_eq!(out.as_deref(), Some("{\"op\":10}"));

        let plain = inflater.push(Frame::Binary(b"{\"op\":1}".to_vec())).unwrap();
        assert_eq!(plain.as_deref(), Some("{\"op\":1}"));
    }

    #[test]
    fn test_stream_mode_buffers_until_suffix() {
        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"{\"op\":10,\"d\":{\"heartbeat_interval\":45}}").unwrap();
        encoder.flush().unwrap();
        let first = encoder.get_ref().clone();
        assert!(first.ends_with(&ZLIB_SUFFIX));

        encoder.write_all(b"{\"op\":11}").unwrap();
        encoder.flush().unwrap();
        let second = encoder.get_ref()[first.len()..].to_vec();

        let mut inflater = Inflater::new(Compression::Stream);
        let (head, tail) = first.split_at(first.len() / 2);
        assert_eq!(inflater.push(Frame::Binary(head.to_vec())).unwrap(), None);
        let out = inflater.push(Frame::Binary(tail.to_vec())).unwrap();
        assert_eq!(
            out.as_deref(),
            Some("{\"op\":10,\"d\":{\"heartbeat_interval\":45}}")
        );

        // The second message depends on the shared window
        let out = inflater.push(Frame::Binary(second)).unwrap();
        assert_eq!(out.as_deref(), Some("{\"op\":11}"));
    }

    #[test]
    fn test_corrupt_payload_is_an_error() {
        let mut inflater = Inflater::new(Compression::Payload);
        let err = inflater.push(Frame::Binary(vec![0x78, 0x00, 0x01])).unwrap_err();
        assert!(matches!(err, GatewayError::Inflate(_)));
    }

    #[test]
    fn test_payload_over_limit_is_rejected() {
        let mut inflater = Inflater::with_limit(Compression::Payload, 64);
        let packed = compress(&"x".repeat(4096));
        assert!(packed.len() < 64);

        let err = inflater.push(Frame::Binary(packed)).unwrap_err();
        assert!(err.to_string().contains("exceeds 64 bytes"));

        let small = inflater.push(Frame::Binary(compress("{}"))).unwrap();
        assert_eq!(small.as_deref(), Some("{}"));
    }

    #[test]
    fn test_stream_buffer_is_bounded() {
        let mut inflater = Inflater::with_limit(Compression::Stream, 16);
        assert_eq!(inflater.push(Frame::Binary(vec![0x78; 10])).unwrap(), None);

        // no sync marker yet and the buffer would pass the limit
        let err = inflater.push(Frame::Binary(vec![0x01; 10])).unwrap_err();
        assert!(matches!(err, GatewayError::Inflate(_)));
        assert!(format!("{inflater:?}").contains("buffered: 0"));
    }

    #[test]
    fn test_stream_output_is_bounded() {
        let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all("y".repeat(100_000).as_bytes()).unwrap();
        encoder.flush().unwrap();
        let packed = encoder.get_ref().clone();
        assert!(packed.len() < 1024);

        let mut inflater = Inflater::with_limit(Compression::Stream, 1024);
        assert!(inflater.push(Frame::Binary(packed)).is_err());
    }

    #[test]
    fn test_query_value() {
        assert_eq!(Compression::Stream.query_value(), Some("zlib-stream"));
        assert_eq!(Compression::Payload.query_value(), None);
    }
}
