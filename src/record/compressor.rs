//! Record payload compression (RFC 3749).

use std::fmt;

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use super::Record;
use crate::context::TlsContext;
use crate::types::{CompressionMethod, ProtocolVersion};
use crate::Error;

const CHUNK: usize = 4096;

/// A record payload transform.
pub trait CompressionAlgorithm: fmt::Debug + Send {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, Error>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, Error>;
}

/// Identity transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCompression;

impl CompressionAlgorithm for NullCompression {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(data.to_vec())
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        Ok(data.to_vec())
    }
}

/// zlib stream per record, ended with a sync flush.
#[derive(Debug, Clone, Copy)]
pub struct DeflateCompression {
    level: Compression,
}

impl Default for DeflateCompression {
    fn default() -> Self {
        DeflateCompression {
            level: Compression::default(),
        }
    }
}

impl CompressionAlgorithm for DeflateCompression {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        let mut compressor = Compress::new(self.level, true);
        let mut output = Vec::with_capacity(data.len() + 64);
        let mut buf = vec![0u8; CHUNK];
        let mut input = data;

        // Feed input until consumed
        while !input.is_empty() {
            let before_in = compressor.total_in();
            let before_out = compressor.total_out();
            compressor
                .compress(input, &mut buf, FlushCompress::None)
                .map_err(|e| Error::Compression(e.to_string()))?;
            let consumed = (compressor.total_in() - before_in) as usize;
            let produced = (compressor.total_out() - before_out) as usize;
            output.extend_from_slice(&buf[..produced]);
            input = &input[consumed..];
        }

        // Sync flush until the compressor has no more pending output
        loop {
            let before_out = compressor.total_out();
            compressor
                .compress(&[], &mut buf, FlushCompress::Sync)
                .map_err(|e| Error::Compression(e.to_string()))?;
            let produced = (compressor.total_out() - before_out) as usize;
            output.extend_from_slice(&buf[..produced]);
            if produced < buf.len() {
                break;
            }
        }
        Ok(output)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, Error> {
        let mut decompressor = Decompress::new(true);
        let mut output = Vec::with_capacity(data.len() * 2);
        let mut buf = vec![0u8; CHUNK];
        let mut input = data;

        loop {
            let before_in = decompressor.total_in();
            let before_out = decompressor.total_out();
            let status = decompressor
                .decompress(input, &mut buf, FlushDecompress::Sync)
                .map_err(|e| Error::Compression(e.to_string()))?;
            let consumed = (decompressor.total_in() - before_in) as usize;
            let produced = (decompressor.total_out() - before_out) as usize;
            output.extend_from_slice(&buf[..produced]);
            input = &input[consumed..];

            if status == Status::StreamEnd || (input.is_empty() && produced < buf.len()) {
                break;
            }
            if consumed == 0 && produced == 0 {
                if input.is_empty() {
                    break;
                }
                return Err(Error::Compression("deflate payload makes no progress".into()));
            }
        }
        Ok(output)
    }
}

/// Transform for `method` under `version`.
pub fn algorithm_for(
    version: ProtocolVersion,
    method: CompressionMethod,
) -> Result<Box<dyn CompressionAlgorithm>, Error> {
    if version.is_tls13() {
        return Ok(Box::new(NullCompression));
    }
    match method {
        CompressionMethod::Null => Ok(Box::new(NullCompression)),
        CompressionMethod::Deflate => Ok(Box::new(DeflateCompression::default())),
        other => Err(Error::unsupported(format!(
            "Unsupported compression method: {:?}",
            other
        ))),
    }
}

fn bound_method(ctx: &TlsContext) -> (ProtocolVersion, CompressionMethod) {
    let version = ctx.selected_protocol_version();
    let method = if version.is_tls13() {
        trace!("{} forces null compression", version);
        CompressionMethod::Null
    } else {
        ctx.selected_compression_method()
    };
    (version, method)
}

/// Compresses outgoing records with the negotiated method.
#[derive(Debug)]
pub struct RecordCompressor {
    version: ProtocolVersion,
    method: CompressionMethod,
    algorithm: Box<dyn CompressionAlgorithm>,
}

impl RecordCompressor {
    /// Bind to the selected version and compression method. TLS 1.3 and
    /// DTLS 1.3 always use null compression.
    pub fn new(ctx: &TlsContext) -> Result<Self, Error> {
        let (version, method) = bound_method(ctx);
        Ok(RecordCompressor {
            version,
            method,
            algorithm: algorithm_for(version, method)?,
        })
    }

    pub fn method(&self) -> CompressionMethod {
        self.method
    }

    /// Rebind to another method. Ignored under TLS 1.3.
    pub fn set_method(&mut self, method: CompressionMethod) -> Result<(), Error> {
        if self.version.is_tls13() {
            return Ok(());
        }
        self.algorithm = algorithm_for(self.version, method)?;
        self.method = method;
        Ok(())
    }

    /// Replace the record payload with the compressed clean bytes.
    pub fn compress(&self, record: &mut Record) -> Result<(), Error> {
        record.payload = self.algorithm.compress(&record.clean_bytes)?;
        Ok(())
    }
}

/// Decompresses incoming records with the negotiated method.
#[derive(Debug)]
pub struct RecordDecompressor {
    version: ProtocolVersion,
    method: CompressionMethod,
    algorithm: Box<dyn CompressionAlgorithm>,
}

impl RecordDecompressor {
    pub fn new(ctx: &TlsContext) -> Result<Self, Error> {
        let (version, method) = bound_method(ctx);
        Ok(RecordDecompressor {
            version,
            method,
            algorithm: algorithm_for(version, method)?,
        })
    }

    pub fn method(&self) -> CompressionMethod {
        self.method
    }

    pub fn set_method(&mut self, method: CompressionMethod) -> Result<(), Error> {
        if self.version.is_tls13() {
            return Ok(());
        }
        self.algorithm = algorithm_for(self.version, method)?;
        self.method = method;
        Ok(())
    }

    /// Replace the clean bytes with the decompressed payload.
    pub fn decompress(&self, record: &mut Record) -> Result<(), Error> {
        record.clean_bytes = self.algorithm.decompress(&record.payload)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContentType;
    use crate::Config;

    fn context(version: ProtocolVersion, method: CompressionMethod) -> TlsContext {
        let config = Config::builder()
            .default_selected_protocol_version(version)
            .default_selected_compression_method(method)
            .build()
            .unwrap();
        TlsContext::new(config)
    }

    #[test]
    fn tls13_forces_null() {
        for version in [ProtocolVersion::TLS1_3, ProtocolVersion::DTLS1_3] {
            let ctx = context(version, CompressionMethod::Deflate);
            let compressor = RecordCompressor::new(&ctx).unwrap();
            assert_eq!(compressor.method(), CompressionMethod::Null);

            let mut record = Record::new(ContentType::Handshake, vec![1, 2, 3]);
            compressor.compress(&mut record).unwrap();
            assert_eq!(record.payload, [1, 2, 3]);
        }
    }

    #[test]
    fn deflate_roundtrip() {
        let ctx = context(ProtocolVersion::TLS1_2, CompressionMethod::Deflate);
        let compressor = RecordCompressor::new(&ctx).unwrap();
        let decompressor = RecordDecompressor::new(&ctx).unwrap();

        let clean: Vec<u8> = b"abcabcabcabcabcabcabcabc".repeat(100);
        let mut record = Record::new(ContentType::ApplicationData, clean.clone());
        compressor.compress(&mut record).unwrap();
        assert!(record.payload.len() < clean.len());

        record.clean_bytes.clear();
        decompressor.decompress(&mut record).unwrap();
        assert_eq!(record.clean_bytes, clean);
    }

    #[test]
    fn unknown_method_is_unsupported() {
        let ctx = context(ProtocolVersion::TLS1_2, CompressionMethod::Lzs);
        assert!(matches!(
            RecordCompressor::new(&ctx),
            Err(Error::UnsupportedConfiguration(_))
        ));
    }
}
