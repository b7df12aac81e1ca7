//! Pluggable externalization of checksums and deltas.
//!
//! Serialization to a persistent or on-wire form is performed by
//! replaceable encoder/decoder components: the caller constructs a
//! concrete implementation with a [`Configuration`] and a sink or source
//! and passes it where needed; there is no registry. The core only
//! requires that encode/decode round-trips preserve every field of
//! [`BlockChecksum`] and [`Delta`] exactly.
//!
//! [`PlainChecksumEncoder`] and [`PlainDeltaEncoder`] implement a simple
//! little-endian, length-prefixed binary form with a magic/version header.

use std::io::{self, Read, Write};

use crate::config::Configuration;
use crate::delta::Delta;
use crate::error::{Result, SyncError};
use crate::sums::{BlockChecksum, ChecksumPair};

/// Magic bytes opening a plain checksum stream.
pub const CHECKSUM_MAGIC: [u8; 4] = *b"RSCS";

/// Magic bytes opening a plain delta stream.
pub const DELTA_MAGIC: [u8; 4] = *b"RSDT";

/// Version byte of the plain encodings.
pub const PLAIN_VERSION: u8 = 1;

const TAG_END: u8 = 0x00;
const TAG_CHECKSUM: u8 = 0x01;
const TAG_LITERAL: u8 = 0x01;
const TAG_COPY: u8 = 0x02;

/// Encodes [`BlockChecksum`]s to an external representation.
pub trait ChecksumEncoder {
    /// Encode a single checksum.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures.
    fn write(&mut self, sum: &BlockChecksum) -> Result<()>;

    /// Encode a list of checksums. Does not call [`finish`](Self::finish).
    ///
    /// # Errors
    ///
    /// Propagates I/O failures.
    fn write_all(&mut self, sums: &[BlockChecksum]) -> Result<()> {
        for sum in sums {
            self.write(sum)?;
        }
        Ok(())
    }

    /// Emit the end-of-checksums marker.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures.
    fn finish(&mut self) -> Result<()>;

    /// Whether checksums must be presented in ascending offset order.
    fn requires_order(&self) -> bool;
}

/// Decodes [`BlockChecksum`]s from an external representation.
pub trait ChecksumDecoder {
    /// Decode the next checksum, or `None` at the end-of-checksums marker.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures and malformed input.
    fn read(&mut self) -> Result<Option<BlockChecksum>>;

    /// Decode all remaining checksums into `sums`, returning the count.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures and malformed input.
    fn read_to_end(&mut self, sums: &mut Vec<BlockChecksum>) -> Result<usize> {
        let mut count = 0;
        while let Some(sum) = self.read()? {
            sums.push(sum);
            count += 1;
        }
        Ok(count)
    }
}

/// Encodes [`Delta`]s to an external representation.
pub trait DeltaEncoder {
    /// Encode a single delta.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures.
    fn write(&mut self, delta: &Delta) -> Result<()>;

    /// Encode a list of deltas. Does not call [`finish`](Self::finish).
    ///
    /// # Errors
    ///
    /// Propagates I/O failures.
    fn write_all(&mut self, deltas: &[Delta]) -> Result<()> {
        for delta in deltas {
            self.write(delta)?;
        }
        Ok(())
    }

    /// Emit the end-of-deltas marker.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures.
    fn finish(&mut self) -> Result<()>;

    /// Whether deltas must be presented in ascending write-offset order.
    fn requires_order(&self) -> bool;
}

/// Decodes [`Delta`]s from an external representation.
pub trait DeltaDecoder {
    /// Decode the next delta, or `None` at the end-of-deltas marker.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures and malformed input.
    fn read(&mut self) -> Result<Option<Delta>>;

    /// Decode all remaining deltas into `deltas`, returning the count.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures and malformed input.
    fn read_to_end(&mut self, deltas: &mut Vec<Delta>) -> Result<usize> {
        let mut count = 0;
        while let Some(delta) = self.read()? {
            deltas.push(delta);
            count += 1;
        }
        Ok(count)
    }
}

/// Plain binary checksum encoder.
///
/// Layout: `"RSCS"` + version byte, then per record a `0x01` tag, the weak
/// sum (u32 LE), the strong sum (exactly `strong_sum_length` bytes), the
/// offset (u64 LE), length (u32 LE), and sequence number (u32 LE). A
/// `0x00` tag ends the stream.
pub struct PlainChecksumEncoder<W: Write> {
    config: Configuration,
    out: W,
}

impl<W: Write> PlainChecksumEncoder<W> {
    /// Create an encoder, writing the stream header immediately.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures.
    pub fn new(config: Configuration, mut out: W) -> Result<Self> {
        out.write_all(&CHECKSUM_MAGIC)?;
        out.write_all(&[PLAIN_VERSION])?;
        Ok(Self { config, out })
    }

    /// Consume the encoder, returning the sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ChecksumEncoder for PlainChecksumEncoder<W> {
    fn write(&mut self, sum: &BlockChecksum) -> Result<()> {
        if sum.pair.strong.len() != self.config.strong_sum_length() {
            return Err(bad_data(format!(
                "strong sum length {} does not match configured {}",
                sum.pair.strong.len(),
                self.config.strong_sum_length()
            )));
        }
        self.out.write_all(&[TAG_CHECKSUM])?;
        self.out.write_all(&sum.pair.weak.to_le_bytes())?;
        self.out.write_all(&sum.pair.strong)?;
        self.out.write_all(&sum.offset.to_le_bytes())?;
        self.out.write_all(&sum.length.to_le_bytes())?;
        self.out.write_all(&sum.seq.to_le_bytes())?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.write_all(&[TAG_END])?;
        self.out.flush()?;
        Ok(())
    }

    fn requires_order(&self) -> bool {
        false
    }
}

/// Plain binary checksum decoder; the counterpart of
/// [`PlainChecksumEncoder`].
#[derive(Debug)]
pub struct PlainChecksumDecoder<R: Read> {
    config: Configuration,
    input: R,
    done: bool,
}

impl<R: Read> PlainChecksumDecoder<R> {
    /// Create a decoder, validating the stream header immediately.
    ///
    /// # Errors
    ///
    /// Fails on a bad magic or unsupported version.
    pub fn new(config: Configuration, mut input: R) -> Result<Self> {
        expect_header(&mut input, &CHECKSUM_MAGIC)?;
        Ok(Self {
            config,
            input,
            done: false,
        })
    }
}

impl<R: Read> ChecksumDecoder for PlainChecksumDecoder<R> {
    fn read(&mut self) -> Result<Option<BlockChecksum>> {
        if self.done {
            return Ok(None);
        }
        match read_u8(&mut self.input)? {
            TAG_END => {
                self.done = true;
                Ok(None)
            }
            TAG_CHECKSUM => {
                let weak = read_u32_le(&mut self.input)?;
                let mut strong = vec![0u8; self.config.strong_sum_length()];
                self.input.read_exact(&mut strong)?;
                let offset = read_u64_le(&mut self.input)?;
                let length = read_u32_le(&mut self.input)?;
                let seq = read_u32_le(&mut self.input)?;
                Ok(Some(BlockChecksum::new(
                    ChecksumPair::new(weak, strong),
                    offset,
                    length,
                    seq,
                )))
            }
            tag => Err(bad_data(format!("unknown checksum record tag {tag:#04x}"))),
        }
    }
}

/// Plain binary delta encoder.
///
/// Layout: `"RSDT"` + version byte, then per record either a `0x01` tag
/// with write offset (u64 LE), length (u32 LE), and the literal bytes, or
/// a `0x02` tag with old offset (u64 LE), new offset (u64 LE), and length
/// (u32 LE). A `0x00` tag ends the stream. Offsets are carried explicitly,
/// so the encoder accepts deltas in any order.
pub struct PlainDeltaEncoder<W: Write> {
    out: W,
}

impl<W: Write> PlainDeltaEncoder<W> {
    /// Create an encoder, writing the stream header immediately.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures.
    pub fn new(_config: Configuration, mut out: W) -> Result<Self> {
        out.write_all(&DELTA_MAGIC)?;
        out.write_all(&[PLAIN_VERSION])?;
        Ok(Self { out })
    }

    /// Consume the encoder, returning the sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> DeltaEncoder for PlainDeltaEncoder<W> {
    fn write(&mut self, delta: &Delta) -> Result<()> {
        match delta {
            Delta::Literal { data, write_offset } => {
                self.out.write_all(&[TAG_LITERAL])?;
                self.out.write_all(&write_offset.to_le_bytes())?;
                self.out.write_all(&(data.len() as u32).to_le_bytes())?;
                self.out.write_all(data)?;
            }
            Delta::Copy {
                old_offset,
                new_offset,
                length,
            } => {
                self.out.write_all(&[TAG_COPY])?;
                self.out.write_all(&old_offset.to_le_bytes())?;
                self.out.write_all(&new_offset.to_le_bytes())?;
                self.out.write_all(&length.to_le_bytes())?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.write_all(&[TAG_END])?;
        self.out.flush()?;
        Ok(())
    }

    fn requires_order(&self) -> bool {
        false
    }
}

/// Plain binary delta decoder; the counterpart of [`PlainDeltaEncoder`].
#[derive(Debug)]
pub struct PlainDeltaDecoder<R: Read> {
    input: R,
    done: bool,
}

impl<R: Read> PlainDeltaDecoder<R> {
    /// Create a decoder, validating the stream header immediately.
    ///
    /// # Errors
    ///
    /// Fails on a bad magic or unsupported version.
    pub fn new(_config: Configuration, mut input: R) -> Result<Self> {
        expect_header(&mut input, &DELTA_MAGIC)?;
        Ok(Self { input, done: false })
    }
}

impl<R: Read> DeltaDecoder for PlainDeltaDecoder<R> {
    fn read(&mut self) -> Result<Option<Delta>> {
        if self.done {
            return Ok(None);
        }
        match read_u8(&mut self.input)? {
            TAG_END => {
                self.done = true;
                Ok(None)
            }
            TAG_LITERAL => {
                let write_offset = read_u64_le(&mut self.input)?;
                let len = read_u32_le(&mut self.input)? as usize;
                let mut data = vec![0u8; len];
                self.input.read_exact(&mut data)?;
                Ok(Some(Delta::literal(write_offset, data)))
            }
            TAG_COPY => {
                let old_offset = read_u64_le(&mut self.input)?;
                let new_offset = read_u64_le(&mut self.input)?;
                let length = read_u32_le(&mut self.input)?;
                Ok(Some(Delta::copy(old_offset, new_offset, length)))
            }
            tag => Err(bad_data(format!("unknown delta record tag {tag:#04x}"))),
        }
    }
}

fn expect_header<R: Read>(input: &mut R, magic: &[u8; 4]) -> Result<()> {
    let mut header = [0u8; 5];
    input.read_exact(&mut header)?;
    if &header[..4] != magic {
        return Err(bad_data(format!(
            "bad magic {:02x?}, expected {:02x?}",
            &header[..4],
            magic
        )));
    }
    if header[4] != PLAIN_VERSION {
        return Err(bad_data(format!(
            "unsupported version {}, expected {PLAIN_VERSION}",
            header[4]
        )));
    }
    Ok(())
}

fn bad_data(message: String) -> SyncError {
    SyncError::Io(io::Error::new(io::ErrorKind::InvalidData, message))
}

fn read_u8<R: Read>(input: &mut R) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    input.read_exact(&mut buf)?;
    Ok(buf[0])
}

fn read_u32_le<R: Read>(input: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    input.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64_le<R: Read>(input: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    input.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
