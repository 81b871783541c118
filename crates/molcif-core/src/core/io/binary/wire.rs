//! Byte layout of an encoded file.
//!
//! ```text
//! magic: [u8; 4] = "BCIF"
//! version: u8
//! encoder: string
//! blocks: varint count, then per block
//!   header: string
//!   categories: varint count, then per category
//!     name: string
//!     row_count: varint
//!     columns: varint count, then per column
//!       name: string
//!       data: chain + bytes
//!       has_mask: u8, then chain + bytes when set
//!
//! string / bytes: varint length + raw bytes
//! chain: varint count, then per encoding a u8 tag and its parameters
//! ```
//!
//! Unsigned integers are LEB128 varints; signed ones are zigzag encoded first.

use super::column::EncodedColumn;
use super::encoding::{DataType, EncodedData, Encoding};
use super::error::DecodeError;

pub const MAGIC: [u8; 4] = *b"BCIF";
pub const VERSION: u8 = 1;

const MAX_VARINT_BYTES: usize = 10;
const MAX_CHAIN_DEPTH: usize = 2;

const TAG_BYTE_ARRAY: u8 = 0;
const TAG_FIXED_POINT: u8 = 1;
const TAG_RUN_LENGTH: u8 = 2;
const TAG_DELTA: u8 = 3;
const TAG_INTEGER_PACKING: u8 = 4;
const TAG_STRING_ARRAY: u8 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedCategory {
    pub name: String,
    pub row_count: usize,
    pub columns: Vec<EncodedColumn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedBlock {
    pub header: String,
    pub categories: Vec<EncodedCategory>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFile {
    pub encoder: String,
    pub blocks: Vec<EncodedBlock>,
}

/// Whether `bytes` starts like an encoded file.
pub fn has_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(&MAGIC)
}

pub fn write_file(file: &EncodedFile) -> Vec<u8> {
    let mut out = WireWriter::default();
    out.buf.extend_from_slice(&MAGIC);
    out.u8(VERSION);
    out.str(&file.encoder);
    out.varint(file.blocks.len() as u64);
    for block in &file.blocks {
        out.str(&block.header);
        out.varint(block.categories.len() as u64);
        for category in &block.categories {
            out.str(&category.name);
            out.varint(category.row_count as u64);
            out.varint(category.columns.len() as u64);
            for column in &category.columns {
                out.str(&column.name);
                out.encoded(&column.data);
                match &column.mask {
                    Some(mask) => {
                        out.u8(1);
                        out.encoded(mask);
                    }
                    None => out.u8(0),
                }
            }
        }
    }
    out.buf
}

pub fn read_file(bytes: &[u8]) -> Result<EncodedFile, DecodeError> {
    if !has_magic(bytes) {
        return Err(DecodeError::InvalidMagic);
    }
    let mut input = WireReader {
        data: bytes,
        pos: MAGIC.len(),
    };
    let version = input.u8()?;
    if version != VERSION {
        return Err(DecodeError::UnsupportedVersion(version));
    }
    let encoder = input.str()?.to_string();

    let block_count = input.count()?;
    let mut blocks = Vec::with_capacity(block_count);
    for _ in 0..block_count {
        let header = input.str()?.to_string();
        let category_count = input.count()?;
        let mut categories = Vec::with_capacity(category_count);
        for _ in 0..category_count {
            let name = input.str()?.to_string();
            let row_count = input.varint()? as usize;
            let column_count = input.count()?;
            let mut columns = Vec::with_capacity(column_count);
            for _ in 0..column_count {
                let name = input.str()?.to_string();
                let data = input.encoded(0)?;
                let mask = match input.u8()? {
                    0 => None,
                    _ => Some(input.encoded(0)?),
                };
                columns.push(EncodedColumn { name, data, mask });
            }
            categories.push(EncodedCategory {
                name,
                row_count,
                columns,
            });
        }
        blocks.push(EncodedBlock { header, categories });
    }
    Ok(EncodedFile { encoder, blocks })
}

#[derive(Default)]
struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                self.buf.push(byte);
                break;
            }
            self.buf.push(byte | 0x80);
        }
    }

    fn signed(&mut self, value: i64) {
        self.varint(((value << 1) ^ (value >> 63)) as u64);
    }

    fn bytes(&mut self, bytes: &[u8]) {
        self.varint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    fn str(&mut self, value: &str) {
        self.bytes(value.as_bytes());
    }

    fn chain(&mut self, chain: &[Encoding]) {
        self.varint(chain.len() as u64);
        for encoding in chain {
            self.encoding(encoding);
        }
    }

    fn encoding(&mut self, encoding: &Encoding) {
        match encoding {
            Encoding::ByteArray { data_type } => {
                self.u8(TAG_BYTE_ARRAY);
                self.u8(data_type.code());
            }
            Encoding::FixedPoint { factor, src_type } => {
                self.u8(TAG_FIXED_POINT);
                self.buf.extend_from_slice(&factor.to_le_bytes());
                self.u8(src_type.code());
            }
            Encoding::RunLength { src_type, src_size } => {
                self.u8(TAG_RUN_LENGTH);
                self.u8(src_type.code());
                self.varint(*src_size as u64);
            }
            Encoding::Delta { origin, src_type } => {
                self.u8(TAG_DELTA);
                self.signed(i64::from(*origin));
                self.u8(src_type.code());
            }
            Encoding::IntegerPacking {
                byte_count,
                is_unsigned,
                src_size,
            } => {
                self.u8(TAG_INTEGER_PACKING);
                self.u8(*byte_count);
                self.u8(u8::from(*is_unsigned));
                self.varint(*src_size as u64);
            }
            Encoding::StringArray {
                data_encoding,
                string_data,
                offset_encoding,
                offsets,
            } => {
                self.u8(TAG_STRING_ARRAY);
                self.chain(data_encoding);
                self.str(string_data);
                self.chain(offset_encoding);
                self.bytes(offsets);
            }
        }
    }

    fn encoded(&mut self, encoded: &EncodedData) {
        self.chain(&encoded.encoding);
        self.bytes(&encoded.data);
    }
}

struct WireReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::UnexpectedEof);
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn varint(&mut self) -> Result<u64, DecodeError> {
        let mut result = 0u64;
        for i in 0..MAX_VARINT_BYTES {
            let byte = self.u8()?;
            result |= u64::from(byte & 0x7F) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(DecodeError::MalformedVarint)
    }

    /// An element count, bounded by the bytes left so that corrupt input
    /// cannot request huge allocations.
    fn count(&mut self) -> Result<usize, DecodeError> {
        let count = self.varint()? as usize;
        if count > self.remaining() {
            return Err(DecodeError::UnexpectedEof);
        }
        Ok(count)
    }

    fn signed(&mut self) -> Result<i64, DecodeError> {
        let raw = self.varint()?;
        Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
    }

    fn bytes(&mut self) -> Result<&'a [u8], DecodeError> {
        let len = self.varint()? as usize;
        self.take(len)
    }

    fn str(&mut self) -> Result<&'a str, DecodeError> {
        std::str::from_utf8(self.bytes()?).map_err(|_| DecodeError::InvalidUtf8)
    }

    fn data_type(&mut self) -> Result<DataType, DecodeError> {
        DataType::from_code(self.u8()?)
    }

    fn chain(&mut self, depth: usize) -> Result<Vec<Encoding>, DecodeError> {
        let count = self.count()?;
        (0..count).map(|_| self.encoding(depth)).collect()
    }

    fn encoding(&mut self, depth: usize) -> Result<Encoding, DecodeError> {
        let tag = self.u8()?;
        Ok(match tag {
            TAG_BYTE_ARRAY => Encoding::ByteArray {
                data_type: self.data_type()?,
            },
            TAG_FIXED_POINT => {
                let raw = self.take(8)?;
                let mut factor = [0u8; 8];
                factor.copy_from_slice(raw);
                Encoding::FixedPoint {
                    factor: f64::from_le_bytes(factor),
                    src_type: self.data_type()?,
                }
            }
            TAG_RUN_LENGTH => Encoding::RunLength {
                src_type: self.data_type()?,
                src_size: self.varint()? as usize,
            },
            TAG_DELTA => Encoding::Delta {
                origin: self.signed()? as i32,
                src_type: self.data_type()?,
            },
            TAG_INTEGER_PACKING => Encoding::IntegerPacking {
                byte_count: self.u8()?,
                is_unsigned: self.u8()? != 0,
                src_size: self.varint()? as usize,
            },
            TAG_STRING_ARRAY if depth < MAX_CHAIN_DEPTH => Encoding::StringArray {
                data_encoding: self.chain(depth + 1)?,
                string_data: self.str()?.to_string(),
                offset_encoding: self.chain(depth + 1)?,
                offsets: self.bytes()?.to_vec(),
            },
            _ => return Err(DecodeError::UnknownEncoding(tag)),
        })
    }

    fn encoded(&mut self, depth: usize) -> Result<EncodedData, DecodeError> {
        Ok(EncodedData {
            encoding: self.chain(depth)?,
            data: self.bytes()?.to_vec(),
        })
    }
}
