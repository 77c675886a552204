//! Byte-stream runtime that generated packet code reads from and writes to.
//!
//! Generated code only sees [`ReadStream`] / [`WriteStream`] trait objects;
//! [`StreamReader`] and [`StreamWriter`] are the stock implementations over
//! `std::io` with a selectable byte order.

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid UTF-8 in string payload: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("Length {0} does not fit in a 32-bit length prefix")]
    LengthOverflow(usize),
    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },
}

/// Convert an in-memory length to its 4-byte wire form.
pub fn wire_len(len: usize) -> Result<u32, StreamError> {
    u32::try_from(len).map_err(|_| StreamError::LengthOverflow(len))
}

pub trait ReadStream {
    fn read_byte(&mut self) -> Result<u8, StreamError>;
    fn read_u16(&mut self) -> Result<u16, StreamError>;
    fn read_u32(&mut self) -> Result<u32, StreamError>;
    fn read_u64(&mut self) -> Result<u64, StreamError>;
    /// Read exactly `len` raw bytes.
    fn read_buf(&mut self, len: usize) -> Result<Vec<u8>, StreamError>;

    /// Fill `buf` with raw bytes.
    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), StreamError> {
        let data = self.read_buf(buf.len())?;
        if data.len() != buf.len() {
            return Err(StreamError::ShortRead {
                expected: buf.len(),
                actual: data.len(),
            });
        }
        buf.copy_from_slice(&data);
        Ok(())
    }
}

pub trait WriteStream {
    fn write_byte(&mut self, v: u8) -> Result<(), StreamError>;
    fn write_u16(&mut self, v: u16) -> Result<(), StreamError>;
    fn write_u32(&mut self, v: u32) -> Result<(), StreamError>;
    fn write_u64(&mut self, v: u64) -> Result<(), StreamError>;
    fn write_buf(&mut self, buf: &[u8]) -> Result<(), StreamError>;
}

/// [`ReadStream`] over any `io::Read`.
#[derive(Debug)]
pub struct StreamReader<R> {
    inner: R,
    endianness: Endianness,
}

impl<R: Read> StreamReader<R> {
    pub fn new(inner: R, endianness: Endianness) -> Self {
        StreamReader { inner, endianness }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ReadStream for StreamReader<R> {
    fn read_byte(&mut self) -> Result<u8, StreamError> {
        Ok(self.inner.read_u8()?)
    }

    fn read_u16(&mut self) -> Result<u16, StreamError> {
        let v = match self.endianness {
            Endianness::Big => self.inner.read_u16::<BigEndian>()?,
            Endianness::Little => self.inner.read_u16::<LittleEndian>()?,
        };
        Ok(v)
    }

    fn read_u32(&mut self) -> Result<u32, StreamError> {
        let v = match self.endianness {
            Endianness::Big => self.inner.read_u32::<BigEndian>()?,
            Endianness::Little => self.inner.read_u32::<LittleEndian>()?,
        };
        Ok(v)
    }

    fn read_u64(&mut self) -> Result<u64, StreamError> {
        let v = match self.endianness {
            Endianness::Big => self.inner.read_u64::<BigEndian>()?,
            Endianness::Little => self.inner.read_u64::<LittleEndian>()?,
        };
        Ok(v)
    }

    // Grows with the data actually present, so a bogus length prefix cannot
    // force a huge allocation up front.
    fn read_buf(&mut self, len: usize) -> Result<Vec<u8>, StreamError> {
        let mut buf = Vec::new();
        let actual = (&mut self.inner).take(len as u64).read_to_end(&mut buf)?;
        if actual != len {
            return Err(StreamError::ShortRead {
                expected: len,
                actual,
            });
        }
        Ok(buf)
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<(), StreamError> {
        Ok(self.inner.read_exact(buf)?)
    }
}

/// [`WriteStream`] over any `io::Write`.
#[derive(Debug)]
pub struct StreamWriter<W> {
    inner: W,
    endianness: Endianness,
}

impl<W: Write> StreamWriter<W> {
    pub fn new(inner: W, endianness: Endianness) -> Self {
        StreamWriter { inner, endianness }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> WriteStream for StreamWriter<W> {
    fn write_byte(&mut self, v: u8) -> Result<(), StreamError> {
        Ok(self.inner.write_u8(v)?)
    }

    fn write_u16(&mut self, v: u16) -> Result<(), StreamError> {
        match self.endianness {
            Endianness::Big => self.inner.write_u16::<BigEndian>(v)?,
            Endianness::Little => self.inner.write_u16::<LittleEndian>(v)?,
        }
        Ok(())
    }

    fn write_u32(&mut self, v: u32) -> Result<(), StreamError> {
        match self.endianness {
            Endianness::Big => self.inner.write_u32::<BigEndian>(v)?,
            Endianness::Little => self.inner.write_u32::<LittleEndian>(v)?,
        }
        Ok(())
    }

    fn write_u64(&mut self, v: u64) -> Result<(), StreamError> {
        match self.endianness {
            Endianness::Big => self.inner.write_u64::<BigEndian>(v)?,
            Endianness::Little => self.inner.write_u64::<LittleEndian>(v)?,
        }
        Ok(())
    }

    fn write_buf(&mut self, buf: &[u8]) -> Result<(), StreamError> {
        Ok(self.inner.write_all(buf)?)
    }
}
