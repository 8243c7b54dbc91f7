//! Primitive big-endian packers/unpackers over a positioned byte stream.
//!
//! This is the lowest layer of the crate: everything above it (the
//! constant taxonomy, the class-file skeleton) is built out of these
//! primitives and never touches a `Read`/`Write` directly.

use std::io::{self, Read, Write};

use crate::error::{ClassFileError, Result};
use crate::mutf8;

/// A cursor over a reader that tracks how many bytes have been consumed.
pub struct Reader<'a, R: Read> {
    inner: &'a mut R,
    position: usize,
}

impl<'a, R: Read> Reader<'a, R> {
    pub fn new(inner: &'a mut R) -> Self {
        Self { inner, position: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf).map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => ClassFileError::Truncated,
            _ => ClassFileError::Io(e),
        })?;
        self.position += buf.len();
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let mut b = [0u8; 2];
        self.read_exact(&mut b)?;
        Ok(u16::from_be_bytes(b))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(u32::from_be_bytes(b))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let mut b = [0u8; 8];
        self.read_exact(&mut b)?;
        Ok(i64::from_be_bytes(b))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_i64()? as u64))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a `u16`-length-prefixed MUTF-8 string.
    pub fn read_mutf8(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?;
        Ok(mutf8::decode(&bytes))
    }
}

/// A thin wrapper over a writer, symmetric with [`Reader`].
pub struct Writer<'a, W: Write> {
    inner: &'a mut W,
}

impl<'a, W: Write> Writer<'a, W> {
    pub fn new(inner: &'a mut W) -> Self {
        Self { inner }
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.inner.write_all(&[v]).map_err(ClassFileError::Io)
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.inner.write_all(&v.to_be_bytes()).map_err(ClassFileError::Io)
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.inner.write_all(&v.to_be_bytes()).map_err(ClassFileError::Io)
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_u32(v as u32)
    }

    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        self.inner.write_all(&v.to_be_bytes()).map_err(ClassFileError::Io)
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.write_u32(v.to_bits())
    }

    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        self.write_i64(v.to_bits() as i64)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes).map_err(ClassFileError::Io)
    }

    /// Write a `u16`-length-prefixed MUTF-8 string.
    pub fn write_mutf8(&mut self, s: &str) -> Result<()> {
        let bytes = mutf8::encode(s);
        self.write_u16(bytes.len() as u16)?;
        self.write_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_primitives() {
        let mut buf = Vec::new();
        {
            let mut w = Writer::new(&mut buf);
            w.write_u8(0xAB).unwrap();
            w.write_u16(0x1234).unwrap();
            w.write_u32(0xDEAD_BEEF).unwrap();
            w.write_i32(-1).unwrap();
            w.write_i64(-2).unwrap();
            w.write_f32(1.5).unwrap();
            w.write_f64(2.5).unwrap();
        }
        let mut cursor = Cursor::new(buf);
        let mut r = Reader::new(&mut cursor);
        assert_eq!(r.read_u8().unwrap(), 0xAB);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0xDEAD_BEEF);
        assert_eq!(r.read_i32().unwrap(), -1);
        assert_eq!(r.read_i64().unwrap(), -2);
        assert_eq!(r.read_f32().unwrap(), 1.5);
        assert_eq!(r.read_f64().unwrap(), 2.5);
    }

    #[test]
    fn truncated_read_is_reported() {
        let mut cursor = Cursor::new(vec![0u8; 1]);
        let mut r = Reader::new(&mut cursor);
        assert!(matches!(r.read_u32(), Err(ClassFileError::Truncated)));
    }
}
