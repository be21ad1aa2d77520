//! Little-endian packet buffers.
//!
//! Every packet starts with a u16 opcode. Strings are a u16 length
//! followed by the bytes.
use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::world::geometry::Point;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    #[error("packet truncated at offset {offset}: needed {needed} bytes, {remaining} left")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },
    #[error("unknown opcode 0x{0:04X}")]
    UnknownOpcode(u16),
    #[error("invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: i64 },
}

/// Chained writer, consumed by `build`.
#[derive(Debug, Clone)]
pub struct PacketBuilder {
    buf: BytesMut,
}

impl PacketBuilder {
    pub fn new(opcode: u16) -> Self {
        let mut buf = BytesMut::with_capacity(32);
        buf.put_u16_le(opcode);
        PacketBuilder { buf }
    }

    pub fn write_c(mut self, value: i32) -> Self {
        self.buf.put_u8(value as u8);
        self
    }

    pub fn write_bool(self, value: bool) -> Self {
        self.write_c(i32::from(value))
    }

    pub fn write_h(mut self, value: i32) -> Self {
        self.buf.put_i16_le(value as i16);
        self
    }

    pub fn write_d(mut self, value: i32) -> Self {
        self.buf.put_i32_le(value);
        self
    }

    pub fn write_point(self, p: Point) -> Self {
        self.write_h(i32::from(p.x)).write_h(i32::from(p.y))
    }

    pub fn write_s(mut self, text: Option<&str>) -> Self {
        let bytes = text.unwrap_or("").as_bytes();
        let len = bytes.len().min(usize::from(u16::MAX));
        self.buf.put_u16_le(len as u16);
        self.buf.put_slice(&bytes[..len]);
        self
    }

    pub fn skip(mut self, count: usize) -> Self {
        self.buf.put_bytes(0, count);
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn build(self) -> Bytes {
        self.buf.freeze()
    }
}

/// Bounds-checked reader.
#[derive(Debug, Clone)]
pub struct PacketReader {
    buf: Bytes,
    offset: usize,
}

impl PacketReader {
    pub fn new(data: impl Into<Bytes>) -> Self {
        PacketReader {
            buf: data.into(),
            offset: 0,
        }
    }

    fn need(&self, needed: usize) -> Result<(), PacketError> {
        if self.buf.remaining() < needed {
            return Err(PacketError::Truncated {
                offset: self.offset,
                needed,
                remaining: self.buf.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_c(&mut self) -> Result<u8, PacketError> {
        self.need(1)?;
        self.offset += 1;
        Ok(self.buf.get_u8())
    }

    pub fn read_byte(&mut self) -> Result<i8, PacketError> {
        self.read_c().map(|b| b as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool, PacketError> {
        self.read_c().map(|b| b != 0)
    }

    pub fn read_h(&mut self) -> Result<i16, PacketError> {
        self.need(2)?;
        self.offset += 2;
        Ok(self.buf.get_i16_le())
    }

    pub fn read_uh(&mut self) -> Result<u16, PacketError> {
        self.need(2)?;
        self.offset += 2;
        Ok(self.buf.get_u16_le())
    }

    pub fn read_d(&mut self) -> Result<i32, PacketError> {
        self.need(4)?;
        self.offset += 4;
        Ok(self.buf.get_i32_le())
    }

    pub fn read_point(&mut self) -> Result<Point, PacketError> {
        let x = self.read_h()?;
        let y = self.read_h()?;
        Ok(Point::new(x, y))
    }

    pub fn read_s(&mut self) -> Result<String, PacketError> {
        let len = usize::from(self.read_uh()?);
        self.need(len)?;
        self.offset += len;
        let raw = self.buf.split_to(len);
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    pub fn skip(&mut self, count: usize) -> Result<(), PacketError> {
        self.need(count)?;
        self.offset += count;
        self.buf.advance(count);
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_layout() {
        let pkt = PacketBuilder::new(0x2C)
            .write_c(7)
            .write_h(-2)
            .write_d(0x01020304)
            .write_s(Some("ok"))
            .build();
        assert_eq!(
            &pkt[..],
            &[0x2C, 0x00, 7, 0xFE, 0xFF, 0x04, 0x03, 0x02, 0x01, 2, 0, b'o', b'k']
        );
    }

    #[test]
    fn test_reader_reads_back_fields() {
        let pkt = PacketBuilder::new(0xFA)
            .write_d(1001)
            .write_point(Point::new(-40, 120))
            .write_s(None)
            .build();
        let mut r = PacketReader::new(pkt);
        assert_eq!(r.read_uh(), Ok(0xFA));
        assert_eq!(r.read_d(), Ok(1001));
        assert_eq!(r.read_point(), Ok(Point::new(-40, 120)));
        assert_eq!(r.read_s(), Ok(String::new()));
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_truncated_read_reports_offset() {
        let mut r = PacketReader::new(vec![1u8, 2, 3]);
        assert_eq!(r.read_h(), Ok(0x0201));
        assert_eq!(
            r.read_d(),
            Err(PacketError::Truncated { offset: 2, needed: 4, remaining: 1 })
        );
    }
}
