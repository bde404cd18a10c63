//! 不可信输入的读取游标
//!
//! 所有对信封字节的偏移访问都经过这里，越界一律返回
//! `MalformedEnvelope`，不会 panic，也不会静默截断。

use crate::error::EnvelopeError;

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// 从指定偏移开始读取；偏移超出范围时后续读取全部失败
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        Self { buf, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], EnvelopeError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.buf.len())
            .ok_or(EnvelopeError::MalformedEnvelope("unexpected end of data"))?;

        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], EnvelopeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u32_le(&mut self) -> Result<u32, EnvelopeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// 取走剩余全部字节
    pub fn rest(&mut self) -> &'a [u8] {
        let start = self.pos.min(self.buf.len());
        self.pos = self.buf.len();
        &self.buf[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_advance_position() {
        let data = [1u8, 0, 0, 0, 0xAA, 0xBB, 0xCC];
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(cursor.read_u32_le().unwrap(), 1);
        assert_eq!(cursor.read_array::<2>().unwrap(), [0xAA, 0xBB]);
        assert_eq!(cursor.position(), 6);
        assert_eq!(cursor.rest(), &[0xCC]);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn out_of_bounds_read_is_rejected_without_moving() {
        let data = [0u8; 3];
        let mut cursor = ByteCursor::new(&data);

        assert!(matches!(
            cursor.read_u32_le(),
            Err(EnvelopeError::MalformedEnvelope(_))
        ));
        assert_eq!(cursor.position(), 0);
        assert!(cursor.read_bytes(usize::MAX).is_err());
    }

    #[test]
    fn offset_past_end_fails_every_read() {
        let data = [0u8; 4];
        let mut cursor = ByteCursor::at(&data, 10);

        assert_eq!(cursor.remaining(), 0);
        assert!(cursor.read_bytes(0).is_err());
        assert!(cursor.rest().is_empty());
    }
}
