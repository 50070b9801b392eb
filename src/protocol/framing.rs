// src/protocol/framing.rs
use crate::error::Result;
use crate::types::McQueryError;

/// Longest accepted varint encoding of a 32 bit value.
pub const MAX_VARINT_LEN: usize = 5;

/// Upper bound for a single frame payload.
pub const MAX_FRAME_LEN: usize = 2 * 1024 * 1024;

/// Incremental varint decoder, fed one byte at a time.
///
/// Used by both the in-memory payload reader and the socket frame reader so
/// the length limit is enforced in one place.
#[derive(Debug, Default)]
pub struct VarIntDecoder {
    value: u32,
    read: usize,
}

impl VarIntDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `Some(value)` once the final byte has been pushed.
    pub fn push(&mut self, byte: u8) -> Result<Option<i32>> {
        if self.read >= MAX_VARINT_LEN {
            return Err(McQueryError::ProtocolError(format!(
                "varint longer than {} bytes",
                MAX_VARINT_LEN
            )));
        }
        self.value |= ((byte & 0x7F) as u32) << (7 * self.read);
        self.read += 1;

        if byte & 0x80 == 0 {
            return Ok(Some(self.value as i32));
        }
        if self.read == MAX_VARINT_LEN {
            return Err(McQueryError::ProtocolError(format!(
                "varint longer than {} bytes",
                MAX_VARINT_LEN
            )));
        }
        Ok(None)
    }
}

pub fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0x7F == 0 {
            buf.push(value as u8);
            return;
        }
        buf.push((value & 0x7F) as u8 | 0x80);
        value >>= 7;
    }
}

pub fn write_string(buf: &mut Vec<u8>, value: &str) {
    write_varint(buf, value.len() as i32);
    buf.extend_from_slice(value.as_bytes());
}

/// Prefixes `payload` with its varint length.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(payload.len() + MAX_VARINT_LEN);
    write_varint(&mut frame, payload.len() as i32);
    frame.extend_from_slice(payload);
    frame
}

/// Validates a decoded frame length.
pub fn frame_len(length: i32) -> Result<usize> {
    if length < 0 {
        return Err(McQueryError::ProtocolError(format!("invalid packet length: {}", length)));
    }
    let length = length as usize;
    if length > MAX_FRAME_LEN {
        return Err(McQueryError::ProtocolError(format!(
            "packet length {} exceeds limit of {} bytes",
            length, MAX_FRAME_LEN
        )));
    }
    Ok(length)
}

/// Cursor over a received frame payload.
pub struct PayloadReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn read_varint(&mut self) -> Result<i32> {
        let mut decoder = VarIntDecoder::new();
        loop {
            let byte = self.read_byte()?;
            if let Some(value) = decoder.push(byte)? {
                return Ok(value);
            }
        }
    }

    pub fn read_string(&mut self) -> Result<String> {
        let length = self.read_varint()?;
        if length < 0 {
            return Err(McQueryError::ProtocolError(format!("invalid string length: {}", length)));
        }
        let bytes = self.take(length as usize)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| McQueryError::ProtocolError(format!("string is not valid UTF-8: {}", e)))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(raw))
    }

    fn read_byte(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        if self.remaining() < count {
            return Err(McQueryError::ProtocolError(format!(
                "payload too short: need {} bytes at offset {}, have {}",
                count,
                self.pos,
                self.buf.len()
            )));
        }
        let slice = &self.buf[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: i32) -> i32 {
        let mut buf = Vec::new();
        write_varint(&mut buf, value);
        assert!(buf.len() <= MAX_VARINT_LEN);
        PayloadReader::new(&buf).read_varint().unwrap()
    }

    #[test]
    fn test_varint_known_encodings() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 300);
        assert_eq!(buf, vec![0xAC, 0x02]);

        let mut buf = Vec::new();
        write_varint(&mut buf, 754);
        assert_eq!(buf, vec![0xF2, 0x05]);
    }

    #[test]
    fn test_varint_roundtrip_across_range() {
        for value in [0, 1, 127, 128, 255, 25565, 2_097_151, 2_097_152, i32::MAX] {
            assert_eq!(roundtrip(value), value);
        }
        let mut value: i64 = 1;
        while value < i32::MAX as i64 {
            assert_eq!(roundtrip(value as i32), value as i32);
            assert_eq!(roundtrip((value - 1) as i32), (value - 1) as i32);
            value = value * 3 + 1;
        }
    }

    #[test]
    fn test_varint_rejects_overlong_sequence() {
        let bytes = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01];
        let err = PayloadReader::new(&bytes).read_varint().unwrap_err();
        assert!(err.to_string().contains("varint longer than 5 bytes"));
    }

    #[test]
    fn test_varint_truncated_is_error() {
        let bytes = [0x80, 0x80];
        assert!(PayloadReader::new(&bytes).read_varint().is_err());
    }

    #[test]
    fn test_frame_and_string() {
        let mut payload = Vec::new();
        write_varint(&mut payload, 0x00);
        write_string(&mut payload, "hello");
        let frame = encode_frame(&payload);
        assert_eq!(frame[0] as usize, payload.len());

        let mut reader = PayloadReader::new(&frame[1..]);
        assert_eq!(reader.read_varint().unwrap(), 0);
        assert_eq!(reader.read_string().unwrap(), "hello");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_frame_len_limits() {
        assert!(frame_len(-1).is_err());
        assert!(frame_len(MAX_FRAME_LEN as i32 + 1).is_err());
        assert_eq!(frame_len(12).unwrap(), 12);
    }
}
