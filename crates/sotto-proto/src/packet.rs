//! Sequential codec for the voice byte stream.
//!
//! Voice datagrams are self-describing and must be tolerated when truncated,
//! so this codec never aborts: reads past the end yield zero and mark the
//! stream invalid, writes that would overflow are refused and mark the
//! stream invalid. Callers consult [`PacketReader::left`] /
//! [`PacketReader::ok`] instead of handling errors.

/// Reader over a fixed byte buffer.
#[derive(Debug)]
pub struct PacketReader<'a> {
    buf: &'a [u8],
    pos: usize,
    ok: bool,
}

impl<'a> PacketReader<'a> {
    /// Wrap a buffer for sequential reads.
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0, ok: true }
    }

    /// Bytes remaining.
    #[must_use]
    pub fn left(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// False once any read ran past the end.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.ok
    }

    /// Read one byte; zero past the end.
    pub fn read_u8(&mut self) -> u8 {
        match self.buf.get(self.pos) {
            Some(&b) => {
                self.pos += 1;
                b
            }
            None => {
                self.ok = false;
                0
            }
        }
    }

    /// Read `n` bytes into a fresh vector; empty past the end.
    pub fn read_bytes(&mut self, n: usize) -> Vec<u8> {
        if self.left() < n {
            self.ok = false;
            return Vec::new();
        }
        let out = self.buf[self.pos..self.pos + n].to_vec();
        self.pos += n;
        out
    }

    /// Read a big-endian `u64`.
    pub fn read_u64(&mut self) -> u64 {
        if self.left() < 8 {
            self.ok = false;
            return 0;
        }
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.buf[self.pos..self.pos + 8]);
        self.pos += 8;
        u64::from_be_bytes(raw)
    }

    /// Read a little-endian `f32`.
    pub fn read_f32(&mut self) -> f32 {
        if self.left() < 4 {
            self.ok = false;
            return 0.0;
        }
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.buf[self.pos..self.pos + 4]);
        self.pos += 4;
        f32::from_le_bytes(raw)
    }

    /// Read a Mumble variable-length integer.
    ///
    /// Handles all prefix forms: 7/14/21/28-bit inline values, the 32-bit
    /// (`0xF0`) and 64-bit (`0xF4`) extensions, the recursive negation
    /// marker (`0xF8`) and the inverted 2-bit form (`0xFC`). Negative
    /// results are returned in two's complement.
    pub fn read_varint(&mut self) -> u64 {
        let b = u64::from(self.read_u8());

        if b & 0x80 == 0 {
            b
        } else if b & 0xC0 == 0x80 {
            (b & 0x3F) << 8 | u64::from(self.read_u8())
        } else if b & 0xE0 == 0xC0 {
            (b & 0x1F) << 16 | u64::from(self.read_u8()) << 8 | u64::from(self.read_u8())
        } else if b & 0xF0 == 0xE0 {
            (b & 0x0F) << 24
                | u64::from(self.read_u8()) << 16
                | u64::from(self.read_u8()) << 8
                | u64::from(self.read_u8())
        } else if b & 0xFC == 0xF0 {
            u64::from(self.read_u8()) << 24
                | u64::from(self.read_u8()) << 16
                | u64::from(self.read_u8()) << 8
                | u64::from(self.read_u8())
        } else if b & 0xFC == 0xF4 {
            self.read_u64()
        } else if b & 0xFC == 0xF8 {
            !self.read_varint()
        } else {
            // 0xFC: byte-inverted 2-bit value.
            !(b & 0x03)
        }
    }
}

/// Writer over a fixed byte buffer.
#[derive(Debug)]
pub struct PacketWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
    ok: bool,
}

impl<'a> PacketWriter<'a> {
    /// Wrap a buffer for sequential writes.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0, ok: true }
    }

    /// Bytes written so far.
    #[must_use]
    pub fn size(&self) -> usize {
        self.pos
    }

    /// False once any write overflowed; no partial data was written.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.ok
    }

    fn put(&mut self, bytes: &[u8]) {
        if !self.ok || self.buf.len() - self.pos < bytes.len() {
            self.ok = false;
            return;
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
    }

    /// Write one byte.
    pub fn write_u8(&mut self, v: u8) {
        self.put(&[v]);
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.put(bytes);
    }

    /// Write a big-endian `u64`.
    pub fn write_u64(&mut self, v: u64) {
        self.put(&v.to_be_bytes());
    }

    /// Write a little-endian `f32`.
    pub fn write_f32(&mut self, v: f32) {
        self.put(&v.to_le_bytes());
    }

    /// Write a Mumble variable-length integer (unsigned forms).
    pub fn write_varint(&mut self, v: u64) {
        if v < 0x80 {
            self.put(&[v as u8]);
        } else if v < 0x4000 {
            self.put(&[0x80 | (v >> 8) as u8, v as u8]);
        } else if v < 0x20_0000 {
            self.put(&[0xC0 | (v >> 16) as u8, (v >> 8) as u8, v as u8]);
        } else if v < 0x1000_0000 {
            self.put(&[0xE0 | (v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8, v as u8]);
        } else if v <= u64::from(u32::MAX) {
            self.put(&[0xF0]);
            self.put(&(v as u32).to_be_bytes());
        } else {
            self.put(&[0xF4]);
            self.put(&v.to_be_bytes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn read_past_end_yields_zero() {
        let mut reader = PacketReader::new(&[0x41]);
        assert_eq!(reader.read_u8(), 0x41);
        assert!(reader.ok());

        assert_eq!(reader.read_u8(), 0);
        assert_eq!(reader.read_u64(), 0);
        assert_eq!(reader.read_f32(), 0.0);
        assert!(!reader.ok());
        assert_eq!(reader.left(), 0);
    }

    #[test]
    fn write_overflow_is_refused() {
        let mut buf = [0u8; 4];
        let mut writer = PacketWriter::new(&mut buf);
        writer.write_u64(1);
        assert!(!writer.ok());
        assert_eq!(writer.size(), 0);
    }

    #[test]
    fn varint_boundary_widths() {
        let cases: &[(u64, usize)] = &[
            (0, 1),
            (0x7F, 1),
            (0x80, 2),
            (0x3FFF, 2),
            (0x4000, 3),
            (0x1F_FFFF, 3),
            (0x20_0000, 4),
            (0x0FFF_FFFF, 4),
            (0x1000_0000, 5),
            (0xFFFF_FFFF, 5),
            (0x1_0000_0000, 9),
            (u64::MAX, 9),
        ];

        for &(value, width) in cases {
            let mut buf = [0u8; 16];
            let mut writer = PacketWriter::new(&mut buf);
            writer.write_varint(value);
            let size = writer.size();
            assert_eq!(size, width, "width of {value:#x}");

            let mut reader = PacketReader::new(&buf[..size]);
            assert_eq!(reader.read_varint(), value);
            assert!(reader.ok());
        }
    }

    #[test]
    fn negative_varint_forms_decode() {
        // 0xFC | 2 is the inverted 2-bit form for !2.
        let mut reader = PacketReader::new(&[0xFE]);
        assert_eq!(reader.read_varint(), !2u64);

        // 0xF8 negates the varint that follows.
        let mut reader = PacketReader::new(&[0xF8, 0x05]);
        assert_eq!(reader.read_varint(), !5u64);
    }

    proptest! {
        #[test]
        fn varint_round_trips(value in any::<u64>()) {
            let mut buf = [0u8; 16];
            let mut writer = PacketWriter::new(&mut buf);
            writer.write_varint(value);
            prop_assert!(writer.ok());
            let size = writer.size();

            let mut reader = PacketReader::new(&buf[..size]);
            prop_assert_eq!(reader.read_varint(), value);
            prop_assert!(reader.ok());
        }

        #[test]
        fn primitives_round_trip(a in any::<u64>(), b in any::<f32>(), c in any::<u8>()) {
            let mut buf = [0u8; 32];
            let mut writer = PacketWriter::new(&mut buf);
            writer.write_u64(a);
            writer.write_f32(b);
            writer.write_u8(c);
            let size = writer.size();

            let mut reader = PacketReader::new(&buf[..size]);
            prop_assert_eq!(reader.read_u64(), a);
            let read_b = reader.read_f32();
            prop_assert!(read_b == b || (read_b.is_nan() && b.is_nan()));
            prop_assert_eq!(reader.read_u8(), c);
            prop_assert_eq!(reader.left(), 0);
        }

        #[test]
        fn reader_never_panics(data in prop::collection::vec(any::<u8>(), 0..64)) {
            let mut reader = PacketReader::new(&data);
            while reader.left() > 0 && reader.ok() {
                let _ = reader.read_varint();
            }
        }
    }
}
