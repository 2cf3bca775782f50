use byteorder::{BigEndian, ByteOrder};

use crate::error::Error;
use crate::Result;

/// Append-only encode buffer.
///
/// Capacity doubles on demand with a 256 byte floor, so a long run of small
/// scalar writes settles into amortized O(1) appends without a realloc per
/// field.
#[derive(Debug, Default)]
pub struct WriteBuffer {
    data: Vec<u8>,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    fn grow_for(&mut self, additional: usize) {
        let needed = self.data.len() + additional;
        if needed <= self.data.capacity() {
            return;
        }
        let mut cap = self.data.capacity();
        while cap < needed {
            cap = (cap * 2).max(256);
        }
        self.data.reserve_exact(cap - self.data.len());
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.grow_for(bytes.len());
        self.data.extend_from_slice(bytes);
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.append(&[v]);
    }

    #[inline]
    pub fn put_u16(&mut self, v: u16) {
        let mut b = [0u8; 2];
        BigEndian::write_u16(&mut b, v);
        self.append(&b);
    }

    #[inline]
    pub fn put_i16(&mut self, v: i16) {
        let mut b = [0u8; 2];
        BigEndian::write_i16(&mut b, v);
        self.append(&b);
    }

    #[inline]
    pub fn put_i32(&mut self, v: i32) {
        let mut b = [0u8; 4];
        BigEndian::write_i32(&mut b, v);
        self.append(&b);
    }

    #[inline]
    pub fn put_i64(&mut self, v: i64) {
        let mut b = [0u8; 8];
        BigEndian::write_i64(&mut b, v);
        self.append(&b);
    }

    /// IEEE-754 binary64 bit pattern, big-endian.
    #[inline]
    pub fn put_f64(&mut self, v: f64) {
        let mut b = [0u8; 8];
        BigEndian::write_f64(&mut b, v);
        self.append(&b);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

/// Bounded read cursor over a borrowed byte slice.
///
/// Every read checks the remaining byte count first; a failed read reports
/// `Underflow` and leaves the cursor where it was.
#[derive(Debug)]
pub struct ReadCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ReadCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take_exact(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::Underflow {
                offset: self.pos,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn take_into(&mut self, dst: &mut [u8]) -> Result<()> {
        let slice = self.take_exact(dst.len())?;
        dst.copy_from_slice(slice);
        Ok(())
    }

    #[inline]
    pub fn get_u8(&mut self) -> Result<u8> {
        Ok(self.take_exact(1)?[0])
    }

    #[inline]
    pub fn get_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take_exact(2)?))
    }

    #[inline]
    pub fn get_i16(&mut self) -> Result<i16> {
        Ok(BigEndian::read_i16(self.take_exact(2)?))
    }

    #[inline]
    pub fn get_i32(&mut self) -> Result<i32> {
        Ok(BigEndian::read_i32(self.take_exact(4)?))
    }

    #[inline]
    pub fn get_i64(&mut self) -> Result<i64> {
        Ok(BigEndian::read_i64(self.take_exact(8)?))
    }

    #[inline]
    pub fn get_f64(&mut self) -> Result<f64> {
        Ok(BigEndian::read_f64(self.take_exact(8)?))
    }
}
