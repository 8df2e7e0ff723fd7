//! Small `Read` helpers shared by the box and tag engines.

use std::io;
use std::io::Read;

/// Wraps any [`Read`], tracking how many bytes have passed through it.
///
/// Box and tag payloads are framed by a declared length but otherwise read field-by-field;
/// rather than thread an explicit byte counter through every parse function, each parser reads
/// through a `CountingReader` and compares `bytes_read()` against the declared payload size once
/// it's done.
pub struct CountingReader<R> {
    inner: R,
    count: u64,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        CountingReader { inner, count: 0 }
    }

    pub fn bytes_read(&self) -> u64 {
        self.count
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Reads and discards `n` bytes, e.g. to skip a box's reserved fields.
    pub fn skip(&mut self, n: u64) -> io::Result<()> {
        let mut remaining = n;
        let mut buf = [0u8; 256];
        while remaining > 0 {
            let chunk = remaining.min(buf.len() as u64) as usize;
            self.read_exact(&mut buf[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u16be(&mut self) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    pub fn read_i16be(&mut self) -> io::Result<i16> {
        Ok(self.read_u16be()? as i16)
    }

    pub fn read_u24be(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 3];
        self.read_exact(&mut buf)?;
        Ok(u32::from(buf[0]) << 16 | u32::from(buf[1]) << 8 | u32::from(buf[2]))
    }

    pub fn read_i24be(&mut self) -> io::Result<i32> {
        let v = self.read_u24be()?;
        // sign-extend the 24th bit
        Ok(((v << 8) as i32) >> 8)
    }

    pub fn read_u32be(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    pub fn read_i32be(&mut self) -> io::Result<i32> {
        Ok(self.read_u32be()? as i32)
    }

    pub fn read_u64be(&mut self) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    pub fn read_vec(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count += n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counts_bytes_read() {
        let mut r = CountingReader::new(&b"hello world"[..]);
        assert_eq!(r.read_u8().unwrap(), b'h');
        assert_eq!(r.read_u32be().unwrap(), u32::from_be_bytes(*b"ello"));
        assert_eq!(r.bytes_read(), 5);
        r.skip(1).unwrap();
        assert_eq!(r.bytes_read(), 6);
        assert_eq!(r.read_vec(5).unwrap(), b"world");
        assert_eq!(r.bytes_read(), 11);
    }

    #[test]
    fn reads_big_endian_signed() {
        let mut r = CountingReader::new(&[0xff, 0xff, 0xff][..]);
        assert_eq!(r.read_i24be().unwrap(), -1);
    }
}
