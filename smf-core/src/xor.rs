use std::io::{self, Read, Write};

/// XOR every byte of `buf` with `key`.
pub fn xor_in_place(buf: &mut [u8], key: u8) {
    for b in buf.iter_mut() {
        *b ^= key;
    }
}

/// Reader that XORs everything it yields with a single-byte key.
///
/// Bytes are transformed in the caller's buffer; no state survives between
/// calls, so the same type both obfuscates and de-obfuscates.
#[derive(Debug)]
pub struct XorReader<R> {
    inner: R,
    key: u8,
}

impl<R: Read> XorReader<R> {
    pub fn new(key: u8, inner: R) -> Self {
        Self { inner, key }
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for XorReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        xor_in_place(&mut buf[..n], self.key);
        Ok(n)
    }
}

/// Writer counterpart of [`XorReader`].
#[derive(Debug)]
pub struct XorWriter<W> {
    inner: W,
    key: u8,
    scratch: Vec<u8>,
}

impl<W: Write> XorWriter<W> {
    pub fn new(key: u8, inner: W) -> Self {
        Self { inner, key, scratch: Vec::new() }
    }

    pub fn key(&self) -> u8 {
        self.key
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for XorWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.scratch.clear();
        self.scratch.extend_from_slice(buf);
        xor_in_place(&mut self.scratch, self.key);
        // Short writes report exactly what the inner sink accepted; the caller
        // re-submits the remainder, which is XORed afresh.
        self.inner.write(&self.scratch)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
