use proptest::prelude::*;
use smf_core::xor::{xor_in_place, XorReader, XorWriter};
use std::io::{self, Read, Write};

// Sink that accepts at most `cap` bytes per call.
struct Trickle {
    out: Vec<u8>,
    cap: usize,
}

impl Write for Trickle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.cap);
        self.out.extend_from_slice(&buf[..n]);
        Ok(n)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Broken;

impl Read for Broken {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
    }
}

proptest! {
    #[test]
    fn same_key_twice_is_identity(key in any::<u8>(), data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut buf = data.clone();
        xor_in_place(&mut buf, key);
        xor_in_place(&mut buf, key);
        prop_assert_eq!(buf, data);
    }

    #[test]
    fn writer_then_reader_roundtrip(key in 1u8..=255, data in proptest::collection::vec(any::<u8>(), 0..512)) {
        let mut w = XorWriter::new(key, Vec::new());
        w.write_all(&data).unwrap();
        let obf = w.into_inner();
        prop_assert_eq!(obf.len(), data.len());
        let mut back = Vec::new();
        XorReader::new(key, &obf[..]).read_to_end(&mut back).unwrap();
        prop_assert_eq!(back, data);
    }
}

#[test]
fn every_byte_is_xored() {
    let mut w = XorWriter::new(0x0f, Vec::new());
    w.write_all(&[0x00, 0xff, 0x0f]).unwrap();
    assert_eq!(w.into_inner(), vec![0x0f, 0xf0, 0x00]);
}

#[test]
fn short_writes_report_inner_count() {
    let mut w = XorWriter::new(0x33, Trickle { out: vec![], cap: 3 });
    assert_eq!(w.write(b"abcdefg").unwrap(), 3);
    w.write_all(b"defg").unwrap();
    let mut got = w.into_inner().out;
    xor_in_place(&mut got, 0x33);
    assert_eq!(&got[..], b"abcdefg");
}

#[test]
fn reader_reports_inner_errors_and_eof() {
    let mut buf = [0u8; 8];
    let err = XorReader::new(7, Broken).read(&mut buf).unwrap_err();
    assert_eq!(err.to_string(), "disk on fire");
    assert_eq!(XorReader::new(7, &[][..]).read(&mut buf).unwrap(), 0);
}

#[test]
fn zero_key_passes_through() {
    let mut w = XorWriter::new(0, Vec::new());
    w.write_all(b"plain").unwrap();
    assert_eq!(&w.into_inner()[..], b"plain");
}
