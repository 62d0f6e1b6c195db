use rand::{rngs::StdRng, Rng, SeedableRng};
use smf_core::codec::{self, HEADER_LEN, MAGIC, VERSION};
use smf_core::manifest::{DataBlock, DataType, EncodeType, Info, Status};
use std::io::Read;

fn sample_info(rng: &mut StdRng) -> Info {
    let mut info = Info::new("sample.img", 1000, 256);
    info.status = Status::Uploading;
    info.hash = (0..32).map(|_| rng.gen()).collect();
    info.encode = EncodeType::Image;
    info.data_type = DataType::Uri;
    for i in [3u64, 0, 2, 1] {
        info.append_block(DataBlock {
            hash: (0..32).map(|_| rng.gen()).collect(),
            index: i,
            data: format!("https://cdn.example/{i}").into_bytes(),
        });
    }
    info
}

#[test]
fn roundtrip_across_keys() {
    let mut rng = StdRng::seed_from_u64(42);
    let info = sample_info(&mut rng);
    let mut keys = Vec::new();
    for seed in 0..16u64 {
        let mut buf = Vec::new();
        codec::encode_to_writer(&mut buf, &info, &mut StdRng::seed_from_u64(seed)).unwrap();
        assert_eq!(&buf[..4], MAGIC);
        assert_eq!(buf[4], VERSION);
        assert!((1..=254).contains(&buf[5]));
        keys.push(buf[5]);
        let back = codec::decode_from_reader(&buf[..]).unwrap();
        assert_eq!(back, info);
    }
    keys.sort_unstable();
    keys.dedup();
    assert!(keys.len() > 1, "key should vary between encodes");
}

#[test]
fn payload_is_obfuscated() {
    let mut info = Info::new("plainly-visible-name", 10, 10);
    info.append_block(DataBlock { hash: vec![1], index: 0, data: b"0123456789".to_vec() });
    let mut buf = Vec::new();
    codec::encode_to_writer(&mut buf, &info, &mut StdRng::seed_from_u64(7)).unwrap();
    let body = &buf[HEADER_LEN..];
    assert!(!body.windows(20).any(|w| w == b"plainly-visible-name"));
}

#[test]
fn file_roundtrip_end_to_end() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("a.smf");

    let mut info = Info::new("a.bin", 300, 100);
    for i in 0..3u64 {
        info.append_block(DataBlock { hash: vec![i as u8 + 1; 32], index: i, data: vec![i as u8; 100] });
    }
    codec::encode_to_file(&path, &info).unwrap();

    let mut raw = Vec::new();
    std::fs::File::open(&path).unwrap().read_to_end(&mut raw).unwrap();
    assert_eq!(&raw[..4], b"\x14SMF");

    let back = codec::decode_from_file(&path).unwrap();
    assert_eq!(back.size, 300);
    assert_eq!(back.blocks.len(), 3);
    let mut idx: Vec<u64> = back.blocks.iter().map(|b| b.index).collect();
    idx.sort_unstable();
    assert_eq!(idx, vec![0, 1, 2]);
    for b in &info.blocks {
        assert_eq!(back.block(b.index), Some(b));
    }
}

#[test]
fn encode_truncates_previous_contents() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("m.smf");
    std::fs::write(&path, vec![0xAAu8; 64 * 1024]).unwrap();
    let info = Info::new("small", 1, 1);
    codec::encode_to_file_with_rng(&path, &info, &mut StdRng::seed_from_u64(1)).unwrap();
    assert!(std::fs::metadata(&path).unwrap().len() < 1024);
    assert_eq!(codec::decode_from_file(&path).unwrap(), info);
}
