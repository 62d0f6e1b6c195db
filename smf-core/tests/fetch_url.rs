use rand::{rngs::StdRng, SeedableRng};
use smf_core::codec;
use smf_core::fetch::{fetch_bytes, FetchConfig};
use smf_core::manifest::{DataBlock, Info};
use smf_core::CodecError;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;

// Serve a single HTTP response on a loopback port and return the base URL.
fn serve_once(status: &'static str, body: Vec<u8>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() > 0 {
            if line == "\r\n" {
                break;
            }
            line.clear();
        }
        let mut stream = stream;
        write!(stream, "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n", body.len()).unwrap();
        stream.write_all(&body).unwrap();
        stream.flush().unwrap();
    });
    format!("http://{addr}")
}

#[test]
fn decode_manifest_from_url() {
    let mut info = Info::new("remote.bin", 20, 10);
    info.append_block(DataBlock { hash: vec![1; 32], index: 0, data: b"http://x/0".to_vec() });
    info.append_block(DataBlock { hash: vec![2; 32], index: 1, data: b"http://x/1".to_vec() });
    let mut buf = Vec::new();
    codec::encode_to_writer(&mut buf, &info, &mut StdRng::seed_from_u64(5)).unwrap();

    let url = serve_once("200 OK", buf);
    let back = codec::decode_from_url(&format!("{url}/remote.smf")).unwrap();
    assert_eq!(back, info);
}

#[test]
fn non_manifest_body_is_format_error() {
    let url = serve_once("200 OK", b"<html>not here</html>".to_vec());
    assert!(matches!(codec::decode_from_url(&url), Err(CodecError::UnrecognizedFormat { .. })));
}

#[test]
fn http_error_status_is_fetch_error() {
    let url = serve_once("404 Not Found", b"missing".to_vec());
    match codec::decode_from_url(&url) {
        Err(CodecError::FetchStatus { status, .. }) => assert_eq!(status, 404),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn unreachable_host_is_fetch_error() {
    let port = {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let err = fetch_bytes(&format!("http://127.0.0.1:{port}/"), &FetchConfig::default()).unwrap_err();
    assert!(matches!(err, CodecError::Fetch { .. }));
}
