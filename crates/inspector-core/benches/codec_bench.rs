//! Criterion benchmarks for the V8 debugger framing codec.
//!
//! The backend reader decodes every response and event through
//! `decode_frame`, and `backtrace` responses on deep stacks are the largest
//! frames the bridge sees, so both a tiny and a large body are measured.
//!
//! Run with:
//! ```bash
//! cargo bench --package inspector-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use inspector_core::protocol::codec::{decode_frame, encode_request};
use inspector_core::WireRequest;
use serde_json::json;

fn frame(body: &str) -> Vec<u8> {
    let mut buf = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
    buf.extend_from_slice(body.as_bytes());
    buf
}

fn make_backtrace_frame(depth: usize) -> Vec<u8> {
    let frames: Vec<_> = (0..depth)
        .map(|i| {
            json!({
                "index": i, "line": i * 3, "column": 4,
                "receiver": {"ref": i * 2, "type": "object", "className": "Object"},
                "func": {"ref": i * 2 + 1, "type": "function", "name": format!("fn{i}"), "scriptId": 31},
                "scopes": [{"type": 1, "index": 0}, {"type": 3, "index": 1}, {"type": 0, "index": 2}]
            })
        })
        .collect();
    let body = json!({
        "seq": 1, "type": "response", "request_seq": 1, "command": "backtrace",
        "success": true, "running": false,
        "body": {"fromFrame": 0, "toFrame": depth, "totalFrames": depth, "frames": frames}
    });
    frame(&body.to_string())
}

fn bench_encode(c: &mut Criterion) {
    let request = WireRequest::new(1, "continue", Some(json!({"stepaction": "next"})));
    c.bench_function("encode_continue", |b| {
        b.iter(|| encode_request(black_box(&request)).unwrap())
    });
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let small = frame(r#"{"seq":2,"type":"response","request_seq":1,"success":true,"running":true}"#);
    group.bench_function("plain_response", |b| {
        b.iter(|| {
            let (f, _) = decode_frame(black_box(&small)).unwrap();
            f.message().unwrap()
        })
    });

    let deep = make_backtrace_frame(64);
    group.bench_function("backtrace_64_frames", |b| {
        b.iter(|| {
            let (f, _) = decode_frame(black_box(&deep)).unwrap();
            f.message().unwrap()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
