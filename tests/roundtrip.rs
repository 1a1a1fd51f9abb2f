//! Round-trip and stream-shape properties of the compressor

use proptest::prelude::*;
use refpack_rs::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Short,
    Medium,
    Long,
    Literal,
    Stop,
}

#[derive(Debug, Clone, Copy)]
struct Op {
    family: Family,
    lits: usize,
    copy_len: usize,
    dist: usize,
}

/// Walk the opcodes of a compressed stream without decoding it
///
/// Panics if an opcode follows the stop opcode, or if the stream has no stop.
fn walk(stream: &[u8]) -> Vec<Op> {
    let mut i = if stream[0] & 0x80 != 0 { 6 } else { 5 };
    let mut ops: Vec<Op> = Vec::new();

    while i < stream.len() {
        assert!(
            ops.last().map_or(true, |op| op.family != Family::Stop),
            "opcode after stop at {}",
            i
        );

        let p = stream[i] as usize;
        let op = match p {
            0x00..=0x7f => {
                let b = stream[i + 1] as usize;
                i += 2;
                Op {
                    family: Family::Short,
                    lits: p & 3,
                    copy_len: ((p & 0x1c) >> 2) + 3,
                    dist: (((p & 0x60) << 3) | b) + 1,
                }
            }
            0x80..=0xbf => {
                let (b0, b1) = (stream[i + 1] as usize, stream[i + 2] as usize);
                i += 3;
                Op {
                    family: Family::Medium,
                    lits: b0 >> 6,
                    copy_len: (p & 0x3f) + 4,
                    dist: (((b0 & 0x3f) << 8) | b1) + 1,
                }
            }
            0xc0..=0xdf => {
                let (b0, b1, b2) = (
                    stream[i + 1] as usize,
                    stream[i + 2] as usize,
                    stream[i + 3] as usize,
                );
                i += 4;
                Op {
                    family: Family::Long,
                    lits: p & 3,
                    copy_len: (((p & 0x0c) << 6) | b2) + 5,
                    dist: (((p & 0x10) << 12) | (b0 << 8) | b1) + 1,
                }
            }
            0xe0..=0xfb => {
                i += 1;
                Op {
                    family: Family::Literal,
                    lits: ((p & 0x1f) + 1) * 4,
                    copy_len: 0,
                    dist: 0,
                }
            }
            _ => {
                i += 1;
                Op {
                    family: Family::Stop,
                    lits: p & 3,
                    copy_len: 0,
                    dist: 0,
                }
            }
        };
        i += op.lits;
        ops.push(op);
    }

    assert_eq!(i, stream.len(), "literals run past the end");
    assert_eq!(ops.last().map(|op| op.family), Some(Family::Stop));
    ops
}

/// Every copy uses the smallest family that fits and stays within its limits
fn check_ops(ops: &[Op]) {
    let mut pos = 0;
    for op in ops {
        pos += op.lits;
        match op.family {
            Family::Short => {
                assert!((3..=10).contains(&op.copy_len));
                assert!(op.dist <= 1024);
            }
            Family::Medium => {
                assert!((4..=67).contains(&op.copy_len));
                assert!(op.dist <= 16384);
                assert!(op.copy_len > 10 || op.dist > 1024);
            }
            Family::Long => {
                assert!((5..=1028).contains(&op.copy_len));
                assert!(op.dist <= 131072);
                assert!(op.copy_len > 67 || op.dist > 16384);
            }
            Family::Literal => assert!(op.lits <= 112 && op.lits % 4 == 0),
            Family::Stop => assert!(op.lits <= 3),
        }
        if op.copy_len > 0 {
            assert!(op.lits <= 3);
            assert!(op.dist >= 1 && op.dist <= pos);
            if op.copy_len == 3 {
                assert!(op.dist < 1024);
            }
            if op.copy_len == 4 {
                assert!(op.dist < 16384);
            }
        }
        pos += op.copy_len;
    }
}

/// A random seed repeated several times, with a few stray bytes after it
fn repetitive(max_reps: usize) -> impl Strategy<Value = Vec<u8>> {
    (
        prop::collection::vec(any::<u8>(), 4..32),
        8..max_reps,
        prop::collection::vec(any::<u8>(), 0..8),
    )
        .prop_map(|(seed, reps, tail)| {
            let mut data = seed.repeat(reps);
            data.extend_from_slice(&tail);
            data
        })
}

proptest! {
    #[test]
    fn prop_roundtrip_any(data in prop::collection::vec(any::<u8>(), 0..2000)) {
        match compress_to_vec(&data, CompressionLevel::MAX) {
            Ok(compressed) => {
                prop_assert!(compressed.len() < data.len());
                check_ops(&walk(&compressed));
                prop_assert_eq!(decompress_to_vec(&compressed).unwrap(), data);
            }
            Err(e) => prop_assert_eq!(e, CompressError::NotWorthCompressing),
        }
    }

    #[test]
    fn prop_roundtrip_repetitive(data in repetitive(200)) {
        let compressed = compress_to_vec(&data, CompressionLevel::MAX).unwrap();
        prop_assert_eq!(compressed[0], 0x10);
        prop_assert_eq!(decompressed_len(&compressed).unwrap(), data.len());
        check_ops(&walk(&compressed));
        prop_assert_eq!(decompress_to_vec(&compressed).unwrap(), data);
    }

    #[test]
    fn prop_roundtrip_sparse_level(data in repetitive(200)) {
        let level = CompressionLevel::derived(4, 64, 4, 16);
        match compress_to_vec(&data, level) {
            Ok(compressed) => {
                check_ops(&walk(&compressed));
                prop_assert_eq!(decompress_to_vec(&compressed).unwrap(), data);
            }
            Err(e) => prop_assert_eq!(e, CompressError::NotWorthCompressing),
        }
    }

    #[test]
    fn prop_short_input_not_compressed(data in prop::collection::vec(any::<u8>(), 0..16)) {
        prop_assert_eq!(
            compress_to_vec(&data, CompressionLevel::MAX),
            Err(CompressError::NotWorthCompressing)
        );
    }

    #[test]
    fn prop_truncated_stream_fails(data in repetitive(40), cut in any::<prop::sample::Index>()) {
        let compressed = compress_to_vec(&data, CompressionLevel::MAX).unwrap();
        let cut = cut.index(compressed.len());
        prop_assert!(decompress_to_vec(&compressed[..cut]).is_err());
    }
}

#[test]
fn test_run_of_a() {
    let data = b"AAAAAAAAAAAAAAAAAAAA";
    let compressed = compress_to_vec(data, CompressionLevel::MAX).unwrap();
    let ops = walk(&compressed);
    check_ops(&ops);
    assert!(ops.iter().any(|op| op.copy_len > 0 && op.dist == 1));
    assert_eq!(decompress_to_vec(&compressed).unwrap(), data);
}

#[test]
fn test_overlapping_copy() {
    let data = [0x5a; 200];
    let compressed = compress_to_vec(&data, CompressionLevel::MAX).unwrap();
    let ops = walk(&compressed);
    assert!(ops.iter().any(|op| op.copy_len > op.dist));
    assert_eq!(decompress_to_vec(&compressed).unwrap(), data);

    let mut out = [0u8; 200];
    assert_eq!(decompress_to_buf(&compressed, &mut out), Ok(200));
    assert_eq!(out, data);
}

#[test]
fn test_noise() {
    // xorshift, good enough to defeat matching
    let mut x = 0x2545f491u32;
    let data: Vec<u8> = (0..1000)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            x as u8
        })
        .collect();

    match compress_to_vec(&data, CompressionLevel::MAX) {
        Ok(compressed) => {
            check_ops(&walk(&compressed));
            assert_eq!(decompress_to_vec(&compressed).unwrap(), data);
        }
        Err(e) => assert_eq!(e, CompressError::NotWorthCompressing),
    }
}

#[test]
fn test_long_period_not_compressed() {
    // the literal scan only searches the last 64 bytes and never feeds the
    // history index, so a period past that reach is never found
    let data: Vec<u8> = (0..20_000).map(|i| (i % 100) as u8).collect();
    assert_eq!(
        compress_to_vec(&data, CompressionLevel::MAX),
        Err(CompressError::NotWorthCompressing)
    );

    // a short-range repeat in front does not help: the cursor stops right
    // after it and the index never sees the periodic part
    let mut data = vec![0u8; 16];
    data.extend((0..20_000).map(|i| (i % 100) as u8));
    assert_eq!(
        compress_to_vec(&data, CompressionLevel::MAX),
        Err(CompressError::NotWorthCompressing)
    );
}

#[test]
fn test_stored_input_is_not_a_stream() {
    // what the demo writes when compression is not worth it
    let data: Vec<u8> = (0..=255).collect();
    assert_eq!(
        compress_to_vec(&data, CompressionLevel::MAX),
        Err(CompressError::NotWorthCompressing)
    );
    assert_eq!(
        decompress_to_vec(&data),
        Err(DecompressError::InvalidHeader)
    );
}

#[test]
fn test_long_range_match() {
    // a block repeated ~100 KiB later, far outside the brute-force reach;
    // the filler repeats within 64 bytes so the cursor moves on and the
    // block gets indexed
    let mut x = 0x9e3779b9u32;
    let mut noise = || {
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        x as u8
    };
    let block: Vec<u8> = (0..4096).map(|_| noise()).collect();
    let filler: Vec<u8> = (0..100_000).map(|i| (i % 61) as u8).collect();

    let mut data = block.clone();
    data.extend_from_slice(&filler);
    data.extend_from_slice(&block);

    let compressed = compress_to_vec(&data, CompressionLevel::MAX).unwrap();
    let ops = walk(&compressed);
    check_ops(&ops);
    assert!(ops
        .iter()
        .any(|op| op.family == Family::Long && op.dist > 16384));
    assert!(ops
        .iter()
        .any(|op| op.family == Family::Long && op.dist == 4096 + 100_000));
    assert_eq!(decompress_to_vec(&compressed).unwrap(), data);
    assert_eq!(
        decompress_from_reader(std::io::Cursor::new(&compressed)).unwrap(),
        data
    );
}

/// 4 literals then copies of up to 1028 bytes until `len` is reached
fn repeat_stream(len: usize) -> Vec<u8> {
    let mut stream = if len > 0xffffff {
        let mut s = vec![0x90, 0xfb];
        s.extend_from_slice(&(len as u32).to_be_bytes());
        s
    } else {
        let mut s = vec![0x10, 0xfb];
        s.extend_from_slice(&(len as u32).to_be_bytes()[1..]);
        s
    };
    stream.extend_from_slice(&[0xe0, 1, 2, 3, 4]);
    let mut left = len - 4;
    while left > 0 {
        let n = left.min(1028);
        let c = n - 5;
        stream.extend_from_slice(&[0xc0 | ((c >> 6) & 0x0c) as u8, 0x00, 0x03, c as u8]);
        left -= n;
    }
    stream.push(0xfc);
    stream
}

#[test]
fn test_long_header_stream() {
    let len = 0x1000004usize;
    let stream = repeat_stream(len);
    assert_eq!(stream[0], 0x90);

    let out = decompress_to_vec(&stream).unwrap();
    assert_eq!(out.len(), len);
    assert!(out.chunks(4).all(|c| c == [1, 2, 3, 4]));
}

#[test]
fn test_reader_grows_past_reservation() {
    // declares far more than is reserved up front for a reader
    let len = 3 << 20;
    let stream = repeat_stream(len);
    let out = decompress_from_reader(std::io::Cursor::new(&stream)).unwrap();
    assert_eq!(out.len(), len);
    assert!(out.chunks(4).all(|c| c == [1, 2, 3, 4]));
}

#[test]
#[ignore = "compresses 16 MiB, slow without optimizations"]
fn test_long_header_compress() {
    let data = vec![7u8; 0x1000001];
    let compressed = compress_to_vec(&data, CompressionLevel::MAX).unwrap();
    assert_eq!(&compressed[..6], [0x90, 0xfb, 0x01, 0x00, 0x00, 0x01]);
    assert_eq!(decompress_to_vec(&compressed).unwrap(), data);
}

#[test]
fn test_parallel_calls() {
    let inputs: Vec<Vec<u8>> = (1..=8u8)
        .map(|k| (0..20_000).map(|i| ((i / k as usize) % 7) as u8 ^ k).collect())
        .collect();

    std::thread::scope(|s| {
        let handles: Vec<_> = inputs
            .iter()
            .map(|inp| {
                s.spawn(move || {
                    let mut state = CompressState::new();
                    let compressed = state.compress_to_vec(inp, CompressionLevel::MAX).unwrap();
                    decompress_to_vec(&compressed).unwrap()
                })
            })
            .collect();

        for (h, inp) in handles.into_iter().zip(&inputs) {
            assert_eq!(&h.join().unwrap(), inp);
        }
    });
}
