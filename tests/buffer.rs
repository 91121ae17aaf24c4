// SPDX-License-Identifier: Apache-2.0

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use pretty_assertions::assert_eq;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use segio::pool::{SegmentPool, MAX_SIZE};
use segio::streams::{Sink, Source};
use segio::{Buffer, ErrorKind, SEGMENT_SIZE};

fn hash_of(buffer: &Buffer) -> u64 {
	let mut hasher = DefaultHasher::new();
	buffer.hash(&mut hasher);
	hasher.finish()
}

/// Splits `data` into chunks of the given sizes (cycling), writing each chunk
/// through its own intermediate buffer so the result has an arbitrary segment
/// layout.
fn spliced(data: &[u8], chunk_sizes: &[usize]) -> Buffer {
	let mut out = Buffer::new();
	let mut rest = data;
	let mut sizes = chunk_sizes.iter().cycle();
	while !rest.is_empty() {
		let size = (*sizes.next().unwrap() % SEGMENT_SIZE + 1).min(rest.len());
		let mut chunk = Buffer::from(&rest[..size]);
		out.write_all(&mut chunk).unwrap();
		rest = &rest[size..];
	}
	out
}

#[quickcheck]
fn written_bytes_read_back(data: Vec<u8>) {
	let mut buffer = Buffer::from(&data[..]);
	assert_eq!(buffer.len(), data.len());
	assert_eq!(buffer.read_byte_array_all(), data);
	assert!(buffer.is_empty());
}

#[quickcheck]
fn equality_is_layout_invariant(data: Vec<u8>, chunk_sizes: Vec<usize>) -> TestResult {
	if chunk_sizes.is_empty() {
		return TestResult::discard()
	}

	let whole = Buffer::from(&data[..]);
	let pieces = spliced(&data, &chunk_sizes);
	assert_eq!(whole, pieces);
	assert_eq!(hash_of(&whole), hash_of(&pieces));
	TestResult::passed()
}

#[quickcheck]
fn clone_reads_and_writes_are_independent(data: Vec<u8>) {
	let mut original = Buffer::from(&data[..]);
	let mut copy = original.clone();

	copy.write_from_slice(b"tail");
	let mut drained = original.clone();
	assert_eq!(drained.read_byte_array_all(), data);
	assert_eq!(original.len(), data.len());

	original.skip(original.len());
	assert_eq!(copy.len(), data.len() + 4);
}

#[quickcheck]
fn splice_moves_exact_counts(data: Vec<u8>, take: usize) -> TestResult {
	if data.is_empty() {
		return TestResult::discard()
	}
	let take = take % data.len();

	let mut source = Buffer::from(&data[..]);
	let mut sink = Buffer::new();
	sink.write(&mut source, take).unwrap();

	assert_eq!(source.len(), data.len() - take);
	assert_eq!(sink.len(), take);

	sink.write_all(&mut source).unwrap();
	assert_eq!(sink.read_byte_array_all(), data);
	TestResult::passed()
}

#[quickcheck]
fn index_of_finds_first_occurrence(data: Vec<u8>, needle: u8) {
	let buffer = spliced(&data, &[7, 300, 2, SEGMENT_SIZE]);
	let expected = data.iter().position(|&b| b == needle);
	assert_eq!(buffer.index_of(needle, 0), expected);
	if let Some(found) = buffer.index_of(needle, 0) {
		assert_eq!(buffer.get(found), Some(needle));
	}
}

#[quickcheck]
fn pool_byte_count_stays_in_bounds(data: Vec<u8>) {
	let mut buffer = Buffer::from(&data[..]);
	buffer.skip(buffer.len() / 2);
	buffer.clear();
	assert!(SegmentPool::get().byte_count() <= MAX_SIZE);
}

#[test]
fn integers_read_big_endian() {
	let mut buffer = Buffer::from(&[0xab, 0xcd, 0xef, 0x01, 0x87, 0x65, 0x43, 0x21][..]);
	assert_eq!(buffer.read_u32().unwrap(), 0xabcdef01);
	assert_eq!(buffer.read_u32().unwrap(), 0x87654321);
	assert!(buffer.is_empty());
}

#[test]
fn integers_read_little_endian() {
	let mut buffer = Buffer::new();
	buffer.write_u64_le(0x0102030405060708);
	assert_eq!(
		buffer.read_byte_array_all(),
		[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01],
	);

	buffer.write_u16_le(0xbeef);
	assert_eq!(buffer.read_u16().unwrap(), 0xefbe);
}

#[test]
fn integers_cross_segment_boundaries() {
	for pad in [SEGMENT_SIZE - 1, SEGMENT_SIZE - 2, SEGMENT_SIZE - 3, SEGMENT_SIZE - 7] {
		let mut buffer = Buffer::from(&vec![0u8; pad][..]);
		buffer.write_u16(0x1234);
		buffer.write_u32(0x56789abc);
		buffer.write_u64(0xdef0123456789abc);
		buffer.skip(pad);
		assert_eq!(buffer.read_u16().unwrap(), 0x1234);
		assert_eq!(buffer.read_u32().unwrap(), 0x56789abc);
		assert_eq!(buffer.read_u64().unwrap(), 0xdef0123456789abc);
	}
}

#[test]
fn utf8_crosses_segment_boundaries() {
	let mut buffer = Buffer::from(&vec![b'.'; SEGMENT_SIZE - 2][..]);
	buffer.write_utf8("héllo wörld");
	buffer.skip(SEGMENT_SIZE - 2);
	assert_eq!(buffer.read_utf8_all().unwrap(), "héllo wörld");
}

#[test]
fn utf8_underflow_consumes_nothing() {
	let mut buffer = Buffer::from(&b"abc"[..]);
	let error = buffer.read_utf8(4).unwrap_err();
	assert!(error.is_eos());
	assert_eq!(buffer.len(), 3);
}

#[test]
fn invalid_utf8_is_an_encoding_error() {
	let mut buffer = Buffer::from(&[0xff, 0xfe, b'a'][..]);
	assert!(matches!(
		buffer.read_utf8(3).unwrap_err().kind(),
		ErrorKind::InvalidUtf8(_),
	));
	// Nothing was consumed.
	assert_eq!(buffer.len(), 3);
}

#[test]
fn utf32_round_trips() {
	let text = "a§†😀";
	let mut buffer = Buffer::new();
	buffer.write_string(text, "utf-32").unwrap();
	assert_eq!(buffer.len(), text.chars().count() * 4);
	assert_eq!(buffer.get(0), Some(0));
	assert_eq!(buffer.get(3), Some(b'a'));

	let len = buffer.len();
	assert_eq!(buffer.read_string(len, "utf-32").unwrap(), text);
}

#[test]
fn utf32_rejects_ragged_lengths() {
	let mut buffer = Buffer::from(&[0, 0, 0][..]);
	assert!(matches!(
		buffer.read_string(3, "utf-32").unwrap_err().kind(),
		ErrorKind::Encoding(_),
	));
}

#[test]
fn unknown_charset_is_unsupported() {
	let mut buffer = Buffer::new();
	assert!(matches!(
		buffer.write_string("text", "ebcdic").unwrap_err().kind(),
		ErrorKind::Unsupported(_),
	));
	assert!(matches!(
		buffer.read_string(0, "utf-7").unwrap_err().kind(),
		ErrorKind::Unsupported(_),
	));
}

#[test]
fn typed_read_underflow_is_end_of_data() {
	let mut buffer = Buffer::from(&[1, 2, 3][..]);
	let error = buffer.read_u32().unwrap_err();
	assert!(error.is_eos());
	// The three bytes stay readable.
	assert_eq!(buffer.read_byte_array_all(), [1, 2, 3]);
}

#[test]
fn reads_from_empty_report_exhaustion() {
	let mut empty = Buffer::new();
	let mut sink = Buffer::new();
	assert_eq!(empty.read(&mut sink, 5).unwrap(), 0);
	assert_eq!(empty.read(&mut sink, 0).unwrap(), 0);

	let mut full = Buffer::from(&b"x"[..]);
	assert_eq!(full.read(&mut sink, 0).unwrap(), 0);
}

#[test]
fn splice_bounds_are_checked() {
	let mut source = Buffer::from(&b"abc"[..]);
	let mut sink = Buffer::new();
	assert!(matches!(
		sink.write(&mut source, 4).unwrap_err().kind(),
		ErrorKind::OutOfRange,
	));
}

#[test]
fn skip_releases_consumed_segments() {
	let mut buffer = Buffer::from(&vec![9u8; SEGMENT_SIZE * 2 + 5][..]);
	assert_eq!(buffer.skip(SEGMENT_SIZE * 2), SEGMENT_SIZE * 2);
	assert_eq!(buffer.len(), 5);
	// Lenient past the end.
	assert_eq!(buffer.skip(100), 5);
	assert!(buffer.is_empty());
}

#[test]
fn copy_to_is_non_destructive() {
	let buffer = Buffer::from(&b"copy me around"[..]);
	let mut out = Buffer::new();
	buffer.copy_to(&mut out, 5, 2).unwrap();
	assert_eq!(out.read_utf8_all().unwrap(), "me");
	assert_eq!(buffer.len(), 14);

	assert!(buffer.copy_to(&mut out, 10, 5).is_err());
}

#[test]
fn copy_to_std_and_read_std() {
	let mut buffer = Buffer::from(&b"destructive or not"[..]);

	let mut peeked = Vec::new();
	buffer.copy_to_std(&mut peeked, 0, 11).unwrap();
	assert_eq!(peeked, b"destructive");
	assert_eq!(buffer.len(), 18);

	let mut drained = Vec::new();
	buffer.read_std(&mut drained, 11).unwrap();
	assert_eq!(drained, b"destructive");
	assert_eq!(buffer.read_utf8_all().unwrap(), " or not");
}

#[test]
fn write_std_fills_from_readers() {
	let mut buffer = Buffer::new();
	let data = vec![3u8; SEGMENT_SIZE + 100];
	let read = buffer.write_std_all(&mut &data[..]).unwrap();
	assert_eq!(read, data.len());
	assert_eq!(buffer.read_byte_array_all(), data);
}

#[test]
fn snapshot_preserves_content() {
	let buffer = spliced(b"snapshots share pages", &[4, 9]);
	let snapshot = buffer.snapshot();
	assert_eq!(snapshot.utf8().unwrap(), "snapshots share pages");
	assert_eq!(buffer.len(), 21);
}

#[test]
fn byte_strings_round_trip_through_buffers() {
	let mut buffer = Buffer::new();
	buffer.write_byte_str(&segio::ByteString::encode_utf8("typed"));
	let back = buffer.read_byte_str(5).unwrap();
	assert_eq!(back.utf8().unwrap(), "typed");
}

#[test]
fn lines_split_on_terminators() {
	let mut buffer = Buffer::from(&b"one\r\ntwo\nthree"[..]);
	assert_eq!(buffer.read_utf8_line().unwrap().as_deref(), Some("one"));
	assert_eq!(buffer.read_utf8_line().unwrap().as_deref(), Some("two"));
	assert_eq!(buffer.read_utf8_line().unwrap().as_deref(), Some("three"));
	assert_eq!(buffer.read_utf8_line().unwrap(), None);
}
