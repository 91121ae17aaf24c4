// SPDX-License-Identifier: Apache-2.0

use flate2::Crc;
use pretty_assertions::assert_eq;
use quickcheck_macros::quickcheck;
use segio::streams::{DeflaterSink, GzipSink, GzipSource, InflaterSource, Sink, Source};
use segio::{Buffer, ByteString, ErrorKind};

const ENGINEERS_DEFLATED: &str =
	"eJxzz09RyEjNKVAoLdZRKE9VL0pVyMxTKMlIVchIzEspVshPU0jNS8/MS00tKtYDAF6CD5s=";
const ENGINEERS: &str = "God help us, we're in the hands of engineers.";

fn inflate_all(compressed: &[u8]) -> segio::Result<Vec<u8>> {
	let mut source = InflaterSource::new(compressed);
	let mut sink = Buffer::new();
	source.read_all(&mut sink)?;
	Ok(sink.read_byte_array_all())
}

fn deflated_raw(data: &[u8]) -> Vec<u8> {
	let mut compressed = Buffer::new();
	{
		let mut sink = DeflaterSink::raw(&mut compressed);
		let mut source = Buffer::from(data);
		sink.write_all(&mut source).unwrap();
		sink.close_sink().unwrap();
	}
	compressed.read_byte_array_all()
}

fn gunzip(member: Buffer) -> segio::Result<Vec<u8>> {
	let mut source = GzipSource::new(member);
	let mut sink = Buffer::new();
	source.read_all(&mut sink)?;
	Ok(sink.read_byte_array_all())
}

fn encoding_message(error: &segio::Error) -> &'static str {
	match error.kind() {
		ErrorKind::Encoding(message) => *message,
		kind => panic!("expected an encoding error, got {kind}"),
	}
}

#[test]
fn inflates_a_known_zlib_stream() {
	let payload = ByteString::decode_base64(ENGINEERS_DEFLATED).unwrap();
	let inflated = inflate_all(payload.as_slice()).unwrap();
	assert_eq!(String::from_utf8(inflated).unwrap(), ENGINEERS);
}

#[test]
fn truncated_streams_end_early() {
	let payload = ByteString::decode_base64(ENGINEERS_DEFLATED).unwrap();
	let truncated = &payload.as_slice()[..payload.len() - 1];
	assert!(inflate_all(truncated).unwrap_err().is_eos());
}

#[quickcheck]
fn inflate_inverts_deflate(data: Vec<u8>) {
	let mut compressed = Buffer::new();
	{
		let mut sink = DeflaterSink::new(&mut compressed);
		let mut source = Buffer::from(&data[..]);
		sink.write_all(&mut source).unwrap();
		sink.close_sink().unwrap();
	}

	let mut source = InflaterSource::new(compressed);
	let mut sink = Buffer::new();
	source.read_all(&mut sink).unwrap();
	assert_eq!(sink.read_byte_array_all(), data);
}

#[test]
fn inflate_inverts_deflate_for_a_mebibyte() {
	let data = vec![b'a'; 1 << 20];
	let mut compressed = Buffer::new();
	{
		let mut sink = DeflaterSink::new(&mut compressed);
		let mut source = Buffer::from(&data[..]);
		sink.write_all(&mut source).unwrap();
		sink.close_sink().unwrap();
	}
	// A megabyte of the same byte packs down hard.
	assert!(compressed.len() < data.len() / 100);

	let mut source = InflaterSource::new(compressed);
	let mut sink = Buffer::new();
	source.read_all(&mut sink).unwrap();
	assert_eq!(sink.read_byte_array_all(), data);
}

#[test]
fn gunzip_inverts_gzip() {
	let text = "It's a UNIX system! I know this!";
	let mut compressed = Buffer::new();
	{
		let mut sink = GzipSink::new(&mut compressed);
		let mut source = Buffer::from(text.as_bytes());
		sink.write_all(&mut source).unwrap();
		sink.close_sink().unwrap();
	}
	assert_eq!(compressed.get(0), Some(0x1f));
	assert_eq!(compressed.get(1), Some(0x8b));
	assert_eq!(compressed.get(2), Some(8));

	let plain = gunzip(compressed).unwrap();
	assert_eq!(String::from_utf8(plain).unwrap(), text);
}

#[quickcheck]
fn gunzip_inverts_gzip_for_any_bytes(data: Vec<u8>) {
	let mut compressed = Buffer::new();
	{
		let mut sink = GzipSink::new(&mut compressed);
		let mut source = Buffer::from(&data[..]);
		sink.write_all(&mut source).unwrap();
		sink.close_sink().unwrap();
	}
	assert_eq!(gunzip(compressed).unwrap(), data);
}

#[test]
fn gzip_flushes_a_decodable_prefix() {
	let mut compressed = Buffer::new();
	let mut sink = GzipSink::new(&mut compressed);
	let mut source = Buffer::from(&b"flushed early"[..]);
	sink.write_all(&mut source).unwrap();
	Sink::flush(&mut sink).unwrap();
	// The header and sync-flushed deflate data are already downstream.
	assert!(compressed.len() > 10);
	sink.close_sink().unwrap();
	assert_eq!(gunzip(compressed).unwrap(), b"flushed early");
}

/// Builds a gzip member by hand so the optional header fields get exercised.
struct MemberBuilder {
	header: Vec<u8>,
	data: Vec<u8>,
}

const FHCRC: u8 = 1 << 1;
const FEXTRA: u8 = 1 << 2;
const FNAME: u8 = 1 << 3;
const FCOMMENT: u8 = 1 << 4;

impl MemberBuilder {
	fn new(flags: u8, data: &[u8]) -> Self {
		let mut header = vec![0x1f, 0x8b, 8, flags];
		header.extend_from_slice(&[0; 6]);
		Self {
			header,
			data: data.to_vec(),
		}
	}

	fn extra(mut self, extra: &[u8]) -> Self {
		self.header.extend_from_slice(&(extra.len() as u16).to_le_bytes());
		self.header.extend_from_slice(extra);
		self
	}

	fn name(mut self, name: &str) -> Self {
		self.header.extend_from_slice(name.as_bytes());
		self.header.push(0);
		self
	}

	fn comment(mut self, comment: &str) -> Self {
		self.header.extend_from_slice(comment.as_bytes());
		self.header.push(0);
		self
	}

	fn build(self) -> Buffer {
		let mut member = Buffer::new();
		member.write_from_slice(&self.header);
		if self.header[3] & FHCRC != 0 {
			let mut crc = Crc::new();
			crc.update(&self.header);
			member.write_u16_le((crc.sum() & 0xffff) as u16);
		}
		member.write_from_slice(&deflated_raw(&self.data));

		let mut crc = Crc::new();
		crc.update(&self.data);
		member.write_u32_le(crc.sum());
		member.write_u32_le(self.data.len() as u32);
		member
	}
}

#[test]
fn gzip_reads_optional_header_fields() {
	let member = MemberBuilder::new(FEXTRA | FNAME | FCOMMENT | FHCRC, b"field day")
		.extra(b"\x01\x02\x03")
		.name("archive.tar")
		.comment("all optional fields at once")
		.build();
	assert_eq!(gunzip(member).unwrap(), b"field day");
}

#[test]
fn gzip_verifies_the_header_crc() {
	let mut member = MemberBuilder::new(FHCRC, b"checked").build();
	let mut corrupted = Buffer::new();
	// Flip a bit inside the stored CRC-16.
	let bytes = member.read_byte_array_all();
	corrupted.write_from_slice(&bytes[..10]);
	corrupted.write_u8(bytes[10] ^ 1);
	corrupted.write_from_slice(&bytes[11..]);

	let error = gunzip(corrupted).unwrap_err();
	assert_eq!(encoding_message(&error), "crc mismatch");
}

#[test]
fn gzip_rejects_a_bad_magic_number() {
	let mut member = Buffer::new();
	member.write_from_slice(&[0x1f, 0x8c, 8, 0, 0, 0, 0, 0, 0, 0]);
	let error = gunzip(member).unwrap_err();
	assert_eq!(encoding_message(&error), "bad gzip magic");
}

#[test]
fn gzip_rejects_reserved_flags() {
	let mut member = Buffer::new();
	member.write_from_slice(&[0x1f, 0x8b, 8, 0x80, 0, 0, 0, 0, 0, 0]);
	let error = gunzip(member).unwrap_err();
	assert!(matches!(error.kind(), ErrorKind::Unsupported(_)));
}

#[test]
fn gzip_rejects_unknown_compression_methods() {
	let mut member = Buffer::new();
	member.write_from_slice(&[0x1f, 0x8b, 7, 0, 0, 0, 0, 0, 0, 0]);
	let error = gunzip(member).unwrap_err();
	assert!(matches!(error.kind(), ErrorKind::Unsupported(_)));
}

#[test]
fn gzip_verifies_the_trailer_crc() {
	let member = MemberBuilder::new(0, b"trailer bytes").build();
	let mut bytes = member;
	let mut corrupted = bytes.read_byte_array_all();
	let crc_offset = corrupted.len() - 8;
	corrupted[crc_offset] ^= 0xff;

	let error = gunzip(Buffer::from(&corrupted[..])).unwrap_err();
	assert_eq!(encoding_message(&error), "crc mismatch");
}

#[test]
fn gzip_verifies_the_trailer_length() {
	let member = MemberBuilder::new(0, b"measured").build();
	let mut bytes = member;
	let mut corrupted = bytes.read_byte_array_all();
	let len_offset = corrupted.len() - 4;
	corrupted[len_offset] ^= 0xff;

	let error = gunzip(Buffer::from(&corrupted[..])).unwrap_err();
	assert_eq!(encoding_message(&error), "size mismatch");
}

#[test]
fn gzip_rejects_trailing_garbage() {
	let member = MemberBuilder::new(0, b"tidy").build();
	let mut bytes = member;
	let mut padded = bytes.read_byte_array_all();
	padded.push(0);

	let error = gunzip(Buffer::from(&padded[..])).unwrap_err();
	assert!(matches!(error.kind(), ErrorKind::Encoding(_)));
}

#[test]
fn truncated_gzip_members_end_early() {
	let member = MemberBuilder::new(0, b"cut short in the middle of things").build();
	let mut bytes = member;
	let all = bytes.read_byte_array_all();
	let truncated = &all[..all.len() - 12];

	assert!(gunzip(Buffer::from(truncated)).unwrap_err().is_eos());
}
