// SPDX-License-Identifier: Apache-2.0

use std::cmp::Ordering;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::ops::RangeBounds;
use std::slice::SliceIndex;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD, URL_SAFE};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use once_cell::sync::OnceCell;
use simdutf8::compat::{from_utf8, Utf8Error};

/// Base64 decoding is deliberately loose: padding may be present or absent,
/// and trailing bits are ignored.
const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
	.with_decode_allow_trailing_bits(true)
	.with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);

/// An immutable, comparable string of bytes.
#[derive(Clone, Default, Eq)]
pub struct ByteString {
	data: Vec<u8>,
	hash: OnceCell<i32>,
}

impl ByteString {
	/// Creates an empty byte string.
	pub fn empty() -> Self { Self::default() }

	/// Creates a byte string copying `data`.
	pub fn of(data: &[u8]) -> Self {
		data.into()
	}

	/// Creates a byte string of the UTF-8 encoding of `str`.
	pub fn encode_utf8(str: &str) -> Self {
		str.as_bytes().into()
	}

	/// Decodes a Base64 string, in either the standard or the URL-safe
	/// alphabet, ignoring ASCII whitespace and tolerating absent padding.
	/// Returns `None` on any other character.
	pub fn decode_base64(input: &str) -> Option<Self> {
		let cleaned: Vec<u8> = input.bytes()
			.filter(|b| !b.is_ascii_whitespace())
			.collect();
		STANDARD_LENIENT.decode(&cleaned)
			.or_else(|_| URL_SAFE_LENIENT.decode(&cleaned))
			.ok()
			.map(Into::into)
	}

	/// Decodes a hex string, accepting either case. Fails on odd length or a
	/// non-hex character.
	pub fn decode_hex(input: &str) -> Result<Self, base16ct::Error> {
		base16ct::mixed::decode_vec(input).map(Into::into)
	}

	pub(crate) fn with_capacity(capacity: usize) -> Self {
		Vec::with_capacity(capacity).into()
	}

	pub(crate) fn extend_from_slice(&mut self, slice: &[u8]) {
		debug_assert!(self.hash.get().is_none(), "extend after hash memoisation");
		self.data.extend_from_slice(slice);
	}

	/// Returns the length in bytes.
	pub fn len(&self) -> usize { self.data.len() }

	pub fn is_empty(&self) -> bool { self.data.is_empty() }

	/// Returns the byte at `index`, or `None` if `index` is out of bounds.
	pub fn get(&self, index: usize) -> Option<u8> {
		self.data.get(index).copied()
	}

	/// Returns the data as a slice of bytes.
	pub fn as_slice(&self) -> &[u8] { &self.data }

	/// Returns the bytes decoded as UTF-8.
	pub fn utf8(&self) -> Result<&str, Utf8Error> {
		from_utf8(&self.data)
	}

	/// Returns the byte string bounded by `range`.
	pub fn substr<R>(&self, range: R) -> Self
	where R: RangeBounds<usize> + SliceIndex<[u8], Output = [u8]> {
		self.data[range].into()
	}

	/// Returns a byte string with ASCII letters mapped to lowercase.
	pub fn to_ascii_lowercase(&self) -> Self {
		self.data.to_ascii_lowercase().into()
	}

	/// Returns a byte string with ASCII letters mapped to uppercase.
	pub fn to_ascii_uppercase(&self) -> Self {
		self.data.to_ascii_uppercase().into()
	}

	/// Encodes the data as Base64.
	pub fn base64(&self) -> String {
		STANDARD.encode(&self.data)
	}

	/// Encodes the data as URL-safe Base64.
	pub fn base64_url(&self) -> String {
		URL_SAFE.encode(&self.data)
	}

	/// Encodes the data as lowercase hex.
	pub fn hex(&self) -> String {
		base16ct::lower::encode_string(&self.data)
	}

	/// Returns the 32-bit polynomial hash of the data, memoised on first use.
	pub fn hash_code(&self) -> i32 {
		*self.hash.get_or_init(|| {
			self.data.iter().fold(1i32, |hash, &byte| {
				hash.wrapping_mul(31).wrapping_add(byte as i8 as i32)
			})
		})
	}

	/// Feeds the data through `digest`.
	pub fn hash(&self, mut digest: impl digest::Digest) -> ByteString {
		digest.update(&self.data);
		digest.finalize().as_slice().into()
	}

	/// Computes the MD5 hash of the byte string. Broken for cryptography; use
	/// for checksums only.
	pub fn md5(&self) -> ByteString {
		self.hash(md5::Md5::default())
	}

	/// Computes the SHA-1 hash of the byte string. Broken for cryptography;
	/// use for checksums only.
	pub fn sha1(&self) -> ByteString {
		self.hash(sha1::Sha1::default())
	}

	/// Computes the SHA-256 hash of the byte string.
	pub fn sha256(&self) -> ByteString {
		self.hash(sha2::Sha256::default())
	}
}

impl PartialEq for ByteString {
	fn eq(&self, other: &Self) -> bool {
		self.data == other.data
	}
}

impl PartialEq<[u8]> for ByteString {
	fn eq(&self, other: &[u8]) -> bool {
		self.data == other
	}
}

impl PartialEq<&[u8]> for ByteString {
	fn eq(&self, other: &&[u8]) -> bool {
		self.data == *other
	}
}

impl PartialOrd for ByteString {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for ByteString {
	fn cmp(&self, other: &Self) -> Ordering {
		self.data.cmp(&other.data)
	}
}

impl Hash for ByteString {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.data.hash(state);
	}
}

impl Debug for ByteString {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "ByteString[{}]", self.hex())
	}
}

impl From<Vec<u8>> for ByteString {
	fn from(data: Vec<u8>) -> Self {
		Self { data, hash: OnceCell::new() }
	}
}

impl From<&[u8]> for ByteString {
	fn from(value: &[u8]) -> Self {
		value.to_vec().into()
	}
}

impl FromIterator<u8> for ByteString {
	fn from_iter<T: IntoIterator<Item = u8>>(iter: T) -> Self {
		iter.into_iter()
			.collect::<Vec<_>>()
			.into()
	}
}

impl AsRef<[u8]> for ByteString {
	fn as_ref(&self) -> &[u8] { &self.data }
}

#[cfg(test)]
mod test {
	use base64::engine::general_purpose::STANDARD;
	use base64::Engine;
	use pretty_assertions::assert_eq;
	use quickcheck::TestResult;
	use quickcheck_macros::quickcheck;
	use super::ByteString;

	#[quickcheck]
	fn base64_round_trip(data: Vec<u8>) {
		let bstr = ByteString::from(data.clone());
		assert_eq!(
			ByteString::decode_base64(&bstr.base64()),
			Some(bstr),
			"standard alphabet",
		);
		let bstr = ByteString::from(data);
		assert_eq!(
			ByteString::decode_base64(&bstr.base64_url()),
			Some(bstr),
			"url-safe alphabet",
		);
	}

	#[quickcheck]
	fn hex_round_trip(data: Vec<u8>) {
		let bstr = ByteString::from(data);
		assert_eq!(ByteString::decode_hex(&bstr.hex()).ok(), Some(bstr));
	}

	#[quickcheck]
	fn hex_is_case_insensitive(data: Vec<u8>) -> TestResult {
		let bstr = ByteString::from(data);
		let upper = bstr.hex().to_ascii_uppercase();
		match ByteString::decode_hex(&upper) {
			Ok(decoded) => TestResult::from_bool(decoded == bstr),
			Err(_) => TestResult::failed(),
		}
	}

	#[test]
	fn base64_tolerates_whitespace_and_padding() {
		let encoded = STANDARD.encode(b"loose decode");
		let spaced: String = encoded.chars()
			.flat_map(|c| [c, ' '])
			.collect();
		assert_eq!(
			ByteString::decode_base64(&spaced),
			Some(ByteString::of(b"loose decode")),
		);
	}

	#[test]
	fn base64_rejects_invalid_characters() {
		assert_eq!(ByteString::decode_base64("fo*bar"), None);
	}

	#[test]
	fn hex_rejects_odd_length() {
		assert!(ByteString::decode_hex("abc").is_err());
	}

	#[test]
	fn substr_and_case() {
		let bstr = ByteString::encode_utf8("Hello, World");
		assert_eq!(bstr.substr(7..), ByteString::encode_utf8("World"));
		assert_eq!(
			bstr.to_ascii_lowercase(),
			ByteString::encode_utf8("hello, world"),
		);
		assert_eq!(
			bstr.to_ascii_uppercase(),
			ByteString::encode_utf8("HELLO, WORLD"),
		);
	}

	#[test]
	fn hash_code_is_layout_independent() {
		let a = ByteString::encode_utf8("identical");
		let b = ByteString::encode_utf8("identical");
		assert_eq!(a.hash_code(), b.hash_code());
		// Memoised value stays stable.
		assert_eq!(a.hash_code(), a.hash_code());
	}

	#[test]
	fn known_md5() {
		let bstr = ByteString::encode_utf8("12345678901234567");
		assert_eq!(bstr.md5().hex(), "2c9728a2138b2f25e9f89f99bdccf8db");
	}
}
