// SPDX-License-Identifier: Apache-2.0

use std::cmp::min;
use std::io::Write;
use simdutf8::compat::from_utf8;
use crate::{Context, Error, Result, ResultContext};
use crate::byte_str::ByteString;
use crate::streams::{Sink, Source};
use super::Buffer;

pub(super) enum Charset {
	Utf8,
	Utf32Be,
}

pub(super) fn charset_by_name(name: &str) -> Option<Charset> {
	if name.eq_ignore_ascii_case("utf-8") || name.eq_ignore_ascii_case("utf8") {
		Some(Charset::Utf8)
	} else if name.eq_ignore_ascii_case("utf-32") ||
			  name.eq_ignore_ascii_case("utf-32be") ||
			  name.eq_ignore_ascii_case("utf32") {
		Some(Charset::Utf32Be)
	} else {
		None
	}
}

macro_rules! gen_int_reads {
	($($be_name:ident $le_name:ident -> $ty:ident,)+) => {
		$(
		#[doc = concat!("Reads one big-endian [`", stringify!($ty), "`] from the front of the buffer.")]
		pub fn $be_name(&mut self) -> Result<$ty> {
			Ok(<$ty>::from_be_bytes(self.read_array()?))
		}

		#[doc = concat!("Reads one little-endian [`", stringify!($ty), "`] from the front of the buffer.")]
		pub fn $le_name(&mut self) -> Result<$ty> {
			Ok(<$ty>::from_le_bytes(self.read_array()?))
		}
		)+
	};
}

impl Buffer {
	/// Consumes up to `max_count` bytes through `consume`, one segment slice
	/// at a time. The closure returns how many of the offered bytes it took;
	/// taking fewer stops the walk.
	fn read_segments(
		&mut self,
		max_count: usize,
		mut consume: impl FnMut(&[u8]) -> Result<usize>,
	) -> Result<usize> {
		let mut remaining = min(max_count, self.len);
		let mut total = 0;
		while remaining > 0 {
			let head = self.segments.front_mut()
				.expect("size accounts for a front segment");
			let offered = min(remaining, head.len());
			let consumed = consume(&head.data()[..offered])?;
			debug_assert!(consumed <= offered, "consumed more than offered");
			head.consume(consumed);

			self.len -= consumed;
			total += consumed;
			remaining -= consumed;
			self.release_head();
			if consumed < offered { break }
		}
		Ok(total)
	}

	/// Reads one [`u8`] from the front of the buffer.
	pub fn read_u8(&mut self) -> Result<u8> {
		Ok(self.read_array::<1>()?[0])
	}

	/// Reads one [`i8`] from the front of the buffer.
	pub fn read_i8(&mut self) -> Result<i8> {
		self.read_u8().map(|byte| byte as i8)
	}

	gen_int_reads! {
		read_u16 read_u16_le -> u16,
		read_i16 read_i16_le -> i16,
		read_u32 read_u32_le -> u32,
		read_i32 read_i32_le -> i32,
		read_u64 read_u64_le -> u64,
		read_i64 read_i64_le -> i64,
	}

	pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
		let mut array = [0; N];
		self.read_into_slice_exact(&mut array)?;
		Ok(array)
	}

	/// Pops bytes into `dst`, returning the number read.
	pub fn read_into_slice(&mut self, dst: &mut [u8]) -> usize {
		let mut offset = 0;
		while offset < dst.len() && !self.is_empty() {
			let head = self.segments.front_mut()
				.expect("size accounts for a front segment");
			let count = head.pop_into_slice(&mut dst[offset..]);
			self.len -= count;
			offset += count;
			self.release_head();
		}
		offset
	}

	/// Pops exactly `dst.len()` bytes into `dst`, consuming nothing on
	/// failure.
	pub fn read_into_slice_exact(&mut self, dst: &mut [u8]) -> Result {
		self.require(dst.len())?;
		let read = self.read_into_slice(dst);
		debug_assert_eq!(read, dst.len(), "require guaranteed a full read");
		Ok(())
	}

	/// Pops `byte_count` bytes as a byte array.
	pub fn read_byte_array(&mut self, byte_count: usize) -> Result<Vec<u8>> {
		self.require(byte_count)?;
		let mut dst = vec![0; byte_count];
		self.read_into_slice(&mut dst);
		Ok(dst)
	}

	/// Pops all bytes as a byte array.
	pub fn read_byte_array_all(&mut self) -> Vec<u8> {
		let mut dst = vec![0; self.len];
		self.read_into_slice(&mut dst);
		dst
	}

	/// Pops `byte_count` bytes as an immutable [`ByteString`].
	pub fn read_byte_str(&mut self, byte_count: usize) -> Result<ByteString> {
		self.require(byte_count)?;
		let mut dst = ByteString::with_capacity(byte_count);
		self.read_segments(byte_count, |slice| {
			dst.extend_from_slice(slice);
			Ok(slice.len())
		})?;
		Ok(dst)
	}

	/// Pops all bytes as an immutable [`ByteString`].
	pub fn read_byte_str_all(&mut self) -> Result<ByteString> {
		let len = self.len;
		self.read_byte_str(len)
	}

	/// Pops `byte_count` bytes and decodes them as UTF-8, consuming nothing
	/// when the bytes are too few or invalid.
	pub fn read_utf8(&mut self, byte_count: usize) -> Result<String> {
		self.require(byte_count)?;
		let mut bytes = Vec::with_capacity(byte_count);
		self.for_slices(0, byte_count, |slice| bytes.extend_from_slice(slice));
		let str = from_utf8(&bytes)
			.map_err(|err| Error::invalid_utf8(Context::BufRead, err))?
			.to_owned();
		self.skip(byte_count);
		Ok(str)
	}

	/// Pops all bytes and decodes them as UTF-8.
	pub fn read_utf8_all(&mut self) -> Result<String> {
		let len = self.len;
		self.read_utf8(len)
	}

	/// Pops one line of UTF-8 text, excluding the `\n` or `\r\n` terminator.
	/// The last line needs no terminator; `None` means the buffer is empty.
	pub fn read_utf8_line(&mut self) -> Result<Option<String>> {
		let Some(newline) = self.index_of(b'\n', 0) else {
			return if self.is_empty() {
				Ok(None)
			} else {
				self.read_utf8_all().map(Some)
			}
		};

		let mut line = self.read_utf8(newline)?;
		self.skip(1);
		if line.ends_with('\r') {
			line.pop();
		}
		Ok(Some(line))
	}

	/// Pops `byte_count` bytes and decodes them under the named charset:
	/// `utf-8`, or `utf-32` as big-endian 4-byte code points.
	pub fn read_string(&mut self, byte_count: usize, charset: &str) -> Result<String> {
		match charset_by_name(charset) {
			Some(Charset::Utf8) => self.read_utf8(byte_count),
			Some(Charset::Utf32Be) => {
				if byte_count % 4 != 0 {
					return Err(Error::encoding(
						Context::BufRead,
						"UTF-32 data length not divisible by 4",
					))
				}

				let bytes = self.read_byte_array(byte_count)?;
				let mut str = String::with_capacity(byte_count / 4);
				for chunk in bytes.chunks_exact(4) {
					let point = u32::from_be_bytes(
						chunk.try_into().expect("chunks are 4 bytes"),
					);
					str.push(char::from_u32(point).ok_or_else(||
						Error::encoding(Context::BufRead, "invalid UTF-32 code point")
					)?);
				}
				Ok(str)
			}
			None => Err(Error::unsupported(Context::BufRead, "encoding")),
		}
	}

	/// Pops `byte_count` bytes into `writer`.
	pub fn read_std<W: Write>(&mut self, writer: &mut W, byte_count: usize) -> Result<usize> {
		self.read_segments(byte_count, |slice| {
			writer.write_all(slice)
				.map_err(|err| Error::io(Context::BufRead, err))?;
			Ok(slice.len())
		})
	}

	/// Copies `byte_count` bytes starting at `offset` into `writer` without
	/// consuming them.
	pub fn copy_to_std<W: Write>(&self, writer: &mut W, offset: usize, byte_count: usize) -> Result<usize> {
		if offset.checked_add(byte_count).map_or(true, |end| end > self.len) {
			return Err(Error::out_of_range(Context::BufCopy))
		}

		let mut result = Ok(());
		self.for_slices(offset, byte_count, |slice| {
			if result.is_ok() {
				result = writer.write_all(slice);
			}
		});
		result.map_err(|err| Error::io(Context::BufCopy, err))?;
		Ok(byte_count)
	}

	/// Moves all bytes into `sink`, returning the number moved.
	pub fn read_all_into(&mut self, sink: &mut impl Sink) -> Result<usize> {
		sink.write_all(self).context(Context::BufRead)
	}
}

impl Source for Buffer {
	/// Moves up to `byte_count` bytes to `sink`, returning the number moved.
	/// An empty buffer is exhausted, so the move count is `0`; a request for
	/// zero bytes reads the same way, matching byte-stream semantics.
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		let count = min(byte_count, self.len);
		if count == 0 {
			return Ok(0)
		}
		sink.write(self, count).context(Context::BufRead)
	}

	fn read_all(&mut self, sink: &mut Buffer) -> Result<usize> {
		let len = self.len;
		self.read(sink, len)
	}
}
