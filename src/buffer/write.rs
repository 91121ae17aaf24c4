// SPDX-License-Identifier: Apache-2.0

use std::cmp::min;
use std::io::Read;
use crate::{pool, Context, Error, Result, SEGMENT_SIZE};
use crate::byte_str::ByteString;
use crate::streams::{Sink, Source};
use super::read::{charset_by_name, Charset};
use super::Buffer;

macro_rules! gen_int_writes {
	($($be_name:ident $le_name:ident -> $ty:ident,)+) => {
		$(
		#[doc = concat!("Appends one big-endian [`", stringify!($ty), "`].")]
		pub fn $be_name(&mut self, value: $ty) {
			self.write_from_slice(&value.to_be_bytes());
		}

		#[doc = concat!("Appends one little-endian [`", stringify!($ty), "`].")]
		pub fn $le_name(&mut self, value: $ty) {
			self.write_from_slice(&value.to_le_bytes());
		}
		)+
	};
}

impl Buffer {
	/// Appends one [`u8`].
	pub fn write_u8(&mut self, value: u8) {
		self.write_from_slice(&[value]);
	}

	/// Appends one [`i8`].
	pub fn write_i8(&mut self, value: i8) {
		self.write_u8(value as u8);
	}

	gen_int_writes! {
		write_u16 write_u16_le -> u16,
		write_i16 write_i16_le -> i16,
		write_u32 write_u32_le -> u32,
		write_i32 write_i32_le -> i32,
		write_u64 write_u64_le -> u64,
		write_i64 write_i64_le -> i64,
	}

	/// Appends a slice of bytes.
	pub fn write_from_slice(&mut self, mut bytes: &[u8]) {
		while !bytes.is_empty() {
			let pushed = self.writable_segment(1).push_slice(bytes);
			self.len += pushed;
			bytes = &bytes[pushed..];
		}
	}

	/// Appends the UTF-8 encoding of `value`.
	pub fn write_utf8(&mut self, value: &str) {
		self.write_from_slice(value.as_bytes());
	}

	/// Appends an immutable [`ByteString`].
	pub fn write_byte_str(&mut self, value: &ByteString) {
		self.write_from_slice(value.as_slice());
	}

	/// Appends `value` encoded under the named charset: `utf-8`, or `utf-32`
	/// as big-endian 4-byte code points without a byte-order mark.
	pub fn write_string(&mut self, value: &str, charset: &str) -> Result {
		match charset_by_name(charset) {
			Some(Charset::Utf8) => {
				self.write_utf8(value);
				Ok(())
			}
			Some(Charset::Utf32Be) => {
				for char in value.chars() {
					self.write_u32(char as u32);
				}
				Ok(())
			}
			None => Err(Error::unsupported(Context::BufWrite, "encoding")),
		}
	}

	/// Fills the buffer with up to `byte_count` bytes from `reader`, stopping
	/// early only at end of input.
	pub fn write_std<R: Read>(&mut self, reader: &mut R, byte_count: usize) -> Result<usize> {
		let mut total = 0;
		while total < byte_count {
			let read = {
				let segment = self.writable_segment(1);
				let spare = min(segment.spare(), byte_count - total);
				let read = reader.read(&mut segment.spare_mut()[..spare])
					.map_err(|err| Error::io(Context::BufWrite, err))?;
				segment.added(read);
				read
			};
			if read == 0 { break }
			self.len += read;
			total += read;
		}
		Ok(total)
	}

	/// Fills the buffer from `reader` until end of input.
	pub fn write_std_all<R: Read>(&mut self, reader: &mut R) -> Result<usize> {
		let mut total = 0;
		loop {
			let read = self.write_std(reader, SEGMENT_SIZE)?;
			if read == 0 { break }
			total += read;
		}
		Ok(total)
	}

	/// Moves all bytes from `source` into the buffer, returning the number
	/// moved.
	pub fn write_all_from(&mut self, source: &mut impl Source) -> Result<usize> {
		let mut total = 0;
		loop {
			let read = source.read(self, SEGMENT_SIZE)?;
			if read == 0 { break }
			total += read;
		}
		Ok(total)
	}
}

impl Sink for Buffer {
	/// Moves exactly `byte_count` bytes from the front of `source` to the
	/// back of this buffer — the splice. Whole segments transfer by pointer.
	/// When the transfer ends inside the source's head segment, the bytes
	/// either copy into this buffer's tail when they fit there (possibly
	/// after compacting it), or the head splits, sharing its page for pieces
	/// of at least [`SHARE_MINIMUM`](crate::SHARE_MINIMUM) bytes. Whole
	/// segments small enough to fit the tail coalesce into it, so repeated
	/// short transfers still produce full segments.
	fn write(&mut self, source: &mut Buffer, mut byte_count: usize) -> Result<usize> {
		if byte_count > source.len {
			return Err(Error::out_of_range(Context::BufWrite))
		}
		let moved = byte_count;

		while byte_count > 0 {
			let head_len = source.segments.front()
				.expect("source size accounts for a front segment")
				.len();

			if byte_count < head_len {
				let absorb = self.segments.back().map_or(false, |tail|
					tail.is_writable() && tail.len() + byte_count <= SEGMENT_SIZE
				);
				if absorb {
					let head = source.segments.front_mut()
						.expect("head length was just read");
					let tail = self.segments.back_mut()
						.expect("absorb checked a tail");
					head.write_to(tail, byte_count);
					source.len -= byte_count;
					self.len += byte_count;
					break
				}

				// Split so the transfer below consumes whole segments.
				let head = source.segments.front_mut()
					.expect("head length was just read");
				let prefix = head.split(byte_count);
				source.segments.push_front(prefix);
				continue
			}

			let mut head = source.segments.pop_front()
				.expect("head length was just read");
			source.len -= head_len;

			let coalesce = self.segments.back().map_or(false, |tail|
				tail.is_writable() && tail.len() + head_len <= SEGMENT_SIZE
			);
			if coalesce {
				let tail = self.segments.back_mut()
					.expect("coalesce checked a tail");
				head.write_to(tail, head_len);
				pool::recycle(head);
			} else {
				self.segments.push_back(head);
			}
			self.len += head_len;
			byte_count -= head_len;
		}

		Ok(moved)
	}

	fn write_all(&mut self, source: &mut Buffer) -> Result<usize> {
		let len = source.len;
		self.write(source, len)
	}
}
