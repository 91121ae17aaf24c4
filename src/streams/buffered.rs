// SPDX-License-Identifier: Apache-2.0

use std::mem;
use crate::{Buffer, ByteString, Context, Error, Result, ResultContext, SEGMENT_SIZE};
use super::{Sink, Source, Timeout};

macro_rules! gen_buffered_reads {
	($($name:ident -> $ty:ident,)+) => {
		$(
		#[doc = concat!("Reads one [`", stringify!($ty), "`], refilling from the wrapped source as needed.")]
		pub fn $name(&mut self) -> Result<$ty> {
			self.require(mem::size_of::<$ty>())?;
			self.buffer.$name()
		}
		)+
	};
}

macro_rules! gen_buffered_writes {
	($($name:ident -> $ty:ident,)+) => {
		$(
		#[doc = concat!("Writes one [`", stringify!($ty), "`] into the buffer, emitting complete segments downstream.")]
		pub fn $name(&mut self, value: $ty) -> Result {
			self.check_open()?;
			self.buffer.$name(value);
			self.emit_complete_segments()
		}
		)+
	};
}

/// Wraps a raw [`Source`] with an owned internal [`Buffer`] and typed reads.
/// Data is pulled from the wrapped source one segment-full at a time, on
/// demand.
pub struct BufferedSource<S: Source> {
	buffer: Buffer,
	source: S,
	closed: bool,
}

impl<S: Source> BufferedSource<S> {
	pub fn new(source: S) -> Self {
		Self {
			buffer: Buffer::new(),
			source,
			closed: false,
		}
	}

	/// Returns the internal buffer.
	pub fn buf(&self) -> &Buffer { &self.buffer }

	/// Returns the internal buffer, which callers may inspect or pre-populate.
	pub fn buf_mut(&mut self) -> &mut Buffer { &mut self.buffer }

	/// Refills until the buffer holds at least `byte_count` bytes, returning
	/// whether it does. `Ok(false)` means the wrapped source was exhausted
	/// first.
	pub fn request(&mut self, byte_count: usize) -> Result<bool> {
		self.check_open()?;
		while self.buffer.len() < byte_count {
			let read = self.source
				.read(&mut self.buffer, SEGMENT_SIZE)
				.context(Context::BufRead)?;
			if read == 0 {
				return Ok(false)
			}
		}
		Ok(true)
	}

	/// Refills until the buffer holds at least `byte_count` bytes, failing
	/// with "end of data" when the wrapped source is exhausted first.
	pub fn require(&mut self, byte_count: usize) -> Result {
		if self.request(byte_count)? {
			Ok(())
		} else {
			Err(Error::eos(Context::BufRead))
		}
	}

	/// Returns `true` once the buffer is empty and the wrapped source is
	/// exhausted.
	pub fn exhausted(&mut self) -> Result<bool> {
		Ok(!self.request(1)?)
	}

	pub fn read_u8(&mut self) -> Result<u8> {
		self.require(1)?;
		self.buffer.read_u8()
	}

	pub fn read_i8(&mut self) -> Result<i8> {
		self.require(1)?;
		self.buffer.read_i8()
	}

	gen_buffered_reads! {
		read_u16 -> u16,
		read_u16_le -> u16,
		read_i16 -> i16,
		read_i16_le -> i16,
		read_u32 -> u32,
		read_u32_le -> u32,
		read_i32 -> i32,
		read_i32_le -> i32,
		read_u64 -> u64,
		read_u64_le -> u64,
		read_i64 -> i64,
		read_i64_le -> i64,
	}

	/// Reads `byte_count` bytes as an immutable [`ByteString`].
	pub fn read_byte_str(&mut self, byte_count: usize) -> Result<ByteString> {
		self.require(byte_count)?;
		self.buffer.read_byte_str(byte_count)
	}

	/// Reads everything up to exhaustion as an immutable [`ByteString`].
	pub fn read_byte_str_all(&mut self) -> Result<ByteString> {
		self.buffer_all()?;
		self.buffer.read_byte_str_all()
	}

	/// Reads `byte_count` bytes as a byte array.
	pub fn read_byte_array(&mut self, byte_count: usize) -> Result<Vec<u8>> {
		self.require(byte_count)?;
		self.buffer.read_byte_array(byte_count)
	}

	/// Reads everything up to exhaustion as a byte array.
	pub fn read_byte_array_all(&mut self) -> Result<Vec<u8>> {
		self.buffer_all()?;
		Ok(self.buffer.read_byte_array_all())
	}

	/// Reads `byte_count` bytes of UTF-8.
	pub fn read_utf8(&mut self, byte_count: usize) -> Result<String> {
		self.require(byte_count)?;
		self.buffer.read_utf8(byte_count)
	}

	/// Reads UTF-8 up to exhaustion.
	pub fn read_utf8_all(&mut self) -> Result<String> {
		self.buffer_all()?;
		self.buffer.read_utf8_all()
	}

	/// Reads one line of UTF-8 text, excluding the `\n` or `\r\n` terminator.
	/// `None` means the source was already exhausted.
	pub fn read_utf8_line(&mut self) -> Result<Option<String>> {
		// Buffers through the next newline, or everything at exhaustion.
		self.index_of(b'\n')?;
		self.buffer.read_utf8_line()
	}

	/// Reads `byte_count` bytes decoded under the named charset.
	pub fn read_string(&mut self, byte_count: usize, charset: &str) -> Result<String> {
		self.require(byte_count)?;
		self.buffer.read_string(byte_count, charset)
	}

	/// Reads bytes into `dst`, returning the number read; fewer only at
	/// exhaustion.
	pub fn read_into_slice(&mut self, mut dst: &mut [u8]) -> Result<usize> {
		let mut total = 0;
		while !dst.is_empty() && self.request(1)? {
			let read = self.buffer.read_into_slice(dst);
			total += read;
			dst = &mut dst[read..];
		}
		Ok(total)
	}

	/// Discards exactly `byte_count` bytes, failing with "end of data" when
	/// the source runs out first.
	pub fn skip(&mut self, byte_count: usize) -> Result {
		let mut remaining = byte_count;
		while remaining > 0 {
			if !self.request(1)? {
				return Err(Error::eos(Context::BufRead))
			}
			remaining -= self.buffer.skip(remaining);
		}
		Ok(())
	}

	/// Returns the offset of the first occurrence of `byte`, refilling from
	/// the wrapped source until found or exhausted.
	pub fn index_of(&mut self, byte: u8) -> Result<Option<usize>> {
		let mut from = 0;
		loop {
			if let Some(found) = self.buffer.index_of(byte, from) {
				return Ok(Some(found))
			}
			from = self.buffer.len();
			if !self.request(from + 1)? {
				return Ok(None)
			}
		}
	}

	/// Moves everything up to exhaustion into `sink`, returning the total.
	/// The internal buffer is flushed into `sink` after every segment-full
	/// pulled, bounding memory use to one segment beyond the input.
	pub fn read_all(&mut self, sink: &mut impl Sink) -> Result<usize> {
		self.check_open()?;
		let mut total = 0;
		loop {
			while !self.buffer.is_empty() {
				total += sink.write_all(&mut self.buffer)
					.context(Context::BufRead)?;
			}
			let read = self.source
				.read(&mut self.buffer, SEGMENT_SIZE)
				.context(Context::BufRead)?;
			if read == 0 { break }
		}
		Ok(total)
	}

	fn buffer_all(&mut self) -> Result {
		loop {
			let len = self.buffer.len();
			if !self.request(len + 1)? {
				return Ok(())
			}
		}
	}

	fn check_open(&self) -> Result {
		if self.closed {
			Err(Error::closed(Context::BufRead))
		} else {
			Ok(())
		}
	}
}

impl<S: Source> Source for BufferedSource<S> {
	/// Moves up to `byte_count` buffered bytes into `sink`, pulling one read
	/// from the wrapped source first when the buffer is empty.
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		self.check_open()?;
		if self.buffer.is_empty() {
			self.source
				.read(&mut self.buffer, SEGMENT_SIZE)
				.context(Context::BufRead)?;
		}
		Source::read(&mut self.buffer, sink, byte_count)
	}

	fn timeout(&self) -> &Timeout {
		self.source.timeout()
	}

	fn close_source(&mut self) -> Result {
		if self.closed {
			return Ok(())
		}
		self.closed = true;
		self.buffer.clear();
		self.source.close_source().context(Context::BufClose)
	}
}

impl<S: Source> Drop for BufferedSource<S> {
	fn drop(&mut self) {
		let _ = self.close_source();
	}
}

/// Wraps a raw [`Sink`] with an owned internal [`Buffer`] and typed writes.
/// Complete segments are pushed downstream as they fill; the partial tail
/// stays buffered until [`flush`](Sink::flush) or close.
pub struct BufferedSink<S: Sink> {
	buffer: Buffer,
	sink: S,
	closed: bool,
}

impl<S: Sink> BufferedSink<S> {
	pub fn new(sink: S) -> Self {
		Self {
			buffer: Buffer::new(),
			sink,
			closed: false,
		}
	}

	/// Returns the internal buffer.
	pub fn buf(&self) -> &Buffer { &self.buffer }

	/// Returns the internal buffer, which callers may pre-populate.
	pub fn buf_mut(&mut self) -> &mut Buffer { &mut self.buffer }

	pub fn write_u8(&mut self, value: u8) -> Result {
		self.check_open()?;
		self.buffer.write_u8(value);
		self.emit_complete_segments()
	}

	pub fn write_i8(&mut self, value: i8) -> Result {
		self.write_u8(value as u8)
	}

	gen_buffered_writes! {
		write_u16 -> u16,
		write_u16_le -> u16,
		write_i16 -> i16,
		write_i16_le -> i16,
		write_u32 -> u32,
		write_u32_le -> u32,
		write_i32 -> i32,
		write_i32_le -> i32,
		write_u64 -> u64,
		write_u64_le -> u64,
		write_i64 -> i64,
		write_i64_le -> i64,
	}

	/// Writes a slice of bytes.
	pub fn write_from_slice(&mut self, bytes: &[u8]) -> Result {
		self.check_open()?;
		self.buffer.write_from_slice(bytes);
		self.emit_complete_segments()
	}

	/// Writes the UTF-8 encoding of `value`.
	pub fn write_utf8(&mut self, value: &str) -> Result {
		self.write_from_slice(value.as_bytes())
	}

	/// Writes an immutable [`ByteString`].
	pub fn write_byte_str(&mut self, value: &ByteString) -> Result {
		self.write_from_slice(value.as_slice())
	}

	/// Writes `value` encoded under the named charset.
	pub fn write_string(&mut self, value: &str, charset: &str) -> Result {
		self.check_open()?;
		self.buffer.write_string(value, charset)?;
		self.emit_complete_segments()
	}

	/// Moves everything from `source` through the buffer into the wrapped
	/// sink, returning the total.
	pub fn write_all_from(&mut self, source: &mut impl Source) -> Result<usize> {
		self.check_open()?;
		let mut total = 0;
		loop {
			let read = source
				.read(&mut self.buffer, SEGMENT_SIZE)
				.context(Context::BufWrite)?;
			if read == 0 { break }
			total += read;
			self.emit_complete_segments()?;
		}
		Ok(total)
	}

	/// Pushes the buffer's complete segments to the wrapped sink, leaving a
	/// partial tail to keep filling.
	pub fn emit_complete_segments(&mut self) -> Result {
		let count = self.buffer.complete_segment_byte_count();
		if count > 0 {
			self.sink
				.write(&mut self.buffer, count)
				.context(Context::BufWrite)?;
		}
		Ok(())
	}

	/// Pushes the entire buffer to the wrapped sink without flushing it.
	pub fn emit(&mut self) -> Result {
		self.check_open()?;
		self.sink
			.write_all(&mut self.buffer)
			.context(Context::BufWrite)
			.map(drop)
	}

	fn check_open(&self) -> Result {
		if self.closed {
			Err(Error::closed(Context::BufWrite))
		} else {
			Ok(())
		}
	}
}

impl<S: Sink> Sink for BufferedSink<S> {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<usize> {
		self.check_open()?;
		let count = Sink::write(&mut self.buffer, source, byte_count)?;
		self.emit_complete_segments()?;
		Ok(count)
	}

	fn flush(&mut self) -> Result {
		if self.closed {
			return Err(Error::closed(Context::BufFlush))
		}
		// Both steps get a chance to run before an error returns.
		let emit = self.sink
			.write_all(&mut self.buffer)
			.context(Context::BufFlush);
		let flush = self.sink.flush().context(Context::BufFlush);
		emit?;
		flush
	}

	fn timeout(&self) -> &Timeout {
		self.sink.timeout()
	}

	fn close_sink(&mut self) -> Result {
		if self.closed {
			return Ok(())
		}
		self.closed = true;
		// Every step runs; the first error observed wins.
		let emit = self.sink
			.write_all(&mut self.buffer)
			.context(Context::BufClose)
			.map(drop);
		let close = self.sink.close_sink().context(Context::BufClose);
		self.buffer.clear();
		emit?;
		close
	}
}

impl<S: Sink> Drop for BufferedSink<S> {
	fn drop(&mut self) {
		let _ = self.close_sink();
	}
}
