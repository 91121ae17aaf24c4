// SPDX-License-Identifier: Apache-2.0

mod read;
mod write;

use std::cmp::min;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use digest::Digest;
use md5::Md5;
use crate::{pool, Context, Error, Result, SEGMENT_SIZE};
use crate::byte_str::ByteString;
use crate::segment::{Segment, SegmentRing};

/// An in-memory FIFO queue of bytes, stored as a ring of pooled segments.
/// Writes append at the back, reads consume from the front, and transfers
/// between buffers move whole segments instead of copying wherever the
/// [splice rules](crate::streams::Sink::write) allow.
///
/// A buffer is both a [`Source`](crate::streams::Source) and a
/// [`Sink`](crate::streams::Sink), so it plugs into every stream adapter.
#[derive(Default)]
pub struct Buffer {
	segments: SegmentRing,
	len: usize,
}

impl Buffer {
	pub fn new() -> Self { Self::default() }

	/// Returns the number of readable bytes.
	pub fn len(&self) -> usize { self.len }

	pub fn is_empty(&self) -> bool { self.len == 0 }

	/// Recycles every segment, leaving the buffer empty.
	pub fn clear(&mut self) {
		self.len = 0;
		for segment in self.segments.drain(..) {
			pool::recycle(segment);
		}
	}

	/// Returns the byte at `index` without consuming anything, or `None` past
	/// the end.
	pub fn get(&self, index: usize) -> Option<u8> {
		if index >= self.len {
			return None
		}
		let mut offset = index;
		for segment in &self.segments {
			if offset < segment.len() {
				return Some(segment.data()[offset])
			}
			offset -= segment.len();
		}
		None
	}

	/// Returns the offset of the first occurrence of `byte` at or after
	/// `from`, or `None` if it doesn't appear.
	pub fn index_of(&self, byte: u8, from: usize) -> Option<usize> {
		let mut base = 0;
		for segment in &self.segments {
			let len = segment.len();
			if from < base + len {
				let start = from.saturating_sub(base);
				if let Some(found) = segment.data()[start..]
					.iter()
					.position(|&b| b == byte) {
					return Some(base + start + found)
				}
			}
			base += len;
		}
		None
	}

	/// Discards up to `byte_count` bytes from the front, recycling segments as
	/// they empty, and returns the number discarded.
	pub fn skip(&mut self, byte_count: usize) -> usize {
		let mut remaining = min(byte_count, self.len);
		let skipped = remaining;
		while remaining > 0 {
			let head = self.segments.front_mut()
				.expect("size accounts for a front segment");
			let count = min(remaining, head.len());
			head.consume(count);
			self.len -= count;
			remaining -= count;
			self.release_head();
		}
		skipped
	}

	/// Fails with "end of data" unless `byte_count` bytes are readable.
	pub fn require(&self, byte_count: usize) -> Result {
		if self.len < byte_count {
			Err(Error::eos(Context::BufRead))
		} else {
			Ok(())
		}
	}

	/// Copies `byte_count` bytes starting at `offset` to the back of `out`
	/// without consuming them. The copy shares this buffer's pages.
	pub fn copy_to(&self, out: &mut Buffer, mut offset: usize, mut byte_count: usize) -> Result {
		if offset.checked_add(byte_count).map_or(true, |end| end > self.len) {
			return Err(Error::out_of_range(Context::BufCopy))
		}

		for segment in &self.segments {
			if byte_count == 0 { break }
			let len = segment.len();
			if offset >= len {
				offset -= len;
				continue
			}

			let count = min(len - offset, byte_count);
			let mut view = segment.share(offset + count);
			view.consume(offset);
			out.segments.push_back(view);
			out.len += count;
			offset = 0;
			byte_count -= count;
		}
		Ok(())
	}

	/// Returns the current content as an immutable [`ByteString`] without
	/// consuming it.
	pub fn snapshot(&self) -> ByteString {
		let mut dst = ByteString::with_capacity(self.len);
		self.for_slices(0, self.len, |slice| dst.extend_from_slice(slice));
		dst
	}

	/// Returns the number of bytes in segments that can no longer grow. Stream
	/// adapters use this to decide how much is worth pushing downstream while
	/// leaving a partial tail to fill up.
	pub fn complete_segment_byte_count(&self) -> usize {
		let mut count = self.len;
		if let Some(tail) = self.segments.back() {
			if tail.spare() > 0 && tail.is_writable() {
				count -= tail.len();
			}
		}
		count
	}

	/// Walks `byte_count` readable bytes starting at `offset` as slices,
	/// without consuming them.
	pub(crate) fn for_slices(&self, mut offset: usize, mut byte_count: usize, mut f: impl FnMut(&[u8])) {
		for segment in &self.segments {
			if byte_count == 0 { break }
			let len = segment.len();
			if offset >= len {
				offset -= len;
				continue
			}

			let count = min(len - offset, byte_count);
			f(&segment.data()[offset..offset + count]);
			offset = 0;
			byte_count -= count;
		}
	}

	/// Returns the readable slice of the front segment, empty when the buffer
	/// is empty.
	pub(crate) fn head_data(&self) -> &[u8] {
		self.segments.front().map_or(&[], Segment::data)
	}

	/// Returns the tail segment, writable with at least `min_capacity` spare
	/// bytes, claiming a fresh one from the pool when the current tail is
	/// shared or too full.
	pub(crate) fn writable_segment(&mut self, min_capacity: usize) -> &mut Segment {
		debug_assert!(
			min_capacity <= SEGMENT_SIZE,
			"minimum capacity larger than a segment",
		);
		let claim = match self.segments.back() {
			Some(tail) => !tail.is_writable() || tail.spare() < min_capacity,
			None => true,
		};
		if claim {
			self.segments.push_back(pool::take());
		}
		self.segments.back_mut().expect("a tail was just ensured")
	}

	/// Lends the writable spare range of the tail segment to `write`, which
	/// returns how many bytes it produced.
	pub(crate) fn write_with(
		&mut self,
		min_capacity: usize,
		write: impl FnOnce(&mut [u8]) -> Result<usize>,
	) -> Result<usize> {
		let written = {
			let segment = self.writable_segment(min_capacity);
			let written = write(segment.spare_mut())?;
			segment.added(written);
			written
		};
		self.len += written;
		Ok(written)
	}

	/// Recycles the front segment once it's fully consumed.
	pub(crate) fn release_head(&mut self) {
		if self.segments.front().is_some_and(Segment::is_empty) {
			let head = self.segments.pop_front()
				.expect("front segment exists");
			pool::recycle(head);
		}
	}

}

impl Drop for Buffer {
	fn drop(&mut self) {
		self.clear();
	}
}

/// Copies by sharing pages: cloning never touches the byte data, and reads or
/// writes on either buffer leave the other unchanged.
impl Clone for Buffer {
	fn clone(&self) -> Self {
		let mut out = Buffer::new();
		self.copy_to(&mut out, 0, self.len)
			.expect("bounds cover the whole buffer");
		out
	}
}

impl From<&[u8]> for Buffer {
	fn from(value: &[u8]) -> Self {
		let mut buffer = Buffer::new();
		buffer.write_from_slice(value);
		buffer
	}
}

/// Equality over the logical byte sequence, whatever the segment layout.
impl PartialEq for Buffer {
	fn eq(&self, other: &Self) -> bool {
		self.len == other.len &&
		self.segments.iter()
			.flat_map(|seg| seg.data())
			.eq(other.segments.iter().flat_map(|seg| seg.data()))
	}
}

impl Eq for Buffer { }

impl Hash for Buffer {
	fn hash<H: Hasher>(&self, state: &mut H) {
		state.write_usize(self.len);
		for segment in &self.segments {
			state.write(segment.data());
		}
	}
}

impl Display for Buffer {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		if self.len == 0 {
			write!(f, "Buffer[size=0]")
		} else if self.len <= 16 {
			let mut data = Vec::with_capacity(self.len);
			self.for_slices(0, self.len, |slice| data.extend_from_slice(slice));
			write!(
				f,
				"Buffer[size={} data={}]",
				self.len,
				base16ct::lower::encode_string(&data),
			)
		} else {
			let mut md5 = Md5::new();
			self.for_slices(0, self.len, |slice| md5.update(slice));
			let digest = md5.finalize();
			write!(
				f,
				"Buffer[size={} md5={}]",
				self.len,
				base16ct::lower::encode_string(digest.as_slice()),
			)
		}
	}
}

impl Debug for Buffer {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		Display::fmt(self, f)
	}
}
