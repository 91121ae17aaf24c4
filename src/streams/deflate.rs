// SPDX-License-Identifier: Apache-2.0

use std::cmp::min;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use crate::{Buffer, Context, Error, Result, ResultContext};
use super::{BufferedSink, BufferedSource, Sink, Source, Timeout};

/// A [`Source`] inflating a DEFLATE stream read from a wrapped source. The
/// engine is fed one upstream segment at a time and produces directly into
/// the sink buffer's writable tail.
pub struct InflaterSource<S: Source> {
	source: BufferedSource<S>,
	inflater: Decompress,
	finished: bool,
	closed: bool,
}

impl<S: Source> InflaterSource<S> {
	/// Inflates a zlib-framed stream (RFC 1950).
	pub fn new(source: S) -> Self {
		Self::with_inflater(source, Decompress::new(true))
	}

	/// Inflates a raw DEFLATE stream (RFC 1951) with no framing.
	pub fn raw(source: S) -> Self {
		Self::with_inflater(source, Decompress::new(false))
	}

	fn with_inflater(source: S, inflater: Decompress) -> Self {
		Self {
			source: BufferedSource::new(source),
			inflater,
			finished: false,
			closed: false,
		}
	}

	pub(crate) fn source_mut(&mut self) -> &mut BufferedSource<S> {
		&mut self.source
	}
}

impl<S: Source> Source for InflaterSource<S> {
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		if self.closed {
			return Err(Error::closed(Context::Inflate))
		}
		if self.finished || byte_count == 0 {
			return Ok(0)
		}

		loop {
			// Refill before inflating, so a truncated stream is caught once
			// the engine stalls with nothing left upstream.
			let exhausted = if self.source.buf().is_empty() {
				!self.source.request(1).context(Context::Inflate)?
			} else {
				false
			};

			let mut consumed = 0;
			let mut status = Status::Ok;
			let produced = sink.write_with(1, |out| {
				let out_len = min(out.len(), byte_count);
				let before_in = self.inflater.total_in();
				let before_out = self.inflater.total_out();
				let input = self.source.buf().head_data();
				status = self.inflater
					.decompress(input, &mut out[..out_len], FlushDecompress::None)
					.map_err(|_| Error::encoding(Context::Inflate, "invalid deflate stream"))?;
				consumed = (self.inflater.total_in() - before_in) as usize;
				Ok((self.inflater.total_out() - before_out) as usize)
			})?;

			if consumed > 0 {
				self.source.buf_mut().skip(consumed);
			}
			if produced > 0 {
				return Ok(produced)
			}
			match status {
				Status::StreamEnd => {
					self.finished = true;
					return Ok(0)
				}
				_ if exhausted => return Err(Error::eos(Context::Inflate)),
				_ => { }
			}
		}
	}

	fn timeout(&self) -> &Timeout {
		self.source.timeout()
	}

	fn close_source(&mut self) -> Result {
		if self.closed {
			return Ok(())
		}
		self.closed = true;
		self.source.close_source().context(Context::BufClose)
	}
}

impl<S: Source> Drop for InflaterSource<S> {
	fn drop(&mut self) {
		let _ = self.close_source();
	}
}

/// A [`Sink`] deflating written bytes into a wrapped sink. Output goes
/// straight into the buffered sink's buffer; complete segments push
/// downstream as they fill.
pub struct DeflaterSink<S: Sink> {
	sink: BufferedSink<S>,
	deflater: Compress,
	finished: bool,
	closed: bool,
}

impl<S: Sink> DeflaterSink<S> {
	/// Deflates into a zlib-framed stream (RFC 1950).
	pub fn new(sink: S) -> Self {
		Self::with_deflater(sink, Compress::new(Compression::default(), true))
	}

	/// Deflates into a raw DEFLATE stream (RFC 1951) with no framing.
	pub fn raw(sink: S) -> Self {
		Self::with_deflater(sink, Compress::new(Compression::default(), false))
	}

	fn with_deflater(sink: S, deflater: Compress) -> Self {
		Self {
			sink: BufferedSink::new(sink),
			deflater,
			finished: false,
			closed: false,
		}
	}

	pub(crate) fn buffered_mut(&mut self) -> &mut BufferedSink<S> {
		&mut self.sink
	}

	/// Finishes the DEFLATE stream, draining everything the encoder still
	/// holds. Idempotent.
	pub(crate) fn finish(&mut self) -> Result {
		while !self.finished {
			let mut status = Status::Ok;
			self.sink.buf_mut().write_with(1, |out| {
				let before = self.deflater.total_out();
				status = self.deflater
					.compress(&[], out, FlushCompress::Finish)
					.map_err(|_| Error::encoding(Context::Deflate, "deflate failure"))?;
				Ok((self.deflater.total_out() - before) as usize)
			})?;
			self.sink.emit_complete_segments()?;
			if let Status::StreamEnd = status {
				self.finished = true;
			}
		}
		Ok(())
	}

	fn process(&mut self, source: &mut Buffer, byte_count: usize) -> Result {
		let mut remaining = byte_count;
		while remaining > 0 {
			let mut consumed = 0;
			self.sink.buf_mut().write_with(1, |out| {
				let head = source.head_data();
				let input = &head[..min(head.len(), remaining)];
				let before_in = self.deflater.total_in();
				let before_out = self.deflater.total_out();
				self.deflater
					.compress(input, out, FlushCompress::None)
					.map_err(|_| Error::encoding(Context::Deflate, "deflate failure"))?;
				consumed = (self.deflater.total_in() - before_in) as usize;
				Ok((self.deflater.total_out() - before_out) as usize)
			})?;
			if consumed > 0 {
				source.skip(consumed);
				remaining -= consumed;
			}
			self.sink.emit_complete_segments()?;
		}
		Ok(())
	}
}

impl<S: Sink> Sink for DeflaterSink<S> {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<usize> {
		if self.closed {
			return Err(Error::closed(Context::Deflate))
		}
		if byte_count > source.len() {
			return Err(Error::out_of_range(Context::Deflate))
		}
		self.process(source, byte_count)?;
		Ok(byte_count)
	}

	/// Sync-flushes the encoder so everything written so far can decode
	/// downstream, then flushes the wrapped sink.
	fn flush(&mut self) -> Result {
		if self.closed {
			return Err(Error::closed(Context::Deflate))
		}
		loop {
			let mut space = 0;
			let produced = self.sink.buf_mut().write_with(1, |out| {
				space = out.len();
				let before = self.deflater.total_out();
				self.deflater
					.compress(&[], out, FlushCompress::Sync)
					.map_err(|_| Error::encoding(Context::Deflate, "deflate failure"))?;
				Ok((self.deflater.total_out() - before) as usize)
			})?;
			self.sink.emit_complete_segments()?;
			// A completely filled output means the encoder has more pending.
			if produced < space { break }
		}
		Sink::flush(&mut self.sink)
	}

	fn timeout(&self) -> &Timeout {
		self.sink.timeout()
	}

	fn close_sink(&mut self) -> Result {
		if self.closed {
			return Ok(())
		}
		self.closed = true;
		// Both steps run; the first error observed wins.
		let finished = self.finish();
		let closed = self.sink.close_sink();
		finished?;
		closed
	}
}

impl<S: Sink> Drop for DeflaterSink<S> {
	fn drop(&mut self) {
		let _ = self.close_sink();
	}
}
