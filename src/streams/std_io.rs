// SPDX-License-Identifier: Apache-2.0

use std::io::{self, Read, Write};
use crate::{Buffer, Context, Error, Result, ResultContext, SEGMENT_SIZE};
use super::{Sink, Source, Timeout};

/// A [`Source`] reading from any std byte stream. This is the bridge that
/// turns file handles, sockets, and in-memory readers into sources; it also
/// enforces the attached [`Timeout`]'s deadline around blocking reads.
pub struct ReaderSource<R: Read> {
	reader: R,
	timeout: Timeout,
	closed: bool,
}

impl<R: Read> ReaderSource<R> {
	pub fn new(reader: R) -> Self {
		Self {
			reader,
			timeout: Timeout::new(),
			closed: false,
		}
	}

	pub fn timeout_mut(&mut self) -> &mut Timeout {
		&mut self.timeout
	}

	pub fn into_inner(self) -> R {
		self.reader
	}
}

impl<R: Read> Source for ReaderSource<R> {
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		if self.closed {
			return Err(Error::closed(Context::BufRead))
		}
		self.timeout.check(Context::BufRead)?;
		sink.write_std(&mut self.reader, byte_count)
			.context(Context::BufRead)
	}

	fn timeout(&self) -> &Timeout { &self.timeout }

	fn close_source(&mut self) -> Result {
		self.closed = true;
		Ok(())
	}
}

/// A [`Sink`] writing to any std byte stream, enforcing the attached
/// [`Timeout`]'s deadline around blocking writes.
pub struct WriterSink<W: Write> {
	writer: W,
	timeout: Timeout,
	closed: bool,
}

impl<W: Write> WriterSink<W> {
	pub fn new(writer: W) -> Self {
		Self {
			writer,
			timeout: Timeout::new(),
			closed: false,
		}
	}

	pub fn timeout_mut(&mut self) -> &mut Timeout {
		&mut self.timeout
	}
}

impl<W: Write> Sink for WriterSink<W> {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<usize> {
		if self.closed {
			return Err(Error::closed(Context::BufWrite))
		}
		self.timeout.check(Context::BufWrite)?;
		if byte_count > source.len() {
			return Err(Error::out_of_range(Context::BufWrite))
		}
		source.read_std(&mut self.writer, byte_count)
			.context(Context::BufWrite)
	}

	fn flush(&mut self) -> Result {
		if self.closed {
			return Err(Error::closed(Context::BufFlush))
		}
		self.writer
			.flush()
			.map_err(|err| Error::io(Context::BufFlush, err))
	}

	fn timeout(&self) -> &Timeout { &self.timeout }

	fn close_sink(&mut self) -> Result {
		if self.closed {
			return Ok(())
		}
		self.closed = true;
		self.writer
			.flush()
			.map_err(|err| Error::io(Context::BufClose, err))
	}
}

impl<W: Write> Drop for WriterSink<W> {
	fn drop(&mut self) {
		let _ = self.close_sink();
	}
}

/// Exposes any [`Source`] as a std [`Read`]. An empty staging buffer triggers
/// a blocking one-segment refill, so a read only reports end of input once
/// the source is truly exhausted.
pub struct SourceReader<S: Source> {
	source: S,
	buffer: Buffer,
}

impl<S: Source> SourceReader<S> {
	pub fn new(source: S) -> Self {
		Self {
			source,
			buffer: Buffer::new(),
		}
	}

	/// Returns the number of bytes readable without touching the wrapped
	/// source.
	pub fn available(&self) -> usize {
		self.buffer.len()
	}
}

impl<S: Source> Read for SourceReader<S> {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		if buf.is_empty() {
			return Ok(0)
		}
		if self.buffer.is_empty() {
			let read = self.source
				.read(&mut self.buffer, SEGMENT_SIZE)
				.map_err(Error::into_io)?;
			if read == 0 {
				return Ok(0)
			}
		}
		Ok(self.buffer.read_into_slice(buf))
	}
}

/// Exposes any [`Sink`] as a std [`Write`]. Bytes stage in a buffer; complete
/// segments push through on write, everything on flush.
pub struct SinkWriter<S: Sink> {
	sink: S,
	buffer: Buffer,
}

impl<S: Sink> SinkWriter<S> {
	pub fn new(sink: S) -> Self {
		Self {
			sink,
			buffer: Buffer::new(),
		}
	}
}

impl<S: Sink> Drop for SinkWriter<S> {
	fn drop(&mut self) {
		let _ = Write::flush(self);
	}
}

impl<S: Sink> Write for SinkWriter<S> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.buffer.write_from_slice(buf);
		let count = self.buffer.complete_segment_byte_count();
		if count > 0 {
			self.sink
				.write(&mut self.buffer, count)
				.map_err(Error::into_io)?;
		}
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		self.sink
			.write_all(&mut self.buffer)
			.map_err(Error::into_io)?;
		self.sink.flush().map_err(Error::into_io)
	}
}
