// SPDX-License-Identifier: Apache-2.0

//! Streaming contracts and adapters. The fundamental operation either way is
//! moving up to N bytes into or out of a [`Buffer`]: a [`Source`] produces
//! bytes into a buffer, a [`Sink`] consumes bytes out of one. Everything else
//! — buffering, byte-stream bridges, compression — layers over those two
//! traits.

mod buffered;
mod deflate;
mod file;
mod gzip;
mod std_io;

pub use buffered::*;
pub use deflate::*;
pub use file::*;
pub use gzip::*;
pub use std_io::*;

use std::cmp::min;
use std::time::{Duration, Instant};
use crate::{Buffer, Context, Error, Result, SEGMENT_SIZE};

static NO_TIMEOUT: Timeout = Timeout { timeout: None, deadline: None };

/// A data source.
pub trait Source {
	/// Moves up to `byte_count` bytes into `sink`, returning the number
	/// moved. `Ok(0)` means the source is exhausted: no more bytes will ever
	/// arrive. Transport failures are errors, which keeps exhaustion and
	/// failure distinguishable.
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize>;

	/// Moves bytes into `sink` until the source is exhausted, returning the
	/// total.
	fn read_all(&mut self, sink: &mut Buffer) -> Result<usize> {
		let mut total = 0;
		loop {
			let read = self.read(sink, SEGMENT_SIZE)?;
			if read == 0 { break }
			total += read;
		}
		Ok(total)
	}

	/// Returns the timeout governing blocking reads. Sources with no policy
	/// of their own share a no-op.
	fn timeout(&self) -> &Timeout { Timeout::none() }

	/// Closes the source. Closing is idempotent, and sources also close when
	/// dropped.
	fn close_source(&mut self) -> Result { Ok(()) }
}

/// A data sink.
pub trait Sink {
	/// Moves exactly `byte_count` bytes from `source` into the sink. Fails
	/// with "out of range" when `source` holds fewer bytes.
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<usize>;

	/// Moves all of `source` into the sink, returning the number moved.
	fn write_all(&mut self, source: &mut Buffer) -> Result<usize> {
		let len = source.len();
		self.write(source, len)
	}

	/// Writes any buffered bytes through to the underlying resource.
	fn flush(&mut self) -> Result { Ok(()) }

	/// Returns the timeout governing blocking writes.
	fn timeout(&self) -> &Timeout { Timeout::none() }

	/// Flushes and closes the sink. Closing is idempotent, and sinks also
	/// close when dropped.
	fn close_sink(&mut self) -> Result { self.flush() }
}

/// Wraps any source in a [`BufferedSource`].
pub trait SourceBuffer: Source + Sized {
	fn buffer(self) -> BufferedSource<Self> { BufferedSource::new(self) }
}

impl<S: Source> SourceBuffer for S { }

/// Wraps any sink in a [`BufferedSink`].
pub trait SinkBuffer: Sink + Sized {
	fn buffer(self) -> BufferedSink<Self> { BufferedSink::new(self) }
}

impl<S: Sink> SinkBuffer for S { }

/// A timeout policy carried alongside a source or sink. The core defines the
/// contract; the concrete transports consult it around blocking calls.
#[derive(Clone, Debug, Default)]
pub struct Timeout {
	timeout: Option<Duration>,
	deadline: Option<Instant>,
}

impl Timeout {
	pub fn new() -> Self { Self::default() }

	/// Returns the shared no-op timeout.
	pub fn none() -> &'static Self { &NO_TIMEOUT }

	/// Caps the duration of a single blocking call.
	pub fn set_timeout(&mut self, duration: Duration) {
		self.timeout = Some(duration);
	}

	pub fn clear_timeout(&mut self) {
		self.timeout = None;
	}

	pub fn timeout(&self) -> Option<Duration> { self.timeout }

	/// Sets an absolute point after which blocking calls fail.
	pub fn set_deadline(&mut self, deadline: Instant) {
		self.deadline = Some(deadline);
	}

	/// Sets the deadline to `duration` from now.
	pub fn deadline_after(&mut self, duration: Duration) {
		self.set_deadline(Instant::now() + duration);
	}

	pub fn clear_deadline(&mut self) {
		self.deadline = None;
	}

	pub fn deadline(&self) -> Option<Instant> { self.deadline }

	/// Fails with "timed out" once the deadline has passed.
	pub fn check(&self, context: Context) -> Result {
		match self.deadline {
			Some(deadline) if Instant::now() >= deadline => {
				Err(Error::timed_out(context))
			}
			_ => Ok(()),
		}
	}
}

impl Source for &[u8] {
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		let count = min(byte_count, self.len());
		sink.write_from_slice(&self[..count]);
		*self = &self[count..];
		Ok(count)
	}
}

impl<S: Source + ?Sized> Source for &mut S {
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		(**self).read(sink, byte_count)
	}

	fn read_all(&mut self, sink: &mut Buffer) -> Result<usize> {
		(**self).read_all(sink)
	}

	fn timeout(&self) -> &Timeout {
		(**self).timeout()
	}

	fn close_source(&mut self) -> Result {
		(**self).close_source()
	}
}

impl<S: Sink + ?Sized> Sink for &mut S {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<usize> {
		(**self).write(source, byte_count)
	}

	fn write_all(&mut self, source: &mut Buffer) -> Result<usize> {
		(**self).write_all(source)
	}

	fn flush(&mut self) -> Result {
		(**self).flush()
	}

	fn timeout(&self) -> &Timeout {
		(**self).timeout()
	}

	fn close_sink(&mut self) -> Result {
		(**self).close_sink()
	}
}
