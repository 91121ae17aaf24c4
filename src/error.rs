// SPDX-License-Identifier: Apache-2.0

use std::fmt::{self, Display, Formatter};
use std::{io, result};
use simdutf8::compat::Utf8Error;
use thiserror::Error;

pub type Result<T = ()> = result::Result<T, self::Error>;

/// The operation in progress when an error occurred.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum Context {
	#[default]
	Unknown,
	BufRead,
	BufWrite,
	BufCopy,
	BufFlush,
	BufClose,
	Inflate,
	Deflate,
	Gzip,
}

impl Display for Context {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Unknown  => "unknown operation",
			Self::BufRead  => "read from buffer",
			Self::BufWrite => "write to buffer",
			Self::BufCopy  => "copy buffer",
			Self::BufFlush => "flush buffer",
			Self::BufClose => "close stream",
			Self::Inflate  => "inflate",
			Self::Deflate  => "deflate",
			Self::Gzip     => "gzip",
		})
	}
}

#[derive(Debug, Error)]
pub enum ErrorKind {
	#[error("end of data")]
	Eos,
	#[error("out of range")]
	OutOfRange,
	#[error("stream closed")]
	Closed,
	#[error("invalid UTF-8")]
	InvalidUtf8(#[source] Utf8Error),
	#[error("encoding error: {0}")]
	Encoding(&'static str),
	#[error("unsupported {0}")]
	Unsupported(&'static str),
	#[error("IO error")]
	Io(#[source] io::Error),
	#[error("timed out")]
	TimedOut,
}

#[derive(Debug, Error)]
#[error("{context}: {kind}")]
pub struct Error {
	context: Context,
	#[source]
	kind: ErrorKind,
}

impl Error {
	pub(crate) fn new(context: Context, kind: ErrorKind) -> Self {
		Self { context, kind }
	}

	/// Creates a new "end of data" error.
	pub fn eos(context: Context) -> Self {
		Self::new(context, ErrorKind::Eos)
	}

	/// Creates a new "out of range" error.
	pub fn out_of_range(context: Context) -> Self {
		Self::new(context, ErrorKind::OutOfRange)
	}

	/// Creates a new "closed" error.
	pub fn closed(context: Context) -> Self {
		Self::new(context, ErrorKind::Closed)
	}

	/// Creates a new UTF-8 error.
	pub fn invalid_utf8(context: Context, error: Utf8Error) -> Self {
		Self::new(context, ErrorKind::InvalidUtf8(error))
	}

	/// Creates a new encoding error.
	pub fn encoding(context: Context, message: &'static str) -> Self {
		Self::new(context, ErrorKind::Encoding(message))
	}

	/// Creates a new "unsupported" error.
	pub fn unsupported(context: Context, what: &'static str) -> Self {
		Self::new(context, ErrorKind::Unsupported(what))
	}

	/// Creates a new IO error.
	pub fn io(context: Context, error: io::Error) -> Self {
		Self::new(context, ErrorKind::Io(error))
	}

	/// Creates a new "timed out" error.
	pub fn timed_out(context: Context) -> Self {
		Self::new(context, ErrorKind::TimedOut)
	}

	pub fn context(&self) -> Context { self.context }

	pub fn kind(&self) -> &ErrorKind { &self.kind }

	/// Returns `true` if this error signals exhausted data.
	pub fn is_eos(&self) -> bool {
		matches!(self.kind, ErrorKind::Eos)
	}

	/// Returns `true` if this error signals an operation on a closed stream.
	pub fn is_closed(&self) -> bool {
		matches!(self.kind, ErrorKind::Closed)
	}

	/// Replaces the operation context.
	pub fn with_context(mut self, context: Context) -> Self {
		self.context = context;
		self
	}

	pub(crate) fn into_io(self) -> io::Error {
		match &self.kind {
			ErrorKind::Eos      => io::Error::new(io::ErrorKind::UnexpectedEof, self),
			ErrorKind::TimedOut => io::Error::new(io::ErrorKind::TimedOut, self),
			ErrorKind::Io(err)  => {
				let kind = err.kind();
				io::Error::new(kind, self)
			}
			_ => io::Error::other(self),
		}
	}
}

impl From<io::Error> for Error {
	fn from(value: io::Error) -> Self {
		if let io::ErrorKind::UnexpectedEof = value.kind() {
			Self::eos(Context::Unknown)
		} else {
			Self::io(Context::Unknown, value)
		}
	}
}

/// Attaches an operation [`Context`] to errors in a result.
pub trait ResultContext<T> {
	fn context(self, context: Context) -> Result<T>;
}

impl<T> ResultContext<T> for Result<T> {
	fn context(self, context: Context) -> Result<T> {
		self.map_err(|err| err.with_context(context))
	}
}
