// SPDX-License-Identifier: Apache-2.0

//! ## How it works
//!
//! Data is written to and read from reusable pages of memory called *segments*.
//! When a segment is fully consumed, it's returned to a process-wide *pool*; to
//! write data, segments are claimed from this pool, allocating only when the
//! pool runs dry. The pool keeps at most [`pool::MAX_SIZE`] bytes of segments.
//!
//! ### Segments
//!
//! A segment is one fixed page of [`SEGMENT_SIZE`] bytes with a read cursor and
//! a write cursor. Segments within a [`Buffer`] form a ring read from the front
//! and written at the back. Moving data between buffers prefers handing whole
//! segments over by pointer; when a transfer would cut a segment in two, pieces
//! of at least [`SHARE_MINIMUM`] bytes share the underlying page instead of
//! copying it. Shared pages are read-only until all but one reference drops.
//!
//! ### Streams
//!
//! [`streams::Source`] and [`streams::Sink`] describe everything that can move
//! bytes into or out of a buffer. The buffered wrappers layer typed reads and
//! writes over any raw stream, and the deflate/gzip adapters layer RFC 1951 and
//! RFC 1952 codecs over the same two traits.

mod buffer;
mod byte_str;
mod error;
pub mod pool;
mod segment;
pub mod streams;

pub use buffer::*;
pub use byte_str::*;
pub use error::*;

/// The fixed page size of a segment, in bytes.
pub const SEGMENT_SIZE: usize = 2048;
/// The smallest piece of a segment that is split by sharing its page rather
/// than copying. Pieces under this threshold copy; aliasing them would litter
/// buffers with many small read-only segments.
pub const SHARE_MINIMUM: usize = 1024;
