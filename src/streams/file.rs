// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io;
use std::path::Path;
use super::{ReaderSource, WriterSink};

/// A [`Source`](super::Source) reading from a [`File`].
pub type FileSource = ReaderSource<File>;

/// A [`Sink`](super::Sink) writing to a [`File`].
pub type FileSink = WriterSink<File>;

impl ReaderSource<File> {
	pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
		File::open(path).map(Self::new)
	}
}

impl WriterSink<File> {
	pub fn create<P: AsRef<Path>>(path: P) -> io::Result<Self> {
		File::create(path).map(Self::new)
	}
}
