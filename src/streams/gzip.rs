// SPDX-License-Identifier: Apache-2.0

use flate2::Crc;
use crate::{Buffer, Context, Error, Result, ResultContext};
use super::{DeflaterSink, InflaterSource, Sink, Source, Timeout};

const FHCRC: u8 = 1 << 1;
const FEXTRA: u8 = 1 << 2;
const FNAME: u8 = 1 << 3;
const FCOMMENT: u8 = 1 << 4;
const RESERVED: u8 = 0xe0;

fn update_crc(crc: &mut Crc, buffer: &Buffer, offset: usize, byte_count: usize) {
	buffer.for_slices(offset, byte_count, |slice| crc.update(slice));
}

enum Section {
	Header,
	Body,
	Trailer,
	Done,
}

/// A [`Source`] reading one GZIP member (RFC 1952): the header with its
/// optional fields, a raw-DEFLATE body, and the CRC-32/length trailer, which
/// is verified against the inflated output.
pub struct GzipSource<S: Source> {
	inflater: InflaterSource<S>,
	crc: Crc,
	section: Section,
}

impl<S: Source> GzipSource<S> {
	pub fn new(source: S) -> Self {
		Self {
			inflater: InflaterSource::raw(source),
			crc: Crc::new(),
			section: Section::Header,
		}
	}

	fn consume_header(&mut self) -> Result {
		let crc = &mut self.crc;
		let source = self.inflater.source_mut();
		source.require(10).context(Context::Gzip)?;

		let flags = source.buf().get(3).expect("ten bytes were required");
		if flags & RESERVED != 0 {
			return Err(Error::unsupported(Context::Gzip, "gzip flag"))
		}
		let fhcrc = flags & FHCRC != 0;
		if fhcrc {
			update_crc(crc, source.buf(), 0, 10);
		}

		let magic = source.read_u16().context(Context::Gzip)?;
		if magic != 0x1f8b {
			return Err(Error::encoding(Context::Gzip, "bad gzip magic"))
		}
		let method = source.read_u8().context(Context::Gzip)?;
		if method != 8 {
			return Err(Error::unsupported(Context::Gzip, "gzip compression method"))
		}
		// The flag byte was inspected above; mtime, xfl and os go unchecked.
		source.skip(7).context(Context::Gzip)?;

		if flags & FEXTRA != 0 {
			source.require(2).context(Context::Gzip)?;
			if fhcrc {
				update_crc(crc, source.buf(), 0, 2);
			}
			let extra_len = source.read_u16_le().context(Context::Gzip)? as usize;
			source.require(extra_len).context(Context::Gzip)?;
			if fhcrc {
				update_crc(crc, source.buf(), 0, extra_len);
			}
			source.skip(extra_len).context(Context::Gzip)?;
		}

		if flags & FNAME != 0 {
			let end = source.index_of(0).context(Context::Gzip)?
				.ok_or_else(|| Error::eos(Context::Gzip))?;
			if fhcrc {
				update_crc(crc, source.buf(), 0, end + 1);
			}
			source.skip(end + 1).context(Context::Gzip)?;
		}

		if flags & FCOMMENT != 0 {
			let end = source.index_of(0).context(Context::Gzip)?
				.ok_or_else(|| Error::eos(Context::Gzip))?;
			if fhcrc {
				update_crc(crc, source.buf(), 0, end + 1);
			}
			source.skip(end + 1).context(Context::Gzip)?;
		}

		if fhcrc {
			let actual = source.read_u16_le().context(Context::Gzip)?;
			let expected = (crc.sum() & 0xffff) as u16;
			if actual != expected {
				return Err(Error::encoding(Context::Gzip, "crc mismatch"))
			}
			crc.reset();
		}
		Ok(())
	}

	fn consume_trailer(&mut self) -> Result {
		let source = self.inflater.source_mut();
		let crc_value = source.read_u32_le().context(Context::Gzip)?;
		if crc_value != self.crc.sum() {
			return Err(Error::encoding(Context::Gzip, "crc mismatch"))
		}
		let byte_count = source.read_u32_le().context(Context::Gzip)?;
		if byte_count != self.crc.amount() {
			return Err(Error::encoding(Context::Gzip, "size mismatch"))
		}
		Ok(())
	}
}

impl<S: Source> Source for GzipSource<S> {
	fn read(&mut self, sink: &mut Buffer, byte_count: usize) -> Result<usize> {
		if byte_count == 0 {
			return Ok(0)
		}

		if let Section::Header = self.section {
			self.consume_header()?;
			self.section = Section::Body;
		}

		if let Section::Body = self.section {
			let offset = sink.len();
			let read = self.inflater.read(sink, byte_count)?;
			if read > 0 {
				update_crc(&mut self.crc, sink, offset, read);
				return Ok(read)
			}
			self.section = Section::Trailer;
		}

		if let Section::Trailer = self.section {
			self.consume_trailer()?;
			self.section = Section::Done;
			// The trailer ends the member; trailing bytes are an error.
			if !self.inflater.source_mut().exhausted().context(Context::Gzip)? {
				return Err(Error::encoding(
					Context::Gzip,
					"gzip finished without exhausting source",
				))
			}
		}

		Ok(0)
	}

	fn timeout(&self) -> &Timeout {
		self.inflater.timeout()
	}

	fn close_source(&mut self) -> Result {
		self.inflater.close_source()
	}
}

/// A [`Sink`] writing one GZIP member around deflated bytes, tracking the
/// CRC-32 and length of the uncompressed input for the trailer.
pub struct GzipSink<S: Sink> {
	deflater: DeflaterSink<S>,
	crc: Crc,
	closed: bool,
}

impl<S: Sink> GzipSink<S> {
	pub fn new(sink: S) -> Self {
		let mut deflater = DeflaterSink::raw(sink);
		// Fixed header: magic, method 8, no flags, zero mtime, xfl and os.
		let header = deflater.buffered_mut().buf_mut();
		header.write_u16(0x1f8b);
		header.write_u8(8);
		header.write_u8(0);
		header.write_u32(0);
		header.write_u8(0);
		header.write_u8(0);
		Self {
			deflater,
			crc: Crc::new(),
			closed: false,
		}
	}
}

impl<S: Sink> Sink for GzipSink<S> {
	fn write(&mut self, source: &mut Buffer, byte_count: usize) -> Result<usize> {
		if self.closed {
			return Err(Error::closed(Context::Gzip))
		}
		if byte_count > source.len() {
			return Err(Error::out_of_range(Context::Gzip))
		}
		update_crc(&mut self.crc, source, 0, byte_count);
		Sink::write(&mut self.deflater, source, byte_count).context(Context::Gzip)
	}

	fn flush(&mut self) -> Result {
		if self.closed {
			return Err(Error::closed(Context::Gzip))
		}
		Sink::flush(&mut self.deflater).context(Context::Gzip)
	}

	fn timeout(&self) -> &Timeout {
		self.deflater.timeout()
	}

	fn close_sink(&mut self) -> Result {
		if self.closed {
			return Ok(())
		}
		self.closed = true;
		// Finish the deflate stream, write the trailer, close the wrapped
		// sink. Every step runs; the first error observed wins.
		let finished = self.deflater.finish();
		{
			let trailer = self.deflater.buffered_mut().buf_mut();
			trailer.write_u32_le(self.crc.sum());
			trailer.write_u32_le(self.crc.amount());
		}
		let closed = self.deflater.close_sink();
		finished.context(Context::Gzip)?;
		closed.context(Context::Gzip)
	}
}

impl<S: Sink> Drop for GzipSink<S> {
	fn drop(&mut self) {
		let _ = self.close_sink();
	}
}
