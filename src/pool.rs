// SPDX-License-Identifier: Apache-2.0

//! Process-wide segment recycling. The pool is lazily initialised on first
//! claim and never torn down; segments recycled once the pool is at capacity
//! are simply dropped.

use std::sync::{Mutex, PoisonError};
use once_cell::sync::Lazy;
use crate::segment::Segment;
use crate::SEGMENT_SIZE;

/// The maximum number of bytes the pool retains.
pub const MAX_SIZE: usize = 64 * 1024;

static POOL: Lazy<SegmentPool> = Lazy::new(SegmentPool::default);

/// A free list of [`Segment`]s shared by every buffer in the process. Claim
/// and recycle hold the lock for O(1) work.
#[derive(Default)]
pub struct SegmentPool {
	inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
	segments: Vec<Segment>,
	byte_count: usize,
}

impl SegmentPool {
	/// Returns the process-wide pool.
	pub fn get() -> &'static Self { &POOL }

	/// Returns the number of bytes currently pooled.
	pub fn byte_count(&self) -> usize {
		self.lock().byte_count
	}

	/// Claims one empty, exclusively owned segment, allocating if the pool is
	/// empty.
	pub(crate) fn take(&self) -> Segment {
		let mut inner = self.lock();
		match inner.segments.pop() {
			Some(segment) => {
				inner.byte_count -= SEGMENT_SIZE;
				segment
			}
			None => Segment::new(),
		}
	}

	/// Returns a segment to the pool. Segments whose page is still aliased,
	/// and segments arriving while the pool is full, are dropped instead.
	pub(crate) fn recycle(&self, mut segment: Segment) {
		if !segment.reset() {
			return
		}

		let mut inner = self.lock();
		if inner.byte_count + SEGMENT_SIZE > MAX_SIZE {
			return
		}
		inner.byte_count += SEGMENT_SIZE;
		inner.segments.push(segment);
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
		self.inner.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

/// Claims a segment from the process-wide pool.
pub(crate) fn take() -> Segment {
	SegmentPool::get().take()
}

/// Recycles a segment into the process-wide pool.
pub(crate) fn recycle(segment: Segment) {
	SegmentPool::get().recycle(segment)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn byte_count_stays_capped() {
		let pool = SegmentPool::get();
		let segments: Vec<_> = (0..2 * MAX_SIZE / SEGMENT_SIZE)
			.map(|_| pool.take())
			.collect();
		let mut filled = segments;
		for seg in &mut filled {
			seg.push_slice(&[1; 16]);
		}
		for seg in filled {
			pool.recycle(seg);
		}
		assert!(pool.byte_count() <= MAX_SIZE);
	}

	#[test]
	fn shared_segments_are_dropped() {
		let pool = SegmentPool::get();
		let mut seg = pool.take();
		seg.push_slice(b"shared");
		let view = seg.share_all();
		// A shared page can't be reset for reuse, so recycle drops it.
		assert!(!seg.reset());
		pool.recycle(seg);
		drop(view);
		assert!(pool.byte_count() <= MAX_SIZE);
	}
}
