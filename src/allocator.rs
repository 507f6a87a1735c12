//! Replaceable allocator for sample buffers.
//!
//! [`WaveFile`](crate::WaveFile) obtains and releases its scratch buffers through the
//! allocator installed with [`set_allocator()`]. The override is process-wide and is
//! meant to be installed once at startup, before any file is opened.

use std::sync::{Arc, RwLock};

/// Allocator for the byte buffers used by the library.
///
/// Any state the allocator needs is kept in the implementing value itself.
pub trait Allocator: Send + Sync {
    /// Returns a zero-filled buffer of `size` bytes.
    fn allocate(&self, size: usize) -> Vec<u8>;

    /// Resizes `buf` to `size` bytes. The existing contents up to the smaller of
    /// the old and new sizes are kept and new bytes are zero.
    fn reallocate(&self, buf: Vec<u8>, size: usize) -> Vec<u8>;

    /// Releases `buf`.
    fn free(&self, buf: Vec<u8>);
}

/// The default allocator, which uses the global heap allocator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultAllocator;

impl Allocator for DefaultAllocator {
    fn allocate(&self, size: usize) -> Vec<u8> {
        vec![0u8; size]
    }

    fn reallocate(&self, mut buf: Vec<u8>, size: usize) -> Vec<u8> {
        buf.resize(size, 0);
        buf
    }

    fn free(&self, buf: Vec<u8>) {
        drop(buf);
    }
}

static ALLOCATOR: RwLock<Option<Arc<dyn Allocator>>> = RwLock::new(None);

/// Installs `allocator` as the process-wide allocator for sample buffers.
pub fn set_allocator(allocator: Arc<dyn Allocator>) {
    let mut guard = ALLOCATOR.write().unwrap_or_else(|e| e.into_inner());
    *guard = Some(allocator);
}

/// Restores the default allocator.
pub fn reset_allocator() {
    let mut guard = ALLOCATOR.write().unwrap_or_else(|e| e.into_inner());
    *guard = None;
}

fn current() -> Option<Arc<dyn Allocator>> {
    let guard = ALLOCATOR.read().unwrap_or_else(|e| e.into_inner());
    guard.clone()
}

pub(crate) fn alloc(size: usize) -> Vec<u8> {
    match current() {
        Some(a) => a.allocate(size),
        None => DefaultAllocator.allocate(size),
    }
}

pub(crate) fn realloc(buf: Vec<u8>, size: usize) -> Vec<u8> {
    if buf.capacity() == 0 {
        return alloc(size);
    }
    match current() {
        Some(a) => a.reallocate(buf, size),
        None => DefaultAllocator.reallocate(buf, size),
    }
}

/// Freeing an empty buffer is a no-op.
pub(crate) fn free(buf: Vec<u8>) {
    if buf.capacity() == 0 {
        return;
    }
    match current() {
        Some(a) => a.free(buf),
        None => DefaultAllocator.free(buf),
    }
}
