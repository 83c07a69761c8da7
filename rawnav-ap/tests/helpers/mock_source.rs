//! File-backed sources with read failure injection

use rawnav_ap::audio::{PcmSource, SourceOpener};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Test-side control over every source opened by a [`MockSourceOpener`]
#[derive(Debug, Clone, Default)]
pub struct MockSourceHandle {
    /// Reads that fail before the sources recover
    pending_faults: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
}

impl MockSourceHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next read of whichever source reads first
    pub fn inject_read_error(&self) {
        self.pending_faults.fetch_add(1, Ordering::SeqCst);
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn take_fault(&self) -> bool {
        self.pending_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

pub struct MockSource {
    file: File,
    handle: MockSourceHandle,
}

impl Read for MockSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.handle.take_fault() {
            return Err(io::Error::new(io::ErrorKind::Other, "injected read failure"));
        }
        self.file.read(buf)
    }
}

impl Seek for MockSource {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl PcmSource for MockSource {
    fn byte_len(&self) -> io::Result<u64> {
        self.file.byte_len()
    }
}

pub struct MockSourceOpener {
    handle: MockSourceHandle,
}

impl MockSourceOpener {
    pub fn new(handle: MockSourceHandle) -> Self {
        Self { handle }
    }
}

impl SourceOpener for MockSourceOpener {
    fn open(&self, path: &Path) -> io::Result<Box<dyn PcmSource>> {
        let file = File::open(path)?;
        self.handle.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockSource {
            file,
            handle: self.handle.clone(),
        }))
    }
}
