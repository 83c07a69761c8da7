//! PCM byte sources
//!
//! The worker streams from a [`PcmSource`] obtained through a
//! [`SourceOpener`], mirroring how output sessions come from a
//! [`DeviceOpener`](crate::audio::device::DeviceOpener).

use std::fs::File;
use std::io::{self, Read, Seek};
use std::path::Path;

/// Seekable stream of raw PCM bytes
pub trait PcmSource: Read + Seek + Send {
    /// Current length in bytes
    fn byte_len(&self) -> io::Result<u64>;
}

impl PcmSource for File {
    fn byte_len(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

/// Factory for sources
pub trait SourceOpener: Send + Sync {
    fn open(&self, path: &Path) -> io::Result<Box<dyn PcmSource>>;
}

/// Opens plain files from the filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FileOpener;

impl SourceOpener for FileOpener {
    fn open(&self, path: &Path) -> io::Result<Box<dyn PcmSource>> {
        Ok(Box::new(File::open(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{SeekFrom, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_file_source_tracks_growing_length() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 16]).unwrap();
        file.flush().unwrap();

        let mut source = FileOpener.open(file.path()).unwrap();
        assert_eq!(source.byte_len().unwrap(), 16);

        file.write_all(&[0u8; 8]).unwrap();
        file.flush().unwrap();
        assert_eq!(source.byte_len().unwrap(), 24);
        assert_eq!(source.seek(SeekFrom::End(0)).unwrap(), 24);
    }
}
