//! Audio format contract and output device sessions

pub mod device;
pub mod format;
pub mod output;
pub mod source;

pub use device::{write_chunk, AudioDevice, DeviceError, DeviceOpener};
pub use format::{FormatError, PcmFileInfo};
pub use output::{CpalDevice, CpalOpener};
pub use source::{FileOpener, PcmSource, SourceOpener};
