//! Raw PCM format contract
//!
//! Playable files are headerless signed 16-bit little-endian stereo at
//! 44.1kHz. There is no header to parse, so validation is limited to the
//! file size and a check that the first bytes are not a container magic.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use thiserror::Error;

pub const SAMPLE_RATE: u32 = 44_100;
pub const CHANNELS: u16 = 2;
pub const BYTES_PER_SAMPLE: u64 = 2;
pub const BYTES_PER_FRAME: u64 = BYTES_PER_SAMPLE * CHANNELS as u64;
pub const BYTES_PER_SECOND: u64 = BYTES_PER_FRAME * SAMPLE_RATE as u64;

/// Files below this size play, with a warning
pub const SHORT_FILE_BYTES: u64 = 1024;

/// Container formats recognized by their leading magic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    Wav,
    Ogg,
    Flac,
    Aiff,
}

impl Container {
    /// Identify a container from the first four bytes of a file
    pub fn detect(header: &[u8]) -> Option<Self> {
        match header.get(..4)? {
            b"RIFF" => Some(Container::Wav),
            b"OggS" => Some(Container::Ogg),
            b"fLaC" => Some(Container::Flac),
            b"FORM" => Some(Container::Aiff),
            _ => None,
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Container::Wav => "WAV",
            Container::Ogg => "OGG",
            Container::Flac => "FLAC",
            Container::Aiff => "AIFF",
        })
    }
}

/// Reasons a file is refused before playback starts
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("Cannot access file '{name}': {source}")]
    Access {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("File '{name}' is empty (0 bytes)")]
    Empty { name: String },

    #[error("File '{name}' too small for a single frame ({size} bytes < 4)")]
    TooSmall { name: String, size: u64 },

    #[error("File '{name}': size {size} bytes not multiple of 4. Required: stereo 16-bit RAW (2ch x 2bytes = 4bytes/frame)")]
    Misaligned { name: String, size: u64 },

    #[error("File '{name}' appears to be formatted audio ({container}), not raw PCM")]
    Container { name: String, container: Container },
}

/// Facts about a file that passed validation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PcmFileInfo {
    pub size: u64,
    pub duration_secs: f64,
    /// Below [`SHORT_FILE_BYTES`]; playback may be short
    pub short: bool,
}

/// Seconds of audio held in `bytes` at the fixed byte rate
pub fn duration_for_bytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_SECOND as f64
}

/// Round a byte offset down to a whole frame
pub fn align_to_frame(bytes: u64) -> u64 {
    bytes - bytes % BYTES_PER_FRAME
}

/// Display name used in messages: the final path component
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Validate a file against the format contract
pub fn probe(path: &Path) -> Result<PcmFileInfo, FormatError> {
    let name = display_name(path);
    let access = |source| FormatError::Access {
        name: name.clone(),
        source,
    };

    let mut file = File::open(path).map_err(access)?;
    let size = file.metadata().map_err(access)?.len();

    let mut header = [0u8; 4];
    let read = read_header(&mut file, &mut header).map_err(access)?;
    check(&name, size, &header[..read])
}

/// Size and header checks, in the order the rejections are reported
pub fn check(name: &str, size: u64, header: &[u8]) -> Result<PcmFileInfo, FormatError> {
    if size == 0 {
        return Err(FormatError::Empty { name: name.to_string() });
    }
    if size < BYTES_PER_FRAME {
        return Err(FormatError::TooSmall { name: name.to_string(), size });
    }
    if size % BYTES_PER_FRAME != 0 {
        return Err(FormatError::Misaligned { name: name.to_string(), size });
    }
    if let Some(container) = Container::detect(header) {
        return Err(FormatError::Container {
            name: name.to_string(),
            container,
        });
    }

    Ok(PcmFileInfo {
        size,
        duration_secs: duration_for_bytes(size),
        short: size < SHORT_FILE_BYTES,
    })
}

fn read_header(file: &mut File, header: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < header.len() {
        match file.read(&mut header[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Convert little-endian PCM bytes into interleaved samples
///
/// A trailing odd byte is ignored.
pub fn decode_le_samples(bytes: &[u8], out: &mut Vec<i16>) {
    out.clear();
    out.extend(
        bytes
            .chunks_exact(BYTES_PER_SAMPLE as usize)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]])),
    );
}
