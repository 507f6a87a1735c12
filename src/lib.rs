//! # RIFF/WAVE Audio File Reader and Writer
//!
//! This crate contains [`WaveFile`] for reading, writing and appending RIFF/WAVE audio files.
//! Sample data can be PCM (8-bit unsigned, 16, 24, 32 and 64-bit signed integers),
//! IEEE floating point (32 and 64-bit), A-law or μ-law. The extensible format can be
//! created and its header fields can be set, but its sample data can't be read or written.
//!
//! WAVE files are made of chunks: the format chunk ("fmt ") describes the sample data,
//! the optional fact chunk ("fact") contains the sample frame count and the data chunk
//! ("data") contains interleaved little-endian sample data. Other chunks are skipped.
//!
//! Samples are read and written one channel buffer per channel. The samples are stored
//! in containers, whose width is the smallest power of two which fits the sample size:
//! 24-bit samples are read to and written from `i32` values. Signed integer samples are
//! sign-extended when they are widened.
//!
//! # Examples
//!
//! Reading samples:
//!
//! ```no_run
//! # fn example() -> wavefile::WaveResult<()> {
//! use wavefile::{OpenMode, WaveFile};
//!
//! let mut wave = WaveFile::open("test.wav", OpenMode::READ)?;
//! println!("{} channels, {} Hz, {} frames", wave.channels(), wave.sample_rate(), wave.length());
//! let mut left = vec![0i16; 1024];
//! let mut right = vec![0i16; 1024];
//! loop {
//!     let count = wave.read(&mut [ &mut left[..], &mut right[..] ], 1024)?;
//!     if count == 0 {
//!         break;
//!     }
//!     println!("Got {} frames", count);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Writing a file with the default 2 channels, sample rate 44100 and signed 16-bit
//! integer samples:
//!
//! ```no_run
//! # fn example() -> wavefile::WaveResult<()> {
//! use wavefile::{OpenMode, WaveFile};
//!
//! let mut wave = WaveFile::open("test.wav", OpenMode::WRITE)?;
//! wave.write(&[ &[ 0i16, 10, -10 ], &[ 0i16, 20, -20 ] ], 3)?;
//! wave.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! All fallible methods return [`WaveResult`]. In addition, failed [`WaveFile`] methods
//! record the error to a thread-local "last error", which can be queried with
//! [`last_error()`] and reset with [`clear_error()`].

#![forbid(
    unsafe_code,
    clippy::panic,
    clippy::exit,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::unimplemented,
    clippy::todo,
    clippy::unreachable,
)]
#![deny(
    clippy::cast_ptr_alignment,
    clippy::char_lit_as_u8,
    clippy::unnecessary_cast,
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::checked_conversions,
)]

// silly way to test rust code blocks in README.md
// https://doc.rust-lang.org/rustdoc/write-documentation/documentation-tests.html
#[doc = include_str!("../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;

use std::io::{Read, Write, Seek, SeekFrom};

mod allocator;
mod cast;
mod chunks;
mod header;
mod normalize;
mod sample;
mod wavefile;
mod waveresult;

pub use allocator::{Allocator, DefaultAllocator, set_allocator, reset_allocator};
pub use sample::{Sample, container_width};
pub use wavefile::WaveFile;
pub use waveresult::{WaveResult, WaveError, ErrorKind, LastError, last_error, clear_error};

/// A chunk id is a four byte identifier.
pub type ChunkId = [u8; 4];

fn unexpectedeof() -> WaveError {
    WaveError::Format("Unexpected EOF".to_string())
}

const CHUNKID_RIFF: [u8; 4] = *b"RIFF";
const CHUNKID_WAVE: [u8; 4] = *b"WAVE";

/// The format "fmt " chunk id.
pub const CHUNKID_FMT: [u8; 4] = *b"fmt ";
/// The fact "fact" chunk id.
pub const CHUNKID_FACT: [u8; 4] = *b"fact";
/// The sample data "data" chunk id.
pub const CHUNKID_DATA: [u8; 4] = *b"data";

/// Format tag of the format chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatTag {
    /// Integer PCM. 8-bit samples are unsigned, other sample sizes are signed.
    Pcm,
    /// IEEE floating point, 32 or 64 bits.
    IeeeFloat,
    /// A-law companded 8-bit samples.
    ALaw,
    /// μ-law companded 8-bit samples.
    MuLaw,
    /// Extensible format. The actual format is stored in the sub-format GUID.
    /// Sample data can't be read or written for this format.
    Extensible,
}

impl FormatTag {
    /// Returns the format tag value stored in the file.
    pub const fn to_u16(self) -> u16 {
        match self {
            FormatTag::Pcm => 0x0001,
            FormatTag::IeeeFloat => 0x0003,
            FormatTag::ALaw => 0x0006,
            FormatTag::MuLaw => 0x0007,
            FormatTag::Extensible => 0xfffe,
        }
    }

    /// Returns the format tag for the value stored in the file or `None` for unknown values.
    pub const fn from_u16(value: u16) -> Option<FormatTag> {
        match value {
            0x0001 => Some(FormatTag::Pcm),
            0x0003 => Some(FormatTag::IeeeFloat),
            0x0006 => Some(FormatTag::ALaw),
            0x0007 => Some(FormatTag::MuLaw),
            0xfffe => Some(FormatTag::Extensible),
            _ => None,
        }
    }
}

/// Open mode for [`WaveFile`]. Modes can be combined with `|`.
///
/// - `READ` alone opens an existing file for reading.
/// - `WRITE` creates a new file, truncating any existing file.
/// - `APPEND` without `WRITE` opens an existing file for appending samples. If the file
///   doesn't exist or it isn't a WAVE file, a new file is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpenMode(u8);

impl OpenMode {
    /// Samples can be read.
    pub const READ: OpenMode = OpenMode(1);
    /// A new file is created and its header and samples can be written.
    pub const WRITE: OpenMode = OpenMode(2);
    /// Samples can be appended to the end of the data chunk.
    pub const APPEND: OpenMode = OpenMode(4);

    /// Creates an open mode from bits. Returns `None` if unknown bits are set.
    pub const fn from_bits(bits: u8) -> Option<OpenMode> {
        if bits & !7 != 0 {
            return None;
        }
        Some(OpenMode(bits))
    }

    /// Returns the mode bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns true if all bits of `other` are set in `self`.
    pub const fn contains(self, other: OpenMode) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if no mode bits are set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for OpenMode {
    type Output = OpenMode;

    fn bitor(self, rhs: OpenMode) -> OpenMode {
        OpenMode(self.0 | rhs.0)
    }
}

/// Checks if the given data is the start of a RIFF/WAVE file.
///
/// Only the first 12 bytes are checked. If the data length is less than 12 bytes,
/// then the result is always false.
///
/// # Examples
///
/// ```
/// if wavefile::recognize(b"This is not a WAVE file") {
///     println!("It's WAVE");
/// }
/// ```
pub fn recognize(data: &[u8]) -> bool {
    data.len() >= 12 && data[0..4] == CHUNKID_RIFF && data[8..12] == CHUNKID_WAVE
}

fn is_even_u32(value: u32) -> bool {
    value & 1 == 0
}
