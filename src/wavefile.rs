use std::fs::{File, OpenOptions};
use std::path::Path;

use tracing::{debug, warn};

use crate::chunks::{
    FactChunk, FormatChunk, EXTENSIBLE_EXT_SIZE, FORMAT_BODY_SIZE, FORMAT_BODY_SIZE_EXTENSIBLE
};
use crate::header::{self, Header};
use crate::normalize::Normalizer;
use crate::sample::{self, Sample};
use crate::waveresult::record;
use crate::{allocator, cast, FormatTag, OpenMode, Read, Seek, SeekFrom, WaveError, WaveResult, Write};

fn io_error(e: std::io::Error, context: String) -> WaveError {
    WaveError::Io(std::io::Error::new(e.kind(), format!("{}: {}", context, e)))
}

fn check_mode(mode: OpenMode) -> WaveResult<()> {
    if mode.is_empty() {
        return Err(WaveError::Param("Invalid mode".to_string()));
    }
    Ok(())
}

/// Writes the default header to the start of the stream.
fn create_header<W: Write + Seek>(stream: &mut W) -> WaveResult<Header> {
    stream.seek(SeekFrom::Start(0))?;
    let mut header = Header::new();
    header::write_header(stream, &mut header)?;
    Ok(header)
}

/// Sets the sample byte width and the values depending on it.
fn apply_sample_size(format: &mut FormatChunk, sample_size: u16) -> WaveResult<()> {
    let invalid = || WaveError::Param(format!("Invalid sample size: {}", sample_size));
    if sample_size < 1 {
        return Err(invalid());
    }
    let block_align = u16::try_from(u32::from(sample_size) * u32::from(format.channels))
        .map_err(|_| invalid())?;
    let bits = sample_size.checked_mul(8).ok_or_else(invalid)?;
    format.block_align = block_align;
    format.bits_per_sample = bits;
    if format.format_tag == FormatTag::Extensible {
        format.valid_bits_per_sample = bits;
    }
    format.update_avg_bytes_per_sec();
    Ok(())
}

/// WaveFile reads and writes RIFF/WAVE audio files.
///
/// A WaveFile is created with [`WaveFile::open()`] for files or with
/// [`WaveFile::from_stream()`] for other streams. Depending on the [`OpenMode`], the header
/// is read from the stream or a new header for 16-bit stereo 44100 Hz PCM is written to it.
///
/// Samples are read and written as frames: one sample per channel. The sample type `T`
/// of [`read()`](WaveFile::read) and [`write()`](WaveFile::write) must have the size of
/// the sample container, see [`container_width()`](crate::container_width).
/// [`read_f64()`](WaveFile::read_f64) and [`write_f64()`](WaveFile::write_f64) convert
/// samples to and from normalized `f64` values.
///
/// [`close()`](WaveFile::close) should be called after writing samples. It writes
/// the pad byte for odd sized data chunks and flushes the stream.
///
/// # Examples
///
/// ```no_run
/// # fn example() -> wavefile::WaveResult<()> {
/// use wavefile::{FormatTag, OpenMode, WaveFile};
///
/// let mut wave = WaveFile::open("mono.wav", OpenMode::WRITE)?;
/// wave.set_channels(1)?;
/// wave.set_format_tag(FormatTag::IeeeFloat)?;
/// wave.write(&[ &[ 0.0f32, 0.5, -0.5 ] ], 3)?;
/// wave.close()?;
/// # Ok(())
/// # }
/// ```
pub struct WaveFile<S> where S: Read + Write + Seek {
    stream: S,
    name: String,
    mode: OpenMode,
    is_new_file: bool,
    header: Header,
    scratch: Vec<u8>,
}

impl WaveFile<File> {
    /// Opens the file at `path`.
    ///
    /// - `OpenMode::READ` opens an existing file for reading.
    /// - `OpenMode::WRITE` creates a new file or truncates an existing file and writes
    ///   the default header.
    /// - `OpenMode::APPEND` without `OpenMode::WRITE` opens an existing file without
    ///   truncating it. Samples are written to the end of the data chunk. If the file
    ///   doesn't exist or isn't a WAVE file, it is truncated and the default header is written.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> WaveResult<WaveFile<File>> {
        open_file(path.as_ref(), mode).map_err(record)
    }
}

fn open_file(path: &Path, mode: OpenMode) -> WaveResult<WaveFile<File>> {
    check_mode(mode)?;
    let name = path.display().to_string();
    let mut options = OpenOptions::new();
    if mode.contains(OpenMode::WRITE) {
        options.read(true).write(true).create(true).truncate(true);
    } else if mode.contains(OpenMode::APPEND) {
        options.read(true).write(true).create(true);
    } else {
        options.read(true);
    }
    let file = options.open(path)
        .map_err(|e| io_error(e, format!("Error when opening {}", name)))?;
    let wave = WaveFile::init(file, name, mode)?;
    if wave.is_new_file && !mode.contains(OpenMode::WRITE) {
        // append mode replaced unrecognized content with a new header
        wave.stream.set_len(wave.header.data.end())
            .map_err(|e| io_error(e, format!("Error when truncating {}", wave.name)))?;
    }
    Ok(wave)
}

impl<S: Read + Write + Seek> WaveFile<S> {
    /// Creates a WaveFile for the given stream. The header is read from or written to
    /// the start of the stream. `name` is used in error messages.
    ///
    /// The open modes work as in [`WaveFile::open()`], except that the stream is
    /// never truncated: `OpenMode::WRITE` expects an empty stream, and content after
    /// the new header is left in place when `OpenMode::APPEND` falls back to a new file.
    pub fn from_stream(stream: S, name: &str, mode: OpenMode) -> WaveResult<WaveFile<S>> {
        check_mode(mode)
            .and_then(|_| WaveFile::init(stream, name.to_string(), mode))
            .map_err(record)
    }

    fn init(mut stream: S, name: String, mode: OpenMode) -> WaveResult<WaveFile<S>> {
        let mut is_new_file = false;
        let header = if mode.contains(OpenMode::WRITE) {
            is_new_file = true;
            create_header(&mut stream)?
        } else if mode.contains(OpenMode::APPEND) {
            match header::parse_header(&mut stream) {
                Ok(header) => header,
                Err(e) => {
                    warn!("{}: {}, writing a new header", name, e);
                    is_new_file = true;
                    create_header(&mut stream)?
                }
            }
        } else {
            header::parse_header(&mut stream)?
        };
        debug!("opened {} with mode {:#x}", name, mode.bits());
        Ok(WaveFile {
            stream,
            name,
            mode,
            is_new_file,
            header,
            scratch: Vec::new(),
        })
    }

    fn check_readable(&self) -> WaveResult<()> {
        if !self.mode.contains(OpenMode::READ) {
            return Err(WaveError::Mode("This WaveFile is not readable".to_string()));
        }
        Ok(())
    }

    fn is_writable(&self) -> bool {
        self.mode.contains(OpenMode::WRITE) || self.mode.contains(OpenMode::APPEND)
    }

    fn check_writable(&self) -> WaveResult<()> {
        if !self.is_writable() {
            return Err(WaveError::Mode("This WaveFile is not writable".to_string()));
        }
        Ok(())
    }

    /// The header can be changed in write mode, or in append mode if the file was
    /// created by this WaveFile and no samples have been written.
    fn check_header_writable(&self) -> WaveResult<()> {
        if self.mode.contains(OpenMode::WRITE) ||
            (self.mode.contains(OpenMode::APPEND) && self.is_new_file && self.header.data.size == 0) {
            return Ok(());
        }
        Err(WaveError::Mode("The header of this WaveFile is not writable".to_string()))
    }

    fn appends_at_end(&self) -> bool {
        self.mode.contains(OpenMode::APPEND) && !self.mode.contains(OpenMode::WRITE)
    }

    /// Returns the sample size and the container width for reading and writing samples.
    fn io_sizes(&self) -> WaveResult<(usize, usize)> {
        if self.header.format.format_tag == FormatTag::Extensible {
            return Err(WaveError::Format("Extensible format is not supported".to_string()));
        }
        let sample_size = usize::from(self.header.format.sample_size());
        if sample_size == 0 || sample_size > 8 {
            return Err(WaveError::Param(format!("Unsupported sample size: {}", sample_size)));
        }
        Ok((sample_size, sample::container_width(sample_size)))
    }

    /// Returns the container width for `T`. Integer samples can be read to and written
    /// from containers wider than the natural container width. IEEE float samples need
    /// containers of the exact width.
    fn check_container<T: Sample>(&self) -> WaveResult<usize> {
        let (_, container_size) = self.io_sizes()?;
        let wider_allowed = self.header.format.format_tag != FormatTag::IeeeFloat;
        if T::SIZE == container_size ||
            (wider_allowed && T::SIZE > container_size && T::SIZE.is_power_of_two() && T::SIZE <= 8) {
            return Ok(T::SIZE);
        }
        Err(WaveError::Param(format!(
            "Invalid sample type: {} byte samples need {} byte containers, got {} bytes",
            self.header.format.sample_size(), container_size, T::SIZE)))
    }

    fn normalizer(&self) -> WaveResult<Normalizer> {
        let (sample_size, _) = self.io_sizes()?;
        Normalizer::new(self.header.format.format_tag, sample_size)
    }

    fn check_channel_count(&self, count: usize) -> WaveResult<()> {
        let channels = usize::from(self.header.format.channels);
        if count != channels {
            return Err(WaveError::Param(format!(
                "Invalid number of channel buffers: expected {}, got {}", channels, count)));
        }
        Ok(())
    }

    /// Grows the scratch buffer to at least `len` bytes.
    fn ensure_scratch(&mut self, len: usize) {
        if self.scratch.len() < len {
            self.scratch = allocator::realloc(std::mem::take(&mut self.scratch), len);
            if self.scratch.len() < len {
                self.scratch.resize(len, 0);
            }
        }
    }

    fn write_header(&mut self) -> WaveResult<()> {
        header::write_header(&mut self.stream, &mut self.header)
    }

    /// Replaces the header and writes it. The previous header is kept if writing fails.
    fn commit_header(&mut self, header: Header) -> WaveResult<()> {
        let previous = std::mem::replace(&mut self.header, header);
        if let Err(e) = self.write_header() {
            self.header = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Reads up to `frames` sample frames to `channels`, one buffer per channel.
    ///
    /// `T` must be a type whose size is the container width of the sample size:
    /// `u8` or `i8` for 8-bit, `i16` for 16-bit, `i32` for 24 and 32-bit, `i64` for
    /// 64-bit PCM, and `f32` or `f64` for IEEE float. A-law and μ-law samples are read
    /// as undecoded `u8` values. 8-bit PCM samples are unsigned.
    ///
    /// Integer samples can also be read to wider containers, for instance 16-bit
    /// samples to `i32` values. Signed samples are sign-extended.
    ///
    /// The frame count is clamped to the number of frames remaining after the current
    /// position. Returns the number of frames read, which is 0 at the end of the data.
    pub fn read<T: Sample>(&mut self, channels: &mut [&mut [T]], frames: usize)
        -> WaveResult<usize> {
        self.check_readable()
            .and_then(|_| self.check_container::<T>())
            .and_then(|width| self.read_frames(channels, frames, width, T::from_le_container))
            .map_err(record)
    }

    /// Reads up to `frames` sample frames to `channels` as `f64` values in the range
    /// [-1.0, 1.0). A-law and μ-law samples are decoded. This works as
    /// [`read()`](WaveFile::read) otherwise.
    pub fn read_f64(&mut self, channels: &mut [&mut [f64]], frames: usize) -> WaveResult<usize> {
        self.check_readable()
            .and_then(|_| self.normalizer())
            .and_then(|n| {
                let (_, width) = self.io_sizes()?;
                self.read_frames(channels, frames, width, |c| n.decode(c))
            })
            .map_err(record)
    }

    fn read_frames<T, F>(&mut self, channels: &mut [&mut [T]], frames: usize,
        container_size: usize, convert: F) -> WaveResult<usize> where F: Fn(&[u8]) -> T {
        let (sample_size, _) = self.io_sizes()?;
        self.check_channel_count(channels.len())?;
        let remaining = self.header.length().saturating_sub(self.tell_frames()?);
        let count = cast::u64_to_usize(remaining.min(cast::usize_to_u64(frames)?))?;
        if count == 0 {
            return Ok(0);
        }
        if channels.iter().any(|c| c.len() < count) {
            return Err(WaveError::Param(format!("Channel buffer is too short for {} frames", count)));
        }
        let block_align = usize::from(self.header.format.block_align);
        let len = count.checked_mul(block_align)
            .ok_or_else(|| WaveError::Param("Frame count is too large".to_string()))?;
        self.ensure_scratch(len);
        self.stream.read_exact(&mut self.scratch[..len])
            .map_err(|e| io_error(e, format!("Error while reading from {}", self.name)))?;

        // 8-bit PCM is unsigned and other integer PCM sizes are signed
        let sign_extend = self.header.format.format_tag == FormatTag::Pcm && sample_size > 1;
        let mut container = [0u8; 8];
        for (frame_index, frame) in self.scratch[..len].chunks_exact(block_align).enumerate() {
            for (ch, buf) in channels.iter_mut().enumerate() {
                let start = ch * sample_size;
                sample::widen(&frame[start..start + sample_size],
                    &mut container[..container_size], sign_extend);
                buf[frame_index] = convert(&container[..container_size]);
            }
        }
        Ok(count)
    }

    /// Writes `frames` sample frames from `channels`, one buffer per channel.
    ///
    /// The sample type `T` is chosen as for [`read()`](WaveFile::read). Samples are
    /// truncated to the sample size: for 24-bit samples, the highest byte of `i32`
    /// values is dropped, and for 16-bit samples written from `i32` values, the
    /// two highest bytes are dropped.
    ///
    /// Samples are written to the current position, except in append mode, where they
    /// are always written to the end of the data chunk. The size fields of the header
    /// are updated after each write.
    pub fn write<T: Sample>(&mut self, channels: &[&[T]], frames: usize) -> WaveResult<usize> {
        self.check_writable()
            .and_then(|_| self.check_container::<T>())
            .and_then(|width| self.write_frames(channels, frames, width, T::write_le_container))
            .map_err(record)
    }

    /// Writes `frames` sample frames from `channels`, converting `f64` values in the
    /// range [-1.0, 1.0) to the sample format. Integer samples are rounded and clamped.
    /// A-law and μ-law samples are encoded. This works as [`write()`](WaveFile::write)
    /// otherwise.
    pub fn write_f64(&mut self, channels: &[&[f64]], frames: usize) -> WaveResult<usize> {
        self.check_writable()
            .and_then(|_| self.normalizer())
            .and_then(|n| {
                let (_, width) = self.io_sizes()?;
                self.write_frames(channels, frames, width, |v, c| n.encode(v, c))
            })
            .map_err(record)
    }

    fn write_frames<T, F>(&mut self, channels: &[&[T]], frames: usize,
        container_size: usize, convert: F) -> WaveResult<usize> where T: Copy, F: Fn(T, &mut [u8]) {
        let (sample_size, _) = self.io_sizes()?;
        if frames == 0 {
            return Ok(0);
        }
        self.check_channel_count(channels.len())?;
        if channels.iter().any(|c| c.len() < frames) {
            return Err(WaveError::Param(format!("Channel buffer is too short for {} frames", frames)));
        }
        let block_align = usize::from(self.header.format.block_align);
        let len = frames.checked_mul(block_align)
            .ok_or_else(|| WaveError::Param("Frame count is too large".to_string()))?;
        self.ensure_scratch(len);
        let mut container = [0u8; 8];
        for (frame_index, frame) in self.scratch[..len].chunks_exact_mut(block_align).enumerate() {
            for (ch, buf) in channels.iter().enumerate() {
                convert(buf[frame_index], &mut container[..container_size]);
                let start = ch * sample_size;
                sample::narrow(&container[..container_size], &mut frame[start..start + sample_size]);
            }
        }

        if self.appends_at_end() {
            self.stream.seek(SeekFrom::Start(self.header.data.end()))?;
        }
        let pos = self.stream.stream_position()?;
        let end = pos.saturating_sub(self.header.data.start()) + cast::usize_to_u64(len)?;
        let new_size = self.header.checked_data_size(end.max(u64::from(self.header.data.size)))?;
        self.stream.write_all(&self.scratch[..len])
            .map_err(|e| io_error(e, format!("Error while writing to {}", self.name)))?;
        self.header.data.size = new_size;
        let length = self.header.length();
        if let Some(fact) = &mut self.header.fact {
            fact.sample_length = u32::try_from(length).unwrap_or(u32::MAX);
        }
        header::update_sizes(&mut self.stream, &mut self.header)?;
        Ok(frames)
    }

    fn tell_frames(&mut self) -> WaveResult<u64> {
        let pos = self.stream.stream_position()?;
        let start = self.header.data.start();
        debug_assert!(pos >= start, "stream position is before the sample data");
        Ok(pos.saturating_sub(start) / u64::from(self.header.format.block_align.max(1)))
    }

    /// Returns the current position as a sample frame index.
    pub fn tell(&mut self) -> WaveResult<u64> {
        self.tell_frames().map_err(record)
    }

    /// Seeks to a sample frame. `SeekFrom::Current` is relative to [`tell()`](WaveFile::tell)
    /// and `SeekFrom::End` is relative to [`length()`](WaveFile::length).
    ///
    /// Seeking before the first frame or after the last frame returns an error and
    /// the position isn't changed. Seeking to `length()` is allowed. Returns the new
    /// frame position.
    pub fn seek(&mut self, pos: SeekFrom) -> WaveResult<u64> {
        self.seek_frames(pos).map_err(record)
    }

    fn seek_frames(&mut self, pos: SeekFrom) -> WaveResult<u64> {
        let length = self.header.length();
        let target = match pos {
            SeekFrom::Start(frame) => Some(frame),
            SeekFrom::Current(delta) => self.tell_frames()?.checked_add_signed(delta),
            SeekFrom::End(delta) => length.checked_add_signed(delta),
        };
        let Some(target) = target.filter(|t| *t <= length) else {
            return Err(WaveError::Param("Invalid seek".to_string()));
        };
        let byte_pos = self.header.data.start() + target * u64::from(self.header.format.block_align);
        self.stream.seek(SeekFrom::Start(byte_pos))?;
        Ok(target)
    }

    /// Seeks to the first sample frame.
    pub fn rewind(&mut self) -> WaveResult<()> {
        self.seek(SeekFrom::Start(0)).map(|_| ())
    }

    /// Returns true if the position is at or after the end of the sample data.
    pub fn eof(&mut self) -> WaveResult<bool> {
        self.stream.stream_position()
            .map(|pos| pos >= self.header.data.end())
            .map_err(|e| record(WaveError::Io(e)))
    }

    /// Flushes the stream.
    pub fn flush(&mut self) -> WaveResult<()> {
        self.stream.flush().map_err(|e| record(WaveError::Io(e)))
    }

    /// Closes the WaveFile and returns the stream.
    ///
    /// If the data chunk has an odd size, a pad byte is written after it.
    /// The stream is flushed and the sample buffer is released.
    pub fn close(self) -> WaveResult<S> {
        self.finish().map_err(record)
    }

    fn finish(mut self) -> WaveResult<S> {
        if self.is_writable() && !crate::is_even_u32(self.header.data.size) {
            self.stream.seek(SeekFrom::Start(self.header.data.end()))?;
            self.stream.write_all(&[ 0 ])?;
        }
        self.stream.flush()
            .map_err(|e| io_error(e, format!("Error while writing to {}", self.name)))?;
        allocator::free(std::mem::take(&mut self.scratch));
        debug!("closed {}, {} frames", self.name, self.header.length());
        Ok(self.stream)
    }

    /// Gets a reference to the underlying stream.
    pub const fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Gets a mutable reference to the underlying stream.
    ///
    /// Changing the stream position or writing to the stream may corrupt the file.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    fn update_format<F>(&mut self, update: F) -> WaveResult<()>
        where F: FnOnce(&mut FormatChunk) -> WaveResult<()> {
        self.check_header_writable()?;
        let mut header = self.header.clone();
        update(&mut header.format)?;
        self.commit_header(header)
    }

    /// Sets the format tag.
    ///
    /// A-law and μ-law set the sample size to 1. IEEE float sets the sample size to 4
    /// unless it is 4 or 8. The extensible format grows the format chunk to 40 bytes.
    /// IEEE float, A-law and μ-law files get a fact chunk. Changes which move the data
    /// chunk can't be done after samples have been written.
    pub fn set_format_tag(&mut self, format_tag: FormatTag) -> WaveResult<()> {
        self.check_header_writable()
            .and_then(|_| self.apply_format_tag(format_tag))
            .map_err(record)
    }

    fn apply_format_tag(&mut self, format_tag: FormatTag) -> WaveResult<()> {
        if self.header.format.format_tag == format_tag {
            return Ok(());
        }
        let mut format = self.header.format.clone();
        format.format_tag = format_tag;
        if format_tag == FormatTag::Extensible {
            format.size = FORMAT_BODY_SIZE_EXTENSIBLE;
            format.ext_size = EXTENSIBLE_EXT_SIZE;
            format.valid_bits_per_sample = format.bits_per_sample;
        } else {
            format.size = FORMAT_BODY_SIZE;
            format.ext_size = 0;
        }
        let sample_size = format.sample_size();
        match format_tag {
            FormatTag::ALaw | FormatTag::MuLaw => apply_sample_size(&mut format, 1)?,
            FormatTag::IeeeFloat if sample_size != 4 && sample_size != 8 => {
                apply_sample_size(&mut format, 4)?
            },
            _ => {}
        }
        let needs_fact = matches!(format_tag,
            FormatTag::IeeeFloat | FormatTag::ALaw | FormatTag::MuLaw);
        let relayout = format.size != self.header.format.size ||
            needs_fact != self.header.fact.is_some();
        if relayout && self.header.data.size != 0 {
            return Err(WaveError::Mode(
                "The format tag can't be changed after samples have been written".to_string()));
        }
        let mut header = self.header.clone();
        header.format = format;
        if !relayout {
            return self.commit_header(header);
        }
        header.fact = if needs_fact { Some(FactChunk::new(0)) } else { None };
        header.relayout();
        self.commit_header(header)?;
        debug!("{}: data chunk moved to {}", self.name, self.header.data.pos);
        self.stream.seek(SeekFrom::Start(self.header.data.start()))?;
        Ok(())
    }

    /// Sets the number of channels. The block align is updated.
    pub fn set_channels(&mut self, channels: u16) -> WaveResult<()> {
        self.update_format(|format| {
            if channels < 1 {
                return Err(WaveError::Param(format!("Invalid number of channels: {}", channels)));
            }
            let block_align = u32::from(format.sample_size()) * u32::from(channels);
            format.block_align = u16::try_from(block_align).map_err(|_| {
                WaveError::Param(format!("Invalid number of channels: {}", channels))
            })?;
            format.channels = channels;
            format.update_avg_bytes_per_sec();
            Ok(())
        }).map_err(record)
    }

    /// Sets the sample rate.
    pub fn set_sample_rate(&mut self, sample_rate: u32) -> WaveResult<()> {
        self.update_format(|format| {
            format.sample_rate = sample_rate;
            format.update_avg_bytes_per_sec();
            Ok(())
        }).map_err(record)
    }

    /// Sets the number of valid bits in a sample, which must be between 1 and
    /// 8 times the sample size. A-law and μ-law samples always have 8 valid bits.
    ///
    /// For the extensible format, this sets the valid bits field. For other formats,
    /// this sets the bits per sample field.
    pub fn set_valid_bits_per_sample(&mut self, bits: u16) -> WaveResult<()> {
        self.update_format(|format| {
            let invalid = || WaveError::Param(format!("Invalid valid bits per sample: {}", bits));
            let max_bits = u16::try_from(u32::from(format.sample_size()) * 8)
                .map_err(|_| invalid())?;
            if bits < 1 || bits > max_bits {
                return Err(invalid());
            }
            match format.format_tag {
                FormatTag::ALaw | FormatTag::MuLaw if bits != 8 => return Err(invalid()),
                FormatTag::Extensible => {
                    format.bits_per_sample = max_bits;
                    format.valid_bits_per_sample = bits;
                },
                _ => format.bits_per_sample = bits,
            }
            Ok(())
        }).map_err(record)
    }

    /// Sets the sample size in bytes. The block align and bits per sample are updated.
    pub fn set_sample_size(&mut self, sample_size: u16) -> WaveResult<()> {
        self.update_format(|format| apply_sample_size(format, sample_size)).map_err(record)
    }

    /// Sets the channel mask. Only for the extensible format.
    pub fn set_channel_mask(&mut self, channel_mask: u32) -> WaveResult<()> {
        self.update_format(|format| {
            if format.format_tag != FormatTag::Extensible {
                return Err(WaveError::Format(
                    "Channel mask is supported only for the extensible format".to_string()));
            }
            format.channel_mask = channel_mask;
            Ok(())
        }).map_err(record)
    }

    /// Sets the sub-format, which is stored in the first two bytes of the sub-format GUID.
    /// Only for the extensible format.
    pub fn set_sub_format(&mut self, sub_format: u16) -> WaveResult<()> {
        self.update_format(|format| {
            if format.format_tag != FormatTag::Extensible {
                return Err(WaveError::Format(
                    "Sub-format is supported only for the extensible format".to_string()));
            }
            format.sub_format[0..2].copy_from_slice(&sub_format.to_le_bytes());
            Ok(())
        }).map_err(record)
    }

    /// Returns the format tag.
    pub fn format_tag(&self) -> FormatTag {
        self.header.format.format_tag
    }

    /// Returns the number of channels.
    pub fn channels(&self) -> u16 {
        self.header.format.channels
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.header.format.sample_rate
    }

    /// Returns the average bytes per second.
    pub fn avg_bytes_per_sec(&self) -> u32 {
        self.header.format.avg_bytes_per_sec
    }

    /// Returns the sample frame size in bytes.
    pub fn block_align(&self) -> u16 {
        self.header.format.block_align
    }

    /// Returns the valid bits per sample. For other than the extensible format, this is
    /// the bits per sample value.
    pub fn valid_bits_per_sample(&self) -> u16 {
        match self.header.format.format_tag {
            FormatTag::Extensible => self.header.format.valid_bits_per_sample,
            _ => self.header.format.bits_per_sample,
        }
    }

    /// Returns the sample size in bytes: the block align divided by the number of channels.
    pub fn sample_size(&self) -> u16 {
        self.header.format.sample_size()
    }

    /// Returns the number of sample frames.
    pub fn length(&self) -> u64 {
        self.header.length()
    }

    /// Returns the channel mask. It's meaningful only for the extensible format.
    pub fn channel_mask(&self) -> u32 {
        self.header.format.channel_mask
    }

    /// Returns the sub-format from the first two bytes of the sub-format GUID.
    /// It's meaningful only for the extensible format.
    pub fn sub_format(&self) -> u16 {
        u16::from_le_bytes([ self.header.format.sub_format[0], self.header.format.sub_format[1] ])
    }

    /// Returns the sample length of the fact chunk or `None` if there is no fact chunk.
    pub fn fact_sample_length(&self) -> Option<u32> {
        self.header.fact.as_ref().map(|f| f.sample_length)
    }

    /// Returns the open mode.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Returns the file name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{last_error, clear_error, ErrorKind};
    use std::io::Cursor;

    const DEFAULT_HEADER: [u8; 44] = [
        b'R', b'I', b'F', b'F', 36, 0, 0, 0, b'W', b'A', b'V', b'E',
        b'f', b'm', b't', b' ', 16, 0, 0, 0,
        1, 0, 2, 0, 0x44, 0xac, 0, 0, 0x10, 0xb1, 2, 0, 4, 0, 16, 0,
        b'd', b'a', b't', b'a', 0, 0, 0, 0
    ];

    fn create(output: &mut Vec<u8>) -> WaveResult<WaveFile<Cursor<&mut Vec<u8>>>> {
        WaveFile::from_stream(Cursor::new(output), "test.wav", OpenMode::WRITE)
    }

    fn open(output: &mut Vec<u8>, mode: OpenMode) -> WaveResult<WaveFile<Cursor<&mut Vec<u8>>>> {
        WaveFile::from_stream(Cursor::new(output), "test.wav", mode)
    }

    #[test]
    fn test_new_file() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        assert_eq!(wave.tell()?, 0);
        assert_eq!(wave.length(), 0);
        assert!(wave.eof()?);
        assert_eq!(wave.format_tag(), FormatTag::Pcm);
        assert_eq!(wave.channels(), 2);
        assert_eq!(wave.sample_rate(), 44100);
        assert_eq!(wave.sample_size(), 2);
        assert_eq!(wave.valid_bits_per_sample(), 16);
        assert_eq!(wave.block_align(), 4);
        assert_eq!(wave.avg_bytes_per_sec(), 176400);
        assert_eq!(wave.sub_format(), 1);
        assert_eq!(wave.fact_sample_length(), None);
        assert_eq!(wave.name(), "test.wav");
        wave.close()?;
        assert_eq!(output, DEFAULT_HEADER);
        Ok(())
    }

    #[test]
    fn test_invalid_mode() {
        let mut output = vec![];
        let res = open(&mut output, OpenMode::from_bits(0).unwrap_or(OpenMode::READ));
        assert!(matches!(res, Err(WaveError::Param(_))));
        assert_eq!(last_error().map(|e| e.kind), Some(ErrorKind::Param));
        clear_error();
    }

    #[test]
    fn test_write_and_read() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        assert_eq!(wave.write(&[ &[ 1i16, -2, 3 ], &[ 4i16, 5, -6 ] ], 3)?, 3);
        assert_eq!(wave.tell()?, 3);
        assert_eq!(wave.length(), 3);
        wave.close()?;
        assert_eq!(output[4..8], [ 48, 0, 0, 0 ]);
        assert_eq!(output[40..], [ 12, 0, 0, 0,
            0x01, 0x00, 0x04, 0x00, 0xfe, 0xff, 0x05, 0x00, 0x03, 0x00, 0xfa, 0xff ]);

        let mut wave = open(&mut output, OpenMode::READ)?;
        assert_eq!(wave.length(), 3);
        let mut left = [0i16; 4];
        let mut right = [0i16; 4];
        assert_eq!(wave.read(&mut [ &mut left, &mut right ], 4)?, 3);
        assert_eq!(left, [ 1, -2, 3, 0 ]);
        assert_eq!(right, [ 4, 5, -6, 0 ]);
        assert_eq!(wave.tell()?, 3);
        assert!(wave.eof()?);
        assert_eq!(wave.read(&mut [ &mut left, &mut right ], 4)?, 0);
        Ok(())
    }

    #[test]
    fn test_read_clamps_to_remaining() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        wave.set_channels(1)?;
        wave.write(&[ &[ 10i16, 20, 30, 40, 50 ] ], 5)?;
        wave.close()?;
        let mut wave = open(&mut output, OpenMode::READ)?;
        wave.seek(SeekFrom::Start(3))?;
        let mut buf = [0i16; 8];
        assert_eq!(wave.read(&mut [ &mut buf ], 8)?, 2);
        assert_eq!(buf[0..2], [ 40, 50 ]);
        Ok(())
    }

    #[test]
    fn test_seek() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        wave.write(&[ &[ 0i16; 10 ], &[ 0i16; 10 ] ], 10)?;
        assert_eq!(wave.seek(SeekFrom::Start(4))?, 4);
        assert_eq!(wave.get_ref().position(), 44 + 16);
        assert_eq!(wave.seek(SeekFrom::Current(-1))?, 3);
        assert_eq!(wave.seek(SeekFrom::End(-2))?, 8);
        assert!(!wave.eof()?);
        assert_eq!(wave.seek(SeekFrom::End(0))?, 10);
        assert!(wave.eof()?);
        wave.rewind()?;
        assert_eq!(wave.tell()?, 0);
        Ok(())
    }

    #[test]
    fn test_seek_out_of_bounds() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        wave.write(&[ &[ 0i16; 10 ], &[ 0i16; 10 ] ], 10)?;
        wave.seek(SeekFrom::Start(5))?;
        clear_error();
        assert!(matches!(wave.seek(SeekFrom::Current(-6)), Err(WaveError::Param(_))));
        assert_eq!(last_error().map(|e| e.kind), Some(ErrorKind::Param));
        assert_eq!(wave.tell()?, 5);
        assert!(matches!(wave.seek(SeekFrom::End(-11)), Err(WaveError::Param(_))));
        assert!(matches!(wave.seek(SeekFrom::Start(11)), Err(WaveError::Param(_))));
        assert!(matches!(wave.seek(SeekFrom::End(1)), Err(WaveError::Param(_))));
        assert_eq!(wave.tell()?, 5);
        clear_error();
        Ok(())
    }

    #[test]
    fn test_sign_extension() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        wave.set_channels(1)?;
        wave.set_sample_size(3)?;
        assert_eq!(wave.block_align(), 3);
        assert_eq!(wave.valid_bits_per_sample(), 24);
        wave.write(&[ &[ -1i32, -8388608, 8388607, 0x12345678 ] ], 4)?;
        wave.close()?;
        assert_eq!(output[44..], [ 0xff, 0xff, 0xff, 0x00, 0x00, 0x80, 0xff, 0xff, 0x7f,
            0x78, 0x56, 0x34 ]);
        let mut wave = open(&mut output, OpenMode::READ)?;
        let mut buf = [0i32; 4];
        assert_eq!(wave.read(&mut [ &mut buf ], 4)?, 4);
        assert_eq!(buf, [ -1, -8388608, 8388607, 0x345678 ]);
        Ok(())
    }

    #[test]
    fn test_wider_containers() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = open(&mut output, OpenMode::READ | OpenMode::WRITE)?;
        wave.set_channels(1)?;
        assert_eq!(wave.write(&[ &[ -1i32, 0x12348000, 5 ] ], 3)?, 3);
        assert_eq!(wave.length(), 3);
        wave.rewind()?;
        let mut raw = [0i16; 3];
        wave.read(&mut [ &mut raw ], 3)?;
        assert_eq!(raw, [ -1, -32768, 5 ]);
        wave.rewind()?;
        let mut buf = [0i32; 3];
        wave.read(&mut [ &mut buf ], 3)?;
        assert_eq!(buf[0].to_le_bytes(), [ 0xff, 0xff, 0xff, 0xff ]);
        assert_eq!(buf, [ -1, -32768, 5 ]);
        wave.rewind()?;
        let mut buf = [0i64; 3];
        wave.read(&mut [ &mut buf ], 3)?;
        assert_eq!(buf, [ -1, -32768, 5 ]);
        wave.close()?;
        assert_eq!(output[44..], [ 0xff, 0xff, 0x00, 0x80, 0x05, 0x00 ]);

        // unsigned 8-bit samples are zero-extended
        let mut output = vec![];
        let mut wave = open(&mut output, OpenMode::READ | OpenMode::WRITE)?;
        wave.set_channels(1)?;
        wave.set_sample_size(1)?;
        wave.write(&[ &[ 255i16, 0x0180 ] ], 2)?;
        wave.rewind()?;
        let mut buf = [0i16; 2];
        wave.read(&mut [ &mut buf ], 2)?;
        assert_eq!(buf, [ 255, 128 ]);
        Ok(())
    }

    #[test]
    fn test_float_needs_exact_container() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        wave.set_channels(1)?;
        wave.set_format_tag(FormatTag::IeeeFloat)?;
        assert!(matches!(wave.write(&[ &[ 0.5f64 ] ], 1), Err(WaveError::Param(_))));
        assert!(matches!(wave.write(&[ &[ 0i64 ] ], 1), Err(WaveError::Param(_))));
        assert_eq!(wave.write(&[ &[ 0.5f32 ] ], 1)?, 1);
        clear_error();
        Ok(())
    }

    #[test]
    fn test_unsigned_8bit_not_sign_extended() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        wave.set_channels(1)?;
        wave.set_sample_size(1)?;
        wave.write(&[ &[ 0u8, 128, 255 ] ], 3)?;
        wave.close()?;
        let mut wave = open(&mut output, OpenMode::READ)?;
        let mut buf = [0u8; 3];
        wave.read(&mut [ &mut buf ], 3)?;
        assert_eq!(buf, [ 0, 128, 255 ]);
        wave.rewind()?;
        let mut buf = [0f64; 3];
        wave.read_f64(&mut [ &mut buf ], 3)?;
        assert_eq!(buf, [ -1.0, 0.0, 127.0 / 128.0 ]);
        Ok(())
    }

    #[test]
    fn test_odd_data_size_is_padded() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        wave.set_channels(1)?;
        wave.set_sample_size(1)?;
        wave.write(&[ &[ 1u8, 2, 3 ] ], 3)?;
        wave.close()?;
        assert_eq!(output.len(), 48);
        assert_eq!(output[4..8], [ 40, 0, 0, 0 ]);
        assert_eq!(output[40..], [ 3, 0, 0, 0, 1, 2, 3, 0 ]);
        let wave = open(&mut output, OpenMode::READ)?;
        assert_eq!(wave.length(), 3);
        Ok(())
    }

    #[test]
    fn test_mode_errors() -> WaveResult<()> {
        let mut output = vec![];
        create(&mut output)?.close()?;
        let mut wave = open(&mut output, OpenMode::READ)?;
        assert!(matches!(wave.write(&[ &[ 0i16 ], &[ 0i16 ] ], 1), Err(WaveError::Mode(_))));
        assert_eq!(last_error().map(|e| e.kind), Some(ErrorKind::Mode));
        assert!(matches!(wave.set_channels(1), Err(WaveError::Mode(_))));
        assert!(matches!(wave.set_sample_rate(8000), Err(WaveError::Mode(_))));
        assert!(matches!(wave.set_format_tag(FormatTag::ALaw), Err(WaveError::Mode(_))));
        assert_eq!(wave.channels(), 2);

        let mut output = vec![];
        let mut wave = create(&mut output)?;
        let mut buf = [0i16; 1];
        let mut buf2 = [0i16; 1];
        assert!(matches!(wave.read(&mut [ &mut buf, &mut buf2 ], 1), Err(WaveError::Mode(_))));
        clear_error();
        Ok(())
    }

    #[test]
    fn test_buffer_errors() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        // 16-bit samples don't fit in 8-bit containers
        assert!(matches!(wave.write(&[ &[ 0i8 ], &[ 0i8 ] ], 1), Err(WaveError::Param(_))));
        assert!(matches!(wave.write(&[ &[ 0i16 ] ], 1), Err(WaveError::Param(_))));
        assert!(matches!(wave.write(&[ &[ 0i16 ], &[ 0i16 ] ], 2), Err(WaveError::Param(_))));
        assert_eq!(wave.write::<i16>(&[ &[], &[] ], 0)?, 0);
        assert_eq!(wave.length(), 0);
        clear_error();
        Ok(())
    }

    #[test]
    fn test_setters() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        wave.set_channels(1)?;
        assert_eq!(wave.block_align(), 2);
        assert_eq!(wave.avg_bytes_per_sec(), 88200);
        wave.set_sample_rate(8000)?;
        assert_eq!(wave.avg_bytes_per_sec(), 16000);
        wave.set_sample_size(4)?;
        assert_eq!(wave.block_align(), 4);
        assert_eq!(wave.valid_bits_per_sample(), 32);
        wave.set_valid_bits_per_sample(20)?;
        assert_eq!(wave.valid_bits_per_sample(), 20);
        assert_eq!(wave.sample_size(), 4);
        assert!(matches!(wave.set_valid_bits_per_sample(33), Err(WaveError::Param(_))));
        assert!(matches!(wave.set_valid_bits_per_sample(0), Err(WaveError::Param(_))));
        assert!(matches!(wave.set_channels(0), Err(WaveError::Param(_))));
        assert!(matches!(wave.set_sample_size(0), Err(WaveError::Param(_))));
        assert!(matches!(wave.set_channel_mask(3), Err(WaveError::Format(_))));
        assert!(matches!(wave.set_sub_format(3), Err(WaveError::Format(_))));
        assert_eq!(wave.channels(), 1);
        wave.close()?;
        assert_eq!(output, [
            b'R', b'I', b'F', b'F', 36, 0, 0, 0, b'W', b'A', b'V', b'E',
            b'f', b'm', b't', b' ', 16, 0, 0, 0,
            1, 0, 1, 0, 0x40, 0x1f, 0, 0, 0x00, 0x7d, 0, 0, 4, 0, 20, 0,
            b'd', b'a', b't', b'a', 0, 0, 0, 0
        ]);
        clear_error();
        Ok(())
    }

    #[test]
    fn test_set_format_tag() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        wave.set_format_tag(FormatTag::IeeeFloat)?;
        assert_eq!(wave.sample_size(), 4);
        assert_eq!(wave.block_align(), 8);
        assert_eq!(wave.fact_sample_length(), Some(0));
        assert_eq!(wave.tell()?, 0);
        wave.write(&[ &[ 0.5f32 ], &[ -0.5f32 ] ], 1)?;
        assert_eq!(wave.fact_sample_length(), Some(1));
        // moving the data chunk isn't possible after writing samples
        assert!(matches!(wave.set_format_tag(FormatTag::Pcm), Err(WaveError::Mode(_))));
        wave.close()?;
        assert_eq!(output.len(), 64);
        assert_eq!(output[4..8], [ 56, 0, 0, 0 ]);
        assert_eq!(output[20..22], [ 3, 0 ]);
        assert_eq!(output[36..48], [ b'f', b'a', b'c', b't', 4, 0, 0, 0, 1, 0, 0, 0 ]);
        assert_eq!(output[48..56], [ b'd', b'a', b't', b'a', 8, 0, 0, 0 ]);

        let mut output = vec![];
        let mut wave = create(&mut output)?;
        wave.set_format_tag(FormatTag::MuLaw)?;
        assert_eq!(wave.sample_size(), 1);
        assert!(matches!(wave.set_valid_bits_per_sample(7), Err(WaveError::Param(_))));
        wave.set_valid_bits_per_sample(8)?;
        wave.set_format_tag(FormatTag::Pcm)?;
        assert_eq!(wave.fact_sample_length(), None);
        assert_eq!(wave.tell()?, 0);
        clear_error();
        Ok(())
    }

    #[test]
    fn test_extensible() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        wave.set_format_tag(FormatTag::Extensible)?;
        wave.set_channel_mask(0x3)?;
        wave.set_sub_format(3)?;
        wave.set_valid_bits_per_sample(12)?;
        assert_eq!(wave.valid_bits_per_sample(), 12);
        assert_eq!(wave.sample_size(), 2);
        assert_eq!(wave.sub_format(), 3);
        assert_eq!(wave.channel_mask(), 3);
        assert_eq!(wave.fact_sample_length(), None);
        let buf = [0i16; 1];
        assert!(matches!(wave.write(&[ &buf, &buf ], 1), Err(WaveError::Format(_))));
        wave.close()?;
        assert_eq!(output.len(), 68);
        assert_eq!(output[16..20], [ 40, 0, 0, 0 ]);
        assert_eq!(output[20..22], [ 0xfe, 0xff ]);
        assert_eq!(output[36..38], [ 22, 0 ]);
        assert_eq!(output[38..40], [ 12, 0 ]);
        assert_eq!(output[40..44], [ 3, 0, 0, 0 ]);
        assert_eq!(output[44..46], [ 3, 0 ]);
        assert_eq!(output[60..68], [ b'd', b'a', b't', b'a', 0, 0, 0, 0 ]);
        // the parser doesn't accept the extensible format
        assert!(matches!(open(&mut output, OpenMode::READ), Err(WaveError::Format(_))));
        clear_error();
        Ok(())
    }

    #[test]
    fn test_overwrite_doesnt_grow() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = open(&mut output, OpenMode::READ | OpenMode::WRITE)?;
        wave.set_channels(1)?;
        wave.write(&[ &[ 1i16, 2, 3, 4 ] ], 4)?;
        wave.seek(SeekFrom::Start(1))?;
        wave.write(&[ &[ 7i16, 8 ] ], 2)?;
        assert_eq!(wave.length(), 4);
        assert_eq!(wave.tell()?, 3);
        wave.rewind()?;
        let mut buf = [0i16; 4];
        wave.read(&mut [ &mut buf ], 4)?;
        assert_eq!(buf, [ 1, 7, 8, 4 ]);
        Ok(())
    }

    #[test]
    fn test_append() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        wave.set_channels(1)?;
        wave.write(&[ &[ 1i16, 2 ] ], 2)?;
        wave.close()?;

        let mut wave = open(&mut output, OpenMode::APPEND)?;
        assert_eq!(wave.length(), 2);
        // header can't be changed for existing files
        assert!(matches!(wave.set_sample_rate(8000), Err(WaveError::Mode(_))));
        wave.write(&[ &[ 3i16 ] ], 1)?;
        wave.write(&[ &[ 4i16 ] ], 1)?;
        assert_eq!(wave.length(), 4);
        wave.close()?;
        assert_eq!(output.len(), 52);
        assert_eq!(output[40..], [ 8, 0, 0, 0, 1, 0, 2, 0, 3, 0, 4, 0 ]);
        clear_error();
        Ok(())
    }

    #[test]
    fn test_append_creates_new_file() -> WaveResult<()> {
        let mut output = b"this is not a wave file".to_vec();
        let mut wave = open(&mut output, OpenMode::APPEND)?;
        assert_eq!(wave.length(), 0);
        wave.set_channels(1)?;
        wave.write(&[ &[ 5i16 ] ], 1)?;
        // header is fixed after samples have been written
        assert!(matches!(wave.set_channels(2), Err(WaveError::Mode(_))));
        wave.close()?;
        assert_eq!(output[0..4], *b"RIFF");
        assert_eq!(output[22..24], [ 1, 0 ]);
        assert_eq!(output[40..46], [ 2, 0, 0, 0, 5, 0 ]);
        clear_error();
        Ok(())
    }

    #[test]
    fn test_f64_roundtrip() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = open(&mut output, OpenMode::READ | OpenMode::WRITE)?;
        wave.write_f64(&[ &[ 0.5, -1.0, 2.0 ], &[ 0.25, 0.0, -2.0 ] ], 3)?;
        wave.rewind()?;
        let mut raw_left = [0i16; 3];
        let mut raw_right = [0i16; 3];
        wave.read(&mut [ &mut raw_left, &mut raw_right ], 3)?;
        assert_eq!(raw_left, [ 16384, -32768, 32767 ]);
        assert_eq!(raw_right, [ 8192, 0, -32768 ]);
        wave.rewind()?;
        let mut left = [0f64; 3];
        let mut right = [0f64; 3];
        wave.read_f64(&mut [ &mut left, &mut right ], 3)?;
        assert_eq!(left, [ 0.5, -1.0, 32767.0 / 32768.0 ]);
        assert_eq!(right, [ 0.25, 0.0, -1.0 ]);
        Ok(())
    }

    #[test]
    fn test_alaw_f64() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = open(&mut output, OpenMode::READ | OpenMode::WRITE)?;
        wave.set_channels(1)?;
        wave.set_format_tag(FormatTag::ALaw)?;
        wave.write_f64(&[ &[ 0.0, 0.5, -0.5 ] ], 3)?;
        wave.rewind()?;
        let mut encoded = [0u8; 3];
        wave.read(&mut [ &mut encoded ], 3)?;
        assert_eq!(encoded[1], audio_codec_algorithms::encode_alaw(16384));
        wave.rewind()?;
        let mut decoded = [0f64; 3];
        wave.read_f64(&mut [ &mut decoded ], 3)?;
        assert!((decoded[1] - 0.5).abs() < 0.05);
        assert!((decoded[2] + 0.5).abs() < 0.05);
        assert_eq!(wave.fact_sample_length(), Some(3));
        Ok(())
    }

    #[test]
    fn test_scratch_buffer_grows() -> WaveResult<()> {
        let mut output = vec![];
        let mut wave = create(&mut output)?;
        wave.write(&[ &[ 0i16; 2 ], &[ 0i16; 2 ] ], 2)?;
        assert_eq!(wave.scratch.len(), 8);
        wave.write(&[ &[ 0i16; 16 ], &[ 0i16; 16 ] ], 16)?;
        assert_eq!(wave.scratch.len(), 64);
        wave.write(&[ &[ 0i16; 4 ], &[ 0i16; 4 ] ], 4)?;
        assert_eq!(wave.scratch.len(), 64);
        assert_eq!(wave.length(), 22);
        Ok(())
    }

    /// Stream which can be made to fail all writes.
    struct FailingWrites {
        inner: Cursor<Vec<u8>>,
        fail: bool,
    }

    impl Read for FailingWrites {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl Write for FailingWrites {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.fail {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "write failed"));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Seek for FailingWrites {
        fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    #[test]
    fn test_failed_header_write_keeps_header() -> WaveResult<()> {
        let stream = FailingWrites { inner: Cursor::new(vec![]), fail: false };
        let mut wave = WaveFile::from_stream(stream, "test.wav", OpenMode::WRITE)?;
        let header = wave.header.clone();
        wave.get_mut().fail = true;
        assert!(matches!(wave.set_channels(1), Err(WaveError::Io(_))));
        assert_eq!(wave.header, header);
        assert!(matches!(wave.set_sample_rate(8000), Err(WaveError::Io(_))));
        assert!(matches!(wave.set_format_tag(FormatTag::IeeeFloat), Err(WaveError::Io(_))));
        assert_eq!(wave.header, header);
        assert_eq!(wave.format_tag(), FormatTag::Pcm);
        assert_eq!(wave.fact_sample_length(), None);

        wave.get_mut().fail = false;
        wave.set_format_tag(FormatTag::IeeeFloat)?;
        assert_eq!(wave.fact_sample_length(), Some(0));
        assert_eq!(wave.tell()?, 0);
        assert_eq!(wave.get_ref().inner.get_ref().len(), 56);
        clear_error();
        Ok(())
    }
}
