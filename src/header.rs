// Parsing and writing the RIFF/WAVE header.

use crate::chunks::{DataChunk, FactChunk, FormatChunk};
use crate::{cast, ChunkId, FormatTag, Read, Seek, SeekFrom, WaveError, WaveResult, Write};
use tracing::debug;

/// Position of the first chunk after the RIFF header.
const FIRST_CHUNK_POS: u64 = 12;

/// Chunks of a WAVE file: the RIFF size and the format, fact and data chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// Declared RIFF chunk size.
    pub riff_size: u32,
    pub format: FormatChunk,
    pub fact: Option<FactChunk>,
    pub data: DataChunk,
}

impl Header {
    /// Creates the header of a new file: 16-bit stereo 44100 Hz PCM without sample data.
    pub fn new() -> Header {
        let mut header = Header {
            riff_size: 0,
            format: FormatChunk::new(FIRST_CHUNK_POS),
            fact: None,
            data: DataChunk { pos: 0, size: 0 },
        };
        header.relayout();
        header.riff_size = 4 + 8 + crate::chunks::FORMAT_BODY_SIZE + 8;
        header
    }

    /// Places the chunks one after another: format, fact (if any) and data.
    /// Must be called only when there is no sample data.
    pub fn relayout(&mut self) {
        self.format.pos = FIRST_CHUNK_POS;
        let format_size = u64::from(self.format.size);
        let mut next = self.format.pos + 8 + format_size + (format_size & 1);
        if let Some(fact) = &mut self.fact {
            fact.pos = next;
            next += 8 + u64::from(fact.size);
        }
        self.data.pos = next;
    }

    /// Calculates the RIFF chunk size, which covers everything up to the end of
    /// the sample data and its pad byte.
    pub fn calculate_riff_size(&self) -> WaveResult<u32> {
        let pad = u64::from(self.data.size & 1);
        let end = self.data.end() + pad;
        u32::try_from(end - 8).map_err(|_| WaveError::Param("File size is too large".to_string()))
    }

    /// Returns `size` as a data chunk size if the resulting RIFF size fits in 32 bits.
    pub fn checked_data_size(&self, size: u64) -> WaveResult<u32> {
        let end = self.data.start() + size + (size & 1);
        if end - 8 > u64::from(u32::MAX) {
            return Err(WaveError::Param("Data chunk size is too large".to_string()));
        }
        u32::try_from(size).map_err(|_| WaveError::Param("Data chunk size is too large".to_string()))
    }

    /// Sample frame count in the data chunk.
    pub fn length(&self) -> u64 {
        if self.format.block_align == 0 {
            return 0;
        }
        u64::from(self.data.size / u32::from(self.format.block_align))
    }
}

fn read_exact_or_eof(read: &mut dyn Read, buf: &mut [u8]) -> WaveResult<()> {
    match read.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(crate::unexpectedeof()),
        Err(e) => Err(WaveError::Io(e)),
    }
}

fn read_chunkid_and_size(read: &mut dyn Read) -> WaveResult<(ChunkId, u32)> {
    let mut buf = [0u8; 8];
    read_exact_or_eof(read, &mut buf)?;
    let mut id = [0u8; 4];
    id.copy_from_slice(&buf[0..4]);
    let mut size = [0u8; 4];
    size.copy_from_slice(&buf[4..8]);
    Ok((id, u32::from_le_bytes(size)))
}

/// Reads the header from the start of the stream. The chunks are scanned until
/// the data chunk is found. Unknown chunks are skipped. On success, the stream
/// is positioned at the start of the sample data.
pub fn parse_header<R: Read + Seek>(stream: &mut R) -> WaveResult<Header> {
    stream.seek(SeekFrom::Start(0))?;
    let (riff_id, riff_size) = read_chunkid_and_size(stream)?;
    if riff_id != crate::CHUNKID_RIFF {
        return Err(WaveError::Format("Not a RIFF file".to_string()));
    }
    let mut form_type = [0u8; 4];
    read_exact_or_eof(stream, &mut form_type)?;
    if form_type != crate::CHUNKID_WAVE {
        return Err(WaveError::Format("Not a WAVE file".to_string()));
    }

    let mut format: Option<FormatChunk> = None;
    let mut fact: Option<FactChunk> = None;
    let mut pos = FIRST_CHUNK_POS;
    loop {
        let (id, size) = read_chunkid_and_size(stream)?;
        debug!("chunk {:?} at {}, size {}", String::from_utf8_lossy(&id), pos, size);
        match id {
            crate::CHUNKID_FMT => {
                let mut body = [0u8; 40];
                let len = cast::u32_to_usize(size)?.min(body.len());
                read_exact_or_eof(stream, &mut body[..len])?;
                let fmt = FormatChunk::from_bytes(pos, size, &body[..len])?;
                if fmt.format_tag == FormatTag::Extensible {
                    return Err(WaveError::Format(format!("Unsupported format tag: {:#010x}",
                        fmt.format_tag.to_u16())));
                }
                if fmt.channels == 0 || fmt.block_align == 0 {
                    return Err(WaveError::Format(format!(
                        "Invalid fmt chunk: {} channels, block align {}",
                        fmt.channels, fmt.block_align)));
                }
                format = Some(fmt);
            },
            crate::CHUNKID_FACT => {
                if size < crate::chunks::FACT_BODY_SIZE {
                    return Err(WaveError::Format(format!("Invalid fact chunk size: {}", size)));
                }
                let mut buf = [0u8; 4];
                read_exact_or_eof(stream, &mut buf)?;
                fact = Some(FactChunk { pos, size, sample_length: u32::from_le_bytes(buf) });
            },
            crate::CHUNKID_DATA => {
                let Some(format) = format else {
                    return Err(WaveError::Format("No fmt chunk before data chunk".to_string()));
                };
                let header = Header { riff_size, format, fact, data: DataChunk { pos, size } };
                debug!("data starts at {}, {} frames", header.data.start(), header.length());
                return Ok(header);
            },
            _ => {}
        }
        // skip the rest of the chunk and its pad byte
        let size = u64::from(size);
        pos = pos + 8 + size + (size & 1);
        stream.seek(SeekFrom::Start(pos))?;
    }
}

/// Writes the whole header to the positions stored in `header`.
///
/// The RIFF size is recalculated. The stream position is restored afterwards,
/// but it is never left before the start of the sample data.
pub fn write_header<W: Write + Seek>(stream: &mut W, header: &mut Header) -> WaveResult<()> {
    let saved_pos = stream.stream_position()?;
    header.riff_size = header.calculate_riff_size()?;
    stream.seek(SeekFrom::Start(0))?;
    stream.write_all(&crate::CHUNKID_RIFF)?;
    stream.write_all(&header.riff_size.to_le_bytes())?;
    stream.write_all(&crate::CHUNKID_WAVE)?;
    stream.seek(SeekFrom::Start(header.format.pos))?;
    header.format.write(stream)?;
    if let Some(fact) = &header.fact {
        stream.seek(SeekFrom::Start(fact.pos))?;
        fact.write(stream)?;
    }
    stream.seek(SeekFrom::Start(header.data.pos))?;
    header.data.write(stream)?;
    stream.seek(SeekFrom::Start(saved_pos.max(header.data.start())))?;
    Ok(())
}

/// Writes only the RIFF size, the fact sample length and the data size.
/// The stream position is restored afterwards.
pub fn update_sizes<W: Write + Seek>(stream: &mut W, header: &mut Header) -> WaveResult<()> {
    let saved_pos = stream.stream_position()?;
    header.riff_size = header.calculate_riff_size()?;
    stream.seek(SeekFrom::Start(4))?;
    stream.write_all(&header.riff_size.to_le_bytes())?;
    if let Some(fact) = &header.fact {
        stream.seek(SeekFrom::Start(fact.sample_length_pos()))?;
        stream.write_all(&fact.sample_length.to_le_bytes())?;
    }
    stream.seek(SeekFrom::Start(header.data.size_pos()))?;
    stream.write_all(&header.data.size.to_le_bytes())?;
    stream.seek(SeekFrom::Start(saved_pos))?;
    Ok(())
}
