// Chunk records for the RIFF/WAVE format, fact and data chunks.

use crate::{FormatTag, WaveError, WaveResult, Write};

/// Size of the format chunk body for PCM, IEEE float, A-law and μ-law.
pub const FORMAT_BODY_SIZE: u32 = 16;
/// Size of the format chunk body for the extensible format.
pub const FORMAT_BODY_SIZE_EXTENSIBLE: u32 = 40;
/// Size of the extension of the extensible format.
pub const EXTENSIBLE_EXT_SIZE: u16 = 22;
/// Size of the fact chunk body.
pub const FACT_BODY_SIZE: u32 = 4;

/// The sub-format GUID of PCM data, used as the default sub-format.
pub const SUB_FORMAT_PCM: [u8; 16] = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00,
    0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71
];

fn read_u16_from_pos(data: &[u8], pos: &mut usize) -> WaveResult<u16> {
    let Some(pos_end) = pos.checked_add(2) else {
        return Err(crate::unexpectedeof());
    };
    if pos_end > data.len() {
        return Err(crate::unexpectedeof());
    }
    let mut buf = [0u8; 2];
    buf.copy_from_slice(&data[*pos..pos_end]);
    *pos = pos_end;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32_from_pos(data: &[u8], pos: &mut usize) -> WaveResult<u32> {
    let Some(pos_end) = pos.checked_add(4) else {
        return Err(crate::unexpectedeof());
    };
    if pos_end > data.len() {
        return Err(crate::unexpectedeof());
    }
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[*pos..pos_end]);
    *pos = pos_end;
    Ok(u32::from_le_bytes(buf))
}

/// The "fmt " chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatChunk {
    /// Chunk start position (the start of the chunk id) in the stream.
    pub pos: u64,
    /// Declared body size.
    pub size: u32,
    pub format_tag: FormatTag,
    pub channels: u16,
    pub sample_rate: u32,
    pub avg_bytes_per_sec: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    /// Size of the extension. Written only if the body size is larger than 16.
    pub ext_size: u16,
    pub valid_bits_per_sample: u16,
    pub channel_mask: u32,
    pub sub_format: [u8; 16],
}

impl FormatChunk {
    /// Creates a 16-bit stereo 44100 Hz PCM format chunk located at `pos`.
    pub fn new(pos: u64) -> FormatChunk {
        FormatChunk {
            pos,
            size: FORMAT_BODY_SIZE,
            format_tag: FormatTag::Pcm,
            channels: 2,
            sample_rate: 44100,
            avg_bytes_per_sec: 44100 * 4,
            block_align: 4,
            bits_per_sample: 16,
            ext_size: 0,
            valid_bits_per_sample: 0,
            channel_mask: 0,
            sub_format: SUB_FORMAT_PCM,
        }
    }

    /// Parses the format chunk body. `data` contains the first `min(size, 40)` bytes
    /// of the body.
    pub fn from_bytes(pos: u64, size: u32, data: &[u8]) -> WaveResult<FormatChunk> {
        if size < FORMAT_BODY_SIZE || data.len() < 16 {
            return Err(WaveError::Format(format!("Invalid fmt chunk size: {}", size)));
        }
        let mut body = [0u8; 40];
        let len = data.len().min(body.len());
        body[..len].copy_from_slice(&data[..len]);
        let mut p = 0;
        let tag_value = read_u16_from_pos(&body, &mut p)?;
        let Some(format_tag) = FormatTag::from_u16(tag_value) else {
            return Err(WaveError::Format(format!("Unsupported format tag: {:#010x}", tag_value)));
        };
        let channels = read_u16_from_pos(&body, &mut p)?;
        let sample_rate = read_u32_from_pos(&body, &mut p)?;
        let avg_bytes_per_sec = read_u32_from_pos(&body, &mut p)?;
        let block_align = read_u16_from_pos(&body, &mut p)?;
        let bits_per_sample = read_u16_from_pos(&body, &mut p)?;
        let ext_size = read_u16_from_pos(&body, &mut p)?;
        let valid_bits_per_sample = read_u16_from_pos(&body, &mut p)?;
        let channel_mask = read_u32_from_pos(&body, &mut p)?;
        let mut sub_format = SUB_FORMAT_PCM;
        if data.len() >= body.len() {
            sub_format.copy_from_slice(&body[p..p+16]);
        }
        Ok(FormatChunk {
            pos,
            size,
            format_tag,
            channels,
            sample_rate,
            avg_bytes_per_sec,
            block_align,
            bits_per_sample,
            ext_size,
            valid_bits_per_sample,
            channel_mask,
            sub_format,
        })
    }

    /// Returns all known body fields as bytes.
    fn to_bytes(&self) -> [u8; 40] {
        let mut buf = [0u8; 40];
        buf[0..2].copy_from_slice(&self.format_tag.to_u16().to_le_bytes());
        buf[2..4].copy_from_slice(&self.channels.to_le_bytes());
        buf[4..8].copy_from_slice(&self.sample_rate.to_le_bytes());
        buf[8..12].copy_from_slice(&self.avg_bytes_per_sec.to_le_bytes());
        buf[12..14].copy_from_slice(&self.block_align.to_le_bytes());
        buf[14..16].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        buf[16..18].copy_from_slice(&self.ext_size.to_le_bytes());
        buf[18..20].copy_from_slice(&self.valid_bits_per_sample.to_le_bytes());
        buf[20..24].copy_from_slice(&self.channel_mask.to_le_bytes());
        buf[24..40].copy_from_slice(&self.sub_format);
        buf
    }

    /// Writes the chunk id, size and body. Bytes of the declared body beyond
    /// the known fields are not written.
    pub fn write(&self, write: &mut dyn Write) -> WaveResult<()> {
        write.write_all(&crate::CHUNKID_FMT)?;
        write.write_all(&self.size.to_le_bytes())?;
        let body = self.to_bytes();
        let len = crate::cast::u32_to_usize(self.size)?.min(body.len());
        write.write_all(&body[..len])?;
        Ok(())
    }

    /// Sample byte width: block align divided by channels.
    pub fn sample_size(&self) -> u16 {
        if self.channels == 0 {
            return 0;
        }
        self.block_align / self.channels
    }

    /// Recalculates the average bytes per second from the block align and sample rate.
    pub fn update_avg_bytes_per_sec(&mut self) {
        self.avg_bytes_per_sec = u32::from(self.block_align).wrapping_mul(self.sample_rate);
    }
}

/// The "fact" chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct FactChunk {
    /// Chunk start position (the start of the chunk id) in the stream.
    pub pos: u64,
    /// Declared body size.
    pub size: u32,
    /// Number of sample frames.
    pub sample_length: u32,
}

impl FactChunk {
    pub fn new(pos: u64) -> FactChunk {
        FactChunk { pos, size: FACT_BODY_SIZE, sample_length: 0 }
    }

    pub fn write(&self, write: &mut dyn Write) -> WaveResult<()> {
        write.write_all(&crate::CHUNKID_FACT)?;
        write.write_all(&self.size.to_le_bytes())?;
        write.write_all(&self.sample_length.to_le_bytes())?;
        Ok(())
    }

    /// Position of the sample length field.
    pub fn sample_length_pos(&self) -> u64 {
        self.pos + 8
    }
}

/// The "data" chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct DataChunk {
    /// Chunk start position (the start of the chunk id) in the stream.
    pub pos: u64,
    /// Declared body size, which doesn't include the pad byte.
    pub size: u32,
}

impl DataChunk {
    /// Writes the chunk id and size, but not the sample data.
    pub fn write(&self, write: &mut dyn Write) -> WaveResult<()> {
        write.write_all(&crate::CHUNKID_DATA)?;
        write.write_all(&self.size.to_le_bytes())?;
        Ok(())
    }

    /// Position of the size field.
    pub fn size_pos(&self) -> u64 {
        self.pos + 4
    }

    /// Position of the first sample byte.
    pub fn start(&self) -> u64 {
        self.pos + 8
    }

    /// Position after the last sample byte, not including the pad byte.
    pub fn end(&self) -> u64 {
        self.start() + u64::from(self.size)
    }
}
