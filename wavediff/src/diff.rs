use std::fmt;
use std::fs::{self, File};
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{error, info};
use walkdir::WalkDir;
use wavefile::{FormatTag, OpenMode, WaveFile};

use crate::stats::ChannelStats;

/// Number of frames read from each input at a time.
pub const BLOCK_SIZE: usize = 256;

/// Header values of an input file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSummary {
    pub format_tag: FormatTag,
    pub channels: u16,
    pub sample_size: u16,
    pub valid_bits: u16,
    pub sample_rate: u32,
    pub length: u64,
}

impl FileSummary {
    fn from_wave(wave: &WaveFile<File>) -> FileSummary {
        FileSummary {
            format_tag: wave.format_tag(),
            channels: wave.channels(),
            sample_size: wave.sample_size(),
            valid_bits: wave.valid_bits_per_sample(),
            sample_rate: wave.sample_rate(),
            length: wave.length(),
        }
    }
}

impl fmt::Display for FileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  format: {:#06x}", self.format_tag.to_u16())?;
        writeln!(f, "  channels: {}", self.channels)?;
        writeln!(f, "  sample size: {}", self.sample_size)?;
        writeln!(f, "  valid bits: {}", self.valid_bits)?;
        writeln!(f, "  sample rate: {}", self.sample_rate)?;
        write!(f, "  length: {}", self.length)
    }
}

/// Result of comparing two files.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffReport {
    /// Number of compared frames: the length of the shorter input.
    pub frames: u64,
    pub channels: Vec<ChannelStats>,
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ch, stats) in self.channels.iter().enumerate() {
            writeln!(f, "  channel {} max diff = {:.6} dB at frame {}",
                ch, stats.peak_db(), stats.peak_frame)?;
            writeln!(f, "  channel {} average diff = {:.6} dB", ch, stats.average_db())?;
        }
        Ok(())
    }
}

/// Number of compared and failed file pairs in directory mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirOutcome {
    pub compared: usize,
    pub failed: usize,
}

fn open_input(path: &Path, index: usize) -> Result<WaveFile<File>> {
    let wave = WaveFile::open(path, OpenMode::READ)
        .with_context(|| format!("can't open input file {}", path.display()))?;
    println!("input file {}: {}", index, path.display());
    println!("{}", FileSummary::from_wave(&wave));
    Ok(wave)
}

fn read_block(wave: &mut WaveFile<File>, buffers: &mut [Vec<f64>]) -> Result<usize> {
    let mut channels: Vec<&mut [f64]> = buffers.iter_mut().map(|b| b.as_mut_slice()).collect();
    let count = wave.read_f64(&mut channels, BLOCK_SIZE)
        .with_context(|| format!("can't read samples from {}", wave.name()))?;
    Ok(count)
}

/// Compares `in1` and `in2` and writes `in1 - in2` to `out` as 64-bit float samples.
///
/// Both inputs must have the same number of channels and sample rate. This is checked
/// before the output file is created. Only the frames of the shorter input are compared.
pub fn diff_files(in1: &Path, in2: &Path, out: &Path) -> Result<DiffReport> {
    let mut wave1 = open_input(in1, 1)?;
    let mut wave2 = open_input(in2, 2)?;
    if wave1.channels() != wave2.channels() || wave1.sample_rate() != wave2.sample_rate() {
        bail!("inputs don't match: {} channels at {} Hz and {} channels at {} Hz",
            wave1.channels(), wave1.sample_rate(), wave2.channels(), wave2.sample_rate());
    }

    let mut output = WaveFile::open(out, OpenMode::WRITE)
        .with_context(|| format!("can't create output file {}", out.display()))?;
    output.set_format_tag(FormatTag::IeeeFloat)?;
    output.set_sample_size(8)?;
    output.set_sample_rate(wave1.sample_rate())?;
    output.set_channels(wave1.channels())?;

    let num_channels = usize::from(wave1.channels());
    let mut buf1 = vec![vec![0f64; BLOCK_SIZE]; num_channels];
    let mut buf2 = vec![vec![0f64; BLOCK_SIZE]; num_channels];
    let mut stats = vec![ChannelStats::default(); num_channels];
    let mut frames: u64 = 0;
    loop {
        let count1 = read_block(&mut wave1, &mut buf1)?;
        let count2 = read_block(&mut wave2, &mut buf2)?;
        let count = count1.min(count2);
        for ch in 0..num_channels {
            for i in 0..count {
                let diff = buf1[ch][i] - buf2[ch][i];
                buf1[ch][i] = diff;
                stats[ch].add(frames + i as u64, diff);
            }
        }
        let channels: Vec<&[f64]> = buf1.iter().map(|b| &b[..count]).collect();
        output.write_f64(&channels, count)
            .with_context(|| format!("can't write samples to {}", out.display()))?;
        frames += count as u64;
        if count < BLOCK_SIZE {
            break;
        }
    }
    output.close().with_context(|| format!("can't close {}", out.display()))?;
    info!("wrote {} frames to {}", frames, out.display());
    Ok(DiffReport { frames, channels: stats })
}

fn is_wav(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("wav"))
}

/// Compares the files with the same name in directories `in1` and `in2`, writing the
/// results to `out`, which is created if needed. Subdirectories are compared recursively.
///
/// A failing file pair is reported and counted, and the comparison continues.
pub fn diff_dirs(in1: &Path, in2: &Path, out: &Path) -> Result<DirOutcome> {
    let mut outcome = DirOutcome::default();
    diff_dirs_into(in1, in2, out, &mut outcome)?;
    Ok(outcome)
}

fn diff_dirs_into(in1: &Path, in2: &Path, out: &Path, outcome: &mut DirOutcome) -> Result<()> {
    fs::create_dir_all(out)
        .with_context(|| format!("can't create output directory {}", out.display()))?;
    for entry in WalkDir::new(in1).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.with_context(|| format!("can't read directory {}", in1.display()))?;
        let other = in2.join(entry.file_name());
        let target = out.join(entry.file_name());
        if entry.file_type().is_dir() {
            if other.is_dir() {
                diff_dirs_into(entry.path(), &other, &target, outcome)?;
            }
        } else if is_wav(entry.path()) && other.is_file() {
            println!("diff {} {}", entry.path().display(), other.display());
            match diff_files(entry.path(), &other, &target) {
                Ok(report) => {
                    print!("{}", report);
                    outcome.compared += 1;
                },
                Err(e) => {
                    error!("{}: {:#}", entry.path().display(), e);
                    println!("  diff failed!");
                    outcome.failed += 1;
                },
            }
        }
    }
    Ok(())
}
