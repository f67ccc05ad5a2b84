use super::{Float, Result, WtError};
use super::signal;

use num::ToPrimitive;

// Format tag identifiers (don't care about uLaw for now)
pub const FMT_PCM: u16 = 1;
pub const FMT_FLOAT: u16 = 3;
pub const FMT_EXTENSIBLE: u16 = 0xFFFE;

pub const SIZE_FMT_BASIC: usize = 16;
pub const SIZE_FMT_EXTENSIBLE: usize = 40;

/// Represents the format chunk that needs to be present in every WAV file.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct FmtChunk {
    pub format_tag: u16,      // wFormatTag      2   Format code
    pub num_channels: u16,    // nChannels       2   Number of interleaved channels
    pub sample_rate: u32,     // nSamplesPerSec  4   Sampling rate (blocks per second)
    pub avg_data_rate: u32,   // nAvgBytesPerSec 4   Data rate
    pub block_align: u16,     // nBlockAlign     2   Data block size (bytes)
    pub bits_per_sample: u16, // wBitsPerSample  2   Bits per sample
    pub cb_size: u16,         // cbSize          2   Size of the extension (0 or 22)
    pub valid_bits: u16,      // wValidBitsPerSample 2   Number of valid bits
    pub channel_mask: u32,    // dwChannelMask   4   Speaker position mask
    pub sub_format: [u8; 16]  // SubFormat       16  GUID, including the data format code
}

impl FmtChunk {
    /// Format chunk for a mono file holding the given samples.
    pub fn new(data: &WavDataType, sample_rate: u32) -> FmtChunk {
        let bps = data.get_bits_per_sample();
        let block_align = bps / 8;
        FmtChunk{
            format_tag: data.get_format_tag(),
            num_channels: 1,
            sample_rate,
            avg_data_rate: sample_rate * block_align as u32,
            block_align,
            bits_per_sample: bps,
            cb_size: 0,
            valid_bits: 0,
            channel_mask: 0,
            sub_format: [0u8; 16],
        }
    }

    /// Parse the body of a fmt chunk (without chunk header).
    ///
    /// Accepts the basic 16 byte layout, the 18 byte layout with cbSize and
    /// the 40 byte WAVE_FORMAT_EXTENSIBLE layout.
    pub fn parse(bytes: &[u8]) -> Result<FmtChunk> {
        if bytes.len() < SIZE_FMT_BASIC {
            return Err(WtError::WavFormat(format!("Format chunk too short: {} bytes", bytes.len())));
        }
        let u16_at = |pos: usize| u16::from_le_bytes([bytes[pos], bytes[pos + 1]]);
        let u32_at = |pos: usize| u32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]]);
        let mut fmt = FmtChunk{
            format_tag: u16_at(0),
            num_channels: u16_at(2),
            sample_rate: u32_at(4),
            avg_data_rate: u32_at(8),
            block_align: u16_at(12),
            bits_per_sample: u16_at(14),
            ..Default::default()
        };
        if bytes.len() >= SIZE_FMT_BASIC + 2 {
            fmt.cb_size = u16_at(16);
        }
        if bytes.len() >= SIZE_FMT_EXTENSIBLE {
            fmt.valid_bits = u16_at(18);
            fmt.channel_mask = u32_at(20);
            fmt.sub_format.copy_from_slice(&bytes[24..40]);
        }
        Ok(fmt)
    }

    /// Serialize the basic 16 byte layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SIZE_FMT_BASIC);
        bytes.extend_from_slice(&self.format_tag.to_le_bytes());
        bytes.extend_from_slice(&self.num_channels.to_le_bytes());
        bytes.extend_from_slice(&self.sample_rate.to_le_bytes());
        bytes.extend_from_slice(&self.avg_data_rate.to_le_bytes());
        bytes.extend_from_slice(&self.block_align.to_le_bytes());
        bytes.extend_from_slice(&self.bits_per_sample.to_le_bytes());
        bytes
    }

    /// The actual sample format, resolving WAVE_FORMAT_EXTENSIBLE to the
    /// format code stored in the first two bytes of the sub format GUID.
    pub fn get_data_format(&self) -> u16 {
        if self.format_tag == FMT_EXTENSIBLE {
            u16::from_le_bytes([self.sub_format[0], self.sub_format[1]])
        } else {
            self.format_tag
        }
    }

    /// Get the number of audio channels defined in the WAV file.
    pub fn get_num_channels(&self) -> usize {
        self.num_channels as usize
    }

    /// Get the number of bits per sample defined in the WAV file.
    pub fn get_bits_per_sample(&self) -> usize {
        self.bits_per_sample as usize
    }
}

/// Container for the different sample data types.
///
/// 24 bit samples are stored sign extended in an i32.
#[derive(Debug, Clone, PartialEq)]
pub enum WavDataType {
    PCM8(Vec<u8>),
    PCM16(Vec<i16>),
    PCM24(Vec<i32>),
    PCM32(Vec<i32>),
    FLOAT32(Vec<f32>),
    FLOAT64(Vec<f64>)
}

impl WavDataType {
    /// Get the number of samples in the container.
    pub fn get_num_samples(&self) -> usize {
        match self {
            WavDataType::PCM8(v) => v.len(),
            WavDataType::PCM16(v) => v.len(),
            WavDataType::PCM24(v) => v.len(),
            WavDataType::PCM32(v) => v.len(),
            WavDataType::FLOAT32(v) => v.len(),
            WavDataType::FLOAT64(v) => v.len(),
        }
    }

    /// Get a printable representation of the data type.
    pub fn get_type(&self) -> &str {
        match self {
            WavDataType::PCM8(_) => "PCM8",
            WavDataType::PCM16(_) => "PCM16",
            WavDataType::PCM24(_) => "PCM24",
            WavDataType::PCM32(_) => "PCM32",
            WavDataType::FLOAT32(_) => "Float32",
            WavDataType::FLOAT64(_) => "Float64",
        }
    }

    /// Get the format tag of the FMT chunk that represents the current
    /// data type.
    pub fn get_format_tag(&self) -> u16 {
        match self {
            WavDataType::FLOAT32(_) | WavDataType::FLOAT64(_) => FMT_FLOAT,
            _ => FMT_PCM,
        }
    }

    pub fn get_bits_per_sample(&self) -> u16 {
        match self {
            WavDataType::PCM8(_) => 8,
            WavDataType::PCM16(_) => 16,
            WavDataType::PCM24(_) => 24,
            WavDataType::PCM32(_) => 32,
            WavDataType::FLOAT32(_) => 32,
            WavDataType::FLOAT64(_) => 64,
        }
    }

    pub fn get_num_bytes(&self) -> usize {
        self.get_num_samples() * (self.get_bits_per_sample() / 8) as usize
    }

    /// Sample values as floats without scaling.
    ///
    /// Integer samples keep their integer range. Unsigned 8 bit samples are
    /// shifted down by 128 so that silence is 0.
    pub fn to_float(&self) -> Vec<Float> {
        match self {
            WavDataType::PCM8(v) => v.iter().map(|s| *s as Float - 128.0).collect(),
            WavDataType::PCM16(v) => convert(v),
            WavDataType::PCM24(v) => convert(v),
            WavDataType::PCM32(v) => convert(v),
            WavDataType::FLOAT32(v) => convert(v),
            WavDataType::FLOAT64(v) => v.clone(),
        }
    }

    /// Sample values scaled to [-1.0, 1.0) by the full scale of the format.
    pub fn to_unit_float(&self) -> Vec<Float> {
        let full_scale: Float = match self {
            WavDataType::PCM8(_) => 128.0,
            WavDataType::PCM16(_) => 32768.0,
            WavDataType::PCM24(_) => 8388608.0,
            WavDataType::PCM32(_) => 2147483648.0,
            WavDataType::FLOAT32(_) | WavDataType::FLOAT64(_) => 1.0,
        };
        let mut samples = self.to_float();
        if full_scale != 1.0 {
            for s in samples.iter_mut() {
                *s /= full_scale;
            }
        }
        samples
    }
}

fn convert<T: ToPrimitive>(data: &[T]) -> Vec<Float> {
    data.iter().map(|s| s.to_f64().unwrap_or(0.0)).collect()
}

/// Contains the format information and sample data read from the file.
#[derive(Debug, Clone)]
pub struct WavData {
    info: FmtChunk,
    data: WavDataType,
}

impl WavData {
    pub fn new(info: FmtChunk, data: WavDataType) -> WavData {
        WavData{info, data}
    }

    /// Create a mono file containing the given list of samples.
    pub fn new_from_data(samples: WavDataType, sample_rate: u32) -> WavData {
        let info = FmtChunk::new(&samples, sample_rate);
        WavData{info, data: samples}
    }

    /// Get the FMT chunk.
    pub fn get_fmt(&self) -> &FmtChunk {
        &self.info
    }

    /// Get mutable reference to the FMT chunk.
    pub fn get_fmt_mut(&mut self) -> &mut FmtChunk {
        &mut self.info
    }

    pub fn get_sample_rate(&self) -> u32 {
        self.info.sample_rate
    }

    /// Get the number of samples over all channels.
    pub fn get_num_samples(&self) -> usize {
        self.data.get_num_samples()
    }

    /// Get the number of sample frames (samples per channel).
    pub fn get_num_frames(&self) -> usize {
        self.get_num_samples() / self.info.get_num_channels().max(1)
    }

    /// Get the number of sample bytes.
    pub fn get_num_bytes(&self) -> usize {
        self.data.get_num_bytes()
    }

    pub fn get_samples(&self) -> &WavDataType {
        &self.data
    }

    /// All channels summed into one, unscaled.
    pub fn get_mono_samples(&self) -> Vec<Float> {
        signal::mix_down(&self.data.to_float(), self.info.get_num_channels())
    }

    /// All channels summed into one, scaled by the format's full scale.
    pub fn get_mono_unit_samples(&self) -> Vec<Float> {
        signal::mix_down(&self.data.to_unit_float(), self.info.get_num_channels())
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[test]
fn fmt_chunk_describes_mono_data() {
    let samples = WavDataType::PCM16(vec![1, 2, 3]);
    let fmt = FmtChunk::new(&samples, 44100);
    assert_eq!(fmt.format_tag, FMT_PCM);
    assert_eq!(fmt.num_channels, 1);
    assert_eq!(fmt.block_align, 2);
    assert_eq!(fmt.avg_data_rate, 88200);
    assert_eq!(FmtChunk::parse(&fmt.to_bytes()).unwrap(), fmt);
}

#[test]
fn extensible_format_is_resolved() {
    let mut bytes = FmtChunk::new(&WavDataType::FLOAT32(vec![]), 48000).to_bytes();
    bytes[0] = 0xFE;
    bytes[1] = 0xFF;
    bytes.extend_from_slice(&[22, 0, 32, 0, 4, 0, 0, 0]);
    let mut guid = [0u8; 16];
    guid[0] = 0x03;
    bytes.extend_from_slice(&guid);
    let fmt = FmtChunk::parse(&bytes).unwrap();
    assert_eq!(fmt.format_tag, FMT_EXTENSIBLE);
    assert_eq!(fmt.cb_size, 22);
    assert_eq!(fmt.channel_mask, 4);
    assert_eq!(fmt.get_data_format(), FMT_FLOAT);
}

#[test]
fn short_fmt_chunk_is_rejected() {
    assert!(matches!(FmtChunk::parse(&[1, 0, 1, 0]), Err(WtError::WavFormat(_))));
}

#[test]
fn u8_is_centered() {
    let data = WavDataType::PCM8(vec![0, 128, 255]);
    assert_eq!(data.to_float(), vec![-128.0, 0.0, 127.0]);
    assert_eq!(data.to_unit_float(), vec![-1.0, 0.0, 127.0 / 128.0]);
}

#[test]
fn i16_keeps_integer_range() {
    let data = WavDataType::PCM16(vec![-32768, 0, 16384]);
    assert_eq!(data.to_float(), vec![-32768.0, 0.0, 16384.0]);
    assert_eq!(data.to_unit_float(), vec![-1.0, 0.0, 0.5]);
}

#[test]
fn stereo_is_summed_to_mono() {
    let mut wav = WavData::new_from_data(WavDataType::PCM16(vec![100, 200, -50, -50]), 44100);
    wav.get_fmt_mut().num_channels = 2;
    assert_eq!(wav.get_num_frames(), 2);
    assert_eq!(wav.get_mono_samples(), vec![300.0, -100.0]);
}
