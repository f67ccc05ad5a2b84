//! Reading and writing of WT wavetable files.
//!
//! A WT file is a 12 byte header followed by the samples of all waves:
//!
//! | Offset | Type    | Content                    |
//! |--------|---------|----------------------------|
//! | 0      | [u8; 4] | "vawt"                     |
//! | 4      | u32     | Samples per wave           |
//! | 8      | u16     | Number of waves            |
//! | 10     | u16     | Reserved, 0                |
//! | 12     | f32...  | Samples, one wave after another |
//!
//! All values are little endian.

use super::{Result, WtError};
use super::wav_data::WavData;
use super::wavetable::Wavetable;

use log::{debug, info};

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

pub const WT_MAGIC: &[u8; 4] = b"vawt";
pub const SIZE_WT_HEADER: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct WtFile {
    pub wave_size: u32,
    pub wave_count: u16,
    samples: Vec<f32>,
}

impl WtFile {
    /// Split the samples into waves of `wave_size` samples.
    ///
    /// The number of samples must be a multiple of `wave_size`.
    pub fn new(wave_size: usize, samples: Vec<f32>) -> Result<WtFile> {
        if wave_size == 0 || wave_size > u32::MAX as usize {
            return Err(WtError::WtFormat(format!("Invalid wave size {}", wave_size)));
        }
        if samples.len() % wave_size != 0 {
            return Err(WtError::WtFormat(format!("{} samples are not a multiple of wave size {}",
                samples.len(), wave_size)));
        }
        let wave_count = samples.len() / wave_size;
        if wave_count > u16::MAX as usize {
            return Err(WtError::TooManyFrames(wave_count));
        }
        Ok(WtFile{wave_size: wave_size as u32, wave_count: wave_count as u16, samples})
    }

    pub fn from_wavetable(wt: &Wavetable) -> Result<WtFile> {
        WtFile::new(wt.wave_size, wt.to_wt_floats())
    }

    /// Create WT data from the contents of a WAV file.
    ///
    /// All channels are summed to mono. Integer samples are scaled to float
    /// by their full scale value. Samples that don't fill a complete wave at
    /// the end are dropped.
    pub fn convert_wav(wav: &WavData, wave_size: usize) -> Result<WtFile> {
        if wave_size == 0 {
            return Err(WtError::WtFormat("Invalid wave size 0".to_string()));
        }
        let mut samples: Vec<f32> = wav.get_mono_unit_samples().iter().map(|s| *s as f32).collect();
        let wave_count = samples.len() / wave_size;
        if wave_count == 0 {
            return Err(WtError::WtFormat(format!("{} samples don't fill a single wave of {} samples",
                samples.len(), wave_size)));
        }
        if samples.len() % wave_size != 0 {
            info!("Dropping {} samples at the end", samples.len() % wave_size);
        }
        samples.truncate(wave_count * wave_size);
        WtFile::new(wave_size, samples)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Return the samples of the wave with the given index.
    pub fn get_wave(&self, wave_id: usize) -> &[f32] {
        let size = self.wave_size as usize;
        &self.samples[wave_id * size..(wave_id + 1) * size]
    }

    /// Serialize into a complete file image.
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(SIZE_WT_HEADER + self.samples.len() * 4);
        bytes.extend_from_slice(WT_MAGIC);
        bytes.extend_from_slice(&self.wave_size.to_le_bytes());
        bytes.extend_from_slice(&self.wave_count.to_le_bytes());
        bytes.extend_from_slice(&0u16.to_le_bytes());
        for s in &self.samples {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        bytes
    }

    pub fn write<W: Write>(&self, dest: &mut W) -> Result<()> {
        dest.write_all(&self.encode())?;
        Ok(())
    }

    pub fn write_file<P: AsRef<Path>>(&self, filename: P) -> Result<()> {
        let filename = filename.as_ref();
        info!("Writing WT file [{}], {} waves of {} samples", filename.display(), self.wave_count, self.wave_size);
        let mut writer = BufWriter::new(File::create(filename)?);
        self.write(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Read WT data from the provided input stream.
    ///
    /// Fails if the magic doesn't match or the stream holds less samples
    /// than announced in the header.
    pub fn read<R: Read>(source: &mut R) -> Result<WtFile> {
        let mut header = [0u8; SIZE_WT_HEADER];
        source.read_exact(&mut header)
            .map_err(|_| WtError::WtFormat("Header incomplete".to_string()))?;
        if &header[0..4] != WT_MAGIC {
            return Err(WtError::WtFormat(format!("Unexpected file ID {:?}", String::from_utf8_lossy(&header[0..4]))));
        }
        let wave_size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let wave_count = u16::from_le_bytes([header[8], header[9]]);
        let reserved = u16::from_le_bytes([header[10], header[11]]);
        debug!("WT header: {} waves of {} samples, reserved {}", wave_count, wave_size, reserved);

        let num_bytes = wave_size as u64 * wave_count as u64 * 4;
        let mut payload = Vec::new();
        source.take(num_bytes).read_to_end(&mut payload)?;
        if payload.len() as u64 != num_bytes {
            return Err(WtError::WtFormat(format!("Payload truncated, expected {} bytes, found {}",
                num_bytes, payload.len())));
        }
        let samples = payload
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        Ok(WtFile{wave_size, wave_count, samples})
    }

    pub fn read_file<P: AsRef<Path>>(filename: P) -> Result<WtFile> {
        let filename = filename.as_ref();
        info!("Reading WT file [{}]", filename.display());
        let mut reader = BufReader::new(File::open(filename)?);
        WtFile::read(&mut reader)
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
use super::wav_data::WavDataType;

#[test]
fn header_is_written_little_endian() {
    let wt = WtFile::new(2, vec![0.0, 0.5, -0.5, 1.0]).unwrap();
    let bytes = wt.encode();
    let expected_header: &[u8] = &[
        b'v', b'a', b'w', b't',
        0x02, 0x00, 0x00, 0x00, // Wave size
        0x02, 0x00,             // Wave count
        0x00, 0x00,             // Reserved
    ];
    assert_eq!(&bytes[0..SIZE_WT_HEADER], expected_header);
    assert_eq!(bytes.len(), SIZE_WT_HEADER + 16);
    assert_eq!(&bytes[16..20], &0.5f32.to_le_bytes());
}

#[test]
fn written_data_can_be_read() {
    let wt = WtFile::new(3, vec![0.1, 0.2, 0.3, -0.1, -0.2, -0.3]).unwrap();
    let bytes = wt.encode();
    let read_back = WtFile::read(&mut &bytes[..]).unwrap();
    assert_eq!(read_back, wt);
    assert_eq!(read_back.get_wave(1), &[-0.1f32, -0.2, -0.3]);
}

#[test]
fn wrong_magic_is_rejected() {
    let mut bytes = WtFile::new(1, vec![0.0]).unwrap().encode();
    bytes[0] = b'x';
    assert!(matches!(WtFile::read(&mut &bytes[..]), Err(WtError::WtFormat(_))));
}

#[test]
fn short_payload_is_rejected() {
    let bytes = WtFile::new(2, vec![0.0, 0.5, -0.5, 1.0]).unwrap().encode();
    let short = &bytes[..bytes.len() - 1];
    assert!(matches!(WtFile::read(&mut &short[..]), Err(WtError::WtFormat(_))));
    let header_only = &bytes[..8];
    assert!(matches!(WtFile::read(&mut &header_only[..]), Err(WtError::WtFormat(_))));
}

#[test]
fn invalid_sizes_are_rejected() {
    assert!(matches!(WtFile::new(0, vec![]), Err(WtError::WtFormat(_))));
    assert!(matches!(WtFile::new(2, vec![0.0; 3]), Err(WtError::WtFormat(_))));
    assert!(matches!(WtFile::new(1, vec![0.0; 65536]), Err(WtError::TooManyFrames(65536))));
}

#[test]
fn wav_is_converted() {
    let wav = WavData::new_from_data(WavDataType::PCM16(vec![0, 16384, -16384, -32768, 8192]), 44100);
    let wt = WtFile::convert_wav(&wav, 2).unwrap();
    assert_eq!(wt.wave_size, 2);
    assert_eq!(wt.wave_count, 2);
    assert_eq!(wt.samples(), &[0.0f32, 0.5, -0.5, -1.0]);

    assert!(matches!(WtFile::convert_wav(&wav, 8), Err(WtError::WtFormat(_))));
}
