use super::{Result, WtError};
use super::wav_data::*;

use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, info, trace, warn};

// List of Chunk IDs as u32 values (little endian)
const CID_RIFF: u32 = u32::from_le_bytes(*b"RIFF");
const CID_WAVE: u32 = u32::from_le_bytes(*b"WAVE");
const CID_FMT:  u32 = u32::from_le_bytes(*b"fmt ");
const CID_DATA: u32 = u32::from_le_bytes(*b"data");

const SIZE_WAVE_HEADER: usize = 4;
const SIZE_CHUNK_HEADER: usize = 8;
const SIZE_FMT_CHUNK: usize = SIZE_CHUNK_HEADER + SIZE_FMT_BASIC;

#[derive(Debug, Copy, Clone)]
struct ChunkHeader {
    chunk_id: u32,
    size: u32
}

impl ChunkHeader {
    fn get_size(&self) -> usize {
        self.size as usize
    }
}

pub struct WavHandler;

/// Handles reading and writing of .wav files.
///
/// Reads wave files into memory as vectors of samples. All multi-byte values
/// are converted from little endian explicitly, so this works independent of
/// the host byte order. Chunks other than fmt and data are skipped.
///
/// Writes mono or interleaved samples with a basic 16 byte fmt chunk.
impl WavHandler {
    /// Read a file with the given filename.
    ///
    /// ``` no_run
    /// use wtmaker::WavHandler;
    ///
    /// # fn main() -> Result<(), wtmaker::WtError> {
    ///
    /// let wave_data = WavHandler::read_file("test.wav")?;
    ///
    /// # Ok(())
    /// # }
    /// ```
    pub fn read_file<P: AsRef<Path>>(filename: P) -> Result<WavData> {
        let filename = filename.as_ref();
        info!("Reading wave file [{}]", filename.display());
        let file = File::open(filename)?;
        WavHandler::read_content(BufReader::new(file))
    }

    /// Read wave data from the provided input stream.
    ///
    /// ```
    /// use wtmaker::WavHandler;
    /// use std::io::Cursor;
    ///
    /// let data: &[u8] = &[0x00]; // Not a wave file
    /// assert!(WavHandler::read_content(Cursor::new(data)).is_err());
    /// ```
    pub fn read_content<R: Read + Seek>(mut source: R) -> Result<WavData> {
        // Read RIFF header and filetype
        let size = WavHandler::read_riff_container(&mut source, CID_WAVE)?;

        let mut fmt: Option<FmtChunk> = None;
        let mut samples: Option<WavDataType> = None;
        let mut bytes_read: usize = SIZE_WAVE_HEADER; // Already read the 4 bytes of file type

        // Read chunks until end of stream
        while let Some(header) = WavHandler::read_chunk_header(&mut source)? {
            debug!("Reading {} chunk, size {}", WavHandler::get_id_name(header.chunk_id), header.get_size());
            match header.chunk_id {
                CID_FMT => {
                    let bytes = WavHandler::read_chunk_data(&mut source, header.get_size())?;
                    let info = FmtChunk::parse(&bytes)?;
                    debug!("Read chunk: {:#?}", info);
                    fmt = Some(info);
                }
                CID_DATA => {
                    let info = fmt.as_ref().ok_or_else(|| WtError::WavFormat("Data chunk before format chunk".to_string()))?;
                    let bytes = WavHandler::read_chunk_data(&mut source, header.get_size())?;
                    samples = Some(WavHandler::read_samples(&bytes, info)?);
                }
                _ => WavHandler::skip_chunk(&mut source, header.get_size())?,
            }
            // Chunks are word aligned
            if header.size & 0x01 == 0x01 {
                WavHandler::skip_chunk(&mut source, 1)?;
            }
            bytes_read += SIZE_CHUNK_HEADER + header.get_size() + (header.get_size() & 0x01);
        }
        if bytes_read == size {
            debug!("Finished reading {} bytes", bytes_read);
        } else {
            warn!("Invalid file size, read {} bytes, expected {}", bytes_read, size);
        }
        let info = fmt.ok_or_else(|| WtError::WavFormat("Format chunk missing".to_string()))?;
        let samples = samples.ok_or_else(|| WtError::WavFormat("Data chunk missing".to_string()))?;
        Ok(WavData::new(info, samples))
    }

    // Read the RIFF container information from the input stream.
    //
    // This expects a RIFF header, followed by a 4-byte identifier (e.g.
    // "WAVE"), which is passed as argument.
    fn read_riff_container<R: Read>(source: &mut R, expected_cid: u32) -> Result<usize> {
        let header = WavHandler::read_chunk_header(source)?
            .ok_or_else(|| WtError::WavFormat("RIFF header missing".to_string()))?;
        debug!("Reading {} chunk, size {}", WavHandler::get_id_name(header.chunk_id), header.get_size());
        if header.chunk_id != CID_RIFF {
            return Err(WtError::WavFormat(format!("Unexpected chunk ID, expected RIFF, found {}",
                WavHandler::get_id_name(header.chunk_id))));
        }
        // RIFF header is followed by 4 bytes giving the file type
        let mut file_type = [0u8; 4];
        source.read_exact(&mut file_type)
            .map_err(|_| WtError::WavFormat("File type missing".to_string()))?;
        let file_type = u32::from_le_bytes(file_type);
        debug!("File type: {}", WavHandler::get_id_name(file_type));
        if file_type != expected_cid {
            return Err(WtError::WavFormat(format!("Unexpected file type, expected {}, found {}",
                WavHandler::get_id_name(expected_cid), WavHandler::get_id_name(file_type))));
        }
        Ok(header.get_size())
    }

    // Read the next chunk header. Returns None at the end of the stream.
    fn read_chunk_header<R: Read>(source: &mut R) -> Result<Option<ChunkHeader>> {
        let mut buf = [0u8; SIZE_CHUNK_HEADER];
        match source.read_exact(&mut buf) {
            Ok(()) => (),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let header = ChunkHeader{
            chunk_id: u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]),
            size: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
        };
        trace!("Read chunk header {:?}", header);
        Ok(Some(header))
    }

    // Read the contents of a chunk from the input stream.
    //
    // The chunk header is assumed to have been read already. Fails if the
    // stream ends before the announced size was read.
    fn read_chunk_data<R: Read>(source: &mut R, size: usize) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        source.take(size as u64).read_to_end(&mut data)?;
        if data.len() != size {
            return Err(WtError::WavFormat(format!("Chunk truncated, expected {} bytes, found {}", size, data.len())));
        }
        Ok(data)
    }

    // Convert raw bytes to samples of the type given by the format chunk.
    fn read_samples(bytes: &[u8], info: &FmtChunk) -> Result<WavDataType> {
        if info.num_channels == 0 {
            return Err(WtError::WavFormat("Number of channels is 0".to_string()));
        }
        let format = info.get_data_format();
        let samples = match (format, info.bits_per_sample) {
            (FMT_PCM, 8)    => WavDataType::PCM8(bytes.to_vec()),
            (FMT_PCM, 16)   => WavDataType::PCM16(bytes.chunks_exact(2).map(|b| i16::from_le_bytes([b[0], b[1]])).collect()),
            (FMT_PCM, 24)   => WavDataType::PCM24(bytes.chunks_exact(3).map(|b| i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8).collect()),
            (FMT_PCM, 32)   => WavDataType::PCM32(bytes.chunks_exact(4).map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect()),
            (FMT_FLOAT, 32) => WavDataType::FLOAT32(bytes.chunks_exact(4).map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]])).collect()),
            (FMT_FLOAT, 64) => WavDataType::FLOAT64(bytes.chunks_exact(8).map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])).collect()),
            (f, bps) => return Err(WtError::WavFormat(format!("Unsupported sample format {} with {} bits per sample", f, bps))),
        };
        info!("{} samples of type {}", samples.get_num_samples(), samples.get_type());
        Ok(samples)
    }

    // Skip over the rest of the current chunk to the next header.
    fn skip_chunk<R: Seek>(source: &mut R, num_bytes: usize) -> Result<()> {
        source.seek(SeekFrom::Current(num_bytes as i64))?;
        Ok(())
    }

    // Convert a given chunk ID from u32 to printable string.
    fn get_id_name(value: u32) -> String {
        String::from_utf8_lossy(&value.to_le_bytes()).into_owned()
    }

    // ====================
    // Writing of WAV files
    // ====================

    /// Write the given WavData to a file.
    pub fn write_file<P: AsRef<Path>>(data: &WavData, filename: P) -> Result<()> {
        let filename = filename.as_ref();
        info!("Writing wave file [{}]", filename.display());
        let mut writer = BufWriter::new(File::create(filename)?);
        WavHandler::write_content(&mut writer, data)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the WAV data to the given output stream.
    pub fn write_content<W: Write>(dest: &mut W, data: &WavData) -> Result<()> {
        dest.write_all(&WavHandler::encode(data))?;
        Ok(())
    }

    /// Serialize the WAV data into a complete RIFF file image.
    pub fn encode(data: &WavData) -> Vec<u8> {
        let num_bytes = data.get_num_bytes();
        let padding = num_bytes & 0x01;

        // Calculate size:
        // - 4 bytes for "WAVE" header
        // - 24 bytes for fmt chunk
        // - 8 + data size (+ padding) for sample data
        let size = SIZE_WAVE_HEADER + SIZE_FMT_CHUNK + SIZE_CHUNK_HEADER + num_bytes + padding;
        let mut bytes = Vec::with_capacity(SIZE_CHUNK_HEADER + size);

        // RIFF header + size, WAVE header
        bytes.extend_from_slice(&CID_RIFF.to_le_bytes());
        bytes.extend_from_slice(&(size as u32).to_le_bytes());
        bytes.extend_from_slice(&CID_WAVE.to_le_bytes());

        // fmt chunk
        bytes.extend_from_slice(&CID_FMT.to_le_bytes());
        bytes.extend_from_slice(&(SIZE_FMT_BASIC as u32).to_le_bytes());
        bytes.extend_from_slice(&data.get_fmt().to_bytes());

        // data chunk
        bytes.extend_from_slice(&CID_DATA.to_le_bytes());
        bytes.extend_from_slice(&(num_bytes as u32).to_le_bytes());
        WavHandler::write_samples(&mut bytes, data.get_samples());
        if padding == 0x01 {
            bytes.push(0x00);
        }
        bytes
    }

    // Append the sample data in little endian byte order.
    fn write_samples(dest: &mut Vec<u8>, samples: &WavDataType) {
        match samples {
            WavDataType::PCM8(v) => dest.extend_from_slice(v),
            WavDataType::PCM16(v) => v.iter().for_each(|s| dest.extend_from_slice(&s.to_le_bytes())),
            WavDataType::PCM24(v) => v.iter().for_each(|s| dest.extend_from_slice(&s.to_le_bytes()[0..3])),
            WavDataType::PCM32(v) => v.iter().for_each(|s| dest.extend_from_slice(&s.to_le_bytes())),
            WavDataType::FLOAT32(v) => v.iter().for_each(|s| dest.extend_from_slice(&s.to_le_bytes())),
            WavDataType::FLOAT64(v) => v.iter().for_each(|s| dest.extend_from_slice(&s.to_le_bytes())),
        }
    }
}

// ----------------------------------------------
//                  Unit tests
// ----------------------------------------------

#[cfg(test)]
fn read(data: &[u8]) -> Result<WavData> {
    WavHandler::read_content(std::io::Cursor::new(data))
}

#[cfg(test)]
fn write(samples: WavDataType) -> Vec<u8> {
    let data = WavData::new_from_data(samples, 44100);
    let mut buffer = Vec::new();
    WavHandler::write_content(&mut buffer, &data).unwrap();
    buffer
}

#[test]
fn incomplete_riff_id_is_rejected() {
    let incomplete_riff: &[u8] = &[
        // RIFF header
        b'R', b'I', b'F',
    ];
    assert!(read(incomplete_riff).is_err());
}

#[test]
fn empty_riff_is_rejected() {
    let empty_riff: &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x00, 0x00, 0x00, 0x00,
    ];
    assert!(read(empty_riff).is_err());
}

#[test]
fn missing_riff_id_is_rejected() {
    let missing_riff_id : &[u8] = &[
        // RIFF header - invalid
        b'R', b'x', b'x', b'x',
        0x04, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
    ];
    assert!(matches!(read(missing_riff_id), Err(WtError::WavFormat(_))));
}

#[test]
fn missing_wave_id_is_rejected() {
    let missing_wave_id : &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x04, 0x00, 0x00, 0x00,
        // Wrong file ID
        b'W', b'O', b'V', b'E',
    ];
    assert!(matches!(read(missing_wave_id), Err(WtError::WavFormat(_))));
}

#[test]
fn incomplete_wave_id_is_rejected() {
    let incomplete_wave_id : &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x03, 0x00, 0x00, 0x00,
        // Incomplete WAVE file ID
        b'W', b'A', b'V',
    ];
    assert!(read(incomplete_wave_id).is_err());
}

#[test]
fn valid_riff_empty_wave_is_rejected() {
    let empty_wave: &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x04, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
    ];
    assert!(matches!(read(empty_wave), Err(WtError::WavFormat(_))));
}

#[test]
fn single_sample_byte_can_be_read() {
    let single_sample : &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x28, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // fmt chunk
        b'f', b'm', b't', b' ',
        0x12, 0x00, 0x00, 0x00,
        0x01, 0x00,             // PCM
        0x01, 0x00,             // 1 channel
        0x44, 0xAC, 0x00, 0x00, // 44100 Hz
        0x44, 0xAC, 0x00, 0x00,
        0x01, 0x00,
        0x08, 0x00,             // 8 bit per sample
        0x00, 0x00,
        // data chunk
        b'd', b'a', b't', b'a',
        0x01, 0x00, 0x00, 0x00,
        0x42, // Single byte
        0x00, // Padding
    ];

    let wav_file = read(single_sample).unwrap();
    assert_eq!(wav_file.get_num_bytes(), 1);
    assert_eq!(wav_file.get_sample_rate(), 44100);
    assert_eq!(wav_file.get_samples(), &WavDataType::PCM8(vec![0x42]));
}

#[test]
fn incomplete_chunk_is_rejected() {
    let incomplete_chunk: &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x04, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // fmt chunk
        b'f', b'm', b't', b' ',
        0x02, 0x00, 0x00, 0x00, // Size = 2
        0x42                    // Only single byte of data
    ];
    assert!(matches!(read(incomplete_chunk), Err(WtError::WavFormat(_))));
}

#[test]
fn invalid_size_is_handled() {
    let incomplete_chunk: &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x04, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // fmt chunk
        b'f', b'm', b't', b' ',
        0xff, 0xff, 0xff, 0xff, // Size = 0xFFFFFFFF
        0x42                    // Only single byte of data
    ];
    assert!(matches!(read(incomplete_chunk), Err(WtError::WavFormat(_))));
}

#[test]
fn data_before_fmt_is_rejected() {
    let data_first: &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x0E, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // data chunk
        b'd', b'a', b't', b'a',
        0x02, 0x00, 0x00, 0x00,
        0x42, 0x43
    ];
    assert!(matches!(read(data_first), Err(WtError::WavFormat(_))));
}

#[test]
fn unknown_chunks_are_skipped() {
    let single_sample : &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x32, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // unknown chunk with odd size, padded
        b'n', b'u', b'l', b'l',
        0x01, 0x00, 0x00, 0x00,
        0xFF, 0x00,
        // fmt chunk
        b'f', b'm', b't', b' ',
        0x12, 0x00, 0x00, 0x00,
        0x01, 0x00,             // PCM
        0x01, 0x00,             // 1 channel
        0x44, 0xAC, 0x00, 0x00, // 44100 Hz
        0x88, 0x58, 0x01, 0x00,
        0x02, 0x00,
        0x10, 0x00,             // 16 bit per sample
        0x00, 0x00,
        // data chunk
        b'd', b'a', b't', b'a',
        0x02, 0x00, 0x00, 0x00,
        0x42, 0x43
    ];

    let wav_file = read(single_sample).unwrap();
    assert_eq!(wav_file.get_num_bytes(), 2);
    assert_eq!(wav_file.get_samples(), &WavDataType::PCM16(vec![0x4342]));
}

#[test]
fn s16_can_be_read() {
    let single_sample : &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x28, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // fmt chunk
        b'f', b'm', b't', b' ',
        0x10, 0x00, 0x00, 0x00,
        0x01, 0x00,             // PCM
        0x01, 0x00,             // 1 channel
        0x44, 0xAC, 0x00, 0x00, // 44100 Hz
        0x88, 0x58, 0x01, 0x00,
        0x02, 0x00,
        0x10, 0x00,             // 16 bit per sample
        // data chunk
        b'd', b'a', b't', b'a',
        0x04, 0x00, 0x00, 0x00,
        0x12, 0x34, 0xFF, 0xFF
    ];

    let wav_file = read(single_sample).unwrap();
    assert_eq!(wav_file.get_samples(), &WavDataType::PCM16(vec![0x3412, -1]));
}

#[test]
fn s24_can_be_read() {
    let single_sample : &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x2A, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // fmt chunk
        b'f', b'm', b't', b' ',
        0x10, 0x00, 0x00, 0x00,
        0x01, 0x00,             // PCM
        0x01, 0x00,             // 1 channel
        0x44, 0xAC, 0x00, 0x00, // 44100 Hz
        0xCC, 0x04, 0x02, 0x00,
        0x03, 0x00,
        0x18, 0x00,             // 24 bit per sample
        // data chunk
        b'd', b'a', b't', b'a',
        0x06, 0x00, 0x00, 0x00,
        0x56, 0x34, 0x12,       // 0x123456
        0xFE, 0xFF, 0xFF,       // -2
    ];

    let wav_file = read(single_sample).unwrap();
    assert_eq!(wav_file.get_samples(), &WavDataType::PCM24(vec![0x123456, -2]));
}

#[test]
fn f32_can_be_read() {
    let single_sample : &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x28, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // fmt chunk
        b'f', b'm', b't', b' ',
        0x10, 0x00, 0x00, 0x00,
        0x03, 0x00,             // Float
        0x01, 0x00,             // 1 channel
        0x44, 0xAC, 0x00, 0x00, // 44100 Hz
        0x10, 0xb1, 0x02, 0x00,
        0x04, 0x00,
        0x20, 0x00,             // 32 bit per sample
        // data chunk
        b'd', b'a', b't', b'a',
        0x04, 0x00, 0x00, 0x00,
        0xb6, 0xf3, 0x9d, 0x3f  // = 1.234 in LE format
    ];

    let wav_file = read(single_sample).unwrap();
    assert_eq!(wav_file.get_num_bytes(), 4);
    assert_eq!(wav_file.get_samples(), &WavDataType::FLOAT32(vec![1.234]));
}

#[test]
fn f64_can_be_read() {
    let single_sample : &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x2C, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // fmt chunk
        b'f', b'm', b't', b' ',
        0x10, 0x00, 0x00, 0x00,
        0x03, 0x00,             // Float
        0x01, 0x00,             // 1 channel
        0x44, 0xAC, 0x00, 0x00, // 44100 Hz
        0x20, 0x62, 0x05, 0x00,
        0x08, 0x00,
        0x40, 0x00,             // 64 bit per sample
        // data chunk
        b'd', b'a', b't', b'a',
        0x08, 0x00, 0x00, 0x00,
        0x58, 0x39, 0xb4, 0xc8,  // = 1.234 in LE format.
        0x76, 0xbe, 0xf3, 0x3f
    ];

    let wav_file = read(single_sample).unwrap();
    assert_eq!(wav_file.get_samples(), &WavDataType::FLOAT64(vec![1.234]));
}

#[test]
fn extensible_stereo_float_can_be_read() {
    let mut data: Vec<u8> = vec![
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x4C, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // fmt chunk
        b'f', b'm', b't', b' ',
        0x28, 0x00, 0x00, 0x00, // 40 bytes
        0xFE, 0xFF,             // Extensible
        0x02, 0x00,             // 2 channels
        0x80, 0xBB, 0x00, 0x00, // 48000 Hz
        0x00, 0xDC, 0x05, 0x00,
        0x08, 0x00,
        0x20, 0x00,             // 32 bit per sample
        0x16, 0x00,             // cbSize = 22
        0x20, 0x00,             // Valid bits
        0x03, 0x00, 0x00, 0x00, // Channel mask
        0x03, 0x00,             // Sub format: float
    ];
    data.extend_from_slice(&[0x00; 14]); // Rest of GUID
    data.extend_from_slice(&[b'd', b'a', b't', b'a', 0x10, 0x00, 0x00, 0x00]);
    for s in &[0.25f32, 0.5, -0.5, 0.25] {
        data.extend_from_slice(&s.to_le_bytes());
    }

    let wav_file = read(&data).unwrap();
    assert_eq!(wav_file.get_fmt().get_num_channels(), 2);
    assert_eq!(wav_file.get_sample_rate(), 48000);
    assert_eq!(wav_file.get_num_frames(), 2);
    assert_eq!(wav_file.get_mono_samples(), vec![0.75, -0.25]);
}

#[test]
fn unsupported_format_is_rejected() {
    let alaw : &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x26, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // fmt chunk
        b'f', b'm', b't', b' ',
        0x10, 0x00, 0x00, 0x00,
        0x06, 0x00,             // A-law
        0x01, 0x00,
        0x44, 0xAC, 0x00, 0x00,
        0x44, 0xAC, 0x00, 0x00,
        0x01, 0x00,
        0x08, 0x00,
        // data chunk
        b'd', b'a', b't', b'a',
        0x02, 0x00, 0x00, 0x00,
        0x42, 0x43
    ];
    assert!(matches!(read(alaw), Err(WtError::WavFormat(_))));
}

#[test]
fn u8_can_be_written() {
    let expected : &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x28, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // fmt chunk
        b'f', b'm', b't', b' ',
        0x10, 0x00, 0x00, 0x00,
        0x01, 0x00,             // PCM
        0x01, 0x00,             // 1 channel
        0x44, 0xAC, 0x00, 0x00, // 44100 Hz
        0x44, 0xAC, 0x00, 0x00, // Avg data rate
        0x01, 0x00,             // Block align
        0x08, 0x00,             // 8 bit per sample
        // data chunk
        b'd', b'a', b't', b'a',
        0x04, 0x00, 0x00, 0x00, // 4 u8 = 4 bytes
        0x00, 0x01, 0x02, 0x03,
    ];
    assert_eq!(write(WavDataType::PCM8(vec![0, 1, 2, 3])), expected);
}

#[test]
fn s16_can_be_written() {
    let expected : &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x2C, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // fmt chunk
        b'f', b'm', b't', b' ',
        0x10, 0x00, 0x00, 0x00,
        0x01, 0x00,             // PCM
        0x01, 0x00,             // 1 channel
        0x44, 0xAC, 0x00, 0x00, // 44100 Hz
        0x88, 0x58, 0x01, 0x00, // Avg data rate
        0x02, 0x00,             // Block align
        0x10, 0x00,             // 16 bit per sample
        // data chunk
        b'd', b'a', b't', b'a',
        0x08, 0x00, 0x00, 0x00, // 4 s16 = 8 bytes
        0xFF, 0xFF, 0x00, 0x00,
        0x01, 0x00, 0x02, 0x00,
    ];
    assert_eq!(write(WavDataType::PCM16(vec![-1, 0, 1, 2])), expected);
}

#[test]
fn f32_can_be_written() {
    let expected : &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x34, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // fmt chunk
        b'f', b'm', b't', b' ',
        0x10, 0x00, 0x00, 0x00,
        0x03, 0x00,             // Float
        0x01, 0x00,             // 1 channel
        0x44, 0xAC, 0x00, 0x00, // 44100 Hz
        0x10, 0xb1, 0x02, 0x00, // Avg data rate
        0x04, 0x00,             // Block align
        0x20, 0x00,             // 32 bit per sample
        // data chunk
        b'd', b'a', b't', b'a',
        0x10, 0x00, 0x00, 0x00, // 4 f32 = 16 bytes
        0x00, 0x00, 0x00, 0x00, // 0.0
        0xcd, 0xcc, 0xcc, 0x3d, // 0.1
        0xcd, 0xcc, 0x4c, 0x3e, // 0.2
        0x9a, 0x99, 0x99, 0x3e, // 0.3
    ];
    assert_eq!(write(WavDataType::FLOAT32(vec![0.0, 0.1, 0.2, 0.3])), expected);
}

#[test]
fn odd_number_of_u8_is_padded() {
    let expected : &[u8] = &[
        // RIFF header
        b'R', b'I', b'F', b'F',
        0x28, 0x00, 0x00, 0x00,
        // WAVE file ID
        b'W', b'A', b'V', b'E',
        // fmt chunk
        b'f', b'm', b't', b' ',
        0x10, 0x00, 0x00, 0x00,
        0x01, 0x00,             // PCM
        0x01, 0x00,             // 1 channel
        0x44, 0xAC, 0x00, 0x00, // 44100 Hz
        0x44, 0xAC, 0x00, 0x00, // Avg data rate
        0x01, 0x00,             // Block align
        0x08, 0x00,             // 8 bit per sample
        // data chunk
        b'd', b'a', b't', b'a',
        0x03, 0x00, 0x00, 0x00, // 3 u8 = 3 bytes
        0x01, 0x02, 0x03, 0x00
    ];
    assert_eq!(write(WavDataType::PCM8(vec![1, 2, 3])), expected);
}

#[test]
fn written_file_can_be_read_back() {
    let samples = WavDataType::PCM24(vec![-8388608, 0, 8388607, 0x123456]);
    let data = WavData::new_from_data(samples.clone(), 48000);
    let bytes = WavHandler::encode(&data);
    let read_back = read(&bytes).unwrap();
    assert_eq!(read_back.get_samples(), &samples);
    assert_eq!(read_back.get_fmt(), data.get_fmt());
}

#[test]
fn file_can_be_written_and_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.wav");
    let data = WavData::new_from_data(WavDataType::PCM16(vec![1, -2, 3]), 44100);
    WavHandler::write_file(&data, &path).unwrap();
    let read_back = WavHandler::read_file(&path).unwrap();
    assert_eq!(read_back.get_samples(), data.get_samples());
    assert!(matches!(WavHandler::read_file(dir.path().join("missing.wav")), Err(WtError::Io(_))));
}
