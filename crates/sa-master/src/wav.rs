//! WAV encoding for 8-bit PCM with 1, 2 or 4 interleaved channels.

use sa_engine::ChannelMode;
use std::io::Write;

/// Size of the RIFF, fmt and data headers together.
pub const WAV_HEADER_LEN: usize = 44;

/// Write `pcm` (unsigned, silence at 128) as a complete WAV file.
pub fn write_wav(w: &mut impl Write, pcm: &[u8], sample_rate: u32, mode: ChannelMode) -> std::io::Result<()> {
    let num_channels = mode.channels() as u16;
    let bits_per_sample: u16 = 8;
    let block_align = num_channels * (bits_per_sample / 8);
    let data_size = pcm.len() as u32;

    write_riff_header(w, data_size)?;
    write_fmt_chunk(w, num_channels, sample_rate, block_align, bits_per_sample)?;
    w.write_all(b"data")?;
    w.write_all(&data_size.to_le_bytes())?;
    w.write_all(pcm)
}

/// Signed PCM to unsigned WAV bytes.
pub fn signed_to_wav(pcm: &[u8], sample_rate: u32, mode: ChannelMode) -> Vec<u8> {
    let unsigned: Vec<u8> = pcm.iter().map(|b| b.wrapping_add(128)).collect();
    let mut buf = Vec::with_capacity(WAV_HEADER_LEN + unsigned.len());
    write_wav(&mut buf, &unsigned, sample_rate, mode).expect("Vec<u8> write cannot fail");
    buf
}

fn write_riff_header(w: &mut impl Write, data_size: u32) -> std::io::Result<()> {
    w.write_all(b"RIFF")?;
    w.write_all(&(36 + data_size).to_le_bytes())?;
    w.write_all(b"WAVE")
}

fn write_fmt_chunk(
    w: &mut impl Write,
    num_channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
) -> std::io::Result<()> {
    w.write_all(b"fmt ")?;
    w.write_all(&16u32.to_le_bytes())?;
    w.write_all(&1u16.to_le_bytes())?;
    w.write_all(&num_channels.to_le_bytes())?;
    w.write_all(&sample_rate.to_le_bytes())?;
    w.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    w.write_all(&block_align.to_le_bytes())?;
    w.write_all(&bits_per_sample.to_le_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(buf: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([buf[at], buf[at + 1]])
    }

    fn u32_at(buf: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
    }

    #[test]
    fn header_fields() {
        let buf = signed_to_wav(&[0, 1, 2, 3, 4, 5, 6, 7], 22_050, ChannelMode::Quad);
        assert_eq!(buf.len(), WAV_HEADER_LEN + 8);
        assert_eq!(&buf[0..4], b"RIFF");
        assert_eq!(u32_at(&buf, 4), 36 + 8);
        assert_eq!(&buf[8..16], b"WAVEfmt ");
        assert_eq!(u16_at(&buf, 22), 4);
        assert_eq!(u32_at(&buf, 24), 22_050);
        assert_eq!(u32_at(&buf, 28), 22_050 * 4);
        assert_eq!(u16_at(&buf, 32), 4);
        assert_eq!(u16_at(&buf, 34), 8);
        assert_eq!(&buf[36..40], b"data");
        assert_eq!(u32_at(&buf, 40), 8);
    }

    #[test]
    fn samples_are_offset_to_unsigned() {
        let buf = signed_to_wav(&[0, 0x7F, 0x80, 0xFF], 8_000, ChannelMode::Mono);
        assert_eq!(&buf[WAV_HEADER_LEN..], &[128, 255, 0, 127]);
    }
}
