//! Cursor helpers for reading and writing record tables.

use binrw::{BinRead, BinWrite};
use sa_ir::{Sample, SampleInfo, WaveTable, SAMPLE_INFO_SIZE, WAVE_SIZE};
use std::io::{Cursor, Read, Seek, Write};

use crate::error::{FormatError, Result};
use crate::records::SampleInfoRecord;

pub(crate) type Reader<'a> = Cursor<&'a [u8]>;

pub(crate) fn remaining(r: &Reader) -> u64 {
    (r.get_ref().len() as u64).saturating_sub(r.position())
}

/// Fail early instead of allocating for a table that cannot fit.
pub(crate) fn ensure(r: &Reader, bytes: u64) -> Result<()> {
    if remaining(r) < bytes {
        return Err(FormatError::UnexpectedEof);
    }
    Ok(())
}

/// Read a big-endian 32-bit count. Negative counts mean an empty table.
pub(crate) fn read_count(r: &mut Reader) -> Result<usize> {
    let n = i32::read_be(r)?;
    Ok(n.max(0) as usize)
}

pub(crate) fn write_count<W: Write + Seek>(w: &mut W, n: usize, table: &'static str) -> Result<()> {
    let n = i32::try_from(n).map_err(|_| FormatError::TableTooLarge { table })?;
    n.write_be(w)?;
    Ok(())
}

/// Read `count` records of `size` bytes each and convert them to model types.
pub(crate) fn read_records<T, U>(r: &mut Reader, count: usize, size: usize) -> Result<Vec<U>>
where
    T: for<'a> BinRead<Args<'a> = ()>,
    U: From<T>,
{
    ensure(r, count as u64 * size as u64)?;
    (0..count)
        .map(|_| -> Result<U> { Ok(U::from(T::read_be(r)?)) })
        .collect()
}

pub(crate) fn write_records<'m, T, U, W>(w: &mut W, items: impl IntoIterator<Item = &'m U>) -> Result<()>
where
    T: for<'a> BinWrite<Args<'a> = ()> + From<&'m U>,
    U: 'm,
    W: Write + Seek,
{
    for item in items {
        T::from(item).write_be(w)?;
    }
    Ok(())
}

pub(crate) fn read_waves(r: &mut Reader, count: usize) -> Result<Vec<WaveTable>> {
    ensure(r, count as u64 * WAVE_SIZE as u64)?;
    (0..count)
        .map(|_| -> Result<WaveTable> { Ok(WaveTable::new(<[u8; WAVE_SIZE]>::read_be(r)?)) })
        .collect()
}

pub(crate) fn write_waves<W: Write + Seek>(w: &mut W, waves: &[WaveTable], table: &'static str) -> Result<()> {
    write_count(w, waves.len(), table)?;
    for wave in waves {
        w.write_all(&wave.data)?;
    }
    Ok(())
}

/// Sample table: count, optional info records, byte sizes, then the data.
pub(crate) fn read_samples(r: &mut Reader, with_info: bool) -> Result<Vec<Sample>> {
    let count = read_count(r)?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let infos: Vec<SampleInfo> = if with_info {
        read_records::<SampleInfoRecord, _>(r, count, SAMPLE_INFO_SIZE)?
    } else {
        Vec::new()
    };

    ensure(r, count as u64 * 4)?;
    let mut sizes = Vec::with_capacity(count);
    for _ in 0..count {
        sizes.push(u32::read_be(r)? as usize);
    }

    let mut samples = Vec::with_capacity(count);
    for (i, &size) in sizes.iter().enumerate() {
        ensure(r, size as u64)?;
        let mut data = vec![0u8; size];
        r.read_exact(&mut data)?;
        let sample = match infos.get(i) {
            Some(info) => Sample { info: *info, data },
            None => Sample::from_bytes(data),
        };
        samples.push(sample);
    }
    Ok(samples)
}

pub(crate) fn write_samples<W: Write + Seek>(w: &mut W, samples: &[Sample]) -> Result<()> {
    write_count(w, samples.len(), "sample")?;
    if samples.is_empty() {
        return Ok(());
    }
    write_records::<SampleInfoRecord, _, _>(w, samples.iter().map(|s| &s.info))?;
    for sample in samples {
        let size = u32::try_from(sample.data.len())
            .map_err(|_| FormatError::TableTooLarge { table: "sample" })?;
        size.write_be(w)?;
    }
    for sample in samples {
        w.write_all(&sample.data)?;
    }
    Ok(())
}
