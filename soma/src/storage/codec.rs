//! Tile column codecs
//!
//! String columns are laid out either plainly (`u32` length then bytes, per
//! value) or run-length encoded (`u32` run length, `u32` length, bytes, per
//! run) when the column's filters include [`Filter::Rle`]. The remaining
//! filters act on the resulting bytes in pipeline order and are undone in
//! reverse on read. All integers are little-endian.

use soma_core::{DataType, Filter, Result, SomaError, ValueBuffer};

struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or(SomaError::InvalidFragment("string column truncated"))?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn u32(&mut self) -> Result<usize> {
        let raw = self.take(4)?;
        Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize)
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()?;
        let raw = self.take(len)?;
        std::str::from_utf8(raw)
            .map(str::to_string)
            .map_err(|_| SomaError::InvalidFragment("string column is not UTF-8"))
    }

    fn is_done(&self) -> bool {
        self.pos == self.bytes.len()
    }
}

fn push_str(out: &mut Vec<u8>, value: &str) -> Result<()> {
    let len = u32::try_from(value.len())
        .map_err(|_| SomaError::storage("label longer than 4 GiB"))?;
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

fn uses_rle(filters: &[Filter]) -> bool {
    filters.contains(&Filter::Rle)
}

fn compress(mut bytes: Vec<u8>, filters: &[Filter]) -> Result<Vec<u8>> {
    for filter in filters {
        if let Filter::Zstd { level } = *filter {
            bytes = zstd::encode_all(bytes.as_slice(), level)?;
        }
    }
    Ok(bytes)
}

fn decompress(bytes: &[u8], filters: &[Filter]) -> Result<Vec<u8>> {
    let mut out = bytes.to_vec();
    for filter in filters.iter().rev() {
        if let Filter::Zstd { .. } = filter {
            out = zstd::decode_all(out.as_slice())?;
        }
    }
    Ok(out)
}

/// Encode a string column through its filter pipeline
pub(crate) fn encode_strings(values: &[String], filters: &[Filter]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    if uses_rle(filters) {
        let mut i = 0;
        while i < values.len() {
            let run = values[i..].iter().take_while(|v| **v == values[i]).count();
            let run = u32::try_from(run).map_err(|_| SomaError::storage("run too long"))?;
            out.extend_from_slice(&run.to_le_bytes());
            push_str(&mut out, &values[i])?;
            i += run as usize;
        }
    } else {
        for value in values {
            push_str(&mut out, value)?;
        }
    }
    compress(out, filters)
}

/// Decode `count` strings written by [`encode_strings`]
pub(crate) fn decode_strings(bytes: &[u8], count: usize, filters: &[Filter]) -> Result<Vec<String>> {
    let raw = decompress(bytes, filters)?;
    let mut reader = ByteReader::new(&raw);
    let mut values = Vec::with_capacity(count);
    if uses_rle(filters) {
        while !reader.is_done() {
            let run = reader.u32()?;
            let value = reader.string()?;
            if run == 0 || values.len() + run > count {
                return Err(SomaError::InvalidFragment("bad run length"));
            }
            values.extend(std::iter::repeat(value).take(run));
        }
    } else {
        while !reader.is_done() {
            values.push(reader.string()?);
        }
    }
    if values.len() != count {
        return Err(SomaError::InvalidFragment("string column cell count mismatch"));
    }
    Ok(values)
}

/// Encode a value column through its filter pipeline
pub(crate) fn encode_values(values: &ValueBuffer, filters: &[Filter]) -> Result<Vec<u8>> {
    compress(values.as_bytes().to_vec(), filters)
}

/// Decode `count` values written by [`encode_values`]
pub(crate) fn decode_values(
    bytes: &[u8],
    data_type: DataType,
    count: usize,
    filters: &[Filter],
) -> Result<ValueBuffer> {
    let raw = decompress(bytes, filters)?;
    let values = ValueBuffer::from_bytes(data_type, &raw)?;
    if values.len() != count {
        return Err(SomaError::InvalidFragment("value column cell count mismatch"));
    }
    Ok(values)
}
