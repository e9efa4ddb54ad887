//! Bit-exact binary persistence format for the store.
//!
//! Layout, little-endian throughout, tightly packed:
//!
//! ```text
//! offset 0:  i32  dimension d
//! offset 4:  i32  count n
//! then n times:
//!   +0:        16 bytes  UUID, big-endian (RFC 4122) byte order
//!   +16:       i32       per-vector length l (must equal d)
//!   +20:       4*l bytes IEEE-754 f32, little-endian
//!   +20+4*l:   f32       cached magnitude
//! ```
//!
//! `uuid::Uuid::as_bytes`/`from_bytes` already use RFC 4122 big-endian byte
//! order, so no extra encoding step is needed there.

use std::io::{Read, Write};

use uuid::Uuid;

use crate::error::{RagError, RagResult};

/// State decoded from a snapshot, ready to be installed into a store.
pub(crate) struct LoadedSnapshot {
    pub values: Vec<f32>,
    pub ids: Vec<Uuid>,
    pub magnitudes: Vec<f32>,
}

/// Write a full snapshot of `count` vectors (`ids[i]`, `get_row(i)`) to
/// `writer`.
pub(crate) fn write_snapshot<W: Write>(
    mut writer: W,
    dimension: usize,
    ids: &[Uuid],
    get_row: impl Fn(usize) -> (&[f32], f32),
) -> RagResult<()> {
    writer.write_all(&(dimension as i32).to_le_bytes())?;
    writer.write_all(&(ids.len() as i32).to_le_bytes())?;

    for (i, id) in ids.iter().enumerate() {
        writer.write_all(id.as_bytes())?;
        writer.write_all(&(dimension as i32).to_le_bytes())?;

        let (values, magnitude) = get_row(i);
        for &x in values {
            writer.write_all(&x.to_le_bytes())?;
        }
        writer.write_all(&magnitude.to_le_bytes())?;
    }

    Ok(())
}

/// Read a snapshot from `reader`, validating that its header dimension and
/// every per-vector length equal `expected_dimension`.
///
/// All-or-nothing: on any error (short read, dimension mismatch, malformed
/// header) nothing is returned — the caller's existing state is left
/// untouched.
pub(crate) fn read_snapshot<R: Read>(
    mut reader: R,
    expected_dimension: usize,
) -> RagResult<LoadedSnapshot> {
    let header_d = read_i32(&mut reader)?;
    if header_d < 0 {
        return Err(RagError::MalformedPayload(format!(
            "negative dimension in header: {header_d}"
        )));
    }
    if header_d as usize != expected_dimension {
        return Err(RagError::DimensionMismatch {
            expected: expected_dimension,
            actual: header_d as usize,
        });
    }

    let count = read_i32(&mut reader)?;
    if count < 0 {
        return Err(RagError::MalformedPayload(format!(
            "negative count in header: {count}"
        )));
    }
    let count = count as usize;
    let dimension = expected_dimension;

    let mut values = Vec::with_capacity(count * dimension);
    let mut ids = Vec::with_capacity(count);
    let mut magnitudes = Vec::with_capacity(count);

    for _ in 0..count {
        let mut id_bytes = [0u8; 16];
        read_exact(&mut reader, &mut id_bytes, 16)?;
        let id = Uuid::from_bytes(id_bytes);

        let len = read_i32(&mut reader)?;
        if len < 0 || len as usize != dimension {
            return Err(RagError::DimensionMismatch {
                expected: dimension,
                actual: len.max(0) as usize,
            });
        }

        for _ in 0..dimension {
            let mut buf = [0u8; 4];
            read_exact(&mut reader, &mut buf, 4)?;
            values.push(f32::from_le_bytes(buf));
        }

        let mut mag_buf = [0u8; 4];
        read_exact(&mut reader, &mut mag_buf, 4)?;
        let magnitude = f32::from_le_bytes(mag_buf);

        ids.push(id);
        magnitudes.push(magnitude);
    }

    Ok(LoadedSnapshot {
        values,
        ids,
        magnitudes,
    })
}

fn read_i32<R: Read>(reader: &mut R) -> RagResult<i32> {
    let mut buf = [0u8; 4];
    read_exact(reader, &mut buf, 4)?;
    Ok(i32::from_le_bytes(buf))
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], expected: usize) -> RagResult<()> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(RagError::Truncated { expected })
        }
        Err(e) => Err(RagError::Io(e)),
    }
}
