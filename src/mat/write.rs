//! Encoding `MatFile`s to bytes and writing them to disk

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::ZlibEncoder;
use flate2::Compression;

use super::*;

const HEADER_TEXT_LEN: usize = 116;

impl MatFile {
    /// the complete file contents
    pub fn to_bytes(&self, compress: bool) -> Result<Vec<u8>, MatError> {
        let mut out = header(&self.description);

        for (name, array) in &self.variables {
            let matrix = matrix_element(name, array)?;

            if compress {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&matrix)?;
                let compressed = encoder.finish()?;

                push_tag(&mut out, MI_COMPRESSED, compressed.len())?;
                out.extend(compressed);
            } else {
                out.extend(matrix);
            }
        }

        Ok(out)
    }

    /// Write the file to `path`. The data goes to a temporary file in the same
    /// directory first which is then renamed, so `path` is either left untouched
    /// or holds the complete file.
    pub fn write(&self, path: &Path, compress: bool) -> Result<(), MatError> {
        let bytes = self.to_bytes(compress)?;
        let temporary = temporary_path(path);

        let written = fs::File::create(&temporary)
            .and_then(|mut file| {
                file.write_all(&bytes)?;
                file.sync_all()
            })
            .and_then(|_| fs::rename(&temporary, path));

        if let Err(source) = written {
            // the temporary may not exist if creating it failed
            let _ = fs::remove_file(&temporary);
            return Err(MatError::Write {
                path: path.to_path_buf(),
                source,
            });
        }

        log::debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

fn temporary_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    path.with_file_name(format!(".{}.partial", name))
}

fn header(description: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(128);

    let mut text: Vec<u8> = description.bytes().take(HEADER_TEXT_LEN).collect();
    text.resize(HEADER_TEXT_LEN, b' ');
    out.extend(text);

    // subsystem data offset, unused
    out.extend([0u8; 8]);
    out.extend(0x0100u16.to_le_bytes());
    out.extend(b"IM");

    out
}

/// byte count of an element as stored in its 32 bit tag
fn tag_len(len: usize) -> Result<u32, MatError> {
    u32::try_from(len).map_err(|_| MatError::ElementTooLarge(len))
}

fn push_tag(out: &mut Vec<u8>, data_type: u32, len: usize) -> Result<(), MatError> {
    let len = tag_len(len)?;
    out.extend(data_type.to_le_bytes());
    out.extend(len.to_le_bytes());
    Ok(())
}

fn pad_to_8(out: &mut Vec<u8>) {
    while out.len() % 8 != 0 {
        out.push(0);
    }
}

/// a sub element, in the compact 4 byte form when the data fits
fn push_element(out: &mut Vec<u8>, data_type: u32, data: &[u8]) -> Result<(), MatError> {
    if data.len() <= 4 {
        out.extend((data_type as u16).to_le_bytes());
        out.extend((data.len() as u16).to_le_bytes());
        let mut small = [0; 4];
        small[..data.len()].copy_from_slice(data);
        out.extend(small);
        return Ok(());
    }

    push_tag(out, data_type, data.len())?;
    out.extend(data);
    pad_to_8(out);
    Ok(())
}

/// a complete `miMATRIX` element including its tag
fn matrix_element(name: &str, array: &MatArray) -> Result<Vec<u8>, MatError> {
    let mut body = Vec::new();

    let (class, flags) = match array.data {
        MatData::Double(_) => (MX_DOUBLE_CLASS, 0),
        MatData::Logical(_) => (MX_UINT8_CLASS, FLAG_LOGICAL),
    };

    let mut array_flags = Vec::with_capacity(8);
    array_flags.extend((flags | class as u32).to_le_bytes());
    array_flags.extend(0u32.to_le_bytes());
    push_element(&mut body, MI_UINT32, &array_flags)?;

    let mut dims = Vec::with_capacity(array.dims.len() * 4);
    for dim in &array.dims {
        let dim = i32::try_from(*dim).map_err(|_| MatError::DimensionTooLarge {
            name: name.to_string(),
            dim: *dim,
        })?;
        dims.extend(dim.to_le_bytes());
    }
    push_element(&mut body, MI_INT32, &dims)?;

    push_element(&mut body, MI_INT8, name.as_bytes())?;

    match &array.data {
        MatData::Double(values) => {
            let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
            push_element(&mut body, MI_DOUBLE, &data)?;
        }
        MatData::Logical(values) => {
            let data: Vec<u8> = values.iter().map(|v| *v as u8).collect();
            push_element(&mut body, MI_UINT8, &data)?;
        }
    }

    let mut element = Vec::with_capacity(body.len() + 8);
    push_tag(&mut element, MI_MATRIX, body.len())?;
    element.extend(body);
    Ok(element)
}
