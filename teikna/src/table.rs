//! Raw font table access.

use skrifa::raw::types::Tag;

use crate::{face::FontFace, scaled_font::ScaledFontBackend, Error};

const NAME: u32 = u32::from_be_bytes(*b"name");

/// Copies bytes of the table `tag` of `face`, starting at `offset`.
///
/// Follows the two call protocol of the host: without a buffer, or with a
/// zero `length`, only the table size is stored in `length`. Otherwise up to
/// `length` bytes past `offset` are copied into `buffer` and `length` is set
/// to the number copied. A missing table is [`Error::Unsupported`].
pub fn load_truetype_table(
    face: &FontFace,
    tag: u32,
    offset: usize,
    buffer: Option<&mut [u8]>,
    length: &mut usize,
) -> Result<(), Error> {
    let data = face
        .table_data(Tag::new(&tag.to_be_bytes()))
        .ok_or(Error::Unsupported)?;
    match buffer {
        Some(buffer) if *length > 0 && offset < data.len() => {
            let count = (data.len() - offset).min(*length).min(buffer.len());
            buffer[..count].copy_from_slice(&data[offset..offset + count]);
            *length = count;
        }
        _ => *length = data.len(),
    }
    Ok(())
}

/// Reads the whole table `tag` through the two call protocol.
fn read_table(font: &dyn ScaledFontBackend, tag: u32) -> Result<Vec<u8>, Error> {
    let mut length = 0;
    font.load_truetype_table(tag, 0, None, &mut length)?;
    let mut data = Vec::new();
    data.try_reserve_exact(length)?;
    data.resize(length, 0);
    if length > 0 {
        font.load_truetype_table(tag, 0, Some(&mut data[..]), &mut length)?;
        data.truncate(length);
    }
    Ok(data)
}

/// True if both fonts carry byte identical `name` tables.
///
/// Fonts without a readable `name` table never match.
pub fn name_tables_match(a: &dyn ScaledFontBackend, b: &dyn ScaledFontBackend) -> bool {
    match (read_table(a, NAME), read_table(b, NAME)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
