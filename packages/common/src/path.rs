//! Object-path rules for the image bucket.
//!
//! Paths look like `{room_code}/{name}.{ext}`. They come back to us inside
//! URLs stored in paste content, so they are validated before they reach any
//! backend.

/// Longest object path accepted.
pub const MAX_OBJECT_PATH_LEN: usize = 512;

/// Longest file extension kept from an uploaded file name.
pub const MAX_EXTENSION_LEN: usize = 10;

fn is_object_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Check that `path` is a relative bucket path made of plain segments.
///
/// Segments may not be empty or start with a dot, which also rules out `..`.
pub fn validate_object_path(path: &str) -> Result<&str, &'static str> {
    if path.is_empty() {
        return Err("Object path is empty");
    }
    if path.len() > MAX_OBJECT_PATH_LEN {
        return Err("Object path is longer than 512 bytes");
    }
    if path.starts_with('/') {
        return Err("Object path must be relative");
    }

    for segment in path.split('/') {
        match segment.chars().next() {
            None => return Err("Object path has an empty segment"),
            Some('.') => return Err("Object path segment starts with '.'"),
            Some(_) if !segment.chars().all(is_object_char) => {
                return Err("Object path may only use a-z, A-Z, 0-9, '-', '_', '.' and '/'");
            }
            Some(_) => {}
        }
    }

    Ok(path)
}

/// Lower-cased extension of an uploaded file name, if it has a usable one.
///
/// `photo.JPG` gives `jpg`; `photo`, `.hidden` and `x.tar$` give `None`.
pub fn file_extension(filename: &str) -> Option<String> {
    let (stem, ext) = filename.trim().rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > MAX_EXTENSION_LEN {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}
