//! `multipart/form-data` upload extraction.

use mime::Mime;
use multipart::server::Multipart;
use std::io::{self, Cursor, Read};

/// One uploaded file field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Extracts the boundary parameter from a multipart Content-Type header.
pub fn boundary(content_type: &str) -> Option<String> {
    let mime: Mime = content_type.parse().ok()?;
    if mime.type_() != mime::MULTIPART || mime.subtype() != mime::FORM_DATA {
        return None;
    }
    mime.get_param(mime::BOUNDARY)
        .map(|value| value.as_str().to_string())
        .filter(|value| !value.is_empty())
}

/// Finds the file field called `name`.
///
/// Fields of that name without a `filename` parameter are plain form
/// values and are skipped; a present but empty filename is returned as-is.
pub fn find_file_part(body: &[u8], boundary: &str, name: &str) -> io::Result<Option<FilePart>> {
    let mut form = Multipart::with_body(Cursor::new(body), boundary);

    while let Some(mut field) = form.read_entry()? {
        if &*field.headers.name != name {
            continue;
        }
        let Some(filename) = field.headers.filename.clone() else {
            continue;
        };

        let mut data = Vec::new();
        field.data.read_to_end(&mut data)?;
        return Ok(Some(FilePart {
            filename,
            content_type: field.headers.content_type.as_ref().map(|m| m.to_string()),
            data,
        }));
    }

    Ok(None)
}
