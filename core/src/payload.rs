//! Payload encoding for outgoing requests.
//!
//! Form and XML payloads are sent as given; the calling helper only picks the
//! `Content-Type`. File uploads are read from disk into a [`MultipartBody`]
//! here, before anything touches the network.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::ApiError;
use crate::http::{FilePart, MultipartBody};

pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";
pub const CONTENT_TYPE_XML: &str = "application/xml";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Build a multipart upload: one `file` part per path, in input order, then
/// one text field per entry of the JSON object in `payload`.
///
/// Each file is opened, read to the end and closed before the next one is
/// opened. The first file that cannot be read aborts the whole upload.
pub fn encode_upload<P: AsRef<Path>>(payload: Option<&[u8]>, files: &[P]) -> Result<MultipartBody, ApiError> {
    let mut body = MultipartBody::default();

    for path in files {
        let path = path.as_ref();
        let contents = read_file(path).map_err(|source| {
            tracing::error!(path = %path.display(), error = %source, "cannot read upload file");
            ApiError::File {
                path: path.to_path_buf(),
                source,
            }
        })?;
        body.files.push(FilePart {
            file_name: base_name(path),
            contents,
        });
    }

    body.fields = upload_fields(payload);
    Ok(body)
}

fn read_file(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut contents = Vec::new();
    file.read_to_end(&mut contents)?;
    Ok(contents)
}

fn base_name(path: &Path) -> String {
    match path.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => path.to_string_lossy().into_owned(),
    }
}

/// Flat string fields carried next to the files. A payload that is not a
/// JSON object of strings contributes no fields.
fn upload_fields(payload: Option<&[u8]>) -> Vec<(String, String)> {
    let Some(payload) = payload.filter(|p| !p.is_empty()) else {
        return Vec::new();
    };
    match serde_json::from_slice::<BTreeMap<String, String>>(payload) {
        Ok(params) => params.into_iter().collect(),
        Err(error) => {
            tracing::warn!(%error, "upload parameters are not a flat JSON object; sending files only");
            Vec::new()
        }
    }
}
