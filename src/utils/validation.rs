use std::path::{Component, Path};

/// Common filesystem limit for a single path component, in bytes
const NAME_MAX: usize = 255;

/// Longest filename accepted, in bytes. The staging file appends one byte (`~`)
/// to the name, which must still fit in `NAME_MAX`.
pub const MAX_FILENAME_LEN: usize = NAME_MAX - 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub code: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Rejects filenames that could escape the storage roots.
///
/// The name is used verbatim to build both the staging and the final path, so
/// it must be a single plain path component.
pub fn validate_filename(filename: &str) -> Result<(), ValidationError> {
    if filename.is_empty() {
        return Err(ValidationError {
            code: "EMPTY_FILENAME",
            message: "Filename cannot be empty".to_string(),
        });
    }

    if filename.len() > MAX_FILENAME_LEN {
        return Err(ValidationError {
            code: "FILENAME_TOO_LONG",
            message: format!(
                "Filename is {} bytes long, the maximum is {}",
                filename.len(),
                MAX_FILENAME_LEN
            ),
        });
    }

    if filename.chars().any(|c| c.is_control()) {
        return Err(ValidationError {
            code: "INVALID_CHARACTERS",
            message: "Filename contains control characters".to_string(),
        });
    }

    if filename.contains('/') || filename.contains('\\') || has_drive_prefix(filename) {
        tracing::warn!("Path traversal attempt detected: {:?}", filename);
        return Err(ValidationError {
            code: "PATH_TRAVERSAL",
            message: "Filename must not contain path separators".to_string(),
        });
    }

    // Anything that is not a single normal component ("." or "..")
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => {
            tracing::warn!("Path traversal attempt detected: {:?}", filename);
            Err(ValidationError {
                code: "PATH_TRAVERSAL",
                message: format!("'{}' is not a valid filename", filename),
            })
        }
    }
}

fn has_drive_prefix(filename: &str) -> bool {
    let bytes = filename.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}
