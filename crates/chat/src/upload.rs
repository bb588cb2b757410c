use pantry_client::ImageFile;
use snafu::Snafu;

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

const BYTES_PER_MB: u64 = 1024 * 1024;
const BYTES_PER_KB: u64 = 1024;

/// Why a file was refused before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum UploadRejection {
    #[snafu(display("media type '{media_type}' is not an image"))]
    NotAnImage {
        stage: &'static str,
        media_type: String,
    },
    #[snafu(display("file is {size} bytes, limit is {limit} bytes"))]
    TooLarge {
        stage: &'static str,
        size: u64,
        limit: u64,
    },
}

impl UploadRejection {
    /// Assistant text shown in the transcript for this rejection.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotAnImage { .. } => "Please upload a valid image file.".to_string(),
            Self::TooLarge { limit, .. } => format!(
                "File size too large. Please choose a file under {}.",
                format_limit(*limit)
            ),
        }
    }
}

/// Checks the declared media type, then the size ceiling.
pub fn validate_upload(file: &ImageFile, max_bytes: u64) -> Result<(), UploadRejection> {
    if !file.is_image() {
        return NotAnImageSnafu {
            stage: "check-upload-type",
            media_type: file.media_type.clone(),
        }
        .fail();
    }

    if file.size() > max_bytes {
        return TooLargeSnafu {
            stage: "check-upload-size",
            size: file.size(),
            limit: max_bytes,
        }
        .fail();
    }

    Ok(())
}

fn format_limit(limit: u64) -> String {
    if limit >= BYTES_PER_MB && limit % BYTES_PER_MB == 0 {
        format!("{}MB", limit / BYTES_PER_MB)
    } else if limit >= BYTES_PER_KB {
        format!("{}KB", limit / BYTES_PER_KB)
    } else {
        format!("{limit} bytes")
    }
}
