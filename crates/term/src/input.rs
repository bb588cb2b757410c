use std::path::{Path, PathBuf};

use pantry_chat::ImageFile;
use snafu::{ResultExt, Snafu};

const UPLOAD_COMMAND: &str = "/upload";
const QUIT_COMMANDS: [&str; 2] = ["/quit", "/exit"];
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// One submitted input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Quit,
    UploadUsage,
    Upload(PathBuf),
    Send(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if QUIT_COMMANDS.contains(&line) {
        return Command::Quit;
    }

    match line.strip_prefix(UPLOAD_COMMAND) {
        Some("") => Command::UploadUsage,
        Some(rest) if rest.starts_with(char::is_whitespace) => {
            Command::Upload(PathBuf::from(rest.trim()))
        }
        _ => Command::Send(line.to_string()),
    }
}

/// Declared media type for a picked file, inferred from its extension.
pub fn media_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("txt") => "text/plain",
        Some("pdf") => "application/pdf",
        _ => FALLBACK_MEDIA_TYPE,
    }
}

#[derive(Debug, Snafu)]
pub enum InputError {
    #[snafu(display("failed to inspect {path:?} on `{stage}`: {source}"))]
    Inspect {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("{path:?} is {size} bytes, limit is {limit} bytes"))]
    TooLarge {
        stage: &'static str,
        path: PathBuf,
        size: u64,
        limit: u64,
    },
    #[snafu(display("{path:?} has media type '{media_type}'"))]
    NotAnImage {
        stage: &'static str,
        path: PathBuf,
        media_type: &'static str,
    },
    #[snafu(display("failed to read {path:?} on `{stage}`: {source}"))]
    Read {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
}

impl InputError {
    /// Text shown to the user instead of starting an upload.
    pub fn notice(&self) -> String {
        match self {
            Self::TooLarge { limit, .. } => format!(
                "File size too large. Please choose a file under {}MB.",
                limit.div_ceil(1024 * 1024)
            ),
            Self::NotAnImage { .. } => "Please select a valid image file.".to_string(),
            Self::Inspect { .. } | Self::Read { .. } => self.to_string(),
        }
    }
}

/// Reads a picked file after the size and type pre-checks the upload control applies.
pub async fn load_image(path: &Path, max_bytes: u64) -> Result<ImageFile, InputError> {
    let metadata = tokio::fs::metadata(path).await.context(InspectSnafu {
        stage: "inspect-upload-file",
        path,
    })?;
    if metadata.len() > max_bytes {
        return TooLargeSnafu {
            stage: "check-upload-size",
            path,
            size: metadata.len(),
            limit: max_bytes,
        }
        .fail();
    }

    let media_type = media_type_for(path);
    if !media_type.starts_with("image/") {
        return NotAnImageSnafu {
            stage: "check-upload-type",
            path,
            media_type,
        }
        .fail();
    }

    let bytes = tokio::fs::read(path).await.context(ReadSnafu {
        stage: "read-upload-file",
        path,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(ImageFile::new(file_name, media_type, bytes))
}
