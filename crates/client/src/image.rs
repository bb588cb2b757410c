use std::sync::Arc;

/// A file handed over by the input widget for classification.
///
/// The bytes are shared, so echoing the image into the transcript and uploading it
/// never copies the payload more than the multipart encoder requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Arc<[u8]>,
}

impl ImageFile {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into().trim().to_string(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// True when the declared media type is in the `image/` family.
    pub fn is_image(&self) -> bool {
        self.media_type
            .get(..6)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("image/"))
    }
}
