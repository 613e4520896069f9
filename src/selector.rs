use crate::{RawMetadata, ResolvedPreview};

const IMAGE_MARKERS: [&str; 3] = [".png", ".jpg", ".jpeg"];

/// First candidate that looks like a raster image.
///
/// This is substring containment, so `photo.jpg?w=200` qualifies and
/// `PHOTO.JPG` does not.
pub fn select_image(images: &[String]) -> Option<String> {
    images
        .iter()
        .find(|candidate| IMAGE_MARKERS.iter().any(|marker| candidate.contains(marker)))
        .cloned()
}

/// Favicons are trusted as-is; the last one listed wins.
pub fn select_favicon(favicons: &[String]) -> Option<String> {
    favicons.last().cloned()
}

pub fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.is_empty()).map(str::to_string)
}

impl ResolvedPreview {
    /// State for a successful fetch.
    pub fn from_metadata(data: &RawMetadata) -> Self {
        Self {
            has_preview: true,
            title: non_empty(data.title.as_deref()),
            description: non_empty(data.description.as_deref()),
            image: select_image(&data.images),
            favicon: select_favicon(&data.favicons),
        }
    }

    /// State built from the caller's fallback payload. Fallbacks never carry a favicon.
    pub fn from_fallback(data: &RawMetadata) -> Self {
        Self {
            has_preview: true,
            title: non_empty(data.title.as_deref()),
            description: non_empty(data.description.as_deref()),
            image: select_image(&data.images),
            favicon: None,
        }
    }
}
