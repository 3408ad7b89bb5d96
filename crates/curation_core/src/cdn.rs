use shared::domain::ImageRef;
use url::Url;

pub trait ImageUrlResolver: Send + Sync {
    fn resolve(&self, image: &ImageRef) -> String;
}

/// Returns the reference unchanged; for APIs that already hand out display URLs.
pub struct PassthroughResolver;

impl ImageUrlResolver for PassthroughResolver {
    fn resolve(&self, image: &ImageRef) -> String {
        image.as_str().to_string()
    }
}

/// Builds `{base}/{transform}/{public_id}` delivery URLs for an image CDN.
#[derive(Debug, Clone)]
pub struct CdnImageResolver {
    base: Url,
    transform: Option<String>,
}

impl CdnImageResolver {
    pub fn new(base: &str, transform: Option<String>) -> Result<Self, url::ParseError> {
        Ok(Self {
            base: Url::parse(base)?,
            transform: transform.filter(|value| !value.trim().is_empty()),
        })
    }
}

impl ImageUrlResolver for CdnImageResolver {
    fn resolve(&self, image: &ImageRef) -> String {
        let raw = image.as_str().trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return raw.to_string();
        }

        let mut url = self.base.clone();
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty();
                if let Some(transform) = &self.transform {
                    segments.push(transform);
                }
                segments.extend(raw.split('/').filter(|part| !part.is_empty()));
            }
            Err(()) => return raw.to_string(),
        }
        url.into()
    }
}
