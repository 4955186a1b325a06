use crate::path::validate_object_path;

const PUBLIC_OBJECT_SEGMENT: &str = "storage/v1/object/public";

/// Shape of the public URLs handed out for stored objects:
/// `{base_url}/storage/v1/object/public/{bucket}/{path}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicUrlLayout {
    prefix: String,
}

impl PublicUrlLayout {
    pub fn new(base_url: &str, bucket: &str) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let bucket = bucket.trim_matches('/');
        Self {
            prefix: format!("{base_url}/{PUBLIC_OBJECT_SEGMENT}/{bucket}/"),
        }
    }

    /// Everything before the object path.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path.trim_start_matches('/'))
    }

    /// Recover the object path from a URL issued by [`PublicUrlLayout::url_for`].
    pub fn path_of(&self, url: &str) -> Option<String> {
        let rest = url.trim().strip_prefix(&self.prefix)?;
        let path = rest.split(['?', '#']).next().unwrap_or_default();
        validate_object_path(path).ok().map(str::to_string)
    }
}
