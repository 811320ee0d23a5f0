//! Content references handed to the launched application.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use super::error::ReferenceError;
use super::tier::ReferenceStyle;

/// A launchable handle to a local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRef {
    pub style: ReferenceStyle,
    pub uri: Url,
    /// The local path the reference was minted from.
    pub path: PathBuf,
}

impl ContentRef {
    /// Builds a plain `file://` reference. The path must be absolute.
    pub fn file(path: &Path) -> Result<Self, ReferenceError> {
        let uri = Url::from_file_path(path)
            .map_err(|_| ReferenceError::NotAbsolute(path.to_path_buf()))?;
        Ok(Self {
            style: ReferenceStyle::FileUri,
            uri,
            path: path.to_path_buf(),
        })
    }

    pub fn as_str(&self) -> &str {
        self.uri.as_str()
    }
}

/// A directory the provider may expose, published under `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRoot {
    pub name: String,
    pub path: PathBuf,
}

/// Mints `content://` references scoped to a set of shareable roots.
#[derive(Debug, Clone)]
pub struct FileProvider {
    authority: String,
    roots: Vec<ProviderRoot>,
}

impl FileProvider {
    pub fn new(authority: impl Into<String>, roots: Vec<ProviderRoot>) -> Self {
        Self {
            authority: authority.into(),
            roots,
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Mints a reference in the requested style.
    pub fn reference_for(
        &self,
        path: &Path,
        style: ReferenceStyle,
    ) -> Result<ContentRef, ReferenceError> {
        match style {
            ReferenceStyle::FileUri => ContentRef::file(path),
            ReferenceStyle::ProviderUri => self.provider_uri(path),
        }
    }

    /// The most specific root containing `path` wins.
    fn provider_uri(&self, path: &Path) -> Result<ContentRef, ReferenceError> {
        if !path.is_absolute() {
            return Err(ReferenceError::NotAbsolute(path.to_path_buf()));
        }

        let (root, relative) = self
            .roots
            .iter()
            .filter_map(|root| path.strip_prefix(&root.path).ok().map(|rel| (root, rel)))
            .max_by_key(|(root, _)| root.path.components().count())
            .ok_or_else(|| ReferenceError::OutsideRoots(path.to_path_buf()))?;

        let mut uri = Url::parse(&format!("content://{}/", self.authority))
            .map_err(|_| ReferenceError::InvalidAuthority(self.authority.clone()))?;
        {
            let mut segments = uri
                .path_segments_mut()
                .map_err(|_| ReferenceError::InvalidAuthority(self.authority.clone()))?;
            segments.pop_if_empty().push(&root.name);
            for component in relative.components() {
                segments.push(&component.as_os_str().to_string_lossy());
            }
        }

        Ok(ContentRef {
            style: ReferenceStyle::ProviderUri,
            uri,
            path: path.to_path_buf(),
        })
    }
}
