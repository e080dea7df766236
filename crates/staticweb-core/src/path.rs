//! Request path classification and percent-encoding helpers.
//!
//! Storage paths have the form `/{version}/{account}[/{container}[/{object}]]`.
//! The object segment absorbs the rest of the path, slashes included.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::error::{StaticWebError, StaticWebResult};
use crate::types::ContainerPath;

/// Characters left unescaped in a single path segment.
const SEGMENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Characters left unescaped in a multi-segment path (object names).
const PATH_ENCODE_SET: &AsciiSet = &SEGMENT_ENCODE_SET.remove(b'/');

/// A request path split into its storage hierarchy. All segments are decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedPath {
    /// API version segment.
    pub version: String,
    /// Account name.
    pub account: String,
    /// Container name.
    pub container: Option<String>,
    /// Object name, possibly containing `/`.
    pub object: Option<String>,
}

impl ClassifiedPath {
    /// The container this path lives in, if any.
    #[must_use]
    pub fn container_path(&self) -> Option<ContainerPath> {
        self.container
            .as_ref()
            .map(|c| ContainerPath::new(&self.version, &self.account, c))
    }
}

/// Split a percent-encoded request path into version, account, container and object.
///
/// Empty container or object segments count as absent, so `/v1/a/c/` names the
/// container root. Version and account are required.
///
/// # Examples
///
/// ```
/// use staticweb_core::path::classify;
///
/// let path = classify("/v1/AUTH_test/site/docs/index.html").unwrap();
/// assert_eq!(path.container.as_deref(), Some("site"));
/// assert_eq!(path.object.as_deref(), Some("docs/index.html"));
///
/// assert!(classify("/v1").is_err());
/// ```
pub fn classify(path: &str) -> StaticWebResult<ClassifiedPath> {
    let invalid = || StaticWebError::InvalidPath(path.to_owned());

    let rest = path.strip_prefix('/').ok_or_else(invalid)?;
    let mut segments = rest.splitn(4, '/');

    let version = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let account = segments.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let container = segments.next().filter(|s| !s.is_empty());
    let object = segments.next().filter(|s| !s.is_empty());

    // `/v1/a//obj` names an object without a container.
    if container.is_none() && object.is_some() {
        return Err(invalid());
    }

    Ok(ClassifiedPath {
        version: decode(version),
        account: decode(account),
        container: container.map(decode),
        object: object.map(decode),
    })
}

/// Decode a percent-encoded path or segment.
#[must_use]
pub fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Encode a single path segment; `/` is escaped.
#[must_use]
pub fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, SEGMENT_ENCODE_SET).to_string()
}

/// Encode a path that may span several segments; `/` is kept.
#[must_use]
pub fn encode_path(s: &str) -> String {
    utf8_percent_encode(s, PATH_ENCODE_SET).to_string()
}
