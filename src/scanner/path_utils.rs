//! Path styles for re-opening stored paths.
//!
//! Paths are stored exactly as traversal produced them. When a file is
//! re-opened for hashing, the configured [`PathStyle`] decides whether the
//! path is used as is or rewritten into the Windows extended-length form
//! (`\\?\C:\...`), which lifts the 260-character `MAX_PATH` limit.
//!
//! The rewrite is pure string manipulation, so it behaves the same on every
//! host and can be tested anywhere.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use threaded_inventory::scanner::PathStyle;
//!
//! let style = PathStyle::LongPathPrefixed;
//! assert_eq!(
//!     style.apply(Path::new(r"C:\data\file.txt")).as_ref(),
//!     Path::new(r"\\?\C:\data\file.txt")
//! );
//! ```

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const VERBATIM_PREFIX: &str = r"\\?\";
const VERBATIM_UNC_PREFIX: &str = r"\\?\UNC\";

/// How stored paths are turned into paths handed to the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PathStyle {
    /// Use stored paths unchanged.
    #[default]
    Native,
    /// Prefix absolute drive and UNC paths with the extended-length marker.
    LongPathPrefixed,
}

impl PathStyle {
    /// The style suited to the build target.
    #[must_use]
    pub fn for_platform() -> Self {
        if cfg!(windows) {
            Self::LongPathPrefixed
        } else {
            Self::Native
        }
    }

    /// Rewrite `path` according to this style.
    ///
    /// Relative paths, paths that are not valid UTF-8 and paths already in
    /// verbatim form are returned unchanged.
    #[must_use]
    pub fn apply(self, path: &Path) -> Cow<'_, Path> {
        match self {
            Self::Native => Cow::Borrowed(path),
            Self::LongPathPrefixed => match path.to_str().and_then(long_path_form) {
                Some(prefixed) => Cow::Owned(PathBuf::from(prefixed)),
                None => Cow::Borrowed(path),
            },
        }
    }
}

fn long_path_form(s: &str) -> Option<String> {
    if s.starts_with(VERBATIM_PREFIX) {
        return None;
    }
    let backslashed = s.replace('/', "\\");
    if let Some(unc) = backslashed.strip_prefix(r"\\") {
        return Some(format!("{VERBATIM_UNC_PREFIX}{unc}"));
    }
    let bytes = backslashed.as_bytes();
    let is_drive_absolute =
        bytes.len() >= 3 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' && bytes[2] == b'\\';
    is_drive_absolute.then(|| format!("{VERBATIM_PREFIX}{backslashed}"))
}
