//! Path utilities for cache file naming and safe file system access.
//!
//! Cached filenames come back out of the index database, so they are checked
//! before being joined onto the cache directory.

use crate::error::{GhostlogError, GhostlogResult};
use std::path::{Component, Path, PathBuf};

/// Extension used when a URL's last path segment has none
pub const FALLBACK_EXTENSION: &str = "bin";

/// Longest extension kept from a URL
const MAX_EXTENSION_LEN: usize = 16;

/// Derive a file extension from an attachment URL
///
/// Uses the text after the last `.` of the final path segment, ignoring the
/// query string and fragment. Non-alphanumeric characters are dropped and the
/// result is lowercased.
pub fn extension_from_url(url: &str) -> String {
    let path = match url::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url
            .split(&['?', '#'][..])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let segment = path.rsplit('/').next().unwrap_or_default();
    let extension: String = match segment.rsplit_once('.') {
        Some((_, ext)) => ext
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .take(MAX_EXTENSION_LEN)
            .collect::<String>()
            .to_ascii_lowercase(),
        None => String::new(),
    };

    if extension.is_empty() {
        FALLBACK_EXTENSION.to_string()
    } else {
        extension
    }
}

/// Check if a path is safe (relative, no directory traversal)
pub fn is_safe_path(path: &Path) -> bool {
    if path.is_absolute() {
        return false;
    }

    let mut depth = 0i32;

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            },
            Component::Normal(_) => {
                depth += 1;
            },
            _ => {
                return false;
            },
        }
    }

    true
}

/// Safely join paths, preventing directory traversal
pub fn safe_join(base: &Path, path: &Path) -> GhostlogResult<PathBuf> {
    if !is_safe_path(path) {
        return Err(GhostlogError::io(
            format!("Refusing to access {} outside {}", path.display(), base.display()),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "path traversal"),
        ));
    }

    Ok(base.join(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_url() {
        assert_eq!(
            extension_from_url("https://cdn.example.com/attachments/1/2/photo.PNG?ex=65&is=66&hm=ab"),
            "png"
        );
        assert_eq!(
            extension_from_url("https://cdn.example.com/a/archive.tar.gz"),
            "gz"
        );
        assert_eq!(extension_from_url("https://cdn.example.com/a/README"), "bin");
        assert_eq!(extension_from_url("https://cdn.example.com/a.b/file"), "bin");
        assert_eq!(extension_from_url("not a url/clip.mp4?x=1"), "mp4");
        assert_eq!(extension_from_url("https://cdn.example.com/a/x.j%20pg"), "j20pg");
    }

    #[test]
    fn test_is_safe_path() {
        assert!(is_safe_path(Path::new("abcdefghijkl.png.cache")));
        assert!(is_safe_path(Path::new("./abcdefghijkl.png.cache")));
        assert!(!is_safe_path(Path::new("../../../etc/passwd")));
        assert!(!is_safe_path(Path::new("/absolute/path")));
    }

    #[test]
    fn test_safe_join() {
        let base = Path::new("/var/cache/ghostlog");

        let result = safe_join(base, Path::new("abcdefghijkl.png.cache")).unwrap();
        assert_eq!(result, Path::new("/var/cache/ghostlog/abcdefghijkl.png.cache"));

        assert!(safe_join(base, Path::new("../../../etc/passwd")).is_err());
    }
}
