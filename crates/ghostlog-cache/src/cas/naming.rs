//! Stored filename generation
//!
//! Cached files are named `<token>.<extension>.cache`, where the token is a
//! fixed-length random alphanumeric string and the extension comes from the
//! attachment URL. Token collisions are not checked for.

use ghostlog_core::utils::extension_from_url;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of the random part of a stored filename
pub const TOKEN_LEN: usize = 12;

/// Suffix marking a file as cache content
pub const CACHE_SUFFIX: &str = "cache";

/// Generate a fresh stored filename for content fetched from `source_url`
pub fn generate_filename(source_url: &str) -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect();

    format!("{}.{}.{}", token, extension_from_url(source_url), CACHE_SUFFIX)
}
