use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::modules::media::error::{MediaError, MediaResult};

static SEGMENT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"segment_\d+\.ts").expect("valid segment regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct RewrittenManifest {
    pub text: String,
    /// Number of segment references that were substituted.
    pub replaced: usize,
}

/// Replaces every segment filename in `manifest` with `final_paths[filename]`.
///
/// A referenced filename missing from `final_paths` is an error: the rewritten
/// manifest must only point at objects uploaded by the same job.
pub fn rewrite_manifest(
    manifest: &str,
    final_paths: &HashMap<String, String>,
) -> MediaResult<RewrittenManifest> {
    let mut text = String::with_capacity(manifest.len() * 2);
    let mut last = 0;
    let mut replaced = 0;

    for token in SEGMENT_TOKEN.find_iter(manifest) {
        let target = final_paths.get(token.as_str()).ok_or_else(|| {
            MediaError::ManifestMismatch(format!("{} was not uploaded", token.as_str()))
        })?;
        text.push_str(&manifest[last..token.start()]);
        text.push_str(target);
        last = token.end();
        replaced += 1;
    }
    text.push_str(&manifest[last..]);

    Ok(RewrittenManifest { text, replaced })
}
