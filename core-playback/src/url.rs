//! Media URL normalization.
//!
//! Remote video URLs arrive from feeds, shares, and cached records in several
//! historical shapes. Before a stream is opened the controller rewrites them
//! into the one canonical form the CDN serves from, so every cache layer and
//! access log sees a single spelling per resource.

use serde::{Deserialize, Serialize};
use url::Url;

/// Rewrite rules for the canonical media host.
///
/// # Example
///
/// ```ignore
/// use core_playback::url::{normalize_media_url, MediaUrlRules};
///
/// let rules = MediaUrlRules::default();
/// let canonical = normalize_media_url("http://www.sacavia.com/api/media/abc.mp4", &rules);
/// assert_eq!(canonical, "https://sacavia.com/api/media/file/abc.mp4");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaUrlRules {
    /// Host the rewrite rules apply to, without a `www.` prefix.
    #[serde(default = "default_canonical_host")]
    pub canonical_host: String,

    /// Path prefix of the generic media route, with a leading slash.
    #[serde(default = "default_media_path_prefix")]
    pub media_path_prefix: String,

    /// Sub-segment the file route requires after the prefix.
    #[serde(default = "default_file_segment")]
    pub file_segment: String,
}

fn default_canonical_host() -> String {
    "sacavia.com".to_string()
}

fn default_media_path_prefix() -> String {
    "/api/media".to_string()
}

fn default_file_segment() -> String {
    "file".to_string()
}

impl Default for MediaUrlRules {
    fn default() -> Self {
        Self {
            canonical_host: default_canonical_host(),
            media_path_prefix: default_media_path_prefix(),
            file_segment: default_file_segment(),
        }
    }
}

impl MediaUrlRules {
    /// Validate rule values.
    ///
    /// Returns a description of the first problem found, if any.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.canonical_host.is_empty() {
            return Err("canonical_host must not be empty".to_string());
        }
        if self.canonical_host.contains('/') || self.canonical_host.contains(':') {
            return Err("canonical_host must be a bare host name".to_string());
        }
        if self.canonical_host != self.canonical_host.to_ascii_lowercase() {
            return Err("canonical_host must be lowercase".to_string());
        }
        if !self.media_path_prefix.starts_with('/') || self.media_path_prefix.len() < 2 {
            return Err("media_path_prefix must start with '/' and name a route".to_string());
        }
        if self.file_segment.is_empty() || self.file_segment.contains('/') {
            return Err("file_segment must be a single path segment".to_string());
        }
        Ok(())
    }
}

/// Rewrite `input` into the canonical streaming form.
///
/// Pure and infallible: unparseable input is returned unchanged, as is any
/// URL a rewrite step cannot be applied to. Applying the function to its own
/// output is a no-op.
///
/// Steps, in order:
/// 1. strip `www.` when the host is the canonical media host,
/// 2. insert the file sub-segment after the generic media route, when the
///    host is canonical and the segment is not already present,
/// 3. upgrade plain `http` to `https` for any host.
pub fn normalize_media_url(input: &str, rules: &MediaUrlRules) -> String {
    let Ok(mut url) = Url::parse(input) else {
        return input.to_string();
    };

    let www_host = format!("www.{}", rules.canonical_host);
    if url.host_str() == Some(www_host.as_str())
        && url.set_host(Some(&rules.canonical_host)).is_err()
    {
        return input.to_string();
    }

    if url.host_str() == Some(rules.canonical_host.as_str()) {
        insert_file_segment(&mut url, rules);
    }

    if url.scheme() == "http" && url.set_scheme("https").is_err() {
        return input.to_string();
    }

    url.to_string()
}

/// Rewrite `/api/media/<name>` to `/api/media/file/<name>` in place.
///
/// No-ops when the path is not under the media route, has nothing after the
/// prefix, or already carries the file segment.
fn insert_file_segment(url: &mut Url, rules: &MediaUrlRules) {
    let path = url.path().to_string();
    let Some(rest) = path.strip_prefix(rules.media_path_prefix.as_str()) else {
        return;
    };
    let Some(rest) = rest.strip_prefix('/') else {
        return;
    };
    if rest.is_empty() {
        return;
    }
    let first = rest.split('/').next().unwrap_or("");
    if first == rules.file_segment {
        return;
    }

    let new_path = format!("{}/{}/{}", rules.media_path_prefix, rules.file_segment, rest);
    url.set_path(&new_path);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_legacy_form_to_canonical() {
        let rules = MediaUrlRules::default();
        assert_eq!(
            normalize_media_url("http://www.sacavia.com/api/media/abc.mp4", &rules),
            "https://sacavia.com/api/media/file/abc.mp4"
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let rules = MediaUrlRules::default();
        let inputs = [
            "http://www.sacavia.com/api/media/abc.mp4",
            "https://sacavia.com/api/media/file/abc.mp4",
            "http://example.com/video.mp4",
            "https://sacavia.com/api/media/clips/abc.mp4?sig=123#t=10",
            "not a url at all",
        ];

        for input in inputs {
            let once = normalize_media_url(input, &rules);
            let twice = normalize_media_url(&once, &rules);
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn foreign_hosts_only_get_scheme_upgrade() {
        let rules = MediaUrlRules::default();
        assert_eq!(
            normalize_media_url("http://cdn.example.net/api/media/abc.mp4", &rules),
            "https://cdn.example.net/api/media/abc.mp4"
        );
    }

    #[test]
    fn www_on_foreign_host_is_untouched() {
        let rules = MediaUrlRules::default();
        assert_eq!(
            normalize_media_url("https://www.example.com/api/media/a.mp4", &rules),
            "https://www.example.com/api/media/a.mp4"
        );
    }

    #[test]
    fn unparseable_input_is_returned_unchanged() {
        let rules = MediaUrlRules::default();
        assert_eq!(
            normalize_media_url("sacavia.com/api/media/abc.mp4", &rules),
            "sacavia.com/api/media/abc.mp4"
        );
        assert_eq!(normalize_media_url("", &rules), "");
    }

    #[test]
    fn file_segment_is_not_duplicated() {
        let rules = MediaUrlRules::default();
        assert_eq!(
            normalize_media_url("https://sacavia.com/api/media/file/abc.mp4", &rules),
            "https://sacavia.com/api/media/file/abc.mp4"
        );
    }

    #[test]
    fn bare_media_route_gets_no_segment() {
        let rules = MediaUrlRules::default();
        assert_eq!(
            normalize_media_url("https://sacavia.com/api/media", &rules),
            "https://sacavia.com/api/media"
        );
        assert_eq!(
            normalize_media_url("https://sacavia.com/api/media/", &rules),
            "https://sacavia.com/api/media/"
        );
    }

    #[test]
    fn query_and_fragment_survive_the_rewrite() {
        let rules = MediaUrlRules::default();
        assert_eq!(
            normalize_media_url("http://www.sacavia.com/api/media/abc.mp4?sig=xyz#t=5", &rules),
            "https://sacavia.com/api/media/file/abc.mp4?sig=xyz#t=5"
        );
    }

    #[test]
    fn nested_media_paths_get_the_segment_once() {
        let rules = MediaUrlRules::default();
        assert_eq!(
            normalize_media_url("https://sacavia.com/api/media/clips/abc.mp4", &rules),
            "https://sacavia.com/api/media/file/clips/abc.mp4"
        );
    }

    #[test]
    fn sibling_routes_are_not_rewritten() {
        let rules = MediaUrlRules::default();
        assert_eq!(
            normalize_media_url("https://sacavia.com/api/mediakit/abc.mp4", &rules),
            "https://sacavia.com/api/mediakit/abc.mp4"
        );
    }

    #[test]
    fn uppercase_hosts_are_folded_before_matching() {
        let rules = MediaUrlRules::default();
        assert_eq!(
            normalize_media_url("HTTP://WWW.SACAVIA.COM/api/media/abc.mp4", &rules),
            "https://sacavia.com/api/media/file/abc.mp4"
        );
    }

    #[test]
    fn rules_validation_catches_bad_values() {
        let mut rules = MediaUrlRules::default();
        assert!(rules.validate().is_ok());

        rules.canonical_host = String::new();
        assert!(rules.validate().is_err());

        rules = MediaUrlRules {
            canonical_host: "Sacavia.com".to_string(),
            ..MediaUrlRules::default()
        };
        assert!(rules.validate().is_err());

        rules = MediaUrlRules {
            media_path_prefix: "api/media".to_string(),
            ..MediaUrlRules::default()
        };
        assert!(rules.validate().is_err());

        rules = MediaUrlRules {
            file_segment: "a/b".to_string(),
            ..MediaUrlRules::default()
        };
        assert!(rules.validate().is_err());
    }

    #[test]
    fn rules_deserialize_with_defaults() {
        let rules: MediaUrlRules = serde_json::from_str("{}").unwrap();
        assert_eq!(rules, MediaUrlRules::default());

        let rules: MediaUrlRules =
            serde_json::from_str(r#"{"canonical_host": "media.example.org"}"#).unwrap();
        assert_eq!(rules.canonical_host, "media.example.org");
        assert_eq!(rules.media_path_prefix, "/api/media");
    }
}
