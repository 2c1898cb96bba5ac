//! Storage key construction, validation, and the mapping between keys and the
//! URLs the website shows.

use uuid::Uuid;

/// Path the service re-serves bucket objects under.
pub const MEDIA_PROXY_PREFIX: &str = "/api/media/";

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 6;

/// Translates between storage keys and public URLs.
#[derive(Debug, Clone)]
pub struct PublicUrls {
    base_url: Option<String>,
    serve_from_base: bool,
}

impl PublicUrls {
    /// `base_url` is the public bucket domain, if any. When `serve_from_base`
    /// is false (development) URLs point at the media proxy even if a base is
    /// configured; cleansing still recognises the base either way.
    pub fn new(base_url: Option<String>, serve_from_base: bool) -> Self {
        let base_url = base_url
            .map(|url| format!("{}/", url.trim().trim_end_matches('/')))
            .filter(|url| url != "/");
        Self {
            base_url,
            serve_from_base,
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        match &self.base_url {
            Some(base) if self.serve_from_base => format!("{}{}", base, key),
            _ => format!("{}{}", MEDIA_PROXY_PREFIX, key),
        }
    }

    /// Reduce a URL or key to the bare storage key.
    ///
    /// Strips the configured public base, the scheme and host of any absolute
    /// URL, query strings and fragments of URLs, and leading slashes. The media
    /// proxy prefix is removed only where it starts a URL path. Steps repeat until nothing changes, so the result is a
    /// fixed point and `cleanse(cleanse(x)) == cleanse(x)`. Bare keys come back
    /// unchanged.
    pub fn cleanse(&self, input: &str) -> String {
        let mut current = input;
        loop {
            let next = self.cleanse_step(current);
            if next == current {
                return current.to_string();
            }
            current = next;
        }
    }

    fn cleanse_step<'a>(&self, value: &'a str) -> &'a str {
        if let Some(rest) = self
            .base_url
            .as_deref()
            .and_then(|base| value.strip_prefix(base))
        {
            return strip_query(rest);
        }
        if let Some(path) = strip_origin(value) {
            return strip_proxy(strip_query(path));
        }
        if value.starts_with('/') {
            return strip_proxy(strip_query(value.trim_start_matches('/')));
        }
        value
    }
}

/// Drop the media proxy prefix from a path that has already lost its leading
/// `/`. Only applied to URL paths; bare keys keep an `api/media/` prefix.
fn strip_proxy(path: &str) -> &str {
    path.strip_prefix(&MEDIA_PROXY_PREFIX[1..]).unwrap_or(path)
}

/// Path part of an absolute or protocol-relative URL, without its leading `/`.
fn strip_origin(value: &str) -> Option<&str> {
    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    let after_scheme = if lower.starts_with("https://") {
        &value[8..]
    } else if lower.starts_with("http://") {
        &value[7..]
    } else if value.starts_with("//") {
        &value[2..]
    } else {
        return None;
    };
    Some(match after_scheme.find('/') {
        Some(pos) => &after_scheme[pos + 1..],
        None => "",
    })
}

fn strip_query(value: &str) -> &str {
    match value.find(['?', '#']) {
        Some(pos) => &value[..pos],
        None => value,
    }
}

/// Keys accepted from clients: `[A-Za-z0-9._-/]+`, no `..`, not absolute.
pub fn validate_key(key: &str) -> Result<(), String> {
    if key.is_empty() {
        return Err("Key must not be empty".into());
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/'))
    {
        return Err(format!("Key `{}` contains invalid characters", key));
    }
    if key.contains("..") || key.starts_with('/') {
        return Err(format!("Key `{}` is not a valid relative path", key));
    }
    Ok(())
}

/// Original filename without its extension, reduced to `[A-Za-z0-9]`.
pub fn sanitize_stem(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let stem = match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => base,
    };
    let cleaned: String = stem.chars().filter(char::is_ascii_alphanumeric).collect();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

/// Six lowercase base36 characters.
pub fn random_suffix() -> String {
    let mut n = Uuid::new_v4().as_u128();
    let mut out = String::with_capacity(SUFFIX_LEN);
    for _ in 0..SUFFIX_LEN {
        out.push(BASE36[(n % 36) as usize] as char);
        n /= 36;
    }
    out
}

/// `{prefix}/{section}/{millis}-{suffix}-{stem}.{ext}`
pub fn upload_key(
    prefix: &str,
    section: &str,
    millis: i64,
    suffix: &str,
    original_name: &str,
    extension: &str,
) -> String {
    format!(
        "{}/{}/{}-{}-{}.{}",
        prefix,
        section,
        millis,
        suffix,
        sanitize_stem(original_name),
        extension
    )
}
