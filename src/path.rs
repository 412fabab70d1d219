//! Path normalization module
//!
//! Pure string transform turning any raw path into an absolute, clean form.
//! No filesystem access happens here; symlinks are not resolved.

use std::env;

/// Normalizes raw paths against a fixed home directory and working directory
///
/// The anchor of a path is `/` for absolute input, the home directory for
/// `~` input and the working directory for everything else. Parent
/// references never climb above the anchor; excess `..` segments are
/// dropped instead of reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    home: String,
    cwd: String,
}

impl Normalizer {
    /// Create a normalizer with explicit anchors
    pub fn new(home: &str, cwd: &str) -> Self {
        Self {
            home: collapse("/", home),
            cwd: collapse("/", cwd),
        }
    }

    /// Create a normalizer from `$HOME` and the process working directory
    pub fn from_env() -> Self {
        let home = env::var("HOME").unwrap_or_else(|_| "/".to_string());
        let cwd = env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "/".to_string());
        Self::new(&home, &cwd)
    }

    /// Normalize `raw` into an absolute path
    ///
    /// # Examples
    /// ```
    /// use rootserve::path::Normalizer;
    /// let n = Normalizer::new("/home/me", "/srv");
    /// assert_eq!(n.normalize(""), "/");
    /// assert_eq!(n.normalize("~/site/../www"), "/home/me/www");
    /// assert_eq!(n.normalize("a//b/./c"), "/srv/a/b/c");
    /// assert_eq!(n.normalize("/../../etc/passwd"), "/etc/passwd");
    /// ```
    pub fn normalize(&self, raw: &str) -> String {
        if raw.is_empty() {
            return "/".to_string();
        }

        if raw == "~" {
            return self.home.clone();
        }
        if let Some(rest) = raw.strip_prefix("~/") {
            return collapse(&self.home, rest);
        }
        if raw.starts_with('/') {
            return collapse("/", raw);
        }
        collapse(&self.cwd, raw)
    }

    pub fn home(&self) -> &str {
        &self.home
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Normalize `raw` using the current process environment
pub fn normalize(raw: &str) -> String {
    Normalizer::from_env().normalize(raw)
}

/// Place a URL-style `path` below an absolute `base`
///
/// `path` is normalized as rooted first, so no `..` in it can leave `base`.
///
/// # Examples
/// ```
/// use rootserve::path::join_under;
/// assert_eq!(join_under("/srv/www", "/css/../app.js"), "/srv/www/app.js");
/// assert_eq!(join_under("/srv/www", "../../etc/passwd"), "/srv/www/etc/passwd");
/// assert_eq!(join_under("/srv/www", "/"), "/srv/www");
/// ```
pub fn join_under(base: &str, path: &str) -> String {
    collapse(&collapse("/", base), &collapse("/", path))
}

/// Append `rest` below the already-absolute `anchor`, resolving `.` and `..`
///
/// Segments of the anchor form a floor that `..` can't pop.
fn collapse(anchor: &str, rest: &str) -> String {
    let mut segments: Vec<&str> = anchor.split('/').filter(|s| !s.is_empty()).collect();
    let floor = segments.len();

    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.len() > floor {
                    segments.pop();
                }
            }
            s => segments.push(s),
        }
    }

    let mut out = String::with_capacity(anchor.len() + rest.len() + 1);
    for segment in &segments {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}
