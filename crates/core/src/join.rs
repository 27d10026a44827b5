//! Joining base prefixes and object names.
//!
//! The same rules apply to filesystem paths, S3 keys, blob names and URL
//! paths: one trailing `/` is dropped from the base, one leading `/` from
//! the name, and the two are glued with a single `/`. Nothing else is
//! normalized; `.`/`..` and repeated separators are left to the backend.

pub const SEPARATOR: char = '/';

/// Join `base` and `name` with exactly one separator.
///
/// An empty base stands for "no prefix" and yields the trimmed name.
pub fn join(base: &str, name: &str) -> String {
    let name = name.strip_prefix(SEPARATOR).unwrap_or(name);
    if base.is_empty() {
        return name.to_string();
    }
    let base = base.strip_suffix(SEPARATOR).unwrap_or(base);
    format!("{base}{SEPARATOR}{name}")
}

/// Make a listed key relative to `prefix` again.
///
/// Keys outside the prefix are returned untouched.
pub fn strip_prefix<'a>(prefix: &str, key: &'a str) -> &'a str {
    if prefix.is_empty() {
        return key;
    }
    let prefix = prefix.strip_suffix(SEPARATOR).unwrap_or(prefix);
    key.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix(SEPARATOR))
        .unwrap_or(key)
}
