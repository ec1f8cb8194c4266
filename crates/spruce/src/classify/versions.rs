//! Package-name and version parsing for the superseded-version heuristic.
//!
//! Admins upload installers named like `Atom-1.0.5.pkg` or
//! `GoogleChrome_90.0.4430.85.dmg`. The base name groups revisions of the
//! same product; the trailing token orders them. Ordering is
//! semantic-version aware, never lexical: well-formed versions compare
//! through [`semver::Version`], anything looser falls back to a
//! numeric-then-text segment comparison.

use semver::Version;
use std::cmp::Ordering;

const PACKAGE_EXTENSIONS: [&str; 5] = ["pkg", "dmg", "mpkg", "zip", "msi"];

/// An orderable version parsed from a name token or version field.
#[derive(Debug, Clone)]
pub struct VersionKey {
    semver: Option<Version>,
    segments: Vec<Segment>,
}

/// Text sorts below numbers so that `1.0.0-beta` orders before `1.0.0`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    Text(String),
    Num(u64),
}

impl VersionKey {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim().trim_start_matches(['v', 'V']);
        Self {
            semver: parse_semver_lenient(trimmed),
            segments: parse_segments(trimmed),
        }
    }
}

impl Ord for VersionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        if let (Some(a), Some(b)) = (&self.semver, &other.semver) {
            return a.cmp(b);
        }
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let a = self.segments.get(i).cloned().unwrap_or(Segment::Num(0));
            let b = other.segments.get(i).cloned().unwrap_or(Segment::Num(0));
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for VersionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionKey {}

/// A package name split into its product base and trailing version.
#[derive(Debug, Clone)]
pub struct ParsedName {
    pub base: String,
    pub version: Option<VersionKey>,
}

/// Strip the installer extension and trailing version tokens from a
/// package name.
///
/// `Atom-1.0.5.pkg` parses to base `Atom` and version `1.0.5`;
/// `Firefox 78.0.1 ESR.dmg` keeps its full stem as the base because the
/// final token is not version-like.
pub fn parse_package_name(name: &str) -> ParsedName {
    let mut stem = strip_extensions(name);
    let mut version_tokens: Vec<String> = Vec::new();

    loop {
        let Some(cut) = stem.rfind(['-', '_', ' ']) else {
            break;
        };
        let token = stem[cut + 1..].to_string();
        if !is_version_token(&token) || cut == 0 {
            break;
        }
        version_tokens.insert(0, token);
        stem = stem[..cut].to_string();
    }

    let version = if version_tokens.is_empty() {
        None
    } else {
        Some(VersionKey::parse(&version_tokens.join(".")))
    };

    ParsedName { base: stem, version }
}

fn strip_extensions(name: &str) -> String {
    let mut stem = name.trim().to_string();
    // Twice, for archived installers like `Foo-1.0.pkg.zip`.
    for _ in 0..2 {
        let mut stripped = false;
        for ext in PACKAGE_EXTENSIONS {
            let suffix_len = ext.len() + 1;
            if stem.len() > suffix_len && stem.is_char_boundary(stem.len() - suffix_len) {
                let tail = &stem[stem.len() - suffix_len..];
                if tail.starts_with('.') && tail[1..].eq_ignore_ascii_case(ext) {
                    stem.truncate(stem.len() - suffix_len);
                    stripped = true;
                    break;
                }
            }
        }
        if !stripped {
            break;
        }
    }
    stem
}

fn is_version_token(token: &str) -> bool {
    let mut chars = token.chars();
    let starts_ok = match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('v') | Some('V') => chars.next().is_some_and(|c| c.is_ascii_digit()),
        _ => false,
    };
    starts_ok
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.')
}

fn parse_semver_lenient(raw: &str) -> Option<Version> {
    if let Ok(v) = Version::parse(raw) {
        return Some(v);
    }
    // Pad short forms like "2" or "2.0" out to three components.
    let dots = raw.chars().filter(|c| *c == '.').count();
    if dots < 2 && raw.chars().all(|c| c.is_ascii_digit() || c == '.') {
        let padded = format!("{}{}", raw, ".0".repeat(2 - dots));
        return Version::parse(&padded).ok();
    }
    None
}

fn parse_segments(raw: &str) -> Vec<Segment> {
    raw.split(['.', '-', '_'])
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| match chunk.parse::<u64>() {
            Ok(n) => Segment::Num(n),
            Err(_) => Segment::Text(chunk.to_lowercase()),
        })
        .collect()
}
