use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<epoch>\d+)!)?(?P<release>\d+(?:\.\d+)*)(?P<wildcard>\.\*)?(?P<suffix>[A-Za-z0-9._-]*)(?:\+[A-Za-z0-9.]+)?$")
        .expect("version regex is valid")
});

/// Release stage of a version, in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Dev,
    Alpha,
    Beta,
    ReleaseCandidate,
    Final,
    Post,
}

/// A parsed release version
///
/// Covers the common subset of Python package versions: an optional
/// epoch, dotted numeric release, one pre/post/dev suffix and an ignored
/// local label. Trailing zero segments do not affect ordering.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    stage: Stage,
    stage_number: u64,
    wildcard: bool,
    raw: String,
}

impl Version {
    /// Parses a version string, returning None when it is malformed
    pub fn parse(input: &str) -> Option<Self> {
        let caps = VERSION_RE.captures(input)?;
        let epoch = match caps.name("epoch") {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        let release = caps["release"]
            .split('.')
            .map(|segment| segment.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()?;
        let wildcard = caps.name("wildcard").is_some();
        let suffix = caps.name("suffix").map(|m| m.as_str()).unwrap_or("");
        if wildcard && !suffix.is_empty() {
            return None;
        }
        let (stage, stage_number) = parse_suffix(suffix)?;

        Some(Self {
            epoch,
            release,
            stage,
            stage_number,
            wildcard,
            raw: input.to_string(),
        })
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// True when `self` is a `X.Y.*` pattern and `other` falls under it
    pub fn prefix_matches(&self, other: &Version) -> bool {
        self.epoch == other.epoch
            && self.release.iter().enumerate().all(|(i, segment)| {
                other.release.get(i).copied().unwrap_or(0) == *segment
            })
    }

    fn release_cmp(&self, other: &Version) -> Ordering {
        let len = self.release.len().max(other.release.len());
        for i in 0..len {
            let a = self.release.get(i).copied().unwrap_or(0);
            let b = other.release.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.release_cmp(other))
            .then_with(|| self.stage.cmp(&other.stage))
            .then_with(|| self.stage_number.cmp(&other.stage_number))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_suffix(suffix: &str) -> Option<(Stage, u64)> {
    let lowered = suffix.to_ascii_lowercase();
    let trimmed = lowered.trim_start_matches(['.', '_', '-']);
    if trimmed.is_empty() {
        return Some((Stage::Final, 0));
    }

    // Longest labels first so "alpha" is not read as "a" + "lpha"
    const LABELS: &[(&str, Stage)] = &[
        ("preview", Stage::ReleaseCandidate),
        ("alpha", Stage::Alpha),
        ("beta", Stage::Beta),
        ("post", Stage::Post),
        ("pre", Stage::ReleaseCandidate),
        ("rev", Stage::Post),
        ("dev", Stage::Dev),
        ("rc", Stage::ReleaseCandidate),
        ("a", Stage::Alpha),
        ("b", Stage::Beta),
        ("c", Stage::ReleaseCandidate),
        ("r", Stage::Post),
    ];

    let (label, stage) = LABELS.iter().find(|(label, _)| trimmed.starts_with(label))?;
    let number = trimmed[label.len()..].trim_start_matches(['.', '_', '-']);
    if number.is_empty() {
        return Some((*stage, 0));
    }
    number.parse().ok().map(|n| (*stage, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn test_parse_plain_release() {
        assert_eq!(v("0.104.1").release(), &[0, 104, 1]);
        assert!(!v("9.0.1").is_wildcard());
    }

    #[test]
    fn test_trailing_zeros_are_equal() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("2"), v("2.0"));
    }

    #[test]
    fn test_stage_ordering() {
        assert!(v("1.0.dev1") < v("1.0a1"));
        assert!(v("1.0a1") < v("1.0b2"));
        assert!(v("1.0b2") < v("1.0rc1"));
        assert!(v("1.0rc1") < v("1.0"));
        assert!(v("1.0") < v("1.0.post1"));
        assert!(v("1.0.post1") < v("1.0.1"));
    }

    #[test]
    fn test_epoch_dominates() {
        assert!(v("1!0.1") > v("2024.1"));
    }

    #[test]
    fn test_wildcard_prefix() {
        let pattern = v("1.4.*");
        assert!(pattern.is_wildcard());
        assert!(pattern.prefix_matches(&v("1.4.2")));
        assert!(pattern.prefix_matches(&v("1.4")));
        assert!(!pattern.prefix_matches(&v("1.5.0")));
    }

    #[test]
    fn test_local_label_ignored() {
        assert_eq!(v("2.1.0+cpu"), v("2.1.0"));
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in ["", "abc", "1..2", "1.0,<2", "1.*.3", "1.0.*rc1", ">=1.0", "1.0 beta"] {
            assert!(Version::parse(bad).is_none(), "{bad:?} should be rejected");
        }
    }
}
