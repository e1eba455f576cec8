//! Requirements manifest parsing.
//!
//! A manifest is a flat text file with one requirement per line, in the
//! form `<package-name><operator><version>` where the operator is `==`
//! (exact pin) or `>=` (minimum version). Lines starting with `#` are
//! comments and blank lines are ignored. Comment lines directly above a
//! requirement are kept as that requirement's note, which is how pins
//! usually carry their explanation:
//!
//! ```text
//! fastapi>=0.104.1
//! # 9.0.1 is the last release that still supports our runtime
//! Pillow==9.0.1
//! ```

mod version;

pub use version::{Stage, Version};

use regex::Regex;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, instrument};

static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?").expect("name regex is valid")
});

static NAME_SEPARATORS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-_.]+").expect("separator regex is valid"));

/// Operators tried against the text after the name, longest first
const OPERATORS: &[&str] = &["===", "==", ">=", "<=", "~=", "!=", "<", ">"];

/// Version constraint operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `==`, an exact pin
    Exact,
    /// `>=`, a minimum version
    AtLeast,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Exact => "==",
            Operator::AtLeast => ">=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a manifest line was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineErrorKind {
    #[error("missing package name")]
    EmptyName,
    #[error("invalid package name")]
    InvalidName,
    #[error("invalid extras list")]
    InvalidExtras,
    #[error("missing version constraint (expected `==` or `>=`)")]
    MissingOperator,
    #[error("unsupported operator `{0}` (expected `==` or `>=`)")]
    UnsupportedOperator(String),
    #[error("invalid version `{0}`")]
    InvalidVersion(String),
    #[error("duplicate requirement for `{name}` (first declared on line {first_line})")]
    Duplicate { name: String, first_line: usize },
}

/// A rejected line with its 1-based line number
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}: {content}")]
pub struct LineError {
    pub line: usize,
    pub content: String,
    pub kind: LineErrorKind,
}

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest has {} invalid line(s)", .0.len())]
    Invalid(Vec<LineError>),
}

impl ManifestError {
    /// The rejected lines, empty for I/O failures
    pub fn line_errors(&self) -> &[LineError] {
        match self {
            ManifestError::Invalid(errors) => errors,
            ManifestError::Io { .. } => &[],
        }
    }
}

/// One `<name><op><version>` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    name: String,
    extras: Vec<String>,
    operator: Operator,
    version: Version,
    line: usize,
    note: Option<String>,
}

impl Requirement {
    /// Parses a single requirement, without comment handling
    pub fn parse(text: &str) -> Result<Self, LineErrorKind> {
        let text = text.trim();
        let name = NAME_RE
            .find(text)
            .map(|m| m.as_str())
            .ok_or_else(|| {
                if text.is_empty() || OPERATORS.iter().any(|op| text.starts_with(op)) || text.starts_with('[') {
                    LineErrorKind::EmptyName
                } else {
                    LineErrorKind::InvalidName
                }
            })?;
        let mut rest = text[name.len()..].trim_start();

        let mut extras = Vec::new();
        if let Some(after_bracket) = rest.strip_prefix('[') {
            let close = after_bracket.find(']').ok_or(LineErrorKind::InvalidExtras)?;
            for extra in after_bracket[..close].split(',').map(str::trim) {
                let valid = NAME_RE.find(extra).is_some_and(|m| m.as_str() == extra);
                if !valid {
                    return Err(LineErrorKind::InvalidExtras);
                }
                extras.push(extra.to_string());
            }
            rest = after_bracket[close + 1..].trim_start();
        }

        if rest.is_empty() {
            return Err(LineErrorKind::MissingOperator);
        }
        let op = OPERATORS
            .iter()
            .find(|op| rest.starts_with(**op))
            .ok_or(if rest.starts_with(|c: char| c.is_alphanumeric() || c == '-' || c == '_') {
                LineErrorKind::InvalidName
            } else {
                LineErrorKind::MissingOperator
            })?;
        let operator = match *op {
            "==" => Operator::Exact,
            ">=" => Operator::AtLeast,
            other => return Err(LineErrorKind::UnsupportedOperator(other.to_string())),
        };

        let raw_version = rest[op.len()..].trim();
        let version = Version::parse(raw_version)
            .filter(|v| !v.is_wildcard() || operator == Operator::Exact)
            .ok_or_else(|| LineErrorKind::InvalidVersion(raw_version.to_string()))?;

        Ok(Self {
            name: name.to_string(),
            extras,
            operator,
            version,
            line: 0,
            note: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name in normalised form (lower case, `-` separators)
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    pub fn extras(&self) -> &[String] {
        &self.extras
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// 1-based line in the manifest, 0 for standalone requirements
    pub fn line(&self) -> usize {
        self.line
    }

    /// Comment text from the lines directly above
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn is_pinned(&self) -> bool {
        self.operator == Operator::Exact && !self.version.is_wildcard()
    }

    /// Returns true when `candidate` satisfies this requirement
    ///
    /// Malformed candidates never satisfy anything.
    pub fn allows(&self, candidate: &str) -> bool {
        let Some(candidate) = Version::parse(candidate.trim()) else {
            return false;
        };
        if candidate.is_wildcard() {
            return false;
        }
        match self.operator {
            Operator::Exact if self.version.is_wildcard() => self.version.prefix_matches(&candidate),
            Operator::Exact => candidate == self.version,
            Operator::AtLeast => candidate >= self.version,
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        write!(f, "{}{}", self.operator, self.version)
    }
}

/// A parsed manifest, in file order
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    requirements: Vec<Requirement>,
}

impl Manifest {
    /// Parses manifest text
    ///
    /// ### Errors
    ///
    /// Returns [`ManifestError::Invalid`] listing every bad line.
    #[instrument(skip(input), fields(bytes = input.len()))]
    pub fn parse(input: &str) -> Result<Self, ManifestError> {
        let mut requirements: Vec<Requirement> = Vec::new();
        let mut errors = Vec::new();
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut pending_note: Vec<String> = Vec::new();

        for (index, raw_line) in input.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw_line.trim();

            if trimmed.is_empty() {
                pending_note.clear();
                continue;
            }
            if let Some(comment) = trimmed.strip_prefix('#') {
                pending_note.push(comment.trim().to_string());
                continue;
            }

            let note = if pending_note.is_empty() {
                None
            } else {
                Some(std::mem::take(&mut pending_note).join("\n"))
            };

            match Requirement::parse(strip_inline_comment(trimmed)) {
                Ok(mut requirement) => {
                    requirement.line = line;
                    requirement.note = note;
                    let key = requirement.normalized_name();
                    if let Some(first_line) = seen.get(&key) {
                        errors.push(LineError {
                            line,
                            content: trimmed.to_string(),
                            kind: LineErrorKind::Duplicate {
                                name: requirement.name.clone(),
                                first_line: *first_line,
                            },
                        });
                    } else {
                        seen.insert(key, line);
                        requirements.push(requirement);
                    }
                }
                Err(kind) => errors.push(LineError {
                    line,
                    content: trimmed.to_string(),
                    kind,
                }),
            }
        }

        if !errors.is_empty() {
            debug!("Rejected {} manifest line(s)", errors.len());
            return Err(ManifestError::Invalid(errors));
        }

        debug!("Parsed {} requirement(s)", requirements.len());
        Ok(Self { requirements })
    }

    /// Reads and parses a manifest file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Looks up a requirement by package name
    ///
    /// `Pillow`, `pillow` and `PILLOW` all find the same entry, as do
    /// `python-jose` and `python_jose`.
    pub fn get(&self, name: &str) -> Option<&Requirement> {
        let key = normalize_name(name);
        self.requirements.iter().find(|r| r.normalized_name() == key)
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    pub fn pinned(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter().filter(|r| r.is_pinned())
    }

    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }
}

/// Lower-cases a package name and collapses `-`, `_` and `.` runs to `-`
pub fn normalize_name(name: &str) -> String {
    NAME_SEPARATORS_RE.replace_all(&name.to_ascii_lowercase(), "-").into_owned()
}

/// Drops a trailing ` # comment`; a `#` needs whitespace before it
fn strip_inline_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, byte) in bytes.iter().enumerate() {
        if *byte == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return line[..i].trim_end();
        }
    }
    line
}
