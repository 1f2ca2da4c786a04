use std::fmt;
use std::str::FromStr;

use super::error::AuthzError;

/// A request path reduced to its segments.
///
/// Query strings and fragments are dropped, empty and `.` segments are
/// skipped and `..` pops the previous segment (never above root), so
/// `/list/../admin//x` and `/admin/x` are the same path to the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPath {
    segments: Vec<String>,
}

impl RequestPath {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.split(['?', '#']).next().unwrap_or_default();
        let mut segments: Vec<String> = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other.to_string()),
            }
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for RequestPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    /// `*`: exactly one segment
    One,
    /// `**`: zero or more trailing segments
    Rest,
}

/// Segment-wise glob over request paths.
///
/// Literal segments match exactly, `*` matches one segment and a trailing
/// `**` matches whatever remains, including nothing. A pattern without
/// wildcards is an exact match, so `/teacher` does not cover `/teachers`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Pattern covering `prefix` itself and everything below it.
    pub fn subtree(prefix: &str) -> Result<Self, AuthzError> {
        let base: PathPattern = prefix.parse()?;
        if !base.is_literal() {
            return Err(AuthzError::configuration(format!(
                "prefix {prefix:?} must not contain wildcards"
            )));
        }
        let raw = if base.segments.is_empty() {
            "/**".to_string()
        } else {
            format!("{}/**", base.raw.trim_end_matches('/'))
        };
        raw.parse()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn is_literal(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, Segment::Literal(_)))
    }

    pub fn matches(&self, path: &RequestPath) -> bool {
        let mut remaining = path.segments().iter();
        for segment in &self.segments {
            match segment {
                Segment::Rest => return true,
                Segment::One => {
                    if remaining.next().is_none() {
                        return false;
                    }
                }
                Segment::Literal(expected) => match remaining.next() {
                    Some(actual) if actual == expected => {}
                    _ => return false,
                },
            }
        }
        remaining.next().is_none()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PathPattern {
    type Err = AuthzError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if !raw.starts_with('/') {
            return Err(AuthzError::configuration(format!(
                "route pattern {raw:?} must start with '/'"
            )));
        }

        let parts: Vec<&str> = raw.split('/').filter(|p| !p.is_empty()).collect();
        let mut segments = Vec::with_capacity(parts.len());
        for (idx, part) in parts.iter().enumerate() {
            let segment = match *part {
                "." | ".." => {
                    return Err(AuthzError::configuration(format!(
                        "route pattern {raw:?} contains a relative segment"
                    )))
                }
                "*" => Segment::One,
                "**" if idx + 1 == parts.len() => Segment::Rest,
                "**" => {
                    return Err(AuthzError::configuration(format!(
                        "route pattern {raw:?} may only use '**' as its last segment"
                    )))
                }
                literal if literal.contains('*') => {
                    return Err(AuthzError::configuration(format!(
                        "route pattern {raw:?} mixes '*' into a literal segment"
                    )))
                }
                literal => Segment::Literal(literal.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }
}
