//! npm-style version ranges evaluated with the `semver` crate.
//!
//! npm range syntax differs from the crate's native grammar in a few
//! places: a bare `1.2.3` is an exact pin rather than a caret, partial
//! versions like `1.2` are x-ranges, comparators are joined by spaces
//! instead of commas, hyphen ranges exist, and `||` separates
//! alternatives. [`convert_range`] rewrites one alternative into the
//! crate's grammar so `VersionReq` can do the actual matching.

use semver::{Version, VersionReq};

use crate::error::GenError;

/// True when `version` lies inside the npm range `range`.
///
/// Invalid versions and ranges are hard errors. Prerelease versions only
/// match ranges that mention a prerelease on the same triple, which is
/// npm's default behavior.
pub fn satisfies(version: &str, range: &str) -> Result<bool, GenError> {
    let parsed = parse_version(version)?;
    let alternatives = parse_alternatives(range)?;
    Ok(alternatives.iter().any(|req| req.matches(&parsed)))
}

/// Highest of `versions` that satisfies the npm range `range`.
///
/// Returns the winning version exactly as it appeared in the input so the
/// caller can use it as a lookup key. Entries that are not strict semver
/// are skipped rather than rejected, since registries occasionally carry
/// junk in old packument entries. An invalid `range` is a hard error;
/// an empty result is `None`.
pub fn max_satisfying<'a, I>(versions: I, range: &str) -> Result<Option<&'a str>, GenError>
where
    I: IntoIterator<Item = &'a str>,
{
    let alternatives = parse_alternatives(range)?;
    let mut candidates: Vec<(&str, Version)> = versions
        .into_iter()
        .filter_map(|raw| Version::parse(strip_v(raw)).ok().map(|v| (raw, v)))
        .collect();
    candidates.sort_by(|a, b| b.1.cmp(&a.1));
    for (raw, parsed) in &candidates {
        if alternatives.iter().any(|req| req.matches(parsed)) {
            return Ok(Some(raw));
        }
    }
    Ok(None)
}

fn parse_version(version: &str) -> Result<Version, GenError> {
    let trimmed = strip_v(version.trim());
    Version::parse(trimmed).map_err(|err| GenError::VersionInvalid {
        version: version.to_string(),
        reason: err.to_string(),
    })
}

fn strip_v(version: &str) -> &str {
    version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
        .unwrap_or(version)
}

/// Splits on `||` and converts each alternative. Alternatives that fail to
/// convert are dropped as long as at least one survives; a range with no
/// usable alternative is a hard error.
fn parse_alternatives(range: &str) -> Result<Vec<VersionReq>, GenError> {
    let mut reqs = Vec::new();
    let mut last_reason = None;
    for alt in range.split("||") {
        match convert_range(alt).and_then(|converted| {
            VersionReq::parse(&converted).map_err(|err| GenError::RangeInvalid {
                range: alt.trim().to_string(),
                reason: err.to_string(),
            })
        }) {
            Ok(req) => reqs.push(req),
            Err(err) => last_reason = Some(err.to_string()),
        }
    }
    if reqs.is_empty() {
        return Err(GenError::RangeInvalid {
            range: range.to_string(),
            reason: last_reason.unwrap_or_else(|| "no usable alternatives".to_string()),
        });
    }
    Ok(reqs)
}

/// Rewrites one npm range alternative into the `semver` crate's grammar.
fn convert_range(range: &str) -> Result<String, GenError> {
    let trimmed = range.trim();
    if trimmed.is_empty() {
        return Ok(">=0.0.0".to_string());
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() == 3 && tokens[1] == "-" {
        return convert_hyphen(trimmed, tokens[0], tokens[2]);
    }

    let mut parts = Vec::new();
    let mut iter = tokens.into_iter();
    while let Some(tok) = iter.next() {
        // npm tolerates whitespace between an operator and its version.
        let glued;
        let tok = if is_bare_operator(tok) {
            match iter.next() {
                Some(next) => {
                    glued = format!("{tok}{next}");
                    glued.as_str()
                }
                None => return Err(invalid(trimmed, "dangling operator")),
            }
        } else {
            tok
        };
        parts.push(convert_comparator(trimmed, tok)?);
    }
    Ok(parts.join(", "))
}

fn is_bare_operator(tok: &str) -> bool {
    matches!(tok, ">" | ">=" | "<" | "<=" | "=" | "^" | "~")
}

fn invalid(range: &str, reason: &str) -> GenError {
    GenError::RangeInvalid {
        range: range.to_string(),
        reason: reason.to_string(),
    }
}

fn convert_comparator(range: &str, tok: &str) -> Result<String, GenError> {
    if let Some((op, rest)) = split_operator(tok) {
        let rest = strip_v(rest);
        let partial = Partial::parse(rest).ok_or_else(|| invalid(range, "bad comparator"))?;
        if partial.major.is_none() {
            // An x major under a strict bound can match nothing at all.
            return Ok(match op {
                ">" | "<" => "<0.0.0".to_string(),
                _ => ">=0.0.0".to_string(),
            });
        }
        return Ok(format!("{op}{}", partial.truncated()));
    }

    let bare = strip_v(tok);
    if bare == "*" || bare == "x" || bare == "X" {
        return Ok(">=0.0.0".to_string());
    }
    let partial = Partial::parse(bare).ok_or_else(|| invalid(range, "bad version in range"))?;
    if partial.is_full() {
        // npm treats a bare full version as an exact pin.
        return Ok(format!("={}", partial.exact()));
    }
    match partial.next_boundary() {
        Some(bound) => Ok(format!(">={}, <{bound}", partial.floor())),
        None => Ok(">=0.0.0".to_string()),
    }
}

fn split_operator(tok: &str) -> Option<(&str, &str)> {
    for op in [">=", "<=", ">", "<", "=", "^", "~"] {
        if let Some(rest) = tok.strip_prefix(op) {
            return Some((op, rest));
        }
    }
    None
}

/// `A - B` includes both endpoints; a partial upper endpoint widens to the
/// end of its implied range, so `1.2.3 - 2.3` means `>=1.2.3 <2.4.0`.
fn convert_hyphen(range: &str, lo: &str, hi: &str) -> Result<String, GenError> {
    let lo = Partial::parse(strip_v(lo)).ok_or_else(|| invalid(range, "bad lower bound"))?;
    let hi = Partial::parse(strip_v(hi)).ok_or_else(|| invalid(range, "bad upper bound"))?;

    let mut parts = Vec::new();
    if lo.major.is_some() {
        parts.push(format!(">={}", lo.floor()));
    } else {
        parts.push(">=0.0.0".to_string());
    }
    if hi.is_full() {
        parts.push(format!("<={}", hi.exact()));
    } else if let Some(bound) = hi.next_boundary() {
        parts.push(format!("<{bound}"));
    }
    Ok(parts.join(", "))
}

/// A version with trailing components possibly absent or wildcarded.
/// Components after the first wildcard are discarded, so `1.x.2` reads
/// as `1.x`.
struct Partial {
    major: Option<u64>,
    minor: Option<u64>,
    patch: Option<u64>,
    pre: Option<String>,
}

impl Partial {
    fn parse(tok: &str) -> Option<Self> {
        let tok = tok.split('+').next().unwrap_or(tok);
        let (core, pre) = match tok.split_once('-') {
            Some((core, pre)) if !pre.is_empty() => (core, Some(pre.to_string())),
            Some(_) => return None,
            None => (tok, None),
        };

        let mut nums = [None, None, None];
        for (idx, piece) in core.split('.').enumerate() {
            if idx >= nums.len() {
                return None;
            }
            if !matches!(piece, "x" | "X" | "*") {
                nums[idx] = Some(piece.parse::<u64>().ok()?);
            }
        }
        // A wildcard or missing component floors everything after it.
        if nums[0].is_none() {
            nums = [None, None, None];
        } else if nums[1].is_none() {
            nums[2] = None;
        }
        let full = nums.iter().all(Option::is_some);
        if pre.is_some() && !full {
            return None;
        }
        Some(Self {
            major: nums[0],
            minor: nums[1],
            patch: nums[2],
            pre,
        })
    }

    fn is_full(&self) -> bool {
        self.major.is_some() && self.minor.is_some() && self.patch.is_some()
    }

    /// Exact rendering, only meaningful when full.
    fn exact(&self) -> String {
        let mut out = self.floor();
        if let Some(pre) = &self.pre {
            out.push('-');
            out.push_str(pre);
        }
        out
    }

    /// Zero-filled inclusive lower bound.
    fn floor(&self) -> String {
        format!(
            "{}.{}.{}",
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0)
        )
    }

    /// Exclusive upper bound of the implied range for a partial version.
    /// `None` when the version is full or unbounded.
    fn next_boundary(&self) -> Option<String> {
        match (self.major, self.minor, self.patch) {
            (Some(major), Some(minor), None) => {
                Some(format!("{major}.{}.0", minor.saturating_add(1)))
            }
            (Some(major), None, None) => Some(format!("{}.0.0", major.saturating_add(1))),
            _ => None,
        }
    }

    /// Known components only, for re-emission behind an operator.
    fn truncated(&self) -> String {
        let mut out = String::new();
        if let Some(major) = self.major {
            out.push_str(&major.to_string());
            if let Some(minor) = self.minor {
                out.push('.');
                out.push_str(&minor.to_string());
                if let Some(patch) = self.patch {
                    out.push('.');
                    out.push_str(&patch.to_string());
                    if let Some(pre) = &self.pre {
                        out.push('-');
                        out.push_str(pre);
                    }
                }
            }
        }
        out
    }
}
