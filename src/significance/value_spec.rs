use std::fmt;
use std::str::FromStr;

use crate::error::BinError;

/// Which quantity a significance model reports.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ValueSpec {
    /// Mean background-subtracted counts of the indexed image.
    Count(usize),
    /// Ratio of the mean counts of two indexed images.
    Ratio(usize, usize),
    /// Mean of an external data image; `absolute` marks absolute per-pixel errors.
    External { absolute: bool },
}

fn invalid(s: &str) -> BinError {
    BinError::InvalidValueSelection(s.to_string())
}

/// Split `name(args)` into its name and comma separated arguments.
fn split_call(s: &str) -> Option<(&str, Vec<&str>)> {
    let s = s.trim();
    let open = s.find('(')?;
    let inner = s[open + 1..].strip_suffix(')')?;
    let args = inner.split(',').map(str::trim).collect();
    Some((s[..open].trim(), args))
}

fn parse_index(arg: &str, s: &str) -> Result<usize, BinError> {
    arg.parse().map_err(|_| invalid(s))
}

impl FromStr for ValueSpec {
    type Err = BinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, args) = split_call(s).ok_or_else(|| invalid(s))?;
        match (name, args.as_slice()) {
            ("count", [n]) => Ok(ValueSpec::Count(parse_index(n, s)?)),
            ("ratio", [a, b]) => Ok(ValueSpec::Ratio(parse_index(a, s)?, parse_index(b, s)?)),
            ("external", ["0"]) => Ok(ValueSpec::External { absolute: false }),
            ("external_abs", ["0"]) => Ok(ValueSpec::External { absolute: true }),
            _ => Err(invalid(s)),
        }
    }
}

impl fmt::Display for ValueSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueSpec::Count(n) => write!(f, "count({})", n),
            ValueSpec::Ratio(a, b) => write!(f, "ratio({}, {})", a, b),
            ValueSpec::External { absolute: false } => write!(f, "external(0)"),
            ValueSpec::External { absolute: true } => write!(f, "external_abs(0)"),
        }
    }
}
