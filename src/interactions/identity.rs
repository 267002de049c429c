//! # Identity Codec
//!
//! Routing information for stateless UI elements, carried inside the opaque
//! `custom_id` that Discord round-trips back to us.
//!
//! Grammar: `scope ":" name (":" arg)*`. Arguments are escaped so they may
//! contain `:` (`%` becomes `%25`, `:` becomes `%3A`). Names are never escaped
//! and may not contain `:`.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.1.0: Escape argument separators instead of corrupting decoded args
//! - 1.0.0: Replace ad-hoc `prefix_` custom ids with scoped identities

use std::fmt;
use std::str::FromStr;

use crate::core::error::IdentityError;

/// Discord's limit on component and modal custom ids
pub const CUSTOM_ID_LIMIT: usize = 100;

const SEPARATOR: char = ':';

/// Which registry an identity routes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Button,
    Modal,
    UserSelect,
    Collector,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Scope::Button => "button",
            Scope::Modal => "modal",
            Scope::UserSelect => "userSelect",
            Scope::Collector => "collector",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "button" => Ok(Scope::Button),
            "modal" => Ok(Scope::Modal),
            "userSelect" => Ok(Scope::UserSelect),
            "collector" => Ok(Scope::Collector),
            _ => Err(()),
        }
    }
}

/// A decoded identity string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub scope: Scope,
    pub name: String,
    pub args: Vec<String>,
}

/// Format an identity without consulting any registry
///
/// Callers must already know `name` is registered under `scope`; registration
/// tokens and `ComponentRegistries::encode` are the public entry points.
pub(crate) fn format_identity<S: AsRef<str>>(
    scope: Scope,
    name: &str,
    args: &[S],
) -> Result<String, IdentityError> {
    let mut encoded = format!("{}{SEPARATOR}{name}", scope.as_str());
    for arg in args {
        encoded.push(SEPARATOR);
        escape_into(arg.as_ref(), &mut encoded);
    }

    let len = encoded.chars().count();
    if len > CUSTOM_ID_LIMIT {
        return Err(IdentityError::TooLong {
            len,
            limit: CUSTOM_ID_LIMIT,
        });
    }
    Ok(encoded)
}

/// Decode a raw custom id into its scope, name and arguments
pub fn decode(raw: &str) -> Result<Identity, IdentityError> {
    let invalid = |reason| IdentityError::Invalid {
        raw: raw.to_string(),
        reason,
    };

    let mut segments = raw.split(SEPARATOR);
    let scope = segments
        .next()
        .ok_or_else(|| invalid("empty identity"))?
        .parse::<Scope>()
        .map_err(|_| invalid("unknown scope"))?;
    let name = segments.next().ok_or_else(|| invalid("missing name"))?;
    if name.is_empty() {
        return Err(invalid("missing name"));
    }

    let args = segments
        .map(|segment| unescape(segment).ok_or_else(|| invalid("malformed escape sequence")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Identity {
        scope,
        name: name.to_string(),
        args,
    })
}

/// Names are embedded verbatim, so they must not contain the separator
pub(crate) fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.is_empty() {
        Err("name is empty")
    } else if name.contains(SEPARATOR) {
        Err("name contains ':'")
    } else if name.chars().count() > CUSTOM_ID_LIMIT / 2 {
        Err("name leaves no room for arguments")
    } else {
        Ok(())
    }
}

fn escape_into(arg: &str, out: &mut String) {
    for ch in arg.chars() {
        match ch {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            _ => out.push(ch),
        }
    }
}

fn unescape(segment: &str) -> Option<String> {
    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        let code: String = chars.by_ref().take(2).collect();
        match code.to_ascii_uppercase().as_str() {
            "25" => out.push('%'),
            "3A" => out.push(':'),
            _ => return None,
        }
    }
    Some(out)
}
