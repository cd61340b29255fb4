//! Key name validation and the `.Local` / `.Roaming` naming convention.
//!
//! Valid key names:
//! - Must be non-empty
//! - Must not contain whitespace, control characters, or `/`
//! - Must not contain `..` (empty dotted component)
//! - Must not start or end with `.`
//!
//! A registry's key pair shares a stem: `{stem}.Local` and `{stem}.Roaming`.

use crate::error::{KeyError, KeyResult};
use crate::types::KeyNames;

/// Suffix of a local (writer) key name.
pub const LOCAL_SUFFIX: &str = ".Local";

/// Suffix of a roaming (public) key name.
pub const ROAMING_SUFFIX: &str = ".Roaming";

/// Characters that are forbidden anywhere in a key name.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '*', '?', '[', ']', ':'];

/// Validate a key name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use nomad_keys::names::validate_key_name;
///
/// assert!(validate_key_name("Nomad.Kubo.PeerSwarm.Roaming").is_ok());
/// assert!(validate_key_name("").is_err());
/// assert!(validate_key_name("bad..name").is_err());
/// ```
pub fn validate_key_name(name: &str) -> KeyResult<()> {
    let invalid = |reason: String| KeyError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("key name must not be empty".into()));
    }

    if let Some(ch) = name
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_CHARS.contains(c))
    {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }

    if name.contains("..") {
        return Err(invalid("must not contain '..'".into()));
    }

    if name.starts_with('.') || name.ends_with('.') {
        return Err(invalid("must not start or end with '.'".into()));
    }

    Ok(())
}

/// The key pair names for a stem: `{stem}.Local` / `{stem}.Roaming`.
pub fn key_names(stem: &str) -> KeyNames {
    KeyNames {
        local: format!("{stem}{LOCAL_SUFFIX}"),
        roaming: format!("{stem}{ROAMING_SUFFIX}"),
    }
}

/// The key pair names for the `n`th registry under a prefix.
pub fn ordinal_key_names(prefix: &str, n: usize) -> KeyNames {
    key_names(&format!("{prefix}.{n}"))
}

/// The local key name paired with a roaming key name.
///
/// Returns `None` if `roaming` does not end in `.Roaming`.
pub fn local_name_for_roaming(roaming: &str) -> Option<String> {
    roaming
        .strip_suffix(ROAMING_SUFFIX)
        .map(|stem| format!("{stem}{LOCAL_SUFFIX}"))
}
