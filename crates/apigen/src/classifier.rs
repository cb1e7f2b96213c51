//! Class-level API membership

use apigen_classfile::descriptor::internal_to_binary;
use apigen_classfile::ClassHeader;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::policy::AllowedPackagePolicy;

/// Local and anonymous classes: `Outer$1` or `Outer$1Local` (JLS 13.1)
static LOCAL_CLASS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^.+\$[0-9]+(?:[[:alnum:]_$]+)?$").expect("local class pattern is valid"));

/// Check if an internal class name denotes a local or anonymous class
pub fn is_local_or_anonymous(internal_name: &str) -> bool {
    LOCAL_CLASS_PATTERN.is_match(internal_name)
}

/// Decide whether a class belongs to the public API
///
/// The class's package must be allowed, its access flags must make it visible
/// under `policy`, and it must not be local or anonymous.
pub fn is_api_class(header: &ClassHeader, policy: &AllowedPackagePolicy) -> bool {
    policy.allows_type(&internal_to_binary(&header.name))
        && policy.is_api_visible(header.access_flags)
        && !is_local_or_anonymous(&header.name)
}
