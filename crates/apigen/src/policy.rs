//! Allowed-package policy
//!
//! Every "may this type appear in the API" question goes through
//! [`AllowedPackagePolicy::allows_type`].

use apigen_classfile::access::Visibility;
use apigen_classfile::descriptor::package_of;

/// Packages exported by the `java.base` module; always allowed
pub const JAVA_BASE_PACKAGES: &[&str] = &[
    "java.io",
    "java.lang",
    "java.lang.annotation",
    "java.lang.constant",
    "java.lang.invoke",
    "java.lang.module",
    "java.lang.ref",
    "java.lang.reflect",
    "java.lang.runtime",
    "java.math",
    "java.net",
    "java.net.spi",
    "java.nio",
    "java.nio.channels",
    "java.nio.channels.spi",
    "java.nio.charset",
    "java.nio.charset.spi",
    "java.nio.file",
    "java.nio.file.attribute",
    "java.nio.file.spi",
    "java.security",
    "java.security.acl",
    "java.security.cert",
    "java.security.interfaces",
    "java.security.spec",
    "java.text",
    "java.text.spi",
    "java.time",
    "java.time.chrono",
    "java.time.format",
    "java.time.temporal",
    "java.time.zone",
    "java.util",
    "java.util.concurrent",
    "java.util.concurrent.atomic",
    "java.util.concurrent.locks",
    "java.util.function",
    "java.util.jar",
    "java.util.random",
    "java.util.regex",
    "java.util.spi",
    "java.util.stream",
    "java.util.zip",
    "javax.crypto",
    "javax.crypto.interfaces",
    "javax.crypto.spec",
    "javax.net",
    "javax.net.ssl",
    "javax.security.auth",
    "javax.security.auth.callback",
    "javax.security.auth.login",
    "javax.security.auth.spi",
    "javax.security.auth.x500",
    "javax.security.cert",
];

/// Which packages may appear in a public API
///
/// With no explicit packages the policy is *open*: every package is allowed
/// and package-private declarations count as API. Otherwise it is *declared*:
/// only the explicit packages and [`JAVA_BASE_PACKAGES`] are allowed, and
/// package-private declarations are excluded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowedPackagePolicy {
    allowed_packages: Vec<String>,
}

impl AllowedPackagePolicy {
    /// Create a policy from an ordered package list; duplicates are dropped
    pub fn new<I, S>(allowed_packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut packages: Vec<String> = Vec::new();
        for package in allowed_packages {
            let package = package.into();
            if !packages.contains(&package) {
                packages.push(package);
            }
        }
        Self {
            allowed_packages: packages,
        }
    }

    /// The open policy
    pub fn open() -> Self {
        Self::default()
    }

    /// Check if no explicit packages were declared
    pub fn is_open(&self) -> bool {
        self.allowed_packages.is_empty()
    }

    /// Explicitly allowed packages, in declaration order
    pub fn allowed_packages(&self) -> &[String] {
        &self.allowed_packages
    }

    /// Check if a package may appear in the API
    pub fn allows_package(&self, package: &str) -> bool {
        self.is_open()
            || JAVA_BASE_PACKAGES.contains(&package)
            || self.allowed_packages.iter().any(|p| p == package)
    }

    /// Check if a type, given by binary name (`java.util.List`), may appear in the API
    pub fn allows_type(&self, binary_name: &str) -> bool {
        self.allows_package(package_of(binary_name))
    }

    /// Check if a declaration with these access flags is part of the API
    pub fn is_api_visible(&self, access_flags: u16) -> bool {
        match Visibility::of(access_flags) {
            Visibility::Public | Visibility::Protected => true,
            Visibility::PackagePrivate => self.is_open(),
            Visibility::Private => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apigen_classfile::access::{ACC_FINAL, ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC};

    #[test]
    fn test_open_policy_allows_everything() {
        let policy = AllowedPackagePolicy::open();
        assert!(policy.is_open());
        assert!(policy.allows_type("com.acme.internal.Impl"));
        assert!(policy.allows_type("Unpackaged"));
        assert!(policy.is_api_visible(ACC_STATIC | ACC_FINAL));
        assert!(!policy.is_api_visible(ACC_PRIVATE));
    }

    #[test]
    fn test_declared_policy() {
        let policy = AllowedPackagePolicy::new(["com.acme.api"]);
        assert!(!policy.is_open());
        assert!(policy.allows_type("com.acme.api.Widget"));
        assert!(policy.allows_type("java.util.List"));
        assert!(policy.allows_type("java.util.concurrent.Future"));
        assert!(!policy.allows_type("com.acme.api.impl.WidgetImpl"));
        assert!(!policy.allows_type("com.acme.Other"));
        assert!(!policy.allows_type("javax.swing.JPanel"));
        assert!(!policy.allows_type("Unpackaged"));
    }

    #[test]
    fn test_declared_policy_visibility() {
        let policy = AllowedPackagePolicy::new(["com.acme"]);
        assert!(policy.is_api_visible(ACC_PUBLIC));
        assert!(policy.is_api_visible(ACC_PROTECTED | ACC_STATIC));
        assert!(!policy.is_api_visible(0));
        assert!(!policy.is_api_visible(ACC_PRIVATE));
    }

    #[test]
    fn test_duplicates_dropped_preserving_order() {
        let policy = AllowedPackagePolicy::new(["b", "a", "b", "c", "a"]);
        assert_eq!(policy.allowed_packages(), ["b", "a", "c"]);
    }
}
