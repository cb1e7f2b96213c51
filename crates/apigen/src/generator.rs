//! The stub generator entry point

use std::io::Read;

use apigen_classfile::descriptor::internal_to_binary;
use apigen_classfile::{ClassFile, ClassHeader};
use tracing::debug;

use crate::classifier;
use crate::config::StubConfig;
use crate::error::Result;
use crate::extractor::Extractor;
use crate::policy::AllowedPackagePolicy;
use crate::synthesizer::synthesize;

/// Classifies classes and converts API classes into stubs
///
/// Immutable after construction; one generator can serve any number of
/// threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiStubGenerator {
    policy: AllowedPackagePolicy,
    validate_exposed_types: bool,
}

impl ApiStubGenerator {
    /// Create a generator without exposed-type validation
    pub fn new<I, S>(allowed_packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_validation(allowed_packages, false)
    }

    /// Create a generator, optionally validating exposed types
    pub fn with_validation<I, S>(allowed_packages: I, validate_exposed_types: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            policy: AllowedPackagePolicy::new(allowed_packages),
            validate_exposed_types,
        }
    }

    /// Create a generator from a loaded configuration
    pub fn from_config(config: &StubConfig) -> Self {
        Self::with_validation(
            config.api.allowed_packages.iter().cloned(),
            config.api.validate_exposed_types,
        )
    }

    /// The package policy in effect
    pub fn policy(&self) -> &AllowedPackagePolicy {
        &self.policy
    }

    /// Whether exposed types are validated
    pub fn validates_exposed_types(&self) -> bool {
        self.validate_exposed_types
    }

    /// Decide from the class header whether a class belongs to the API
    pub fn is_api_class(&self, class: &[u8]) -> Result<bool> {
        let header = ClassHeader::decode(class)?;
        let is_api = classifier::is_api_class(&header, &self.policy);
        debug!(class = %internal_to_binary(&header.name), is_api, "classified class");
        Ok(is_api)
    }

    /// Like [`is_api_class`](Self::is_api_class), reading the class from `reader`
    ///
    /// The reader is dropped before this returns, on success or failure.
    pub fn is_api_class_from_reader<R: Read>(&self, reader: R) -> Result<bool> {
        let class = read_class(reader)?;
        self.is_api_class(&class)
    }

    /// Convert a class into its API stub
    pub fn to_stub(&self, class: &[u8]) -> Result<Vec<u8>> {
        let class = ClassFile::decode(class)?;
        let extracted = Extractor::new(&self.policy, self.validate_exposed_types).extract(&class)?;
        let stub = synthesize(&extracted)?;
        debug!(
            class = %internal_to_binary(&class.name),
            methods = extracted.methods.len(),
            fields = extracted.fields.len(),
            bytes = stub.len(),
            "generated API stub"
        );
        Ok(stub)
    }

    /// Like [`to_stub`](Self::to_stub), reading the class from `reader`
    ///
    /// The reader is dropped before this returns, on success or failure.
    pub fn to_stub_from_reader<R: Read>(&self, reader: R) -> Result<Vec<u8>> {
        let class = read_class(reader)?;
        self.to_stub(&class)
    }
}

/// Read all of `reader`, consuming it
fn read_class<R: Read>(mut reader: R) -> std::io::Result<Vec<u8>> {
    let mut class = Vec::new();
    reader.read_to_end(&mut class)?;
    Ok(class)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ApiStubGenerator>();
    }

    #[test]
    fn test_from_config() {
        let config = StubConfig::new(vec!["com.acme".to_string(), "com.acme".to_string()], true);
        let generator = ApiStubGenerator::from_config(&config);
        assert!(generator.validates_exposed_types());
        assert_eq!(generator.policy().allowed_packages(), ["com.acme"]);
    }

    #[test]
    fn test_default_is_open_without_validation() {
        let generator = ApiStubGenerator::new(Vec::<String>::new());
        assert!(generator.policy().is_open());
        assert!(!generator.validates_exposed_types());
    }

    #[test]
    fn test_garbage_input_is_class_format_error() {
        let generator = ApiStubGenerator::new(Vec::<String>::new());
        assert!(matches!(
            generator.to_stub(b"not a class"),
            Err(crate::error::ApiGenError::ClassFormat(_))
        ));
    }
}
