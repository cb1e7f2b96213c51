//! Public-API extraction and exposed-type validation
//!
//! [`Extractor::extract`] walks a decoded class once, keeps the members that
//! belong to the API, checks every type they expose against the policy and
//! returns the collections in their final emission order.

use apigen_classfile::access::{has_flag, Visibility, ACC_SUPER};
use apigen_classfile::descriptor::{internal_to_binary, java_type_name, pretty_field, pretty_method, referenced_classes};
use apigen_classfile::{Annotation, ClassFile, ConstValue, FieldInfo, MethodInfo};
use tracing::trace;

use crate::error::{ApiGenError, Result};
use crate::policy::AllowedPackagePolicy;
use crate::signature::{sort_by_order_key, AnnotationSig, AnnotationValue, ClassSig, FieldSig, InnerClassSig, MethodSig};

const STATIC_INITIALIZER: &str = "<clinit>";
const CONSTRUCTOR: &str = "<init>";

/// The validated, ordered API projection of one class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedClass {
    /// Header and class-level attributes
    pub class: ClassSig,
    /// Methods sorted by (name, descriptor)
    pub methods: Vec<MethodSig>,
    /// Fields sorted by (name, descriptor)
    pub fields: Vec<FieldSig>,
    /// Inner class records sorted by name
    pub inner_classes: Vec<InnerClassSig>,
}

/// Per-class extraction state
#[derive(Debug)]
pub struct Extractor<'a> {
    policy: &'a AllowedPackagePolicy,
    validate_exposed_types: bool,
}

/// Where a supertype offender was found, for single-offender messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SupertypeOrigin {
    Superclass,
    Signature,
    Interface,
}

impl<'a> Extractor<'a> {
    /// Create an extractor for one class
    pub fn new(policy: &'a AllowedPackagePolicy, validate_exposed_types: bool) -> Self {
        Self {
            policy,
            validate_exposed_types,
        }
    }

    /// Extract the API of `class`, failing on the first member that exposes
    /// a disallowed type
    pub fn extract(&self, class: &ClassFile) -> Result<ExtractedClass> {
        let class_name = internal_to_binary(&class.name);
        self.validate_supertypes(class, &class_name)?;

        let mut annotations = AnnotationSig::from_annotations(&class.visible_annotations, true);
        annotations.extend(AnnotationSig::from_annotations(&class.invisible_annotations, false));
        sort_by_order_key(&mut annotations);
        for annotation in &annotations {
            self.check_annotation(&class_name, annotation)?;
        }

        let inner_constructors = has_flag(class.access_flags, ACC_SUPER);
        let mut methods = Vec::new();
        for method in &class.methods {
            if method.name == STATIC_INITIALIZER {
                trace!(class = %class_name, "discarding static initializer");
                continue;
            }
            let constructor_rule = inner_constructors && method.name == CONSTRUCTOR;
            if !self.policy.is_api_visible(method.access_flags) && !constructor_rule {
                trace!(class = %class_name, method = %method.name, descriptor = %method.descriptor, "skipping non-API method");
                continue;
            }
            methods.push(self.extract_method(method)?);
        }

        let mut fields = Vec::new();
        for field in &class.fields {
            if !self.policy.is_api_visible(field.access_flags) {
                trace!(class = %class_name, field = %field.name, "skipping non-API field");
                continue;
            }
            fields.push(self.extract_field(field)?);
        }

        let mut inner_classes = Vec::new();
        for inner in &class.inner_classes {
            if !self.policy.is_open() && Visibility::of(inner.access_flags) == Visibility::PackagePrivate {
                trace!(class = %class_name, inner = %inner.name, "skipping package-private inner class record");
                continue;
            }
            inner_classes.push(InnerClassSig {
                name: inner.name.clone(),
                outer_name: inner.outer_name.clone(),
                inner_name: inner.inner_name.clone(),
                access_flags: inner.access_flags,
            });
        }

        sort_by_order_key(&mut methods);
        sort_by_order_key(&mut fields);
        sort_by_order_key(&mut inner_classes);

        Ok(ExtractedClass {
            class: ClassSig {
                version: class.version,
                access_flags: class.access_flags,
                name: class.name.clone(),
                signature: class.signature.clone(),
                super_name: class.super_name.clone(),
                interfaces: class.interfaces.clone(),
                annotations,
                deprecated: class.deprecated,
            },
            methods,
            fields,
            inner_classes,
        })
    }

    /// Whether exposed types are checked at all
    fn checks_types(&self) -> bool {
        self.validate_exposed_types && !self.policy.is_open()
    }

    /// Disallowed classes referenced by a descriptor or signature, as binary
    /// names in order of first appearance
    fn invalid_referenced_types(&self, signature: &str) -> Result<Vec<String>> {
        if !self.checks_types() {
            return Ok(Vec::new());
        }
        Ok(referenced_classes(signature)?
            .iter()
            .map(|internal| internal_to_binary(internal))
            .filter(|name| !self.policy.allows_type(name))
            .collect())
    }

    fn validate_supertypes(&self, class: &ClassFile, class_name: &str) -> Result<()> {
        if !self.checks_types() {
            return Ok(());
        }

        let mut offenders: Vec<(String, SupertypeOrigin)> = Vec::new();
        let mut record = |name: String, origin: SupertypeOrigin| {
            if !offenders.iter().any(|(existing, _)| *existing == name) {
                offenders.push((name, origin));
            }
        };

        if let Some(super_name) = &class.super_name {
            let super_name = internal_to_binary(super_name);
            if !self.policy.allows_type(&super_name) {
                record(super_name, SupertypeOrigin::Superclass);
            }
        }
        if let Some(signature) = &class.signature {
            for name in self.invalid_referenced_types(signature)? {
                record(name, SupertypeOrigin::Signature);
            }
        }
        for interface in &class.interfaces {
            let interface = internal_to_binary(interface);
            if !self.policy.allows_type(&interface) {
                record(interface, SupertypeOrigin::Interface);
            }
        }

        match offenders.as_slice() {
            [] => Ok(()),
            [(name, SupertypeOrigin::Superclass)] => Err(ApiGenError::InvalidPublicApi(format!(
                "'{class_name}' extends '{name}' and its package is not one of the allowed packages."
            ))),
            [(name, SupertypeOrigin::Interface)] => Err(ApiGenError::InvalidPublicApi(format!(
                "'{class_name}' declares interface '{name}' and its package is not one of the allowed packages."
            ))),
            [(name, SupertypeOrigin::Signature)] => Err(ApiGenError::InvalidPublicApi(format!(
                "'{class_name}' references disallowed API type '{name}' in superclass or interfaces."
            ))),
            _ => {
                let names: Vec<String> = offenders.iter().map(|(name, _)| name.clone()).collect();
                Err(ApiGenError::InvalidPublicApi(list_offenders(
                    &format!("the supertypes of '{class_name}'"),
                    &names,
                )))
            }
        }
    }

    fn extract_method(&self, method: &MethodInfo) -> Result<MethodSig> {
        let owner = pretty_method(method.access_flags, &method.name, &method.descriptor)?;

        let offenders = self.invalid_referenced_types(method.signature.as_deref().unwrap_or(&method.descriptor))?;
        match offenders.as_slice() {
            [] => {}
            [single] => {
                return Err(ApiGenError::InvalidPublicApi(format!(
                    "In {owner}, type {single} is exposed in the public API but its package is not one of the allowed packages."
                )))
            }
            _ => return Err(ApiGenError::InvalidPublicApi(list_offenders(&owner, &offenders))),
        }

        let mut annotations = AnnotationSig::from_annotations(&method.visible_annotations, true);
        annotations.extend(AnnotationSig::from_annotations(&method.invisible_annotations, false));
        sort_by_order_key(&mut annotations);
        for annotation in &annotations {
            self.check_annotation(&owner, annotation)?;
        }

        let visible_parameter_annotations = self.parameter_annotations(&owner, &method.visible_parameter_annotations, true)?;
        let invisible_parameter_annotations =
            self.parameter_annotations(&owner, &method.invisible_parameter_annotations, false)?;

        let annotation_default = match &method.annotation_default {
            Some(element) => {
                let value = AnnotationValue::from_element("", element, true);
                self.check_annotation_value(&owner, &value)?;
                Some(value)
            }
            None => None,
        };

        Ok(MethodSig {
            access_flags: method.access_flags,
            name: method.name.clone(),
            descriptor: method.descriptor.clone(),
            signature: method.signature.clone(),
            exceptions: method.exceptions.clone(),
            annotations,
            visible_parameter_annotations,
            invisible_parameter_annotations,
            annotation_default,
            deprecated: method.deprecated,
        })
    }

    fn parameter_annotations(
        &self,
        owner: &str,
        parameters: &Option<Vec<Vec<Annotation>>>,
        visible: bool,
    ) -> Result<Option<Vec<Vec<AnnotationSig>>>> {
        let Some(parameters) = parameters else {
            return Ok(None);
        };
        let mut result = Vec::with_capacity(parameters.len());
        for annotations in parameters {
            let sigs = AnnotationSig::from_annotations(annotations, visible);
            for annotation in &sigs {
                self.check_annotation(owner, annotation)?;
            }
            result.push(sigs);
        }
        Ok(Some(result))
    }

    fn extract_field(&self, field: &FieldInfo) -> Result<FieldSig> {
        let owner = pretty_field(field.access_flags, &field.name, &field.descriptor)?;

        let offenders = self.invalid_referenced_types(field.signature.as_deref().unwrap_or(&field.descriptor))?;
        match offenders.as_slice() {
            [] => {}
            [single] => {
                return Err(ApiGenError::InvalidPublicApi(format!(
                    "Field '{owner}' references disallowed API type '{single}'"
                )))
            }
            _ => return Err(ApiGenError::InvalidPublicApi(list_offenders(&owner, &offenders))),
        }

        let mut annotations = AnnotationSig::from_annotations(&field.visible_annotations, true);
        annotations.extend(AnnotationSig::from_annotations(&field.invisible_annotations, false));
        sort_by_order_key(&mut annotations);
        for annotation in &annotations {
            self.check_annotation(&owner, annotation)?;
        }

        Ok(FieldSig {
            access_flags: field.access_flags,
            name: field.name.clone(),
            descriptor: field.descriptor.clone(),
            signature: field.signature.clone(),
            annotations,
            deprecated: field.deprecated,
        })
    }

    /// Check an annotation's type, then its values depth-first
    fn check_annotation(&self, owner: &str, annotation: &AnnotationSig) -> Result<()> {
        if !self.checks_types() {
            return Ok(());
        }
        let annotation_type = java_type_name(&annotation.descriptor)?;
        if !self.policy.allows_type(&annotation_type) {
            return Err(ApiGenError::InvalidPublicApi(format!(
                "'{owner}' is annotated with '{annotation_type}' effectively exposing it in the public API but its package is not one of the allowed packages."
            )));
        }
        for value in &annotation.values {
            self.check_annotation_value(owner, value)?;
        }
        Ok(())
    }

    fn check_annotation_value(&self, owner: &str, value: &AnnotationValue) -> Result<()> {
        if !self.checks_types() {
            return Ok(());
        }
        match value {
            AnnotationValue::Scalar {
                value: ConstValue::Class(descriptor),
                ..
            } => {
                // Primitive and void literals name no class
                let element = descriptor.trim_start_matches('[');
                if !element.starts_with('L') {
                    return Ok(());
                }
                let class_type = java_type_name(element)?;
                if self.policy.allows_type(&class_type) {
                    Ok(())
                } else {
                    Err(ApiGenError::InvalidPublicApi(format!(
                        "'{owner}' references class '{class_type}' in an annotation value but its package is not one of the allowed packages."
                    )))
                }
            }
            AnnotationValue::Scalar { .. } => Ok(()),
            AnnotationValue::EnumConstant { descriptor, .. } => {
                let enum_type = java_type_name(descriptor)?;
                if self.policy.allows_type(&enum_type) {
                    Ok(())
                } else {
                    Err(ApiGenError::InvalidPublicApi(format!(
                        "'{owner}' uses enum '{enum_type}' in an annotation value but its package is not one of the allowed packages."
                    )))
                }
            }
            AnnotationValue::Array { values, .. } => {
                for element in values {
                    self.check_annotation_value(owner, element)?;
                }
                Ok(())
            }
            AnnotationValue::Nested { annotation, .. } => self.check_annotation(owner, annotation),
        }
    }
}

/// Multi-offender message: one `   - <type>` line per type
fn list_offenders(subject: &str, offenders: &[String]) -> String {
    let mut message =
        format!("The following types are referenced in {subject} but their package is not one of the allowed packages:\n");
    for offender in offenders {
        message.push_str("   - ");
        message.push_str(offender);
        message.push('\n');
    }
    message
}
