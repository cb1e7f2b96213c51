//! The public-API model of one class
//!
//! Every collected kind implements [`OrderKey`]; sorting by it is what makes
//! stub output independent of member order in the input.

use apigen_classfile::{Annotation, ConstValue, ElementValue, ElementValuePair, Version};

/// Total order used to re-emit collected items
pub trait OrderKey {
    /// The key type, borrowing from the item
    type Key<'a>: Ord
    where
        Self: 'a;

    /// The item's sort key
    fn order_key(&self) -> Self::Key<'_>;
}

/// Stable-sort items by their [`OrderKey`]
pub fn sort_by_order_key<T: OrderKey>(items: &mut [T]) {
    items.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
}

/// Class header and class-level attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassSig {
    /// Class file version
    pub version: Version,
    /// Access flags
    pub access_flags: u16,
    /// Internal name
    pub name: String,
    /// Generic signature
    pub signature: Option<String>,
    /// Internal name of the superclass
    pub super_name: Option<String>,
    /// Internal names of the direct superinterfaces, in declared order
    pub interfaces: Vec<String>,
    /// Class annotations, sorted
    pub annotations: Vec<AnnotationSig>,
    /// Deprecated marker
    pub deprecated: bool,
}

/// A method kept in the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    /// Access flags
    pub access_flags: u16,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// Generic signature
    pub signature: Option<String>,
    /// Declared checked exceptions (internal names)
    pub exceptions: Vec<String>,
    /// Method annotations, sorted
    pub annotations: Vec<AnnotationSig>,
    /// Visible parameter annotations, one sorted list per parameter
    pub visible_parameter_annotations: Option<Vec<Vec<AnnotationSig>>>,
    /// Invisible parameter annotations, one sorted list per parameter
    pub invisible_parameter_annotations: Option<Vec<Vec<AnnotationSig>>>,
    /// Default value of an annotation interface element
    pub annotation_default: Option<AnnotationValue>,
    /// Deprecated marker
    pub deprecated: bool,
}

/// A field kept in the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSig {
    /// Access flags
    pub access_flags: u16,
    /// Field name
    pub name: String,
    /// Field descriptor
    pub descriptor: String,
    /// Generic signature
    pub signature: Option<String>,
    /// Field annotations, sorted
    pub annotations: Vec<AnnotationSig>,
    /// Deprecated marker
    pub deprecated: bool,
}

/// An InnerClasses record kept in the API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassSig {
    /// Internal name of the nested class
    pub name: String,
    /// Internal name of the enclosing class
    pub outer_name: Option<String>,
    /// Simple name
    pub inner_name: Option<String>,
    /// Access flags
    pub access_flags: u16,
}

/// An annotation with its value tree sorted by element name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationSig {
    /// Field descriptor of the annotation type
    pub descriptor: String,
    /// Runtime-visible retention
    pub visible: bool,
    /// Element values, sorted by name
    pub values: Vec<AnnotationValue>,
}

/// An annotation element value
///
/// Array elements and annotation defaults are unnamed; their `name` is empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationValue {
    /// Primitive, string or class literal
    Scalar {
        /// Element name
        name: String,
        /// The constant
        value: ConstValue,
    },
    /// Enum constant
    EnumConstant {
        /// Element name
        name: String,
        /// Field descriptor of the enum type
        descriptor: String,
        /// Constant name
        constant: String,
    },
    /// Array, elements in declared order
    Array {
        /// Element name
        name: String,
        /// Elements
        values: Vec<AnnotationValue>,
    },
    /// Nested annotation
    Nested {
        /// Element name
        name: String,
        /// The annotation, itself sorted
        annotation: AnnotationSig,
    },
}

impl AnnotationSig {
    /// Build a sorted annotation record from a decoded annotation
    pub fn from_annotation(annotation: &Annotation, visible: bool) -> Self {
        let mut values: Vec<AnnotationValue> = annotation
            .elements
            .iter()
            .map(|pair| AnnotationValue::from_element(&pair.name, &pair.value, visible))
            .collect();
        sort_by_order_key(&mut values);
        Self {
            descriptor: annotation.type_descriptor.clone(),
            visible,
            values,
        }
    }

    /// Build sorted records for one annotation table
    pub fn from_annotations(annotations: &[Annotation], visible: bool) -> Vec<Self> {
        let mut sigs: Vec<Self> = annotations
            .iter()
            .map(|a| Self::from_annotation(a, visible))
            .collect();
        sort_by_order_key(&mut sigs);
        sigs
    }

    /// Convert back to an encodable annotation, keeping the sorted order
    pub fn to_annotation(&self) -> Annotation {
        Annotation {
            type_descriptor: self.descriptor.clone(),
            elements: self
                .values
                .iter()
                .map(|value| ElementValuePair {
                    name: value.name().to_string(),
                    value: value.to_element(),
                })
                .collect(),
        }
    }
}

impl AnnotationValue {
    /// Build a value from a decoded element, sorting nested annotations
    pub fn from_element(name: &str, element: &ElementValue, visible: bool) -> Self {
        let name = name.to_string();
        match element {
            ElementValue::Const(value) => AnnotationValue::Scalar {
                name,
                value: value.clone(),
            },
            ElementValue::Enum {
                type_descriptor,
                const_name,
            } => AnnotationValue::EnumConstant {
                name,
                descriptor: type_descriptor.clone(),
                constant: const_name.clone(),
            },
            ElementValue::Array(elements) => AnnotationValue::Array {
                name,
                values: elements
                    .iter()
                    .map(|e| AnnotationValue::from_element("", e, visible))
                    .collect(),
            },
            ElementValue::Annotation(annotation) => AnnotationValue::Nested {
                name,
                annotation: AnnotationSig::from_annotation(annotation, visible),
            },
        }
    }

    /// The element name
    pub fn name(&self) -> &str {
        match self {
            AnnotationValue::Scalar { name, .. }
            | AnnotationValue::EnumConstant { name, .. }
            | AnnotationValue::Array { name, .. }
            | AnnotationValue::Nested { name, .. } => name,
        }
    }

    /// Convert back to an encodable element value
    pub fn to_element(&self) -> ElementValue {
        match self {
            AnnotationValue::Scalar { value, .. } => ElementValue::Const(value.clone()),
            AnnotationValue::EnumConstant {
                descriptor, constant, ..
            } => ElementValue::Enum {
                type_descriptor: descriptor.clone(),
                const_name: constant.clone(),
            },
            AnnotationValue::Array { values, .. } => {
                ElementValue::Array(values.iter().map(AnnotationValue::to_element).collect())
            }
            AnnotationValue::Nested { annotation, .. } => ElementValue::Annotation(annotation.to_annotation()),
        }
    }
}

impl OrderKey for MethodSig {
    type Key<'a> = (&'a str, &'a str);

    fn order_key(&self) -> Self::Key<'_> {
        (&self.name, &self.descriptor)
    }
}

impl OrderKey for FieldSig {
    type Key<'a> = (&'a str, &'a str);

    fn order_key(&self) -> Self::Key<'_> {
        (&self.name, &self.descriptor)
    }
}

impl OrderKey for InnerClassSig {
    type Key<'a> = &'a str;

    fn order_key(&self) -> Self::Key<'_> {
        &self.name
    }
}

impl OrderKey for AnnotationSig {
    type Key<'a> = (bool, &'a str);

    fn order_key(&self) -> Self::Key<'_> {
        (self.visible, &self.descriptor)
    }
}

impl OrderKey for AnnotationValue {
    type Key<'a> = &'a str;

    fn order_key(&self) -> Self::Key<'_> {
        self.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(name: &str, value: ElementValue) -> ElementValuePair {
        ElementValuePair {
            name: name.to_string(),
            value,
        }
    }

    fn string(s: &str) -> ElementValue {
        ElementValue::Const(ConstValue::String(s.into()))
    }

    #[test]
    fn test_values_sorted_by_name() {
        let annotation = Annotation {
            type_descriptor: "Lcom/acme/Tag;".to_string(),
            elements: vec![pair("zeta", string("z")), pair("alpha", string("a")), pair("mid", string("m"))],
        };
        let sig = AnnotationSig::from_annotation(&annotation, true);
        let names: Vec<&str> = sig.values.iter().map(AnnotationValue::name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_nested_annotations_sorted_recursively() {
        let inner = Annotation {
            type_descriptor: "Lcom/acme/Inner;".to_string(),
            elements: vec![pair("b", string("2")), pair("a", string("1"))],
        };
        let outer = Annotation {
            type_descriptor: "Lcom/acme/Outer;".to_string(),
            elements: vec![pair("nested", ElementValue::Annotation(inner.clone()))],
        };

        let sig = AnnotationSig::from_annotation(&outer, false);
        match &sig.values[0] {
            AnnotationValue::Nested { annotation, .. } => {
                assert_eq!(annotation.values[0].name(), "a");
                assert_eq!(annotation.values[1].name(), "b");
                assert!(!annotation.visible);
            }
            other => panic!("expected nested annotation, got {other:?}"),
        }
    }

    #[test]
    fn test_array_elements_keep_order_but_nested_content_sorted() {
        let element = Annotation {
            type_descriptor: "Lcom/acme/Entry;".to_string(),
            elements: vec![pair("y", string("y")), pair("x", string("x"))],
        };
        let annotation = Annotation {
            type_descriptor: "Lcom/acme/List;".to_string(),
            elements: vec![pair(
                "value",
                ElementValue::Array(vec![
                    string("second"),
                    string("first"),
                    ElementValue::Annotation(element),
                ]),
            )],
        };

        let sig = AnnotationSig::from_annotation(&annotation, true);
        let converted = sig.to_annotation();
        match &converted.elements[0].value {
            ElementValue::Array(values) => {
                assert_eq!(values[0], string("second"));
                assert_eq!(values[1], string("first"));
                match &values[2] {
                    ElementValue::Annotation(nested) => {
                        assert_eq!(nested.elements[0].name, "x");
                        assert_eq!(nested.elements[1].name, "y");
                    }
                    other => panic!("expected nested annotation, got {other:?}"),
                }
            }
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_annotation_tables_sorted_by_descriptor() {
        let sigs = AnnotationSig::from_annotations(
            &[Annotation::marker("Lcom/acme/B;"), Annotation::marker("Lcom/acme/A;")],
            true,
        );
        assert_eq!(sigs[0].descriptor, "Lcom/acme/A;");
        assert_eq!(sigs[1].descriptor, "Lcom/acme/B;");
    }

    #[test]
    fn test_member_order_key() {
        let method = |name: &str, descriptor: &str| MethodSig {
            access_flags: 0,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            exceptions: Vec::new(),
            annotations: Vec::new(),
            visible_parameter_annotations: None,
            invisible_parameter_annotations: None,
            annotation_default: None,
            deprecated: false,
        };
        let mut methods = vec![method("run", "(I)V"), method("close", "()V"), method("run", "()V")];
        sort_by_order_key(&mut methods);
        let keys: Vec<(&str, &str)> = methods.iter().map(|m| m.order_key()).collect();
        assert_eq!(keys, vec![("close", "()V"), ("run", "()V"), ("run", "(I)V")]);
    }
}
