//! Class fixtures for stub generation tests
//!
//! Builds small javac-shaped classes with [`ClassWriter`] so tests do not
//! depend on a JDK being installed.

#![allow(dead_code)]

use std::collections::BTreeSet;

use apigen_classfile::access::{has_flag, ACC_ABSTRACT, ACC_INTERFACE, ACC_NATIVE, ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC, ACC_SUPER};
use apigen_classfile::{
    Annotation, ClassFile, ClassWriter, FieldInfo, InnerClass, Instruction, MemberRef, MethodBody, MethodInfo, Version,
};

/// Builder for a fixture class
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    access_flags: u16,
    name: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    signature: Option<String>,
    annotations: Vec<(bool, Annotation)>,
    methods: Vec<MethodInfo>,
    fields: Vec<FieldInfo>,
    inner_classes: Vec<InnerClass>,
}

impl ClassBuilder {
    /// A `public class` extending Object
    pub fn class(name: &str) -> Self {
        Self {
            access_flags: ACC_PUBLIC | ACC_SUPER,
            name: name.to_string(),
            super_name: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            signature: None,
            annotations: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            inner_classes: Vec::new(),
        }
    }

    /// A `public interface`
    pub fn interface(name: &str) -> Self {
        Self::class(name).access(ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT)
    }

    pub fn access(mut self, access_flags: u16) -> Self {
        self.access_flags = access_flags;
        self
    }

    pub fn extends(mut self, super_name: &str) -> Self {
        self.super_name = Some(super_name.to_string());
        self
    }

    pub fn implements(mut self, interface: &str) -> Self {
        self.interfaces.push(interface.to_string());
        self
    }

    pub fn signature(mut self, signature: &str) -> Self {
        self.signature = Some(signature.to_string());
        self
    }

    pub fn annotation(mut self, visible: bool, annotation: Annotation) -> Self {
        self.annotations.push((visible, annotation));
        self
    }

    /// Add a method; concrete methods get a trivial body when built
    pub fn method(mut self, method: MethodInfo) -> Self {
        self.methods.push(method);
        self
    }

    /// Shorthand for a method without attributes
    pub fn simple_method(self, access_flags: u16, name: &str, descriptor: &str) -> Self {
        self.method(MethodInfo::new(access_flags, name, descriptor))
    }

    /// Add the default public constructor
    pub fn constructor(self) -> Self {
        self.simple_method(ACC_PUBLIC, "<init>", "()V")
    }

    /// Add a static initializer
    pub fn static_initializer(self) -> Self {
        self.simple_method(ACC_STATIC, "<clinit>", "()V")
    }

    pub fn field(mut self, field: FieldInfo) -> Self {
        self.fields.push(field);
        self
    }

    pub fn simple_field(self, access_flags: u16, name: &str, descriptor: &str) -> Self {
        self.field(FieldInfo::new(access_flags, name, descriptor))
    }

    pub fn inner_class(mut self, inner_class: InnerClass) -> Self {
        self.inner_classes.push(inner_class);
        self
    }

    /// Encode the class
    pub fn build(&self) -> Vec<u8> {
        let mut writer = ClassWriter::new(
            Version::JAVA_11,
            self.access_flags,
            &self.name,
            self.signature.as_deref(),
            self.super_name.as_deref(),
            &self.interfaces,
        )
        .unwrap();

        for (visible, annotation) in &self.annotations {
            writer.add_annotations(*visible, std::slice::from_ref(annotation));
        }
        for method in &self.methods {
            if method.is_abstract_or_native() {
                writer.add_method(method, None).unwrap();
            } else {
                let body = MethodBody::with_computed_maxs(
                    fixture_body(&self.super_name, method),
                    &method.descriptor,
                    method.is_static(),
                )
                .unwrap();
                writer.add_method(method, Some(&body)).unwrap();
            }
        }
        for field in &self.fields {
            writer.add_field(field).unwrap();
        }
        for inner_class in &self.inner_classes {
            writer.add_inner_class(inner_class);
        }
        writer.finish().unwrap()
    }
}

/// A body that does something other than throw, so stubs are distinguishable
fn fixture_body(super_name: &Option<String>, method: &MethodInfo) -> Vec<Instruction> {
    if method.name == "<init>" {
        let super_name = super_name.as_deref().unwrap_or("java/lang/Object");
        return vec![
            Instruction::Aload(0),
            Instruction::Invokespecial(MemberRef::new(super_name, "<init>", "()V")),
            Instruction::Return,
        ];
    }

    let return_type = method.descriptor.rsplit(')').next().unwrap_or("V");
    match return_type.as_bytes()[0] {
        b'V' => vec![Instruction::Return],
        b'Z' | b'B' | b'C' | b'S' | b'I' => vec![Instruction::Iconst1, Instruction::Ireturn],
        b'L' | b'[' => vec![Instruction::AconstNull, Instruction::Areturn],
        other => panic!("fixture bodies do not support return type {}", other as char),
    }
}

/// Decode a class produced by the generator or a fixture
pub fn decode(bytes: &[u8]) -> ClassFile {
    ClassFile::decode(bytes).unwrap()
}

/// (name, descriptor) of every public or protected member, methods and fields mixed
pub fn public_members(class: &ClassFile) -> BTreeSet<(String, String)> {
    let methods = class
        .methods
        .iter()
        .filter(|m| m.access_flags & (ACC_PUBLIC | ACC_PROTECTED) != 0)
        .map(|m| (m.name.clone(), m.descriptor.clone()));
    let fields = class
        .fields
        .iter()
        .filter(|f| f.access_flags & (ACC_PUBLIC | ACC_PROTECTED) != 0)
        .map(|f| (f.name.clone(), f.descriptor.clone()));
    methods.chain(fields).collect()
}

/// Names of methods in emission order
pub fn method_names(class: &ClassFile) -> Vec<String> {
    class.methods.iter().map(|m| m.name.clone()).collect()
}

/// Check if a method is native
pub fn is_native(method: &MethodInfo) -> bool {
    has_flag(method.access_flags, ACC_NATIVE)
}

/// Overwrite the bytes of the Utf8 pool entry holding `from` with `to`
///
/// The replacement must have the same length so no offsets move. Used to
/// plant byte sequences the builder cannot produce from a `&str`.
pub fn patch_utf8(bytes: &mut [u8], from: &str, to: &[u8]) {
    assert_eq!(from.len(), to.len());
    let mut entry = vec![0x01];
    entry.extend_from_slice(&(from.len() as u16).to_be_bytes());
    entry.extend_from_slice(from.as_bytes());

    let start = bytes
        .windows(entry.len())
        .position(|window| window == entry.as_slice())
        .unwrap_or_else(|| panic!("no Utf8 entry for {from:?}"));
    bytes[start + 3..start + entry.len()].copy_from_slice(to);
}
