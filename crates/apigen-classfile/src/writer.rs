//! Class file emission
//!
//! [`ClassWriter`] assembles a class from member declarations and symbolic
//! method bodies. Pool entries are interned in the order things are added,
//! so adding the same members in the same order always yields identical
//! bytes.

use thiserror::Error;

use crate::annotation::{checked_len, encode_annotations, encode_parameter_annotations, Annotation, ConstValue};
use crate::class::{attributes, FieldInfo, InnerClass, MethodInfo, Version, MAGIC};
use crate::code::MethodBody;
use crate::constants::ConstantPoolBuilder;
use crate::descriptor::DescriptorError;
use crate::encoder::ByteWriter;

/// Largest code array a method may have
pub const MAX_CODE_LENGTH: usize = 65_535;

/// Class emission errors
#[derive(Debug, Error)]
pub enum EncodeError {
    /// More than 65535 pool slots
    #[error("Constant pool overflow")]
    ConstantPoolOverflow,

    /// Modified UTF-8 encoding longer than 65535 bytes
    #[error("String constant too long: {0} bytes")]
    StringTooLong(usize),

    /// A table exceeds its length field
    #[error("Too many items for a class file table: {0}")]
    TooManyItems(usize),

    /// Code array exceeds the method size limit
    #[error("Method code too large: {0} bytes")]
    CodeTooLarge(usize),

    /// Straight-line code pops more than it pushed
    #[error("Stack underflow at instruction {0}")]
    StackUnderflow(usize),

    /// Malformed descriptor
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// Builder for a single class file
#[derive(Debug)]
pub struct ClassWriter {
    pool: ConstantPoolBuilder,
    version: Version,
    access_flags: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    signature: Option<String>,
    deprecated: bool,
    visible_annotations: Vec<Annotation>,
    invisible_annotations: Vec<Annotation>,
    inner_classes: Vec<InnerClass>,
    fields: ByteWriter,
    field_count: usize,
    methods: ByteWriter,
    method_count: usize,
}

impl ClassWriter {
    /// Start a class with the given header
    pub fn new(
        version: Version,
        access_flags: u16,
        name: &str,
        signature: Option<&str>,
        super_name: Option<&str>,
        interfaces: &[String],
    ) -> Result<Self, EncodeError> {
        let mut pool = ConstantPoolBuilder::new();
        let this_class = pool.class(name)?;
        let super_class = match super_name {
            Some(super_name) => pool.class(super_name)?,
            None => 0,
        };
        let interfaces = interfaces
            .iter()
            .map(|interface| pool.class(interface))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            pool,
            version,
            access_flags,
            this_class,
            super_class,
            interfaces,
            signature: signature.map(str::to_string),
            deprecated: false,
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            inner_classes: Vec::new(),
            fields: ByteWriter::new(),
            field_count: 0,
            methods: ByteWriter::new(),
            method_count: 0,
        })
    }

    /// Mark the class deprecated
    pub fn set_deprecated(&mut self) {
        self.deprecated = true;
    }

    /// Add class annotations to the visible or invisible table
    pub fn add_annotations(&mut self, visible: bool, annotations: &[Annotation]) {
        if visible {
            self.visible_annotations.extend_from_slice(annotations);
        } else {
            self.invisible_annotations.extend_from_slice(annotations);
        }
    }

    /// Add an InnerClasses entry
    pub fn add_inner_class(&mut self, inner_class: &InnerClass) {
        self.inner_classes.push(inner_class.clone());
    }

    /// Add a field with all of its attributes
    pub fn add_field(&mut self, field: &FieldInfo) -> Result<(), EncodeError> {
        let pool = &mut self.pool;
        let out = &mut self.fields;

        out.emit_u16(field.access_flags);
        out.emit_u16(pool.utf8(&field.name)?);
        out.emit_u16(pool.utf8(&field.descriptor)?);

        let mut attrs = AttributeTable::new();
        if let Some(value) = &field.constant_value {
            let index = match value {
                ConstValue::Byte(v)
                | ConstValue::Char(v)
                | ConstValue::Short(v)
                | ConstValue::Boolean(v)
                | ConstValue::Int(v) => pool.integer(*v)?,
                ConstValue::Long(v) => pool.long(*v)?,
                ConstValue::Float(bits) => pool.float_bits(*bits)?,
                ConstValue::Double(bits) => pool.double_bits(*bits)?,
                ConstValue::String(s) => pool.java_string(s)?,
                ConstValue::Class(s) => pool.class(s)?,
            };
            attrs.add(pool, attributes::CONSTANT_VALUE, |w, _| {
                w.emit_u16(index);
                Ok(())
            })?;
        }
        if let Some(signature) = &field.signature {
            attrs.add(pool, attributes::SIGNATURE, |w, p| {
                w.emit_u16(p.utf8(signature)?);
                Ok(())
            })?;
        }
        if field.deprecated {
            attrs.add(pool, attributes::DEPRECATED, |_, _| Ok(()))?;
        }
        attrs.add_annotations(pool, &field.visible_annotations, &field.invisible_annotations)?;
        attrs.write_to(out)?;

        self.field_count += 1;
        Ok(())
    }

    /// Add a method; `body` replaces any code carried by `method`
    pub fn add_method(&mut self, method: &MethodInfo, body: Option<&MethodBody>) -> Result<(), EncodeError> {
        let pool = &mut self.pool;
        let out = &mut self.methods;

        out.emit_u16(method.access_flags);
        out.emit_u16(pool.utf8(&method.name)?);
        out.emit_u16(pool.utf8(&method.descriptor)?);

        let mut attrs = AttributeTable::new();
        if let Some(body) = body {
            let code = body.encode_code(pool)?;
            if code.len() > MAX_CODE_LENGTH {
                return Err(EncodeError::CodeTooLarge(code.len()));
            }
            attrs.add(pool, attributes::CODE, |w, _| {
                w.emit_u16(body.max_stack);
                w.emit_u16(body.max_locals);
                w.emit_u32(code.len() as u32);
                w.emit_bytes(&code);
                // No exception handlers and no nested attributes
                w.emit_u16(0);
                w.emit_u16(0);
                Ok(())
            })?;
        }
        if !method.exceptions.is_empty() {
            attrs.add(pool, attributes::EXCEPTIONS, |w, p| {
                w.emit_u16(checked_len(method.exceptions.len())?);
                for exception in &method.exceptions {
                    w.emit_u16(p.class(exception)?);
                }
                Ok(())
            })?;
        }
        if let Some(signature) = &method.signature {
            attrs.add(pool, attributes::SIGNATURE, |w, p| {
                w.emit_u16(p.utf8(signature)?);
                Ok(())
            })?;
        }
        if method.deprecated {
            attrs.add(pool, attributes::DEPRECATED, |_, _| Ok(()))?;
        }
        attrs.add_annotations(pool, &method.visible_annotations, &method.invisible_annotations)?;
        if let Some(parameters) = &method.visible_parameter_annotations {
            attrs.add(pool, attributes::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS, |w, p| {
                encode_parameter_annotations(parameters, w, p)
            })?;
        }
        if let Some(parameters) = &method.invisible_parameter_annotations {
            attrs.add(pool, attributes::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS, |w, p| {
                encode_parameter_annotations(parameters, w, p)
            })?;
        }
        if let Some(default) = &method.annotation_default {
            attrs.add(pool, attributes::ANNOTATION_DEFAULT, |w, p| default.encode(w, p))?;
        }
        attrs.write_to(out)?;

        self.method_count += 1;
        Ok(())
    }

    /// Encode the finished class
    pub fn finish(mut self) -> Result<Vec<u8>, EncodeError> {
        let pool = &mut self.pool;

        let mut attrs = AttributeTable::new();
        if let Some(signature) = &self.signature {
            attrs.add(pool, attributes::SIGNATURE, |w, p| {
                w.emit_u16(p.utf8(signature)?);
                Ok(())
            })?;
        }
        if self.deprecated {
            attrs.add(pool, attributes::DEPRECATED, |_, _| Ok(()))?;
        }
        attrs.add_annotations(pool, &self.visible_annotations, &self.invisible_annotations)?;
        if !self.inner_classes.is_empty() {
            let inner_classes = &self.inner_classes;
            attrs.add(pool, attributes::INNER_CLASSES, |w, p| {
                w.emit_u16(checked_len(inner_classes.len())?);
                for inner in inner_classes {
                    w.emit_u16(p.class(&inner.name)?);
                    w.emit_u16(match &inner.outer_name {
                        Some(outer) => p.class(outer)?,
                        None => 0,
                    });
                    w.emit_u16(match &inner.inner_name {
                        Some(simple) => p.utf8(simple)?,
                        None => 0,
                    });
                    w.emit_u16(inner.access_flags);
                }
                Ok(())
            })?;
        }

        let mut out = ByteWriter::with_capacity(
            64 + self.fields.offset() + self.methods.offset() + attrs.body.offset(),
        );
        out.emit_u32(MAGIC);
        out.emit_u16(self.version.minor);
        out.emit_u16(self.version.major);
        pool.encode(&mut out);
        out.emit_u16(self.access_flags);
        out.emit_u16(self.this_class);
        out.emit_u16(self.super_class);
        out.emit_u16(checked_len(self.interfaces.len())?);
        for interface in &self.interfaces {
            out.emit_u16(*interface);
        }
        out.emit_u16(checked_len(self.field_count)?);
        out.emit_bytes(self.fields.buffer());
        out.emit_u16(checked_len(self.method_count)?);
        out.emit_bytes(self.methods.buffer());
        attrs.write_to(&mut out)?;

        Ok(out.into_bytes())
    }
}

/// Attributes collected for one structure, written with a count prefix
struct AttributeTable {
    count: usize,
    body: ByteWriter,
}

impl AttributeTable {
    fn new() -> Self {
        Self {
            count: 0,
            body: ByteWriter::new(),
        }
    }

    fn add<F>(&mut self, pool: &mut ConstantPoolBuilder, name: &str, write: F) -> Result<(), EncodeError>
    where
        F: FnOnce(&mut ByteWriter, &mut ConstantPoolBuilder) -> Result<(), EncodeError>,
    {
        self.body.emit_u16(pool.utf8(name)?);
        let length_offset = self.body.reserve_u32();
        write(&mut self.body, pool)?;
        let length = self.body.offset() - length_offset - 4;
        self.body.patch_u32(length_offset, length as u32);
        self.count += 1;
        Ok(())
    }

    fn add_annotations(
        &mut self,
        pool: &mut ConstantPoolBuilder,
        visible: &[Annotation],
        invisible: &[Annotation],
    ) -> Result<(), EncodeError> {
        if !visible.is_empty() {
            self.add(pool, attributes::RUNTIME_VISIBLE_ANNOTATIONS, |w, p| {
                encode_annotations(visible, w, p)
            })?;
        }
        if !invisible.is_empty() {
            self.add(pool, attributes::RUNTIME_INVISIBLE_ANNOTATIONS, |w, p| {
                encode_annotations(invisible, w, p)
            })?;
        }
        Ok(())
    }

    fn write_to(&self, out: &mut ByteWriter) -> Result<(), EncodeError> {
        out.emit_u16(checked_len(self.count)?);
        out.emit_bytes(self.body.buffer());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{ACC_ABSTRACT, ACC_FINAL, ACC_PUBLIC, ACC_STATIC, ACC_SUPER};
    use crate::annotation::{ElementValue, ElementValuePair};
    use crate::class::ClassFile;
    use crate::code::{disassemble, Instruction};

    fn writer() -> ClassWriter {
        ClassWriter::new(
            Version::JAVA_11,
            ACC_PUBLIC | ACC_SUPER,
            "com/acme/Widget",
            Some("<T:Ljava/lang/Object;>Ljava/lang/Object;"),
            Some("java/lang/Object"),
            &[],
        )
        .unwrap()
    }

    #[test]
    fn test_members_and_attributes_decode_back() {
        let mut class = writer();
        class.set_deprecated();
        class.add_annotations(true, &[Annotation::marker("Lcom/acme/Visible;")]);
        class.add_inner_class(&InnerClass {
            name: "com/acme/Widget$Part".to_string(),
            outer_name: Some("com/acme/Widget".to_string()),
            inner_name: Some("Part".to_string()),
            access_flags: ACC_PUBLIC | ACC_STATIC,
        });

        let mut field = FieldInfo::new(ACC_PUBLIC | ACC_STATIC | ACC_FINAL, "LIMIT", "J");
        field.constant_value = Some(ConstValue::Long(1 << 40));
        class.add_field(&field).unwrap();

        let mut method = MethodInfo::new(ACC_PUBLIC | ACC_ABSTRACT, "run", "(Ljava/lang/String;)V");
        method.exceptions = vec!["java/io/IOException".to_string()];
        method.invisible_parameter_annotations = Some(vec![vec![Annotation::marker("Lcom/acme/NotNull;")]]);
        method.annotation_default = Some(ElementValue::Array(Vec::new()));
        class.add_method(&method, None).unwrap();

        let decoded = ClassFile::decode(&class.finish().unwrap()).unwrap();
        assert_eq!(decoded.version, Version::JAVA_11);
        assert!(decoded.deprecated);
        assert_eq!(
            decoded.signature.as_deref(),
            Some("<T:Ljava/lang/Object;>Ljava/lang/Object;")
        );
        assert_eq!(decoded.visible_annotations, vec![Annotation::marker("Lcom/acme/Visible;")]);
        assert_eq!(decoded.inner_classes.len(), 1);
        assert_eq!(decoded.fields, vec![field]);
        assert_eq!(decoded.methods, vec![method]);
    }

    #[test]
    fn test_method_body_replaces_code() {
        let mut class = writer();
        let body = MethodBody {
            max_stack: 1,
            max_locals: 1,
            instructions: vec![Instruction::AconstNull, Instruction::Athrow],
        };
        class
            .add_method(&MethodInfo::new(ACC_PUBLIC, "get", "()Ljava/lang/Object;"), Some(&body))
            .unwrap();

        let decoded = ClassFile::decode(&class.finish().unwrap()).unwrap();
        let code = decoded.methods[0].code.as_ref().unwrap();
        assert_eq!(code.max_stack, 1);
        assert_eq!(code.max_locals, 1);
        assert_eq!(
            disassemble(&code.code, &decoded.constant_pool).unwrap(),
            body.instructions
        );
    }

    #[test]
    fn test_output_is_deterministic() {
        let build = || {
            let mut class = writer();
            let annotation = Annotation {
                type_descriptor: "Lcom/acme/Tag;".to_string(),
                elements: vec![ElementValuePair {
                    name: "value".to_string(),
                    value: ElementValue::Const(ConstValue::String("x".into())),
                }],
            };
            let mut field = FieldInfo::new(ACC_PUBLIC, "name", "Ljava/lang/String;");
            field.visible_annotations = vec![annotation];
            class.add_field(&field).unwrap();
            class.finish().unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_class_without_superclass() {
        let class = ClassWriter::new(Version::JAVA_8, ACC_PUBLIC, "java/lang/Object", None, None, &[]).unwrap();
        let decoded = ClassFile::decode(&class.finish().unwrap()).unwrap();
        assert_eq!(decoded.super_name, None);
    }
}
