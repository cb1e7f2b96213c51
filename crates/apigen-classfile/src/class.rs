//! Class file decoding (JVMS 4)
//!
//! Decoding resolves every name, descriptor and signature out of the
//! constant pool so callers work with plain strings. The pool itself is kept
//! on [`ClassFile`] for code disassembly.

use thiserror::Error;

use crate::access::{has_flag, ACC_ABSTRACT, ACC_INTERFACE, ACC_NATIVE, ACC_STATIC};
use crate::annotation::{decode_annotations, decode_parameter_annotations, Annotation, ConstValue, ElementValue};
use crate::constants::{Constant, ConstantPool};
use crate::descriptor::DescriptorError;
use crate::encoder::{ByteReader, DecodeError};

/// Class file magic number
pub const MAGIC: u32 = 0xCAFE_BABE;

/// Oldest supported major version (JDK 1.1)
pub const MIN_MAJOR_VERSION: u16 = 45;

/// Newest supported major version (Java 25)
pub const MAX_MAJOR_VERSION: u16 = 69;

/// Attribute names this crate reads and writes
pub mod attributes {
    /// Method bytecode
    pub const CODE: &str = "Code";
    /// Static field initial value
    pub const CONSTANT_VALUE: &str = "ConstantValue";
    /// Declared checked exceptions
    pub const EXCEPTIONS: &str = "Exceptions";
    /// Generic signature
    pub const SIGNATURE: &str = "Signature";
    /// `@Deprecated` marker
    pub const DEPRECATED: &str = "Deprecated";
    /// Nested class table
    pub const INNER_CLASSES: &str = "InnerClasses";
    /// Retained, runtime visible annotations
    pub const RUNTIME_VISIBLE_ANNOTATIONS: &str = "RuntimeVisibleAnnotations";
    /// Retained, runtime invisible annotations
    pub const RUNTIME_INVISIBLE_ANNOTATIONS: &str = "RuntimeInvisibleAnnotations";
    /// Runtime visible parameter annotations
    pub const RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeVisibleParameterAnnotations";
    /// Runtime invisible parameter annotations
    pub const RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS: &str = "RuntimeInvisibleParameterAnnotations";
    /// Default value of an annotation interface element
    pub const ANNOTATION_DEFAULT: &str = "AnnotationDefault";
}

/// Malformed or unsupported class data
#[derive(Debug, Error)]
pub enum ClassFormatError {
    /// Truncated data or bad string encoding
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Malformed descriptor or signature
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    /// Not a class file
    #[error("Invalid magic number: expected 0xCAFEBABE, got {0:#010x}")]
    InvalidMagic(u32),

    /// Version outside the supported range
    #[error("Unsupported class file version {major}.{minor}")]
    UnsupportedVersion {
        /// Major version
        major: u16,
        /// Minor version
        minor: u16,
    },

    /// Unknown constant pool tag
    #[error("Invalid constant pool tag {tag} at index {index}")]
    InvalidConstantTag {
        /// Tag byte
        tag: u8,
        /// Pool index being decoded
        index: u16,
    },

    /// Pool index out of range or pointing at an unusable slot
    #[error("Invalid constant pool index {0}")]
    InvalidConstantIndex(u16),

    /// Pool entry of the wrong kind
    #[error("Constant pool entry {index} is {found}, expected {expected}")]
    UnexpectedConstant {
        /// Pool index
        index: u16,
        /// Expected entry kind
        expected: &'static str,
        /// Actual entry kind
        found: &'static str,
    },

    /// Unknown annotation element tag
    #[error("Invalid annotation element tag {0:#04x}")]
    InvalidElementTag(u8),

    /// Attribute body inconsistent with its declared length
    #[error("Malformed {name} attribute: {reason}")]
    InvalidAttribute {
        /// Attribute name
        name: String,
        /// What is wrong
        reason: String,
    },

    /// Opcode the disassembler does not handle
    #[error("Unsupported opcode {opcode:#04x} at offset {offset}")]
    UnsupportedOpcode {
        /// Opcode byte
        opcode: u8,
        /// Offset within the code array
        offset: usize,
    },

    /// Utf8 entry used as a name, descriptor or signature is not valid Unicode
    #[error("Utf8 constant #{0} contains an unpaired surrogate")]
    UnpairedSurrogate(u16),

    /// Data after the last class attribute
    #[error("{0} trailing bytes after class data")]
    TrailingBytes(usize),
}

/// Class file version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major version
    pub major: u16,
    /// Minor version
    pub minor: u16,
}

impl Version {
    /// Java 8 (52.0)
    pub const JAVA_8: Version = Version { major: 52, minor: 0 };
    /// Java 11 (55.0)
    pub const JAVA_11: Version = Version { major: 55, minor: 0 };
    /// Java 17 (61.0)
    pub const JAVA_17: Version = Version { major: 61, minor: 0 };
}

/// The fixed header of a class file: everything before the field table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    /// Class file version
    pub version: Version,
    /// Class access flags
    pub access_flags: u16,
    /// Internal name of the class
    pub name: String,
    /// Internal name of the superclass, `None` only for `java/lang/Object`
    pub super_name: Option<String>,
    /// Internal names of direct superinterfaces
    pub interfaces: Vec<String>,
}

impl ClassHeader {
    /// Decode only the header of a class file
    ///
    /// Cheaper than [`ClassFile::decode`] when only the name and access flags
    /// are needed.
    pub fn decode(data: &[u8]) -> Result<Self, ClassFormatError> {
        let mut reader = ByteReader::new(data);
        let (header, _) = decode_header(&mut reader)?;
        Ok(header)
    }

    /// Check if the class is an interface (including annotation interfaces)
    pub fn is_interface(&self) -> bool {
        has_flag(self.access_flags, ACC_INTERFACE)
    }
}

fn decode_header(reader: &mut ByteReader<'_>) -> Result<(ClassHeader, ConstantPool), ClassFormatError> {
    let magic = reader.read_u32()?;
    if magic != MAGIC {
        return Err(ClassFormatError::InvalidMagic(magic));
    }

    let minor = reader.read_u16()?;
    let major = reader.read_u16()?;
    if !(MIN_MAJOR_VERSION..=MAX_MAJOR_VERSION).contains(&major) {
        return Err(ClassFormatError::UnsupportedVersion { major, minor });
    }

    let pool = ConstantPool::decode(reader)?;

    let access_flags = reader.read_u16()?;
    let name = pool.class_name(reader.read_u16()?)?.to_string();
    let super_name = pool.optional_class_name(reader.read_u16()?)?.map(str::to_string);

    let interface_count = reader.read_u16()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(pool.class_name(reader.read_u16()?)?.to_string());
    }

    let header = ClassHeader {
        version: Version { major, minor },
        access_flags,
        name,
        super_name,
        interfaces,
    };
    Ok((header, pool))
}

/// A raw Code attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
    /// Maximum operand stack depth
    pub max_stack: u16,
    /// Number of local variable slots
    pub max_locals: u16,
    /// Bytecode
    pub code: Vec<u8>,
}

/// A field declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Access flags
    pub access_flags: u16,
    /// Field name
    pub name: String,
    /// Field descriptor
    pub descriptor: String,
    /// Generic signature
    pub signature: Option<String>,
    /// ConstantValue of a static constant
    pub constant_value: Option<ConstValue>,
    /// Has a Deprecated attribute
    pub deprecated: bool,
    /// RuntimeVisibleAnnotations
    pub visible_annotations: Vec<Annotation>,
    /// RuntimeInvisibleAnnotations
    pub invisible_annotations: Vec<Annotation>,
}

impl FieldInfo {
    /// Create a field without attributes
    pub fn new(access_flags: u16, name: &str, descriptor: &str) -> Self {
        Self {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            constant_value: None,
            deprecated: false,
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
        }
    }

    /// Check if the field is static
    pub fn is_static(&self) -> bool {
        has_flag(self.access_flags, ACC_STATIC)
    }
}

/// A method declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Access flags
    pub access_flags: u16,
    /// Method name
    pub name: String,
    /// Method descriptor
    pub descriptor: String,
    /// Generic signature
    pub signature: Option<String>,
    /// Internal names from the Exceptions attribute
    pub exceptions: Vec<String>,
    /// Has a Deprecated attribute
    pub deprecated: bool,
    /// RuntimeVisibleAnnotations
    pub visible_annotations: Vec<Annotation>,
    /// RuntimeInvisibleAnnotations
    pub invisible_annotations: Vec<Annotation>,
    /// RuntimeVisibleParameterAnnotations, one list per parameter
    pub visible_parameter_annotations: Option<Vec<Vec<Annotation>>>,
    /// RuntimeInvisibleParameterAnnotations, one list per parameter
    pub invisible_parameter_annotations: Option<Vec<Vec<Annotation>>>,
    /// AnnotationDefault of an annotation interface element
    pub annotation_default: Option<ElementValue>,
    /// Code attribute
    pub code: Option<CodeAttribute>,
}

impl MethodInfo {
    /// Create a method without attributes
    pub fn new(access_flags: u16, name: &str, descriptor: &str) -> Self {
        Self {
            access_flags,
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            signature: None,
            exceptions: Vec::new(),
            deprecated: false,
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            visible_parameter_annotations: None,
            invisible_parameter_annotations: None,
            annotation_default: None,
            code: None,
        }
    }

    /// Check if the method is static
    pub fn is_static(&self) -> bool {
        has_flag(self.access_flags, ACC_STATIC)
    }

    /// Check if the method must not carry code
    pub fn is_abstract_or_native(&self) -> bool {
        self.access_flags & (ACC_ABSTRACT | ACC_NATIVE) != 0
    }
}

/// An InnerClasses table entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InnerClass {
    /// Internal name of the nested class
    pub name: String,
    /// Internal name of the enclosing class, absent for local and anonymous classes
    pub outer_name: Option<String>,
    /// Simple name, absent for anonymous classes
    pub inner_name: Option<String>,
    /// Access flags as declared in source
    pub access_flags: u16,
}

/// A fully decoded class file
#[derive(Debug, Clone)]
pub struct ClassFile {
    /// Class file version
    pub version: Version,
    /// Class access flags
    pub access_flags: u16,
    /// Internal name of the class
    pub name: String,
    /// Internal name of the superclass
    pub super_name: Option<String>,
    /// Internal names of direct superinterfaces
    pub interfaces: Vec<String>,
    /// Generic class signature
    pub signature: Option<String>,
    /// Has a Deprecated attribute
    pub deprecated: bool,
    /// Fields in declaration order
    pub fields: Vec<FieldInfo>,
    /// Methods in declaration order
    pub methods: Vec<MethodInfo>,
    /// InnerClasses table
    pub inner_classes: Vec<InnerClass>,
    /// RuntimeVisibleAnnotations
    pub visible_annotations: Vec<Annotation>,
    /// RuntimeInvisibleAnnotations
    pub invisible_annotations: Vec<Annotation>,
    /// Constant pool the class was decoded from
    pub constant_pool: ConstantPool,
}

impl ClassFile {
    /// Decode a complete class file
    pub fn decode(data: &[u8]) -> Result<Self, ClassFormatError> {
        let mut reader = ByteReader::new(data);
        let (header, pool) = decode_header(&mut reader)?;

        let field_count = reader.read_u16()?;
        let mut fields = Vec::with_capacity(field_count as usize);
        for _ in 0..field_count {
            fields.push(decode_field(&mut reader, &pool)?);
        }

        let method_count = reader.read_u16()?;
        let mut methods = Vec::with_capacity(method_count as usize);
        for _ in 0..method_count {
            methods.push(decode_method(&mut reader, &pool)?);
        }

        let mut class = ClassFile {
            version: header.version,
            access_flags: header.access_flags,
            name: header.name,
            super_name: header.super_name,
            interfaces: header.interfaces,
            signature: None,
            deprecated: false,
            fields,
            methods,
            inner_classes: Vec::new(),
            visible_annotations: Vec::new(),
            invisible_annotations: Vec::new(),
            constant_pool: ConstantPool::default(),
        };

        for_each_attribute(&mut reader, &pool, |name, body| {
            match name {
                attributes::SIGNATURE => class.signature = Some(pool.utf8(body.read_u16()?)?.to_string()),
                attributes::DEPRECATED => class.deprecated = true,
                attributes::RUNTIME_VISIBLE_ANNOTATIONS => class.visible_annotations = decode_annotations(body, &pool)?,
                attributes::RUNTIME_INVISIBLE_ANNOTATIONS => {
                    class.invisible_annotations = decode_annotations(body, &pool)?
                }
                attributes::INNER_CLASSES => class.inner_classes = decode_inner_classes(body, &pool)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;

        if reader.has_more() {
            return Err(ClassFormatError::TrailingBytes(reader.remaining()));
        }

        class.constant_pool = pool;
        Ok(class)
    }

    /// Check if the class is an interface (including annotation interfaces)
    pub fn is_interface(&self) -> bool {
        has_flag(self.access_flags, ACC_INTERFACE)
    }

    /// Find a method by name and descriptor
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor == descriptor)
    }

    /// Find a field by name
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Walk an attribute table, handing each known attribute's body to `handle`
///
/// `handle` returns `false` for attributes it does not recognize; those are
/// skipped. Recognized attributes must consume their body exactly.
fn for_each_attribute<'a, F>(reader: &mut ByteReader<'a>, pool: &ConstantPool, mut handle: F) -> Result<(), ClassFormatError>
where
    F: FnMut(&str, &mut ByteReader<'a>) -> Result<bool, ClassFormatError>,
{
    let count = reader.read_u16()?;
    for _ in 0..count {
        let name = pool.utf8(reader.read_u16()?)?;
        let length = reader.read_u32()? as usize;
        let mut body = ByteReader::new(reader.read_bytes(length)?);
        if handle(name, &mut body)? && body.has_more() {
            return Err(ClassFormatError::InvalidAttribute {
                name: name.to_string(),
                reason: format!("{} unread bytes", body.remaining()),
            });
        }
    }
    Ok(())
}

fn decode_field(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<FieldInfo, ClassFormatError> {
    let access_flags = reader.read_u16()?;
    let name = pool.utf8(reader.read_u16()?)?;
    let descriptor = pool.utf8(reader.read_u16()?)?;
    let mut field = FieldInfo::new(access_flags, name, descriptor);

    for_each_attribute(reader, pool, |attribute, body| {
        match attribute {
            attributes::SIGNATURE => field.signature = Some(pool.utf8(body.read_u16()?)?.to_string()),
            attributes::CONSTANT_VALUE => {
                field.constant_value = Some(decode_constant_value(body.read_u16()?, &field.descriptor, pool)?)
            }
            attributes::DEPRECATED => field.deprecated = true,
            attributes::RUNTIME_VISIBLE_ANNOTATIONS => field.visible_annotations = decode_annotations(body, pool)?,
            attributes::RUNTIME_INVISIBLE_ANNOTATIONS => field.invisible_annotations = decode_annotations(body, pool)?,
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(field)
}

/// Resolve a ConstantValue entry, typed by the field descriptor
fn decode_constant_value(index: u16, descriptor: &str, pool: &ConstantPool) -> Result<ConstValue, ClassFormatError> {
    let value = match descriptor {
        "B" => ConstValue::Byte(pool.integer(index)?),
        "C" => ConstValue::Char(pool.integer(index)?),
        "S" => ConstValue::Short(pool.integer(index)?),
        "Z" => ConstValue::Boolean(pool.integer(index)?),
        "I" => ConstValue::Int(pool.integer(index)?),
        "J" => ConstValue::Long(pool.long(index)?),
        "F" => ConstValue::Float(pool.float_bits(index)?),
        "D" => ConstValue::Double(pool.double_bits(index)?),
        _ => match pool.get(index)? {
            Constant::String { .. } => ConstValue::String(pool.string_value(index)?.clone()),
            _ => {
                return Err(ClassFormatError::InvalidAttribute {
                    name: attributes::CONSTANT_VALUE.to_string(),
                    reason: format!("no constant form for field type {descriptor}"),
                })
            }
        },
    };
    Ok(value)
}

fn decode_method(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<MethodInfo, ClassFormatError> {
    let access_flags = reader.read_u16()?;
    let name = pool.utf8(reader.read_u16()?)?;
    let descriptor = pool.utf8(reader.read_u16()?)?;
    let mut method = MethodInfo::new(access_flags, name, descriptor);

    for_each_attribute(reader, pool, |attribute, body| {
        match attribute {
            attributes::CODE => method.code = Some(decode_code(body, pool)?),
            attributes::EXCEPTIONS => {
                let count = body.read_u16()?;
                for _ in 0..count {
                    method.exceptions.push(pool.class_name(body.read_u16()?)?.to_string());
                }
            }
            attributes::SIGNATURE => method.signature = Some(pool.utf8(body.read_u16()?)?.to_string()),
            attributes::DEPRECATED => method.deprecated = true,
            attributes::RUNTIME_VISIBLE_ANNOTATIONS => method.visible_annotations = decode_annotations(body, pool)?,
            attributes::RUNTIME_INVISIBLE_ANNOTATIONS => method.invisible_annotations = decode_annotations(body, pool)?,
            attributes::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS => {
                method.visible_parameter_annotations = Some(decode_parameter_annotations(body, pool)?)
            }
            attributes::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS => {
                method.invisible_parameter_annotations = Some(decode_parameter_annotations(body, pool)?)
            }
            attributes::ANNOTATION_DEFAULT => method.annotation_default = Some(ElementValue::decode(body, pool)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;

    Ok(method)
}

fn decode_code(body: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<CodeAttribute, ClassFormatError> {
    let max_stack = body.read_u16()?;
    let max_locals = body.read_u16()?;
    let code_length = body.read_u32()? as usize;
    let code = body.read_bytes(code_length)?.to_vec();

    // Exception table entries are four u16 values each
    let handlers = body.read_u16()? as usize;
    body.skip(handlers * 8)?;

    // LineNumberTable, StackMapTable and friends are not retained
    for_each_attribute(body, pool, |_, _| Ok(false))?;

    Ok(CodeAttribute {
        max_stack,
        max_locals,
        code,
    })
}

fn decode_inner_classes(body: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Vec<InnerClass>, ClassFormatError> {
    let count = body.read_u16()?;
    let mut inner_classes = Vec::with_capacity(count as usize);
    for _ in 0..count {
        inner_classes.push(InnerClass {
            name: pool.class_name(body.read_u16()?)?.to_string(),
            outer_name: pool.optional_class_name(body.read_u16()?)?.map(str::to_string),
            inner_name: pool.optional_utf8(body.read_u16()?)?.map(str::to_string),
            access_flags: body.read_u16()?,
        });
    }
    Ok(inner_classes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{ACC_PUBLIC, ACC_SUPER};
    use crate::writer::ClassWriter;

    fn minimal_class() -> Vec<u8> {
        let writer = ClassWriter::new(
            Version::JAVA_8,
            ACC_PUBLIC | ACC_SUPER,
            "com/acme/Widget",
            None,
            Some("java/lang/Object"),
            &["java/io/Serializable".to_string()],
        )
        .unwrap();
        writer.finish().unwrap()
    }

    #[test]
    fn test_decode_header() {
        let header = ClassHeader::decode(&minimal_class()).unwrap();
        assert_eq!(header.version, Version::JAVA_8);
        assert_eq!(header.name, "com/acme/Widget");
        assert_eq!(header.super_name.as_deref(), Some("java/lang/Object"));
        assert_eq!(header.interfaces, vec!["java/io/Serializable".to_string()]);
        assert!(!header.is_interface());
    }

    #[test]
    fn test_invalid_magic() {
        let mut data = minimal_class();
        data[0] = 0xCB;
        assert!(matches!(
            ClassFile::decode(&data),
            Err(ClassFormatError::InvalidMagic(0xCBFE_BABE))
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let mut data = minimal_class();
        data[6] = 0x00;
        data[7] = 99;
        assert!(matches!(
            ClassFile::decode(&data),
            Err(ClassFormatError::UnsupportedVersion { major: 99, minor: 0 })
        ));
    }

    #[test]
    fn test_truncated_input() {
        let data = minimal_class();
        let result = ClassFile::decode(&data[..data.len() - 1]);
        assert!(matches!(result, Err(ClassFormatError::Decode(_))));
    }

    #[test]
    fn test_trailing_bytes() {
        let mut data = minimal_class();
        data.extend_from_slice(&[0, 0]);
        assert!(matches!(
            ClassFile::decode(&data),
            Err(ClassFormatError::TrailingBytes(2))
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            ClassHeader::decode(&[]),
            Err(ClassFormatError::Decode(DecodeError::UnexpectedEnd(_)))
        ));
    }
}
