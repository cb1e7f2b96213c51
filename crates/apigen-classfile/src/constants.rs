//! Constant pool for class files
//!
//! [`ConstantPool`] is the decoded, read-only pool of an input class.
//! [`ConstantPoolBuilder`] assembles the pool of an output class: entries are
//! interned in first-use order, so the encoded pool is a pure function of the
//! sequence of interning calls.

use std::collections::HashMap;

use crate::class::ClassFormatError;
use crate::encoder::{ByteReader, ByteWriter, JavaString};
use crate::writer::EncodeError;

/// Constant pool tags (JVMS 4.4)
pub mod tags {
    /// CONSTANT_Utf8
    pub const UTF8: u8 = 1;
    /// CONSTANT_Integer
    pub const INTEGER: u8 = 3;
    /// CONSTANT_Float
    pub const FLOAT: u8 = 4;
    /// CONSTANT_Long
    pub const LONG: u8 = 5;
    /// CONSTANT_Double
    pub const DOUBLE: u8 = 6;
    /// CONSTANT_Class
    pub const CLASS: u8 = 7;
    /// CONSTANT_String
    pub const STRING: u8 = 8;
    /// CONSTANT_Fieldref
    pub const FIELD_REF: u8 = 9;
    /// CONSTANT_Methodref
    pub const METHOD_REF: u8 = 10;
    /// CONSTANT_InterfaceMethodref
    pub const INTERFACE_METHOD_REF: u8 = 11;
    /// CONSTANT_NameAndType
    pub const NAME_AND_TYPE: u8 = 12;
    /// CONSTANT_MethodHandle
    pub const METHOD_HANDLE: u8 = 15;
    /// CONSTANT_MethodType
    pub const METHOD_TYPE: u8 = 16;
    /// CONSTANT_Dynamic
    pub const DYNAMIC: u8 = 17;
    /// CONSTANT_InvokeDynamic
    pub const INVOKE_DYNAMIC: u8 = 18;
    /// CONSTANT_Module
    pub const MODULE: u8 = 19;
    /// CONSTANT_Package
    pub const PACKAGE: u8 = 20;
}

/// A single constant pool entry
///
/// Float and double values are held as raw IEEE-754 bits so entries can be
/// hashed and compared exactly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    /// Modified UTF-8 text, kept in encoded form
    Utf8(JavaString),
    /// 32-bit integer
    Integer(i32),
    /// 32-bit float bits
    Float(u32),
    /// 64-bit integer (occupies two slots)
    Long(i64),
    /// 64-bit float bits (occupies two slots)
    Double(u64),
    /// Class or array type reference
    Class {
        /// Utf8 index of the internal name
        name_index: u16,
    },
    /// String literal
    String {
        /// Utf8 index of the value
        string_index: u16,
    },
    /// Field reference
    FieldRef {
        /// Class index of the owner
        class_index: u16,
        /// NameAndType index
        name_and_type_index: u16,
    },
    /// Class method reference
    MethodRef {
        /// Class index of the owner
        class_index: u16,
        /// NameAndType index
        name_and_type_index: u16,
    },
    /// Interface method reference
    InterfaceMethodRef {
        /// Class index of the owner
        class_index: u16,
        /// NameAndType index
        name_and_type_index: u16,
    },
    /// Name and descriptor pair
    NameAndType {
        /// Utf8 index of the name
        name_index: u16,
        /// Utf8 index of the descriptor
        descriptor_index: u16,
    },
    /// Method handle
    MethodHandle {
        /// Reference kind (1-9)
        reference_kind: u8,
        /// Referenced member index
        reference_index: u16,
    },
    /// Method type
    MethodType {
        /// Utf8 index of the descriptor
        descriptor_index: u16,
    },
    /// Dynamically computed constant
    Dynamic {
        /// Bootstrap method table index
        bootstrap_method_attr_index: u16,
        /// NameAndType index
        name_and_type_index: u16,
    },
    /// Dynamically computed call site
    InvokeDynamic {
        /// Bootstrap method table index
        bootstrap_method_attr_index: u16,
        /// NameAndType index
        name_and_type_index: u16,
    },
    /// Module name
    Module {
        /// Utf8 index of the name
        name_index: u16,
    },
    /// Package name
    Package {
        /// Utf8 index of the name
        name_index: u16,
    },
    /// Slot 0, and the second slot of a long or double
    Unusable,
}

impl Constant {
    /// Number of pool slots this entry occupies
    pub fn slots(&self) -> u16 {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Constant::Utf8(_) => "Utf8",
            Constant::Integer(_) => "Integer",
            Constant::Float(_) => "Float",
            Constant::Long(_) => "Long",
            Constant::Double(_) => "Double",
            Constant::Class { .. } => "Class",
            Constant::String { .. } => "String",
            Constant::FieldRef { .. } => "Fieldref",
            Constant::MethodRef { .. } => "Methodref",
            Constant::InterfaceMethodRef { .. } => "InterfaceMethodref",
            Constant::NameAndType { .. } => "NameAndType",
            Constant::MethodHandle { .. } => "MethodHandle",
            Constant::MethodType { .. } => "MethodType",
            Constant::Dynamic { .. } => "Dynamic",
            Constant::InvokeDynamic { .. } => "InvokeDynamic",
            Constant::Module { .. } => "Module",
            Constant::Package { .. } => "Package",
            Constant::Unusable => "unusable",
        }
    }

    fn decode(reader: &mut ByteReader<'_>, index: u16) -> Result<Self, ClassFormatError> {
        let tag = reader.read_u8()?;
        let constant = match tag {
            tags::UTF8 => Constant::Utf8(reader.read_java_string()?),
            tags::INTEGER => Constant::Integer(reader.read_i32()?),
            tags::FLOAT => Constant::Float(reader.read_u32()?),
            tags::LONG => Constant::Long(reader.read_i64()?),
            tags::DOUBLE => Constant::Double(reader.read_i64()? as u64),
            tags::CLASS => Constant::Class {
                name_index: reader.read_u16()?,
            },
            tags::STRING => Constant::String {
                string_index: reader.read_u16()?,
            },
            tags::FIELD_REF => Constant::FieldRef {
                class_index: reader.read_u16()?,
                name_and_type_index: reader.read_u16()?,
            },
            tags::METHOD_REF => Constant::MethodRef {
                class_index: reader.read_u16()?,
                name_and_type_index: reader.read_u16()?,
            },
            tags::INTERFACE_METHOD_REF => Constant::InterfaceMethodRef {
                class_index: reader.read_u16()?,
                name_and_type_index: reader.read_u16()?,
            },
            tags::NAME_AND_TYPE => Constant::NameAndType {
                name_index: reader.read_u16()?,
                descriptor_index: reader.read_u16()?,
            },
            tags::METHOD_HANDLE => Constant::MethodHandle {
                reference_kind: reader.read_u8()?,
                reference_index: reader.read_u16()?,
            },
            tags::METHOD_TYPE => Constant::MethodType {
                descriptor_index: reader.read_u16()?,
            },
            tags::DYNAMIC => Constant::Dynamic {
                bootstrap_method_attr_index: reader.read_u16()?,
                name_and_type_index: reader.read_u16()?,
            },
            tags::INVOKE_DYNAMIC => Constant::InvokeDynamic {
                bootstrap_method_attr_index: reader.read_u16()?,
                name_and_type_index: reader.read_u16()?,
            },
            tags::MODULE => Constant::Module {
                name_index: reader.read_u16()?,
            },
            tags::PACKAGE => Constant::Package {
                name_index: reader.read_u16()?,
            },
            _ => return Err(ClassFormatError::InvalidConstantTag { tag, index }),
        };
        Ok(constant)
    }

    fn encode(&self, writer: &mut ByteWriter) {
        match self {
            Constant::Utf8(value) => {
                let bytes = value.as_modified_utf8();
                writer.emit_u8(tags::UTF8);
                writer.emit_u16(bytes.len() as u16);
                writer.emit_bytes(&bytes);
            }
            Constant::Integer(value) => {
                writer.emit_u8(tags::INTEGER);
                writer.emit_i32(*value);
            }
            Constant::Float(bits) => {
                writer.emit_u8(tags::FLOAT);
                writer.emit_u32(*bits);
            }
            Constant::Long(value) => {
                writer.emit_u8(tags::LONG);
                writer.emit_i64(*value);
            }
            Constant::Double(bits) => {
                writer.emit_u8(tags::DOUBLE);
                writer.emit_i64(*bits as i64);
            }
            Constant::Class { name_index } => {
                writer.emit_u8(tags::CLASS);
                writer.emit_u16(*name_index);
            }
            Constant::String { string_index } => {
                writer.emit_u8(tags::STRING);
                writer.emit_u16(*string_index);
            }
            Constant::FieldRef {
                class_index,
                name_and_type_index,
            } => {
                writer.emit_u8(tags::FIELD_REF);
                writer.emit_u16(*class_index);
                writer.emit_u16(*name_and_type_index);
            }
            Constant::MethodRef {
                class_index,
                name_and_type_index,
            } => {
                writer.emit_u8(tags::METHOD_REF);
                writer.emit_u16(*class_index);
                writer.emit_u16(*name_and_type_index);
            }
            Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => {
                writer.emit_u8(tags::INTERFACE_METHOD_REF);
                writer.emit_u16(*class_index);
                writer.emit_u16(*name_and_type_index);
            }
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => {
                writer.emit_u8(tags::NAME_AND_TYPE);
                writer.emit_u16(*name_index);
                writer.emit_u16(*descriptor_index);
            }
            Constant::MethodHandle {
                reference_kind,
                reference_index,
            } => {
                writer.emit_u8(tags::METHOD_HANDLE);
                writer.emit_u8(*reference_kind);
                writer.emit_u16(*reference_index);
            }
            Constant::MethodType { descriptor_index } => {
                writer.emit_u8(tags::METHOD_TYPE);
                writer.emit_u16(*descriptor_index);
            }
            Constant::Dynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => {
                writer.emit_u8(tags::DYNAMIC);
                writer.emit_u16(*bootstrap_method_attr_index);
                writer.emit_u16(*name_and_type_index);
            }
            Constant::InvokeDynamic {
                bootstrap_method_attr_index,
                name_and_type_index,
            } => {
                writer.emit_u8(tags::INVOKE_DYNAMIC);
                writer.emit_u16(*bootstrap_method_attr_index);
                writer.emit_u16(*name_and_type_index);
            }
            Constant::Module { name_index } => {
                writer.emit_u8(tags::MODULE);
                writer.emit_u16(*name_index);
            }
            Constant::Package { name_index } => {
                writer.emit_u8(tags::PACKAGE);
                writer.emit_u16(*name_index);
            }
            Constant::Unusable => {}
        }
    }
}

/// A resolved field or method reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    /// Internal name of the owning class
    pub owner: String,
    /// Member name
    pub name: String,
    /// Member descriptor
    pub descriptor: String,
    /// Whether the owner is an interface (InterfaceMethodref)
    pub interface: bool,
}

impl MemberRef {
    /// Create a class member reference
    pub fn new(owner: &str, name: &str, descriptor: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            interface: false,
        }
    }
}

/// Decoded constant pool of a class file
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    /// Entries indexed by pool index; slot 0 is always `Unusable`
    entries: Vec<Constant>,
}

impl ConstantPool {
    /// Decode the constant pool that starts at the reader's position
    pub fn decode(reader: &mut ByteReader<'_>) -> Result<Self, ClassFormatError> {
        let count = reader.read_u16()?;
        let mut entries = Vec::with_capacity(count as usize);
        entries.push(Constant::Unusable);

        while entries.len() < count as usize {
            let index = entries.len() as u16;
            let constant = Constant::decode(reader, index)?;
            let slots = constant.slots();
            entries.push(constant);
            if slots == 2 {
                entries.push(Constant::Unusable);
            }
        }

        // A long/double in the last slot overflows the declared count
        if entries.len() != count as usize {
            return Err(ClassFormatError::InvalidConstantIndex(count));
        }

        Ok(Self { entries })
    }

    /// Number of slots, including the unusable slot 0
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the pool has no usable entries
    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    /// Iterate over `(index, entry)` pairs, skipping unusable slots
    pub fn iter(&self) -> impl Iterator<Item = (u16, &Constant)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, c)| !matches!(c, Constant::Unusable))
            .map(|(i, c)| (i as u16, c))
    }

    /// Get an entry by index
    pub fn get(&self, index: u16) -> Result<&Constant, ClassFormatError> {
        match self.entries.get(index as usize) {
            Some(Constant::Unusable) | None => Err(ClassFormatError::InvalidConstantIndex(index)),
            Some(constant) => Ok(constant),
        }
    }

    fn mismatch(&self, index: u16, expected: &'static str) -> ClassFormatError {
        let found = self
            .entries
            .get(index as usize)
            .map(Constant::kind)
            .unwrap_or("missing");
        ClassFormatError::UnexpectedConstant {
            index,
            expected,
            found,
        }
    }

    /// Get a Utf8 entry as text
    ///
    /// Used for names, descriptors and signatures, which must be valid Unicode.
    pub fn utf8(&self, index: u16) -> Result<&str, ClassFormatError> {
        self.java_string(index)?
            .as_str()
            .ok_or(ClassFormatError::UnpairedSurrogate(index))
    }

    /// Get a Utf8 entry in its lossless form
    pub fn java_string(&self, index: u16) -> Result<&JavaString, ClassFormatError> {
        match self.get(index)? {
            Constant::Utf8(value) => Ok(value),
            _ => Err(self.mismatch(index, "Utf8")),
        }
    }

    /// Get the internal name referenced by a Class entry
    pub fn class_name(&self, index: u16) -> Result<&str, ClassFormatError> {
        match self.get(index)? {
            Constant::Class { name_index } => self.utf8(*name_index),
            _ => Err(self.mismatch(index, "Class")),
        }
    }

    /// Get the internal name referenced by a Class entry, or `None` for index 0
    pub fn optional_class_name(&self, index: u16) -> Result<Option<&str>, ClassFormatError> {
        if index == 0 {
            return Ok(None);
        }
        self.class_name(index).map(Some)
    }

    /// Get the optional Utf8 entry at `index`, or `None` for index 0
    pub fn optional_utf8(&self, index: u16) -> Result<Option<&str>, ClassFormatError> {
        if index == 0 {
            return Ok(None);
        }
        self.utf8(index).map(Some)
    }

    /// Get the text of a String entry
    pub fn string(&self, index: u16) -> Result<&str, ClassFormatError> {
        match self.get(index)? {
            Constant::String { string_index } => self.utf8(*string_index),
            _ => Err(self.mismatch(index, "String")),
        }
    }

    /// Get the value of a String entry in its lossless form
    pub fn string_value(&self, index: u16) -> Result<&JavaString, ClassFormatError> {
        match self.get(index)? {
            Constant::String { string_index } => self.java_string(*string_index),
            _ => Err(self.mismatch(index, "String")),
        }
    }

    /// Get an Integer entry
    pub fn integer(&self, index: u16) -> Result<i32, ClassFormatError> {
        match self.get(index)? {
            Constant::Integer(value) => Ok(*value),
            _ => Err(self.mismatch(index, "Integer")),
        }
    }

    /// Get a Float entry as raw bits
    pub fn float_bits(&self, index: u16) -> Result<u32, ClassFormatError> {
        match self.get(index)? {
            Constant::Float(bits) => Ok(*bits),
            _ => Err(self.mismatch(index, "Float")),
        }
    }

    /// Get a Long entry
    pub fn long(&self, index: u16) -> Result<i64, ClassFormatError> {
        match self.get(index)? {
            Constant::Long(value) => Ok(*value),
            _ => Err(self.mismatch(index, "Long")),
        }
    }

    /// Get a Double entry as raw bits
    pub fn double_bits(&self, index: u16) -> Result<u64, ClassFormatError> {
        match self.get(index)? {
            Constant::Double(bits) => Ok(*bits),
            _ => Err(self.mismatch(index, "Double")),
        }
    }

    /// Resolve a NameAndType entry to `(name, descriptor)`
    pub fn name_and_type(&self, index: u16) -> Result<(&str, &str), ClassFormatError> {
        match self.get(index)? {
            Constant::NameAndType {
                name_index,
                descriptor_index,
            } => Ok((self.utf8(*name_index)?, self.utf8(*descriptor_index)?)),
            _ => Err(self.mismatch(index, "NameAndType")),
        }
    }

    /// Resolve a Fieldref, Methodref or InterfaceMethodref entry
    pub fn member_ref(&self, index: u16) -> Result<MemberRef, ClassFormatError> {
        let (class_index, name_and_type_index, interface) = match self.get(index)? {
            Constant::FieldRef {
                class_index,
                name_and_type_index,
            }
            | Constant::MethodRef {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index, false),
            Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            } => (*class_index, *name_and_type_index, true),
            _ => return Err(self.mismatch(index, "member reference")),
        };
        let (name, descriptor) = self.name_and_type(name_and_type_index)?;
        Ok(MemberRef {
            owner: self.class_name(class_index)?.to_string(),
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            interface,
        })
    }
}

/// Builder for the constant pool of an emitted class
#[derive(Debug)]
pub struct ConstantPoolBuilder {
    entries: Vec<Constant>,
    indices: HashMap<Constant, u16>,
    next_index: u16,
}

impl Default for ConstantPoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstantPoolBuilder {
    /// Create a new empty builder
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            indices: HashMap::new(),
            next_index: 1,
        }
    }

    /// Value of the `constant_pool_count` field for the current entries
    pub fn count(&self) -> u16 {
        self.next_index
    }

    /// Intern an entry and return its index
    pub fn intern(&mut self, constant: Constant) -> Result<u16, EncodeError> {
        if let Some(&index) = self.indices.get(&constant) {
            return Ok(index);
        }
        let index = self.next_index;
        let next = index as u32 + constant.slots() as u32;
        if next > u16::MAX as u32 {
            return Err(EncodeError::ConstantPoolOverflow);
        }
        self.next_index = next as u16;
        self.indices.insert(constant.clone(), index);
        self.entries.push(constant);
        Ok(index)
    }

    /// Intern a Utf8 entry
    pub fn utf8(&mut self, value: &str) -> Result<u16, EncodeError> {
        self.java_utf8(&JavaString::from(value))
    }

    /// Intern a Utf8 entry from its lossless form
    pub fn java_utf8(&mut self, value: &JavaString) -> Result<u16, EncodeError> {
        let encoded_len = value.as_modified_utf8().len();
        if encoded_len > u16::MAX as usize {
            return Err(EncodeError::StringTooLong(encoded_len));
        }
        self.intern(Constant::Utf8(value.clone()))
    }

    /// Intern a Class entry for an internal name
    pub fn class(&mut self, internal_name: &str) -> Result<u16, EncodeError> {
        let name_index = self.utf8(internal_name)?;
        self.intern(Constant::Class { name_index })
    }

    /// Intern a String entry
    pub fn string(&mut self, value: &str) -> Result<u16, EncodeError> {
        self.java_string(&JavaString::from(value))
    }

    /// Intern a String entry from its lossless form
    pub fn java_string(&mut self, value: &JavaString) -> Result<u16, EncodeError> {
        let string_index = self.java_utf8(value)?;
        self.intern(Constant::String { string_index })
    }

    /// Intern an Integer entry
    pub fn integer(&mut self, value: i32) -> Result<u16, EncodeError> {
        self.intern(Constant::Integer(value))
    }

    /// Intern a Float entry from raw bits
    pub fn float_bits(&mut self, bits: u32) -> Result<u16, EncodeError> {
        self.intern(Constant::Float(bits))
    }

    /// Intern a Long entry
    pub fn long(&mut self, value: i64) -> Result<u16, EncodeError> {
        self.intern(Constant::Long(value))
    }

    /// Intern a Double entry from raw bits
    pub fn double_bits(&mut self, bits: u64) -> Result<u16, EncodeError> {
        self.intern(Constant::Double(bits))
    }

    /// Intern a NameAndType entry
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> Result<u16, EncodeError> {
        let name_index = self.utf8(name)?;
        let descriptor_index = self.utf8(descriptor)?;
        self.intern(Constant::NameAndType {
            name_index,
            descriptor_index,
        })
    }

    /// Intern a Methodref or InterfaceMethodref entry
    pub fn method_ref(&mut self, member: &MemberRef) -> Result<u16, EncodeError> {
        let class_index = self.class(&member.owner)?;
        let name_and_type_index = self.name_and_type(&member.name, &member.descriptor)?;
        if member.interface {
            self.intern(Constant::InterfaceMethodRef {
                class_index,
                name_and_type_index,
            })
        } else {
            self.intern(Constant::MethodRef {
                class_index,
                name_and_type_index,
            })
        }
    }

    /// Encode `constant_pool_count` followed by every entry
    pub fn encode(&self, writer: &mut ByteWriter) {
        writer.emit_u16(self.next_index);
        for constant in &self.entries {
            constant.encode(writer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(builder: &ConstantPoolBuilder) -> ConstantPool {
        let mut writer = ByteWriter::new();
        builder.encode(&mut writer);
        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        let pool = ConstantPool::decode(&mut reader).unwrap();
        assert!(!reader.has_more());
        pool
    }

    #[test]
    fn test_builder_interns_duplicates() {
        let mut builder = ConstantPoolBuilder::new();
        let a = builder.class("java/lang/Object").unwrap();
        let b = builder.class("java/lang/Object").unwrap();
        let utf8 = builder.utf8("java/lang/Object").unwrap();

        assert_eq!(a, b);
        assert_eq!(utf8, 1);
        assert_eq!(a, 2);
        assert_eq!(builder.count(), 3);
    }

    #[test]
    fn test_long_and_double_take_two_slots() {
        let mut builder = ConstantPoolBuilder::new();
        let long = builder.long(1 << 40).unwrap();
        let double = builder.double_bits(2.5f64.to_bits()).unwrap();
        let after = builder.utf8("x").unwrap();

        assert_eq!(long, 1);
        assert_eq!(double, 3);
        assert_eq!(after, 5);

        let pool = roundtrip(&builder);
        assert_eq!(pool.long(1).unwrap(), 1 << 40);
        assert_eq!(f64::from_bits(pool.double_bits(3).unwrap()), 2.5);
        assert!(pool.get(2).is_err());
        assert_eq!(pool.utf8(5).unwrap(), "x");
    }

    #[test]
    fn test_member_ref_resolution() {
        let mut builder = ConstantPoolBuilder::new();
        let mut member = MemberRef::new("java/util/List", "size", "()I");
        member.interface = true;
        let index = builder.method_ref(&member).unwrap();

        let pool = roundtrip(&builder);
        assert_eq!(pool.member_ref(index).unwrap(), member);
    }

    #[test]
    fn test_typed_lookup_mismatch() {
        let mut builder = ConstantPoolBuilder::new();
        let index = builder.integer(7).unwrap();
        let pool = roundtrip(&builder);

        assert_eq!(pool.integer(index).unwrap(), 7);
        let err = pool.utf8(index).unwrap_err();
        assert!(matches!(
            err,
            ClassFormatError::UnexpectedConstant {
                expected: "Utf8",
                found: "Integer",
                ..
            }
        ));
        assert!(matches!(
            pool.get(99),
            Err(ClassFormatError::InvalidConstantIndex(99))
        ));
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let bytes = [0x00, 0x02, 0x02, 0x00];
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(
            ConstantPool::decode(&mut reader),
            Err(ClassFormatError::InvalidConstantTag { tag: 2, index: 1 })
        ));
    }

    #[test]
    fn test_string_too_long() {
        let mut builder = ConstantPoolBuilder::new();
        let huge = "x".repeat(70_000);
        assert!(matches!(
            builder.utf8(&huge),
            Err(EncodeError::StringTooLong(70_000))
        ));
    }

    #[test]
    fn test_unpaired_surrogate_entry() {
        // count 3: Utf8 "\uD800", String -> #1
        let bytes = [0x00, 0x03, 0x01, 0x00, 0x03, 0xED, 0xA0, 0x80, 0x08, 0x00, 0x01];
        let mut reader = ByteReader::new(&bytes);
        let pool = ConstantPool::decode(&mut reader).unwrap();

        assert!(matches!(pool.utf8(1), Err(ClassFormatError::UnpairedSurrogate(1))));
        let value = pool.string_value(2).unwrap();
        assert_eq!(value.as_modified_utf8(), &[0xED, 0xA0, 0x80]);

        let mut builder = ConstantPoolBuilder::new();
        builder.java_string(value).unwrap();
        let mut writer = ByteWriter::new();
        builder.encode(&mut writer);
        assert_eq!(writer.into_bytes(), bytes);
    }

    #[test]
    fn test_optional_entries() {
        let pool = ConstantPool::default();
        assert_eq!(pool.optional_class_name(0).unwrap(), None);
        assert_eq!(pool.optional_utf8(0).unwrap(), None);
        assert!(pool.is_empty());
    }
}
