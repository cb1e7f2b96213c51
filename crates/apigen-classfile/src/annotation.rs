//! Annotation structures (JVMS 4.7.16)

use crate::class::ClassFormatError;
use crate::constants::{ConstantPool, ConstantPoolBuilder};
use crate::encoder::{ByteReader, ByteWriter, JavaString};
use crate::writer::EncodeError;

/// A constant element value, or a class literal
///
/// The primitive kinds keep their own variants because the tag byte is part
/// of the encoded form even though the pool entry is a shared Integer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstValue {
    /// `B`
    Byte(i32),
    /// `C`
    Char(i32),
    /// `S`
    Short(i32),
    /// `Z`
    Boolean(i32),
    /// `I`
    Int(i32),
    /// `J`
    Long(i64),
    /// `F`, raw IEEE-754 bits
    Float(u32),
    /// `D`, raw IEEE-754 bits
    Double(u64),
    /// `s`, kept lossless since string literals may hold unpaired surrogates
    String(JavaString),
    /// `c`, a return descriptor such as `Ljava/lang/String;` or `V`
    Class(String),
}

impl ConstValue {
    /// The element value tag byte
    pub fn tag(&self) -> u8 {
        match self {
            ConstValue::Byte(_) => b'B',
            ConstValue::Char(_) => b'C',
            ConstValue::Short(_) => b'S',
            ConstValue::Boolean(_) => b'Z',
            ConstValue::Int(_) => b'I',
            ConstValue::Long(_) => b'J',
            ConstValue::Float(_) => b'F',
            ConstValue::Double(_) => b'D',
            ConstValue::String(_) => b's',
            ConstValue::Class(_) => b'c',
        }
    }
}

/// An annotation element value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementValue {
    /// Constant or class literal
    Const(ConstValue),
    /// Enum constant
    Enum {
        /// Field descriptor of the enum type
        type_descriptor: String,
        /// Simple name of the constant
        const_name: String,
    },
    /// Nested annotation
    Annotation(Annotation),
    /// Array of values, in declared order
    Array(Vec<ElementValue>),
}

/// A named element of an annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementValuePair {
    /// Element name
    pub name: String,
    /// Element value
    pub value: ElementValue,
}

/// A single annotation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Annotation {
    /// Field descriptor of the annotation interface
    pub type_descriptor: String,
    /// Explicitly given elements
    pub elements: Vec<ElementValuePair>,
}

impl Annotation {
    /// Create an annotation without elements
    pub fn marker(type_descriptor: &str) -> Self {
        Self {
            type_descriptor: type_descriptor.to_string(),
            elements: Vec::new(),
        }
    }

    /// Decode one annotation structure
    pub fn decode(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Self, ClassFormatError> {
        let type_descriptor = pool.utf8(reader.read_u16()?)?.to_string();
        let count = reader.read_u16()?;
        let mut elements = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = pool.utf8(reader.read_u16()?)?.to_string();
            let value = ElementValue::decode(reader, pool)?;
            elements.push(ElementValuePair { name, value });
        }
        Ok(Self {
            type_descriptor,
            elements,
        })
    }

    /// Encode one annotation structure
    pub fn encode(&self, writer: &mut ByteWriter, pool: &mut ConstantPoolBuilder) -> Result<(), EncodeError> {
        writer.emit_u16(pool.utf8(&self.type_descriptor)?);
        writer.emit_u16(checked_len(self.elements.len())?);
        for pair in &self.elements {
            writer.emit_u16(pool.utf8(&pair.name)?);
            pair.value.encode(writer, pool)?;
        }
        Ok(())
    }
}

impl ElementValue {
    /// Decode one element_value structure
    pub fn decode(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Self, ClassFormatError> {
        let tag = reader.read_u8()?;
        let value = match tag {
            b'B' => ElementValue::Const(ConstValue::Byte(pool.integer(reader.read_u16()?)?)),
            b'C' => ElementValue::Const(ConstValue::Char(pool.integer(reader.read_u16()?)?)),
            b'S' => ElementValue::Const(ConstValue::Short(pool.integer(reader.read_u16()?)?)),
            b'Z' => ElementValue::Const(ConstValue::Boolean(pool.integer(reader.read_u16()?)?)),
            b'I' => ElementValue::Const(ConstValue::Int(pool.integer(reader.read_u16()?)?)),
            b'J' => ElementValue::Const(ConstValue::Long(pool.long(reader.read_u16()?)?)),
            b'F' => ElementValue::Const(ConstValue::Float(pool.float_bits(reader.read_u16()?)?)),
            b'D' => ElementValue::Const(ConstValue::Double(pool.double_bits(reader.read_u16()?)?)),
            b's' => ElementValue::Const(ConstValue::String(pool.java_string(reader.read_u16()?)?.clone())),
            b'c' => ElementValue::Const(ConstValue::Class(pool.utf8(reader.read_u16()?)?.to_string())),
            b'e' => ElementValue::Enum {
                type_descriptor: pool.utf8(reader.read_u16()?)?.to_string(),
                const_name: pool.utf8(reader.read_u16()?)?.to_string(),
            },
            b'@' => ElementValue::Annotation(Annotation::decode(reader, pool)?),
            b'[' => {
                let count = reader.read_u16()?;
                let mut values = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    values.push(ElementValue::decode(reader, pool)?);
                }
                ElementValue::Array(values)
            }
            _ => return Err(ClassFormatError::InvalidElementTag(tag)),
        };
        Ok(value)
    }

    /// Encode one element_value structure
    pub fn encode(&self, writer: &mut ByteWriter, pool: &mut ConstantPoolBuilder) -> Result<(), EncodeError> {
        match self {
            ElementValue::Const(value) => {
                writer.emit_u8(value.tag());
                let index = match value {
                    ConstValue::Byte(v)
                    | ConstValue::Char(v)
                    | ConstValue::Short(v)
                    | ConstValue::Boolean(v)
                    | ConstValue::Int(v) => pool.integer(*v)?,
                    ConstValue::Long(v) => pool.long(*v)?,
                    ConstValue::Float(bits) => pool.float_bits(*bits)?,
                    ConstValue::Double(bits) => pool.double_bits(*bits)?,
                    ConstValue::String(s) => pool.java_utf8(s)?,
                    ConstValue::Class(s) => pool.utf8(s)?,
                };
                writer.emit_u16(index);
            }
            ElementValue::Enum {
                type_descriptor,
                const_name,
            } => {
                writer.emit_u8(b'e');
                writer.emit_u16(pool.utf8(type_descriptor)?);
                writer.emit_u16(pool.utf8(const_name)?);
            }
            ElementValue::Annotation(annotation) => {
                writer.emit_u8(b'@');
                annotation.encode(writer, pool)?;
            }
            ElementValue::Array(values) => {
                writer.emit_u8(b'[');
                writer.emit_u16(checked_len(values.len())?);
                for value in values {
                    value.encode(writer, pool)?;
                }
            }
        }
        Ok(())
    }
}

/// Decode the body of a Runtime(In)VisibleAnnotations attribute
pub fn decode_annotations(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Vec<Annotation>, ClassFormatError> {
    let count = reader.read_u16()?;
    let mut annotations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        annotations.push(Annotation::decode(reader, pool)?);
    }
    Ok(annotations)
}

/// Decode the body of a Runtime(In)VisibleParameterAnnotations attribute
pub fn decode_parameter_annotations(
    reader: &mut ByteReader<'_>,
    pool: &ConstantPool,
) -> Result<Vec<Vec<Annotation>>, ClassFormatError> {
    let parameters = reader.read_u8()?;
    let mut result = Vec::with_capacity(parameters as usize);
    for _ in 0..parameters {
        result.push(decode_annotations(reader, pool)?);
    }
    Ok(result)
}

/// Encode the body of a Runtime(In)VisibleAnnotations attribute
pub fn encode_annotations(
    annotations: &[Annotation],
    writer: &mut ByteWriter,
    pool: &mut ConstantPoolBuilder,
) -> Result<(), EncodeError> {
    writer.emit_u16(checked_len(annotations.len())?);
    for annotation in annotations {
        annotation.encode(writer, pool)?;
    }
    Ok(())
}

/// Encode the body of a Runtime(In)VisibleParameterAnnotations attribute
pub fn encode_parameter_annotations(
    parameters: &[Vec<Annotation>],
    writer: &mut ByteWriter,
    pool: &mut ConstantPoolBuilder,
) -> Result<(), EncodeError> {
    let count = u8::try_from(parameters.len()).map_err(|_| EncodeError::TooManyItems(parameters.len()))?;
    writer.emit_u8(count);
    for annotations in parameters {
        encode_annotations(annotations, writer, pool)?;
    }
    Ok(())
}

pub(crate) fn checked_len(len: usize) -> Result<u16, EncodeError> {
    u16::try_from(len).map_err(|_| EncodeError::TooManyItems(len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_then_decode(annotation: &Annotation) -> Annotation {
        let mut builder = ConstantPoolBuilder::new();
        let mut body = ByteWriter::new();
        annotation.encode(&mut body, &mut builder).unwrap();

        let mut pool_bytes = ByteWriter::new();
        builder.encode(&mut pool_bytes);
        let pool_bytes = pool_bytes.into_bytes();
        let pool = ConstantPool::decode(&mut ByteReader::new(&pool_bytes)).unwrap();

        let body = body.into_bytes();
        let mut reader = ByteReader::new(&body);
        let decoded = Annotation::decode(&mut reader, &pool).unwrap();
        assert!(!reader.has_more());
        decoded
    }

    #[test]
    fn test_nested_annotation_structure_survives_encoding() {
        let annotation = Annotation {
            type_descriptor: "Lcom/acme/Config;".to_string(),
            elements: vec![
                ElementValuePair {
                    name: "name".to_string(),
                    value: ElementValue::Const(ConstValue::String("widget".into())),
                },
                ElementValuePair {
                    name: "mode".to_string(),
                    value: ElementValue::Enum {
                        type_descriptor: "Lcom/acme/Mode;".to_string(),
                        const_name: "FAST".to_string(),
                    },
                },
                ElementValuePair {
                    name: "limits".to_string(),
                    value: ElementValue::Array(vec![
                        ElementValue::Const(ConstValue::Long(1 << 33)),
                        ElementValue::Const(ConstValue::Double(0.5f64.to_bits())),
                    ]),
                },
                ElementValuePair {
                    name: "nested".to_string(),
                    value: ElementValue::Annotation(Annotation::marker("Lcom/acme/Marker;")),
                },
            ],
        };

        assert_eq!(encode_then_decode(&annotation), annotation);
    }

    #[test]
    fn test_integer_kinds_keep_their_tags() {
        let annotation = Annotation {
            type_descriptor: "Lcom/acme/Flags;".to_string(),
            elements: vec![
                ElementValuePair {
                    name: "b".to_string(),
                    value: ElementValue::Const(ConstValue::Byte(1)),
                },
                ElementValuePair {
                    name: "z".to_string(),
                    value: ElementValue::Const(ConstValue::Boolean(1)),
                },
                ElementValuePair {
                    name: "type".to_string(),
                    value: ElementValue::Const(ConstValue::Class("Ljava/lang/String;".to_string())),
                },
            ],
        };

        let decoded = encode_then_decode(&annotation);
        assert_eq!(decoded.elements[0].value, ElementValue::Const(ConstValue::Byte(1)));
        assert_eq!(decoded.elements[1].value, ElementValue::Const(ConstValue::Boolean(1)));
        assert_eq!(
            decoded.elements[2].value,
            ElementValue::Const(ConstValue::Class("Ljava/lang/String;".to_string()))
        );
    }

    #[test]
    fn test_invalid_element_tag() {
        let pool = ConstantPool::default();
        let bytes = [b'X', 0, 0];
        let mut reader = ByteReader::new(&bytes);
        assert!(matches!(
            ElementValue::decode(&mut reader, &pool),
            Err(ClassFormatError::InvalidElementTag(b'X'))
        ));
    }
}
