//! Symbolic method code
//!
//! Instructions reference classes, members and literals by value; pool
//! indices are assigned when the code is encoded into a class through
//! [`crate::writer::ClassWriter`].

use crate::class::ClassFormatError;
use crate::constants::{Constant, ConstantPool, ConstantPoolBuilder, MemberRef};
use crate::descriptor::{parameter_slots, split_method_descriptor, DescriptorError};
use crate::encoder::{ByteReader, ByteWriter};
use crate::opcode::Opcode;
use crate::writer::EncodeError;

/// A constant loadable with `ldc`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Loadable {
    /// Integer constant
    Int(i32),
    /// String literal
    String(String),
}

/// A single JVM instruction with symbolic operands
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// `nop`
    Nop,
    /// `aconst_null`
    AconstNull,
    /// `iconst_1`
    Iconst1,
    /// `ldc` or `ldc_w`, chosen by pool index
    Ldc(Loadable),
    /// `aload_<n>` or `aload`
    Aload(u8),
    /// `dup`
    Dup,
    /// `ireturn`
    Ireturn,
    /// `areturn`
    Areturn,
    /// `return`
    Return,
    /// `invokespecial`
    Invokespecial(MemberRef),
    /// `invokestatic`
    Invokestatic(MemberRef),
    /// `new`
    New(String),
    /// `athrow`
    Athrow,
}

impl Instruction {
    /// The opcode this instruction encodes to, assuming a short pool index
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::Nop => Opcode::Nop,
            Instruction::AconstNull => Opcode::AconstNull,
            Instruction::Iconst1 => Opcode::Iconst1,
            Instruction::Ldc(_) => Opcode::Ldc,
            Instruction::Aload(0) => Opcode::Aload0,
            Instruction::Aload(1) => Opcode::Aload1,
            Instruction::Aload(2) => Opcode::Aload2,
            Instruction::Aload(3) => Opcode::Aload3,
            Instruction::Aload(_) => Opcode::Aload,
            Instruction::Dup => Opcode::Dup,
            Instruction::Ireturn => Opcode::Ireturn,
            Instruction::Areturn => Opcode::Areturn,
            Instruction::Return => Opcode::Return,
            Instruction::Invokespecial(_) => Opcode::Invokespecial,
            Instruction::Invokestatic(_) => Opcode::Invokestatic,
            Instruction::New(_) => Opcode::New,
            Instruction::Athrow => Opcode::Athrow,
        }
    }

    /// Encode the instruction, interning its operands
    pub fn encode(&self, writer: &mut ByteWriter, pool: &mut ConstantPoolBuilder) -> Result<(), EncodeError> {
        match self {
            Instruction::Ldc(value) => {
                let index = match value {
                    Loadable::Int(v) => pool.integer(*v)?,
                    Loadable::String(s) => pool.string(s)?,
                };
                match u8::try_from(index) {
                    Ok(short) => {
                        writer.emit_u8(Opcode::Ldc.to_u8());
                        writer.emit_u8(short);
                    }
                    Err(_) => {
                        writer.emit_u8(Opcode::LdcW.to_u8());
                        writer.emit_u16(index);
                    }
                }
            }
            Instruction::Aload(slot) if *slot > 3 => {
                writer.emit_u8(Opcode::Aload.to_u8());
                writer.emit_u8(*slot);
            }
            Instruction::Invokespecial(method) | Instruction::Invokestatic(method) => {
                writer.emit_u8(self.opcode().to_u8());
                writer.emit_u16(pool.method_ref(method)?);
            }
            Instruction::New(class) => {
                writer.emit_u8(Opcode::New.to_u8());
                writer.emit_u16(pool.class(class)?);
            }
            _ => writer.emit_u8(self.opcode().to_u8()),
        }
        Ok(())
    }

    /// Operand stack effect as `(popped, pushed)` slot counts
    pub fn stack_effect(&self) -> Result<(u16, u16), DescriptorError> {
        let effect = match self {
            Instruction::Nop => (0, 0),
            Instruction::AconstNull
            | Instruction::Iconst1
            | Instruction::Ldc(_)
            | Instruction::Aload(_)
            | Instruction::New(_) => (0, 1),
            Instruction::Dup => (1, 2),
            Instruction::Ireturn | Instruction::Areturn | Instruction::Athrow => (1, 0),
            Instruction::Return => (0, 0),
            Instruction::Invokestatic(method) => {
                let (_, ret) = split_method_descriptor(&method.descriptor)?;
                (parameter_slots(&method.descriptor)?, value_size(ret))
            }
            Instruction::Invokespecial(method) => {
                let (_, ret) = split_method_descriptor(&method.descriptor)?;
                (parameter_slots(&method.descriptor)? + 1, value_size(ret))
            }
        };
        Ok(effect)
    }
}

fn value_size(descriptor: &str) -> u16 {
    match descriptor {
        "V" => 0,
        "J" | "D" => 2,
        _ => 1,
    }
}

/// Code for a method, ready to be written as a Code attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    /// Maximum operand stack depth
    pub max_stack: u16,
    /// Number of local variable slots
    pub max_locals: u16,
    /// Straight-line instruction sequence
    pub instructions: Vec<Instruction>,
}

impl MethodBody {
    /// Build a body whose limits are computed from the instructions and the
    /// method's descriptor
    ///
    /// Only straight-line code is supported; the instruction set has no branches.
    pub fn with_computed_maxs(
        instructions: Vec<Instruction>,
        descriptor: &str,
        is_static: bool,
    ) -> Result<Self, EncodeError> {
        let max_locals = parameter_slots(descriptor)? + u16::from(!is_static);
        let max_stack = max_stack_depth(&instructions)?;
        Ok(Self {
            max_stack,
            max_locals,
            instructions,
        })
    }

    /// Encode the instructions into raw code bytes
    pub fn encode_code(&self, pool: &mut ConstantPoolBuilder) -> Result<Vec<u8>, EncodeError> {
        let mut writer = ByteWriter::new();
        for instruction in &self.instructions {
            instruction.encode(&mut writer, pool)?;
        }
        Ok(writer.into_bytes())
    }
}

/// Simulate the operand stack over straight-line code and return its peak depth
pub fn max_stack_depth(instructions: &[Instruction]) -> Result<u16, EncodeError> {
    let mut depth: u16 = 0;
    let mut max: u16 = 0;
    for (index, instruction) in instructions.iter().enumerate() {
        let (pops, pushes) = instruction.stack_effect()?;
        depth = depth
            .checked_sub(pops)
            .ok_or(EncodeError::StackUnderflow(index))?;
        depth += pushes;
        max = max.max(depth);
    }
    Ok(max)
}

/// Decode raw code bytes into symbolic instructions using the class's pool
pub fn disassemble(code: &[u8], pool: &ConstantPool) -> Result<Vec<Instruction>, ClassFormatError> {
    let mut reader = ByteReader::new(code);
    let mut instructions = Vec::new();

    while reader.has_more() {
        let offset = reader.position();
        let byte = reader.read_u8()?;
        let opcode = Opcode::from_u8(byte).ok_or(ClassFormatError::UnsupportedOpcode { opcode: byte, offset })?;

        let instruction = match opcode {
            Opcode::Nop => Instruction::Nop,
            Opcode::AconstNull => Instruction::AconstNull,
            Opcode::Iconst1 => Instruction::Iconst1,
            Opcode::Ldc | Opcode::LdcW => {
                let index = if opcode == Opcode::Ldc {
                    reader.read_u8()? as u16
                } else {
                    reader.read_u16()?
                };
                match pool.get(index)? {
                    Constant::Integer(value) => Instruction::Ldc(Loadable::Int(*value)),
                    _ => Instruction::Ldc(Loadable::String(pool.string(index)?.to_string())),
                }
            }
            Opcode::Aload => Instruction::Aload(reader.read_u8()?),
            Opcode::Aload0 => Instruction::Aload(0),
            Opcode::Aload1 => Instruction::Aload(1),
            Opcode::Aload2 => Instruction::Aload(2),
            Opcode::Aload3 => Instruction::Aload(3),
            Opcode::Dup => Instruction::Dup,
            Opcode::Ireturn => Instruction::Ireturn,
            Opcode::Areturn => Instruction::Areturn,
            Opcode::Return => Instruction::Return,
            Opcode::Invokespecial => Instruction::Invokespecial(pool.member_ref(reader.read_u16()?)?),
            Opcode::Invokestatic => Instruction::Invokestatic(pool.member_ref(reader.read_u16()?)?),
            Opcode::New => Instruction::New(pool.class_name(reader.read_u16()?)?.to_string()),
            Opcode::Athrow => Instruction::Athrow,
        };
        instructions.push(instruction);
    }

    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_of(builder: &ConstantPoolBuilder) -> ConstantPool {
        let mut writer = ByteWriter::new();
        builder.encode(&mut writer);
        let bytes = writer.into_bytes();
        ConstantPool::decode(&mut ByteReader::new(&bytes)).unwrap()
    }

    fn failure_sequence() -> Vec<Instruction> {
        vec![
            Instruction::New("java/lang/IllegalStateException".to_string()),
            Instruction::Dup,
            Instruction::Ldc(Loadable::String("boom".to_string())),
            Instruction::Invokespecial(MemberRef::new(
                "java/lang/IllegalStateException",
                "<init>",
                "(Ljava/lang/String;)V",
            )),
            Instruction::Athrow,
        ]
    }

    #[test]
    fn test_encode_and_disassemble() {
        let mut builder = ConstantPoolBuilder::new();
        let body = MethodBody::with_computed_maxs(failure_sequence(), "()V", true).unwrap();
        let code = body.encode_code(&mut builder).unwrap();

        assert_eq!(code[0], Opcode::New.to_u8());
        assert_eq!(code[3], Opcode::Dup.to_u8());
        assert_eq!(code[4], Opcode::Ldc.to_u8());
        assert_eq!(*code.last().unwrap(), Opcode::Athrow.to_u8());

        let pool = pool_of(&builder);
        assert_eq!(disassemble(&code, &pool).unwrap(), failure_sequence());
    }

    #[test]
    fn test_computed_maxs() {
        let body = MethodBody::with_computed_maxs(failure_sequence(), "(JI)V", false).unwrap();
        assert_eq!(body.max_stack, 3);
        assert_eq!(body.max_locals, 4);
    }

    #[test]
    fn test_stack_underflow_detected() {
        let result = max_stack_depth(&[Instruction::Athrow]);
        assert!(matches!(result, Err(EncodeError::StackUnderflow(0))));
    }

    #[test]
    fn test_aload_forms() {
        let mut builder = ConstantPoolBuilder::new();
        let body = MethodBody {
            max_stack: 2,
            max_locals: 6,
            instructions: vec![Instruction::Aload(0), Instruction::Aload(5)],
        };
        let code = body.encode_code(&mut builder).unwrap();
        assert_eq!(code, vec![Opcode::Aload0.to_u8(), Opcode::Aload.to_u8(), 5]);

        let pool = pool_of(&builder);
        assert_eq!(
            disassemble(&code, &pool).unwrap(),
            vec![Instruction::Aload(0), Instruction::Aload(5)]
        );
    }

    #[test]
    fn test_wide_ldc_after_255_entries() {
        let mut builder = ConstantPoolBuilder::new();
        for i in 0..300 {
            builder.integer(i).unwrap();
        }
        let body = MethodBody {
            max_stack: 1,
            max_locals: 0,
            instructions: vec![Instruction::Ldc(Loadable::String("late".to_string()))],
        };
        let code = body.encode_code(&mut builder).unwrap();
        assert_eq!(code[0], Opcode::LdcW.to_u8());

        let pool = pool_of(&builder);
        assert_eq!(
            disassemble(&code, &pool).unwrap(),
            vec![Instruction::Ldc(Loadable::String("late".to_string()))]
        );
    }

    #[test]
    fn test_unsupported_opcode_reported_with_offset() {
        let pool = ConstantPool::default();
        let err = disassemble(&[0x00, 0x60], &pool).unwrap_err();
        assert!(matches!(err, ClassFormatError::UnsupportedOpcode { opcode: 0x60, offset: 1 }));
    }
}
