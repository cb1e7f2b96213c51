//! JVM opcodes used by generated stubs and test fixtures
//!
//! This is the subset of the JVM instruction set (JVMS 6.5) that the crate
//! can encode and disassemble. Any other opcode is reported as unsupported by
//! [`crate::code::disassemble`].

/// JVM opcode enumeration
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// No operation
    Nop = 0x00,
    /// Push null
    AconstNull = 0x01,
    /// Push int constant 1
    Iconst1 = 0x04,
    /// Push a pool constant (u8 index)
    Ldc = 0x12,
    /// Push a pool constant (u16 index)
    LdcW = 0x13,
    /// Load a reference local (u8 index)
    Aload = 0x19,
    /// Load reference local 0
    Aload0 = 0x2A,
    /// Load reference local 1
    Aload1 = 0x2B,
    /// Load reference local 2
    Aload2 = 0x2C,
    /// Load reference local 3
    Aload3 = 0x2D,
    /// Duplicate top value
    Dup = 0x59,
    /// Return int
    Ireturn = 0xAC,
    /// Return reference
    Areturn = 0xB0,
    /// Return void
    Return = 0xB1,
    /// Invoke a constructor, private or super method
    Invokespecial = 0xB7,
    /// Invoke a static method
    Invokestatic = 0xB8,
    /// Allocate an object
    New = 0xBB,
    /// Throw the reference on top of the stack
    Athrow = 0xBF,
}

impl Opcode {
    /// Convert a byte to an opcode
    pub fn from_u8(byte: u8) -> Option<Self> {
        let opcode = match byte {
            0x00 => Self::Nop,
            0x01 => Self::AconstNull,
            0x04 => Self::Iconst1,
            0x12 => Self::Ldc,
            0x13 => Self::LdcW,
            0x19 => Self::Aload,
            0x2A => Self::Aload0,
            0x2B => Self::Aload1,
            0x2C => Self::Aload2,
            0x2D => Self::Aload3,
            0x59 => Self::Dup,
            0xAC => Self::Ireturn,
            0xB0 => Self::Areturn,
            0xB1 => Self::Return,
            0xB7 => Self::Invokespecial,
            0xB8 => Self::Invokestatic,
            0xBB => Self::New,
            0xBF => Self::Athrow,
            _ => return None,
        };
        Some(opcode)
    }

    /// Convert the opcode to its byte value
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Mnemonic as printed by `javap`
    pub fn name(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::AconstNull => "aconst_null",
            Self::Iconst1 => "iconst_1",
            Self::Ldc => "ldc",
            Self::LdcW => "ldc_w",
            Self::Aload => "aload",
            Self::Aload0 => "aload_0",
            Self::Aload1 => "aload_1",
            Self::Aload2 => "aload_2",
            Self::Aload3 => "aload_3",
            Self::Dup => "dup",
            Self::Ireturn => "ireturn",
            Self::Areturn => "areturn",
            Self::Return => "return",
            Self::Invokespecial => "invokespecial",
            Self::Invokestatic => "invokestatic",
            Self::New => "new",
            Self::Athrow => "athrow",
        }
    }

    /// Check if this opcode ends a basic block with no fall-through
    pub fn is_terminator(self) -> bool {
        matches!(self, Self::Ireturn | Self::Areturn | Self::Return | Self::Athrow)
    }
}
