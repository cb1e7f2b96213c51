//! JVM Class File Format
//!
//! This crate decodes class files into resolved, owned structures, emits
//! new class files from member declarations and symbolic method bodies,
//! and verifies the structure of emitted code.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod access;
pub mod annotation;
pub mod class;
pub mod code;
pub mod constants;
pub mod descriptor;
pub mod encoder;
pub mod opcode;
pub mod verify;
pub mod writer;

pub use annotation::{Annotation, ConstValue, ElementValue, ElementValuePair};
pub use class::{ClassFile, ClassFormatError, ClassHeader, CodeAttribute, FieldInfo, InnerClass, MethodInfo, Version};
pub use code::{disassemble, Instruction, Loadable, MethodBody};
pub use constants::{ConstantPool, MemberRef};
pub use descriptor::DescriptorError;
pub use encoder::{ByteReader, ByteWriter, DecodeError, JavaString};
pub use opcode::Opcode;
pub use verify::{verify_class, VerifyError};
pub use writer::{ClassWriter, EncodeError};
