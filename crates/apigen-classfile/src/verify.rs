//! Structural verification of emitted classes
//!
//! Covers what a stub class can get wrong: code present exactly where it is
//! required, limits that match the descriptor, and straight-line code whose
//! operand stack stays within `max_stack` and which ends in a terminator.

use crate::class::{ClassFile, ClassFormatError, MethodInfo};
use crate::code::{disassemble, Instruction};
use crate::descriptor::{parameter_slots, DescriptorError};

/// Class verification errors
#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    /// Concrete method without a Code attribute
    #[error("Method {method} has no code")]
    MissingCode { method: String },

    /// Abstract or native method with a Code attribute
    #[error("Abstract or native method {method} has code")]
    UnexpectedCode { method: String },

    /// Code that cannot be disassembled
    #[error("Method {method} has undecodable code: {source}")]
    InvalidCode {
        method: String,
        #[source]
        source: ClassFormatError,
    },

    /// Execution reaches the end of the code array
    #[error("Execution falls off end of method {method}")]
    FallOffEnd { method: String },

    /// Instructions after a terminator in straight-line code
    #[error("Unreachable instruction {index} in method {method}")]
    UnreachableCode { method: String, index: usize },

    /// Too few local slots for the parameters
    #[error("Method {method} declares max_locals {declared} but needs {required}")]
    MaxLocalsTooSmall {
        method: String,
        required: u16,
        declared: u16,
    },

    /// Local variable slot out of range
    #[error("Invalid local variable reference {slot} (max {max}) in method {method}")]
    InvalidLocalRef { method: String, slot: u8, max: u16 },

    /// Stack underflow
    #[error("Stack underflow at instruction {index} in method {method}")]
    StackUnderflow { method: String, index: usize },

    /// Stack deeper than declared
    #[error("Stack depth {depth} exceeds max_stack {max} in method {method}")]
    StackOverflow { method: String, depth: u16, max: u16 },

    /// Malformed method descriptor
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// Verify every method of a decoded class
pub fn verify_class(class: &ClassFile) -> Result<(), VerifyError> {
    for method in &class.methods {
        verify_method(class, method)?;
    }
    Ok(())
}

fn verify_method(class: &ClassFile, method: &MethodInfo) -> Result<(), VerifyError> {
    let label = || format!("{}.{}{}", class.name, method.name, method.descriptor);

    let code = match (&method.code, method.is_abstract_or_native()) {
        (None, true) => return Ok(()),
        (Some(_), true) => return Err(VerifyError::UnexpectedCode { method: label() }),
        (None, false) => return Err(VerifyError::MissingCode { method: label() }),
        (Some(code), false) => code,
    };

    let required = parameter_slots(&method.descriptor)? + u16::from(!method.is_static());
    if code.max_locals < required {
        return Err(VerifyError::MaxLocalsTooSmall {
            method: label(),
            required,
            declared: code.max_locals,
        });
    }

    let instructions = disassemble(&code.code, &class.constant_pool).map_err(|source| VerifyError::InvalidCode {
        method: label(),
        source,
    })?;

    let mut depth: u16 = 0;
    for (index, instruction) in instructions.iter().enumerate() {
        if let Instruction::Aload(slot) = instruction {
            if u16::from(*slot) >= code.max_locals {
                return Err(VerifyError::InvalidLocalRef {
                    method: label(),
                    slot: *slot,
                    max: code.max_locals,
                });
            }
        }

        let (pops, pushes) = instruction.stack_effect()?;
        depth = depth
            .checked_sub(pops)
            .ok_or_else(|| VerifyError::StackUnderflow { method: label(), index })?;
        depth += pushes;
        if depth > code.max_stack {
            return Err(VerifyError::StackOverflow {
                method: label(),
                depth,
                max: code.max_stack,
            });
        }

        if instruction.opcode().is_terminator() && index + 1 < instructions.len() {
            return Err(VerifyError::UnreachableCode {
                method: label(),
                index: index + 1,
            });
        }
    }

    match instructions.last() {
        Some(last) if last.opcode().is_terminator() => Ok(()),
        _ => Err(VerifyError::FallOffEnd { method: label() }),
    }
}
