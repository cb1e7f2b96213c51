//! Stub class emission
//!
//! Emits, in order: header, failure helper, class annotations, methods,
//! fields, inner class records.

use apigen_classfile::access::{has_flag, ACC_ABSTRACT, ACC_INTERFACE, ACC_NATIVE, ACC_PRIVATE, ACC_STATIC, ACC_SYNTHETIC};
use apigen_classfile::{Annotation, ClassWriter, EncodeError, FieldInfo, Instruction, InnerClass, Loadable, MemberRef, MethodBody, MethodInfo};

use crate::extractor::ExtractedClass;
use crate::signature::{AnnotationSig, FieldSig, MethodSig};

/// Name of the synthetic helper every concrete stub method calls
pub const UNSUPPORTED_OPERATION_HELPER: &str = "$unsupportedOpEx";

/// Descriptor of the synthetic helper
pub const UNSUPPORTED_OPERATION_HELPER_DESCRIPTOR: &str = "()Ljava/lang/UnsupportedOperationException;";

/// Message of the exception raised by stub methods
pub const UNSUPPORTED_OPERATION_MESSAGE: &str =
    "You tried to call a method on an API class. You probably added the API jar on classpath instead of the implementation jar.";

const EXCEPTION_CLASS: &str = "java/lang/UnsupportedOperationException";

/// Emit the stub class for an extracted API
pub fn synthesize(extracted: &ExtractedClass) -> Result<Vec<u8>, EncodeError> {
    let class = &extracted.class;
    let is_interface = has_flag(class.access_flags, ACC_INTERFACE);

    let mut writer = ClassWriter::new(
        class.version,
        class.access_flags,
        &class.name,
        class.signature.as_deref(),
        class.super_name.as_deref(),
        &class.interfaces,
    )?;

    if !is_interface {
        let helper = MethodInfo::new(
            ACC_PRIVATE | ACC_STATIC | ACC_SYNTHETIC,
            UNSUPPORTED_OPERATION_HELPER,
            UNSUPPORTED_OPERATION_HELPER_DESCRIPTOR,
        );
        let mut instructions = construct_exception();
        instructions.push(Instruction::Areturn);
        let body = MethodBody::with_computed_maxs(instructions, &helper.descriptor, true)?;
        writer.add_method(&helper, Some(&body))?;
    }

    if class.deprecated {
        writer.set_deprecated();
    }
    let (visible, invisible) = split_annotations(&class.annotations);
    writer.add_annotations(true, &visible);
    writer.add_annotations(false, &invisible);

    for method in &extracted.methods {
        let info = stub_method(method);
        if has_flag(info.access_flags, ACC_ABSTRACT) {
            writer.add_method(&info, None)?;
        } else {
            let instructions = if is_interface {
                let mut instructions = construct_exception();
                instructions.push(Instruction::Athrow);
                instructions
            } else {
                vec![
                    Instruction::Invokestatic(MemberRef::new(
                        &class.name,
                        UNSUPPORTED_OPERATION_HELPER,
                        UNSUPPORTED_OPERATION_HELPER_DESCRIPTOR,
                    )),
                    Instruction::Athrow,
                ]
            };
            let body = MethodBody::with_computed_maxs(instructions, &info.descriptor, info.is_static())?;
            writer.add_method(&info, Some(&body))?;
        }
    }

    for field in &extracted.fields {
        writer.add_field(&stub_field(field))?;
    }

    for inner in &extracted.inner_classes {
        writer.add_inner_class(&InnerClass {
            name: inner.name.clone(),
            outer_name: inner.outer_name.clone(),
            inner_name: inner.inner_name.clone(),
            access_flags: inner.access_flags,
        });
    }

    writer.finish()
}

/// `new UnsupportedOperationException(MESSAGE)` left on the stack
fn construct_exception() -> Vec<Instruction> {
    vec![
        Instruction::New(EXCEPTION_CLASS.to_string()),
        Instruction::Dup,
        Instruction::Ldc(Loadable::String(UNSUPPORTED_OPERATION_MESSAGE.to_string())),
        Instruction::Invokespecial(MemberRef::new(EXCEPTION_CLASS, "<init>", "(Ljava/lang/String;)V")),
    ]
}

fn split_annotations(annotations: &[AnnotationSig]) -> (Vec<Annotation>, Vec<Annotation>) {
    let visible = annotations
        .iter()
        .filter(|a| a.visible)
        .map(AnnotationSig::to_annotation)
        .collect();
    let invisible = annotations
        .iter()
        .filter(|a| !a.visible)
        .map(AnnotationSig::to_annotation)
        .collect();
    (visible, invisible)
}

fn parameter_annotations(parameters: &Option<Vec<Vec<AnnotationSig>>>) -> Option<Vec<Vec<Annotation>>> {
    parameters.as_ref().map(|parameters| {
        parameters
            .iter()
            .map(|annotations| annotations.iter().map(AnnotationSig::to_annotation).collect())
            .collect()
    })
}

fn stub_method(method: &MethodSig) -> MethodInfo {
    let mut access_flags = method.access_flags;
    if !has_flag(access_flags, ACC_ABSTRACT) {
        // A native method cannot carry the throwing body
        access_flags &= !ACC_NATIVE;
    }

    let (visible, invisible) = split_annotations(&method.annotations);
    MethodInfo {
        access_flags,
        name: method.name.clone(),
        descriptor: method.descriptor.clone(),
        signature: method.signature.clone(),
        exceptions: method.exceptions.clone(),
        deprecated: method.deprecated,
        visible_annotations: visible,
        invisible_annotations: invisible,
        visible_parameter_annotations: parameter_annotations(&method.visible_parameter_annotations),
        invisible_parameter_annotations: parameter_annotations(&method.invisible_parameter_annotations),
        annotation_default: method.annotation_default.as_ref().map(|value| value.to_element()),
        code: None,
    }
}

fn stub_field(field: &FieldSig) -> FieldInfo {
    let (visible, invisible) = split_annotations(&field.annotations);
    FieldInfo {
        access_flags: field.access_flags,
        name: field.name.clone(),
        descriptor: field.descriptor.clone(),
        signature: field.signature.clone(),
        constant_value: None,
        deprecated: field.deprecated,
        visible_annotations: visible,
        invisible_annotations: invisible,
    }
}
