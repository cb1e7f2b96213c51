//! Access flags for classes, fields, methods and inner class records
//!
//! Several bits are shared between member kinds (`ACC_SUPER` on a class is
//! `ACC_SYNCHRONIZED` on a method), so the rendering helpers take a
//! [`MemberKind`].

/// Declared public
pub const ACC_PUBLIC: u16 = 0x0001;
/// Declared private
pub const ACC_PRIVATE: u16 = 0x0002;
/// Declared protected
pub const ACC_PROTECTED: u16 = 0x0004;
/// Declared static
pub const ACC_STATIC: u16 = 0x0008;
/// Declared final
pub const ACC_FINAL: u16 = 0x0010;
/// Class: treat superclass methods specially when invoked by invokespecial
pub const ACC_SUPER: u16 = 0x0020;
/// Method: declared synchronized
pub const ACC_SYNCHRONIZED: u16 = 0x0020;
/// Field: declared volatile
pub const ACC_VOLATILE: u16 = 0x0040;
/// Method: compiler-generated bridge method
pub const ACC_BRIDGE: u16 = 0x0040;
/// Field: declared transient
pub const ACC_TRANSIENT: u16 = 0x0080;
/// Method: declared with variable arity
pub const ACC_VARARGS: u16 = 0x0080;
/// Method: declared native
pub const ACC_NATIVE: u16 = 0x0100;
/// Class: is an interface
pub const ACC_INTERFACE: u16 = 0x0200;
/// Declared abstract
pub const ACC_ABSTRACT: u16 = 0x0400;
/// Method: declared strictfp
pub const ACC_STRICT: u16 = 0x0800;
/// Not present in source code
pub const ACC_SYNTHETIC: u16 = 0x1000;
/// Class: is an annotation interface
pub const ACC_ANNOTATION: u16 = 0x2000;
/// Class or field: enum
pub const ACC_ENUM: u16 = 0x4000;
/// Class: is a module descriptor
pub const ACC_MODULE: u16 = 0x8000;

/// The kind of declaration an access flag set belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    /// Top-level class header or inner class record
    Class,
    /// Field
    Field,
    /// Method or constructor
    Method,
}

/// Declared visibility derived from an access flag set
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Visibility {
    /// `public`
    Public,
    /// `protected`
    Protected,
    /// No visibility modifier
    PackagePrivate,
    /// `private`
    Private,
}

impl Visibility {
    /// Derive the visibility of an access flag set
    pub fn of(access_flags: u16) -> Self {
        if access_flags & ACC_PUBLIC != 0 {
            Visibility::Public
        } else if access_flags & ACC_PROTECTED != 0 {
            Visibility::Protected
        } else if access_flags & ACC_PRIVATE != 0 {
            Visibility::Private
        } else {
            Visibility::PackagePrivate
        }
    }
}

/// Check if the flags contain every bit of `flag`
pub fn has_flag(access_flags: u16, flag: u16) -> bool {
    access_flags & flag == flag
}

/// Render flags as Java source modifiers, in `java.lang.reflect.Modifier` order
pub fn modifiers_to_string(access_flags: u16, kind: MemberKind) -> String {
    let mut modifiers: Vec<&'static str> = Vec::new();
    let mut push = |flag: u16, keyword: &'static str| {
        if has_flag(access_flags, flag) {
            modifiers.push(keyword);
        }
    };

    push(ACC_PUBLIC, "public");
    push(ACC_PROTECTED, "protected");
    push(ACC_PRIVATE, "private");
    if kind != MemberKind::Field {
        push(ACC_ABSTRACT, "abstract");
    }
    push(ACC_STATIC, "static");
    push(ACC_FINAL, "final");
    match kind {
        MemberKind::Field => {
            push(ACC_TRANSIENT, "transient");
            push(ACC_VOLATILE, "volatile");
        }
        MemberKind::Method => {
            push(ACC_SYNCHRONIZED, "synchronized");
            push(ACC_NATIVE, "native");
            push(ACC_STRICT, "strictfp");
        }
        MemberKind::Class => {
            push(ACC_INTERFACE, "interface");
        }
    }

    modifiers.join(" ")
}
