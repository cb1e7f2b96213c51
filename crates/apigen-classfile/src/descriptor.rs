//! Field/method descriptors and generic signatures
//!
//! One recursive-descent scanner accepts raw descriptors, field signatures,
//! class signatures and method signatures. It collects the outer class name of
//! every class type it meets; type variables and primitive types carry no
//! class reference.

use thiserror::Error;

use crate::access::{modifiers_to_string, MemberKind};

/// Malformed descriptor or signature
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid descriptor or signature '{text}' at offset {offset}")]
pub struct DescriptorError {
    /// The offending text
    pub text: String,
    /// Byte offset where scanning failed
    pub offset: usize,
}

/// Convert an internal name (`java/lang/String`) to a binary name (`java.lang.String`)
pub fn internal_to_binary(internal_name: &str) -> String {
    internal_name.replace('/', ".")
}

/// Package of a binary class name, or `""` for the default package
pub fn package_of(binary_name: &str) -> &str {
    match binary_name.rfind('.') {
        Some(index) if index > 0 => &binary_name[..index],
        _ => "",
    }
}

/// Internal names of every class type referenced by a descriptor or signature
///
/// Names are returned in order of first appearance without duplicates. For a
/// nested parameterized type such as `Lp/Outer<TT;>.Inner;` only the outer
/// class `p/Outer` is reported.
pub fn referenced_classes(signature: &str) -> Result<Vec<String>, DescriptorError> {
    SignatureScanner::new(signature).scan()
}

/// Number of local variable slots taken by a method's parameters
pub fn parameter_slots(method_descriptor: &str) -> Result<u16, DescriptorError> {
    let (parameters, _) = split_method_descriptor(method_descriptor)?;
    Ok(parameters
        .iter()
        .map(|p| if matches!(p.as_bytes()[0], b'J' | b'D') { 2 } else { 1 })
        .sum())
}

/// Split a method descriptor into parameter descriptors and the return descriptor
pub fn split_method_descriptor(descriptor: &str) -> Result<(Vec<&str>, &str), DescriptorError> {
    let error = |offset| DescriptorError {
        text: descriptor.to_string(),
        offset,
    };
    let bytes = descriptor.as_bytes();
    if bytes.first() != Some(&b'(') {
        return Err(error(0));
    }

    let mut parameters = Vec::new();
    let mut pos = 1;
    while bytes.get(pos) != Some(&b')') {
        let end = field_type_end(bytes, pos).ok_or_else(|| error(pos))?;
        parameters.push(&descriptor[pos..end]);
        pos = end;
    }
    pos += 1;

    let return_end = if bytes.get(pos) == Some(&b'V') {
        pos + 1
    } else {
        field_type_end(bytes, pos).ok_or_else(|| error(pos))?
    };
    if return_end != bytes.len() {
        return Err(error(return_end));
    }
    Ok((parameters, &descriptor[pos..return_end]))
}

fn field_type_end(bytes: &[u8], pos: usize) -> Option<usize> {
    match bytes.get(pos)? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => Some(pos + 1),
        b'L' => {
            let semicolon = bytes[pos..].iter().position(|&b| b == b';')?;
            if semicolon < 2 {
                return None;
            }
            Some(pos + semicolon + 1)
        }
        b'[' => field_type_end(bytes, pos + 1),
        _ => None,
    }
}

/// Render a field descriptor the way Java source spells the type
///
/// `I` becomes `int`, `[Ljava/lang/String;` becomes `java.lang.String[]`.
pub fn java_type_name(descriptor: &str) -> Result<String, DescriptorError> {
    let error = || DescriptorError {
        text: descriptor.to_string(),
        offset: 0,
    };
    let dimensions = descriptor.bytes().take_while(|&b| b == b'[').count();
    let element = &descriptor[dimensions..];
    let base = match element {
        "V" => "void".to_string(),
        "Z" => "boolean".to_string(),
        "B" => "byte".to_string(),
        "C" => "char".to_string(),
        "S" => "short".to_string(),
        "I" => "int".to_string(),
        "J" => "long".to_string(),
        "F" => "float".to_string(),
        "D" => "double".to_string(),
        _ if element.len() > 2 && element.starts_with('L') && element.ends_with(';') => {
            internal_to_binary(&element[1..element.len() - 1])
        }
        _ => return Err(error()),
    };
    Ok(format!("{base}{}", "[]".repeat(dimensions)))
}

/// Render a method as Java source, e.g. `public static void run(int, java.lang.String)`
pub fn pretty_method(access_flags: u16, name: &str, descriptor: &str) -> Result<String, DescriptorError> {
    let (parameters, return_type) = split_method_descriptor(descriptor)?;
    let parameters = parameters
        .into_iter()
        .map(java_type_name)
        .collect::<Result<Vec<_>, _>>()?;
    let modifiers = modifiers_to_string(access_flags, MemberKind::Method);
    let mut out = String::new();
    if !modifiers.is_empty() {
        out.push_str(&modifiers);
        out.push(' ');
    }
    out.push_str(&java_type_name(return_type)?);
    out.push(' ');
    out.push_str(name);
    out.push('(');
    out.push_str(&parameters.join(", "));
    out.push(')');
    Ok(out)
}

/// Render a field as Java source, e.g. `public static final int COUNT`
pub fn pretty_field(access_flags: u16, name: &str, descriptor: &str) -> Result<String, DescriptorError> {
    let modifiers = modifiers_to_string(access_flags, MemberKind::Field);
    let type_name = java_type_name(descriptor)?;
    if modifiers.is_empty() {
        Ok(format!("{type_name} {name}"))
    } else {
        Ok(format!("{modifiers} {type_name} {name}"))
    }
}

struct SignatureScanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    classes: Vec<String>,
}

impl<'a> SignatureScanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            classes: Vec::new(),
        }
    }

    fn error(&self) -> DescriptorError {
        DescriptorError {
            text: self.text.to_string(),
            offset: self.pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, byte: u8) -> Result<(), DescriptorError> {
        if self.peek() != Some(byte) {
            return Err(self.error());
        }
        self.pos += 1;
        Ok(())
    }

    fn scan(mut self) -> Result<Vec<String>, DescriptorError> {
        if self.peek() == Some(b'<') {
            self.type_parameters()?;
        }

        if self.peek() == Some(b'(') {
            self.pos += 1;
            while self.peek() != Some(b')') {
                self.java_type()?;
            }
            self.pos += 1;
            if self.peek() == Some(b'V') {
                self.pos += 1;
            } else {
                self.java_type()?;
            }
            while self.peek() == Some(b'^') {
                self.pos += 1;
                self.reference_type()?;
            }
        } else {
            // A field type, or a class signature: superclass then interfaces
            if self.peek().is_none() {
                return Err(self.error());
            }
            while self.peek().is_some() {
                self.java_type()?;
            }
        }

        if self.pos != self.bytes.len() {
            return Err(self.error());
        }
        Ok(self.classes)
    }

    fn type_parameters(&mut self) -> Result<(), DescriptorError> {
        self.expect(b'<')?;
        while self.peek() != Some(b'>') {
            self.identifier(&[b':'])?;
            self.expect(b':')?;
            // The class bound may be empty when only interface bounds follow
            if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                self.reference_type()?;
            }
            while self.peek() == Some(b':') {
                self.pos += 1;
                self.reference_type()?;
            }
        }
        self.pos += 1;
        Ok(())
    }

    fn java_type(&mut self) -> Result<(), DescriptorError> {
        match self.peek() {
            Some(b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z') => {
                self.pos += 1;
                Ok(())
            }
            _ => self.reference_type(),
        }
    }

    fn reference_type(&mut self) -> Result<(), DescriptorError> {
        match self.peek() {
            Some(b'L') => self.class_type(),
            Some(b'T') => {
                self.pos += 1;
                self.identifier(&[b';'])?;
                self.expect(b';')
            }
            Some(b'[') => {
                self.pos += 1;
                self.java_type()
            }
            _ => Err(self.error()),
        }
    }

    fn class_type(&mut self) -> Result<(), DescriptorError> {
        self.expect(b'L')?;
        let name = self.identifier(&[b'<', b'.', b';'])?;
        if !self.classes.iter().any(|c| c == name) {
            self.classes.push(name.to_string());
        }

        loop {
            match self.peek() {
                Some(b'<') => self.type_arguments()?,
                Some(b'.') => {
                    self.pos += 1;
                    self.identifier(&[b'<', b'.', b';'])?;
                }
                Some(b';') => {
                    self.pos += 1;
                    return Ok(());
                }
                _ => return Err(self.error()),
            }
        }
    }

    fn type_arguments(&mut self) -> Result<(), DescriptorError> {
        self.expect(b'<')?;
        if self.peek() == Some(b'>') {
            return Err(self.error());
        }
        while self.peek() != Some(b'>') {
            match self.peek() {
                Some(b'*') => self.pos += 1,
                Some(b'+' | b'-') => {
                    self.pos += 1;
                    self.reference_type()?;
                }
                _ => self.reference_type()?,
            }
        }
        self.pos += 1;
        Ok(())
    }

    fn identifier(&mut self, terminators: &[u8]) -> Result<&'a str, DescriptorError> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if terminators.contains(&byte) {
                break;
            }
            if matches!(byte, b'<' | b'>' | b';' | b':' | b'.') {
                return Err(self.error());
            }
            self.pos += 1;
        }
        if self.pos == start || self.peek().is_none() {
            return Err(self.error());
        }
        Ok(&self.text[start..self.pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_referenced_classes_from_descriptor() {
        let classes = referenced_classes("(ILjava/lang/String;[Lcom/acme/Widget;J)Ljava/util/List;").unwrap();
        assert_eq!(classes, vec!["java/lang/String", "com/acme/Widget", "java/util/List"]);
    }

    #[test]
    fn test_referenced_classes_from_generic_method_signature() {
        let signature = "<T:Ljava/lang/Object;:Ljava/lang/Comparable<-TT;>;>(Ljava/util/Map<TT;+Lcom/acme/Value;>;)TT;^Lcom/acme/Failure;";
        let classes = referenced_classes(signature).unwrap();
        assert_eq!(
            classes,
            vec![
                "java/lang/Object",
                "java/lang/Comparable",
                "java/util/Map",
                "com/acme/Value",
                "com/acme/Failure",
            ]
        );
    }

    #[test]
    fn test_referenced_classes_from_class_signature() {
        let signature = "<K::Ljava/lang/Comparable<TK;>;>Lcom/acme/Base<TK;>;Ljava/io/Serializable;";
        let classes = referenced_classes(signature).unwrap();
        assert_eq!(classes, vec!["java/lang/Comparable", "com/acme/Base", "java/io/Serializable"]);
    }

    #[test]
    fn test_inner_class_types_report_outer_name_only() {
        let classes = referenced_classes("Lcom/acme/Outer<TT;>.Inner<Lcom/other/Arg;>;").unwrap();
        assert_eq!(classes, vec!["com/acme/Outer", "com/other/Arg"]);
    }

    #[test]
    fn test_duplicates_are_reported_once() {
        let classes = referenced_classes("(Lcom/a/B;Lcom/a/B;)Lcom/a/B;").unwrap();
        assert_eq!(classes, vec!["com/a/B"]);
    }

    #[test]
    fn test_primitive_and_wildcards() {
        assert!(referenced_classes("I").unwrap().is_empty());
        assert!(referenced_classes("()V").unwrap().is_empty());
        assert!(referenced_classes("Ljava/util/List<*>;").unwrap() == vec!["java/util/List"]);
    }

    #[test]
    fn test_malformed_signatures() {
        assert!(referenced_classes("").is_err());
        assert!(referenced_classes("Ljava/lang/String").is_err());
        assert!(referenced_classes("(I").is_err());
        assert!(referenced_classes("Q").is_err());
        assert!(referenced_classes("()VX").is_err());
    }

    #[test]
    fn test_parameter_slots() {
        assert_eq!(parameter_slots("()V").unwrap(), 0);
        assert_eq!(parameter_slots("(IJLjava/lang/String;D[J)V").unwrap(), 1 + 2 + 1 + 2 + 1);
        assert!(parameter_slots("(I").is_err());
    }

    #[test]
    fn test_java_type_name() {
        assert_eq!(java_type_name("I").unwrap(), "int");
        assert_eq!(java_type_name("[[Ljava/lang/String;").unwrap(), "java.lang.String[][]");
        assert_eq!(java_type_name("Lcom/acme/Outer$Inner;").unwrap(), "com.acme.Outer$Inner");
        assert!(java_type_name("L;").is_err());
    }

    #[test]
    fn test_pretty_method_and_field() {
        assert_eq!(
            pretty_method(0x0009, "run", "(ILjava/lang/String;)V").unwrap(),
            "public static void run(int, java.lang.String)"
        );
        assert_eq!(pretty_method(0, "size", "()I").unwrap(), "int size()");
        assert_eq!(
            pretty_field(0x0019, "NAME", "Ljava/lang/String;").unwrap(),
            "public static final java.lang.String NAME"
        );
    }

    #[test]
    fn test_package_of() {
        assert_eq!(package_of("com.acme.Widget"), "com.acme");
        assert_eq!(package_of("com.acme.Outer$Inner"), "com.acme");
        assert_eq!(package_of("Widget"), "");
    }
}
