//! Field and method descriptor parsing.
//!
//! Descriptor/signature grammar is an external collaborator of the core
//! (spec-wise it is "consumed as a pure function"); these two functions are
//! a minimal implementation of that boundary — just enough to populate
//! [`crate::item::fields::FieldInfo`] and [`crate::item::methods::MethodInfo`]
//! with parsed types, not a general-purpose signature/generics engine.

use crate::error::{ClassFileError, Result};

/// A JVM field type: either scalar, a reference, or an array of one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    /// Internal (slash-separated) class name, without the leading `L` or
    /// trailing `;`.
    Object(String),
    Array(Box<Type>),
}

fn parse_one(chars: &mut std::iter::Peekable<std::str::Chars>, whole: &str) -> Result<Type> {
    match chars.next() {
        Some('B') => Ok(Type::Byte),
        Some('C') => Ok(Type::Char),
        Some('D') => Ok(Type::Double),
        Some('F') => Ok(Type::Float),
        Some('I') => Ok(Type::Int),
        Some('J') => Ok(Type::Long),
        Some('S') => Ok(Type::Short),
        Some('Z') => Ok(Type::Boolean),
        Some('[') => Ok(Type::Array(Box::new(parse_one(chars, whole)?))),
        Some('L') => {
            let mut name = String::new();
            loop {
                match chars.next() {
                    Some(';') => break,
                    Some(c) => name.push(c),
                    None => return Err(ClassFileError::InvalidDescriptor(whole.to_string())),
                }
            }
            if name.is_empty() {
                return Err(ClassFileError::InvalidDescriptor(whole.to_string()));
            }
            Ok(Type::Object(name))
        }
        _ => Err(ClassFileError::InvalidDescriptor(whole.to_string())),
    }
}

/// Parse a field descriptor, e.g. `"I"`, `"[[Ljava/lang/String;"`.
pub fn parse_field_descriptor(descriptor: &str) -> Result<Type> {
    let mut chars = descriptor.chars().peekable();
    let ty = parse_one(&mut chars, descriptor)?;
    if chars.next().is_some() {
        return Err(ClassFileError::InvalidDescriptor(descriptor.to_string()));
    }
    Ok(ty)
}

impl Type {
    /// Render back to descriptor notation, e.g. `Type::Int` to `"I"`.
    pub fn to_descriptor(&self) -> String {
        match self {
            Type::Byte => "B".to_string(),
            Type::Char => "C".to_string(),
            Type::Double => "D".to_string(),
            Type::Float => "F".to_string(),
            Type::Int => "I".to_string(),
            Type::Long => "J".to_string(),
            Type::Short => "S".to_string(),
            Type::Boolean => "Z".to_string(),
            Type::Object(name) => format!("L{name};"),
            Type::Array(element) => format!("[{}", element.to_descriptor()),
        }
    }
}

/// Render a method's parameter and return types back to descriptor
/// notation, e.g. `"()V"`.
pub fn format_method_descriptor(parameters: &[Type], return_type: Option<&Type>) -> String {
    let mut out = String::from("(");
    for param in parameters {
        out.push_str(&param.to_descriptor());
    }
    out.push(')');
    match return_type {
        Some(ty) => out.push_str(&ty.to_descriptor()),
        None => out.push('V'),
    }
    out
}

/// Parse a method descriptor, e.g. `"(IDLjava/lang/Thread;)Ljava/lang/Object;"`,
/// returning its argument types and return type (`None` for `void`).
pub fn parse_method_descriptor(descriptor: &str) -> Result<(Vec<Type>, Option<Type>)> {
    let mut chars = descriptor.chars().peekable();
    if chars.next() != Some('(') {
        return Err(ClassFileError::InvalidDescriptor(descriptor.to_string()));
    }
    let mut args = Vec::new();
    loop {
        match chars.peek() {
            Some(')') => {
                chars.next();
                break;
            }
            Some(_) => args.push(parse_one(&mut chars, descriptor)?),
            None => return Err(ClassFileError::InvalidDescriptor(descriptor.to_string())),
        }
    }
    let ret = match chars.peek() {
        Some('V') => {
            chars.next();
            None
        }
        Some(_) => Some(parse_one(&mut chars, descriptor)?),
        None => return Err(ClassFileError::InvalidDescriptor(descriptor.to_string())),
    };
    if chars.next().is_some() {
        return Err(ClassFileError::InvalidDescriptor(descriptor.to_string()));
    }
    Ok((args, ret))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_scalar_field() {
        assert_eq!(parse_field_descriptor("I").unwrap(), Type::Int);
    }

    #[test]
    fn parses_nested_array_of_object() {
        let ty = parse_field_descriptor("[[Ljava/lang/String;").unwrap();
        assert_eq!(
            ty,
            Type::Array(Box::new(Type::Array(Box::new(Type::Object(
                "java/lang/String".to_string()
            )))))
        );
    }

    #[test]
    fn rejects_unterminated_object() {
        assert!(parse_field_descriptor("Ljava/lang/String").is_err());
    }

    #[test]
    fn parses_method_descriptor() {
        let (args, ret) =
            parse_method_descriptor("(IDLjava/lang/Thread;)Ljava/lang/Object;").unwrap();
        assert_eq!(
            args,
            vec![
                Type::Int,
                Type::Double,
                Type::Object("java/lang/Thread".to_string())
            ]
        );
        assert_eq!(ret, Some(Type::Object("java/lang/Object".to_string())));
    }

    #[test]
    fn parses_void_return() {
        let (args, ret) = parse_method_descriptor("()V").unwrap();
        assert!(args.is_empty());
        assert_eq!(ret, None);
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse_method_descriptor("()Vx").is_err());
    }

    #[test]
    fn formats_round_trip_method_descriptor() {
        let text = "(IDLjava/lang/Thread;)Ljava/lang/Object;";
        let (args, ret) = parse_method_descriptor(text).unwrap();
        assert_eq!(format_method_descriptor(&args, ret.as_ref()), text);
    }

    #[test]
    fn formats_array_descriptor() {
        let ty = Type::Array(Box::new(Type::Int));
        assert_eq!(ty.to_descriptor(), "[I");
    }
}
