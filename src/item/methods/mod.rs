//! `method_info` structures.

use std::io::{Read, Write};

use crate::binary::{Reader, Writer};
use crate::descriptor::{self, Type};
use crate::error::{ClassFileError, Result};
use crate::item::attribute_info::{self, Attribute};
use crate::item::constant_pool::{ConstantPool, MemberRef};
use crate::item::file::ClassFile;

bitflags::bitflags! {
    pub struct MethodAccessFlags: u16 {
        /// Declared public; may be accessed from outside its package.
        const ACC_PUBLIC = 0x0001;
        /// Declared private; accessible only within the defining class.
        const ACC_PRIVATE = 0x0002;
        /// Declared protected; may be accessed within subclasses.
        const ACC_PROTECTED = 0x0004;
        /// Declared static.
        const ACC_STATIC = 0x0008;
        /// Declared final; must not be overridden.
        const ACC_FINAL = 0x0010;
        /// Declared synchronized; invocation is wrapped by a monitor lock.
        const ACC_SYNCHRONIZED = 0x0020;
        /// A bridge method, generated by the compiler.
        const ACC_BRIDGE = 0x0040;
        /// Declared with a variable number of arguments.
        const ACC_VARARGS = 0x0080;
        /// Declared native; implemented in a language other than Java.
        const ACC_NATIVE = 0x0100;
        /// Declared abstract; no implementation is provided.
        const ACC_ABSTRACT = 0x0400;
        /// Declared strictfp.
        const ACC_STRICT = 0x0800;
        /// Declared synthetic; not present in the source code.
        const ACC_SYNTHETIC = 0x1000;
    }
}

/// A method declared by a class or interface, fully resolved: name and
/// descriptor are parsed into their own types at read time rather than
/// kept as raw indices or a plain descriptor string.
#[derive(Debug, Clone)]
pub struct MethodInfo {
    pub access_flags: MethodAccessFlags,
    pub name: String,
    pub parameters: Vec<Type>,
    pub return_type: Option<Type>,
    pub attributes: Vec<Attribute>,
}

impl MethodInfo {
    pub fn read<R: Read>(pool: &ConstantPool, r: &mut Reader<R>) -> Result<Self> {
        let access_flags = MethodAccessFlags::from_bits(r.read_u16()?)
            .ok_or(ClassFileError::BadAccessFlags("method"))?;
        let name = pool.get_utf8(r.read_u16()?)?;
        let descriptor_text = pool.get_utf8(r.read_u16()?)?;
        let (parameters, return_type) = descriptor::parse_method_descriptor(&descriptor_text)?;
        let attributes = attribute_info::read_attributes(pool, r)?;
        Ok(Self {
            access_flags,
            name,
            parameters,
            return_type,
            attributes,
        })
    }

    fn descriptor_text(&self) -> String {
        descriptor::format_method_descriptor(&self.parameters, self.return_type.as_ref())
    }

    pub(crate) fn materialize(&self, pool: &mut ConstantPool) {
        pool.add_utf8(&self.name);
        pool.add_utf8(&self.descriptor_text());
        for attribute in &self.attributes {
            attribute.materialize(pool);
        }
    }

    pub fn write<W: Write>(&self, pool: &mut ConstantPool, w: &mut Writer<W>) -> Result<()> {
        w.write_u16(self.access_flags.bits())?;
        w.write_u16(pool.add_utf8(&self.name))?;
        w.write_u16(pool.add_utf8(&self.descriptor_text()))?;
        attribute_info::write_attributes(&self.attributes, pool, w)
    }

    /// This method as a symbolic reference to itself, as it would appear in
    /// another class's constant pool (an `invokevirtual` operand, say).
    pub fn reference(&self, owner: &ClassFile) -> MemberRef {
        MemberRef {
            class: owner.this_class.clone(),
            name: self.name.clone(),
            descriptor: self.descriptor_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_uses_owner_class_name() {
        let owner = ClassFile::new("com/example/Foo".to_string());
        let method = MethodInfo {
            access_flags: MethodAccessFlags::ACC_PUBLIC,
            name: "bar".to_string(),
            parameters: vec![Type::Int],
            return_type: None,
            attributes: vec![],
        };
        let member = method.reference(&owner);
        assert_eq!(member.class, "com/example/Foo");
        assert_eq!(member.name, "bar");
        assert_eq!(member.descriptor, "(I)V");
    }
}
