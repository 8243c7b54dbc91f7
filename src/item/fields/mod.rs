//! `field_info` structures.

use std::io::{Read, Write};

use crate::binary::{Reader, Writer};
use crate::descriptor::{self, Type};
use crate::error::{ClassFileError, Result};
use crate::item::attribute_info::{self, Attribute};
use crate::item::constant_pool::{ConstantPool, MemberRef};
use crate::item::file::ClassFile;

bitflags::bitflags! {
    pub struct FieldAccessFlags: u16 {
        /// Declared public; may be accessed from outside its package.
        const ACC_PUBLIC = 0x0001;
        /// Declared private; usable only within the defining class.
        const ACC_PRIVATE = 0x0002;
        /// Declared protected; may be accessed within subclasses.
        const ACC_PROTECTED = 0x0004;
        /// Declared static.
        const ACC_STATIC = 0x0008;
        /// Declared final; never directly assigned to after object construction.
        const ACC_FINAL = 0x0010;
        /// Declared volatile; cannot be cached.
        const ACC_VOLATILE = 0x0040;
        /// Declared transient; not written or read by a persistent object manager.
        const ACC_TRANSIENT = 0x0080;
        /// Declared synthetic; not present in the source code.
        const ACC_SYNTHETIC = 0x1000;
        /// Declared as an element of an enum.
        const ACC_ENUM = 0x4000;
    }
}

/// A field declared by a class or interface, fully resolved: `name` and
/// `descriptor` are looked up from the constant pool at read time rather
/// than kept as raw indices.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub access_flags: FieldAccessFlags,
    pub name: String,
    pub descriptor: Type,
    pub attributes: Vec<Attribute>,
}

impl FieldInfo {
    pub fn read<R: Read>(pool: &ConstantPool, r: &mut Reader<R>) -> Result<Self> {
        let access_flags = FieldAccessFlags::from_bits(r.read_u16()?)
            .ok_or(ClassFileError::BadAccessFlags("field"))?;
        let name = pool.get_utf8(r.read_u16()?)?;
        let descriptor_text = pool.get_utf8(r.read_u16()?)?;
        let descriptor = descriptor::parse_field_descriptor(&descriptor_text)?;
        let attributes = attribute_info::read_attributes(pool, r)?;
        Ok(Self {
            access_flags,
            name,
            descriptor,
            attributes,
        })
    }

    pub(crate) fn materialize(&self, pool: &mut ConstantPool) {
        pool.add_utf8(&self.name);
        pool.add_utf8(&self.descriptor.to_descriptor());
        for attribute in &self.attributes {
            attribute.materialize(pool);
        }
    }

    pub fn write<W: Write>(&self, pool: &mut ConstantPool, w: &mut Writer<W>) -> Result<()> {
        w.write_u16(self.access_flags.bits())?;
        w.write_u16(pool.add_utf8(&self.name))?;
        w.write_u16(pool.add_utf8(&self.descriptor.to_descriptor()))?;
        attribute_info::write_attributes(&self.attributes, pool, w)
    }

    /// This field as a symbolic reference to itself, as it would appear in
    /// another class's constant pool (a `getfield`/`putfield` operand, say).
    pub fn reference(&self, owner: &ClassFile) -> MemberRef {
        MemberRef {
            class: owner.this_class.clone(),
            name: self.name.clone(),
            descriptor: self.descriptor.to_descriptor(),
        }
    }
}
