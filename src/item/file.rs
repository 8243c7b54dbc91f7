use std::io::{Read, Write};

use crate::binary::{Reader, Writer};
use crate::error::{ClassFileError, Result};

use super::attribute_info::{self, Attribute};
use super::fields::FieldInfo;
use super::methods::MethodInfo;
pub use super::constant_pool::ConstantPool;

/// The magic number of a class file.
pub const CLASS_MAGIC: u32 = 0xCAFEBABE;

bitflags::bitflags! {
    pub struct ClassAccessFlags: u16 {
        /// Declared public; may be accessed from outside its package.
        const ACC_PUBLIC = 0x0001;
        /// Declared final; no subclasses allowed.
        const ACC_FINAL = 0x0010;
        /// Treat superclass methods specially when invoked by the invokespecial instruction.
        const ACC_SUPER = 0x0020;
        /// Is an interface, not a class.
        const ACC_INTERFACE = 0x0200;
        /// Declared abstract; must not be instantiated.
        const ACC_ABSTRACT = 0x0400;
        /// Declared synthetic; not present in the source code.
        const ACC_SYNTHETIC = 0x1000;
        /// Declared as an annotation type.
        const ACC_ANNOTATION = 0x2000;
        /// Declared as an enum type.
        const ACC_ENUM = 0x4000;
    }
}



/// A class file, fully resolved: `this_class`/`super_class`/`interfaces`
/// are plain class names rather than pool indices, looked up once at read
/// time rather than dereferenced by callers on every access.
#[derive(Debug, Clone)]
pub struct ClassFile {
    /// Class file format version, as `(major, minor)`.
    pub version: (u16, u16),
    pub constant_pool: ConstantPool,
    pub access_flags: ClassAccessFlags,
    /// This class or interface's internal (slash-separated) name.
    pub this_class: String,
    /// The direct superclass's internal name. `None` only for `Object`,
    /// the one class without a superclass.
    pub super_class: Option<String>,
    /// Direct superinterfaces, in declaration order.
    pub interfaces: Vec<String>,
    pub fields: Vec<FieldInfo>,
    pub methods: Vec<MethodInfo>,
    pub attributes: Vec<Attribute>,
}

impl ClassFile {
    /// A minimal class file extending `java/lang/Object`, with an empty
    /// pool and no members: the starting point for building one up with
    /// [`ConstantPool::add`] and friends.
    pub fn new(this_class: String) -> Self {
        Self {
            version: (52, 0),
            constant_pool: ConstantPool::new(),
            access_flags: ClassAccessFlags::ACC_PUBLIC | ClassAccessFlags::ACC_SUPER,
            this_class,
            super_class: Some("java/lang/Object".to_string()),
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        let mut reader = Reader::new(r);

        let magic = reader.read_u32()?;
        if magic != CLASS_MAGIC {
            return Err(ClassFileError::BadMagicNumber(magic));
        }

        let minor_version = reader.read_u16()?;
        let major_version = reader.read_u16()?;

        let constant_pool = ConstantPool::read(major_version, &mut reader)?;

        let access_flags = ClassAccessFlags::from_bits(reader.read_u16()?)
            .ok_or(ClassFileError::BadAccessFlags("class"))?;

        let this_class_index = reader.read_u16()?;
        let this_class = class_name(&constant_pool, this_class_index)?;

        let super_class_index = reader.read_u16()?;
        let super_class = if super_class_index == 0 {
            None
        } else {
            Some(class_name(&constant_pool, super_class_index)?)
        };

        let interfaces_count = reader.read_u16()?;
        let mut interfaces = Vec::with_capacity(interfaces_count as usize);
        for _ in 0..interfaces_count {
            interfaces.push(class_name(&constant_pool, reader.read_u16()?)?);
        }

        let fields_count = reader.read_u16()?;
        let mut fields = Vec::with_capacity(fields_count as usize);
        for _ in 0..fields_count {
            fields.push(FieldInfo::read(&constant_pool, &mut reader)?);
        }

        let methods_count = reader.read_u16()?;
        let mut methods = Vec::with_capacity(methods_count as usize);
        for _ in 0..methods_count {
            methods.push(MethodInfo::read(&constant_pool, &mut reader)?);
        }

        let attributes = attribute_info::read_attributes(&constant_pool, &mut reader)?;

        Ok(Self {
            version: (major_version, minor_version),
            constant_pool,
            access_flags,
            this_class,
            super_class,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    /// Write this class file. Structural references (`this_class`, field
    /// and method names/descriptors, attribute names, ...) are materialized
    /// into the pool *before* the pool itself is serialized, so that by the
    /// time `constant_pool.write` runs, every index this class file's
    /// bytes will mention already has a stable slot.
    pub fn write<W: Write>(&mut self, w: &mut W) -> Result<()> {
        let mut writer = Writer::new(w);

        writer.write_u32(CLASS_MAGIC)?;
        writer.write_u16(self.version.1)?;
        writer.write_u16(self.version.0)?;

        let this_class_idx = self.constant_pool.add_class(&self.this_class);
        let super_class_idx = match &self.super_class {
            Some(name) => self.constant_pool.add_class(name),
            None => 0,
        };
        let interface_idxs: Vec<u16> = self
            .interfaces
            .iter()
            .map(|name| self.constant_pool.add_class(name))
            .collect();
        for field in &self.fields {
            field.materialize(&mut self.constant_pool);
        }
        for method in &self.methods {
            method.materialize(&mut self.constant_pool);
        }
        for attribute in &self.attributes {
            attribute.materialize(&mut self.constant_pool);
        }

        self.constant_pool.write(&mut writer)?;

        writer.write_u16(self.access_flags.bits())?;
        writer.write_u16(this_class_idx)?;
        writer.write_u16(super_class_idx)?;
        writer.write_u16(interface_idxs.len() as u16)?;
        for idx in interface_idxs {
            writer.write_u16(idx)?;
        }

        writer.write_u16(self.fields.len() as u16)?;
        for field in &self.fields {
            field.write(&mut self.constant_pool, &mut writer)?;
        }

        writer.write_u16(self.methods.len() as u16)?;
        for method in &self.methods {
            method.write(&mut self.constant_pool, &mut writer)?;
        }

        attribute_info::write_attributes(&self.attributes, &mut self.constant_pool, &mut writer)
    }
}

fn class_name(pool: &ConstantPool, index: u16) -> Result<String> {
    match pool.require(index)? {
        super::constant_pool::Constant::Class(name) => Ok(name),
        other => Err(ClassFileError::KindMismatch {
            expected: "Class",
            actual: other.kind_name(),
            at_index: index,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_minimal_class_file() {
        let mut class_file = ClassFile::new("com/example/Minimal".to_string());

        let mut bytes = Vec::new();
        class_file.write(&mut bytes).unwrap();

        let read_back = ClassFile::read(&mut std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(read_back.this_class, "com/example/Minimal");
        assert_eq!(read_back.super_class.as_deref(), Some("java/lang/Object"));
        assert!(read_back.fields.is_empty());
        assert!(read_back.methods.is_empty());
    }

    #[test]
    fn rejects_bad_magic_number() {
        let bytes = vec![0u8; 16];
        assert!(matches!(
            ClassFile::read(&mut std::io::Cursor::new(bytes)),
            Err(ClassFileError::BadMagicNumber(0))
        ));
    }
}
