//! Attributes, modeled as opaque byte blobs keyed by a UTF-8 name constant.
//!
//! The class file format defines dozens of well-known attributes (`Code`,
//! `LineNumberTable`, `StackMapTable`, annotation tables, and more), each
//! with its own internal layout. Interpreting those layouts is out of
//! scope here; an `Attribute` is read and written as `name` plus its raw
//! `info` bytes, letting callers that care about a specific attribute's
//! internal structure parse `info` themselves.

use std::io::{Read, Write};

use crate::binary::{Reader, Writer};
use crate::error::Result;
use crate::item::constant_pool::ConstantPool;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub info: Vec<u8>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, info: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            info,
        }
    }

    fn read<R: Read>(pool: &ConstantPool, r: &mut Reader<R>) -> Result<Self> {
        let name_index = r.read_u16()?;
        let name = pool.get_utf8(name_index)?;
        let length = r.read_u32()? as usize;
        let info = r.read_bytes(length)?;
        Ok(Self { name, info })
    }

    pub(crate) fn materialize(&self, pool: &mut ConstantPool) {
        pool.add_utf8(&self.name);
    }

    fn write<W: Write>(&self, pool: &mut ConstantPool, w: &mut Writer<W>) -> Result<()> {
        let name_index = pool.add_utf8(&self.name);
        w.write_u16(name_index)?;
        w.write_u32(self.info.len() as u32)?;
        w.write_bytes(&self.info)
    }
}

pub(crate) fn read_attributes<R: Read>(
    pool: &ConstantPool,
    r: &mut Reader<R>,
) -> Result<Vec<Attribute>> {
    let count = r.read_u16()?;
    (0..count).map(|_| Attribute::read(pool, r)).collect()
}

pub(crate) fn write_attributes<W: Write>(
    attributes: &[Attribute],
    pool: &mut ConstantPool,
    w: &mut Writer<W>,
) -> Result<()> {
    w.write_u16(attributes.len() as u16)?;
    for attribute in attributes {
        attribute.write(pool, w)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_an_attribute_blob() {
        let mut pool = ConstantPool::new();
        let attrs = vec![Attribute::new("Synthetic", vec![])];

        let mut buf = Vec::new();
        {
            let mut w = Writer::new(&mut buf);
            write_attributes(&attrs, &mut pool, &mut w).unwrap();
        }
        let mut cursor = Cursor::new(buf);
        let mut r = Reader::new(&mut cursor);
        let read_back = read_attributes(&pool, &mut r).unwrap();
        assert_eq!(read_back, attrs);
    }
}
