//! The class-file structural model: the constant pool, the top-level
//! `ClassFile` container, and the field/method/attribute tables it holds.

pub mod attribute_info;
pub mod constant_pool;
pub mod fields;
pub mod file;
pub mod methods;

pub use constant_pool::ConstantPool;
pub use file::ClassFile;
