//! The resolved constant taxonomy: tags, version gating, and the
//! deferred/dereference machinery that lets reference-bearing constants
//! be read out of order.

use std::hash::{Hash, Hasher};
use std::io::{Read, Write};

use fnv::FnvHashMap;

use crate::binary::{Reader, Writer};
use crate::error::{ClassFileError, Result};

use super::ConstantPool;

pub mod tag {
    pub const UTF8: u8 = 1;
    pub const INTEGER: u8 = 3;
    pub const FLOAT: u8 = 4;
    pub const LONG: u8 = 5;
    pub const DOUBLE: u8 = 6;
    pub const CLASS: u8 = 7;
    pub const STRING: u8 = 8;
    pub const FIELD_REF: u8 = 9;
    pub const METHOD_REF: u8 = 10;
    pub const INTERFACE_METHOD_REF: u8 = 11;
    pub const NAME_AND_TYPE: u8 = 12;
    pub const METHOD_HANDLE: u8 = 15;
    pub const METHOD_TYPE: u8 = 16;
    pub const DYNAMIC: u8 = 17;
    pub const INVOKE_DYNAMIC: u8 = 18;
    pub const MODULE: u8 = 19;
    pub const PACKAGE: u8 = 20;
}

/// A symbolic class/field/method reference: owning class's internal name,
/// member name, and descriptor, fully resolved (no pool indices).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberRef {
    pub class: String,
    pub name: String,
    pub descriptor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NameAndType {
    pub name: String,
    pub descriptor: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dynamic {
    pub bootstrap_method_attr_index: u16,
    pub name: String,
    pub descriptor: String,
}

/// `CONSTANT_MethodHandle_info`'s `reference_kind` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    GetField = 1,
    GetStatic = 2,
    PutField = 3,
    PutStatic = 4,
    InvokeVirtual = 5,
    InvokeStatic = 6,
    InvokeSpecial = 7,
    NewInvokeSpecial = 8,
    InvokeInterface = 9,
}

impl RefKind {
    pub fn decode(v: u8) -> Result<Self> {
        Ok(match v {
            1 => Self::GetField,
            2 => Self::GetStatic,
            3 => Self::PutField,
            4 => Self::PutStatic,
            5 => Self::InvokeVirtual,
            6 => Self::InvokeStatic,
            7 => Self::InvokeSpecial,
            8 => Self::NewInvokeSpecial,
            9 => Self::InvokeInterface,
            _ => return Err(ClassFileError::UnknownReferenceKind(v)),
        })
    }

    pub fn value(self) -> u8 {
        self as u8
    }
}

/// What kind of member a `MethodHandle`'s referent actually is. The JVM
/// spec requires this to agree with `reference_kind`, but we resolve
/// whatever ref-like constant is actually at the index and let callers
/// judge consistency rather than rejecting handles the JVM itself accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferentKind {
    Field,
    Method,
    InterfaceMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodHandle {
    pub kind: RefKind,
    pub referent_kind: ReferentKind,
    pub referent: MemberRef,
}

/// A fully-resolved constant pool entry. Reference-bearing variants carry
/// their referents inline (class names, member refs) rather than raw pool
/// indices, so two constants with the same meaning compare equal
/// regardless of the order their dependencies were added to the pool.
#[derive(Debug, Clone)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class(String),
    String(String),
    FieldRef(MemberRef),
    MethodRef(MemberRef),
    InterfaceMethodRef(MemberRef),
    NameAndType(NameAndType),
    MethodHandle(MethodHandle),
    MethodType(String),
    Dynamic(Dynamic),
    InvokeDynamic(Dynamic),
    Module(String),
    Package(String),
    /// A pool position with no resident constant, surfaced by
    /// [`ConstantPool::get`] on a non-raising lookup. Never actually
    /// installed into the pool and never written.
    Index(u16),
}

impl PartialEq for Constant {
    fn eq(&self, other: &Self) -> bool {
        use Constant::*;
        match (self, other) {
            (Utf8(a), Utf8(b)) => a == b,
            (Integer(a), Integer(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Long(a), Long(b)) => a == b,
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (Class(a), Class(b)) => a == b,
            (String(a), String(b)) => a == b,
            (FieldRef(a), FieldRef(b)) => a == b,
            (MethodRef(a), MethodRef(b)) => a == b,
            (InterfaceMethodRef(a), InterfaceMethodRef(b)) => a == b,
            (NameAndType(a), NameAndType(b)) => a == b,
            (MethodHandle(a), MethodHandle(b)) => a == b,
            (MethodType(a), MethodType(b)) => a == b,
            (Dynamic(a), Dynamic(b)) => a == b,
            (InvokeDynamic(a), InvokeDynamic(b)) => a == b,
            (Module(a), Module(b)) => a == b,
            (Package(a), Package(b)) => a == b,
            (Index(a), Index(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Constant {}

impl Hash for Constant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        use Constant::*;
        std::mem::discriminant(self).hash(state);
        match self {
            Utf8(s) | Class(s) | String(s) | MethodType(s) | Module(s) | Package(s) => {
                s.hash(state)
            }
            Integer(v) => v.hash(state),
            Float(v) => v.to_bits().hash(state),
            Long(v) => v.hash(state),
            Double(v) => v.to_bits().hash(state),
            FieldRef(m) | MethodRef(m) | InterfaceMethodRef(m) => m.hash(state),
            NameAndType(n) => n.hash(state),
            MethodHandle(m) => m.hash(state),
            Dynamic(d) | InvokeDynamic(d) => d.hash(state),
            Index(i) => i.hash(state),
        }
    }
}

impl Constant {
    pub(crate) fn tag(&self) -> u8 {
        use Constant::*;
        match self {
            Utf8(_) => tag::UTF8,
            Integer(_) => tag::INTEGER,
            Float(_) => tag::FLOAT,
            Long(_) => tag::LONG,
            Double(_) => tag::DOUBLE,
            Class(_) => tag::CLASS,
            String(_) => tag::STRING,
            FieldRef(_) => tag::FIELD_REF,
            MethodRef(_) => tag::METHOD_REF,
            InterfaceMethodRef(_) => tag::INTERFACE_METHOD_REF,
            NameAndType(_) => tag::NAME_AND_TYPE,
            MethodHandle(_) => tag::METHOD_HANDLE,
            MethodType(_) => tag::METHOD_TYPE,
            Dynamic(_) => tag::DYNAMIC,
            InvokeDynamic(_) => tag::INVOKE_DYNAMIC,
            Module(_) => tag::MODULE,
            Package(_) => tag::PACKAGE,
            Index(_) => unreachable!("Index is never installed into a pool"),
        }
    }

    /// Name used in error messages (`KindMismatch`).
    pub(crate) fn kind_name(&self) -> &'static str {
        use Constant::*;
        match self {
            Utf8(_) => "Utf8",
            Integer(_) => "Integer",
            Float(_) => "Float",
            Long(_) => "Long",
            Double(_) => "Double",
            Class(_) => "Class",
            String(_) => "String",
            FieldRef(_) => "FieldRef",
            MethodRef(_) => "MethodRef",
            InterfaceMethodRef(_) => "InterfaceMethodRef",
            NameAndType(_) => "NameAndType",
            MethodHandle(_) => "MethodHandle",
            MethodType(_) => "MethodType",
            Dynamic(_) => "Dynamic",
            InvokeDynamic(_) => "InvokeDynamic",
            Module(_) => "Module",
            Package(_) => "Package",
            Index(_) => "Index",
        }
    }

    pub(crate) fn is_wide(&self) -> bool {
        matches!(self, Constant::Long(_) | Constant::Double(_))
    }

    /// Write this constant's tag and payload.
    ///
    /// `origin` is the [`Deferred`] this constant was originally decoded
    /// from, if it came from [`ConstantPool::read`] rather than [`ConstantPool::add`].
    /// When present, its raw indices are written back verbatim instead of
    /// re-deriving them through `pool.add`'s value-based dedup — two
    /// structurally-equal constants that legitimately occupy distinct
    /// indices in the source file (redundant, but not illegal) must not be
    /// silently collapsed onto one index on write. Only constants built
    /// fresh through `pool.add` (no known origin) fall back to dedup, since
    /// there's no original index to be faithful to.
    pub(crate) fn write<W: Write>(
        &self,
        origin: Option<&Deferred>,
        pool: &mut ConstantPool,
        w: &mut Writer<W>,
    ) -> Result<()> {
        w.write_u8(self.tag())?;
        match self {
            Constant::Utf8(s) => w.write_mutf8(s),
            Constant::Integer(v) => w.write_i32(*v),
            Constant::Float(v) => w.write_f32(*v),
            Constant::Long(v) => w.write_i64(*v),
            Constant::Double(v) => w.write_f64(*v),
            Constant::Class(name) => {
                let idx = match origin {
                    Some(Deferred::Class { name_index }) => *name_index,
                    _ => pool.add_utf8(name),
                };
                w.write_u16(idx)
            }
            Constant::String(s) => {
                let idx = match origin {
                    Some(Deferred::String { string_index }) => *string_index,
                    _ => pool.add_utf8(s),
                };
                w.write_u16(idx)
            }
            Constant::FieldRef(m) => {
                let origin_pair = match origin {
                    Some(Deferred::FieldRef { class_index, nat_index }) => {
                        Some((*class_index, *nat_index))
                    }
                    _ => None,
                };
                write_member_ref(m, origin_pair, pool, w)
            }
            Constant::MethodRef(m) => {
                let origin_pair = match origin {
                    Some(Deferred::MethodRef { class_index, nat_index }) => {
                        Some((*class_index, *nat_index))
                    }
                    _ => None,
                };
                write_member_ref(m, origin_pair, pool, w)
            }
            Constant::InterfaceMethodRef(m) => {
                let origin_pair = match origin {
                    Some(Deferred::InterfaceMethodRef { class_index, nat_index }) => {
                        Some((*class_index, *nat_index))
                    }
                    _ => None,
                };
                write_member_ref(m, origin_pair, pool, w)
            }
            Constant::NameAndType(n) => {
                let (name_idx, descriptor_idx) = match origin {
                    Some(Deferred::NameAndType { name_index, descriptor_index }) => {
                        (*name_index, *descriptor_index)
                    }
                    _ => (pool.add_utf8(&n.name), pool.add_utf8(&n.descriptor)),
                };
                w.write_u16(name_idx)?;
                w.write_u16(descriptor_idx)
            }
            Constant::MethodHandle(mh) => {
                w.write_u8(mh.kind.value())?;
                let idx = match origin {
                    Some(Deferred::MethodHandle { ref_index, .. }) => *ref_index,
                    _ => {
                        let member_const = match mh.referent_kind {
                            ReferentKind::Field => Constant::FieldRef(mh.referent.clone()),
                            ReferentKind::Method => Constant::MethodRef(mh.referent.clone()),
                            ReferentKind::InterfaceMethod => {
                                Constant::InterfaceMethodRef(mh.referent.clone())
                            }
                        };
                        pool.add(member_const)
                    }
                };
                w.write_u16(idx)
            }
            Constant::MethodType(descriptor) => {
                let idx = match origin {
                    Some(Deferred::MethodType { descriptor_index }) => *descriptor_index,
                    _ => pool.add_utf8(descriptor),
                };
                w.write_u16(idx)
            }
            Constant::Dynamic(d) => {
                let (bootstrap_idx, nat_idx) = match origin {
                    Some(Deferred::Dynamic { bootstrap_index, nat_index }) => {
                        (*bootstrap_index, *nat_index)
                    }
                    _ => (d.bootstrap_method_attr_index, add_name_and_type(d, pool)),
                };
                w.write_u16(bootstrap_idx)?;
                w.write_u16(nat_idx)
            }
            Constant::InvokeDynamic(d) => {
                let (bootstrap_idx, nat_idx) = match origin {
                    Some(Deferred::InvokeDynamic { bootstrap_index, nat_index }) => {
                        (*bootstrap_index, *nat_index)
                    }
                    _ => (d.bootstrap_method_attr_index, add_name_and_type(d, pool)),
                };
                w.write_u16(bootstrap_idx)?;
                w.write_u16(nat_idx)
            }
            Constant::Module(name) => {
                let idx = match origin {
                    Some(Deferred::Module { name_index }) => *name_index,
                    _ => pool.add_utf8(name),
                };
                w.write_u16(idx)
            }
            Constant::Package(name) => {
                let idx = match origin {
                    Some(Deferred::Package { name_index }) => *name_index,
                    _ => pool.add_utf8(name),
                };
                w.write_u16(idx)
            }
            Constant::Index(_) => unreachable!("Index is never installed into a pool"),
        }
    }
}

fn write_member_ref<W: Write>(
    m: &MemberRef,
    origin: Option<(u16, u16)>,
    pool: &mut ConstantPool,
    w: &mut Writer<W>,
) -> Result<()> {
    let (class_idx, nat_idx) = match origin {
        Some(pair) => pair,
        None => (
            pool.add(Constant::Class(m.class.clone())),
            pool.add(Constant::NameAndType(NameAndType {
                name: m.name.clone(),
                descriptor: m.descriptor.clone(),
            })),
        ),
    };
    w.write_u16(class_idx)?;
    w.write_u16(nat_idx)
}

fn add_name_and_type(d: &Dynamic, pool: &mut ConstantPool) -> u16 {
    pool.add(Constant::NameAndType(NameAndType {
        name: d.name.clone(),
        descriptor: d.descriptor.clone(),
    }))
}

/// A constant read from the stream whose referents hadn't yet been
/// resolved at read time. Re-tried by the pool's fix-up loop.
#[derive(Debug, Clone)]
pub(crate) enum Deferred {
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, nat_index: u16 },
    MethodRef { class_index: u16, nat_index: u16 },
    InterfaceMethodRef { class_index: u16, nat_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { kind: RefKind, ref_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_index: u16, nat_index: u16 },
    InvokeDynamic { bootstrap_index: u16, nat_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
}

pub(crate) enum ReadOutcome {
    Resolved(Constant),
    Deferred(Deferred),
}

pub(crate) enum DerefOutcome {
    Resolved(Constant),
    Pending,
}

fn tag_info(tag: u8) -> Result<(&'static str, u16)> {
    Ok(match tag {
        tag::UTF8 => ("Utf8", 45),
        tag::INTEGER => ("Integer", 45),
        tag::FLOAT => ("Float", 45),
        tag::LONG => ("Long", 45),
        tag::DOUBLE => ("Double", 45),
        tag::CLASS => ("Class", 45),
        tag::STRING => ("String", 45),
        tag::FIELD_REF => ("FieldRef", 45),
        tag::METHOD_REF => ("MethodRef", 45),
        tag::INTERFACE_METHOD_REF => ("InterfaceMethodRef", 45),
        tag::NAME_AND_TYPE => ("NameAndType", 45),
        tag::METHOD_HANDLE => ("MethodHandle", 51),
        tag::METHOD_TYPE => ("MethodType", 51),
        tag::DYNAMIC => ("Dynamic", 55),
        tag::INVOKE_DYNAMIC => ("InvokeDynamic", 51),
        tag::MODULE => ("Module", 53),
        tag::PACKAGE => ("Package", 53),
        _ => return Err(ClassFileError::UnknownConstantTag(tag)),
    })
}

pub(crate) fn is_wide(tag: u8) -> bool {
    matches!(tag, tag::LONG | tag::DOUBLE)
}

/// Read one constant pool entry's tag byte and payload, resolving it
/// immediately if it has no referents, else returning a [`Deferred`] for
/// the pool's fix-up loop.
pub(crate) fn decode_entry<R: Read>(
    tag: u8,
    major_version: u16,
    r: &mut Reader<R>,
) -> Result<ReadOutcome> {
    let (variant, since) = tag_info(tag)?;
    if major_version < since {
        return Err(ClassFileError::VersionTooLow {
            variant,
            since,
            actual: major_version,
        });
    }
    Ok(match tag {
        tag::UTF8 => ReadOutcome::Resolved(Constant::Utf8(r.read_mutf8()?)),
        tag::INTEGER => ReadOutcome::Resolved(Constant::Integer(r.read_i32()?)),
        tag::FLOAT => ReadOutcome::Resolved(Constant::Float(r.read_f32()?)),
        tag::LONG => ReadOutcome::Resolved(Constant::Long(r.read_i64()?)),
        tag::DOUBLE => ReadOutcome::Resolved(Constant::Double(r.read_f64()?)),
        tag::CLASS => ReadOutcome::Deferred(Deferred::Class {
            name_index: r.read_u16()?,
        }),
        tag::STRING => ReadOutcome::Deferred(Deferred::String {
            string_index: r.read_u16()?,
        }),
        tag::FIELD_REF => ReadOutcome::Deferred(Deferred::FieldRef {
            class_index: r.read_u16()?,
            nat_index: r.read_u16()?,
        }),
        tag::METHOD_REF => ReadOutcome::Deferred(Deferred::MethodRef {
            class_index: r.read_u16()?,
            nat_index: r.read_u16()?,
        }),
        tag::INTERFACE_METHOD_REF => ReadOutcome::Deferred(Deferred::InterfaceMethodRef {
            class_index: r.read_u16()?,
            nat_index: r.read_u16()?,
        }),
        tag::NAME_AND_TYPE => ReadOutcome::Deferred(Deferred::NameAndType {
            name_index: r.read_u16()?,
            descriptor_index: r.read_u16()?,
        }),
        tag::METHOD_HANDLE => {
            let kind = RefKind::decode(r.read_u8()?)?;
            ReadOutcome::Deferred(Deferred::MethodHandle {
                kind,
                ref_index: r.read_u16()?,
            })
        }
        tag::METHOD_TYPE => ReadOutcome::Deferred(Deferred::MethodType {
            descriptor_index: r.read_u16()?,
        }),
        tag::DYNAMIC => ReadOutcome::Deferred(Deferred::Dynamic {
            bootstrap_index: r.read_u16()?,
            nat_index: r.read_u16()?,
        }),
        tag::INVOKE_DYNAMIC => ReadOutcome::Deferred(Deferred::InvokeDynamic {
            bootstrap_index: r.read_u16()?,
            nat_index: r.read_u16()?,
        }),
        tag::MODULE => ReadOutcome::Deferred(Deferred::Module {
            name_index: r.read_u16()?,
        }),
        tag::PACKAGE => ReadOutcome::Deferred(Deferred::Package {
            name_index: r.read_u16()?,
        }),
        _ => return Err(ClassFileError::UnknownConstantTag(tag)),
    })
}

fn lookup_utf8(lookups: &FnvHashMap<u16, Constant>, index: u16) -> Result<Option<String>> {
    match lookups.get(&index) {
        None => Ok(None),
        Some(Constant::Utf8(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ClassFileError::KindMismatch {
            expected: "Utf8",
            actual: other.kind_name(),
            at_index: index,
        }),
    }
}

fn lookup_class(lookups: &FnvHashMap<u16, Constant>, index: u16) -> Result<Option<String>> {
    match lookups.get(&index) {
        None => Ok(None),
        Some(Constant::Class(name)) => Ok(Some(name.clone())),
        Some(other) => Err(ClassFileError::KindMismatch {
            expected: "Class",
            actual: other.kind_name(),
            at_index: index,
        }),
    }
}

fn lookup_name_and_type(
    lookups: &FnvHashMap<u16, Constant>,
    index: u16,
) -> Result<Option<NameAndType>> {
    match lookups.get(&index) {
        None => Ok(None),
        Some(Constant::NameAndType(n)) => Ok(Some(n.clone())),
        Some(other) => Err(ClassFileError::KindMismatch {
            expected: "NameAndType",
            actual: other.kind_name(),
            at_index: index,
        }),
    }
}

fn lookup_member_ref(
    lookups: &FnvHashMap<u16, Constant>,
    class_index: u16,
    nat_index: u16,
) -> Result<Option<MemberRef>> {
    let class = match lookup_class(lookups, class_index)? {
        Some(c) => c,
        None => return Ok(None),
    };
    let nat = match lookup_name_and_type(lookups, nat_index)? {
        Some(n) => n,
        None => return Ok(None),
    };
    Ok(Some(MemberRef {
        class,
        name: nat.name,
        descriptor: nat.descriptor,
    }))
}

/// Try to resolve a deferred constant against the pool's current set of
/// already-resolved entries. Returns `Pending` (not an error) if a
/// referent hasn't been resolved yet; the fix-up loop retries it next pass.
pub(crate) fn dereference(
    lookups: &FnvHashMap<u16, Constant>,
    deferred: &Deferred,
) -> Result<DerefOutcome> {
    use Deferred::*;
    let resolved = match deferred {
        Class { name_index } => match lookup_utf8(lookups, *name_index)? {
            Some(name) => Constant::Class(name),
            None => return Ok(DerefOutcome::Pending),
        },
        String { string_index } => match lookup_utf8(lookups, *string_index)? {
            Some(s) => Constant::String(s),
            None => return Ok(DerefOutcome::Pending),
        },
        FieldRef {
            class_index,
            nat_index,
        } => match lookup_member_ref(lookups, *class_index, *nat_index)? {
            Some(m) => Constant::FieldRef(m),
            None => return Ok(DerefOutcome::Pending),
        },
        MethodRef {
            class_index,
            nat_index,
        } => match lookup_member_ref(lookups, *class_index, *nat_index)? {
            Some(m) => Constant::MethodRef(m),
            None => return Ok(DerefOutcome::Pending),
        },
        InterfaceMethodRef {
            class_index,
            nat_index,
        } => match lookup_member_ref(lookups, *class_index, *nat_index)? {
            Some(m) => Constant::InterfaceMethodRef(m),
            None => return Ok(DerefOutcome::Pending),
        },
        NameAndType {
            name_index,
            descriptor_index,
        } => {
            let name = match lookup_utf8(lookups, *name_index)? {
                Some(n) => n,
                None => return Ok(DerefOutcome::Pending),
            };
            let descriptor = match lookup_utf8(lookups, *descriptor_index)? {
                Some(d) => d,
                None => return Ok(DerefOutcome::Pending),
            };
            Constant::NameAndType(NameAndType { name, descriptor })
        }
        MethodHandle { kind, ref_index } => match lookups.get(ref_index) {
            None => return Ok(DerefOutcome::Pending),
            Some(Constant::FieldRef(m)) => Constant::MethodHandle(MethodHandle {
                kind: *kind,
                referent_kind: ReferentKind::Field,
                referent: m.clone(),
            }),
            Some(Constant::MethodRef(m)) => Constant::MethodHandle(MethodHandle {
                kind: *kind,
                referent_kind: ReferentKind::Method,
                referent: m.clone(),
            }),
            Some(Constant::InterfaceMethodRef(m)) => Constant::MethodHandle(MethodHandle {
                kind: *kind,
                referent_kind: ReferentKind::InterfaceMethod,
                referent: m.clone(),
            }),
            Some(other) => {
                return Err(ClassFileError::KindMismatch {
                    expected: "FieldRef/MethodRef/InterfaceMethodRef",
                    actual: other.kind_name(),
                    at_index: *ref_index,
                })
            }
        },
        MethodType { descriptor_index } => match lookup_utf8(lookups, *descriptor_index)? {
            Some(d) => Constant::MethodType(d),
            None => return Ok(DerefOutcome::Pending),
        },
        Dynamic {
            bootstrap_index,
            nat_index,
        } => {
            let nat = match lookup_name_and_type(lookups, *nat_index)? {
                Some(n) => n,
                None => return Ok(DerefOutcome::Pending),
            };
            Constant::Dynamic(Dynamic {
                bootstrap_method_attr_index: *bootstrap_index,
                name: nat.name,
                descriptor: nat.descriptor,
            })
        }
        InvokeDynamic {
            bootstrap_index,
            nat_index,
        } => {
            let nat = match lookup_name_and_type(lookups, *nat_index)? {
                Some(n) => n,
                None => return Ok(DerefOutcome::Pending),
            };
            Constant::InvokeDynamic(Dynamic {
                bootstrap_method_attr_index: *bootstrap_index,
                name: nat.name,
                descriptor: nat.descriptor,
            })
        }
        Module { name_index } => match lookup_utf8(lookups, *name_index)? {
            Some(name) => Constant::Module(name),
            None => return Ok(DerefOutcome::Pending),
        },
        Package { name_index } => match lookup_utf8(lookups, *name_index)? {
            Some(name) => Constant::Package(name),
            None => return Ok(DerefOutcome::Pending),
        },
    };
    Ok(DerefOutcome::Resolved(resolved))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(Constant::Float(f32::NAN), Constant::Float(f32::NAN));
        assert_ne!(Constant::Float(0.0), Constant::Float(-0.0));
    }

    #[test]
    fn member_refs_compare_structurally() {
        let a = Constant::MethodRef(MemberRef {
            class: "java/lang/Object".into(),
            name: "toString".into(),
            descriptor: "()Ljava/lang/String;".into(),
        });
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn tag_info_rejects_unknown_tag() {
        assert!(tag_info(200).is_err());
    }

    #[test]
    fn method_handle_requires_version_51() {
        let mut cursor = std::io::Cursor::new(vec![7u8, 0, 1]);
        let mut r = Reader::new(&mut cursor);
        let err = decode_entry(tag::METHOD_HANDLE, 45, &mut r).unwrap_err();
        assert!(matches!(err, ClassFileError::VersionTooLow { .. }));
    }
}
