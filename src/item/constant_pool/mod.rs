//! The constant pool: the bidirectional, deduplicating table every other
//! part of a class file addresses by index.

use std::collections::VecDeque;
use std::io::{Read, Write};

use fnv::FnvHashMap;
use log::{debug, trace};

use crate::binary::{Reader, Writer};
use crate::error::{ClassFileError, Result};

mod constant;

pub use constant::{Dynamic, MemberRef, MethodHandle, NameAndType, RefKind, ReferentKind};
pub use constant::Constant;

use constant::{decode_entry, dereference, is_wide, DerefOutcome, Deferred, ReadOutcome};

/// A JVM class file's constant pool.
///
/// Indices are 1-based, as in the class file format; index 0 is never
/// occupied, and the second half of a wide (`Long`/`Double`) entry's slot
/// is left unoccupied too. `forward` maps index to constant; `backward`
/// is its inverse, used by [`ConstantPool::add`] to deduplicate.
#[derive(Debug, Default, Clone)]
pub struct ConstantPool {
    forward: FnvHashMap<u16, Constant>,
    backward: FnvHashMap<Constant, u16>,
    /// The raw, as-decoded indices a composite entry was read with, keyed
    /// by that entry's own index. `write` consults this before falling back
    /// to value-based dedup, so two structurally-equal constants that
    /// legitimately occupy distinct indices in the source file don't get
    /// collapsed onto one index on write. Populated only by `read`; entries
    /// added directly through `add`/`set` have no origin and always resolve
    /// their referents by value.
    origins: FnvHashMap<u16, Deferred>,
    next_index: u16,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self {
            forward: FnvHashMap::default(),
            backward: FnvHashMap::default(),
            origins: FnvHashMap::default(),
            next_index: 1,
        }
    }

    /// Read a constant pool from a class file stream. `major_version` gates
    /// constant variants introduced after class file version 45.0.
    ///
    /// Entries that reference other entries (almost everything but `Utf8`,
    /// the numeric constants, `Long`, and `Double`) may appear before their
    /// referents in the stream, so a first pass only decodes primitive
    /// payloads and collects the rest as [`Deferred`] work. A fix-up loop
    /// then repeatedly retries the deferred entries until none remain,
    /// bailing out with [`ClassFileError::UnresolvableReferences`] if a full
    /// pass resolves nothing (a cycle, or a reference to a slot that will
    /// never be filled).
    pub fn read<R: Read>(major_version: u16, r: &mut Reader<R>) -> Result<Self> {
        let count = r.read_u16()?;
        let mut pool = Self::new();
        pool.next_index = count;

        let mut work: VecDeque<(u16, Deferred)> = VecDeque::new();
        let mut offset = 1u16;
        while offset < count {
            let tag = r.read_u8()?;
            let wide = is_wide(tag);
            match decode_entry(tag, major_version, r)? {
                ReadOutcome::Resolved(c) => pool.install(offset, c),
                ReadOutcome::Deferred(d) => work.push_back((offset, d)),
            }
            offset += if wide { 2 } else { 1 };
        }

        while !work.is_empty() {
            let pass_len = work.len();
            let mut progressed = false;
            for _ in 0..pass_len {
                let (idx, deferred) = work.pop_front().unwrap();
                match dereference(&pool.forward, &deferred)? {
                    DerefOutcome::Resolved(c) => {
                        trace!("constant pool: resolved deferred entry at index {idx}");
                        pool.install(idx, c);
                        pool.origins.insert(idx, deferred);
                        progressed = true;
                    }
                    DerefOutcome::Pending => work.push_back((idx, deferred)),
                }
            }
            if !progressed {
                return Err(ClassFileError::UnresolvableReferences(work.len()));
            }
        }

        debug!("constant pool: {} entries resolved", pool.forward.len());
        Ok(pool)
    }

    fn install(&mut self, index: u16, constant: Constant) {
        self.backward.insert(constant.clone(), index);
        self.forward.insert(index, constant);
    }

    /// Write the pool to a class file stream.
    ///
    /// An entry that was read from a stream (tracked in `origins`) writes
    /// back the exact indices it was decoded with, rather than re-deriving
    /// them through [`ConstantPool::add`]'s value-based dedup — this is what
    /// keeps two structurally-equal constants that happen to occupy distinct
    /// indices in the source file from being silently collapsed onto one
    /// index. Only entries with no known origin (built fresh through `add`)
    /// fall back to `add`, which may itself materialize a referent that was
    /// never added on its own — so the pool can grow while this walk is in
    /// progress. Rather than require a seekable stream to patch the count
    /// after the fact, the body is buffered locally; by the time the walk
    /// finishes `next_index` is final, and the count written ahead of the
    /// buffered bytes is correct.
    pub fn write<W: Write>(&mut self, w: &mut Writer<W>) -> Result<()> {
        let mut body = Vec::new();
        {
            let mut body_writer = Writer::new(&mut body);
            let mut offset = 1u16;
            while offset < self.next_index {
                match self.forward.get(&offset).cloned() {
                    Some(c) => {
                        let wide = c.is_wide();
                        let origin = self.origins.get(&offset).cloned();
                        c.write(origin.as_ref(), self, &mut body_writer)?;
                        offset += if wide { 2 } else { 1 };
                    }
                    None => offset += 1,
                }
            }
        }
        w.write_u16(self.next_index)?;
        w.write_bytes(&body)
    }

    /// Fetch the constant at `index`. Out-of-range or never-resolved
    /// indices yield `Constant::Index(index)` rather than an error, so
    /// callers that tolerate unresolved references (diagnostics, graph
    /// construction before a pool is finalized) don't need to branch on it.
    pub fn get(&self, index: u16) -> Constant {
        self.forward
            .get(&index)
            .cloned()
            .unwrap_or(Constant::Index(index))
    }

    /// Fetch the constant at `index`, requiring it to be present.
    pub fn require(&self, index: u16) -> Result<Constant> {
        self.forward
            .get(&index)
            .cloned()
            .ok_or(ClassFileError::NoSuchConstant(index))
    }

    /// Fetch and require a `Utf8` constant specifically.
    pub fn get_utf8(&self, index: u16) -> Result<String> {
        match self.forward.get(&index) {
            Some(Constant::Utf8(s)) => Ok(s.clone()),
            Some(other) => Err(ClassFileError::KindMismatch {
                expected: "Utf8",
                actual: other.kind_name(),
                at_index: index,
            }),
            None => Err(ClassFileError::NoSuchConstant(index)),
        }
    }

    pub fn contains_index(&self, index: u16) -> bool {
        self.forward.contains_key(&index)
    }

    pub fn contains(&self, constant: &Constant) -> bool {
        self.backward.contains_key(constant)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn clear(&mut self) {
        self.forward.clear();
        self.backward.clear();
        self.origins.clear();
        self.next_index = 1;
    }

    /// Add a constant to the pool, returning its index. If an equal
    /// constant is already present, its existing index is returned and the
    /// pool is left unchanged — this is the pool's only deduplication path,
    /// so two structurally-equal constants always end up sharing one index.
    ///
    /// Passing `Constant::Index(n)` is a no-op that returns `n` unchanged;
    /// it lets code that holds a pool index without a resolved constant
    /// (not yet materialized, or deliberately left unresolved) round-trip
    /// through `add` without special-casing it at call sites.
    pub fn add(&mut self, constant: Constant) -> u16 {
        if let Constant::Index(n) = constant {
            return n;
        }
        if let Some(&idx) = self.backward.get(&constant) {
            return idx;
        }
        let wide = constant.is_wide();
        let idx = self.next_index;
        self.install(idx, constant);
        self.next_index += if wide { 2 } else { 1 };
        idx
    }

    pub fn add_utf8(&mut self, s: &str) -> u16 {
        self.add(Constant::Utf8(s.to_string()))
    }

    pub fn add_class(&mut self, internal_name: &str) -> u16 {
        self.add(Constant::Class(internal_name.to_string()))
    }

    pub fn add_string(&mut self, value: &str) -> u16 {
        self.add(Constant::String(value.to_string()))
    }

    /// Install `constant` at a specific, currently-unoccupied index. Used
    /// to materialize a slot that a reader only knows by number (an
    /// instruction's raw pool index, say) before the rest of the class file
    /// is walked. Fails with [`ClassFileError::SlotOccupied`] if the slot
    /// already holds something else.
    pub fn set(&mut self, index: u16, constant: Constant) -> Result<()> {
        if self.forward.contains_key(&index) {
            return Err(ClassFileError::SlotOccupied(index));
        }
        let wide = constant.is_wide();
        self.install(index, constant);
        let width = if wide { 2 } else { 1 };
        if index + width > self.next_index {
            self.next_index = index + width;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Turns on the `debug`/`trace` output `ConstantPool::read` emits, so a
    /// failing fix-up test shows its resolution order instead of just a
    /// final assertion failure.
    fn init_logging() {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Trace)
            .try_init();
    }

    #[test]
    fn add_deduplicates() {
        let mut pool = ConstantPool::new();
        let a = pool.add_utf8("hello");
        let b = pool.add_utf8("hello");
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn wide_constants_occupy_two_slots() {
        let mut pool = ConstantPool::new();
        let long_idx = pool.add(Constant::Long(42));
        let next_idx = pool.add_utf8("after");
        assert_eq!(next_idx, long_idx + 2);
    }

    #[test]
    fn forward_reference_resolves_via_fixup() {
        init_logging();
        // Methodref (index 1) references Class (index 2) and NameAndType
        // (index 3), both of which appear later in the stream.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&4u16.to_be_bytes()); // count
        bytes.push(constant::tag::METHOD_REF);
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.push(constant::tag::CLASS);
        bytes.extend_from_slice(&4u16.to_be_bytes());
        bytes.push(constant::tag::NAME_AND_TYPE);
        bytes.extend_from_slice(&5u16.to_be_bytes());
        bytes.extend_from_slice(&6u16.to_be_bytes());
        // index 4: Utf8 "Foo", index 5: Utf8 "bar", index 6: Utf8 "()V"
        push_utf8(&mut bytes, "Foo");
        push_utf8(&mut bytes, "bar");
        push_utf8(&mut bytes, "()V");
        // fix up count to account for the three trailing Utf8 entries too
        let count = 7u16;
        bytes[0..2].copy_from_slice(&count.to_be_bytes());

        let mut cursor = Cursor::new(bytes);
        let mut r = Reader::new(&mut cursor);
        let pool = ConstantPool::read(52, &mut r).unwrap();
        match pool.require(1).unwrap() {
            Constant::MethodRef(m) => {
                assert_eq!(m.class, "Foo");
                assert_eq!(m.name, "bar");
                assert_eq!(m.descriptor, "()V");
            }
            other => panic!("expected MethodRef, got {other:?}"),
        }
    }

    #[test]
    fn unresolvable_cycle_is_reported() {
        init_logging();
        // Two Class entries pointing at each other's name_index, neither
        // of which is ever a Utf8.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.push(constant::tag::CLASS);
        bytes.extend_from_slice(&2u16.to_be_bytes());
        bytes.push(constant::tag::CLASS);
        bytes.extend_from_slice(&1u16.to_be_bytes());
        let mut cursor = Cursor::new(bytes);
        let mut r = Reader::new(&mut cursor);
        let err = ConstantPool::read(52, &mut r).unwrap_err();
        assert!(matches!(err, ClassFileError::UnresolvableReferences(2)));
    }

    #[test]
    fn write_round_trips_a_method_ref() {
        let mut pool = ConstantPool::new();
        let idx = pool.add(Constant::MethodRef(MemberRef {
            class: "Foo".into(),
            name: "bar".into(),
            descriptor: "()V".into(),
        }));

        let mut buf = Vec::new();
        {
            let mut w = Writer::new(&mut buf);
            pool.write(&mut w).unwrap();
        }
        let mut cursor = Cursor::new(buf);
        let mut r = Reader::new(&mut cursor);
        let read_back = ConstantPool::read(52, &mut r).unwrap();
        assert_eq!(read_back.require(idx).unwrap(), pool.require(idx).unwrap());
    }

    #[test]
    fn write_preserves_indices_of_duplicate_value_entries() {
        // Two Class entries that both name "Foo" via distinct Utf8 entries
        // at distinct indices (redundant, but legal). Rewriting an
        // unmodified pool must reproduce the exact same bytes rather than
        // collapsing both Class entries onto whichever Utf8 index value-
        // based dedup would otherwise prefer.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&5u16.to_be_bytes()); // count
        bytes.push(constant::tag::CLASS);
        bytes.extend_from_slice(&3u16.to_be_bytes());
        bytes.push(constant::tag::CLASS);
        bytes.extend_from_slice(&4u16.to_be_bytes());
        push_utf8(&mut bytes, "Foo");
        push_utf8(&mut bytes, "Foo");

        let mut cursor = Cursor::new(bytes.clone());
        let mut r = Reader::new(&mut cursor);
        let mut pool = ConstantPool::read(52, &mut r).unwrap();

        let mut written = Vec::new();
        {
            let mut w = Writer::new(&mut written);
            pool.write(&mut w).unwrap();
        }
        assert_eq!(written, bytes);
    }

    #[test]
    fn set_rejects_occupied_slot() {
        let mut pool = ConstantPool::new();
        pool.set(5, Constant::Integer(1)).unwrap();
        assert!(matches!(
            pool.set(5, Constant::Integer(2)),
            Err(ClassFileError::SlotOccupied(5))
        ));
    }

    fn push_utf8(bytes: &mut Vec<u8>, s: &str) {
        bytes.push(constant::tag::UTF8);
        bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
        bytes.extend_from_slice(s.as_bytes());
    }
}
