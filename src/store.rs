//! The store: the four-file on-disk unit, its creator/opener, and the
//! append/read operations that drive the compression and cross-store
//! deduplication protocol.

use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::codec::{checked_payload_len, BlockCodec, ZstdCodec};
use crate::descriptor::Descriptor;
use crate::error::StoreError;
use crate::hasher::{Blake3Probe, ProbeHasher};
use crate::index::{IndexEntry, Slot};

/// Default block size (`B`), in bytes.
pub const DEFAULT_BLOCK_SIZE: u32 = 4096;
/// Default block group size (`G`), in blocks.
pub const DEFAULT_GROUP_SIZE: u32 = 1020;
/// Hard cap on the number of dependency stores transitively opened.
const MAX_DEP_CHAIN: usize = 64;

/// The five monotonic write-path counters exposed to callers.
#[derive(Debug, Default, Clone, Copy)]
pub struct WriteStats {
    pub new: u64,
    pub reused: u64,
    pub hashcoll: u64,
    pub zero: u64,
    pub dblrefs: u64,
}

impl WriteStats {
    pub fn as_tuple(&self) -> (u64, u64, u64, u64, u64) {
        (self.new, self.reused, self.hashcoll, self.zero, self.dblrefs)
    }
}

/// Construction-time knobs. Production callers should use the plain
/// `create`/`open` constructors, which apply [`StoreOptions::default`].
/// Tests use `create_with_options`/`open_with_options` to exercise
/// non-default `B`/`G` and to inject a hasher that forces collisions.
pub struct StoreOptions {
    pub block_size: u32,
    pub group_size: u32,
    pub codec: Arc<dyn BlockCodec>,
    pub hasher: Arc<dyn ProbeHasher>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions {
            block_size: DEFAULT_BLOCK_SIZE,
            group_size: DEFAULT_GROUP_SIZE,
            codec: Arc::new(ZstdCodec::default()),
            hasher: Arc::new(Blake3Probe),
        }
    }
}

/// In-memory state of the block group currently being accumulated by a
/// writer. Not flushed to `.idx` until the group fills or the store closes.
struct WriteState {
    entry: IndexEntry,
    group: u64,
}

/// An open store: four sibling files plus the (possibly empty) chain of
/// dependency stores it may back-reference into.
pub struct Store {
    block_size: usize,
    group_size: usize,
    data_file: File,
    index_file: File,
    hash_file: File,
    data_len: u64,
    block_count: u64,
    write_state: Option<WriteState>,
    read_cache: Option<(u64, IndexEntry)>,
    deps: Vec<Store>,
    writable: bool,
    stats: WriteStats,
    hasher: Arc<dyn ProbeHasher>,
    codec: Arc<dyn BlockCodec>,
}

fn sibling(dir: &Path, basename: &str, ext: &str) -> PathBuf {
    dir.join(format!("{basename}.{ext}"))
}

fn open_rw_truncate(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

fn open_ro(path: &Path) -> std::io::Result<File> {
    OpenOptions::new().read(true).open(path)
}

/// Recover the logical block count of a closed (or at least
/// group-boundary-flushed) store from its `.idx` file alone.
fn recover_block_count(index_file: &mut File, group_size: usize) -> Result<u64, StoreError> {
    let entry_len = IndexEntry::encoded_len(group_size) as u64;
    let file_len = index_file.metadata()?.len();
    if file_len % entry_len != 0 {
        return Err(StoreError::Format(format!(
            "index file size {file_len} is not a multiple of the entry size {entry_len}"
        )));
    }
    let groups = file_len / entry_len;
    if groups == 0 {
        return Ok(0);
    }
    let last_group = groups - 1;
    index_file.seek(SeekFrom::Start(last_group * entry_len))?;
    let entry = IndexEntry::read(index_file, group_size)?;
    let populated = entry.nonzero_prefix_len() as u64;
    Ok(last_group * group_size as u64 + populated)
}

impl Store {
    /// Create a new store with the default `B=4096`, `G=1020`, a
    /// Zstd-backed codec and a BLAKE3-derived probe hash.
    pub fn create<P: AsRef<Path>>(
        dir: P,
        basename: &str,
        dep_basename: Option<&str>,
    ) -> Result<Store, StoreError> {
        Self::create_with_options(dir, basename, dep_basename, StoreOptions::default())
    }

    pub fn create_with_options<P: AsRef<Path>>(
        dir: P,
        basename: &str,
        dep_basename: Option<&str>,
        options: StoreOptions,
    ) -> Result<Store, StoreError> {
        let dir = dir.as_ref();

        let mut dsc_file = open_rw_truncate(&sibling(dir, basename, "dsc"))?;
        let data_file = open_rw_truncate(&sibling(dir, basename, "dat"))?;
        let index_file = open_rw_truncate(&sibling(dir, basename, "idx"))?;
        let hash_file = open_rw_truncate(&sibling(dir, basename, "hsh"))?;

        let descriptor = Descriptor {
            block_size: options.block_size,
            group_size: options.group_size,
            dep_basename: dep_basename.map(str::to_string),
        };
        descriptor.write(&mut dsc_file)?;

        let deps = match dep_basename {
            Some(name) => {
                open_dep_chain(dir, name, options.block_size, &options.codec, &options.hasher)?
            }
            None => Vec::new(),
        };

        Ok(Store {
            block_size: options.block_size as usize,
            group_size: options.group_size as usize,
            data_file,
            index_file,
            hash_file,
            data_len: 0,
            block_count: 0,
            write_state: Some(WriteState {
                entry: IndexEntry::empty(options.group_size as usize),
                group: 0,
            }),
            read_cache: None,
            deps,
            writable: true,
            stats: WriteStats::default(),
            hasher: options.hasher,
            codec: options.codec,
        })
    }

    /// Open an existing store read-only, loading its full dependency chain.
    pub fn open<P: AsRef<Path>>(dir: P, basename: &str) -> Result<Store, StoreError> {
        Self::open_with_options(dir, basename, StoreOptions::default())
    }

    pub fn open_with_options<P: AsRef<Path>>(
        dir: P,
        basename: &str,
        options: StoreOptions,
    ) -> Result<Store, StoreError> {
        let dir = dir.as_ref();
        let (mut store, dep_basename) =
            Self::open_nodeps(dir, basename, options.codec.clone(), options.hasher.clone())?;
        if let Some(name) = dep_basename {
            store.deps = open_dep_chain(
                dir,
                &name,
                store.block_size as u32,
                &options.codec,
                &options.hasher,
            )?;
        }
        Ok(store)
    }

    /// Open a store for reading without following its dependency chain.
    /// Returns the store plus its own direct dependency's basename (if any)
    /// so the caller can continue walking the chain.
    fn open_nodeps(
        dir: &Path,
        basename: &str,
        codec: Arc<dyn BlockCodec>,
        hasher: Arc<dyn ProbeHasher>,
    ) -> Result<(Store, Option<String>), StoreError> {
        let mut dsc_file = open_ro(&sibling(dir, basename, "dsc"))?;
        let descriptor = Descriptor::read(&mut dsc_file)?;

        let data_file = open_ro(&sibling(dir, basename, "dat"))?;
        let mut index_file = open_ro(&sibling(dir, basename, "idx"))?;
        let hash_file = open_ro(&sibling(dir, basename, "hsh"))?;

        let group_size = descriptor.group_size as usize;
        let block_count = recover_block_count(&mut index_file, group_size)?;

        let store = Store {
            block_size: descriptor.block_size as usize,
            group_size,
            data_file,
            index_file,
            hash_file,
            data_len: 0,
            block_count,
            write_state: None,
            read_cache: None,
            deps: Vec::new(),
            writable: false,
            stats: WriteStats::default(),
            hasher,
            codec,
        };
        Ok((store, descriptor.dep_basename))
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }

    pub fn get_number_of_blocks(&self) -> u64 {
        self.block_count
    }

    pub fn get_write_stats(&self) -> (u64, u64, u64, u64, u64) {
        self.stats.as_tuple()
    }

    pub fn get_block_hash(&mut self, i: u64) -> Result<u8, StoreError> {
        if i >= self.block_count {
            return Err(StoreError::Precondition(format!(
                "block index {i} out of range for store of length {}",
                self.block_count
            )));
        }
        self.hash_file.seek(SeekFrom::Start(i))?;
        let mut b = [0u8; 1];
        self.hash_file.read_exact(&mut b)?;
        Ok(b[0])
    }

    /// The index entry covering `group`, preferring the writer's
    /// in-progress (not yet flushed) entry when `group` is still active.
    fn group_entry(&mut self, group: u64) -> Result<&IndexEntry, StoreError> {
        let is_active = matches!(&self.write_state, Some(ws) if ws.group == group);
        if is_active {
            Ok(&self
                .write_state
                .as_ref()
                .expect("is_active implies write_state is populated")
                .entry)
        } else {
            self.load_read_cache(group)?;
            Ok(&self
                .read_cache
                .as_ref()
                .expect("load_read_cache just populated read_cache")
                .1)
        }
    }

    fn load_read_cache(&mut self, group: u64) -> Result<(), StoreError> {
        if let Some((g, _)) = &self.read_cache {
            if *g == group {
                return Ok(());
            }
        }
        let entry_len = IndexEntry::encoded_len(self.group_size) as u64;
        let pos = group * entry_len;
        self.index_file.seek(SeekFrom::Start(pos))?;
        let entry = IndexEntry::read(&mut self.index_file, self.group_size)?;
        self.read_cache = Some((group, entry));
        Ok(())
    }

    /// Resolve block `i` using only this store: 0 on success (`buf` filled),
    /// or `k` in `1..=deps.len()` meaning the caller must recurse into
    /// `deps[k-1]` non-recursively.
    pub fn read_block_nonrecursive(&mut self, i: u64, buf: &mut [u8]) -> Result<u8, StoreError> {
        if buf.len() != self.block_size {
            return Err(StoreError::Precondition(format!(
                "buffer length {} does not match block size {}",
                buf.len(),
                self.block_size
            )));
        }
        if i >= self.block_count {
            return Err(StoreError::Precondition(format!(
                "block index {i} out of range for store of length {}",
                self.block_count
            )));
        }

        let group = i / self.group_size as u64;
        let slot_idx = (i % self.group_size as u64) as usize;

        let (base_offset, slot, prefix) = {
            let entry = self.group_entry(group)?;
            let slot = entry.slot(slot_idx);
            let prefix: i64 = (0..slot_idx)
                .map(|j| entry.slot(j))
                .filter_map(|s| match s {
                    Slot::Length(n) => Some(n as i64),
                    _ => None,
                })
                .sum();
            (entry.base_offset, slot, prefix)
        };

        match slot {
            Slot::Zero => {
                buf.fill(0);
                Ok(0)
            }
            Slot::DepRef(k) => Ok(k),
            Slot::Length(len) => {
                let len = len as usize;
                let start = base_offset + prefix as u64;
                self.data_file.seek(SeekFrom::Start(start))?;
                let mut payload = vec![0u8; len];
                self.data_file.read_exact(&mut payload)?;
                let decoded = self.codec.decompress(&payload, self.block_size)?;
                buf.copy_from_slice(&decoded);
                Ok(0)
            }
        }
    }

    /// Resolve block `i`, recursing exactly one level into a dependency if
    /// this store's own entry is a back-reference. A dependency's own
    /// back-reference at the same index is a corrupt store, never resolved
    /// transitively.
    pub fn read_block(&mut self, i: u64, buf: &mut [u8]) -> Result<(), StoreError> {
        let r = self.read_block_nonrecursive(i, buf)?;
        if r == 0 {
            return Ok(());
        }
        let dep_idx = (r - 1) as usize;
        if dep_idx >= self.deps.len() {
            return Err(StoreError::Corrupt(format!(
                "block {i} references dependency {r} but only {} deps are open",
                self.deps.len()
            )));
        }
        let r2 = self.deps[dep_idx].read_block_nonrecursive(i, buf)?;
        if r2 != 0 {
            return Err(StoreError::Corrupt(format!(
                "dependency {r} resolved block {i} as a transitive back-reference"
            )));
        }
        Ok(())
    }

    /// Append one block, deduplicating against the dependency chain before
    /// compressing and storing it locally.
    pub fn append_block(&mut self, buf: &[u8]) -> Result<(), StoreError> {
        if !self.writable {
            return Err(StoreError::Precondition(
                "append_block called on a read-only store".into(),
            ));
        }
        if buf.len() != self.block_size {
            return Err(StoreError::Precondition(format!(
                "buffer length {} does not match block size {}",
                buf.len(),
                self.block_size
            )));
        }

        let i = self.block_count;
        let h = self.hasher.hash(buf);
        let mut tmp = vec![0u8; self.block_size];
        let mut matched_dep: Option<usize> = None;

        // Farthest-to-nearest: the first match wins, so the oldest ancestor
        // in the chain is preferred whenever more than one dep would match.
        for d in (0..self.deps.len()).rev() {
            if i >= self.deps[d].get_number_of_blocks() {
                continue;
            }
            let h_d = self.deps[d].get_block_hash(i)?;
            if h_d != h {
                continue;
            }
            let r = self.deps[d].read_block_nonrecursive(i, &mut tmp)?;
            if r != 0 {
                // The dep's own block at this index is itself a
                // back-reference; only direct references are ever recorded.
                self.stats.dblrefs += 1;
                continue;
            }
            if tmp == buf {
                matched_dep = Some(d);
                break;
            }
            self.stats.hashcoll += 1;
        }

        let slot_idx = (i % self.group_size as u64) as usize;

        let slot: Slot = match matched_dep {
            Some(d) => {
                self.stats.reused += 1;
                Slot::DepRef((d as u8) + 1)
            }
            None => {
                let payload = self.codec.compress(buf)?;
                let len = checked_payload_len(payload.len())?;
                if slot_idx == 0 {
                    let offset = self.data_len;
                    let ws = self.write_state.as_mut().expect("writable store has write_state");
                    ws.entry.base_offset = offset;
                }
                self.data_file.write_all(&payload)?;
                self.data_len += payload.len() as u64;
                self.stats.new += 1;
                Slot::Length(len)
            }
        };

        let ws = self.write_state.as_mut().expect("writable store has write_state");
        ws.entry.set_slot(slot_idx, slot);

        self.hash_file.write_all(&[h])?;
        self.block_count += 1;

        if slot_idx == self.group_size - 1 {
            self.flush_current_group()?;
        }

        Ok(())
    }

    fn flush_current_group(&mut self) -> Result<(), StoreError> {
        let group = self.write_state.as_ref().expect("flush without write_state").group;
        let entry_len = IndexEntry::encoded_len(self.group_size) as u64;
        let pos = group * entry_len;

        self.data_file.flush()?;
        self.data_file.sync_all()?;

        self.index_file.seek(SeekFrom::Start(pos))?;
        self.write_state
            .as_ref()
            .expect("flush without write_state")
            .entry
            .write(&mut self.index_file)?;
        self.index_file.flush()?;
        self.index_file.sync_all()?;

        let ws = self.write_state.as_mut().expect("flush without write_state");
        ws.entry = IndexEntry::empty(self.group_size);
        ws.group += 1;

        Ok(())
    }

    /// Flush any partially-filled group and release the store. There is no
    /// flush-on-drop: dropping a store without `close` is an intentional
    /// abort, per the concurrency model.
    pub fn close(mut self) -> Result<(), StoreError> {
        if self.writable && self.block_count % self.group_size as u64 != 0 {
            self.flush_current_group()?;
        }
        Ok(())
    }
}

fn open_dep_chain(
    dir: &Path,
    first: &str,
    expected_block_size: u32,
    codec: &Arc<dyn BlockCodec>,
    hasher: &Arc<dyn ProbeHasher>,
) -> Result<Vec<Store>, StoreError> {
    let mut deps = Vec::new();
    let mut seen = HashSet::new();
    let mut current = first.to_string();

    loop {
        if !seen.insert(current.clone()) {
            return Err(StoreError::Format(format!(
                "cyclic dependency chain detected at '{current}'"
            )));
        }

        let (store, next) =
            Store::open_nodeps(dir, &current, codec.clone(), hasher.clone())?;
        if store.block_size as u32 != expected_block_size {
            return Err(StoreError::Format(format!(
                "dependency '{current}' has block size {} but {expected_block_size} was expected",
                store.block_size
            )));
        }
        deps.push(store);

        if deps.len() >= MAX_DEP_CHAIN {
            break;
        }
        match next {
            Some(name) => current = name,
            None => break,
        }
    }

    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::NoneCodec;
    use tempfile::tempdir;

    fn tiny_options() -> StoreOptions {
        StoreOptions {
            block_size: 16,
            group_size: 4,
            codec: Arc::new(NoneCodec),
            hasher: Arc::new(Blake3Probe),
        }
    }

    #[test]
    fn fresh_store_two_unique_blocks() {
        let dir = tempdir().unwrap();
        let mut s = Store::create_with_options(dir.path(), "s", None, tiny_options()).unwrap();
        let a = [0x01u8; 16];
        let b = [0x02u8; 16];
        s.append_block(&a).unwrap();
        s.append_block(&b).unwrap();
        s.close().unwrap();

        let mut s = Store::open_with_options(dir.path(), "s", tiny_options()).unwrap();
        assert_eq!(s.get_number_of_blocks(), 2);
        let mut buf = [0u8; 16];
        s.read_block(0, &mut buf).unwrap();
        assert_eq!(buf, a);
        s.read_block(1, &mut buf).unwrap();
        assert_eq!(buf, b);
        assert_eq!(s.get_write_stats(), (2, 0, 0, 0, 0));
    }

    #[test]
    fn zero_block_is_stored_with_nonzero_length() {
        let dir = tempdir().unwrap();
        let mut s = Store::create_with_options(
            dir.path(),
            "s",
            None,
            StoreOptions {
                codec: Arc::new(ZstdCodec::default()),
                ..tiny_options()
            },
        )
        .unwrap();
        let z = [0u8; 16];
        let a = [0x09u8; 16];
        s.append_block(&z).unwrap();
        s.append_block(&a).unwrap();
        s.close().unwrap();

        let mut s = Store::open_with_options(
            dir.path(),
            "s",
            StoreOptions {
                codec: Arc::new(ZstdCodec::default()),
                ..tiny_options()
            },
        )
        .unwrap();
        let mut buf = [0u8; 16];
        s.read_block(0, &mut buf).unwrap();
        assert_eq!(buf, z);
    }

    #[test]
    fn dedup_hit_against_direct_parent() {
        let dir = tempdir().unwrap();
        let x = [0x55u8; 16];

        let mut parent = Store::create_with_options(dir.path(), "p", None, tiny_options()).unwrap();
        parent.append_block(&x).unwrap();
        parent.close().unwrap();

        let mut child =
            Store::create_with_options(dir.path(), "c", Some("p"), tiny_options()).unwrap();
        child.append_block(&x).unwrap();
        assert_eq!(child.get_write_stats(), (0, 1, 0, 0, 0));
        child.close().unwrap();

        let mut child = Store::open_with_options(dir.path(), "c", tiny_options()).unwrap();
        let mut buf = [0u8; 16];
        child.read_block(0, &mut buf).unwrap();
        assert_eq!(buf, x);
    }

    struct FirstByteHasher;
    impl ProbeHasher for FirstByteHasher {
        fn hash(&self, block: &[u8]) -> u8 {
            block[0]
        }
    }

    #[test]
    fn hash_collision_with_different_content_is_stored_locally() {
        let dir = tempdir().unwrap();
        let x = [0xAAu8; 16];
        let mut y = [0xAAu8; 16];
        y[15] = 0xBB; // same first byte, different content

        let options = || StoreOptions {
            hasher: Arc::new(FirstByteHasher),
            ..tiny_options()
        };

        let mut parent = Store::create_with_options(dir.path(), "p", None, options()).unwrap();
        parent.append_block(&x).unwrap();
        parent.close().unwrap();

        let mut child =
            Store::create_with_options(dir.path(), "c", Some("p"), options()).unwrap();
        child.append_block(&y).unwrap();
        assert_eq!(child.get_write_stats(), (1, 0, 1, 0, 0));
        child.close().unwrap();

        let mut child = Store::open_with_options(dir.path(), "c", options()).unwrap();
        let mut buf = [0u8; 16];
        child.read_block(0, &mut buf).unwrap();
        assert_eq!(buf, y);
    }

    #[test]
    fn transitive_backref_is_not_resolved_and_counts_as_dblref() {
        let dir = tempdir().unwrap();
        let options = || StoreOptions {
            hasher: Arc::new(FirstByteHasher),
            ..tiny_options()
        };

        let y = [0xAAu8; 16]; // p0's real content at index 0
        let mut x = [0xAAu8; 16];
        x[15] = 0x01; // same first byte as y (hash collision under FirstByteHasher), different content

        let mut p0 = Store::create_with_options(dir.path(), "p0", None, options()).unwrap();
        p0.append_block(&y).unwrap();
        p0.close().unwrap();

        let mut p1 = Store::create_with_options(dir.path(), "p1", Some("p0"), options()).unwrap();
        p1.append_block(&y).unwrap(); // genuine dedup hit: p1's block 0 becomes a back-ref to p0
        assert_eq!(p1.get_write_stats(), (0, 1, 0, 0, 0));
        p1.close().unwrap();

        let mut s = Store::create_with_options(dir.path(), "s", Some("p1"), options()).unwrap();
        s.append_block(&x).unwrap();
        // s's flattened dep chain is [p1, p0]. Farthest (p0) is probed first:
        // its hash matches (first-byte collision) but its content (y) differs
        // from x, so it's a hash collision, not a match. Nearest (p1) is
        // probed next: its hash also matches (it mirrors p0's), but it
        // resolves non-recursively to a back-reference rather than local
        // content, so it is skipped and counted as a double reference.
        // Neither dep is used; x is stored locally.
        assert_eq!(s.get_write_stats(), (1, 0, 1, 0, 1));
        s.close().unwrap();

        let mut s = Store::open_with_options(dir.path(), "s", options()).unwrap();
        let mut buf = [0u8; 16];
        s.read_block(0, &mut buf).unwrap();
        assert_eq!(buf, x);
    }

    #[test]
    fn cross_group_boundary() {
        let dir = tempdir().unwrap();
        let mut s = Store::create_with_options(dir.path(), "s", None, tiny_options()).unwrap();
        let blocks: Vec<[u8; 16]> = (0..5u8).map(|n| [n; 16]).collect();
        for b in &blocks {
            s.append_block(b).unwrap();
        }
        s.close().unwrap();

        let idx_len = std::fs::metadata(dir.path().join("s.idx")).unwrap().len();
        assert_eq!(idx_len, 2 * IndexEntry::encoded_len(4) as u64);

        let mut s = Store::open_with_options(dir.path(), "s", tiny_options()).unwrap();
        assert_eq!(s.get_number_of_blocks(), 5);
        let mut buf = [0u8; 16];
        s.read_block(4, &mut buf).unwrap();
        assert_eq!(buf, blocks[4]);
    }

    #[test]
    fn append_block_on_reader_is_precondition_error() {
        let dir = tempdir().unwrap();
        Store::create_with_options(dir.path(), "s", None, tiny_options())
            .unwrap()
            .close()
            .unwrap();
        let mut s = Store::open_with_options(dir.path(), "s", tiny_options()).unwrap();
        let err = s.append_block(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, StoreError::Precondition(_)));
    }

    #[test]
    fn wrong_buffer_length_is_precondition_error() {
        let dir = tempdir().unwrap();
        let mut s = Store::create_with_options(dir.path(), "s", None, tiny_options()).unwrap();
        let err = s.append_block(&[0u8; 8]).unwrap_err();
        assert!(matches!(err, StoreError::Precondition(_)));
    }

    #[test]
    fn hash_file_length_matches_block_count() {
        let dir = tempdir().unwrap();
        let mut s = Store::create_with_options(dir.path(), "s", None, tiny_options()).unwrap();
        for n in 0..3u8 {
            s.append_block(&[n; 16]).unwrap();
        }
        s.close().unwrap();
        let hsh_len = std::fs::metadata(dir.path().join("s.hsh")).unwrap().len();
        assert_eq!(hsh_len, 3);
    }

    #[test]
    fn mismatched_dep_block_size_is_rejected() {
        let dir = tempdir().unwrap();
        Store::create(dir.path(), "p", None).unwrap().close().unwrap(); // B=4096
        let err =
            Store::create_with_options(dir.path(), "c", Some("p"), tiny_options()).unwrap_err(); // B=16
        assert!(matches!(err, StoreError::Format(_)));
    }

    #[test]
    fn cyclic_dependency_chain_is_rejected() {
        let dir = tempdir().unwrap();
        // Hand-craft a cycle: a depends on b, b depends on a.
        Store::create_with_options(dir.path(), "a", None, tiny_options())
            .unwrap()
            .close()
            .unwrap();
        Store::create_with_options(dir.path(), "b", Some("a"), tiny_options())
            .unwrap()
            .close()
            .unwrap();
        // Rewrite a's descriptor to point back at b, forming a cycle.
        let mut dsc = open_rw_truncate(&sibling(dir.path(), "a", "dsc")).unwrap();
        Descriptor {
            block_size: 16,
            group_size: 4,
            dep_basename: Some("b".to_string()),
        }
        .write(&mut dsc)
        .unwrap();

        let err = Store::open_with_options(dir.path(), "a", tiny_options()).unwrap_err();
        assert!(matches!(err, StoreError::Format(_)));
    }
}
