use crate::bounds::{self, BoundSpec};
use crate::partition::{EntrySpec, PartKey, Partition, PartitionError};
use crate::progress::Progress;
use crate::range::ByteRange;
use rand::Rng;
use rand_core::RngCore;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised by genome operations.
#[derive(Error, Debug)]
pub enum GenomeError {
    /// A bound or partition lookup failed.
    #[error(transparent)]
    Partition(#[from] PartitionError),

    /// Two buffers (or a buffer and a partition) of differing sizes were
    /// combined.
    #[error("Size mismatch: expected {expected} bytes, found {found}")]
    SizeMismatch { expected: usize, found: usize },

    /// `format` was invoked while the partition has holes or overlaps.
    #[error("Malformed partition: {holes} hole(s), {overlaps} overlap(s)")]
    MalformedPartition { holes: usize, overlaps: usize },

    /// File I/O failed while loading or saving a genome.
    #[error("Genome I/O error: {0}")]
    Io(String),
}

/// Delta bounds for [`Genome::mutate`], inclusive at both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sigma {
    /// `Symmetric(n)` draws deltas from `[-n, +n]`.
    Symmetric(i32),
    /// `Bounds(lo, hi)` draws deltas from `[lo, hi]`.
    Bounds(i32, i32),
}

impl Sigma {
    fn limits(self) -> (i32, i32) {
        match self {
            Sigma::Symmetric(n) => (-n.abs(), n.abs()),
            Sigma::Bounds(lo, hi) if lo <= hi => (lo, hi),
            Sigma::Bounds(lo, hi) => (hi, lo),
        }
    }
}

impl From<i32> for Sigma {
    fn from(n: i32) -> Self {
        Sigma::Symmetric(n)
    }
}

impl From<(i32, i32)> for Sigma {
    fn from((lo, hi): (i32, i32)) -> Self {
        Sigma::Bounds(lo, hi)
    }
}

/// A named, fixed-size byte buffer with an attached [`Partition`] and an
/// injected random source.
///
/// The buffer size is set once at construction and never changes. Every
/// randomized operator draws from the genome's own RNG, which is an explicit
/// required dependency; seeding it (e.g. with a `ChaCha8Rng`) makes every
/// operation reproducible. Mutating operators return `&mut Self` so calls
/// chain; [`Genome::crossover`] instead allocates a new genome.
///
/// # Example
///
/// ```no_run
/// use genrom_core::{EntrySpec, Genome, Sigma};
/// use rand_chacha::ChaCha8Rng;
/// use rand_core::SeedableRng;
///
/// let rng = ChaCha8Rng::seed_from_u64(7);
/// let mut rom = Genome::from_file("rom_in.gb", Some("rom_out.gb"), rng)?;
/// rom.repartition(vec![
///     EntrySpec::span("int", 0x0, 0x100),
///     EntrySpec::span("head", 0x100, 0x150),
///     EntrySpec::rest("game"),
/// ])?;
/// rom.mutate(0.12, Sigma::Symmetric(1), &["game".into()])?.save()?;
/// # Ok::<(), genrom_core::GenomeError>(())
/// ```
#[derive(Debug)]
pub struct Genome<R: RngCore> {
    name: String,
    data: Vec<u8>,
    partition: Partition,
    rng: R,
    progress: bool,
}

impl<R: RngCore> Genome<R> {
    /// Wraps raw bytes. The buffer starts with the default single-entry
    /// partition and progress output off.
    pub fn new(data: Vec<u8>, name: impl Into<String>, rng: R) -> Self {
        let partition = Partition::new(data.len());
        Genome {
            name: name.into(),
            data,
            partition,
            rng,
            progress: false,
        }
    }

    /// Reads a genome from a file. Without an explicit `name` the genome
    /// takes the path itself as its name, so a later [`Genome::save`]
    /// overwrites the source file.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        name: Option<&str>,
        rng: R,
    ) -> Result<Self, GenomeError> {
        let path = path.as_ref();
        let data = fs::read(path)
            .map_err(|e| GenomeError::Io(format!("Failed to read genome file {path:?}: {e}")))?;
        let name = name
            .map(str::to_owned)
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Ok(Self::new(data, name, rng))
    }

    /// Writes the buffer to the file named by the genome's own name.
    pub fn save(&self) -> Result<(), GenomeError> {
        self.save_to(&self.name)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), GenomeError> {
        let path = path.as_ref();
        fs::write(path, &self.data)
            .map_err(|e| GenomeError::Io(format!("Failed to write genome file {path:?}: {e}")))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Toggles progress-bar rendering for subsequent operations.
    pub fn set_progress(&mut self, enabled: bool) -> &mut Self {
        self.progress = enabled;
        self
    }

    /// MD5 digest of the buffer as a hex string, for cheap identity checks
    /// across a [`crate::generation::Generation`].
    pub fn digest(&self) -> String {
        format!("{:x}", md5::compute(&self.data))
    }

    /// Replaces the partition wholesale. The partition must describe a buffer
    /// of exactly this genome's size.
    pub fn set_partition(&mut self, partition: Partition) -> Result<&mut Self, GenomeError> {
        if partition.size() != self.size() {
            return Err(GenomeError::SizeMismatch {
                expected: self.size(),
                found: partition.size(),
            });
        }
        self.partition = partition;
        Ok(self)
    }

    /// Builds a partition from sugar entries sized to this buffer and
    /// attaches it.
    pub fn repartition(&mut self, specs: Vec<EntrySpec>) -> Result<&mut Self, GenomeError> {
        self.partition = Partition::from_specs(self.size(), specs)?;
        Ok(self)
    }

    /// Renames partition entry `key`; see [`Partition::rename`] for the
    /// stale-name behavior.
    pub fn rename(
        &mut self,
        key: impl Into<PartKey>,
        new_name: impl Into<String>,
    ) -> Result<&mut Self, GenomeError> {
        self.partition.rename(key, new_name)?;
        Ok(self)
    }

    /// Resizes partition entry `key`; see [`Partition::resize`].
    pub fn resize(
        &mut self,
        key: impl Into<PartKey>,
        before: isize,
        after: isize,
    ) -> Result<&mut Self, GenomeError> {
        self.partition.resize(key, before, after)?;
        Ok(self)
    }

    /// The bytes currently covered by partition entry `key`.
    pub fn bytes_of(&self, key: impl Into<PartKey>) -> Result<&[u8], GenomeError> {
        let (_, range) = self.partition.get(key)?;
        Ok(&self.data[range.as_range()])
    }

    /// Randomly perturbs bytes inside `bounds`.
    ///
    /// For each resolved range `r`, performs `floor(ratio * r.len())`
    /// independent trials: a uniformly random offset inside `r` gets a
    /// uniformly random delta from `sigma` added to it, wrapping modulo 256
    /// (never saturating). Offsets may be hit more than once, and overlapping
    /// bounds weight their shared region accordingly.
    pub fn mutate(
        &mut self,
        ratio: f64,
        sigma: impl Into<Sigma>,
        bounds: &[BoundSpec],
    ) -> Result<&mut Self, GenomeError> {
        let ranges = bounds::resolve(bounds, &self.partition)?;
        let (lo, hi) = sigma.into().limits();

        let total: usize = ranges
            .iter()
            .map(|r| (ratio * r.len() as f64) as usize)
            .sum();
        let mut bar = Progress::new(self.progress, "Mutation", total);
        let mut done = 0;

        for r in &ranges {
            if r.is_empty() {
                continue;
            }
            let count = (ratio * r.len() as f64) as usize;
            for _ in 0..count {
                let p = self.rng.random_range(r.start..r.end);
                let delta = self.rng.random_range(lo..=hi);
                self.data[p] = (self.data[p] as i32 + delta).rem_euclid(0x100) as u8;
                done += 1;
                bar.update(done);
            }
        }
        Ok(self)
    }

    /// Swaps `amount` random pairs of chunks within `bounds`.
    ///
    /// Each iteration draws two ranges from the bound set with replacement,
    /// caps the chunk length at `min(len1, len2, max_chunk)`, picks a start
    /// inside each range such that the chunk stays within it, and swaps the
    /// chunks byte for byte. A zero chunk length (empty range or
    /// `max_chunk == 0`) degenerates to a no-op swap.
    pub fn geneswap(
        &mut self,
        amount: usize,
        max_chunk: usize,
        bounds: &[BoundSpec],
    ) -> Result<&mut Self, GenomeError> {
        let ranges = bounds::resolve(bounds, &self.partition)?;
        let mut bar = Progress::new(self.progress, "Gene swapping", amount);

        for k in 0..amount {
            let r1 = ranges[self.rng.random_range(0..ranges.len())];
            let r2 = ranges[self.rng.random_range(0..ranges.len())];
            let s = r1.len().min(r2.len()).min(max_chunk);

            let p1 = self.chunk_start(r1, s);
            let p2 = self.chunk_start(r2, s);
            for i in 0..s {
                self.data.swap(p1 + i, p2 + i);
            }
            bar.update(k + 1);
        }
        Ok(self)
    }

    /// A start offset in `r` where a chunk of length `s` still fits.
    /// Candidate starts stop short of `r.end - s`; when that window is empty
    /// the start pins to `r.start`.
    fn chunk_start(&mut self, r: ByteRange, s: usize) -> usize {
        let upper = r.end - s;
        if upper > r.start {
            self.rng.random_range(r.start..upper)
        } else {
            r.start
        }
    }

    /// Crosses this genome with `mate` into a new genome, choosing each
    /// range's chunk wholesale from one parent or the other.
    ///
    /// Both parents must be the same size. The child starts as a copy of
    /// `self`'s bytes, then for every resolved range the chunk is taken from
    /// `self` or `mate` with equal probability, never mixed within a range.
    /// An empty bound set scopes the crossover to every entry of `self`'s
    /// partition (not the whole buffer); `mate`'s partition is never
    /// consulted, and only `self`'s RNG drives the choices.
    ///
    /// The child owns the supplied `rng`, takes `name` (default
    /// `"{self}x{mate}"`) and a fresh default partition; partition it
    /// explicitly before further range-scoped work.
    pub fn crossover<M: RngCore, R2: RngCore>(
        &mut self,
        mate: &Genome<M>,
        name: Option<&str>,
        rng: R2,
        bounds: &[BoundSpec],
    ) -> Result<Genome<R2>, GenomeError> {
        let ranges = self.crossover_ranges(mate, bounds)?;
        let mut data = self.data.clone();

        let mut bar = Progress::new(self.progress, "Crossing over", ranges.len());
        for (k, r) in ranges.iter().enumerate() {
            if self.rng.random_bool(0.5) {
                data[r.as_range()].copy_from_slice(&mate.data[r.as_range()]);
            }
            bar.update(k + 1);
        }
        drop(bar);

        Ok(self.child(data, name, mate, rng))
    }

    /// Crossover with a caller-supplied combiner.
    ///
    /// `crosser` receives `self`'s chunk, `mate`'s chunk and the range index,
    /// and its output overwrites the range in the child. Output length is not
    /// validated: a short chunk leaves the tail of the range holding `self`'s
    /// bytes, a long one is truncated to the range. No randomness is drawn.
    pub fn crossover_with<M: RngCore, R2: RngCore, F>(
        &self,
        mate: &Genome<M>,
        name: Option<&str>,
        rng: R2,
        bounds: &[BoundSpec],
        mut crosser: F,
    ) -> Result<Genome<R2>, GenomeError>
    where
        F: FnMut(&[u8], &[u8], usize) -> Vec<u8>,
    {
        let ranges = self.crossover_ranges(mate, bounds)?;
        let mut data = self.data.clone();

        let mut bar = Progress::new(self.progress, "Crossing over", ranges.len());
        for (k, r) in ranges.iter().enumerate() {
            let out = crosser(&self.data[r.as_range()], &mate.data[r.as_range()], k);
            let n = out.len().min(r.len());
            data[r.start..r.start + n].copy_from_slice(&out[..n]);
            bar.update(k + 1);
        }
        drop(bar);

        Ok(self.child(data, name, mate, rng))
    }

    fn crossover_ranges<M: RngCore>(
        &self,
        mate: &Genome<M>,
        bounds: &[BoundSpec],
    ) -> Result<Vec<ByteRange>, GenomeError> {
        if self.size() != mate.size() {
            return Err(GenomeError::SizeMismatch {
                expected: self.size(),
                found: mate.size(),
            });
        }
        if bounds.is_empty() {
            Ok(self.partition.ranges().collect())
        } else {
            Ok(bounds::resolve(bounds, &self.partition)?)
        }
    }

    fn child<M: RngCore, R2: RngCore>(
        &self,
        data: Vec<u8>,
        name: Option<&str>,
        mate: &Genome<M>,
        rng: R2,
    ) -> Genome<R2> {
        let name = name
            .map(str::to_owned)
            .unwrap_or_else(|| format!("{}x{}", self.name, mate.name));
        let mut child = Genome::new(data, name, rng);
        child.progress = self.progress;
        child
    }

    /// Rewrites `bounds` through `f`, walking each resolved range in
    /// `group_by`-sized strides.
    ///
    /// `f` always sees a slice of exactly `group_by` bytes; a short final
    /// group is zero-padded before the call and only its real bytes are
    /// written back afterwards.
    pub fn apply<F>(
        &mut self,
        mut f: F,
        bounds: &[BoundSpec],
        group_by: usize,
    ) -> Result<&mut Self, GenomeError>
    where
        F: FnMut(&mut [u8]),
    {
        let ranges = bounds::resolve(bounds, &self.partition)?;
        let group_by = group_by.max(1);
        let mut group = vec![0u8; group_by];

        for r in &ranges {
            let mut at = r.start;
            while at < r.end {
                let n = group_by.min(r.end - at);
                group[..n].copy_from_slice(&self.data[at..at + n]);
                group[n..].fill(0);
                f(&mut group);
                self.data[at..at + n].copy_from_slice(&group[..n]);
                at += n;
            }
        }
        Ok(self)
    }

    /// Extracts the bytes of `bounds` into a standalone buffer.
    ///
    /// Without a filler the result is the dense concatenation of the ranges
    /// in bound order. With one, the result is a full-size buffer pre-filled
    /// with `filler` where each range's bytes sit at their original offsets.
    pub fn select(
        &self,
        bounds: &[BoundSpec],
        filler: Option<u8>,
    ) -> Result<Vec<u8>, GenomeError> {
        let ranges = bounds::resolve(bounds, &self.partition)?;
        Ok(match filler {
            Some(fill) => {
                let mut out = vec![fill; self.size()];
                for r in &ranges {
                    out[r.as_range()].copy_from_slice(&self.data[r.as_range()]);
                }
                out
            }
            None => {
                let mut out = Vec::with_capacity(ranges.iter().map(|r| r.len()).sum());
                for r in &ranges {
                    out.extend_from_slice(&self.data[r.as_range()]);
                }
                out
            }
        })
    }

    /// Reflows the buffer so the partitions named by `new_order` sit
    /// back-to-back, and replaces the partition to match (same names, fresh
    /// contiguous ranges).
    ///
    /// Aborts with [`GenomeError::MalformedPartition`], buffer and partition
    /// untouched, unless [`Partition::check`] comes back clean.
    pub fn format(&mut self, new_order: &[PartKey]) -> Result<&mut Self, GenomeError> {
        let (holes, overlaps) = self.partition.check();
        if !holes.is_empty() || !overlaps.is_empty() {
            return Err(GenomeError::MalformedPartition {
                holes: holes.len(),
                overlaps: overlaps.len(),
            });
        }

        let mut picked = Vec::with_capacity(new_order.len());
        for key in new_order {
            let (name, range) = self.partition.get(key)?;
            picked.push((name.to_owned(), range));
        }
        let total: usize = picked.iter().map(|(_, r)| r.len()).sum();
        if total > self.size() {
            return Err(GenomeError::Partition(PartitionError::InvalidSpec(
                format!(
                    "reorder spans {total} bytes but the buffer holds {}",
                    self.size()
                ),
            )));
        }

        let mut data = vec![0u8; self.size()];
        let mut entries = Vec::with_capacity(picked.len());
        let mut at = 0;
        for (name, r) in picked {
            data[at..at + r.len()].copy_from_slice(&self.data[r.as_range()]);
            entries.push((name, ByteRange::new(at, at + r.len())));
            at += r.len();
        }
        self.data = data;
        self.partition = Partition::from_ranges(self.size(), entries);
        Ok(self)
    }
}

impl<R: RngCore> fmt::Display for Genome<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Name: {}, size: {}b", self.name, self.size())?;
        write!(f, "{}", self.partition)
    }
}
