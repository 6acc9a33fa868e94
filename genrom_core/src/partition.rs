use crate::progress::LINE_SIZE;
use crate::range::ByteRange;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Errors raised by partition construction and lookup.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PartitionError {
    /// No current entry carries this name. Also raised for names that have
    /// gone stale after a `rename` (see [`Partition::rename`]).
    #[error("Unknown partition name {0:?}")]
    UnknownName(String),

    /// A numeric entry index beyond the current entry count.
    #[error("Partition index {index} out of range ({count} entries)")]
    IndexOutOfRange { index: usize, count: usize },

    /// Malformed construction-time sugar (see [`EntrySpec`]).
    #[error("Invalid partition spec: {0}")]
    InvalidSpec(String),
}

/// Construction-time sugar for one named partition entry.
///
/// Sugar forms are resolved into concrete [`ByteRange`]s exactly once, inside
/// [`Partition::from_specs`]; nothing lazy survives construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntrySpec {
    /// A fully specified entry.
    Span(String, ByteRange),
    /// Starts where the previous entry ended (offset 0 if first) and runs up
    /// to `end` (exclusive).
    UpTo(String, usize),
    /// Consumes the remainder of the buffer. Only valid as the last entry.
    Rest(String),
}

impl EntrySpec {
    pub fn span(name: impl Into<String>, start: usize, end: usize) -> Self {
        EntrySpec::Span(name.into(), ByteRange::new(start, end))
    }

    pub fn up_to(name: impl Into<String>, end: usize) -> Self {
        EntrySpec::UpTo(name.into(), end)
    }

    pub fn rest(name: impl Into<String>) -> Self {
        EntrySpec::Rest(name.into())
    }
}

/// Identifies one partition entry, either by position or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartKey {
    Index(usize),
    Name(String),
}

impl From<usize> for PartKey {
    fn from(index: usize) -> Self {
        PartKey::Index(index)
    }
}

impl From<&str> for PartKey {
    fn from(name: &str) -> Self {
        PartKey::Name(name.to_owned())
    }
}

impl From<String> for PartKey {
    fn from(name: String) -> Self {
        PartKey::Name(name)
    }
}

impl From<&PartKey> for PartKey {
    fn from(key: &PartKey) -> Self {
        key.clone()
    }
}

/// An ordered sequence of named byte ranges over a buffer of known size.
///
/// Entries are indexed `0..N-1` and the order is stable: no operation ever
/// removes or renumbers an entry, even one shrunk to zero length. Names need
/// not be unique; the name lookup maps each name to its **last** occurrence.
///
/// No well-formedness is enforced on mutation. Callers that need to know the
/// partition tiles the buffer exactly must ask [`Partition::check`].
#[derive(Debug, Clone)]
pub struct Partition {
    size: usize,
    entries: Vec<(String, ByteRange)>,
    name_index: HashMap<String, usize>,
}

impl Partition {
    /// A single entry named `"default"` spanning the whole buffer.
    pub fn new(size: usize) -> Self {
        Self::from_ranges(size, vec![("default".to_owned(), ByteRange::new(0, size))])
    }

    /// Builds a partition from concrete `(name, range)` pairs.
    ///
    /// No overlap or bounds checking happens here; that is deferred to
    /// [`Partition::check`].
    pub fn from_ranges(size: usize, entries: Vec<(String, ByteRange)>) -> Self {
        let mut name_index = HashMap::with_capacity(entries.len());
        for (k, (name, _)) in entries.iter().enumerate() {
            name_index.insert(name.clone(), k);
        }
        Partition {
            size,
            entries,
            name_index,
        }
    }

    /// Resolves a list of [`EntrySpec`] sugar forms into a partition.
    ///
    /// Fails with [`PartitionError::InvalidSpec`] when an open-ended
    /// ([`EntrySpec::Rest`]) entry appears anywhere but last, or when an
    /// [`EntrySpec::UpTo`] end lands below the cumulative start.
    pub fn from_specs(size: usize, specs: Vec<EntrySpec>) -> Result<Self, PartitionError> {
        let count = specs.len();
        let mut entries: Vec<(String, ByteRange)> = Vec::with_capacity(count);
        for (k, spec) in specs.into_iter().enumerate() {
            let start = entries.last().map(|(_, r)| r.end).unwrap_or(0);
            let resolved = match spec {
                EntrySpec::Span(name, range) => (name, range),
                EntrySpec::UpTo(name, end) => {
                    if end < start {
                        return Err(PartitionError::InvalidSpec(format!(
                            "entry {k} ({name:?}) ends at 0x{end:X}, before its cumulative start 0x{start:X}"
                        )));
                    }
                    (name, ByteRange::new(start, end))
                }
                EntrySpec::Rest(name) => {
                    if k + 1 != count {
                        return Err(PartitionError::InvalidSpec(format!(
                            "open-ended entry {k} ({name:?}) is only allowed in last position"
                        )));
                    }
                    (name, ByteRange::new(start.min(size), size))
                }
            };
            entries.push(resolved);
        }
        Ok(Self::from_ranges(size, entries))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, ByteRange)> {
        self.entries.iter().map(|(name, r)| (name.as_str(), *r))
    }

    /// The entry ranges alone, in entry order.
    pub fn ranges(&self) -> impl Iterator<Item = ByteRange> + '_ {
        self.entries.iter().map(|(_, r)| *r)
    }

    /// Index of the entry currently named `name`.
    ///
    /// The lookup map is validated against the entry array, so a name left
    /// stale by [`Partition::rename`] fails here instead of silently
    /// resolving to a renamed entry.
    pub fn index_of(&self, name: &str) -> Result<usize, PartitionError> {
        match self.name_index.get(name) {
            Some(&k) if self.entries[k].0 == name => Ok(k),
            _ => Err(PartitionError::UnknownName(name.to_owned())),
        }
    }

    fn index_for(&self, key: PartKey) -> Result<usize, PartitionError> {
        match key {
            PartKey::Index(index) if index < self.entries.len() => Ok(index),
            PartKey::Index(index) => Err(PartitionError::IndexOutOfRange {
                index,
                count: self.entries.len(),
            }),
            PartKey::Name(name) => self.index_of(&name),
        }
    }

    /// The `(name, range)` pair for an entry, by index or name.
    pub fn get(&self, key: impl Into<PartKey>) -> Result<(&str, ByteRange), PartitionError> {
        let k = self.index_for(key.into())?;
        let (name, range) = &self.entries[k];
        Ok((name.as_str(), *range))
    }

    /// Renames an entry in place.
    ///
    /// The new name is entered into the lookup map; the old name's mapping is
    /// deliberately left behind and goes stale (lookups by it raise
    /// [`PartitionError::UnknownName`] from then on). This mirrors the
    /// index-stability rule: renaming never reshuffles anything.
    pub fn rename(
        &mut self,
        key: impl Into<PartKey>,
        new_name: impl Into<String>,
    ) -> Result<(), PartitionError> {
        let k = self.index_for(key.into())?;
        let new_name = new_name.into();
        self.entries[k].0 = new_name.clone();
        self.name_index.insert(new_name, k);
        Ok(())
    }

    /// Grows or shrinks entry `k` by moving its edges.
    ///
    /// `before` bytes are stolen from the tail of entry `k-1` and `after`
    /// bytes from the head of entry `k+1`; negative counts hand bytes back.
    /// The resized range is clamped to `[0, size]` and never inverts. The
    /// first entry steals nothing at its front, the last nothing at its back.
    /// Entries shrunk to zero length stay in place; the name lookup map is
    /// not touched.
    pub fn resize(
        &mut self,
        key: impl Into<PartKey>,
        before: isize,
        after: isize,
    ) -> Result<(), PartitionError> {
        let k = self.index_for(key.into())?;
        let size = self.size as isize;
        let r = self.entries[k].1;

        if k > 0 {
            let prev = self.entries[k - 1].1;
            let end = (prev.end as isize - before).clamp(prev.start as isize, size);
            self.entries[k - 1].1 = ByteRange::new(prev.start, end as usize);
        }
        if k + 1 < self.entries.len() {
            let next = self.entries[k + 1].1;
            let start = (next.start as isize + after).clamp(0, next.end as isize);
            self.entries[k + 1].1 = ByteRange::new(start as usize, next.end);
        }

        let start = (r.start as isize - before).clamp(0, size);
        let end = (r.end as isize + after).clamp(start, size);
        self.entries[k].1 = ByteRange::new(start as usize, end as usize);
        Ok(())
    }

    /// Scans every offset in `[0, size)` and reports `(holes, overlaps)`:
    /// maximal runs of offsets covered by no entry, and by two or more
    /// entries, as merged ranges in ascending order.
    ///
    /// This is an O(size × entries) pass and by far the most expensive call
    /// in the crate; keep it out of hot loops. It never fails: it is the
    /// diagnostic to consult before destructive operations like
    /// [`crate::genome::Genome::format`].
    pub fn check(&self) -> (Vec<ByteRange>, Vec<ByteRange>) {
        let mut holes = Vec::new();
        let mut overlaps = Vec::new();
        let mut hole_start: Option<usize> = None;
        let mut overlap_start: Option<usize> = None;

        for offset in 0..self.size {
            let count = self
                .entries
                .iter()
                .filter(|(_, r)| r.contains(offset))
                .count();

            match (count, hole_start) {
                (0, None) => hole_start = Some(offset),
                (c, Some(start)) if c > 0 => {
                    holes.push(ByteRange::new(start, offset));
                    hole_start = None;
                }
                _ => {}
            }
            match (count, overlap_start) {
                (c, None) if c >= 2 => overlap_start = Some(offset),
                (c, Some(start)) if c < 2 => {
                    overlaps.push(ByteRange::new(start, offset));
                    overlap_start = None;
                }
                _ => {}
            }
        }
        if let Some(start) = hole_start {
            holes.push(ByteRange::new(start, self.size));
        }
        if let Some(start) = overlap_start {
            overlaps.push(ByteRange::new(start, self.size));
        }
        (holes, overlaps)
    }
}

impl fmt::Display for Partition {
    /// Bar diagram of the entry layout followed by one line per entry.
    ///
    /// With many small entries the bar may exceed the line budget; the
    /// per-entry lines below it stay authoritative.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Partition size: {}b", self.size)?;
        let budget = LINE_SIZE.saturating_sub(2 * self.entries.len() + 1);
        write!(f, "|")?;
        for (k, (_, r)) in self.entries.iter().enumerate() {
            let width = if self.size == 0 {
                0
            } else {
                r.len() * budget / self.size
            };
            write!(f, "{}{}|", k, "-".repeat(width))?;
        }
        for (k, (name, r)) in self.entries.iter().enumerate() {
            write!(f, "\n{}: {} ({}b | {})", k, name, r.len(), r)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_way(size: usize) -> Partition {
        Partition::from_specs(
            size,
            vec![
                EntrySpec::span("int", 0, size / 3),
                EntrySpec::span("head", size / 3, 2 * size / 3),
                EntrySpec::span("game", 2 * size / 3, size),
            ],
        )
        .expect("three_way spec is fully specified")
    }

    #[test]
    fn default_partition_is_one_entry_over_everything() {
        let p = Partition::new(0x100);
        assert_eq!(p.len(), 1);
        let (name, range) = p.get(0usize).unwrap();
        assert_eq!(name, "default");
        assert_eq!(range, ByteRange::new(0, 0x100));
        assert_eq!(p.index_of("default").unwrap(), 0);
    }

    #[test]
    fn from_specs_resolves_up_to_and_rest_sugar() {
        let p = Partition::from_specs(
            0x200,
            vec![
                EntrySpec::span("int", 0, 0x100),
                EntrySpec::up_to("head", 0x150),
                EntrySpec::rest("game"),
            ],
        )
        .unwrap();
        assert_eq!(p.get("int").unwrap().1, ByteRange::new(0, 0x100));
        assert_eq!(p.get("head").unwrap().1, ByteRange::new(0x100, 0x150));
        assert_eq!(p.get("game").unwrap().1, ByteRange::new(0x150, 0x200));
    }

    #[test]
    fn rest_as_only_entry_spans_whole_buffer() {
        let p = Partition::from_specs(64, vec![EntrySpec::rest("all")]).unwrap();
        assert_eq!(p.get("all").unwrap().1, ByteRange::new(0, 64));
    }

    #[test]
    fn from_specs_rejects_rest_before_last_position() {
        let err = Partition::from_specs(
            64,
            vec![EntrySpec::rest("early"), EntrySpec::span("tail", 32, 64)],
        )
        .unwrap_err();
        assert!(
            matches!(err, PartitionError::InvalidSpec(_)),
            "expected InvalidSpec, got {err:?}"
        );
    }

    #[test]
    fn from_specs_rejects_up_to_below_cumulative_start() {
        let err = Partition::from_specs(
            0x200,
            vec![EntrySpec::span("int", 0, 0x100), EntrySpec::up_to("head", 0x50)],
        )
        .unwrap_err();
        assert!(matches!(err, PartitionError::InvalidSpec(_)));
    }

    #[test]
    fn duplicate_names_resolve_to_last_occurrence() {
        let p = Partition::from_ranges(
            8,
            vec![
                ("twin".to_owned(), ByteRange::new(0, 4)),
                ("twin".to_owned(), ByteRange::new(4, 8)),
            ],
        );
        assert_eq!(p.index_of("twin").unwrap(), 1);
        assert_eq!(p.get("twin").unwrap().1, ByteRange::new(4, 8));
    }

    #[test]
    fn unknown_name_and_bad_index_error() {
        let p = Partition::new(8);
        assert_eq!(
            p.index_of("nope"),
            Err(PartitionError::UnknownName("nope".to_owned()))
        );
        assert_eq!(
            p.get(3usize).unwrap_err(),
            PartitionError::IndexOutOfRange { index: 3, count: 1 }
        );
    }

    #[test]
    fn rename_leaves_old_name_stale_not_resolvable() {
        let mut p = Partition::new(16);
        p.rename("default", "rom").unwrap();
        assert_eq!(p.get(0usize).unwrap().0, "rom");
        assert_eq!(p.index_of("rom").unwrap(), 0);
        assert_eq!(
            p.index_of("default"),
            Err(PartitionError::UnknownName("default".to_owned())),
            "stale name must not silently resolve"
        );
    }

    #[test]
    fn rename_by_index_updates_lookup_for_new_name() {
        let mut p = three_way(30);
        p.rename(2usize, "tail").unwrap();
        assert_eq!(p.index_of("tail").unwrap(), 2);
        assert!(p.index_of("game").is_err());
    }

    #[test]
    fn resize_steals_bytes_from_both_neighbours() {
        let mut p = three_way(30);
        p.resize(1usize, 3, 2).unwrap();
        assert_eq!(p.get(0usize).unwrap().1, ByteRange::new(0, 7));
        assert_eq!(p.get(1usize).unwrap().1, ByteRange::new(7, 22));
        assert_eq!(p.get(2usize).unwrap().1, ByteRange::new(22, 30));
        // combined span of the three entries is conserved
        let (holes, overlaps) = p.check();
        assert!(holes.is_empty() && overlaps.is_empty());
    }

    #[test]
    fn resize_with_negative_counts_hands_bytes_back() {
        let mut p = three_way(30);
        p.resize(1usize, -2, 0).unwrap();
        assert_eq!(p.get(0usize).unwrap().1, ByteRange::new(0, 12));
        assert_eq!(p.get(1usize).unwrap().1, ByteRange::new(12, 20));
    }

    #[test]
    fn resize_first_and_last_entries_skip_missing_neighbours() {
        let mut p = three_way(30);
        p.resize(0usize, 5, 0).unwrap();
        assert_eq!(
            p.get(0usize).unwrap().1,
            ByteRange::new(0, 10),
            "first entry cannot extend past offset zero"
        );
        p.resize(2usize, 0, 7).unwrap();
        assert_eq!(
            p.get(2usize).unwrap().1,
            ByteRange::new(20, 30),
            "last entry cannot extend past the buffer"
        );
    }

    #[test]
    fn resize_keeps_emptied_entries_in_place() {
        let mut p = three_way(30);
        p.resize(0usize, 0, 10).unwrap();
        assert_eq!(p.len(), 3, "no renumbering even at zero length");
        assert_eq!(p.get(1usize).unwrap().1, ByteRange::new(20, 20));
        assert!(p.get(1usize).unwrap().1.is_empty());
    }

    #[test]
    fn check_on_a_tiling_partition_reports_nothing() {
        let (holes, overlaps) = three_way(30).check();
        assert_eq!(holes, vec![]);
        assert_eq!(overlaps, vec![]);
    }

    #[test]
    fn check_reports_merged_holes() {
        let p = Partition::from_ranges(
            10,
            vec![
                ("a".to_owned(), ByteRange::new(0, 3)),
                ("b".to_owned(), ByteRange::new(5, 7)),
            ],
        );
        let (holes, overlaps) = p.check();
        assert_eq!(holes, vec![ByteRange::new(3, 5), ByteRange::new(7, 10)]);
        assert_eq!(overlaps, vec![]);
    }

    #[test]
    fn check_reports_merged_overlaps() {
        let p = Partition::from_ranges(
            10,
            vec![
                ("a".to_owned(), ByteRange::new(0, 6)),
                ("b".to_owned(), ByteRange::new(4, 10)),
            ],
        );
        let (holes, overlaps) = p.check();
        assert_eq!(holes, vec![]);
        assert_eq!(overlaps, vec![ByteRange::new(4, 6)]);
    }

    #[test]
    fn check_sums_hole_lengths_to_uncovered_span() {
        let p = Partition::from_ranges(
            0x40,
            vec![
                ("a".to_owned(), ByteRange::new(0x08, 0x10)),
                ("b".to_owned(), ByteRange::new(0x20, 0x30)),
            ],
        );
        let (holes, _) = p.check();
        let covered: usize = 0x8 + 0x10;
        let hole_total: usize = holes.iter().map(|r| r.len()).sum();
        assert_eq!(hole_total, 0x40 - covered);
    }

    #[test]
    fn display_lists_every_entry() {
        let text = three_way(30).to_string();
        assert!(text.starts_with("Partition size: 30b\n"));
        assert!(text.contains("0: int (10b | 0x0..0xA)"));
        assert!(text.contains("2: game (10b | 0x14..0x1E)"));
    }
}
