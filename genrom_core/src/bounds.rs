use crate::partition::{PartKey, Partition, PartitionError};
use crate::range::ByteRange;

/// One element of the bound set accepted by every mutation operator: either a
/// concrete range, or a partition identifier to look the range up from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundSpec {
    Range(ByteRange),
    Index(usize),
    Name(String),
}

impl From<ByteRange> for BoundSpec {
    fn from(range: ByteRange) -> Self {
        BoundSpec::Range(range)
    }
}

impl From<std::ops::Range<usize>> for BoundSpec {
    fn from(range: std::ops::Range<usize>) -> Self {
        BoundSpec::Range(range.into())
    }
}

impl From<usize> for BoundSpec {
    fn from(index: usize) -> Self {
        BoundSpec::Index(index)
    }
}

impl From<&str> for BoundSpec {
    fn from(name: &str) -> Self {
        BoundSpec::Name(name.to_owned())
    }
}

impl From<String> for BoundSpec {
    fn from(name: String) -> Self {
        BoundSpec::Name(name)
    }
}

/// Resolves a bound set against a partition into concrete ranges.
///
/// Order is preserved and duplicates are kept as-is: a caller listing the
/// same region twice double-weights it on purpose. An empty bound set means
/// the whole buffer, a single `[0, size)` range. (`crossover` substitutes its
/// own empty-set default before calling this.)
///
/// Raw `Range` bounds pass through untouched; keeping them inside
/// `[0, size)` is the caller's contract.
pub fn resolve(bounds: &[BoundSpec], partition: &Partition) -> Result<Vec<ByteRange>, PartitionError> {
    if bounds.is_empty() {
        return Ok(vec![ByteRange::new(0, partition.size())]);
    }
    bounds
        .iter()
        .map(|bound| match bound {
            BoundSpec::Range(range) => Ok(*range),
            BoundSpec::Index(index) => partition.get(PartKey::Index(*index)).map(|(_, r)| r),
            BoundSpec::Name(name) => partition.get(name.as_str()).map(|(_, r)| r),
        })
        .collect()
}
