pub mod bounds;
pub mod config;
pub mod generation;
pub mod genome;
pub mod partition;
pub mod progress;
pub mod range;

pub use bounds::BoundSpec;
pub use config::{BoundConfig, GenromConfig, OpConfig, PartitionEntryConfig};
pub use generation::Generation;
pub use genome::{Genome, GenomeError, Sigma};
pub use partition::{EntrySpec, PartKey, Partition, PartitionError};
pub use progress::Progress;
pub use range::ByteRange;
