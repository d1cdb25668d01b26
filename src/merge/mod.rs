//! Consolidation of partial graphs into one canonical graph.

pub mod boundary;
pub mod cache;
pub mod combine;
pub mod merger;

pub use boundary::{admit, Admitted, SizeBounds};
pub use cache::{EntryStamp, EvictionPolicy, LeastRecentlyUsed, OldestFirst, ResultCache};
pub use merger::{GraphMerger, MergeMode, MergeOutcome, StructuralWarning};
