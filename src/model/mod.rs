//! Graph data model: canonical nodes and edges, the consolidated graph,
//! loosely-typed partial graphs accepted from extractors, and the exported
//! document format.

pub mod document;
pub mod edge;
pub mod graph;
pub mod node;
pub mod partial;

pub use document::{GraphDocument, GraphMetadata};
pub use edge::{Edge, EdgeKey, RelationType};
pub use graph::Graph;
pub use node::{
    AttrValue, Attributes, Node, NodeType, DESCRIPTION_ATTR, FREQUENCY_ATTR, MAX_NODE_SIZE,
    MIN_NODE_SIZE,
};
pub use partial::{PartialGraph, RawEdge, RawNode};
