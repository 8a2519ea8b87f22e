//! declevel: incremental multilevel contractions of directed graphs.
//!
//! This crate maintains a hierarchy of graph contractions over a directed
//! base graph. Given a base graph G₀ and an ordered sequence of contraction
//! schemes S₁…Sₕ, it produces levels G₁…Gₕ where each level is obtained by
//! covering the nodes of the level below with *component sets* — strongly
//! connected components, elementary circuits, maximal cliques, stars — and
//! collapsing each set into a *supernode*; edges crossing supernodes are
//! aggregated into *superedges*. The point of the exercise is incremental
//! maintenance: node and edge insertions and deletions on the base graph
//! are buffered as update quadruples and pushed upward level by level,
//! recomputing only what the local structure demands.
//!
//! # Mathematical Foundations
//!
//! A decontractible graph is a quadruple G = (V, E, dec_V, dec_E): a
//! directed graph together with a function assigning each supernode an
//! interior decontractible graph and each superedge the set of lower-level
//! edges it aggregates. A multilevel graph is a base graph plus a sequence
//! of contraction functions, each mapping a decontractible graph to a
//! covering of its nodes.
//!
//! # References
//!
//! - Tarjan, "Depth-first search and linear graph algorithms" (1972) — SCC
//! - Johnson, "Finding all the elementary circuits of a directed graph"
//!   (1975)
//! - Bron & Kerbosch, "Algorithm 457: finding all cliques of an undirected
//!   graph" (1973); Tomita, Tanaka & Takahashi (2006) — pivoting
//!
//! # Example
//!
//! ```
//! use declevel::prelude::*;
//!
//! let mut ml = MultilevelGraph::with_schemes(
//!     (1..=5).map(|k| (k, Attributes::new())),
//!     [(1, 2), (2, 3), (3, 1), (3, 4), (4, 5)]
//!         .map(|(t, h)| (t, h, Attributes::new())),
//!     vec![Box::new(SccsScheme::new())],
//! )
//! .unwrap();
//!
//! // the triangle 1-2-3 collapses into one supernode
//! assert_eq!(ml.get_graph(1).unwrap().order(), 3);
//!
//! // closing the cycle 5 -> 3 collapses everything incrementally
//! ml.add_edge(5, 3, Attributes::new()).unwrap();
//! assert_eq!(ml.get_graph(1).unwrap().order(), 1);
//! ```

pub mod attrs;
pub mod dec_graph;
pub mod error;
pub mod fingerprint;
pub mod multilevel;
pub mod schemes;

pub use attrs::{attr, AttrValue, Attributes, EdgeKey, Key, SetId};
pub use dec_graph::{DecGraph, Superedge, Supernode};
pub use error::{DecError, DecResult};
pub use fingerprint::{structural_digest, HashValue};
pub use multilevel::MultilevelGraph;
pub use schemes::{
    CliquesScheme, CompTable, ComponentSet, ContractionScheme, CyclesScheme, Level, LevelState,
    SccsScheme, SchemeConfig, StarsScheme, UpdateQuadruple,
};

/// Prelude for convenient usage.
pub mod prelude {
    pub use crate::attrs::{attr, AttrValue, Attributes, EdgeKey, Key, SetId};
    pub use crate::dec_graph::{DecGraph, Superedge, Supernode};
    pub use crate::error::{DecError, DecResult};
    pub use crate::fingerprint::{structural_digest, HashValue};
    pub use crate::multilevel::MultilevelGraph;
    pub use crate::schemes::{
        CliquesScheme, CompTable, ComponentSet, ContractionScheme, CyclesScheme, SccsScheme,
        SchemeConfig, StarsScheme, UpdateQuadruple,
    };
}
