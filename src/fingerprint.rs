//! Structural digests for decontractible graphs.
//!
//! Provides deterministic hashing of a graph's structural form — node keys,
//! interiors and edge aggregation keys, exactly the fields structural
//! equality looks at. The canonical form is serialized to CBOR and hashed
//! with SHA-256 under a fixed domain tag. Two graphs are structurally equal
//! if and only if their digests agree (up to hash collisions), which makes
//! the digest usable as a cheap change detector across update rounds.

use crate::attrs::{EdgeKey, Key};
use crate::dec_graph::DecGraph;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Tag mixed into every digest so graph digests can never collide with
/// SHA-256 output over other serialized material. CBOR is self-delimiting,
/// so the tag alone fixes the framing.
const DIGEST_DOMAIN: &[u8] = b"declevel/dec-graph/v1\n";

/// A 256-bit structural digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashValue([u8; 32]);

impl HashValue {
    /// Wraps raw digest bytes, e.g. read back from storage.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Borrows the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Consumes the digest into its raw bytes.
    pub const fn into_bytes(self) -> [u8; 32] {
        self.0
    }

    /// Lowercase hexadecimal rendering of the full digest.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Canonical structural form: the exact fields structural equality
/// considers, in deterministic (key-sorted) order.
#[derive(Serialize)]
struct CanonGraph {
    nodes: Vec<(Key, CanonGraph)>,
    edges: Vec<(EdgeKey, Vec<EdgeKey>)>,
}

fn canonical(graph: &DecGraph) -> CanonGraph {
    CanonGraph {
        nodes: graph
            .nodes()
            .map(|n| (n.key.clone(), canonical(&n.dec)))
            .collect(),
        edges: graph
            .edges()
            .map(|e| (e.key(), e.dec.keys().cloned().collect()))
            .collect(),
    }
}

/// Structural digest of a decontractible graph.
pub fn structural_digest(graph: &DecGraph) -> HashValue {
    let bytes = serde_cbor::to_vec(&canonical(graph))
        .expect("canonical graph form serializes to CBOR");
    let mut hasher = Sha256::new();
    hasher.update(DIGEST_DOMAIN);
    hasher.update(&bytes);
    HashValue(hasher.finalize().into())
}
