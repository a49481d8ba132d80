// src/dedup/trie.rs
// =============================================================================
// A 256-ary trie over 16-byte content hashes.
//
// Each level of the trie consumes one byte of the key (byte 0 at the root).
// Nodes only materialize where two keys actually diverge:
//
//   - Empty      nothing stored here yet
//   - Leaf(k)    exactly one key lives below this point
//   - Internal   at least two keys share the prefix that leads here
//
// Inserting into a Leaf that holds a different key turns the Leaf into an
// Internal node, re-files the old key one level down, and keeps walking.
// Because two distinct 16-byte keys must differ somewhere in 16 bytes, the
// walk can never need a 17th byte. If it does, the hashing assumption is
// broken and we return TrieError::DepthExhausted instead of guessing.
// =============================================================================

use super::TrieError;
use crate::hash::ContentHash;
use std::fmt;

const FANOUT: usize = 256;

enum Node {
    Empty,
    Leaf(ContentHash),
    Internal(Box<[Node; FANOUT]>),
}

impl Node {
    // Internal node with `existing` re-filed under its byte at `depth`.
    fn split(existing: ContentHash, depth: usize) -> Result<Node, TrieError> {
        let byte = key_byte(&existing, depth)?;
        let mut children: Box<[Node; FANOUT]> = Box::new(std::array::from_fn(|_| Node::Empty));
        children[byte] = Node::Leaf(existing);
        Ok(Node::Internal(children))
    }

    fn count(&self) -> usize {
        match self {
            Node::Empty => 0,
            Node::Leaf(_) => 1,
            Node::Internal(children) => 1 + children.iter().map(Node::count).sum::<usize>(),
        }
    }
}

/// Set of content hashes with a path-compressed 256-ary layout.
pub struct DedupTrie {
    root: Node,
    len: usize,
}

impl DedupTrie {
    pub fn new() -> Self {
        Self {
            root: Node::Empty,
            len: 0,
        }
    }

    /// Number of distinct keys stored.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of materialized (non-empty) nodes, leaves included.
    pub fn node_count(&self) -> usize {
        self.root.count()
    }

    /// Inserts `key` if absent. Returns Ok(true) when the key was new.
    pub fn test_and_insert(&mut self, key: ContentHash) -> Result<bool, TrieError> {
        let inserted = insert_at(&mut self.root, key, 0)?;
        if inserted {
            self.len += 1;
        }
        Ok(inserted)
    }

    /// Walks the same path as test_and_insert without changing anything.
    pub fn contains(&self, key: &ContentHash) -> Result<bool, TrieError> {
        let mut node = &self.root;
        let mut depth = 0;
        loop {
            match node {
                Node::Empty => return Ok(false),
                Node::Leaf(existing) => return Ok(existing == key),
                Node::Internal(children) => {
                    node = &children[key_byte(key, depth)?];
                    depth += 1;
                }
            }
        }
    }
}

impl fmt::Debug for DedupTrie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DedupTrie").field("len", &self.len).finish()
    }
}

impl Default for DedupTrie {
    fn default() -> Self {
        Self::new()
    }
}

fn insert_at(node: &mut Node, key: ContentHash, depth: usize) -> Result<bool, TrieError> {
    match node {
        Node::Empty => {
            *node = Node::Leaf(key);
            Ok(true)
        }
        Node::Leaf(existing) if *existing == key => Ok(false),
        Node::Leaf(existing) => {
            let existing = *existing;
            *node = Node::split(existing, depth)?;
            // Same level again: the node is Internal now.
            insert_at(node, key, depth)
        }
        Node::Internal(children) => {
            let byte = key_byte(&key, depth)?;
            insert_at(&mut children[byte], key, depth + 1)
        }
    }
}

fn key_byte(key: &ContentHash, depth: usize) -> Result<usize, TrieError> {
    key.byte(depth)
        .map(usize::from)
        .ok_or(TrieError::DepthExhausted { key: *key, depth })
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Box<[Node; 256]>?
//    - A Node can contain Nodes, so without a Box its size would be infinite
//    - The Box puts the 256 children on the heap; the enum stays small
//
// 2. What does std::array::from_fn do?
//    - Builds an array by calling the closure once per index
//    - Node is not Copy, so [Node::Empty; 256] would not compile
//
// 3. Why return Result from a lookup?
//    - Running out of key bytes means the trie is corrupt
//    - Returning the error makes the caller decide; we never panic
// -----------------------------------------------------------------------------
