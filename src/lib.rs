//! # sgtree
//!
//! A weight-balanced ordered key set using a ScapeGoat tree.
//!
//! Every node caches the size of its subtree as a `weight`. Instead of
//! rotating on the way back up, an insert walks down once, keeps the weights
//! on its path current, and remembers the topmost node whose child grew past
//! 2/3 of its own weight. That node's whole subtree is then flattened in
//! order and rebuilt by bisection. A rebuild costs O(subtree size), but at
//! most one happens per insert and always at the topmost offender, which
//! bounds the total rebuild work over a sequence of inserts to amortized
//! O(log n) per insert.
//!
//! ## Example
//!
//! ```rust
//! use sgtree::SgTree;
//!
//! let mut tree = SgTree::new();
//! for key in 0..100 {
//!     tree.insert(key).unwrap();
//! }
//!
//! assert!(tree.contains(42));
//! assert_eq!(tree.iter().collect::<Vec<_>>(), (0..100).collect::<Vec<_>>());
//! ```

use thiserror::Error;

// =============================================================================
// Configuration
// =============================================================================

// Balance threshold: a child may hold at most 2/3 of its parent's weight.
// Compared in integer form (3 * child <= 2 * parent) so results are exact
// and reproducible across platforms.
const ALPHA_NUM: usize = 2;
const ALPHA_DEN: usize = 3;

// =============================================================================
// Errors
// =============================================================================

/// Errors raised when an operation finds the tree in a state it cannot work
/// from. With this crate as the sole mutator these are unreachable; they
/// exist as a defensive surface and are fatal, not recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidStateError {
    /// [`SgTree::rebuild`] was called on an empty tree.
    #[error("cannot rebuild an empty tree")]
    EmptyTree,
    /// The scapegoat location recorded during an insert walk no longer
    /// resolves to a node, meaning stored weights disagree with the actual
    /// structure.
    #[error("scapegoat path no longer reaches a node; tree weights are corrupted")]
    DetachedScapegoat,
}

// =============================================================================
// Nodes
// =============================================================================

/// Which child slot of a parent a subtree hangs from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

type Link = Option<Box<Node>>;

#[derive(Debug)]
struct Node {
    key: i64,
    left: Link,
    right: Link,
    /// Count of nodes in the subtree rooted here, including this node.
    /// Authoritative: maintained incrementally, never recomputed by
    /// traversal outside of tests.
    weight: usize,
}

impl Node {
    fn new(key: i64) -> Self {
        Node {
            key,
            left: None,
            right: None,
            weight: 1,
        }
    }

    fn child_mut(&mut self, side: Side) -> &mut Link {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Weight of a possibly absent subtree.
    fn weight_of(link: &Link) -> usize {
        link.as_ref().map_or(0, |node| node.weight)
    }

    /// The 2/3 weight-balance test. A leaf passes trivially; an absent child
    /// counts as weight 0.
    fn is_balanced(&self) -> bool {
        let limit = ALPHA_NUM * self.weight;
        ALPHA_DEN * Node::weight_of(&self.left) <= limit
            && ALPHA_DEN * Node::weight_of(&self.right) <= limit
    }
}

// =============================================================================
// Rebuilding
// =============================================================================

/// Flatten the subtree hanging off `link` in order and rebuild it by
/// bisection. An absent subtree stays absent.
fn rebuild_link(link: &mut Link) {
    let mut run = Vec::new();
    flatten(link.take(), &mut run);
    *link = build_range(&mut run);
}

/// In-order flatten. Node records move into `out` with their child links
/// severed; no nodes are allocated or dropped.
fn flatten(link: Link, out: &mut Vec<Option<Box<Node>>>) {
    if let Some(mut node) = link {
        let left = node.left.take();
        let right = node.right.take();
        flatten(left, out);
        out.push(Some(node));
        flatten(right, out);
    }
}

/// Rebuild an in-order run of nodes into a weight-balanced subtree and
/// return its root. Every node's weight is recomputed on the way up.
///
/// The pivot is the floor of the range's midpoint. For a two-node run that
/// makes the first node the parent and the second its right child; shape
/// tests rely on that right-leaning chain, so keep the floor.
fn build_range(run: &mut [Option<Box<Node>>]) -> Link {
    if run.is_empty() {
        return None;
    }
    let mid = (run.len() - 1) / 2;
    let mut root = run[mid].take()?;
    root.left = build_range(&mut run[..mid]);
    root.right = build_range(&mut run[mid + 1..]);
    root.weight = 1 + Node::weight_of(&root.left) + Node::weight_of(&root.right);
    Some(root)
}

// =============================================================================
// Tree
// =============================================================================

/// A weight-balanced binary search tree over `i64` keys.
///
/// Duplicate keys are accepted; insertion routes them into the left subtree,
/// though a later rebuild may leave equal keys on either side of an equal
/// ancestor (in-order output stays non-decreasing either way). The tree is
/// insert-only and single-threaded; callers sharing it across threads must
/// serialize all mutation externally.
#[derive(Debug, Default)]
pub struct SgTree {
    root: Link,
    len: usize,
    rebuilds: u64,
}

impl SgTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        SgTree {
            root: None,
            len: 0,
            rebuilds: 0,
        }
    }

    /// Number of stored keys, duplicates included.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// How many times the rebuilder has run, whether triggered by an insert
    /// or requested through [`SgTree::rebuild`].
    #[inline]
    pub fn rebuilds(&self) -> u64 {
        self.rebuilds
    }

    /// Insert `key`, keeping every weight on the insertion path current and
    /// rebuilding at most one subtree: the one rooted at the topmost node
    /// the walk found unbalanced.
    ///
    /// The error path is defensive only; it fires when the recorded
    /// scapegoat location cannot be reached again, which implies the tree
    /// was corrupted before the call.
    pub fn insert(&mut self, key: i64) -> Result<(), InvalidStateError> {
        match self.root.as_deref_mut() {
            None => {
                self.root = Some(Box::new(Node::new(key)));
                self.len = 1;
                return Ok(());
            }
            // The new node lands somewhere below the root, so the root
            // gains one descendant up front. Each chosen child gets the
            // same bump just before it is stepped into, so every weight
            // read below is already the post-insert value.
            Some(root) => root.weight += 1,
        }

        // Directions taken from the root; `path[..d]` re-reaches the node
        // at depth `d`. Keeping directions as plain values means the
        // persistent structure needs no parent pointers.
        let mut path: Vec<Side> = Vec::new();
        // Depth of the topmost unbalanced node seen so far, if any.
        let mut scapegoat: Option<usize> = None;

        let mut cur = &mut self.root;
        while let Some(node) = cur {
            let side = if key <= node.key { Side::Left } else { Side::Right };
            let slot = node.child_mut(side);
            match slot {
                // Free slot: the walk is over, hang the new leaf here.
                None => {
                    *slot = Some(Box::new(Node::new(key)));
                    break;
                }
                Some(child) => child.weight += 1,
            }
            // Only the first offender counts: rebuilding the topmost
            // unbalanced ancestor also rebuilds every deeper node on this
            // path.
            if scapegoat.is_none() && !node.is_balanced() {
                scapegoat = Some(path.len());
            }
            path.push(side);
            cur = match side {
                Side::Left => &mut node.left,
                Side::Right => &mut node.right,
            };
        }
        self.len += 1;

        if let Some(depth) = scapegoat {
            self.rebuild_at(&path[..depth])?;
        }
        Ok(())
    }

    /// Rebuild the subtree at the end of `path`, a root-relative chain of
    /// directions. The empty path rebuilds from the tree's root, which
    /// covers the case where the root itself is the scapegoat.
    fn rebuild_at(&mut self, path: &[Side]) -> Result<(), InvalidStateError> {
        let mut link = &mut self.root;
        for &side in path {
            link = match link {
                Some(node) => node.child_mut(side),
                None => return Err(InvalidStateError::DetachedScapegoat),
            };
        }
        self.rebuilds += 1;
        rebuild_link(link);
        Ok(())
    }

    /// Flatten the whole tree and rebuild it into its canonical balanced
    /// shape. Rebuilding an empty tree is an error; everything else,
    /// including a single-node tree, succeeds.
    pub fn rebuild(&mut self) -> Result<(), InvalidStateError> {
        if self.root.is_none() {
            return Err(InvalidStateError::EmptyTree);
        }
        self.rebuilds += 1;
        rebuild_link(&mut self.root);
        Ok(())
    }

    /// Whether `key` is present. Standard binary-search descent; equal keys
    /// are found at the first node holding them.
    pub fn contains(&self, key: i64) -> bool {
        let mut cur = self.root.as_deref();
        while let Some(node) = cur {
            if key == node.key {
                return true;
            }
            cur = if key < node.key {
                node.left.as_deref()
            } else {
                node.right.as_deref()
            };
        }
        false
    }

    /// Number of nodes on the longest root-to-leaf chain (0 for an empty
    /// tree). Walks the whole tree; meant for diagnostics and tests, not
    /// hot paths.
    pub fn height(&self) -> usize {
        fn depth(link: &Link) -> usize {
            match link {
                None => 0,
                Some(node) => 1 + depth(&node.left).max(depth(&node.right)),
            }
        }
        depth(&self.root)
    }

    /// In-order iterator over keys, ascending.
    pub fn iter(&self) -> Iter<'_> {
        let mut iter = Iter { stack: Vec::new() };
        iter.push_left_spine(self.root.as_deref());
        iter
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// In-order key iterator. Holds the left spine of the unvisited part of the
/// tree on an explicit stack.
pub struct Iter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> Iter<'a> {
    fn push_left_spine(&mut self, mut link: Option<&'a Node>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = node.left.as_deref();
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = i64;

    fn next(&mut self) -> Option<i64> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.as_deref());
        Some(node.key)
    }
}

impl<'a> IntoIterator for &'a SgTree {
    type Item = i64;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================


#[cfg(test)]
mod proptests;
