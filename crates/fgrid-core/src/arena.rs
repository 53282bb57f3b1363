//! Arena storage for row nodes.
//!
//! Nodes live in a slot vector and are addressed by generational
//! [`NodeHandle`]s. Releasing a node bumps its slot generation, so a handle
//! kept around by a change collector or a stale transaction can never resolve
//! to whatever node reuses the slot later.
//!
//! # Operations
//!
//! | Operation | Time |
//! |-----------|------|
//! | `insert` | O(1) amortised |
//! | `get` / `get_mut` | O(1) |
//! | `release` | O(1) |
//! | `find` | O(1) |
//! | `route_to` | O(depth) |
//! | `preorder` | O(n) |

use std::collections::HashMap;

use crate::node::RowNode;

/// Generational handle to a node in a [`RowArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

impl NodeHandle {
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    node: Option<RowNode<T>>,
}

/// Slot arena holding every live row node of a grid.
#[derive(Debug, Clone)]
pub struct RowArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
    /// Id index over non-root nodes. Last insert wins on duplicates.
    by_id: HashMap<String, NodeHandle>,
}

impl<T> Default for RowArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RowArena<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
            by_id: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            live: 0,
            by_id: HashMap::with_capacity(capacity),
        }
    }

    /// Number of live nodes, roots included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Drop every node. Outstanding handles become stale.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            if slot.node.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.free = (0..self.slots.len() as u32).rev().collect();
        self.live = 0;
        self.by_id.clear();
    }

    /// Store a node and return its handle.
    pub fn insert(&mut self, node: RowNode<T>) -> NodeHandle {
        let indexed = (!node.is_root()).then(|| node.id.clone());
        let handle = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                NodeHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                NodeHandle {
                    index,
                    generation: 0,
                }
            }
        };
        if let Some(id) = indexed {
            self.by_id.insert(id, handle);
        }
        self.live += 1;
        handle
    }

    /// Take a node out of the arena, invalidating its handle.
    pub fn release(&mut self, handle: NodeHandle) -> Option<RowNode<T>> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        if self.by_id.get(node.id()) == Some(&handle) {
            self.by_id.remove(node.id());
        }
        Some(node)
    }

    #[must_use]
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.get(handle).is_some()
    }

    #[must_use]
    pub fn get(&self, handle: NodeHandle) -> Option<&RowNode<T>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut RowNode<T>> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Look a non-root node up by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<NodeHandle> {
        self.by_id
            .get(id)
            .copied()
            .filter(|handle| self.contains(*handle))
    }

    /// Iterate live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &RowNode<T>)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    node,
                )
            })
        })
    }

    /// Attach `node` under `parent`, appending it to the parent's grouped
    /// children. The child's level is derived from the parent.
    pub fn append_child(&mut self, parent: NodeHandle, mut node: RowNode<T>) -> Option<NodeHandle> {
        let parent_level = self.get(parent)?.level;
        node.parent = Some(parent);
        node.level = parent_level + 1;
        let handle = self.insert(node);
        if let Some(parent_node) = self.get_mut(parent) {
            parent_node
                .children
                .after_group
                .get_or_insert_with(Vec::new)
                .push(handle);
        }
        Some(handle)
    }

    /// Set the parent edge of a node.
    pub fn set_parent(&mut self, handle: NodeHandle, parent: Option<NodeHandle>) {
        if let Some(node) = self.get_mut(handle) {
            node.parent = parent;
        }
    }

    /// Handles from the top-level ancestor down to `handle`. The root (the
    /// ancestor with no parent) is not part of the route.
    #[must_use]
    pub fn route_to(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        let mut route = Vec::new();
        let mut current = handle;
        while let Some(node) = self.get(current) {
            let Some(parent) = node.parent else {
                break;
            };
            route.push(current);
            current = parent;
        }
        route.reverse();
        route
    }

    /// Children in display order: grouped children when the pipeline has run,
    /// otherwise the raw leaf list.
    #[must_use]
    pub fn children(&self, handle: NodeHandle) -> &[NodeHandle] {
        self.get(handle)
            .and_then(|node| {
                node.children
                    .after_group
                    .as_deref()
                    .filter(|c| !c.is_empty())
                    .or(node.all_leaf_children.as_deref())
            })
            .unwrap_or(&[])
    }

    /// Depth-first pre-order walk below `root`, excluding `root` itself.
    #[must_use]
    pub fn preorder(&self, root: NodeHandle) -> Vec<NodeHandle> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeHandle> = self.children(root).iter().rev().copied().collect();
        while let Some(handle) = stack.pop() {
            out.push(handle);
            stack.extend(self.children(handle).iter().rev().copied());
        }
        out
    }

    /// Leaf (non-group) nodes below `handle`, depth first.
    #[must_use]
    pub fn leaf_descendants(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        self.preorder(handle)
            .into_iter()
            .filter(|h| self.get(*h).is_some_and(|n| !n.group))
            .collect()
    }
}
