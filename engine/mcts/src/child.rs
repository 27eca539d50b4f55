//! Child slots: the polymorphic edge between a node and its children.
//!
//! A slot starts life as just a (move, prior) pair. The first selector to
//! descend through it materialises a full [`Node`] behind an `AtomicPtr`;
//! losers of that race free their candidate and adopt the winner. Slot
//! identity never changes after link time, only the pointer goes from null
//! to set, once.

use std::sync::atomic::{AtomicPtr, AtomicU32, Ordering};

use games_go::Color;

use crate::node::{ExpandState, Node, TREE_BYTES};

pub struct ChildSlot {
    mv: i32,
    /// Prior as f32 bits; rewritten in place by root noise.
    prior: AtomicU32,
    node: AtomicPtr<Node>,
}

impl ChildSlot {
    pub(crate) fn new(mv: i32, prior: f32) -> Self {
        TREE_BYTES.fetch_add(std::mem::size_of::<ChildSlot>(), Ordering::Relaxed);
        Self {
            mv,
            prior: AtomicU32::new(prior.to_bits()),
            node: AtomicPtr::new(std::ptr::null_mut()),
        }
    }

    #[inline]
    pub fn mv(&self) -> i32 {
        self.mv
    }

    #[inline]
    pub fn prior(&self) -> f32 {
        f32::from_bits(self.prior.load(Ordering::Relaxed))
    }

    pub(crate) fn set_prior(&self, prior: f32) {
        self.prior.store(prior.to_bits(), Ordering::Relaxed);
    }

    /// The inflated node, if any.
    #[inline]
    pub fn node(&self) -> Option<&Node> {
        let ptr = self.node.load(Ordering::Acquire);
        if ptr.is_null() {
            None
        } else {
            // Safety: a non-null pointer was published by `inflate` below
            // and stays owned by this slot until the slot itself drops,
            // which requires exclusive access to the subtree.
            Some(unsafe { &*ptr })
        }
    }

    #[inline]
    pub fn is_inflated(&self) -> bool {
        !self.node.load(Ordering::Acquire).is_null()
    }

    /// Materialise the node, racing safely against other selectors. Only
    /// the first store wins; everyone observes the same node afterwards.
    pub fn inflate(&self) -> &Node {
        if let Some(node) = self.node() {
            return node;
        }
        let candidate = Box::into_raw(Box::new(Node::new(self.mv)));
        match self.node.compare_exchange(
            std::ptr::null_mut(),
            candidate,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            // Safety: we just published the pointer; ownership stays here.
            Ok(_) => unsafe { &*candidate },
            Err(winner) => {
                // Safety: the CAS failed, so `candidate` was never shared.
                unsafe { drop(Box::from_raw(candidate)) };
                unsafe { &*winner }
            }
        }
    }

    /// Detach the owned node, for promoting a child subtree to root.
    /// Requires exclusive access, which the controller has once every
    /// worker has joined.
    pub(crate) fn take_node(&mut self) -> Option<Box<Node>> {
        let ptr = std::mem::replace(self.node.get_mut(), std::ptr::null_mut());
        if ptr.is_null() {
            None
        } else {
            // Safety: pointer ownership transfers to the returned box.
            Some(unsafe { Box::from_raw(ptr) })
        }
    }

    #[inline]
    pub fn visits(&self) -> u32 {
        self.node().map_or(0, Node::visits)
    }

    /// Mover-perspective winrate including virtual loss. Only meaningful
    /// for slots with at least one visit.
    #[inline]
    pub fn eval(&self, color: Color) -> f32 {
        self.node().map_or(0.0, |n| n.eval(color))
    }

    /// Not superko-invalidated. Uninflated slots are trivially valid.
    #[inline]
    pub fn valid(&self) -> bool {
        self.node().map_or(true, Node::valid)
    }

    /// Selectable: valid and not pruned.
    #[inline]
    pub fn active(&self) -> bool {
        self.node().map_or(true, Node::active)
    }

    /// Is another worker currently expanding this child?
    #[inline]
    pub fn is_expanding(&self) -> bool {
        self.node()
            .map_or(false, |n| n.expand_state() == ExpandState::Expanding)
    }
}

impl Drop for ChildSlot {
    fn drop(&mut self) {
        let ptr = *self.node.get_mut();
        if !ptr.is_null() {
            // Safety: the slot owns its node exclusively at drop time.
            unsafe { drop(Box::from_raw(ptr)) };
        }
        TREE_BYTES.fetch_sub(std::mem::size_of::<ChildSlot>(), Ordering::Relaxed);
    }
}
