//! The node arena and synchronous propagation engine.
//!
//! Nodes live in a flat `Vec` of slots indexed by [`NodeId`]. Parent links are
//! plain ids (non-owning), child lists are ordered ids owned by the parent:
//! removing a node removes its whole subtree.
//!
//! A propagation cycle is a depth-first, pre-order walk:
//!
//! ```text
//! propagate(root, block?)
//!   copy block -> root.input        (only if a block is given)
//!   root.transform()
//!   for child in root.children:
//!       copy root.output -> child.input
//!       recurse into child
//! ```
//!
//! The walk keeps its own stack of `(node, parent)` pairs instead of
//! recursing, so tree depth is not bounded by the thread stack. A child's
//! input is copied when it is popped, after its parent and every earlier
//! sibling subtree have run.
//!
//! Every copy is length-checked; a mismatch stops the cycle with
//! [`PipelineError::OutOfBounds`] and leaves the destination untouched.

use crate::config::PipelineConfig;
use crate::pipeline::buffer::{Buffer, Sample};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::id::NodeId;
use crate::pipeline::node::{AnyProcessor, NodeSpec, TransformContext};

/// Soft result of a wiring call. None of these are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireOutcome {
    /// The child was linked under the parent.
    Attached,
    /// The child was already in the parent's list; nothing changed.
    AlreadyChild,
    /// The node already had this parent; nothing changed.
    AlreadyParent,
    /// A node was offered as its own parent; nothing changed.
    NoOpSelfParent,
    /// The node was unlinked from its parent and is now a root.
    Detached,
    /// The node had no parent to detach from.
    AlreadyRoot,
}

/// A slot holding a node, its buffers and its links.
struct NodeSlot {
    label: String,
    input: Buffer,
    output: Buffer,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    processor: AnyProcessor,
    span: tracing::Span,
}

/// The node tree (or forest) and its propagation engine.
pub struct Pipeline {
    slots: Vec<Option<NodeSlot>>,
    walk: Vec<(NodeId, Option<NodeId>)>,
    live: usize,
    cycles: u64,
    trace_propagation: bool,
    span: tracing::Span,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::with_config(&PipelineConfig::default())
    }

    pub fn with_config(config: &PipelineConfig) -> Self {
        Self {
            slots: Vec::new(),
            walk: Vec::new(),
            live: 0,
            cycles: 0,
            trace_propagation: config.trace_propagation,
            span: tracing::Span::none(),
        }
    }

    /// Parent span for every node created afterwards. Each node logs through
    /// its own child span of this one.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn set_trace_propagation(&mut self, enabled: bool) {
        self.trace_propagation = enabled;
    }

    #[inline]
    fn trace_enabled(&self) -> bool {
        cfg!(feature = "node-trace") && self.trace_propagation
    }

    // ── Construction ──

    /// Construct a node and, when `parent` is given, register it as that
    /// parent's last child.
    ///
    /// Both buffers are allocated before anything is inserted, so a failed
    /// allocation leaves the tree untouched.
    pub fn add_node(&mut self, spec: NodeSpec, parent: Option<NodeId>) -> PipelineResult<NodeId> {
        if let Some(p) = parent {
            self.slot(p)?;
        }

        let (in_len, out_len) = spec.resolved_lengths();
        let input = Buffer::zeroed(in_len)?;
        let output = Buffer::zeroed(out_len)?;

        let id = NodeId(self.slots.len() as u32);
        let span = tracing::debug_span!(parent: &self.span, "node", id = id.0, label = %spec.label);
        tracing::debug!(
            parent: &span,
            "Created node '{}' ({}, {} in / {} out)",
            spec.label,
            spec.processor.name(),
            in_len,
            out_len
        );

        self.slots.push(Some(NodeSlot {
            label: spec.label,
            input,
            output,
            parent: None,
            children: Vec::new(),
            processor: spec.processor,
            span,
        }));
        self.live += 1;

        // A fresh node has no descendants, so no cycle check is needed.
        if let Some(p) = parent {
            self.link(p, id)?;
        }
        Ok(id)
    }

    /// Construct a parentless node.
    pub fn add_root(&mut self, spec: NodeSpec) -> PipelineResult<NodeId> {
        self.add_node(spec, None)
    }

    /// Destroy `node` and its whole subtree, releasing all buffers.
    ///
    /// Returns the number of nodes destroyed. Their ids stay invalid.
    pub fn remove(&mut self, node: NodeId) -> PipelineResult<usize> {
        self.slot(node)?;
        self.unlink(node);

        let mut stack = vec![node];
        let mut removed = 0;
        while let Some(id) = stack.pop() {
            if let Some(slot) = self.slots.get_mut(id.index()).and_then(Option::take) {
                tracing::debug!(parent: &slot.span, "Cleaning up node '{}'", slot.label);
                stack.extend(slot.children.iter().rev().copied());
                removed += 1;
            }
        }
        self.live -= removed;
        Ok(removed)
    }

    // ── Wiring ──

    /// Append `child` to `parent`'s children.
    ///
    /// A child already under another parent is moved. Attaching a node below
    /// itself or below one of its own descendants is rejected.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> PipelineResult<WireOutcome> {
        self.slot(child)?;
        let parent_slot = self.slot(parent)?;

        if parent == child {
            tracing::debug!(
                parent: &parent_slot.span,
                "The child you tried to add was equal to itself"
            );
            return Err(PipelineError::SelfReference { node: child });
        }

        if parent_slot.children.contains(&child) {
            tracing::debug!(
                parent: &parent_slot.span,
                "Child {} already exists. Ignoring.",
                child
            );
            return Ok(WireOutcome::AlreadyChild);
        }

        if self.is_ancestor(child, parent) {
            tracing::warn!(
                parent: &parent_slot.span,
                "Refusing to attach {} under its own descendant {}",
                child,
                parent
            );
            return Err(PipelineError::CycleDetected { parent, child });
        }

        self.unlink(child);
        self.link(parent, child)?;
        Ok(WireOutcome::Attached)
    }

    fn link(&mut self, parent: NodeId, child: NodeId) -> PipelineResult<()> {
        self.slot_mut(parent)?.children.push(child);
        let child_slot = self.slot_mut(child)?;
        child_slot.parent = Some(parent);
        tracing::debug!(parent: &child_slot.span, "Attached under {}", parent);
        Ok(())
    }

    /// Make `parent` the parent of `node`.
    ///
    /// The node is removed from its previous parent's children and appended to
    /// the new parent's, so both directions of the link stay consistent.
    pub fn set_parent(&mut self, node: NodeId, parent: NodeId) -> PipelineResult<WireOutcome> {
        self.slot(parent)?;
        let slot = self.slot(node)?;

        if node == parent {
            tracing::debug!(
                parent: &slot.span,
                "The parent you tried to add was equal to itself. No change made."
            );
            return Ok(WireOutcome::NoOpSelfParent);
        }
        if slot.parent == Some(parent) {
            return Ok(WireOutcome::AlreadyParent);
        }

        self.add_child(parent, node)
    }

    /// Unlink `node` from its parent, making it the root of its own subtree.
    pub fn detach(&mut self, node: NodeId) -> PipelineResult<WireOutcome> {
        if self.slot(node)?.parent.is_none() {
            return Ok(WireOutcome::AlreadyRoot);
        }
        self.unlink(node);
        Ok(WireOutcome::Detached)
    }

    fn unlink(&mut self, node: NodeId) {
        let old_parent = self
            .slots
            .get_mut(node.index())
            .and_then(Option::as_mut)
            .and_then(|slot| slot.parent.take());

        if let Some(p) = old_parent {
            if let Some(parent_slot) = self.slots.get_mut(p.index()).and_then(Option::as_mut) {
                parent_slot.children.retain(|&c| c != node);
            }
        }
    }

    /// True if `candidate` is `node` or one of its ancestors.
    fn is_ancestor(&self, candidate: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        // Bounded walk: a consistent tree is never deeper than its node count.
        for _ in 0..=self.slots.len() {
            match current {
                Some(id) if id == candidate => return true,
                Some(id) => current = self.slot(id).ok().and_then(|s| s.parent),
                None => return false,
            }
        }
        false
    }

    // ── Buffers ──

    /// Reallocate both buffers to `len` zeroed samples.
    pub fn resize(&mut self, node: NodeId, len: usize) -> PipelineResult<()> {
        self.slot(node)?;
        let input = Buffer::zeroed(len)?;
        let output = Buffer::zeroed(len)?;

        let slot = self.slot_mut(node)?;
        slot.input = input;
        slot.output = output;
        tracing::debug!(parent: &slot.span, "Resized buffers to {}", len);
        Ok(())
    }

    /// Reallocate the input buffer to `len` zeroed samples.
    pub fn resize_input(&mut self, node: NodeId, len: usize) -> PipelineResult<()> {
        let slot = self.slot_mut(node)?;
        slot.input.resize(len)?;
        tracing::debug!(parent: &slot.span, "Resized input to {}", len);
        Ok(())
    }

    /// Reallocate the output buffer to `len` zeroed samples.
    pub fn resize_output(&mut self, node: NodeId, len: usize) -> PipelineResult<()> {
        let slot = self.slot_mut(node)?;
        slot.output.resize(len)?;
        tracing::debug!(parent: &slot.span, "Resized output to {}", len);
        Ok(())
    }

    // ── Propagation ──

    /// Run one propagation cycle over the subtree rooted at `node`.
    ///
    /// With `Some(block)` the block is first copied into the node's input; it
    /// must match the input length exactly. With `None` the input is used as
    /// it stands (the driver writes it through [`Pipeline::input_mut`]).
    pub fn propagate(&mut self, node: NodeId, block: Option<&[Sample]>) -> PipelineResult<()> {
        match block {
            Some(block) => self.load_input(node, block)?,
            None => {
                self.slot(node)?;
            }
        }

        let cycle = self.cycles;
        self.update_subtree(node, cycle)?;
        self.cycles += 1;
        Ok(())
    }

    fn load_input(&mut self, node: NodeId, block: &[Sample]) -> PipelineResult<()> {
        let slot = self.slot_mut(node)?;
        slot.input
            .copy_from(block)
            .map_err(|m| PipelineError::OutOfBounds {
                node,
                label: slot.label.clone(),
                expected: m.expected,
                actual: m.actual,
            })
    }

    fn update_subtree(&mut self, node: NodeId, cycle: u64) -> PipelineResult<()> {
        let mut stack = std::mem::take(&mut self.walk);
        stack.clear();
        stack.push((node, None));
        let result = self.walk_preorder(&mut stack, cycle);
        self.walk = stack;
        result
    }

    fn walk_preorder(
        &mut self,
        stack: &mut Vec<(NodeId, Option<NodeId>)>,
        cycle: u64,
    ) -> PipelineResult<()> {
        while let Some((node, parent)) = stack.pop() {
            if let Some(parent) = parent {
                self.copy_to_child(parent, node)?;
            }
            self.run_transform(node, cycle)?;

            // Reversed so the first child is popped first.
            let children = &self.slot(node)?.children;
            stack.extend(children.iter().rev().map(|&c| (c, Some(node))));
        }
        Ok(())
    }

    fn run_transform(&mut self, node: NodeId, cycle: u64) -> PipelineResult<()> {
        let trace = self.trace_enabled();
        let NodeSlot {
            label,
            input,
            output,
            processor,
            span,
            ..
        } = self.slot_mut(node)?;

        if trace {
            tracing::trace!(parent: &*span, "Update called on node '{}' (cycle {})", label, cycle);
        }

        let mut ctx = TransformContext {
            node,
            label: label.as_str(),
            input: input.as_slice(),
            output,
            cycle,
            span: &*span,
        };
        processor.transform(&mut ctx)
    }

    fn copy_to_child(&mut self, parent: NodeId, child: NodeId) -> PipelineResult<()> {
        let (p, c) = self.pair_mut(parent, child)?;
        c.input
            .copy_from(p.output.as_slice())
            .map_err(|m| PipelineError::OutOfBounds {
                node: child,
                label: c.label.clone(),
                expected: m.expected,
                actual: m.actual,
            })
    }

    /// Borrow one slot shared and another mutably.
    fn pair_mut(&mut self, a: NodeId, b: NodeId) -> PipelineResult<(&NodeSlot, &mut NodeSlot)> {
        let (ai, bi) = (a.index(), b.index());
        if ai == bi {
            return Err(PipelineError::SelfReference { node: a });
        }
        if ai >= self.slots.len() {
            return Err(PipelineError::UnknownNode(a));
        }
        if bi >= self.slots.len() {
            return Err(PipelineError::UnknownNode(b));
        }

        let (first, second) = if ai < bi {
            let (lo, hi) = self.slots.split_at_mut(bi);
            (&lo[ai], &mut hi[0])
        } else {
            let (lo, hi) = self.slots.split_at_mut(ai);
            (&hi[0], &mut lo[bi])
        };

        let first = first.as_ref().ok_or(PipelineError::UnknownNode(a))?;
        let second = second.as_mut().ok_or(PipelineError::UnknownNode(b))?;
        Ok((first, second))
    }

    /// Check every parent/child length contract below `root` without running
    /// any transform. Reports the first mismatch in pre-order.
    pub fn validate_lengths(&self, root: NodeId) -> PipelineResult<()> {
        for id in self.descendants(root)? {
            let slot = self.slot(id)?;
            for &child in &slot.children {
                let child_slot = self.slot(child)?;
                if child_slot.input.len() != slot.output.len() {
                    return Err(PipelineError::OutOfBounds {
                        node: child,
                        label: child_slot.label.clone(),
                        expected: child_slot.input.len(),
                        actual: slot.output.len(),
                    });
                }
            }
        }
        Ok(())
    }

    // ── Inspection ──

    fn slot(&self, id: NodeId) -> PipelineResult<&NodeSlot> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(PipelineError::UnknownNode(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> PipelineResult<&mut NodeSlot> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(PipelineError::UnknownNode(id))
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_ok()
    }

    /// Completed propagation cycles.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn label(&self, id: NodeId) -> PipelineResult<&str> {
        Ok(&self.slot(id)?.label)
    }

    pub fn parent(&self, id: NodeId) -> PipelineResult<Option<NodeId>> {
        Ok(self.slot(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> PipelineResult<&[NodeId]> {
        Ok(&self.slot(id)?.children)
    }

    pub fn input(&self, id: NodeId) -> PipelineResult<&[Sample]> {
        Ok(self.slot(id)?.input.as_slice())
    }

    /// Writable input buffer, for the driver to fill before `propagate`.
    pub fn input_mut(&mut self, id: NodeId) -> PipelineResult<&mut [Sample]> {
        Ok(self.slot_mut(id)?.input.as_mut_slice())
    }

    pub fn output(&self, id: NodeId) -> PipelineResult<&[Sample]> {
        Ok(self.slot(id)?.output.as_slice())
    }

    pub fn input_len(&self, id: NodeId) -> PipelineResult<usize> {
        Ok(self.slot(id)?.input.len())
    }

    pub fn output_len(&self, id: NodeId) -> PipelineResult<usize> {
        Ok(self.slot(id)?.output.len())
    }

    pub fn processor(&self, id: NodeId) -> PipelineResult<&AnyProcessor> {
        Ok(&self.slot(id)?.processor)
    }

    pub fn processor_mut(&mut self, id: NodeId) -> PipelineResult<&mut AnyProcessor> {
        Ok(&mut self.slot_mut(id)?.processor)
    }

    /// Ids of all live nodes in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_some())
            .map(|(i, _)| NodeId(i as u32))
    }

    /// Live nodes without a parent.
    pub fn roots(&self) -> Vec<NodeId> {
        self.node_ids()
            .filter(|&id| matches!(self.slot(id), Ok(s) if s.parent.is_none()))
            .collect()
    }

    /// `root` and everything below it, in propagation (pre-)order.
    pub fn descendants(&self, root: NodeId) -> PipelineResult<Vec<NodeId>> {
        self.slot(root)?;
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.slot(id)?.children.iter().rev().copied());
        }
        Ok(order)
    }

    /// Parent, grandparent, ... up to the root.
    pub fn ancestors(&self, id: NodeId) -> PipelineResult<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut current = self.slot(id)?.parent;
        while let Some(p) = current {
            out.push(p);
            current = self.slot(p)?.parent;
        }
        Ok(out)
    }

    /// First live node carrying `label`. Labels are unique by convention only.
    pub fn find_by_label(&self, label: &str) -> Option<NodeId> {
        self.node_ids()
            .find(|&id| matches!(self.slot(id), Ok(s) if s.label == label))
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::node::Processor;
    use crate::pipeline::nodes::PassthroughNode;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    /// Logs every call and writes a fixed block (or the input) to its output.
    struct Recorder {
        log: Arc<Mutex<Vec<String>>>,
        fill: Option<Vec<f32>>,
    }

    impl Processor for Recorder {
        fn name(&self) -> &str {
            "Recorder"
        }

        fn transform(&mut self, ctx: &mut TransformContext<'_>) -> PipelineResult<()> {
            self.log.lock().unwrap().push(ctx.label.to_string());
            let out = ctx.output.as_mut_slice();
            match &self.fill {
                Some(fill) => out.copy_from_slice(fill),
                None => out.copy_from_slice(ctx.input),
            }
            Ok(())
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>) -> AnyProcessor {
        AnyProcessor::plugin(Recorder {
            log: log.clone(),
            fill: None,
        })
    }

    fn passthrough(label: &str, len: usize) -> NodeSpec {
        NodeSpec::new(label, PassthroughNode::new()).length(len)
    }

    #[test]
    fn test_construct_registers_with_parent() {
        let mut p = Pipeline::new();
        let root = p.add_root(passthrough("root", 4)).unwrap();
        let child = p.add_node(passthrough("child", 4), Some(root)).unwrap();

        assert_eq!(p.parent(child).unwrap(), Some(root));
        assert_eq!(p.children(root).unwrap(), &[child]);
        assert_eq!(p.len(), 2);
        assert_eq!(p.roots(), vec![root]);
    }

    #[test]
    fn test_construct_zeroes_buffers() {
        let mut p = Pipeline::new();
        let id = p
            .add_root(NodeSpec::new("n", PassthroughNode::new()).lengths(7, 3))
            .unwrap();
        assert_eq!(p.input(id).unwrap(), &[0.0; 7]);
        assert_eq!(p.output(id).unwrap(), &[0.0; 3]);
    }

    #[test]
    fn test_construct_with_unknown_parent_inserts_nothing() {
        let mut p = Pipeline::new();
        let err = p.add_node(passthrough("orphan", 4), Some(NodeId(9))).unwrap_err();
        assert_eq!(err, PipelineError::UnknownNode(NodeId(9)));
        assert!(p.is_empty());
    }

    #[test]
    fn test_failed_allocation_inserts_nothing() {
        let mut p = Pipeline::new();
        let err = p
            .add_root(NodeSpec::new("huge", PassthroughNode::new()).lengths(usize::MAX, 1))
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(p.is_empty());
    }

    #[test]
    fn test_add_child_self_is_rejected() {
        let mut p = Pipeline::new();
        let n = p.add_root(passthrough("n", 4)).unwrap();
        assert_eq!(
            p.add_child(n, n),
            Err(PipelineError::SelfReference { node: n })
        );
        assert!(p.children(n).unwrap().is_empty());
        assert_eq!(p.parent(n).unwrap(), None);
    }

    #[test]
    fn test_add_child_twice_is_noop() {
        let mut p = Pipeline::new();
        let parent = p.add_root(passthrough("parent", 4)).unwrap();
        let child = p.add_root(passthrough("child", 4)).unwrap();

        assert_eq!(p.add_child(parent, child), Ok(WireOutcome::Attached));
        assert_eq!(p.add_child(parent, child), Ok(WireOutcome::AlreadyChild));
        assert_eq!(p.children(parent).unwrap().len(), 1);
    }

    #[test]
    fn test_set_parent_self_is_noop() {
        let mut p = Pipeline::new();
        let root = p.add_root(passthrough("root", 4)).unwrap();
        let n = p.add_node(passthrough("n", 4), Some(root)).unwrap();

        assert_eq!(p.set_parent(n, n), Ok(WireOutcome::NoOpSelfParent));
        assert_eq!(p.parent(n).unwrap(), Some(root));
        assert_eq!(p.set_parent(n, root), Ok(WireOutcome::AlreadyParent));
    }

    #[test]
    fn test_set_parent_moves_between_parents() {
        let mut p = Pipeline::new();
        let root = p.add_root(passthrough("root", 4)).unwrap();
        let a = p.add_node(passthrough("a", 4), Some(root)).unwrap();
        let b = p.add_node(passthrough("b", 4), Some(root)).unwrap();
        let leaf = p.add_node(passthrough("leaf", 4), Some(a)).unwrap();

        assert_eq!(p.set_parent(leaf, b), Ok(WireOutcome::Attached));
        assert_eq!(p.parent(leaf).unwrap(), Some(b));
        assert!(p.children(a).unwrap().is_empty());
        assert_eq!(p.children(b).unwrap(), &[leaf]);
    }

    #[test]
    fn test_indirect_cycle_is_rejected() {
        let mut p = Pipeline::new();
        let root = p.add_root(passthrough("root", 4)).unwrap();
        let a = p.add_node(passthrough("a", 4), Some(root)).unwrap();
        let b = p.add_node(passthrough("b", 4), Some(a)).unwrap();

        assert_eq!(
            p.set_parent(root, b),
            Err(PipelineError::CycleDetected {
                parent: b,
                child: root
            })
        );
        assert_eq!(
            p.add_child(b, a),
            Err(PipelineError::CycleDetected { parent: b, child: a })
        );
        assert_eq!(p.parent(root).unwrap(), None);
        assert_eq!(p.parent(a).unwrap(), Some(root));
    }

    #[test]
    fn test_detach() {
        let mut p = Pipeline::new();
        let root = p.add_root(passthrough("root", 4)).unwrap();
        let a = p.add_node(passthrough("a", 4), Some(root)).unwrap();

        assert_eq!(p.detach(a), Ok(WireOutcome::Detached));
        assert_eq!(p.detach(a), Ok(WireOutcome::AlreadyRoot));
        assert!(p.children(root).unwrap().is_empty());
        assert_eq!(p.roots(), vec![root, a]);
    }

    #[test]
    fn test_remove_is_recursive() {
        let mut p = Pipeline::new();
        let root = p.add_root(passthrough("root", 4)).unwrap();
        let a = p.add_node(passthrough("a", 4), Some(root)).unwrap();
        let b = p.add_node(passthrough("b", 4), Some(a)).unwrap();
        let c = p.add_node(passthrough("c", 4), Some(a)).unwrap();
        let d = p.add_node(passthrough("d", 4), Some(root)).unwrap();

        assert_eq!(p.remove(a).unwrap(), 3);
        assert_eq!(p.len(), 2);
        for gone in [a, b, c] {
            assert!(!p.contains(gone));
            assert_eq!(p.label(gone), Err(PipelineError::UnknownNode(gone)));
        }
        assert_eq!(p.children(root).unwrap(), &[d]);

        // Ids are not recycled.
        let e = p.add_root(passthrough("e", 4)).unwrap();
        assert_ne!(e, a);
    }

    #[test]
    fn test_resize_variants() {
        let mut p = Pipeline::new();
        let n = p.add_root(passthrough("n", 4)).unwrap();
        p.input_mut(n).unwrap().fill(1.0);

        p.resize_input(n, 6).unwrap();
        assert_eq!(p.input(n).unwrap(), &[0.0; 6]);
        assert_eq!(p.output_len(n).unwrap(), 4);

        p.resize_output(n, 2).unwrap();
        assert_eq!(p.output_len(n).unwrap(), 2);

        p.resize(n, 8).unwrap();
        assert_eq!(p.input_len(n).unwrap(), 8);
        assert_eq!(p.output_len(n).unwrap(), 8);
    }

    #[test]
    fn test_scenario_a_identity_child_sees_parent_output() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut p = Pipeline::new();
        let root = p
            .add_root(
                NodeSpec::new(
                    "root",
                    AnyProcessor::plugin(Recorder {
                        log: log.clone(),
                        fill: Some(vec![1.0, 2.0, 3.0, 4.0]),
                    }),
                )
                .lengths(0, 4),
            )
            .unwrap();
        let child = p.add_node(passthrough("child", 4), Some(root)).unwrap();

        p.propagate(root, None).unwrap();
        assert_eq!(p.output(child).unwrap(), &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(p.cycles(), 1);
    }

    #[test]
    fn test_scenario_b_short_block_is_rejected() {
        let mut p = Pipeline::new();
        let n = p.add_root(passthrough("n", 10)).unwrap();

        let err = p.propagate(n, Some(&[1.0; 5])).unwrap_err();
        assert_eq!(
            err,
            PipelineError::OutOfBounds {
                node: n,
                label: "n".to_string(),
                expected: 10,
                actual: 5,
            }
        );
        assert_eq!(p.input(n).unwrap(), &[0.0; 10]);
        assert_eq!(p.cycles(), 0);
    }

    #[test]
    fn test_propagation_is_preorder() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut p = Pipeline::new();
        let spec = |label: &str| NodeSpec::new(label, recorder(&log)).length(2);

        let root = p.add_root(spec("root")).unwrap();
        let a = p.add_node(spec("A"), Some(root)).unwrap();
        p.add_node(spec("B"), Some(a)).unwrap();
        p.add_node(spec("C"), Some(a)).unwrap();
        let d = p.add_node(spec("D"), Some(root)).unwrap();
        p.add_node(spec("E"), Some(d)).unwrap();

        p.propagate(root, Some(&[0.5, 0.25])).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["root", "A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_child_copy_is_isolated_from_parent() {
        let mut p = Pipeline::new();
        let root = p.add_root(passthrough("root", 3)).unwrap();
        let child = p.add_node(passthrough("child", 3), Some(root)).unwrap();

        p.propagate(root, Some(&[1.0, 2.0, 3.0])).unwrap();
        p.input_mut(child).unwrap().fill(-9.0);

        assert_eq!(p.output(root).unwrap(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_mismatched_child_fails_loudly() {
        let mut p = Pipeline::new();
        let root = p.add_root(passthrough("root", 4)).unwrap();
        let good = p.add_node(passthrough("good", 4), Some(root)).unwrap();
        let bad = p.add_node(passthrough("bad", 3), Some(root)).unwrap();

        assert!(matches!(
            p.validate_lengths(root),
            Err(PipelineError::OutOfBounds { node, expected: 3, actual: 4, .. }) if node == bad
        ));

        let err = p.propagate(root, Some(&[1.0; 4])).unwrap_err();
        assert!(matches!(err, PipelineError::OutOfBounds { node, .. } if node == bad));
        // The child before it in order was updated; the bad one was not touched.
        assert_eq!(p.output(good).unwrap(), &[1.0; 4]);
        assert_eq!(p.input(bad).unwrap(), &[0.0; 3]);
        assert_eq!(p.input_len(bad).unwrap(), 3);
        assert_eq!(p.cycles(), 0);
    }

    #[test]
    fn test_propagate_subtree_only() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut p = Pipeline::new();
        let spec = |label: &str| NodeSpec::new(label, recorder(&log)).length(1);

        let root = p.add_root(spec("root")).unwrap();
        let a = p.add_node(spec("A"), Some(root)).unwrap();
        p.add_node(spec("B"), Some(a)).unwrap();
        p.add_node(spec("C"), Some(root)).unwrap();

        p.propagate(a, None).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn test_inspection_helpers() {
        let mut p = Pipeline::new();
        let root = p.add_root(passthrough("root", 2)).unwrap();
        let a = p.add_node(passthrough("a", 2), Some(root)).unwrap();
        let b = p.add_node(passthrough("b", 2), Some(a)).unwrap();
        let c = p.add_node(passthrough("c", 2), Some(root)).unwrap();

        assert_eq!(p.descendants(root).unwrap(), vec![root, a, b, c]);
        assert_eq!(p.ancestors(b).unwrap(), vec![a, root]);
        assert_eq!(p.find_by_label("c"), Some(c));
        assert_eq!(p.find_by_label("missing"), None);
        assert_eq!(p.processor(a).unwrap().name(), "Passthrough");
        assert_eq!(p.node_ids().count(), 4);
    }

    /// Republishes its output at `len` samples, all set to `value`.
    struct Republish {
        len: usize,
        value: f32,
    }

    impl Processor for Republish {
        fn name(&self) -> &str {
            "Republish"
        }

        fn transform(&mut self, ctx: &mut TransformContext<'_>) -> PipelineResult<()> {
            ctx.output.resize(self.len)?;
            ctx.output.as_mut_slice().fill(self.value);
            Ok(())
        }
    }

    struct Failing;

    impl Processor for Failing {
        fn name(&self) -> &str {
            "Failing"
        }

        fn transform(&mut self, ctx: &mut TransformContext<'_>) -> PipelineResult<()> {
            Err(PipelineError::Transform {
                node: ctx.node,
                message: format!("'{}' refused block", ctx.label),
            })
        }
    }

    #[test]
    fn test_republished_output_mismatch_stops_at_child() {
        let mut p = Pipeline::new();
        let root = p
            .add_root(
                NodeSpec::new("root", AnyProcessor::plugin(Republish { len: 6, value: 7.0 })).length(4),
            )
            .unwrap();
        let child = p.add_node(passthrough("child", 4), Some(root)).unwrap();

        let err = p.propagate(root, Some(&[1.0; 4])).unwrap_err();
        assert_eq!(
            err,
            PipelineError::OutOfBounds {
                node: child,
                label: "child".to_string(),
                expected: 4,
                actual: 6,
            }
        );
        assert_eq!(p.output_len(root).unwrap(), 6);
        assert_eq!(p.input(child).unwrap(), &[0.0; 4]);
        assert_eq!(p.cycles(), 0);
    }

    #[test]
    fn test_republished_output_reaches_matching_child() {
        let mut p = Pipeline::new();
        let root = p
            .add_root(
                NodeSpec::new("root", AnyProcessor::plugin(Republish { len: 2, value: 7.0 })).length(4),
            )
            .unwrap();
        let child = p.add_node(passthrough("child", 2), Some(root)).unwrap();
        assert!(p.validate_lengths(root).is_err());

        p.propagate(root, Some(&[1.0; 4])).unwrap();
        assert_eq!(p.output_len(root).unwrap(), 2);
        assert_eq!(p.output(child).unwrap(), &[7.0, 7.0]);
        assert!(p.validate_lengths(root).is_ok());
    }

    #[test]
    fn test_transform_error_passes_through() {
        let mut p = Pipeline::new();
        let root = p.add_root(passthrough("root", 2)).unwrap();
        let bad = p
            .add_node(NodeSpec::new("bad", AnyProcessor::plugin(Failing)).length(2), Some(root))
            .unwrap();
        let below = p.add_node(passthrough("below", 2), Some(bad)).unwrap();

        let err = p.propagate(root, Some(&[1.0, 2.0])).unwrap_err();
        assert_eq!(
            err,
            PipelineError::Transform {
                node: bad,
                message: "'bad' refused block".to_string(),
            }
        );
        assert!(!err.is_fatal());
        assert_eq!(p.input(below).unwrap(), &[0.0; 2]);
        assert_eq!(p.cycles(), 0);
    }

    #[test]
    fn test_deep_chain_propagates() {
        const DEPTH: usize = 50_000;
        let mut p = Pipeline::new();
        p.set_trace_propagation(false);
        let root = p.add_root(passthrough("n0", 1)).unwrap();
        let mut last = root;
        for i in 1..DEPTH {
            last = p.add_node(passthrough(&format!("n{}", i), 1), Some(last)).unwrap();
        }

        p.propagate(root, Some(&[1.0])).unwrap();
        assert_eq!(p.output(last).unwrap(), &[1.0]);
        assert_eq!(p.ancestors(last).unwrap().len(), DEPTH - 1);
        assert_eq!(p.remove(root).unwrap(), DEPTH);
        assert!(p.is_empty());
    }

    fn build_random_tree(p: &mut Pipeline, parents: &[usize]) -> Vec<NodeId> {
        let mut ids = vec![p.add_root(passthrough("n0", 2)).unwrap()];
        for (i, &pick) in parents.iter().enumerate() {
            let parent = ids[pick % ids.len()];
            let id = p
                .add_node(passthrough(&format!("n{}", i + 1), 2), Some(parent))
                .unwrap();
            ids.push(id);
        }
        ids
    }

    fn assert_links_consistent(p: &Pipeline) {
        for id in p.node_ids() {
            if let Some(parent) = p.parent(id).unwrap() {
                let count = p
                    .children(parent)
                    .unwrap()
                    .iter()
                    .filter(|&&c| c == id)
                    .count();
                assert_eq!(count, 1, "{} listed {} times under {}", id, count, parent);
            }
            for &child in p.children(id).unwrap() {
                assert_eq!(p.parent(child).unwrap(), Some(id));
            }
            // Terminates only if there is no cycle.
            assert!(p.ancestors(id).unwrap().len() < p.len());
        }
    }

    proptest! {
        #[test]
        fn prop_buffers_zeroed(input_len in 0usize..512, output_len in 0usize..512, new_len in 0usize..512) {
            let mut p = Pipeline::new();
            let id = p
                .add_root(NodeSpec::new("n", PassthroughNode::new()).lengths(input_len, output_len))
                .unwrap();
            prop_assert!(p.input(id).unwrap().iter().all(|&s| s == 0.0));
            prop_assert!(p.output(id).unwrap().iter().all(|&s| s == 0.0));

            p.input_mut(id).unwrap().fill(1.0);
            p.resize(id, new_len).unwrap();
            prop_assert_eq!(p.input_len(id).unwrap(), new_len);
            prop_assert!(p.input(id).unwrap().iter().all(|&s| s == 0.0));
            prop_assert!(p.output(id).unwrap().iter().all(|&s| s == 0.0));
        }

        #[test]
        fn prop_repeated_add_child_keeps_one_entry(repeats in 1usize..8) {
            let mut p = Pipeline::new();
            let parent = p.add_root(passthrough("parent", 2)).unwrap();
            let child = p.add_root(passthrough("child", 2)).unwrap();
            for _ in 0..repeats {
                p.add_child(parent, child).unwrap();
            }
            prop_assert_eq!(p.children(parent).unwrap().len(), 1);
        }

        #[test]
        fn prop_rewiring_keeps_tree_consistent(
            parents in prop::collection::vec(0usize..64, 1..24),
            moves in prop::collection::vec((0usize..64, 0usize..64), 0..32),
        ) {
            let mut p = Pipeline::new();
            let ids = build_random_tree(&mut p, &parents);

            for (node, parent) in moves {
                let node = ids[node % ids.len()];
                let parent = ids[parent % ids.len()];
                match p.set_parent(node, parent) {
                    Ok(_) | Err(PipelineError::CycleDetected { .. }) => {}
                    Err(e) => prop_assert!(false, "unexpected error {:?}", e),
                }
            }
            assert_links_consistent(&p);
        }

        #[test]
        fn prop_propagation_preserves_lengths(
            parents in prop::collection::vec(0usize..64, 1..16),
            block in prop::collection::vec(-1.0f32..1.0, 2),
        ) {
            let mut p = Pipeline::new();
            let ids = build_random_tree(&mut p, &parents);
            p.propagate(ids[0], Some(&block)).unwrap();

            for &id in &ids {
                prop_assert_eq!(p.input_len(id).unwrap(), 2);
                prop_assert_eq!(p.output(id).unwrap(), block.as_slice());
            }
        }
    }
}
