//! Test data builders for creating pipelines

use beatline::pipeline::nodes::PassthroughNode;
use beatline::{NodeId, NodeSpec, Pipeline};

/// Builder for pipelines made of passthrough nodes
pub struct TreeBuilder {
    pipeline: Pipeline,
    length: usize,
}

impl TreeBuilder {
    pub fn new(length: usize) -> Self {
        Self {
            pipeline: Pipeline::new(),
            length,
        }
    }

    /// Add a passthrough node labelled `label` under `parent`.
    pub fn node(&mut self, label: &str, parent: Option<NodeId>) -> NodeId {
        self.pipeline
            .add_node(
                NodeSpec::new(label, PassthroughNode::new()).length(self.length),
                parent,
            )
            .unwrap()
    }

    /// Add a straight chain of `depth` nodes below `parent`; returns them in order.
    pub fn chain(&mut self, prefix: &str, depth: usize, parent: Option<NodeId>) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(depth);
        let mut last = parent;
        for i in 0..depth {
            let id = self.node(&format!("{}{}", prefix, i), last);
            ids.push(id);
            last = Some(id);
        }
        ids
    }

    pub fn build(self) -> Pipeline {
        self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_builder_chain() {
        let mut builder = TreeBuilder::new(8);
        let ids = builder.chain("n", 3, None);
        let pipeline = builder.build();

        assert_eq!(pipeline.len(), 3);
        assert_eq!(pipeline.ancestors(ids[2]).unwrap(), vec![ids[1], ids[0]]);
        assert_eq!(pipeline.label(ids[1]).unwrap(), "n1");
    }
}
