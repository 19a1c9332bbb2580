use std::iter::Iterator;

use super::TreeNode;
use multisplit::{Float, Label};

/// Pre-order (DFS) iterator of nodes in a decision tree, children are visited in branch order
pub struct NodeIter<'a, F, L> {
    queue: Vec<&'a TreeNode<F, L>>,
}

impl<'a, F, L> NodeIter<'a, F, L> {
    pub fn new(queue: Vec<&'a TreeNode<F, L>>) -> Self {
        NodeIter { queue }
    }
}

impl<'a, F: Float, L: Label> Iterator for NodeIter<'a, F, L> {
    type Item = &'a TreeNode<F, L>;

    fn next(&mut self) -> Option<Self::Item> {
        self.queue.pop().map(|node| {
            // the first child ends up on top of the stack
            self.queue.extend(node.children().iter().rev());

            node
        })
    }
}
