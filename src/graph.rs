use std::hash::Hasher;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHasher};
use smallvec::SmallVec;

use crate::operator::{InputList, Operator, Shape};
use crate::value::{DataType, Value, ValueType};

mod node;
mod node_id;
mod run_error;

#[cfg(test)]
mod tests;

pub use node::{Constant, Node, OperatorNode, ValueNode};
pub use node_id::NodeId;
pub use run_error::RunError;

/// A graph of lowered operators.
///
/// Nodes are appended in topological order. A node's inputs must already
/// be in the graph when it is added, and nodes are never removed.
#[derive(Default)]
pub struct Graph {
    nodes: Vec<Node>,

    /// Map from value name to the node which produces it.
    names: FxHashMap<String, NodeId>,

    /// Map from operator identity and inputs to operator nodes.
    op_index: FxHashMap<u64, SmallVec<[NodeId; 1]>>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Graph {
        Graph::default()
    }

    /// Return the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Add a value node to the graph.
    ///
    /// This serves as a placeholder for a value which is supplied when the
    /// graph is run.
    pub fn add_value(&mut self, name: Option<&str>, shape: &[usize], dtype: DataType) -> NodeId {
        self.push_node(Node::Value(ValueNode::new(name, shape, dtype)))
    }

    /// Add a constant node to the graph.
    pub fn add_constant(&mut self, name: Option<&str>, value: impl Into<Value>) -> NodeId {
        self.push_node(Node::Constant(Constant::new(name, value.into())))
    }

    /// Add an operator node to the graph.
    ///
    /// `shape` and `dtype` describe the operator's output, as inferred from
    /// the shapes and types of `inputs`.
    pub(crate) fn add_op(
        &mut self,
        name: Option<&str>,
        op: Arc<dyn Operator + Send + Sync>,
        inputs: &[NodeId],
        shape: Shape,
        dtype: DataType,
    ) -> NodeId {
        let key = op_key(&*op, inputs);
        let id = self.push_node(Node::Operator(OperatorNode::new(
            name, inputs, op, shape, dtype,
        )));
        self.op_index.entry(key).or_default().push(id);
        id
    }

    /// Make `name` refer to an existing node.
    ///
    /// This is used when a node is deduplicated against an existing node, so
    /// that later references to its output name resolve to the existing node.
    pub(crate) fn add_alias(&mut self, name: &str, id: NodeId) {
        self.names.insert(name.to_string(), id);
    }

    /// Find an existing operator node which applies the same operator
    /// configuration to the same inputs.
    pub fn find_operator(&self, op: &dyn Operator, inputs: &[NodeId]) -> Option<NodeId> {
        let candidates = self.op_index.get(&op_key(op, inputs))?;
        candidates.iter().copied().find(|id| {
            self.get_node(*id)
                .and_then(|node| node.as_operator())
                .is_some_and(|node| node.input_ids() == inputs && node.operator().is_same(op))
        })
    }

    /// Return the node with a given ID.
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.as_usize())
    }

    /// Return the ID of the node which produces a named value.
    pub fn get_node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Return the debug name for a node.
    pub fn node_name(&self, id: NodeId) -> String {
        self.get_node(id)
            .and_then(|node| node.name())
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("[ID: {}]", id))
    }

    /// Return an iterator over nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId::from_u32(i as u32), node))
    }

    /// Run a single operator node with concrete inputs.
    ///
    /// Inputs are supplied in the same order as the node's input IDs.
    ///
    /// The output's element type is checked against the node, but its shape
    /// is not. An ArgMax over a 1D input with `keepdims` set is recorded with
    /// shape `[1]` but produces a scalar, so nodes lowered against the
    /// recorded shape may reject the actual output.
    pub fn run_op<'a>(
        &self,
        id: NodeId,
        inputs: impl Into<InputList<'a>>,
    ) -> Result<Value, RunError> {
        let node = self
            .get_node(id)
            .ok_or(RunError::InvalidNodeId(id))?
            .as_operator()
            .ok_or(RunError::NotAnOperator(id))?;
        let inputs = inputs.into();
        let name = || self.node_name(id);

        if inputs.len() != node.input_ids().len() {
            return Err(RunError::InputCountMismatch {
                name: name(),
                expected: node.input_ids().len(),
                actual: inputs.len(),
            });
        }

        let output = node
            .operator()
            .run(&inputs)
            .map_err(|error| RunError::OperatorError {
                name: name(),
                error,
            })?
            .into_iter()
            .next()
            .ok_or_else(|| RunError::MissingOutput { name: name() })?;

        if output.value_type() != ValueType::Tensor(node.dtype()) {
            return Err(RunError::OutputTypeMismatch {
                name: name(),
                expected: node.dtype(),
                actual: output.value_type(),
            });
        }

        Ok(output)
    }

    fn push_node(&mut self, node: Node) -> NodeId {
        let id = NodeId::from_u32(self.nodes.len() as u32);
        if let Some(name) = node.name() {
            self.names.insert(name.to_string(), id);
        }
        self.nodes.push(node);
        id
    }
}

/// Compute the key used to find operator nodes with the same configuration
/// and inputs.
fn op_key(op: &dyn Operator, inputs: &[NodeId]) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_u64(op.identity_hash());
    for input in inputs {
        hasher.write_u32(input.as_u32());
    }
    hasher.finish()
}
