use std::sync::Arc;

use super::NodeId;
use crate::operator::{Operator, Shape};
use crate::value::{DataType, Value};

#[derive(Debug)]
pub enum Node {
    Operator(OperatorNode),
    Constant(Constant),
    Value(ValueNode),
}

impl Node {
    /// Return the debug name of this node
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Operator(node) => node.name(),
            Node::Constant(constant) => constant.name(),
            Node::Value(node) => node.name(),
        }
    }

    /// Return the shape of the value this node produces.
    ///
    /// For operators this is the shape inferred when the node was lowered.
    pub fn shape(&self) -> &[usize] {
        match self {
            Node::Operator(node) => node.shape(),
            Node::Constant(constant) => constant.shape(),
            Node::Value(node) => node.shape(),
        }
    }

    /// Return the element type of the value this node produces.
    pub fn dtype(&self) -> DataType {
        match self {
            Node::Operator(node) => node.dtype(),
            Node::Constant(constant) => constant.dtype(),
            Node::Value(node) => node.dtype(),
        }
    }

    /// Return the contained operator, if this an operator node.
    pub fn as_operator(&self) -> Option<&OperatorNode> {
        match self {
            Node::Operator(op) => Some(op),
            _ => None,
        }
    }

    /// Return the contained constant, if this a constant node.
    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Node::Constant(c) => Some(c),
            _ => None,
        }
    }
}

/// A node which applies an operator to the outputs of other nodes.
#[derive(Debug)]
pub struct OperatorNode {
    name: Option<String>,
    inputs: Box<[NodeId]>,
    operator: Arc<dyn Operator + Send + Sync>,
    shape: Shape,
    dtype: DataType,
}

impl OperatorNode {
    pub fn new(
        name: Option<&str>,
        input_ids: &[NodeId],
        operator: Arc<dyn Operator + Send + Sync>,
        shape: Shape,
        dtype: DataType,
    ) -> Self {
        OperatorNode {
            name: name.map(|s| s.to_owned()),
            inputs: input_ids.into(),
            operator,
            shape,
            dtype,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn input_ids(&self) -> &[NodeId] {
        &self.inputs
    }

    pub fn operator(&self) -> &dyn Operator {
        self.operator.as_ref()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }
}

/// A placeholder for a value supplied at runtime.
#[derive(Debug)]
pub struct ValueNode {
    name: Option<String>,
    shape: Shape,
    dtype: DataType,
}

impl ValueNode {
    pub fn new(name: Option<&str>, shape: &[usize], dtype: DataType) -> Self {
        ValueNode {
            name: name.map(|s| s.to_owned()),
            shape: Shape::from_slice(shape),
            dtype,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }
}

/// A value that is known when the graph is built.
#[derive(Debug)]
pub struct Constant {
    name: Option<String>,
    shape: Shape,
    value: Value,
}

impl Constant {
    pub fn new(name: Option<&str>, value: Value) -> Self {
        Constant {
            name: name.map(|s| s.to_owned()),
            shape: value.shape(),
            value,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn dtype(&self) -> DataType {
        self.value.dtype()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}
