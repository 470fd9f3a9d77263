use std::sync::Arc;

use rten_tensor::prelude::*;
use rten_tensor::Tensor;
use smallvec::smallvec;

use crate::graph::{Graph, Node, NodeId, RunError};
use crate::operator::{
    InputList, InputType, OpError, Operator, OutputList, OutputType, Shape, TypeSignature,
};
use crate::ops::ArgMax;
use crate::value::{DataType, Sequence, Value, ValueType};

/// Operator which claims to produce floats but returns its input unchanged.
#[derive(Debug)]
struct Passthrough;

impl Operator for Passthrough {
    fn name(&self) -> &str {
        "Passthrough"
    }

    fn arity(&self) -> usize {
        1
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature {
            input: InputType::Any,
            output: OutputType::Fixed(DataType::Float),
        }
    }

    fn infer_shape(&self, input_shapes: &[&[usize]]) -> Result<Shape, OpError> {
        Ok(Shape::from_slice(input_shapes[0]))
    }

    fn run(&self, inputs: &InputList) -> Result<OutputList, OpError> {
        Ok(smallvec![inputs.require(0)?.to_owned()])
    }

    fn is_same(&self, other: &dyn Operator) -> bool {
        other.downcast_ref::<Passthrough>().is_some()
    }
}

fn argmax_graph(keep_dims: bool) -> (Graph, NodeId, NodeId) {
    let mut graph = Graph::new();
    let input = graph.add_value(Some("x"), &[2, 3], DataType::Float);
    let op = ArgMax::new(2, 1, keep_dims).unwrap();
    let shape = op.infer_shape(&[&[2, 3]]).unwrap();
    let id = graph.add_op(Some("y"), Arc::new(op), &[input], shape, DataType::Int64);
    (graph, input, id)
}

#[test]
fn test_add_nodes() {
    let mut graph = Graph::new();
    let value = graph.add_value(Some("x"), &[2, 3], DataType::Float);
    let constant = graph.add_constant(Some("c"), Tensor::from_data(&[4], vec![1i32, 2, 3, 4]));
    let anon = graph.add_value(None, &[], DataType::Int64);

    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.get_node_id("x"), Some(value));
    assert_eq!(graph.get_node_id("c"), Some(constant));
    assert_eq!(graph.get_node_id("missing"), None);

    let node = graph.get_node(constant).unwrap();
    assert!(matches!(node, Node::Constant(_)));
    assert_eq!(node.shape(), &[4]);
    assert_eq!(node.dtype(), DataType::Int32);
    assert_eq!(node.as_constant().unwrap().value().shape().as_slice(), &[4]);

    assert_eq!(graph.node_name(value), "x");
    assert_eq!(graph.node_name(anon), "[ID: 2]");

    let ids: Vec<_> = graph.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, [value, constant, anon]);
}

#[test]
fn test_run_op() {
    let (graph, _, id) = argmax_graph(false);
    let x = Tensor::from_data(&[2, 3], vec![1.0f32, 5.0, 3.0, 4.0, 2.0, 6.0]);

    let output: Tensor<i64> = graph.run_op(id, &x).unwrap().try_into().unwrap();

    assert_eq!(output.shape(), graph.get_node(id).unwrap().shape());
    assert_eq!(output.to_vec(), &[1, 2]);
}

#[test]
fn test_run_op_invalid_node() {
    let (graph, input, _) = argmax_graph(false);
    let x = Tensor::<f32>::zeros(&[2, 3]);

    let missing = NodeId::from_u32(10);
    assert_eq!(
        graph.run_op(missing, &x).err(),
        Some(RunError::InvalidNodeId(missing))
    );
    assert_eq!(
        graph.run_op(input, &x).err(),
        Some(RunError::NotAnOperator(input))
    );
}

#[test]
fn test_run_op_input_count() {
    let (graph, _, id) = argmax_graph(false);
    let x = Tensor::<f32>::zeros(&[2, 3]);

    assert_eq!(
        graph.run_op(id, (&x, &x)).err(),
        Some(RunError::InputCountMismatch {
            name: "y".to_string(),
            expected: 1,
            actual: 2,
        })
    );
}

#[test]
fn test_run_op_operator_error() {
    let (graph, _, id) = argmax_graph(false);
    let seq = Sequence::new(DataType::Float);

    let err = graph.run_op(id, &seq).err().unwrap();
    assert_eq!(
        err,
        RunError::OperatorError {
            name: "y".to_string(),
            error: OpError::UnsupportedOperand {
                index: 0,
                actual: ValueType::Sequence(DataType::Float),
            },
        }
    );
    assert!(err.to_string().starts_with("operator \"y\" failed"));
}

#[test]
fn test_run_op_output_type_mismatch() {
    let mut graph = Graph::new();
    let input = graph.add_value(Some("x"), &[3], DataType::Int32);
    let id = graph.add_op(
        Some("y"),
        Arc::new(Passthrough),
        &[input],
        smallvec![3],
        DataType::Float,
    );
    let x = Tensor::from_data(&[3], vec![1i32, 2, 3]);

    assert_eq!(
        graph.run_op(id, &x).err(),
        Some(RunError::OutputTypeMismatch {
            name: "y".to_string(),
            expected: DataType::Float,
            actual: ValueType::Tensor(DataType::Int32),
        })
    );

    let x = Tensor::from_data(&[3], vec![1.0f32, 2.0, 3.0]);
    let output = graph.run_op(id, &x).unwrap();
    assert!(matches!(output, Value::FloatTensor(_)));
}

#[test]
fn test_find_operator() {
    let (mut graph, input, id) = argmax_graph(false);
    let other_input = graph.add_value(Some("x2"), &[2, 3], DataType::Float);

    let same = ArgMax::new(2, 1, false).unwrap();
    let different_axis = ArgMax::new(2, 0, false).unwrap();
    let different_keep_dims = ArgMax::new(2, 1, true).unwrap();

    assert_eq!(graph.find_operator(&same, &[input]), Some(id));
    assert_eq!(graph.find_operator(&same, &[other_input]), None);
    assert_eq!(graph.find_operator(&different_axis, &[input]), None);
    assert_eq!(graph.find_operator(&different_keep_dims, &[input]), None);
    assert_eq!(graph.find_operator(&Passthrough, &[input]), None);
}
