//! Lowering of external nodes into a [`Graph`].

use std::error::Error;
use std::fmt::{Display, Formatter};

use log::{debug, warn};
use smallvec::SmallVec;

use crate::attrs::Attrs;
use crate::external::ExternalNode;
use crate::graph::{Graph, NodeId};
use crate::op_registry::{OpLoadContext, OpRegistry, ReadOpError};
use crate::operator::OpError;
use crate::options::ImportOptions;
use crate::value::DataType;

/// Errors that occur when lowering an external node.
#[derive(Debug, PartialEq)]
pub struct LowerError {
    node: Option<String>,
    kind: LowerErrorKind,
}

impl LowerError {
    pub(crate) fn for_node(node: Option<&str>, kind: LowerErrorKind) -> Self {
        LowerError {
            node: node.map(|n| n.to_string()),
            kind,
        }
    }

    /// The name of the external node that this error relates to, if it has
    /// one.
    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }

    /// Return the reason lowering failed.
    pub fn kind(&self) -> &LowerErrorKind {
        &self.kind
    }
}

impl Display for LowerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(node) = self.node.as_deref() {
            write!(f, "in node \"{}\": {}", node, self.kind)
        } else {
            self.kind.fmt(f)
        }
    }
}

impl Error for LowerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            LowerErrorKind::ReadOp(err) => Some(err),
            LowerErrorKind::Operator(err) => Some(err),
            _ => None,
        }
    }
}

/// Reasons why lowering an external node can fail.
///
/// See [`LowerError::kind`].
#[derive(Debug, PartialEq)]
pub enum LowerErrorKind {
    /// The operator could not be resolved or configured from the node's
    /// attributes.
    ReadOp(ReadOpError),

    /// The number of inputs differs from the operator's arity.
    ArityMismatch { expected: usize, actual: usize },

    /// An input ID does not refer to a node in the graph.
    InvalidInput(NodeId),

    /// An input name does not refer to a node in the graph.
    UnknownInput(String),

    /// Shape or type inference failed.
    Operator(OpError),
}

impl Display for LowerErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadOp(err) => write!(f, "operator error: {}", err),
            Self::ArityMismatch { expected, actual } => {
                write!(f, "expected {} inputs but got {}", expected, actual)
            }
            Self::InvalidInput(id) => write!(f, "input {} is not in the graph", id),
            Self::UnknownInput(name) => write!(f, "input \"{}\" is not in the graph", name),
            Self::Operator(err) => write!(f, "inference failed: {}", err),
        }
    }
}

/// Lowers external nodes into operator nodes of a [`Graph`].
///
/// ```
/// use graft::{DataType, ExternalNode, Graph, ImportOptions, Lowerer, OpRegistry};
///
/// let registry = OpRegistry::with_all_ops();
/// let lowerer = Lowerer::new(&registry, ImportOptions::default());
///
/// let mut graph = Graph::new();
/// let input = graph.add_value(Some("logits"), &[4, 10], DataType::Float);
/// let node = ExternalNode::new("ArgMax")
///     .with_name("argmax")
///     .with_outputs(&["class"])
///     .with_attr("axis", -1i64)
///     .with_attr("keepdims", 0i64);
///
/// let id = lowerer.apply(&mut graph, &node, &[input]).unwrap();
/// assert_eq!(graph.get_node(id).unwrap().shape(), &[4]);
/// assert_eq!(graph.get_node_id("class"), Some(id));
/// ```
pub struct Lowerer<'a> {
    registry: &'a OpRegistry,
    options: ImportOptions,
}

impl OpLoadContext for Lowerer<'_> {
    fn options(&self) -> &ImportOptions {
        &self.options
    }
}

impl<'a> Lowerer<'a> {
    pub fn new(registry: &'a OpRegistry, options: ImportOptions) -> Self {
        Lowerer { registry, options }
    }

    /// Lower one external node whose inputs have already been lowered.
    ///
    /// `children` are the IDs of the node's inputs, in operator input order.
    /// On success the new node's ID is returned. When node deduplication is
    /// enabled this may be the ID of an existing node. On failure the graph
    /// is left unchanged.
    pub fn apply(
        &self,
        graph: &mut Graph,
        node: &ExternalNode,
        children: &[NodeId],
    ) -> Result<NodeId, LowerError> {
        let node_name = node.name.as_deref().or(node.output_name());
        let err = |kind| LowerError::for_node(node_name, kind);

        let ctor = self
            .registry
            .resolve(&node.op_type)
            .map_err(|e| err(LowerErrorKind::ReadOp(e)))?;
        let mut import_op = ctor();

        let arity = import_op.arity();
        if children.len() != arity {
            return Err(err(LowerErrorKind::ArityMismatch {
                expected: arity,
                actual: children.len(),
            }));
        }

        let attrs = Attrs::new(&node.attrs);
        import_op
            .init(&attrs, self)
            .map_err(|e| err(LowerErrorKind::ReadOp(e)))?;

        let unsupported = self.unsupported_attrs(&attrs);
        if !unsupported.is_empty() {
            warn!(
                "{} node \"{}\" has unsupported attributes: {}",
                node.op_type,
                node_name.unwrap_or_default(),
                unsupported.join(", ")
            );
        }

        let (op, shape, dtype) = {
            let mut input_shapes: SmallVec<[&[usize]; 4]> = SmallVec::new();
            let mut input_dtypes: SmallVec<[DataType; 4]> = SmallVec::new();
            for &child in children {
                let child_node = graph
                    .get_node(child)
                    .ok_or_else(|| err(LowerErrorKind::InvalidInput(child)))?;
                input_shapes.push(child_node.shape());
                input_dtypes.push(child_node.dtype());
            }

            let op = import_op
                .instantiate(&input_shapes)
                .map_err(|e| err(LowerErrorKind::Operator(e)))?;
            let shape = op
                .infer_shape(&input_shapes)
                .map_err(|e| err(LowerErrorKind::Operator(e)))?;
            let dtype = op
                .type_signature()
                .output_dtype(&input_dtypes)
                .map_err(|e| err(LowerErrorKind::Operator(e)))?;
            (op, shape, dtype)
        };

        if self.options.dedup_nodes {
            if let Some(existing) = graph.find_operator(&*op, children) {
                debug!(
                    "reusing node {} for {} node \"{}\"",
                    existing,
                    op.display_name(),
                    node_name.unwrap_or_default()
                );
                if let Some(output_name) = node.output_name() {
                    graph.add_alias(output_name, existing);
                }
                return Ok(existing);
            }
        }

        debug!(
            "lowering {} node \"{}\" with output shape {:?} and type {}",
            op.display_name(),
            node_name.unwrap_or_default(),
            shape.as_slice(),
            dtype
        );
        let id = graph.add_op(node.output_name(), op, children, shape, dtype);

        Ok(id)
    }

    /// Return the attributes which the operator did not read, or an empty
    /// list if warnings for them are disabled.
    fn unsupported_attrs<'b>(&self, attrs: &Attrs<'b>) -> Vec<&'b str> {
        if !self.options.warn_unused_attrs {
            return Vec::new();
        }
        attrs.unused()
    }

    /// Lower a list of external nodes in topological order.
    ///
    /// Each node's inputs are looked up by name among the nodes already in
    /// the graph, including those lowered earlier in the list. Returns the
    /// IDs of the lowered nodes. If a node fails, nodes lowered before it
    /// remain in the graph.
    pub fn lower_nodes(
        &self,
        graph: &mut Graph,
        nodes: &[ExternalNode],
    ) -> Result<Vec<NodeId>, LowerError> {
        let mut ids = Vec::with_capacity(nodes.len());
        for node in nodes {
            let children = node
                .inputs
                .iter()
                .map(|name| {
                    graph.get_node_id(name).ok_or_else(|| {
                        LowerError::for_node(
                            node.name.as_deref().or(node.output_name()),
                            LowerErrorKind::UnknownInput(name.clone()),
                        )
                    })
                })
                .collect::<Result<SmallVec<[NodeId; 4]>, _>>()?;
            ids.push(self.apply(graph, node, &children)?);
        }
        Ok(ids)
    }
}
