//! graft lowers operators from imported computation graphs into a typed,
//! shape-checked execution graph.
//!
//! # Lowering
//!
//! A format parser produces a list of [`ExternalNode`]s. Each has an operator
//! type, attributes and named inputs. Lowering a node proceeds as follows:
//!
//! 1. The operator type is resolved to a constructor in an [`OpRegistry`].
//! 2. The constructed operator reads its configuration from the node's
//!    attributes via [`Attrs`]. Attributes that are never read are reported
//!    as warnings.
//! 3. The number of inputs is checked against the operator's arity, and
//!    input-dependent configuration such as negative axes is resolved.
//! 4. The output shape and element type are inferred, and the operator is
//!    added to the [`Graph`].
//!
//! A node either lowers completely or leaves the graph unchanged. See
//! [`Lowerer`] for an example.
//!
//! # Running operators
//!
//! Operator nodes can be executed individually with concrete inputs using
//! [`Graph::run_op`]. Scheduling the execution of a whole graph is left to
//! the caller.
//!
//! # Logging
//!
//! graft logs through the [log](https://docs.rs/log) facade. Lowered nodes
//! are logged at `debug` level and unused attributes at `warn` level. No
//! logger is installed by this crate.
//!
//! # Configuration
//!
//! Lowering is configured by [`ImportOptions`], which can also be read from
//! environment variables using [`ImportOptions::from_env`].
//!
//! # Crate features
//!
//! - `serde` derives `Serialize` and `Deserialize` for [`ExternalNode`],
//!   [`AttrValue`] and [`Value`], so nodes can be exchanged as JSON.

mod attrs;
mod env;
mod external;
mod graph;
mod lower;
mod operator;
mod options;
mod value;

pub mod op_registry;
pub mod ops;

pub use attrs::{AttrError, AttrKind, AttrValue, Attrs, FromAttr};
pub use env::{env_flag, str_as_bool};
pub use external::ExternalNode;
pub use graph::{Constant, Graph, Node, NodeId, OperatorNode, RunError, ValueNode};
pub use lower::{LowerError, LowerErrorKind, Lowerer};
pub use op_registry::{ImportOp, OpConstructor, OpLoadContext, OpRegistry, ReadOpError};
pub use operator::{
    InputList, InputType, IntoOpResult, KernelError, OpError, Operator, OutputList, OutputType,
    Shape, ShapeError, TypeSignature,
};
pub use options::ImportOptions;
pub use value::{CastError, DataType, DataTypeOf, Sequence, Value, ValueType, ValueView};
