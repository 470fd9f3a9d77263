use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::attrs::{AttrError, Attrs};
use crate::operator::{OpError, Operator};
use crate::options::ImportOptions;

pub mod onnx_ops;

/// Context object passed to [`ImportOp::init`] implementations.
pub trait OpLoadContext {
    /// Options which control which operator configurations are accepted.
    fn options(&self) -> &ImportOptions;
}

impl OpLoadContext for ImportOptions {
    fn options(&self) -> &ImportOptions {
        self
    }
}

/// An operator that has been created by a registry but not yet bound to
/// concrete input shapes.
///
/// Importing a node happens in two phases. First [`init`](ImportOp::init)
/// reads the node's attributes. Then [`instantiate`](ImportOp::instantiate)
/// resolves configuration which depends on the inputs, such as negative axes,
/// and produces the executable [`Operator`].
pub trait ImportOp: Debug {
    /// Return the operator type, eg. "ArgMax".
    fn op_type(&self) -> &'static str;

    /// Configure the operator from an external node's attributes.
    fn init(&mut self, attrs: &Attrs, ctx: &dyn OpLoadContext) -> Result<(), ReadOpError>;

    /// Return the exact number of inputs the operator requires.
    fn arity(&self) -> usize;

    /// Create the executable operator for inputs with the given shapes.
    fn instantiate(
        &self,
        input_shapes: &[&[usize]],
    ) -> Result<Arc<dyn Operator + Send + Sync>, OpError>;
}

/// Function which creates a fresh, unconfigured operator.
pub type OpConstructor = fn() -> Box<dyn ImportOp>;

fn construct<Op: ImportOp + Default + 'static>() -> Box<dyn ImportOp> {
    Box::new(Op::default())
}

/// Registry which maps operator types to constructors.
///
/// New registries have no operators registered by default. To create a
/// registry with all built-in operators pre-registered, use
/// [`OpRegistry::with_all_ops`].
///
/// Registration requires a mutable reference, whereas lowering only borrows
/// the registry. Once a registry has been handed to a
/// [`Lowerer`](crate::Lowerer) it can no longer change.
#[derive(Default)]
pub struct OpRegistry {
    ops: FxHashMap<&'static str, OpConstructor>,
}

impl OpRegistry {
    /// Create a new empty registry.
    pub fn new() -> OpRegistry {
        OpRegistry {
            ops: FxHashMap::default(),
        }
    }

    /// Register a constructor for an operator type.
    ///
    /// Fails with [`ReadOpError::DuplicateOperator`] if `name` is already
    /// registered. The existing entry is left unchanged.
    pub fn register(&mut self, name: &'static str, ctor: OpConstructor) -> Result<(), ReadOpError> {
        if self.ops.contains_key(name) {
            return Err(ReadOpError::DuplicateOperator {
                name: name.to_string(),
            });
        }
        self.ops.insert(name, ctor);
        Ok(())
    }

    /// Register the default implementation of an operator under its
    /// [`op_type`](ImportOp::op_type).
    ///
    /// ```
    /// use graft::op_registry::onnx_ops::ArgMaxImport;
    /// use graft::OpRegistry;
    ///
    /// let mut reg = OpRegistry::new();
    /// reg.register_op::<ArgMaxImport>().unwrap();
    /// assert!(reg.resolve("ArgMax").is_ok());
    /// ```
    pub fn register_op<Op: ImportOp + Default + 'static>(&mut self) -> Result<(), ReadOpError> {
        let name = Op::default().op_type();
        self.register(name, construct::<Op>)
    }

    /// Look up the constructor for an operator type.
    pub fn resolve(&self, name: &str) -> Result<OpConstructor, ReadOpError> {
        self.ops
            .get(name)
            .copied()
            .ok_or_else(|| ReadOpError::UnknownOperator {
                name: name.to_string(),
            })
    }

    /// Return true if an operator type has been registered.
    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Return the registered operator types in sorted order.
    pub fn op_types(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.ops.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Create a new registry with all built-in operators registered.
    pub fn with_all_ops() -> OpRegistry {
        let mut reg = OpRegistry::new();

        macro_rules! register_op {
            ($name:literal, $op:ident) => {
                reg.ops.insert($name, construct::<onnx_ops::$op>);
            };
        }

        register_op!("ArgMax", ArgMaxImport);

        reg
    }
}

/// Error type for errors that occur when resolving or configuring an
/// operator.
#[derive(Debug, PartialEq)]
pub enum ReadOpError {
    /// An attribute is missing or has the wrong kind.
    Attr(AttrError),

    /// An attribute has a valid kind but a value this operator does not
    /// support.
    UnsupportedConfiguration {
        /// Name of the attribute.
        attr: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// No operator is registered under this name.
    UnknownOperator { name: String },

    /// An operator was registered twice under the same name.
    DuplicateOperator { name: String },
}

impl From<AttrError> for ReadOpError {
    fn from(val: AttrError) -> Self {
        ReadOpError::Attr(val)
    }
}

impl Display for ReadOpError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadOpError::Attr(err) => write!(f, "{}", err),
            ReadOpError::UnsupportedConfiguration { attr, reason } => {
                write!(f, "unsupported value for attribute \"{}\": {}", attr, reason)
            }
            ReadOpError::UnknownOperator { name } => write!(f, "unknown operator {}", name),
            ReadOpError::DuplicateOperator { name } => {
                write!(f, "operator {} is already registered", name)
            }
        }
    }
}

impl Error for ReadOpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReadOpError::Attr(err) => Some(err),
            _ => None,
        }
    }
}
