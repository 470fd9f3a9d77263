//! The [`Operator`] trait for defining operators.

use std::any::Any;
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display};
use std::hash::Hasher;

use rten_tensor::errors::ReshapeError;
use rustc_hash::FxHasher;
use smallvec::SmallVec;

use crate::value::{CastError, DataType, Value, ValueType, ValueView};

/// Shape of a tensor. A zero-length shape is a scalar.
pub type Shape = SmallVec<[usize; 4]>;

/// Errors in shape inference, or in validating input shapes against operator
/// configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ShapeError {
    /// The number of inputs does not match the operator's arity.
    InputCount { expected: usize, actual: usize },

    /// An axis is outside the valid range for an input with `ndim` dims.
    AxisOutOfRange { axis: isize, ndim: usize },

    /// An input has a different number of dims than the operator was
    /// configured for.
    RankMismatch { expected: usize, actual: usize },
}

impl Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InputCount { expected, actual } => {
                write!(f, "expected {} inputs but got {}", expected, actual)
            }
            Self::AxisOutOfRange { axis, ndim } => {
                write!(f, "axis {} is not valid for input with {} dims", axis, ndim)
            }
            Self::RankMismatch { expected, actual } => {
                write!(f, "expected input with {} dims but got {}", expected, actual)
            }
        }
    }
}

impl Error for ShapeError {}

/// Failure reported by an underlying tensor kernel.
#[derive(Clone, Debug, PartialEq)]
pub enum KernelError {
    /// An index-selecting reduction was applied along an axis of size zero.
    EmptyReduction,

    /// Reshaping a kernel's output failed.
    Reshape(ReshapeError),
}

impl Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyReduction => write!(f, "cannot select index from empty sequence"),
            Self::Reshape(err) => write!(f, "reshape failed: {}", err),
        }
    }
}

impl Error for KernelError {}

impl From<ReshapeError> for KernelError {
    fn from(val: ReshapeError) -> KernelError {
        KernelError::Reshape(val)
    }
}

/// Possible reasons why an operator may fail on a given input.
#[derive(Debug, PartialEq)]
pub enum OpError {
    /// Casting a value to an expected type failed.
    CastFailed(CastError),

    /// Casting an input to an expected type failed.
    InputCastFailed { index: usize, error: CastError },

    /// A required input was missing.
    MissingInputs,

    /// A tensor has an unsupported element type.
    UnsupportedType,

    /// Input shapes are not compatible with the operator's configuration.
    ShapeError(ShapeError),

    /// An input's representation is not one the operator can process, eg. a
    /// sequence passed to an operator that needs a dense tensor.
    UnsupportedOperand { index: usize, actual: ValueType },

    /// An underlying kernel failed.
    ExecutionError(KernelError),
}

impl From<CastError> for OpError {
    fn from(val: CastError) -> OpError {
        OpError::CastFailed(val)
    }
}

impl From<ShapeError> for OpError {
    fn from(val: ShapeError) -> OpError {
        OpError::ShapeError(val)
    }
}

impl From<KernelError> for OpError {
    fn from(val: KernelError) -> OpError {
        OpError::ExecutionError(val)
    }
}

impl Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpError::CastFailed(err) => write!(f, "conversion error: {}", err),
            OpError::InputCastFailed { index, error } => {
                write!(f, "conversion error for input {}: {}", index, error)
            }
            OpError::MissingInputs => write!(f, "required inputs were missing"),
            OpError::UnsupportedType => write!(f, "unsupported input type"),
            OpError::ShapeError(err) => write!(f, "shape error: {}", err),
            OpError::UnsupportedOperand { index, actual } => {
                write!(f, "input {} has unsupported representation {}", index, actual)
            }
            OpError::ExecutionError(err) => write!(f, "execution failed: {}", err),
        }
    }
}

impl Error for OpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            OpError::CastFailed(err) => Some(err),
            OpError::InputCastFailed { error, .. } => Some(error),
            OpError::ShapeError(err) => Some(err),
            OpError::ExecutionError(err) => Some(err),
            _ => None,
        }
    }
}

/// Element types accepted by an operator's inputs.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum InputType {
    Any,
    OneOf(&'static [DataType]),
}

impl InputType {
    pub fn accepts(&self, dtype: DataType) -> bool {
        match self {
            Self::Any => true,
            Self::OneOf(types) => types.contains(&dtype),
        }
    }
}

/// Element type of an operator's output.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum OutputType {
    /// Same element type as the input with a given index.
    SameAsInput(usize),

    /// A fixed type which does not depend on the inputs.
    Fixed(DataType),
}

/// Declares how an operator's output type relates to its input types.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TypeSignature {
    pub input: InputType,
    pub output: OutputType,
}

impl TypeSignature {
    /// Resolve the output element type given the input element types.
    pub fn output_dtype(&self, input_dtypes: &[DataType]) -> Result<DataType, OpError> {
        if !input_dtypes.iter().all(|dt| self.input.accepts(*dt)) {
            return Err(OpError::UnsupportedType);
        }
        match self.output {
            OutputType::Fixed(dtype) => Ok(dtype),
            OutputType::SameAsInput(index) => {
                input_dtypes.get(index).copied().ok_or(OpError::MissingInputs)
            }
        }
    }
}

/// Trait for values that can be converted into the result type used by
/// [`Operator::run`].
pub trait IntoOpResult {
    fn into_op_result(self) -> Result<OutputList, OpError>;
}

impl IntoOpResult for Result<Value, OpError> {
    fn into_op_result(self) -> Result<OutputList, OpError> {
        self.map(|out| [out].into())
    }
}

/// Outputs from an operator.
///
/// This avoids allocations in the common case where an operator produces
/// exactly one output.
pub type OutputList = SmallVec<[Value; 1]>;

/// An Operator performs a computation step when executing a graph.
///
/// Operators take a fixed number of input values plus a set of attributes
/// that were resolved when the operator was lowered, and produce output
/// values. Operators must not retain state between runs.
///
/// Operators are named after the ONNX operator that they implement.
/// See <https://onnx.ai/onnx/operators/>.
pub trait Operator: Any + Debug {
    /// Return the kind of operator, eg. "ArgMax".
    fn name(&self) -> &str;

    /// Return a name for diagnostics which includes the operator's
    /// configuration.
    fn display_name(&self) -> String {
        self.name().to_string()
    }

    /// Return the exact number of inputs this operator requires.
    fn arity(&self) -> usize;

    /// Return the relationship between input and output element types.
    fn type_signature(&self) -> TypeSignature;

    /// Compute the output shape given the shapes of the inputs.
    ///
    /// This must not depend on input values.
    fn infer_shape(&self, input_shapes: &[&[usize]]) -> Result<Shape, OpError>;

    /// Execute the operator.
    fn run(&self, inputs: &InputList) -> Result<OutputList, OpError>;

    /// Return the index of an input which the operator may overwrite with its
    /// output, if any.
    ///
    /// Callers must not use a value passed in this slot after running the
    /// operator.
    fn in_place_input(&self) -> Option<usize> {
        None
    }

    /// Feed the operator's kind and configuration into `state`.
    ///
    /// Implementations must not hash anything that is not part of the
    /// operator's configuration.
    fn write_hash(&self, state: &mut dyn Hasher) {
        state.write(self.name().as_bytes());
    }

    /// Return a hash that identifies this operator's kind and configuration.
    ///
    /// Operators for which [`is_same`](Operator::is_same) returns true have
    /// equal hashes. The value is stable across runs of the process.
    fn identity_hash(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.write_hash(&mut hasher);
        hasher.finish()
    }

    /// Return true if `other` is the same kind of operator with the same
    /// configuration.
    fn is_same(&self, other: &dyn Operator) -> bool;
}

impl dyn Operator {
    /// Downcast this operator to a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref()
    }
}

impl dyn Operator + Send + Sync {
    /// Downcast this operator to a concrete type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref()
    }
}

/// List of inputs for an operator evaluation.
///
/// An InputList can be constructed from tuples of `impl Into<ValueView>` types
/// (eg. `TensorView`, `&Tensor`) via `Into`.
#[derive(Clone)]
pub struct InputList<'a> {
    inputs: SmallVec<[ValueView<'a>; 2]>,
}

impl<'a> InputList<'a> {
    /// Construct an empty input list.
    pub fn new() -> InputList<'a> {
        InputList {
            inputs: SmallVec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Get an optional input.
    pub fn get(&self, index: usize) -> Option<ValueView<'a>> {
        self.inputs.get(index).cloned()
    }

    /// Get a required operator input.
    pub fn require(&self, index: usize) -> Result<ValueView<'a>, OpError> {
        self.get(index).ok_or(OpError::MissingInputs)
    }

    /// Convert a required input into a tensor view.
    pub fn require_as<T>(&self, index: usize) -> Result<T, OpError>
    where
        T: TryFrom<ValueView<'a>, Error = CastError>,
    {
        self.require(index).and_then(|input| {
            input
                .try_into()
                .map_err(|error| OpError::InputCastFailed { index, error })
        })
    }

    /// Check that the list contains exactly `expected` inputs.
    pub fn check_count(&self, expected: usize) -> Result<(), OpError> {
        if self.len() != expected {
            return Err(ShapeError::InputCount {
                expected,
                actual: self.len(),
            }
            .into());
        }
        Ok(())
    }

    /// Return an iterator over the inputs.
    pub fn iter<'b>(&'b self) -> impl Iterator<Item = ValueView<'a>> + 'b {
        self.inputs.iter().cloned()
    }
}

impl Default for InputList<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, I: Into<ValueView<'a>>> From<I> for InputList<'a> {
    fn from(val: I) -> InputList<'a> {
        InputList {
            inputs: [val.into()].into_iter().collect(),
        }
    }
}

impl<'a> From<()> for InputList<'a> {
    fn from(_: ()) -> InputList<'a> {
        Self::default()
    }
}

impl<'a, I1: Into<ValueView<'a>>, I2: Into<ValueView<'a>>> From<(I1, I2)> for InputList<'a> {
    fn from((a, b): (I1, I2)) -> InputList<'a> {
        InputList {
            inputs: [a.into(), b.into()].into_iter().collect(),
        }
    }
}

/// Convenience methods that make it easier to run operators in tests.
#[cfg(test)]
pub trait OperatorExt: Operator {
    /// Run an operator and extract the first output as a given type.
    fn run_simple<'a, I: Into<InputList<'a>>, O: TryFrom<Value>>(
        &self,
        inputs: I,
    ) -> Result<O, OpError>
    where
        OpError: From<<O as TryFrom<Value>>::Error>,
    {
        let inputs = inputs.into();
        let mut outputs = self.run(&inputs)?;
        Ok(outputs.remove(0).try_into()?)
    }
}

#[cfg(test)]
impl<O: ?Sized + Operator> OperatorExt for O {}

#[cfg(test)]
mod tests {
    use rten_tensor::{Tensor, TensorView};

    use super::{InputList, InputType, OpError, OutputType, ShapeError, TypeSignature};
    use crate::value::{CastError, DataType, Sequence, ValueType};

    #[test]
    fn test_input_list_require_as() {
        let tensor = Tensor::<f32>::zeros(&[2, 2]);
        let inputs = InputList::from(&tensor);

        assert!(inputs.require_as::<TensorView<f32>>(0).is_ok());

        let err = inputs.require_as::<TensorView<i32>>(0).err();
        assert_eq!(
            err,
            Some(OpError::InputCastFailed {
                index: 0,
                error: CastError::WrongType {
                    actual: ValueType::Tensor(DataType::Float),
                    expected: ValueType::Tensor(DataType::Int32),
                },
            })
        );

        assert_eq!(inputs.require(1).err(), Some(OpError::MissingInputs));
    }

    #[test]
    fn test_input_list_check_count() {
        let tensor = Tensor::<f32>::zeros(&[2]);
        let seq = Sequence::new(DataType::Float);
        let inputs = InputList::from((&tensor, &seq));

        assert!(inputs.check_count(2).is_ok());
        assert_eq!(
            inputs.check_count(1),
            Err(OpError::ShapeError(ShapeError::InputCount {
                expected: 1,
                actual: 2
            }))
        );
    }

    #[test]
    fn test_type_signature() {
        let sig = TypeSignature {
            input: InputType::OneOf(&[DataType::Float, DataType::Int32]),
            output: OutputType::Fixed(DataType::Int64),
        };
        assert_eq!(sig.output_dtype(&[DataType::Float]), Ok(DataType::Int64));
        assert_eq!(sig.output_dtype(&[DataType::Int32]), Ok(DataType::Int64));
        assert_eq!(
            sig.output_dtype(&[DataType::Int64]),
            Err(OpError::UnsupportedType)
        );

        let same = TypeSignature {
            input: InputType::Any,
            output: OutputType::SameAsInput(0),
        };
        assert_eq!(same.output_dtype(&[DataType::Int32]), Ok(DataType::Int32));
        assert_eq!(same.output_dtype(&[]), Err(OpError::MissingInputs));
    }
}
