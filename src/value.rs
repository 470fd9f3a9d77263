//! Value types used for operator inputs and outputs.

use std::error::Error;
use std::fmt;
use std::fmt::Display;

use rten_tensor::prelude::*;
use rten_tensor::{Tensor, TensorView};
use smallvec::SmallVec;

/// Enum specifying the data type of a tensor.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    Float,
    Int32,
    Int64,
}

/// Get the [`DataType`] that corresponds to a given type.
pub trait DataTypeOf {
    /// Return the data type that corresponds to the `Self` type.
    fn dtype_of() -> DataType;
}

macro_rules! impl_data_type_of {
    ($type:ty, $dtype:ident) => {
        impl DataTypeOf for $type {
            fn dtype_of() -> DataType {
                DataType::$dtype
            }
        }
    };
}

impl_data_type_of!(f32, Float);
impl_data_type_of!(i32, Int32);
impl_data_type_of!(i64, Int64);

impl Display for DataType {
    /// Format this enum value in the style of the corresponding Rust type (eg.
    /// "i64" for `DataType::Int64`).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                DataType::Float => "f32",
                DataType::Int32 => "i32",
                DataType::Int64 => "i64",
            }
        )
    }
}

/// The representation and element type of a value.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ValueType {
    /// A dense tensor.
    Tensor(DataType),
    /// A sequence of dense tensors.
    Sequence(DataType),
}

impl Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Tensor(dtype) => write!(f, "tensor({})", dtype),
            ValueType::Sequence(dtype) => write!(f, "sequence({})", dtype),
        }
    }
}

/// Errors when casting a [`Value`] or [`ValueView`] to a tensor of a specific
/// type.
#[derive(Debug, Eq, PartialEq)]
pub enum CastError {
    /// The value has the wrong representation or element type.
    WrongType {
        actual: ValueType,
        expected: ValueType,
    },
}

impl Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongType { actual, expected } => {
                write!(f, "expected {} but value is {}", expected, actual)
            }
        }
    }
}

impl Error for CastError {}

/// A list of tensors which share an element type.
///
/// Sequences are not dense tensors. Operators which only work on dense data
/// reject them.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sequence {
    dtype: DataType,
    items: Vec<Value>,
}

impl Sequence {
    /// Create an empty sequence of tensors with a given element type.
    pub fn new(dtype: DataType) -> Sequence {
        Sequence {
            dtype,
            items: Vec::new(),
        }
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append a tensor to the sequence.
    ///
    /// Fails if the tensor's element type does not match the sequence, or
    /// if `value` is itself a sequence.
    pub fn push(&mut self, value: Value) -> Result<(), CastError> {
        let expected = ValueType::Tensor(self.dtype);
        if value.value_type() != expected {
            return Err(CastError::WrongType {
                actual: value.value_type(),
                expected,
            });
        }
        self.items.push(value);
        Ok(())
    }
}

/// An owned value that can be used as an operator input or output.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    FloatTensor(Tensor<f32>),
    Int32Tensor(Tensor<i32>),
    Int64Tensor(Tensor<i64>),
    Sequence(Sequence),
}

impl Value {
    /// Return the data type of elements in this value.
    pub fn dtype(&self) -> DataType {
        match self {
            Self::FloatTensor(_) => DataType::Float,
            Self::Int32Tensor(_) => DataType::Int32,
            Self::Int64Tensor(_) => DataType::Int64,
            Self::Sequence(seq) => seq.dtype(),
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.as_view().value_type()
    }

    /// Return the shape of this value.
    ///
    /// Sequences are treated as vectors whose length is the item count.
    pub fn shape(&self) -> SmallVec<[usize; 4]> {
        self.as_view().shape()
    }

    /// Return a borrowed view of this value.
    pub fn as_view(&self) -> ValueView<'_> {
        match self {
            Self::FloatTensor(t) => ValueView::FloatTensor(t.view()),
            Self::Int32Tensor(t) => ValueView::Int32Tensor(t.view()),
            Self::Int64Tensor(t) => ValueView::Int64Tensor(t.view()),
            Self::Sequence(seq) => ValueView::Sequence(seq),
        }
    }
}

/// A borrowed value that can be used as an operator input.
#[derive(Clone)]
pub enum ValueView<'a> {
    FloatTensor(TensorView<'a, f32>),
    Int32Tensor(TensorView<'a, i32>),
    Int64Tensor(TensorView<'a, i64>),
    Sequence(&'a Sequence),
}

impl ValueView<'_> {
    /// Return the data type of elements in this value.
    pub fn dtype(&self) -> DataType {
        match self {
            Self::FloatTensor(_) => DataType::Float,
            Self::Int32Tensor(_) => DataType::Int32,
            Self::Int64Tensor(_) => DataType::Int64,
            Self::Sequence(seq) => seq.dtype(),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Sequence(seq) => ValueType::Sequence(seq.dtype()),
            _ => ValueType::Tensor(self.dtype()),
        }
    }

    /// Return true if this value is a dense tensor.
    pub fn is_dense(&self) -> bool {
        !matches!(self, Self::Sequence(_))
    }

    /// Return the shape of this value.
    ///
    /// Sequences are treated as vectors whose length is the item count.
    pub fn shape(&self) -> SmallVec<[usize; 4]> {
        match self {
            Self::FloatTensor(t) => SmallVec::from_slice(t.shape()),
            Self::Int32Tensor(t) => SmallVec::from_slice(t.shape()),
            Self::Int64Tensor(t) => SmallVec::from_slice(t.shape()),
            Self::Sequence(seq) => SmallVec::from_slice(&[seq.len()]),
        }
    }

    /// Return an owned copy of this value.
    pub fn to_owned(&self) -> Value {
        match self {
            Self::FloatTensor(t) => Value::FloatTensor(t.to_tensor()),
            Self::Int32Tensor(t) => Value::Int32Tensor(t.to_tensor()),
            Self::Int64Tensor(t) => Value::Int64Tensor(t.to_tensor()),
            Self::Sequence(seq) => Value::Sequence((*seq).clone()),
        }
    }
}

impl<'a> From<&'a Value> for ValueView<'a> {
    fn from(val: &'a Value) -> ValueView<'a> {
        val.as_view()
    }
}

impl<'a> From<&'a Sequence> for ValueView<'a> {
    fn from(seq: &'a Sequence) -> ValueView<'a> {
        ValueView::Sequence(seq)
    }
}

impl From<Sequence> for Value {
    fn from(seq: Sequence) -> Value {
        Value::Sequence(seq)
    }
}

macro_rules! impl_value_conversions {
    ($variant:ident, $element_type:ty) => {
        impl From<Tensor<$element_type>> for Value {
            fn from(t: Tensor<$element_type>) -> Value {
                Value::$variant(t)
            }
        }

        impl TryFrom<Value> for Tensor<$element_type> {
            type Error = CastError;

            fn try_from(o: Value) -> Result<Tensor<$element_type>, Self::Error> {
                let actual = o.value_type();
                match o {
                    Value::$variant(t) => Ok(t),
                    _ => Err(CastError::WrongType {
                        actual,
                        expected: ValueType::Tensor(<$element_type as DataTypeOf>::dtype_of()),
                    }),
                }
            }
        }

        impl<'a> From<&'a Tensor<$element_type>> for ValueView<'a> {
            fn from(t: &'a Tensor<$element_type>) -> ValueView<'a> {
                ValueView::$variant(t.view())
            }
        }

        impl<'a> From<TensorView<'a, $element_type>> for ValueView<'a> {
            fn from(t: TensorView<'a, $element_type>) -> ValueView<'a> {
                ValueView::$variant(t)
            }
        }

        impl<'a> TryFrom<ValueView<'a>> for TensorView<'a, $element_type> {
            type Error = CastError;

            fn try_from(input: ValueView<'a>) -> Result<TensorView<'a, $element_type>, Self::Error> {
                let actual = input.value_type();
                match input {
                    ValueView::$variant(t) => Ok(t),
                    _ => Err(CastError::WrongType {
                        actual,
                        expected: ValueType::Tensor(<$element_type as DataTypeOf>::dtype_of()),
                    }),
                }
            }
        }
    };
}

impl_value_conversions!(FloatTensor, f32);
impl_value_conversions!(Int32Tensor, i32);
impl_value_conversions!(Int64Tensor, i64);
