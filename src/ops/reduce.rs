use std::hash::Hasher;

use rten_tensor::errors::ReshapeError;
use rten_tensor::prelude::*;
use rten_tensor::{Tensor, TensorView};

use crate::operator::{
    InputList, InputType, IntoOpResult, KernelError, OpError, Operator, OutputList, OutputType,
    Shape, ShapeError, TypeSignature,
};
use crate::value::{DataType, Value, ValueView};

/// Compute the indices of the elements selected by `compare` along an axis.
///
/// The result has the reduced dimension removed. Ties resolve to the first
/// occurrence.
fn index_select<T: Copy, Cmp: Fn(T, T) -> bool>(
    input: TensorView<T>,
    axis: usize,
    compare: Cmp,
) -> Result<Tensor<i32>, OpError> {
    if axis >= input.ndim() {
        return Err(ShapeError::AxisOutOfRange {
            axis: axis as isize,
            ndim: input.ndim(),
        }
        .into());
    }
    if input.size(axis) == 0 {
        return Err(KernelError::EmptyReduction.into());
    }

    let reduced_shape: Shape = input
        .shape()
        .iter()
        .enumerate()
        .filter(|(dim, _)| *dim != axis)
        .map(|(_, &size)| size)
        .collect();
    let mut reduced_data = Vec::with_capacity(reduced_shape.iter().product());

    if !input.is_empty() {
        for lane in input.lanes(axis) {
            let mut items = lane.copied().enumerate();
            let Some(first) = items.next() else {
                continue;
            };
            let (index, _) = items.fold(first, |(sel_index, sel_val), (i, val)| {
                if compare(val, sel_val) {
                    (i, val)
                } else {
                    (sel_index, sel_val)
                }
            });
            reduced_data.push(index as i32);
        }
    }

    Ok(Tensor::from_data(reduced_shape.as_slice(), reduced_data))
}

/// Return the index of the maximum value along `axis`, removing that axis.
pub fn arg_max<T: Copy + PartialOrd>(
    input: TensorView<T>,
    axis: usize,
) -> Result<Tensor<i32>, OpError> {
    index_select(input, axis, |a, b| a > b)
}

/// Index of the maximum element along an axis.
///
/// See <https://onnx.ai/onnx/operators/onnx__ArgMax.html>.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ArgMax {
    /// Non-negative axis to reduce.
    pub axis: usize,

    /// Keep the reduced dimension with size 1, instead of removing it.
    pub keep_dims: bool,

    /// Number of dims of the input this operator was configured for.
    pub input_dims: usize,
}

impl ArgMax {
    /// Create an ArgMax operator for inputs with `input_dims` dimensions.
    ///
    /// `axis` must already be resolved to a non-negative dimension index.
    pub fn new(input_dims: usize, axis: usize, keep_dims: bool) -> Result<ArgMax, OpError> {
        if axis >= input_dims {
            return Err(ShapeError::AxisOutOfRange {
                axis: axis as isize,
                ndim: input_dims,
            }
            .into());
        }
        Ok(ArgMax {
            axis,
            keep_dims,
            input_dims,
        })
    }

    fn run_dense(&self, input: ValueView) -> Result<Value, OpError> {
        let input_shape = input.shape();
        let indices = match input {
            ValueView::FloatTensor(t) => arg_max(t, self.axis)?,
            ValueView::Int32Tensor(t) => arg_max(t, self.axis)?,
            ValueView::Int64Tensor(t) => arg_max(t, self.axis)?,
            ValueView::Sequence(seq) => {
                return Err(OpError::UnsupportedOperand {
                    index: 0,
                    actual: ValueView::Sequence(seq).value_type(),
                })
            }
        };

        // Reducing a vector yields a scalar, regardless of `keep_dims`.
        if indices.ndim() == 0 {
            let index = indices.item().copied().unwrap_or_default();
            return Ok(Tensor::from_scalar(index as i64).into());
        }

        let mut output = indices.map(|&i| i as i64);
        if self.keep_dims {
            let shape = self.infer_shape(&[input_shape.as_slice()])?;
            if shape.iter().product::<usize>() != output.len() {
                return Err(KernelError::Reshape(ReshapeError::LengthMismatch).into());
            }
            output.reshape(&shape);
        }
        Ok(output.into())
    }
}

impl Operator for ArgMax {
    fn name(&self) -> &str {
        "ArgMax"
    }

    fn display_name(&self) -> String {
        format!(
            "ArgMax(axis={}, keepdims={})",
            self.axis, self.keep_dims as u8
        )
    }

    fn arity(&self) -> usize {
        1
    }

    fn type_signature(&self) -> TypeSignature {
        TypeSignature {
            input: InputType::OneOf(&[DataType::Float, DataType::Int32, DataType::Int64]),
            output: OutputType::Fixed(DataType::Int64),
        }
    }

    fn infer_shape(&self, input_shapes: &[&[usize]]) -> Result<Shape, OpError> {
        let [input_shape] = input_shapes else {
            return Err(ShapeError::InputCount {
                expected: 1,
                actual: input_shapes.len(),
            }
            .into());
        };
        if self.axis >= input_shape.len() {
            return Err(ShapeError::AxisOutOfRange {
                axis: self.axis as isize,
                ndim: input_shape.len(),
            }
            .into());
        }

        let mut shape = Shape::from_slice(input_shape);
        if self.keep_dims {
            shape[self.axis] = 1;
        } else {
            shape.remove(self.axis);
        }
        Ok(shape)
    }

    fn run(&self, inputs: &InputList) -> Result<OutputList, OpError> {
        inputs.check_count(1)?;
        let input = inputs.require(0)?;
        let ndim = input.shape().len();
        if input.is_dense() && ndim != self.input_dims {
            return Err(ShapeError::RankMismatch {
                expected: self.input_dims,
                actual: ndim,
            }
            .into());
        }
        self.run_dense(input).into_op_result()
    }

    fn write_hash(&self, state: &mut dyn Hasher) {
        state.write(self.name().as_bytes());
        state.write_usize(self.axis);
        state.write_u8(self.keep_dims as u8);
    }

    fn is_same(&self, other: &dyn Operator) -> bool {
        other.downcast_ref::<ArgMax>() == Some(self)
    }
}

#[cfg(test)]
mod tests {
    use graft_testing::TestCases;
    use rten_tensor::prelude::*;
    use rten_tensor::Tensor;

    use super::{arg_max, ArgMax};
    use crate::operator::{
        InputList, KernelError, OpError, Operator, OperatorExt, Shape, ShapeError,
    };
    use crate::value::{DataType, Sequence, ValueType};

    #[test]
    fn test_arg_max() {
        let input = Tensor::from_data(&[2, 3], vec![1.0f32, 5.0, 3.0, 4.0, 2.0, 6.0]);

        let result = arg_max(input.view(), 0).unwrap();
        assert_eq!(result.shape(), &[3]);
        assert_eq!(result.to_vec(), &[1, 0, 1]);

        let result = arg_max(input.view(), 1).unwrap();
        assert_eq!(result.shape(), &[2]);
        assert_eq!(result.to_vec(), &[1, 2]);

        // Ties resolve to the first occurrence.
        let input = Tensor::from_data(&[4], vec![3, 7, 7, 1]);
        let result = arg_max(input.view(), 0).unwrap();
        assert_eq!(result.ndim(), 0);
        assert_eq!(result.item(), Some(&1));
    }

    #[test]
    fn test_arg_max_empty() {
        let input = Tensor::<f32>::zeros(&[2, 0]);
        assert_eq!(
            arg_max(input.view(), 1).err(),
            Some(OpError::ExecutionError(KernelError::EmptyReduction))
        );

        // Reducing a non-empty axis of an empty tensor is allowed.
        let result = arg_max(input.view(), 0).unwrap();
        assert_eq!(result.shape(), &[0]);
    }

    #[test]
    fn test_new_checks_axis() {
        assert!(ArgMax::new(2, 1, false).is_ok());
        assert_eq!(
            ArgMax::new(2, 2, false).err(),
            Some(OpError::ShapeError(ShapeError::AxisOutOfRange {
                axis: 2,
                ndim: 2
            }))
        );
    }

    #[test]
    fn test_infer_shape() {
        #[derive(Debug)]
        struct Case {
            shape: Vec<usize>,
            axis: usize,
            keep_dims: bool,
            expected: Result<Vec<usize>, OpError>,
        }

        let cases = [
            Case {
                shape: vec![2, 3],
                axis: 0,
                keep_dims: false,
                expected: Ok(vec![3]),
            },
            Case {
                shape: vec![2, 3, 4],
                axis: 1,
                keep_dims: false,
                expected: Ok(vec![2, 4]),
            },
            Case {
                shape: vec![5],
                axis: 0,
                keep_dims: false,
                expected: Ok(vec![]),
            },
            Case {
                shape: vec![2, 3, 4],
                axis: 2,
                keep_dims: true,
                expected: Ok(vec![2, 3, 1]),
            },
            Case {
                shape: vec![5],
                axis: 0,
                keep_dims: true,
                expected: Ok(vec![1]),
            },
            Case {
                shape: vec![2, 3],
                axis: 2,
                keep_dims: false,
                expected: Err(OpError::ShapeError(ShapeError::AxisOutOfRange {
                    axis: 2,
                    ndim: 2,
                })),
            },
        ];

        cases.test_each(|case| {
            let op = ArgMax {
                axis: case.axis,
                keep_dims: case.keep_dims,
                input_dims: case.shape.len(),
            };
            let result = op
                .infer_shape(&[case.shape.as_slice()])
                .map(|shape| shape.into_vec());
            assert_eq!(result, case.expected);
        })
    }

    #[test]
    fn test_infer_shape_input_count() {
        let op = ArgMax::new(2, 0, false).unwrap();
        let shape = [2, 3];

        for shapes in [&[][..], &[&shape[..], &shape[..]][..]] {
            assert_eq!(
                op.infer_shape(shapes),
                Err::<Shape, _>(OpError::ShapeError(ShapeError::InputCount {
                    expected: 1,
                    actual: shapes.len(),
                }))
            );
        }
    }

    #[test]
    fn test_run_matrix() {
        let input = Tensor::from_data(&[2, 3], vec![1.0f32, 5.0, 3.0, 4.0, 2.0, 6.0]);
        let op = ArgMax::new(2, 0, false).unwrap();

        let result: Tensor<i64> = op.run_simple(&input).unwrap();
        assert_eq!(result.shape(), &[3]);
        assert!(result.iter().all(|&i| (0..2).contains(&i)));
        assert_eq!(result.to_vec(), &[1, 0, 1]);
    }

    #[test]
    fn test_run_vector_is_scalar() {
        let input = Tensor::from_data(&[4], vec![2i32, 9, 4, 1]);

        for keep_dims in [false, true] {
            let op = ArgMax::new(1, 0, keep_dims).unwrap();
            let result: Tensor<i64> = op.run_simple(&input).unwrap();
            assert_eq!(result.ndim(), 0);
            assert_eq!(result.item(), Some(&1));
        }
    }

    #[test]
    fn test_run_keep_dims() {
        let input = Tensor::from_data(&[2, 3], vec![1i64, 5, 3, 4, 2, 6]);
        let op = ArgMax::new(2, 1, true).unwrap();

        let result: Tensor<i64> = op.run_simple(&input).unwrap();
        assert_eq!(result.shape(), &[2, 1]);
        assert_eq!(result.to_vec(), &[1, 2]);
    }

    #[test]
    fn test_run_rejects_sequence() {
        let seq = Sequence::new(DataType::Float);
        let op = ArgMax::new(2, 0, false).unwrap();

        let result = op.run(&InputList::from(&seq));
        assert_eq!(
            result.err(),
            Some(OpError::UnsupportedOperand {
                index: 0,
                actual: ValueType::Sequence(DataType::Float),
            })
        );
    }

    #[test]
    fn test_run_rank_mismatch() {
        let input = Tensor::<f32>::zeros(&[2, 3, 4]);
        let op = ArgMax::new(2, 0, false).unwrap();

        let result = op.run(&InputList::from(&input));
        assert_eq!(
            result.err(),
            Some(OpError::ShapeError(ShapeError::RankMismatch {
                expected: 2,
                actual: 3,
            }))
        );
    }

    #[test]
    fn test_identity_hash() {
        let a = ArgMax::new(3, 1, false).unwrap();
        let b = ArgMax::new(3, 1, false).unwrap();
        let c = ArgMax::new(3, 2, false).unwrap();

        assert_eq!(a.identity_hash(), b.identity_hash());
        assert!(a.is_same(&b));

        assert_ne!(a.identity_hash(), c.identity_hash());
        assert!(!a.is_same(&c));
    }

    #[test]
    fn test_display_name() {
        let op = ArgMax::new(3, 2, false).unwrap();
        assert_eq!(op.name(), "ArgMax");
        assert_eq!(op.display_name(), "ArgMax(axis=2, keepdims=0)");
        assert_eq!(op.in_place_input(), None);
    }

    #[test]
    fn test_type_signature() {
        let op = ArgMax::new(1, 0, false).unwrap();
        let sig = op.type_signature();
        for dtype in [DataType::Float, DataType::Int32, DataType::Int64] {
            assert_eq!(sig.output_dtype(&[dtype]), Ok(DataType::Int64));
        }
    }
}
