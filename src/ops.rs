//! The catalog of operators that can be lowered into a [`Graph`](crate::Graph).
//!
//! Each operator is a struct implementing [`Operator`](crate::Operator),
//! plus a free function that performs the computation on tensor views.

mod reduce;

pub use reduce::{arg_max, ArgMax};

use crate::operator::{OpError, ShapeError};

/// Resolve an axis given as a value in `[-ndim, ndim)` to the zero-based
/// dimension of a tensor with `ndim` dimensions.
///
/// Negative axis values count backwards from the last dimension.
pub fn resolve_axis(ndim: usize, axis: isize) -> Result<usize, OpError> {
    let rank = ndim as isize;
    let resolved = if axis < 0 { rank + axis } else { axis };
    if resolved < 0 || resolved >= rank {
        return Err(ShapeError::AxisOutOfRange { axis, ndim }.into());
    }
    Ok(resolved as usize)
}
