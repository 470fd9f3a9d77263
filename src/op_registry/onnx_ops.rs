//! Importers for operators from the ONNX operator set.

use std::sync::Arc;

use log::trace;

use super::{ImportOp, OpLoadContext, ReadOpError};
use crate::attrs::Attrs;
use crate::operator::{OpError, Operator, ShapeError};
use crate::ops;
use crate::ops::resolve_axis;

/// Importer for [`ArgMax`](ops::ArgMax).
///
/// The `axis` attribute defaults to 0 and may be negative. `keepdims`
/// defaults to true. Only an explicit zero turns it off.
#[derive(Debug)]
pub struct ArgMaxImport {
    axis: i64,
    keep_dims: bool,
}

impl Default for ArgMaxImport {
    fn default() -> Self {
        ArgMaxImport {
            axis: 0,
            keep_dims: true,
        }
    }
}

impl ImportOp for ArgMaxImport {
    fn op_type(&self) -> &'static str {
        "ArgMax"
    }

    fn init(&mut self, attrs: &Attrs, ctx: &dyn OpLoadContext) -> Result<(), ReadOpError> {
        if let Some(axis) = attrs.get_as::<i64>("axis")? {
            self.axis = axis;
        }
        if let Some(keep_dims) = attrs.get_as::<bool>("keepdims")? {
            self.keep_dims = keep_dims;
        }

        // Dimension-preserving output is opt-in.
        if self.keep_dims && !ctx.options().allow_keep_dims {
            return Err(ReadOpError::UnsupportedConfiguration {
                attr: "keepdims",
                reason: "keepdims must be false",
            });
        }
        Ok(())
    }

    fn arity(&self) -> usize {
        1
    }

    fn instantiate(
        &self,
        input_shapes: &[&[usize]],
    ) -> Result<Arc<dyn Operator + Send + Sync>, OpError> {
        let [input_shape] = input_shapes else {
            return Err(ShapeError::InputCount {
                expected: 1,
                actual: input_shapes.len(),
            }
            .into());
        };
        let ndim = input_shape.len();
        let axis = isize::try_from(self.axis).map_err(|_| ShapeError::AxisOutOfRange {
            axis: isize::MAX,
            ndim,
        })?;
        let resolved = resolve_axis(ndim, axis)?;
        if axis < 0 {
            trace!("resolved ArgMax axis {} to {} for {} dims", axis, resolved, ndim);
        }
        let op = ops::ArgMax::new(ndim, resolved, self.keep_dims)?;
        Ok(Arc::new(op))
    }
}
