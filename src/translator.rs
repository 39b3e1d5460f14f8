//! This module translates [`ndarray`] matrices to and from [`HostBuffer`]s
//!
//! The kernels index matrices row by row, so the data is always copied in the logical
//! (row-major) order of the array, whatever its memory layout is.

use crate::errors::{OffloadError, OffloadResult};
use crate::variable::{Element, HostBuffer, Shape};
use ndarray::Array2;

impl<T: Element> HostBuffer<T> {
    /// Creates a matrix buffer from a borrowed [`ndarray::Array2`]
    ///
    /// # Example
    /// ```
    /// use ndarray::array;
    /// use wgpu_offload::variable::{HostBuffer, Shape};
    ///
    /// let a = array![[0., 1., 2.], [3., 4., 5.]];
    /// let buffer = HostBuffer::<f32>::from_array2(&a.t().to_owned());
    /// assert_eq!(buffer.shape(), Shape::Matrix { rows: 3, cols: 2 });
    /// assert_eq!(buffer.as_slice(), &[0., 3., 1., 4., 2., 5.]);
    /// ```
    pub fn from_array2(array: &Array2<T>) -> Self {
        let (rows, cols) = array.dim();
        HostBuffer {
            data: array.iter().copied().collect(),
            shape: Shape::Matrix { rows, cols },
            name: None,
        }
    }

    /// Copies a matrix buffer into an [`ndarray::Array2`]
    ///
    /// # Errors
    /// - [`OffloadError::ShapeMismatch`] if the buffer holds a vector
    pub fn to_array2(&self) -> OffloadResult<Array2<T>> {
        match self.shape() {
            Shape::Matrix { rows, cols } => Array2::from_shape_vec((rows, cols), self.as_slice().to_vec())
                .map_err(|err| OffloadError::ShapeMismatch(err.to_string())),
            Shape::Vector(n) => Err(OffloadError::ShapeMismatch(format!(
                "a vector of {n} elements is not a matrix"
            ))),
        }
    }
}
