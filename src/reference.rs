//! Host reference algorithms
//!
//! Single threaded versions of the kernels. They are the oracle the device results are
//! checked against and the execution path used when no device is requested, so they use
//! exactly the same index arithmetic and summation order as the kernels.

use crate::errors::{OffloadError, OffloadResult};
use crate::variable::{Element, HostBuffer, Shape};

/// Index scheme of the square matrix product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Indexing {
    /// `C[r*n + c] = Σ_k A[k*n + r] * B[c*n + r]`
    ///
    /// Reproduces the results of the historical kernel, which reads both operands at the
    /// output row instead of at the summation index. It is not a conventional product.
    #[default]
    Legacy,
    /// Conventional row-major product, `C[r*n + c] = Σ_k A[r*n + k] * B[k*n + c]`
    Standard,
}

impl Indexing {
    /// Kernel entry point computing the product with this indexing
    pub fn entry_point(&self) -> &'static str {
        match self {
            Indexing::Legacy => "MultiplyMatrices",
            Indexing::Standard => "MultiplyMatricesStandard",
        }
    }
}

/// Square matrix product of `a` and `b`
///
/// # Errors
/// - [`OffloadError::ShapeMismatch`] if the operands are not square matrices of the same size
///
/// # Example
/// ```
/// use wgpu_offload::reference::{multiply, Indexing};
/// use wgpu_offload::variable::{HostBuffer, Shape};
///
/// let a = HostBuffer::filled(Shape::square(2), 3.0f32);
/// let b = HostBuffer::filled(Shape::square(2), 2.0f32);
/// let c = multiply(&a, &b, Indexing::Legacy).unwrap();
/// assert_eq!(c.as_slice(), &[12.0, 12.0, 12.0, 12.0]);
/// ```
pub fn multiply(
    a: &HostBuffer<f32>,
    b: &HostBuffer<f32>,
    indexing: Indexing,
) -> OffloadResult<HostBuffer<f32>> {
    let size = square_operands(a, b)?;
    let mut c = HostBuffer::zeros(Shape::square(size));
    multiply_into(size, a.as_slice(), b.as_slice(), c.as_mut_slice(), indexing)?;
    Ok(c)
}

/// Square matrix product on raw row-major slices of `size * size` elements
///
/// # Errors
/// - [`OffloadError::SizeMismatch`] (in elements) if a slice doesn't hold `size * size` elements
pub fn multiply_into(
    size: usize,
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
    indexing: Indexing,
) -> OffloadResult<()> {
    let expected = size * size;
    for len in [a.len(), b.len(), c.len()] {
        if len != expected {
            return Err(OffloadError::SizeMismatch {
                expected: expected as u64,
                actual: len as u64,
            });
        }
    }
    for row in 0..size {
        for col in 0..size {
            let mut sum = 0.0f32;
            for idx in 0..size {
                sum += match indexing {
                    Indexing::Legacy => a[idx * size + row] * b[col * size + row],
                    Indexing::Standard => a[row * size + idx] * b[idx * size + col],
                };
            }
            c[row * size + col] = sum;
        }
    }
    Ok(())
}

/// Elementwise sum of two buffers of the same shape
///
/// # Example
/// ```
/// use wgpu_offload::reference::vector_add;
/// use wgpu_offload::variable::{HostBuffer, Shape};
///
/// let a = HostBuffer::from_vec(Shape::Vector(3), vec![0, 1, 2]).unwrap();
/// let b = HostBuffer::filled(Shape::Vector(3), 10);
/// assert_eq!(vector_add(&a, &b).unwrap().as_slice(), &[10, 11, 12]);
/// ```
pub fn vector_add<T: Element>(a: &HostBuffer<T>, b: &HostBuffer<T>) -> OffloadResult<HostBuffer<T>> {
    if a.shape() != b.shape() {
        return Err(OffloadError::ShapeMismatch(format!(
            "cannot add {:?} and {:?}",
            a.shape(),
            b.shape()
        )));
    }
    let mut c = HostBuffer::zeros(a.shape());
    for ((out, &x), &y) in c.as_mut_slice().iter_mut().zip(a.as_slice()).zip(b.as_slice()) {
        *out = x.device_add(y);
    }
    Ok(c)
}

fn square_operands(a: &HostBuffer<f32>, b: &HostBuffer<f32>) -> OffloadResult<usize> {
    match (a.shape().square_side(), b.shape().square_side()) {
        (Some(n), Some(m)) if n == m => Ok(n),
        _ => Err(OffloadError::ShapeMismatch(format!(
            "expected two square matrices of the same size, got {:?} and {:?}",
            a.shape(),
            b.shape()
        ))),
    }
}
