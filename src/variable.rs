use crate::errors::{OffloadError, OffloadResult};
use core::fmt::{Debug, Display};

/// This trait is the entry point to make a Rust type transferable to and from the GPU
///
/// It contains all that is needed by an [`crate::interface::ExecutionContext`] to stage the
/// object into a device buffer and to read the result of a kernel back into it.
/// [`HostBuffer`] is the implementation used by the crate.
pub trait Variable
where
    Self: Debug + Send,
{
    /// Gets an optional name associated with the [`Variable`]
    ///
    /// It is useful to always give variables a name for debugging purposes, it will
    /// be used as the label of the device buffer.
    fn get_name(&self) -> Option<&str>;

    /// This function calculates the byte size of the object
    ///
    /// The size needs to be valid and true, as it will be compared with the size
    /// of the device buffer before every transfer.
    fn byte_size(&self) -> u64;

    /// This method is needed to pass the data to the GPU
    ///
    /// The GPU needs the data as an ordered stream of bytes, which is copied in
    /// the buffer and than distributed to the threads.
    fn byte_data(&self) -> &[u8];

    /// This is the opposite of [`Variable::byte_data`] to get the data back
    ///
    /// The slice has to be exactly [`Variable::byte_size`] long.
    fn read_data(&mut self, slice: &[u8]) -> OffloadResult<()>;

    /// Size of each logical dimension, padded with 1s
    fn dimension_sizes(&self) -> [u32; 3];
}

/// Scalar element a [`HostBuffer`] can hold
///
/// The kernels only deal with 32-bit types, both sides must agree on the element
/// layout for the staging to be a plain byte copy.
pub trait Element: bytemuck::Pod + Debug + Display + Default + PartialEq + Send + Sync {
    /// Name of the same type in WGSL
    const WGSL_TYPE: &'static str;

    /// Addition with the overflow behaviour of the device
    fn device_add(self, other: Self) -> Self;
}

impl Element for f32 {
    const WGSL_TYPE: &'static str = "f32";

    fn device_add(self, other: Self) -> Self {
        self + other
    }
}

impl Element for i32 {
    const WGSL_TYPE: &'static str = "i32";

    fn device_add(self, other: Self) -> Self {
        // WGSL integer arithmetic wraps
        self.wrapping_add(other)
    }
}

/// Logical shape of a [`HostBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Vector(usize),
    /// Stored row by row, `rows * cols` elements
    Matrix { rows: usize, cols: usize },
}

impl Shape {
    pub fn square(size: usize) -> Self {
        Shape::Matrix {
            rows: size,
            cols: size,
        }
    }

    pub fn len(&self) -> usize {
        match *self {
            Shape::Vector(n) => n,
            Shape::Matrix { rows, cols } => rows * cols,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(rows, cols)`, a vector being a single row
    pub fn dims(&self) -> (usize, usize) {
        match *self {
            Shape::Vector(n) => (1, n),
            Shape::Matrix { rows, cols } => (rows, cols),
        }
    }

    /// Side length when the shape is a square matrix
    pub fn square_side(&self) -> Option<usize> {
        match *self {
            Shape::Matrix { rows, cols } if rows == cols => Some(rows),
            _ => None,
        }
    }
}

/// Contiguous host array with a fixed logical shape
///
/// The length is fixed when the buffer is built and can't change afterwards: the content
/// can be overwritten (initial fill, host reference result, device readback) but never resized.
#[derive(Debug, Clone, PartialEq)]
pub struct HostBuffer<T: Element> {
    pub(crate) data: Vec<T>,
    pub(crate) shape: Shape,
    pub(crate) name: Option<String>,
}

impl<T: Element> HostBuffer<T> {
    /// Creates a buffer with every element set to `value`
    ///
    /// # Example
    /// ```
    /// use wgpu_offload::variable::{HostBuffer, Shape};
    /// let a = HostBuffer::filled(Shape::square(2), 3.0f32);
    /// assert_eq!(a.as_slice(), &[3.0, 3.0, 3.0, 3.0]);
    /// ```
    pub fn filled(shape: Shape, value: T) -> Self {
        HostBuffer {
            data: vec![value; shape.len()],
            shape,
            name: None,
        }
    }

    pub fn zeros(shape: Shape) -> Self {
        Self::filled(shape, T::default())
    }

    /// Wraps existing data, whose length must match the shape
    pub fn from_vec(shape: Shape, data: Vec<T>) -> OffloadResult<Self> {
        if data.len() != shape.len() {
            return Err(OffloadError::SizeMismatch {
                expected: shape.len() as u64,
                actual: data.len() as u64,
            });
        }
        Ok(HostBuffer {
            data,
            shape,
            name: None,
        })
    }

    /// Gives the buffer a name, used as label of its device copies
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable view of the content. A slice can't be resized, so the shape stays valid.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Element at `(row, col)`; a vector is a single row
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        let (rows, cols) = self.shape.dims();
        if row >= rows || col >= cols {
            return None;
        }
        self.data.get(row * cols + col).copied()
    }

    /// Renders the top-left `rows` x `cols` block, one line per row
    ///
    /// # Example
    /// ```
    /// use wgpu_offload::variable::{HostBuffer, Shape};
    /// let c = HostBuffer::from_vec(Shape::square(3), (0..9).collect::<Vec<i32>>()).unwrap();
    /// assert_eq!(c.preview(2, 2), "0 1\n3 4\n");
    /// ```
    pub fn preview(&self, rows: usize, cols: usize) -> String {
        let (total_rows, total_cols) = self.shape.dims();
        let mut out = String::new();
        for row in 0..rows.min(total_rows) {
            let line: Vec<String> = (0..cols.min(total_cols))
                .filter_map(|col| self.get(row, col))
                .map(|value| value.to_string())
                .collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }
}

impl<T: Element> Variable for HostBuffer<T> {
    fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn byte_size(&self) -> u64 {
        (std::mem::size_of::<T>() * self.data.len()) as u64
    }

    fn byte_data(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    fn read_data(&mut self, slice: &[u8]) -> OffloadResult<()> {
        if slice.len() as u64 != self.byte_size() {
            return Err(OffloadError::SizeMismatch {
                expected: self.byte_size(),
                actual: slice.len() as u64,
            });
        }
        // the mapped range is not guaranteed to be aligned for T
        let target: &mut [u8] = bytemuck::cast_slice_mut(&mut self.data);
        target.copy_from_slice(slice);
        Ok(())
    }

    fn dimension_sizes(&self) -> [u32; 3] {
        match self.shape {
            Shape::Vector(n) => [n as u32, 1, 1],
            Shape::Matrix { rows, cols } => [rows as u32, cols as u32, 1],
        }
    }
}
