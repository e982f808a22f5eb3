use std::fmt::{Debug, Display};

/// Supported data types for tensors.
///
/// The discriminants are the stable tag values external dispatch machinery
/// sees (push constants, specialization info), so they must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    Bool = 0,
    I32 = 1,
    U32 = 2,
    F32 = 3,
    F64 = 4,
}

impl Dtype {
    /// Size in bytes for this data type.
    pub fn size_bytes(&self) -> usize {
        match self {
            Dtype::Bool => 1,
            Dtype::I32 | Dtype::U32 | Dtype::F32 => 4,
            Dtype::F64 => 8,
        }
    }
}

/// Trait describing how a tensor element is represented on the host.
///
/// Implementors are zero-sized markers; the associated `Scalar` is the actual
/// host type stored in the buffer. Pinning the scalar to the [`Dtype`] at the
/// type level means a tensor can only ever be read through the element type
/// it was created with.
pub trait TensorElement: Copy + Send + Sync + 'static {
    /// Host scalar type corresponding to the tensor element.
    type Scalar: Copy + Send + Sync + PartialEq + PartialOrd + Display + Debug + 'static;

    /// [`Dtype`] tag for this tensor element.
    const DTYPE: Dtype;
}

/// Marker type for `bool` tensors.
#[derive(Clone, Copy, Debug, Default)]
pub struct BoolElement;

impl TensorElement for BoolElement {
    type Scalar = bool;

    const DTYPE: Dtype = Dtype::Bool;
}

/// Marker type for `i32` tensors.
#[derive(Clone, Copy, Debug, Default)]
pub struct I32Element;

impl TensorElement for I32Element {
    type Scalar = i32;

    const DTYPE: Dtype = Dtype::I32;
}

/// Marker type for `u32` tensors.
#[derive(Clone, Copy, Debug, Default)]
pub struct U32Element;

impl TensorElement for U32Element {
    type Scalar = u32;

    const DTYPE: Dtype = Dtype::U32;
}

/// Marker type for `f32` tensors.
#[derive(Clone, Copy, Debug, Default)]
pub struct F32Element;

impl TensorElement for F32Element {
    type Scalar = f32;

    const DTYPE: Dtype = Dtype::F32;
}

/// Marker type for `f64` tensors.
#[derive(Clone, Copy, Debug, Default)]
pub struct F64Element;

impl TensorElement for F64Element {
    type Scalar = f64;

    const DTYPE: Dtype = Dtype::F64;
}
