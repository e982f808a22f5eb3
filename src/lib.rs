//! GPU-resident tensor storage and transfer primitives built on Vulkan.
//!
//! A [`Tensor`] owns (or borrows) the buffer/memory pair backing a block of
//! typed data and records the staging copies and memory barriers that move
//! that data between host-visible and device-local memory. Pipelines,
//! command-buffer submission, and synchronization live outside this crate and
//! are consumed as opaque [`ash`] handles.

pub use context::Context;
pub use error::VulkanError;
pub use resource::{BufferResource, Ownership};
pub use storage::StorageMode;
pub use tensor::{
    BoolElement, Dtype, F32Element, F64Element, I32Element, Tensor, TensorBool, TensorElement,
    TensorF32, TensorF64, TensorI32, TensorU32, U32Element,
};

pub mod context;
pub mod error;
pub mod resource;
pub mod storage;
pub mod tensor;

mod tests;
