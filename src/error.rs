use ash::vk;
use thiserror::Error;

use crate::storage::StorageMode;

#[derive(Error, Debug)]
pub enum VulkanError {
    #[error("Buffer creation failed for {size} bytes: {source}")]
    BufferCreationFailed { size: u64, source: vk::Result },
    #[error("No memory type matches requirement bits {type_bits:#x} with properties {flags:?}")]
    NoSuitableMemoryType {
        type_bits: u32,
        flags: vk::MemoryPropertyFlags,
    },
    #[error("Device memory allocation of {size} bytes failed: {source}")]
    OutOfDeviceMemory { size: u64, source: vk::Result },
    #[error("Binding memory to buffer failed: {0}")]
    MemoryBindFailed(vk::Result),
    #[error("Mapping device memory failed: {0}")]
    MemoryMapFailed(vk::Result),
    #[error("Size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("Operation `{operation}` is not valid for {mode:?} tensors")]
    InvalidStorageOperation {
        operation: &'static str,
        mode: StorageMode,
    },
    #[error("Tensor must be created with at least one element")]
    EmptyTensor,
    #[error("Tensor is not initialized")]
    NotInitialized,
}
