mod dtypes;

use std::ptr::NonNull;

use ash::vk;
use tracing::{debug, warn};

pub use dtypes::*;

use crate::context::Context;
use crate::error::VulkanError;
use crate::resource::BufferResource;
use crate::storage::StorageMode;

/// Host-side view over the tensor contents.
///
/// Host tensors map their primary allocation; Device tensors map their
/// staging allocation, which external orchestration refreshes through
/// recorded device-to-staging copies. Storage tensors are never
/// host-visible, so they keep a host-side shadow of the construction data.
enum RawData<T: TensorElement> {
    /// Persistent mapping into host-visible device memory.
    Mapped { ptr: NonNull<u8>, len: usize },
    /// Host-side copy for tensors whose memory is never host-visible.
    Shadow(Vec<T::Scalar>),
    /// No host view; the tensor was destroyed or not yet established.
    Unmapped,
}

/// Structured data resident on the GPU.
///
/// A tensor owns (or borrows) the buffer/memory pair backing one block of
/// `T::Scalar` elements and records the staging transfers and barriers that
/// move the block between host-visible and device-local memory. Recording
/// goes into a caller-supplied command buffer; nothing here submits or waits,
/// so many tensors' transfers can be batched into one submission.
pub struct Tensor<T: TensorElement> {
    context: Context,
    mode: StorageMode,
    dtype: Dtype,
    element_count: usize,
    primary: Option<BufferResource>,
    staging: Option<BufferResource>,
    raw: RawData<T>,
}

pub type TensorBool = Tensor<BoolElement>;
pub type TensorI32 = Tensor<I32Element>;
pub type TensorU32 = Tensor<U32Element>;
pub type TensorF32 = Tensor<F32Element>;
pub type TensorF64 = Tensor<F64Element>;

// Mapped pointers stay valid until destroy, and the recording model is
// single-threaded: mutation requires external synchronization while read
// accessors may be shared once the tensor is allocated.
unsafe impl<T: TensorElement> Send for Tensor<T> {}
unsafe impl<T: TensorElement> Sync for Tensor<T> {}

impl<T: TensorElement> Tensor<T> {
    /// Create a tensor for `mode`, allocating fresh buffer/memory pairs and
    /// copying `data` into the host-visible side (or the shadow for
    /// [`StorageMode::Storage`]).
    pub fn new(
        context: &Context,
        data: &[T::Scalar],
        mode: StorageMode,
    ) -> Result<Self, VulkanError> {
        if data.is_empty() {
            return Err(VulkanError::EmptyTensor);
        }
        debug!(elements = data.len(), dtype = ?T::DTYPE, ?mode, "creating tensor");

        let mut tensor = Self {
            context: context.clone(),
            mode,
            dtype: T::DTYPE,
            element_count: data.len(),
            primary: None,
            staging: None,
            raw: RawData::Unmapped,
        };
        let (primary, staging) =
            Self::allocate_resources(context, mode, tensor.size_bytes() as vk::DeviceSize)?;
        tensor.primary = Some(primary);
        tensor.staging = staging;
        tensor.establish_raw_view(data)?;
        Ok(tensor)
    }

    /// Wrap externally created primary handles without taking ownership of
    /// them; they are never released by this tensor. A Device-mode tensor
    /// still allocates (and owns) its staging pair.
    ///
    /// For [`StorageMode::Host`] the supplied memory must be host-visible and
    /// host-coherent, since the tensor maps it persistently.
    pub fn from_external(
        context: &Context,
        data: &[T::Scalar],
        mode: StorageMode,
        buffer: vk::Buffer,
        memory: vk::DeviceMemory,
    ) -> Result<Self, VulkanError> {
        if data.is_empty() {
            return Err(VulkanError::EmptyTensor);
        }
        debug!(elements = data.len(), dtype = ?T::DTYPE, ?mode, "wrapping external tensor resources");

        let mut tensor = Self {
            context: context.clone(),
            mode,
            dtype: T::DTYPE,
            element_count: data.len(),
            primary: Some(BufferResource::from_external(buffer, memory)),
            staging: None,
            raw: RawData::Unmapped,
        };
        if let (Some(usage), Some(flags)) = (mode.staging_usage_flags(), mode.staging_memory_flags())
        {
            let staging = BufferResource::allocate(
                context,
                tensor.size_bytes() as vk::DeviceSize,
                usage,
                flags,
            )?;
            tensor.staging = Some(staging);
        }
        tensor.establish_raw_view(data)?;
        Ok(tensor)
    }

    /// Number of elements held by the tensor.
    #[inline]
    pub fn len(&self) -> usize {
        self.element_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.element_count == 0
    }

    /// Total size of the tensor contents in bytes.
    #[inline]
    pub fn size_bytes(&self) -> usize {
        self.element_count * self.dtype.size_bytes()
    }

    #[inline]
    pub fn dtype(&self) -> Dtype {
        self.dtype
    }

    #[inline]
    pub fn mode(&self) -> StorageMode {
        self.mode
    }

    /// Whether GPU resources are currently allocated.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.primary.is_some()
    }

    /// Descriptor info referencing the primary buffer over the tensor's full
    /// range, for binding into external descriptor sets without exposing the
    /// buffer handle's lifetime management.
    pub fn descriptor_info(&self) -> Result<vk::DescriptorBufferInfo, VulkanError> {
        let primary = self.primary.as_ref().ok_or(VulkanError::NotInitialized)?;
        Ok(vk::DescriptorBufferInfo::default()
            .buffer(primary.buffer)
            .offset(0)
            .range(self.size_bytes() as vk::DeviceSize))
    }

    /// Immutable typed view of the host-visible contents.
    pub fn as_slice(&self) -> Result<&[T::Scalar], VulkanError> {
        match &self.raw {
            RawData::Mapped { ptr, .. } => Ok(unsafe {
                std::slice::from_raw_parts(ptr.as_ptr().cast::<T::Scalar>(), self.element_count)
            }),
            RawData::Shadow(shadow) => Ok(shadow.as_slice()),
            RawData::Unmapped => Err(VulkanError::NotInitialized),
        }
    }

    /// Mutable typed view of the host-visible contents. Ensure no GPU work is
    /// reading or writing the region concurrently.
    pub fn as_mut_slice(&mut self) -> Result<&mut [T::Scalar], VulkanError> {
        match &mut self.raw {
            RawData::Mapped { ptr, .. } => Ok(unsafe {
                std::slice::from_raw_parts_mut(ptr.as_ptr().cast::<T::Scalar>(), self.element_count)
            }),
            RawData::Shadow(shadow) => Ok(shadow.as_mut_slice()),
            RawData::Unmapped => Err(VulkanError::NotInitialized),
        }
    }

    /// Copy the tensor contents into a host `Vec`.
    pub fn to_vec(&self) -> Result<Vec<T::Scalar>, VulkanError> {
        Ok(self.as_slice()?.to_vec())
    }

    /// Byte view of the host-visible contents.
    pub fn raw_data(&self) -> Result<&[u8], VulkanError> {
        match &self.raw {
            RawData::Mapped { ptr, len } => {
                Ok(unsafe { std::slice::from_raw_parts(ptr.as_ptr(), *len) })
            }
            RawData::Shadow(shadow) => Ok(scalar_bytes::<T>(shadow.as_slice())),
            RawData::Unmapped => Err(VulkanError::NotInitialized),
        }
    }

    /// Overwrite the host-visible contents from a typed slice. The element
    /// count must match exactly.
    pub fn set_data(&mut self, data: &[T::Scalar]) -> Result<(), VulkanError> {
        if data.len() != self.element_count {
            return Err(VulkanError::SizeMismatch {
                expected: self.element_count,
                actual: data.len(),
            });
        }
        self.as_mut_slice()?.copy_from_slice(data);
        Ok(())
    }

    /// Overwrite the host-visible contents from raw bytes. The byte length
    /// must equal [`Tensor::size_bytes`], and the bytes must form valid bit
    /// patterns for the element type.
    pub fn set_raw_data(&mut self, bytes: &[u8]) -> Result<(), VulkanError> {
        if bytes.len() != self.size_bytes() {
            return Err(VulkanError::SizeMismatch {
                expected: self.size_bytes(),
                actual: bytes.len(),
            });
        }
        let dst = match &mut self.raw {
            RawData::Mapped { ptr, len } => unsafe {
                std::slice::from_raw_parts_mut(ptr.as_ptr(), *len)
            },
            RawData::Shadow(shadow) => scalar_bytes_mut::<T>(shadow.as_mut_slice()),
            RawData::Unmapped => return Err(VulkanError::NotInitialized),
        };
        dst.copy_from_slice(bytes);
        Ok(())
    }

    /// Record a buffer-to-buffer copy of the full contents of `source` into
    /// this tensor's primary buffer. Both sizes must match, and neither side
    /// may be a [`StorageMode::Storage`] tensor (their buffers carry no
    /// transfer usage).
    pub fn record_copy_from(
        &self,
        command_buffer: vk::CommandBuffer,
        source: &Tensor<T>,
    ) -> Result<(), VulkanError> {
        if source.size_bytes() != self.size_bytes() {
            return Err(VulkanError::SizeMismatch {
                expected: self.size_bytes(),
                actual: source.size_bytes(),
            });
        }
        if self.mode == StorageMode::Storage || source.mode == StorageMode::Storage {
            return Err(VulkanError::InvalidStorageOperation {
                operation: "record_copy_from",
                mode: StorageMode::Storage,
            });
        }
        let src = source.primary_buffer()?;
        let dst = self.primary_buffer()?;
        self.record_copy_buffer(command_buffer, src, dst);
        Ok(())
    }

    /// Record a copy from the staging buffer to the device-local primary
    /// buffer. Only valid for [`StorageMode::Device`] tensors.
    pub fn record_copy_from_staging_to_device(
        &self,
        command_buffer: vk::CommandBuffer,
    ) -> Result<(), VulkanError> {
        let staging = self.staging_buffer("record_copy_from_staging_to_device")?;
        let primary = self.primary_buffer()?;
        self.record_copy_buffer(command_buffer, staging, primary);
        Ok(())
    }

    /// Record a copy from the device-local primary buffer back to the staging
    /// buffer. Only valid for [`StorageMode::Device`] tensors.
    pub fn record_copy_from_device_to_staging(
        &self,
        command_buffer: vk::CommandBuffer,
    ) -> Result<(), VulkanError> {
        let staging = self.staging_buffer("record_copy_from_device_to_staging")?;
        let primary = self.primary_buffer()?;
        self.record_copy_buffer(command_buffer, primary, staging);
        Ok(())
    }

    /// Record a memory barrier on the primary buffer. The caller chooses the
    /// access and stage masks expressing the producer/consumer dependency;
    /// they are recorded as given, never validated.
    pub fn record_primary_buffer_memory_barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        src_access_mask: vk::AccessFlags,
        dst_access_mask: vk::AccessFlags,
        src_stage_mask: vk::PipelineStageFlags,
        dst_stage_mask: vk::PipelineStageFlags,
    ) -> Result<(), VulkanError> {
        let buffer = self.primary_buffer()?;
        self.record_buffer_memory_barrier(
            command_buffer,
            buffer,
            src_access_mask,
            dst_access_mask,
            src_stage_mask,
            dst_stage_mask,
        );
        Ok(())
    }

    /// Record a memory barrier on the staging buffer. Only valid for
    /// [`StorageMode::Device`] tensors.
    pub fn record_staging_buffer_memory_barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        src_access_mask: vk::AccessFlags,
        dst_access_mask: vk::AccessFlags,
        src_stage_mask: vk::PipelineStageFlags,
        dst_stage_mask: vk::PipelineStageFlags,
    ) -> Result<(), VulkanError> {
        let buffer = self.staging_buffer("record_staging_buffer_memory_barrier")?;
        self.record_buffer_memory_barrier(
            command_buffer,
            buffer,
            src_access_mask,
            dst_access_mask,
            src_stage_mask,
            dst_stage_mask,
        );
        Ok(())
    }

    /// Re-initialise the tensor with new contents, keeping the storage mode.
    ///
    /// Replacement resources are allocated before the old ones are released,
    /// so a failed rebuild leaves the tensor exactly as it was.
    pub fn rebuild(&mut self, data: &[T::Scalar]) -> Result<(), VulkanError> {
        if data.is_empty() {
            return Err(VulkanError::EmptyTensor);
        }
        debug!(elements = data.len(), mode = ?self.mode, "rebuilding tensor");

        let size = (data.len() * self.dtype.size_bytes()) as vk::DeviceSize;
        let (primary, staging) = Self::allocate_resources(&self.context, self.mode, size)?;

        self.release_resources();
        self.primary = Some(primary);
        self.staging = staging;
        self.element_count = data.len();
        self.establish_raw_view(data)?;
        Ok(())
    }

    /// Release the owned GPU resources. Idempotent: destroying an already
    /// destroyed tensor is a no-op, and borrowed handles are never touched.
    pub fn destroy(&mut self) {
        if !self.is_initialized() {
            return;
        }
        debug!(elements = self.element_count, mode = ?self.mode, "destroying tensor");
        self.release_resources();
    }

    fn allocate_resources(
        context: &Context,
        mode: StorageMode,
        size: vk::DeviceSize,
    ) -> Result<(BufferResource, Option<BufferResource>), VulkanError> {
        let mut primary = BufferResource::allocate(
            context,
            size,
            mode.primary_usage_flags(),
            mode.primary_memory_flags(),
        )?;
        let staging = match (mode.staging_usage_flags(), mode.staging_memory_flags()) {
            (Some(usage), Some(flags)) => {
                match BufferResource::allocate(context, size, usage, flags) {
                    Ok(staging) => Some(staging),
                    Err(err) => {
                        primary.release(context.device());
                        return Err(err);
                    }
                }
            }
            _ => None,
        };
        Ok((primary, staging))
    }

    /// Establish the host view for the current resources and copy `data` in.
    fn establish_raw_view(&mut self, data: &[T::Scalar]) -> Result<(), VulkanError> {
        match self.mode {
            StorageMode::Host | StorageMode::Device => {
                self.map_raw_data()?;
                self.set_data(data)?;
            }
            StorageMode::Storage => {
                self.raw = RawData::Shadow(data.to_vec());
            }
        }
        Ok(())
    }

    /// Persistently map the host-visible allocation. Mapping an already
    /// mapped tensor is a no-op, as is mapping a tensor with no host-visible
    /// memory.
    fn map_raw_data(&mut self) -> Result<(), VulkanError> {
        if matches!(self.raw, RawData::Mapped { .. }) {
            return Ok(());
        }
        let Some(memory) = self.host_visible_memory() else {
            warn!(mode = ?self.mode, "tensor has no host-visible memory to map");
            return Ok(());
        };
        let len = self.size_bytes();
        let ptr = unsafe {
            self.context.device().map_memory(
                memory,
                0,
                len as vk::DeviceSize,
                vk::MemoryMapFlags::empty(),
            )
        }
        .map_err(VulkanError::MemoryMapFailed)?;
        let ptr = NonNull::new(ptr.cast::<u8>())
            .ok_or(VulkanError::MemoryMapFailed(vk::Result::ERROR_MEMORY_MAP_FAILED))?;
        self.raw = RawData::Mapped { ptr, len };
        Ok(())
    }

    /// Drop the persistent mapping. Safe to call on an unmapped tensor.
    fn unmap_raw_data(&mut self) {
        if matches!(self.raw, RawData::Mapped { .. }) {
            if let Some(memory) = self.host_visible_memory() {
                unsafe { self.context.device().unmap_memory(memory) };
            }
        }
        self.raw = RawData::Unmapped;
    }

    /// The memory backing the host view: primary for Host tensors, staging
    /// for Device tensors, none for Storage tensors.
    fn host_visible_memory(&self) -> Option<vk::DeviceMemory> {
        match self.mode {
            StorageMode::Host => self.primary.as_ref().map(|resource| resource.memory),
            StorageMode::Device => self.staging.as_ref().map(|resource| resource.memory),
            StorageMode::Storage => None,
        }
    }

    fn primary_buffer(&self) -> Result<vk::Buffer, VulkanError> {
        self.primary
            .as_ref()
            .map(|resource| resource.buffer)
            .ok_or(VulkanError::NotInitialized)
    }

    fn staging_buffer(&self, operation: &'static str) -> Result<vk::Buffer, VulkanError> {
        if self.mode != StorageMode::Device {
            return Err(VulkanError::InvalidStorageOperation {
                operation,
                mode: self.mode,
            });
        }
        self.staging
            .as_ref()
            .map(|resource| resource.buffer)
            .ok_or(VulkanError::NotInitialized)
    }

    fn record_copy_buffer(&self, command_buffer: vk::CommandBuffer, src: vk::Buffer, dst: vk::Buffer) {
        let region = vk::BufferCopy::default().size(self.size_bytes() as vk::DeviceSize);
        unsafe {
            self.context
                .device()
                .cmd_copy_buffer(command_buffer, src, dst, &[region])
        };
    }

    fn record_buffer_memory_barrier(
        &self,
        command_buffer: vk::CommandBuffer,
        buffer: vk::Buffer,
        src_access_mask: vk::AccessFlags,
        dst_access_mask: vk::AccessFlags,
        src_stage_mask: vk::PipelineStageFlags,
        dst_stage_mask: vk::PipelineStageFlags,
    ) {
        let barrier = vk::BufferMemoryBarrier::default()
            .src_access_mask(src_access_mask)
            .dst_access_mask(dst_access_mask)
            .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
            .buffer(buffer)
            .offset(0)
            .size(vk::WHOLE_SIZE);
        unsafe {
            self.context.device().cmd_pipeline_barrier(
                command_buffer,
                src_stage_mask,
                dst_stage_mask,
                vk::DependencyFlags::empty(),
                &[],
                &[barrier],
                &[],
            )
        };
    }

    /// Unmap and release owned resources; borrowed handles survive.
    fn release_resources(&mut self) {
        self.unmap_raw_data();
        if let Some(mut staging) = self.staging.take() {
            staging.release(self.context.device());
        }
        if let Some(mut primary) = self.primary.take() {
            primary.release(self.context.device());
        }
    }
}

impl<T: TensorElement> Drop for Tensor<T> {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn scalar_bytes<T: TensorElement>(data: &[T::Scalar]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(data.as_ptr().cast::<u8>(), std::mem::size_of_val(data)) }
}

fn scalar_bytes_mut<T: TensorElement>(data: &mut [T::Scalar]) -> &mut [u8] {
    unsafe {
        std::slice::from_raw_parts_mut(data.as_mut_ptr().cast::<u8>(), std::mem::size_of_val(data))
    }
}
