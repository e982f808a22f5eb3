use ash::vk;
use tracing::debug;

use crate::context::Context;
use crate::error::VulkanError;

/// Whether a Vulkan handle was created by this crate or supplied externally.
///
/// Borrowed handles are used but never destroyed; their lifetime belongs to
/// whoever created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owned,
    Borrowed,
}

impl Ownership {
    #[inline]
    pub fn is_owned(&self) -> bool {
        matches!(self, Ownership::Owned)
    }
}

/// A buffer with its backing memory, each handle carrying its own ownership
/// tag. A resource may own its buffer while borrowing its memory, or vice
/// versa, when handles were supplied externally.
#[derive(Debug)]
pub struct BufferResource {
    pub buffer: vk::Buffer,
    pub memory: vk::DeviceMemory,
    buffer_ownership: Ownership,
    memory_ownership: Ownership,
}

impl BufferResource {
    /// Create a buffer and bind freshly allocated memory to it. Both handles
    /// are owned and released by [`BufferResource::release`].
    pub fn allocate(
        ctx: &Context,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        memory_flags: vk::MemoryPropertyFlags,
    ) -> Result<Self, VulkanError> {
        let buffer = create_buffer(ctx, size, usage)?;
        let memory = match allocate_bind_memory(ctx, buffer, memory_flags) {
            Ok(memory) => memory,
            Err(err) => {
                unsafe { ctx.device().destroy_buffer(buffer, None) };
                return Err(err);
            }
        };
        Ok(Self {
            buffer,
            memory,
            buffer_ownership: Ownership::Owned,
            memory_ownership: Ownership::Owned,
        })
    }

    /// Adopt externally created handles. Neither is released here.
    pub fn from_external(buffer: vk::Buffer, memory: vk::DeviceMemory) -> Self {
        Self::from_parts(buffer, memory, Ownership::Borrowed, Ownership::Borrowed)
    }

    /// Assemble a resource with explicit per-handle ownership.
    pub fn from_parts(
        buffer: vk::Buffer,
        memory: vk::DeviceMemory,
        buffer_ownership: Ownership,
        memory_ownership: Ownership,
    ) -> Self {
        Self {
            buffer,
            memory,
            buffer_ownership,
            memory_ownership,
        }
    }

    #[inline]
    pub fn buffer_ownership(&self) -> Ownership {
        self.buffer_ownership
    }

    #[inline]
    pub fn memory_ownership(&self) -> Ownership {
        self.memory_ownership
    }

    /// Destroy the owned handles and null both out. Borrowed handles are
    /// left untouched. Safe to call repeatedly.
    pub fn release(&mut self, device: &ash::Device) {
        if self.buffer_ownership.is_owned() && self.buffer != vk::Buffer::null() {
            debug!(buffer = ?self.buffer, "destroying owned buffer");
            unsafe { device.destroy_buffer(self.buffer, None) };
        }
        self.buffer = vk::Buffer::null();
        if self.memory_ownership.is_owned() && self.memory != vk::DeviceMemory::null() {
            debug!(memory = ?self.memory, "freeing owned memory");
            unsafe { device.free_memory(self.memory, None) };
        }
        self.memory = vk::DeviceMemory::null();
    }
}

/// Create a buffer of `size` bytes with the given usage.
pub(crate) fn create_buffer(
    ctx: &Context,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
) -> Result<vk::Buffer, VulkanError> {
    let info = vk::BufferCreateInfo::default()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);
    unsafe { ctx.device().create_buffer(&info, None) }
        .map_err(|source| VulkanError::BufferCreationFailed { size, source })
}

/// Allocate memory compatible with `buffer` and the requested property flags,
/// then bind it. The allocation is freed again if the bind is rejected.
pub(crate) fn allocate_bind_memory(
    ctx: &Context,
    buffer: vk::Buffer,
    memory_flags: vk::MemoryPropertyFlags,
) -> Result<vk::DeviceMemory, VulkanError> {
    let requirements = unsafe { ctx.device().get_buffer_memory_requirements(buffer) };
    let memory_type_index = find_memory_type(
        ctx.memory_properties(),
        requirements.memory_type_bits,
        memory_flags,
    )
    .ok_or(VulkanError::NoSuitableMemoryType {
        type_bits: requirements.memory_type_bits,
        flags: memory_flags,
    })?;

    let info = vk::MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type_index);
    let memory = unsafe { ctx.device().allocate_memory(&info, None) }.map_err(|source| {
        VulkanError::OutOfDeviceMemory {
            size: requirements.size,
            source,
        }
    })?;

    if let Err(source) = unsafe { ctx.device().bind_buffer_memory(buffer, memory, 0) } {
        unsafe { ctx.device().free_memory(memory, None) };
        return Err(VulkanError::MemoryBindFailed(source));
    }
    Ok(memory)
}

fn find_memory_type(
    properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    flags: vk::MemoryPropertyFlags,
) -> Option<u32> {
    (0..properties.memory_type_count).find(|&index| {
        type_bits & (1 << index) != 0
            && properties.memory_types[index as usize]
                .property_flags
                .contains(flags)
    })
}
