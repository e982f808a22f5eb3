use std::sync::Arc;

use ash::vk;

/// Shared device handles that tensors allocate and record against.
///
/// Device and physical-device selection happen outside this crate; the
/// context only carries what allocation needs: the logical device and a
/// snapshot of the physical device's memory properties. Cloning is cheap and
/// every [`Tensor`](crate::Tensor) holds a clone, mirroring the shared
/// ownership the handles have on the Vulkan side.
#[derive(Clone)]
pub struct Context {
    device: Arc<ash::Device>,
    physical_device: vk::PhysicalDevice,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
}

impl Context {
    /// Build a context from externally created handles, querying the memory
    /// properties through the instance.
    pub fn new(
        instance: &ash::Instance,
        physical_device: vk::PhysicalDevice,
        device: ash::Device,
    ) -> Self {
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };
        Self {
            device: Arc::new(device),
            physical_device,
            memory_properties,
        }
    }

    /// Build a context from pre-queried memory properties, for callers that
    /// no longer hold the instance.
    pub fn from_parts(
        device: ash::Device,
        physical_device: vk::PhysicalDevice,
        memory_properties: vk::PhysicalDeviceMemoryProperties,
    ) -> Self {
        Self {
            device: Arc::new(device),
            physical_device,
            memory_properties,
        }
    }

    #[inline]
    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    #[inline]
    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }
}
