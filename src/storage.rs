use ash::vk;

/// Storage classification for a tensor's buffers.
///
/// * [`StorageMode::Device`] pairs a device-local primary buffer with a
///   host-visible staging buffer. Data crosses the host/device boundary
///   through recorded staging copies.
/// * [`StorageMode::Host`] uses a single host-visible buffer that is both the
///   compute target and the transfer source/destination.
/// * [`StorageMode::Storage`] is device-local scratch for shader storage
///   only; it can never act as a copy source or destination and exposes no
///   host mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StorageMode {
    #[default]
    Device,
    Host,
    Storage,
}

impl StorageMode {
    /// Usage flags for the primary buffer.
    pub fn primary_usage_flags(&self) -> vk::BufferUsageFlags {
        match self {
            StorageMode::Device | StorageMode::Host => {
                vk::BufferUsageFlags::STORAGE_BUFFER
                    | vk::BufferUsageFlags::TRANSFER_SRC
                    | vk::BufferUsageFlags::TRANSFER_DST
            }
            StorageMode::Storage => vk::BufferUsageFlags::STORAGE_BUFFER,
        }
    }

    /// Memory property flags for the primary allocation.
    pub fn primary_memory_flags(&self) -> vk::MemoryPropertyFlags {
        match self {
            StorageMode::Device | StorageMode::Storage => vk::MemoryPropertyFlags::DEVICE_LOCAL,
            StorageMode::Host => {
                vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT
            }
        }
    }

    /// Usage flags for the staging buffer, for modes that carry one.
    pub fn staging_usage_flags(&self) -> Option<vk::BufferUsageFlags> {
        match self {
            StorageMode::Device => {
                Some(vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST)
            }
            StorageMode::Host | StorageMode::Storage => None,
        }
    }

    /// Memory property flags for the staging allocation, for modes that carry one.
    pub fn staging_memory_flags(&self) -> Option<vk::MemoryPropertyFlags> {
        match self {
            StorageMode::Device => {
                Some(vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT)
            }
            StorageMode::Host | StorageMode::Storage => None,
        }
    }

    /// Whether this mode pairs the primary buffer with a staging buffer.
    #[inline]
    pub fn has_staging(&self) -> bool {
        matches!(self, StorageMode::Device)
    }

    /// Whether the primary allocation itself is host-visible.
    #[inline]
    pub fn is_host_visible(&self) -> bool {
        matches!(self, StorageMode::Host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_mode_pairs_staging_with_primary() {
        let mode = StorageMode::Device;
        assert!(mode.has_staging());
        assert_eq!(
            mode.staging_usage_flags(),
            Some(vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST)
        );
        assert_eq!(
            mode.staging_memory_flags(),
            Some(vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT)
        );
        assert!(mode
            .primary_memory_flags()
            .contains(vk::MemoryPropertyFlags::DEVICE_LOCAL));
    }

    #[test]
    fn host_mode_is_mappable_and_unstaged() {
        let mode = StorageMode::Host;
        assert!(!mode.has_staging());
        assert!(mode.is_host_visible());
        assert_eq!(mode.staging_usage_flags(), None);
        assert_eq!(mode.staging_memory_flags(), None);
        assert!(mode
            .primary_memory_flags()
            .contains(vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT));
        assert!(mode
            .primary_usage_flags()
            .contains(vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST));
    }

    #[test]
    fn storage_mode_excludes_transfer_usage() {
        let usage = StorageMode::Storage.primary_usage_flags();
        assert!(usage.contains(vk::BufferUsageFlags::STORAGE_BUFFER));
        assert!(!usage.contains(vk::BufferUsageFlags::TRANSFER_SRC));
        assert!(!usage.contains(vk::BufferUsageFlags::TRANSFER_DST));
        assert!(!StorageMode::Storage.has_staging());
        assert!(!StorageMode::Storage.is_host_visible());
    }

    #[test]
    fn default_mode_is_device() {
        assert_eq!(StorageMode::default(), StorageMode::Device);
    }
}
