use ash::vk;

use crate::Context;

/// Minimal Vulkan bootstrap for tests: one instance, one compute-capable
/// queue, one command pool. Submission and synchronization live here because
/// the crate itself only records; tests play the external orchestrator.
///
/// [`TestGpu::try_new`] returns `None` when no Vulkan implementation or
/// device is present so device tests can skip instead of failing on machines
/// without a GPU.
/// Acquire a [`TestGpu`] or return early, marking the test as skipped.
macro_rules! require_gpu {
    () => {
        match $crate::tests::harness::TestGpu::try_new() {
            Some(gpu) => gpu,
            None => {
                eprintln!("skipping: no Vulkan device available");
                return;
            }
        }
    };
}

pub(crate) use require_gpu;

pub struct TestGpu {
    pub context: Context,
    pub queue: vk::Queue,
    pub command_pool: vk::CommandPool,
    instance: ash::Instance,
    _entry: ash::Entry,
}

impl TestGpu {
    pub fn try_new() -> Option<Self> {
        let entry = unsafe { ash::Entry::load() }.ok()?;
        let app_info = vk::ApplicationInfo::default()
            .application_name(c"vulkanic-tests")
            .api_version(vk::API_VERSION_1_1);
        let instance_info = vk::InstanceCreateInfo::default().application_info(&app_info);
        let instance = unsafe { entry.create_instance(&instance_info, None) }.ok()?;

        let physical_devices = match unsafe { instance.enumerate_physical_devices() } {
            Ok(devices) if !devices.is_empty() => devices,
            _ => {
                unsafe { instance.destroy_instance(None) };
                return None;
            }
        };
        let selected = physical_devices.into_iter().find_map(|physical_device| {
            let families =
                unsafe { instance.get_physical_device_queue_family_properties(physical_device) };
            families
                .iter()
                .position(|family| family.queue_flags.contains(vk::QueueFlags::COMPUTE))
                .map(|index| (physical_device, index as u32))
        });
        let Some((physical_device, queue_family_index)) = selected else {
            unsafe { instance.destroy_instance(None) };
            return None;
        };

        let priorities = [1.0f32];
        let queue_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(queue_family_index)
            .queue_priorities(&priorities)];
        let device_info = vk::DeviceCreateInfo::default().queue_create_infos(&queue_infos);
        let device = match unsafe { instance.create_device(physical_device, &device_info, None) } {
            Ok(device) => device,
            Err(_) => {
                unsafe { instance.destroy_instance(None) };
                return None;
            }
        };
        let queue = unsafe { device.get_device_queue(queue_family_index, 0) };

        let pool_info = vk::CommandPoolCreateInfo::default()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(queue_family_index);
        let command_pool = match unsafe { device.create_command_pool(&pool_info, None) } {
            Ok(pool) => pool,
            Err(_) => {
                unsafe {
                    device.destroy_device(None);
                    instance.destroy_instance(None);
                }
                return None;
            }
        };

        let context = Context::new(&instance, physical_device, device);
        Some(Self {
            context,
            queue,
            command_pool,
            instance,
            _entry: entry,
        })
    }

    /// Record commands through `record` into a one-shot command buffer,
    /// submit it, and block until the GPU is done.
    pub fn submit<F>(&self, record: F)
    where
        F: FnOnce(vk::CommandBuffer),
    {
        let device = self.context.device();
        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(self.command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);
        let command_buffers =
            unsafe { device.allocate_command_buffers(&alloc_info) }.expect("command buffer allocation");
        let command_buffer = command_buffers[0];

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { device.begin_command_buffer(command_buffer, &begin_info) }
            .expect("begin command buffer");
        record(command_buffer);
        unsafe { device.end_command_buffer(command_buffer) }.expect("end command buffer");

        let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
        let fence =
            unsafe { device.create_fence(&vk::FenceCreateInfo::default(), None) }.expect("fence");
        unsafe {
            device
                .queue_submit(self.queue, &[submit_info], fence)
                .expect("queue submit");
            device
                .wait_for_fences(&[fence], true, u64::MAX)
                .expect("fence wait");
            device.destroy_fence(fence, None);
            device.free_command_buffers(self.command_pool, &command_buffers);
        }
    }
}

impl Drop for TestGpu {
    fn drop(&mut self) {
        let device = self.context.device();
        unsafe {
            let _ = device.device_wait_idle();
            device.destroy_command_pool(self.command_pool, None);
            device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
