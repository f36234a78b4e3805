//! Command pool and the frame work-unit cycle.

use crate::error::Result;
use crate::sync::{reset_fence, wait_for_fence};
use ash::vk;

/// Create a command pool for the given queue family.
///
/// # Safety
/// The device must be valid and the queue family must exist.
pub unsafe fn create_command_pool(
    device: &ash::Device,
    queue_family_index: u32,
) -> Result<vk::CommandPool> {
    let create_info = vk::CommandPoolCreateInfo::default()
        .queue_family_index(queue_family_index)
        .flags(vk::CommandPoolCreateFlags::empty());

    let pool = device.create_command_pool(&create_info, None)?;
    Ok(pool)
}

/// Run one transient command buffer through the full cycle: allocate,
/// record via `record`, submit with `fence`, block until the GPU finishes,
/// free the buffer back to the pool.
///
/// The fence is reset after the wait so it can be reused by the next call.
/// There is no overlap between successive calls; the caller does not
/// proceed until the submission has completed.
///
/// # Safety
/// All handles must be valid, the fence must be unsignaled, and the pool
/// must belong to the queue's family.
pub unsafe fn submit_and_wait<F>(
    device: &ash::Device,
    queue: vk::Queue,
    pool: vk::CommandPool,
    fence: vk::Fence,
    record: F,
) -> Result<()>
where
    F: FnOnce(vk::CommandBuffer),
{
    let alloc_info = vk::CommandBufferAllocateInfo::default()
        .command_pool(pool)
        .level(vk::CommandBufferLevel::PRIMARY)
        .command_buffer_count(1);

    let command_buffer = device.allocate_command_buffers(&alloc_info)?[0];

    // From here on the buffer must go back to the pool on every path.
    let result = record_and_submit(device, queue, command_buffer, fence, record);

    device.free_command_buffers(pool, &[command_buffer]);

    result
}

unsafe fn record_and_submit<F>(
    device: &ash::Device,
    queue: vk::Queue,
    command_buffer: vk::CommandBuffer,
    fence: vk::Fence,
    record: F,
) -> Result<()>
where
    F: FnOnce(vk::CommandBuffer),
{
    let begin_info =
        vk::CommandBufferBeginInfo::default().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
    device.begin_command_buffer(command_buffer, &begin_info)?;
    record(command_buffer);
    device.end_command_buffer(command_buffer)?;

    let command_buffers = [command_buffer];
    let submit_info = vk::SubmitInfo::default().command_buffers(&command_buffers);
    device.queue_submit(queue, &[submit_info], fence)?;

    wait_for_fence(device, fence)?;
    reset_fence(device, fence)?;

    Ok(())
}
