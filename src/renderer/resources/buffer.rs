use std::sync::{Arc, Mutex};
use ash::vk;
use color_eyre::eyre::Result;
use color_eyre::eyre::eyre;
use gpu_allocator::{
    vulkan::{Allocation, AllocationCreateDesc, AllocationScheme, Allocator},
    MemoryLocation,
};

pub struct Buffer {
    pub handle: vk::Buffer,
    pub len: u64,
    owner_family: u32,

    allocation: Option<Allocation>,
    allocator: Arc<Mutex<Allocator>>,
    device: Arc<ash::Device>,
}

impl Buffer {
    pub fn new(
        len: u64,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
        name: &str,
        owner_family: u32,
        allocator: Arc<Mutex<Allocator>>,
        device: Arc<ash::Device>,
    ) -> Result<Self> {
        let handle = {
            let info = vk::BufferCreateInfo::default()
                .size(len)
                .usage(usage)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);
            unsafe { device.create_buffer(&info, None)? }
        };
        let requirements = unsafe { device.get_buffer_memory_requirements(handle) };
        let allocation = allocator
            .lock()
            .map_err(|e| eyre!(e.to_string()))?
            .allocate(&AllocationCreateDesc {
                name,
                requirements,
                location,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })?;
        unsafe {
            device.bind_buffer_memory(handle, allocation.memory(), allocation.offset())?;
        }

        Ok(Self {
            handle,
            len,
            owner_family,

            allocation: Some(allocation),
            allocator,
            device,
        })
    }

    /// Queue family that currently owns the contents.
    pub fn owner_family(&self) -> u32 {
        self.owner_family
    }

    /// Records a completed ownership transfer. Happens exactly once in the
    /// lifetime of the compute-result buffer, after the release/acquire
    /// pair has been submitted.
    pub fn transfer_owner(&mut self, family: u32) {
        log::debug!(
            "buffer ownership moved from family {} to family {}",
            self.owner_family,
            family,
        );
        self.owner_family = family;
    }

    pub fn write<T>(
        &mut self,
        data: &[T],
        start_offset: usize,
    ) -> Result<presser::CopyRecord>
    where
        T: Copy,
    {
        let allocation = self.allocation
            .as_ref()
            .expect("Allocation does not exist");
        let mapped_ptr = allocation
            .mapped_ptr()
            .ok_or_else(|| eyre!("Cannot write to buffer that is not mapped"))?;

        let mut raw_allocation = presser::RawAllocation::from_raw_parts(
            mapped_ptr.cast(),
            allocation.size() as usize,
        );
        let mut slab = unsafe { raw_allocation.borrow_as_slab() };
        let copy_record = presser::copy_from_slice_to_offset(
            data,
            &mut slab,
            start_offset,
        )?;

        Ok(copy_record)
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        let allocation = self.allocation
            .take()
            .expect("Allocation does not exist");
        if let Ok(mut allocator) = self.allocator.lock() {
            let _ = allocator.free(allocation);
        }
        unsafe {
            self.device.destroy_buffer(self.handle, None);
        }
    }
}
