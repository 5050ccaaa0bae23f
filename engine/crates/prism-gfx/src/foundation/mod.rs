pub mod debug_messenger;
pub mod device;
pub mod instance;
pub mod mem_allocator;
pub mod memory_type;
pub mod physical_device;
