use ash::vk;

use crate::error::{GfxError, GfxResult};

/// 在 memory type 表中线性查找第一个满足条件的 memory type
///
/// - `type_bits`：来自 `vk::MemoryRequirements::memory_type_bits`，第 i 位为 1 表示可以使用第 i 个 memory type
/// - `properties`：需要同时具备的属性，例如 `HOST_VISIBLE | HOST_COHERENT`
///
/// 同一份 memory properties 下结果是确定的
pub fn find_memory_type_index(
    memory_props: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    properties: vk::MemoryPropertyFlags,
) -> GfxResult<u32> {
    let count = memory_props.memory_type_count.min(vk::MAX_MEMORY_TYPES as u32);
    (0..count)
        .find(|&idx| {
            type_bits & (1 << idx) != 0 && memory_props.memory_types[idx as usize].property_flags.contains(properties)
        })
        .ok_or(GfxError::NoSuitableMemoryType { type_bits, properties })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_props(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (idx, flags) in types.iter().enumerate() {
            props.memory_types[idx] = vk::MemoryType {
                property_flags: *flags,
                heap_index: 0,
            };
        }
        props
    }

    #[test]
    fn test_first_matching_type() {
        let props = memory_props(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        ]);

        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        assert_eq!(find_memory_type_index(&props, 0b1111, host).unwrap(), 2);
        // 多次调用结果稳定
        assert_eq!(find_memory_type_index(&props, 0b1111, host).unwrap(), 2);
        // 第 2 位被排除之后选择第 3 个
        assert_eq!(find_memory_type_index(&props, 0b1011, host).unwrap(), 3);
        assert_eq!(find_memory_type_index(&props, 0b1111, vk::MemoryPropertyFlags::DEVICE_LOCAL).unwrap(), 0);
    }

    #[test]
    fn test_no_suitable_memory_type() {
        let props = memory_props(&[vk::MemoryPropertyFlags::DEVICE_LOCAL, vk::MemoryPropertyFlags::HOST_VISIBLE]);

        let err = find_memory_type_index(&props, 0b01, vk::MemoryPropertyFlags::HOST_VISIBLE).unwrap_err();
        assert!(matches!(err, GfxError::NoSuitableMemoryType { type_bits: 0b01, .. }));

        // type bits 超出 memory_type_count 的部分会被忽略
        let err = find_memory_type_index(&props, 0b100, vk::MemoryPropertyFlags::empty()).unwrap_err();
        assert!(matches!(err, GfxError::NoSuitableMemoryType { .. }));
    }
}
