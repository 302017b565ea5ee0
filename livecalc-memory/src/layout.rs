//! Memory offset layout: header, per-node status table, then bus resource
//! slabs. Every region boundary is 16-byte aligned; the status
//! table is additionally cache-line aligned so CAS traffic on one node's
//! state cell never bounces a neighbor's cache line.

use livecalc_validator::BusResourceDescriptor;

pub const ALIGNMENT: u64 = 16;
pub const CACHE_LINE: u64 = 64;
pub const HEADER_SIZE: u64 = 64;
/// Integrity trailer reserved immediately before a resource slab when
/// integrity checking is enabled: `checksum: u32, epoch: u32, reserved: u64`.
pub const INTEGRITY_TRAILER_SIZE: u64 = 16;

fn align_up(n: u64, align: u64) -> u64 {
    (n + align - 1) / align * align
}

/// Placement of a single bus resource's payload (and optional checksum
/// trailer) within the shared region.
#[derive(Debug, Clone)]
pub struct ResourceSlot {
    pub name: String,
    pub offset: u64,
    pub size_bytes: u64,
    pub integrity_trailer_offset: Option<u64>,
}

/// Full offset map for a shared memory region built from a validated
/// pipeline's resource catalog.
#[derive(Debug, Clone)]
pub struct MemoryLayout {
    pub header_offset: u64,
    pub status_table_offset: u64,
    pub status_table_size: u64,
    pub node_count: usize,
    pub resources: Vec<ResourceSlot>,
    pub total_size: u64,
}

impl MemoryLayout {
    pub fn resource(&self, name: &str) -> Option<&ResourceSlot> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// Compute the offset map for `node_count` nodes and the given resource
/// catalog. `enable_integrity` reserves a 16-byte checksum+epoch trailer
/// immediately before each slab.
pub fn compute_layout(
    node_count: usize,
    resources: &[BusResourceDescriptor],
    enable_integrity: bool,
) -> MemoryLayout {
    let header_offset = 0u64;
    let status_table_offset = align_up(HEADER_SIZE, CACHE_LINE);
    // One cache line per node status cell to avoid false sharing between
    // concurrently-signaling worker threads.
    let status_table_size = node_count as u64 * CACHE_LINE;

    let mut cursor = align_up(status_table_offset + status_table_size, ALIGNMENT);
    let mut slots = Vec::with_capacity(resources.len());

    for resource in resources {
        let integrity_trailer_offset = if enable_integrity {
            let trailer_offset = cursor;
            cursor = align_up(cursor + INTEGRITY_TRAILER_SIZE, ALIGNMENT);
            Some(trailer_offset)
        } else {
            None
        };
        let offset = cursor;
        cursor = align_up(cursor + resource.size_bytes, ALIGNMENT);
        slots.push(ResourceSlot {
            name: resource.name.clone(),
            offset,
            size_bytes: resource.size_bytes,
            integrity_trailer_offset,
        });
    }

    MemoryLayout {
        header_offset,
        status_table_offset,
        status_table_size,
        node_count,
        resources: slots,
        total_size: cursor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecalc_validator::ElementType;

    fn resource(name: &str, size_bytes: u64) -> BusResourceDescriptor {
        BusResourceDescriptor {
            name: name.to_string(),
            element_type: ElementType::F64,
            element_count: size_bytes / 8,
            size_bytes,
            producer: "p".to_string(),
            consumers: vec![],
        }
    }

    #[test]
    fn layout_keeps_every_boundary_sixteen_byte_aligned() {
        let resources = vec![resource("a", 17), resource("b", 100)];
        let layout = compute_layout(3, &resources, false);
        assert_eq!(layout.status_table_offset % ALIGNMENT, 0);
        for slot in &layout.resources {
            assert_eq!(slot.offset % ALIGNMENT, 0);
        }
        assert_eq!(layout.total_size % ALIGNMENT, 0);
    }

    #[test]
    fn status_table_sized_one_cache_line_per_node() {
        let layout = compute_layout(5, &[], false);
        assert_eq!(layout.status_table_size, 5 * CACHE_LINE);
    }

    #[test]
    fn integrity_trailers_precede_each_slab_when_enabled() {
        let resources = vec![resource("a", 32)];
        let layout = compute_layout(1, &resources, true);
        let slot = &layout.resources[0];
        assert!(slot.integrity_trailer_offset.is_some());
        let trailer_offset = slot.integrity_trailer_offset.unwrap();
        assert!(trailer_offset < slot.offset);
        assert_eq!(slot.offset - trailer_offset, INTEGRITY_TRAILER_SIZE);
        assert_eq!(trailer_offset % ALIGNMENT, 0);
    }

    #[test]
    fn no_trailers_when_integrity_disabled() {
        let resources = vec![resource("a", 32)];
        let layout = compute_layout(1, &resources, false);
        assert!(layout.resources[0].integrity_trailer_offset.is_none());
    }
}
