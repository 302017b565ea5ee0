//! The shared memory region backing a single pipeline run.
//!
//! Backed by a `Vec<u128>` rather than `Vec<u8>` purely to get a
//! 16-byte-aligned allocation from the global allocator without hand-rolling
//! `alloc`/`dealloc` pairing. The backing store sits behind an `UnsafeCell`
//! so that, once a run's resource graph is validated, concurrently
//! executing nodes can borrow their own disjoint resource slabs directly —
//! no mutex, no intermediate copy — the same way the orchestrator hands out
//! per-node atomic status cells. This is sound only because every resource
//! has exactly one producer and distinct resources occupy disjoint,
//! non-overlapping byte ranges fixed once at construction; callers that
//! request overlapping ranges concurrently (the same resource from two
//! threads) are on their own.

use crate::error::MemoryError;
use crate::layout::{compute_layout, MemoryLayout};
use livecalc_validator::BusResourceDescriptor;
use std::cell::UnsafeCell;
use std::collections::HashSet;

pub struct SharedRegion {
    layout: MemoryLayout,
    backing: UnsafeCell<Vec<u128>>,
}

// SAFETY: `resource_slice`/`resource_slice_mut`/`resource_views` only ever
// hand out references into the byte range of a single named resource or
// trailer, and those ranges are disjoint across distinct names by
// construction (`compute_layout`). The backing `Vec` is never resized after
// `allocate`, so no method here invalidates a pointer or slice another
// thread is holding. The one invariant this type cannot check itself is
// that two threads don't request the *same* resource's mutable view at
// once; the orchestrator upholds that by scheduling same-level nodes (the
// only nodes that run concurrently) with disjoint producer sets.
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    /// Allocate a region sized for `node_count` nodes and the given
    /// resource catalog, zero-initialized.
    pub fn allocate(node_count: usize, resources: &[BusResourceDescriptor], enable_integrity: bool) -> Self {
        let layout = compute_layout(node_count, resources, enable_integrity);
        let words = (layout.total_size as usize + 15) / 16;
        Self {
            layout,
            backing: UnsafeCell::new(vec![0u128; words]),
        }
    }

    pub fn layout(&self) -> &MemoryLayout {
        &self.layout
    }

    pub fn total_size(&self) -> u64 {
        self.layout.total_size
    }

    fn byte_ptr(&self) -> *mut u8 {
        self.backing.get() as *mut u8
    }

    fn byte_len(&self) -> usize {
        // SAFETY: reads only the `Vec`'s length, which never changes after
        // `allocate` (the backing store is never pushed to or resized).
        unsafe { (*self.backing.get()).len() * 16 }
    }

    fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.byte_ptr(), self.byte_len()) }
    }

    fn resource_range(&self, name: &str) -> Result<(usize, usize), MemoryError> {
        let slot = self.layout.resource(name).ok_or_else(|| MemoryError::UnknownResource(name.to_string()))?;
        let start = slot.offset as usize;
        Ok((start, start + slot.size_bytes as usize))
    }

    /// Immutable view of a bus resource's payload slab.
    pub fn resource_slice(&self, name: &str) -> Result<&[u8], MemoryError> {
        let (start, end) = self.resource_range(name)?;
        Ok(&self.as_bytes()[start..end])
    }

    /// Mutable view of a bus resource's payload slab.
    pub fn resource_slice_mut(&self, name: &str) -> Result<&mut [u8], MemoryError> {
        let (start, end) = self.resource_range(name)?;
        // SAFETY: see the impl block's `Sync` justification.
        Ok(unsafe { std::slice::from_raw_parts_mut(self.byte_ptr().add(start), end - start) })
    }

    /// Borrow several resources' slabs at once: immutable views for
    /// `input_names`, mutable views for `output_names`. This is the
    /// zero-copy handoff path the orchestrator uses to hand a node's
    /// engine adapter direct read/write access into the shared region
    /// instead of staging bytes through a heap buffer. Fails if a name
    /// appears in both lists, or more than once in `output_names` — either
    /// would alias a `&mut` with another live borrow.
    pub fn resource_views<'a>(
        &'a self,
        input_names: &[&str],
        output_names: &[&str],
    ) -> Result<(Vec<&'a [u8]>, Vec<&'a mut [u8]>), MemoryError> {
        let mut seen_outputs = HashSet::with_capacity(output_names.len());
        for name in output_names {
            if input_names.contains(name) || !seen_outputs.insert(*name) {
                return Err(MemoryError::AliasedResourceAccess(name.to_string()));
            }
        }
        let inputs = input_names.iter().map(|name| self.resource_slice(name)).collect::<Result<Vec<_>, _>>()?;
        let outputs = output_names.iter().map(|name| self.resource_slice_mut(name)).collect::<Result<Vec<_>, _>>()?;
        Ok((inputs, outputs))
    }

    /// Read the 16-byte integrity trailer for a resource, if integrity
    /// checks were enabled for this region: `(checksum, write_epoch)`. The
    /// trailing 8 reserved bytes are not exposed.
    pub fn integrity_trailer(&self, name: &str) -> Result<Option<(u32, u32)>, MemoryError> {
        let slot = self
            .layout
            .resource(name)
            .ok_or_else(|| MemoryError::UnknownResource(name.to_string()))?;
        Ok(slot.integrity_trailer_offset.map(|offset| {
            let start = offset as usize;
            let bytes = self.as_bytes();
            let checksum = u32::from_le_bytes(bytes[start..start + 4].try_into().unwrap());
            let epoch = u32::from_le_bytes(bytes[start + 4..start + 8].try_into().unwrap());
            (checksum, epoch)
        }))
    }

    /// Write the checksum and write-epoch into a resource's integrity
    /// trailer. The reserved 8 bytes are left zeroed.
    pub fn set_integrity_trailer(&self, name: &str, checksum: u32, epoch: u32) -> Result<(), MemoryError> {
        let slot = self
            .layout
            .resource(name)
            .cloned()
            .ok_or_else(|| MemoryError::UnknownResource(name.to_string()))?;
        let offset = slot
            .integrity_trailer_offset
            .ok_or_else(|| MemoryError::UnknownResource(name.to_string()))?;
        let start = offset as usize;
        // SAFETY: see the impl block's `Sync` justification; a resource's
        // trailer is written only by its own producer, once, at handoff.
        let bytes = unsafe { std::slice::from_raw_parts_mut(self.byte_ptr().add(start), 16) };
        bytes[0..4].copy_from_slice(&checksum.to_le_bytes());
        bytes[4..8].copy_from_slice(&epoch.to_le_bytes());
        bytes[8..16].fill(0);
        Ok(())
    }

    /// Zero every resource slab, leaving the header and status table intact.
    /// Used between runs when `zero_memory_between_runs` is set, always
    /// from the single coordinator thread before any node starts.
    pub fn zero_resources(&self) {
        for slot in &self.layout.resources {
            let start = slot.offset as usize;
            let end = start + slot.size_bytes as usize;
            let bytes = unsafe { std::slice::from_raw_parts_mut(self.byte_ptr().add(start), end - start) };
            bytes.fill(0);
        }
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
    fn resource_slices_round_trip_writes() {
        let region = SharedRegion::allocate(1, &[resource("a", 32)], false);
        region.resource_slice_mut("a").unwrap().copy_from_slice(&[7u8; 32]);
        assert_eq!(region.resource_slice("a").unwrap(), &[7u8; 32][..]);
    }

    #[test]
    fn unknown_resource_errors() {
        let region = SharedRegion::allocate(1, &[], false);
        assert!(region.resource_slice("nope").is_err());
    }

    #[test]
    fn integrity_trailer_round_trips() {
        let region = SharedRegion::allocate(1, &[resource("a", 16)], true);
        region.set_integrity_trailer("a", 0xdead_beef, 1).unwrap();
        assert_eq!(region.integrity_trailer("a").unwrap(), Some((0xdead_beef, 1)));
    }

    #[test]
    fn integrity_trailer_precedes_slab_and_does_not_clobber_payload() {
        let region = SharedRegion::allocate(1, &[resource("a", 16)], true);
        region.resource_slice_mut("a").unwrap().copy_from_slice(&[0x42u8; 16]);
        region.set_integrity_trailer("a", 0x1234_5678, 7).unwrap();
        assert_eq!(region.resource_slice("a").unwrap(), &[0x42u8; 16][..]);
        assert_eq!(region.integrity_trailer("a").unwrap(), Some((0x1234_5678, 7)));
    }

    #[test]
    fn zero_resources_clears_payload_only() {
        let region = SharedRegion::allocate(1, &[resource("a", 16)], false);
        region.resource_slice_mut("a").unwrap().fill(0xff);
        region.zero_resources();
        assert_eq!(region.resource_slice("a").unwrap(), &[0u8; 16][..]);
    }

    #[test]
    fn resource_views_splits_disjoint_input_and_output_slabs() {
        let resources = vec![resource("a", 16), resource("b", 16)];
        let region = SharedRegion::allocate(1, &resources, false);
        region.resource_slice_mut("a").unwrap().copy_from_slice(&[1u8; 16]);
        let (inputs, mut outputs) = region.resource_views(&["a"], &["b"]).unwrap();
        assert_eq!(inputs[0], &[1u8; 16][..]);
        outputs[0].copy_from_slice(&[2u8; 16]);
        assert_eq!(region.resource_slice("b").unwrap(), &[2u8; 16][..]);
    }

    #[test]
    fn resource_views_rejects_name_in_both_lists() {
        let region = SharedRegion::allocate(1, &[resource("a", 16)], false);
        assert!(matches!(region.resource_views(&["a"], &["a"]), Err(MemoryError::AliasedResourceAccess(_))));
    }
}
