//! Bus resource and package integrity checking.

mod checksum;
mod error;
mod report;

pub use checksum::{crc32, diff_offset, sha256_file, sha256_hex};
pub use error::IntegrityError;
pub use report::{IntegrityCheckResult, IntegrityReport};

use livecalc_memory::SharedRegion;

/// Write a resource's checksum and an incremented write-epoch into its
/// integrity trailer. Called by the orchestrator at the producer's
/// `RUNNING -> DONE` transition. Returns `(checksum, epoch)`.
pub fn seal_resource(region: &SharedRegion, name: &str) -> Result<(u32, u32), IntegrityError> {
    let checksum = crc32(region.resource_slice(name)?);
    let prev_epoch = region.integrity_trailer(name)?.map(|(_, epoch)| epoch).unwrap_or(0);
    let epoch = prev_epoch.wrapping_add(1);
    region.set_integrity_trailer(name, checksum, epoch)?;
    Ok((checksum, epoch))
}

/// Recompute a resource's CRC-32 and compare it against its sealed
/// trailer, as the orchestrator does at a consumer's `IDLE -> READY`
/// transition. `seal_snapshot`, if given, is the byte-for-byte payload
/// captured when the resource was last sealed, used to locate the first
/// diverging byte on mismatch.
///
/// Returns `Err(NoTrailer)` if the resource was never sealed (integrity
/// checks disabled for the run, or the producer hasn't run yet).
pub fn check_resource(
    region: &SharedRegion,
    name: &str,
    culprit: &str,
    consumer: &str,
    seal_snapshot: Option<&[u8]>,
) -> Result<IntegrityCheckResult, IntegrityError> {
    let current = region.resource_slice(name)?;
    let actual = crc32(current);
    let (expected, _epoch) = region
        .integrity_trailer(name)?
        .ok_or_else(|| IntegrityError::NoTrailer(name.to_string()))?;
    let valid = expected == actual;
    let diff_offset = if valid { None } else { seal_snapshot.and_then(|snapshot| diff_offset(snapshot, current)) };
    Ok(IntegrityCheckResult {
        bus_resource: name.to_string(),
        expected,
        actual,
        valid,
        culprit: culprit.to_string(),
        consumer: consumer.to_string(),
        diff_offset,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecalc_validator::{BusResourceDescriptor, ElementType};

    fn resource(name: &str, size_bytes: u64, producer: &str, consumers: &[&str]) -> BusResourceDescriptor {
        BusResourceDescriptor {
            name: name.to_string(),
            element_type: ElementType::F64,
            element_count: size_bytes / 8,
            size_bytes,
            producer: producer.to_string(),
            consumers: consumers.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn seal_then_check_matches() {
        let resources = vec![resource("x", 32, "A", &["B"])];
        let region = SharedRegion::allocate(2, &resources, true);
        region.resource_slice_mut("x").unwrap().copy_from_slice(&[1u8; 32]);
        let (checksum, epoch) = seal_resource(&region, "x").unwrap();
        assert_eq!(epoch, 1);
        let snapshot = region.resource_slice("x").unwrap().to_vec();
        let result = check_resource(&region, "x", "A", "B", Some(&snapshot)).unwrap();
        assert!(result.valid);
        assert_eq!(result.actual, checksum);
        assert_eq!(result.diff_offset, None);
    }

    #[test]
    fn check_detects_post_seal_mutation_with_diff_offset() {
        let resources = vec![resource("x", 32, "A", &["B"])];
        let region = SharedRegion::allocate(2, &resources, true);
        region.resource_slice_mut("x").unwrap().copy_from_slice(&[1u8; 32]);
        seal_resource(&region, "x").unwrap();
        let snapshot = region.resource_slice("x").unwrap().to_vec();

        region.resource_slice_mut("x").unwrap()[16] = 99;

        let result = check_resource(&region, "x", "A", "B", Some(&snapshot)).unwrap();
        assert!(!result.valid);
        assert_eq!(result.culprit, "A");
        assert_eq!(result.consumer, "B");
        assert_eq!(result.diff_offset, Some(16));
    }

    #[test]
    fn unsealed_resource_has_no_trailer() {
        let resources = vec![resource("x", 16, "A", &[])];
        let region = SharedRegion::allocate(1, &resources, true);
        assert!(matches!(check_resource(&region, "x", "A", "B", None), Err(IntegrityError::NoTrailer(_))));
    }
}
