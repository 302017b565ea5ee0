//! Read-only bus resource inspection (C10): decode, summarize, slice,
//! diff, and export a pipeline run's shared memory without touching
//! execution state.

mod decode;
mod error;
mod stats;

pub use decode::decode_elements;
pub use error::InspectorError;
pub use stats::{histogram, statistics, Histogram, HistogramBin, Statistics};

use livecalc_memory::SharedRegion;
use livecalc_validator::{BusResourceDescriptor, ElementType};
use std::path::Path;

/// Threshold below which two values are considered equal by [`compare`].
pub const COMPARE_EPSILON: f64 = 1e-3;

/// A point-in-time read of one bus resource, carrying enough metadata to
/// stand on its own in an export or a diff report.
#[derive(Debug, Clone)]
pub struct ResourceSnapshot {
    pub name: String,
    pub data: Vec<f64>,
    pub size_bytes: u64,
    pub element_type: ElementType,
    pub element_count: u64,
    pub checksum: Option<String>,
    pub timestamp: Option<String>,
}

impl ResourceSnapshot {
    pub fn capture(region: &SharedRegion, descriptor: &BusResourceDescriptor) -> Result<Self, InspectorError> {
        let bytes = region.resource_slice(&descriptor.name)?;
        let data = decode_elements(bytes, descriptor.element_type);
        Ok(ResourceSnapshot {
            name: descriptor.name.clone(),
            data,
            size_bytes: descriptor.size_bytes,
            element_type: descriptor.element_type,
            element_count: descriptor.element_count,
            checksum: None,
            timestamp: None,
        })
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }
}

/// Decode a resource's entire current payload to `f64`.
pub fn get_resource(region: &SharedRegion, descriptor: &BusResourceDescriptor) -> Result<Vec<f64>, InspectorError> {
    let bytes = region.resource_slice(&descriptor.name)?;
    Ok(decode_elements(bytes, descriptor.element_type))
}

/// A contiguous sub-range of a resource's decoded values.
pub fn slice(values: &[f64], start: usize, len: usize, resource: &str) -> Result<&[f64], InspectorError> {
    let end = start
        .checked_add(len)
        .filter(|&end| end <= values.len())
        .ok_or_else(|| InspectorError::SliceOutOfBounds {
            resource: resource.to_string(),
            start,
            len,
            element_count: values.len(),
        })?;
    Ok(&values[start..end])
}

/// Summary of an element-wise comparison between two decodes of the same
/// resource, e.g. across two runs or before/after a parameter change.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareSummary {
    /// Indices where `|a - b| > COMPARE_EPSILON`.
    pub diff_indices: Vec<usize>,
    pub max_abs_diff: f64,
    pub mean_abs_diff: f64,
    /// Percentage (0..=100) of compared elements that differ beyond the epsilon.
    pub diff_percentage: f64,
}

/// Element-wise delta between two equal-shaped decodes. Shorter of the two
/// lengths wins; elements past that point are not considered.
pub fn compare(before: &[f64], after: &[f64]) -> CompareSummary {
    let n = before.len().min(after.len());
    if n == 0 {
        return CompareSummary { diff_indices: Vec::new(), max_abs_diff: 0.0, mean_abs_diff: 0.0, diff_percentage: 0.0 };
    }

    let mut diff_indices = Vec::new();
    let mut max_abs_diff = 0.0f64;
    let mut sum_abs_diff = 0.0f64;
    for i in 0..n {
        let abs_diff = (after[i] - before[i]).abs();
        sum_abs_diff += abs_diff;
        if abs_diff > max_abs_diff {
            max_abs_diff = abs_diff;
        }
        if abs_diff > COMPARE_EPSILON {
            diff_indices.push(i);
        }
    }

    CompareSummary {
        diff_percentage: diff_indices.len() as f64 / n as f64 * 100.0,
        mean_abs_diff: sum_abs_diff / n as f64,
        max_abs_diff,
        diff_indices,
    }
}

/// Write one or more resource snapshots to a CSV file: a `#`-prefixed
/// comment header per resource carrying its metadata, then one data column
/// per resource, rows padded with empty cells where lengths differ.
pub fn export_csv(path: &Path, snapshots: &[ResourceSnapshot]) -> Result<(), InspectorError> {
    use std::io::Write;

    let mut file = std::fs::File::create(path)?;
    for snapshot in snapshots {
        writeln!(file, "# resource: {}", snapshot.name)?;
        writeln!(file, "# element_count: {}", snapshot.element_count)?;
        writeln!(file, "# element_type: {:?}", snapshot.element_type)?;
        writeln!(file, "# size_bytes: {}", snapshot.size_bytes)?;
        if let Some(checksum) = &snapshot.checksum {
            writeln!(file, "# checksum: {checksum:0>8}")?;
        }
        if let Some(timestamp) = &snapshot.timestamp {
            writeln!(file, "# timestamp: {timestamp}")?;
        }
    }
    file.flush()?;

    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(snapshots.iter().map(|s| s.name.as_str()))?;

    let max_len = snapshots.iter().map(|s| s.data.len()).max().unwrap_or(0);
    for row in 0..max_len {
        let record: Vec<String> =
            snapshots.iter().map(|s| s.data.get(row).map(|v| v.to_string()).unwrap_or_default()).collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use livecalc_memory::SharedRegion;
    use livecalc_validator::ElementType;

    fn descriptor(name: &str, element_count: u64) -> BusResourceDescriptor {
        BusResourceDescriptor {
            name: name.to_string(),
            element_type: ElementType::F64,
            element_count,
            size_bytes: element_count * 8,
            producer: "p".to_string(),
            consumers: vec![],
        }
    }

    #[test]
    fn reads_resource_as_f64_values() {
        let descriptors = vec![descriptor("prices", 2)];
        let mut region = SharedRegion::allocate(1, &descriptors, false);
        let bytes: Vec<u8> = [1.5f64, 2.5f64].iter().flat_map(|v| v.to_le_bytes()).collect();
        region.resource_slice_mut("prices").unwrap().copy_from_slice(&bytes);
        let values = get_resource(&region, &descriptors[0]).unwrap();
        assert_eq!(values, vec![1.5, 2.5]);
    }

    #[test]
    fn snapshot_captures_metadata_alongside_values() {
        let descriptors = vec![descriptor("prices", 2)];
        let mut region = SharedRegion::allocate(1, &descriptors, false);
        let bytes: Vec<u8> = [1.5f64, 2.5f64].iter().flat_map(|v| v.to_le_bytes()).collect();
        region.resource_slice_mut("prices").unwrap().copy_from_slice(&bytes);
        let snapshot = ResourceSnapshot::capture(&region, &descriptors[0]).unwrap();
        assert_eq!(snapshot.data, vec![1.5, 2.5]);
        assert_eq!(snapshot.element_count, 2);
    }

    #[test]
    fn slice_rejects_out_of_bounds_ranges() {
        let values = vec![1.0, 2.0, 3.0];
        assert!(slice(&values, 1, 5, "r").is_err());
        assert_eq!(slice(&values, 1, 2, "r").unwrap(), &[2.0, 3.0]);
    }

    #[test]
    fn compare_flags_diffs_past_epsilon_only() {
        let summary = compare(&[1.0, 2.0, 3.0], &[1.0, 2.0005, 3.5]);
        assert_eq!(summary.diff_indices, vec![2]);
        assert!((summary.max_abs_diff - 0.5).abs() < 1e-9);
        assert!((summary.diff_percentage - (100.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn export_csv_writes_comment_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let snapshot = ResourceSnapshot {
            name: "a".to_string(),
            data: vec![1.0, 2.0],
            size_bytes: 16,
            element_type: ElementType::F64,
            element_count: 2,
            checksum: Some("abcd1234".to_string()),
            timestamp: None,
        };
        export_csv(&path, &[snapshot]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("# resource: a\n"));
        assert!(content.contains("checksum: abcd1234\n"));
        assert!(content.contains("a\n1\n2\n"));
    }
}
