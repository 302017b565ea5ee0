//! `livecalc export-csv`: decode a persisted run snapshot and write it out
//! as a CSV, one column per bus resource.

use std::path::Path;

use livecalc_orchestrator::BreakpointController;
use livecalc_validator::BusResourceDescriptor;

use crate::exit_code;

pub struct ExportCsvArgs<'a> {
    pub run_id: &'a str,
    pub breakpoint_db_path: &'a Path,
    pub snapshot_dir: &'a Path,
    pub output_path: &'a Path,
    /// Only export these resources; empty means every resource in the
    /// persisted metadata sidecar.
    pub resources: Vec<String>,
}

pub fn run(args: ExportCsvArgs) -> i32 {
    match run_inner(args) {
        Ok(()) => exit_code::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_code::RUNTIME_ERROR
        }
    }
}

fn run_inner(args: ExportCsvArgs) -> anyhow::Result<()> {
    let metadata_path = args.snapshot_dir.join(format!("{}.meta.json", args.run_id));
    let metadata_text = std::fs::read_to_string(&metadata_path)
        .map_err(|e| anyhow::anyhow!("reading snapshot metadata {metadata_path:?}: {e}"))?;
    let descriptors: Vec<BusResourceDescriptor> = serde_json::from_str(&metadata_text)?;

    let wanted: Vec<&BusResourceDescriptor> = if args.resources.is_empty() {
        descriptors.iter().collect()
    } else {
        descriptors.iter().filter(|d| args.resources.contains(&d.name)).collect()
    };

    let controller = BreakpointController::open(args.breakpoint_db_path, &[])?;
    let mut snapshots = Vec::with_capacity(wanted.len());
    for descriptor in wanted {
        let bytes = controller
            .load_snapshot(args.run_id, &descriptor.name)?
            .ok_or_else(|| anyhow::anyhow!("no persisted snapshot for resource {:?} in run {:?}", descriptor.name, args.run_id))?;
        let checksum = format!("{:08x}", livecalc_integrity::crc32(&bytes));
        let data = livecalc_inspector::decode_elements(&bytes, descriptor.element_type);
        snapshots.push(
            livecalc_inspector::ResourceSnapshot {
                name: descriptor.name.clone(),
                data,
                size_bytes: descriptor.size_bytes,
                element_type: descriptor.element_type,
                element_count: descriptor.element_count,
                checksum: None,
                timestamp: None,
            }
            .with_checksum(checksum),
        );
    }

    livecalc_inspector::export_csv(args.output_path, &snapshots)?;
    println!("wrote {} column(s) to {:?}", snapshots.len(), args.output_path);
    Ok(())
}
