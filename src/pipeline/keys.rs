//! Deterministic, job-scoped output key layout. Every output key is a pure
//! function of the job id, the source object's basename, and (for normalized
//! chunks) the part index, so re-invoking a stage with the same inputs
//! rewrites the same objects instead of accumulating new ones.

pub const NORMALIZED_EXT: &str = "json";
pub const LOADABLE_EXT: &str = "csv";
pub const REJECTED_EXT: &str = "json";

/// File name of `key` with directories and the final extension stripped.
pub fn basename(key: &str) -> &str {
    let file = key.rsplit('/').next().unwrap_or(key);
    match file.rfind('.') {
        Some(idx) if idx > 0 => &file[..idx],
        _ => file,
    }
}

/// Normalized chunk: `<prefix><job_id>/<basename>--<job_id>--part<N>.json`
pub fn isf_part_key(prefix: &str, job_id: &str, source_key: &str, part: usize) -> String {
    format!(
        "{prefix}{job_id}/{base}--{job_id}--part{part}.{NORMALIZED_EXT}",
        base = basename(source_key)
    )
}

/// Loadable artifact: `<prefix><job_id>/<basename>--<job_id>.csv`
pub fn dart_key(prefix: &str, job_id: &str, isf_key: &str) -> String {
    format!(
        "{prefix}{job_id}/{base}--{job_id}.{LOADABLE_EXT}",
        base = basename(isf_key)
    )
}

/// Rejected-records artifact: `<prefix><job_id>/<basename>--<job_id>.json`
pub fn rejected_key(prefix: &str, job_id: &str, isf_key: &str) -> String {
    format!(
        "{prefix}{job_id}/{base}--{job_id}.{REJECTED_EXT}",
        base = basename(isf_key)
    )
}
