use metrics::{counter, histogram};

pub fn stage_run(stage: &'static str) {
    counter!("roster_stage_runs_total", "stage" => stage).increment(1);
}

pub fn stage_duration(stage: &'static str, seconds: f64) {
    histogram!("roster_stage_duration_seconds", "stage" => stage).record(seconds);
}

pub fn rows_normalized(count: usize) {
    counter!("roster_rows_normalized_total").increment(count as u64);
}

pub fn chunks_written(kind: &'static str, count: usize) {
    counter!("roster_chunks_written_total", "kind" => kind).increment(count as u64);
}

pub fn rows_accepted(count: usize) {
    counter!("roster_rows_accepted_total").increment(count as u64);
}

pub fn rows_rejected(count: usize) {
    counter!("roster_rows_rejected_total").increment(count as u64);
}

pub fn key_failed(stage: &'static str) {
    counter!("roster_key_failures_total", "stage" => stage).increment(1);
}
