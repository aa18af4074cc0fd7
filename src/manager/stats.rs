//! Read-only aggregates over a registry snapshot.
//!
//! Pids that are not in the registry contribute nothing. Repeating a pid in
//! the request does not count its records twice.

use std::collections::HashSet;

use crate::models::record::{Pid, ProcessRecord};

fn pid_set(pids: &[Pid]) -> HashSet<Pid> {
    pids.iter().copied().collect()
}

/// `(pid, name, elapsed so far)` for every running record, in creation order.
pub fn running_elapsed(records: &[ProcessRecord], now_ms: i64) -> Vec<(Pid, &str, i64)> {
    records
        .iter()
        .filter(|record| record.running)
        .map(|record| {
            (
                record.pid,
                record.program_name.as_str(),
                (now_ms - record.timestamp).max(0),
            )
        })
        .collect()
}

pub fn total_time(records: &[ProcessRecord], pids: &[Pid]) -> i64 {
    let wanted = pid_set(pids);
    records
        .iter()
        .filter(|record| record.is_finished() && wanted.contains(&record.pid))
        .map(|record| record.timestamp)
        .sum()
}

pub fn command_count(records: &[ProcessRecord], name: &str, pids: &[Pid]) -> usize {
    let wanted = pid_set(pids);
    records
        .iter()
        .filter(|record| {
            record.is_finished() && record.program_name == name && wanted.contains(&record.pid)
        })
        .count()
}

/// Distinct program names, scanning the pids left to right and each pid's
/// records in creation order.
pub fn unique_names<'a>(records: &'a [ProcessRecord], pids: &[Pid]) -> Vec<&'a str> {
    let mut seen_pids = HashSet::new();
    let mut seen_names = HashSet::new();
    let mut names = Vec::new();

    for pid in pids {
        if !seen_pids.insert(*pid) {
            continue;
        }
        for record in records.iter().filter(|record| record.pid == *pid) {
            if seen_names.insert(record.program_name.as_str()) {
                names.push(record.program_name.as_str());
            }
        }
    }
    names
}

pub fn format_status(records: &[ProcessRecord], now_ms: i64) -> String {
    running_elapsed(records, now_ms)
        .into_iter()
        .map(|(pid, name, elapsed)| format!("{pid} {name} {elapsed}\n"))
        .collect()
}

pub fn format_total_time(records: &[ProcessRecord], pids: &[Pid]) -> String {
    format!("Total execution time is {} ms\n", total_time(records, pids))
}

pub fn format_command_count(records: &[ProcessRecord], name: &str, pids: &[Pid]) -> String {
    format!(
        "{name} was executed {} times\n",
        command_count(records, name, pids)
    )
}

pub fn format_unique_names(records: &[ProcessRecord], pids: &[Pid]) -> String {
    unique_names(records, pids)
        .into_iter()
        .map(|name| format!("{name}\n"))
        .collect()
}
