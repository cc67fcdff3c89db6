//! Network Connectivity Checker (C6): undershoot/overshoot detection between
//! line endpoints and the nearest other line.
//!
//! Runs only when the layer's declared geometry type contains "Line". Each
//! line's endpoint search is independent read-only work, dispatched with
//! `rayon` across lines; tie-breaking within one endpoint's search stays
//! sequential over candidate lines, so results do not depend on how the
//! outer loop was scheduled.

use std::sync::atomic::{AtomicUsize, Ordering};

use geo_types::LineString;
use rayon::prelude::*;

use crate::cancel::{CancelToken, CANDIDATE_CHECK_INTERVAL};
use crate::predicates::{closest_point_on_segment, distance_point_to_segment};

const CONNECTED_TOLERANCE: f64 = 1e-3; // 1mm

/// One line extracted from the layer sweep. A `MultiLineString` contributes
/// one `LineEntry` per part, all sharing the parent fid.
#[derive(Debug, Clone)]
pub struct LineEntry {
    pub fid: i64,
    pub line: LineString<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkDefectKind {
    Undershoot,
    Overshoot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkDefect {
    pub fid: i64,
    pub kind: NetworkDefectKind,
    pub p: (f64, f64),
    pub q: (f64, f64),
}

fn endpoints(line: &LineString<f64>) -> Option<((f64, f64), (f64, f64))> {
    let first = line.0.first()?;
    let last = line.0.last()?;
    Some(((first.x, first.y), (last.x, last.y)))
}

fn nearest_point_on_line(p: (f64, f64), line: &LineString<f64>) -> Option<(f64, (f64, f64))> {
    let mut best: Option<(f64, (f64, f64))> = None;
    for (a, b) in line.coords().zip(line.coords().skip(1)) {
        let a = (a.x, a.y);
        let b = (b.x, b.y);
        let d = distance_point_to_segment(p, a, b);
        let better = match best {
            Some((bd, _)) => d < bd,
            None => true,
        };
        if better {
            let (q, _) = closest_point_on_segment(p, a, b);
            best = Some((d, q));
        }
    }
    best
}

fn coincides(a: (f64, f64), b: (f64, f64)) -> bool {
    ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt() < CONNECTED_TOLERANCE
}

/// Search every other line for the closest point to `p`, returning the
/// global minimum distance, the point achieving it, and which other line's
/// endpoint it should be compared against for the overshoot test.
fn closest_across_others(
    entries: &[LineEntry],
    self_index: usize,
    p: (f64, f64),
) -> Option<(f64, (f64, f64), usize)> {
    let mut best: Option<(f64, (f64, f64), usize)> = None;
    for (j, other) in entries.iter().enumerate() {
        if j == self_index {
            continue;
        }
        if let Some((d, q)) = nearest_point_on_line(p, &other.line) {
            let better = match best {
                Some((bd, ..)) => d < bd,
                None => true,
            };
            if better {
                best = Some((d, q, j));
            }
        }
    }
    best
}

fn classify_endpoint(
    entries: &[LineEntry],
    self_index: usize,
    fid: i64,
    p: (f64, f64),
    search_distance: f64,
) -> Option<NetworkDefect> {
    let (d, q, other_index) = closest_across_others(entries, self_index, p)?;
    if d < CONNECTED_TOLERANCE {
        return None;
    }
    if d >= search_distance {
        return None;
    }
    let (other_start, other_end) = endpoints(&entries[other_index].line)?;
    let kind = if coincides(q, other_start) || coincides(q, other_end) {
        NetworkDefectKind::Overshoot
    } else {
        NetworkDefectKind::Undershoot
    };
    Some(NetworkDefect { fid, kind, p, q })
}

/// Group entry indices by fid, preserving the order fids were first seen.
/// A `MultiLineString` contributes one `LineEntry` per part, all sharing the
/// parent fid; grouping keeps the per-feature cap in `check_network` from
/// treating those parts as separate features.
fn group_indices_by_fid(entries: &[LineEntry]) -> Vec<(i64, Vec<usize>)> {
    let mut groups: Vec<(i64, Vec<usize>)> = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        match groups.iter_mut().find(|(fid, _)| *fid == entry.fid) {
            Some((_, indices)) => indices.push(i),
            None => groups.push((entry.fid, vec![i])),
        }
    }
    groups
}

/// Run the full network check. Returns at most one defect per fid (start
/// checked before end, first part before later parts, to bound the cost per
/// feature). Cancellation is polled every `CANDIDATE_CHECK_INTERVAL` fids.
pub fn check_network(entries: &[LineEntry], search_distance: f64, cancel: &CancelToken) -> Vec<NetworkDefect> {
    if entries.len() < 2 {
        return Vec::new();
    }
    let groups = group_indices_by_fid(entries);
    let checked = AtomicUsize::new(0);
    groups
        .par_iter()
        .filter_map(|(fid, indices)| {
            let n = checked.fetch_add(1, Ordering::Relaxed);
            if n % CANDIDATE_CHECK_INTERVAL == 0 && cancel.is_cancelled() {
                return None;
            }
            indices.iter().find_map(|&i| {
                let (start, end) = endpoints(&entries[i].line)?;
                classify_endpoint(entries, i, *fid, start, search_distance)
                    .or_else(|| classify_endpoint(entries, i, *fid, end, search_distance))
            })
        })
        .collect()
}
