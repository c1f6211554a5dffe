//! Overlap layout engine for the day/week grid.
//!
//! Turns a day's time-ranged items into column assignments so that
//! overlapping items render side by side and non-overlapping items reuse
//! columns. Works in two passes over a stable sort:
//!
//! - partition into clusters: a new cluster opens when an item starts at or
//!   after the latest end seen so far, so a cluster is a maximal run of
//!   transitively-overlapping items
//! - within a cluster, greedy interval partitioning: each item takes the
//!   leftmost column that has ended by the item's start, or opens a new one
//!
//! Every item in a cluster shares the cluster's final column count, which
//! equals the cluster's maximum number of simultaneously-active items.
//!
//! Pure functions throughout. Callers clamp items to the visible day and
//! drop anything with `end_minute <= start_minute` before calling in.

use serde::{Deserialize, Serialize};

/// Minutes in one display day.
pub const MINUTES_PER_DAY: u32 = 1440;

/// One item to place, offsets in minutes from midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutItem {
    pub id: String,
    pub start_minute: u32,
    pub end_minute: u32,
}

impl LayoutItem {
    pub fn new(id: impl Into<String>, start_minute: u32, end_minute: u32) -> Self {
        LayoutItem {
            id: id.into(),
            start_minute,
            end_minute,
        }
    }
}

/// A placed item: the input offsets plus its column slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionedItem {
    pub id: String,
    pub start_minute: u32,
    pub end_minute: u32,
    /// 0-based column index within the overlap cluster
    pub column: usize,
    /// Total columns used by the cluster containing this item
    pub columns: usize,
}

impl PositionedItem {
    /// Vertical offset as a fraction of the day, for percent-based hosts.
    pub fn top_fraction(&self) -> f64 {
        f64::from(self.start_minute) / f64::from(MINUTES_PER_DAY)
    }

    /// Block height as a fraction of the day.
    pub fn height_fraction(&self) -> f64 {
        f64::from(self.end_minute - self.start_minute) / f64::from(MINUTES_PER_DAY)
    }
}

/// Pixel scaling knobs for a rendered grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridMetrics {
    pub pixels_per_minute: f64,
    pub min_block_height: f64,
}

impl Default for GridMetrics {
    fn default() -> Self {
        GridMetrics {
            pixels_per_minute: 1.0,
            min_block_height: 18.0,
        }
    }
}

/// Pixel geometry for one positioned item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockGeometry {
    /// Offset from the top of the day column, in pixels
    pub top: f64,
    /// Block height in pixels, floored at `min_block_height`
    pub height: f64,
    /// Horizontal offset as a fraction of the day column width
    pub left_frac: f64,
    /// Block width as a fraction of the day column width
    pub width_frac: f64,
}

/// Assign a column and cluster column count to every item.
///
/// Items sharing a column never overlap in time. Deterministic: equal-start
/// items keep their relative input order (stable sort), so identical input
/// always produces identical output.
pub fn assign_columns(items: &[LayoutItem]) -> Vec<PositionedItem> {
    let mut sorted: Vec<&LayoutItem> = items.iter().collect();
    sorted.sort_by_key(|item| (item.start_minute, item.end_minute));

    let mut placed: Vec<PositionedItem> = Vec::with_capacity(items.len());
    // End minute of each open column in the current cluster.
    let mut column_ends: Vec<u32> = Vec::new();
    // Index into `placed` where the current cluster began.
    let mut cluster_from = 0;
    // Latest end minute seen in the current cluster.
    let mut cluster_end = 0;

    for item in sorted {
        if !column_ends.is_empty() && item.start_minute >= cluster_end {
            for done in &mut placed[cluster_from..] {
                done.columns = column_ends.len();
            }
            cluster_from = placed.len();
            column_ends.clear();
            cluster_end = 0;
        }

        let column = column_ends
            .iter()
            .position(|end| *end <= item.start_minute)
            .unwrap_or_else(|| {
                column_ends.push(item.start_minute);
                column_ends.len() - 1
            });
        column_ends[column] = item.end_minute;
        cluster_end = cluster_end.max(item.end_minute);

        placed.push(PositionedItem {
            id: item.id.clone(),
            start_minute: item.start_minute,
            end_minute: item.end_minute,
            column,
            columns: 0,
        });
    }

    for done in &mut placed[cluster_from..] {
        done.columns = column_ends.len();
    }

    placed
}

/// Derive pixel geometry for a placed item.
pub fn block_geometry(item: &PositionedItem, metrics: &GridMetrics) -> BlockGeometry {
    let minutes = f64::from(item.end_minute - item.start_minute);
    let columns = item.columns.max(1) as f64;
    BlockGeometry {
        top: f64::from(item.start_minute) * metrics.pixels_per_minute,
        height: (minutes * metrics.pixels_per_minute).max(metrics.min_block_height),
        left_frac: item.column as f64 / columns,
        width_frac: 1.0 / columns,
    }
}
