//! Calendar view composition.
//!
//! Merges stored entries (with recurrence expanded) and external feed
//! events into per-day lists of positioned segments ready to render.
//! Composition is pure: it reads records, applies the visibility
//! selection, splits spans at midnight, and delegates column assignment
//! to the layout engine. Nothing here mutates data; gesture intents are
//! routed by hosts through the operation queue.

pub mod gesture;

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::layout::{self, BlockGeometry, GridMetrics, LayoutItem};
use crate::model::{ExternalEvent, TimeEntry};
use crate::recurrence;
use crate::storage::CalendarsConfig;

/// Recompute cadence for the now indicator. Hosts rerun [`now_marker`] on
/// this interval and cancel the periodic timer on teardown.
pub const NOW_MARKER_INTERVAL: std::time::Duration = std::time::Duration::from_secs(60);

/// Grid granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Day,
    /// Monday through Friday of the anchor's week.
    WorkWeek,
    /// Seven days starting on the Monday of the anchor's week.
    Week,
}

/// A rendered span of days: a granularity plus an anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewRange {
    kind: ViewKind,
    anchor: NaiveDate,
}

impl ViewRange {
    pub fn new(kind: ViewKind, anchor: NaiveDate) -> Self {
        ViewRange { kind, anchor }
    }

    pub fn day(anchor: NaiveDate) -> Self {
        Self::new(ViewKind::Day, anchor)
    }

    pub fn work_week(anchor: NaiveDate) -> Self {
        Self::new(ViewKind::WorkWeek, anchor)
    }

    pub fn week(anchor: NaiveDate) -> Self {
        Self::new(ViewKind::Week, anchor)
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    fn first_day(&self) -> NaiveDate {
        match self.kind {
            ViewKind::Day => self.anchor,
            ViewKind::WorkWeek | ViewKind::Week => {
                self.anchor - Days::new(u64::from(self.anchor.weekday().num_days_from_monday()))
            }
        }
    }

    fn day_count(&self) -> usize {
        match self.kind {
            ViewKind::Day => 1,
            ViewKind::WorkWeek => 5,
            ViewKind::Week => 7,
        }
    }

    /// The range's days in display order.
    pub fn days(&self) -> Vec<NaiveDate> {
        let first = self.first_day();
        (0..self.day_count())
            .map(|i| first + Days::new(i as u64))
            .collect()
    }

    /// Half-open UTC window covering the whole range.
    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.first_day().and_time(NaiveTime::MIN).and_utc();
        (start, start + Duration::days(self.day_count() as i64))
    }
}

/// Which calendars and feeds are visible.
///
/// Items with no calendar association are always shown and never consulted
/// here; the two sets are independent toggles for associated items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalendarSelection {
    pub calendars: HashSet<String>,
    pub feeds: HashSet<String>,
}

impl CalendarSelection {
    pub fn from_config(config: &CalendarsConfig) -> Self {
        CalendarSelection {
            calendars: config.enabled.clone(),
            feeds: config.enabled_feeds.clone(),
        }
    }

    pub fn shows_calendar(&self, calendar_id: Option<&str>) -> bool {
        calendar_id.map_or(true, |id| self.calendars.contains(id))
    }

    pub fn shows_feed(&self, feed_id: Option<&str>) -> bool {
        feed_id.map_or(true, |id| self.feeds.contains(id))
    }
}

/// What a positioned segment was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentSource {
    /// Expanded occurrence of a stored entry.
    Entry { entry_id: String },
    /// Read-only event from a subscribed feed.
    External { event_id: String },
}

/// One positioned block within a single day column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub source: SegmentSource,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Original unclipped start; labels show this even on a midnight-split
    /// segment.
    pub span_start: DateTime<Utc>,
    /// Original unclipped end.
    pub span_end: DateTime<Utc>,
    /// Offset from this day's midnight, clipped to `[0, 1440]`.
    pub start_minute: u32,
    pub end_minute: u32,
    /// 0-based column within the overlap cluster
    pub column: usize,
    /// Total columns in the overlap cluster
    pub columns: usize,
    pub geometry: BlockGeometry,
}

/// One day column of the composed grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub segments: Vec<Segment>,
}

/// Position of the current-time indicator within a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NowMarker {
    pub day_index: usize,
    pub minute: u32,
}

/// Where to draw the now indicator, if `now` falls inside the range.
pub fn now_marker(range: ViewRange, now: DateTime<Utc>) -> Option<NowMarker> {
    let date = now.date_naive();
    let day_index = range.days().iter().position(|day| *day == date)?;
    let midnight = date.and_time(NaiveTime::MIN).and_utc();
    Some(NowMarker {
        day_index,
        minute: (now - midnight).num_minutes() as u32,
    })
}

/// A visible span before day-splitting.
struct Span {
    source: SegmentSource,
    title: String,
    color: Option<String>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Compose the grid for a range.
///
/// Recurring entries are expanded over the range window, visibility
/// filters are applied, spans are split at midnight into per-day clipped
/// segments, and each day's segments get their overlap columns and pixel
/// geometry assigned.
pub fn compose(
    entries: &[TimeEntry],
    events: &[ExternalEvent],
    selection: &CalendarSelection,
    range: ViewRange,
    metrics: &GridMetrics,
) -> Vec<DayView> {
    let (window_start, window_end) = range.window();

    let mut spans: Vec<Span> = Vec::new();
    for entry in entries {
        if !selection.shows_calendar(entry.calendar_id.as_deref()) {
            continue;
        }
        for occ in recurrence::expand_entry(entry, window_start, window_end) {
            if occ.end <= occ.start {
                continue;
            }
            spans.push(Span {
                source: SegmentSource::Entry {
                    entry_id: occ.entry_id,
                },
                title: entry.description.clone(),
                color: None,
                start: occ.start,
                end: occ.end,
            });
        }
    }
    for event in events {
        if !selection.shows_feed(event.feed_id.as_deref()) {
            continue;
        }
        if event.end <= event.start || event.start >= window_end || event.end <= window_start {
            continue;
        }
        spans.push(Span {
            source: SegmentSource::External {
                event_id: event.id.clone(),
            },
            title: event.title.clone(),
            color: event.color.clone(),
            start: event.start,
            end: event.end,
        });
    }

    range
        .days()
        .iter()
        .map(|day| DayView {
            date: *day,
            segments: day_segments(*day, &spans, metrics),
        })
        .collect()
}

/// Clip spans to one day, assign columns, and build the segments.
fn day_segments(day: NaiveDate, spans: &[Span], metrics: &GridMetrics) -> Vec<Segment> {
    let day_start = day.and_time(NaiveTime::MIN).and_utc();
    let day_end = day_start + Duration::days(1);

    let mut items: Vec<LayoutItem> = Vec::new();
    for (index, span) in spans.iter().enumerate() {
        let clip_start = span.start.max(day_start);
        let clip_end = span.end.min(day_end);
        if clip_end <= clip_start {
            continue;
        }
        // Starts floor to the minute, ends round up, so sub-minute spans
        // still occupy a visible slot.
        let start_minute = ((clip_start - day_start).num_seconds() / 60) as u32;
        let end_minute = (((clip_end - day_start).num_seconds() + 59) / 60) as u32;
        items.push(LayoutItem::new(index.to_string(), start_minute, end_minute));
    }

    layout::assign_columns(&items)
        .into_iter()
        .filter_map(|placed| {
            let span = placed.id.parse::<usize>().ok().and_then(|i| spans.get(i))?;
            let geometry = layout::block_geometry(&placed, metrics);
            Some(Segment {
                source: span.source.clone(),
                title: span.title.clone(),
                color: span.color.clone(),
                span_start: span.start,
                span_end: span.end,
                start_minute: placed.start_minute,
                end_minute: placed.end_minute,
                column: placed.column,
                columns: placed.columns,
                geometry,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry_range(description: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> TimeEntry {
        TimeEntry::from_range(description, start, end).unwrap()
    }

    fn event(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> ExternalEvent {
        ExternalEvent {
            id: id.to_string(),
            start,
            end,
            title: format!("event {id}"),
            url: None,
            location: None,
            color: None,
            feed_id: None,
        }
    }

    #[test]
    fn range_days_per_kind() {
        // 2024-01-03 is a Wednesday.
        let anchor = date(2024, 1, 3);

        assert_eq!(ViewRange::day(anchor).days(), vec![anchor]);

        let work_week = ViewRange::work_week(anchor).days();
        assert_eq!(work_week.first().copied(), Some(date(2024, 1, 1)));
        assert_eq!(work_week.last().copied(), Some(date(2024, 1, 5)));
        assert_eq!(work_week.len(), 5);

        let week = ViewRange::week(anchor).days();
        assert_eq!(week.len(), 7);
        assert_eq!(week.last().copied(), Some(date(2024, 1, 7)));
    }

    #[test]
    fn window_is_half_open_over_the_days() {
        let range = ViewRange::day(date(2024, 1, 3));
        let (start, end) = range.window();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap());
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn single_entry_day_view() {
        let start = Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 3, 10, 30, 0).unwrap();
        let entry = entry_range("planning", start, end);
        assert_eq!(entry.duration, 5400);

        let days = compose(
            std::slice::from_ref(&entry),
            &[],
            &CalendarSelection::default(),
            ViewRange::day(date(2024, 1, 3)),
            &GridMetrics::default(),
        );

        assert_eq!(days.len(), 1);
        let segment = &days[0].segments[0];
        assert_eq!((segment.column, segment.columns), (0, 1));
        assert_eq!((segment.start_minute, segment.end_minute), (540, 630));
        assert_eq!(segment.geometry.top, 540.0);
        assert_eq!(segment.geometry.height, 90.0);
        let top_frac = f64::from(segment.start_minute) / 1440.0;
        let height_frac = f64::from(segment.end_minute - segment.start_minute) / 1440.0;
        assert!((top_frac - 540.0 / 1440.0).abs() < 1e-9);
        assert!((height_frac - 90.0 / 1440.0).abs() < 1e-9);
    }

    #[test]
    fn midnight_crossing_span_splits_per_day() {
        let start = Utc.with_ymd_and_hms(2024, 1, 3, 22, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 4, 1, 0, 0).unwrap();
        let entry = entry_range("night shift", start, end);

        let days = compose(
            std::slice::from_ref(&entry),
            &[],
            &CalendarSelection::default(),
            ViewRange::week(date(2024, 1, 3)),
            &GridMetrics::default(),
        );

        let wednesday = &days[2];
        let thursday = &days[3];
        assert_eq!(wednesday.date, date(2024, 1, 3));

        let first = &wednesday.segments[0];
        assert_eq!((first.start_minute, first.end_minute), (1320, 1440));
        let second = &thursday.segments[0];
        assert_eq!((second.start_minute, second.end_minute), (0, 60));

        // Both halves still label the original unclipped span.
        for segment in [first, second] {
            assert_eq!(segment.span_start, start);
            assert_eq!(segment.span_end, end);
        }
    }

    #[test]
    fn selection_filters_associated_items_only() {
        let start = Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();

        let bare = entry_range("no calendar", start, end);
        let mut on_enabled = entry_range("on enabled", start, end);
        on_enabled.calendar_id = Some("calendar-on".to_string());
        let mut on_disabled = entry_range("on disabled", start, end);
        on_disabled.calendar_id = Some("calendar-off".to_string());

        let mut shown_event = event("event-1", start, end);
        shown_event.feed_id = Some("feed-on".to_string());
        let mut hidden_event = event("event-2", start, end);
        hidden_event.feed_id = Some("feed-off".to_string());

        let mut selection = CalendarSelection::default();
        selection.calendars.insert("calendar-on".to_string());
        selection.feeds.insert("feed-on".to_string());

        let days = compose(
            &[bare, on_enabled, on_disabled],
            &[shown_event, hidden_event],
            &selection,
            ViewRange::day(date(2024, 1, 3)),
            &GridMetrics::default(),
        );

        let titles: Vec<&str> = days[0]
            .segments
            .iter()
            .map(|s| s.title.as_str())
            .collect();
        assert!(titles.contains(&"no calendar"));
        assert!(titles.contains(&"on enabled"));
        assert!(titles.contains(&"event event-1"));
        assert!(!titles.contains(&"on disabled"));
        assert!(!titles.contains(&"event event-2"));
    }

    #[test]
    fn entries_and_events_share_overlap_columns() {
        let start = Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 0).unwrap();
        let entry = entry_range("call", start, start + Duration::minutes(90));
        let external = event("standup", start + Duration::minutes(30), start + Duration::minutes(120));

        let days = compose(
            std::slice::from_ref(&entry),
            std::slice::from_ref(&external),
            &CalendarSelection::default(),
            ViewRange::day(date(2024, 1, 3)),
            &GridMetrics::default(),
        );

        let segments = &days[0].segments;
        assert_eq!(segments.len(), 2);
        for segment in segments {
            assert_eq!(segment.columns, 2);
        }
        let columns: HashSet<usize> = segments.iter().map(|s| s.column).collect();
        assert_eq!(columns, HashSet::from([0, 1]));
    }

    #[test]
    fn recurring_entry_fills_the_week() {
        let mut entry = entry_range(
            "standup",
            Utc.with_ymd_and_hms(2023, 11, 6, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 11, 6, 9, 15, 0).unwrap(),
        );
        entry.recurring = true;
        entry.recurrence_rule = Some("FREQ=DAILY".to_string());

        let days = compose(
            std::slice::from_ref(&entry),
            &[],
            &CalendarSelection::default(),
            ViewRange::work_week(date(2024, 1, 3)),
            &GridMetrics::default(),
        );

        assert_eq!(days.len(), 5);
        for day in &days {
            assert_eq!(day.segments.len(), 1, "missing occurrence on {}", day.date);
            assert_eq!(day.segments[0].start_minute, 540);
        }
    }

    #[test]
    fn zero_duration_entries_produce_no_segments() {
        let entry = TimeEntry::new("empty");

        let days = compose(
            std::slice::from_ref(&entry),
            &[],
            &CalendarSelection::default(),
            ViewRange::day(entry.anchor.date_naive()),
            &GridMetrics::default(),
        );
        assert!(days[0].segments.is_empty());
    }

    #[test]
    fn now_marker_inside_and_outside_the_range() {
        let range = ViewRange::work_week(date(2024, 1, 3));

        let inside = Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap();
        assert_eq!(
            now_marker(range, inside),
            Some(NowMarker {
                day_index: 1,
                minute: 870
            })
        );

        let weekend = Utc.with_ymd_and_hms(2024, 1, 6, 9, 0, 0).unwrap();
        assert_eq!(now_marker(range, weekend), None);
    }

    #[test]
    fn sub_minute_event_still_occupies_a_slot() {
        let start = Utc.with_ymd_and_hms(2024, 1, 3, 9, 0, 20).unwrap();
        let external = event("blip", start, start + Duration::seconds(30));

        let days = compose(
            &[],
            std::slice::from_ref(&external),
            &CalendarSelection::default(),
            ViewRange::day(date(2024, 1, 3)),
            &GridMetrics::default(),
        );

        let segment = &days[0].segments[0];
        assert_eq!((segment.start_minute, segment.end_minute), (540, 541));
    }
}
