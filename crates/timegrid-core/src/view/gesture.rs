//! Pointer gestures over the grid.
//!
//! A small state machine turning pointer events into intents. It performs
//! no mutations itself: hosts hand every intent to the operation queue and
//! their own UI flows.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

use crate::layout::MINUTES_PER_DAY;
use crate::view::SegmentSource;

/// Span of the quick-create intent from a context press on empty space.
pub const QUICK_CREATE_MINUTES: u32 = 30;

/// Intent produced by a completed gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureIntent {
    /// Create an entry over the selected span on the selected calendar.
    Create {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        calendar_id: Option<String>,
    },
    /// Open the action menu (edit / delete) for an existing item.
    Menu { target: SegmentSource },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Drag {
    day: NaiveDate,
    anchor_minute: u32,
    current_minute: u32,
}

/// Translates pointer events into [`GestureIntent`]s.
///
/// Minutes snap to `snap_minutes` increments: a press floors to the
/// increment it falls in, the moving edge rounds to the nearest boundary.
/// A released drag spanning less than one increment is a cancelled gesture
/// and yields nothing.
#[derive(Debug, Clone)]
pub struct GestureTracker {
    snap_minutes: u32,
    default_calendar_id: Option<String>,
    drag: Option<Drag>,
}

impl GestureTracker {
    pub fn new(snap_minutes: u32, default_calendar_id: Option<String>) -> Self {
        GestureTracker {
            snap_minutes: snap_minutes.max(1),
            default_calendar_id,
            drag: None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    fn floor_snap(&self, minute: u32) -> u32 {
        minute.min(MINUTES_PER_DAY - 1) / self.snap_minutes * self.snap_minutes
    }

    fn round_snap(&self, minute: u32) -> u32 {
        let snapped = (minute + self.snap_minutes / 2) / self.snap_minutes * self.snap_minutes;
        snapped.min(MINUTES_PER_DAY)
    }

    /// Begin a drag on empty grid space.
    pub fn pointer_down(&mut self, day: NaiveDate, minute: u32) {
        let anchor = self.floor_snap(minute);
        self.drag = Some(Drag {
            day,
            anchor_minute: anchor,
            current_minute: anchor,
        });
    }

    /// Extend the tentative edge of an active drag. Ignored while no drag
    /// is in progress.
    pub fn pointer_move(&mut self, minute: u32) {
        let snapped = self.round_snap(minute);
        if let Some(drag) = &mut self.drag {
            drag.current_minute = snapped;
        }
    }

    /// Finish the drag, yielding a create intent when the snapped span
    /// covers at least one increment.
    pub fn pointer_up(&mut self) -> Option<GestureIntent> {
        let drag = self.drag.take()?;
        let from = drag.anchor_minute.min(drag.current_minute);
        let to = drag.anchor_minute.max(drag.current_minute);
        if to - from < self.snap_minutes {
            return None;
        }
        Some(GestureIntent::Create {
            start: instant(drag.day, from),
            end: instant(drag.day, to),
            calendar_id: self.default_calendar_id.clone(),
        })
    }

    /// Abandon an active drag (pointer left the grid, Escape).
    pub fn cancel(&mut self) {
        self.drag = None;
    }

    /// Context press (right-click or long-press). On an existing item this
    /// yields its action menu; on empty space, a quick-create intent for a
    /// 30-minute entry at the snapped position.
    pub fn context_press(
        &self,
        day: NaiveDate,
        minute: u32,
        target: Option<&SegmentSource>,
    ) -> GestureIntent {
        match target {
            Some(source) => GestureIntent::Menu {
                target: source.clone(),
            },
            None => {
                let from = self.floor_snap(minute);
                let to = (from + QUICK_CREATE_MINUTES).min(MINUTES_PER_DAY);
                GestureIntent::Create {
                    start: instant(day, from),
                    end: instant(day, to),
                    calendar_id: self.default_calendar_id.clone(),
                }
            }
        }
    }
}

fn instant(day: NaiveDate, minute: u32) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc() + Duration::minutes(i64::from(minute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 3, hour, minute, 0).unwrap()
    }

    #[test]
    fn drag_snaps_both_edges() {
        let mut tracker = GestureTracker::new(15, None);
        tracker.pointer_down(day(), 547);
        tracker.pointer_move(583);

        let intent = tracker.pointer_up().unwrap();
        assert_eq!(
            intent,
            GestureIntent::Create {
                start: at(9, 0),
                end: at(9, 45),
                calendar_id: None,
            }
        );
        assert!(!tracker.is_dragging());
    }

    #[test]
    fn click_in_place_yields_nothing() {
        let mut tracker = GestureTracker::new(15, None);
        tracker.pointer_down(day(), 547);
        assert!(tracker.pointer_up().is_none());
    }

    #[test]
    fn sub_increment_drag_is_cancelled() {
        let mut tracker = GestureTracker::new(15, None);
        tracker.pointer_down(day(), 540);
        tracker.pointer_move(546);
        assert!(tracker.pointer_up().is_none());
    }

    #[test]
    fn upward_drag_swaps_the_edges() {
        let mut tracker = GestureTracker::new(15, None);
        tracker.pointer_down(day(), 600);
        tracker.pointer_move(500);

        let intent = tracker.pointer_up().unwrap();
        assert_eq!(
            intent,
            GestureIntent::Create {
                start: at(8, 15),
                end: at(10, 0),
                calendar_id: None,
            }
        );
    }

    #[test]
    fn drag_carries_the_default_calendar() {
        let mut tracker = GestureTracker::new(15, Some("calendar-work".to_string()));
        tracker.pointer_down(day(), 540);
        tracker.pointer_move(600);

        match tracker.pointer_up().unwrap() {
            GestureIntent::Create { calendar_id, .. } => {
                assert_eq!(calendar_id.as_deref(), Some("calendar-work"));
            }
            other => panic!("unexpected intent {other:?}"),
        }
    }

    #[test]
    fn cancel_discards_the_drag() {
        let mut tracker = GestureTracker::new(15, None);
        tracker.pointer_down(day(), 540);
        tracker.pointer_move(630);
        tracker.cancel();
        assert!(tracker.pointer_up().is_none());
    }

    #[test]
    fn move_without_drag_is_ignored() {
        let mut tracker = GestureTracker::new(15, None);
        tracker.pointer_move(630);
        assert!(tracker.pointer_up().is_none());
    }

    #[test]
    fn context_press_on_item_opens_its_menu() {
        let tracker = GestureTracker::new(15, None);
        let source = SegmentSource::Entry {
            entry_id: "entry-1".to_string(),
        };

        let intent = tracker.context_press(day(), 547, Some(&source));
        assert_eq!(intent, GestureIntent::Menu { target: source });
    }

    #[test]
    fn context_press_on_empty_space_quick_creates() {
        let tracker = GestureTracker::new(15, None);

        let intent = tracker.context_press(day(), 547, None);
        assert_eq!(
            intent,
            GestureIntent::Create {
                start: at(9, 0),
                end: at(9, 30),
                calendar_id: None,
            }
        );
    }

    #[test]
    fn quick_create_clamps_to_midnight() {
        let tracker = GestureTracker::new(15, None);

        let intent = tracker.context_press(day(), 1430, None);
        match intent {
            GestureIntent::Create { start, end, .. } => {
                assert_eq!(start, at(23, 45));
                assert_eq!(
                    end,
                    Utc.with_ymd_and_hms(2024, 1, 4, 0, 0, 0).unwrap()
                );
            }
            other => panic!("unexpected intent {other:?}"),
        }
    }
}
