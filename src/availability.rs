//! Availability generation.
//!
//! A court's opening intervals are cut into one-hour slots. Slots are never
//! stored: they are recomputed from the current configuration on every
//! request, so editing a court's hours takes effect immediately.

use crate::models::CourtHours;
use chrono::{NaiveTime, TimeDelta};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Length of a full slot
pub const SLOT_MINUTES: i64 = 60;

/// A bookable window `[start, end)` on one court and day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Slot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Slot {
    /// Label stored on bookings, e.g. `09:00-10:00`
    pub fn label(&self) -> String {
        format!("{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }

    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Restartable iterator over the slots of one interval.
///
/// Cloning it yields the same sequence again.
#[derive(Debug, Clone)]
pub struct SlotIter {
    cursor: NaiveTime,
    end: NaiveTime,
}

impl Iterator for SlotIter {
    type Item = Slot;

    fn next(&mut self) -> Option<Slot> {
        if self.cursor >= self.end {
            return None;
        }

        let (stepped, wrapped) = self
            .cursor
            .overflowing_add_signed(TimeDelta::minutes(SLOT_MINUTES));
        // Past midnight or past the closing time: truncate to the interval end
        let slot_end = if wrapped != 0 || stepped > self.end {
            self.end
        } else {
            stepped
        };

        let slot = Slot {
            start: self.cursor,
            end: slot_end,
        };
        self.cursor = slot_end;
        Some(slot)
    }
}

/// Cut `[start, end)` into contiguous one-hour slots, the last one possibly shorter.
///
/// A malformed interval (`start >= end`) yields no slots.
pub fn generate_slots(start: NaiveTime, end: NaiveTime) -> SlotIter {
    SlotIter { cursor: start, end }
}

/// Opening intervals sorted, with overlapping ones merged. Intervals that
/// only touch stay separate so their configured slot boundaries hold.
fn merge_overlapping(hours: &[CourtHours]) -> Vec<(NaiveTime, NaiveTime)> {
    let mut intervals: Vec<(NaiveTime, NaiveTime)> = hours
        .iter()
        .filter(|h| h.time_start < h.time_end)
        .map(|h| (h.time_start, h.time_end))
        .collect();
    intervals.sort();

    let mut merged: Vec<(NaiveTime, NaiveTime)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start < last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

/// All slots offered by a court for a day, ordered by start time.
///
/// No two returned slots overlap, even when the configured intervals do.
pub fn slots_for_hours(hours: &[CourtHours]) -> Vec<Slot> {
    merge_overlapping(hours)
        .into_iter()
        .flat_map(|(start, end)| generate_slots(start, end))
        .collect()
}

/// Requested labels that are already occupied, in request order
pub fn find_conflicts<'a, I>(requested: &[String], occupied: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let occupied: HashSet<&str> = occupied.into_iter().collect();
    requested
        .iter()
        .filter(|label| occupied.contains(label.as_str()))
        .cloned()
        .collect()
}
