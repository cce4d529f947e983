use chrono::NaiveTime;
use serde::Serialize;

/// Granularity of the booking grid, in minutes.
pub const SLOT_MINUTES: u32 = 30;

/// A bookable start time. `value` is the canonical 24-hour form used in
/// stored records, `label` is what a booking form shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSlot {
    pub value: String,
    pub label: String,
}

/// Ordered start times covering `[opening_hour, closing_hour)` on the slot
/// grid. Pure: the same bounds always produce the same sequence.
pub fn generate_time_slots(opening_hour: u32, closing_hour: u32) -> Vec<TimeSlot> {
    let mut slots = Vec::new();
    for hour in opening_hour..closing_hour {
        for minute in (0..60).step_by(SLOT_MINUTES as usize) {
            let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) else {
                continue;
            };
            slots.push(TimeSlot {
                value: time.format("%H:%M").to_string(),
                label: time.format("%-I:%M %p").to_string(),
            });
        }
    }
    slots
}

/// Number of slots a booking of the given duration consumes. Integer
/// division floors: a 45-minute service counts as one slot. Rounding up
/// instead would change booking capacity for every non-aligned service.
pub fn slots_for_duration(duration_minutes: i64) -> i64 {
    duration_minutes / SLOT_MINUTES as i64
}
