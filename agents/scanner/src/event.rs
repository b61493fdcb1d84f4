use chrono::FixedOffset;

use crate::window::{TimeOfDay, ValidityWindow};

/// `23:30` -> `11:30 PM`, `00:30` -> `12:30 AM`
pub fn to_twelve_hour(time: TimeOfDay) -> String {
    let hour = match time.hour() {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    let suffix = if time.hour() >= 12 { "PM" } else { "AM" };
    format!("{}:{:02} {}", hour, time.minute(), suffix)
}

/// Short event date for the scan screen banner, e.g. `6/3/24 at 6:00 PM - 11:00 PM`.
pub fn display_event_date(date: &ValidityWindow, offset: FixedOffset) -> String {
    let day = date.start_date.with_timezone(&offset).format("%-m/%-d/%y").to_string();

    let Some(start) = date.start_time else {
        return day;
    };
    let mut time = to_twelve_hour(start);
    if let Some(end) = date.end_time {
        time.push_str(&format!(" - {}", to_twelve_hour(end)));
    }
    format!("{day} at {time}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn converts_24_to_12_hour() {
        assert_eq!(to_twelve_hour(TimeOfDay::new(23, 30).unwrap()), "11:30 PM");
        assert_eq!(to_twelve_hour(TimeOfDay::new(0, 30).unwrap()), "12:30 AM");
        assert_eq!(to_twelve_hour(TimeOfDay::new(12, 5).unwrap()), "12:05 PM");
        assert_eq!(to_twelve_hour(TimeOfDay::new(9, 0).unwrap()), "9:00 AM");
    }

    #[test]
    fn event_date_with_and_without_times() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let mut date = ValidityWindow {
            start_date: Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap(),
            start_time: None,
            end_date: None,
            end_time: TimeOfDay::new(23, 0),
        };
        assert_eq!(display_event_date(&date, utc), "6/3/24");

        date.start_time = TimeOfDay::new(18, 0);
        assert_eq!(display_event_date(&date, utc), "6/3/24 at 6:00 PM - 11:00 PM");
    }
}
