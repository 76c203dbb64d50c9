//! Heating schedule and setpoint resolution.
//!
//! The schedule is a flat list of (days, time, room temperature) entries,
//! sequential within each day. Resolving a setpoint scans backward from the
//! current time: the most recently passed entry wins, stepping back through
//! prior days up to a full week, then a fixed fallback.

use anyhow::{bail, Result};
use chrono::{Datelike, DateTime, Local, Timelike, Weekday};

#[derive(Debug, Clone)]
pub struct ScheduleEntry {
    pub days: Vec<Weekday>,
    pub hour: u8,
    pub minute: u8,
    pub room_temp: f64,
}

impl ScheduleEntry {
    pub fn new(days: Vec<Weekday>, hour: u8, minute: u8, room_temp: f64) -> Result<ScheduleEntry> {
        if days.is_empty() {
            bail!("no days given");
        }
        if hour > 23 || minute > 59 {
            bail!("bad time {:02}:{:02}", hour, minute);
        }
        Ok(ScheduleEntry {
            days,
            hour,
            minute,
            room_temp,
        })
    }

    fn applies_on(&self, day: Weekday) -> bool {
        self.days.contains(&day)
    }

    /// Entry time has been reached at hour:minute (exact minute counts).
    fn reached(&self, hour: u8, minute: u8) -> bool {
        self.hour < hour || (self.hour == hour && self.minute <= minute)
    }
}

/// A point in the week, all the resolver needs to know about "now".
#[derive(Debug, Clone, Copy)]
pub struct DayTime {
    pub weekday: Weekday,
    pub hour: u8,
    pub minute: u8,
}

impl DayTime {
    pub fn from_local(t: DateTime<Local>) -> DayTime {
        DayTime {
            weekday: t.weekday(),
            hour: t.hour() as u8,
            minute: t.minute() as u8,
        }
    }
}

#[derive(Debug)]
pub struct SetpointResolver {
    entries: Vec<ScheduleEntry>,
    fallback: f64,
}

impl SetpointResolver {
    /// Entries must already be ordered by time-of-day within each day; the
    /// resolver relies on that and does not sort.
    pub fn new(entries: Vec<ScheduleEntry>, fallback: f64) -> Result<SetpointResolver> {
        for day in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ] {
            let mut prev: Option<(u8, u8)> = None;
            for e in entries.iter().filter(|e| e.applies_on(day)) {
                let time = (e.hour, e.minute);
                if let Some(p) = prev {
                    if time <= p {
                        bail!(
                            "schedule out of order on {:?}: {:02}:{:02} after {:02}:{:02}",
                            day,
                            e.hour,
                            e.minute,
                            p.0,
                            p.1
                        );
                    }
                }
                prev = Some(time);
            }
        }
        Ok(SetpointResolver { entries, fallback })
    }

    /// Target room temperature at `now`. Total: falls back to the configured
    /// constant when no entry matched within the past week.
    pub fn resolve(&self, now: DayTime) -> f64 {
        let mut day = now.weekday;
        let mut hour = now.hour;
        let mut minute = now.minute;
        for _ in 0..7 {
            let latest = self
                .entries
                .iter()
                .filter(|e| e.applies_on(day) && e.reached(hour, minute))
                .last();
            if let Some(e) = latest {
                return e.room_temp;
            }
            day = day.pred();
            hour = 23;
            minute = 59;
        }
        self.fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(weekday: Weekday, hour: u8, minute: u8) -> DayTime {
        DayTime {
            weekday,
            hour,
            minute,
        }
    }

    fn weekday_mornings() -> SetpointResolver {
        let entries = vec![
            ScheduleEntry::new(vec![Weekday::Mon, Weekday::Wed], 6, 0, 19.0).unwrap(),
            ScheduleEntry::new(vec![Weekday::Mon, Weekday::Wed], 9, 30, 16.0).unwrap(),
            ScheduleEntry::new(vec![Weekday::Mon, Weekday::Wed], 20, 0, 18.0).unwrap(),
        ];
        SetpointResolver::new(entries, 13.0).unwrap()
    }

    #[test]
    fn picks_most_recent_entry_of_day() {
        let r = weekday_mornings();
        assert_eq!(r.resolve(at(Weekday::Mon, 7, 15)), 19.0);
        assert_eq!(r.resolve(at(Weekday::Mon, 12, 0)), 16.0);
        assert_eq!(r.resolve(at(Weekday::Mon, 23, 59)), 18.0);
    }

    #[test]
    fn exact_minute_counts_as_reached() {
        let r = weekday_mornings();
        assert_eq!(r.resolve(at(Weekday::Mon, 9, 30)), 16.0);
        assert_eq!(r.resolve(at(Weekday::Mon, 9, 29)), 19.0);
    }

    #[test]
    fn falls_back_to_previous_days() {
        let r = weekday_mornings();
        // Tuesday has no entries; Monday evening's entry still applies.
        assert_eq!(r.resolve(at(Weekday::Tue, 12, 0)), 18.0);
        // Monday before 06:00 reaches back to Wednesday of last week.
        assert_eq!(r.resolve(at(Weekday::Mon, 5, 0)), 18.0);
    }

    #[test]
    fn fallback_when_week_has_no_match() {
        let r = SetpointResolver::new(vec![], 13.0).unwrap();
        assert_eq!(r.resolve(at(Weekday::Fri, 12, 0)), 13.0);
    }

    #[test]
    fn resolve_is_total_over_the_whole_week() {
        let r = weekday_mornings();
        for weekday in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ] {
            for hour in 0..24u8 {
                let t = r.resolve(at(weekday, hour, 0));
                assert!([19.0, 16.0, 18.0, 13.0].contains(&t));
            }
        }
    }

    #[test]
    fn rejects_out_of_order_day() {
        let entries = vec![
            ScheduleEntry::new(vec![Weekday::Sat], 10, 0, 19.0).unwrap(),
            ScheduleEntry::new(vec![Weekday::Sat], 6, 0, 18.0).unwrap(),
        ];
        assert!(SetpointResolver::new(entries, 13.0).is_err());
    }

    #[test]
    fn rejects_bad_time() {
        assert!(ScheduleEntry::new(vec![Weekday::Mon], 24, 0, 19.0).is_err());
        assert!(ScheduleEntry::new(vec![Weekday::Mon], 0, 60, 19.0).is_err());
        assert!(ScheduleEntry::new(vec![], 0, 0, 19.0).is_err());
    }
}
