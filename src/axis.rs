use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use plotters::coord::ranged1d::{KeyPointHint, NoDefaultFormatting, Ranged, ValueFormatter};
use std::ops::Range;

pub const DATE_LABEL_FORMAT: &str = "%Y-%m-%d";

/// Time coordinate for the shared x axis of the figure:
/// bold key points (grid lines and labels) sit on Mondays at midnight,
/// light key points on every midnight.
/// When the range holds more Mondays than the max number of labels,
/// every k-th Monday is kept instead.
#[derive(Clone, Debug)]
pub struct MondayDateRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl MondayDateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> MondayDateRange {
        MondayDateRange { start, end }
    }

    /// all Mondays 00:00:00 within the range
    pub fn mondays(&self) -> Vec<NaiveDateTime> {
        let first_day = first_midnight_on_or_after(self.start);
        let to_monday = (7 - first_day.weekday().num_days_from_monday()) % 7;
        let first_monday = first_day + Duration::days(i64::from(to_monday));
        self.walk(first_monday.and_time(NaiveTime::MIN), Duration::weeks(1))
    }

    /// all midnights within the range
    pub fn days(&self) -> Vec<NaiveDateTime> {
        let first_day = first_midnight_on_or_after(self.start);
        self.walk(first_day.and_time(NaiveTime::MIN), Duration::days(1))
    }

    fn walk(&self, from: NaiveDateTime, step: Duration) -> Vec<NaiveDateTime> {
        let mut points = Vec::new();
        let mut dt = from;
        while dt <= self.end {
            points.push(dt);
            dt += step;
        }
        points
    }
}

fn first_midnight_on_or_after(t: NaiveDateTime) -> NaiveDate {
    if t.time() == NaiveTime::MIN {
        t.date()
    } else {
        t.date() + Duration::days(1)
    }
}

fn thin_to(points: Vec<NaiveDateTime>, max_points: usize) -> Vec<NaiveDateTime> {
    if max_points == 0 || points.len() <= max_points {
        return points;
    }
    let step = (points.len() + max_points - 1) / max_points;
    points.into_iter().step_by(step).collect()
}

impl Ranged for MondayDateRange {
    type FormatOption = NoDefaultFormatting;
    type ValueType = NaiveDateTime;

    fn map(&self, value: &NaiveDateTime, limit: (i32, i32)) -> i32 {
        let total = (self.end - self.start).num_seconds();
        if total == 0 {
            return limit.0;
        }
        let offset = (*value - self.start).num_seconds();
        limit.0 + (f64::from(limit.1 - limit.0) * offset as f64 / total as f64) as i32
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<NaiveDateTime> {
        let points = if hint.weight().allow_light_points() {
            self.days()
        } else {
            self.mondays()
        };
        thin_to(points, hint.max_num_points())
    }

    fn range(&self) -> Range<NaiveDateTime> {
        self.start..self.end
    }
}

impl ValueFormatter<NaiveDateTime> for MondayDateRange {
    fn format(value: &NaiveDateTime) -> String {
        value.format(DATE_LABEL_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotters::coord::ranged1d::{BoldPoints, LightPoints};

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn mondays_fall_on_mondays_at_midnight() {
        // 2021-06-02 is a Wednesday
        let range = MondayDateRange::new(dt(2021, 6, 2, 10, 0, 0), dt(2021, 6, 30, 10, 0, 0));
        let mondays = range.mondays();
        assert_eq!(
            mondays,
            vec![
                dt(2021, 6, 7, 0, 0, 0),
                dt(2021, 6, 14, 0, 0, 0),
                dt(2021, 6, 21, 0, 0, 0),
                dt(2021, 6, 28, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn a_monday_range_start_is_kept() {
        // 2021-06-07 is a Monday
        let range = MondayDateRange::new(dt(2021, 6, 7, 0, 0, 0), dt(2021, 6, 15, 0, 0, 0));
        assert_eq!(
            range.mondays(),
            vec![dt(2021, 6, 7, 0, 0, 0), dt(2021, 6, 14, 0, 0, 0)]
        );
    }

    #[test]
    fn days_are_the_midnights_inside_the_range() {
        let range = MondayDateRange::new(dt(2021, 6, 1, 12, 0, 0), dt(2021, 6, 4, 12, 0, 0));
        assert_eq!(
            range.days(),
            vec![
                dt(2021, 6, 2, 0, 0, 0),
                dt(2021, 6, 3, 0, 0, 0),
                dt(2021, 6, 4, 0, 0, 0),
            ]
        );
    }

    #[test]
    fn sub_day_range_has_no_key_points() {
        let range = MondayDateRange::new(dt(2021, 6, 1, 8, 0, 0), dt(2021, 6, 1, 20, 0, 0));
        assert!(range.mondays().is_empty());
        assert!(range.days().is_empty());
    }

    #[test]
    fn bold_key_points_respect_the_label_limit() {
        // half a year of Mondays, limit of 10
        let range = MondayDateRange::new(dt(2021, 1, 1, 0, 0, 0), dt(2021, 7, 1, 0, 0, 0));
        let all = range.mondays();
        assert!(all.len() > 10);
        let thinned = range.key_points(BoldPoints(10));
        assert!(thinned.len() <= 10);
        for p in thinned.iter() {
            assert!(all.contains(p));
        }
    }

    #[test]
    fn light_key_points_are_days() {
        let range = MondayDateRange::new(dt(2021, 6, 1, 0, 0, 0), dt(2021, 6, 8, 0, 0, 0));
        let light = range.key_points(LightPoints::new(2, 100));
        assert_eq!(light, range.days());
    }

    #[test]
    fn map_spans_the_pixel_limits() {
        let start = dt(2021, 6, 1, 0, 0, 0);
        let end = dt(2021, 6, 11, 0, 0, 0);
        let range = MondayDateRange::new(start, end);
        assert_eq!(range.map(&start, (0, 1000)), 0);
        assert_eq!(range.map(&end, (0, 1000)), 1000);
        assert_eq!(range.map(&dt(2021, 6, 6, 0, 0, 0), (0, 1000)), 500);
    }

    #[test]
    fn labels_are_iso_dates() {
        assert_eq!(
            MondayDateRange::format(&dt(2021, 6, 7, 0, 0, 0)),
            "2021-06-07"
        );
    }
}
