use chrono::prelude::*;
use csv::StringRecord;
use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

pub mod axis;
pub mod plot;

use axis::MondayDateRange;

pub const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

pub const DT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Value recorded for a reading that is absent from a row.
pub const ERROR_FLT_MISSING: f64 = -2.;

/// The known measurement columns and the default recorded when one is absent.
/// Adding a sensor to the station means adding its column name here.
pub const MEASUREMENT_FIELDS: [(&str, f64); 5] = [
    ("BMP pressure (hPa)", ERROR_FLT_MISSING),
    ("BMP temp (C)", ERROR_FLT_MISSING),
    ("DHT humidity (%)", ERROR_FLT_MISSING),
    ("DHT temp (C)", ERROR_FLT_MISSING),
    ("DS3231 temp (C)", ERROR_FLT_MISSING),
];

/// The datetime columns, combined into one timestamp per row.
pub const DATETIME_FIELDS: [&str; 6] = ["year", "month", "day", "hour", "minute", "second"];

// 10 x 15 in at 300 dpi
pub const IMG_WIDTH: u32 = 3000;
pub const IMG_HEIGHT: u32 = 4500;

#[derive(Debug, Error)]
pub enum WstationError {
    #[error("line {line}: {reason}")]
    Format { line: u64, reason: String },
    #[error("malformed csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("no measurement fields to plot")]
    NothingToPlot,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("chart rendering failed: {0}")]
    Render(String),
}

fn render_err<E: std::error::Error + Send + Sync>(e: DrawingAreaErrorKind<E>) -> WstationError {
    WstationError::Render(e.to_string())
}

/// The main struct for the sensor time series:
/// one shared timestamp column and one reading column per measurement field,
/// keyed by field name so that iteration is in field-name order.
#[derive(Debug, Clone)]
pub struct TimeReadings {
    pub time: Vec<NaiveDateTime>,
    pub readings: BTreeMap<String, Vec<f64>>,
}

impl TimeReadings {
    pub fn new(capacity: usize) -> TimeReadings {
        let time: Vec<NaiveDateTime> = Vec::with_capacity(capacity);
        let mut readings: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for (name, _) in MEASUREMENT_FIELDS.iter() {
            readings.insert((*name).to_string(), Vec::with_capacity(capacity));
        }
        let timereadings = TimeReadings { time, readings };
        timereadings
    }

    fn push_reading(&mut self, name: &str, value: f64) {
        self.readings.entry(name.to_string()).or_default().push(value);
    }

    /// Init a TimeReadings from csv.
    /// The columns are matched against the header by name,
    /// unknown columns are skipped and known reading columns that are absent
    /// from the header or blank in a row take the configured default.
    /// Datetime columns are mandatory; a row with an invalid datetime
    /// or a non-numeric reading fails the whole parse.
    pub fn from_csv(fin: PathBuf) -> Result<TimeReadings, WstationError> {
        let file = File::open(fin)?;
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);
        let headers = rdr.headers()?.clone();
        let column_of = |name: &str| headers.iter().position(|h| h == name);
        let mut dt_columns = [0usize; 6];
        for (slot, name) in dt_columns.iter_mut().zip(DATETIME_FIELDS.iter()) {
            *slot = column_of(name).ok_or_else(|| WstationError::Format {
                line: 1,
                reason: format!("missing required column '{}'", name),
            })?;
        }
        let reading_columns: Vec<Option<usize>> = MEASUREMENT_FIELDS
            .iter()
            .map(|(name, _)| column_of(name))
            .collect();
        let mut timereadings = TimeReadings::new(10000 as usize);
        for record in rdr.records() {
            let record = record?;
            let line = record.position().map_or(0, |p| p.line());
            let dt = record_datetime(&record, &dt_columns, line)?;
            timereadings.time.push(dt);
            for ((name, default), column) in MEASUREMENT_FIELDS.iter().zip(reading_columns.iter()) {
                let raw = column.and_then(|i| record.get(i)).unwrap_or("");
                let value = if raw.is_empty() {
                    *default
                } else {
                    raw.parse().map_err(|_| WstationError::Format {
                        line,
                        reason: format!("invalid value '{}' for column '{}'", raw, name),
                    })?
                };
                timereadings.push_reading(name, value);
            }
        }
        Ok(timereadings)
    }

    /// plots one subplot per reading column, stacked on a shared time axis,
    /// and writes the figure to the given raster image file
    pub fn plot_datetime(&self, fout: &Path) -> Result<(), WstationError> {
        if self.readings.is_empty() {
            return Err(WstationError::NothingToPlot);
        }
        let (xmindt, xmaxdt): (NaiveDateTime, NaiveDateTime) = match min_and_max(&self.time[..]) {
            Some(minmax) => minmax,
            None => {
                let start = NaiveDateTime::UNIX_EPOCH;
                (start, start + chrono::Duration::weeks(1))
            }
        };
        let xspan: chrono::Duration = xmaxdt - xmindt;
        let xmargin: chrono::Duration = if xspan.is_zero() {
            chrono::Duration::hours(12)
        } else {
            xspan / 20
        };
        let xmindt = xmindt - xmargin;
        let xmaxdt = xmaxdt + xmargin;
        let mut buffer = vec![0u8; (IMG_WIDTH * IMG_HEIGHT * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (IMG_WIDTH, IMG_HEIGHT))
                .into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;
            let areas = root.split_evenly((self.readings.len(), 1));
            let bottom = self.readings.len() - 1;
            for (i, ((name, values), area)) in self.readings.iter().zip(areas.iter()).enumerate() {
                let (ymin, ymax) = match min_and_max(&values[..]) {
                    Some(minmax) => minmax,
                    None => (0., 1.),
                };
                let yspan = (ymax - ymin) / 10f64;
                let (ymin, ymax) = if yspan == 0. {
                    (ymin - 1., ymax + 1.)
                } else {
                    (ymin - yspan, ymax + yspan)
                };
                let mut chart = ChartBuilder::on(area)
                    .caption(name, ("sans-serif", 48))
                    .margin(20)
                    .x_label_area_size(if i == bottom { 90 } else { 0 })
                    .y_label_area_size(140)
                    .build_cartesian_2d(MondayDateRange::new(xmindt, xmaxdt), ymin..ymax)
                    .map_err(render_err)?;
                chart
                    .configure_mesh()
                    .light_line_style(&RGBColor(230, 230, 230))
                    .bold_line_style(RGBColor(150, 150, 150).stroke_width(2))
                    .set_all_tick_mark_size(2)
                    .label_style(("sans-serif", 32))
                    .x_labels(16)
                    .y_label_formatter(&|y: &f64| format!("{:5}", y))
                    .x_desc(if i == bottom { "datetime" } else { "" })
                    .draw()
                    .map_err(render_err)?;
                chart
                    .draw_series(LineSeries::new(
                        self.time.iter().zip(values.iter()).map(|(t, v)| (*t, *v)),
                        BLUE.stroke_width(3),
                    ))
                    .map_err(render_err)?;
            }
            root.present().map_err(render_err)?;
        }
        // the file is written only once the whole figure has drawn,
        // with the encoding picked from the output extension
        image::save_buffer(fout, &buffer, IMG_WIDTH, IMG_HEIGHT, image::ColorType::Rgb8).map_err(
            |e| match e {
                image::ImageError::IoError(ioe) => WstationError::Io(ioe),
                other => WstationError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    other.to_string(),
                )),
            },
        )
    }
}

/// combines the six datetime columns of a row into one timestamp
fn record_datetime(
    record: &StringRecord,
    columns: &[usize; 6],
    line: u64,
) -> Result<NaiveDateTime, WstationError> {
    let year: i32 = parse_subfield(record, columns[0], DATETIME_FIELDS[0], line)?;
    let month: u32 = parse_subfield(record, columns[1], DATETIME_FIELDS[1], line)?;
    let day: u32 = parse_subfield(record, columns[2], DATETIME_FIELDS[2], line)?;
    let hour: u32 = parse_subfield(record, columns[3], DATETIME_FIELDS[3], line)?;
    let minute: u32 = parse_subfield(record, columns[4], DATETIME_FIELDS[4], line)?;
    let second: u32 = parse_subfield(record, columns[5], DATETIME_FIELDS[5], line)?;
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, minute, second))
        .ok_or_else(|| WstationError::Format {
            line,
            reason: format!(
                "invalid date/time {}-{:02}-{:02} {:02}:{:02}:{:02}",
                year, month, day, hour, minute, second
            ),
        })
}

fn parse_subfield<T: FromStr>(
    record: &StringRecord,
    column: usize,
    name: &str,
    line: u64,
) -> Result<T, WstationError> {
    let raw = record.get(column).unwrap_or("");
    raw.parse().map_err(|_| WstationError::Format {
        line,
        reason: format!("invalid value '{}' for column '{}'", raw, name),
    })
}

impl std::fmt::Display for TimeReadings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "datetime")?;
        for name in self.readings.keys() {
            write!(f, ",{}", name)?;
        }
        write!(f, "\n")?;
        for (i, t) in self.time.iter().enumerate() {
            write!(f, "{}", t.format(DT_FORMAT))?;
            for series in self.readings.values() {
                write!(f, ",{}", series[i])?;
            }
            write!(f, "\n")?;
        }
        Ok(())
    }
}

pub fn min_and_max<T: std::cmp::PartialOrd + Copy>(s: &[T]) -> Option<(T, T)> {
    let mut self_iter = s.iter();
    let (mut min, mut max) = match self_iter.next() {
        Some(v) => (*v, *v),
        None => return None,
    };
    for es in self_iter {
        if *es > max {
            max = *es
        }
        if *es < min {
            min = *es
        }
    }
    Some((min, max))
}
