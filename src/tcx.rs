//! Garmin Training Center (TCX v2) files.
//!
//! Activities contain laps, laps contain tracks, tracks contain
//! trackpoints. Course files carry laps and tracks with no enclosing
//! activity, so root-level collections search the whole document.

use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, TimeZone};
use chrono_tz::Tz;
use serde::Serialize;

use crate::activity_element;
use crate::convert::Timestamp;
use crate::error::{ReaderError, Result};
use crate::options::{ReadOptions, SummaryOptions};
use crate::source::{self, Source};

activity_element! {
    /// A single recorded sample; the most granular data in the file.
    pub struct Trackpoint<'a> : "Trackpoint" {
        data {
            time: Timestamp = "Time",
            lat: f64 = "Position/LatitudeDegrees",
            lon: f64 = "Position/LongitudeDegrees",
            altitude_m: f64 = "AltitudeMeters",
            distance_m: f64 = "DistanceMeters",
            hr: i64 = "HeartRateBpm/Value",
            speed_ms: f64 = "Extensions/TPX/Speed",
            cadence_rpm: i64 = "Extensions/TPX/RunCadence",
        }
    }
}

activity_element! {
    /// One bout of recording, from start or resume to pause or stop.
    pub struct Track<'a> : "Track" {
        descendants {
            trackpoints: Trackpoint,
        }
    }
}

activity_element! {
    pub struct Lap<'a> : "Lap" {
        data {
            total_time_s: f64 = "TotalTimeSeconds",
            distance_m: f64 = "DistanceMeters",
            max_speed_ms: f64 = "MaximumSpeed",
            avg_speed_ms: f64 = "Extensions/LX/AvgSpeed",
            calories: i64 = "Calories",
            hr_avg: i64 = "AverageHeartRateBpm/Value",
            hr_max: i64 = "MaximumHeartRateBpm/Value",
            cadence_avg: i64 = "Extensions/LX/AvgRunCadence",
            cadence_max: i64 = "Extensions/LX/MaxRunCadence",
            intensity: String = "Intensity",
            trigger_method: String = "TriggerMethod",
        }
        attrs {
            start_time: Timestamp = "StartTime",
        }
        descendants {
            tracks: Track,
            trackpoints: Trackpoint,
        }
    }
}

activity_element! {
    pub struct Activity<'a> : "Activity" {
        data {
            // TCX stores the activity's start time in its Id.
            start_time: Timestamp = "Id",
            device: String = "Creator/Name",
            device_id: i64 = "Creator/UnitId",
            product_id: i64 = "Creator/ProductID",
        }
        attrs {
            sport: String = "Sport",
        }
        descendants {
            laps: Lap,
            tracks: Track,
            trackpoints: Trackpoint,
        }
    }
}

activity_element! {
    /// A planned course; has laps and tracks but no recorded activity.
    pub struct Course<'a> : "Course" {
        data {
            name: String = "Name",
        }
        descendants {
            laps: Lap,
            tracks: Track,
            trackpoints: Trackpoint,
        }
    }
}

activity_element! {
    /// Root of a `.tcx` file.
    pub struct Tcx : "TrainingCenterDatabase" {
        data {
            creator: String = "Author/Name",
            part_number: String = "Author/PartNumber",
        }
        descendants {
            activities: Activity,
            courses: Course,
            laps: Lap,
            tracks: Track,
            trackpoints: Trackpoint,
        }
    }
}

impl Tcx {
    pub const EXTENSION: &'static str = ".tcx";

    /// Read a TCX document from a path, a string (a path if it ends in
    /// `.tcx`, otherwise the document text), bytes, or a reader.
    pub fn read<'s>(source: impl Into<Source<'s>>) -> Result<Self> {
        Self::read_with(source, &ReadOptions::default())
    }

    pub fn read_with<'s>(source: impl Into<Source<'s>>, options: &ReadOptions) -> Result<Self> {
        let document = source::load(source.into(), Self::EXTENSION, options)?;
        Self::from_document(document)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::read(Source::Path(path.as_ref().to_path_buf()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read(bytes)
    }

    /// Parse document text. Unlike [`Tcx::read`], a string is never
    /// treated as a path.
    pub fn from_text(text: &str) -> Result<Self> {
        Self::from_text_with(text, &ReadOptions::default())
    }

    pub fn from_text_with(text: &str, options: &ReadOptions) -> Result<Self> {
        Self::from_document(source::load_text(text, options)?)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::read(Source::reader(reader))
    }

    /// Total distance of every lap in the file. Laps without a distance
    /// are skipped.
    pub fn distance_m(&self) -> Result<f64> {
        self.lap_total("distance_m", Lap::distance_m)
    }

    /// Total calories of every lap in the file.
    pub fn calories(&self) -> Result<i64> {
        self.lap_total("calories", Lap::calories)
    }

    /// Total elapsed lap time in seconds.
    pub fn lap_time_s(&self) -> Result<f64> {
        self.lap_total("total_time_s", Lap::total_time_s)
    }

    fn lap_total<'a, T: LapTotal>(
        &'a self,
        property: &'static str,
        read: impl Fn(&Lap<'a>) -> Result<Option<T>>,
    ) -> Result<T> {
        self.laps().iter().try_fold(T::default(), |total, lap| {
            let value = read(lap)?.unwrap_or_default();
            total
                .checked_total(value)
                .ok_or(ReaderError::SumOverflow { property })
        })
    }

    pub fn num_laps(&self) -> usize {
        self.laps().len()
    }

    pub fn num_bouts(&self) -> usize {
        self.tracks().len()
    }

    pub fn num_records(&self) -> usize {
        self.trackpoints().len()
    }

    /// Start time of the first activity.
    pub fn start_time(&self) -> Result<Option<Timestamp>> {
        match self.activities().first() {
            Some(activity) => activity.start_time(),
            None => Ok(None),
        }
    }

    /// Device name of the first activity.
    pub fn device(&self) -> Result<Option<String>> {
        match self.activities().first() {
            Some(activity) => activity.device(),
            None => Ok(None),
        }
    }

    pub fn sport(&self) -> Result<Option<String>> {
        match self.activities().first() {
            Some(activity) => activity.sport(),
            None => Ok(None),
        }
    }

    /// Start date in the offset recorded in the file.
    pub fn date(&self) -> Result<Option<NaiveDate>> {
        Ok(self.start_time()?.map(|t| t.date_naive()))
    }

    /// Start date in `zone`.
    pub fn date_in<Z: TimeZone>(&self, zone: &Z) -> Result<Option<NaiveDate>> {
        Ok(self.start_time()?.map(|t| t.with_timezone(zone).date_naive()))
    }

    /// Start date in the IANA zone `zone`, e.g. `"America/Denver"`.
    pub fn local_date(&self, zone: &str) -> Result<Option<NaiveDate>> {
        self.date_in(&lookup_zone(zone)?)
    }

    pub fn summary(&self, options: &SummaryOptions) -> Result<TcxSummary> {
        let date = match options.time_zone.as_deref() {
            Some(zone) => self.local_date(zone)?,
            None => self.date()?,
        };
        Ok(TcxSummary {
            creator: self.creator()?,
            device: self.device()?,
            sport: self.sport()?,
            start_time: self.start_time()?.map(|t| t.to_rfc3339()),
            date: date.map(|d| d.format("%Y-%m-%d").to_string()),
            distance_m: self.distance_m()?,
            calories: self.calories()?,
            lap_time_s: self.lap_time_s()?,
            num_laps: self.num_laps(),
            num_bouts: self.num_bouts(),
            num_records: self.num_records(),
        })
    }
}

/// Addition that reports overflow instead of panicking or wrapping.
trait LapTotal: Copy + Default {
    fn checked_total(self, value: Self) -> Option<Self>;
}

impl LapTotal for i64 {
    fn checked_total(self, value: Self) -> Option<Self> {
        self.checked_add(value)
    }
}

impl LapTotal for f64 {
    fn checked_total(self, value: Self) -> Option<Self> {
        let total = self + value;
        // Only finite inputs can overflow; inf and NaN read from the file pass through.
        if total.is_finite() || !self.is_finite() || !value.is_finite() {
            Some(total)
        } else {
            None
        }
    }
}

fn lookup_zone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| ReaderError::UnknownTimeZone(name.to_string()))
}

/// Whole-file totals of a TCX file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TcxSummary {
    pub creator: Option<String>,
    pub device: Option<String>,
    pub sport: Option<String>,
    pub start_time: Option<String>,
    pub date: Option<String>,
    pub distance_m: f64,
    pub calories: i64,
    pub lap_time_s: f64,
    pub num_laps: usize,
    pub num_bouts: usize,
    pub num_records: usize,
}
