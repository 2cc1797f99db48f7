//! GPX 1.0/1.1 files, including Garmin's TrackPointExtension.
//!
//! Schema: <https://www.topografix.com/GPX/1/1/>

use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::activity_element;
use crate::convert::Timestamp;
use crate::error::Result;
use crate::options::ReadOptions;
use crate::source::{self, Source};

activity_element! {
    /// A single recorded sample; the most granular data in the file.
    pub struct TrackPoint<'a> : "trkpt" {
        data {
            time: Timestamp = "time",
            altitude_m: f64 = "ele",
            hr: i64 = "extensions/TrackPointExtension/hr",
            cadence_rpm: i64 = "extensions/TrackPointExtension/cad",
        }
        attrs {
            lat: f64 = "lat",
            lon: f64 = "lon",
        }
    }
}

activity_element! {
    /// A planned point on a route or course.
    pub struct RoutePoint<'a> : "rtept" {
        data {
            time: Timestamp = "time",
            altitude_m: f64 = "ele",
            name: String = "name",
        }
        attrs {
            lat: f64 = "lat",
            lon: f64 = "lon",
        }
    }
}

activity_element! {
    pub struct Waypoint<'a> : "wpt" {
        data {
            name: String = "name",
            time: Timestamp = "time",
            altitude_m: f64 = "ele",
            symbol: String = "sym",
        }
        attrs {
            lat: f64 = "lat",
            lon: f64 = "lon",
        }
    }
}

activity_element! {
    /// A continuous span of logging within a track.
    pub struct Segment<'a> : "trkseg" {
        descendants {
            trackpoints: TrackPoint,
        }
    }
}

activity_element! {
    pub struct Track<'a> : "trk" {
        data {
            name: String = "name",
            activity_type: String = "type",
        }
        descendants {
            segments: Segment,
            trackpoints: TrackPoint,
        }
    }
}

activity_element! {
    pub struct Route<'a> : "rte" {
        data {
            name: String = "name",
        }
        descendants {
            routepoints: RoutePoint,
        }
    }
}

activity_element! {
    /// Root of a `.gpx` file.
    pub struct Gpx : "gpx" {
        data {
            start_time: Timestamp = "metadata/time",
            name: String = "metadata/name",
        }
        attrs {
            creator: String = "creator",
            version: String = "version",
        }
        descendants {
            tracks: Track,
            segments: Segment,
            trackpoints: TrackPoint,
            routes: Route,
            routepoints: RoutePoint,
            waypoints: Waypoint,
        }
    }
}

impl Gpx {
    pub const EXTENSION: &'static str = ".gpx";

    /// Read a GPX document from a path, a string (a path if it ends in
    /// `.gpx`, otherwise the document text), bytes, or a reader.
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

    /// Parse document text. Unlike [`Gpx::read`], a string is never
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

    pub fn num_tracks(&self) -> usize {
        self.tracks().len()
    }

    pub fn num_trackpoints(&self) -> usize {
        self.trackpoints().len()
    }

    /// Time of the first track point, for files without `metadata/time`.
    pub fn first_trackpoint_time(&self) -> Result<Option<Timestamp>> {
        match self.trackpoints().first() {
            Some(tp) => tp.time(),
            None => Ok(None),
        }
    }

    pub fn summary(&self) -> Result<GpxSummary> {
        let start_time = match self.start_time()? {
            Some(t) => Some(t),
            None => self.first_trackpoint_time()?,
        };
        Ok(GpxSummary {
            name: self.name()?,
            creator: self.creator()?,
            version: self.version()?,
            start_time: start_time.map(|t| t.to_rfc3339()),
            num_tracks: self.num_tracks(),
            num_segments: self.segments().len(),
            num_trackpoints: self.num_trackpoints(),
            num_routepoints: self.routepoints().len(),
            num_waypoints: self.waypoints().len(),
        })
    }
}

/// Header fields and element counts of a GPX file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GpxSummary {
    pub name: Option<String>,
    pub creator: Option<String>,
    pub version: Option<String>,
    pub start_time: Option<String>,
    pub num_tracks: usize,
    pub num_segments: usize,
    pub num_trackpoints: usize,
    pub num_routepoints: usize,
    pub num_waypoints: usize,
}
