//! Typed, declarative views over GPX and TCX activity files.
//!
//! ```
//! use activity_reader::gpx::Gpx;
//!
//! let gpx = Gpx::read(r#"<gpx><trk><trkseg>
//!     <trkpt lat="45.0" lon="-122.0"><ele>10.5</ele></trkpt>
//! </trkseg></trk></gpx>"#)?;
//! let point = gpx.trackpoints()[0];
//! assert_eq!(point.lat()?, Some(45.0));
//! assert_eq!(point.hr()?, None);
//! # Ok::<(), activity_reader::ReaderError>(())
//! ```

pub mod convert;
pub mod dom;
pub mod element;
pub mod error;
pub mod gpx;
pub mod options;
pub mod source;
pub mod tcx;

pub use convert::{Conversion, Timestamp, Value};
pub use element::{ActivityElement, FromElement, Property};
pub use error::{ReaderError, Result};
pub use options::{ReadOptions, SummaryOptions};
pub use source::Source;

#[cfg(feature = "wasm")]
mod bindings {
    use wasm_bindgen::prelude::*;

    use crate::gpx::Gpx;
    use crate::options::SummaryOptions;
    use crate::tcx::Tcx;

    /// Summarize a GPX document, returned as a JS object.
    #[wasm_bindgen(js_name = gpxSummary)]
    pub fn gpx_summary(gpx_string: &str, options: JsValue) -> Result<JsValue, JsValue> {
        console_error_panic_hook::set_once();

        let opts = parse_options(options)?;
        let gpx = Gpx::from_text_with(gpx_string, &opts.read)?;
        let summary = gpx.summary()?;
        serde_wasm_bindgen::to_value(&summary).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Summarize a GPX document, returned as a JSON string.
    #[wasm_bindgen(js_name = gpxSummaryString)]
    pub fn gpx_summary_string(gpx_string: &str, options: JsValue) -> Result<String, JsValue> {
        console_error_panic_hook::set_once();

        let opts = parse_options(options)?;
        let gpx = Gpx::from_text_with(gpx_string, &opts.read)?;
        let summary = gpx.summary()?;
        serde_json::to_string(&summary).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Summarize a TCX document, returned as a JS object.
    #[wasm_bindgen(js_name = tcxSummary)]
    pub fn tcx_summary(tcx_string: &str, options: JsValue) -> Result<JsValue, JsValue> {
        console_error_panic_hook::set_once();

        let opts = parse_options(options)?;
        let tcx = Tcx::from_text_with(tcx_string, &opts.read)?;
        let summary = tcx.summary(&opts)?;
        serde_wasm_bindgen::to_value(&summary).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Summarize a TCX document, returned as a JSON string.
    #[wasm_bindgen(js_name = tcxSummaryString)]
    pub fn tcx_summary_string(tcx_string: &str, options: JsValue) -> Result<String, JsValue> {
        console_error_panic_hook::set_once();

        let opts = parse_options(options)?;
        let tcx = Tcx::from_text_with(tcx_string, &opts.read)?;
        let summary = tcx.summary(&opts)?;
        serde_json::to_string(&summary).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    fn parse_options(options: JsValue) -> Result<SummaryOptions, JsValue> {
        if options.is_undefined() || options.is_null() {
            Ok(SummaryOptions::default())
        } else {
            serde_wasm_bindgen::from_value(options).map_err(|e| JsValue::from_str(&e.to_string()))
        }
    }
}
