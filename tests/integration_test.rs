use std::io::Write;

use activity_reader::gpx::Gpx;
use activity_reader::tcx::Tcx;
use activity_reader::{ActivityElement, ReaderError, Source, convert::parse_timestamp};

fn fixture_path(path: &str) -> String {
    format!("tests/fixtures/{path}")
}

fn load_fixture(path: &str) -> String {
    std::fs::read_to_string(fixture_path(path)).unwrap()
}

// ---- sources ----

#[test]
fn test_path_bytes_and_text_build_equal_trees() {
    for (path, ext) in [("gpx/activity.gpx", "gpx"), ("tcx/activity.tcx", "tcx")] {
        let text = load_fixture(path);
        let bytes = std::fs::read(fixture_path(path)).unwrap();
        if ext == "gpx" {
            let from_path = Gpx::read(fixture_path(path)).unwrap();
            let from_bytes = Gpx::read(bytes.as_slice()).unwrap();
            let from_text = Gpx::read(text.as_str()).unwrap();
            assert_eq!(from_path.document(), from_bytes.document());
            assert_eq!(from_path.document(), from_text.document());
        } else {
            let from_path = Tcx::read(fixture_path(path)).unwrap();
            let from_bytes = Tcx::read(bytes).unwrap();
            let from_text = Tcx::from_text(&text).unwrap();
            assert_eq!(from_path.document(), from_bytes.document());
            assert_eq!(from_path.document(), from_text.document());
        }
    }
}

#[test]
fn test_reader_source() {
    let file = std::fs::File::open(fixture_path("gpx/course.gpx")).unwrap();
    let gpx = Gpx::from_reader(file).unwrap();
    assert_eq!(gpx.routepoints().len(), 3);

    let text = load_fixture("tcx/course.tcx");
    let tcx = Tcx::read(Source::reader(std::io::Cursor::new(text))).unwrap();
    assert_eq!(tcx.courses().len(), 1);
}

#[test]
fn test_string_path_with_uppercase_extension() {
    let mut file = tempfile::Builder::new().suffix(".GPX").tempfile().unwrap();
    file.write_all(load_fixture("gpx/course.gpx").as_bytes()).unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let gpx = Gpx::read(path.as_str()).unwrap();
    assert_eq!(gpx.name().unwrap().as_deref(), Some("Mesa Trail Loop"));
}

#[test]
fn test_missing_file() {
    let err = Tcx::read("tests/fixtures/tcx/does_not_exist.tcx").unwrap_err();
    assert!(matches!(err, ReaderError::Io(_)));
}

#[test]
fn test_latin1_file_is_decoded() {
    let gpx = Gpx::from_path(fixture_path("gpx/latin1.gpx")).unwrap();
    assert_eq!(gpx.creator().unwrap().as_deref(), Some("Café Tracker"));
    assert_eq!(gpx.name().unwrap().as_deref(), Some("Zürichberg Runde"));
    assert_eq!(gpx.tracks()[0].name().unwrap().as_deref(), Some("Zürichberg"));
    assert_eq!(gpx.num_trackpoints(), 2);

    let bytes = std::fs::read(fixture_path("gpx/latin1.gpx")).unwrap();
    assert_eq!(Gpx::from_bytes(&bytes).unwrap().document(), gpx.document());
}

#[test]
fn test_utf16_file_is_decoded() {
    let tcx = Tcx::read(fixture_path("tcx/utf16.tcx")).unwrap();
    assert_eq!(tcx.device().unwrap().as_deref(), Some("Edge 530 · Vélo"));
    assert_eq!(tcx.sport().unwrap().as_deref(), Some("Biking"));
    assert_eq!(tcx.distance_m().unwrap(), 4000.0);
    assert_eq!(tcx.calories().unwrap(), 95);
    assert_eq!(tcx.num_records(), 2);
}

#[test]
fn test_extra_root_element_fails() {
    let err = Gpx::read("<gpx creator='a'/><gpx creator='b'/>").unwrap_err();
    assert!(matches!(err, ReaderError::MultipleRootElements { .. }));
}

// ---- gpx ----

#[test]
fn test_gpx_activity_structure() {
    let gpx = Gpx::from_path(fixture_path("gpx/activity.gpx")).unwrap();
    assert_eq!(gpx.creator().unwrap().as_deref(), Some("Garmin Connect"));
    assert_eq!(gpx.version().unwrap().as_deref(), Some("1.1"));
    assert_eq!(
        gpx.start_time().unwrap(),
        Some(parse_timestamp("2021-02-26T19:51:08Z").unwrap())
    );

    let tracks = gpx.tracks();
    assert_eq!(tracks.len(), 1);
    assert_eq!(tracks[0].name().unwrap().as_deref(), Some("Boulder Running"));
    assert_eq!(tracks[0].activity_type().unwrap().as_deref(), Some("running"));

    let segments = tracks[0].segments();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].trackpoints().len(), 2);
    assert_eq!(segments[1].trackpoints().len(), 2);
    assert_eq!(gpx.segments().len(), 2);
    assert_eq!(gpx.trackpoints().len(), 4);
    assert_eq!(tracks[0].trackpoints().len(), 4);
}

#[test]
fn test_gpx_trackpoints_in_document_order() {
    let gpx = Gpx::from_path(fixture_path("gpx/activity.gpx")).unwrap();
    let hrs: Vec<Option<i64>> = gpx.trackpoints().iter().map(|tp| tp.hr().unwrap()).collect();
    assert_eq!(hrs, [Some(98), Some(101), Some(120), None]);

    let cads: Vec<Option<i64>> = gpx
        .trackpoints()
        .iter()
        .map(|tp| tp.cadence_rpm().unwrap())
        .collect();
    assert_eq!(cads, [Some(80), Some(82), None, None]);

    let last = *gpx.trackpoints().last().unwrap();
    assert_eq!(last.altitude_m().unwrap(), None);
    assert_eq!(last.lat().unwrap(), Some(40.0152));
    assert_eq!(gpx.num_tracks(), 1);
    assert_eq!(gpx.num_trackpoints(), 4);
}

#[test]
fn test_gpx_course_has_no_track() {
    let gpx = Gpx::from_path(fixture_path("gpx/course.gpx")).unwrap();
    assert_eq!(gpx.tracks().len(), 0);
    assert_eq!(gpx.trackpoints().len(), 0);
    assert!(!gpx.routepoints().is_empty());

    let routes = gpx.routes();
    assert_eq!(routes.len(), 1);
    let points = routes[0].routepoints();
    assert_eq!(points.len(), 3);
    assert_eq!(points[2].name().unwrap().as_deref(), Some("Junction"));
    assert_eq!(points[0].name().unwrap(), None);
    assert_eq!(points[1].altitude_m().unwrap(), Some(1765.2));

    let waypoints = gpx.waypoints();
    assert_eq!(waypoints.len(), 1);
    assert_eq!(waypoints[0].symbol().unwrap().as_deref(), Some("Flag, Blue"));
}

// ---- tcx ----

#[test]
fn test_tcx_activity_totals() {
    let tcx = Tcx::from_path(fixture_path("tcx/activity.tcx")).unwrap();
    assert_eq!(tcx.distance_m().unwrap(), 1500.0);
    assert_eq!(tcx.calories().unwrap(), 70);
    assert_eq!(tcx.lap_time_s().unwrap(), 450.5);
    assert_eq!(tcx.num_laps(), 2);
    assert_eq!(tcx.num_bouts(), 2);
    assert_eq!(tcx.num_records(), 3);
    assert_eq!(tcx.creator().unwrap().as_deref(), Some("Connect Api"));
    assert_eq!(tcx.part_number().unwrap().as_deref(), Some("006-D2449-00"));
    assert_eq!(tcx.device().unwrap().as_deref(), Some("Forerunner 235"));
}

#[test]
fn test_tcx_activity_fields() {
    let tcx = Tcx::from_path(fixture_path("tcx/activity.tcx")).unwrap();
    let activities = tcx.activities();
    assert_eq!(activities.len(), 1);

    let activity = activities[0];
    assert_eq!(activity.sport().unwrap().as_deref(), Some("Running"));
    assert_eq!(activity.device_id().unwrap(), Some(3921234567));
    assert_eq!(activity.product_id().unwrap(), Some(2431));
    assert_eq!(
        activity.start_time().unwrap(),
        Some(parse_timestamp("2021-02-27T02:30:00Z").unwrap())
    );
}

#[test]
fn test_tcx_lap_fields() {
    let tcx = Tcx::from_path(fixture_path("tcx/activity.tcx")).unwrap();
    let laps = tcx.laps();
    let first = laps[0];
    assert_eq!(first.total_time_s().unwrap(), Some(300.0));
    assert_eq!(first.max_speed_ms().unwrap(), Some(3.8));
    assert_eq!(first.avg_speed_ms().unwrap(), Some(3.33));
    assert_eq!(first.hr_avg().unwrap(), Some(141));
    assert_eq!(first.hr_max().unwrap(), Some(155));
    assert_eq!(first.cadence_avg().unwrap(), Some(84));
    assert_eq!(first.cadence_max().unwrap(), Some(90));
    assert_eq!(first.intensity().unwrap().as_deref(), Some("Active"));
    assert_eq!(first.trigger_method().unwrap().as_deref(), Some("Manual"));
    assert_eq!(first.trackpoints().len(), 2);

    let second = laps[1];
    assert_eq!(second.hr_avg().unwrap(), None);
    assert_eq!(second.avg_speed_ms().unwrap(), None);
    assert_eq!(second.tracks().len(), 1);
    assert_eq!(second.trackpoints().len(), 1);
}

#[test]
fn test_tcx_trackpoint_fields() {
    let tcx = Tcx::from_path(fixture_path("tcx/activity.tcx")).unwrap();
    let points = tcx.trackpoints();
    let tp = points[1];
    assert_eq!(tp.lat().unwrap(), Some(40.0210));
    assert_eq!(tp.lon().unwrap(), Some(-105.2801));
    assert_eq!(tp.altitude_m().unwrap(), Some(1661.0));
    assert_eq!(tp.distance_m().unwrap(), Some(1000.0));
    assert_eq!(tp.hr().unwrap(), Some(150));
    assert_eq!(tp.speed_ms().unwrap(), Some(3.3));
    assert_eq!(tp.cadence_rpm().unwrap(), Some(86));

    let bare = points[2];
    assert_eq!(bare.hr().unwrap(), None);
    assert_eq!(bare.speed_ms().unwrap(), None);
    assert_eq!(bare.altitude_m().unwrap(), None);
}

#[test]
fn test_tcx_course_without_activity() {
    let tcx = Tcx::from_path(fixture_path("tcx/course.tcx")).unwrap();
    assert!(tcx.activities().is_empty());
    assert_eq!(tcx.start_time().unwrap(), None);
    assert_eq!(tcx.date().unwrap(), None);

    let courses = tcx.courses();
    assert_eq!(courses[0].name().unwrap().as_deref(), Some("Mesa Trail"));
    assert_eq!(courses[0].laps().len(), 1);
    assert_eq!(tcx.laps().len(), 1);
    assert_eq!(tcx.distance_m().unwrap(), 5200.0);
    assert_eq!(tcx.num_records(), 2);
}

#[test]
fn test_tcx_namespaces_removed() {
    let tcx = Tcx::from_path(fixture_path("tcx/activity.tcx")).unwrap();
    let root = tcx.element();
    assert!(root.attributes().all(|(k, _)| !k.starts_with("xmlns")));
    let creator = root.find("Activities/Activity/Creator").unwrap();
    assert_eq!(creator.get("xsi:type"), None);
}
