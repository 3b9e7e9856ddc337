use geotrack_config::{PROFILE_CSV_HEADERS, load_profiles_csv};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_csv(contents: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("temp csv");
    f.write_all(contents.as_bytes()).expect("write csv");
    f
}

fn header_row() -> String {
    PROFILE_CSV_HEADERS.join(",")
}

#[test]
fn loads_well_formed_rows() {
    let csv = format!(
        "{}\n\
         1,Driving,2000,5.0,120,10,android_auto,,30,true\n\
         2,Walking,15000,10.0,600,5,speed_below,2.5,0,true\n",
        header_row()
    );
    let f = write_csv(&csv);
    let profiles = load_profiles_csv(f.path()).expect("csv should load");
    assert_eq!(profiles.len(), 2);
    assert_eq!(profiles[0].name, "Driving");
    assert_eq!(profiles[0].speed_threshold_mps, None);
    assert_eq!(profiles[0].deactivation_delay_s, 30);
    assert_eq!(profiles[1].speed_threshold_mps, Some(2.5));
    assert!(profiles[1].enabled);
}

#[test]
fn rejects_wrong_headers() {
    let csv = "id,name,interval\n1,x,1000\n";
    let f = write_csv(csv);
    let err = load_profiles_csv(f.path()).expect_err("bad headers rejected");
    assert!(
        format!("{err}").contains("must have headers"),
        "error should explain the expected header row: {err}"
    );
}

#[test]
fn rejects_malformed_row_with_line_number() {
    let csv = format!(
        "{}\n\
         1,Driving,2000,5.0,120,10,android_auto,,30,true\n\
         2,Broken,not-a-number,10.0,600,5,charging,,0,true\n",
        header_row()
    );
    let f = write_csv(&csv);
    let err = load_profiles_csv(f.path()).expect_err("malformed row rejected");
    assert!(format!("{err}").contains("row 3"), "row number in error: {err}");
}

#[test]
fn rejects_structurally_invalid_profile() {
    // Parses fine but fails profile validation (zero interval).
    let csv = format!("{}\n1,Zero,0,5.0,120,10,charging,,0,true\n", header_row());
    let f = write_csv(&csv);
    let err = load_profiles_csv(f.path()).expect_err("zero interval rejected");
    assert!(format!("{err}").contains("interval_ms"));
}

#[test]
fn disabled_flag_parses() {
    let csv = format!(
        "{}\n5,Paused,5000,5.0,300,1,charging,,0,false\n",
        header_row()
    );
    let f = write_csv(&csv);
    let profiles = load_profiles_csv(f.path()).expect("csv should load");
    assert!(!profiles[0].enabled);
}
