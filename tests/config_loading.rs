//! Loading export configuration files

use quotepress::{Color, Error, ExportConfig, ImageFormat, Orientation, PageFormat};
use std::io::Write;

fn write_config(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn loads_partial_file_with_defaults() {
    let file = write_config(r##"{"scale": 3, "imageFormat": "jpeg", "jpegQuality": 0.8, "backgroundColor": "#fafafa"}"##);
    let config = ExportConfig::from_path(file.path()).unwrap();

    assert_eq!(config.scale, 3.0);
    assert_eq!(config.image_format, ImageFormat::Jpeg);
    assert_eq!(config.background_color, Color::rgb(0xfa, 0xfa, 0xfa));
    assert_eq!(config.page_format, PageFormat::A4);
    assert_eq!(config.margin_top_mm, 15.0);
    assert_eq!(config.target_id, "invoice-preview");
}

#[test]
fn landscape_a5_geometry() {
    let file = write_config(
        r#"{"pageFormat": "a5", "orientation": "landscape", "marginTopMm": 10, "marginBottomMm": 10}"#,
    );
    let config = ExportConfig::from_path(file.path()).unwrap();
    assert_eq!(config.orientation, Orientation::Landscape);

    let geometry = config.page_geometry().unwrap();
    assert_eq!(geometry.width_mm(), 210.0);
    assert_eq!(geometry.height_mm(), 148.0);
    assert_eq!(geometry.content_width_mm(), 190.0);
    assert_eq!(geometry.content_height_mm(), 128.0);
}

#[test]
fn margins_that_swallow_the_page_are_rejected() {
    let file = write_config(r#"{"marginTopMm": 150, "marginBottomMm": 147}"#);
    assert!(matches!(ExportConfig::from_path(file.path()), Err(Error::SliceGeometryError(_))));
}

#[test]
fn invalid_values_are_config_errors() {
    for json in [r#"{"scale": 0}"#, r#"{"scale": -2}"#, r#"{"jpegQuality": 1.5}"#, r#"{"targetId": " "}"#] {
        let file = write_config(json);
        assert!(
            matches!(ExportConfig::from_path(file.path()), Err(Error::ConfigError(_))),
            "{} should be rejected",
            json
        );
    }
}

#[test]
fn malformed_files_fail_to_load() {
    let unknown = write_config(r#"{"scael": 2}"#);
    assert!(matches!(ExportConfig::from_path(unknown.path()), Err(Error::Json(_))));

    let color = write_config(r#"{"backgroundColor": "white"}"#);
    assert!(ExportConfig::from_path(color.path()).is_err());

    let missing = std::env::temp_dir().join("quotepress-no-such-config.json");
    assert!(matches!(ExportConfig::from_path(&missing), Err(Error::ConfigError(_))));
}
