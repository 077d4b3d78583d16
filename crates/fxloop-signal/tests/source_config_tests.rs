//! 信号源配置反序列化测试

use fxloop_signal::{SignalSource, SourceConfig};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Wrapper {
    source: SourceConfig,
}

fn parse(text: &str) -> SourceConfig {
    toml::from_str::<Wrapper>(text).unwrap().source
}

#[test]
fn test_parse_solid() {
    let config = parse(r#"source = { type = "solid", color = [255, 80, 0] }"#);
    assert_eq!(config, SourceConfig::Solid { color: [255, 80, 0] });
}

#[test]
fn test_parse_rainbow_default_speed() {
    let config = parse(r#"source = { type = "rainbow" }"#);
    assert_eq!(config, SourceConfig::Rainbow { speed: 60.0 });
}

#[test]
fn test_parse_breathe_table() {
    let config = parse(
        r#"
[source]
type = "breathe"
color = [0, 0, 255]
period = 2.5
"#,
    );
    assert_eq!(
        config,
        SourceConfig::Breathe {
            color: [0, 0, 255],
            period: 2.5
        }
    );
}

#[test]
fn test_parse_unknown_type_fails() {
    let result = toml::from_str::<Wrapper>(r#"source = { type = "screen" }"#);
    assert!(result.is_err());
}

#[test]
fn test_built_source_produces_requested_length() {
    let mut source = parse(r#"source = { type = "rainbow", speed = 120.0 }"#)
        .build(90)
        .unwrap();
    for _ in 0..3 {
        let frame = source.produce().unwrap();
        assert_eq!(frame.len(), 90);
    }
}
