use once_cell::sync::Lazy;
use serde_json::Value;

/// JSON Schema of `Report::to_json_value` output (Draft 2020-12).
pub static REPORT_SCHEMA_JSON: &str = include_str!("../../schemas/airq-report.schema.json");

pub static REPORT_SCHEMA_VALUE: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(REPORT_SCHEMA_JSON)
        .expect("embedded airq report schema must be valid JSON")
});

pub fn report_schema() -> &'static Value {
    &REPORT_SCHEMA_VALUE
}

/// Top-level keys every report document carries.
pub fn required_sections() -> Vec<&'static str> {
    report_schema()["required"]
        .as_array()
        .map(|keys| keys.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}
