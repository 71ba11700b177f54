//! Supported public output formats.

use serde::{Deserialize, Serialize};

/// Output formats a public caller may request. Rendering of the non-JSON
/// formats happens in the transform layer; this enum is the cache key space
/// for per-format content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    Json,
    Csv,
    Tsv,
    DataTable,
    DataTableResponse,
}

impl OutputFormat {
    /// The canonical default format. Error payloads are always rendered in
    /// this format regardless of what was requested.
    pub const DEFAULT: OutputFormat = OutputFormat::Json;

    /// All supported formats.
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Json,
        OutputFormat::Csv,
        OutputFormat::Tsv,
        OutputFormat::DataTable,
        OutputFormat::DataTableResponse,
    ];

    /// Parse a `format` query parameter. Absent or unsupported values fall
    /// back to the default format.
    pub fn parse(param: Option<&str>) -> Self {
        match param {
            Some("json") => OutputFormat::Json,
            Some("csv") => OutputFormat::Csv,
            Some("tsv") => OutputFormat::Tsv,
            Some("data-table") => OutputFormat::DataTable,
            Some("data-table-response") => OutputFormat::DataTableResponse,
            _ => OutputFormat::DEFAULT,
        }
    }

    /// The query-parameter value (and cache sub-key) for this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Tsv => "tsv",
            OutputFormat::DataTable => "data-table",
            OutputFormat::DataTableResponse => "data-table-response",
        }
    }

    /// Friendly name shown in owner-facing listings.
    pub fn label(&self) -> &'static str {
        match self {
            OutputFormat::Json => "JSON",
            OutputFormat::Csv => "CSV",
            OutputFormat::Tsv => "TSV for Excel",
            OutputFormat::DataTable => "DataTable (JSON String)",
            OutputFormat::DataTableResponse => "DataTable (JSON Response)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_supported() {
        assert_eq!(OutputFormat::parse(Some("csv")), OutputFormat::Csv);
        assert_eq!(
            OutputFormat::parse(Some("data-table-response")),
            OutputFormat::DataTableResponse
        );
    }

    #[test]
    fn test_parse_falls_back_to_default() {
        assert_eq!(OutputFormat::parse(None), OutputFormat::Json);
        assert_eq!(OutputFormat::parse(Some("xml")), OutputFormat::Json);
        assert_eq!(OutputFormat::parse(Some("")), OutputFormat::Json);
    }

    #[test]
    fn test_round_trip_as_str() {
        for format in OutputFormat::ALL {
            assert_eq!(OutputFormat::parse(Some(format.as_str())), format);
        }
    }
}
