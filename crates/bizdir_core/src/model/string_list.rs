//! Text encoding for list-valued columns.
//!
//! `attributes`, `transactions` and `loc_display_address` are stored as JSON
//! array text. Element order is preserved in both directions.

/// Encodes an ordered string list into its stored JSON text form.
pub fn encode(values: &[String]) -> Result<String, serde_json::Error> {
    serde_json::to_string(values)
}

/// Decodes stored JSON text back into an ordered string list.
///
/// Accepts exactly what SQLite's `json_each` accepts for an array column, so
/// a row that reads back is also searchable. Blank text is malformed.
pub fn decode(text: &str) -> Result<Vec<String>, serde_json::Error> {
    serde_json::from_str(text)
}
