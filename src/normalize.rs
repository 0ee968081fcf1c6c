//! Field name canonicalisation.
//!
//! Caller-supplied field names are turned into the canonical, deduplicated, ordered list used as
//! a cache and storage schema. The canonical time field is always present in the output; every
//! other field outside a fixed set of raw identifiers carries a suffix marking it as a derived
//! measurement channel.

use hashbrown::HashSet;

/// Canonical identifier of the time field.
pub const TIME_FIELD: &str = "measurement_date_time";

/// Suffix marking a field as a derived measurement channel.
pub const DERIVED_SUFFIX: &str = "_d";

/// Fields stored under their own name, without the derived-value suffix.
pub const RAW_FIELDS: [&str; 4] = [TIME_FIELD, "depth", "lon", "lat"];

/// Field list substituted when a request carries fewer than two usable fields.
pub const DEFAULT_FIELDS: [&str; 2] = [TIME_FIELD, "depth"];

/// Canonicalise a caller-supplied field list.
///
/// Names are lower-cased with spaces replaced by underscores. Any name containing the substring
/// "time" is rewritten to [TIME_FIELD]; other names outside [RAW_FIELDS] gain [DERIVED_SUFFIX]
/// unless they already carry it. Duplicates are removed keeping the first occurrence. If no name
/// resolved to the time field it is appended as an extra trailing column; the sort key stays at
/// position zero either way. The output always holds at least two fields, falling back to
/// [DEFAULT_FIELDS] when the input degenerates.
pub fn canonicalize(requested: &[String]) -> Vec<String> {
    let mut fields: Vec<String> = requested
        .iter()
        .map(|key| key.to_lowercase().replace(' ', "_"))
        .collect();
    if fields.len() < 2 {
        fields = default_fields();
    }

    let mut time_found = false;
    for field in fields.iter_mut() {
        if field.contains("time") {
            *field = TIME_FIELD.to_string();
            time_found = true;
        } else if !RAW_FIELDS.contains(&field.as_str()) && !field.ends_with(DERIVED_SUFFIX) {
            field.push_str(DERIVED_SUFFIX);
        }
    }

    // Keep the first occurrence of each field; multiple time-like names all collapse onto
    // TIME_FIELD above.
    let mut seen = HashSet::new();
    fields.retain(|field| seen.insert(field.clone()));

    if !time_found {
        fields.push(TIME_FIELD.to_string());
    }
    if fields.len() < 2 {
        // Everything collapsed onto a single field.
        fields = default_fields();
    }
    fields
}

fn default_fields() -> Vec<String> {
    DEFAULT_FIELDS.iter().map(|field| field.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonicalize_strs(keys: &[&str]) -> Vec<String> {
        let keys: Vec<String> = keys.iter().map(|key| key.to_string()).collect();
        canonicalize(&keys)
    }

    #[test]
    fn lower_cases_and_replaces_spaces() {
        let fields = canonicalize_strs(&["Sea Temperature", "Depth"]);
        assert_eq!(
            vec!["sea_temperature_d", "depth", TIME_FIELD],
            fields
        );
    }

    #[test]
    fn time_like_name_rewritten_in_place() {
        let fields = canonicalize_strs(&["Time", "Depth"]);
        assert_eq!(vec![TIME_FIELD, "depth"], fields);
    }

    #[test]
    fn time_not_first_keeps_position() {
        // The sort key stays at position zero; time is canonical but not leading.
        let fields = canonicalize_strs(&["Depth", "Measurement Time"]);
        assert_eq!(vec!["depth", TIME_FIELD], fields);
    }

    #[test]
    fn raw_fields_not_suffixed() {
        let fields = canonicalize_strs(&["lat", "lon", "depth"]);
        assert_eq!(vec!["lat", "lon", "depth", TIME_FIELD], fields);
    }

    #[test]
    fn existing_suffix_not_doubled() {
        let fields = canonicalize_strs(&["salinity_d", "depth"]);
        assert_eq!(vec!["salinity_d", "depth", TIME_FIELD], fields);
    }

    #[test]
    fn implicit_time_appended_last() {
        let fields = canonicalize_strs(&["salinity", "depth"]);
        assert_eq!(vec!["salinity_d", "depth", TIME_FIELD], fields);
    }

    #[test]
    fn short_input_substitutes_defaults() {
        let fields = canonicalize_strs(&["depth"]);
        assert_eq!(vec![TIME_FIELD, "depth"], fields);
    }

    #[test]
    fn empty_input_substitutes_defaults() {
        let fields = canonicalize_strs(&[]);
        assert_eq!(vec![TIME_FIELD, "depth"], fields);
    }

    #[test]
    fn duplicate_time_names_collapse() {
        let fields = canonicalize_strs(&["time", "datetime", "depth"]);
        assert_eq!(vec![TIME_FIELD, "depth"], fields);
    }

    #[test]
    fn all_time_names_fall_back_to_defaults() {
        let fields = canonicalize_strs(&["time", "measurement time"]);
        assert_eq!(vec![TIME_FIELD, "depth"], fields);
    }

    // Output always holds at least two fields and the time field exactly once.
    #[test]
    fn output_invariants() {
        let inputs: Vec<Vec<&str>> = vec![
            vec![],
            vec!["depth"],
            vec!["time"],
            vec!["time", "time"],
            vec!["Salinity", "Depth"],
            vec!["a", "b", "c", "d"],
            vec!["lat", "lon"],
            vec!["Time", "Depth", "measurement_date_time"],
        ];
        for input in inputs {
            let fields = canonicalize_strs(&input);
            assert!(fields.len() >= 2, "input {:?} gave {:?}", input, fields);
            let time_count = fields.iter().filter(|f| *f == TIME_FIELD).count();
            assert_eq!(1, time_count, "input {:?} gave {:?}", input, fields);
        }
    }
}
