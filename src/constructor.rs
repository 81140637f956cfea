use std::collections::HashMap;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{FixedOffset, NaiveDate, TimeZone};
use regex::Regex;

use crate::node::{Node, NodeContent, ScalarValue};
use crate::{
    ConstructorError, Mark, BINARY_TAG, BOOL_TAG, FLOAT_TAG, INT_TAG, MAP_TAG, MERGE_TAG,
    NULL_TAG, OMAP_TAG, PAIRS_TAG, SET_TAG, STR_TAG, TIMESTAMP_TAG, VALUE_TAG,
};

type ScalarFn = Box<dyn Fn(&str, Mark) -> Result<ScalarValue, ConstructorError>>;
type SequenceFn = Box<dyn Fn(&[Node], Mark) -> Result<(), ConstructorError>>;
type MappingFn = Box<dyn Fn(&[(Node, Node)], Mark) -> Result<(), ConstructorError>>;

fn error<T>(problem: impl Into<String>, mark: Mark) -> Result<T, ConstructorError> {
    Err(ConstructorError {
        problem: problem.into(),
        mark,
    })
}

/// Type construction: maps a canonical tag to the callback that turns the raw
/// value into a typed one.
///
/// Scalar callbacks produce the [`ScalarValue`] stored in the node; sequence
/// and mapping callbacks validate the shape the tag demands (`!!omap` items
/// are single-pair mappings, `!!set` keys are unique, and so on). Exactly one
/// callback may be registered per tag; registering again replaces it.
pub struct Constructor {
    scalars: HashMap<String, ScalarFn>,
    sequences: HashMap<String, SequenceFn>,
    mappings: HashMap<String, MappingFn>,
}

impl Constructor {
    pub fn new() -> Constructor {
        let mut constructor = Constructor {
            scalars: HashMap::new(),
            sequences: HashMap::new(),
            mappings: HashMap::new(),
        };
        constructor.add_scalar(NULL_TAG, |_, _| Ok(ScalarValue::Null));
        constructor.add_scalar(BOOL_TAG, |value, mark| {
            construct_bool(value).map_or_else(
                || error(format!("cannot construct bool from {value:?}"), mark),
                |b| Ok(ScalarValue::Bool(b)),
            )
        });
        constructor.add_scalar(INT_TAG, |value, mark| {
            construct_int(value).map_or_else(
                || error(format!("cannot construct int from {value:?}"), mark),
                |i| Ok(ScalarValue::Int(i)),
            )
        });
        constructor.add_scalar(FLOAT_TAG, |value, mark| {
            construct_float(value).map_or_else(
                || error(format!("cannot construct float from {value:?}"), mark),
                |f| Ok(ScalarValue::Float(f)),
            )
        });
        constructor.add_scalar(BINARY_TAG, |value, mark| {
            // Embedded newlines and other whitespace are tolerated.
            let compact: String = value.chars().filter(|ch| !ch.is_whitespace()).collect();
            match BASE64.decode(compact.as_bytes()) {
                Ok(bytes) => Ok(ScalarValue::Bytes(bytes)),
                Err(err) => error(format!("cannot decode base64: {err}"), mark),
            }
        });
        let timestamp_re = timestamp_pattern();
        constructor.add_scalar(TIMESTAMP_TAG, move |value, mark| {
            match construct_timestamp(&timestamp_re, value) {
                Some(ts) => Ok(ScalarValue::Timestamp(ts)),
                None => error(format!("cannot construct timestamp from {value:?}"), mark),
            }
        });
        constructor.add_scalar(STR_TAG, |value, _| Ok(ScalarValue::String(value.into())));
        // The merge and value keys keep their spelling; the composer gives
        // `<<` its folding semantics before construction happens.
        constructor.add_scalar(MERGE_TAG, |value, _| Ok(ScalarValue::String(value.into())));
        constructor.add_scalar(VALUE_TAG, |value, _| Ok(ScalarValue::String(value.into())));

        constructor.add_sequence(OMAP_TAG, |items, mark| {
            let mut seen: Vec<&Node> = Vec::new();
            for item in items {
                let Some(pairs) = item.as_pairs() else {
                    return error("omap entries must be single-pair mappings", mark);
                };
                if pairs.len() != 1 {
                    return error("omap entries must be single-pair mappings", mark);
                }
                let key = &pairs[0].0;
                if seen.contains(&key) {
                    return error("found duplicate key in omap", item.mark);
                }
                seen.push(key);
            }
            Ok(())
        });
        constructor.add_sequence(PAIRS_TAG, |items, mark| {
            // Unlike omap, pairs permits duplicate keys.
            for item in items {
                let Some(pairs) = item.as_pairs() else {
                    return error("pairs entries must be single-pair mappings", mark);
                };
                if pairs.len() != 1 {
                    return error("pairs entries must be single-pair mappings", mark);
                }
            }
            Ok(())
        });
        constructor.add_mapping(MAP_TAG, |pairs, _| {
            for (index, (key, _)) in pairs.iter().enumerate() {
                if pairs[..index].iter().any(|(seen, _)| seen == key) {
                    return error("found duplicate key in mapping", key.mark);
                }
            }
            Ok(())
        });
        constructor.add_mapping(SET_TAG, |pairs, _| {
            let mut seen: Vec<&Node> = Vec::new();
            for (key, value) in pairs {
                if !value.is_null() {
                    return error("set values must be empty", value.mark);
                }
                if seen.contains(&key) {
                    return error("found duplicate key in set", key.mark);
                }
                seen.push(key);
            }
            Ok(())
        });
        constructor
    }

    /// Register or replace the scalar constructor for `tag`.
    pub fn add_scalar(
        &mut self,
        tag: impl Into<String>,
        callback: impl Fn(&str, Mark) -> Result<ScalarValue, ConstructorError> + 'static,
    ) {
        self.scalars.insert(tag.into(), Box::new(callback));
    }

    /// Register or replace the sequence validator for `tag`.
    pub fn add_sequence(
        &mut self,
        tag: impl Into<String>,
        callback: impl Fn(&[Node], Mark) -> Result<(), ConstructorError> + 'static,
    ) {
        self.sequences.insert(tag.into(), Box::new(callback));
    }

    /// Register or replace the mapping validator for `tag`.
    pub fn add_mapping(
        &mut self,
        tag: impl Into<String>,
        callback: impl Fn(&[(Node, Node)], Mark) -> Result<(), ConstructorError> + 'static,
    ) {
        self.mappings.insert(tag.into(), Box::new(callback));
    }

    /// Construct the typed value for a scalar with the given resolved tag.
    /// Unregistered tags construct as strings.
    pub(crate) fn construct_scalar(
        &self,
        tag: &str,
        value: &str,
        mark: Mark,
    ) -> Result<ScalarValue, ConstructorError> {
        match self.scalars.get(tag) {
            Some(callback) => callback(value, mark),
            None => Ok(ScalarValue::String(value.into())),
        }
    }

    /// Run the tag's shape validation over a finished collection node.
    pub(crate) fn construct_collection(&self, node: &Node) -> Result<(), ConstructorError> {
        match &node.content {
            NodeContent::Sequence { items, .. } => {
                if let Some(callback) = self.sequences.get(&node.tag) {
                    callback(items, node.mark)?;
                }
            }
            NodeContent::Mapping { pairs, .. } => {
                if let Some(callback) = self.mappings.get(&node.tag) {
                    callback(pairs, node.mark)?;
                }
            }
            NodeContent::Scalar { .. } => {}
        }
        Ok(())
    }
}

impl Default for Constructor {
    fn default() -> Self {
        Self::new()
    }
}

fn construct_bool(value: &str) -> Option<bool> {
    match value {
        "yes" | "Yes" | "YES" | "true" | "True" | "TRUE" | "on" | "On" | "ON" => Some(true),
        "no" | "No" | "NO" | "false" | "False" | "FALSE" | "off" | "Off" | "OFF" => Some(false),
        _ => None,
    }
}

/// Parse a YAML 1.1 integer: decimal, `0b` binary, `0o`-less octal, `0x`
/// hexadecimal, or base-60 sexagesimal, with `_` separators.
fn construct_int(value: &str) -> Option<i64> {
    let value = value.replace('_', "");
    let (sign, digits) = match value.strip_prefix('-') {
        Some(rest) => (-1i128, rest),
        None => (1i128, value.strip_prefix('+').unwrap_or(&value)),
    };
    if digits.is_empty() {
        return None;
    }
    if digits == "0" {
        return Some(0);
    }
    // The magnitude is computed in a wider type so that i64::MIN, whose
    // magnitude does not fit in i64, still parses.
    let magnitude = if let Some(rest) = digits.strip_prefix("0b") {
        i128::from_str_radix(rest, 2).ok()?
    } else if let Some(rest) = digits.strip_prefix("0x") {
        i128::from_str_radix(rest, 16).ok()?
    } else if digits.contains(':') {
        let mut total: i128 = 0;
        for part in digits.split(':') {
            let digit: i128 = part.parse().ok()?;
            total = total.checked_mul(60)?.checked_add(digit)?;
        }
        total
    } else if let Some(rest) = digits.strip_prefix('0') {
        i128::from_str_radix(rest, 8).ok()?
    } else {
        digits.parse().ok()?
    };
    i64::try_from(sign * magnitude).ok()
}

/// Parse a YAML 1.1 float, including `.inf`, `.nan` and sexagesimal forms.
fn construct_float(value: &str) -> Option<f64> {
    let value = value.replace('_', "");
    let lowered = value.to_ascii_lowercase();
    match lowered.as_str() {
        ".inf" | "+.inf" => return Some(f64::INFINITY),
        "-.inf" => return Some(f64::NEG_INFINITY),
        ".nan" => return Some(f64::NAN),
        _ => {}
    }
    if lowered.contains(':') {
        let (sign, rest) = match lowered.strip_prefix('-') {
            Some(rest) => (-1.0f64, rest),
            None => (1.0f64, lowered.strip_prefix('+').unwrap_or(&lowered)),
        };
        let mut total = 0.0f64;
        for part in rest.split(':') {
            let digit: f64 = part.parse().ok()?;
            total = total * 60.0 + digit;
        }
        return Some(sign * total);
    }
    lowered.parse().ok()
}

fn timestamp_pattern() -> Regex {
    Regex::new(
        r"(?x)^
          (?P<year>[0-9][0-9][0-9][0-9])-(?P<month>[0-9][0-9]?)-(?P<day>[0-9][0-9]?)
          (?:(?:[Tt]|[\ \t]+)
             (?P<hour>[0-9][0-9]?):(?P<minute>[0-9][0-9]):(?P<second>[0-9][0-9])
             (?:\.(?P<fraction>[0-9]*))?
             (?:[\ \t]*(?:(?P<z>Z)|(?P<tz_sign>[-+])(?P<tz_hour>[0-9][0-9]?)
                (?::(?P<tz_minute>[0-9][0-9]))?))?)?$",
    )
    .expect("timestamp pattern compiles")
}

/// Parse a YAML 1.1 timestamp into a fixed-offset datetime.
///
/// A missing time means midnight; a missing zone or `Z` means UTC; fractional
/// seconds are kept to nanosecond precision.
fn construct_timestamp(pattern: &Regex, value: &str) -> Option<chrono::DateTime<FixedOffset>> {
    let captures = pattern.captures(value)?;
    let group = |name: &str| captures.name(name).map(|m| m.as_str());
    let year: i32 = group("year")?.parse().ok()?;
    let month: u32 = group("month")?.parse().ok()?;
    let day: u32 = group("day")?.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let hour: u32 = group("hour").map_or(Ok(0), str::parse).ok()?;
    let minute: u32 = group("minute").map_or(Ok(0), str::parse).ok()?;
    let second: u32 = group("second").map_or(Ok(0), str::parse).ok()?;
    let nanos = match group("fraction") {
        Some(fraction) if !fraction.is_empty() => {
            let padded = format!("{fraction:0<9}");
            padded[..9].parse::<u32>().ok()?
        }
        _ => 0,
    };
    let time = date.and_hms_nano_opt(hour, minute, second, nanos)?;

    let offset_seconds = if group("z").is_some() {
        0
    } else if let (Some(sign), Some(tz_hour)) = (group("tz_sign"), group("tz_hour")) {
        let hours: i32 = tz_hour.parse().ok()?;
        let minutes: i32 = group("tz_minute").map_or(Ok(0), str::parse).ok()?;
        let magnitude = hours * 3600 + minutes * 60;
        if sign == "-" {
            -magnitude
        } else {
            magnitude
        }
    } else {
        0
    };
    let offset = FixedOffset::east_opt(offset_seconds)?;
    offset.from_local_datetime(&time).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bools() {
        assert_eq!(construct_bool("yes"), Some(true));
        assert_eq!(construct_bool("Off"), Some(false));
        assert_eq!(construct_bool("y"), None);
    }

    #[test]
    fn ints_in_all_bases() {
        assert_eq!(construct_int("685230"), Some(685_230));
        assert_eq!(construct_int("+685_230"), Some(685_230));
        assert_eq!(construct_int("02472256"), Some(685_230));
        assert_eq!(construct_int("0x_0A_74_AE"), Some(685_230));
        assert_eq!(construct_int("0b1010_0111_0100_1010_1110"), Some(685_230));
        assert_eq!(construct_int("190:20:30"), Some(685_230));
        assert_eq!(construct_int("-42"), Some(-42));
        assert_eq!(construct_int("0"), Some(0));
        assert_eq!(construct_int("twelve"), None);
    }

    #[test]
    fn floats() {
        assert_eq!(construct_float("6.8523015e+5"), Some(685_230.15));
        assert_eq!(construct_float("685.230_15e+03"), Some(685_230.15));
        assert_eq!(construct_float("190:20:30.15"), Some(685_230.15));
        assert_eq!(construct_float("-.inf"), Some(f64::NEG_INFINITY));
        assert!(construct_float(".nan").unwrap().is_nan());
    }

    #[test]
    fn timestamps() {
        let re = timestamp_pattern();
        let ts = construct_timestamp(&re, "2001-12-15T02:59:43.1Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2001-12-15T02:59:43.100+00:00");

        let date_only = construct_timestamp(&re, "2002-12-14").unwrap();
        assert_eq!(date_only.to_rfc3339(), "2002-12-14T00:00:00+00:00");

        let offset = construct_timestamp(&re, "2001-12-14 21:59:43.10 -5").unwrap();
        assert_eq!(offset.offset().local_minus_utc(), -5 * 3600);

        assert!(construct_timestamp(&re, "not a date").is_none());
    }

    #[test]
    fn binary_tolerates_newlines() {
        let constructor = Constructor::new();
        let value = constructor
            .construct_scalar(BINARY_TAG, "aGVs\nbG8=", Mark::default())
            .unwrap();
        assert_eq!(value, ScalarValue::Bytes(b"hello".to_vec()));
    }

    #[test]
    fn malformed_int_is_an_error() {
        let constructor = Constructor::new();
        assert!(constructor
            .construct_scalar(INT_TAG, "0xZZ", Mark::default())
            .is_err());
    }

    #[test]
    fn set_rejects_duplicates_and_values() {
        let constructor = Constructor::new();
        let good = Node::from_pairs(vec![
            (Node::string("a"), Node::null()),
            (Node::string("b"), Node::null()),
        ])
        .with_tag(SET_TAG);
        assert!(constructor.construct_collection(&good).is_ok());

        let duplicate = Node::from_pairs(vec![
            (Node::string("a"), Node::null()),
            (Node::string("a"), Node::null()),
        ])
        .with_tag(SET_TAG);
        assert!(constructor.construct_collection(&duplicate).is_err());

        let non_null = Node::from_pairs(vec![(Node::string("a"), Node::int(1))]).with_tag(SET_TAG);
        assert!(constructor.construct_collection(&non_null).is_err());
    }

    #[test]
    fn omap_rejects_malformed_entries() {
        let constructor = Constructor::new();
        let good = Node::from_items(vec![
            Node::from_pairs(vec![(Node::string("a"), Node::int(1))]),
            Node::from_pairs(vec![(Node::string("b"), Node::int(2))]),
        ])
        .with_tag(OMAP_TAG);
        assert!(constructor.construct_collection(&good).is_ok());

        let duplicate = Node::from_items(vec![
            Node::from_pairs(vec![(Node::string("a"), Node::int(1))]),
            Node::from_pairs(vec![(Node::string("a"), Node::int(2))]),
        ])
        .with_tag(OMAP_TAG);
        assert!(constructor.construct_collection(&duplicate).is_err());

        let not_a_pair = Node::from_items(vec![Node::int(1)]).with_tag(OMAP_TAG);
        assert!(constructor.construct_collection(&not_a_pair).is_err());
    }
}
