//! crates/globehopper_core/src/normalize.rs
//!
//! Turns the model's raw response text into a typed `GenerationResult`.
//!
//! The response is parsed into a loosely-typed JSON tree first and then
//! projected field by field with explicit defaulting, so malformed model
//! output can never produce a partially-typed event in memory. Malformed
//! content surfaces as `PortError::MalformedOutput` and nothing else.

use serde_json::Value;

use crate::domain::{GenerationResult, ItineraryItem};
use crate::ports::{PortError, PortResult, RawGeneration};

/// Normalizes one raw model response.
///
/// Grounded responses may wrap the JSON object in code fences or prose;
/// strict-schema responses should be pure JSON. Defensive extraction is
/// applied to both.
pub fn normalize(raw: &RawGeneration) -> PortResult<GenerationResult> {
    let stripped = strip_code_fences(&raw.text);
    let span = first_balanced_object(stripped).ok_or_else(|| {
        PortError::MalformedOutput("response contains no JSON object".to_string())
    })?;

    let value: Value = serde_json::from_str(span)
        .map_err(|e| PortError::MalformedOutput(e.to_string()))?;

    let markdown = value
        .get("markdown")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let events = value
        .get("events")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(event_from_value).collect())
        .unwrap_or_default();

    Ok(GenerationResult {
        markdown,
        events,
        sources: raw.citations.clone(),
    })
}

/// Projects one JSON event into an `ItineraryItem`, defaulting every
/// missing field. Coordinates fall back to 0.0 when absent or unparseable;
/// the event stays in the timeline but cannot be placed on a map.
fn event_from_value(value: &Value) -> ItineraryItem {
    ItineraryItem {
        date: string_field(value, "date"),
        time: string_field(value, "time"),
        activity: string_field(value, "activity"),
        location: string_field(value, "location"),
        lat: coordinate_field(value, "lat"),
        lon: coordinate_field(value, "lon"),
        map_link: value
            .get("mapLink")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Coerces a coordinate that may arrive as a number or a numeric string.
fn coordinate_field(value: &Value, key: &str) -> f64 {
    match value.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Removes surrounding Markdown code-fence markers the model may have added
/// despite instructions.
fn strip_code_fences(text: &str) -> &str {
    let mut trimmed = text.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        // Skip an optional language tag on the opening fence line.
        trimmed = match rest.find('\n') {
            Some(pos) => &rest[pos + 1..],
            None => rest,
        };
    }
    if let Some(rest) = trimmed.trim_end().strip_suffix("```") {
        trimmed = rest;
    }
    trimmed.trim()
}

/// Returns the first balanced `{...}` span in the text, tracking string
/// literals and escapes so braces inside JSON strings do not miscount.
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Source;

    fn raw(text: &str) -> RawGeneration {
        RawGeneration {
            text: text.to_string(),
            citations: Vec::new(),
        }
    }

    #[test]
    fn coerces_coordinates_and_defaults_failed_parses_to_zero() {
        let input = raw(
            r#"{"markdown":"Hello","events":[{"date":"2024-06-01","time":"09:00","activity":"A","location":"L","lat":"12.5","lon":"notanumber"}]}"#,
        );

        let result = normalize(&input).unwrap();
        assert_eq!(result.markdown, "Hello");
        assert_eq!(result.events.len(), 1);
        assert_eq!(result.events[0].lat, 12.5);
        assert_eq!(result.events[0].lon, 0.0);
        assert_eq!(result.events[0].activity, "A");
    }

    #[test]
    fn extracts_the_object_from_fences_and_surrounding_prose() {
        let input = raw(
            "Here is your itinerary!\n```json\n{\"markdown\":\"Guide\",\"events\":[]}\n```\nEnjoy your trip.",
        );

        let result = normalize(&input).unwrap();
        assert_eq!(result.markdown, "Guide");
        assert!(result.events.is_empty());
    }

    #[test]
    fn braces_inside_string_literals_do_not_break_extraction() {
        let input = raw(r#"Note: {"markdown":"Use {curly} braces \" and } freely","events":[]} done"#);

        let result = normalize(&input).unwrap();
        assert_eq!(result.markdown, "Use {curly} braces \" and } freely");
    }

    #[test]
    fn missing_optional_fields_default_rather_than_fail() {
        let input = raw(r#"{"events":[{"date":"2024-06-02"}]}"#);

        let result = normalize(&input).unwrap();
        assert_eq!(result.markdown, "");
        assert_eq!(result.events[0].date, "2024-06-02");
        assert_eq!(result.events[0].time, "");
        assert_eq!(result.events[0].lat, 0.0);
        assert_eq!(result.events[0].map_link, None);
    }

    #[test]
    fn unparseable_text_is_a_malformed_output_condition() {
        let err = normalize(&raw("the model refused to answer")).unwrap_err();
        assert!(matches!(err, PortError::MalformedOutput(_)));

        let err = normalize(&raw("{\"markdown\": unterminated")).unwrap_err();
        assert!(matches!(err, PortError::MalformedOutput(_)));
    }

    #[test]
    fn citations_pass_through_unchanged() {
        let input = RawGeneration {
            text: r#"{"markdown":"G","events":[]}"#.to_string(),
            citations: vec![Source {
                title: "Visit Copenhagen".to_string(),
                uri: "https://example.com".to_string(),
            }],
        };

        let result = normalize(&input).unwrap();
        assert_eq!(result.sources, input.citations);
    }

    #[test]
    fn numeric_coordinates_are_read_directly() {
        let input = raw(
            r#"{"events":[{"lat":55.6761,"lon":12.5683,"mapLink":"https://maps.example"}]}"#,
        );

        let result = normalize(&input).unwrap();
        assert_eq!(result.events[0].lat, 55.6761);
        assert_eq!(result.events[0].lon, 12.5683);
        assert_eq!(
            result.events[0].map_link.as_deref(),
            Some("https://maps.example")
        );
    }
}
