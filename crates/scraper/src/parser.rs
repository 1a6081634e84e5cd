use binged_core::types::RawItem;

use crate::ScrapeError;

/// Decode HTML character references (named, decimal and hex) in a scraped
/// title. Unknown references are kept verbatim.
pub fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

/// Split a comma-joined site field into trimmed, non-empty entries.
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn text_field(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => String::new(),
    }
}

fn year_field(value: &serde_json::Value) -> Option<i32> {
    let year = match value {
        serde_json::Value::Number(n) => n.as_i64().and_then(|y| i32::try_from(y).ok()),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    year.filter(|y| *y > 0)
}

/// Parse one entry of the scrape envelope. Entries without a title are skipped.
pub fn parse_item(value: &serde_json::Value) -> Option<RawItem> {
    let title = text_field(&value["title"]);
    if title.is_empty() {
        return None;
    }
    Some(RawItem {
        site_id: text_field(&value["id"]),
        title,
        release_year: year_field(&value["release-year"]),
        genre: text_field(&value["genre"]),
        languages: text_field(&value["languages"]),
        streaming_date: text_field(&value["streaming-date"]),
        recommendation: text_field(&value["recommendation"]),
        image: text_field(&value["big-image"]),
    })
}

/// Parse the `{ "data": [...] }` envelope returned by the scrape endpoint.
pub fn parse_envelope(body: &serde_json::Value) -> Result<Vec<RawItem>, ScrapeError> {
    let data = body["data"]
        .as_array()
        .ok_or_else(|| ScrapeError::Parse("missing `data` array".into()))?;
    Ok(data.iter().filter_map(parse_item).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_common_entities() {
        assert_eq!(decode_entities("Tom &amp; Jerry"), "Tom & Jerry");
        assert_eq!(decode_entities("Ocean&#8217;s Eleven"), "Ocean’s Eleven");
        assert_eq!(decode_entities("Ocean&#x2019;s"), "Ocean’s");
        assert_eq!(decode_entities("&quot;Quoted&quot;"), "\"Quoted\"");
        assert_eq!(decode_entities("Pok&eacute;mon"), "Pokémon");
        assert_eq!(decode_entities("Fish &chips; stay"), "Fish &chips; stay");
        assert_eq!(decode_entities("AT&T"), "AT&T");
    }

    #[test]
    fn decodes_full_named_entity_set() {
        assert_eq!(decode_entities("&Eacute;lite"), "Élite");
        assert_eq!(decode_entities("&Uuml;ber"), "Über");
        assert_eq!(decode_entities("Brand&trade;"), "Brand™");
        assert_eq!(decode_entities("&hearts; &frac12;"), "♥ ½");
    }

    #[test]
    fn splits_lists() {
        assert_eq!(split_list("Drama, Thriller"), ["Drama", "Thriller"]);
        assert_eq!(split_list("Hindi,Tamil , "), ["Hindi", "Tamil"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn parses_envelope_items() {
        let body = serde_json::json!({
            "data": [
                {
                    "id": 91234,
                    "title": "Foo (2024)",
                    "release-year": "2024",
                    "genre": "Drama",
                    "languages": "English, Hindi",
                    "streaming-date": "07 Feb 2025",
                    "recommendation": "A",
                    "big-image": "https://www.binged.com/img/foo.jpg"
                },
                { "id": "77", "title": "Bar", "release-year": 2023 },
                { "id": "78", "title": "   " },
                { "id": "79" }
            ],
            "recordsTotal": 4
        });

        let items = parse_envelope(&body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].site_id, "91234");
        assert_eq!(items[0].release_year, Some(2024));
        assert_eq!(items[0].languages, "English, Hindi");
        assert_eq!(items[0].recommendation, "A");
        assert_eq!(items[0].image, "https://www.binged.com/img/foo.jpg");
        assert_eq!(items[1].site_id, "77");
        assert_eq!(items[1].release_year, Some(2023));
        assert_eq!(items[1].genre, "");
    }

    #[test]
    fn out_of_range_year_is_dropped() {
        assert_eq!(year_field(&serde_json::json!(2024)), Some(2024));
        assert_eq!(year_field(&serde_json::json!(4_294_969_320_i64)), None);
        assert_eq!(year_field(&serde_json::json!("-5")), None);
    }

    #[test]
    fn missing_data_array_is_an_error() {
        let err = parse_envelope(&serde_json::json!({ "error": "nonce" })).unwrap_err();
        assert!(matches!(err, ScrapeError::Parse(_)));
    }
}
