/*
 * Copyright 2026 Schemock Team
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use crate::dispatch::multipart::{self, MultipartError};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

/// Parses a raw query string into a map.
///
/// Pairs are split on `&` and then `=`; pairs without `=` are ignored and only
/// the first two tokens count. Values are percent-decoded with `+` kept as
/// is. A later duplicate key replaces an earlier one.
pub fn parse_query(raw: &str) -> HashMap<String, String> {
    let raw = raw.strip_prefix('?').unwrap_or(raw);

    raw.split('&')
        .filter_map(|pair| {
            let mut tokens = pair.split('=');
            let key = tokens.next()?;
            let value = tokens.next()?;
            Some((key.to_string(), percent_decode(value)))
        })
        .collect()
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_value(bytes[i + 1]), hex_value(bytes[i + 2])) {
                decoded.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Turns the request payload into the structured value seen by templates
/// and conditions.
///
/// Multipart forms become an object of their fields and file summaries.
/// Other payloads are parsed as JSON when they look like an object or array;
/// anything else yields an empty object. Only malformed multipart framing is
/// reported as an error.
pub fn parse_body(content_type: Option<&str>, body: &[u8]) -> Result<Value, MultipartError> {
    if let Some(content_type) = content_type.filter(|ct| multipart::is_multipart(ct)) {
        let boundary = multipart::boundary_from_content_type(content_type)?;
        let form = multipart::decode(&boundary, body)?;
        debug!(
            fields = form.fields.len(),
            files = form.files.len(),
            "Decoded multipart body"
        );
        return Ok(form.to_json());
    }

    Ok(parse_json_body(body))
}

fn parse_json_body(body: &[u8]) -> Value {
    let empty = || Value::Object(Default::default());

    let Ok(text) = std::str::from_utf8(body) else {
        return empty();
    };

    let trimmed = text.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return empty();
    }

    serde_json::from_str(trimmed).unwrap_or_else(|e| {
        debug!(error = %e, "Request body is not valid JSON, using empty object");
        empty()
    })
}

/// Case-insensitive header lookup.
pub fn header_value<'a>(headers: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_query() {
        let query = parse_query("?page=2&sort=name&flag&a=b=c");
        assert_eq!(query.len(), 3);
        assert_eq!(query["page"], "2");
        assert_eq!(query["sort"], "name");
        assert_eq!(query["a"], "b");
        assert!(!query.contains_key("flag"));
    }

    #[test]
    fn test_parse_query_percent_decoding() {
        let query = parse_query("q=hello%20world&plus=a+b&bad=%zz&tail=%4");
        assert_eq!(query["q"], "hello world");
        assert_eq!(query["plus"], "a+b");
        assert_eq!(query["bad"], "%zz");
        assert_eq!(query["tail"], "%4");
    }

    #[test]
    fn test_parse_query_duplicates_last_wins() {
        let query = parse_query("id=1&id=2");
        assert_eq!(query["id"], "2");
    }

    #[test]
    fn test_parse_query_empty() {
        assert!(parse_query("").is_empty());
    }

    #[test]
    fn test_parse_json_body() {
        let body = parse_body(Some("application/json"), br#" {"name":"Ada"} "#).unwrap();
        assert_eq!(body, json!({ "name": "Ada" }));

        let body = parse_body(None, b"[1,2]").unwrap();
        assert_eq!(body, json!([1, 2]));
    }

    #[test]
    fn test_unparsable_body_is_empty_object() {
        assert_eq!(parse_body(None, b"").unwrap(), json!({}));
        assert_eq!(parse_body(None, b"plain text").unwrap(), json!({}));
        assert_eq!(parse_body(None, b"{ broken").unwrap(), json!({}));
        assert_eq!(parse_body(None, &[0xff, 0xfe, b'{']).unwrap(), json!({}));
    }

    #[test]
    fn test_multipart_body() {
        let body = "--b\r\nContent-Disposition: form-data; name=\"foo\"\r\n\r\nbar\r\n--b--\r\n";
        let value = parse_body(Some("multipart/form-data; boundary=b"), body.as_bytes()).unwrap();
        assert_eq!(value, json!({ "foo": "bar" }));
    }

    #[test]
    fn test_multipart_without_boundary_fails() {
        let result = parse_body(Some("multipart/form-data"), b"irrelevant");
        assert_eq!(result, Err(MultipartError::MissingBoundary));
    }

    #[test]
    fn test_header_value() {
        let headers = HashMap::from([("Content-Type".to_string(), "text/plain".to_string())]);
        assert_eq!(header_value(&headers, "content-type"), Some("text/plain"));
        assert_eq!(header_value(&headers, "accept"), None);
    }
}
