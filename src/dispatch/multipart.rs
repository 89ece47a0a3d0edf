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

//! `multipart/form-data` request bodies.
//!
//! The decoder works line by line on CRLF-delimited input, which covers what
//! browsers and HTTP clients send for form posts and file uploads.

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MultipartError {
    #[error("Content-Type header does not contain a multipart boundary")]
    MissingBoundary,

    #[error("Multipart body is missing its terminating boundary")]
    MissingTerminator,

    #[error("Multipart part headers are not terminated by a blank line")]
    UnterminatedHeaders,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// A decoded form: text fields and uploaded files keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, UploadedFile>,
}

impl MultipartForm {
    /// JSON view used as the request body for templates and conditions.
    /// Files are summarized by name, type and size; their bytes are omitted.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();

        for (name, value) in &self.fields {
            map.insert(name.clone(), Value::String(value.clone()));
        }

        for (name, file) in &self.files {
            map.insert(
                name.clone(),
                json!({
                    "filename": file.filename,
                    "contentType": file.content_type,
                    "size": file.data.len(),
                }),
            );
        }

        Value::Object(map)
    }
}

#[derive(Debug, Default)]
struct MultipartPart {
    name: Option<String>,
    filename: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

impl MultipartPart {
    fn parse_header(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let Some((header, value)) = line.split_once(':') else {
            return;
        };

        let header = header.trim();
        let value = value.trim();

        if header.eq_ignore_ascii_case("content-disposition") {
            for param in value.split(';').map(str::trim) {
                let Some((key, raw)) = param.split_once('=') else {
                    continue;
                };
                let raw = raw.trim().trim_matches('"').to_string();
                if key.trim().eq_ignore_ascii_case("name") {
                    self.name = Some(raw);
                } else if key.trim().eq_ignore_ascii_case("filename") {
                    self.filename = Some(raw);
                }
            }
        } else if header.eq_ignore_ascii_case("content-type") {
            self.content_type = Some(value.to_string());
        }
    }

    fn fold_into(self, form: &mut MultipartForm) {
        let Some(name) = self.name.filter(|name| !name.is_empty()) else {
            return;
        };

        match self.filename.filter(|filename| !filename.is_empty()) {
            Some(filename) => {
                form.files.insert(
                    name,
                    UploadedFile {
                        filename,
                        content_type: self.content_type,
                        data: self.data,
                    },
                );
            }
            None => {
                let text = String::from_utf8_lossy(&self.data).trim().to_string();
                form.fields.insert(name, text);
            }
        }
    }
}

pub fn is_multipart(content_type: &str) -> bool {
    content_type
        .trim()
        .to_ascii_lowercase()
        .starts_with("multipart/form-data")
}

/// Extracts the `boundary` parameter from a multipart content type.
pub fn boundary_from_content_type(content_type: &str) -> Result<String, MultipartError> {
    let boundary = match content_type.parse::<mime::Mime>() {
        Ok(parsed) => parsed
            .get_param(mime::BOUNDARY)
            .map(|name| name.as_str().to_string()),
        Err(_) => None,
    }
    .or_else(|| {
        let start = content_type.find("boundary=")? + "boundary=".len();
        let rest = &content_type[start..];
        Some(rest.split(';').next().unwrap_or(rest).trim().to_string())
    })
    .map(|boundary| boundary.trim_matches('"').to_string())
    .unwrap_or_default();

    if boundary.is_empty() {
        return Err(MultipartError::MissingBoundary);
    }

    Ok(boundary)
}

/// Iterates CRLF-terminated lines of a byte slice. A final line without a
/// terminator is still yielded.
struct CrlfLines<'a> {
    rest: Option<&'a [u8]>,
}

impl<'a> CrlfLines<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { rest: Some(input) }
    }
}

impl<'a> Iterator for CrlfLines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.rest?;
        match rest.windows(2).position(|w| w == b"\r\n") {
            Some(pos) => {
                self.rest = Some(&rest[pos + 2..]);
                Some(&rest[..pos])
            }
            None => {
                self.rest = None;
                (!rest.is_empty()).then_some(rest)
            }
        }
    }
}

fn trim_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |pos| pos + 1);
    &line[..end]
}

/// Decodes a `multipart/form-data` body framed by `boundary`.
///
/// Anything before the first delimiter line is ignored. Parts without a
/// `name` are dropped.
pub fn decode(boundary: &str, body: &[u8]) -> Result<MultipartForm, MultipartError> {
    let delimiter = format!("--{boundary}");
    let terminator = format!("--{boundary}--");
    let mut lines = CrlfLines::new(body);
    let mut form = MultipartForm::default();

    loop {
        let line = lines.next().ok_or(MultipartError::MissingTerminator)?;
        let line = trim_end(line);
        if line == terminator.as_bytes() {
            return Ok(form);
        }
        if line == delimiter.as_bytes() {
            break;
        }
    }

    loop {
        let mut part = MultipartPart::default();

        loop {
            let line = lines.next().ok_or(MultipartError::UnterminatedHeaders)?;
            if line.is_empty() {
                break;
            }
            part.parse_header(line);
        }

        let mut first = true;
        let last = loop {
            let line = lines.next().ok_or(MultipartError::MissingTerminator)?;
            let trimmed = trim_end(line);
            if trimmed == terminator.as_bytes() {
                break true;
            }
            if trimmed == delimiter.as_bytes() {
                break false;
            }
            if !first {
                part.data.extend_from_slice(b"\r\n");
            }
            part.data.extend_from_slice(line);
            first = false;
        };

        part.fold_into(&mut form);

        if last {
            return Ok(form);
        }
    }
}
