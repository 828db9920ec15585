// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed field paths for partial document updates and queries.
//!
//! A path is a list of validated segments. Map entries such as one day of
//! `datesAndPlaceIds` are addressed as their own segment, so a date key can
//! never be confused with a nested field or run into its neighbour.

use crate::models::user::fields;
use crate::models::DateKey;
use std::fmt;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FieldPathError {
    #[error("Field path has no segments")]
    Empty,

    #[error("Field path segment {index} is empty")]
    EmptySegment { index: usize },

    #[error("Field path segment {0:?} contains '.'")]
    Separator(String),
}

/// Path to a (possibly nested) document field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    pub fn new<I, S>(segments: I) -> Result<Self, FieldPathError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(FieldPathError::Empty);
        }
        for (index, segment) in segments.iter().enumerate() {
            if segment.is_empty() {
                return Err(FieldPathError::EmptySegment { index });
            }
            if segment.contains('.') {
                return Err(FieldPathError::Separator(segment.clone()));
            }
        }
        Ok(Self { segments })
    }

    /// Top-level field from the known document schema.
    pub fn field(name: &'static str) -> Self {
        Self {
            segments: vec![name.to_string()],
        }
    }

    /// `datesAndPlaceIds.<date>`
    pub fn selection(date: &DateKey) -> Self {
        Self {
            segments: vec![
                fields::DATES_AND_PLACE_IDS.to_string(),
                date.as_str().to_string(),
            ],
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Encode for Firestore: simple segments bare, others backtick-quoted.
    pub fn to_firestore(&self) -> String {
        self.segments
            .iter()
            .map(|segment| encode_segment(segment))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

fn is_simple_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn encode_segment(segment: &str) -> String {
    if is_simple_segment(segment) {
        return segment.to_string();
    }
    let mut quoted = String::with_capacity(segment.len() + 2);
    quoted.push('`');
    for c in segment.chars() {
        if c == '`' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('`');
    quoted
}
