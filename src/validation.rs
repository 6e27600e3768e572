//! Request validation
//!
//! Raw strings from the command line or the web form are turned into a
//! [`MashupRequest`] here, before anything touches the network or the disk.

use crate::error::{Field, ValidationError};
use crate::types::{MashupRequest, OutputTarget};
use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Track count must be strictly greater than this
pub const MIN_TRACK_COUNT_EXCLUSIVE: u32 = 10;

/// Clip length in seconds must be strictly greater than this
pub const MIN_CLIP_SECONDS_EXCLUSIVE: u32 = 20;

/// Positional arguments of the command line: query, count, seconds, output
pub const CLI_ARGUMENT_COUNT: usize = 4;

#[allow(clippy::expect_used)] // literal pattern
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9-.]+$").expect("valid email regex")
});

/// Trim the search term and reject it if nothing is left
pub fn validate_query(raw: &str) -> Result<String, ValidationError> {
    let query = raw.trim();
    if query.is_empty() {
        return Err(ValidationError::EmptyQuery);
    }
    Ok(query.to_string())
}

/// Parse the track count, which must be an integer > 10
pub fn parse_track_count(raw: &str) -> Result<u32, ValidationError> {
    parse_above(raw, MIN_TRACK_COUNT_EXCLUSIVE).ok_or_else(|| ValidationError::InvalidTrackCount {
        value: raw.to_string(),
        min: MIN_TRACK_COUNT_EXCLUSIVE,
    })
}

/// Parse the clip length, which must be an integer > 20
pub fn parse_clip_seconds(raw: &str) -> Result<u32, ValidationError> {
    parse_above(raw, MIN_CLIP_SECONDS_EXCLUSIVE).ok_or_else(|| {
        ValidationError::InvalidClipSeconds {
            value: raw.to_string(),
            min: MIN_CLIP_SECONDS_EXCLUSIVE,
        }
    })
}

/// Check the recipient against a `local@domain.tld` shape
pub fn validate_email(raw: &str) -> Result<String, ValidationError> {
    let email = raw.trim();
    if !EMAIL_PATTERN.is_match(email) {
        return Err(ValidationError::InvalidEmail {
            value: email.to_string(),
        });
    }
    Ok(email.to_string())
}

/// Validate the command line's positional arguments
///
/// Expects exactly `<query> <trackCount> <clipSeconds> <outputPath>`; fields are
/// checked in that order and the first failure is returned.
pub fn validate_cli_args(args: &[String]) -> Result<MashupRequest, ValidationError> {
    let [query, track_count, clip_seconds, output] = args else {
        return Err(ValidationError::WrongArgumentCount {
            expected: CLI_ARGUMENT_COUNT,
            actual: args.len(),
        });
    };

    let query = validate_query(query)?;
    let track_count = parse_track_count(track_count)?;
    let clip_seconds = parse_clip_seconds(clip_seconds)?;

    Ok(MashupRequest::new(
        query,
        track_count,
        clip_seconds,
        OutputTarget::File(PathBuf::from(output)),
    ))
}

/// Validate the web form fields `singer`, `n`, `y` and `email`
///
/// All four must be present and non-blank before any of them is inspected further;
/// then `n`, `y` and `email` are checked in that order.
pub fn validate_web_form(
    singer: Option<&str>,
    n: Option<&str>,
    y: Option<&str>,
    email: Option<&str>,
) -> Result<MashupRequest, ValidationError> {
    let singer = required(singer, Field::Query)?;
    let n = required(n, Field::TrackCount)?;
    let y = required(y, Field::ClipSeconds)?;
    let email = required(email, Field::Recipient)?;

    let track_count = parse_track_count(n)?;
    let clip_seconds = parse_clip_seconds(y)?;
    let email = validate_email(email)?;

    Ok(MashupRequest::new(
        singer.to_string(),
        track_count,
        clip_seconds,
        OutputTarget::Email(email),
    ))
}

/// Message printed by the command line for a rejected argument
pub fn cli_message(error: &ValidationError) -> String {
    match error {
        ValidationError::WrongArgumentCount { .. } => format!(
            "Usage: mashup <SingerName> <NumberOfVideos> <AudioDuration> <OutputFileName>\n\
             Example: mashup 'Taylor Swift' 15 30 mashup.mp3\n\
             {}",
            error
        ),
        ValidationError::InvalidTrackCount { .. } => {
            format!("Error: NumberOfVideos must be > {}", MIN_TRACK_COUNT_EXCLUSIVE)
        }
        ValidationError::InvalidClipSeconds { .. } => format!(
            "Error: AudioDuration must be > {} seconds",
            MIN_CLIP_SECONDS_EXCLUSIVE
        ),
        other => format!("Error: {}", other),
    }
}

/// Plain-text body returned by `POST /generate` for a rejected form
pub fn web_message(error: &ValidationError) -> &'static str {
    match error {
        ValidationError::MissingField { .. }
        | ValidationError::EmptyQuery
        | ValidationError::WrongArgumentCount { .. } => "Error: All fields are required.",
        ValidationError::InvalidTrackCount { .. } => {
            "Error: Number of Videos must be an integer > 10."
        }
        ValidationError::InvalidClipSeconds { .. } => {
            "Error: Duration must be an integer > 20 seconds."
        }
        ValidationError::InvalidEmail { .. } => "Error: Invalid email format.",
    }
}

fn required(value: Option<&str>, field: Field) -> Result<&str, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ValidationError::MissingField { field }),
    }
}

fn parse_above(raw: &str, exclusive_min: u32) -> Option<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|value| *value > exclusive_min)
}
