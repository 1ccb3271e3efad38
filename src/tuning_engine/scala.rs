//! Scala (`.scl`) tuning file import.
//!
//! Format reference: <http://www.huygens-fokker.org/scala/scl_format.html>.
//! Lines starting with `!` are comments. The first remaining line is a free-form
//! description, the second the number of pitches, and each following line holds
//! one pitch as cents (`701.955`), a ratio (`3/2`) or an integer ratio (`2`).
//! The unison is implicit and the last pitch is the period.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::tuning_engine::constants::UNKNOWN_TUNING_NAME;
use crate::tuning_engine::errors::{LineErrorKind, ParseError};
use crate::tuning_engine::scale::ScaleModel;

/// Turns a tuning file into an ordered list of cents values, one per step.
pub trait TuningFileParser {
    fn parse_file(&self, path: &Path) -> Result<Vec<f64>, ParseError>;
}

/// The built-in Scala parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SclParser;

impl TuningFileParser for SclParser {
    fn parse_file(&self, path: &Path) -> Result<Vec<f64>, ParseError> {
        let file = File::open(path)?;
        parse_scl(file)
    }
}

enum SclReader {
    ExpectingDescription,
    ExpectingCount,
    ReadingPitches { declared: usize, cents: Vec<f64> },
}

impl SclReader {
    fn consume(self, line_number: usize, line: &str) -> Result<Self, ParseError> {
        let line_error = |kind| ParseError::Line {
            line: line_number,
            kind,
        };

        Ok(match self {
            Self::ExpectingDescription => Self::ExpectingCount,
            Self::ExpectingCount => {
                let declared = line
                    .split_ascii_whitespace()
                    .next()
                    .and_then(|item| item.parse().ok())
                    .ok_or_else(|| line_error(LineErrorKind::NoteCount))?;
                Self::ReadingPitches {
                    declared,
                    cents: Vec::with_capacity(declared),
                }
            }
            Self::ReadingPitches {
                declared,
                mut cents,
            } => {
                let Some(item) = line.split_ascii_whitespace().next() else {
                    // Trailing blank lines after the last pitch are harmless.
                    if cents.len() >= declared {
                        return Ok(Self::ReadingPitches { declared, cents });
                    }
                    return Err(line_error(LineErrorKind::EmptyLine));
                };
                cents.push(parse_pitch(item).map_err(line_error)?);
                Self::ReadingPitches { declared, cents }
            }
        })
    }

    fn finish(self) -> Result<Vec<f64>, ParseError> {
        match self {
            Self::ExpectingDescription => Err(ParseError::MissingDescription),
            Self::ExpectingCount => Err(ParseError::MissingNoteCount),
            Self::ReadingPitches { declared, cents } => {
                if cents.len() != declared {
                    return Err(ParseError::NoteCountMismatch {
                        declared,
                        found: cents.len(),
                    });
                }
                Ok(cents)
            }
        }
    }
}

fn parse_pitch(item: &str) -> Result<f64, LineErrorKind> {
    if item.contains('.') {
        return item.parse().map_err(|_| LineErrorKind::Cents);
    }

    if let Some((numer, denom)) = item.split_once('/') {
        let numer: u64 = numer.parse().map_err(|_| LineErrorKind::Numerator)?;
        let denom: u64 = denom.parse().map_err(|_| LineErrorKind::Denominator)?;
        if numer == 0 {
            return Err(LineErrorKind::Numerator);
        }
        if denom == 0 {
            return Err(LineErrorKind::Denominator);
        }
        return Ok(ratio_to_cents(numer as f64 / denom as f64));
    }

    let int_value: u64 = item.parse().map_err(|_| LineErrorKind::Integer)?;
    if int_value == 0 {
        return Err(LineErrorKind::Integer);
    }
    Ok(ratio_to_cents(int_value as f64))
}

fn ratio_to_cents(ratio: f64) -> f64 {
    1200.0 * ratio.log2()
}

/// Parses Scala content into cents values, validating that they form a scale.
pub fn parse_scl(reader: impl Read) -> Result<Vec<f64>, ParseError> {
    let mut state = SclReader::ExpectingDescription;

    for (index, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.starts_with('!') {
            continue;
        }
        state = state.consume(index + 1, trimmed)?;
    }

    let cents = state.finish()?;
    ScaleModel::from_cents(&cents)?;
    Ok(cents)
}

/// Name shown for a tuning loaded from `path`: the file's base name.
pub fn tuning_name_for(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

/// Directory to remember for the next file dialog: the parent of `path`, if it exists.
pub fn scala_dir_for(path: &Path) -> Option<String> {
    path.parent()
        .filter(|dir| dir.is_dir())
        .map(|dir| dir.to_string_lossy().into_owned())
}

/// Reads a tuning file into a named scale. Runs on the control thread.
pub fn read_tuning_file(
    parser: &dyn TuningFileParser,
    path: &Path,
) -> Result<(String, ScaleModel), ParseError> {
    let cents = parser.parse_file(path)?;
    let scale = ScaleModel::from_cents(&cents)?;
    let name = tuning_name_for(path).unwrap_or_else(|| UNKNOWN_TUNING_NAME.to_string());
    Ok((name, scale))
}
