use crate::records::value::Value;
use crate::spreadsheet::reference::index_to_reference;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::NaiveTime;
use chrono::TimeDelta;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::trace;

/// How the raw text of a worksheet cell is interpreted.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub(crate) enum CellType {
    #[default]
    Empty,
    /// Boolean values (1/0)
    Boolean,
    /// Numeric values
    Number,
    /// Date or date/time serial numbers from the 1900 epoch
    NumberDate1900,
    /// Date or date/time serial numbers from the 1904 epoch
    NumberDate1904,
    /// Time-only serial numbers (fractions of a day)
    NumberTime,
    /// ISO 8601 date/time strings
    IsoDateTime,
    /// Inline or formula string values
    InlineString,
    /// Shared string table references
    SharedString,
    /// Error codes such as `#N/A`
    Error,
}

impl CellType {
    /// Maps built-in number format IDs that denote dates or times.
    pub(crate) fn parse_builtin_number_format_id(id: &str, is_1904: bool) -> Option<Self> {
        match id {
            "14" | "15" | "16" | "17" | "22" => Some(Self::date(is_1904)),
            "18" | "19" | "20" | "21" | "45" | "46" | "47" => Some(Self::NumberTime),
            _ => None,
        }
    }

    /// Classifies a custom number format code by its date and time tokens.
    /// Literal text, escaped characters and bracketed sections are ignored.
    pub(crate) fn parse_custom_number_format(format: &str, is_1904: bool) -> Self {
        let mut is_escaped = false;
        let mut is_literal = false;
        let mut is_bracket = false;
        let mut is_date = false;
        let mut is_time = false;
        for character in format.chars() {
            match character {
                _ if is_escaped => is_escaped = false,
                '_' | '\\' => is_escaped = true,

                '"' if is_literal => is_literal = false,
                '"' if !is_bracket => is_literal = true,

                ']' if is_bracket => is_bracket = false,
                '[' if !is_literal => is_bracket = true,
                _ if is_literal || is_bracket => (),

                'Y' | 'y' | 'D' | 'd' => is_date = true,
                'H' | 'h' | 'S' | 's' => is_time = true,
                _ => (),
            }
        }

        if is_date {
            Self::date(is_1904)
        } else if is_time {
            Self::NumberTime
        } else {
            Self::Number
        }
    }

    fn date(is_1904: bool) -> Self {
        if is_1904 {
            Self::NumberDate1904
        } else {
            Self::NumberDate1900
        }
    }

    /// Converts the raw cell text to a value.
    ///
    /// Shared strings must be resolved by the caller; `Empty` yields `Null`.
    pub(crate) fn to_value(self, raw: &str) -> Result<Value, String> {
        let value = match self {
            CellType::Empty => Value::Null,
            CellType::Boolean => Value::Bool(raw.trim() == "1" || raw.trim().eq_ignore_ascii_case("true")),
            CellType::Number => number_to_value(raw)?,
            CellType::NumberDate1900 | CellType::NumberDate1904 | CellType::NumberTime => {
                let is_1904 = self == CellType::NumberDate1904;
                serial_to_datetime(raw, is_1904)
                    .map(Value::Date)
                    .ok_or_else(|| format!("parse '{}' to date failed", raw))?
            }
            CellType::IsoDateTime => parse_iso_datetime(raw)
                .map(Value::Date)
                .ok_or_else(|| format!("parse '{}' to datetime failed", raw))?,
            CellType::InlineString | CellType::SharedString | CellType::Error => Value::Text(raw.to_owned()),
        };
        Ok(value)
    }
}

/// Parses a stored double exactly.
///
/// Doubles too large for a decimal are kept as text, and those too small
/// to register round to zero.
fn number_to_value(raw: &str) -> Result<Value, String> {
    if let Ok(number) = Value::parse_number(raw) {
        return Ok(Value::Number(number));
    }
    let approximate = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| format!("parse '{}' to number failed", raw))?;
    if approximate.abs() < 1.0 {
        Ok(Value::Number(Decimal::ZERO))
    } else {
        trace!("number '{}' is out of decimal range, kept as text", raw);
        Ok(Value::Text(raw.trim().to_owned()))
    }
}

/// Converts a serial day number to a date/time.
/// Serials below 60 in the 1900 system are shifted for the Lotus 1-2-3 leap year bug.
pub(crate) fn serial_to_datetime(raw: &str, is_1904: bool) -> Option<NaiveDateTime> {
    let serial = Value::parse_number(raw).ok()?;
    let mut days = serial.trunc().to_i64()?;
    let milliseconds = ((serial - serial.trunc()) * Decimal::from(86_400_000)).round().to_i64()?;
    if is_1904 {
        days += 1_462;
    } else if days < 60 {
        days += 1;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_time(NaiveTime::MIN);
    epoch
        .checked_add_signed(TimeDelta::try_days(days)?)?
        .checked_add_signed(TimeDelta::try_milliseconds(milliseconds)?)
}

fn parse_iso_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(|date| date.and_time(NaiveTime::MIN)))
        .or_else(|| {
            NaiveTime::parse_from_str(raw, "%H:%M:%S%.f")
                .ok()
                .and_then(|time| NaiveDate::from_ymd_opt(1899, 12, 31).map(|date| date.and_time(time)))
        })
}

/// A populated worksheet cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Cell {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
    pub value: Value,
}

impl Cell {
    /// Returns the A1-style reference of the cell.
    pub fn reference(&self) -> String {
        index_to_reference(self.row, self.col)
    }
}
