//! Per-field parsers: raw located text in, typed value or `Missing` out.
//!
//! Every parser is a pure `fn(&str) -> FieldValue`, so each field's fallback
//! behaviour can be checked on its own.

use crate::listing::ListingFields;
use crate::text_manipulators::{collapse_whitespace, strip_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    MlsNumber,
    Price,
    Address,
    Beds,
    Baths,
    SquareFootage,
    YearBuilt,
    LotSize,
    Garage,
    ListingAgent,
}

impl Field {
    pub fn parser(self) -> FieldParser {
        PARSERS
            .iter()
            .find(|(field, _)| *field == self)
            .map(|(_, parser)| *parser)
            .unwrap_or(parse_text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Decimal(f64),
    Missing,
}

pub type FieldParser = fn(&str) -> FieldValue;

pub const PARSERS: [(Field, FieldParser); 10] = [
    (Field::MlsNumber, parse_mls_number),
    (Field::Price, parse_price),
    (Field::Address, parse_text),
    (Field::Beds, parse_count),
    (Field::Baths, parse_decimal),
    (Field::SquareFootage, parse_count),
    (Field::YearBuilt, parse_year),
    (Field::LotSize, parse_lot_size),
    (Field::Garage, parse_text),
    (Field::ListingAgent, parse_text),
];

pub fn parse_text(raw: &str) -> FieldValue {
    let text = collapse_whitespace(raw);
    if text.is_empty() {
        FieldValue::Missing
    } else {
        FieldValue::Text(text)
    }
}

pub fn parse_mls_number(raw: &str) -> FieldValue {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        FieldValue::Missing
    } else {
        FieldValue::Text(digits)
    }
}

/// Whole dollars. Cents are dropped.
pub fn parse_price(raw: &str) -> FieldValue {
    match parse_decimal(raw) {
        FieldValue::Decimal(d) if d > 0.0 => FieldValue::Integer(d.trunc() as i64),
        _ => FieldValue::Missing,
    }
}

pub fn parse_count(raw: &str) -> FieldValue {
    strip_number(raw)
        .and_then(|n| n.split('.').next().map(str::to_string))
        .and_then(|n| n.parse::<i64>().ok())
        .map_or(FieldValue::Missing, FieldValue::Integer)
}

pub fn parse_decimal(raw: &str) -> FieldValue {
    strip_number(raw)
        .and_then(|n| n.parse::<f64>().ok())
        .map_or(FieldValue::Missing, FieldValue::Decimal)
}

pub fn parse_year(raw: &str) -> FieldValue {
    match parse_count(raw) {
        FieldValue::Integer(y) if (1800..=2100).contains(&y) => FieldValue::Integer(y),
        _ => FieldValue::Missing,
    }
}

const ACRE_UNITS: &[&str] = &["acres", "acre", "ac"];
const SQFT_UNITS: &[&str] = &["square feet", "square ft", "sq. ft", "sq.ft", "sq ft", "sqft"];

/// Lot sizes come as acres or square feet; the unit is kept with the number.
/// Only the unit written right after the first number counts.
pub fn parse_lot_size(raw: &str) -> FieldValue {
    let Some(start) = raw.find(|c: char| c.is_ascii_digit()) else {
        return FieldValue::Missing;
    };
    let rest = &raw[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == ',' || c == '.'))
        .unwrap_or(rest.len());
    let Some(number) = strip_number(&rest[..end]) else {
        return FieldValue::Missing;
    };

    let after = rest[end..].trim_start().to_ascii_lowercase();
    let unit = if starts_with_unit(&after, ACRE_UNITS) {
        "ac"
    } else if starts_with_unit(&after, SQFT_UNITS) {
        "sq ft"
    } else {
        return FieldValue::Text(number);
    };
    FieldValue::Text(format!("{number} {unit}"))
}

fn starts_with_unit(text: &str, units: &[&str]) -> bool {
    units.iter().any(|unit| {
        text.strip_prefix(unit)
            .is_some_and(|tail| !tail.starts_with(|c: char| c.is_ascii_alphanumeric()))
    })
}

/// Writes a parsed value into its slot. Returns false if the value was
/// missing or the wrong shape for the field.
pub fn assign(fields: &mut ListingFields, field: Field, value: FieldValue) -> bool {
    fn text(v: FieldValue) -> Option<String> {
        match v {
            FieldValue::Text(t) => Some(t),
            FieldValue::Integer(i) => Some(i.to_string()),
            FieldValue::Decimal(d) => Some(d.to_string()),
            FieldValue::Missing => None,
        }
    }
    fn integer(v: FieldValue) -> Option<i64> {
        match v {
            FieldValue::Integer(i) => Some(i),
            _ => None,
        }
    }

    match field {
        Field::MlsNumber => fields.mls_number = text(value),
        Field::Price => fields.price = integer(value).and_then(|i| u64::try_from(i).ok()),
        Field::Address => fields.address = text(value),
        Field::Beds => fields.beds = integer(value).and_then(|i| u32::try_from(i).ok()),
        Field::Baths => {
            fields.baths = match value {
                FieldValue::Decimal(d) => Some(d),
                FieldValue::Integer(i) => Some(i as f64),
                _ => None,
            }
        }
        Field::SquareFootage => {
            fields.square_footage = integer(value).and_then(|i| u32::try_from(i).ok())
        }
        Field::YearBuilt => fields.year_built = integer(value).and_then(|i| i32::try_from(i).ok()),
        Field::LotSize => fields.lot_size = text(value),
        Field::Garage => fields.garage = text(value),
        Field::ListingAgent => fields.listing_agent = text(value),
    }
    is_set(fields, field)
}

pub fn is_set(fields: &ListingFields, field: Field) -> bool {
    match field {
        Field::MlsNumber => fields.mls_number.is_some(),
        Field::Price => fields.price.is_some(),
        Field::Address => fields.address.is_some(),
        Field::Beds => fields.beds.is_some(),
        Field::Baths => fields.baths.is_some(),
        Field::SquareFootage => fields.square_footage.is_some(),
        Field::YearBuilt => fields.year_built.is_some(),
        Field::LotSize => fields.lot_size.is_some(),
        Field::Garage => fields.garage.is_some(),
        Field::ListingAgent => fields.listing_agent.is_some(),
    }
}
