use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A geographic position in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lon, self.lat)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("Please enter coordinates")]
    Empty,

    #[error("Enter valid coordinates (lon,lat): expected 2 numbers, found {0}")]
    TokenCount(usize),

    #[error("Enter valid coordinates (lon,lat): '{0}' is not a number")]
    InvalidNumber(String),
}

/// Parse free text such as `"30.04, 31.24"` or `"31.24 30.04"` into a coordinate.
///
/// The order is guessed from magnitudes: when the first value fits a latitude
/// and the second a longitude, the input is read as `lat, lon`; anything else
/// is read as `lon, lat`. Inputs where both readings are valid (`"45, 45"`)
/// resolve to the first one without warning.
pub fn parse_coordinates(input: &str) -> Result<Coordinate, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let tokens: Vec<&str> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.len() != 2 {
        return Err(ParseError::TokenCount(tokens.len()));
    }

    let first = parse_number(tokens[0])?;
    let second = parse_number(tokens[1])?;

    if first.abs() <= 90.0 && second.abs() <= 180.0 {
        Ok(Coordinate::new(second, first))
    } else {
        Ok(Coordinate::new(first, second))
    }
}

fn parse_number(token: &str) -> Result<f64, ParseError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ParseError::InvalidNumber(token.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lat_lon_order_when_first_fits_latitude() {
        let c = parse_coordinates("30.04, 31.24").unwrap();
        assert_eq!(c, Coordinate::new(31.24, 30.04));
    }

    #[test]
    fn lon_lat_order_when_first_exceeds_latitude_range() {
        let c = parse_coordinates("140, 40").unwrap();
        assert_eq!(c, Coordinate::new(140.0, 40.0));
    }

    #[test]
    fn whitespace_and_mixed_separators() {
        assert_eq!(
            parse_coordinates("  10   20 ").unwrap(),
            Coordinate::new(20.0, 10.0)
        );
        assert_eq!(
            parse_coordinates("-33.9 ,, 151.2").unwrap(),
            Coordinate::new(151.2, -33.9)
        );
    }

    #[test]
    fn ambiguous_input_resolves_to_lat_lon() {
        let c = parse_coordinates("45,45").unwrap();
        assert_eq!(c.lat, 45.0);
        assert_eq!(c.lon, 45.0);
    }

    #[test]
    fn out_of_range_second_value_is_not_rejected() {
        // 10 fits a latitude but 200 is no longitude, so the else branch wins.
        let c = parse_coordinates("10, 200").unwrap();
        assert_eq!(c, Coordinate::new(10.0, 200.0));
    }

    #[test]
    fn empty_input_fails() {
        assert_eq!(parse_coordinates(""), Err(ParseError::Empty));
        assert_eq!(parse_coordinates(" \t "), Err(ParseError::Empty));
    }

    #[test]
    fn wrong_token_count_fails() {
        assert_eq!(parse_coordinates("30"), Err(ParseError::TokenCount(1)));
        assert_eq!(parse_coordinates("1,2,3"), Err(ParseError::TokenCount(3)));
        assert_eq!(parse_coordinates(",,,"), Err(ParseError::TokenCount(0)));
    }

    #[test]
    fn non_numeric_token_fails() {
        assert_eq!(
            parse_coordinates("30.0, abc"),
            Err(ParseError::InvalidNumber("abc".into()))
        );
        assert!(matches!(
            parse_coordinates("NaN 3"),
            Err(ParseError::InvalidNumber(_))
        ));
    }
}
