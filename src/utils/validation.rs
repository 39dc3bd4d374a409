//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos
//! y conversión de tipos.

use chrono::{DateTime, NaiveDateTime, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use validator::ValidationError;

lazy_static! {
    /// Matrícula: letras, dígitos, guiones, puntos y espacios
    static ref LICENSE_PLATE_RE: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 .\-]{1,19}$")
        .expect("license plate regex is valid");
}

/// Formatos naive aceptados (interpretados como UTC)
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Validar y convertir un timestamp ISO-8601 a UTC.
///
/// Acepta RFC 3339 con offset (`2024-05-01T10:00:00+02:00`) o las formas sin
/// zona que envía un `<input type="datetime-local">`, tratadas como UTC.
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, ValidationError> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            let mut error = ValidationError::new("datetime");
            error.add_param("value".into(), &value.to_string());
            error.add_param("format".into(), &"ISO-8601".to_string());
            error
        })
}

/// Validar que un string no esté vacío
pub fn validate_not_empty(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut error = ValidationError::new("not_empty");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar formato de matrícula de vehículo
pub fn validate_license_plate(value: &str) -> Result<(), ValidationError> {
    if !LICENSE_PLATE_RE.is_match(value.trim()) {
        let mut error = ValidationError::new("license_plate");
        error.add_param("value".into(), &value.to_string());
        return Err(error);
    }
    Ok(())
}

/// Validar que un timestamp tenga formato ISO-8601
pub fn validate_timestamp(value: &str) -> Result<(), ValidationError> {
    parse_timestamp(value).map(|_| ())
}

/// Validar que un valor sea positivo
pub fn validate_positive<T: PartialOrd + std::fmt::Display + num_traits::Zero + Serialize>(
    value: T,
) -> Result<(), ValidationError> {
    if value <= T::zero() {
        let mut error = ValidationError::new("positive");
        error.add_param("value".into(), &value);
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let parsed = parse_timestamp("2024-05-01T10:00:00+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap());

        let parsed = parse_timestamp("2024-05-01T10:00:00.000Z").unwrap();
        assert_eq!(parsed.hour(), 10);
    }

    #[test]
    fn test_parse_timestamp_naive_forms() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T10:30").unwrap(), expected);
        assert_eq!(parse_timestamp("2024-05-01 10:30:00").unwrap(), expected);
        assert_eq!(parse_timestamp(" 2024-05-01T10:30:00 ").unwrap(), expected);
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_err());
        assert!(parse_timestamp("2024/05/01 10:00").is_err());
        assert!(parse_timestamp("").is_err());
    }

    #[test]
    fn test_validate_license_plate() {
        assert!(validate_license_plate("ABC-123").is_ok());
        assert!(validate_license_plate("51F 123.45").is_ok());
        assert!(validate_license_plate("A").is_err());
        assert!(validate_license_plate("-ABC").is_err());
        assert!(validate_license_plate("ABCDEFGHIJKLMNOPQRSTU").is_err());
    }

    #[test]
    fn test_validate_not_empty() {
        assert!(validate_not_empty("x").is_ok());
        assert!(validate_not_empty("   ").is_err());
    }

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive(5).is_ok());
        assert!(validate_positive(0).is_err());
        assert!(validate_positive(-5).is_err());
    }
}
