//! Configuration access port trait.
//!
//! Typed getters distinguish a missing key (`Ok(None)`) from a key that is
//! present but cannot be parsed (`Err(ConfigInvalid)`).

use crate::domain::error::SniperError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    fn get_int(&self, section: &str, key: &str) -> Result<Option<i64>, SniperError> {
        parse_with(self.get_string(section, key), section, key, "an integer")
    }

    fn get_double(&self, section: &str, key: &str) -> Result<Option<f64>, SniperError> {
        parse_with(self.get_string(section, key), section, key, "a number")
    }

    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, SniperError> {
        parse_with(self.get_string(section, key), section, key, "true or false")
    }
}

fn parse_with<T: std::str::FromStr>(
    raw: Option<String>,
    section: &str,
    key: &str,
    expected: &str,
) -> Result<Option<T>, SniperError> {
    match raw {
        None => Ok(None),
        Some(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
            SniperError::invalid(section, key, format!("expected {expected}, got '{value}'"))
        }),
    }
}
