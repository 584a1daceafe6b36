//! INI file configuration adapter.

use crate::domain::error::SniperError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SniperError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| SniperError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, SniperError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| SniperError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, SniperError> {
        match self.get_string(section, key) {
            None => Ok(None),
            Some(raw) => Self::parse_bool(&raw).map(Some).ok_or_else(|| {
                SniperError::invalid(section, key, format!("expected true or false, got '{raw}'"))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn from_string_parses_sections() {
        let content = r#"
[strategy]
name = Sniper Test
trend_period = 40

[backtest]
initial_capital = 250000
data = data/JM.csv
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("strategy", "name"),
            Some("Sniper Test".to_string())
        );
        assert_eq!(adapter.get_int("strategy", "trend_period").unwrap(), Some(40));
        assert_eq!(
            adapter.get_double("backtest", "initial_capital").unwrap(),
            Some(250000.0)
        );
        assert_eq!(
            adapter.get_string("backtest", "data"),
            Some("data/JM.csv".to_string())
        );
    }

    #[test]
    fn missing_keys_are_none() {
        let adapter = FileConfigAdapter::from_string("[backtest]\ninitial_capital = 100\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
        assert_eq!(adapter.get_int("backtest", "missing").unwrap(), None);
        assert_eq!(adapter.get_bool("backtest", "missing").unwrap(), None);
    }

    #[test]
    fn non_numeric_is_invalid() {
        let adapter = FileConfigAdapter::from_string("[strategy]\natr_period = abc\nvol_multiplier = x\n").unwrap();
        assert!(matches!(
            adapter.get_int("strategy", "atr_period"),
            Err(SniperError::ConfigInvalid { .. })
        ));
        assert!(matches!(
            adapter.get_double("strategy", "vol_multiplier"),
            Err(SniperError::ConfigInvalid { .. })
        ));
    }

    #[test]
    fn bool_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[strategy]\na = true\nb = yes\nc = 1\nd = Off\ne = no\nf = 0\ng = maybe\n",
        )
        .unwrap();
        for key in ["a", "b", "c"] {
            assert_eq!(adapter.get_bool("strategy", key).unwrap(), Some(true));
        }
        for key in ["d", "e", "f"] {
            assert_eq!(adapter.get_bool("strategy", key).unwrap(), Some(false));
        }
        assert!(adapter.get_bool("strategy", "g").is_err());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[logging]\nlevel = debug\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("logging", "level"), Some("debug".to_string()));
    }

    #[test]
    fn from_file_missing_is_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini")
            .err()
            .unwrap();
        assert!(matches!(err, SniperError::ConfigParse { .. }));
    }
}
