use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::preprocess::TensorLayout;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub upload_dir: PathBuf,
    pub upload_route: String,
    pub image_size: u32,
    pub tensor_layout: TensorLayout,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            model_path: PathBuf::from("model/brain_tumor_resnet50.onnx"),
            upload_dir: PathBuf::from("static/uploads"),
            upload_route: "/static/uploads".to_string(),
            image_size: 224,
            tensor_layout: TensorLayout::Nhwc,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            model_path: lookup("MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            upload_route: lookup("UPLOAD_ROUTE").unwrap_or(defaults.upload_route),
            image_size: parse_or(&lookup, "IMAGE_SIZE", defaults.image_size)?,
            tensor_layout: parse_or(&lookup, "TENSOR_LAYOUT", defaults.tensor_layout)?,
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.image_size == 0 {
            return Err(invalid("IMAGE_SIZE", "0", "must be positive"));
        }
        if self.max_upload_bytes == 0 {
            return Err(invalid("MAX_UPLOAD_BYTES", "0", "must be positive"));
        }
        if !self.upload_route.starts_with('/') || self.upload_route.trim_end_matches('/').is_empty()
        {
            return Err(invalid(
                "UPLOAD_ROUTE",
                &self.upload_route,
                "must be an absolute path other than `/`",
            ));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: ToString,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, &raw, &e.to_string())),
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_address(), ("127.0.0.1".to_string(), 5000));
        assert_eq!(config.image_size, 224);
        assert_eq!(config.tensor_layout, TensorLayout::Nhwc);
        assert_eq!(config.upload_dir, PathBuf::from("static/uploads"));
        assert_eq!(config.upload_route, "/static/uploads");
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = config_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "8080"),
            ("MODEL_PATH", "/models/resnet.onnx"),
            ("TENSOR_LAYOUT", "nchw"),
            ("MAX_UPLOAD_BYTES", "2048"),
        ])
        .unwrap();
        assert_eq!(config.bind_address(), ("0.0.0.0".to_string(), 8080));
        assert_eq!(config.model_path, PathBuf::from("/models/resnet.onnx"));
        assert_eq!(config.tensor_layout, TensorLayout::Nchw);
        assert_eq!(config.max_upload_bytes, 2048);
    }

    #[test]
    fn invalid_port_names_the_variable() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        let ConfigError::Invalid { key, value, .. } = err;
        assert_eq!(key, "PORT");
        assert_eq!(value, "eighty");
    }

    #[test]
    fn rejects_zero_image_size() {
        assert!(config_from(&[("IMAGE_SIZE", "0")]).is_err());
    }

    #[test]
    fn rejects_root_upload_route() {
        assert!(config_from(&[("UPLOAD_ROUTE", "/")]).is_err());
        assert!(config_from(&[("UPLOAD_ROUTE", "uploads")]).is_err());
    }
}
