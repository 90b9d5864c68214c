//! Input locations and reporting knobs.
//!
//! Defaults match the artifact layout produced by the forecasting pipeline
//! (`outputs_parte1/`). Environment variables override individual fields.

use std::env;
use std::path::PathBuf;

use tracing::warn;

use crate::reconcile::CollisionPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub national_series: String,
    pub national_forecast: String,
    pub department_forecast: String,
    pub department_monthly: String,
    pub geojson: PathBuf,
    pub out_dir: PathBuf,
    pub window_months: u32,
    pub top_n: usize,
    pub collision: CollisionPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("outputs_parte1"),
            national_series: "serie_nacional_mensual.csv".into(),
            national_forecast: "forecast_nacional_Q1_2024.csv".into(),
            department_forecast: "forecast_depto_Q1_2024.csv".into(),
            department_monthly: "serie_depto_mensual.csv".into(),
            geojson: PathBuf::from("outputs_parte1/colombia_departamentos.geojson"),
            out_dir: PathBuf::from("."),
            window_months: 12,
            top_n: 10,
            collision: CollisionPolicy::default(),
        }
    }
}

impl Config {
    /// Defaults overridden by `MINAS_DATA_DIR`, `MINAS_GEOJSON`,
    /// `MINAS_OUT_DIR`, `MINAS_WINDOW_MONTHS`, `MINAS_TOP_N` and
    /// `MINAS_COLLISION`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with an injectable variable source.
    /// Unparseable numbers and policies keep the default and log a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(dir) = lookup("MINAS_DATA_DIR") {
            cfg.geojson = PathBuf::from(&dir).join("colombia_departamentos.geojson");
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Some(path) = lookup("MINAS_GEOJSON") {
            cfg.geojson = PathBuf::from(path);
        }
        if let Some(dir) = lookup("MINAS_OUT_DIR") {
            cfg.out_dir = PathBuf::from(dir);
        }
        if let Some(raw) = lookup("MINAS_WINDOW_MONTHS") {
            match raw.trim().parse() {
                Ok(n) => cfg.window_months = n,
                Err(_) => warn!(value = %raw, "ignoring invalid MINAS_WINDOW_MONTHS"),
            }
        }
        if let Some(raw) = lookup("MINAS_TOP_N") {
            match raw.trim().parse() {
                Ok(n) => cfg.top_n = n,
                Err(_) => warn!(value = %raw, "ignoring invalid MINAS_TOP_N"),
            }
        }
        if let Some(raw) = lookup("MINAS_COLLISION") {
            match raw.parse() {
                Ok(p) => cfg.collision = p,
                Err(e) => warn!(error = %e, "ignoring invalid MINAS_COLLISION"),
            }
        }
        cfg
    }

    pub fn national_series_path(&self) -> PathBuf {
        self.data_dir.join(&self.national_series)
    }

    pub fn national_forecast_path(&self) -> PathBuf {
        self.data_dir.join(&self.national_forecast)
    }

    pub fn department_forecast_path(&self) -> PathBuf {
        self.data_dir.join(&self.department_forecast)
    }

    pub fn department_monthly_path(&self) -> PathBuf {
        self.data_dir.join(&self.department_monthly)
    }

    pub fn out_path(&self, file: &str) -> PathBuf {
        self.out_dir.join(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_point_at_pipeline_outputs() {
        let cfg = Config::default();
        assert_eq!(
            cfg.department_forecast_path(),
            PathBuf::from("outputs_parte1/forecast_depto_Q1_2024.csv")
        );
        assert_eq!(cfg.window_months, 12);
        assert_eq!(cfg.collision, CollisionPolicy::LastWriteWins);
    }

    #[test]
    fn environment_overrides() {
        let cfg = Config::from_lookup(lookup(&[
            ("MINAS_DATA_DIR", "/data"),
            ("MINAS_WINDOW_MONTHS", "6"),
            ("MINAS_COLLISION", "sum"),
        ]));
        assert_eq!(cfg.national_series_path(), PathBuf::from("/data/serie_nacional_mensual.csv"));
        assert_eq!(cfg.geojson, PathBuf::from("/data/colombia_departamentos.geojson"));
        assert_eq!(cfg.window_months, 6);
        assert_eq!(cfg.collision, CollisionPolicy::Sum);
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let cfg = Config::from_lookup(lookup(&[("MINAS_WINDOW_MONTHS", "doce"), ("MINAS_COLLISION", "avg")]));
        assert_eq!(cfg.window_months, 12);
        assert_eq!(cfg.collision, CollisionPolicy::LastWriteWins);
    }
}
