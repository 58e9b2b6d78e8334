use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::error::{ProcessingError, Result};

/// Measurement columns recognised in the per-country data files.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Column {
    Ghi,
    Dni,
    Dhi,
    #[value(name = "moda")]
    ModA,
    #[value(name = "modb")]
    ModB,
    Tamb,
    Rh,
    Ws,
    #[value(name = "wsgust")]
    WsGust,
    Wd,
    Bp,
    Precipitation,
    #[value(name = "tmoda")]
    TModA,
    #[value(name = "tmodb")]
    TModB,
}

impl Column {
    pub const ALL: [Column; 14] = [
        Column::Ghi,
        Column::Dni,
        Column::Dhi,
        Column::ModA,
        Column::ModB,
        Column::Tamb,
        Column::Rh,
        Column::Ws,
        Column::WsGust,
        Column::Wd,
        Column::Bp,
        Column::Precipitation,
        Column::TModA,
        Column::TModB,
    ];

    /// Columns every country file is expected to carry.
    pub const CORE: [Column; 7] = [
        Column::Ghi,
        Column::Dni,
        Column::Dhi,
        Column::Tamb,
        Column::Rh,
        Column::Ws,
        Column::Bp,
    ];

    /// Weather variables checked for their effect on irradiance
    pub const WEATHER: [Column; 5] = [
        Column::Tamb,
        Column::Rh,
        Column::Ws,
        Column::Bp,
        Column::Precipitation,
    ];

    pub const IRRADIANCE: [Column; 5] = [
        Column::Ghi,
        Column::Dni,
        Column::Dhi,
        Column::ModA,
        Column::ModB,
    ];

    /// Header name as written in the source CSV files
    pub fn header(&self) -> &'static str {
        match self {
            Column::Ghi => "GHI",
            Column::Dni => "DNI",
            Column::Dhi => "DHI",
            Column::ModA => "ModA",
            Column::ModB => "ModB",
            Column::Tamb => "Tamb",
            Column::Rh => "RH",
            Column::Ws => "WS",
            Column::WsGust => "WSgust",
            Column::Wd => "WD",
            Column::Bp => "BP",
            Column::Precipitation => "Precipitation",
            Column::TModA => "TModA",
            Column::TModB => "TModB",
        }
    }

    pub fn from_header(header: &str) -> Option<Self> {
        let trimmed = header.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.header().eq_ignore_ascii_case(trimmed))
    }

    pub fn units(&self) -> &'static str {
        match self {
            Column::Ghi | Column::Dni | Column::Dhi | Column::ModA | Column::ModB => "W/m²",
            Column::Tamb | Column::TModA | Column::TModB => "°C",
            Column::Rh => "%",
            Column::Ws | Column::WsGust => "m/s",
            Column::Wd => "°N",
            Column::Bp => "hPa",
            Column::Precipitation => "mm/min",
        }
    }

    pub fn is_irradiance(&self) -> bool {
        Self::IRRADIANCE.contains(self)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

impl FromStr for Column {
    type Err = ProcessingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_header(s)
            .ok_or_else(|| ProcessingError::InvalidFormat(format!("Unknown column: '{}'", s)))
    }
}

/// One timestamped observation after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct MeasurementRow {
    pub timestamp: NaiveDateTime,

    // Irradiance (W/m²)
    #[validate(range(min = 0.0))]
    pub ghi: Option<f64>,

    #[validate(range(min = 0.0))]
    pub dni: Option<f64>,

    #[validate(range(min = 0.0))]
    pub dhi: Option<f64>,

    #[validate(range(min = 0.0))]
    pub mod_a: Option<f64>,

    #[validate(range(min = 0.0))]
    pub mod_b: Option<f64>,

    // Weather
    pub tamb: Option<f64>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub rh: Option<f64>,

    #[validate(range(min = 0.0))]
    pub ws: Option<f64>,

    #[validate(range(min = 0.0))]
    pub ws_gust: Option<f64>,

    #[validate(range(min = 0.0, max = 360.0))]
    pub wd: Option<f64>,

    #[validate(range(min = 0.0))]
    pub bp: Option<f64>,

    #[validate(range(min = 0.0))]
    pub precipitation: Option<f64>,

    // Module temperatures
    pub tmod_a: Option<f64>,
    pub tmod_b: Option<f64>,

    /// Panel-cleaning event during this measurement window
    pub cleaning: bool,
}

impl MeasurementRow {
    pub fn new(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            ghi: None,
            dni: None,
            dhi: None,
            mod_a: None,
            mod_b: None,
            tamb: None,
            rh: None,
            ws: None,
            ws_gust: None,
            wd: None,
            bp: None,
            precipitation: None,
            tmod_a: None,
            tmod_b: None,
            cleaning: false,
        }
    }

    pub fn with_value(mut self, column: Column, value: f64) -> Self {
        self.set(column, Some(value));
        self
    }

    pub fn with_cleaning(mut self, cleaning: bool) -> Self {
        self.cleaning = cleaning;
        self
    }

    pub fn get(&self, column: Column) -> Option<f64> {
        match column {
            Column::Ghi => self.ghi,
            Column::Dni => self.dni,
            Column::Dhi => self.dhi,
            Column::ModA => self.mod_a,
            Column::ModB => self.mod_b,
            Column::Tamb => self.tamb,
            Column::Rh => self.rh,
            Column::Ws => self.ws,
            Column::WsGust => self.ws_gust,
            Column::Wd => self.wd,
            Column::Bp => self.bp,
            Column::Precipitation => self.precipitation,
            Column::TModA => self.tmod_a,
            Column::TModB => self.tmod_b,
        }
    }

    pub fn set(&mut self, column: Column, value: Option<f64>) {
        let slot = match column {
            Column::Ghi => &mut self.ghi,
            Column::Dni => &mut self.dni,
            Column::Dhi => &mut self.dhi,
            Column::ModA => &mut self.mod_a,
            Column::ModB => &mut self.mod_b,
            Column::Tamb => &mut self.tamb,
            Column::Rh => &mut self.rh,
            Column::Ws => &mut self.ws,
            Column::WsGust => &mut self.ws_gust,
            Column::Wd => &mut self.wd,
            Column::Bp => &mut self.bp,
            Column::Precipitation => &mut self.precipitation,
            Column::TModA => &mut self.tmod_a,
            Column::TModB => &mut self.tmod_b,
        };
        *slot = value;
    }

    pub fn has_negative_irradiance(&self) -> bool {
        Column::IRRADIANCE
            .iter()
            .any(|c| self.get(*c).is_some_and(|v| v < 0.0))
    }

    pub fn has_missing(&self, columns: &[Column]) -> bool {
        columns.iter().any(|c| self.get(*c).is_none())
    }
}
