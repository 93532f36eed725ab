use std::{collections::HashSet, fmt};

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const NINETY: f64 = 90.0;
const ONE_EIGHTY: f64 = NINETY * 2.0;

/// Physical Cell Identifier.
pub type Pci = u16;

/// One radio cell (a sector on a site, flattened).
///
/// Only `id`, `pci` and the coordinates matter to the optimizer. The optional
/// radio attributes feed [`crate::GeoConflictDetector`] and pass through
/// untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cell {
    pub id: String,
    pub pci: Pci,
    pub latitude: f64,
    pub longitude: f64,
    /// Site identifier; sectors of one tower share it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enodeb: Option<u32>,
    /// 1-based sector number on the site.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<u8>,
    /// Antenna azimuth in degrees clockwise from north.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azimuth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_mhz: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bandwidth_mhz: Option<f64>,
    /// Reference signal power (dBm).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rs_power: Option<f64>,
}

impl Cell {
    pub fn new(id: impl Into<String>, pci: Pci, latitude: f64, longitude: f64) -> Self {
        Self {
            id: id.into(),
            pci,
            latitude,
            longitude,
            enodeb: None,
            sector: None,
            azimuth: None,
            frequency_mhz: None,
            bandwidth_mhz: None,
            rs_power: None,
        }
    }

    pub fn with_site(mut self, enodeb: u32, sector: u8) -> Self {
        self.enodeb = Some(enodeb);
        self.sector = Some(sector);
        self
    }

    pub fn with_azimuth(mut self, azimuth: f64) -> Self {
        self.azimuth = Some(azimuth);
        self
    }

    pub fn with_frequency(mut self, frequency_mhz: f64) -> Self {
        self.frequency_mhz = Some(frequency_mhz);
        self
    }

    pub fn with_bandwidth(mut self, bandwidth_mhz: f64) -> Self {
        self.bandwidth_mhz = Some(bandwidth_mhz);
        self
    }

    pub fn with_rs_power(mut self, rs_power: f64) -> Self {
        self.rs_power = Some(rs_power);
        self
    }

    /// `x=lng`, `y=lat`, as `geo` expects.
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-NINETY..=NINETY).contains(&self.latitude)
            && (-ONE_EIGHTY..=ONE_EIGHTY).contains(&self.longitude)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pci={} @{},{}",
            self.id, self.pci, self.latitude, self.longitude
        )
    }
}

/// Reject empty or duplicate ids and coordinates outside the globe.
pub(crate) fn validate_cells(cells: &[Cell]) -> Result<()> {
    let mut seen = HashSet::with_capacity(cells.len());
    for (idx, cell) in cells.iter().enumerate() {
        if cell.id.trim().is_empty() {
            return Err(Error::invalid_input(format!("cell #{idx} has an empty id")));
        }
        if !seen.insert(cell.id.as_str()) {
            return Err(Error::invalid_input(format!("duplicate cell id {}", cell.id)));
        }
        if !cell.is_valid() {
            return Err(Error::invalid_input(format!(
                "cell {} has invalid coordinates {},{}",
                cell.id, cell.latitude, cell.longitude
            )));
        }
    }
    Ok(())
}
