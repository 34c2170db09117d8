//! Durable store key formats.
//!
//! Coordinates are always encoded as `"<x>,<y>,<z>"`.
//!
//! - Energy amounts: `"energy_<dim>:<x>,<y>,<z>"` -> `Int(amount)`
//! - Transport sources: `"source_<x>,<y>,<z>"` -> owning dimension

use crate::coord::{Coord, DimensionId, Location, ParseCoordError};

pub const ENERGY_PREFIX: &str = "energy_";
pub const SOURCE_PREFIX: &str = "source_";

pub fn energy_key(loc: Location) -> String {
    format!("{ENERGY_PREFIX}{}:{}", loc.dim, loc.at)
}

/// Parse an energy key back into its location.
pub fn parse_energy_key(key: &str) -> Option<Location> {
    let rest = key.strip_prefix(ENERGY_PREFIX)?;
    let (dim, coord) = rest.split_once(':')?;
    let dim = dim.parse::<u16>().ok()?;
    let at = coord.parse::<Coord>().ok()?;
    Some(Location::new(DimensionId(dim), at))
}

pub fn source_key(at: Coord) -> String {
    format!("{SOURCE_PREFIX}{at}")
}

pub fn parse_source_key(key: &str) -> Result<Coord, ParseCoordError> {
    key.strip_prefix(SOURCE_PREFIX)
        .ok_or_else(|| ParseCoordError(key.to_string()))?
        .parse()
}
