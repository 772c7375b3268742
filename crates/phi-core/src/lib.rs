#![deny(missing_docs)]
#![doc = "Core data model for the phi-modulated power spectrum forecasting engine: parameters, spectra, constants, numerical floors and the shared error taxonomy."]

pub mod constants;
pub mod errors;
pub mod floors;
/// Cosmological and modulation parameter records.
pub mod params;
pub mod provenance;
/// Validated `(k, P(k))` tables.
pub mod spectrum;

pub use constants::{PhiConstants, SPEED_OF_LIGHT_KM_S};
pub use errors::{ensure_same_len, ErrorInfo, PhiError};
pub use params::{CosmologicalParameters, ModulationParameters};
pub use provenance::{commit_string, SchemaVersion};
pub use spectrum::Spectrum;
