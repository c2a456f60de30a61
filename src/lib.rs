//! Probabilistic forecasting modules on Burn.
//!
//! Each model declares its inputs through [`model::ForecastModule`], so a zero
//! batch can be built with [`util::construct_batch`] and the outputs checked
//! with [`util::assert_shapes_and_dtypes`].
pub mod constants;
pub mod error;
pub mod features;
pub mod model;
pub mod nn;
pub mod util;

/// Build-time package information.
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub use error::{ModuleError, ShapeCheckError};
pub use model::ForecastModule;
