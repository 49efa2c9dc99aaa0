pub use ::strata_core::*;
