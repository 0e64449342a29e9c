pub mod loader;

pub use loader::{
    AgeCoefficientRecord, BracketRecord, ExemptionRecord, ParameterRecord, RuleDataLoader,
    RuleLoaderError,
};
