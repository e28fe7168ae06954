pub mod lookup;
pub mod serve;

pub use lookup::{lookup, LookupParams, OutputFormat};
pub use serve::{serve, ServeParams};
