//! Trellis bridge
//!
//! Lets script code call into the typed host model and implement host types with script
//! objects.
//!
//! | Module     | Role                                                                   |
//! |------------|------------------------------------------------------------------------|
//! | `convert`  | guarded converters grouped into Identity, Default and Forcing tiers    |
//! | `catalog`  | per-type member catalog: overload sets, bean accessors, inner types     |
//! | `resolve`  | tiered overload resolution with specificity tie-breaks                 |
//! | `adapter`  | adapter generation, the adapter registry and their runtime services    |
//! | `interop`  | [`Interop`], the facade a scripting runtime calls into                 |
//! | `options`  | [`InteropOptions`], loadable from TOML                                 |
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use trellis_bridge::{Interop, Tier};
//! use trellis_host::{builtins, MemoryRuntime, Value};
//!
//! let interop = Interop::new(Arc::new(MemoryRuntime::new()));
//! let widened = interop.convert_argument(Value::Int(5), builtins::double(), Tier::Default)?;
//! assert_eq!(widened, Value::Double(5.0));
//! ```

#![warn(missing_docs)]

pub mod adapter;
pub mod catalog;
pub mod convert;
pub mod interop;
pub mod options;
pub mod resolve;

pub use adapter::{AdapterKey, AdapterLoader, AdapterSpec, GeneratedAdapterType};
pub use catalog::{CatalogEntry, HostCatalog, HostMember};
pub use convert::{convert_argument, ConversionEnv, Converter, Tier};
pub use interop::Interop;
pub use options::{ConfigError, InteropOptions};
pub use resolve::{OverloadResolver, Resolution};
