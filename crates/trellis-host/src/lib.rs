//! Trellis host model
//!
//! The typed host object model the interop bridge works against, plus the seam to the
//! scripting runtime.
//!
//! | Module      | Contents                                                     |
//! |-------------|--------------------------------------------------------------|
//! | `types`     | [`HostType`], modifiers, assignability, virtual lookup       |
//! | `member`    | [`HostMethod`], [`HostConstructor`], [`HostField`]           |
//! | `builder`   | [`ClassBuilder`] and member definitions                      |
//! | `builtins`  | root class, strings, boxed numerics, `Class`, `List`         |
//! | `object`    | [`HostObject`] and [`HostArray`] instances                   |
//! | `value`     | [`Value`], the currency exchanged across the bridge          |
//! | `runtime`   | [`ScriptRuntime`], everything the bridge asks of the runtime |
//! | `memory`    | [`MemoryRuntime`], an in-process runtime for embedder tests  |
//! | `error`     | [`InteropError`] and [`ErrorKind`]                           |
//!
//! # Example
//!
//! ```ignore
//! use trellis_host::{builtins, ClassBuilder, MethodDefinition, Value};
//!
//! let calc = ClassBuilder::class("demo.Calc")
//!     .method(
//!         MethodDefinition::new("twice")
//!             .param(builtins::int())
//!             .returns(builtins::int())
//!             .body(|_, args| Ok(Value::Int(args[0].as_i64().unwrap_or(0) as i32 * 2))),
//!     )
//!     .build();
//! ```

#![warn(missing_docs)]

pub mod builder;
pub mod builtins;
pub mod error;
pub mod member;
pub mod memory;
pub mod object;
pub mod runtime;
pub mod types;
pub mod value;

pub use builder::{ClassBuilder, ConstructorDefinition, FieldDefinition, MethodDefinition};
pub use error::{ErrorKind, InteropError, InteropResult};
pub use member::{ConstructorBody, HostConstructor, HostField, HostMethod, MethodBody};
pub use memory::{MemoryRuntime, NativeFunction};
pub use object::{HostArray, HostObject};
pub use runtime::{ContextToken, PrimitiveHint, ScriptRuntime};
pub use types::{HostType, Modifiers, PrimitiveKind, TypeId, TypeKind, WeakHostType};
pub use value::{LazyString, ScriptRef, Value};
