//! ScriptRuntime trait: operations the bridge consumes from the scripting runtime
//!
//! The bridge never looks inside script objects. Everything it needs (callability checks,
//! property access, calls and the language's own primitive coercions) goes through this
//! trait, which the embedding runtime implements.

use std::sync::Arc;

use crate::error::InteropResult;
use crate::value::Value;

/// Preferred result type for [`ScriptRuntime::to_primitive`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveHint {
    /// Prefer a number (`valueOf` first)
    Number,
    /// Prefer a string (`toString` first)
    String,
}

/// Opaque marker for a previously active execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextToken(pub u64);

/// Abstract scripting runtime.
///
/// This trait is the single entry point for every script-side operation the bridge performs.
/// Implementations must be shareable across threads; whether a given script object may be
/// touched from several threads is the implementation's business.
pub trait ScriptRuntime: Send + Sync {
    // ========================================================================
    // Predicates
    // ========================================================================

    /// Whether `value` can be called
    fn is_callable(&self, value: &Value) -> bool;

    /// Whether `value` is a script object with named properties (callables included)
    fn is_object(&self, value: &Value) -> bool;

    // ========================================================================
    // Property access
    // ========================================================================

    /// Read a named property, following the prototype chain
    fn get_member(&self, object: &Value, name: &str) -> InteropResult<Value>;

    /// Whether `name` is an own (not inherited) property of `object`
    fn has_own_member(&self, object: &Value, name: &str) -> bool;

    /// Write a named property
    fn set_member(&self, object: &Value, name: &str, value: Value) -> InteropResult<()>;

    // ========================================================================
    // Calls
    // ========================================================================

    /// Enter the runtime's execution context; returns the context to restore afterwards
    fn enter_context(&self) -> ContextToken;

    /// Restore the context returned by the matching [`ScriptRuntime::enter_context`]
    fn leave_context(&self, previous: ContextToken);

    /// Invoke `callable` with `receiver` as `this`
    fn call(&self, callable: &Value, receiver: &Value, args: &[Value]) -> InteropResult<Value>;

    // ========================================================================
    // Language coercions
    // ========================================================================

    /// The language's ToString
    fn to_string(&self, value: &Value) -> InteropResult<Arc<str>>;

    /// The language's ToBoolean
    fn to_boolean(&self, value: &Value) -> bool;

    /// The language's ToNumber
    fn to_number(&self, value: &Value) -> InteropResult<f64>;

    /// The language's ToPrimitive
    fn to_primitive(&self, value: &Value, hint: PrimitiveHint) -> InteropResult<Value>;

    // ========================================================================
    // Host wrappers
    // ========================================================================

    /// If `value` is a script-side wrapper around a host value, return the wrapped value
    fn unwrap_host(&self, value: &Value) -> Option<Value>;
}
