//! Player connection seam used by the playback tracker

use std::future::Future;

use serde_json::Value;

use crate::error::IpcError;

/// An addressable media player that answers property queries.
///
/// Returned futures own everything they need so the tracker can run
/// several requests at once and abandon any of them.
pub trait PlayerConnection: Send + Sync + 'static {
    /// Ask the player for a property value
    fn get_property(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Value, IpcError>> + Send + 'static;

    /// Stop talking to the player; pending requests fail
    fn disconnect(&self) {}
}

/// Read a playback position in seconds out of a property value
pub fn position_from_value(property: &str, value: &Value) -> Result<f64, IpcError> {
    match value.as_f64() {
        Some(seconds) if seconds.is_finite() => Ok(seconds),
        _ => Err(IpcError::UnexpectedValue {
            property: property.to_string(),
            value: value.to_string(),
        }),
    }
}
