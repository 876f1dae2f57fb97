//! Location source contract.
//!
//! Provides the abstraction over the platform geolocation provider, plus a
//! scripted source for development and testing.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::errors::LocationError;
use crate::models::Position;

/// Source of the device's current position.
#[async_trait::async_trait]
pub trait LocationSource: Send + Sync {
    /// Return the most recent fix available.
    ///
    /// Asks for permission first when the platform requires it; a refusal
    /// is reported as [`LocationError::PermissionDenied`] and never retried.
    async fn fetch_current_position(&self) -> Result<Position, LocationError>;
}

/// Location source that replays a scripted sequence of fixes.
///
/// Once the script runs out, the last fix keeps being returned.
#[derive(Debug, Default)]
pub struct ScriptedLocationSource {
    inner: Mutex<ScriptState>,
}

#[derive(Debug, Default)]
struct ScriptState {
    queued: VecDeque<Position>,
    last: Option<Position>,
    deny_permission: bool,
    calls: usize,
}

impl ScriptedLocationSource {
    /// Create a source that replays `fixes` in order.
    pub fn new(fixes: impl IntoIterator<Item = Position>) -> Self {
        Self {
            inner: Mutex::new(ScriptState {
                queued: fixes.into_iter().collect(),
                ..ScriptState::default()
            }),
        }
    }

    /// Create a source that always returns the same fix.
    pub fn fixed(position: Position) -> Self {
        Self::new([position])
    }

    /// Create a source whose permission prompt is always refused.
    pub fn denied() -> Self {
        let source = Self::default();
        source.set_permission_denied(true);
        source
    }

    /// Append fixes to the end of the script.
    pub fn push(&self, fixes: impl IntoIterator<Item = Position>) {
        let mut state = self.lock();
        state.queued.extend(fixes);
    }

    pub fn set_permission_denied(&self, denied: bool) {
        self.lock().deny_permission = denied;
    }

    /// Number of times a position was requested.
    pub fn calls(&self) -> usize {
        self.lock().calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl LocationSource for ScriptedLocationSource {
    async fn fetch_current_position(&self) -> Result<Position, LocationError> {
        let mut state = self.lock();
        state.calls += 1;

        if state.deny_permission {
            return Err(LocationError::PermissionDenied);
        }

        if let Some(next) = state.queued.pop_front() {
            state.last = Some(next);
        }

        state
            .last
            .ok_or_else(|| LocationError::Unavailable("no fix available".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_source_replays_then_repeats_last() {
        let source = ScriptedLocationSource::new([Position::new(1.0, 1.0), Position::new(2.0, 2.0)]);

        assert_eq!(
            source.fetch_current_position().await,
            Ok(Position::new(1.0, 1.0))
        );
        assert_eq!(
            source.fetch_current_position().await,
            Ok(Position::new(2.0, 2.0))
        );
        assert_eq!(
            source.fetch_current_position().await,
            Ok(Position::new(2.0, 2.0))
        );
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test]
    async fn test_empty_script_is_unavailable() {
        let source = ScriptedLocationSource::default();
        assert!(matches!(
            source.fetch_current_position().await,
            Err(LocationError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_denied_source() {
        let source = ScriptedLocationSource::denied();
        assert_eq!(
            source.fetch_current_position().await,
            Err(LocationError::PermissionDenied)
        );

        source.set_permission_denied(false);
        source.push([Position::new(3.0, 4.0)]);
        assert_eq!(
            source.fetch_current_position().await,
            Ok(Position::new(3.0, 4.0))
        );
    }
}
