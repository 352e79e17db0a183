use crate::error::{constants, ProtocolError, Result};
use crate::protocol::events::ServerEvent;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

type HandlerFn = dyn Fn(&ServerEvent) + Send + Sync + 'static;

/// Subscribes to every event.
pub const WILDCARD: &str = "*";

/// Event dispatcher keyed by event name.
///
/// A key is an exact event name (`player.onJoin`), a namespace wildcard
/// (`player.*`) or the global wildcard (`*`).
#[derive(Clone)]
pub struct EventDispatcher {
    handlers: Arc<RwLock<HashMap<Cow<'static, str>, Vec<Arc<HandlerFn>>>>>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn register<F>(&self, key: &str, handler: F) -> Result<()>
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        let mut handlers = self.handlers.write().map_err(|_| {
            ProtocolError::Custom(constants::ERR_DISPATCHER_WRITE_LOCK.to_string())
        })?;

        handlers
            .entry(Cow::Owned(key.to_string()))
            .or_default()
            .push(Arc::new(handler));
        Ok(())
    }

    pub fn register_any<F>(&self, handler: F) -> Result<()>
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        self.register(WILDCARD, handler)
    }

    /// Invoke every matching handler. Returns how many ran.
    ///
    /// Handlers run after the lock is released, so a handler may register more.
    pub fn dispatch(&self, event: &ServerEvent) -> Result<usize> {
        let matched: Vec<Arc<HandlerFn>> = {
            let handlers = self.handlers.read().map_err(|_| {
                ProtocolError::Custom(constants::ERR_DISPATCHER_READ_LOCK.to_string())
            })?;
            subscription_keys(&event.name)
                .iter()
                .filter_map(|key| handlers.get(key.as_ref()))
                .flatten()
                .cloned()
                .collect()
        };

        for handler in &matched {
            handler(event);
        }
        Ok(matched.len())
    }

    pub fn has_subscribers(&self) -> bool {
        self.handlers.read().map(|h| !h.is_empty()).unwrap_or(false)
    }
}

/// Keys that match an event name, most specific first.
/// Exact and global keys borrow; namespace keys are built per dot.
#[inline]
fn subscription_keys(name: &str) -> Vec<Cow<'_, str>> {
    let mut keys = vec![Cow::Borrowed(name)];
    keys.extend(
        name.match_indices('.')
            .map(|(idx, _)| Cow::Owned(format!("{}.*", &name[..idx]))),
    );
    keys.push(Cow::Borrowed(WILDCARD));
    keys
}
