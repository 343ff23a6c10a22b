//! Event dispatcher
//!
//! Listeners register under either a named event (`open`, `close`, `error`)
//! or a literal OSC address. Incoming addresses are treated as patterns and
//! matched against every registered address:
//!
//! ```text
//! registered:  /mixer/1/gain   /mixer/2/gain   /mixer/2/pan
//! incoming:    /mixer/*/gain   ──► first two listeners fire
//! ```
//!
//! Messages carrying a future timetag are delivered later on a timer; late
//! messages are delivered at once or dropped depending on
//! [`OscOptions::discard_late_messages`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use oscwire_core::address::validate_literal;
use oscwire_core::timetag::now_millis;
use oscwire_core::{Argument, Bundle, Error, Message, Packet, Pattern, Timetag, ToAddress};
use oscwire_transport::TransportEvent;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::options::OscOptions;

/// Compiled incoming patterns kept before the cache is flushed
const PATTERN_CACHE_LIMIT: usize = 1024;

/// Fixed named events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Open,
    Close,
    Error,
}

impl EventKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "open" => Some(EventKind::Open),
            "close" => Some(EventKind::Close),
            "error" => Some(EventKind::Error),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Open => "open",
            EventKind::Close => "close",
            EventKind::Error => "error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a listener subscribes to, or what a notification is addressed to
///
/// The strings `"open"`, `"close"` and `"error"` name events; any other
/// string or segment list is an OSC address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Event(EventKind),
    Address(String),
}

impl From<EventKind> for Target {
    fn from(kind: EventKind) -> Self {
        Target::Event(kind)
    }
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        match EventKind::from_name(name) {
            Some(kind) => Target::Event(kind),
            None => Target::Address(name.to_address()),
        }
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Target::from(name.as_str())
    }
}

impl From<&String> for Target {
    fn from(name: &String) -> Self {
        Target::from(name.as_str())
    }
}

impl<S: AsRef<str>, const N: usize> From<[S; N]> for Target {
    fn from(segments: [S; N]) -> Self {
        Target::Address(segments.to_address())
    }
}

impl<S: AsRef<str>> From<&[S]> for Target {
    fn from(segments: &[S]) -> Self {
        Target::Address(segments.to_address())
    }
}

impl<S: AsRef<str>> From<Vec<S>> for Target {
    fn from(segments: Vec<S>) -> Self {
        Target::Address(segments.to_address())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Event(kind) => kind.fmt(f),
            Target::Address(address) => f.write_str(address),
        }
    }
}

/// Payload handed to listeners
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    None,
    Message(Message),
    Error(String),
    Args(Vec<Argument>),
}

impl EventData {
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            EventData::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Arguments of a message payload, or the bare argument list
    pub fn args(&self) -> &[Argument] {
        match self {
            EventData::Message(message) => &message.args,
            EventData::Args(args) => args,
            _ => &[],
        }
    }
}

impl From<Message> for EventData {
    fn from(message: Message) -> Self {
        EventData::Message(message)
    }
}

impl From<Vec<Argument>> for EventData {
    fn from(args: Vec<Argument>) -> Self {
        EventData::Args(args)
    }
}

/// Listener callback
pub type Callback = Arc<dyn Fn(&EventData) + Send + Sync>;

#[derive(Clone)]
struct Handler {
    id: u64,
    callback: Callback,
}

#[derive(Default)]
struct Registry {
    events: HashMap<EventKind, Vec<Handler>>,
    addresses: BTreeMap<String, Vec<Handler>>,
}

struct Inner {
    options: OscOptions,
    registry: RwLock<Registry>,
    next_id: AtomicU64,
    patterns: DashMap<String, Pattern>,
}

/// Subscription registry and dispatcher
///
/// Cheap to clone; clones share listeners. Callbacks run with no internal
/// lock held, so they may call `on`/`off`/`notify` themselves.
#[derive(Clone)]
pub struct EventHandler {
    inner: Arc<Inner>,
}

impl EventHandler {
    pub fn new(options: OscOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                options,
                registry: RwLock::new(Registry::default()),
                next_id: AtomicU64::new(1),
                patterns: DashMap::new(),
            }),
        }
    }

    pub fn options(&self) -> &OscOptions {
        &self.inner.options
    }

    /// Register a listener, returning its subscription id
    ///
    /// Addresses must be literal; pattern characters are rejected here since
    /// patterns arrive with incoming messages.
    pub fn on<F>(&self, target: impl Into<Target>, callback: F) -> Result<u64>
    where
        F: Fn(&EventData) + Send + Sync + 'static,
    {
        let target = target.into();
        if let Target::Address(address) = &target {
            validate_literal(address)?;
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let handler = Handler {
            id,
            callback: Arc::new(callback),
        };

        let mut registry = self.inner.registry.write();
        match target {
            Target::Event(kind) => registry.events.entry(kind).or_default().push(handler),
            Target::Address(address) => {
                debug!("Listening on {} (id {})", address, id);
                registry.addresses.entry(address).or_default().push(handler)
            }
        }

        Ok(id)
    }

    /// Remove a listener; false if no listener with that id was registered there
    pub fn off(&self, target: impl Into<Target>, id: u64) -> bool {
        let mut registry = self.inner.registry.write();
        let handlers = match target.into() {
            Target::Event(kind) => registry.events.get_mut(&kind),
            Target::Address(address) => registry.addresses.get_mut(&address),
        };

        let Some(handlers) = handlers else {
            return false;
        };
        match handlers.iter().position(|h| h.id == id) {
            Some(index) => {
                handlers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of listeners across all events and addresses
    pub fn listener_count(&self) -> usize {
        let registry = self.inner.registry.read();
        registry.events.values().map(Vec::len).sum::<usize>()
            + registry.addresses.values().map(Vec::len).sum::<usize>()
    }

    /// Deliver `data` to listeners of `target`, honoring an optional
    /// delivery time in Unix milliseconds
    ///
    /// Returns true if a listener fired or delivery was scheduled.
    pub fn notify(&self, target: impl Into<Target>, data: EventData, timestamp: Option<i64>) -> bool {
        let target = target.into();

        let Some(timestamp) = timestamp else {
            return self.call(&target, &data);
        };

        let now = now_millis();
        if timestamp < now {
            if self.inner.options.discard_late_messages {
                warn!("Discarding late message for {} ({} ms late)", target, now - timestamp);
                return false;
            }
            return self.call(&target, &data);
        }

        let delay = Duration::from_millis((timestamp - now) as u64);
        debug!("Scheduling {} in {:?}", target, delay);
        self.schedule(target, data, delay);
        true
    }

    /// Deliver a message to its address, scheduled by its bundle timetag
    pub fn notify_message(&self, message: Message) -> bool {
        let timestamp = message.timetag.and_then(|tag| tag.scheduled_at());
        let target = Target::Address(message.address.clone());
        self.notify(target, EventData::Message(message), timestamp)
    }

    /// Decode raw bytes and dispatch the packet
    ///
    /// Malformed packets are reported to `error` listeners and dropped.
    pub fn notify_bytes(&self, data: &[u8]) -> bool {
        let outcome = Packet::decode(data)
            .map_err(ClientError::from)
            .and_then(|packet| self.dispatch(&packet));

        match outcome {
            Ok(delivered) => delivered,
            Err(e) => {
                warn!("Dropping packet of {} bytes: {}", data.len(), e);
                self.call(&Target::Event(EventKind::Error), &EventData::Error(e.to_string()));
                false
            }
        }
    }

    /// Route a plugin event into the dispatcher
    pub fn notify_event(&self, event: TransportEvent) -> bool {
        match event {
            TransportEvent::Connected => self.call(&EventKind::Open.into(), &EventData::None),
            TransportEvent::Disconnected { .. } => {
                self.call(&EventKind::Close.into(), &EventData::None)
            }
            TransportEvent::Data(data) => self.notify_bytes(&data),
            TransportEvent::Error(message) => {
                self.call(&EventKind::Error.into(), &EventData::Error(message))
            }
        }
    }

    /// Dispatch a decoded packet
    ///
    /// Bundles are checked for timetag ordering before anything is delivered,
    /// so an ordering error leaves every listener untouched.
    pub fn dispatch(&self, packet: &Packet) -> Result<bool> {
        if let Packet::Bundle(bundle) = packet {
            check_ordering(bundle)?;
        }
        Ok(self.dispatch_unchecked(packet, None))
    }

    fn dispatch_unchecked(&self, packet: &Packet, enclosing: Option<Timetag>) -> bool {
        match packet {
            Packet::Message(message) => {
                let mut message = message.clone();
                if message.timetag.is_none() {
                    message.timetag = enclosing;
                }
                self.notify_message(message)
            }
            Packet::Bundle(bundle) => {
                let mut delivered = false;
                for element in &bundle.elements {
                    delivered |= self.dispatch_unchecked(element, Some(bundle.timetag));
                }
                delivered
            }
        }
    }

    /// Invoke every listener registered for `target` right now
    ///
    /// For addresses, the target is compiled as a pattern and matched against
    /// each registered address. Returns true if at least one listener fired.
    pub fn call(&self, target: &Target, data: &EventData) -> bool {
        let callbacks: Vec<Callback> = match target {
            Target::Event(kind) => {
                let registry = self.inner.registry.read();
                registry
                    .events
                    .get(kind)
                    .map(|handlers| handlers.iter().map(|h| h.callback.clone()).collect())
                    .unwrap_or_default()
            }
            Target::Address(address) => {
                let Some(pattern) = self.pattern(address) else {
                    return false;
                };
                let registry = self.inner.registry.read();
                registry
                    .addresses
                    .iter()
                    .filter(|(registered, _)| pattern.matches(registered))
                    .flat_map(|(_, handlers)| handlers.iter().map(|h| h.callback.clone()))
                    .collect()
            }
        };

        for callback in &callbacks {
            callback(data);
        }

        !callbacks.is_empty()
    }

    fn pattern(&self, address: &str) -> Option<Pattern> {
        if let Some(cached) = self.inner.patterns.get(address) {
            return Some(cached.clone());
        }

        match Pattern::compile(address) {
            Ok(pattern) => {
                if self.inner.patterns.len() >= PATTERN_CACHE_LIMIT {
                    self.inner.patterns.clear();
                }
                self.inner
                    .patterns
                    .insert(address.to_string(), pattern.clone());
                Some(pattern)
            }
            Err(e) => {
                warn!("Ignoring unmatchable address {}: {}", address, e);
                None
            }
        }
    }

    fn schedule(&self, target: Target, data: EventData, delay: Duration) {
        let handler = self.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    handler.call(&target, &data);
                });
            }
            Err(_) => {
                std::thread::spawn(move || {
                    std::thread::sleep(delay);
                    handler.call(&target, &data);
                });
            }
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new(OscOptions::default())
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler")
            .field("options", &self.inner.options)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Reject bundles enclosing a bundle scheduled earlier than themselves
fn check_ordering(bundle: &Bundle) -> std::result::Result<(), Error> {
    for element in &bundle.elements {
        if let Packet::Bundle(inner) = element {
            if let (Some(outer), Some(nested)) =
                (bundle.timetag.scheduled_at(), inner.timetag.scheduled_at())
            {
                if outer > nested {
                    return Err(Error::Ordering {
                        outer,
                        inner: nested,
                    });
                }
            }
            check_ordering(inner)?;
        }
    }
    Ok(())
}
