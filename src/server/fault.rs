// Copyright 2014-2015 Galen Clark Haynes
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

// Rust XML-RPC library

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::error::Error;
use crate::fault::{Fault, UNKNOWN_CODE, UNKNOWN_ERROR};

/// Kind of the errors raised by the server itself.
pub const SERVER_KIND: &str = "xmlrpc.server";

/// Kind given to crate errors surfacing in a handler.
pub const LIBRARY_KIND: &str = "xmlrpc.error";

/// An error returned by a method handler.
///
/// The dotted `kind` decides whether the code and message reach the
/// caller: only kinds attached to the server's [`FaultRegistry`], or
/// nested below one, are passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodError {
    kind: String,
    code: i32,
    message: String,
}

impl MethodError {
    pub fn new(kind: &str, code: i32, message: &str) -> MethodError {
        MethodError { kind: kind.to_string(), code, message: message.to_string() }
    }

    pub fn server(code: i32, message: &str) -> MethodError {
        MethodError::new(SERVER_KIND, code, message)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// True for `kind` itself and any kind nested below it.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
            || (self.kind.starts_with(kind) && self.kind.as_bytes().get(kind.len()) == Some(&b'.'))
    }
}

impl fmt::Display for MethodError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

impl StdError for MethodError {}

impl From<Error> for MethodError {
    fn from(err: Error) -> MethodError {
        let code = err.code().unwrap_or(UNKNOWN_CODE);
        MethodError::new(LIBRARY_KIND, code, &err.to_string())
    }
}

/// Told about every fault the server produces from a handler error.
pub trait FaultObserver: Send + Sync {
    fn observe(&self, fault: &Fault, error: &MethodError);
}

/// Which handler errors become faults with their own code and message,
/// and who is told about them.
pub struct FaultRegistry {
    kinds: RwLock<Vec<String>>,
    observers: RwLock<Vec<(String, Arc<dyn FaultObserver>)>>,
}

impl Default for FaultRegistry {
    fn default() -> FaultRegistry {
        FaultRegistry {
            kinds: RwLock::new(vec![SERVER_KIND.to_string()]),
            observers: RwLock::new(Vec::new()),
        }
    }
}

impl fmt::Debug for FaultRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let observers: Vec<String> = self.observers.read().iter().map(|o| o.0.clone()).collect();
        f.debug_struct("FaultRegistry")
            .field("kinds", &*self.kinds.read())
            .field("observers", &observers)
            .finish()
    }
}

impl FaultRegistry {
    pub fn new() -> FaultRegistry {
        FaultRegistry::default()
    }

    pub fn attach_fault_kind(&self, kind: &str) {
        let mut kinds = self.kinds.write();
        if !kinds.iter().any(|k| k == kind) {
            kinds.push(kind.to_string());
        }
    }

    pub fn detach_fault_kind(&self, kind: &str) {
        self.kinds.write().retain(|k| k != kind);
    }

    /// Registers `observer` under `name`; false for an empty name.
    pub fn attach_observer(&self, name: &str, observer: Arc<dyn FaultObserver>) -> bool {
        if name.is_empty() {
            return false;
        }
        let mut observers = self.observers.write();
        if !observers.iter().any(|o| o.0 == name) {
            observers.push((name.to_string(), observer));
        }
        true
    }

    /// False when nothing was registered under `name`.
    pub fn detach_observer(&self, name: &str) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|o| o.0 != name);
        observers.len() != before
    }

    pub fn is_allowed(&self, error: &MethodError) -> bool {
        self.kinds.read().iter().any(|kind| error.is_kind(kind))
    }

    /// The fault sent back for `error`.
    pub fn translate(&self, error: &MethodError) -> Fault {
        let fault = if self.is_allowed(error) {
            Fault::new(error.code, &error.message)
        } else {
            Fault::new(UNKNOWN_CODE, UNKNOWN_ERROR)
        };
        debug!("fault {} for {} error: {}", fault.code(), error.kind, error.message);

        // Observers run without the lock held, so they may attach or detach.
        let observers: Vec<Arc<dyn FaultObserver>> =
            self.observers.read().iter().map(|o| o.1.clone()).collect();
        for observer in observers {
            observer.observe(&fault, error);
        }
        fault
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Weak;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(i32, String)>>,
    }

    impl FaultObserver for Recorder {
        fn observe(&self, fault: &Fault, _: &MethodError) {
            self.seen.lock().push((fault.code(), fault.message().to_string()));
        }
    }

    #[test]
    fn test_server_errors_pass_through() {
        let registry = FaultRegistry::new();
        let fault = registry.translate(&MethodError::server(411, "Testing fault"));
        assert_eq!(411, fault.code());
        assert_eq!("Testing fault", fault.message());
    }

    #[test]
    fn test_unregistered_kind_is_hidden() {
        let registry = FaultRegistry::new();
        let error = MethodError::new("app.db", 411, "password=hunter2");
        let fault = registry.translate(&error);
        assert_eq!(404, fault.code());
        assert_eq!("Unknown Error", fault.message());
        assert_eq!(Fault::new(404, ""), fault);

        registry.attach_fault_kind("app");
        assert_eq!(411, registry.translate(&error).code());

        registry.detach_fault_kind("app");
        assert_eq!(404, registry.translate(&error).code());
    }

    #[test]
    fn test_nested_kinds() {
        let error = MethodError::new("app.db.timeout", 1, "slow");
        assert!(error.is_kind("app"));
        assert!(error.is_kind("app.db"));
        assert!(error.is_kind("app.db.timeout"));
        assert!(!error.is_kind("app.d"));
        assert!(!error.is_kind("other"));
    }

    #[test]
    fn test_observers() {
        let registry = FaultRegistry::new();
        let recorder = Arc::new(Recorder::default());
        assert!(registry.attach_observer("recorder", recorder.clone()));
        assert!(!registry.attach_observer("", recorder.clone()));

        registry.translate(&MethodError::server(411, "Checking observers"));
        assert_eq!(vec![(411, "Checking observers".to_string())], *recorder.seen.lock());

        assert!(registry.detach_observer("recorder"));
        assert!(!registry.detach_observer("recorder"));
        registry.translate(&MethodError::server(411, "Checking observers"));
        assert_eq!(1, recorder.seen.lock().len());
    }

    /// Detaches itself the first time it sees a fault.
    struct OneShot {
        registry: Weak<FaultRegistry>,
        seen: Mutex<usize>,
    }

    impl FaultObserver for OneShot {
        fn observe(&self, _: &Fault, _: &MethodError) {
            *self.seen.lock() += 1;
            if let Some(registry) = self.registry.upgrade() {
                registry.detach_observer("one-shot");
                registry.attach_fault_kind("app");
            }
        }
    }

    #[test]
    fn test_observer_may_modify_registry() {
        let registry = Arc::new(FaultRegistry::new());
        let observer = Arc::new(OneShot { registry: Arc::downgrade(&registry), seen: Mutex::new(0) });
        registry.attach_observer("one-shot", observer.clone());

        let error = MethodError::new("app.db", 411, "locked");
        assert_eq!(404, registry.translate(&error).code());
        assert_eq!(411, registry.translate(&error).code());
        assert_eq!(1, *observer.seen.lock());
    }

    #[test]
    fn test_from_crate_error() {
        let error = MethodError::from(Error::Fault { code: 700, message: "remote".to_string() });
        assert_eq!(LIBRARY_KIND, error.kind());
        assert_eq!(700, error.code());
        assert_eq!("remote", error.message());
    }
}
