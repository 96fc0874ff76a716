//! Command routing and the one-response-per-id contract.
//!
//! An inbound command is resolved in this order:
//!
//! 1. the static override table, by full method name (`"Page.canScreencast"`);
//! 2. the domain registry: split on the first `.`, look the domain up, and
//!    check the method against the handler's declared method set.
//!
//! Anything that resolves nowhere is logged and dropped without a response.
//!
//! Whatever resolves is answered through a [`Reply`], which is consumed by
//! [`Reply::complete`]; a command therefore cannot be answered twice.  A
//! command without an id is executed but never answered.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::application::errors::{AgentError, DispatchError};
use crate::application::ports::FrontendChannel;
use crate::domain::messages::{split_method, Command, Response};

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// `Ok(None)`: success with no `result` field.  `Ok(Some(v))`: `result: v`.
pub type HandlerResult = Result<Option<Value>, AgentError>;

/// One front-end domain (`Debugger`, `Runtime`, ...).
#[async_trait]
pub trait DomainHandler: Send + Sync {
    /// Every method name this handler accepts, without the domain prefix.
    fn methods(&self) -> Vec<&'static str>;

    /// Runs one method.  Only called with a name from [`methods`](Self::methods).
    async fn invoke(&self, method: &str, params: Value) -> HandlerResult;
}

/// What [`Dispatcher::dispatch`] did with a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Exactly one response was sent.
    Responded,
    /// The command had no id; nothing was sent.
    Suppressed,
    /// The command had no id but its handler produced a result, which was
    /// logged and dropped.
    ResultDiscarded,
    /// No override, domain or method matched; nothing was sent.
    Unroutable,
}

/// Canned answer for a method handled without a domain.
#[derive(Debug, Clone, PartialEq)]
pub enum StaticReply {
    /// `result: {}`.
    Empty,
    Fixed(Value),
}

impl StaticReply {
    fn result(&self) -> Value {
        match self {
            StaticReply::Empty => json!({}),
            StaticReply::Fixed(value) => value.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct StaticOverride {
    method: String,
    reply: StaticReply,
}

struct RegisteredDomain {
    handler: Arc<dyn DomainHandler>,
    methods: BTreeSet<&'static str>,
}

// ── Reply ─────────────────────────────────────────────────────────────────────

/// The completion handle for one command.
pub struct Reply {
    id: Option<Value>,
    method: String,
    frontend: Arc<dyn FrontendChannel>,
}

impl Reply {
    fn new(command_id: Option<Value>, method: &str, frontend: Arc<dyn FrontendChannel>) -> Self {
        Self {
            id: command_id,
            method: method.to_string(),
            frontend,
        }
    }

    /// Sends the response for this command, if it carried an id.
    pub fn complete(self, result: HandlerResult) -> DispatchOutcome {
        match (self.id, result) {
            (Some(id), Ok(result)) => {
                self.frontend.send_response(Response::success(id, result));
                DispatchOutcome::Responded
            }
            (Some(id), Err(e)) => {
                debug!(target: DISPATCH_TARGET, method = %self.method, "command failed: {e}");
                self.frontend.send_response(Response::failure(id, e.to_string()));
                DispatchOutcome::Responded
            }
            (None, Ok(Some(value))) if !value.is_null() => {
                warn!(
                    target: DISPATCH_TARGET,
                    method = %self.method,
                    "notification produced a result; discarding it: {value}"
                );
                DispatchOutcome::ResultDiscarded
            }
            (None, Ok(_)) => DispatchOutcome::Suppressed,
            (None, Err(e)) => {
                warn!(target: DISPATCH_TARGET, method = %self.method, "notification failed: {e}");
                DispatchOutcome::Suppressed
            }
        }
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

/// Routes front-end commands to domain handlers or static replies.
///
/// Build it, register everything, then share it behind an `Arc`;
/// [`dispatch`](Self::dispatch) only needs `&self`.
pub struct Dispatcher {
    frontend: Arc<dyn FrontendChannel>,
    domains: HashMap<String, RegisteredDomain>,
    overrides: Vec<StaticOverride>,
}

impl Dispatcher {
    pub fn new(frontend: Arc<dyn FrontendChannel>) -> Self {
        Self {
            frontend,
            domains: HashMap::new(),
            overrides: Vec::new(),
        }
    }

    /// Registers `handler` for `domain`, replacing any earlier handler.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the handler declares no methods or the
    /// same method twice; the registry is left unchanged.
    pub fn register_domain(
        &mut self,
        domain: &str,
        handler: Arc<dyn DomainHandler>,
    ) -> Result<(), DispatchError> {
        let declared = handler.methods();
        if declared.is_empty() {
            return Err(DispatchError::EmptyMethodSet {
                domain: domain.to_string(),
            });
        }
        let mut methods = BTreeSet::new();
        for method in declared {
            if !methods.insert(method) {
                return Err(DispatchError::DuplicateMethod {
                    domain: domain.to_string(),
                    method: method.to_string(),
                });
            }
        }

        debug!(target: DISPATCH_TARGET, domain, methods = methods.len(), "domain registered");
        self.domains
            .insert(domain.to_string(), RegisteredDomain { handler, methods });
        Ok(())
    }

    /// Answers `method` with an empty result object.
    pub fn register_noop(&mut self, method: &str) {
        self.register_override(method, StaticReply::Empty);
    }

    /// Answers `method` with `result`.
    pub fn register_query(&mut self, method: &str, result: Value) {
        self.register_override(method, StaticReply::Fixed(result));
    }

    /// `true` if `method` is answered by the override table.
    pub fn has_override(&self, method: &str) -> bool {
        self.overrides.iter().any(|o| o.method == method)
    }

    /// Routes and runs one command.
    pub async fn dispatch(&self, command: Command) -> DispatchOutcome {
        let Command { id, method, params } = command;

        if let Some(entry) = self.overrides.iter().find(|o| o.method == method) {
            debug!(target: DISPATCH_TARGET, method = %method, "answered by static override");
            return Reply::new(id, &method, Arc::clone(&self.frontend))
                .complete(Ok(Some(entry.reply.result())));
        }

        let Some((domain, name)) = split_method(&method) else {
            warn!(target: DISPATCH_TARGET, method = %method, "malformed method name; dropping command");
            return DispatchOutcome::Unroutable;
        };
        let Some(registered) = self.domains.get(domain) else {
            warn!(target: DISPATCH_TARGET, domain, method = %method, "unknown domain; dropping command");
            return DispatchOutcome::Unroutable;
        };
        if !registered.methods.contains(name) {
            warn!(target: DISPATCH_TARGET, domain, method = %method, "unknown method; dropping command");
            return DispatchOutcome::Unroutable;
        }

        debug!(target: DISPATCH_TARGET, domain, operation = name, "routing command");
        let reply = Reply::new(id, &method, Arc::clone(&self.frontend));
        let result = registered.handler.invoke(name, params).await;
        reply.complete(result)
    }

    /// Replaces an existing entry in place, keeping the table's order.
    fn register_override(&mut self, method: &str, reply: StaticReply) {
        match self.overrides.iter_mut().find(|o| o.method == method) {
            Some(existing) => existing.reply = reply,
            None => self.overrides.push(StaticOverride {
                method: method.to_string(),
                reply,
            }),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
