//! Wire envelope exchanged with an Isomer server.
//!
//! Every message in either direction is a JSON object of the form
//! `{"component": ..., "action": ..., "data": ...}`. This module builds the
//! outbound templates the client knows about and recognizes the one inbound
//! signal it reacts to.
//!
//! Outbound payloads use typed `data` structs so fields serialize in
//! declaration order; inbound frames decode into `Envelope<Value>`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::{
    AUTH_COMPONENT, AUTH_FAIL_ACTION, AUTH_REPLY_COMPONENT, LOGIN_ACTION,
    OBJECT_MANAGER_COMPONENT, SEARCH_ACTION,
};

/// Standard `{component, action, data}` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<D = Value> {
    /// Dotted name of the addressed (or sending) component.
    pub component: String,
    /// Action within the component.
    pub action: String,
    /// Payload; absent in some server replies.
    #[serde(default)]
    pub data: D,
}

/// Credentials sent with the login envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginData {
    /// Account name.
    pub username: String,
    /// Plain password; the transport is expected to be `wss` for real use.
    pub password: String,
}

/// Payload of an object-manager search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchData {
    /// Schema the searched objects belong to.
    pub schema: String,
    /// Filter object matched against stored objects.
    pub search: Value,
    /// Client-assigned request id echoed by the server.
    pub req: u64,
}

impl<D> Envelope<D> {
    /// Create an envelope from parts.
    #[must_use]
    pub fn new(component: impl Into<String>, action: impl Into<String>, data: D) -> Self {
        Self {
            component: component.into(),
            action: action.into(),
            data,
        }
    }
}

impl Envelope<LoginData> {
    /// Login request carrying the user's credentials.
    #[must_use]
    pub fn login(username: &str, password: &str) -> Self {
        Self::new(
            AUTH_COMPONENT,
            LOGIN_ACTION,
            LoginData {
                username: username.to_string(),
                password: password.to_string(),
            },
        )
    }
}

impl Envelope<SearchData> {
    /// Object-manager search for `schema` objects matching `filter`.
    #[must_use]
    pub fn search(schema: &str, filter: Value, req: u64) -> Self {
        Self::new(
            OBJECT_MANAGER_COMPONENT,
            SEARCH_ACTION,
            SearchData {
                schema: schema.to_string(),
                search: filter,
                req,
            },
        )
    }
}

impl Envelope<Value> {
    /// Returns `true` for the server's "login rejected" reply.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        self.component == AUTH_REPLY_COMPONENT && self.action == AUTH_FAIL_ACTION
    }

    /// Request id echoed in `data.req`, if any.
    #[must_use]
    pub fn request_id(&self) -> Option<u64> {
        self.data.get("req").and_then(Value::as_u64)
    }
}
