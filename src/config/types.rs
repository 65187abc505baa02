use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use super::Duration;
use crate::router::MatchExpr;

/// Top-level route document.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RouteConfig {
    #[serde(default)]
    pub http: Vec<HttpRoute>,

    #[serde(default)]
    pub stream: Vec<StreamRoute>,
}

/// A single HTTP route rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRoute {
    /// Rule name, must be unique within the document.
    pub name: String,

    /// When several rules match the same request, the highest priority wins.
    #[serde(default)]
    pub priority: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<UpstreamTimeout>,

    #[serde(rename = "match")]
    pub matcher: HttpMatch,

    /// Weighted backends; more than one splits traffic downstream.
    #[serde(default)]
    pub backends: Vec<HttpBackend>,

    /// References to externally managed upstream definitions.
    #[serde(default)]
    pub upstreams: Vec<UpstreamRef>,

    #[serde(default)]
    pub websocket: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_config_name: Option<String>,

    #[serde(default)]
    pub plugins: Vec<Plugin>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<Authentication>,
}

/// Match conditions for hitting an HTTP route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpMatch {
    /// URI predicates; a trailing '*' marks a prefix match, e.g. "/foo*".
    pub paths: Vec<String>,

    #[serde(default)]
    pub methods: Vec<String>,

    /// Exact or wildcard domains. Wildcards allow one generic level,
    /// "*.foo.com" but not "*.*.foo.com".
    #[serde(default)]
    pub hosts: Vec<String>,

    /// Client address predicates, plain IPs or CIDR blocks.
    #[serde(default)]
    pub remote_addrs: Vec<String>,

    /// Generic predicates compiled to the proxy's filter clauses.
    #[serde(default)]
    pub exprs: Vec<MatchExpr>,

    /// User-defined matching function, passed through verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_func: Option<String>,
}

/// Read/send/connect timeouts toward the upstream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct UpstreamTimeout {
    #[serde(default)]
    pub connect: Duration,

    #[serde(default)]
    pub send: Duration,

    #[serde(default)]
    pub read: Duration,
}

/// An HTTP backend service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpBackend {
    pub service_name: String,

    pub service_port: ServicePort,

    #[serde(default)]
    pub resolve_granularity: ResolveGranularity,

    #[serde(default = "default_weight")]
    pub weight: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subset: Option<String>,
}

fn default_weight() -> u32 {
    100
}

/// Service port by number or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServicePort {
    Number(u16),
    Name(String),
}

/// How backend addresses are resolved: per-endpoint pod addresses or the
/// service cluster address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResolveGranularity {
    #[default]
    Endpoints,
    Service,
}

/// Reference to an externally managed upstream definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamRef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<u32>,
}

/// A proxy plugin attached to a route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plugin {
    pub name: String,

    /// Whether this plugin is in use, default is true.
    #[serde(default = "default_enable")]
    pub enable: bool,

    /// Free-form plugin configuration.
    #[serde(default)]
    pub config: JsonValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<String>,
}

fn default_enable() -> bool {
    true
}

pub type PluginConfig = HashMap<String, JsonValue>;

/// Authentication attached to a route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authentication {
    #[serde(default)]
    pub enable: bool,

    #[serde(rename = "type")]
    pub auth_type: AuthType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_auth: Option<KeyAuth>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwt_auth: Option<JwtAuth>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ldap_auth: Option<LdapAuth>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    KeyAuth,
    JwtAuth,
    LdapAuth,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct KeyAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JwtAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookie: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LdapAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dn: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ldap_uri: Option<String>,

    #[serde(default)]
    pub use_tls: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
}

/// A level-4 (TCP/UDP) route rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamRoute {
    pub name: String,

    pub protocol: StreamProtocol,

    #[serde(rename = "match")]
    pub matcher: StreamMatch,

    pub backend: StreamBackend,

    #[serde(default)]
    pub plugins: Vec<Plugin>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamProtocol {
    Tcp,
    Udp,
}

/// Match conditions of a stream route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamMatch {
    /// Listening port on the ingress proxy. Must be pre-provisioned, the
    /// proxy does not open listeners dynamically.
    pub ingress_port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// A TCP/UDP backend service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamBackend {
    pub service_name: String,

    pub service_port: ServicePort,

    #[serde(default)]
    pub resolve_granularity: ResolveGranularity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subset: Option<String>,
}
