mod expr;
mod vars;

pub use expr::{ExprError, MatchExpr, MatchExprSubject, MatchOp, SubjectScope, to_vars};
pub use vars::{Var, Vars};

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::config::{
    AuthType, Authentication, HttpRoute, PluginConfig, RouteConfig, StreamProtocol, StreamRoute,
    UpstreamTimeout,
};

/// The full set of generated proxy routes for one route document.
#[derive(Debug, Serialize)]
pub struct Router {
    routes: Vec<ProxyRoute>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    stream_routes: Vec<StreamProxyRoute>,
}

/// A compiled HTTP route in the downstream proxy's native form.
#[derive(Debug, Clone, Serialize)]
pub struct ProxyRoute {
    pub name: String,

    pub priority: i32,

    pub uris: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hosts: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remote_addrs: Vec<String>,

    /// Filter clauses compiled from the route's match predicates,
    /// embedded verbatim for the proxy's matching engine.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub vars: Vars,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_func: Option<String>,

    pub enable_websocket: bool,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub plugins: PluginConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<RouteTimeout>,
}

/// A compiled level-4 route.
#[derive(Debug, Clone, Serialize)]
pub struct StreamProxyRoute {
    pub name: String,

    pub protocol: StreamProtocol,

    pub server_port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,

    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub plugins: PluginConfig,
}

/// Upstream timeouts forwarded to the generated route, in seconds.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RouteTimeout {
    pub connect: f64,
    pub send: f64,
    pub read: f64,
}

impl From<&UpstreamTimeout> for RouteTimeout {
    fn from(t: &UpstreamTimeout) -> Self {
        Self {
            connect: t.connect.as_secs_f64(),
            send: t.send.as_secs_f64(),
            read: t.read.as_secs_f64(),
        }
    }
}

impl Router {
    /// Compile every route in the document. Any invalid match
    /// configuration rejects the whole document, with no partial output.
    pub fn from_config(config: &RouteConfig) -> Result<Self> {
        let mut routes = config
            .http
            .iter()
            .map(ProxyRoute::from_route)
            .collect::<Result<Vec<_>>>()?;

        // Higher priority first; the sort is stable so ties keep document order.
        routes.sort_by_key(|r| std::cmp::Reverse(r.priority));

        let stream_routes = config
            .stream
            .iter()
            .map(StreamProxyRoute::from_route)
            .collect();

        debug!(
            "Compiled {} HTTP routes and {} stream routes",
            routes.len(),
            config.stream.len()
        );

        Ok(Self {
            routes,
            stream_routes,
        })
    }

    pub fn routes(&self) -> &[ProxyRoute] {
        &self.routes
    }

    pub fn stream_routes(&self) -> &[StreamProxyRoute] {
        &self.stream_routes
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize generated routes")
    }
}

impl ProxyRoute {
    fn from_route(route: &HttpRoute) -> Result<Self> {
        let vars = to_vars(&route.matcher.exprs)
            .with_context(|| format!("Invalid match expression in route '{}'", route.name))?;

        if route.matcher.filter_func.is_some() {
            warn!(
                "Route '{}' uses a filter_func, passed through unchecked",
                route.name
            );
        }

        let mut plugins: PluginConfig = route
            .plugins
            .iter()
            .filter(|p| p.enable)
            .map(|p| (p.name.clone(), p.config.clone()))
            .collect();

        if let Some(auth) = &route.authentication {
            if auth.enable {
                let (name, config) = auth_plugin(auth)?;
                plugins.insert(name.to_string(), config);
            }
        }

        Ok(Self {
            name: route.name.clone(),
            priority: route.priority,
            uris: route.matcher.paths.clone(),
            hosts: route.matcher.hosts.clone(),
            methods: route.matcher.methods.clone(),
            remote_addrs: route.matcher.remote_addrs.clone(),
            vars,
            filter_func: route.matcher.filter_func.clone(),
            enable_websocket: route.websocket,
            plugins,
            timeout: route.timeout.as_ref().map(RouteTimeout::from),
        })
    }
}

impl StreamProxyRoute {
    fn from_route(route: &StreamRoute) -> Self {
        Self {
            name: route.name.clone(),
            protocol: route.protocol,
            server_port: route.matcher.ingress_port,
            sni: route.matcher.host.clone(),
            plugins: route
                .plugins
                .iter()
                .filter(|p| p.enable)
                .map(|p| (p.name.clone(), p.config.clone()))
                .collect(),
        }
    }
}

/// Map a route's authentication block onto the proxy plugin it enables.
fn auth_plugin(auth: &Authentication) -> Result<(&'static str, JsonValue)> {
    let (name, config) = match auth.auth_type {
        AuthType::KeyAuth => (
            "key-auth",
            serde_json::to_value(auth.key_auth.clone().unwrap_or_default()),
        ),
        AuthType::JwtAuth => (
            "jwt-auth",
            serde_json::to_value(auth.jwt_auth.clone().unwrap_or_default()),
        ),
        AuthType::LdapAuth => (
            "ldap-auth",
            serde_json::to_value(auth.ldap_auth.clone().unwrap_or_default()),
        ),
    };

    Ok((
        name,
        config.with_context(|| format!("Failed to encode {} plugin config", name))?,
    ))
}
