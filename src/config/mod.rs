pub mod duration;
mod types;

pub use duration::Duration;
pub use types::*;

use anyhow::{bail, Context, Result};
use ipnetwork::IpNetwork;
use regex::Regex;
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::Path;
use std::sync::OnceLock;

const HTTP_METHODS: &[&str] = &[
    "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH", "PURGE",
];

/// Lowercase domain with at most one leading wildcard label.
fn host_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\*\.)?[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)*$")
            .unwrap()
    })
}

impl RouteConfig {
    /// Load a route document from a YAML file and validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read route file: {:?}", path))?;

        let config: RouteConfig =
            serde_yml::from_str(&content).with_context(|| "Failed to parse route file")?;

        config.validate()?;

        Ok(config)
    }

    /// Schema-level checks. Predicate arity (value vs set) is not checked
    /// here; the expression translator owns those failures.
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for route in &self.http {
            if route.name.is_empty() {
                bail!("HTTP route rule name cannot be empty");
            }
            if !names.insert(route.name.as_str()) {
                bail!("Duplicate HTTP route rule name '{}'", route.name);
            }

            route
                .matcher
                .validate()
                .with_context(|| format!("Invalid match block in route '{}'", route.name))?;

            if route.backends.is_empty() && route.upstreams.is_empty() {
                bail!(
                    "Route '{}' must reference at least one backend or upstream",
                    route.name
                );
            }
            for backend in &route.backends {
                if backend.service_name.is_empty() {
                    bail!("Route '{}' has a backend with an empty service name", route.name);
                }
            }
            for upstream in &route.upstreams {
                if upstream.name.is_empty() {
                    bail!("Route '{}' has an upstream reference with an empty name", route.name);
                }
            }
        }

        let mut stream_names = HashSet::new();
        for route in &self.stream {
            if route.name.is_empty() {
                bail!("Stream route rule name cannot be empty");
            }
            if !stream_names.insert(route.name.as_str()) {
                bail!("Duplicate stream route rule name '{}'", route.name);
            }
            if route.matcher.ingress_port == 0 {
                bail!(
                    "Stream route '{}' must declare a nonzero ingress port",
                    route.name
                );
            }
            if route.backend.service_name.is_empty() {
                bail!(
                    "Stream route '{}' has a backend with an empty service name",
                    route.name
                );
            }
        }

        Ok(())
    }
}

impl HttpMatch {
    fn validate(&self) -> Result<()> {
        if self.paths.is_empty() {
            bail!("At least one path predicate must be configured");
        }
        for path in &self.paths {
            if !path.starts_with('/') {
                bail!("Path predicate '{}' must start with '/'", path);
            }
            if let Some(pos) = path.find('*') {
                if pos != path.len() - 1 {
                    bail!(
                        "Path predicate '{}' may only use '*' as a trailing wildcard",
                        path
                    );
                }
            }
        }

        for method in &self.methods {
            if !HTTP_METHODS.contains(&method.as_str()) {
                bail!("Unsupported HTTP method '{}'", method);
            }
        }

        for host in &self.hosts {
            if !host_pattern().is_match(host) {
                bail!(
                    "Invalid host predicate '{}': expected a lowercase domain with at most one leading wildcard label",
                    host
                );
            }
        }

        for addr in &self.remote_addrs {
            if addr.parse::<IpNetwork>().is_err() && addr.parse::<IpAddr>().is_err() {
                bail!(
                    "Invalid remote address predicate '{}': expected an IP address or CIDR block",
                    addr
                );
            }
        }

        for expr in &self.exprs {
            if expr.op.is_regex() {
                if let Some(pattern) = &expr.value {
                    Regex::new(pattern).with_context(|| {
                        format!("Invalid regex pattern '{}' in match expression", pattern)
                    })?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> RouteConfig {
        serde_yml::from_str(yaml).unwrap()
    }

    const VALID_DOC: &str = r#"
http:
  - name: api
    priority: 5
    timeout:
      connect: 5s
      send: 10s
      read: 30s
    match:
      paths: ["/api/*"]
      methods: ["GET", "POST"]
      hosts: ["api.example.com", "*.example.org"]
      remote_addrs: ["10.0.0.0/8", "192.168.1.1"]
      exprs:
        - subject:
            scope: header
            name: X-Real-IP
          op: equal
          value: "1.2.3.4"
        - subject:
            scope: query
            name: id
          op: not_in
          set: ["1", "2"]
    backends:
      - service_name: api-server
        service_port: 8080
        weight: 80
      - service_name: api-server-canary
        service_port: http
        weight: 20
stream:
  - name: tcp-echo
    protocol: tcp
    match:
      ingress_port: 9000
    backend:
      service_name: echo
      service_port: 7
"#;

    #[test]
    fn test_valid_document_accepted() {
        let config = parse(VALID_DOC);
        config.validate().unwrap();

        let route = &config.http[0];
        assert_eq!(route.name, "api");
        assert_eq!(route.matcher.exprs.len(), 2);
        assert_eq!(
            route.backends[1].service_port,
            ServicePort::Name("http".to_string())
        );
        assert_eq!(route.backends[0].service_port, ServicePort::Number(8080));
        assert_eq!(route.timeout.unwrap().read.as_secs(), 30);
    }

    #[test]
    fn test_missing_paths_rejected() {
        let config = parse(
            r#"
http:
  - name: r
    match:
      paths: []
    backends:
      - service_name: svc
        service_port: 80
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("At least one path"));
    }

    #[test]
    fn test_relative_path_rejected() {
        let config = parse(
            r#"
http:
  - name: r
    match:
      paths: ["api/*"]
    backends:
      - service_name: svc
        service_port: 80
"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inner_wildcard_rejected() {
        let config = parse(
            r#"
http:
  - name: r
    match:
      paths: ["/a/*/b"]
    backends:
      - service_name: svc
        service_port: 80
"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_double_wildcard_host_rejected() {
        let config = parse(
            r#"
http:
  - name: r
    match:
      paths: ["/"]
      hosts: ["*.*.example.com"]
    backends:
      - service_name: svc
        service_port: 80
"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_uppercase_host_rejected() {
        let config = parse(
            r#"
http:
  - name: r
    match:
      paths: ["/"]
      hosts: ["API.example.com"]
    backends:
      - service_name: svc
        service_port: 80
"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_remote_addr_rejected() {
        let config = parse(
            r#"
http:
  - name: r
    match:
      paths: ["/"]
      remote_addrs: ["not-an-ip"]
    backends:
      - service_name: svc
        service_port: 80
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("not-an-ip"));
    }

    #[test]
    fn test_unknown_method_rejected() {
        let config = parse(
            r#"
http:
  - name: r
    match:
      paths: ["/"]
      methods: ["FETCH"]
    backends:
      - service_name: svc
        service_port: 80
"#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_rule_names_rejected() {
        let config = parse(
            r#"
http:
  - name: same
    match:
      paths: ["/a"]
    backends:
      - service_name: svc
        service_port: 80
  - name: same
    match:
      paths: ["/b"]
    backends:
      - service_name: svc
        service_port: 80
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("Duplicate"));
    }

    #[test]
    fn test_route_without_backend_or_upstream_rejected() {
        let config = parse(
            r#"
http:
  - name: r
    match:
      paths: ["/"]
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("backend or upstream"));
    }

    #[test]
    fn test_upstream_reference_is_sufficient() {
        let config = parse(
            r#"
http:
  - name: r
    match:
      paths: ["/"]
    upstreams:
      - name: shared-upstream
"#,
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_bad_regex_pattern_rejected() {
        let config = parse(
            r#"
http:
  - name: r
    match:
      paths: ["/"]
      exprs:
        - subject:
            scope: path
          op: regex_match
          value: "([unclosed"
    backends:
      - service_name: svc
        service_port: 80
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid regex pattern"));
    }

    #[test]
    fn test_zero_ingress_port_rejected() {
        let config = parse(
            r#"
stream:
  - name: s
    protocol: udp
    match:
      ingress_port: 0
    backend:
      service_name: svc
      service_port: 53
"#,
        );
        let err = config.validate().unwrap_err();
        assert!(format!("{:#}", err).contains("nonzero ingress port"));
    }

    #[test]
    fn test_arity_errors_left_to_translator() {
        // A predicate missing its set operand passes schema validation;
        // the translator owns that failure.
        let config = parse(
            r#"
http:
  - name: r
    match:
      paths: ["/"]
      exprs:
        - subject:
            scope: query
            name: id
          op: in
    backends:
      - service_name: svc
        service_port: 80
"#,
        );
        config.validate().unwrap();
        assert!(crate::router::to_vars(&config.http[0].matcher.exprs).is_err());
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = parse(VALID_DOC);
        let encoded = serde_yml::to_string(&config).unwrap();
        let reparsed: RouteConfig = serde_yml::from_str(&encoded).unwrap();

        assert_eq!(reparsed.http[0].name, config.http[0].name);
        assert_eq!(reparsed.http[0].matcher.exprs, config.http[0].matcher.exprs);
        assert_eq!(reparsed.stream[0].matcher.ingress_port, 9000);
    }
}
