// Gearbox - TCP option injection agent
// Copyright (C) 2025  Maxim Petrov
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Loader for the JSON descriptor of manager and collector endpoints.
//!
//! ```json
//! {
//!   "managers":   [ { "ip": "10.0.0.1", "port": 9000 } ],
//!   "collectors": [ { "ip": "10.0.0.2", "port": 9100 } ]
//! }
//! ```
//!
//! Both keys are required, both may be empty arrays. Unknown keys are ignored.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;
use serde_json::{Map, Value};
use thiserror::Error;

/// Address of a single remote endpoint, exactly as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    pub ip: String,
    pub port: u16,
}

impl EndpointSpec {
    pub fn new(ip: &str, port: u16) -> Self {
        Self {
            ip: ip.to_string(),
            port,
        }
    }
}

/// Typed content of the endpoints config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentConfig {
    pub managers: Vec<EndpointSpec>,
    pub collectors: Vec<EndpointSpec>,
}

#[derive(Debug, Error)]
pub enum ConfigErrorKind {
    #[error("unable to open file: {0}")]
    FileNotFound(#[source] io::Error),
    #[error("malformed JSON at line {line}, column {column}: {message}")]
    MalformedJson {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("missing required field '{0}'")]
    MissingField(String),
    #[error("bad value for field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

#[derive(Debug, Error)]
#[error("config '{}': {kind}", .file.display())]
pub struct ConfigError {
    pub file: PathBuf,
    #[source]
    pub kind: ConfigErrorKind,
}

/// Read and validate the endpoints config file at `path`.
pub fn load_config(path: &Path) -> Result<AgentConfig, ConfigError> {
    let wrap = |kind| ConfigError {
        file: path.to_path_buf(),
        kind,
    };

    // the whole file is kept in memory only for the time of parsing
    let content = fs::read(path).map_err(|e| wrap(ConfigErrorKind::FileNotFound(e)))?;
    parse_config(&content).map_err(wrap)
}

/// Validate the endpoints config given as raw JSON bytes or text.
///
/// Bytes that are not valid UTF-8 are reported as malformed JSON with their position.
pub fn parse_config(content: impl AsRef<[u8]>) -> Result<AgentConfig, ConfigErrorKind> {
    let root: Value =
        serde_json::from_slice(content.as_ref()).map_err(|e| ConfigErrorKind::MalformedJson {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        })?;

    let Value::Object(root) = root else {
        return Err(invalid("<root>", "expected JSON object"));
    };

    let managers = parse_endpoints(&root, "managers")?;
    for (i, m) in managers.iter().enumerate() {
        debug!("Manager {i}: ip={}, port={}", m.ip, m.port);
    }

    let collectors = parse_endpoints(&root, "collectors")?;
    for (i, c) in collectors.iter().enumerate() {
        debug!("Collector {i}: ip={}, port={}", c.ip, c.port);
    }

    Ok(AgentConfig {
        managers,
        collectors,
    })
}

fn invalid(field: &str, reason: &str) -> ConfigErrorKind {
    ConfigErrorKind::InvalidField {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_endpoints(
    root: &Map<String, Value>,
    key: &str,
) -> Result<Vec<EndpointSpec>, ConfigErrorKind> {
    let list = match root.get(key) {
        None => return Err(ConfigErrorKind::MissingField(key.to_string())),
        Some(Value::Array(list)) => list,
        Some(other) => {
            return Err(invalid(key, &format!("expected array, got {other}")));
        }
    };

    list.iter()
        .enumerate()
        .map(|(i, entry)| parse_endpoint(entry, &format!("{key}[{i}]")))
        .collect()
}

fn parse_endpoint(entry: &Value, name: &str) -> Result<EndpointSpec, ConfigErrorKind> {
    let Value::Object(entry) = entry else {
        return Err(invalid(name, &format!("expected object, got {entry}")));
    };

    let ip_field = format!("{name}.ip");
    let ip = match entry.get("ip") {
        None => return Err(ConfigErrorKind::MissingField(ip_field)),
        Some(Value::String(ip)) => ip.clone(),
        Some(other) => {
            return Err(invalid(&ip_field, &format!("expected string, got {other}")));
        }
    };

    let port_field = format!("{name}.port");
    let port = match entry.get("port") {
        None => return Err(ConfigErrorKind::MissingField(port_field)),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(port) => u16::try_from(port)
                .map_err(|_| invalid(&port_field, &format!("port {port} is out of range")))?,
            None => {
                return Err(invalid(&port_field, &format!("expected port number, got {n}")));
            }
        },
        Some(other) => {
            return Err(invalid(&port_field, &format!("expected integer, got {other}")));
        }
    };

    Ok(EndpointSpec { ip, port })
}

#[cfg(test)]
mod test {
    use std::fs;

    use indoc::indoc;
    use tempdir::TempDir;

    use super::{AgentConfig, ConfigErrorKind, EndpointSpec, load_config, parse_config};

    #[test]
    fn must_not_accept_empty() {
        let err = parse_config("").unwrap_err();
        assert!(matches!(err, ConfigErrorKind::MalformedJson { .. }));
    }

    #[test]
    fn should_report_syntax_error_position() {
        let cfg = indoc! {r#"
            {
              "managers": [
                { "ip": "10.0.0.1" "port": 9000 }
              ],
              "collectors": []
            }
        "#};
        let ConfigErrorKind::MalformedJson { line, .. } = parse_config(cfg).unwrap_err() else {
            panic!("must fail as malformed JSON")
        };
        assert_eq!(line, 3);
    }

    #[test]
    fn should_parse_single_manager_no_collectors() {
        let cfg = r#"{"managers":[{"ip":"10.0.0.5","port":7000}],"collectors":[]}"#;
        let cfg = parse_config(cfg).unwrap();
        assert_eq!(cfg.managers, vec![EndpointSpec::new("10.0.0.5", 7000)]);
        assert!(cfg.collectors.is_empty());
    }

    #[test]
    fn should_parse_trivial_empty() {
        let cfg = parse_config(r#"{"managers": [], "collectors": []}"#).unwrap();
        assert_eq!(cfg, AgentConfig::default());
    }

    #[test]
    fn should_keep_input_order() {
        let cfg = indoc! {r#"
            {
              "managers": [
                { "ip": "10.0.0.1", "port": 9000 },
                { "ip": "10.0.0.3", "port": 9002 },
                { "ip": "10.0.0.2", "port": 9001 }
              ],
              "collectors": [
                { "ip": "10.0.1.2", "port": 9101 },
                { "ip": "10.0.1.1", "port": 9100 }
              ]
            }
        "#};
        let cfg = parse_config(cfg).unwrap();
        assert_eq!(
            cfg.managers,
            vec![
                EndpointSpec::new("10.0.0.1", 9000),
                EndpointSpec::new("10.0.0.3", 9002),
                EndpointSpec::new("10.0.0.2", 9001),
            ]
        );
        assert_eq!(
            cfg.collectors,
            vec![
                EndpointSpec::new("10.0.1.2", 9101),
                EndpointSpec::new("10.0.1.1", 9100),
            ]
        );
    }

    #[test]
    fn should_ignore_unknown_keys() {
        let cfg = indoc! {r#"
            {
              "version": 2,
              "managers": [ { "ip": "10.0.0.1", "port": 9000, "name": "primary" } ],
              "collectors": []
            }
        "#};
        let cfg = parse_config(cfg).unwrap();
        assert_eq!(cfg.managers, vec![EndpointSpec::new("10.0.0.1", 9000)]);
    }

    #[test]
    fn must_not_default_missing_collectors() {
        let cfg = r#"{"managers":[{"ip":"10.0.0.1","port":9000}]}"#;
        let ConfigErrorKind::MissingField(field) = parse_config(cfg).unwrap_err() else {
            panic!("missing collectors must be a missing field")
        };
        assert_eq!(field, "collectors");
    }

    #[test]
    fn must_not_default_missing_managers() {
        let ConfigErrorKind::MissingField(field) =
            parse_config(r#"{"collectors":[]}"#).unwrap_err()
        else {
            panic!("missing managers must be a missing field")
        };
        assert_eq!(field, "managers");
    }

    #[test]
    fn should_name_missing_entry_field() {
        let cfg = indoc! {r#"
            {
              "managers": [ { "ip": "10.0.0.1", "port": 9000 } ],
              "collectors": [
                { "ip": "10.0.1.1", "port": 9100 },
                { "port": 9101 }
              ]
            }
        "#};
        let ConfigErrorKind::MissingField(field) = parse_config(cfg).unwrap_err() else {
            panic!("entry without ip must be a missing field")
        };
        assert_eq!(field, "collectors[1].ip");

        let cfg = r#"{"managers":[{"ip":"10.0.0.1"}],"collectors":[]}"#;
        let ConfigErrorKind::MissingField(field) = parse_config(cfg).unwrap_err() else {
            panic!("entry without port must be a missing field")
        };
        assert_eq!(field, "managers[0].port");
    }

    #[test]
    fn must_not_accept_wrong_types() {
        for cfg in [
            r#"[]"#,
            r#"{"managers": {}, "collectors": []}"#,
            r#"{"managers": ["10.0.0.1:9000"], "collectors": []}"#,
            r#"{"managers": [{"ip": 10, "port": 9000}], "collectors": []}"#,
            r#"{"managers": [{"ip": "10.0.0.1", "port": "9000"}], "collectors": []}"#,
            r#"{"managers": [{"ip": "10.0.0.1", "port": 90.5}], "collectors": []}"#,
            r#"{"managers": [{"ip": "10.0.0.1", "port": -1}], "collectors": []}"#,
        ] {
            let err = parse_config(cfg).unwrap_err();
            assert!(
                matches!(err, ConfigErrorKind::InvalidField { .. }),
                "unexpected error for {cfg}: {err}"
            );
        }
    }

    #[test]
    fn must_not_accept_port_out_of_range() {
        let cfg = r#"{"managers": [{"ip": "10.0.0.1", "port": 65536}], "collectors": []}"#;
        let ConfigErrorKind::InvalidField { field, .. } = parse_config(cfg).unwrap_err() else {
            panic!("port out of range must be rejected")
        };
        assert_eq!(field, "managers[0].port");
    }

    #[test]
    fn should_keep_ip_unvalidated() {
        let cfg = r#"{"managers": [{"ip": "256.1.1.1", "port": 80}], "collectors": []}"#;
        let cfg = parse_config(cfg).unwrap();
        assert_eq!(cfg.managers[0].ip, "256.1.1.1");
    }

    #[test]
    fn should_load_from_file() {
        let dir = TempDir::new("gearbox-config").unwrap();
        let path = dir.path().join("agent.json");
        fs::write(
            &path,
            indoc! {r#"
                {
                  "managers":   [ { "ip": "10.0.0.1", "port": 9000 } ],
                  "collectors": [ { "ip": "10.0.0.2", "port": 9100 } ]
                }
            "#},
        )
        .unwrap();

        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.managers, vec![EndpointSpec::new("10.0.0.1", 9000)]);
        assert_eq!(cfg.collectors, vec![EndpointSpec::new("10.0.0.2", 9100)]);
    }

    #[test]
    fn should_name_file_on_errors() {
        let dir = TempDir::new("gearbox-config").unwrap();

        let missing = dir.path().join("missing.json");
        let err = load_config(&missing).unwrap_err();
        assert!(matches!(err.kind, ConfigErrorKind::FileNotFound(_)));
        assert_eq!(err.file, missing);
        assert!(err.to_string().contains("missing.json"));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ \"managers\": [").unwrap();
        let err = load_config(&broken).unwrap_err();
        assert!(matches!(err.kind, ConfigErrorKind::MalformedJson { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn should_report_bad_utf8_as_malformed() {
        let dir = TempDir::new("gearbox-config").unwrap();
        let path = dir.path().join("latin1.json");
        fs::write(
            &path,
            b"{\"managers\":[{\"ip\":\"\xff\",\"port\":1}],\"collectors\":[]}",
        )
        .unwrap();

        let err = load_config(&path).unwrap_err();
        let ConfigErrorKind::MalformedJson { line, column, .. } = &err.kind else {
            panic!("non UTF-8 content must be malformed JSON, got {err}")
        };
        assert_eq!(*line, 1);
        assert!(*column > 0);
    }
}
