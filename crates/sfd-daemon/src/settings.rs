//! Daemon settings resolved from layered config.
//!
//! Precedence for the bind address: `SFD_DAEMON_ADDR` env var, then
//! `/daemon/bind_addr`, then [`DEFAULT_BIND_ADDR`].

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sfd_config::{report_unused_keys, ConfigConsumer, LoadedConfig, UnusedKeyPolicy};
use sfd_orders::WorkflowRegistry;
use tracing::warn;

pub const ENV_CONFIG_PATHS: &str = "SFD_CONFIG";
pub const ENV_BIND_ADDR: &str = "SFD_DAEMON_ADDR";
pub const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 8898);

const DEFAULT_EVENT_BUFFER: usize = 1024;
const MAX_EVENT_BUFFER: usize = 1 << 16;
const DEFAULT_HEARTBEAT_SECS: u64 = 1;

#[derive(Debug, Clone)]
pub struct DaemonSettings {
    pub bind_addr: Option<SocketAddr>,
    pub event_buffer: usize,
    pub heartbeat: Duration,
    pub workflows: WorkflowRegistry,
    pub config_hash: String,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            bind_addr: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
            heartbeat: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            workflows: WorkflowRegistry::default(),
            config_hash: String::new(),
        }
    }
}

impl DaemonSettings {
    pub fn from_config(loaded: &LoadedConfig) -> Result<Self> {
        let cfg = &loaded.config_json;

        let report = report_unused_keys(ConfigConsumer::Daemon, cfg, UnusedKeyPolicy::Warn)?;
        for p in &report.unused_leaf_pointers {
            warn!(pointer = %p, "config key is not read by the daemon");
        }

        let bind_addr = match cfg.pointer("/daemon/bind_addr").and_then(Value::as_str) {
            Some(s) => Some(
                s.parse::<SocketAddr>()
                    .with_context(|| format!("invalid /daemon/bind_addr: {s}"))?,
            ),
            None => None,
        };

        let event_buffer = match cfg.pointer("/daemon/event_buffer").and_then(Value::as_u64) {
            Some(n) => match usize::try_from(n) {
                Ok(n) if n <= MAX_EVENT_BUFFER => n.max(1),
                _ => bail!("invalid /daemon/event_buffer: {n} (max {MAX_EVENT_BUFFER})"),
            },
            None => DEFAULT_EVENT_BUFFER,
        };

        let heartbeat_secs = cfg
            .pointer("/daemon/heartbeat_secs")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_HEARTBEAT_SECS)
            .max(1);

        let workflows = WorkflowRegistry::from_config_json(cfg)?;

        Ok(Self {
            bind_addr,
            event_buffer,
            heartbeat: Duration::from_secs(heartbeat_secs),
            workflows,
            config_hash: loaded.config_hash.clone(),
        })
    }

    /// Config layers named in `SFD_CONFIG` (comma separated), or the empty
    /// config when unset.
    pub fn load_from_env() -> Result<Self> {
        let loaded = match std::env::var(ENV_CONFIG_PATHS) {
            Ok(raw) if !raw.trim().is_empty() => {
                let paths: Vec<&str> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .collect();
                sfd_config::load_layered_yaml(&paths)?
            }
            _ => sfd_config::empty_config()?,
        };
        Self::from_config(&loaded)
    }

    pub fn resolve_bind_addr(&self) -> SocketAddr {
        std::env::var(ENV_BIND_ADDR)
            .ok()
            .and_then(|s| s.parse().ok())
            .or(self.bind_addr)
            .unwrap_or_else(|| SocketAddr::from(DEFAULT_BIND_ADDR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfd_orders::OrderStatus;

    #[test]
    fn reads_daemon_section_and_tenant_workflows() {
        let loaded = sfd_config::load_layered_yaml_from_strings(&[r#"
daemon:
  bind_addr: "127.0.0.1:9100"
  event_buffer: 16
  heartbeat_secs: 5
tenants:
  acme:
    workflow:
      transitions:
        pending: [shipped]
"#])
        .unwrap();
        let s = DaemonSettings::from_config(&loaded).unwrap();
        assert_eq!(s.bind_addr, Some("127.0.0.1:9100".parse().unwrap()));
        assert_eq!(s.event_buffer, 16);
        assert_eq!(s.heartbeat, Duration::from_secs(5));
        assert_eq!(
            s.workflows
                .for_tenant(Some("acme"))
                .valid_next_statuses(OrderStatus::Pending),
            vec![OrderStatus::Shipped]
        );
        assert_eq!(s.config_hash, loaded.config_hash);
    }

    #[test]
    fn bad_bind_addr_is_an_error() {
        let loaded =
            sfd_config::load_layered_yaml_from_strings(&["daemon:\n  bind_addr: nowhere\n"]).unwrap();
        assert!(DaemonSettings::from_config(&loaded).is_err());
    }

    #[test]
    fn oversized_event_buffer_is_an_error() {
        let loaded = sfd_config::load_layered_yaml_from_strings(&[
            "daemon:\n  event_buffer: 18446744073709551615\n",
        ])
        .unwrap();
        let err = DaemonSettings::from_config(&loaded).unwrap_err();
        assert!(err.to_string().contains("/daemon/event_buffer"));

        let loaded =
            sfd_config::load_layered_yaml_from_strings(&["daemon:\n  event_buffer: 65536\n"])
                .unwrap();
        let s = DaemonSettings::from_config(&loaded).unwrap();
        assert_eq!(s.event_buffer, 1 << 16);
    }
}
