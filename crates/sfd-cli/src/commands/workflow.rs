//! `sfd workflow ...`: query the status workflow the daemon would enforce.
//!
//! Output is `key=value` lines on stdout.

use anyhow::{bail, Context, Result};
use sfd_config::{report_unused_keys, ConfigConsumer, UnusedKeyPolicy};
use sfd_orders::{OrderStatus, TransitionVerdict, WorkflowRegistry, WorkflowValidator};
use tracing::warn;

use super::{join_statuses, parse_status};

/// The validator picked for one invocation plus where it came from.
pub struct LoadedWorkflow {
    pub validator: WorkflowValidator,
    pub tenant: Option<String>,
    pub config_hash: Option<String>,
}

/// Standard workflow when `config_paths` is empty; otherwise the layered
/// config's default or tenant workflow.
pub fn load(config_paths: &[String], tenant: Option<&str>) -> Result<LoadedWorkflow> {
    let (registry, config_hash) = if config_paths.is_empty() {
        (WorkflowRegistry::default(), None)
    } else {
        let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
        let loaded = sfd_config::load_layered_yaml(&path_refs)?;

        let report = report_unused_keys(
            ConfigConsumer::Cli,
            &loaded.config_json,
            UnusedKeyPolicy::Warn,
        )?;
        for p in &report.unused_leaf_pointers {
            warn!(pointer = %p, "config key is not read by the cli");
        }

        let registry = WorkflowRegistry::from_config_json(&loaded.config_json)
            .context("workflow config rejected")?;
        (registry, Some(loaded.config_hash))
    };

    if let Some(t) = tenant {
        if !registry.tenant_ids().any(|id| id == t) {
            warn!(tenant = %t, "no workflow for tenant; using default");
        }
    }

    Ok(LoadedWorkflow {
        validator: registry.for_tenant(tenant).clone(),
        tenant: tenant.map(str::to_string),
        config_hash,
    })
}

pub fn show(wf: &LoadedWorkflow) {
    let table = wf.validator.table();

    println!("tenant={}", wf.tenant.as_deref().unwrap_or("default"));
    println!("config_hash={}", wf.config_hash.as_deref().unwrap_or("none"));
    for s in OrderStatus::ALL {
        println!("{}={}", s, join_statuses(table.next(s)));
    }
    match table.cancel_policy() {
        Some(p) => {
            let exempt: Vec<OrderStatus> = p.exempt.iter().copied().collect();
            println!("cancel_status={}", p.status);
            println!("cancel_exempt={}", join_statuses(&exempt));
        }
        None => println!("cancel_status=none"),
    }
    let terminal: Vec<OrderStatus> = OrderStatus::ALL
        .into_iter()
        .filter(|s| table.is_terminal(*s))
        .collect();
    println!("terminal={}", join_statuses(&terminal));
}

pub fn next(wf: &LoadedWorkflow, from: &str) -> Result<()> {
    let from = parse_status("--from", from)?;
    let next = wf.validator.valid_next_statuses(from);
    println!("from={} next={}", from, join_statuses(&next));
    Ok(())
}

pub fn check(wf: &LoadedWorkflow, from: &str, to: &str) -> Result<()> {
    let from = parse_status("--from", from)?;
    let to = parse_status("--to", to)?;

    match wf.validator.check_transition(from, to) {
        TransitionVerdict::Allowed => {
            println!("allowed=true from={} to={}", from, to);
            Ok(())
        }
        TransitionVerdict::Refused { path, message, .. } => {
            println!("allowed=false from={} to={}", from, to);
            println!("path={}", join_statuses(&path));
            println!("message={}", message);
            bail!("TRANSITION_REFUSED: {}", message)
        }
    }
}

pub fn path(wf: &LoadedWorkflow, from: &str, to: &str) -> Result<()> {
    let from = parse_status("--from", from)?;
    let to = parse_status("--to", to)?;

    let path = wf.validator.find_transition_path(from, to);
    println!("reachable={}", !path.is_empty());
    println!("path={}", join_statuses(&path));
    Ok(())
}
