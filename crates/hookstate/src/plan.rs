//! Plan and apply: compares manifests with the state file and drives the
//! resource handlers.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use log::{info, warn};
use serde::Serialize;

use crate::api::Client;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::error::{HookstateError, Result};
use crate::manifest::{Manifest, ResourceKind};
use crate::resource::Resource;
use crate::state::{Attributes, ResourceData, ResourceState, StateFile, StoredResource};
use crate::value::Value;

const SENSITIVE_PLACEHOLDER: &str = "(sensitive value)";

/// What apply will do to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Create,
    Update { changed: Vec<&'static str> },
    NoOp,
    Delete,
}

impl Action {
    fn symbol(&self) -> &'static str {
        match self {
            Action::Create => "+",
            Action::Update { .. } => "~",
            Action::NoOp => " ",
            Action::Delete => "-",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Update { .. } => write!(f, "update"),
            Action::NoOp => write!(f, "no-op"),
            Action::Delete => write!(f, "delete"),
        }
    }
}

/// One attribute difference shown in a plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDiff {
    pub field: &'static str,
    pub before: Value,
    pub after: Value,
    pub sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedChange {
    pub name: String,
    pub kind: ResourceKind,
    pub action: Action,
    /// Remote id from state; empty for creates.
    pub id: String,
    #[serde(skip)]
    pub prior: Attributes,
    #[serde(skip)]
    pub declared: Option<Attributes>,
    pub diffs: Vec<FieldDiff>,
}

impl PlannedChange {
    fn resource_data(&self) -> std::result::Result<ResourceData, Diagnostics> {
        let data = ResourceData::new(self.kind.resource().schema())
            .with_prior(self.id.clone(), self.prior.clone());
        match &self.declared {
            Some(declared) => data.with_declared(declared.clone()),
            None => Ok(data),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Plan {
    pub changes: Vec<PlannedChange>,
}

impl Plan {
    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|c| c.action != Action::NoOp)
    }

    fn count(&self, matches: impl Fn(&Action) -> bool) -> usize {
        self.changes.iter().filter(|c| matches(&c.action)).count()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for change in self.changes.iter().filter(|c| c.action != Action::NoOp) {
            writeln!(
                f,
                "{} {} ({}) will be {}d",
                change.action.symbol(),
                change.name,
                change.kind,
                change.action
            )?;
            for diff in &change.diffs {
                let render = |value: &Value| {
                    if diff.sensitive {
                        SENSITIVE_PLACEHOLDER.to_string()
                    } else {
                        render_value(value)
                    }
                };
                match change.action {
                    Action::Create => writeln!(f, "    {}: {}", diff.field, render(&diff.after))?,
                    _ => writeln!(
                        f,
                        "    {}: {} -> {}",
                        diff.field,
                        render(&diff.before),
                        render(&diff.after)
                    )?,
                }
            }
        }

        write!(
            f,
            "Plan: {} to create, {} to update, {} to delete.",
            self.count(|a| *a == Action::Create),
            self.count(|a| matches!(a, Action::Update { .. })),
            self.count(|a| *a == Action::Delete)
        )
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "?".to_string()),
    }
}

/// Decides an action for every manifest and every resource in state.
///
/// Manifests come first in declaration order, then deletions in state
/// order.
pub fn plan(manifests: &[Manifest], state: &StateFile) -> std::result::Result<Plan, Diagnostics> {
    let mut changes = Vec::new();
    let mut diags = Diagnostics::new();

    for manifest in manifests {
        let stored = state.get(manifest.name());
        if let Some(stored) = stored {
            if stored.type_name != manifest.kind.type_name() {
                diags.push(
                    Diagnostic::usage(format!(
                        "'{}' is recorded as {} but declared as {}; destroy it first",
                        manifest.name(),
                        stored.type_name,
                        manifest.kind.type_name()
                    ))
                    .with_attribute("kind"),
                );
                continue;
            }
        }

        let schema = manifest.kind.resource().schema();
        let (id, prior) = stored
            .map(|s| (s.id.clone(), s.attributes.clone()))
            .unwrap_or_default();
        let data = match ResourceData::new(schema.clone())
            .with_prior(id.clone(), prior.clone())
            .with_declared(manifest.spec.clone())
        {
            Ok(data) => data,
            Err(errors) => {
                diags.extend(errors);
                continue;
            }
        };

        let (action, diffs) = if stored.is_none() {
            let diffs = schema
                .declarable_fields()
                .filter(|f| !data.get(f.name).is_null())
                .map(|f| FieldDiff {
                    field: f.name,
                    before: Value::Null,
                    after: data.get(f.name),
                    sensitive: f.sensitive,
                })
                .collect();
            (Action::Create, diffs)
        } else {
            let changed = data.changed_fields();
            if changed.is_empty() {
                (Action::NoOp, Vec::new())
            } else {
                let diffs = changed
                    .iter()
                    .map(|&field| FieldDiff {
                        field,
                        before: data.prior(field),
                        after: data.get(field),
                        sensitive: schema.is_sensitive(field),
                    })
                    .collect();
                (Action::Update { changed }, diffs)
            }
        };

        changes.push(PlannedChange {
            name: manifest.name().to_string(),
            kind: manifest.kind,
            action,
            id,
            prior,
            declared: Some(manifest.spec.clone()),
            diffs,
        });
    }

    let declared: HashSet<&str> = manifests.iter().map(|m| m.name()).collect();
    for (name, stored) in &state.resources {
        if declared.contains(name.as_str()) {
            continue;
        }
        let Some(kind) = ResourceKind::from_type_name(&stored.type_name) else {
            diags.push(Diagnostic::error(
                DiagnosticKind::State,
                format!("'{}' has unknown resource type '{}'", name, stored.type_name),
            ));
            continue;
        };
        changes.push(PlannedChange {
            name: name.clone(),
            kind,
            action: Action::Delete,
            id: stored.id.clone(),
            prior: stored.attributes.clone(),
            declared: None,
            diffs: Vec::new(),
        });
    }

    diags.into_result()?;
    Ok(Plan { changes })
}

/// Counts of what an apply did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl fmt::Display for ApplySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Apply complete: {} created, {} updated, {} deleted, {} unchanged.",
            self.created, self.updated, self.deleted, self.unchanged
        )
    }
}

/// Executes `plan`, recording resolved state after every resource.
///
/// Stops at the first failing resource. State is saved to `state_path`
/// before returning in either case.
pub fn apply(
    client: &Client,
    plan: &Plan,
    state: &mut StateFile,
    state_path: &Path,
) -> Result<ApplySummary> {
    let mut summary = ApplySummary::default();

    for change in &plan.changes {
        let span = tracing::info_span!(
            "apply",
            resource = %change.name,
            kind = %change.kind,
            action = %change.action
        );
        let _enter = span.enter();

        if change.action == Action::NoOp {
            summary.unchanged += 1;
            continue;
        }

        if let Err(diags) = apply_change(client, change, state) {
            warn!("Failed to {} {}: {}", change.action, change.name, diags);
            state.save(state_path)?;
            return Err(HookstateError::Diagnostics(diags));
        }

        match change.action {
            Action::Create => summary.created += 1,
            Action::Update { .. } => summary.updated += 1,
            Action::Delete => summary.deleted += 1,
            Action::NoOp => {}
        }
    }

    state.save(state_path)?;
    info!("{}", summary);
    Ok(summary)
}

fn apply_change(
    client: &Client,
    change: &PlannedChange,
    state: &mut StateFile,
) -> std::result::Result<(), Diagnostics> {
    let resource = change.kind.resource();
    let mut data = change.resource_data()?;

    let result = match change.action {
        Action::Create => resource.create(client, &mut data),
        Action::Update { .. } => resource.update(client, &mut data),
        Action::Delete => resource.delete(client, &mut data),
        Action::NoOp => Ok(()),
    };

    record(state, &change.name, change.kind, &data);
    result
}

/// Writes the resource's resolved state, or drops it once it has no id.
fn record(state: &mut StateFile, name: &str, kind: ResourceKind, data: &ResourceData) {
    if data.id().is_empty() {
        state.remove(name);
    } else {
        state.upsert(
            name,
            StoredResource {
                type_name: kind.type_name().to_string(),
                id: data.id().to_string(),
                attributes: data.resolved(),
            },
        );
    }
}

/// Reads every resource in state and records what the API returns.
///
/// Keeps going past failures and reports all of them at the end.
pub fn refresh(client: &Client, state: &mut StateFile, state_path: &Path) -> Result<usize> {
    let mut diags = Diagnostics::new();
    let mut refreshed = 0;

    let names: Vec<String> = state.resources.keys().cloned().collect();
    for name in names {
        let Some(stored) = state.get(&name).cloned() else {
            continue;
        };
        let span = tracing::info_span!("refresh", resource = %name);
        let _enter = span.enter();

        let Some(kind) = ResourceKind::from_type_name(&stored.type_name) else {
            diags.push(Diagnostic::error(
                DiagnosticKind::State,
                format!("'{}' has unknown resource type '{}'", name, stored.type_name),
            ));
            continue;
        };

        let mut data = ResourceData::new(kind.resource().schema())
            .with_prior(stored.id.clone(), stored.attributes.clone());
        match kind.resource().read(client, &mut data) {
            Ok(()) => {
                record(state, &name, kind, &data);
                refreshed += 1;
            }
            Err(errors) => {
                warn!("Failed to refresh {}: {}", name, errors);
                diags.extend(errors);
            }
        }
    }

    state.save(state_path)?;
    diags.into_result()?;
    info!("Refreshed {} resource(s)", refreshed);
    Ok(refreshed)
}

/// Deletes every resource in state.
pub fn destroy(client: &Client, state: &mut StateFile, state_path: &Path) -> Result<ApplySummary> {
    let plan = plan(&[], state)?;
    apply(client, &plan, state, state_path)
}
