//! Workflow engine
//!
//! Validates one requested transition against the record's workflow table
//! and returns the moved record. The input record is never touched, so a
//! rejected request leaves nothing behind. Persisting the result is the
//! caller's job.
//!
//! Checks run in a fixed order: the edge must exist for the current state,
//! then the asserted owner must match, then a transferring edge needs a new
//! owner.
use super::error::LedgerError;
use super::record::Record;
use super::workflow::Workflow;

fn key_of(record: &Record) -> String {
    record
        .key()
        .map(|key| key.to_string())
        .unwrap_or_else(|_| record.identity().join(":"))
}

fn check_owner(record: &Record, current_owner: &str) -> Result<(), LedgerError> {
    if record.owner() != Some(current_owner) {
        return Err(LedgerError::OwnershipMismatch {
            key: key_of(record),
            owner: record.owner().map(str::to_string),
            asserted: current_owner.to_string(),
        });
    }
    Ok(())
}

fn invalid_transition(record: &Record, operation: &str) -> LedgerError {
    LedgerError::InvalidStateTransition {
        key: key_of(record),
        operation: operation.to_string(),
        current_state: record.state().to_string(),
    }
}

/// Move `record` along the edge `(record.state, operation)`.
pub fn apply_transition(
    record: &Record,
    operation: &str,
    current_owner: &str,
    new_owner: Option<&str>,
) -> Result<Record, LedgerError> {
    let workflow = record.workflow()?;
    let edge = workflow
        .edge(record.state(), operation)
        .ok_or_else(|| invalid_transition(record, operation))?;

    check_owner(record, current_owner)?;

    let new_owner = if edge.transfers_ownership {
        match new_owner {
            Some(owner) if !owner.is_empty() => Some(owner),
            _ => {
                return Err(LedgerError::InvalidArgument(format!(
                    "'{operation}' transfers ownership of {} and needs a new owner",
                    key_of(record)
                )));
            }
        }
    } else {
        None
    };

    let mut next = record.clone();
    step(&mut next, edge.to, new_owner);
    tracing::debug!(key = %key_of(record), operation, from = edge.from, to = edge.to, "transition");

    if workflow.is_chained(operation) {
        follow_chain(workflow, &mut next, operation, new_owner);
    }

    Ok(next)
}

fn step(record: &mut Record, to: &str, new_owner: Option<&str>) {
    record.set_state(to);
    if let Some(owner) = new_owner {
        record.set_owner(owner.to_string());
    }
}

// Importer `paid`: keep advancing along edges of the same operation.
fn follow_chain(workflow: &Workflow, record: &mut Record, operation: &str, new_owner: Option<&str>) {
    while let Some(edge) = workflow.edge(record.state(), operation) {
        let owner = if edge.transfers_ownership { new_owner } else { None };
        step(record, edge.to, owner);
        tracing::debug!(operation, from = edge.from, to = edge.to, "chained transition");
    }
}

/// Terminal operation: hand the instrument back to its issuer.
pub fn redeem(record: &Record, operation: &str, current_owner: &str) -> Result<Record, LedgerError> {
    let workflow = record.workflow()?;
    let redemption = workflow
        .redemption
        .as_ref()
        .filter(|redemption| redemption.operation == operation)
        .ok_or_else(|| invalid_transition(record, operation))?;

    if record.state() == redemption.to {
        return Err(LedgerError::AlreadyRedeemed {
            key: key_of(record),
            state: record.state().to_string(),
        });
    }
    if record.state() != redemption.from {
        return Err(invalid_transition(record, operation));
    }

    check_owner(record, current_owner)?;

    let mut next = record.clone();
    let issuer = next.issuer().to_string();
    step(&mut next, redemption.to, Some(&issuer));
    tracing::debug!(key = %key_of(record), operation, to = redemption.to, "redeemed");

    Ok(next)
}
