//! Contract operations bound to the workflow tables
//!
//! A [`Contract`] does not hand-write one function per business action.
//! Every operation name it accepts comes from its [`Workflow`]: the creation
//! operation, the edges and the optional redemption. Each call fetches the
//! record, lets the engine decide, records the operation's business
//! arguments as attributes and writes the record back, all inside the
//! caller's transaction context.
use super::engine;
use super::error::LedgerError;
use super::record::{CompositeKey, Record};
use super::store::RecordStore;
use super::workflow::{self, Signature, Workflow};
use super::world_state::TransactionContext;
use std::collections::BTreeMap;

/// One call against a contract, built up the same way for every operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionRequest {
    operation: String,
    identity: Vec<String>,
    current_owner: Option<String>,
    new_owner: Option<String>,
    arguments: BTreeMap<String, String>,
}

impl TransitionRequest {
    pub fn new(operation: &str, identity: &[&str]) -> Self {
        Self {
            operation: operation.to_string(),
            identity: identity.iter().map(|part| part.to_string()).collect(),
            ..Self::default()
        }
    }
    pub fn current_owner(mut self, owner: &str) -> Self {
        self.current_owner = Some(owner.to_string());
        self
    }
    pub fn new_owner(mut self, owner: &str) -> Self {
        self.new_owner = Some(owner.to_string());
        self
    }
    pub fn argument(mut self, name: &str, value: impl Into<String>) -> Self {
        self.arguments.insert(name.to_string(), value.into());
        self
    }
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contract {
    workflow: &'static Workflow,
}

impl Contract {
    pub fn new(workflow: &'static Workflow) -> Self {
        Self { workflow }
    }

    pub fn for_kind(kind: &str) -> Result<Self, LedgerError> {
        workflow::lookup(kind)
            .map(Self::new)
            .ok_or_else(|| LedgerError::InvalidArgument(format!("no contract for kind {kind}")))
    }

    pub fn letter_of_credit() -> Self {
        Self::new(&workflow::LETTER_OF_CREDIT)
    }

    pub fn buyer_financing() -> Self {
        Self::new(&workflow::BUYER_FINANCING)
    }

    pub fn importer_letter_of_credit() -> Self {
        Self::new(&workflow::IMPORTER_LETTER_OF_CREDIT)
    }

    pub fn workflow(&self) -> &'static Workflow {
        self.workflow
    }

    pub fn kind(&self) -> &'static str {
        self.workflow.kind
    }

    /// Setup hook run once when the contract is deployed. Nothing to migrate yet.
    pub fn instantiate<C: TransactionContext + ?Sized>(&self, ctx: &C) {
        tracing::info!(
            contract = self.workflow.kind,
            tx_id = %ctx.tx_id(),
            caller = %ctx.caller(),
            "Instantiate the contract"
        );
    }

    /// Run one operation and return the serialized record it produced.
    pub fn submit<C: TransactionContext + ?Sized>(
        &self,
        ctx: &mut C,
        request: &TransitionRequest,
    ) -> Result<Vec<u8>, LedgerError> {
        let span = tracing::info_span!(
            "contract",
            kind = self.workflow.kind,
            operation = %request.operation,
            tx_id = %ctx.tx_id(),
            caller = %ctx.caller()
        );
        let _enter = span.enter();

        let result = self.dispatch(ctx, request);
        match &result {
            Ok(record) => tracing::info!(
                key = %record.key().map(|key| key.to_string()).unwrap_or_default(),
                state = record.state(),
                owner = record.owner().unwrap_or_default(),
                "applied"
            ),
            Err(err) => tracing::warn!(error = %err, "rejected"),
        }

        result?.serialize()
    }

    /// Positional form of [`Contract::submit`].
    ///
    /// Arguments are, in order: the identity fields, the current owner (all
    /// but the creation operation), the new owner (ownership-transferring
    /// operations only), then the operation's business arguments ending with
    /// its timestamp.
    pub fn invoke<C: TransactionContext + ?Sized>(
        &self,
        ctx: &mut C,
        operation: &str,
        args: &[&str],
    ) -> Result<Vec<u8>, LedgerError> {
        let request = self.marshal(operation, args)?;
        self.submit(ctx, &request)
    }

    /// Fetch one instrument without changing it.
    pub fn query<C: TransactionContext + ?Sized>(
        &self,
        ctx: &mut C,
        identity: &[&str],
    ) -> Result<Record, LedgerError> {
        let key = self.key(identity)?;
        RecordStore::new(ctx, self.workflow.kind).get(&key)
    }

    /// Every instrument of this contract's kind, for reporting.
    pub fn list<C: TransactionContext + ?Sized>(
        &self,
        ctx: &mut C,
    ) -> Result<Vec<Record>, LedgerError> {
        RecordStore::new(ctx, self.workflow.kind).list()?.collect()
    }

    /// Argument names of `operation` in positional order.
    pub fn parameters(&self, operation: &str) -> Option<Vec<&'static str>> {
        let signature = self.workflow.signature(operation)?;
        let mut names = self.workflow.identity_fields.to_vec();
        match signature {
            Signature::Create { .. } => {}
            Signature::Transition {
                transfers_ownership,
                ..
            } => {
                names.push("currentOwner");
                if transfers_ownership {
                    names.push("newOwner");
                }
            }
            Signature::Redeem { .. } => names.push("currentOwner"),
        }
        names.extend_from_slice(signature.arguments());
        Some(names)
    }

    fn key<S: AsRef<str>>(&self, identity: &[S]) -> Result<CompositeKey, LedgerError> {
        let expected = self.workflow.identity_fields;
        if identity.len() != expected.len() {
            return Err(LedgerError::InvalidArgument(format!(
                "{} identity expects {} fields ({}), got {}",
                self.workflow.kind,
                expected.len(),
                expected.join(", "),
                identity.len()
            )));
        }
        CompositeKey::from_identity(identity)
    }

    fn marshal(&self, operation: &str, args: &[&str]) -> Result<TransitionRequest, LedgerError> {
        let identity_len = self.workflow.identity_fields.len();

        let Some(names) = self.parameters(operation) else {
            // Unknown here, but the record may exist: let dispatch report its state.
            if args.len() < identity_len {
                return Err(LedgerError::InvalidArgument(format!(
                    "'{operation}' needs at least {identity_len} identity arguments"
                )));
            }
            return Ok(TransitionRequest::new(operation, &args[..identity_len]));
        };

        if args.len() != names.len() {
            return Err(LedgerError::InvalidArgument(format!(
                "'{operation}' expects {} arguments ({}), got {}",
                names.len(),
                names.join(", "),
                args.len()
            )));
        }

        let mut request = TransitionRequest::new(operation, &args[..identity_len]);
        for (name, value) in names.iter().zip(args).skip(identity_len) {
            request = match *name {
                "currentOwner" => request.current_owner(value),
                "newOwner" => request.new_owner(value),
                _ => request.argument(name, *value),
            };
        }
        Ok(request)
    }

    fn dispatch<C: TransactionContext + ?Sized>(
        &self,
        ctx: &mut C,
        request: &TransitionRequest,
    ) -> Result<Record, LedgerError> {
        let key = self.key(request.identity.as_slice())?;
        let operation = request.operation.as_str();

        let Some(signature) = self.workflow.signature(operation) else {
            let record = RecordStore::new(ctx, self.workflow.kind).get(&key)?;
            return Err(LedgerError::InvalidStateTransition {
                key: key.to_string(),
                operation: operation.to_string(),
                current_state: record.state().to_string(),
            });
        };
        let arguments = check_arguments(operation, signature.arguments(), &request.arguments)?;

        match signature {
            Signature::Create { .. } => {
                if request.current_owner.is_some() || request.new_owner.is_some() {
                    return Err(LedgerError::InvalidArgument(format!(
                        "'{operation}' creates {key} and takes no owner arguments"
                    )));
                }
                self.create(ctx, request.identity.clone(), arguments)
            }
            Signature::Transition {
                transfers_ownership,
                ..
            } => {
                let current_owner = required_owner(operation, &request.current_owner)?;
                if !transfers_ownership && request.new_owner.is_some() {
                    return Err(LedgerError::InvalidArgument(format!(
                        "'{operation}' does not transfer ownership"
                    )));
                }
                let new_owner = request.new_owner.as_deref();
                self.advance(ctx, &key, arguments, |record| {
                    engine::apply_transition(record, operation, current_owner, new_owner)
                })
            }
            Signature::Redeem { .. } => {
                let current_owner = required_owner(operation, &request.current_owner)?;
                if request.new_owner.is_some() {
                    return Err(LedgerError::InvalidArgument(format!(
                        "'{operation}' always returns {key} to its issuer"
                    )));
                }
                self.advance(ctx, &key, arguments, |record| {
                    engine::redeem(record, operation, current_owner)
                })
            }
        }
    }

    fn create<C: TransactionContext + ?Sized>(
        &self,
        ctx: &mut C,
        identity: Vec<String>,
        arguments: Vec<(&'static str, String)>,
    ) -> Result<Record, LedgerError> {
        let attributes = arguments
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect();
        let mut record = Record::create(self.workflow.kind, identity, attributes)?;

        // Newly issued paper is owned by the issuer
        let issuer = record.issuer().to_string();
        record.set_owner(issuer);

        RecordStore::new(ctx, self.workflow.kind).add(&record)?;
        Ok(record)
    }

    fn advance<C, F>(
        &self,
        ctx: &mut C,
        key: &CompositeKey,
        arguments: Vec<(&'static str, String)>,
        transition: F,
    ) -> Result<Record, LedgerError>
    where
        C: TransactionContext + ?Sized,
        F: FnOnce(&Record) -> Result<Record, LedgerError>,
    {
        let mut store = RecordStore::new(ctx, self.workflow.kind);
        let record = store.get(key)?;

        let mut next = transition(&record)?;
        for (name, value) in arguments {
            next.set_attribute(name, value);
        }

        store.update(&next)?;
        Ok(next)
    }
}

fn required_owner<'r>(operation: &str, owner: &'r Option<String>) -> Result<&'r str, LedgerError> {
    match owner.as_deref() {
        Some(owner) if !owner.is_empty() => Ok(owner),
        _ => Err(LedgerError::InvalidArgument(format!(
            "'{operation}' requires the current owner"
        ))),
    }
}

// Every declared argument is required and non-empty, nothing undeclared is accepted.
fn check_arguments(
    operation: &str,
    declared: &'static [&'static str],
    supplied: &BTreeMap<String, String>,
) -> Result<Vec<(&'static str, String)>, LedgerError> {
    if let Some(unknown) = supplied.keys().find(|name| !declared.contains(&name.as_str())) {
        return Err(LedgerError::InvalidArgument(format!(
            "'{operation}' does not take argument {unknown}"
        )));
    }

    declared
        .iter()
        .map(|name| match supplied.get(*name) {
            Some(value) if !value.is_empty() => Ok((*name, value.clone())),
            _ => Err(LedgerError::InvalidArgument(format!(
                "'{operation}' requires argument {name}"
            ))),
        })
        .collect()
}
