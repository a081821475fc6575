//! Deduplication against the ledger's current name resolution

use adapter_service::NameLedger;
use types::{Address, RegistrationRequest};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    /// Name already resolves to the requested address
    AlreadySatisfied,
    /// Name resolves to some other address
    Conflict { current: Address },
    /// Name does not resolve yet
    NeedsRegistration,
}

impl DedupOutcome {
    /// Message can be deleted without any transaction
    pub fn is_settled(&self) -> bool {
        !matches!(self, DedupOutcome::NeedsRegistration)
    }
}

/// Classify `request` against the ledger
///
/// A lookup failure is never read as "not registered"; it comes back as
/// [`PipelineError::LookupTransient`] so the message stays queued.
pub async fn check_registration(
    ledger: &dyn NameLedger,
    request: &RegistrationRequest,
) -> Result<DedupOutcome> {
    let resolved = ledger
        .resolve_name(&request.name)
        .await
        .map_err(|source| PipelineError::LookupTransient {
            name: request.name.clone(),
            source,
        })?;

    Ok(match resolved {
        None => DedupOutcome::NeedsRegistration,
        Some(current) if current == request.target_address => DedupOutcome::AlreadySatisfied,
        Some(current) => DedupOutcome::Conflict { current },
    })
}
