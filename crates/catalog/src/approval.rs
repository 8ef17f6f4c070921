use foundation::Version;
use serde::Serialize;

use crate::{Catalog, CatalogError, CatalogMode};

/// Workflow state of a pending version group.
///
/// `Approved` and `Failed` are terminal; failures are not retried.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Submitting,
    Approved,
    Failed { status: u16 },
}

impl ApprovalState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ApprovalState::Approved | ApprovalState::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApprovalState::Pending => "pending",
            ApprovalState::Submitting => "submitting",
            ApprovalState::Approved => "approved",
            ApprovalState::Failed { .. } => "failed",
        }
    }
}

impl Catalog {
    pub fn approval(&self, version: &Version) -> Option<ApprovalState> {
        self.group(version).and_then(|g| g.approval())
    }

    /// Move a pending group to `Submitting`.
    pub fn begin_approval(&mut self, version: &Version) -> Result<(), CatalogError> {
        let state = self.approval_slot(version)?;
        match *state {
            ApprovalState::Pending => {
                *state = ApprovalState::Submitting;
                Ok(())
            }
            ApprovalState::Submitting => Err(CatalogError::ApprovalInFlight(version.clone())),
            ApprovalState::Approved | ApprovalState::Failed { .. } => {
                Err(CatalogError::ApprovalClosed(version.clone()))
            }
        }
    }

    /// Record the API's answer to a submitted approval.
    pub fn finish_approval(
        &mut self,
        version: &Version,
        ok: bool,
        status: u16,
    ) -> Result<ApprovalState, CatalogError> {
        let state = self.approval_slot(version)?;
        if *state != ApprovalState::Submitting {
            return Err(CatalogError::ApprovalNotStarted(version.clone()));
        }
        *state = if ok {
            ApprovalState::Approved
        } else {
            ApprovalState::Failed { status }
        };
        Ok(*state)
    }

    fn approval_slot(&mut self, version: &Version) -> Result<&mut ApprovalState, CatalogError> {
        if self.mode != CatalogMode::Pending {
            return Err(CatalogError::NotPending);
        }
        let group = self
            .group_mut(version)
            .ok_or_else(|| CatalogError::UnknownVersion(version.clone()))?;
        Ok(group.approval.get_or_insert(ApprovalState::Pending))
    }
}

#[cfg(test)]
mod tests {
    use formats::GroupPayload;
    use foundation::{Generation, Version};

    use crate::{ApprovalState, Catalog, CatalogError, CatalogMode};

    fn pending() -> Catalog {
        let payload = GroupPayload {
            version: "v1".to_string(),
            layers: Vec::new(),
            metadata_url: None,
            metadata: None,
        };
        Catalog::build(Generation(1), CatalogMode::Pending, &[payload]).0
    }

    #[test]
    fn approval_success_is_terminal() {
        let mut c = pending();
        let v = Version::from("v1");
        c.begin_approval(&v).unwrap();
        assert_eq!(c.approval(&v), Some(ApprovalState::Submitting));
        assert_eq!(
            c.begin_approval(&v),
            Err(CatalogError::ApprovalInFlight(v.clone()))
        );
        assert_eq!(c.finish_approval(&v, true, 200), Ok(ApprovalState::Approved));
        assert_eq!(c.begin_approval(&v), Err(CatalogError::ApprovalClosed(v.clone())));
    }

    #[test]
    fn failed_approval_is_not_retried() {
        let mut c = pending();
        let v = Version::from("v1");
        c.begin_approval(&v).unwrap();
        assert_eq!(
            c.finish_approval(&v, false, 409),
            Ok(ApprovalState::Failed { status: 409 })
        );
        assert!(c.approval(&v).unwrap().is_terminal());
        assert_eq!(c.begin_approval(&v), Err(CatalogError::ApprovalClosed(v)));
    }

    #[test]
    fn finish_without_begin_is_rejected() {
        let mut c = pending();
        let v = Version::from("v1");
        assert_eq!(
            c.finish_approval(&v, true, 200),
            Err(CatalogError::ApprovalNotStarted(v))
        );
    }

    #[test]
    fn only_pending_catalogs_approve() {
        let mut c = Catalog::empty(Generation(1), CatalogMode::Approved);
        assert_eq!(
            c.begin_approval(&Version::from("v1")),
            Err(CatalogError::NotPending)
        );
        let mut c = pending();
        assert_eq!(
            c.begin_approval(&Version::from("v2")),
            Err(CatalogError::UnknownVersion(Version::from("v2")))
        );
    }
}
