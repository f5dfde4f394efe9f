//! Member brand reference data.
//!
//! Members are the tenant-scoping unit of the consortium.  The directory is
//! immutable reference data fetched once per session and consulted when
//! resolving display names and batch targets.

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::transport::AnalyticsTransport;

/// Identifier of a member brand.
pub type MemberId = i64;

/// A brand participating in the take-back program.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Numeric member identifier.
    pub id: MemberId,
    /// Display name used for report covers and filenames.
    pub name: String,
    /// Short tenant code used to brand and scope a session's view.
    pub code: String,
}

/// Immutable member directory for one session.
#[derive(Clone, Debug, Default)]
pub struct MemberDirectory {
    members: Vec<Member>,
}

impl MemberDirectory {
    /// Wraps an already-known list of members, preserving directory order.
    pub fn from_members(members: Vec<Member>) -> Self {
        Self { members }
    }

    /// Fetches the directory from the member endpoint.
    pub async fn fetch<T: AnalyticsTransport + ?Sized>(
        transport: &T,
    ) -> Result<Self, ReportError> {
        let members = transport.members().await?;
        Ok(Self { members })
    }

    /// Returns every member in directory order.
    pub fn all(&self) -> &[Member] {
        &self.members
    }

    /// Looks up a member by id.
    pub fn get(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }

    /// Looks up a member by tenant code.
    pub fn by_code(&self, code: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|member| member.code.eq_ignore_ascii_case(code))
    }

    /// Number of members in the directory.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemberDirectory {
        MemberDirectory::from_members(vec![
            Member {
                id: 1,
                name: "Evergreen Outfitters".to_owned(),
                code: "EVG".to_owned(),
            },
            Member {
                id: 2,
                name: "Cascade Trading Co".to_owned(),
                code: "CAS".to_owned(),
            },
        ])
    }

    #[test]
    fn lookup_by_id_and_code() {
        let directory = sample();
        assert_eq!(directory.get(2).map(|m| m.code.as_str()), Some("CAS"));
        assert_eq!(directory.by_code("evg").map(|m| m.id), Some(1));
        assert!(directory.get(99).is_none());
    }
}
