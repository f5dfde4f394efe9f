//! Tenant filter resolution.
//!
//! The effective data scope is a pure function of the session state, threaded
//! explicitly through the pipeline rather than read from ambient storage.  The
//! resolver is the first line of defense against scope tampering; true
//! enforcement also exists server-side.

use log::warn;
use serde::Deserialize;

use crate::member::MemberId;

/// Fixed legacy member code mapped for PACT staff sessions without an
/// explicit selection.  Preserved verbatim as a fallback.
pub const LEGACY_STAFF_CODE: &str = "PACT";

/// Role carried by an authenticated session.
///
/// Unknown role strings deserialize to [`Role::Unknown`] and resolve to the
/// most restrictive scope instead of defaulting to broad access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Role {
    /// Consortium-wide administrator.
    SuperAdmin,
    /// Administrator, may act on behalf of any member.
    Admin,
    /// A member brand's own user.
    BrandMember,
    /// Read-only member user.
    Viewer,
    /// Any role string this build does not recognize.
    Unknown,
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "superAdmin" => Role::SuperAdmin,
            "admin" => Role::Admin,
            "brandMember" => Role::BrandMember,
            "viewer" => Role::Viewer,
            _ => Role::Unknown,
        }
    }
}

impl Role {
    /// Whether the role may select an arbitrary member to view.
    pub fn is_admin_tier(self) -> bool {
        matches!(self, Role::SuperAdmin | Role::Admin)
    }
}

/// Session state relevant to scope resolution.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionContext {
    /// Role of the authenticated user.
    pub role: Role,
    /// Member the user belongs to, if any.
    pub owned_member_id: Option<MemberId>,
    /// Member explicitly selected in the UI, honored for admin tiers only.
    pub selected_member_id: Option<MemberId>,
    /// Legacy marker for consortium staff accounts.
    pub pact_staff: bool,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            role: Role::Unknown,
            owned_member_id: None,
            selected_member_id: None,
            pact_staff: false,
        }
    }
}

/// Effective data scope derived from a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataScope {
    /// No restriction; every member's data is visible.
    AllMembers,
    /// Restricted to a single member.
    Member(MemberId),
    /// Legacy staff fallback mapped to [`LEGACY_STAFF_CODE`].
    LegacyStaff,
    /// Most restrictive interpretation: an empty result set.
    Denied,
}

impl DataScope {
    /// Value of the tenant-scope header sent with analytics requests, if any.
    pub fn scope_header(&self) -> Option<String> {
        match self {
            DataScope::AllMembers => None,
            DataScope::Member(id) => Some(id.to_string()),
            DataScope::LegacyStaff => Some(LEGACY_STAFF_CODE.to_owned()),
            DataScope::Denied => None,
        }
    }

    /// The restricting member id, when the scope names one.
    pub fn member_id(&self) -> Option<MemberId> {
        match self {
            DataScope::Member(id) => Some(*id),
            _ => None,
        }
    }
}

/// Resolves the effective data scope for a session.
///
/// Priority order, first match wins:
/// 1. brand members always see their own member; selection attempts are
///    ignored,
/// 2. admin tiers honor an explicit selection,
/// 3. staff sessions without a selection map to the fixed legacy code,
/// 4. admin tiers without a selection see all members,
/// 5. everything else resolves to the empty scope.
pub fn resolve_scope(session: &SessionContext) -> DataScope {
    match session.role {
        Role::BrandMember | Role::Viewer => {
            if let Some(owned) = session.owned_member_id {
                if session
                    .selected_member_id
                    .is_some_and(|selected| selected != owned)
                {
                    warn!(
                        "ignoring foreign member selection {:?} for member-bound session (member {})",
                        session.selected_member_id, owned
                    );
                }
                DataScope::Member(owned)
            } else {
                DataScope::Denied
            }
        }
        Role::SuperAdmin | Role::Admin => {
            if let Some(selected) = session.selected_member_id {
                DataScope::Member(selected)
            } else if session.pact_staff {
                DataScope::LegacyStaff
            } else {
                DataScope::AllMembers
            }
        }
        Role::Unknown => DataScope::Denied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brand_member_ignores_selection() {
        let session = SessionContext {
            role: Role::BrandMember,
            owned_member_id: Some(7),
            selected_member_id: Some(3),
            pact_staff: false,
        };
        assert_eq!(resolve_scope(&session), DataScope::Member(7));
    }

    #[test]
    fn admin_without_selection_sees_all() {
        let session = SessionContext {
            role: Role::Admin,
            ..SessionContext::default()
        };
        assert_eq!(resolve_scope(&session), DataScope::AllMembers);
    }

    #[test]
    fn staff_without_selection_maps_to_legacy_code() {
        let session = SessionContext {
            role: Role::SuperAdmin,
            pact_staff: true,
            ..SessionContext::default()
        };
        let scope = resolve_scope(&session);
        assert_eq!(scope.scope_header().as_deref(), Some(LEGACY_STAFF_CODE));
    }

    #[test]
    fn unknown_role_is_denied() {
        let session = SessionContext {
            role: Role::Unknown,
            owned_member_id: Some(4),
            selected_member_id: Some(4),
            pact_staff: false,
        };
        assert_eq!(resolve_scope(&session), DataScope::Denied);
    }
}
