use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Clone, Deserialize, Serialize, Debug, PartialEq, Eq, Hash)]
pub struct Member {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl Member {
    /// Constructs a new Member. Only the `id` takes part in scheduling.
    pub fn new(id: &str, name: &str, email: &str) -> Member {
        Member {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
        }
    }
}

#[derive(Clone, Copy, Deserialize, Serialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Member,
}

/// Join record placing a user in a band
#[derive(Clone, Deserialize, Serialize, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct MemberRole {
    pub band_id: String,
    pub user_id: String,
    pub role: Role,
}

impl MemberRole {
    pub fn new(band_id: &str, user_id: &str, role: Role) -> MemberRole {
        MemberRole {
            band_id: band_id.to_string(),
            user_id: user_id.to_string(),
            role,
        }
    }
}

/// Resolves the roster of `band_id` from its join records.
/// Members keep the order of `members`; users without a record for the band are left out.
pub fn roster_for_band(band_id: &str, roles: &[MemberRole], members: &[Member]) -> Vec<Member> {
    let in_band: HashSet<&str> = roles
        .iter()
        .filter(|role| role.band_id == band_id)
        .map(|role| role.user_id.as_str())
        .collect();

    let roster: Vec<Member> = members
        .iter()
        .filter(|member| in_band.contains(member.id.as_str()))
        .cloned()
        .collect();

    debug!("band {} has {} members", band_id, roster.len());

    roster
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roster_only_includes_band_members() {
        let members = vec![
            Member::new("ana", "Ana", "ana@example.com"),
            Member::new("ben", "Ben", "ben@example.com"),
            Member::new("cleo", "Cleo", "cleo@example.com"),
        ];
        let roles = vec![
            MemberRole::new("band-1", "cleo", Role::Admin),
            MemberRole::new("band-1", "ana", Role::Member),
            MemberRole::new("band-2", "ben", Role::Admin),
            MemberRole::new("band-1", "ana", Role::Admin),
        ];

        let roster = roster_for_band("band-1", &roles, &members);

        assert_eq!(
            roster.iter().map(|m| m.id.as_str()).collect::<Vec<_>>(),
            vec!["ana", "cleo"]
        );
        assert!(roster_for_band("band-3", &roles, &members).is_empty());
    }

    #[test]
    fn role_uses_lowercase_names() {
        let role: MemberRole =
            serde_json::from_str(r#"{"bandId":"b","userId":"u","role":"admin"}"#).unwrap();
        assert_eq!(role, MemberRole::new("b", "u", Role::Admin));
    }
}
