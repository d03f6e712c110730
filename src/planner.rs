//! Partitions work items into groups that can share one authenticated session.

use std::collections::HashMap;

use serde::Serialize;

use crate::domain::{Credential, GroupKey, WorkItem};

/// Items sharing one `(tribunal, grau)` scope, plus the credential for that scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub key: GroupKey,
    /// `None` when no requested credential covers this scope. The items stay
    /// in the group so the executor can record them as failed.
    #[serde(skip)]
    pub credential: Option<Credential>,
    pub items: Vec<WorkItem>,
}

impl Group {
    pub fn credential_id(&self) -> Option<i64> {
        self.credential.as_ref().map(|c| c.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CapturePlan {
    pub groups: Vec<Group>,
}

impl CapturePlan {
    pub fn item_count(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }

    pub fn group(&self, key: &GroupKey) -> Option<&Group> {
        self.groups.iter().find(|g| &g.key == key)
    }
}

/// Builds the plan. Groups appear in the order their first item appears and
/// items keep their input order within a group, so identical input always
/// yields an identical plan. The first credential matching a scope wins.
pub fn plan(items: Vec<WorkItem>, credentials: &[Credential]) -> CapturePlan {
    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::new();

    for item in items {
        let key = item.group_key();
        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Group {
                key,
                credential: credentials.iter().find(|c| c.group_key() == key).cloned(),
                items: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].items.push(item);
    }

    CapturePlan { groups }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Grau, TribunalCode};

    fn item(id: i64, region: u8, grau: Grau) -> WorkItem {
        WorkItem {
            id,
            process_number: format!("proc-{id}"),
            remote_id: id * 10,
            tribunal: TribunalCode::new(region).unwrap(),
            grau,
        }
    }

    fn credential(id: i64, region: u8, grau: Grau) -> Credential {
        Credential {
            id,
            tribunal: TribunalCode::new(region).unwrap(),
            grau,
            login: "login".into(),
            password: "secret".into(),
        }
    }

    #[test]
    fn groups_by_tribunal_and_grau_in_first_seen_order() {
        let items = vec![
            item(1, 1, Grau::PrimeiroGrau),
            item(2, 2, Grau::SegundoGrau),
            item(3, 1, Grau::PrimeiroGrau),
            item(4, 1, Grau::SegundoGrau),
        ];
        let plan = plan(items, &[]);
        let keys: Vec<String> = plan.groups.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(
            keys,
            vec!["TRT1/primeiro_grau", "TRT2/segundo_grau", "TRT1/segundo_grau"]
        );
        let first: Vec<i64> = plan.groups[0].items.iter().map(|i| i.id).collect();
        assert_eq!(first, vec![1, 3]);
        assert_eq!(plan.item_count(), 4);
    }

    #[test]
    fn credential_always_matches_its_group_scope() {
        let items = vec![
            item(1, 1, Grau::PrimeiroGrau),
            item(2, 1, Grau::SegundoGrau),
            item(3, 3, Grau::PrimeiroGrau),
        ];
        let creds = vec![
            credential(10, 1, Grau::SegundoGrau),
            credential(11, 1, Grau::PrimeiroGrau),
            credential(12, 3, Grau::PrimeiroGrau),
        ];
        let plan = plan(items, &creds);
        for group in &plan.groups {
            let cred = group.credential.as_ref().unwrap();
            assert_eq!(cred.group_key(), group.key);
            for item in &group.items {
                assert_eq!(item.group_key(), cred.group_key());
            }
        }
    }

    #[test]
    fn group_without_credential_keeps_its_items() {
        let items = vec![
            item(1, 1, Grau::PrimeiroGrau),
            item(2, 1, Grau::PrimeiroGrau),
            item(3, 2, Grau::SegundoGrau),
        ];
        let plan = plan(items, &[credential(10, 1, Grau::PrimeiroGrau)]);
        let orphan = plan
            .group(&GroupKey::new(TribunalCode::new(2).unwrap(), Grau::SegundoGrau))
            .unwrap();
        assert!(orphan.credential.is_none());
        assert_eq!(orphan.items.len(), 1);
        assert_eq!(plan.groups[0].credential_id(), Some(10));
    }

    #[test]
    fn first_matching_credential_wins() {
        let plan = plan(
            vec![item(1, 5, Grau::PrimeiroGrau)],
            &[credential(20, 5, Grau::PrimeiroGrau), credential(21, 5, Grau::PrimeiroGrau)],
        );
        assert_eq!(plan.groups[0].credential_id(), Some(20));
    }

    #[test]
    fn planning_is_deterministic() {
        let items = vec![
            item(1, 4, Grau::PrimeiroGrau),
            item(2, 9, Grau::TribunalSuperior),
            item(3, 4, Grau::PrimeiroGrau),
        ];
        let creds = vec![credential(1, 4, Grau::PrimeiroGrau)];
        assert_eq!(plan(items.clone(), &creds), plan(items, &creds));
    }
}
