use super::{Concern, ConcernInputs};
use crate::contract::{Address, AliasAction, DigitalContract, NamespaceId, Operation, Registration};
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::keys::PublicKey;

pub const MAX_ALIAS_LEVELS: usize = 3;

/// Binds each identity's account to an on-chain name derived from its alias.
///
/// Every identity is unlocked first, so a wrong password aborts the whole
/// contract before anything is built.
pub struct Identification<'a> {
    identities: &'a [Identity],
}

impl<'a> Identification<'a> {
    pub fn new(identities: &'a [Identity]) -> Self {
        Identification { identities }
    }
}

/// Splits a dotted alias into its cumulative levels: `a.b.c` gives
/// `["a", "a.b", "a.b.c"]`.
pub fn alias_levels(alias: &str) -> Result<Vec<String>> {
    let parts: Vec<&str> = alias.split('.').collect();
    if parts.len() > MAX_ALIAS_LEVELS {
        return Err(Error::Validation(format!(
            "invalid namespace name '{alias}', maximum {MAX_ALIAS_LEVELS} levels allowed (separated by dots)"
        )));
    }
    let valid_part = |p: &&str| {
        !p.is_empty() && p.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    };
    if !parts.iter().all(valid_part) {
        return Err(Error::Validation(format!(
            "invalid namespace name '{alias}', only lowercase letters, digits and '-' are allowed"
        )));
    }
    Ok((1..=parts.len()).map(|n| parts[..n].join(".")).collect())
}

fn alias_operations(alias: &str, signer: PublicKey, inputs: &ConcernInputs) -> Result<Vec<Operation>> {
    let levels = alias_levels(alias)?;
    let mut operations = Vec::with_capacity(levels.len() + 1);
    let mut parent: Option<(String, NamespaceId)> = None;
    for level in &levels {
        let name = level.rsplit('.').next().unwrap_or(level.as_str()).to_string();
        let namespace_id = NamespaceId::child(parent.as_ref().map(|(_, id)| *id), &name);
        let registration = match &parent {
            None => Registration::Root { duration: inputs.envelope.namespace_rental_blocks },
            Some((parent_name, parent_id)) => {
                Registration::Child { parent: parent_name.clone(), parent_id: *parent_id }
            }
        };
        operations.push(Operation::NamespaceRegistration { name, namespace_id, registration });
        parent = Some((level.clone(), namespace_id));
    }

    let address = Address::from_public_key(&signer, inputs.envelope.network);
    operations.push(Operation::AddressAlias {
        action: AliasAction::Link,
        namespace_id: NamespaceId::from_name(alias),
        address,
    });
    Ok(operations)
}

impl Concern for Identification<'_> {
    fn name(&self) -> &'static str {
        "identification"
    }

    fn execute(&self, inputs: &ConcernInputs) -> Result<DigitalContract> {
        if self.identities.is_empty() {
            return Err(Error::Configuration(
                "no identities configured, add identities information first".into(),
            ));
        }

        let mut operations = Vec::new();
        for (i, identity) in self.identities.iter().enumerate() {
            let password = inputs.passwords.get(i).ok_or_else(|| {
                Error::Configuration(format!("missing password for identity '{}'", identity.name()))
            })?;
            let account = identity.unlock(password, None)?;
            let signer = PublicKey::from(&account);
            drop(account);

            let alias = identity.alias().to_lowercase();
            operations.extend(
                alias_operations(&alias, signer, inputs)?
                    .into_iter()
                    .map(|op| op.signed_off_by(signer)),
            );
        }
        Ok(DigitalContract::new(&inputs.envelope, operations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_cumulative() {
        assert_eq!(alias_levels("a").unwrap(), vec!["a"]);
        assert_eq!(alias_levels("a.b.c").unwrap(), vec!["a", "a.b", "a.b.c"]);
    }

    #[test]
    fn rejects_deep_or_malformed_aliases() {
        for bad in ["a.b.c.d", "", "a..b", "Bad", "a_b", "a.b c", "."] {
            assert!(matches!(alias_levels(bad), Err(Error::Validation(_))), "{bad} should fail");
        }
    }

    #[test]
    fn child_levels_reference_their_parent() {
        let inputs = ConcernInputs::default();
        let ops = alias_operations("acme.cto", PublicKey([3u8; 32]), &inputs).unwrap();
        assert_eq!(ops.len(), 3);
        let root_id = match &ops[0] {
            Operation::NamespaceRegistration { name, namespace_id, registration: Registration::Root { duration } } => {
                assert_eq!(name, "acme");
                assert_eq!(*duration, inputs.envelope.namespace_rental_blocks);
                *namespace_id
            }
            other => panic!("unexpected {other:?}"),
        };
        match &ops[1] {
            Operation::NamespaceRegistration { name, registration: Registration::Child { parent, parent_id }, .. } => {
                assert_eq!(name, "cto");
                assert_eq!(parent, "acme");
                assert_eq!(*parent_id, root_id);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &ops[2] {
            Operation::AddressAlias { action, namespace_id, .. } => {
                assert_eq!(*action, AliasAction::Link);
                assert_eq!(*namespace_id, NamespaceId::from_name("acme.cto"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
