use std::fmt;

use ed25519_dalek::SigningKey;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::contract::{Address, NetworkType};
use crate::crypto::{self, KdfParams, ENTROPY_LEN, SALT_LEN};
use crate::error::{Error, Result};
use crate::keys::{self, DerivationPath, PublicKey};

/// Persisted form of an identity. Only the salt, the sealed seed and the
/// password digest are secrets, and none of them is plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    pub name: String,
    pub alias: String,
    pub salt: String,
    pub encrypted_seed: String,
    pub password_hash: String,
    pub public_key: String,
}

/// A password-protected actor of a business.
///
/// The plaintext password is consumed by [`Identity::create`] and never
/// stored. A restored identity can report its public key straight away but
/// needs the password again before [`Identity::unlock`] yields a signing key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "IdentityRecord", into = "IdentityRecord")]
pub struct Identity {
    name: String,
    alias: String,
    salt: String,
    encrypted_seed: String,
    password_hash: String,
    public_key: PublicKey,
    // kept verbatim so a backup round trip is byte-identical
    public_key_text: String,
}

impl Identity {
    pub fn create(
        name: impl Into<String>,
        alias: impl Into<String>,
        password: Zeroizing<String>,
        kdf: KdfParams,
    ) -> Result<Self> {
        let salt: [u8; SALT_LEN] = crypto::random_bytes();
        let entropy = Zeroizing::new(crypto::random_bytes::<ENTROPY_LEN>());
        let salted = crypto::salted_password(&salt, &password);
        drop(password);

        let seed = crypto::seed_from_entropy(&entropy[..], &salted)?;
        let public_key = keys::derive_public_key(&seed[..], &DerivationPath::default());
        let sealed = crypto::seal_seed(&seed[..], &salted, &salt, kdf)?;

        Ok(Identity {
            name: name.into(),
            alias: alias.into(),
            salt: hex::encode(salt),
            encrypted_seed: hex::encode(sealed),
            password_hash: hex::encode(crypto::password_digest(&salted)),
            public_key_text: public_key.to_hex(),
            public_key,
        })
    }

    pub fn from_record(record: IdentityRecord) -> Result<Self> {
        let public_key = PublicKey::from_hex(&record.public_key)?;
        Ok(Identity {
            name: record.name,
            alias: record.alias,
            salt: record.salt,
            encrypted_seed: record.encrypted_seed,
            password_hash: record.password_hash,
            public_key,
            public_key_text: record.public_key,
        })
    }

    pub fn to_record(&self) -> IdentityRecord {
        IdentityRecord {
            name: self.name.clone(),
            alias: self.alias.clone(),
            salt: self.salt.clone(),
            encrypted_seed: self.encrypted_seed.clone(),
            password_hash: self.password_hash.clone(),
            public_key: self.public_key_text.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.public_key.0
    }

    pub fn address(&self, network: NetworkType) -> Address {
        Address::from_public_key(&self.public_key, network)
    }

    /// Verifies `password` and derives the signing key at `path`
    /// (the canonical account path when `None`).
    ///
    /// The key is returned to the caller and never cached here.
    pub fn unlock(&self, password: &str, path: Option<&DerivationPath>) -> Result<SigningKey> {
        if self.encrypted_seed.is_empty() {
            return Err(Error::Configuration(format!("identity '{}' cannot be unlocked", self.name)));
        }
        let salt = decode_secret("salt", &self.salt)?;
        let expected = decode_secret("password hash", &self.password_hash)?;
        let salted = crypto::salted_password(&salt, password);
        if !crypto::digests_match(&crypto::password_digest(&salted), &expected) {
            return Err(Error::InvalidPassword);
        }

        let sealed = decode_secret("encrypted seed", &self.encrypted_seed)?;
        let seed = crypto::open_seed(&sealed, &salted, &salt)?;
        let key = match path {
            Some(path) => keys::derive_signing_key(&seed, path),
            None => keys::derive_signing_key(&seed, &DerivationPath::default()),
        };
        tracing::debug!(identity = %self.name, "identity unlocked");
        Ok(key)
    }
}

fn decode_secret(field: &str, text: &str) -> Result<Vec<u8>> {
    hex::decode(text).map_err(|e| Error::Crypto(format!("invalid {field} encoding: {e}")))
}

impl TryFrom<IdentityRecord> for Identity {
    type Error = Error;

    fn try_from(record: IdentityRecord) -> Result<Self> {
        Identity::from_record(record)
    }
}

impl From<Identity> for IdentityRecord {
    fn from(identity: Identity) -> Self {
        identity.to_record()
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("name", &self.name)
            .field("alias", &self.alias)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: KdfParams = KdfParams::new(1024, 1);

    #[test]
    fn debug_output_hides_secrets() {
        let identity = Identity::create("Alice", "alice", Zeroizing::new("pw".into()), FAST).unwrap();
        let shown = format!("{identity:?}");
        assert!(shown.contains("Alice"));
        assert!(!shown.contains(&identity.to_record().encrypted_seed));
        assert!(!shown.contains(&identity.to_record().password_hash));
    }

    #[test]
    fn record_never_holds_the_password() {
        let identity = Identity::create("Bob", "bob", Zeroizing::new("hunter2-secret".into()), FAST).unwrap();
        let json = serde_json::to_string(&identity).unwrap();
        assert!(!json.contains("hunter2-secret"));
        assert!(json.contains("encryptedSeed"));
        assert!(json.contains("passwordHash"));
    }

    #[test]
    fn empty_seed_cannot_be_unlocked() {
        let mut record = Identity::create("C", "c", Zeroizing::new("pw".into()), FAST).unwrap().to_record();
        record.encrypted_seed.clear();
        let identity = Identity::from_record(record).unwrap();
        assert!(matches!(identity.unlock("pw", None), Err(Error::Configuration(_))));
    }

    #[test]
    fn malformed_public_key_is_rejected_on_restore() {
        let mut record = Identity::create("D", "d", Zeroizing::new("pw".into()), FAST).unwrap().to_record();
        record.public_key = "xyz".into();
        assert!(Identity::from_record(record).is_err());
    }
}
