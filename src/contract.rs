//! Digital contracts: unsigned aggregate bundles of ledger operations.
//!
//! The ledger SDK is an outside collaborator, so this module carries only
//! the operation kinds the concerns emit, a deterministic binary payload
//! (bincode) for request artifacts, and detached offline signing.

use std::fmt;

use blake3::Hasher;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use crate::crypto;
use crate::error::{Error, Result};
use crate::keys::PublicKey;

/// Generation hash of the public test network.
pub const TESTNET_GENERATION_HASH: &str =
    "57F7DA205008026C776CB6AED843393F04CD458E0AA2D9F1D5F31A402072B2D6";
pub const DEFAULT_MAX_FEE: u64 = 30_000;
pub const DEFAULT_DEADLINE: u64 = 1_573_430_400;
pub const BLOCK_TARGET_SECONDS: u64 = 15;
pub const BLOCKS_IN_ONE_YEAR: u64 = (365 * 24 * 60 * 60) / BLOCK_TARGET_SECONDS;
pub const DEFAULT_CURRENCY: &str = "symbol.xym";
pub const CURRENCY_DIVISIBILITY: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    Mainnet,
    Testnet,
}

impl NetworkType {
    pub fn id(self) -> u8 {
        match self {
            NetworkType::Mainnet => 0x68,
            NetworkType::Testnet => 0x98,
        }
    }
}

impl Default for NetworkType {
    fn default() -> Self {
        NetworkType::Testnet
    }
}

/// A 24-byte account address: network byte followed by a BLAKE3 digest of
/// the public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub [u8; 24]);

impl Address {
    pub fn from_public_key(public_key: &PublicKey, network: NetworkType) -> Self {
        let digest = Hasher::new_derive_key("minibiz address v1")
            .update(public_key.as_bytes())
            .finalize();
        let mut bytes = [0u8; 24];
        bytes[0] = network.id();
        bytes[1..].copy_from_slice(&digest.as_bytes()[..23]);
        Address(bytes)
    }

    pub fn network_id(&self) -> u8 {
        self.0[0]
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MosaicId(pub u64);

impl MosaicId {
    /// Mosaic ids never have the namespace bit set.
    pub fn from_nonce(nonce: u32, owner: &Address) -> Self {
        let digest = Hasher::new_derive_key("minibiz mosaic id v1")
            .update(&nonce.to_le_bytes())
            .update(&owner.0)
            .finalize();
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&digest.as_bytes()[..8]);
        MosaicId(u64::from_le_bytes(raw) & !NAMESPACE_FLAG)
    }

    pub fn to_hex(&self) -> String {
        format!("{:016X}", self.0)
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        let raw = u64::from_str_radix(text.trim(), 16)
            .map_err(|e| Error::Validation(format!("invalid mosaic id '{text}': {e}")))?;
        if raw & NAMESPACE_FLAG != 0 {
            return Err(Error::Validation(format!("'{text}' is a namespace id, not a mosaic id")));
        }
        Ok(MosaicId(raw))
    }
}

const NAMESPACE_FLAG: u64 = 1 << 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamespaceId(pub u64);

impl NamespaceId {
    pub fn child(parent: Option<NamespaceId>, name: &str) -> Self {
        let parent = parent.map(|p| p.0).unwrap_or(0);
        let digest = Hasher::new_derive_key("minibiz namespace id v1")
            .update(&parent.to_le_bytes())
            .update(name.as_bytes())
            .finalize();
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&digest.as_bytes()[..8]);
        NamespaceId(u64::from_le_bytes(raw) | NAMESPACE_FLAG)
    }

    /// Resolves a dotted name (`a.b.c`) level by level.
    pub fn from_name(full_name: &str) -> Self {
        let mut id = None;
        for part in full_name.split('.') {
            id = Some(NamespaceId::child(id, part));
        }
        id.unwrap_or_else(|| NamespaceId::child(None, ""))
    }

    pub fn to_hex(&self) -> String {
        format!("{:016X}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnresolvedMosaic {
    Mosaic(MosaicId),
    Namespace(NamespaceId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mosaic {
    pub id: UnresolvedMosaic,
    pub amount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MosaicFlags {
    pub supply_mutable: bool,
    pub transferable: bool,
    pub restrictable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SupplyAction {
    Decrease,
    Increase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AliasAction {
    Unlink,
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Registration {
    Root { duration: u64 },
    Child { parent: String, parent_id: NamespaceId },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    MosaicDefinition {
        nonce: u32,
        mosaic_id: MosaicId,
        flags: MosaicFlags,
        divisibility: u8,
        duration: u64,
    },
    MosaicSupplyChange {
        mosaic_id: MosaicId,
        action: SupplyAction,
        delta: u64,
    },
    Transfer {
        recipient: Address,
        mosaics: Vec<Mosaic>,
        message: String,
    },
    NamespaceRegistration {
        name: String,
        namespace_id: NamespaceId,
        registration: Registration,
    },
    AddressAlias {
        action: AliasAction,
        namespace_id: NamespaceId,
        address: Address,
    },
    MultisigAccountModification {
        min_approval: u32,
        min_removal: u32,
        additions: Vec<Address>,
        deletions: Vec<Address>,
    },
}

impl Operation {
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::MosaicDefinition { .. } => "mosaic_definition",
            Operation::MosaicSupplyChange { .. } => "mosaic_supply_change",
            Operation::Transfer { .. } => "transfer",
            Operation::NamespaceRegistration { .. } => "namespace_registration",
            Operation::AddressAlias { .. } => "address_alias",
            Operation::MultisigAccountModification { .. } => "multisig_account_modification",
        }
    }

    /// Attaches the account that signs off this operation inside an aggregate.
    pub fn signed_off_by(self, signer: PublicKey) -> EmbeddedOperation {
        EmbeddedOperation { signer, operation: self }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedOperation {
    pub signer: PublicKey,
    pub operation: Operation,
}

/// Network and fee settings shared by every contract a command builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractEnvelope {
    pub network: NetworkType,
    pub generation_hash: [u8; 32],
    pub max_fee: u64,
    pub deadline: u64,
    pub namespace_rental_blocks: u64,
    pub currency: String,
}

impl Default for ContractEnvelope {
    fn default() -> Self {
        let mut generation_hash = [0u8; 32];
        // constant is valid hex of the right length
        if let Ok(bytes) = hex::decode(TESTNET_GENERATION_HASH) {
            generation_hash.copy_from_slice(&bytes);
        }
        ContractEnvelope {
            network: NetworkType::Testnet,
            generation_hash,
            max_fee: DEFAULT_MAX_FEE,
            deadline: DEFAULT_DEADLINE,
            namespace_rental_blocks: BLOCKS_IN_ONE_YEAR,
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitalContract {
    pub network: NetworkType,
    pub max_fee: u64,
    pub deadline: u64,
    pub operations: Vec<EmbeddedOperation>,
}

impl DigitalContract {
    pub fn new(envelope: &ContractEnvelope, operations: Vec<EmbeddedOperation>) -> Self {
        DigitalContract {
            network: envelope.network,
            max_fee: envelope.max_fee,
            deadline: envelope.deadline,
            operations,
        }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn to_payload(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Encoding(format!("contract payload: {e}")))
    }

    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        bincode::deserialize(payload).map_err(|e| Error::Encoding(format!("contract payload: {e}")))
    }

    pub fn payload_hex(&self) -> Result<String> {
        Ok(hex::encode_upper(self.to_payload()?))
    }

    fn signing_bytes(&self, generation_hash: &[u8; 32]) -> Result<Vec<u8>> {
        let payload = self.to_payload()?;
        let mut bytes = Vec::with_capacity(32 + payload.len());
        bytes.extend_from_slice(generation_hash);
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Hash binding the contract to one network.
    pub fn hash(&self, generation_hash: &[u8; 32]) -> Result<[u8; 32]> {
        Ok(crypto::sha256(&self.signing_bytes(generation_hash)?))
    }

    /// Mosaic ids defined by this contract, in operation order.
    pub fn defined_mosaics(&self) -> Vec<MosaicId> {
        self.operations
            .iter()
            .filter_map(|op| match &op.operation {
                Operation::MosaicDefinition { mosaic_id, .. } => Some(*mosaic_id),
                _ => None,
            })
            .collect()
    }

    pub fn sign(self, key: &SigningKey, generation_hash: &[u8; 32]) -> Result<SignedContract> {
        let bytes = self.signing_bytes(generation_hash)?;
        let signature = key.sign(&bytes);
        Ok(SignedContract {
            hash: hex::encode_upper(crypto::sha256(&bytes)),
            signer: PublicKey::from(key),
            signature: hex::encode_upper(signature.to_bytes()),
            contract: self,
        })
    }

    pub fn request(&self, generation_hash: &[u8; 32]) -> Result<TransactionRequest> {
        Ok(TransactionRequest {
            v: REQUEST_VERSION,
            kind: REQUEST_TYPE_TRANSACTION,
            network_id: self.network.id(),
            chain_id: hex::encode_upper(generation_hash),
            data: RequestData { payload: self.payload_hex()? },
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedContract {
    pub contract: DigitalContract,
    pub signer: PublicKey,
    pub signature: String,
    pub hash: String,
}

impl SignedContract {
    pub fn verify(&self, generation_hash: &[u8; 32]) -> Result<bool> {
        let raw = hex::decode(&self.signature)
            .map_err(|e| Error::Validation(format!("invalid signature hex: {e}")))?;
        let raw: [u8; 64] = match raw.try_into() {
            Ok(raw) => raw,
            Err(_) => return Ok(false),
        };
        let key = VerifyingKey::from_bytes(self.signer.as_bytes())
            .map_err(|e| Error::Crypto(format!("invalid signer key: {e}")))?;
        let bytes = self.contract.signing_bytes(generation_hash)?;
        Ok(key.verify(&bytes, &Signature::from_bytes(&raw)).is_ok())
    }
}

const REQUEST_VERSION: u8 = 3;
const REQUEST_TYPE_TRANSACTION: u8 = 3;

/// The JSON document encoded into QR artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub v: u8,
    #[serde(rename = "type")]
    pub kind: u8,
    pub network_id: u8,
    pub chain_id: String,
    pub data: RequestData,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestData {
    pub payload: String,
}

impl TransactionRequest {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{derive_signing_key, DerivationPath};

    fn transfer_contract() -> (DigitalContract, SigningKey) {
        let key = derive_signing_key(&[4u8; 64], &DerivationPath::default());
        let signer = PublicKey::from(&key);
        let op = Operation::Transfer {
            recipient: Address::from_public_key(&signer, NetworkType::Testnet),
            mosaics: vec![],
            message: "hello".into(),
        };
        let contract = DigitalContract::new(&ContractEnvelope::default(), vec![op.signed_off_by(signer)]);
        (contract, key)
    }

    #[test]
    fn envelope_defaults() {
        let env = ContractEnvelope::default();
        assert_eq!(env.max_fee, 30_000);
        assert_eq!(env.namespace_rental_blocks, 2_102_400);
        assert_eq!(hex::encode_upper(env.generation_hash), TESTNET_GENERATION_HASH);
    }

    #[test]
    fn address_carries_network_byte() {
        let pk = PublicKey([1u8; 32]);
        assert_eq!(Address::from_public_key(&pk, NetworkType::Testnet).network_id(), 0x98);
        assert_eq!(Address::from_public_key(&pk, NetworkType::Mainnet).network_id(), 0x68);
        assert_eq!(Address::from_public_key(&pk, NetworkType::Testnet).to_hex().len(), 48);
    }

    #[test]
    fn ids_keep_their_namespace_bit() {
        let owner = Address::from_public_key(&PublicKey([2u8; 32]), NetworkType::Testnet);
        assert_eq!(MosaicId::from_nonce(7, &owner).0 & NAMESPACE_FLAG, 0);
        assert_ne!(NamespaceId::from_name("symbol.xym").0 & NAMESPACE_FLAG, 0);
        assert_eq!(
            NamespaceId::from_name("a.b"),
            NamespaceId::child(Some(NamespaceId::child(None, "a")), "b")
        );
    }

    #[test]
    fn payload_round_trips() {
        let (contract, _) = transfer_contract();
        let payload = contract.to_payload().unwrap();
        assert_eq!(DigitalContract::from_payload(&payload).unwrap(), contract);
    }

    #[test]
    fn signature_verifies_and_detects_tampering() {
        let (contract, key) = transfer_contract();
        let env = ContractEnvelope::default();
        let mut signed = contract.sign(&key, &env.generation_hash).unwrap();
        assert!(signed.verify(&env.generation_hash).unwrap());
        assert!(!signed.verify(&[0u8; 32]).unwrap());

        signed.contract.max_fee += 1;
        assert!(!signed.verify(&env.generation_hash).unwrap());
    }

    #[test]
    fn request_json_shape() {
        let (contract, _) = transfer_contract();
        let env = ContractEnvelope::default();
        let json = contract.request(&env.generation_hash).unwrap().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["v"], 3);
        assert_eq!(value["type"], 3);
        assert_eq!(value["network_id"], 0x98);
        assert_eq!(value["chain_id"], TESTNET_GENERATION_HASH);
        assert!(value["data"]["payload"].as_str().unwrap().len() > 0);
    }
}
