// Concerns build the documented operation shapes and never sign
use minibiz::business::Business;
use minibiz::concerns::{
    multisig_thresholds, Concern, ConcernInputs, Couponization, Gamification, Governance,
    Identification, PaymentProcessing, SupplyChainSale, Tokenization,
};
use minibiz::contract::{
    Address, ContractEnvelope, MosaicId, NamespaceId, Operation, Registration, SupplyAction,
    UnresolvedMosaic,
};
use minibiz::crypto::KdfParams;
use minibiz::identity::Identity;
use minibiz::keys::PublicKey;
use minibiz::product::{example_products, Product};
use minibiz::Error;
use zeroize::Zeroizing;

const FAST: KdfParams = KdfParams::new(1024, 1);

fn identity(name: &str, alias: &str, password: &str) -> Identity {
    Identity::create(name, alias, Zeroizing::new(password.to_string()), FAST).unwrap()
}

fn inputs() -> ConcernInputs {
    ConcernInputs::new(ContractEnvelope::default())
}

fn passwords(list: &[&str]) -> Vec<Zeroizing<String>> {
    list.iter().map(|p| Zeroizing::new(p.to_string())).collect()
}

#[test]
fn tokenization_emits_definition_then_supply_per_product() {
    let owner = identity("governor", "governor", "pw");
    let products = example_products();
    let contract = Tokenization::new(&owner, &products).execute(&inputs()).unwrap();

    assert_eq!(contract.len(), 2 * products.len());
    for (pair, product) in contract.operations.chunks(2).zip(&products) {
        let defined = match &pair[0].operation {
            Operation::MosaicDefinition { mosaic_id, flags, divisibility, duration, .. } => {
                assert!(!flags.supply_mutable);
                assert!(!flags.transferable);
                assert!(flags.restrictable);
                assert_eq!(*divisibility, 0);
                assert_eq!(*duration, 0);
                *mosaic_id
            }
            other => panic!("expected a mosaic definition, got {other:?}"),
        };
        match &pair[1].operation {
            Operation::MosaicSupplyChange { mosaic_id, action, delta } => {
                assert_eq!(*mosaic_id, defined);
                assert_eq!(*action, SupplyAction::Increase);
                assert_eq!(*delta, product.count);
            }
            other => panic!("expected a supply change, got {other:?}"),
        }
        assert!(pair.iter().all(|op| op.signer == owner.public_key()));
    }
    assert_eq!(contract.defined_mosaics().len(), products.len());
}

#[test]
fn tokenization_without_products_is_a_configuration_error() {
    let owner = identity("governor", "governor", "pw");
    let err = Tokenization::new(&owner, &[]).execute(&inputs()).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn three_level_alias_yields_three_registrations_and_a_link() {
    let ids = vec![identity("Ada", "Acme.Tech.CTO", "ada-pw")];
    let inputs = inputs().with_passwords(passwords(&["ada-pw"]));
    let contract = Identification::new(&ids).execute(&inputs).unwrap();

    assert_eq!(contract.len(), 4);
    let names: Vec<&str> = contract
        .operations
        .iter()
        .filter_map(|op| match &op.operation {
            Operation::NamespaceRegistration { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(names, ["acme", "tech", "cto"]);
    match &contract.operations[2].operation {
        Operation::NamespaceRegistration { registration: Registration::Child { parent, .. }, .. } => {
            assert_eq!(parent, "acme.tech");
        }
        other => panic!("unexpected {other:?}"),
    }
    match &contract.operations[3].operation {
        Operation::AddressAlias { namespace_id, address, .. } => {
            assert_eq!(*namespace_id, NamespaceId::from_name("acme.tech.cto"));
            assert_eq!(*address, ids[0].address(inputs.envelope.network));
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(contract.operations.iter().all(|op| op.signer == ids[0].public_key()));
}

#[test]
fn four_level_alias_is_rejected() {
    let ids = vec![identity("Bo", "a.b.c.d", "pw")];
    let inputs = inputs().with_passwords(passwords(&["pw"]));
    let err = Identification::new(&ids).execute(&inputs).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn identification_checks_every_password() {
    let ids = vec![identity("A", "a", "one"), identity("B", "b", "two")];

    let wrong = inputs().with_passwords(passwords(&["one", "nope"]));
    assert!(matches!(Identification::new(&ids).execute(&wrong), Err(Error::InvalidPassword)));

    let missing = inputs().with_passwords(passwords(&["one"]));
    assert!(matches!(Identification::new(&ids).execute(&missing), Err(Error::Configuration(_))));

    assert!(matches!(Identification::new(&[]).execute(&inputs()), Err(Error::Configuration(_))));

    let ok = inputs().with_passwords(passwords(&["one", "two"]));
    assert_eq!(Identification::new(&ids).execute(&ok).unwrap().len(), 4);
}

#[test]
fn governance_uses_observed_thresholds() {
    let governor = identity("governor", "governor", "pw");
    let cosigners: Vec<Identity> =
        ["a", "b", "c"].iter().map(|n| identity(n, n, "pw")).collect();
    let contract = Governance::new(&governor, &cosigners).execute(&inputs()).unwrap();

    assert_eq!(contract.len(), 1);
    match &contract.operations[0].operation {
        Operation::MultisigAccountModification { min_approval, min_removal, additions, deletions } => {
            assert_eq!((*min_approval, *min_removal), multisig_thresholds(3));
            assert_eq!((*min_approval, *min_removal), (2, 2));
            let expected: Vec<_> = cosigners.iter().map(|c| c.address(inputs().envelope.network)).collect();
            assert_eq!(additions, &expected);
            assert!(deletions.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(contract.operations[0].signer, governor.public_key());

    assert!(matches!(
        Governance::new(&governor, &[]).execute(&inputs()),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn reward_is_a_message_to_the_employee() {
    let owner = identity("governor", "governor", "pw");
    let employee = identity("Grace", "grace", "pw");
    let contract = Gamification::new(&owner, &employee).execute(&inputs()).unwrap();
    match &contract.operations[..] {
        [op] => match &op.operation {
            Operation::Transfer { recipient, mosaics, message } => {
                assert_eq!(*recipient, employee.address(contract.network));
                assert!(mosaics.is_empty());
                assert_eq!(message, "It is great to work with you! Rewarded with MiniBusiness");
                assert_eq!(op.signer, owner.public_key());
            }
            other => panic!("unexpected {other:?}"),
        },
        ops => panic!("expected one operation, got {}", ops.len()),
    }
}

#[test]
fn coupon_and_payment_address_the_owner() {
    let owner = identity("governor", "governor", "pw");
    let product = Product::new("Book", "UBC21-34560015-03", 10, 5.99);

    let coupon = Couponization::new(&owner, &product, 3).execute(&inputs()).unwrap();
    match &coupon.operations[0].operation {
        Operation::Transfer { recipient, mosaics, message } => {
            assert_eq!(*recipient, owner.address(coupon.network));
            assert!(mosaics.is_empty());
            assert_eq!(message, "Price Quote Request for 3 UBC21-34560015-03");
        }
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        Couponization::new(&owner, &product, 0).execute(&inputs()),
        Err(Error::Validation(_))
    ));

    let payment = PaymentProcessing::new(&owner, &product).execute(&inputs()).unwrap();
    match &payment.operations[0].operation {
        Operation::Transfer { recipient, mosaics, message } => {
            assert_eq!(*recipient, owner.address(payment.network));
            assert_eq!(mosaics.len(), 1);
            assert_eq!(mosaics[0].id, UnresolvedMosaic::Namespace(NamespaceId::from_name("symbol.xym")));
            assert_eq!(mosaics[0].amount, 5_990_000);
            assert_eq!(message, "Payment Request for UBC21-34560015-03");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn sale_moves_one_unit_through_the_transporter() {
    let owner = identity("governor", "governor", "pw");
    let transporter = identity("Tom", "tom.logistics", "pw");
    let customer = PublicKey([7u8; 32]);
    let mut product = Product::new("Book", "UBC21-34560015-01", 100, 10.0);
    product.token_id = Some(MosaicId(0x0102).to_hex());

    let contract = SupplyChainSale::new(&owner, &transporter, customer, &product)
        .execute(&inputs())
        .unwrap();
    let legs: Vec<_> = contract
        .operations
        .iter()
        .map(|op| match &op.operation {
            Operation::Transfer { recipient, mosaics, message } => {
                assert!(message.is_empty());
                assert_eq!(mosaics.len(), 1);
                assert_eq!(mosaics[0].id, UnresolvedMosaic::Mosaic(MosaicId(0x0102)));
                assert_eq!(mosaics[0].amount, 1);
                (op.signer, *recipient)
            }
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(
        legs,
        vec![
            (owner.public_key(), transporter.address(contract.network)),
            (transporter.public_key(), Address::from_public_key(&customer, contract.network)),
        ]
    );
}

#[test]
fn sale_needs_a_tokenized_product() {
    let owner = identity("governor", "governor", "pw");
    let transporter = identity("Tom", "tom", "pw");
    let mut product = Product::new("Book", "UBC-1", 1, 1.0);
    assert!(matches!(
        SupplyChainSale::new(&owner, &transporter, PublicKey([1u8; 32]), &product).execute(&inputs()),
        Err(Error::Configuration(_))
    ));

    product.token_id = Some("not-hex".into());
    assert!(matches!(
        SupplyChainSale::new(&owner, &transporter, PublicKey([1u8; 32]), &product).execute(&inputs()),
        Err(Error::Validation(_))
    ));
}

#[test]
fn dispatch_delegates_and_token_ids_are_recorded() {
    let mut business = Business::new(
        "Acme",
        identity("governor", "governor", "pw"),
        vec![],
        example_products(),
        true,
    )
    .unwrap();
    let contract = {
        let concern = Tokenization::new(business.governor(), business.products());
        business.dispatch(&concern, &inputs()).unwrap()
    };
    business.assign_token_ids(&contract).unwrap();

    let ids: Vec<String> = contract.defined_mosaics().iter().map(|m| m.to_hex()).collect();
    let recorded: Vec<String> =
        business.products().iter().map(|p| p.token_id.clone().unwrap()).collect();
    assert_eq!(ids, recorded);
}

#[test]
fn signed_contract_detects_tampering() {
    let owner = identity("governor", "governor", "pw");
    let employee = identity("Grace", "grace", "pw");
    let envelope = ContractEnvelope::default();
    let contract = Gamification::new(&owner, &employee).execute(&inputs()).unwrap();

    let key = owner.unlock("pw", None).unwrap();
    let mut signed = contract.sign(&key, &envelope.generation_hash).unwrap();
    assert!(signed.verify(&envelope.generation_hash).unwrap());

    signed.contract.max_fee += 1;
    assert!(!signed.verify(&envelope.generation_hash).unwrap());
}
