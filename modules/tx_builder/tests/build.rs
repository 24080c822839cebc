use caravel_common::{
    Address, AddressNetwork, Credential, Lovelace, ProtocolParams, TxError, TxHash, TxInput,
    TxOutput,
    keys::{DerivationPath, XPrv},
};
use caravel_module_tx_builder::{BuilderState, TxBuilder};
use quickcheck_macros::quickcheck;
use test_case::test_case;

const SIGNING_KEY: &str = "addr_sk1uqpfmhkflccgy9wzdrgshtjez963a0rj2apjxzga9dysw5y4tap0ame6lckwe94wq68dyc2669vp7e64rhmd0lmyf0gy3k7aeqt5dcc8x0qzj";
const INPUT_HASH: &str = "7a040587157289e80e524710021fa9a61d22a597b70786f21a4a78b61dddee29";
const OUTPUT_ADDRESS: &str = "addr1qxn0t7jnv8lrdd5xa6mlcap6qf8ln08pc6k8qxa7un0new2pkrthnm4f5hn6eg3nju6jn6l3994ucy099cw42xu7rmjq8l960u";
const TX_HASH: &str = "b59fec079542f4785d3d197ada365e496de932237ae168cba599926dd6f42e31";

fn params() -> ProtocolParams {
    ProtocolParams::new(44, 155381, 34482)
}

fn reference_builder(params: &ProtocolParams, input: Lovelace, output: i64) -> TxBuilder<'_> {
    let mut builder = TxBuilder::new(params);
    builder
        .add_inputs([TxInput::from_hex(INPUT_HASH, 0, input).unwrap()])
        .unwrap()
        .add_outputs([TxOutput::from_bech32(OUTPUT_ADDRESS, output).unwrap()])
        .unwrap()
        .set_fee(1_000_000)
        .unwrap()
        .sign(SIGNING_KEY)
        .unwrap();
    builder
}

#[test]
fn reference_build_matches_known_hash() {
    let params = params();
    let mut builder = reference_builder(&params, 100_000_000, 99_000_000);
    assert_eq!(builder.state(), BuilderState::Signed);

    let tx = builder.build().unwrap();
    assert_eq!(tx.hash().to_string(), TX_HASH);
    assert_eq!(tx.witness_set().vkey_witnesses.len(), 1);
    assert!(tx.verify_witnesses());
    assert_eq!(hex::encode(tx.to_bytes().unwrap()).len(), 219 * 2);
    assert_eq!(builder.state(), BuilderState::Built);
}

#[test_case(101_000_000, 99_000_000, TxError::ExcessInput { leftover: 1_000_000 }; "excess input")]
#[test_case(99_000_000, 99_000_000,
    TxError::InsufficientInput { available: 99_000_000, required: 100_000_000 }; "insufficient input")]
fn unbalanced_build_fails(input: Lovelace, output: i64, expected: TxError) {
    let params = params();
    let mut builder = reference_builder(&params, input, output);
    assert_eq!(builder.build().unwrap_err(), expected);
    assert_eq!(builder.state(), BuilderState::Signed);
}

#[test]
fn second_build_is_rejected() {
    let params = params();
    let mut builder = reference_builder(&params, 100_000_000, 99_000_000);
    let first = builder.build().unwrap();

    assert_eq!(builder.build().unwrap_err(), TxError::AlreadyBuilt);
    assert_eq!(builder.set_fee(5).unwrap_err(), TxError::AlreadyBuilt);
    assert_eq!(builder.sign(SIGNING_KEY).unwrap_err(), TxError::AlreadyBuilt);
    assert_eq!(first.hash().to_string(), TX_HASH);
    assert!(first.verify_witnesses());
}

#[test]
fn build_without_inputs_fails() {
    let params = params();
    let mut builder = TxBuilder::new(&params);
    builder.sign(SIGNING_KEY).unwrap();
    assert!(matches!(builder.build(), Err(TxError::InvalidInput(_))));
}

#[test]
fn build_without_keys_fails() {
    let params = params();
    let mut builder = TxBuilder::new(&params);
    builder.add_inputs([TxInput::from_hex(INPUT_HASH, 0, 1).unwrap()]).unwrap();
    assert_eq!(builder.build().unwrap_err(), TxError::NoSigningKey);
    assert_eq!(builder.state(), BuilderState::Draft);
}

#[test]
fn output_below_minimum_fails() {
    let params = params();
    let mut builder = TxBuilder::new(&params);
    builder
        .add_inputs([TxInput::from_hex(INPUT_HASH, 0, 2_000_000).unwrap()])
        .unwrap()
        .add_outputs([
            TxOutput::from_bech32(OUTPUT_ADDRESS, 1_500_000).unwrap(),
            TxOutput::from_bech32(OUTPUT_ADDRESS, 300_000).unwrap(),
        ])
        .unwrap()
        .set_fee(200_000)
        .unwrap()
        .sign(SIGNING_KEY)
        .unwrap();

    assert_eq!(
        builder.build().unwrap_err(),
        TxError::OutputBelowMinimum {
            index: 1,
            amount: 300_000,
            minimum: 999_978
        }
    );
}

#[test]
fn fee_below_minimum_fails() {
    let params = params();
    let mut builder = TxBuilder::new(&params);
    builder
        .add_inputs([TxInput::from_hex(INPUT_HASH, 0, 100_000_000).unwrap()])
        .unwrap()
        .add_outputs([TxOutput::from_bech32(OUTPUT_ADDRESS, 99_900_000).unwrap()])
        .unwrap()
        .set_fee(100_000)
        .unwrap()
        .sign(SIGNING_KEY)
        .unwrap();

    assert_eq!(
        builder.build().unwrap_err(),
        TxError::FeeTooSmall {
            fee: 100_000,
            minimum: 44 * 219 + 155381
        }
    );
}

#[test]
fn oversized_transaction_fails() {
    let params = params().with_max_tx_size(200);
    let mut builder = reference_builder(&params, 100_000_000, 99_000_000);
    assert_eq!(
        builder.build().unwrap_err(),
        TxError::TxTooLarge {
            size: 219,
            maximum: 200
        }
    );
    assert_eq!(builder.state(), BuilderState::Signed);
}

#[test]
fn every_key_signs_in_insertion_order() {
    let params = params();
    let root = XPrv::from_entropy(b"change address", b"foo");
    let first = root.derive_path(&DerivationPath::cip1852(0, 0, 0)).unwrap();
    let second = root.derive_path(&DerivationPath::cip1852(0, 0, 1)).unwrap();
    let change = Address::enterprise(
        AddressNetwork::Test,
        Credential::from_public_key(&first.public().public_key()),
    );

    let mut builder = TxBuilder::new(&params);
    builder
        .add_inputs([
            TxInput::new(TxHash::default(), 0, 3_000_000),
            TxInput::new(TxHash::default(), 1, 3_000_000),
        ])
        .unwrap()
        .add_signing_key(first.private_key())
        .unwrap()
        .add_signing_key(second.private_key())
        .unwrap();
    builder.add_change_if_needed(&change).unwrap();

    let tx = builder.build().unwrap();
    let vkeys: Vec<_> = tx.witness_set().vkey_witnesses.iter().map(|w| w.vkey).collect();
    assert_eq!(vkeys, vec![first.public().public_key(), second.public().public_key()]);
    assert!(tx.verify_witnesses());
    assert!(tx.to_bytes().unwrap().len() as u64 * 44 + 155381 <= tx.body().fee);
}

#[quickcheck]
fn identical_drafts_build_identical_transactions(extra: u32) -> bool {
    let params = params();
    let input = 100_000_000 + extra as Lovelace;
    let output = 99_000_000 + extra as i64;
    let a = reference_builder(&params, input, output).build().unwrap();
    let b = reference_builder(&params, input, output).build().unwrap();
    a.to_bytes().unwrap() == b.to_bytes().unwrap() && a.hash() == b.hash()
}
