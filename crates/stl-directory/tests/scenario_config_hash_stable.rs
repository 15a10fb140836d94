//! Config hash stability.
//!
//! GREEN when:
//! - loading the same layers twice yields the same hash;
//! - key order inside a YAML document does not change the hash;
//! - a changed value changes the hash;
//! - the demo base layer participates in the hash.

use stl_directory::{load_layered_yaml_from_strings, load_settlement_config_from_strings, Profile};

const BASE_YAML: &str = r#"
ledger:
  rpc_url: "https://node.example:51234"
  history_limit: 100
hub:
  key: "hub"
  address: "rL6UxaJR8WkyYmDzBtDP14t9vhCpLDyTDe"
partners:
  paypay:
    display_name: "PG"
    address: "r3jF6kpULQUJwZsTTNzboZTr2zPRpNtQrU"
"#;

const BASE_YAML_REORDERED: &str = r#"
partners:
  paypay:
    address: "r3jF6kpULQUJwZsTTNzboZTr2zPRpNtQrU"
    display_name: "PG"
hub:
  address: "rL6UxaJR8WkyYmDzBtDP14t9vhCpLDyTDe"
  key: "hub"
ledger:
  history_limit: 100
  rpc_url: "https://node.example:51234"
"#;

#[test]
fn same_input_produces_identical_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64, "sha256 hex");
}

#[test]
fn key_order_does_not_change_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn different_value_changes_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML, "ledger:\n  history_limit: 101\n"]).unwrap();
    assert_ne!(a.config_hash, b.config_hash);
}

#[test]
fn demo_base_layer_is_part_of_the_hash() {
    let operator = load_settlement_config_from_strings(Profile::Operator, &[BASE_YAML]).unwrap();
    let demo = load_settlement_config_from_strings(Profile::Demo, &[BASE_YAML]).unwrap();
    assert_ne!(operator.loaded.config_hash, demo.loaded.config_hash);

    // Demo overlay keeps the built-in partners and adds nothing new here.
    assert_eq!(operator.directory.partners().len(), 1);
    assert_eq!(demo.directory.partners().len(), 6);
    assert_eq!(demo.settings.ledger.rpc_url, "https://node.example:51234");
}
