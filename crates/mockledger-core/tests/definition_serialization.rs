use mockledger_core::{AttributeType, CustomAttributeDefinition};

#[test]
fn serializes_definition_compactly() {
    let def = CustomAttributeDefinition::new("CA_QUANTITY", AttributeType::Quantity)
        .with_quantity_range(5, 90);

    let json = serde_json::to_string_pretty(&def).expect("serialize definition");
    let expected = r#"{
  "name": "CA_QUANTITY",
  "type": "quantity",
  "quantity_min": 5,
  "quantity_max": 90
}"#;
    assert_eq!(json, expected);
}

#[test]
fn deserializes_definition_with_defaults() {
    let def: CustomAttributeDefinition =
        serde_json::from_str(r#"{"name": "CA_RADIO", "type": "radio", "options": ["X", "Y"]}"#)
            .expect("parse definition");

    assert_eq!(def.attr_type, AttributeType::Radio);
    assert_eq!(def.options, vec!["X".to_string(), "Y".to_string()]);
    assert!(!def.constant);
    assert_eq!(def.quantity_range(), (1, 50));
}
