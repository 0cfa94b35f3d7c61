use parquet_record::descriptor::{FieldDescriptor, PrimitiveKind, TypeDescriptor};
use parquet_record::PersistError;

fn i32_field(name: &str, id: i32) -> FieldDescriptor {
    FieldDescriptor::new(name, TypeDescriptor::Primitive { kind: PrimitiveKind::I32, nullable: false }).with_field_id(Some(id))
}

#[test]
fn duplicate_field_id_in_the_same_record_is_rejected() {
    let descriptor = TypeDescriptor::Record {
        name: "Dup".to_string(),
        fields: vec![i32_field("a", 1), i32_field("b", 1)],
        nullable: false,
    };
    let err = descriptor.validate().expect_err("expected a duplicate field id error");
    assert!(matches!(err, PersistError::DuplicateFieldId { id: 1, .. }), "unexpected error: {err:?}");
}

#[test]
fn the_same_field_id_reused_in_a_nested_record_is_accepted() {
    let nested = TypeDescriptor::Record { name: "Nested".to_string(), fields: vec![i32_field("x", 1)], nullable: false };
    let outer = TypeDescriptor::Record {
        name: "Outer".to_string(),
        fields: vec![i32_field("a", 1), FieldDescriptor::new("nested", nested)],
        nullable: false,
    };
    outer.validate().expect("reusing id=1 inside a nested record scope must be accepted");
}
