use std::sync::Arc;

use hostlink_model::{
    FieldValue, HostModule, MemoryHost, MemoryObject, ModelError, ObjectBuilder, ResolvedType,
    SchemaContract, TypeDef, TypeRegistry,
};
use hostlink_types::{AssemblyVersion, ValueKind};
use pretty_assertions::assert_eq;
use uuid::Uuid;

struct Fixture {
    builder: ObjectBuilder,
    item: ResolvedType,
    holder: ResolvedType,
    other: ResolvedType,
}

fn fixture() -> Fixture {
    let host: Arc<dyn HostModule> = Arc::new(
        MemoryHost::builder("Test")
            .with_type(
                TypeDef::new("T.Item")
                    .text("Name")
                    .bool("Enabled")
                    .uuid("Id")
                    .version("Version")
                    .unsupported("Tags", "List`1")
                    .read_only("Computed", ValueKind::Text),
            )
            .with_type(TypeDef::new("T.Holder").object("Child", "T.Item"))
            .with_type(TypeDef::new("T.Other").text("Name"))
            .build(),
    );
    let mut registry = TypeRegistry::new(host.clone());
    let item = registry
        .resolve(&SchemaContract::new(
            "T.Item",
            ["Name", "Enabled", "Id", "Version", "Tags", "Computed"],
        ))
        .unwrap();
    let holder = registry
        .resolve(&SchemaContract::new("T.Holder", ["Child"]).exact())
        .unwrap();
    let other = registry
        .resolve(&SchemaContract::new("T.Other", ["Name"]))
        .unwrap();
    Fixture {
        builder: ObjectBuilder::new(host),
        item,
        holder,
        other,
    }
}

// ── Create ───────────────────────────────────────────────────────

#[test]
fn create_uses_kind_defaults() {
    let f = fixture();
    let item = f.builder.create(f.item.handle()).unwrap();
    let get = |name: &str| f.builder.get_field(&item, f.item.field(name).unwrap()).unwrap();

    assert_eq!(get("Name"), FieldValue::Null);
    assert_eq!(get("Enabled"), FieldValue::Bool(false));
    assert_eq!(get("Id"), FieldValue::Uuid(Uuid::nil()));
    assert_eq!(get("Version"), FieldValue::Null);
    assert_eq!(item.type_handle().full_name(), "T.Item");
}

#[test]
fn create_without_default_ctor_fails() {
    let host: Arc<dyn HostModule> = Arc::new(
        MemoryHost::builder("Test")
            .with_type(TypeDef::new("T.Sealed").text("A").no_default_ctor())
            .build(),
    );
    let mut registry = TypeRegistry::new(host.clone());
    let sealed = registry
        .resolve(&SchemaContract::new("T.Sealed", ["A"]))
        .unwrap();
    let err = ObjectBuilder::new(host).create(sealed.handle()).unwrap_err();
    assert!(matches!(err, ModelError::InstantiationFailed { .. }));
}

// ── Get / set ────────────────────────────────────────────────────

#[test]
fn set_then_get_each_kind() {
    let f = fixture();
    let item = f.builder.create(f.item.handle()).unwrap();
    let id = Uuid::new_v4();
    let version = AssemblyVersion::full(1, 2, 3, 4);

    for (name, value) in [
        ("Name", FieldValue::from("hello")),
        ("Enabled", FieldValue::Bool(true)),
        ("Id", FieldValue::Uuid(id)),
        ("Version", FieldValue::Version(version)),
    ] {
        let field = f.item.field(name).unwrap();
        f.builder.set_field(&item, field, value.clone()).unwrap();
        assert_eq!(f.builder.get_field(&item, field).unwrap(), value);
    }

    let raw = item.object().downcast_ref::<MemoryObject>().unwrap();
    assert_eq!(raw.value("Name"), Some(FieldValue::from("hello")));
}

#[test]
fn null_accepted_only_for_nullable_kinds() {
    let f = fixture();
    let item = f.builder.create(f.item.handle()).unwrap();

    f.builder
        .set_field(&item, f.item.field("Name").unwrap(), FieldValue::Null)
        .unwrap();
    f.builder
        .set_field(&item, f.item.field("Version").unwrap(), FieldValue::Null)
        .unwrap();

    let err = f
        .builder
        .set_field(&item, f.item.field("Enabled").unwrap(), FieldValue::Null)
        .unwrap_err();
    match err {
        ModelError::TypeMismatch { expected, found, .. } => {
            assert_eq!(expected, ValueKind::Bool);
            assert_eq!(found, "null");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn wrong_kind_is_a_mismatch() {
    let f = fixture();
    let item = f.builder.create(f.item.handle()).unwrap();
    let err = f
        .builder
        .set_field(&item, f.item.field("Id").unwrap(), FieldValue::from("not-a-uuid"))
        .unwrap_err();
    assert!(matches!(err, ModelError::TypeMismatch { expected: ValueKind::Uuid, .. }));
}

#[test]
fn unsupported_field_rejects_reads_and_writes() {
    let f = fixture();
    let item = f.builder.create(f.item.handle()).unwrap();
    let tags = f.item.field("Tags").unwrap();

    assert!(matches!(
        f.builder.set_field(&item, tags, FieldValue::Null),
        Err(ModelError::TypeMismatch { .. })
    ));
    assert!(matches!(
        f.builder.get_field(&item, tags),
        Err(ModelError::TypeMismatch { .. })
    ));
}

#[test]
fn raw_values_are_refused_everywhere() {
    let f = fixture();
    let item = f.builder.create(f.item.handle()).unwrap();
    let raw = FieldValue::Raw(serde_json::json!(["a"]));

    assert!(matches!(
        f.builder.set_field(&item, f.item.field("Tags").unwrap(), raw.clone()),
        Err(ModelError::TypeMismatch { .. })
    ));
    assert!(matches!(
        f.builder.set_field(&item, f.item.field("Name").unwrap(), raw),
        Err(ModelError::TypeMismatch { expected: ValueKind::Text, .. })
    ));
}

#[test]
fn read_only_field_rejects_writes() {
    let f = fixture();
    let item = f.builder.create(f.item.handle()).unwrap();
    let computed = f.item.field("Computed").unwrap();

    assert_eq!(f.builder.get_field(&item, computed).unwrap(), FieldValue::Null);
    assert!(matches!(
        f.builder.set_field(&item, computed, FieldValue::from("x")),
        Err(ModelError::FieldAccessError { .. })
    ));
}

#[test]
fn field_of_another_type_is_rejected() {
    let f = fixture();
    let other = f.builder.create(f.other.handle()).unwrap();
    let err = f
        .builder
        .get_field(&other, f.item.field("Name").unwrap())
        .unwrap_err();
    match err {
        ModelError::FieldAccessError {
            field,
            owner,
            instance_type,
            ..
        } => {
            assert_eq!(field, "Name");
            assert_eq!(owner, "T.Item");
            assert_eq!(instance_type, "T.Other");
        }
        other => panic!("unexpected {other:?}"),
    }
}

// ── Nested objects ───────────────────────────────────────────────

#[test]
fn object_field_accepts_declared_type() {
    let f = fixture();
    let holder = f.builder.create(f.holder.handle()).unwrap();
    let child = f.builder.create(f.item.handle()).unwrap();
    let field = f.holder.field("Child").unwrap();

    f.builder
        .set_field(&holder, field, FieldValue::Object(child.object().clone()))
        .unwrap();
    let stored = f.builder.get_field(&holder, field).unwrap();
    assert!(stored.as_object().unwrap().same_object(child.object()));
}

#[test]
fn object_field_rejects_other_host_type() {
    let f = fixture();
    let holder = f.builder.create(f.holder.handle()).unwrap();
    let wrong = f.builder.create(f.other.handle()).unwrap();
    let err = f
        .builder
        .set_field(
            &holder,
            f.holder.field("Child").unwrap(),
            FieldValue::Object(wrong.object().clone()),
        )
        .unwrap_err();
    match err {
        ModelError::TypeMismatch { found, .. } => assert_eq!(found, "T.Other"),
        other => panic!("unexpected {other:?}"),
    }
}
