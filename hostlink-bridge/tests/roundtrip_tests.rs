use std::sync::Arc;

use hostlink_bridge::{EntryPoints, JsonSettings, MemorySerializer, SerializerBinding, SerializerModule};
use hostlink_model::{
    FieldValue, HostModule, HostObject, MemoryHost, ObjectBuilder, OpaqueInstance, ResolvedType,
    SchemaContract, TypeDef, TypeRegistry,
};
use hostlink_types::AssemblyVersion;
use proptest::prelude::*;
use uuid::Uuid;

struct Fixture {
    binding: SerializerBinding,
    builder: ObjectBuilder,
    record: ResolvedType,
    inner: ResolvedType,
}

fn fixture() -> Fixture {
    let host: Arc<dyn HostModule> = Arc::new(
        MemoryHost::builder("Gen")
            .with_type(
                TypeDef::new("Gen.Record")
                    .text("Label")
                    .bool("Flag")
                    .uuid("Id")
                    .version("Version")
                    .object("Inner", "Gen.Inner"),
            )
            .with_type(TypeDef::new("Gen.Inner").text("Note").bool("On"))
            .static_value("ConfigJsonSettings", HostObject::new(JsonSettings::tagged()))
            .build(),
    );
    let serializer: Arc<dyn SerializerModule> = Arc::new(MemorySerializer::new(host.clone()));
    let binding = SerializerBinding::locate(serializer, host.as_ref(), &EntryPoints::default()).unwrap();
    let mut registry = TypeRegistry::new(host.clone());
    let record = registry
        .resolve(
            &SchemaContract::new("Gen.Record", ["Label", "Flag", "Id", "Version", "Inner"])
                .exact()
                .constructible(),
        )
        .unwrap();
    let inner = registry
        .resolve(&SchemaContract::new("Gen.Inner", ["Note", "On"]).exact())
        .unwrap();
    Fixture {
        binding,
        builder: ObjectBuilder::new(host),
        record,
        inner,
    }
}

fn version() -> impl Strategy<Value = AssemblyVersion> {
    prop::collection::vec(any::<u32>(), 2..=4)
        .prop_map(|parts| AssemblyVersion::from_components(&parts).unwrap())
}

fn text() -> impl Strategy<Value = Option<String>> {
    prop::option::of(any::<String>())
}

#[derive(Debug, Clone)]
struct Sample {
    label: Option<String>,
    flag: bool,
    id: u128,
    version: Option<AssemblyVersion>,
    inner: Option<(Option<String>, bool)>,
}

fn sample() -> impl Strategy<Value = Sample> {
    (
        text(),
        any::<bool>(),
        any::<u128>(),
        prop::option::of(version()),
        prop::option::of((text(), any::<bool>())),
    )
        .prop_map(|(label, flag, id, version, inner)| Sample {
            label,
            flag,
            id,
            version,
            inner,
        })
}

fn build(f: &Fixture, s: &Sample) -> OpaqueInstance {
    let record = f.builder.create(f.record.handle()).unwrap();
    let set = |name: &str, value: FieldValue| {
        f.builder
            .set_field(&record, f.record.field(name).unwrap(), value)
            .unwrap();
    };
    set("Label", s.label.clone().into());
    set("Flag", s.flag.into());
    set("Id", Uuid::from_u128(s.id).into());
    set("Version", s.version.map_or(FieldValue::Null, FieldValue::Version));
    if let Some((note, on)) = &s.inner {
        let inner = f.builder.create(f.inner.handle()).unwrap();
        f.builder
            .set_field(&inner, f.inner.field("Note").unwrap(), note.clone().into())
            .unwrap();
        f.builder
            .set_field(&inner, f.inner.field("On").unwrap(), (*on).into())
            .unwrap();
        set("Inner", FieldValue::Object(inner.into_object()));
    }
    record
}

fn read(f: &Fixture, ty: &ResolvedType, instance: &OpaqueInstance, name: &str) -> FieldValue {
    f.builder
        .get_field(instance, ty.field(name).unwrap())
        .unwrap()
}

proptest! {
    #[test]
    fn decode_of_encode_preserves_every_field(s in sample(), plain in any::<bool>()) {
        let f = fixture();
        let original = build(&f, &s);
        let options = if plain { Some(f.binding.plain_options().unwrap()) } else { None };

        let text = f.binding.encode(&original, f.record.handle(), options.as_ref()).unwrap();
        let decoded = f.binding.decode(&text, f.record.handle(), options.as_ref()).unwrap();

        for name in ["Label", "Flag", "Id", "Version"] {
            prop_assert_eq!(read(&f, &f.record, &decoded, name), read(&f, &f.record, &original, name));
        }

        match read(&f, &f.record, &decoded, "Inner") {
            FieldValue::Null => prop_assert!(s.inner.is_none()),
            FieldValue::Object(object) => {
                let inner = OpaqueInstance::adopt(object, f.inner.handle().clone());
                let (note, on) = s.inner.clone().unwrap();
                prop_assert_eq!(read(&f, &f.inner, &inner, "Note"), FieldValue::from(note));
                prop_assert_eq!(read(&f, &f.inner, &inner, "On"), FieldValue::Bool(on));
            }
            other => prop_assert!(false, "unexpected inner {:?}", other),
        }
    }
}
