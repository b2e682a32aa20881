//! The types the fixture host declares.

use hostlink_types::ValueKind;
use serde_json::{Value, json};

pub const ASSEMBLY: &str = "Dalamud";

pub const MANIFEST: &str = "Dalamud.Plugin.Internal.Types.Manifest.LocalPluginManifest";
pub const CONFIGURATION: &str = "Dalamud.Configuration.Internal.DalamudConfiguration";
pub const PROFILE_MODEL: &str = "Dalamud.Plugin.Internal.Profiles.ProfileModelV1";
pub const PROFILE_PLUGIN: &str = "Dalamud.Plugin.Internal.Profiles.ProfileModelV1+ProfileModelV1Plugin";
pub const REPO_SETTINGS: &str = "Dalamud.Configuration.ThirdPartyRepoSettings";
/// Instances of this type are counted while alive.
pub const COUNTED: &str = "Fixture.Counted";
pub const SEALED: &str = "Fixture.Sealed";

#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub kind: ValueKind,
    pub type_name: Option<&'static str>,
}

const fn field(name: &'static str, kind: ValueKind) -> Field {
    Field {
        name,
        kind,
        type_name: None,
    }
}

const fn object(name: &'static str, type_name: &'static str) -> Field {
    Field {
        name,
        kind: ValueKind::Object,
        type_name: Some(type_name),
    }
}

const fn opaque(name: &'static str, host_type: &'static str) -> Field {
    Field {
        name,
        kind: ValueKind::Unsupported,
        type_name: Some(host_type),
    }
}

#[derive(Debug)]
pub struct TypeDef {
    pub full_name: &'static str,
    pub constructible: bool,
    pub fields: &'static [Field],
    pub nested: &'static [&'static str],
}

impl TypeDef {
    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_ignore_case(&self, name: &str) -> Option<&'static Field> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// The JSON descriptor the vtable's describe calls hand out.
    pub fn descriptor(&self) -> Value {
        let fields: Vec<Value> = self
            .fields
            .iter()
            .map(|f| match f.type_name {
                Some(type_name) => json!({ "name": f.name, "kind": f.kind, "type_name": type_name }),
                None => json!({ "name": f.name, "kind": f.kind }),
            })
            .collect();
        json!({
            "full_name": self.full_name,
            "assembly": ASSEMBLY,
            "constructible": self.constructible,
            "fields": fields,
            "nested": self.nested,
        })
    }
}

pub static TYPES: &[TypeDef] = &[
    TypeDef {
        full_name: MANIFEST,
        constructible: true,
        fields: &[
            field("Author", ValueKind::Text),
            field("Name", ValueKind::Text),
            field("InternalName", ValueKind::Text),
            field("AssemblyVersion", ValueKind::Version),
            field("RepoUrl", ValueKind::Text),
            opaque("DalamudApiLevel", "Int32"),
            opaque("Tags", "List`1"),
            field("InstalledFromUrl", ValueKind::Text),
            field("WorkingPluginId", ValueKind::Uuid),
        ],
        nested: &[],
    },
    TypeDef {
        full_name: CONFIGURATION,
        constructible: true,
        fields: &[
            opaque("ThirdRepoList", "List`1"),
            object("DefaultProfile", PROFILE_MODEL),
        ],
        nested: &[],
    },
    TypeDef {
        full_name: PROFILE_MODEL,
        constructible: true,
        fields: &[
            field("Guid", ValueKind::Uuid),
            field("Name", ValueKind::Text),
            opaque("Plugins", "List`1"),
        ],
        nested: &["ProfileModelV1Plugin"],
    },
    TypeDef {
        full_name: PROFILE_PLUGIN,
        constructible: true,
        fields: &[
            field("InternalName", ValueKind::Text),
            field("WorkingPluginId", ValueKind::Uuid),
            field("IsEnabled", ValueKind::Bool),
        ],
        nested: &[],
    },
    TypeDef {
        full_name: REPO_SETTINGS,
        constructible: true,
        fields: &[
            field("Url", ValueKind::Text),
            field("IsEnabled", ValueKind::Bool),
            field("Name", ValueKind::Text),
        ],
        nested: &[],
    },
    TypeDef {
        full_name: COUNTED,
        constructible: true,
        fields: &[field("Label", ValueKind::Text)],
        nested: &[],
    },
    TypeDef {
        full_name: SEALED,
        constructible: false,
        fields: &[field("Label", ValueKind::Text)],
        nested: &[],
    },
];

pub fn find(full_name: &str) -> Option<&'static TypeDef> {
    TYPES.iter().find(|t| t.full_name == full_name)
}
