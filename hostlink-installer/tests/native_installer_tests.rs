//! The installer over a host loaded from a shared library.

mod common;

use hostlink_installer::{Installer, InstallerConfig, InstallerError};
use hostlink_model::ModelError;
use hostlink_types::{AssemblyVersion, WorkingId};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn installer() -> Installer {
    Installer::load(&common::fixture_paths(), &InstallerConfig::default()).unwrap()
}

#[test]
fn loads_and_resolves_every_type() {
    let installer = installer();
    assert_eq!(
        installer.profile_plugin_type().full_name(),
        "Dalamud.Plugin.Internal.Profiles.ProfileModelV1+ProfileModelV1Plugin"
    );
    assert_eq!(
        installer.configuration_type().full_name(),
        "Dalamud.Configuration.Internal.DalamudConfiguration"
    );
    assert!(installer.binding().module_name().contains("hostlink_fixture"));
}

#[test]
fn repository_entry_is_tagged_and_indented() {
    let entry = installer()
        .make_repository_entry("https://example.com/repo.json")
        .unwrap();

    assert!(entry.starts_with("{\n  \"$type\": \"Dalamud.Configuration.ThirdPartyRepoSettings, Dalamud\""));
    let parsed: Value = serde_json::from_str(&entry).unwrap();
    assert_eq!(
        parsed,
        json!({
            "$type": "Dalamud.Configuration.ThirdPartyRepoSettings, Dalamud",
            "Url": "https://example.com/repo.json",
            "IsEnabled": true,
            "Name": null,
        })
    );
}

#[test]
fn plugin_entry_carries_the_working_id() {
    let id = WorkingId::new();
    let entry = installer().make_plugin_entry("sample-plugin", Some(id)).unwrap();

    assert_eq!(entry.working_id, id);
    let parsed: Value = serde_json::from_str(&entry.json).unwrap();
    assert_eq!(
        parsed["$type"],
        "Dalamud.Plugin.Internal.Profiles.ProfileModelV1+ProfileModelV1Plugin, Dalamud"
    );
    assert_eq!(parsed["InternalName"], "sample-plugin");
    assert_eq!(parsed["WorkingPluginId"], id.as_uuid().to_string());
    assert_eq!(parsed["IsEnabled"], true);
}

#[test]
fn fill_out_keeps_members_the_installer_does_not_write() {
    let manifest = json!({
        "Author": "someone",
        "Name": "Sample Plugin",
        "InternalName": "sample-plugin",
        "AssemblyVersion": "1.2.3.4",
        "DalamudApiLevel": 10,
        "Tags": ["ui", "tools"],
        "Punchline": "not a member",
    });
    let id = WorkingId::new();

    let filled = installer()
        .fill_out_manifest(&manifest.to_string(), id, "https://example.com/repo.json")
        .unwrap();

    assert_eq!(filled.version, AssemblyVersion::full(1, 2, 3, 4));
    assert!(!filled.json.contains('\n'));
    let written: Value = serde_json::from_str(&filled.json).unwrap();
    assert!(written.get("$type").is_none());
    assert!(written.get("Punchline").is_none());
    assert_eq!(written["DalamudApiLevel"], 10);
    assert_eq!(written["Tags"], json!(["ui", "tools"]));
    assert_eq!(written["Author"], "someone");
    assert_eq!(written["WorkingPluginId"], id.as_uuid().to_string());
    assert_eq!(written["InstalledFromUrl"], "https://example.com/repo.json");
}

#[test]
fn manifest_without_version_is_refused() {
    let err = installer()
        .fill_out_manifest(r#"{"Name":"x"}"#, WorkingId::new(), "u")
        .unwrap_err();
    assert!(matches!(err, InstallerError::MissingVersion { .. }), "{err:?}");
}

#[test]
fn drifted_host_type_fails_load() {
    let mut config = InstallerConfig::default();
    config.types.repo_settings = "Fixture.Counted".to_string();

    match Installer::load(&common::fixture_paths(), &config) {
        Err(InstallerError::Model(ModelError::SchemaDrift { type_name, added, .. })) => {
            assert_eq!(type_name, "Fixture.Counted");
            assert_eq!(added, vec!["Label".to_string()]);
        }
        Err(other) => panic!("unexpected {other:?}"),
        Ok(_) => panic!("loaded against a drifted type"),
    }
}
