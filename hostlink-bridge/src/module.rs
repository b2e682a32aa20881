//! What a serializer library has to offer the bridge.

use hostlink_model::{HostCallError, HostObject, TypeDescriptor};
use serde::{Deserialize, Serialize};

/// Whether encoded text is laid out for people or kept compact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Formatting {
    #[default]
    None,
    Indented,
}

/// Entry points of a serializer library, looked up by name.
pub trait SerializerModule: Send + Sync {
    fn module_name(&self) -> &str;

    fn find_encoder(&self, name: &str) -> Option<Box<dyn EncodeEntry>>;

    fn find_decoder(&self, name: &str) -> Option<Box<dyn DecodeEntry>>;

    fn find_options_type(&self, name: &str) -> Option<Box<dyn OptionsType>>;
}

/// `encode(object, type, options) -> text`
pub trait EncodeEntry: Send + Sync {
    fn encode(
        &self,
        object: &HostObject,
        ty: &TypeDescriptor,
        options: &HostObject,
    ) -> Result<String, HostCallError>;
}

/// `decode(text, type, options) -> object`
pub trait DecodeEntry: Send + Sync {
    fn decode(
        &self,
        text: &str,
        ty: &TypeDescriptor,
        options: &HostObject,
    ) -> Result<HostObject, HostCallError>;
}

/// The serializer's settings type.
pub trait OptionsType: Send + Sync {
    fn type_name(&self) -> &str;

    /// Whether `value` is an instance of this options type.
    fn accepts(&self, value: &HostObject) -> bool;

    /// A fresh options value with the serializer's own defaults.
    fn create(&self) -> Result<HostObject, HostCallError>;

    /// A copy of `options` differing only in its formatting flag.
    fn with_formatting(
        &self,
        options: &HostObject,
        formatting: Formatting,
    ) -> Result<HostObject, HostCallError>;
}

/// Names the bridge looks up when it binds to a serializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryPoints {
    pub encode: String,
    pub decode: String,
    pub options_type: String,
    /// Symbol in the host module holding the options the host itself uses.
    pub default_options: String,
}

impl Default for EntryPoints {
    fn default() -> Self {
        Self {
            encode: "JsonConvert.SerializeObject".to_string(),
            decode: "JsonConvert.DeserializeObject".to_string(),
            options_type: "JsonSerializerSettings".to_string(),
            default_options: "ConfigJsonSettings".to_string(),
        }
    }
}
