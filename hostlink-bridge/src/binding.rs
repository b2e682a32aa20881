use std::sync::Arc;

use hostlink_model::{HostModule, HostObject, OpaqueInstance, TypeHandle};
use tracing::{debug, info};

use crate::error::{BridgeError, BridgeResult};
use crate::module::{DecodeEntry, EncodeEntry, EntryPoints, Formatting, OptionsType, SerializerModule};

/// An options value of the bound serializer's settings type.
#[derive(Debug, Clone)]
pub struct SerializerOptions(HostObject);

impl SerializerOptions {
    pub fn object(&self) -> &HostObject {
        &self.0
    }
}

/// A located serializer: encode and decode entry points, its options type,
/// and the options value the host uses for its own files.
pub struct SerializerBinding {
    module: Arc<dyn SerializerModule>,
    encoder: Box<dyn EncodeEntry>,
    decoder: Box<dyn DecodeEntry>,
    options_type: Box<dyn OptionsType>,
    default_options: SerializerOptions,
}

impl SerializerBinding {
    /// Looks up every piece named in `entry_points`. Either all of them are
    /// found or no binding is produced.
    pub fn locate(
        serializer: Arc<dyn SerializerModule>,
        host: &dyn HostModule,
        entry_points: &EntryPoints,
    ) -> BridgeResult<Self> {
        let module_name = serializer.module_name().to_string();
        let missing_entry = |name: &str| BridgeError::EntryPointNotFound {
            module: module_name.clone(),
            name: name.to_string(),
        };

        let encoder = serializer
            .find_encoder(&entry_points.encode)
            .ok_or_else(|| missing_entry(&entry_points.encode))?;
        let decoder = serializer
            .find_decoder(&entry_points.decode)
            .ok_or_else(|| missing_entry(&entry_points.decode))?;
        let options_type = serializer
            .find_options_type(&entry_points.options_type)
            .ok_or_else(|| BridgeError::OptionsTypeNotFound {
                module: module_name.clone(),
                name: entry_points.options_type.clone(),
            })?;

        let default_options = host
            .read_static(&entry_points.default_options)
            .ok_or_else(|| BridgeError::DefaultOptionsMissing {
                module: host.module_name().to_string(),
                symbol: entry_points.default_options.clone(),
            })?;
        if !options_type.accepts(&default_options) {
            return Err(BridgeError::DefaultOptionsRejected {
                symbol: entry_points.default_options.clone(),
                options_type: options_type.type_name().to_string(),
            });
        }

        info!(
            serializer = %module_name,
            options_type = %options_type.type_name(),
            "bound host serializer"
        );
        Ok(Self {
            module: serializer,
            encoder,
            decoder,
            options_type,
            default_options: SerializerOptions(default_options),
        })
    }

    pub fn module_name(&self) -> &str {
        self.module.module_name()
    }

    /// The options the host uses when it writes its own configuration.
    pub fn default_options(&self) -> &SerializerOptions {
        &self.default_options
    }

    /// Fresh options with the serializer's defaults (no type tags).
    pub fn plain_options(&self) -> BridgeResult<SerializerOptions> {
        self.options_type
            .create()
            .map(SerializerOptions)
            .map_err(|e| BridgeError::OptionsFailed(e.to_string()))
    }

    pub fn with_formatting(
        &self,
        options: &SerializerOptions,
        formatting: Formatting,
    ) -> BridgeResult<SerializerOptions> {
        self.options_type
            .with_formatting(options.object(), formatting)
            .map(SerializerOptions)
            .map_err(|e| BridgeError::OptionsFailed(e.to_string()))
    }

    /// Encodes `instance` as `ty`, with the host's default options unless
    /// `options` is given.
    pub fn encode(
        &self,
        instance: &OpaqueInstance,
        ty: &TypeHandle,
        options: Option<&SerializerOptions>,
    ) -> BridgeResult<String> {
        let options = options.unwrap_or(&self.default_options);
        debug!(type_name = %ty.full_name(), "encoding");
        self.encoder
            .encode(instance.object(), ty.descriptor(), options.object())
            .map_err(|e| BridgeError::EncodeFailed {
                type_name: ty.full_name().to_string(),
                message: e.to_string(),
            })
    }

    /// Decodes `text` as `ty`. A leading byte-order mark is ignored.
    pub fn decode(
        &self,
        text: &str,
        ty: &TypeHandle,
        options: Option<&SerializerOptions>,
    ) -> BridgeResult<OpaqueInstance> {
        let options = options.unwrap_or(&self.default_options);
        let text = strip_bom(text);
        debug!(type_name = %ty.full_name(), len = text.len(), "decoding");
        self.decoder
            .decode(text, ty.descriptor(), options.object())
            .map(|object| OpaqueInstance::adopt(object, ty.clone()))
            .map_err(|e| BridgeError::DecodeFailed {
                type_name: ty.full_name().to_string(),
                message: e.to_string(),
            })
    }
}

/// Drops a leading UTF-8 byte-order mark.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}
