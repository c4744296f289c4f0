use nom::bytes::complete::take;
use nom::number::complete::be_u16;
use nom::IResult;

use super::{Content, Field, Message, ParseContext, SupportedVersionsExtension};
use crate::context::TlsContext;
use crate::types::{ExtensionType, ProtocolVersion};
use crate::util::len_u16;
use crate::Error;

/// A hello extension: `type(2) | length(2) | data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub extension_type: ExtensionType,
    pub length: Field<u16>,
    pub content: Content<ExtensionData>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionData {
    SupportedVersions(SupportedVersionsExtension),
}

impl Extension {
    pub fn new(data: ExtensionData) -> Self {
        let extension_type = match &data {
            ExtensionData::SupportedVersions(_) => ExtensionType::SupportedVersions,
        };
        Extension {
            extension_type,
            length: Field::Unset,
            content: Content::Fields(data),
        }
    }

    pub fn supported_versions() -> Self {
        Self::new(ExtensionData::SupportedVersions(
            SupportedVersionsExtension::default(),
        ))
    }

    /// An extension emitted verbatim.
    pub fn raw(extension_type: ExtensionType, data: Vec<u8>) -> Self {
        Extension {
            extension_type,
            length: Field::Unset,
            content: Content::Passthrough(data),
        }
    }

    fn serialize_data(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        match &self.content {
            Content::Passthrough(data) => {
                output.extend_from_slice(data);
                Ok(())
            }
            Content::Fields(ExtensionData::SupportedVersions(e)) => e.serialize(output),
        }
    }
}

impl Message for Extension {
    fn parse<'a>(input: &'a [u8], ctx: &ParseContext) -> IResult<&'a [u8], Extension> {
        let (input, extension_type) = ExtensionType::parse(input)?;
        let (input, length) = be_u16(input)?;
        let (input, data) = take(length)(input)?;

        let content = match extension_type {
            ExtensionType::SupportedVersions => match SupportedVersionsExtension::parse(data, ctx) {
                Ok((rest, e)) if rest.is_empty() => {
                    Content::Fields(ExtensionData::SupportedVersions(e))
                }
                _ => {
                    trace!("Keeping undecodable supported_versions as raw bytes");
                    Content::Passthrough(data.to_vec())
                }
            },
            _ => Content::Passthrough(data.to_vec()),
        };

        Ok((
            input,
            Extension {
                extension_type,
                length: Field::Value(length),
                content,
            },
        ))
    }

    fn prepare(&mut self, ctx: &TlsContext) -> Result<(), Error> {
        if let Content::Fields(ExtensionData::SupportedVersions(e)) = &mut self.content {
            e.prepare(ctx)?;
        }
        if !self.length.is_set() {
            let mut data = Vec::new();
            self.serialize_data(&mut data)?;
            self.length = Field::Value(len_u16("extension length", data.len())?);
        }
        Ok(())
    }

    fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        let length = self.length.require("extension length")?;
        output.extend_from_slice(&self.extension_type.as_u16().to_be_bytes());
        output.extend_from_slice(&length.to_be_bytes());
        self.serialize_data(output)
    }

    fn adjust_context(&self, ctx: &mut TlsContext) -> Result<(), Error> {
        match &self.content {
            Content::Fields(ExtensionData::SupportedVersions(e)) => e.adjust_context(ctx),
            Content::Passthrough(data) if self.extension_type == ExtensionType::SupportedVersions => {
                let pctx = ParseContext::new(ctx.selected_protocol_version(), ctx.talking_end());
                match SupportedVersionsExtension::parse(data, &pctx) {
                    Ok((rest, e)) if rest.is_empty() => e.adjust_context(ctx),
                    _ => Err(Error::Adjustment(format!(
                        "Could not decode protocol versions from {} bytes",
                        data.len()
                    ))),
                }
            }
            Content::Passthrough(_) => Ok(()),
        }
    }

    fn recover(&self, ctx: &mut TlsContext) {
        match &self.content {
            Content::Fields(ExtensionData::SupportedVersions(e)) => e.recover(ctx),
            Content::Passthrough(_) if self.extension_type == ExtensionType::SupportedVersions => {
                let fallback = ctx.config().default_selected_protocol_version();
                ctx.set_selected_protocol_version(fallback);
            }
            Content::Passthrough(_) => {}
        }
    }

    fn reset(&mut self) {
        self.length.reset();
        if let Content::Fields(ExtensionData::SupportedVersions(e)) = &mut self.content {
            e.reset();
        }
    }
}

/// Parse an optional `length(2) | extensions` block filling the rest of a
/// hello. No bytes left means the block is absent.
pub(crate) fn parse_extension_block<'a>(
    input: &'a [u8],
    ctx: &ParseContext,
) -> IResult<&'a [u8], (Field<Option<u16>>, Vec<Extension>)> {
    if input.is_empty() {
        return Ok((input, (Field::Value(None), Vec::new())));
    }
    let (input, length) = be_u16(input)?;
    let (input, block) = take(length)(input)?;
    let (_, extensions) = crate::util::many_until_empty(|i| Extension::parse(i, ctx))(block)?;
    Ok((input, (Field::Value(Some(length)), extensions)))
}

/// Prepare every extension and, if unset, the block length. The block is
/// present when the config enables extensions and `version` is not SSL3.
pub(crate) fn prepare_extension_block(
    length: &mut Field<Option<u16>>,
    extensions: &mut [Extension],
    version: ProtocolVersion,
    ctx: &TlsContext,
) -> Result<(), Error> {
    for extension in extensions.iter_mut() {
        extension.prepare(ctx)?;
    }
    if !length.is_set() {
        let present = ctx.config().with_extensions() && version != ProtocolVersion::SSL3;
        let value = if present {
            let mut block = Vec::new();
            for extension in extensions.iter() {
                extension.serialize(&mut block)?;
            }
            Some(len_u16("extensions length", block.len())?)
        } else {
            None
        };
        *length = Field::Value(value);
    }
    Ok(())
}

pub(crate) fn serialize_extension_block(
    length: &Field<Option<u16>>,
    extensions: &[Extension],
    output: &mut Vec<u8>,
) -> Result<(), Error> {
    if let Some(Some(length)) = length.get() {
        output.extend_from_slice(&length.to_be_bytes());
        for extension in extensions {
            extension.serialize(output)?;
        }
    }
    Ok(())
}

/// Apply each extension, recovering from adjustment failures one extension
/// at a time.
pub(crate) fn adjust_extensions(
    extensions: &[Extension],
    ctx: &mut TlsContext,
) -> Result<(), Error> {
    for extension in extensions {
        crate::handler::adjust_with_recovery(extension, ctx)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionEnd;
    use crate::Config;

    const MESSAGE: &[u8] = &[
        0x00, 0x0A, // ExtensionType::SupportedGroups
        0x00, 0x04, // Length
        0x00, 0x02, 0x00, 0x17, // Data
    ];

    #[test]
    fn raw_roundtrip() {
        let (rest, parsed) = Extension::parse(MESSAGE, &ParseContext::default()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed.extension_type, ExtensionType::SupportedGroups);
        assert!(parsed.content.is_passthrough());

        let mut serialized = Vec::new();
        parsed.serialize(&mut serialized).unwrap();
        assert_eq!(serialized, MESSAGE);
    }

    #[test]
    fn undecodable_supported_versions_recovers() {
        let message = [
            0x00, 0x2B, // ExtensionType::SupportedVersions
            0x00, 0x03, // Length
            0x05, 0x03, 0x04, // List length claims 5 bytes
        ];
        let pctx = ParseContext::new(ProtocolVersion::TLS1_2, ConnectionEnd::Client);
        let (_, parsed) = Extension::parse(&message, &pctx).unwrap();
        assert!(parsed.content.is_passthrough());

        let config = Config::builder()
            .connection_end(ConnectionEnd::Server)
            .highest_protocol_version(ProtocolVersion::TLS1_3)
            .default_selected_protocol_version(ProtocolVersion::TLS1_1)
            .build()
            .unwrap();
        let mut ctx = TlsContext::new(config);
        ctx.set_talking_end(ConnectionEnd::Client);
        ctx.set_selected_protocol_version(ProtocolVersion::TLS1_3);

        assert!(matches!(
            parsed.adjust_context(&mut ctx),
            Err(Error::Adjustment(_))
        ));
        adjust_extensions(&[parsed], &mut ctx).unwrap();
        assert_eq!(ctx.warnings().len(), 1);
        assert_eq!(ctx.selected_protocol_version(), ProtocolVersion::TLS1_1);
    }

    #[test]
    fn raw_supported_versions_is_applied() {
        let mut ctx = TlsContext::new(Config::default());
        ctx.set_talking_end(ConnectionEnd::Server);
        let ext = Extension::raw(ExtensionType::SupportedVersions, vec![0x03, 0x02]);

        ext.adjust_context(&mut ctx).unwrap();
        assert_eq!(ctx.selected_protocol_version(), ProtocolVersion::TLS1_1);
        assert!(ctx.warnings().is_empty());
    }

    #[test]
    fn block_with_trailing_garbage_fails() {
        let block = [0x00, 0x09, 0x00, 0x0A, 0x00, 0x04, 0x00, 0x02, 0x00, 0x17, 0xFF];
        let ctx = ParseContext::new(ProtocolVersion::TLS1_2, ConnectionEnd::Server);
        assert!(parse_extension_block(&block, &ctx).is_err());
    }
}
