use nom::bytes::complete::take;
use nom::number::complete::be_u8;
use nom::IResult;

use crate::context::TlsContext;
use crate::message::{Field, Message, ParseContext};
use crate::types::{ConnectionEnd, ProtocolVersion};
use crate::util::len_u8;
use crate::Error;

/// supported_versions (RFC 8446 4.2.1).
///
/// A client sends `length(1) | versions`, a server a bare version. The
/// versions are kept as raw bytes so malformed lists survive parsing and
/// are only rejected when applied to the connection state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupportedVersionsExtension {
    /// Client form only. `Value(None)` marks the server form.
    pub versions_length: Field<Option<u8>>,
    pub versions: Field<Vec<u8>>,
}

impl SupportedVersionsExtension {
    pub fn with_versions(versions: &[ProtocolVersion]) -> Self {
        SupportedVersionsExtension {
            versions_length: Field::Unset,
            versions: Field::Override(ProtocolVersion::to_bytes(versions)),
        }
    }
}

impl Message for SupportedVersionsExtension {
    fn parse<'a>(input: &'a [u8], ctx: &ParseContext) -> IResult<&'a [u8], Self> {
        match ctx.talking_end {
            ConnectionEnd::Client => {
                let (input, length) = be_u8(input)?;
                let (input, versions) = take(length)(input)?;
                Ok((
                    input,
                    SupportedVersionsExtension {
                        versions_length: Field::Value(Some(length)),
                        versions: Field::Value(versions.to_vec()),
                    },
                ))
            }
            ConnectionEnd::Server => {
                let (rest, versions) = take(input.len())(input)?;
                Ok((
                    rest,
                    SupportedVersionsExtension {
                        versions_length: Field::Value(None),
                        versions: Field::Value(versions.to_vec()),
                    },
                ))
            }
        }
    }

    fn prepare(&mut self, ctx: &TlsContext) -> Result<(), Error> {
        let talking_end = ctx.talking_end();
        self.versions.prepare_with(|| match talking_end {
            ConnectionEnd::Client => ProtocolVersion::to_bytes(ctx.config().supported_versions()),
            ConnectionEnd::Server => ProtocolVersion::to_bytes(&[ctx.selected_protocol_version()]),
        });
        if !self.versions_length.is_set() {
            let value = match talking_end {
                ConnectionEnd::Client => {
                    let versions = self.versions.require("supported versions")?;
                    Some(len_u8("supported versions length", versions.len())?)
                }
                ConnectionEnd::Server => None,
            };
            self.versions_length = Field::Value(value);
        }
        Ok(())
    }

    fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        if let Some(Some(length)) = self.versions_length.get() {
            output.push(*length);
        }
        output.extend_from_slice(self.versions.require("supported versions")?);
        Ok(())
    }

    fn adjust_context(&self, ctx: &mut TlsContext) -> Result<(), Error> {
        let bytes = self.versions.require("supported versions")?;
        let versions = ProtocolVersion::from_bytes(bytes).ok_or_else(|| {
            Error::Adjustment(format!(
                "Could not create protocol versions from {} bytes",
                bytes.len()
            ))
        })?;

        match ctx.talking_end() {
            ConnectionEnd::Client => {
                if let Some(highest) = ProtocolVersion::highest(&versions) {
                    ctx.set_highest_client_protocol_version(highest);
                }
                ctx.set_client_supported_versions(versions.clone());

                let mut offered = versions;
                ProtocolVersion::sort_descending(&mut offered);
                let limit = ctx.config().highest_protocol_version();
                let selected = offered.into_iter().find(|v| limit.compare(v).is_ge());

                match selected {
                    Some(version) => ctx.set_selected_protocol_version(version),
                    None => {
                        ctx.record_warning("No common protocol version could be found");
                        let fallback = ctx.config().default_selected_protocol_version();
                        ctx.set_selected_protocol_version(fallback);
                    }
                }
            }
            ConnectionEnd::Server => {
                if let &[version] = versions.as_slice() {
                    ctx.set_selected_protocol_version(version);
                } else {
                    ctx.record_warning(format!(
                        "Server supported_versions with {} entries ignored",
                        versions.len()
                    ));
                }
            }
        }
        Ok(())
    }

    fn recover(&self, ctx: &mut TlsContext) {
        let fallback = ctx.config().default_selected_protocol_version();
        ctx.set_selected_protocol_version(fallback);
    }

    fn reset(&mut self) {
        self.versions_length.reset();
        self.versions.reset();
    }
}
