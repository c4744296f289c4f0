use nom::IResult;

use super::{Field, Message, ParseContext};
use crate::context::TlsContext;
use crate::types::{AlertDescription, AlertLevel};
use crate::Error;

/// Alert: `level(1) | description(1)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub level: Field<AlertLevel>,
    pub description: Field<AlertDescription>,
    /// Run the state transition when this message is handled.
    pub adjust_context: bool,
}

impl Default for AlertMessage {
    fn default() -> Self {
        AlertMessage {
            level: Field::Unset,
            description: Field::Unset,
            adjust_context: true,
        }
    }
}

impl AlertMessage {
    pub fn new(level: AlertLevel, description: AlertDescription) -> Self {
        AlertMessage {
            level: Field::Override(level),
            description: Field::Override(description),
            adjust_context: true,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.level.value() == Some(AlertLevel::Fatal)
    }
}

impl Message for AlertMessage {
    fn parse<'a>(input: &'a [u8], _ctx: &ParseContext) -> IResult<&'a [u8], AlertMessage> {
        let (input, level) = AlertLevel::parse(input)?;
        let (input, description) = AlertDescription::parse(input)?;
        Ok((
            input,
            AlertMessage {
                level: Field::Value(level),
                description: Field::Value(description),
                adjust_context: true,
            },
        ))
    }

    fn prepare(&mut self, _ctx: &TlsContext) -> Result<(), Error> {
        self.level.prepare_with(|| AlertLevel::Warning);
        self.description
            .prepare_with(|| AlertDescription::CloseNotify);
        Ok(())
    }

    fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        output.push(self.level.require("alert level")?.as_u8());
        output.push(self.description.require("alert description")?.as_u8());
        Ok(())
    }

    fn adjust_context(&self, ctx: &mut TlsContext) -> Result<(), Error> {
        if ctx.talking_end() == ctx.connection_end() {
            return Ok(());
        }
        if self.is_fatal() {
            warn!("Received fatal alert: {:?}", self.description);
            ctx.set_received_fatal_alert();
        } else {
            debug!("Received alert: {:?} {:?}", self.level, self.description);
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.level.reset();
        self.description.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConnectionEnd;
    use crate::Config;

    const MESSAGE: &[u8] = &[
        0x02, // AlertLevel::Fatal
        0x28, // AlertDescription::HandshakeFailure
    ];

    #[test]
    fn roundtrip() {
        let (rest, alert) = AlertMessage::parse(MESSAGE, &ParseContext::default()).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            alert.description.value(),
            Some(AlertDescription::HandshakeFailure)
        );

        let mut serialized = Vec::new();
        alert.serialize(&mut serialized).unwrap();
        assert_eq!(serialized, MESSAGE);
    }

    #[test]
    fn only_peer_fatal_alert_sets_flag() {
        let mut ctx = TlsContext::new(Config::default());
        let (_, alert) = AlertMessage::parse(MESSAGE, &ParseContext::default()).unwrap();

        ctx.set_talking_end(ConnectionEnd::Client);
        alert.adjust_context(&mut ctx).unwrap();
        assert!(!ctx.received_fatal_alert());

        ctx.set_talking_end(ConnectionEnd::Server);
        alert.adjust_context(&mut ctx).unwrap();
        assert!(ctx.received_fatal_alert());
    }
}
