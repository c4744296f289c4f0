use nom::number::complete::be_u8;
use nom::IResult;

use super::{Field, Message, ParseContext};
use crate::context::TlsContext;
use crate::Error;

pub const CHANGE_CIPHER_SPEC_TYPE: u8 = 1;

/// ChangeCipherSpec. Any type byte is kept, not only 0x01.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeCipherSpecMessage {
    pub ccs_type: Field<u8>,
    /// Run the state transition when this message is handled.
    pub adjust_context: bool,
}

impl Default for ChangeCipherSpecMessage {
    fn default() -> Self {
        ChangeCipherSpecMessage {
            ccs_type: Field::Unset,
            adjust_context: true,
        }
    }
}

impl ChangeCipherSpecMessage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Message for ChangeCipherSpecMessage {
    fn parse<'a>(input: &'a [u8], _ctx: &ParseContext) -> IResult<&'a [u8], Self> {
        let (input, ccs_type) = be_u8(input)?;
        Ok((
            input,
            ChangeCipherSpecMessage {
                ccs_type: Field::Value(ccs_type),
                adjust_context: true,
            },
        ))
    }

    fn prepare(&mut self, _ctx: &TlsContext) -> Result<(), Error> {
        self.ccs_type.prepare_with(|| CHANGE_CIPHER_SPEC_TYPE);
        Ok(())
    }

    fn serialize(&self, output: &mut Vec<u8>) -> Result<(), Error> {
        output.push(*self.ccs_type.require("change cipher spec type")?);
        Ok(())
    }

    fn adjust_context(&self, ctx: &mut TlsContext) -> Result<(), Error> {
        let end = ctx.talking_end();
        debug!("ChangeCipherSpec from {:?}", end);
        ctx.change_cipher_spec(end);
        Ok(())
    }

    fn reset(&mut self) {
        self.ccs_type.reset();
    }
}
