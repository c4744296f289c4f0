//! Drives messages through prepare/serialize or parse, then applies their
//! state transition.
//!
//! A failed state transition that reports [`Error::Adjustment`] does not
//! abort processing. It is recorded as a warning on the context and the
//! message's recovery default is applied instead.

use crate::context::TlsContext;
use crate::fragment::{defragment, fragment_message, refragment_message};
use crate::message::{
    DtlsFragment, HandshakeMessage, Message, ParseContext, ParseError, ProtocolMessage,
};
use crate::types::ContentType;
use crate::util::many_until_empty;
use crate::Error;

fn recover_adjustment(
    result: Result<(), Error>,
    ctx: &mut TlsContext,
    recover: impl FnOnce(&mut TlsContext),
) -> Result<(), Error> {
    match result {
        Err(Error::Adjustment(reason)) => {
            ctx.record_warning(reason);
            recover(ctx);
            Ok(())
        }
        other => other,
    }
}

/// Run `msg`'s state transition, falling back to its recovery default on
/// an adjustment failure.
pub(crate) fn adjust_with_recovery<M: Message>(msg: &M, ctx: &mut TlsContext) -> Result<(), Error> {
    let result = msg.adjust_context(ctx);
    recover_adjustment(result, ctx, |ctx| msg.recover(ctx))
}

fn adjust_protocol_message(msg: &ProtocolMessage, ctx: &mut TlsContext) -> Result<(), Error> {
    if !msg.adjusts_context() {
        trace!("State transition disabled for {:?}", msg.content_type());
        return Ok(());
    }
    let result = msg.adjust_context(ctx);
    recover_adjustment(result, ctx, |ctx| msg.recover(ctx))
}

fn content_name(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Handshake => "handshake",
        ContentType::Alert => "alert",
        ContentType::ChangeCipherSpec => "change_cipher_spec",
        ContentType::ApplicationData => "application_data",
        _ => "record content",
    }
}

/// Prepare and serialize a message this side sends, then apply its state
/// transition.
pub fn process_outgoing(ctx: &mut TlsContext, msg: &mut ProtocolMessage) -> Result<Vec<u8>, Error> {
    ctx.set_talking_end(ctx.connection_end());
    msg.prepare(ctx)?;

    let mut output = Vec::new();
    msg.serialize(&mut output)?;
    debug!("Sending {:?} ({} bytes)", msg.content_type(), output.len());

    adjust_protocol_message(msg, ctx)?;
    Ok(output)
}

/// Parse one message the peer sent and apply its state transition.
///
/// Returns the message and the number of bytes it used.
pub fn process_incoming(
    ctx: &mut TlsContext,
    content_type: ContentType,
    input: &[u8],
) -> Result<(ProtocolMessage, usize), Error> {
    ctx.set_talking_end(ctx.connection_end().peer());
    let pctx = ParseContext::from_context(ctx);

    let (rest, msg) = ProtocolMessage::parse(content_type, input, &pctx)
        .map_err(|e| ParseError::from_nom(input, e, content_name(content_type)))?;
    let consumed = input.len() - rest.len();
    debug!("Received {:?} ({} bytes)", content_type, consumed);

    adjust_protocol_message(&msg, ctx)?;
    Ok((msg, consumed))
}

/// Prepare a handshake message this side sends over DTLS and cut it into
/// fragments of the configured maximum.
pub fn process_outgoing_dtls(
    ctx: &mut TlsContext,
    msg: &mut HandshakeMessage,
) -> Result<Vec<DtlsFragment>, Error> {
    ctx.set_talking_end(ctx.connection_end());
    msg.prepare(ctx)?;

    let message_seq = ctx.next_write_message_seq();
    let max = ctx.config().dtls_maximum_fragment_length();
    let fragments = fragment_message(msg, message_seq, max, ctx)?;

    if msg.adjust_context {
        adjust_with_recovery(msg, ctx)?;
    }
    Ok(fragments)
}

/// Like [`process_outgoing_dtls`], but re-slices an existing fragment list
/// so each fragment's own maximum and overrides are kept.
pub fn prepare_dtls_fragments(
    ctx: &mut TlsContext,
    msg: &mut HandshakeMessage,
    fragments: &mut [DtlsFragment],
) -> Result<(), Error> {
    ctx.set_talking_end(ctx.connection_end());
    msg.prepare(ctx)?;

    let message_seq = ctx.next_write_message_seq();
    refragment_message(msg, message_seq, fragments, ctx)?;

    if msg.adjust_context {
        adjust_with_recovery(msg, ctx)?;
    }
    Ok(())
}

/// Serialize prepared fragments back to back.
pub fn serialize_fragments(fragments: &[DtlsFragment]) -> Result<Vec<u8>, Error> {
    let mut output = Vec::new();
    for fragment in fragments {
        fragment.serialize(&mut output)?;
    }
    Ok(output)
}

/// Parse all fragments in a DTLS handshake record payload.
pub fn parse_fragments(input: &[u8]) -> Result<Vec<DtlsFragment>, Error> {
    let pctx = ParseContext::default();
    let (_, fragments) = many_until_empty(|i| DtlsFragment::parse(i, &pctx))(input)
        .map_err(|e| ParseError::from_nom(input, e, "dtls fragment"))?;
    Ok(fragments)
}

/// Reassemble the fragments of one peer message, parse it and apply its
/// state transition.
pub fn process_incoming_dtls(
    ctx: &mut TlsContext,
    fragments: &[DtlsFragment],
) -> Result<HandshakeMessage, Error> {
    ctx.set_talking_end(ctx.connection_end().peer());
    let (message_type, message_seq, body) = defragment(fragments)?;
    if message_seq != ctx.read_message_seq() {
        debug!(
            "Message seq {} where {} was expected",
            message_seq,
            ctx.read_message_seq()
        );
    }

    let pctx = ParseContext::from_context(ctx);
    let (_, msg) = HandshakeMessage::from_body(message_type, &body, &pctx)
        .map_err(|e| ParseError::from_nom(&body, e, "handshake"))?;
    ctx.increase_read_message_seq();

    if msg.adjust_context {
        adjust_with_recovery(&msg, ctx)?;
    }
    Ok(msg)
}
