//! DTLS handshake fragmentation.
//!
//! Fresh fragmentation cuts a message into slices of a uniform maximum.
//! Re-fragmentation re-slices an existing fragment list, each fragment
//! with its own maximum, so irregular fragment patterns can be replayed
//! against new message content.

use crate::context::TlsContext;
use crate::message::{DtlsFragment, FragmentSlice, HandshakeMessage, Message};
use crate::types::HandshakeType;
use crate::util::len_u24;
use crate::Error;

/// Slice `body` into fragments of at most `max` bytes.
///
/// Always yields at least one fragment, so an empty body becomes one empty
/// fragment.
pub fn generate_fragments(
    message_type: HandshakeType,
    message_seq: u16,
    body: &[u8],
    max: usize,
) -> Result<Vec<FragmentSlice>, Error> {
    if max == 0 {
        return Err(Error::unsupported("DTLS maximum fragment length of 0"));
    }
    let total = body.len();
    let total_length = len_u24("handshake length", total)?;

    let mut slices = Vec::with_capacity(total / max + 1);
    let mut offset: usize = 0;
    loop {
        let end = total.min(offset.saturating_add(max));
        slices.push(FragmentSlice {
            message_type,
            message_seq,
            offset: offset as u32,
            total_length,
            payload: body[offset..end].to_vec(),
        });
        offset = offset.saturating_add(max);
        if offset >= total {
            break;
        }
    }
    Ok(slices)
}

/// Re-slice `body` over `fragments` in order.
///
/// Each fragment takes up to its own `max_fragment_length`, or
/// `default_max`, from where the previous one ended. Fragments past the
/// end of `body` become empty.
pub fn regenerate_fragments(
    message_type: HandshakeType,
    message_seq: u16,
    body: &[u8],
    fragments: &mut [DtlsFragment],
    default_max: usize,
) -> Result<(), Error> {
    let total = body.len();
    let total_length = len_u24("handshake length", total)?;

    let mut offset: usize = 0;
    for fragment in fragments.iter_mut() {
        let max = fragment.max_fragment_length.unwrap_or(default_max);
        let end = total.min(offset.saturating_add(max));
        fragment.slice = FragmentSlice {
            message_type,
            message_seq,
            offset: offset as u32,
            total_length,
            payload: body[offset..end].to_vec(),
        };
        offset = end;
    }
    if offset < total {
        debug!(
            "Re-fragmentation left {} of {} bytes unsent",
            total - offset,
            total
        );
    }
    Ok(())
}

fn message_parts(msg: &HandshakeMessage) -> Result<(HandshakeType, Vec<u8>), Error> {
    let message_type = msg
        .handshake_type()
        .ok_or(Error::MissingField("handshake type"))?;
    let mut body = Vec::new();
    msg.serialize_body(&mut body)?;
    Ok((message_type, body))
}

fn prepare_all(fragments: &mut [DtlsFragment], ctx: &TlsContext) -> Result<(), Error> {
    for fragment in fragments.iter_mut() {
        fragment.prepare(ctx)?;
    }
    Ok(())
}

/// Fragment a prepared handshake message with a uniform maximum.
pub fn fragment_message(
    msg: &HandshakeMessage,
    message_seq: u16,
    max: usize,
    ctx: &TlsContext,
) -> Result<Vec<DtlsFragment>, Error> {
    let (message_type, body) = message_parts(msg)?;
    let mut fragments: Vec<_> = generate_fragments(message_type, message_seq, &body, max)?
        .into_iter()
        .map(DtlsFragment::new)
        .collect();
    prepare_all(&mut fragments, ctx)?;
    trace!(
        "{:?} of {} bytes in {} fragments",
        message_type,
        body.len(),
        fragments.len()
    );
    Ok(fragments)
}

/// The whole message in one fragment.
pub fn wrap_in_single_fragment(
    msg: &HandshakeMessage,
    message_seq: u16,
    ctx: &TlsContext,
) -> Result<DtlsFragment, Error> {
    let (message_type, body) = message_parts(msg)?;
    let slice = generate_fragments(message_type, message_seq, &body, body.len().max(1))?
        .into_iter()
        .next()
        .ok_or_else(|| Error::unsupported("no fragment generated"))?;
    let mut fragment = DtlsFragment::new(slice);
    fragment.prepare(ctx)?;
    Ok(fragment)
}

/// Re-slice a prepared handshake message over an existing fragment list.
///
/// Computed wire fields are cleared before preparing, so overrides on the
/// fragments stay in effect.
pub fn refragment_message(
    msg: &HandshakeMessage,
    message_seq: u16,
    fragments: &mut [DtlsFragment],
    ctx: &TlsContext,
) -> Result<(), Error> {
    let (message_type, body) = message_parts(msg)?;
    let default_max = ctx.config().dtls_maximum_fragment_length();
    regenerate_fragments(message_type, message_seq, &body, fragments, default_max)?;
    for fragment in fragments.iter_mut() {
        fragment.reset();
    }
    prepare_all(fragments, ctx)
}

/// Reassemble a complete handshake body from fragments of one message.
///
/// Fragments may come in any order and may overlap when the overlapping
/// bytes agree. Gaps, disagreeing totals or types fail.
pub fn defragment(fragments: &[DtlsFragment]) -> Result<(HandshakeType, u16, Vec<u8>), Error> {
    let first = fragments
        .first()
        .ok_or_else(|| Error::Reassembly("no fragments".into()))?;
    let message_type = first.msg_type.value().unwrap_or(first.slice.message_type);
    let message_seq = first.message_seq.value().unwrap_or(first.slice.message_seq);
    let total = first.length.value().unwrap_or(first.slice.total_length) as usize;

    let mut sorted: Vec<&DtlsFragment> = fragments.iter().collect();
    sorted.sort_by_key(|f| f.offset());

    let mut body = Vec::with_capacity(total);
    for fragment in sorted {
        let length = fragment.length.value().unwrap_or(fragment.slice.total_length) as usize;
        let msg_type = fragment.msg_type.value().unwrap_or(fragment.slice.message_type);
        let seq = fragment.message_seq.value().unwrap_or(fragment.slice.message_seq);
        if length != total || msg_type != message_type || seq != message_seq {
            return Err(Error::Reassembly(format!(
                "fragment disagrees on message: {:?}/{}/{} vs {:?}/{}/{}",
                msg_type, seq, length, message_type, message_seq, total
            )));
        }

        let offset = fragment.offset() as usize;
        let payload = fragment.payload();
        let end = offset + payload.len();
        if end > total {
            return Err(Error::Reassembly(format!(
                "fragment [{}, {}) exceeds message length {}",
                offset, end, total
            )));
        }
        if offset > body.len() {
            return Err(Error::Reassembly(format!(
                "gap at [{}, {})",
                body.len(),
                offset
            )));
        }
        let overlap = body.len() - offset;
        if overlap > 0 {
            let shared = overlap.min(payload.len());
            if body[offset..offset + shared] != payload[..shared] {
                return Err(Error::Reassembly(format!(
                    "overlapping fragments disagree at {}",
                    offset
                )));
            }
        }
        if end > body.len() {
            body.extend_from_slice(&payload[overlap..]);
        }
    }

    if body.len() != total {
        return Err(Error::Reassembly(format!(
            "missing bytes [{}, {})",
            body.len(),
            total
        )));
    }
    Ok((message_type, message_seq, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payloads(slices: &[FragmentSlice]) -> Vec<u8> {
        slices.iter().flat_map(|s| s.payload.clone()).collect()
    }

    #[test]
    fn count_is_ceil() {
        let body: Vec<u8> = (0..10).collect();
        for (max, count) in [(1, 10), (3, 4), (5, 2), (10, 1), (64, 1)] {
            let slices = generate_fragments(HandshakeType::ClientHello, 0, &body, max).unwrap();
            assert_eq!(slices.len(), count, "max {}", max);
            assert_eq!(payloads(&slices), body);
        }
    }

    #[test]
    fn empty_body_gives_one_fragment() {
        let slices = generate_fragments(HandshakeType::ServerHelloDone, 3, &[], 100).unwrap();
        assert_eq!(slices.len(), 1);
        assert!(slices[0].payload.is_empty());
        assert_eq!(slices[0].total_length, 0);
    }

    #[test]
    fn zero_max_is_rejected() {
        assert!(matches!(
            generate_fragments(HandshakeType::ClientHello, 0, &[1, 2], 0),
            Err(Error::UnsupportedConfiguration(_))
        ));
    }

    #[test]
    fn unbounded_max_gives_one_fragment() {
        let slices =
            generate_fragments(HandshakeType::ClientHello, 0, &[1, 2, 3], usize::MAX).unwrap();
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].payload, [1, 2, 3]);

        let mut fragments = vec![
            DtlsFragment::default().with_max_fragment_length(1),
            DtlsFragment::default().with_max_fragment_length(usize::MAX),
        ];
        regenerate_fragments(HandshakeType::ClientHello, 0, &[1, 2, 3], &mut fragments, 4)
            .unwrap();
        assert_eq!(fragments[1].slice.offset, 1);
        assert_eq!(fragments[1].slice.payload, [2, 3]);
    }

    #[test]
    fn regenerate_uses_emitted_lengths() {
        let body: Vec<u8> = (0..10).collect();
        let mut fragments = vec![
            DtlsFragment::default().with_max_fragment_length(3),
            DtlsFragment::default(),
            DtlsFragment::default().with_max_fragment_length(2),
            DtlsFragment::default().with_max_fragment_length(8),
        ];
        regenerate_fragments(HandshakeType::Certificate, 2, &body, &mut fragments, 4).unwrap();

        let offsets: Vec<u32> = fragments.iter().map(|f| f.slice.offset).collect();
        assert_eq!(offsets, [0, 3, 7, 9]);
        assert_eq!(fragments[3].slice.payload, [9]);
    }

    #[test]
    fn defragment_out_of_order() {
        let body: Vec<u8> = (0..7).collect();
        let mut fragments: Vec<DtlsFragment> =
            generate_fragments(HandshakeType::ClientHello, 1, &body, 3)
                .unwrap()
                .into_iter()
                .map(DtlsFragment::new)
                .collect();
        fragments.reverse();

        let (msg_type, seq, out) = defragment(&fragments).unwrap();
        assert_eq!(msg_type, HandshakeType::ClientHello);
        assert_eq!(seq, 1);
        assert_eq!(out, body);

        fragments.remove(1);
        assert!(matches!(defragment(&fragments), Err(Error::Reassembly(_))));
    }
}
