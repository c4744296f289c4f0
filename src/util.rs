use nom::error::{Error, ErrorKind};
use nom::{Err, IResult};

use crate::Error as CrateError;

/// Apply `f` until the input is used up. Unlike `many0`, a failing
/// element fails the whole list.
pub fn many_until_empty<'a, O, F>(mut f: F) -> impl FnMut(&'a [u8]) -> IResult<&'a [u8], Vec<O>>
where
    F: FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
{
    move |mut i: &'a [u8]| {
        let mut acc = Vec::new();
        while !i.is_empty() {
            let len = i.len();
            let (i1, o) = f(i)?;
            // infinite loop check: the parser must always consume
            if i1.len() == len {
                return Err(Err::Error(Error::new(i, ErrorKind::Many0)));
            }
            i = i1;
            acc.push(o);
        }
        Ok((i, acc))
    }
}

/// A 32 byte hello random.
pub fn parse_random(input: &[u8]) -> IResult<&[u8], [u8; 32]> {
    let (input, bytes) = nom::bytes::complete::take(32usize)(input)?;
    let mut random = [0; 32];
    random.copy_from_slice(bytes);
    Ok((input, random))
}

#[inline(always)]
pub fn put_u24(output: &mut Vec<u8>, value: u32) {
    output.extend_from_slice(&value.to_be_bytes()[1..]);
}

pub fn len_u8(name: &'static str, len: usize) -> Result<u8, CrateError> {
    u8::try_from(len).map_err(|_| CrateError::FieldTooLong(name, len))
}

pub fn len_u16(name: &'static str, len: usize) -> Result<u16, CrateError> {
    u16::try_from(len).map_err(|_| CrateError::FieldTooLong(name, len))
}

pub fn len_u24(name: &'static str, len: usize) -> Result<u32, CrateError> {
    if len > 0xFF_FFFF {
        return Err(CrateError::FieldTooLong(name, len));
    }
    Ok(len as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nom::number::complete::be_u16;

    #[test]
    fn many_until_empty_rejects_trailing_byte() {
        let input = [0x00, 0x01, 0x00];
        assert!(many_until_empty(be_u16)(&input[..]).is_err());
        let (rest, values) = many_until_empty(be_u16)(&input[..2]).unwrap();
        assert!(rest.is_empty());
        assert_eq!(values, vec![1]);
    }

    #[test]
    fn u24() {
        let mut out = Vec::new();
        put_u24(&mut out, 0x010203);
        assert_eq!(out, [1, 2, 3]);
        assert!(len_u24("x", 0x100_0000).is_err());
    }
}
