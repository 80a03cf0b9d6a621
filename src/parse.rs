pub type Input<'a> = &'a [u8];
pub type Result<'a, O> = nom::IResult<Input<'a>, O, nom::error::VerboseError<Input<'a>>>;

/// Implements a `parse` function for an input enum, that allows it to be
/// parsed in terms of a numeric type.
///
/// Shamelessly borrowed from fasterthanlime's executable packer tutorial:
/// https://fasterthanli.me/series/making-our-own-executable-packer
#[macro_export]
macro_rules! impl_parse_for_enum {
    ($type: ident, $number_parser: ident) => {
        impl $type {
            pub fn parse(i: crate::parse::Input) -> crate::parse::Result<Self> {
                use nom::{
                    combinator::map_res,
                    error::{context, ErrorKind},
                    number::complete::$number_parser,
                };
                use std::convert::TryFrom;

                let parser = map_res($number_parser, |x| {
                    Self::try_from(x).map_err(|_| ErrorKind::Alt)
                });
                context(stringify!($type), parser)(i)
            }
        }
    };
}

/// Return the slice of `original` starting at `offset`, or a nom error if the offset points past
/// the end of the input. Offsets inside Exif data come from the file itself, so they can't be
/// trusted to be in range.
pub fn slice_from<'a>(original: Input<'a>, offset: usize) -> Result<'a, Input<'a>> {
    use nom::error::{ErrorKind, ParseError, VerboseError};

    if offset > original.len() {
        return Err(nom::Err::Failure(VerboseError::from_error_kind(
            original,
            ErrorKind::Eof,
        )));
    }
    Ok((&original[offset..], &original[offset..]))
}

/// Render a nom error as a readable backtrace of parser contexts, with the byte offset at which
/// each context failed.
pub fn pretty_error_message(data: Input, e: nom::Err<nom::error::VerboseError<Input>>) -> String {
    use nom::{error::VerboseErrorKind, Offset};

    match e {
        nom::Err::Error(e) | nom::Err::Failure(e) => e
            .errors
            .iter()
            .rev()
            .map(|(i, kind)| {
                let offset = data.offset(i);
                match kind {
                    VerboseErrorKind::Context(ctx) => format!("{} (at 0x{:x})", ctx, offset),
                    other => format!("{:?} (at 0x{:x})", other, offset),
                }
            })
            .fold("JPEGFile::parse".to_string(), |acc, x| {
                format!("{} => {}", acc, x)
            }),
        nom::Err::Incomplete(needed) => format!("JPEGFile::parse => incomplete input: {:?}", needed),
    }
}

#[cfg(test)]
mod test {
    use super::{pretty_error_message, slice_from};

    #[test]
    fn test_slice_from_rejects_out_of_range_offsets() {
        let data = [1u8, 2, 3];
        let (_, rest) = slice_from(&data, 1).unwrap();
        assert_eq!(rest, &[2, 3]);
        assert!(slice_from(&data, 3).is_ok());

        let err = slice_from(&data, 4).unwrap_err();
        let msg = pretty_error_message(&data, err);
        assert!(msg.starts_with("JPEGFile::parse => "));
        assert!(msg.contains("Eof"));
    }
}
