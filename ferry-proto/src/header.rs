//! Session header codec over any `Read`/`Write` stream.
//!
//! Binary layout (default):
//!
//! ```text
//! [4 bytes BE: name_len]
//! [name_len bytes: file name, UTF-8]
//! [8 bytes BE: file size]
//! ```
//!
//! Text layout: `<name>\n<size as decimal>\n`.

use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

/// Maximum accepted file name length in bytes.
pub const MAX_NAME_LEN: usize = 4096;

/// Delimiter terminating each field of a [`HeaderFormat::Text`] header.
const DELIMITER: u8 = b'\n';

/// Longest decimal representation of a `u64`.
const MAX_SIZE_DIGITS: usize = 20;

/// How the session header is encoded on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum HeaderFormat {
    /// Length-prefixed binary header.
    #[default]
    Binary,
    /// Newline-delimited text header.
    Text,
}

/// File metadata announced before the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    /// Base name of the file, without directory components.
    pub name: String,
    /// Exact number of body bytes that follow the header.
    pub size: u64,
}

impl FileHeader {
    /// Creates a header for `name` with `size` body bytes.
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// Checks that `name` is a plain base name that `format` can carry.
pub fn validate_name(name: &str, format: HeaderFormat) -> io::Result<()> {
    let reason = if name.is_empty() {
        Some("file name is empty")
    } else if name.len() > MAX_NAME_LEN {
        Some("file name exceeds 4096 bytes")
    } else if name == "." || name == ".." {
        Some("file name refers to a directory")
    } else if name.contains(['/', '\\']) {
        Some("file name contains a path separator")
    } else if name.contains('\0') {
        Some("file name contains a NUL byte")
    } else if format == HeaderFormat::Text && name.contains(char::from(DELIMITER)) {
        Some("file name contains the header delimiter")
    } else {
        None
    };
    match reason {
        Some(msg) => Err(io::Error::new(io::ErrorKind::InvalidData, msg)),
        None => Ok(()),
    }
}

/// Encodes `header` in `format`, writes it to `w` and flushes.
pub fn encode<W: Write>(w: &mut W, header: &FileHeader, format: HeaderFormat) -> io::Result<()> {
    validate_name(&header.name, format)?;
    match format {
        HeaderFormat::Binary => {
            let len = u32::try_from(header.name.len())
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "name exceeds u32::MAX"))?;
            w.write_all(&len.to_be_bytes())?;
            w.write_all(header.name.as_bytes())?;
            w.write_all(&header.size.to_be_bytes())?;
        }
        HeaderFormat::Text => {
            w.write_all(header.name.as_bytes())?;
            w.write_all(&[DELIMITER])?;
            w.write_all(header.size.to_string().as_bytes())?;
            w.write_all(&[DELIMITER])?;
        }
    }
    w.flush()
}

/// Reads a header in `format` from `r`.
///
/// Consumes the header bytes only; the first body byte is left unread.
pub fn decode<R: Read>(r: &mut R, format: HeaderFormat) -> io::Result<FileHeader> {
    let header = match format {
        HeaderFormat::Binary => decode_binary(r)?,
        HeaderFormat::Text => decode_text(r)?,
    };
    validate_name(&header.name, format)?;
    Ok(header)
}

/// Decodes the length-prefixed layout.
fn decode_binary<R: Read>(r: &mut R) -> io::Result<FileHeader> {
    let mut len_buf = [0u8; 4];
    r.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;
    if len == 0 || len > MAX_NAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("name length {len} out of range 1..={MAX_NAME_LEN}"),
        ));
    }
    let mut name_buf = vec![0u8; len];
    r.read_exact(&mut name_buf)?;
    let name = String::from_utf8(name_buf)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut size_buf = [0u8; 8];
    r.read_exact(&mut size_buf)?;
    Ok(FileHeader {
        name,
        size: u64::from_be_bytes(size_buf),
    })
}

/// Decodes the newline-delimited layout.
fn decode_text<R: Read>(r: &mut R) -> io::Result<FileHeader> {
    let name_bytes = read_field(r, MAX_NAME_LEN)?;
    let name = String::from_utf8(name_bytes)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let size_bytes = read_field(r, MAX_SIZE_DIGITS)?;
    Ok(FileHeader {
        name,
        size: parse_size(&size_bytes)?,
    })
}

/// Reads one delimited field, one byte at a time so no body byte is consumed.
fn read_field<R: Read>(r: &mut R, max: usize) -> io::Result<Vec<u8>> {
    let mut field = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        r.read_exact(&mut byte)?;
        if byte[0] == DELIMITER {
            return Ok(field);
        }
        if field.len() == max {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("header field exceeds {max} bytes"),
            ));
        }
        field.push(byte[0]);
    }
}

/// Parses a non-negative decimal size. Signs and whitespace are rejected.
fn parse_size(field: &[u8]) -> io::Result<u64> {
    let invalid = || {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("size field {:?} is not a non-negative integer", String::from_utf8_lossy(field)),
        )
    };
    if field.is_empty() || !field.iter().all(u8::is_ascii_digit) {
        return Err(invalid());
    }
    std::str::from_utf8(field)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(header: &FileHeader, format: HeaderFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        encode(&mut buf, header, format).unwrap();
        buf
    }

    #[test]
    fn binary_layout() {
        let buf = encoded(&FileHeader::new("a.txt", 258), HeaderFormat::Binary);
        assert_eq!(&buf[..4], &[0, 0, 0, 5]);
        assert_eq!(&buf[4..9], b"a.txt");
        assert_eq!(&buf[9..], &[0, 0, 0, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn text_layout() {
        let buf = encoded(&FileHeader::new("a.txt", 1024), HeaderFormat::Text);
        assert_eq!(buf, b"a.txt\n1024\n");
    }

    #[test]
    fn binary_name_may_contain_newline() {
        let header = FileHeader::new("odd\nname.bin", 7);
        let buf = encoded(&header, HeaderFormat::Binary);
        let decoded = decode(&mut io::Cursor::new(&buf), HeaderFormat::Binary).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn decode_leaves_body_unread() {
        for format in [HeaderFormat::Binary, HeaderFormat::Text] {
            let mut buf = encoded(&FileHeader::new("data.bin", 3), format);
            let header_len = buf.len();
            buf.extend_from_slice(b"xyz");

            let mut cursor = io::Cursor::new(&buf);
            let header = decode(&mut cursor, format).unwrap();
            assert_eq!(header.size, 3);
            assert_eq!(cursor.position() as usize, header_len);
        }
    }

    #[test]
    fn text_rejects_non_numeric_size() {
        let mut cursor = io::Cursor::new(&b"a.txt\nabc\n"[..]);
        let err = decode(&mut cursor, HeaderFormat::Text).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn text_rejects_signed_and_empty_size() {
        for raw in [&b"a.txt\n-5\n"[..], b"a.txt\n+5\n", b"a.txt\n\n", b"a.txt\n 5\n"] {
            let err = decode(&mut io::Cursor::new(raw), HeaderFormat::Text).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData, "{raw:?}");
        }
    }

    #[test]
    fn text_rejects_size_overflow() {
        let raw = b"a.txt\n18446744073709551616\n";
        let err = decode(&mut io::Cursor::new(&raw[..]), HeaderFormat::Text).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn text_rejects_unterminated_field() {
        let long = vec![b'9'; 64];
        let mut raw = b"a.txt\n".to_vec();
        raw.extend_from_slice(&long);
        let err = decode(&mut io::Cursor::new(&raw), HeaderFormat::Text).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn truncated_header_is_eof() {
        let buf = encoded(&FileHeader::new("a.txt", 10), HeaderFormat::Binary);
        let err = decode(&mut io::Cursor::new(&buf[..7]), HeaderFormat::Binary).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let err = decode(&mut io::Cursor::new(&b"a.txt\n12"[..]), HeaderFormat::Text).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn rejects_name_length_out_of_range() {
        for len in [0u32, MAX_NAME_LEN as u32 + 1] {
            let header = len.to_be_bytes();
            let err = decode(&mut io::Cursor::new(&header[..]), HeaderFormat::Binary).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        }
    }

    #[test]
    fn rejects_invalid_utf8_name() {
        let mut raw = 2u32.to_be_bytes().to_vec();
        raw.extend_from_slice(&[0xff, 0xfe]);
        raw.extend_from_slice(&0u64.to_be_bytes());
        let err = decode(&mut io::Cursor::new(&raw), HeaderFormat::Binary).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn rejects_path_like_names() {
        for name in ["", ".", "..", "../etc/passwd", "dir/file", "c:\\x", "nul\0byte"] {
            assert!(validate_name(name, HeaderFormat::Binary).is_err(), "{name:?}");
        }
        assert!(validate_name("line\nbreak", HeaderFormat::Text).is_err());
        assert!(validate_name(".hidden", HeaderFormat::Text).is_ok());
    }

    #[test]
    fn decode_rejects_traversal_name() {
        let mut raw = 6u32.to_be_bytes().to_vec();
        raw.extend_from_slice(b"../etc");
        raw.extend_from_slice(&1u64.to_be_bytes());
        let err = decode(&mut io::Cursor::new(&raw), HeaderFormat::Binary).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn encode_refuses_invalid_name() {
        let mut buf = Vec::new();
        let err = encode(&mut buf, &FileHeader::new("a\nb", 1), HeaderFormat::Text).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(buf.is_empty());
    }
}
