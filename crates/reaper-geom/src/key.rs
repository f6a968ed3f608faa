use std::fmt;

use crate::Coordinate;

const SEP: char = ':';

/// Canonical string form of a [`Coordinate`] used as a key in persisted data.
///
/// Layout is `<world>:<x>:<y>:<z>`. World bytes outside `[A-Za-z0-9_-]` are
/// written as `%XX` with uppercase hex, so the key never contains the separator
/// or a `.` and can sit under a dotted document path. Only the canonical
/// spelling decodes, which keeps encode/decode a bijection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationKey(String);

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyError {
    FieldCount(usize),
    BadEscape(String),
    NotUtf8,
    BadComponent { axis: char, value: String },
    NonCanonical(String),
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::FieldCount(n) => write!(f, "expected 4 fields, found {}", n),
            KeyError::BadEscape(s) => write!(f, "bad escape sequence in world name: {}", s),
            KeyError::NotUtf8 => write!(f, "world name is not valid UTF-8"),
            KeyError::BadComponent { axis, value } => {
                write!(f, "bad {} component: {:?}", axis, value)
            }
            KeyError::NonCanonical(s) => write!(f, "non-canonical key: {}", s),
        }
    }
}

impl std::error::Error for KeyError {}

#[inline]
fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'-'
}

fn escape_world(world: &str, out: &mut String) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    for &b in world.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
}

fn unescape_world(s: &str) -> Result<String, KeyError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = s
                .get(i + 1..i + 3)
                .ok_or_else(|| KeyError::BadEscape(s[i..].to_string()))?;
            let v = u8::from_str_radix(hex, 16).map_err(|_| KeyError::BadEscape(hex.to_string()))?;
            out.push(v);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| KeyError::NotUtf8)
}

fn parse_axis(axis: char, value: &str) -> Result<i32, KeyError> {
    value.parse::<i32>().map_err(|_| KeyError::BadComponent {
        axis,
        value: value.to_string(),
    })
}

impl LocationKey {
    pub fn encode(c: &Coordinate) -> Self {
        let mut s = String::with_capacity(c.world.len() + 24);
        escape_world(&c.world, &mut s);
        use std::fmt::Write;
        // Writing into a String cannot fail.
        let _ = write!(s, "{SEP}{}{SEP}{}{SEP}{}", c.x, c.y, c.z);
        LocationKey(s)
    }

    pub fn decode(&self) -> Result<Coordinate, KeyError> {
        Self::parse(&self.0)
    }

    /// Decodes a raw key string as read back from storage.
    pub fn parse(raw: &str) -> Result<Coordinate, KeyError> {
        let parts: Vec<&str> = raw.split(SEP).collect();
        let [world, x, y, z] = parts.as_slice() else {
            return Err(KeyError::FieldCount(parts.len()));
        };
        let coord = Coordinate::new(
            unescape_world(world)?,
            parse_axis('x', x)?,
            parse_axis('y', y)?,
            parse_axis('z', z)?,
        );
        if LocationKey::encode(&coord).0 != raw {
            return Err(KeyError::NonCanonical(raw.to_string()));
        }
        Ok(coord)
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LocationKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
