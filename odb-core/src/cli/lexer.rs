//! Lexical classes for the command language: `<reg>`, `<val>`, `<symbol>`,
//! and the `<type>` suffix controlling how raw bytes print.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl ValueType {
    pub fn parse(tok: &str) -> Option<Self> {
        Some(match tok {
            "u8" => ValueType::U8,
            "u16" => ValueType::U16,
            "u32" => ValueType::U32,
            "u64" => ValueType::U64,
            "i8" => ValueType::I8,
            "i16" => ValueType::I16,
            "i32" => ValueType::I32,
            "i64" => ValueType::I64,
            "f32" => ValueType::F32,
            "f64" => ValueType::F64,
            _ => return None,
        })
    }

    pub fn byte_size(self) -> usize {
        match self {
            ValueType::U8 | ValueType::I8 => 1,
            ValueType::U16 | ValueType::I16 => 2,
            ValueType::U32 | ValueType::I32 | ValueType::F32 => 4,
            ValueType::U64 | ValueType::I64 | ValueType::F64 => 8,
        }
    }

    /// Renders little-endian bytes of at least `byte_size()` length.
    pub fn format(self, bytes: &[u8]) -> String {
        match self {
            ValueType::U8 => format!("{}", bytes[0]),
            ValueType::U16 => format!("{}", u16::from_le_bytes(bytes[..2].try_into().unwrap())),
            ValueType::U32 => format!("{}", u32::from_le_bytes(bytes[..4].try_into().unwrap())),
            ValueType::U64 => format!("{}", u64::from_le_bytes(bytes[..8].try_into().unwrap())),
            ValueType::I8 => format!("{}", bytes[0] as i8),
            ValueType::I16 => format!("{}", i16::from_le_bytes(bytes[..2].try_into().unwrap())),
            ValueType::I32 => format!("{}", i32::from_le_bytes(bytes[..4].try_into().unwrap())),
            ValueType::I64 => format!("{}", i64::from_le_bytes(bytes[..8].try_into().unwrap())),
            ValueType::F32 => format!("{}", f32::from_le_bytes(bytes[..4].try_into().unwrap())),
            ValueType::F64 => format!("{}", f64::from_le_bytes(bytes[..8].try_into().unwrap())),
        }
    }

    /// Parses a literal of this type into its little-endian byte encoding.
    pub fn encode(self, tok: &str) -> Option<Vec<u8>> {
        Some(match self {
            ValueType::U8 => (parse_int(tok)? as u8).to_le_bytes().to_vec(),
            ValueType::U16 => (parse_int(tok)? as u16).to_le_bytes().to_vec(),
            ValueType::U32 => (parse_int(tok)? as u32).to_le_bytes().to_vec(),
            ValueType::U64 => (parse_int(tok)? as u64).to_le_bytes().to_vec(),
            ValueType::I8 => (parse_int(tok)? as i8).to_le_bytes().to_vec(),
            ValueType::I16 => (parse_int(tok)? as i16).to_le_bytes().to_vec(),
            ValueType::I32 => (parse_int(tok)? as i32).to_le_bytes().to_vec(),
            ValueType::I64 => (parse_int(tok)?).to_le_bytes().to_vec(),
            ValueType::F32 => (tok.parse::<f32>().ok()?).to_le_bytes().to_vec(),
            ValueType::F64 => (tok.parse::<f64>().ok()?).to_le_bytes().to_vec(),
        })
    }
}

/// Accepts decimal, `0x`/`0`-prefixed hex, and `0b`-prefixed binary, with an
/// optional leading `-`.
fn parse_int(tok: &str) -> Option<i64> {
    let (neg, tok) = match tok.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, tok),
    };
    let v: i64 = if let Some(hex) = tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(bin) = tok.strip_prefix("0b").or_else(|| tok.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2).ok()?
    } else if tok.len() > 1 && tok.starts_with('0') {
        i64::from_str_radix(&tok[1..], 8).ok()?
    } else {
        tok.parse().ok()?
    };
    Some(if neg { -v } else { v })
}

/// A parsed `<reg>` reference: either a numeric id or a name to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegRef {
    Id(u32),
    Name(String),
}

impl RegRef {
    pub fn parse(tok: &str) -> Option<Self> {
        let rest = tok.strip_prefix('%')?;
        Some(match rest.parse::<u32>() {
            Ok(id) => RegRef::Id(id),
            Err(_) => RegRef::Name(rest.to_string()),
        })
    }
}

/// A parsed `<symbol>` reference: either a numeric id or a name to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymRef {
    Id(u32),
    Name(String),
}

impl SymRef {
    pub fn parse(tok: &str) -> Option<Self> {
        let rest = tok.strip_prefix('@')?;
        Some(match rest.parse::<u32>() {
            Ok(id) => SymRef::Id(id),
            Err(_) => SymRef::Name(rest.to_string()),
        })
    }
}

/// A parsed `<val>`: a type-directed integer/float literal, or a symbol
/// reference whose resolved address becomes the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValRef {
    Literal(String),
    Symbol(SymRef),
}

impl ValRef {
    pub fn parse(tok: &str) -> Self {
        match SymRef::parse(tok) {
            Some(sym) => ValRef::Symbol(sym),
            None => ValRef::Literal(tok.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bases() {
        assert_eq!(parse_int("10"), Some(10));
        assert_eq!(parse_int("0x10"), Some(16));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("-0x10"), Some(-16));
    }

    #[test]
    fn reg_ref_distinguishes_id_from_name() {
        assert_eq!(RegRef::parse("%3"), Some(RegRef::Id(3)));
        assert_eq!(RegRef::parse("%pc"), Some(RegRef::Name("pc".into())));
        assert_eq!(RegRef::parse("r3"), None);
    }

    #[test]
    fn val_ref_recognizes_symbol_position() {
        assert_eq!(ValRef::parse("@main"), ValRef::Symbol(SymRef::Name("main".into())));
        assert_eq!(ValRef::parse("42"), ValRef::Literal("42".into()));
    }
}
