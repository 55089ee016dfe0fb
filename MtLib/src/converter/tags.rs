//! `@TAG(value)` overrides embedded in primitive names

/// Primitive record overrides parsed from a name such as `body@LOD(1)@RM(3)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrimitiveTags {
    /// `TYP`
    pub flags: Option<u16>,
    /// `FLG`, first comma separated value
    pub vertex_flags: Option<u16>,
    /// `LOD`
    pub lod_index: Option<u8>,
    /// `RM`
    pub render_flags: Option<u8>,
    /// `JNT`
    pub group_id: Option<u32>,
    /// `ID`
    pub id: Option<u16>,
}

impl PrimitiveTags {
    /// Parse all recognized tags. Unknown tags and unparsable values are skipped.
    pub fn parse(name: &str) -> Self {
        let mut tags = Self::default();
        for (tag, value) in iter_tags(name) {
            match tag {
                "TYP" => tags.flags = parse_int(value),
                "FLG" => tags.vertex_flags = value.split(',').next().and_then(parse_int),
                "LOD" => tags.lod_index = parse_int(value),
                "RM" => tags.render_flags = parse_int(value),
                "JNT" => tags.group_id = parse_int(value),
                "ID" => tags.id = parse_int(value),
                other => tracing::debug!("Ignoring unknown primitive tag {other} in '{name}'"),
            }
        }
        tags
    }
}

/// Iterate `(tag, value)` pairs of `@TAG(value)` groups.
pub fn iter_tags(name: &str) -> impl Iterator<Item = (&str, &str)> {
    name.split('@').skip(1).filter_map(|part| {
        let (tag, rest) = part.split_once('(')?;
        let (value, _) = rest.split_once(')')?;
        (!tag.is_empty() && !value.is_empty()).then_some((tag, value))
    })
}

/// Decimal, or hexadecimal with a `0x` prefix.
fn parse_int<T: TryFrom<u64>>(value: &str) -> Option<T> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok()?,
        None => value.parse::<u64>().ok()?,
    };
    T::try_from(parsed).ok()
}
