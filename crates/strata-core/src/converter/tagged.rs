use std::collections::HashMap;

use super::{SharedConverter, Tagged, TypeTag, ValueConverter};
use crate::error::ConversionError;

/// Converter for a declared type with subtypes.
///
/// Values of the declared type encode as their plain token. Values whose
/// runtime tag differs are written as `token:tag`, so decoding can dispatch to
/// the right variant converter. A declared token that itself ends in
/// `:<registered tag>` is written with an explicit `:declared` suffix, so
/// every encoded value decodes back to its own type.
pub struct TaggedConverter<V> {
    declared: TypeTag,
    variants: HashMap<&'static str, SharedConverter<V>>,
}

impl<V> TaggedConverter<V> {
    pub fn new(declared: TypeTag, converter: SharedConverter<V>) -> Self {
        let mut variants = HashMap::new();
        variants.insert(declared.as_str(), converter);
        Self { declared, variants }
    }

    pub fn with_variant(mut self, tag: TypeTag, converter: SharedConverter<V>) -> Self {
        self.variants.insert(tag.as_str(), converter);
        self
    }

    /// Whether `token` would be read back as carrying a type tag.
    fn looks_tagged(&self, token: &str) -> bool {
        token
            .rsplit_once(':')
            .is_some_and(|(_, tag)| self.variants.contains_key(tag))
    }

    fn declared_converter(&self) -> Result<&SharedConverter<V>, ConversionError> {
        self.variants
            .get(self.declared.as_str())
            .ok_or_else(|| ConversionError::UnknownTypeTag(self.declared.to_string()))
    }
}

impl<V: Tagged> ValueConverter<V> for TaggedConverter<V> {
    fn encode(&self, value: &V) -> Result<String, ConversionError> {
        let tag = value.type_tag();
        let converter = self
            .variants
            .get(tag.as_str())
            .ok_or_else(|| ConversionError::UnknownTypeTag(tag.to_string()))?;
        let token = converter.encode(value)?;
        if tag == self.declared && !self.looks_tagged(&token) {
            Ok(token)
        } else {
            Ok(format!("{token}:{tag}"))
        }
    }

    fn decode(&self, raw: &str) -> Result<V, ConversionError> {
        if let Some((payload, tag)) = raw.rsplit_once(':')
            && let Some(converter) = self.variants.get(tag)
        {
            return converter.decode(payload);
        }
        self.declared_converter()?.decode(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::ListConverter;
    use std::sync::Arc;

    const UNIT: TypeTag = TypeTag::new("unit");
    const HERO: TypeTag = TypeTag::new("hero");

    #[derive(Debug, Clone, PartialEq)]
    enum Unit {
        Soldier(String),
        Hero(String),
    }

    impl Tagged for Unit {
        fn type_tag(&self) -> TypeTag {
            match self {
                Unit::Soldier(_) => UNIT,
                Unit::Hero(_) => HERO,
            }
        }
    }

    struct SoldierConverter;
    struct HeroConverter;

    impl ValueConverter<Unit> for SoldierConverter {
        fn encode(&self, value: &Unit) -> Result<String, ConversionError> {
            match value {
                Unit::Soldier(name) | Unit::Hero(name) => Ok(name.clone()),
            }
        }

        fn decode(&self, raw: &str) -> Result<Unit, ConversionError> {
            Ok(Unit::Soldier(raw.to_string()))
        }
    }

    impl ValueConverter<Unit> for HeroConverter {
        fn encode(&self, value: &Unit) -> Result<String, ConversionError> {
            match value {
                Unit::Soldier(name) | Unit::Hero(name) => Ok(name.clone()),
            }
        }

        fn decode(&self, raw: &str) -> Result<Unit, ConversionError> {
            Ok(Unit::Hero(raw.to_string()))
        }
    }

    fn converter() -> TaggedConverter<Unit> {
        TaggedConverter::new(UNIT, Arc::new(SoldierConverter))
            .with_variant(HERO, Arc::new(HeroConverter))
    }

    #[test]
    fn test_only_subtypes_are_tagged() {
        let conv = converter();
        assert_eq!(conv.encode(&Unit::Soldier("pike".into())).unwrap(), "pike");
        assert_eq!(conv.encode(&Unit::Hero("arthur".into())).unwrap(), "arthur:hero");
    }

    #[test]
    fn test_heterogeneous_list() {
        let list = ListConverter::new(Arc::new(converter()) as SharedConverter<Unit>);
        let units = vec![Unit::Soldier("pike".into()), Unit::Hero("arthur".into())];
        let raw = list.encode(&units).unwrap();
        assert_eq!(raw, r#"["pike","arthur:hero"]"#);
        assert_eq!(list.decode(&raw).unwrap(), units);
    }

    #[test]
    fn test_unknown_suffix_falls_back_to_declared() {
        let conv = converter();
        assert_eq!(
            conv.decode("map:12").unwrap(),
            Unit::Soldier("map:12".into())
        );
    }

    #[test]
    fn test_declared_token_ending_in_a_tag_round_trips() {
        let conv = converter();
        for unit in [
            Unit::Soldier("banner:hero".into()),
            Unit::Soldier("banner:unit".into()),
            Unit::Hero("banner:hero".into()),
        ] {
            let raw = conv.encode(&unit).unwrap();
            assert_eq!(conv.decode(&raw).unwrap(), unit, "raw = {raw}");
        }
        assert_eq!(
            conv.encode(&Unit::Soldier("banner:hero".into())).unwrap(),
            "banner:hero:unit"
        );
    }
}
