//! Symptom checklist catalog and symptom keys.
//!
//! The catalog is static configuration data: nine Y-BOCS checklist groups, each
//! closing with an "other" item that lets the clinician add free text.
//!
//! A symptom key identifies one checklist entry:
//! - `<group>:<item>` for a catalog item
//! - `<group>:INNE:<free text>` for a custom entry within a group

use crate::constants::CUSTOM_SYMPTOM_MARKER;
use crate::error::{YbocsError, YbocsResult};
use serde::Serialize;

/// Label of the "other" item that closes every group.
pub const OTHER_ITEM: &str = "Inne (dopisz w polu poniżej)";

/// A checklist group and its items.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SymptomGroup {
    pub name: &'static str,
    pub items: &'static [&'static str],
}

pub static SYMPTOM_GROUPS: &[SymptomGroup] = &[
    SymptomGroup {
        name: "Obsesje agresywne",
        items: &[
            "Lęk, że może skrzywdzić siebie",
            "Lęk, że może skrzywdzić innych",
            "Obrazy przemocy lub okrucieństwa",
            "Lęk przed wypowiedzeniem obscenicznych słów lub obelg",
            "Lęk przed zrobieniem czegoś kompromitującego",
            "Lęk, że zrealizuje niechciane impulsy (np. dźgnięcie przyjaciela)",
            "Lęk, że coś ukradnie",
            "Lęk, że skrzywdzi innych przez nieuwagę (np. potrąci kogoś i odjedzie)",
            "Lęk, że będzie odpowiedzialny za nieszczęście (np. pożar, włamanie)",
            OTHER_ITEM,
        ],
    },
    SymptomGroup {
        name: "Obsesje kontaminacyjne (zanieczyszczenia)",
        items: &[
            "Obrzydzenie dot. wydzielin ciała (mocz, kał, ślina)",
            "Lęk przed brudem lub zarazkami",
            "Nadmierny lęk przed zanieczyszczeniami środowiskowymi",
            "Nadmierny lęk przed środkami domowymi (detergenty, rozpuszczalniki)",
            "Nadmierny lęk przed zwierzętami (np. owady)",
            "Niepokój przy kontakcie z lepkimi substancjami",
            "Lęk, że zachoruje przez kontakt z zanieczyszczeniem",
            "Lęk, że zarazi innych przez rozprzestrzenienie zanieczyszczenia",
            "Brak lęku dot. konsekwencji poza samym uczuciem nieczystości",
            OTHER_ITEM,
        ],
    },
    SymptomGroup {
        name: "Obsesje seksualne",
        items: &[
            "Zakazane/dewiacyjne treści seksualne (myśli/obrazy/impulsy)",
            "Treści dotyczące dzieci lub kazirodztwa",
            "Treści dotyczące homoseksualizmu",
            "Myśli o zachowaniach seksualnych wobec innych",
            OTHER_ITEM,
        ],
    },
    SymptomGroup {
        name: "Obsesje somatyczne i gromadzenie",
        items: &[
            "Lęk przed chorobą",
            "Nadmierna troska o wygląd/część ciała (dysmorfofobia)",
            "Potrzeba gromadzenia/oszczędzania",
            OTHER_ITEM,
        ],
    },
    SymptomGroup {
        name: "Kompulsje czyszczenia/mycia",
        items: &[
            "Nadmierne/zrytualizowane mycie rąk",
            "Nadmierne/zrytualizowane kąpiele, higiena, toaleta",
            "Czyszczenie przedmiotów/innych rzeczy",
            "Unikanie/środki by nie mieć kontaktu z zanieczyszczeniami",
            OTHER_ITEM,
        ],
    },
    SymptomGroup {
        name: "Kompulsje sprawdzania",
        items: &[
            "Sprawdzanie zamków, kuchenki, urządzeń",
            "Czy nie skrzywdził/nie skrzywdzi innych",
            "Czy nie skrzywdził/nie skrzywdzi siebie",
            "Czy nie wydarzyło się/nie wydarzy się coś strasznego",
            "Czy nie popełnił błędu",
            "Sprawdzanie związane z obsesjami somatycznymi",
            OTHER_ITEM,
        ],
    },
    SymptomGroup {
        name: "Rytyny powtarzania/liczenia/porządkowania",
        items: &[
            "Ponowne czytanie lub przepisywanie",
            "Powtarzanie czynności rutynowych",
            "Liczenie",
            "Porządkowanie/układanie",
            OTHER_ITEM,
        ],
    },
    SymptomGroup {
        name: "Obsesje religijne/symetria/inne",
        items: &[
            "Lęk przed świętokradztwem i bluźnierstwem",
            "Nadmierny niepokój moralny",
            "Potrzeba symetrii/dokładności z myśleniem magicznym",
            "Potrzeba symetrii/dokładności bez myślenia magicznego",
            "Potrzeba wiedzieć/pamiętać, lęk przed zgubieniem rzeczy",
            "Natrętne obrazy, dźwięki, słowa, melodie",
            "Drażliwość na dźwięki, liczby, kolory, przesądy",
            OTHER_ITEM,
        ],
    },
    SymptomGroup {
        name: "Kompulsje różne",
        items: &[
            "Rytuały umysłowe",
            "Nadmierne sporządzanie list",
            "Potrzeba mówienia/pytania/wyznawania",
            "Potrzeba dotykania/stukania/pocierania",
            "Rytuały mrugania/wpatrywania",
            "Środki zapobiegawcze (krzywda sobie/innym/katastrofa – nie sprawdzanie)",
            "Zrytualizowane zachowania przy jedzeniu",
            "Zachowania przesądne",
            "Trichotillomania",
            "Inne zachowania samouszkadzające",
            OTHER_ITEM,
        ],
    },
];

/// Look up a group by its exact name.
pub fn find_group(name: &str) -> Option<&'static SymptomGroup> {
    SYMPTOM_GROUPS.iter().find(|g| g.name == name)
}

/// The parsed shape of a [`SymptomKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymptomEntry<'a> {
    Catalog { group: &'a str, item: &'a str },
    Custom { group: &'a str, text: &'a str },
}

/// A validated checklist key.
///
/// Ordering and equality follow the raw key string, so a set of keys sorts the
/// same way the stored JSON array does.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymptomKey(String);

impl SymptomKey {
    /// Parses a raw key against the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`YbocsError::InvalidSymptomKey`] if the group is unknown, the item
    /// is not in that group, or a custom entry has no text.
    pub fn parse(raw: &str) -> YbocsResult<Self> {
        let invalid = |reason: &str| YbocsError::InvalidSymptomKey {
            key: raw.to_string(),
            reason: reason.to_string(),
        };

        let (group_name, rest) = raw
            .split_once(':')
            .ok_or_else(|| invalid("missing ':' between group and item"))?;

        let group = find_group(group_name).ok_or_else(|| invalid("unknown symptom group"))?;

        match custom_text(rest) {
            Some(text) => {
                if text.trim().is_empty() {
                    return Err(invalid("custom symptom text is empty"));
                }
                if text != text.trim() {
                    return Err(invalid("custom symptom text has surrounding whitespace"));
                }
            }
            None => {
                if !group.items.contains(&rest) {
                    return Err(invalid("unknown item for this group"));
                }
            }
        }

        Ok(Self(raw.to_string()))
    }

    /// Builds a catalog key, validating the pair.
    pub fn catalog(group: &str, item: &str) -> YbocsResult<Self> {
        Self::parse(&format!("{group}:{item}"))
    }

    /// Builds a custom key; the text is trimmed first.
    pub fn custom(group: &str, text: &str) -> YbocsResult<Self> {
        Self::parse(&format!("{group}:{CUSTOM_SYMPTOM_MARKER}:{}", text.trim()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn entry(&self) -> SymptomEntry<'_> {
        // Parsed keys always contain the separator.
        let (group, rest) = self.0.split_once(':').unwrap_or((self.0.as_str(), ""));
        match custom_text(rest) {
            Some(text) => SymptomEntry::Custom { group, text },
            None => SymptomEntry::Catalog { group, item: rest },
        }
    }

    pub fn group(&self) -> &str {
        match self.entry() {
            SymptomEntry::Catalog { group, .. } | SymptomEntry::Custom { group, .. } => group,
        }
    }

    /// Display label: `"<group> – <item or custom text>"`.
    pub fn label(&self) -> String {
        match self.entry() {
            SymptomEntry::Catalog { group, item } => format!("{group} – {item}"),
            SymptomEntry::Custom { group, text } => format!("{group} – {text}"),
        }
    }
}

fn custom_text(rest: &str) -> Option<&str> {
    rest.strip_prefix(CUSTOM_SYMPTOM_MARKER)
        .and_then(|r| r.strip_prefix(':'))
}

impl std::fmt::Display for SymptomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SymptomKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for SymptomKey {
    type Err = YbocsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SymptomKey::parse(s)
    }
}

impl Serialize for SymptomKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for SymptomKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SymptomKey::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_group_ends_with_other_item() {
        assert_eq!(SYMPTOM_GROUPS.len(), 9);
        for group in SYMPTOM_GROUPS {
            assert_eq!(group.items.last(), Some(&OTHER_ITEM), "{}", group.name);
            assert!(!group.name.contains(':'));
            assert!(group.items.iter().all(|i| !i.contains(':')));
        }
    }

    #[test]
    fn test_parse_catalog_key() {
        let key = SymptomKey::parse("Kompulsje sprawdzania:Liczenie");
        assert!(key.is_err(), "Liczenie belongs to another group");

        let key = SymptomKey::parse("Rytyny powtarzania/liczenia/porządkowania:Liczenie").unwrap();
        assert_eq!(
            key.entry(),
            SymptomEntry::Catalog {
                group: "Rytyny powtarzania/liczenia/porządkowania",
                item: "Liczenie"
            }
        );
        assert_eq!(key.label(), "Rytyny powtarzania/liczenia/porządkowania – Liczenie");
    }

    #[test]
    fn test_parse_custom_key() {
        let key = SymptomKey::parse("Kompulsje różne:INNE:liczenie kroków").unwrap();
        assert_eq!(
            key.entry(),
            SymptomEntry::Custom {
                group: "Kompulsje różne",
                text: "liczenie kroków"
            }
        );
        assert_eq!(key.label(), "Kompulsje różne – liczenie kroków");
        assert_eq!(key.group(), "Kompulsje różne");
    }

    #[test]
    fn test_custom_text_may_contain_colons() {
        let key = SymptomKey::custom("Obsesje seksualne", " myśli: natrętne ").unwrap();
        assert_eq!(key.as_str(), "Obsesje seksualne:INNE:myśli: natrętne");
    }

    #[test]
    fn test_parse_rejects_malformed_keys() {
        for raw in [
            "",
            "no separator",
            "Nieznana grupa:Liczenie",
            "Kompulsje różne:Nieznany objaw",
            "Kompulsje różne:INNE:",
            "Kompulsje różne:INNE:   ",
        ] {
            assert!(
                matches!(SymptomKey::parse(raw), Err(YbocsError::InvalidSymptomKey { .. })),
                "{raw}"
            );
        }
    }

    #[test]
    fn test_other_item_is_a_valid_catalog_key() {
        assert!(SymptomKey::catalog("Obsesje agresywne", OTHER_ITEM).is_ok());
    }

    #[test]
    fn test_keys_sort_by_raw_string() {
        let mut keys = vec![
            SymptomKey::catalog("Obsesje seksualne", "Treści dotyczące homoseksualizmu").unwrap(),
            SymptomKey::catalog("Kompulsje różne", "Trichotillomania").unwrap(),
        ];
        keys.sort();
        assert!(keys[0].as_str().starts_with("Kompulsje"));
    }
}
