//! Read-only catalog of services and parts used to fill line items

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::error::Result;
use crate::models::ItemKind;

/// A service or part that can be billed on an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,

    #[serde(rename = "nome")]
    pub name: String,

    #[serde(rename = "codigo", default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(rename = "tipo")]
    pub kind: ItemKind,
}

impl CatalogEntry {
    pub fn new(id: &str, name: &str, kind: ItemKind) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            code: None,
            kind,
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }
}

/// Lowercase, strip accents, then drop everything except ASCII letters,
/// digits, `_` and whitespace. "Óleo (5W30)" becomes "oleo 5w30".
pub fn normalize_search_term(term: &str) -> String {
    term.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || c.is_whitespace())
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Parse a JSON array of `{id, nome, codigo?, tipo}` records
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn entries_of(&self, kind: ItemKind) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter().filter(move |entry| entry.kind == kind)
    }

    /// The entry of `kind` whose normalized name equals the normalized
    /// selection. Partial names never match.
    pub fn find_exact(&self, kind: ItemKind, selection: &str) -> Option<&CatalogEntry> {
        let wanted = normalize_search_term(selection);
        if wanted.is_empty() {
            return None;
        }
        self.entries_of(kind)
            .find(|entry| normalize_search_term(&entry.name) == wanted)
    }

    /// The entry of `kind` with exactly this id
    pub fn find_by_id(&self, kind: ItemKind, id: &str) -> Option<&CatalogEntry> {
        let id = id.trim();
        self.entries_of(kind).find(|entry| entry.id == id)
    }

    /// Resolve a picker selection: an exact id of `kind` first, then a
    /// normalized name match.
    pub fn resolve(&self, kind: ItemKind, selection: &str) -> Option<&CatalogEntry> {
        self.find_by_id(kind, selection)
            .or_else(|| self.find_exact(kind, selection))
    }

    /// Entries of `kind` whose name or id contains the term. An empty term
    /// lists them all.
    pub fn search(&self, kind: ItemKind, term: &str) -> Vec<&CatalogEntry> {
        let wanted = normalize_search_term(term);
        self.entries_of(kind)
            .filter(|entry| {
                wanted.is_empty()
                    || normalize_search_term(&entry.name).contains(&wanted)
                    || normalize_search_term(&entry.id).contains(&wanted)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            CatalogEntry::new("s1", "Troca de Óleo e Filtro", ItemKind::Service).with_code("SERV-002"),
            CatalogEntry::new("s3", "Diagnóstico Eletrônico", ItemKind::Service),
            CatalogEntry::new("p1", "Filtro de Óleo", ItemKind::Part),
            CatalogEntry::new("p2", "Pastilha de Freio (Jogo)", ItemKind::Part),
        ])
    }

    #[test]
    fn normalization_strips_accents_and_punctuation() {
        assert_eq!(normalize_search_term("Diagnóstico Eletrônico"), "diagnostico eletronico");
        assert_eq!(normalize_search_term("Pastilha de Freio (Jogo)"), "pastilha de freio jogo");
        assert_eq!(normalize_search_term("!!!"), "");
    }

    #[test]
    fn find_exact_ignores_accents_but_not_partial_names() {
        let catalog = catalog();
        assert_eq!(catalog.find_exact(ItemKind::Part, "filtro de oleo").unwrap().id, "p1");
        assert!(catalog.find_exact(ItemKind::Part, "filtro").is_none());
        assert!(catalog.find_exact(ItemKind::Service, "Filtro de Óleo").is_none());
        assert!(catalog.find_exact(ItemKind::Part, "").is_none());
    }

    #[test]
    fn resolve_prefers_id_then_name() {
        let catalog = catalog();
        assert_eq!(catalog.resolve(ItemKind::Part, "p2").unwrap().name, "Pastilha de Freio (Jogo)");
        assert_eq!(catalog.resolve(ItemKind::Part, "FILTRO DE OLEO").unwrap().id, "p1");
        assert!(catalog.resolve(ItemKind::Service, "p2").is_none());
        assert!(catalog.find_by_id(ItemKind::Part, "P2").is_none());
    }

    #[test]
    fn search_matches_name_or_id() {
        let catalog = catalog();
        let found: Vec<_> = catalog.search(ItemKind::Service, "oleo").into_iter().map(|e| e.id.as_str()).collect();
        assert_eq!(found, vec!["s1"]);
        assert_eq!(catalog.search(ItemKind::Part, "p2").len(), 1);
        assert_eq!(catalog.search(ItemKind::Part, "").len(), 2);
    }

    #[test]
    fn parses_catalog_json() {
        let catalog = Catalog::from_json(
            r#"[{"id":"p9","nome":"Vela","codigo":"VL-1","tipo":"peca","unidade_medida":"un"}]"#,
        )
        .unwrap();
        assert_eq!(catalog.entries()[0].code.as_deref(), Some("VL-1"));
        assert_eq!(catalog.entries()[0].kind, ItemKind::Part);
    }
}
