// src/common/i18n.rs

use std::collections::HashMap;

const DEFAULT_LANG: &str = "en";

// Catálogos embutidos no binário: um objeto JSON por idioma.
const CATALOGS: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.json")),
    ("es", include_str!("../../locales/es.json")),
];

/// Mensagens para o usuário final, indexadas por idioma e código estável.
#[derive(Debug, Clone, Default)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn load() -> anyhow::Result<Self> {
        let mut catalogs = HashMap::new();
        for (lang, raw) in CATALOGS {
            let messages: HashMap<String, String> = serde_json::from_str(raw)
                .map_err(|e| anyhow::anyhow!("catálogo inválido '{}': {}", lang, e))?;
            catalogs.insert(lang.to_string(), messages);
        }
        tracing::info!("🌐 {} catálogos de mensagens carregados", catalogs.len());
        Ok(Self { catalogs })
    }

    /// Procura o código no idioma pedido, depois em inglês, e por fim devolve
    /// o próprio código. Placeholders `{nome}` são substituídos por `args`.
    pub fn translate(&self, lang: &str, code: &str, args: &[(&str, &str)]) -> String {
        let template = self
            .catalogs
            .get(lang)
            .and_then(|c| c.get(code))
            .or_else(|| self.catalogs.get(DEFAULT_LANG).and_then(|c| c.get(code)))
            .cloned()
            .unwrap_or_else(|| code.to_string());

        args.iter().fold(template, |acc, (key, value)| {
            acc.replace(&format!("{{{}}}", key), value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_english_for_unknown_language() {
        let store = I18nStore::load().unwrap();
        assert_eq!(
            store.translate("de", "already_paid", &[]),
            "This invoice has already been paid."
        );
    }

    #[test]
    fn substitutes_placeholders() {
        let store = I18nStore::load().unwrap();
        let msg = store.translate("en", "invalid_transition", &[("from", "picked"), ("to", "delivered")]);
        assert_eq!(msg, "A load cannot move from picked to delivered.");
    }

    #[test]
    fn spanish_catalog_is_used_when_requested() {
        let store = I18nStore::load().unwrap();
        assert_eq!(store.translate("es", "already_paid", &[]), "Esta factura ya fue pagada.");
    }

    #[test]
    fn unknown_code_is_returned_verbatim() {
        let store = I18nStore::load().unwrap();
        assert_eq!(store.translate("en", "no_such_code", &[]), "no_such_code");
    }
}
