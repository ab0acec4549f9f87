//! Starter files written by `triage init`.
//!
//! The templates are kept as valid TOML so tests can parse them, then every setting is
//! commented out on the way to disk: a fresh file documents the options without
//! changing any default.

/// Which starter file to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// A project file with backend, refresh, table and search settings.
    Local,
    /// The per-user file in the home directory.
    Global,
}

impl Template {
    /// Raw template text.
    fn source(self) -> &'static str {
        match self {
            Self::Local => include_str!("../templates/config.toml"),
            Self::Global => include_str!("../templates/config-global.toml"),
        }
    }

    /// The template with every setting commented out.
    pub fn render(self) -> String {
        self.source()
            .lines()
            .map(|line| {
                if line.is_empty() || line.starts_with('#') {
                    format!("{line}\n")
                } else {
                    format!("# {line}\n")
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_config;

    #[test]
    fn raw_templates_are_valid_toml() {
        for template in [Template::Local, Template::Global] {
            let result = parse_config(template.source());
            assert!(result.is_ok(), "{template:?} failed to parse: {result:?}");
        }
    }

    #[test]
    fn rendered_template_sets_nothing() {
        let config = parse_config(&Template::Local.render()).unwrap();
        assert!(config.backend.is_none());
        assert!(config.table.is_none());
        assert!(config.refresh.is_none());
    }

    #[test]
    fn rendering_comments_out_settings_only() {
        let rendered = Template::Local.render();
        for line in rendered.lines() {
            assert!(line.is_empty() || line.starts_with('#'), "live line: {line}");
        }
        assert!(rendered.contains("# [backend]\n"));
        assert!(rendered.contains("\n\n"));
    }
}
