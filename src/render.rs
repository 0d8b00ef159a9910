use std::fs;
use std::io::Write;
use std::path::Path;

use handlebars::Handlebars;

use crate::error::{Error, Result};
use crate::model::Update;

const TEMPLATE_NAME: &str = "update";

/// Layout used when no custom template is given
pub const DEFAULT_TEMPLATE: &str = r#"--------------------------------------------------------------------------------
{{title}}

ID: {{id}}
Type: {{type}}
Severity: {{severity}}
Date: {{issued.date}}

Description:
{{description}}

{{#if references}}Issues:{{#each references}}
  * {{type}}: [{{id}}] {{title}}{{/each}}

{{/if}}"#;

/// Formats accepted updates through a Handlebars template
///
/// Templates are compiled once, in strict mode, so a reference to a field
/// an update does not have fails the render instead of printing nothing.
/// Output is plain text: HTML escaping is disabled.
pub struct Renderer {
    registry: Handlebars<'static>,
}

impl Renderer {
    /// Renderer for the built-in layout
    pub fn new() -> Result<Self> {
        Self::with_template(DEFAULT_TEMPLATE)
    }

    /// Compile a template from source
    pub fn with_template(source: &str) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(handlebars::no_escape);
        registry
            .register_template_string(TEMPLATE_NAME, source)
            .map_err(|e| Error::ConfigInvalid(format!("failed parsing template: {e}")))?;
        Ok(Renderer { registry })
    }

    /// Load and compile a template file
    pub fn from_file(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path).map_err(|e| {
            Error::ConfigInvalid(format!(
                "failed reading template file '{}': {e}",
                path.display()
            ))
        })?;
        Self::with_template(&source).map_err(|e| {
            Error::ConfigInvalid(format!("template file '{}': {e}", path.display()))
        })
    }

    /// Render one update and append it to the sink
    ///
    /// The text is fully rendered before anything is written, so a template
    /// error never leaves a partial record in the output.
    pub fn render<W: Write>(&self, update: &Update, sink: &mut W) -> Result<()> {
        let text = self
            .registry
            .render(TEMPLATE_NAME, update)
            .map_err(|source| Error::Render {
                id: update.id.clone(),
                source: Box::new(source),
            })?;
        sink.write_all(text.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Issued, IssuedDate, Package, Reference};

    fn sample() -> Update {
        Update {
            id: "SUSE-2023-2401".into(),
            kind: "security".into(),
            status: "stable".into(),
            title: "Security update for the Linux Kernel".into(),
            severity: "important".into(),
            release: "SUSE Updates".into(),
            issued: Issued {
                date: Some(IssuedDate::parse("1685577600").unwrap()),
            },
            references: vec![
                Reference {
                    href: Some("https://bugzilla.suse.com/1209287".into()),
                    id: "1209287".into(),
                    title: "VUL-0: kernel crash".into(),
                    kind: "bugzilla".into(),
                },
                Reference {
                    href: None,
                    id: "CVE-2023-1077".into(),
                    title: "CVE-2023-1077".into(),
                    kind: "cve".into(),
                },
            ],
            description: "The kernel was updated.".into(),
            packages: vec![Package {
                name: "kernel-default".into(),
                version: "5.14.21".into(),
                release: "150400.24.69.1".into(),
                arch: "x86_64".into(),
                filename: "kernel-default-5.14.21-150400.24.69.1.x86_64.rpm".into(),
            }],
        }
    }

    fn render_to_string(renderer: &Renderer, update: &Update) -> String {
        let mut output = Vec::new();
        renderer.render(update, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_default_layout() {
        let renderer = Renderer::new().unwrap();
        let expected = format!(
            "{}\n\
             Security update for the Linux Kernel\n\
             \n\
             ID: SUSE-2023-2401\n\
             Type: security\n\
             Severity: important\n\
             Date: 2023-06-01 00:00:00 UTC\n\
             \n\
             Description:\n\
             The kernel was updated.\n\
             \n\
             Issues:\n  \
             * bugzilla: [1209287] VUL-0: kernel crash\n  \
             * cve: [CVE-2023-1077] CVE-2023-1077\n\
             \n",
            "-".repeat(80)
        );
        assert_eq!(render_to_string(&renderer, &sample()), expected);
    }

    #[test]
    fn test_default_layout_without_references() {
        let renderer = Renderer::new().unwrap();
        let mut update = sample();
        update.references.clear();

        let result = render_to_string(&renderer, &update);
        assert!(!result.contains("Issues:"));
        assert!(result.ends_with("Description:\nThe kernel was updated.\n\n"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let renderer = Renderer::new().unwrap();
        let update = sample();
        assert_eq!(
            render_to_string(&renderer, &update),
            render_to_string(&renderer, &update)
        );
    }

    #[test]
    fn test_render_appends_to_sink() {
        let renderer = Renderer::with_template("[{{id}}]").unwrap();
        let mut output = b"head ".to_vec();
        renderer.render(&sample(), &mut output).unwrap();
        renderer.render(&sample(), &mut output).unwrap();
        assert_eq!(output, b"head [SUSE-2023-2401][SUSE-2023-2401]");
    }

    #[test]
    fn test_no_html_escaping() {
        let renderer = Renderer::with_template("{{title}}").unwrap();
        let mut update = sample();
        update.title = "a <b> & \"c\"".into();
        assert_eq!(render_to_string(&renderer, &update), "a <b> & \"c\"");
    }

    #[test]
    fn test_custom_template_packages() {
        let renderer = Renderer::with_template(
            "{{id}} {{status}}{{#each packages}} {{name}}-{{version}}-{{release}}.{{arch}}{{/each}}",
        )
        .unwrap();
        assert_eq!(
            render_to_string(&renderer, &sample()),
            "SUSE-2023-2401 stable kernel-default-5.14.21-150400.24.69.1.x86_64"
        );
    }

    #[test]
    fn test_custom_template_href() {
        let renderer =
            Renderer::with_template("{{#each references}}{{#if href}}{{href}}{{/if}};{{/each}}")
                .unwrap();
        assert_eq!(
            render_to_string(&renderer, &sample()),
            "https://bugzilla.suse.com/1209287;;"
        );
    }

    #[test]
    fn test_custom_template_relative_href() {
        let mut update = sample();
        update.references[1].href = Some("/security/cve/CVE-2023-1077/".into());
        let renderer =
            Renderer::with_template("{{#each references}}[{{href}}]{{/each}}").unwrap();
        assert_eq!(
            render_to_string(&renderer, &update),
            "[https://bugzilla.suse.com/1209287][/security/cve/CVE-2023-1077/]"
        );
    }

    #[test]
    fn test_undefined_field_fails() {
        let renderer = Renderer::with_template("{{cvss_score}}").unwrap();
        let mut output = Vec::new();
        let err = renderer.render(&sample(), &mut output).unwrap_err();
        assert!(matches!(err, Error::Render { ref id, .. } if id == "SUSE-2023-2401"));
        assert!(output.is_empty());
    }

    #[test]
    fn test_invalid_template_syntax() {
        assert!(matches!(
            Renderer::with_template("{{#if title}}unterminated"),
            Err(Error::ConfigInvalid(_))
        ));
    }

    #[test]
    fn test_template_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{{{id}}}}: {{{{severity}}}}").unwrap();
        let renderer = Renderer::from_file(file.path()).unwrap();
        assert_eq!(
            render_to_string(&renderer, &sample()),
            "SUSE-2023-2401: important\n"
        );
    }

    #[test]
    fn test_missing_template_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = Renderer::from_file(&dir.path().join("missing.hbs"));
        assert!(matches!(result, Err(Error::ConfigInvalid(_))));
    }
}
