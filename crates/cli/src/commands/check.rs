//! `doppel check`: diagnose config, persona files, corpus, credentials, and
//! whether the completion service answers.

use std::path::Path;

use doppel_config::{AppConfig, PersonaDirective, Settings};
use doppel_core::Provider;
use doppel_corpus::Corpus;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Doppel check");
    println!("============\n");

    let path = super::config_path(config_path);
    if path.exists() {
        println!("  ✅ Config file found: {}", path.display());
    } else {
        println!("  ⚠️  No config file at {}, using defaults. Run `doppel init`", path.display());
    }

    let config = match super::load_config(config_path) {
        Ok(config) => {
            println!("  ✅ Config valid");
            config
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            println!("\n  1 issue found. Fix the config before continuing.");
            return Ok(());
        }
    };

    let mut report = diagnose(&config);
    if config.has_api_key() {
        match doppel_providers::build_from_config(&config).map(|router| router.default()) {
            Ok(Some(provider)) => check_provider(&mut report, provider.as_ref()).await,
            Ok(None) => report.fail(format!("Provider '{}' is not configured", config.provider)),
            Err(e) => report.fail(format!("Provider setup failed: {e}")),
        }
    }
    for line in &report.lines {
        println!("  {line}");
    }

    println!();
    if report.issues == 0 {
        println!("  All checks passed!");
    } else {
        println!("  {} issue(s) found. See above for details.", report.issues);
    }

    Ok(())
}

struct Report {
    lines: Vec<String>,
    issues: usize,
}

impl Report {
    fn ok(&mut self, line: impl AsRef<str>) {
        self.lines.push(format!("✅ {}", line.as_ref()));
    }

    fn warn(&mut self, line: impl AsRef<str>) {
        self.lines.push(format!("⚠️  {}", line.as_ref()));
        self.issues += 1;
    }

    fn fail(&mut self, line: impl AsRef<str>) {
        self.lines.push(format!("❌ {}", line.as_ref()));
        self.issues += 1;
    }
}

fn diagnose(config: &AppConfig) -> Report {
    let mut report = Report {
        lines: Vec::new(),
        issues: 0,
    };
    let persona = &config.persona;

    if config.has_api_key() {
        report.ok(format!("API key configured for '{}'", config.provider));
    } else {
        report.warn(format!(
            "No API key for '{}'. Set DOPPEL_API_KEY or api_key in config.toml",
            config.provider
        ));
    }

    let settings = match Settings::load_from(&persona.settings_path()) {
        Ok(settings) => {
            report.ok(format!(
                "Settings: temperature {}, history {}, top-k {}",
                settings.temperature, settings.history_limit, settings.rag_top_k
            ));
            settings
        }
        Err(e) => {
            report.fail(format!("Settings invalid: {e}"));
            Settings::default()
        }
    };

    match PersonaDirective::load_from(&persona.system_prompt_path()) {
        Ok(directive) if directive.is_fallback() => {
            report.warn("No system prompt file, using the built-in directive")
        }
        Ok(_) => report.ok("System prompt loaded"),
        Err(e) => report.fail(format!("System prompt unreadable: {e}")),
    }

    match Corpus::load(&persona.data_dir, settings.rag_min_similarity) {
        Ok(corpus) => {
            report.ok(format!(
                "Corpus: {} documents, {} chunks, {} terms",
                corpus.documents.len(),
                corpus.index.len(),
                corpus.index.vocabulary_size()
            ));
            if corpus.roster.is_empty() {
                report.warn("Roster is empty, identity recognition is off");
            } else {
                report.ok(format!("Roster: {} people", corpus.roster.len()));
            }
        }
        Err(e) => report.fail(format!("Corpus failed to load: {e}")),
    }

    match config.store.backend.as_str() {
        "sqlite" => report.ok(format!("Store: sqlite at {}", config.store.path.display())),
        other => report.ok(format!("Store: {other}")),
    }

    report
}

/// One round trip to the service's model listing.
async fn check_provider(report: &mut Report, provider: &dyn Provider) {
    match provider.health_check().await {
        Ok(true) => report.ok(format!("Provider '{}' reachable", provider.name())),
        Ok(false) => report.fail(format!(
            "Provider '{}' refused the request. Check the API key",
            provider.name()
        )),
        Err(e) => report.fail(format!("Provider '{}' unreachable: {e}", provider.name())),
    }
}
