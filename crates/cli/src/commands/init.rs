//! `doppel init`: first-time setup.

use std::path::Path;

use doppel_config::{AppConfig, PersonaDirective, Settings};

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let path = super::config_path(config_path);

    println!("Doppel setup");
    println!("============\n");

    let config = if path.exists() {
        println!("  Config already exists at: {}", path.display());
        println!("  Edit it manually or delete it and re-run init.\n");
        super::load_config(config_path)?
    } else {
        write_default_config(&path)?;
        println!("✅ Created config.toml at: {}", path.display());
        AppConfig::default()
    };

    for created in write_persona_files(&config)? {
        println!("✅ Created {}", created.display());
    }

    println!("\nNext steps:");
    println!("   1. Add your API key to {} or set DOPPEL_API_KEY", path.display());
    println!("   2. Put .txt/.md documents in {}", config.persona.data_dir.display());
    println!("   3. Run: doppel check");
    println!("   4. Run: doppel chat\n");

    Ok(())
}

fn write_default_config(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, AppConfig::default_toml())
}

/// Create the data and persona directories plus sample persona files.
/// Existing files are left alone. Returns what was created.
fn write_persona_files(config: &AppConfig) -> std::io::Result<Vec<std::path::PathBuf>> {
    let persona = &config.persona;
    let mut created = Vec::new();

    for dir in [&persona.data_dir, &persona.persona_dir] {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            created.push(dir.clone());
        }
    }

    let settings_path = persona.settings_path();
    if !settings_path.exists() {
        std::fs::write(&settings_path, Settings::sample())?;
        created.push(settings_path);
    }

    let prompt_path = persona.system_prompt_path();
    if !prompt_path.exists() {
        std::fs::write(&prompt_path, PersonaDirective::builtin().as_str())?;
        created.push(prompt_path);
    }

    Ok(created)
}
