//! AI backend and prompt library commands

use anyhow::Result;
use paisa_core::prompts::default_prompts_dir;
use paisa_core::{AIBackend, AIClient, Category, PromptId, PromptLibrary};

/// Check the configured backend and classify one sample message
pub async fn cmd_ai_test(ai: Option<AIClient>, text: &str) -> Result<()> {
    println!("🔍 Testing AI backend...\n");

    let Some(client) = ai else {
        println!("  ⚠️  No AI backend configured");
        println!();
        println!("To enable AI classification, set one of:");
        println!("  export OLLAMA_HOST=http://localhost:11434");
        println!("  export PAISA_AI_ENDPOINT=https://example.com/classify");
        return Ok(());
    };

    println!("  Backend: {}", client.backend_name());
    println!("  Host:    {}", client.host());
    println!("  Model:   {}\n", client.model());

    print!("Checking availability... ");
    if client.health_check().await {
        println!("✅ Connected");
    } else {
        println!("❌ Failed");
        println!("\n⚠️  Could not reach {}", client.host());
        return Ok(());
    }

    println!("\n📋 Classifying \"{}\"...\n", text);
    match client.classify_expense(text).await {
        Ok(result) => {
            let amount = result
                .amount_decimal()
                .map(super::rupees)
                .unwrap_or_else(|| "(none)".to_string());
            println!("  Raw label: {}", result.category);
            println!("  Category:  {}", Category::normalize(&result.category));
            println!("  Amount:    {}", amount);
        }
        Err(e) => println!("  ❌ Error: {}", e),
    }

    Ok(())
}

/// List all prompts and their override status
pub fn cmd_prompts_list() -> Result<()> {
    let mut library = PromptLibrary::new();
    let prompts = library.list();

    println!("Available Prompts:\n");
    println!("{:<20} {:>7}  {:<15}  {}", "ID", "VERSION", "PURPOSE", "OVERRIDE");
    println!("{}", "-".repeat(60));

    for info in prompts {
        let status = if info.has_override { "✓ Custom" } else { "Default" };
        println!(
            "{:<20} {:>7}  {:<15}  {}",
            info.id, info.version, info.purpose, status
        );
    }

    println!();
    println!(
        "Override directory: {}",
        default_prompts_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(not available)".to_string())
    );
    Ok(())
}

/// Print one prompt's metadata and body
pub fn cmd_prompts_show(prompt_id: &str) -> Result<()> {
    let id: PromptId = match prompt_id.parse() {
        Ok(id) => id,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!();
            eprintln!("Available prompts:");
            for id in PromptId::all() {
                eprintln!("  - {}", id.as_str());
            }
            return Ok(());
        }
    };

    let mut library = PromptLibrary::new();
    let prompt = library.get(id)?;

    println!("Prompt: {}", prompt.metadata.id);
    println!("Version: {}", prompt.metadata.version);
    println!("Purpose: {}", prompt.metadata.purpose);
    println!(
        "Source: {}",
        if prompt.is_override { "Override" } else { "Default" }
    );
    if let Some(ref path) = prompt.override_path {
        println!("Override Path: {}", path.display());
    }

    println!();
    println!("--- Content ---");
    println!("{}", prompt.content);
    Ok(())
}
