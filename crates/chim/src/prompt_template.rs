use serde::Serialize;
use tera::{Context, Error as TeraError, Tera};

use crate::registry::ToolRegistry;

const SYSTEM_TEMPLATE: &str = include_str!("prompts/system.md");

#[derive(Clone, Debug, Serialize)]
struct SystemInfo {
    name: String,
    description: String,
    instructions: String,
    tools: Vec<String>,
}

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

/// Render the built-in persona for the systems in `registry`
pub fn default_system_prompt(registry: &ToolRegistry) -> Result<String, TeraError> {
    let systems: Vec<SystemInfo> = registry
        .systems()
        .map(|system| SystemInfo {
            name: system.name().to_string(),
            description: system.description().to_string(),
            instructions: system.instructions().to_string(),
            tools: system
                .tools()
                .iter()
                .map(|tool| format!("{}: {}", tool.name, tool.description))
                .collect(),
        })
        .collect();

    #[derive(Serialize)]
    struct PromptContext {
        systems: Vec<SystemInfo>,
    }
    load_prompt(SYSTEM_TEMPLATE, &PromptContext { systems })
}
