use clap::ValueEnum;
use juggernaut::dto::{
    ApiAckDto, ApiDto, PluginResponseDto, TaskCreatedDto, TaskDto, TaskResultDto, TaskStatusDto,
};
use juggernaut::manifest::{LineError, Manifest, Requirement};
use serde::Serialize;
use serde_json::{json, Value};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

/// Bundled output configuration passed to all print functions
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    /// The output format
    pub format: OutputFormat,
    /// When true, print minimal output (just IDs or counts)
    pub quiet: bool,
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => eprintln!("Error: failed to encode output: {}", e),
    }
}

/// Prints a list of plugins in the specified format
pub fn print_plugins(plugins: &[PluginResponseDto], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if plugins.is_empty() {
                if !config.quiet {
                    println!("No plugins registered.");
                }
                return;
            }
            if config.quiet {
                for plugin in plugins {
                    println!("{}", plugin.id);
                }
                return;
            }
            let max_id = plugins.iter().map(|p| p.id.len()).max().unwrap_or(2).max(2);
            println!("{:<width$}  {:<10}  {:<8}  NAME", "ID", "VERSION", "ENABLED", width = max_id);
            for plugin in plugins {
                println!(
                    "{:<width$}  {:<10}  {:<8}  {}",
                    plugin.id,
                    plugin.version,
                    plugin.enabled,
                    plugin.name,
                    width = max_id
                );
            }
        }
        OutputFormat::Json => print_json(plugins),
    }
}

/// Prints a single plugin in the specified format
pub fn print_plugin(plugin: &PluginResponseDto, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", plugin.id);
                return;
            }
            println!("ID:          {}", plugin.id);
            println!("Name:        {}", plugin.name);
            println!("Description: {}", plugin.description);
            println!("Version:     {}", plugin.version);
            println!("Enabled:     {}", plugin.enabled);
            println!("Status:      {}", plugin.status);
        }
        OutputFormat::Json => print_json(plugin),
    }
}

/// Prints a freshly created task
pub fn print_task_created(created: &TaskCreatedDto, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", created.task_id);
            } else {
                println!("Created task {}", created.task_id);
            }
        }
        OutputFormat::Json => print_json(created),
    }
}

/// Prints a list of tasks in the specified format
pub fn print_tasks(tasks: &[TaskDto], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if tasks.is_empty() {
                if !config.quiet {
                    println!("No tasks found.");
                }
                return;
            }
            if config.quiet {
                for task in tasks {
                    println!("{}", task.id);
                }
                return;
            }
            let max_id = tasks.iter().map(|t| t.id.len()).max().unwrap_or(2).max(2);
            println!("{:<width$}  {:<9}  {:>5}  {:>8}  NAME", "ID", "STATUS", "STEPS", "PROGRESS", width = max_id);
            for task in tasks {
                println!(
                    "{:<width$}  {:<9}  {:>5}  {:>7.0}%  {}",
                    task.id,
                    task.status.as_str(),
                    task.steps.len(),
                    task.progress * 100.0,
                    task.name,
                    width = max_id
                );
            }
        }
        OutputFormat::Json => print_json(tasks),
    }
}

/// Prints a single task in the specified format
pub fn print_task(task: &TaskDto, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", task.id);
                return;
            }
            println!("ID:          {}", task.id);
            println!("Name:        {}", task.name);
            println!("Description: {}", task.description);
            println!("Target URL:  {}", task.target_url.as_deref().unwrap_or("-"));
            println!("Status:      {}", task.status);
            println!("Progress:    {:.0}%", task.progress * 100.0);
            println!("Steps:");
            for (i, step) in task.steps.iter().enumerate() {
                println!("  {:>3}. {}", i + 1, step);
            }
        }
        OutputFormat::Json => print_json(task),
    }
}

/// Prints the execution status of a task
pub fn print_task_status(status: &TaskStatusDto, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", status.status);
                return;
            }
            println!("Task:     {}", status.task_id);
            println!("Status:   {}", status.status);
            if let Some(progress) = status.progress {
                println!("Progress: {:.0}%", progress * 100.0);
            }
            if let Some(message) = &status.message {
                println!("Message:  {}", message);
            }
        }
        OutputFormat::Json => print_json(status),
    }
}

/// Prints the outcome of a finished task run
pub fn print_task_result(result: &TaskResultDto, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", result.status);
                return;
            }
            println!("Task:   {}", result.task_id);
            println!("Status: {}", result.status);
            if let Some(error) = &result.error {
                println!("Error:  {}", error);
            }
            if let Some(value) = &result.result {
                println!("Result:");
                print_json(value);
            }
        }
        OutputFormat::Json => print_json(result),
    }
}

/// Prints a gateway registration acknowledgement
pub fn print_api_ack(ack: &ApiAckDto, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", ack.api_id);
            } else {
                println!("{}", ack.message);
            }
        }
        OutputFormat::Json => print_json(ack),
    }
}

/// Prints a list of registered APIs in the specified format
pub fn print_apis(apis: &[ApiDto], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if apis.is_empty() {
                if !config.quiet {
                    println!("No APIs registered.");
                }
                return;
            }
            if config.quiet {
                for api in apis {
                    println!("{}", api.id);
                }
                return;
            }
            let max_id = apis.iter().map(|a| a.id.len()).max().unwrap_or(2).max(2);
            let max_path = apis.iter().map(|a| a.base_path.len()).max().unwrap_or(9).max(9);
            println!("{:<id$}  {:<path$}  ROUTES  NAME", "ID", "BASE PATH", id = max_id, path = max_path);
            for api in apis {
                println!(
                    "{:<id$}  {:<path$}  {:>6}  {}",
                    api.id,
                    api.base_path,
                    api.routes.len(),
                    api.name,
                    id = max_id,
                    path = max_path
                );
            }
        }
        OutputFormat::Json => print_json(apis),
    }
}

/// Prints a single registered API in the specified format
pub fn print_api(api: &ApiDto, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", api.id);
                return;
            }
            println!("ID:        {}", api.id);
            println!("Name:      {}", api.name);
            println!("Base path: {}", api.base_path);
            println!("Routes:");
            for route in &api.routes {
                let auth = if route.auth_required { "auth" } else { "open" };
                println!("  {:<24} {:<20} {:<4}  {}", route.path, route.methods.join(","), auth, route.description);
            }
        }
        OutputFormat::Json => print_json(api),
    }
}

/// Prints an arbitrary JSON document
///
/// Human mode prints top-level scalar fields as `key: value` lines and
/// falls back to pretty JSON for anything nested.
pub fn print_value(value: &Value, config: &OutputConfig) {
    match (config.format, value) {
        (OutputFormat::Human, Value::Object(map)) if map.values().all(|v| !v.is_object() && !v.is_array()) => {
            if config.quiet {
                return;
            }
            for (key, value) in map {
                match value {
                    Value::String(s) => println!("{}: {}", key, s),
                    other => println!("{}: {}", key, other),
                }
            }
        }
        (OutputFormat::Human, _) if config.quiet => {}
        _ => print_json(value),
    }
}

/// Prints a success message in the specified format
pub fn print_success(message: &str, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if !config.quiet {
                println!("{}", message);
            }
        }
        OutputFormat::Json => print_json(&json!({"status": "ok", "message": message})),
    }
}

fn requirement_json(req: &Requirement) -> Value {
    json!({
        "name": req.name(),
        "extras": req.extras(),
        "operator": req.operator().as_str(),
        "version": req.version().to_string(),
        "line": req.line(),
        "note": req.note(),
    })
}

/// Prints the requirements of a valid manifest
pub fn print_manifest(manifest: &Manifest, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                for req in manifest.requirements() {
                    println!("{}", req.name());
                }
                return;
            }
            let max_name = manifest
                .requirements()
                .iter()
                .map(|r| r.name().len())
                .max()
                .unwrap_or(4)
                .max(4);
            println!("{:>4}  {:<width$}  CONSTRAINT", "LINE", "NAME", width = max_name);
            for req in manifest.requirements() {
                println!(
                    "{:>4}  {:<width$}  {}{}",
                    req.line(),
                    req.name(),
                    req.operator(),
                    req.version(),
                    width = max_name
                );
            }
        }
        OutputFormat::Json => {
            let requirements: Vec<Value> = manifest.requirements().iter().map(requirement_json).collect();
            print_json(&json!({"requirements": requirements}));
        }
    }
}

/// Prints the summary of a manifest check
pub fn print_manifest_check(manifest: &Manifest, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", manifest.len());
                return;
            }
            println!(
                "OK: {} requirement(s), {} pinned",
                manifest.len(),
                manifest.pinned().count()
            );
        }
        OutputFormat::Json => print_json(&json!({
            "status": "ok",
            "requirements": manifest.len(),
            "pinned": manifest.pinned().count(),
        })),
    }
}

/// Prints rejected manifest lines to stderr, or as JSON to stdout
pub fn print_manifest_errors(errors: &[LineError], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            for error in errors {
                eprintln!("{}", error);
            }
        }
        OutputFormat::Json => {
            let errors: Vec<Value> = errors
                .iter()
                .map(|e| json!({"line": e.line, "content": e.content, "error": e.kind.to_string()}))
                .collect();
            print_json(&json!({"status": "invalid", "errors": errors}));
        }
    }
}

/// Prints whether a candidate version satisfies a requirement
pub fn print_allows(req: &Requirement, candidate: &str, allowed: bool, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", allowed);
                return;
            }
            let verdict = if allowed { "satisfies" } else { "does not satisfy" };
            println!("{} {} {}", candidate, verdict, req);
        }
        OutputFormat::Json => print_json(&json!({
            "requirement": req.to_string(),
            "candidate": candidate,
            "allowed": allowed,
        })),
    }
}
