use clap::Subcommand;
use juggernaut::dto::CreateTaskDto;
use juggernaut::models::TaskState;
use std::path::PathBuf;
use std::time::Duration;

use super::{parse_json_arg, read_json_file};
use crate::client::JuggernautClient;
use crate::output::{self, OutputConfig};

/// Interval between status polls for `task execute --wait`
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// RPA task commands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task from flags or a JSON definition file
    Create {
        /// JSON file holding the whole task definition
        #[clap(long, conflicts_with_all = ["name", "description", "target_url", "steps", "schedule"])]
        file: Option<PathBuf>,
        /// Name of the task
        #[clap(long, required_unless_present = "file")]
        name: Option<String>,
        /// What the task does
        #[clap(long, default_value = "")]
        description: String,
        /// Page to open before the first step
        #[clap(long)]
        target_url: Option<String>,
        /// Steps as a JSON array of objects
        #[clap(long, default_value = "[]")]
        steps: String,
        /// Schedule block as JSON (stored only)
        #[clap(long)]
        schedule: Option<String>,
    },
    /// List all tasks
    List,
    /// Show a task
    Get {
        /// The task ID
        id: String,
    },
    /// Start a task run
    Execute {
        /// The task ID
        id: String,
        /// Poll until the run finishes, then print its result
        #[clap(long)]
        wait: bool,
    },
    /// Show the execution status of a task
    Status {
        /// The task ID
        id: String,
    },
    /// Show the result of the last finished run
    Result {
        /// The task ID
        id: String,
    },
}

/// Executes a task command
pub async fn execute(
    client: &JuggernautClient,
    cmd: TaskCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        TaskCommands::Create {
            file,
            name,
            description,
            target_url,
            steps,
            schedule,
        } => {
            let dto = match file {
                Some(path) => read_json_file::<CreateTaskDto>(&path)?,
                None => CreateTaskDto {
                    name: name.unwrap_or_default(),
                    description,
                    target_url,
                    steps: parse_json_arg("steps", &steps)?,
                    schedule: schedule
                        .map(|text| parse_json_arg("schedule", &text))
                        .transpose()?,
                },
            };
            let created = client.create_task(&dto).await?;
            output::print_task_created(&created, config);
        }
        TaskCommands::List => {
            let tasks = client.list_tasks().await?;
            output::print_tasks(&tasks, config);
        }
        TaskCommands::Get { id } => {
            let task = client.get_task(&id).await?;
            output::print_task(&task, config);
        }
        TaskCommands::Execute { id, wait } => {
            let status = client.execute_task(&id).await?;
            if !wait {
                output::print_task_status(&status, config);
                return Ok(());
            }

            loop {
                tokio::time::sleep(POLL_INTERVAL).await;
                let status = client.task_status(&id).await?;
                if status.status != TaskState::Running {
                    break;
                }
            }
            let result = client.task_result(&id).await?;
            output::print_task_result(&result, config);
            if result.status == TaskState::Failed {
                return Err(format!("task {} failed", id).into());
            }
        }
        TaskCommands::Status { id } => {
            let status = client.task_status(&id).await?;
            output::print_task_status(&status, config);
        }
        TaskCommands::Result { id } => {
            let result = client.task_result(&id).await?;
            output::print_task_result(&result, config);
        }
    }
    Ok(())
}
