use crate::cli::commands::LogsArgs;
use crate::errors::HarnessError;
use crate::pipeline::HarnessConfig;
use tracing::info;

pub async fn handle_logs(args: LogsArgs) -> Result<(), HarnessError> {
    let config = HarnessConfig::for_base_dir(&args.base_dir);
    let log_path = config.audit_dir().join("workflow.log");
    info!(path = %log_path.display(), "Showing workflow log");

    if !log_path.exists() {
        return Err(HarnessError::Config(format!(
            "No workflow log under {}. Path: {}",
            args.base_dir, log_path.display()
        )));
    }

    let content = tokio::fs::read_to_string(&log_path).await?;
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(args.lines);

    for line in &lines[start..] {
        println!("{}", line);
    }

    if args.follow {
        use tokio::time::{sleep, Duration};
        let mut last_size = content.len();
        loop {
            sleep(Duration::from_secs(1)).await;
            let new_content = tokio::fs::read_to_string(&log_path).await?;
            if new_content.len() > last_size {
                print!("{}", &new_content[last_size..]);
                last_size = new_content.len();
            }
        }
    }

    Ok(())
}
