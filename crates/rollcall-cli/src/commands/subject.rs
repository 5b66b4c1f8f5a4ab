use clap::Subcommand;
use rollcall_core::NewSubject;

use crate::session::Session;

#[derive(Subcommand)]
pub enum SubjectAction {
    /// Record a subject
    Add {
        /// Subject name
        name: String,
        /// Required attendance percentage for this subject
        #[arg(long)]
        required: Option<u8>,
        /// Course credits
        #[arg(long)]
        credits: Option<u32>,
    },
    /// List recorded subjects
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn run(action: SubjectAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open().await?;

    match action {
        SubjectAction::Add {
            name,
            required,
            credits,
        } => {
            let subject = session
                .controller
                .add_subject(NewSubject {
                    name,
                    required_percentage: required,
                    credits,
                })
                .await?;
            println!("Subject: {} ({})", subject.name, subject.id);
        }
        SubjectAction::List { json } => {
            let subjects = session.controller.subjects();
            if json {
                println!("{}", serde_json::to_string_pretty(subjects)?);
            } else if subjects.is_empty() {
                println!("No subjects recorded yet.");
            } else {
                for s in subjects {
                    let required = s
                        .required_percentage
                        .map(|p| format!("  requires {p}%"))
                        .unwrap_or_default();
                    println!("{}  {}{required}", s.id, s.name);
                }
            }
        }
    }
    Ok(())
}
