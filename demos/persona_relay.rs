//! Two personas relaying a conversation through the orchestrator.
//!
//! Miss Writer and Mr. Editor each get their own single-agent session; every
//! reply is routed to the other persona as the next message. The transcript is
//! printed and appended to `ChatLog.txt`.
//!
//! ```text
//! OPENAI_API_KEY=sk-... RELAY_TURNS=3 cargo run --example persona_relay
//! ```
//!
//! `OPENAI_API_KEY` may also live in `.env`. `RELAY_TURNS` defaults to 10.

use colloquy::clients::openai::OpenAIClient;
use colloquy::prompt_template::PromptTemplate;
use colloquy::secrets::SecretProvider;
use colloquy::{Agent, ColloquyConfig, Orchestrator};
use std::error::Error;
use std::fs::OpenOptions;
use std::io::Write;
use std::sync::Arc;

const WRITER_PROMPT: &str = "You are {{ agent }}, a novelist drafting a short story one scene \
at a time. {{ speaker }} reviews every scene you send. Take the feedback into account, then \
write the next scene.";

const EDITOR_PROMPT: &str = "You are {{ agent }}, a demanding but fair editor. {{ speaker }} \
sends you scenes of a short story. Reply with concise, concrete feedback on the latest scene.";

const OPENING: &str = "Hello Mr. Editor. I am Miss Writer. I'll be starting my assignment now.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    colloquy::init_logger();

    let config = ColloquyConfig::default();
    let secrets = SecretProvider::from_env_file(&config.env_file);
    let turns: usize = secrets.get_or("RELAY_TURNS", "10").parse()?;

    let client = || -> Result<Arc<OpenAIClient>, Box<dyn Error>> {
        Ok(Arc::new(OpenAIClient::from_secrets_with_model_string(
            &secrets,
            &config.default_model,
        )?))
    };

    let mut orchestrator = Orchestrator::new().with_config(config.clone());
    orchestrator.add_agent(
        Agent::new("writer", "Miss Writer", client()?)
            .with_config(&config)
            .with_prompt_template(PromptTemplate::new(WRITER_PROMPT)?),
    )?;
    orchestrator.add_agent(
        Agent::new("editor", "Mr. Editor", client()?)
            .with_config(&config)
            .with_prompt_template(PromptTemplate::new(EDITOR_PROMPT)?),
    )?;

    orchestrator.open_session("to-writer", &["writer"]).await?;
    orchestrator.open_session("to-editor", &["editor"]).await?;

    let mut transcript = OpenOptions::new()
        .create(true)
        .append(true)
        .open("ChatLog.txt")?;

    let mut message = OPENING.to_string();
    for _ in 0..turns {
        record(&mut transcript, "Miss Writer", &message)?;
        message = reply(&orchestrator, "to-editor", "Miss Writer", &message).await?;

        record(&mut transcript, "Mr. Editor", &message)?;
        message = reply(&orchestrator, "to-writer", "Mr. Editor", &message).await?;
    }

    println!(
        "{} exchanges logged across {} sessions",
        orchestrator.log_len()?,
        orchestrator.session_count()?
    );
    Ok(())
}

async fn reply(
    orchestrator: &Orchestrator,
    session_key: &str,
    speaker: &str,
    message: &str,
) -> Result<String, Box<dyn Error>> {
    let responses = orchestrator.route(session_key, speaker, message).await?;
    Ok(responses
        .into_iter()
        .next()
        .map(|(_, response)| response)
        .unwrap_or_default())
}

fn record(transcript: &mut impl Write, speaker: &str, message: &str) -> std::io::Result<()> {
    println!("{}: {}\n", speaker, message);
    write!(transcript, "{}: {}\n\n", speaker, message)
}
