use async_trait::async_trait;
use colloquy::client_wrapper::{ClientWrapper, Message, Role, TokenUsage};
use colloquy::memory::{BufferMemory, KeywordMemory, MemoryBuffer};
use colloquy::prompt_template::PromptTemplate;
use colloquy::{Agent, ClientError, ConversationError};
use std::sync::{Arc, Mutex};

/// Captures every request and answers with a fixed response.
struct MockClient {
    response: String,
    requests: Mutex<Vec<Vec<Message>>>,
    usage: Mutex<Option<TokenUsage>>,
}

impl MockClient {
    fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            requests: Mutex::new(Vec::new()),
            usage: Mutex::new(None),
        }
    }

    fn last_request(&self) -> Vec<Message> {
        self.requests.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl ClientWrapper for MockClient {
    async fn send_message(&self, messages: &[Message]) -> Result<Message, ClientError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        *self.usage.lock().unwrap() = Some(TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
            total_tokens: 15,
        });
        Ok(Message::new(Role::Assistant, self.response.clone()))
    }

    fn model_name(&self) -> &str {
        "mock"
    }

    fn usage_slot(&self) -> Option<&Mutex<Option<TokenUsage>>> {
        Some(&self.usage)
    }
}

#[tokio::test]
async fn test_respond_records_turn_and_memory() {
    let client = Arc::new(MockClient::new("Nice draft."));
    let agent = Agent::new("editor", "Mr. Editor", client.clone());

    let reply = agent.respond("Miss Writer", "Chapter one").await.unwrap();

    assert_eq!(reply, "Nice draft.");
    let history = agent.history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].speaker, "Miss Writer");
    assert_eq!(history[0].input, "Chapter one");
    assert_eq!(history[0].output, "Nice draft.");
    assert_eq!(
        agent.memory().unwrap().recent(10),
        vec![
            Message::new(Role::User, "Chapter one"),
            Message::new(Role::Assistant, "Nice draft."),
        ]
    );
    assert_eq!(client.get_last_usage().map(|u| u.total_tokens), Some(15));
}

#[tokio::test]
async fn test_prompt_is_rendered_per_speaker() {
    let client = Arc::new(MockClient::new("ok"));
    let agent = Agent::new("editor", "Mr. Editor", client.clone()).with_prompt_template(
        PromptTemplate::new("You are {{ agent }}. {{ user }} wrote to you.").unwrap(),
    );

    agent.respond("Miss Writer", "draft").await.unwrap();
    let request = client.last_request();
    assert_eq!(request[0].role, Role::System);
    assert_eq!(request[0].content, "You are Mr. Editor. Miss Writer wrote to you.");

    agent.respond("Proofreader", "notes").await.unwrap();
    assert_eq!(
        client.last_request()[0].content,
        "You are Mr. Editor. Proofreader wrote to you."
    );
}

#[tokio::test]
async fn test_second_request_replays_own_reply() {
    let client = Arc::new(MockClient::new("scene one"));
    let agent = Agent::new("writer", "Miss Writer", client.clone());

    agent.respond("Mr. Editor", "first").await.unwrap();
    agent.respond("Mr. Editor", "second").await.unwrap();

    let request = client.last_request();
    let replayed: Vec<(Role, &str)> = request[1..]
        .iter()
        .map(|m| (m.role.clone(), m.content.as_str()))
        .collect();
    assert_eq!(
        replayed,
        vec![
            (Role::User, "first"),
            (Role::Assistant, "scene one"),
            (Role::User, "second"),
        ]
    );
}

#[tokio::test]
async fn test_memory_window_bounds_replayed_messages() {
    let client = Arc::new(MockClient::new("ok"));
    let agent = Agent::new("a", "A", client.clone()).with_memory_window(2);

    for message in ["one", "two", "three"] {
        agent.respond("alice", message).await.unwrap();
    }
    agent.respond("alice", "four").await.unwrap();

    let contents: Vec<(Role, String)> = client
        .last_request()
        .iter()
        .skip(1)
        .map(|m| (m.role.clone(), m.content.clone()))
        .collect();
    assert_eq!(
        contents,
        vec![
            (Role::User, "three".to_string()),
            (Role::Assistant, "ok".to_string()),
            (Role::User, "four".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_detached_memory_is_dependency_error() {
    let client = Arc::new(MockClient::new("ok"));
    let agent = Agent::new("a", "A", client.clone());
    let detached = agent.detach_memory();
    assert!(detached.is_some());

    let err = agent.respond("alice", "hi").await.unwrap_err();

    assert!(matches!(err, ConversationError::Dependency(_)));
    assert_eq!(agent.turn_count().unwrap(), 0);
    assert!(client.requests.lock().unwrap().is_empty());

    agent.attach_memory(Arc::new(BufferMemory::new()));
    assert!(agent.respond("alice", "hi").await.is_ok());
}

#[tokio::test]
async fn test_missing_template_parameter_is_configuration_error() {
    let client = Arc::new(MockClient::new("ok"));
    let agent = Agent::new("a", "A", client.clone())
        .with_prompt_template(PromptTemplate::new("Topic: {{ topic }}").unwrap());

    let err = agent.respond("alice", "hi").await.unwrap_err();

    assert!(matches!(err, ConversationError::Configuration(_)));
    assert_eq!(agent.turn_count().unwrap(), 0);
    assert!(agent.memory().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_completion_is_a_valid_response() {
    let agent = Agent::new("quiet", "Quiet", Arc::new(MockClient::new("")));

    let reply = agent.respond("alice", "anything?").await.unwrap();

    assert_eq!(reply, "");
    assert_eq!(agent.turn_count().unwrap(), 1);
}

#[tokio::test]
async fn test_shared_keyword_memory() {
    let memory = Arc::new(KeywordMemory::new());
    let agent = Agent::new("a", "A", Arc::new(MockClient::new("ok"))).with_memory(memory.clone());

    agent.respond("alice", "the dragon guards the castle").await.unwrap();
    agent.respond("alice", "lunch was pasta").await.unwrap();

    // Both incoming messages and both replies.
    assert_eq!(memory.len(), 4);
    assert_eq!(
        memory.search("where is the dragon", 1),
        vec!["the dragon guards the castle".to_string()]
    );
}
