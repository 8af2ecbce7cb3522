use anyhow::Result;
use futures::stream::{BoxStream, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

use crate::errors::{AgentError, AgentResult};
use crate::models::message::{Message, ToolRequest};
use crate::models::role::Role;
use crate::models::tool::{Tool, ToolCall};
use crate::providers::base::{Provider, Usage};
use crate::store::base::ConversationStore;
use crate::tools::ToolHandler;

pub const DEFAULT_MAX_TOOL_ITERATIONS: usize = 8;

/// Agent drives a model through answer-or-retrieve turns and keeps each thread's history
pub struct Agent {
    provider: Arc<dyn Provider>,
    store: Arc<dyn ConversationStore>,
    tools: Vec<Box<dyn ToolHandler>>,
    system_prompt: String,
    max_tool_iterations: usize,
    thread_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Agent {
    pub fn new(
        provider: Arc<dyn Provider>,
        store: Arc<dyn ConversationStore>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            tools: Vec::new(),
            system_prompt: system_prompt.into(),
            max_tool_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
            thread_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Offer a tool to the model on every invocation
    pub fn add_tool(&mut self, tool: Box<dyn ToolHandler>) {
        self.tools.push(tool);
    }

    pub fn set_max_tool_iterations(&mut self, max_tool_iterations: usize) {
        self.max_tool_iterations = max_tool_iterations;
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Declarations of every registered tool
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| t.tool().clone()).collect()
    }

    async fn dispatch_tool_call(&self, tool_call: AgentResult<ToolCall>) -> AgentResult<String> {
        let call = tool_call?;
        let handler = self
            .tools
            .iter()
            .find(|handler| handler.tool().name == call.name)
            .ok_or_else(|| AgentError::ToolNotFound(call.name.clone()))?;

        tracing::info!(tool = %call.name, arguments = %call.arguments, "dispatching tool call");
        handler.call(call.arguments).await
    }

    /// Create a stream that yields each message as it's generated by the agent.
    /// This includes both the assistant's responses and one tool observation per tool call.
    ///
    /// The stream ends after an assistant message without tool requests, and fails
    /// once the model asks for tools more than `max_tool_iterations` times.
    pub async fn reply(&self, messages: &[Message]) -> Result<BoxStream<'_, Result<Message>>> {
        if messages.last().map(|m| m.role) != Some(Role::User) {
            return Err(AgentError::InvalidParameters(
                "A reply needs a conversation ending in a user message".into(),
            )
            .into());
        }

        let mut messages = messages.to_vec();
        let tools = self.tools();
        let max_iterations = self.max_tool_iterations;

        Ok(Box::pin(async_stream::try_stream! {
            let mut iterations = 0;
            let mut turn_usage = Usage::default();
            loop {
                let (response, usage) = self.provider.complete(
                    &self.system_prompt,
                    &messages,
                    &tools,
                ).await?;
                tracing::debug!(
                    input_tokens = ?usage.input_tokens,
                    output_tokens = ?usage.output_tokens,
                    "model responded"
                );
                turn_usage.accumulate(&usage);

                messages.push(response.clone());
                yield response.clone();

                let tool_requests: Vec<ToolRequest> =
                    response.tool_requests().into_iter().cloned().collect();
                if tool_requests.is_empty() {
                    tracing::info!(
                        tool_iterations = iterations,
                        input_tokens = ?turn_usage.input_tokens,
                        output_tokens = ?turn_usage.output_tokens,
                        "reply finished"
                    );
                    break;
                }

                check_iterations(iterations, max_iterations)?;
                iterations += 1;

                // Sequential so observations land in request order
                for request in tool_requests {
                    let output = self.dispatch_tool_call(request.tool_call).await;
                    let output = into_observation(output)?;
                    let observation = Message::tool().with_tool_response(request.id, output);
                    messages.push(observation.clone());
                    yield observation;
                }
            }
        }))
    }

    /// Run one turn on a thread and return the final answer.
    ///
    /// The user message and everything the loop produces are appended to the
    /// thread's history in order, but only once the turn has succeeded.
    pub async fn run_turn(&self, user_text: &str, thread_id: &str) -> Result<String> {
        self.turn(user_text, thread_id, None).await
    }

    /// Like [`Agent::run_turn`], failing with [`AgentError::Timeout`] when the turn
    /// (including waiting for an earlier turn on the same thread) outlives `timeout`.
    /// Nothing from a timed out turn is persisted.
    pub async fn run_turn_with_deadline(
        &self,
        user_text: &str,
        thread_id: &str,
        timeout: Duration,
    ) -> Result<String> {
        self.turn(user_text, thread_id, Some(timeout)).await
    }

    async fn turn(
        &self,
        user_text: &str,
        thread_id: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        if user_text.trim().is_empty() {
            return Err(
                AgentError::InvalidParameters("The message must not be empty".into()).into(),
            );
        }

        let lock = self.thread_lock(thread_id).await;
        let result = self.locked_turn(lock, user_text, thread_id, timeout).await;
        self.release_thread_lock(thread_id).await;
        result
    }

    async fn locked_turn(
        &self,
        lock: Arc<Mutex<()>>,
        user_text: &str,
        thread_id: &str,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let timed_out = || {
            let timeout_ms = timeout.unwrap_or_default().as_millis() as u64;
            tracing::warn!(thread_id, timeout_ms, "turn timed out");
            AgentError::Timeout(timeout_ms)
        };

        let guard = before(deadline, lock.lock_owned())
            .await
            .ok_or_else(timed_out)?;
        let produced = before(deadline, self.produce_turn(user_text, thread_id))
            .await
            .ok_or_else(timed_out)??;
        self.commit(thread_id, produced, guard).await
    }

    async fn thread_lock(&self, thread_id: &str) -> Arc<Mutex<()>> {
        self.thread_locks
            .lock()
            .await
            .entry(thread_id.to_string())
            .or_default()
            .clone()
    }

    /// Forget the thread's lock once no turn holds or awaits it
    async fn release_thread_lock(&self, thread_id: &str) {
        let mut locks = self.thread_locks.lock().await;
        if locks
            .get(thread_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(thread_id);
        }
    }

    /// Everything the turn adds to the history, starting with the user message
    async fn produce_turn(&self, user_text: &str, thread_id: &str) -> Result<Vec<Message>> {
        if self.store.get_or_create(thread_id).await? {
            tracing::info!(thread_id, "started new conversation");
        }
        let mut messages = self.store.get_history(thread_id).await?;
        let user_message = Message::user().with_text(user_text);
        messages.push(user_message.clone());

        let mut produced = vec![user_message];
        let mut stream = self.reply(&messages).await?;
        while let Some(message) = stream.next().await {
            produced.push(message?);
        }
        Ok(produced)
    }

    /// Store the whole turn in one batch. The write runs on its own task so it
    /// completes even if the caller stops polling, and the thread stays locked until then.
    async fn commit(
        &self,
        thread_id: &str,
        produced: Vec<Message>,
        guard: OwnedMutexGuard<()>,
    ) -> Result<String> {
        let answer = produced
            .last()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.text())
            .ok_or_else(|| AgentError::Internal("Turn ended without an assistant message".into()))?;

        let count = produced.len();
        let store = Arc::clone(&self.store);
        let thread = thread_id.to_string();
        tokio::spawn(async move {
            let _guard = guard;
            store.append_all(&thread, produced).await
        })
        .await??;

        tracing::info!(thread_id, messages = count, "turn completed");
        Ok(answer)
    }
}

/// Await `future`, giving up with `None` once `deadline` passes
async fn before<F: Future>(deadline: Option<Instant>, future: F) -> Option<F::Output> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, future).await.ok(),
        None => Some(future.await),
    }
}

fn check_iterations(iterations: usize, max_iterations: usize) -> AgentResult<()> {
    if iterations >= max_iterations {
        return Err(AgentError::ToolLoopExceeded(max_iterations));
    }
    Ok(())
}

/// Recoverable failures become observations the model can react to, anything else fails the turn
fn into_observation(output: AgentResult<String>) -> AgentResult<AgentResult<String>> {
    match output {
        Err(e) if !e.is_recoverable() => Err(e),
        other => Ok(other),
    }
}
