#![deny(missing_docs)]
//! The orchestrator step (spec §4.4): one thread, one trigger, one
//! terminal assistant message.
//!
//! `OrchestratorStep::execute` is grounded directly on
//! `warden-op-react::ReactOperator::execute`'s loop shape — assemble
//! context, call the model, extract and run tool calls, repeat — with
//! four changes: a six-section prompt assembly in place of flat
//! history-from-state, `warden-trace` events emitted per iteration
//! instead of hook dispatch, a `warden-router::Router`-driven loop
//! instead of a single generic provider (so fallback is transparent to
//! the step), and an explicit terminal-synthesis path that guarantees a
//! non-empty closing message even when every provider call fails.

pub mod prompt;

use std::sync::Arc;
use std::time::Instant;

use rust_decimal::Decimal;
use thiserror::Error;

use warden_domain::thread::{Message, MessageRole};
use warden_domain::{AgentBundle, MessageId, ScheduleId, ThreadId, ToolPermission};
use warden_memory::{MemoryInterface, RetrievalBlend};
use warden_router::{Router, RouterError};
use warden_store::{Store, StoreError};
use warden_tool::runtime::{ExecuteRequest, ExecuteOutcome, ToolRuntime};
use warden_tool::ToolRegistry;
use warden_trace::{event_types, ActorKind, EventLog, TraceContext};
use warden_turn::context::ContextStrategy;
use warden_turn::types::{ContentPart, ProviderMessage, ProviderRequest, Role, StopReason, ToolSchema};

use prompt::PinnedSkill;

/// What triggered this step.
#[derive(Debug, Clone)]
pub enum StepTrigger {
    /// A new inbound message.
    Message(MessageId),
    /// A fired schedule.
    Schedule(ScheduleId),
}

impl StepTrigger {
    fn kind(&self) -> &'static str {
        match self {
            StepTrigger::Message(_) => "message",
            StepTrigger::Schedule(_) => "schedule",
        }
    }

    fn id(&self) -> String {
        match self {
            StepTrigger::Message(id) => id.to_string(),
            StepTrigger::Schedule(id) => id.to_string(),
        }
    }
}

/// Tunables independent of any one step invocation.
#[derive(Debug, Clone)]
pub struct StepConfig {
    /// Max output tokens requested per provider call.
    pub max_tokens: u32,
    /// Number of recent conversation turns (messages) included verbatim
    /// in the prompt's tail section.
    pub recent_tail_turns: usize,
    /// How many semantic-retrieval results to request.
    pub retrieval_k: usize,
    /// The semantic/recency blend passed to retrieval.
    pub retrieval_blend: RetrievalBlend,
    /// Inbound messages between automatic compaction-task triggers.
    /// Overridden per-thread by `Thread::compaction_threshold`.
    pub default_compaction_interval: u32,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            recent_tail_turns: 10,
            retrieval_k: 8,
            retrieval_blend: RetrievalBlend::default(),
            default_compaction_interval: 20,
        }
    }
}

/// One step's inputs: the thread, what triggered it, the trace it runs
/// in, and the responding agent's identity and governance.
pub struct StepInput {
    /// The thread this step advances.
    pub thread_id: ThreadId,
    /// The message or schedule that triggered this step.
    pub trigger: StepTrigger,
    /// The trace this step runs within (new, or inherited from the
    /// event that caused it).
    pub trace: TraceContext,
    /// The responding agent's identity, persona, and governance.
    pub agent: AgentBundle,
    /// Reusable documents pinned into this agent's system context.
    pub pinned_skills: Vec<PinnedSkill>,
    /// The triggering text: the inbound message's content, or the
    /// schedule's rendered payload.
    pub trigger_text: String,
    /// This principal's explicit tool permission rows (R3).
    pub permissions: Vec<ToolPermission>,
}

/// Why the orchestrator had to fall back to a deterministic placeholder
/// message instead of a real model-authored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalSynthesisReason {
    /// The mandatory terminal-synthesis call issued after the tool loop
    /// ran out (max actions or no terminal text) itself failed.
    PlaceholderResponseAfterToolLoop,
    /// A terminal-synthesis call transport-succeeded but produced no
    /// usable text, whichever call site triggered it.
    PlaceholderResponseAfterTerminalSynthesis,
    /// The provider-error-triggered terminal-synthesis attempt (both
    /// providers failed mid-loop) itself failed.
    ProviderErrorTerminalSynthesis,
}

impl TerminalSynthesisReason {
    /// The dot-free reason code carried in the placeholder message and
    /// in its `agent.step.end` event.
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminalSynthesisReason::PlaceholderResponseAfterToolLoop => "placeholder_response_after_tool_loop",
            TerminalSynthesisReason::PlaceholderResponseAfterTerminalSynthesis => {
                "placeholder_response_after_terminal_synthesis"
            }
            TerminalSynthesisReason::ProviderErrorTerminalSynthesis => "provider_error_terminal_synthesis",
        }
    }
}

/// How the step's terminal assistant message was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepExitReason {
    /// The provider returned a terminal (non-tool-use) response.
    Complete,
    /// The agent's `max_actions_per_step` cap was reached; a mandatory
    /// terminal-synthesis call produced the closing message.
    MaxActionsPerStep,
    /// Every provider call failed at some point; a deterministic
    /// placeholder message was persisted instead.
    TerminalSynthesis(TerminalSynthesisReason),
}

/// The result of one step: exactly one assistant message, already
/// persisted to the store.
#[derive(Debug, Clone)]
pub struct StepOutput {
    /// The assistant message's id, as persisted.
    pub message_id: MessageId,
    /// Its text.
    pub assistant_message: String,
    /// Why the loop produced this particular message.
    pub exit_reason: StepExitReason,
    /// Tool calls executed this step.
    pub tool_calls: u32,
    /// Input tokens consumed across every provider call this step.
    pub tokens_in: u64,
    /// Output tokens produced across every provider call this step.
    pub tokens_out: u64,
}

/// Fatal errors: conditions that prevent the step from even attempting
/// the provider loop. Provider failures are not fatal — they route
/// through terminal synthesis instead.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StepError {
    /// The store failed to read or write required state.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Runs the bounded prompt-assembly and tool-calling loop for one
/// thread/trigger pair.
pub struct OrchestratorStep {
    store: Arc<dyn Store>,
    event_log: Arc<dyn EventLog>,
    router: Arc<Router>,
    tools: ToolRegistry,
    tool_runtime: Arc<ToolRuntime>,
    memory: Arc<dyn MemoryInterface>,
    context_strategy: Box<dyn ContextStrategy>,
    config: StepConfig,
    component: &'static str,
}

impl OrchestratorStep {
    /// Build a step runner from its dependencies.
    pub fn new(
        store: Arc<dyn Store>,
        event_log: Arc<dyn EventLog>,
        router: Arc<Router>,
        tools: ToolRegistry,
        tool_runtime: Arc<ToolRuntime>,
        memory: Arc<dyn MemoryInterface>,
        context_strategy: Box<dyn ContextStrategy>,
        config: StepConfig,
    ) -> Self {
        Self {
            store,
            event_log,
            router,
            tools,
            tool_runtime,
            memory,
            context_strategy,
            config,
            component: "warden-step",
        }
    }

    /// Whether a thread whose inbound count just reached `inbound_count`
    /// should have a compaction task enqueued. The enqueue itself is the
    /// caller's responsibility (it owns the `warden-task::Runner`); this
    /// is a pure threshold check so callers don't duplicate the modulo.
    pub fn compaction_due(&self, inbound_count: u64, thread_compaction_threshold: u32) -> bool {
        let threshold = if thread_compaction_threshold == 0 {
            self.config.default_compaction_interval
        } else {
            thread_compaction_threshold
        } as u64;
        threshold > 0 && inbound_count % threshold == 0
    }

    fn build_tool_schemas(&self) -> Vec<ToolSchema> {
        self.tools
            .iter()
            .map(|tool| ToolSchema {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    async fn assemble_messages(
        &self,
        input: &StepInput,
    ) -> Result<(String, Vec<ProviderMessage>), StepError> {
        let summary = self.memory.thread_summary(&input.thread_id).await.unwrap_or_default();
        let state_items = self
            .memory
            .active_state_items(&input.thread_id, &input.agent.agent_id)
            .await
            .unwrap_or_default();
        let retrieved = self
            .memory
            .retrieve(
                &input.thread_id,
                &input.trigger_text,
                self.config.retrieval_k,
                self.config.retrieval_blend,
            )
            .await
            .unwrap_or_default();

        let state_block = prompt::render_state_block(&state_items);
        let retrieval_block = prompt::render_retrieval(&retrieved);
        let context_message = prompt::build_context_message(
            &summary.short,
            state_block.as_deref(),
            &summary.long,
            &retrieval_block,
        );

        let tail = self
            .store
            .list_messages(&input.thread_id, Some(self.config.recent_tail_turns))
            .await?;
        let mut messages: Vec<ProviderMessage> = vec![context_message];
        messages.extend(tail.iter().map(prompt::message_to_provider));
        messages.push(ProviderMessage {
            role: Role::User,
            content: vec![ContentPart::Text { text: input.trigger_text.clone() }],
        });

        let system = prompt::build_system_prompt(&input.agent.identity, &input.agent.persona, &input.pinned_skills);
        Ok((system, messages))
    }

    async fn count_prior_actions(&self, ctx: &TraceContext) -> u32 {
        let filter = warden_trace::EventFilter {
            trace_id: Some(ctx.trace_id.clone()),
            event_type_prefix: Some(event_types::TOOL_CALL_START.to_string()),
            ..Default::default()
        };
        self.event_log
            .search(&filter, &Default::default())
            .await
            .map(|events| events.len() as u32)
            .unwrap_or(0)
    }

    async fn emit(&self, ctx: &TraceContext, event_type: &str, thread_id: &ThreadId, actor_id: &str, payload: serde_json::Value) {
        if let Err(e) = self
            .event_log
            .emit(ctx, event_type, self.component, ActorKind::Agent, actor_id, Some(thread_id.clone()), payload)
            .await
        {
            tracing::warn!(error = %e, event_type, "failed to emit step event");
        }
    }

    async fn persist_assistant_message(&self, thread_id: &ThreadId, text: &str) -> Result<MessageId, StoreError> {
        let message = Message {
            id: MessageId::generate(),
            thread_id: thread_id.clone(),
            role: MessageRole::Assistant,
            content: text.to_string(),
            media: None,
            external_delivery_id: None,
            created_at: chrono::Utc::now(),
        };
        let id = message.id.clone();
        self.store.insert_message(message).await?;
        Ok(id)
    }

    /// Issue the final, tool-less provider call that guarantees a
    /// non-empty closing message, persist it, and emit `agent.step.end`.
    async fn terminal_synthesis(
        &self,
        ctx: &TraceContext,
        input: &StepInput,
        system_prompt: &str,
        messages: &[ProviderMessage],
        tool_calls: u32,
        tokens_in: u64,
        tokens_out: u64,
        on_success: StepExitReason,
        on_failure: TerminalSynthesisReason,
    ) -> Result<StepOutput, StepError> {
        let request = ProviderRequest {
            model: None,
            messages: messages.to_vec(),
            tools: Vec::new(),
            max_tokens: Some(self.config.max_tokens),
            temperature: None,
            system: Some(system_prompt.to_string()),
            extra: serde_json::Value::Null,
        };

        self.emit_model_run_start(ctx, input).await;
        let (text, exit_reason, extra_tokens_in, extra_tokens_out) = match self.router.generate(request, ctx).await {
            Ok(response) => {
                self.emit_model_run_end(ctx, input, response.usage.input_tokens, response.usage.output_tokens).await;
                let text = extract_text(&response.content);
                if text.trim().is_empty() {
                    (
                        placeholder_text(ctx, TerminalSynthesisReason::PlaceholderResponseAfterTerminalSynthesis),
                        StepExitReason::TerminalSynthesis(TerminalSynthesisReason::PlaceholderResponseAfterTerminalSynthesis),
                        response.usage.input_tokens,
                        response.usage.output_tokens,
                    )
                } else {
                    (text, on_success, response.usage.input_tokens, response.usage.output_tokens)
                }
            }
            Err(err) => {
                self.emit_model_run_error(ctx, input, &err).await;
                (placeholder_text(ctx, on_failure), StepExitReason::TerminalSynthesis(on_failure), 0, 0)
            }
        };

        let message_id = self.persist_assistant_message(&input.thread_id, &text).await?;
        let total_tokens_in = tokens_in + extra_tokens_in;
        let total_tokens_out = tokens_out + extra_tokens_out;

        self.emit(
            ctx,
            event_types::AGENT_STEP_END,
            &input.thread_id,
            &input.agent.agent_id,
            serde_json::json!({"exit_reason": format!("{exit_reason:?}"), "tool_calls": tool_calls}),
        )
        .await;

        Ok(StepOutput {
            message_id,
            assistant_message: text,
            exit_reason,
            tool_calls,
            tokens_in: total_tokens_in,
            tokens_out: total_tokens_out,
        })
    }

    async fn emit_model_run_start(&self, ctx: &TraceContext, input: &StepInput) {
        self.emit(ctx, event_types::MODEL_RUN_START, &input.thread_id, &input.agent.agent_id, serde_json::json!({})).await;
    }

    async fn emit_model_run_end(&self, ctx: &TraceContext, input: &StepInput, tokens_in: u64, tokens_out: u64) {
        self.emit(
            ctx,
            event_types::MODEL_RUN_END,
            &input.thread_id,
            &input.agent.agent_id,
            serde_json::json!({"tokens_in": tokens_in, "tokens_out": tokens_out}),
        )
        .await;
    }

    async fn emit_model_run_error(&self, ctx: &TraceContext, input: &StepInput, err: &RouterError) {
        self.emit(
            ctx,
            event_types::MODEL_RUN_ERROR,
            &input.thread_id,
            &input.agent.agent_id,
            serde_json::json!({"outage_kind": err.outage_kind.as_str(), "error": err.to_string()}),
        )
        .await;
    }

    /// Run the prompt-assembly and bounded tool-calling loop, producing
    /// exactly one persisted assistant message.
    pub async fn execute(&self, input: StepInput) -> Result<StepOutput, StepError> {
        let start = Instant::now();
        let ctx = input.trace.clone();

        self.emit(
            &ctx,
            event_types::AGENT_STEP_START,
            &input.thread_id,
            &input.agent.agent_id,
            serde_json::json!({"trigger_kind": input.trigger.kind(), "trigger_id": input.trigger.id()}),
        )
        .await;

        let system_state = self.store.get_system_state().await?;
        let (system_prompt, mut messages) = self.assemble_messages(&input).await?;
        let tool_schemas = self.build_tool_schemas();

        let max_actions = input.agent.governance.max_actions_per_step;
        let mut tool_count: u32 = self.count_prior_actions(&ctx).await;
        let step_start_actions = tool_count;

        let mut tokens_in: u64 = 0;
        let mut tokens_out: u64 = 0;

        loop {
            let request = ProviderRequest {
                model: None,
                messages: messages.clone(),
                tools: tool_schemas.clone(),
                max_tokens: Some(self.config.max_tokens),
                temperature: None,
                system: Some(system_prompt.clone()),
                extra: serde_json::Value::Null,
            };

            self.emit_model_run_start(&ctx, &input).await;
            let response = match self.router.generate(request, &ctx).await {
                Ok(response) => {
                    self.emit_model_run_end(&ctx, &input, response.usage.input_tokens, response.usage.output_tokens).await;
                    tokens_in += response.usage.input_tokens;
                    tokens_out += response.usage.output_tokens;
                    response
                }
                Err(err) => {
                    self.emit_model_run_error(&ctx, &input, &err).await;
                    return self
                        .terminal_synthesis(
                            &ctx,
                            &input,
                            &system_prompt,
                            &messages,
                            tool_count - step_start_actions,
                            tokens_in,
                            tokens_out,
                            StepExitReason::Complete,
                            TerminalSynthesisReason::ProviderErrorTerminalSynthesis,
                        )
                        .await;
                }
            };

            match response.stop_reason {
                StopReason::EndTurn => {
                    let text = extract_text(&response.content);
                    let message_id = self.persist_assistant_message(&input.thread_id, &text).await?;
                    self.emit(
                        &ctx,
                        event_types::AGENT_STEP_END,
                        &input.thread_id,
                        &input.agent.agent_id,
                        serde_json::json!({"exit_reason": "complete", "tool_calls": tool_count - step_start_actions}),
                    )
                    .await;
                    return Ok(StepOutput {
                        message_id,
                        assistant_message: text,
                        exit_reason: StepExitReason::Complete,
                        tool_calls: tool_count - step_start_actions,
                        tokens_in,
                        tokens_out,
                    });
                }
                StopReason::MaxTokens | StopReason::ContentFilter => {
                    return self
                        .terminal_synthesis(
                            &ctx,
                            &input,
                            &system_prompt,
                            &messages,
                            tool_count - step_start_actions,
                            tokens_in,
                            tokens_out,
                            StepExitReason::MaxActionsPerStep,
                            TerminalSynthesisReason::PlaceholderResponseAfterToolLoop,
                        )
                        .await;
                }
                StopReason::ToolUse => {
                    messages.push(ProviderMessage { role: Role::Assistant, content: response.content.clone() });

                    let tool_uses: Vec<(String, String, serde_json::Value)> = response
                        .content
                        .iter()
                        .filter_map(|part| match part {
                            ContentPart::ToolUse { id, name, input } => Some((id.clone(), name.clone(), input.clone())),
                            _ => None,
                        })
                        .collect();

                    let mut tool_results = Vec::new();
                    let mut hit_cap = false;

                    for (id, name, args) in tool_uses {
                        tool_count += 1;
                        if tool_count - step_start_actions > max_actions {
                            hit_cap = true;
                            break;
                        }

                        let resolved_arg_paths = extract_arg_paths(&args);
                        let outcome = self
                            .tool_runtime
                            .execute(ExecuteRequest {
                                tool_name: &name,
                                args: args.clone(),
                                principal_id: &input.agent.agent_id,
                                trace: &ctx,
                                thread_id: Some(input.thread_id.clone()),
                                is_primary_agent: input.agent.is_primary,
                                system_state: &system_state,
                                governance: &input.agent.governance,
                                permissions: &input.permissions,
                                resolved_arg_paths,
                                actions_so_far_this_trace: tool_count - 1,
                            })
                            .await;

                        let (content, is_error) = outcome_to_tool_result(outcome);
                        tool_results.push(ContentPart::ToolResult { tool_use_id: id, content, is_error });
                    }

                    messages.push(ProviderMessage { role: Role::User, content: tool_results });

                    if hit_cap {
                        return self
                            .terminal_synthesis(
                                &ctx,
                                &input,
                                &system_prompt,
                                &messages,
                                tool_count - step_start_actions,
                                tokens_in,
                                tokens_out,
                                StepExitReason::MaxActionsPerStep,
                                TerminalSynthesisReason::PlaceholderResponseAfterToolLoop,
                            )
                            .await;
                    }

                    let limit = self.config.max_tokens as usize * 4;
                    if self.context_strategy.should_compact(&messages, limit) {
                        messages = self.context_strategy.compact(messages);
                    }
                    let _ = start.elapsed();
                }
            }
        }
    }
}

fn extract_text(content: &[ContentPart]) -> String {
    content
        .iter()
        .filter_map(|part| match part {
            ContentPart::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn extract_arg_paths(args: &serde_json::Value) -> Vec<String> {
    let Some(obj) = args.as_object() else { return Vec::new() };
    obj.iter()
        .filter(|(key, _)| key.to_lowercase().contains("path"))
        .filter_map(|(_, value)| value.as_str().map(str::to_string))
        .collect()
}

fn outcome_to_tool_result(outcome: ExecuteOutcome) -> (String, bool) {
    match outcome {
        ExecuteOutcome::Ok { result } => (serde_json::to_string(&result).unwrap_or_default(), false),
        ExecuteOutcome::Denied { reason_code } => (format!("denied: {reason_code}"), true),
        ExecuteOutcome::InvalidArgs { message } => (format!("invalid arguments: {message}"), true),
        ExecuteOutcome::Timeout => ("tool call timed out".to_string(), true),
        ExecuteOutcome::Error { kind, message } => (format!("{kind}: {message}"), true),
    }
}

/// A deterministic, operator-facing assistant message carrying the
/// trace id and a stable reason code, used whenever terminal synthesis
/// itself fails.
fn placeholder_text(ctx: &TraceContext, reason: TerminalSynthesisReason) -> String {
    format!(
        "I couldn't produce a response right now (trace {}, reason: {}).",
        ctx.trace_id,
        reason.as_str()
    )
}

// `Decimal` is re-exported for downstream cost accounting consumers
// (warden-app) without forcing them to depend on rust_decimal directly
// for this one type.
pub use rust_decimal::Decimal as StepCostDecimal;
const _: fn() -> Decimal = Decimal::default;
