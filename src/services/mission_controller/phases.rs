//! Phase algorithms (§4.1 Phases 1-4): the second half of the mission
//! controller. `mod.rs` owns construction and the public lifecycle
//! operations; this file owns the four research phases as a second
//! `impl MissionController` block.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult, MissionError, SubstrateError};
use crate::domain::models::{
    GoalPadEntry, GoalStatus, LogStatus, Mission, MissionContext, MissionOptions, MissionStatus, ModelTier, Note, Page, PlanOutput,
    ProposedNote, QuestionNode, ReportVersion, Section,
};

use crate::services::circuit_breaker::CircuitScope;
use crate::services::event_bus::{EventPayload, MissionPhase};
use crate::services::hybrid_retriever::{RetrievalQuery, RetrievedChunk};
use crate::services::note_assignment::AssignmentBounds;
use crate::services::note_store::AddOutcome;
use crate::services::planning_agent::PlanningInput;
use crate::services::reflection_agent::ReflectionInput;
use crate::services::web_collector::WebFinding;
use crate::services::writing_agent::{PreviousPass, WritingInput};

use super::MissionController;

/// Outcome of a full `drive_mission` pass.
enum Outcome {
    Completed,
    Stopped,
}

impl MissionController {
    /// Background task spawned by `start`/`resume` (§4.1). Drives the
    /// mission through all four phases, finalizing its status whatever
    /// the outcome.
    pub(super) async fn run_mission(self: Arc<Self>, mission_id: Uuid) {
        let status = match self.drive_mission(mission_id).await {
            Ok(Outcome::Completed) => MissionStatus::Completed,
            Ok(Outcome::Stopped) => MissionStatus::Stopped,
            Err(DomainError::Mission(MissionError::Cancelled)) => MissionStatus::Stopped,
            Err(err) => {
                tracing::error!(%mission_id, %err, "mission failed");
                MissionStatus::Failed
            }
        };
        if let Err(err) = self.finish(mission_id, status).await {
            tracing::error!(%mission_id, %err, "failed to finalize mission");
        }
    }

    async fn finish(&self, mission_id: Uuid, status: MissionStatus) -> DomainResult<()> {
        self.transition_mission(mission_id, status).await?;
        let runtime = self.runtime_for(mission_id).await;
        runtime.events.publish(EventPayload::MissionStatus { status });
        Ok(())
    }

    /// Runs Phases 1-4 in sequence (§4.1), persisting context after every
    /// phase and bailing out early if the mission was stopped.
    async fn drive_mission(self: &Arc<Self>, mission_id: Uuid) -> DomainResult<Outcome> {
        let runtime = self.runtime_for(mission_id).await;
        let cancel = runtime.cancel.clone();
        let events = Arc::clone(&runtime.events);

        let mission = self.require_mission(mission_id).await?;
        let mut context = self.require_context(mission_id).await?;

        events.publish(EventPayload::PhaseTransition { phase: MissionPhase::Planning });
        self.run_planning_phase(&mission, &mut context, &cancel).await?;
        self.persist_context(mission_id, &context).await?;
        self.transition_mission(mission_id, MissionStatus::Running).await?;
        if cancel.is_cancelled() {
            return Ok(Outcome::Stopped);
        }

        events.publish(EventPayload::PhaseTransition { phase: MissionPhase::InitialExploration });
        self.run_initial_exploration_phase(&mission, &mut context, &cancel).await?;
        self.persist_context(mission_id, &context).await?;
        if cancel.is_cancelled() {
            return Ok(Outcome::Stopped);
        }

        events.publish(EventPayload::PhaseTransition { phase: MissionPhase::StructuredResearch });
        self.run_structured_research_phase(&mission, &mut context, &cancel).await?;
        self.persist_context(mission_id, &context).await?;
        if cancel.is_cancelled() {
            return Ok(Outcome::Stopped);
        }

        events.publish(EventPayload::PhaseTransition { phase: MissionPhase::Writing });
        self.run_writing_phase(&mission, &mut context, &cancel).await?;
        self.persist_context(mission_id, &context).await?;

        Ok(Outcome::Completed)
    }

    // -- Phase 1: Planning --

    /// §4.1 Phase 1: produces or revises the outline and question tree,
    /// enforcing the depth/node ceilings the Planning Agent's output is
    /// not itself bound by.
    pub(super) async fn run_planning_phase(&self, mission: &Mission, context: &mut MissionContext, cancel: &CancellationToken) -> DomainResult<()> {
        let prior_outline = if context.plan.sections.is_empty() { None } else { Some(context.plan.clone()) };
        let tier = self.planning_agent.tier();
        let agent = Arc::clone(&self.planning_agent);

        let build_input = |findings_summary: String| PlanningInput {
            mission_request: mission.request_text.clone(),
            prior_outline: prior_outline.clone(),
            findings_summary,
            max_context_chars: self.config.max_planning_context_chars,
        };

        let input = build_input(summarize_thought_pad(context));
        let result = self
            .call_llm(cancel, tier, {
                let agent = Arc::clone(&agent);
                let input = input.clone();
                move || {
                    let agent = Arc::clone(&agent);
                    let input = input.clone();
                    async move { agent.plan(input).await }
                }
            })
            .await;

        let result = match result {
            Err(DomainError::Substrate(SubstrateError::ContextOverflow { needed, limit })) => {
                tracing::warn!(mission_id = %mission.id, needed, limit, "planning context overflow, dropping oldest thought_pad entries and retrying once");
                context.thought_pad.drop_oldest(self.config.context_overflow_trim_entries);
                let retry_input = build_input(summarize_thought_pad(context));
                self.call_llm(cancel, tier, {
                    let agent = Arc::clone(&agent);
                    let input = retry_input.clone();
                    move || {
                        let agent = Arc::clone(&agent);
                        let input = input.clone();
                        async move { agent.plan(input).await }
                    }
                })
                .await
            }
            other => other,
        };

        let plan = match result {
            Ok(r) => r,
            Err(err) => return self.log_and_continue_on_transient(mission.id, err, "planning_agent", "plan", "mission request").await,
        };

        let cost = self.cost_meter.record(mission.id, tier, plan.tokens).await;
        self.log_call(mission.id, "planning_agent", "plan", "mission request", "outline produced", plan.model_details, plan.tokens, cost).await;

        let PlanOutput { outline: proposed_outline, question_tree } = plan.plan;
        let mut outline = context.plan.clone().reconcile_revision(proposed_outline);
        cap_outline_depth(&mut outline, self.config.max_total_depth);
        context.plan = outline;

        let mut tree = question_tree;
        cap_question_tree(&mut tree, self.config.initial_research_max_depth, self.config.initial_research_max_questions);
        context.question_tree = tree;
        context.touch();

        let runtime = self.runtime_for(mission.id).await;
        runtime.events.publish(EventPayload::PlanUpdate { revision_notes: context.plan.revision_notes.clone() });
        Ok(())
    }

    // -- Phase 2: Initial exploration --

    /// §4.1 Phase 2: breadth-first over the question tree's leaves,
    /// synthesizing unassigned, `phase=initial`-tagged notes.
    pub(super) async fn run_initial_exploration_phase(&self, mission: &Mission, context: &mut MissionContext, cancel: &CancellationToken) -> DomainResult<()> {
        let leaves: Vec<QuestionNode> = QuestionNode::leaves_bfs(&context.question_tree).into_iter().cloned().collect();
        for question in leaves {
            self.explore_question(mission, context, &question, cancel).await?;
        }
        Ok(())
    }

    async fn explore_question(&self, mission: &Mission, context: &mut MissionContext, question: &QuestionNode, cancel: &CancellationToken) -> DomainResult<()> {
        let (chunks, web_findings) = self
            .retrieve_for_query(
                cancel,
                &question.question,
                &mission.options,
                self.config.initial_exploration_doc_results,
                self.config.initial_exploration_web_results,
            )
            .await?;

        if chunks.is_empty() && web_findings.is_empty() {
            self.log(mission.id, "research_agent", "initial_exploration", LogStatus::Warning, question.question.clone(), "zero retrieval results").await;
            return Ok(());
        }

        let source_material = build_source_material(&chunks, &web_findings);
        let result = self.propose_notes_for(&question.question, &source_material, cancel).await;
        let (batch, meta) = match result {
            Ok(pair) => pair,
            Err(err) => return self.log_and_continue_on_transient(mission.id, err, "research_agent", "initial_exploration", question.question.clone()).await,
        };

        let cost = self.cost_meter.record(mission.id, self.research_agent.tier(), meta.tokens).await;
        self.log_call(mission.id, "research_agent", "initial_exploration", question.question.clone(), format!("{} candidate notes", batch.notes.len()), meta.model_details, meta.tokens, cost)
            .await;

        for mut proposed in batch.notes {
            if !proposed.tags.iter().any(|t| t == "phase=initial") {
                proposed.tags.push("phase=initial".to_string());
            }
            self.admit_note(mission.id, context, proposed, None).await?;
        }
        Ok(())
    }

    // -- Phase 3: Structured research --

    /// §4.1 Phase 3: research/reflect/assign loop over outline sections,
    /// repeated `structured_research_rounds` times with a global
    /// reflection pass at the end of each round.
    pub(super) async fn run_structured_research_phase(&self, mission: &Mission, context: &mut MissionContext, cancel: &CancellationToken) -> DomainResult<()> {
        let mut total_iterations = 0usize;
        for _round in 0..self.config.structured_research_rounds {
            let sections: Vec<Section> = context.plan.preorder().into_iter().cloned().collect();
            for section in &sections {
                if total_iterations >= self.config.max_total_iterations {
                    tracing::warn!(mission_id = %mission.id, "max_total_iterations reached, advancing to writing");
                    return Ok(());
                }
                total_iterations += self.research_section(mission, context, section, cancel).await?;
            }
            self.run_global_reflection(mission, context, cancel).await?;
        }
        Ok(())
    }

    /// One outline section's research cycles (§4.1 Phase 3 step 1).
    /// Returns the number of cycles actually run, for the global
    /// iteration ceiling.
    async fn research_section(&self, mission: &Mission, context: &mut MissionContext, section: &Section, cancel: &CancellationToken) -> DomainResult<usize> {
        let mut cycles_run = 0usize;
        for _cycle in 0..self.config.max_research_cycles_per_section {
            cycles_run += 1;
            let topic = format!("{}: {}", section.title, section.description);

            let tier = self.research_agent.tier();
            let agent = Arc::clone(&self.research_agent);
            let topic_for_call = topic.clone();
            let max_queries = self.config.max_decomposed_queries;
            let decompose_result = self
                .call_llm(cancel, tier, move || {
                    let agent = Arc::clone(&agent);
                    let topic = topic_for_call.clone();
                    async move { agent.decompose_queries(&topic, max_queries).await }
                })
                .await;

            let (decomposition, meta) = match decompose_result {
                Ok(pair) => pair,
                Err(err) => {
                    self.log_and_continue_on_transient(mission.id, err, "research_agent", "decompose_queries", topic.clone()).await?;
                    continue;
                }
            };
            let cost = self.cost_meter.record(mission.id, tier, meta.tokens).await;
            self.log_call(mission.id, "research_agent", "decompose_queries", topic.clone(), format!("{} queries", decomposition.queries.len()), meta.model_details, meta.tokens, cost)
                .await;

            for query in decomposition.queries {
                let (chunks, web_findings) = self
                    .retrieve_for_query(cancel, &query, &mission.options, self.config.main_research_doc_results, self.config.main_research_web_results)
                    .await?;
                if chunks.is_empty() && web_findings.is_empty() {
                    self.log(mission.id, "research_agent", "retrieve", LogStatus::Warning, query.clone(), "zero retrieval results").await;
                    continue;
                }

                let source_material = build_source_material(&chunks, &web_findings);
                let notes_result = self.propose_notes_for(&query, &source_material, cancel).await;
                let (batch, meta) = match notes_result {
                    Ok(pair) => pair,
                    Err(err) => {
                        self.log_and_continue_on_transient(mission.id, err, "research_agent", "propose_notes", query.clone()).await?;
                        continue;
                    }
                };
                let cost = self.cost_meter.record(mission.id, self.research_agent.tier(), meta.tokens).await;
                self.log_call(mission.id, "research_agent", "propose_notes", query.clone(), format!("{} candidate notes", batch.notes.len()), meta.model_details, meta.tokens, cost)
                    .await;

                for proposed in batch.notes {
                    self.admit_note(mission.id, context, proposed, Some(section.id)).await?;
                }
            }

            self.assign_notes_for_section(mission.id, context, section).await?;

            let has_gaps = self.reflect_on_section(mission, context, section, cancel).await?;
            if !has_gaps {
                break;
            }
        }
        Ok(cycles_run)
    }

    /// §4.1 "Note assignment algorithm": re-ranks the section's candidate
    /// pool (currently-assigned notes plus every unassigned note) and
    /// persists the resulting assignment.
    async fn assign_notes_for_section(&self, mission_id: Uuid, context: &mut MissionContext, section: &Section) -> DomainResult<()> {
        // `NoteStore::list` ignores paging and returns the full set.
        let all_notes = self.note_store.list(mission_id, Page::new(0, usize::MAX)).await?;
        let assigned_ids: HashSet<Uuid> = context.assigned_notes(section.id).iter().copied().collect();
        let (currently_assigned, unassigned): (Vec<Note>, Vec<Note>) = all_notes.into_iter().partition(|n| assigned_ids.contains(&n.note_id));

        let bounds = AssignmentBounds {
            min_notes: self.config.min_notes_per_section_assignment,
            max_notes: self.config.max_notes_per_section_assignment,
            max_for_reranking: self.config.max_notes_for_assignment_reranking,
        };
        let description = format!("{}: {}", section.title, section.description);
        let assigned = self.note_assignment.assign_for_section(&description, currently_assigned, unassigned, bounds).await?;

        for note in &assigned {
            self.note_store.assign(note.note_id, section.id).await?;
            context.assign_note(section.id, note.note_id);
        }
        context.touch();
        Ok(())
    }

    /// §4.1 Phase 3 step 1.b: Reflection Agent verdict on one section's
    /// coverage. Returns whether it reported any gaps.
    async fn reflect_on_section(&self, mission: &Mission, context: &MissionContext, section: &Section, cancel: &CancellationToken) -> DomainResult<bool> {
        let notes = self.note_store.list_by_section(mission.id, section.id).await?;
        let input = ReflectionInput {
            outline_summary: format!("{}: {}", section.title, section.description),
            notes_summary: summarize_notes(&notes),
            goal_pad_summary: summarize_goal_pad(context),
        };

        let tier = self.reflection_agent.tier();
        let agent = Arc::clone(&self.reflection_agent);
        let input_for_call = input.clone();
        let result = self
            .call_llm(cancel, tier, move || {
                let agent = Arc::clone(&agent);
                let input = input_for_call.clone();
                async move { agent.reflect(input).await }
            })
            .await;

        let reflection = match result {
            Ok(r) => r,
            Err(err) => {
                self.log_and_continue_on_transient(mission.id, err, "reflection_agent", "reflect_section", section.title.clone()).await?;
                return Ok(false);
            }
        };
        let cost = self.cost_meter.record(mission.id, tier, reflection.tokens).await;
        self.log_call(
            mission.id,
            "reflection_agent",
            "reflect_section",
            section.title.clone(),
            format!("{} gaps", reflection.critique.gaps.len()),
            reflection.model_details,
            reflection.tokens,
            cost,
        )
        .await;

        Ok(reflection.critique.has_gaps())
    }

    /// §4.1 Phase 3 step 2: whole-mission reflection at the end of a
    /// round. May append to the thought/goal pads and, unless
    /// `skip_final_replanning`, trigger a re-plan that preserves existing
    /// notes.
    async fn run_global_reflection(&self, mission: &Mission, context: &mut MissionContext, cancel: &CancellationToken) -> DomainResult<()> {
        let notes = self.note_store.list(mission.id, Page::new(0, usize::MAX)).await?;
        let input = ReflectionInput {
            outline_summary: summarize_outline(context),
            notes_summary: summarize_notes(&notes),
            goal_pad_summary: summarize_goal_pad(context),
        };

        let tier = self.reflection_agent.tier();
        let agent = Arc::clone(&self.reflection_agent);
        let input_for_call = input.clone();
        let result = self
            .call_llm(cancel, tier, move || {
                let agent = Arc::clone(&agent);
                let input = input_for_call.clone();
                async move { agent.reflect(input).await }
            })
            .await;

        let reflection = match result {
            Ok(r) => r,
            Err(err) => return self.log_and_continue_on_transient(mission.id, err, "reflection_agent", "global_reflection", "full mission context").await,
        };
        let cost = self.cost_meter.record(mission.id, tier, reflection.tokens).await;
        self.log_call(
            mission.id,
            "reflection_agent",
            "global_reflection",
            "full mission context",
            format!("{} gaps, replan={}", reflection.critique.gaps.len(), reflection.critique.trigger_replan),
            reflection.model_details,
            reflection.tokens,
            cost,
        )
        .await;

        for thought in reflection.critique.new_thoughts {
            context.thought_pad.push("reflection_agent", thought);
        }
        for goal_text in reflection.critique.new_goals {
            context.goal_pad.push(GoalPadEntry { goal_id: Uuid::new_v4(), text: goal_text, status: GoalStatus::Active, source_agent: "reflection_agent".into() });
        }
        context.touch();

        if reflection.critique.trigger_replan && !self.config.skip_final_replanning {
            self.persist_context(mission.id, context).await?;
            self.run_planning_phase(mission, context, cancel).await?;
            *context = self.require_context(mission.id).await?;
        }

        Ok(())
    }

    // -- Phase 4: Writing --

    /// §4.1 Phase 4: pass 1 drafts every section in outline order; passes
    /// 2..N critique then revise section-by-section. A new
    /// `ReportVersion` is stored at the end of every pass.
    pub(super) async fn run_writing_phase(&self, mission: &Mission, context: &mut MissionContext, cancel: &CancellationToken) -> DomainResult<()> {
        let sections: Vec<Section> = context.plan.preorder().into_iter().cloned().collect();
        let mut drafts: HashMap<Uuid, String> = HashMap::new();

        for pass in 0..self.config.writing_passes {
            let mut revision_guidance: HashMap<Uuid, String> = HashMap::new();
            if pass > 0 {
                for section in &sections {
                    if let Some(guidance) = self.critique_draft_section(mission, context, section, drafts.get(&section.id), cancel).await? {
                        revision_guidance.insert(section.id, guidance);
                    }
                }
            }

            let mut preceding_preview = String::new();
            for section in &sections {
                let assigned_ids = context.assigned_notes(section.id).to_vec();
                let notes = self.note_store.get_many(&assigned_ids).await?;

                let previous_owned = if pass == 0 {
                    None
                } else {
                    let content = drafts.get(&section.id).cloned().unwrap_or_default();
                    let guidance = revision_guidance.get(&section.id).cloned().unwrap_or_else(|| "no specific feedback; polish for clarity and citation coverage".to_string());
                    Some((content, guidance))
                };
                let previous_pass = previous_owned.as_ref().map(|(content, guidance)| PreviousPass { content_markdown: content.as_str(), revision_guidance: guidance.as_str() });

                let input = WritingInput {
                    section,
                    assigned_notes: &notes,
                    previous_pass,
                    preceding_sections_preview: &preceding_preview,
                    previous_content_preview_chars: self.config.writing_previous_content_preview_chars,
                    max_context_chars: self.config.writing_agent_max_context_chars,
                };

                let tier = self.writing_agent.tier();
                let agent = Arc::clone(&self.writing_agent);
                let input_for_call = input.clone();
                let result = self
                    .call_llm(cancel, tier, {
                        let agent = Arc::clone(&agent);
                        let input = input_for_call.clone();
                        move || {
                            let agent = Arc::clone(&agent);
                            let input = input.clone();
                            async move { agent.write(input).await }
                        }
                    })
                    .await;

                let result = match result {
                    Err(DomainError::Substrate(SubstrateError::ContextOverflow { needed, limit })) => {
                        tracing::warn!(mission_id = %mission.id, needed, limit, section = %section.title, "writing context overflow, halving preview chars and retrying once");
                        let mut trimmed_input = input_for_call.clone();
                        trimmed_input.previous_content_preview_chars /= 2;
                        self.call_llm(cancel, tier, {
                            let agent = Arc::clone(&agent);
                            let input = trimmed_input;
                            move || {
                                let agent = Arc::clone(&agent);
                                let input = input.clone();
                                async move { agent.write(input).await }
                            }
                        })
                        .await
                    }
                    other => other,
                };

                let written = match result {
                    Ok(r) => r,
                    Err(err) => {
                        self.log_and_continue_on_transient(mission.id, err, "writing_agent", "write_section", section.title.clone()).await?;
                        continue;
                    }
                };
                let cost = self.cost_meter.record(mission.id, tier, written.tokens).await;
                self.log_call(
                    mission.id,
                    "writing_agent",
                    "write_section",
                    section.title.clone(),
                    format!("{} chars", written.content_markdown.chars().count()),
                    written.model_details,
                    written.tokens,
                    cost,
                )
                .await;

                preceding_preview.push_str(&written.content_markdown);
                preceding_preview.push('\n');
                drafts.insert(section.id, written.content_markdown);
            }

            let assembled = assemble_report(&sections, &drafts);
            let prior_versions = self.report_repository.list(mission.id).await?;
            let revision_notes = if pass == 0 { None } else { Some(format!("writing pass {}", pass + 1)) };
            let version = ReportVersion::next(&prior_versions, assembled, None, revision_notes);
            self.report_repository.append(mission.id, &version).await?;

            let mut mission_row = self.require_mission(mission.id).await?;
            mission_row.current_report_version = Some(version.version);
            self.mission_repository.update(&mission_row).await?;

            let runtime = self.runtime_for(mission.id).await;
            runtime.events.publish(EventPayload::DraftUpdate { version: Box::new(version) });
        }

        Ok(())
    }

    /// Reflection pass over one section's current draft, ahead of a
    /// revision pass. Returns `None` when the call failed and was
    /// downgraded to a warning (section keeps its prior draft verbatim).
    async fn critique_draft_section(&self, mission: &Mission, context: &MissionContext, section: &Section, draft: Option<&String>, cancel: &CancellationToken) -> DomainResult<Option<String>> {
        let Some(draft) = draft else {
            return Ok(None);
        };
        let input = ReflectionInput {
            outline_summary: format!("Current draft of '{}':\n{draft}", section.title),
            notes_summary: summarize_goal_pad(context),
            goal_pad_summary: String::new(),
        };

        let tier = self.reflection_agent.tier();
        let agent = Arc::clone(&self.reflection_agent);
        let input_for_call = input.clone();
        let result = self
            .call_llm(cancel, tier, move || {
                let agent = Arc::clone(&agent);
                let input = input_for_call.clone();
                async move { agent.reflect(input).await }
            })
            .await;

        let reflection = match result {
            Ok(r) => r,
            Err(err) => {
                self.log_and_continue_on_transient(mission.id, err, "reflection_agent", "critique_draft", section.title.clone()).await?;
                return Ok(None);
            }
        };
        let cost = self.cost_meter.record(mission.id, tier, reflection.tokens).await;
        self.log_call(mission.id, "reflection_agent", "critique_draft", section.title.clone(), format!("{} gaps", reflection.critique.gaps.len()), reflection.model_details, reflection.tokens, cost)
            .await;

        if !reflection.critique.has_gaps() {
            return Ok(None);
        }
        let guidance = reflection.critique.gaps.iter().map(|g| g.description.clone()).collect::<Vec<_>>().join("; ");
        Ok(Some(guidance))
    }

    // -- shared helpers --

    /// Acquires a concurrency permit, then routes the call through the
    /// circuit breaker (scoped by LLM tier) and the retry policy: the
    /// standard governor → breaker → retry composition around every
    /// outbound model call.
    ///
    /// `ContextOverflow` errors pass straight through uncounted by the
    /// breaker and unretried by the backoff loop (§7) — callers with a
    /// concrete trim action (dropping `thought_pad` entries, cutting
    /// source material, halving preview chars) catch it here and retry
    /// once with trimmed input; callers without one fall through to
    /// `log_and_continue_on_transient`'s warning-and-skip.
    async fn call_llm<F, Fut, T>(&self, cancel: &CancellationToken, tier: ModelTier, op: F) -> DomainResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, SubstrateError>>,
    {
        let _permit = self.governor.acquire(cancel).await?;
        let scope = CircuitScope::LlmTier(tier);
        let value = self.circuit_breakers.call(scope, || self.retry_policy.execute(&op)).await?;
        Ok(value)
    }

    /// Runs the Research Agent's `propose_notes` call under the same
    /// governor/breaker/retry composition as `call_llm`. On a
    /// `ContextOverflow`, cuts `source_material` down to
    /// `research_note_content_limit` chars and retries exactly once (§7).
    async fn propose_notes_for(
        &self,
        question: &str,
        source_material: &str,
        cancel: &CancellationToken,
    ) -> DomainResult<(crate::domain::models::NoteBatch, crate::services::research_agent::AgentCallMeta)> {
        let tier = self.research_agent.tier();
        let agent = Arc::clone(&self.research_agent);
        let question = question.to_string();
        let limit = self.config.research_note_content_limit;

        let call = |agent: Arc<crate::services::research_agent::ResearchAgent>, question: String, source_material: String| {
            self.call_llm(cancel, tier, move || {
                let agent = Arc::clone(&agent);
                let question = question.clone();
                let source_material = source_material.clone();
                async move { agent.propose_notes(&question, &source_material, limit).await }
            })
        };

        let result = call(Arc::clone(&agent), question.clone(), source_material.to_string()).await;
        match result {
            Err(DomainError::Substrate(SubstrateError::ContextOverflow { needed, limit: overflow_limit })) => {
                tracing::warn!(needed, limit = overflow_limit, question = %question, "research context overflow, truncating source material and retrying once");
                let trimmed: String = source_material.chars().take(limit).collect();
                call(agent, question, trimmed).await
            }
            other => other,
        }
    }

    /// Retrieval for one query: document chunks (only when the mission
    /// has a document group) and web findings (only when web search is
    /// enabled), both bounded by the concurrency governor.
    async fn retrieve_for_query(
        &self,
        cancel: &CancellationToken,
        query_text: &str,
        options: &MissionOptions,
        doc_k: usize,
        web_k: usize,
    ) -> DomainResult<(Vec<RetrievedChunk>, Vec<WebFinding>)> {
        let chunks = if let Some(doc_group_id) = options.doc_group_id {
            let _permit = self.governor.acquire(cancel).await?;
            self.retriever
                .retrieve(RetrievalQuery { query_text: query_text.to_string(), doc_group_id: Some(doc_group_id), k: doc_k, weights: self.config.rag.hybrid_weights })
                .await?
        } else {
            Vec::new()
        };

        let web_findings = if options.use_web {
            let _permit = self.governor.acquire(cancel).await?;
            self.web.collect(query_text, web_k).await
        } else {
            Vec::new()
        };

        Ok((chunks, web_findings))
    }

    /// Admits a proposed note into the note store and, when it carries a
    /// section assignment, into the mission context too. Returns the
    /// note id only when the note was newly inserted (not deduplicated,
    /// not rejected for a missing citation).
    async fn admit_note(&self, mission_id: Uuid, context: &mut MissionContext, proposed: ProposedNote, section_id: Option<Uuid>) -> DomainResult<Option<Uuid>> {
        let Some(mut note) = Note::try_new(mission_id, proposed.content, proposed.source_ref, proposed.tags) else {
            self.log(mission_id, "research_agent", "admit_note", LogStatus::Warning, "proposed note", "rejected: missing verbatim citation").await;
            return Ok(None);
        };
        note.section_id = section_id;

        let outcome = self.note_store.add(note).await?;
        let note_id = outcome.note().note_id;
        if !context.note_ids.contains(&note_id) {
            context.note_ids.push(note_id);
        }
        if let Some(section_id) = section_id {
            self.note_store.assign(note_id, section_id).await?;
            context.assign_note(section_id, note_id);
        }
        context.touch();

        if let AddOutcome::Inserted(inserted) = &outcome {
            let runtime = self.runtime_for(mission_id).await;
            runtime.events.publish(EventPayload::NoteAdded { note: Box::new(inserted.clone()) });
            Ok(Some(note_id))
        } else {
            Ok(None)
        }
    }

    /// Downgrades a failed agent call to a `warning` log and resumes the
    /// caller's phase, unless the failure was the mission being
    /// cancelled, in which case it propagates so `drive_mission` unwinds.
    async fn log_and_continue_on_transient(&self, mission_id: Uuid, err: DomainError, agent_name: &str, action: &str, input_summary: impl Into<String>) -> DomainResult<()> {
        if matches!(err, DomainError::Mission(MissionError::Cancelled)) {
            return Err(err);
        }
        self.log(mission_id, agent_name, action, LogStatus::Warning, input_summary, format!("unit skipped after failure: {err}")).await;
        Ok(())
    }
}

/// §4.1 Phase 1 cap: truncates the outline to at most `max_depth` levels.
fn cap_outline_depth(outline: &mut crate::domain::models::Outline, max_depth: usize) {
    for section in &mut outline.sections {
        cap_section_depth(section, max_depth, 1);
    }
}

fn cap_section_depth(section: &mut Section, max_depth: usize, depth: usize) {
    if depth >= max_depth {
        section.subsections.clear();
        return;
    }
    for child in &mut section.subsections {
        cap_section_depth(child, max_depth, depth + 1);
    }
}

/// §4.1 Phase 1 caps: truncates the question tree to at most `max_depth`
/// levels and `max_nodes` total nodes (breadth-first, so shallow
/// breadth survives before deep branches do).
fn cap_question_tree(tree: &mut Vec<QuestionNode>, max_depth: usize, max_nodes: usize) {
    for node in tree.iter_mut() {
        cap_node_depth(node, max_depth, 1);
    }
    let mut remaining = max_nodes;
    for node in tree.iter_mut() {
        cap_node_count(node, &mut remaining);
    }
}

fn cap_node_depth(node: &mut QuestionNode, max_depth: usize, depth: usize) {
    if depth >= max_depth {
        node.children.clear();
        return;
    }
    for child in &mut node.children {
        cap_node_depth(child, max_depth, depth + 1);
    }
}

fn cap_node_count(node: &mut QuestionNode, remaining: &mut usize) {
    if *remaining == 0 {
        node.children.clear();
        return;
    }
    *remaining -= 1;
    let mut kept = Vec::new();
    for mut child in std::mem::take(&mut node.children) {
        if *remaining == 0 {
            break;
        }
        cap_node_count(&mut child, remaining);
        kept.push(child);
    }
    node.children = kept;
}

/// Renders retrieved chunks and web findings into one prompt-ready block,
/// each entry prefixed with the exact citation text `Note::try_new`
/// requires the agent to quote back verbatim.
fn build_source_material(chunks: &[RetrievedChunk], web_findings: &[WebFinding]) -> String {
    let mut out = String::new();
    for chunk in chunks {
        out.push_str(&format!("[doc:{}#chunk:{}] {}\n\n", chunk.doc_id, chunk.chunk_id, chunk.text));
    }
    for finding in web_findings {
        let body = finding.page.as_ref().map(|p| p.content_markdown.as_str()).unwrap_or(finding.result.snippet.as_str());
        out.push_str(&format!("[{}] {}\n\n", finding.result.url, body));
    }
    out
}

fn summarize_thought_pad(context: &MissionContext) -> String {
    context.thought_pad.entries().map(|e| format!("- ({}) {}", e.agent_name, e.content)).collect::<Vec<_>>().join("\n")
}

fn summarize_goal_pad(context: &MissionContext) -> String {
    context
        .goal_pad
        .iter()
        .filter(|g| g.status == GoalStatus::Active)
        .map(|g| format!("- {}", g.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn summarize_outline(context: &MissionContext) -> String {
    context.plan.preorder().into_iter().map(|s| format!("- {}: {}", s.title, s.description)).collect::<Vec<_>>().join("\n")
}

fn summarize_notes(notes: &[Note]) -> String {
    notes.iter().map(|n| format!("- {}", n.content)).collect::<Vec<_>>().join("\n")
}

/// Concatenates drafted sections in outline order into one report body.
/// Sections with no draft (e.g. skipped after repeated failures) are
/// rendered with their title only, so the report still enumerates the
/// full outline.
fn assemble_report(sections: &[Section], drafts: &HashMap<Uuid, String>) -> String {
    let mut out = String::new();
    for section in sections {
        out.push_str(&format!("## {}\n\n", section.title));
        match drafts.get(&section.id) {
            Some(content) => out.push_str(content),
            None => out.push_str("_No content was drafted for this section._"),
        }
        out.push_str("\n\n");
    }
    out
}
