//! The dual-log story store
//!
//! A [`Story`] keeps two logs of one conversation. The archived log holds
//! every message ever recorded, with deletions applied. The working log is
//! what the teller sees: the instruction, an optional setting, then either
//! the whole archive or a summary of its older part followed by the last
//! `uncondensed` archived messages verbatim. Whenever the working log grows
//! past `max_prompt_tokens`, its older part is condensed again.

use std::path::Path;
use std::sync::Arc;

use tale_ai::{Message, Prompt, Role, Teller};

use crate::condenser::Condense;
use crate::config::StoryConfig;
use crate::error::{Error, Result};
use crate::index::{Placement, translate_boundary, translate_index};
use crate::paraphrase::Paraphraser;
use crate::policy::NarrativePolicy;
use crate::snapshot::StorySnapshot;

/// Reason for condensing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondenseReason {
    /// Working log grew past the token budget
    Threshold,
    /// The teller rejected the working log as too large
    Overflow,
    /// An edit reached into the condensed region
    Edit,
    /// Requested by the caller
    Manual,
}

/// Result of a condensation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CondenseReport {
    pub reason: CondenseReason,
    /// The installed summary; `None` when nothing was old enough to condense
    pub summary: Option<String>,
    pub tokens_before: usize,
    pub tokens_after: usize,
    /// Whether the summary was built from the archive rather than the working log
    pub from_archive: bool,
    /// Messages kept verbatim after the summary
    pub preserved: usize,
}

struct Condensation {
    summary: Option<String>,
    tail: Vec<Message>,
}

/// A self-condensing conversation log.
///
/// A story serves one conversation for one caller. It can move between tasks
/// but must not be driven by several at once.
pub struct Story {
    id: String,
    created_at: i64,
    teller: Arc<dyn Teller>,
    policy: Box<dyn NarrativePolicy>,
    condenser: Box<dyn Condense>,
    config: StoryConfig,
    instruction: String,
    archived: Prompt,
    working: Prompt,
    prompt_tokens: usize,
    uncondensed: usize,
    condensing_from_archive: bool,
}

impl Story {
    pub fn new(
        teller: Arc<dyn Teller>,
        policy: Box<dyn NarrativePolicy>,
        config: StoryConfig,
    ) -> Self {
        let instruction = config
            .instruction
            .clone()
            .unwrap_or_else(|| policy.default_instruction(&teller.roles()));
        let condenser = policy.condenser(teller.clone(), config.condense_folds);
        let archived = teller.create_prompt();

        let mut story = Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
            working: archived.clone(),
            archived,
            teller,
            policy,
            condenser,
            config,
            instruction,
            prompt_tokens: 0,
            uncondensed: 0,
            condensing_from_archive: true,
        };
        story.working = story.head();
        story.recount();
        story
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Creation time, ms since the Unix epoch
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Every message recorded so far
    pub fn archived(&self) -> &Prompt {
        &self.archived
    }

    /// What the teller is sent
    pub fn working(&self) -> &Prompt {
        &self.working
    }

    pub fn prompt_tokens(&self) -> usize {
        self.prompt_tokens
    }

    /// Number of trailing archived messages present verbatim in the working log
    pub fn uncondensed(&self) -> usize {
        self.uncondensed
    }

    /// Whether the next condensation reads the archive (or refolds the working log)
    pub fn condensing_from_archive(&self) -> bool {
        self.condensing_from_archive
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn setting(&self) -> Option<&str> {
        self.config.setting.as_deref()
    }

    pub fn teller(&self) -> &Arc<dyn Teller> {
        &self.teller
    }

    pub fn policy(&self) -> &dyn NarrativePolicy {
        self.policy.as_ref()
    }

    /// Add a user message. With `replace`, a trailing user message in the
    /// archive is overwritten instead.
    pub async fn add(&mut self, content: impl Into<String>, replace: bool) -> Result<()> {
        let content = content.into();
        if replace && self.archived.last_role() == Some(Role::User) {
            return self.replace(content, -1).await;
        }
        self.record(Message::user(content));
        self.condense_if_over_budget().await
    }

    /// Record a bot message produced elsewhere, as if it had been generated
    pub async fn add_response(&mut self, content: impl Into<String>) -> Result<()> {
        self.record(Message::bot(content));
        self.condense_if_over_budget().await
    }

    /// Overwrite the archived message at `index`
    pub async fn replace(&mut self, content: impl Into<String>, index: isize) -> Result<()> {
        let content = content.into();
        let placement = translate_index(index, self.archived.len(), self.uncondensed)?;
        self.archived.replace(content.clone(), index)?;

        match placement {
            Placement::Condensed => self.recondense().await,
            Placement::Verbatim(offset) => {
                let old = self.teller.size_of_message(self.working.message(offset)?);
                self.working.replace(content, offset)?;
                let new = self.teller.size_of_message(self.working.message(offset)?);
                self.prompt_tokens = self.prompt_tokens + new - old;
                tracing::debug!(
                    "Replaced working message {}: {} -> {} tokens",
                    offset,
                    old,
                    new
                );
                self.condense_if_over_budget().await
            }
        }
    }

    /// Insert messages before archive position `at`, or append when `None`
    pub async fn insert(&mut self, messages: Vec<Message>, at: Option<isize>) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        let placement = match at {
            Some(at) => translate_boundary(at, self.archived.len(), self.uncondensed)?,
            None => Placement::Verbatim(0),
        };
        let count = self.archived.insert(messages.clone(), at)?;

        match placement {
            Placement::Condensed => self.recondense().await,
            Placement::Verbatim(offset) => {
                self.working.insert(messages, (offset < 0).then_some(offset))?;
                self.uncondensed += count;
                self.recount();
                self.condense_if_over_budget().await
            }
        }
    }

    /// Delete the archived range `begin..end` (`None` meaning to the end).
    /// Returns the number of messages removed.
    pub async fn delete(&mut self, begin: isize, end: Option<isize>) -> Result<usize> {
        let len = self.archived.len();
        let first = translate_index(begin, len, self.uncondensed)?;
        let last = match end {
            Some(end) => translate_boundary(end, len, self.uncondensed)?,
            None => Placement::Verbatim(0),
        };
        let removed = self.archived.delete(begin, end)?;

        match (first, last) {
            (Placement::Verbatim(first), Placement::Verbatim(last)) => {
                self.working.delete(first, (last < 0).then_some(last))?;
                self.uncondensed -= removed;
                self.recount();
            }
            (_, last) => {
                // The range may run on into the mirrored tail; drop that part
                // first so a fallback to the working log cannot resurrect it.
                if let Placement::Verbatim(last) = last {
                    let mirrored = self.uncondensed as isize + last;
                    if mirrored > 0 {
                        self.working
                            .delete(-(self.uncondensed as isize), (last < 0).then_some(last))?;
                        self.uncondensed -= mirrored as usize;
                        self.recount();
                    }
                }
                self.recondense().await?;
            }
        }
        Ok(removed)
    }

    /// Generate the next bot message. With `redo`, a trailing bot message is
    /// discarded and generated afresh.
    pub async fn generate(&mut self, redo: bool) -> Result<String> {
        if redo && self.archived.last_role() == Some(Role::Bot) {
            self.delete(-1, None).await?;
        }

        let response = match self.teller.generate(&mut self.working, false).await {
            Ok(response) => response,
            Err(e) if e.is_context_overflow() => {
                tracing::warn!("Teller rejected the working log ({}), condensing and retrying", e);
                self.run_condense(CondenseReason::Overflow).await?;
                self.teller.generate(&mut self.working, false).await?
            }
            Err(e) => return Err(e.into()),
        };

        // The teller has already appended the reply to the working log
        let message = Message::bot(response.clone());
        self.prompt_tokens += self.teller.size_of_message(&message);
        self.archived.push(message);
        self.uncondensed += 1;

        self.condense_if_over_budget().await?;
        Ok(response)
    }

    /// Condense now, regardless of the budget
    pub async fn condense(&mut self) -> Result<CondenseReport> {
        self.run_condense(CondenseReason::Manual).await
    }

    /// The summary currently standing in for older messages, if any
    pub fn condensed(&self) -> Option<&str> {
        let slot = self.summary_slot();
        if self.uncondensed + slot >= self.working.len() {
            None
        } else {
            self.working.get(slot as isize).ok()
        }
    }

    /// Install `summary` in the summary slot, creating the slot if needed
    pub fn set_condensed(&mut self, summary: impl Into<String>) -> Result<()> {
        let slot = self.summary_slot() as isize;
        if self.condensed().is_none() {
            self.working.insert([Message::bot(summary)], Some(slot))?;
        } else {
            self.working.replace(summary, slot)?;
        }
        self.recount();
        Ok(())
    }

    /// Export of the archived story, as the policy defines it
    pub fn story_text(&self) -> String {
        self.policy.story_text(&self.archived)
    }

    /// Condense the whole archive without touching the story
    pub async fn summarize(&self) -> Result<Option<String>> {
        let text = self.policy.condensable_text(&self.archived, 0);
        Ok(self.condenser.condense(&text).await?)
    }

    /// Ask for a rewrite of the last archived message. The story is not changed.
    pub async fn rework(&self, instruction: Option<&str>) -> Result<Option<String>> {
        let original = self.archived.get(-1)?.to_string();
        let paraphraser = Paraphraser::new(self.teller.clone(), original)
            .with_setting(self.config.setting.clone())
            .with_outline(self.policy.rework_outline(&self.archived));
        Ok(paraphraser.rephrase(instruction).await?)
    }

    pub fn snapshot(&self) -> StorySnapshot {
        StorySnapshot {
            id: self.id.clone(),
            created_at: self.created_at,
            story_type: self.policy.name().to_string(),
            teller: self.teller.name().to_string(),
            roles: self.archived.roles().clone(),
            story: self.archived.messages().to_vec(),
            uncondensed: self.uncondensed,
            condensing_from_archive: self.condensing_from_archive,
            max_prompt_tokens: self.config.max_prompt_tokens,
            preserved_from_condense: self.config.preserved_from_condense,
            condense_folds: self.config.condense_folds,
            condense_review: self.config.condense_review,
            instruction: self.instruction.clone(),
            setting: self.config.setting.clone(),
            condensed: self.condensed().map(str::to_string),
        }
    }

    /// Rebuild a story from a snapshot.
    ///
    /// With a saved summary the working log is reassembled directly. Without
    /// one the archive is replayed, so condensation happens as it would have.
    ///
    /// The saved role names are informational. Messages carry a [`Role`], so
    /// the restored story labels them with `teller`'s own names.
    pub async fn restore(
        teller: Arc<dyn Teller>,
        policy: Box<dyn NarrativePolicy>,
        snapshot: StorySnapshot,
    ) -> Result<Self> {
        if snapshot.story_type != policy.name() {
            return Err(Error::IncompatibleStory {
                expected: policy.name().to_string(),
                found: snapshot.story_type,
            });
        }
        if !teller.is_compatible(&snapshot.teller) {
            return Err(Error::IncompatibleTeller {
                expected: teller.name().to_string(),
                found: snapshot.teller,
            });
        }

        let config = StoryConfig {
            max_prompt_tokens: snapshot.max_prompt_tokens,
            condense_folds: snapshot.condense_folds,
            preserved_from_condense: snapshot.preserved_from_condense,
            condense_review: snapshot.condense_review,
            instruction: Some(snapshot.instruction),
            setting: snapshot.setting,
        };
        let mut story = Self::new(teller, policy, config);
        story.id = snapshot.id;
        story.created_at = snapshot.created_at;
        story.condensing_from_archive = snapshot.condensing_from_archive;

        match snapshot.condensed {
            Some(summary) => {
                let keep = snapshot.uncondensed.min(snapshot.story.len());
                let tail = snapshot.story[snapshot.story.len() - keep..].to_vec();
                story.archived.insert(snapshot.story, None)?;
                story.set_condensed(summary)?;
                story.working.insert(tail, None)?;
                story.uncondensed = keep;
                story.recount();
            }
            None => {
                for message in snapshot.story {
                    match message.role {
                        Role::System => story.record(message),
                        Role::User => story.add(message.content, false).await?,
                        Role::Bot => story.add_response(message.content).await?,
                    }
                }
            }
        }

        tracing::debug!(
            "Restored story {} with {} archived messages ({} verbatim)",
            story.id,
            story.archived.len(),
            story.uncondensed
        );
        Ok(story)
    }

    /// Save a snapshot as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.snapshot().write(path)
    }

    pub async fn load(
        path: impl AsRef<Path>,
        teller: Arc<dyn Teller>,
        policy: Box<dyn NarrativePolicy>,
    ) -> Result<Self> {
        let snapshot = StorySnapshot::read(path)?;
        Self::restore(teller, policy, snapshot).await
    }

    // --- Internals ---

    /// Instruction and optional setting, the fixed head of the working log
    fn head(&self) -> Prompt {
        let mut head = self.teller.create_prompt();
        head.system(self.instruction.clone(), false);
        if let Some(setting) = &self.config.setting {
            head.system(setting.clone(), false);
        }
        head
    }

    fn summary_slot(&self) -> usize {
        if self.config.setting.is_some() { 2 } else { 1 }
    }

    fn recount(&mut self) {
        self.prompt_tokens = self.teller.size_of_prompt(&self.working);
        tracing::debug!("Working log: {} tokens", self.prompt_tokens);
    }

    /// Append to both logs
    fn record(&mut self, message: Message) {
        self.prompt_tokens += self.teller.size_of_message(&message);
        self.archived.push(message.clone());
        self.working.push(message);
        self.uncondensed += 1;
    }

    async fn condense_if_over_budget(&mut self) -> Result<()> {
        if self.prompt_tokens > self.config.max_prompt_tokens {
            self.run_condense(CondenseReason::Threshold).await?;
        }
        Ok(())
    }

    /// Rebuild the summary from the archive after an edit into the condensed region
    async fn recondense(&mut self) -> Result<()> {
        self.condensing_from_archive = true;
        self.run_condense(CondenseReason::Edit).await?;
        Ok(())
    }

    async fn run_condense(&mut self, reason: CondenseReason) -> Result<CondenseReport> {
        let tokens_before = self.prompt_tokens;
        let mut from_archive = self.condensing_from_archive;

        let condensation = match self.condense_source(from_archive).await {
            Ok(condensation) => condensation,
            Err(e) if from_archive && e.is_context_overflow() => {
                tracing::warn!(
                    "Condensing from the archive overflowed ({}), refolding the working log from now on",
                    e
                );
                self.condensing_from_archive = false;
                from_archive = false;
                self.condense_source(false)
                    .await
                    .map_err(|e| self.condense_error(e))?
            }
            Err(e) => return Err(self.condense_error(e)),
        };

        let Condensation { summary, tail } = condensation;
        let preserved = tail.len();
        let mut working = self.head();
        if let Some(summary) = &summary {
            working.push(Message::bot(summary.clone()));
        }
        working.insert(tail, None)?;
        self.working = working;
        self.uncondensed = preserved;
        self.recount();

        if self.config.condense_review {
            if let Some(summary) = &summary {
                tracing::info!("Condensed summary:\n{}", summary);
            }
        }
        tracing::info!(
            "Condensed story ({:?}) from the {}: {} -> {} tokens, {} messages kept",
            reason,
            if from_archive { "archive" } else { "working log" },
            tokens_before,
            self.prompt_tokens,
            preserved
        );

        Ok(CondenseReport {
            reason,
            summary,
            tokens_before,
            tokens_after: self.prompt_tokens,
            from_archive,
            preserved,
        })
    }

    fn condense_error(&self, e: tale_ai::Error) -> Error {
        if e.is_context_overflow() {
            Error::CondenseOverflow {
                preserved: self.config.preserved_from_condense,
                source: e,
            }
        } else {
            Error::Ai(e)
        }
    }

    /// Summarize everything older than the preserved tail of one log
    async fn condense_source(&self, from_archive: bool) -> tale_ai::Result<Condensation> {
        let source = if from_archive {
            &self.archived
        } else {
            &self.working
        };
        let index = self.preserved_index(source, from_archive);
        // `tail(0)` would be the whole log; an index of 0 keeps nothing
        let tail = if index < 0 {
            source.tail(index)?.to_vec()
        } else {
            Vec::new()
        };

        let history = if from_archive {
            source.len()
        } else {
            source.len().saturating_sub(self.summary_slot())
        };
        if history <= tail.len() {
            return Ok(Condensation {
                summary: None,
                tail,
            });
        }

        let text = self.policy.condensable_text(source, index);
        let summary = if text.trim().is_empty() {
            String::new()
        } else {
            match self.condenser.condense(&text).await? {
                Some(summary) => summary,
                None => {
                    tracing::warn!("Condenser produced nothing, installing an empty summary");
                    String::new()
                }
            }
        };

        Ok(Condensation {
            summary: Some(summary),
            tail,
        })
    }

    /// The policy's preserved index, kept inside the mirrored tail when
    /// refolding the working log
    fn preserved_index(&self, source: &Prompt, from_archive: bool) -> isize {
        let index = self
            .policy
            .first_preserved_index(source, self.config.preserved_from_condense)
            .min(0);
        let floor = if from_archive {
            source.len()
        } else {
            self.uncondensed.min(source.len())
        };
        index.max(-(floor as isize))
    }
}
