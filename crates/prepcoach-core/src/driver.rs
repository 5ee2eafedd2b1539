use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use prepcoach_coach::{ContentService, FeedbackOutcome};
use prepcoach_db::SessionArchive;
use prepcoach_logging::{LogEvent, Logger};

use crate::error::SessionError;
use crate::report::{aggregate, Report, ReportPolicy};
use crate::state::{reduce, Effect, Event, Screen, SessionState, Transition};

/// Runs a session: feeds events through the reducer and performs the
/// effects it asks for on spawned tasks.
///
/// Results come back over a channel, so user events (a `Restart` in
/// particular) can be dispatched while a call is still outstanding. A result
/// issued under an older generation is dropped when it arrives.
pub struct SessionDriver {
    runner: Arc<EffectRunner>,
    policy: ReportPolicy,
    state: SessionState,
    results_tx: mpsc::UnboundedSender<Event>,
    results: mpsc::UnboundedReceiver<Event>,
    /// Outstanding effects per generation
    in_flight: HashMap<u64, usize>,
}

struct EffectRunner {
    content: ContentService,
    archive: Arc<dyn SessionArchive>,
    logger: Arc<Logger>,
    owner: String,
}

impl SessionDriver {
    pub fn new(
        content: ContentService,
        archive: Arc<dyn SessionArchive>,
        logger: Arc<Logger>,
        owner: impl Into<String>,
    ) -> Self {
        let (results_tx, results) = mpsc::unbounded_channel();
        Self {
            runner: Arc::new(EffectRunner {
                content,
                archive,
                logger,
                owner: owner.into(),
            }),
            policy: ReportPolicy::default(),
            state: SessionState::new(),
            results_tx,
            results,
            in_flight: HashMap::new(),
        }
    }

    pub fn with_policy(mut self, policy: ReportPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn policy(&self) -> &ReportPolicy {
        &self.policy
    }

    /// True when no effect of the current generation is outstanding.
    pub fn is_settled(&self) -> bool {
        !self.in_flight.contains_key(&self.state.generation)
    }

    /// Apply an event and start the effects it asks for without waiting on them.
    pub fn dispatch(&mut self, event: Event) -> &SessionState {
        self.apply(event);
        &self.state
    }

    /// Apply an event, then wait until every effect it led to has reported back.
    pub async fn run(&mut self, event: Event) -> &SessionState {
        self.apply(event);
        self.settle().await
    }

    /// Wait for the current generation's outstanding effects. Stale results
    /// that arrive meanwhile are discarded.
    pub async fn settle(&mut self) -> &SessionState {
        while !self.is_settled() {
            self.next_result().await;
        }
        &self.state
    }

    /// Wait for one effect result and apply it. Returns false when nothing is
    /// outstanding.
    pub async fn next_result(&mut self) -> bool {
        if self.in_flight.is_empty() {
            return false;
        }
        match self.results.recv().await {
            Some(event) => {
                self.receive(event);
                true
            }
            None => false,
        }
    }

    /// Apply every result that has already arrived. Returns how many there were.
    pub fn poll_results(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.results.try_recv() {
            self.receive(event);
            applied += 1;
        }
        applied
    }

    fn receive(&mut self, event: Event) {
        if let Some(generation) = event.generation() {
            if let Some(count) = self.in_flight.get_mut(&generation) {
                *count -= 1;
                if *count == 0 {
                    self.in_flight.remove(&generation);
                }
            }
        }
        self.apply(event);
    }

    fn apply(&mut self, event: Event) {
        if let Some(generation) = event.generation() {
            if generation != self.state.generation {
                self.runner.logger.log(&LogEvent::StaleResultDiscarded {
                    result_generation: generation,
                    current_generation: self.state.generation,
                });
                return;
            }
        }

        let previous = std::mem::take(&mut self.state);
        let was_on_report = previous.screen == Screen::Report;
        let restart = matches!(event, Event::Restart);

        let Transition { state, effects } = reduce(previous, event);
        self.state = state;

        if restart {
            self.runner.logger.log(&LogEvent::SessionRestarted {
                generation: self.state.generation,
            });
        }
        if !was_on_report && self.state.screen == Screen::Report {
            self.report_ready(&effects);
        }

        for effect in effects {
            self.spawn(effect);
        }
    }

    fn spawn(&mut self, effect: Effect) {
        *self.in_flight.entry(effect.generation()).or_default() += 1;

        let runner = Arc::clone(&self.runner);
        let results = self.results_tx.clone();
        tokio::spawn(async move {
            let event = runner.perform(effect).await;
            // The driver may be gone already
            let _ = results.send(event);
        });
    }

    fn report_ready(&self, effects: &[Effect]) {
        let Some(log) = self.state.report_log.as_ref() else {
            return;
        };

        let from_practice = log.id.is_none();
        let saving = effects.iter().any(|e| matches!(e, Effect::SaveLog { .. }));
        if from_practice && !saving {
            self.runner.logger.log(&LogEvent::LogSkipped {
                entries: log.entries.len(),
            });
        }

        let (overall_score, verdict) = match aggregate(&log.entries, &self.policy) {
            Report::Scored(card) => (Some(card.overall_score), Some(card.verdict.to_string())),
            Report::InsufficientData { .. } => (None, None),
        };
        self.runner.logger.log(&LogEvent::ReportReady {
            overall_score,
            verdict,
        });
    }
}

impl EffectRunner {
    /// Perform one effect and return the event describing its result.
    async fn perform(&self, effect: Effect) -> Event {
        match effect {
            Effect::PrepareSession {
                generation,
                company,
                role,
                question_count,
            } => {
                self.logger.log(&LogEvent::SessionStarted {
                    generation,
                    company: company.clone(),
                    role: role.clone(),
                    question_count,
                });

                let prepared = async {
                    let briefing = self.content.generate_briefing(&company, &role).await?;
                    let questions = self.content.generate_questions(&role, question_count).await?;
                    Ok::<_, prepcoach_coach::ContentError>((briefing, questions))
                }
                .await;

                match prepared {
                    Ok((briefing, questions)) => {
                        self.logger.log(&LogEvent::SessionPrepared {
                            generation,
                            questions: questions.len(),
                            industry_trends: briefing.industry_trends.len(),
                        });
                        Event::SessionPrepared {
                            generation,
                            briefing,
                            questions,
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Session preparation failed");
                        self.logger.log(&LogEvent::SessionPrepFailed {
                            generation,
                            error: e.to_string(),
                        });
                        Event::SessionPrepFailed {
                            generation,
                            error: e.to_string(),
                        }
                    }
                }
            }

            Effect::RequestFeedback {
                generation,
                question_index,
                question,
                answer,
            } => {
                let outcome = match self.content.get_feedback(&question, &answer).await {
                    Ok(feedback) => {
                        self.logger.log(&LogEvent::FeedbackReceived {
                            question_index,
                            logic: feedback.logic.score,
                            clarity: feedback.clarity.score,
                            vocal_tone: feedback.vocal_tone.score,
                        });
                        FeedbackOutcome::Valid(feedback)
                    }
                    Err(e) => {
                        warn!(error = %e, question_index, "Feedback request failed");
                        self.logger.log(&LogEvent::FeedbackFailed {
                            question_index,
                            error: e.to_string(),
                        });
                        FeedbackOutcome::error(e.to_string())
                    }
                };
                Event::FeedbackReady {
                    generation,
                    question_index,
                    outcome,
                }
            }

            Effect::SaveLog { generation, log } => {
                let saved = log
                    .to_new_record(&self.owner)
                    .and_then(|record| self.archive.append(&record).map_err(SessionError::from));

                match saved {
                    Ok(id) => {
                        debug!(id = %id, "Session log saved");
                        self.logger.log(&LogEvent::LogSaved {
                            log_id: id.clone(),
                            overall_score: log.overall_score.unwrap_or_default(),
                        });
                        Event::LogSaved { generation, id }
                    }
                    Err(e) => {
                        warn!(error = %e, "Session log save failed");
                        self.logger.log(&LogEvent::LogSaveFailed {
                            error: e.to_string(),
                        });
                        Event::LogSaveFailed {
                            generation,
                            error: e.to_string(),
                        }
                    }
                }
            }

            Effect::GenerateRecommended {
                generation,
                weakness,
            } => {
                self.logger.log(&LogEvent::RecommendedRequested {
                    generation,
                    weakness: weakness.clone(),
                });

                match self.content.generate_recommended_questions(&weakness).await {
                    Ok(questions) => Event::RecommendedReady {
                        generation,
                        questions,
                    },
                    Err(e) => {
                        warn!(error = %e, "Recommended practice failed");
                        self.logger.log(&LogEvent::RecommendedFailed {
                            generation,
                            error: e.to_string(),
                        });
                        Event::RecommendedFailed {
                            generation,
                            error: e.to_string(),
                        }
                    }
                }
            }
        }
    }
}
